use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use axum::response::Response;
use courier_app::{AppContext, Backends, CourierServer, HEADER_OUTCOME};
use courier_config::CourierConfig;
use courier_storage::{ObjectSource, StorageObjectRef};
use courier_telemetry::Metrics;
use courier_test_support::fixtures::env_lookup;
use courier_test_support::secrets::FakeSecretBackend;
use courier_test_support::storage::{in_memory_source, seed_object};
use tower::ServiceExt;

const BUCKET: &str = "landing";
const FINALIZED: &str = "google.cloud.storage.object.v1.finalized";
const SHORT: Duration = Duration::from_secs(5);

struct Harness {
    router: Router,
    source: Arc<dyn ObjectSource>,
    metrics: Metrics,
}

async fn harness() -> anyhow::Result<Harness> {
    let config = CourierConfig::from_lookup(env_lookup(&[
        ("COURIER_TRANSPORT", "same_store"),
        ("COURIER_BUCKETS", BUCKET),
        ("COURIER_NAMING", "delimiter_cut"),
        ("COURIER_EXTENSIONS", "csv"),
        ("COURIER_TRANSFORM", "escape_rewrite"),
    ]))?;
    let source: Arc<dyn ObjectSource> = Arc::new(in_memory_source(&[BUCKET]));
    let backends = Backends {
        source: Arc::clone(&source),
        secrets: Arc::new(FakeSecretBackend::new()),
    };
    let metrics = Metrics::new()?;
    let context = AppContext::assemble(&config, backends, metrics.clone()).await?;
    Ok(Harness {
        router: CourierServer::new(Arc::new(context)).into_router(),
        source,
        metrics,
    })
}

fn binary_event(event_type: &str, bucket: &str, name: &str) -> anyhow::Result<Request<Body>> {
    let body = serde_json::json!({ "bucket": bucket, "name": name }).to_string();
    Ok(Request::post("/")
        .header("ce-specversion", "1.0")
        .header("ce-id", "evt-1")
        .header("ce-type", event_type)
        .header("ce-source", "//storage.googleapis.com/projects/_/buckets/landing")
        .header("x-request-id", "req-1")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))?)
}

fn outcome(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(HEADER_OUTCOME)
        .and_then(|value| value.to_str().ok())
}

async fn json_body(response: Response) -> anyhow::Result<serde_json::Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn binary_event_relocates_object() -> anyhow::Result<()> {
    let harness = harness().await?;
    let object = seed_object(harness.source.as_ref(), BUCKET, "in/report|1.csv", "a~~b").await?;

    let response = harness
        .router
        .clone()
        .oneshot(binary_event(FINALIZED, BUCKET, "in/report|1.csv")?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(outcome(&response), Some("delivered"));
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-1")
    );

    let renamed = harness
        .source
        .fetch(&object.sibling("in/report.csv")?, SHORT)
        .await?;
    assert_eq!(renamed.as_ref(), b"a,b");
    assert!(harness.source.fetch(&object, SHORT).await.is_err());
    assert_eq!(harness.metrics.relocations("delivered"), 1);

    let redelivered = harness
        .router
        .oneshot(binary_event(FINALIZED, BUCKET, "in/report|1.csv")?)
        .await?;
    assert_eq!(redelivered.status(), StatusCode::NO_CONTENT);
    assert_eq!(outcome(&redelivered), Some("source_missing"));
    Ok(())
}

#[tokio::test]
async fn structured_event_is_accepted() -> anyhow::Result<()> {
    let harness = harness().await?;
    seed_object(harness.source.as_ref(), BUCKET, "feed|7.csv", "x").await?;
    let envelope = serde_json::json!({
        "specversion": "1.0",
        "id": "evt-9",
        "type": FINALIZED,
        "source": "//storage.googleapis.com/projects/_/buckets/landing",
        "data": { "bucket": BUCKET, "name": "feed|7.csv" }
    });
    let request = Request::post("/")
        .header(CONTENT_TYPE, "application/cloudevents+json")
        .body(Body::from(envelope.to_string()))?;

    let response = harness.router.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(outcome(&response), Some("delivered"));
    let renamed = StorageObjectRef::new(BUCKET, "feed.csv")?;
    assert_eq!(harness.source.fetch(&renamed, SHORT).await?.as_ref(), b"x");
    Ok(())
}

#[tokio::test]
async fn ineligible_and_foreign_events_are_acknowledged() -> anyhow::Result<()> {
    let harness = harness().await?;

    let skipped = harness
        .router
        .clone()
        .oneshot(binary_event(FINALIZED, BUCKET, "notes|1.json")?)
        .await?;
    assert_eq!(skipped.status(), StatusCode::NO_CONTENT);
    assert_eq!(outcome(&skipped), Some("skipped"));

    let deleted = harness
        .router
        .oneshot(binary_event(
            "google.cloud.storage.object.v1.deleted",
            BUCKET,
            "feed|1.csv",
        )?)
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(outcome(&deleted), Some("ignored"));
    Ok(())
}

#[tokio::test]
async fn malformed_event_is_rejected() -> anyhow::Result<()> {
    let harness = harness().await?;
    let request = Request::post("/")
        .header("ce-specversion", "1.0")
        .header("ce-type", FINALIZED)
        .body(Body::from(r#"{"bucket":"landing","name":"a|b.csv"}"#))?;

    let response = harness.router.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "missing_attribute");
    assert_eq!(body["detail"], "ce-id");
    Ok(())
}

#[tokio::test]
async fn unknown_bucket_is_not_retried() -> anyhow::Result<()> {
    let harness = harness().await?;
    let response = harness
        .router
        .oneshot(binary_event(FINALIZED, "elsewhere", "a|b.csv")?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(body["operation"], "fetch");
    Ok(())
}

#[tokio::test]
async fn existing_destination_asks_for_redelivery() -> anyhow::Result<()> {
    let harness = harness().await?;
    seed_object(harness.source.as_ref(), BUCKET, "out.csv", "original").await?;
    let object = seed_object(harness.source.as_ref(), BUCKET, "out|2.csv", "newer").await?;

    let response = harness
        .router
        .oneshot(binary_event(FINALIZED, BUCKET, "out|2.csv")?)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "precondition_failed");
    assert_eq!(body["operation"], "write");
    assert_eq!(body["object"], "landing/out|2.csv");
    assert_eq!(harness.source.fetch(&object, SHORT).await?.as_ref(), b"newer");
    assert_eq!(harness.metrics.relocations("failed"), 1);
    Ok(())
}

#[tokio::test]
async fn health_reports_transport() -> anyhow::Result<()> {
    let harness = harness().await?;
    let response = harness
        .router
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["transport"], "same_store");
    Ok(())
}

#[tokio::test]
async fn metrics_endpoint_counts_requests() -> anyhow::Result<()> {
    let harness = harness().await?;
    harness
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;

    let response = harness
        .router
        .oneshot(Request::get("/metrics").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/plain; version=0.0.4")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let text = String::from_utf8(bytes.to_vec())?;
    assert!(text.lines().any(|line| {
        line.starts_with("http_requests_total")
            && line.contains(r#"route="/health""#)
            && line.contains(r#"code="200""#)
            && line.ends_with(" 1")
    }));
    Ok(())
}
