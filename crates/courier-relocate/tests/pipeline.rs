use std::sync::Arc;
use std::time::Duration;

use courier_config::{DelimiterRule, Timeouts, TransportKind};
use courier_relocate::{
    ByteTransform, DestinationNamer, Eligibility, ErrorKind, NamingPolicy, RelocateError,
    RelocationOutcome, RelocationPipeline, SameStoreRewriter, ShareWriter, SkipReason, StepKind,
    StepStatus,
};
use courier_storage::{ObjectSource, StorageObjectRef};
use courier_telemetry::Metrics;
use courier_test_support::fixtures::credential;
use courier_test_support::remote::{ConnectFailure, FakeConnector, FakeRemoteFs};
use courier_test_support::storage::{CountingSource, in_memory_source, seed_object};

const BUCKET: &str = "landing";
const SHORT: Duration = Duration::from_secs(5);

fn delimiter_cut() -> DestinationNamer {
    DestinationNamer::new(
        NamingPolicy::DelimiterCut {
            delimiter: '|',
            extension: None,
        },
        Eligibility {
            extensions: vec![".csv".into(), ".txt".into()],
            delimiter: '|',
            rule: DelimiterRule::Required,
        },
    )
}

fn counting_source() -> Arc<CountingSource> {
    Arc::new(CountingSource::new(Arc::new(in_memory_source(&[BUCKET]))))
}

fn share_pipeline(
    source: &Arc<CountingSource>,
    fs: &FakeRemoteFs,
    root: &str,
) -> anyhow::Result<RelocationPipeline> {
    let connector = Arc::new(FakeConnector::new(fs.clone(), TransportKind::Smb));
    let writer = ShareWriter::new(connector, Arc::new(credential(root)?));
    Ok(RelocationPipeline::new(
        source.clone(),
        Arc::new(writer),
        delimiter_cut(),
        Metrics::new()?,
    ))
}

fn rename_pipeline(
    source: &Arc<CountingSource>,
    namer: DestinationNamer,
) -> anyhow::Result<RelocationPipeline> {
    let store: Arc<dyn ObjectSource> = source.clone();
    Ok(RelocationPipeline::new(
        Arc::clone(&store),
        Arc::new(SameStoreRewriter::new(store)),
        namer,
        Metrics::new()?,
    )
    .with_transform(ByteTransform::escape_rewrite())
    .with_delete_source(true))
}

async fn exists(source: &CountingSource, object: &StorageObjectRef) -> anyhow::Result<bool> {
    match source.fetch(object, SHORT).await {
        Ok(_) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[tokio::test]
async fn ineligible_names_make_no_calls() -> anyhow::Result<()> {
    let source = counting_source();
    let fs = FakeRemoteFs::new();
    let pipeline = share_pipeline(&source, &fs, "/inbound")?;

    for (name, reason) in [
        ("folder/report|2023.json", SkipReason::ExtensionNotEligible),
        ("folder/report.csv", SkipReason::DelimiterMissing),
    ] {
        let object = StorageObjectRef::new(BUCKET, name)?;
        let report = pipeline.relocate(&object).await?;
        assert_eq!(report.outcome, Some(RelocationOutcome::Skipped { reason }));
    }
    assert_eq!(source.calls(), 0);
    assert_eq!(fs.connects(), 0);
    Ok(())
}

#[tokio::test]
async fn share_delivery_creates_directories_and_keeps_source() -> anyhow::Result<()> {
    let source = counting_source();
    let fs = FakeRemoteFs::new();
    fs.add_dir("/inbound");
    let pipeline = share_pipeline(&source, &fs, "/inbound")?
        .with_transform(ByteTransform::escape_rewrite());
    let object = seed_object(
        source.as_ref(),
        BUCKET,
        "folder/66000_report|2023.csv",
        "id~~name\n\"\",\"\"\n",
    )
    .await?;

    let report = pipeline.relocate(&object).await?;
    assert!(matches!(
        report.outcome,
        Some(RelocationOutcome::Delivered {
            ref destination,
            source_deleted: false,
            ..
        }) if destination == "folder/66000_report.csv"
    ));
    assert_eq!(report.step_status(StepKind::Deleting), Some(StepStatus::Skipped));
    assert!(fs.has_dir("/inbound/folder"));
    assert_eq!(
        fs.file("/inbound/folder/66000_report.csv").as_deref(),
        Some(b"id,name\n\",\"\n".as_slice())
    );
    assert_eq!(fs.closes(), 1);
    assert!(exists(&source, &object).await?);
    Ok(())
}

#[tokio::test]
async fn share_redelivery_overwrites_with_identical_bytes() -> anyhow::Result<()> {
    let source = counting_source();
    let fs = FakeRemoteFs::new();
    let pipeline = share_pipeline(&source, &fs, "")?;
    let object = seed_object(source.as_ref(), BUCKET, "notes.txt|v2.txt", "same bytes").await?;

    pipeline.relocate(&object).await?;
    pipeline.relocate(&object).await?;
    assert_eq!(fs.writes(), 2);
    assert_eq!(fs.file_paths(), ["notes.txt"]);
    assert_eq!(fs.file("notes.txt").as_deref(), Some(b"same bytes".as_slice()));
    assert_eq!(fs.closes(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_write_leaves_source_and_closes_session() -> anyhow::Result<()> {
    let source = counting_source();
    let fs = FakeRemoteFs::new();
    fs.fail_writes(true);
    let pipeline = share_pipeline(&source, &fs, "")?.with_delete_source(true);
    let object = seed_object(source.as_ref(), BUCKET, "a|b.csv", "payload").await?;

    let err = pipeline
        .relocate(&object)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("write failure was swallowed"))?;
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.operation(), Some("write"));
    assert_eq!(fs.closes(), 1);
    assert_eq!(source.deletes(), 0);
    assert!(exists(&source, &object).await?);
    Ok(())
}

#[tokio::test]
async fn refused_credentials_classify_as_auth() -> anyhow::Result<()> {
    let source = counting_source();
    let fs = FakeRemoteFs::new();
    fs.fail_connect(Some(ConnectFailure::Auth));
    let pipeline = share_pipeline(&source, &fs, "")?;
    let object = seed_object(source.as_ref(), BUCKET, "a|b.csv", "payload").await?;

    let err = pipeline
        .relocate(&object)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("auth failure was swallowed"))?;
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(fs.last_login(), Some(("files.example.internal".into(), "courier".into())));

    fs.fail_connect(Some(ConnectFailure::Unreachable));
    let err = pipeline
        .relocate(&object)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("connect failure was swallowed"))?;
    assert_eq!(err.kind(), ErrorKind::Connect);
    assert_eq!(fs.closes(), 0);
    Ok(())
}

#[tokio::test]
async fn write_deadline_returns_timeout_and_session_still_closes() -> anyhow::Result<()> {
    let source = counting_source();
    let fs = FakeRemoteFs::new();
    fs.delay_writes(Some(Duration::from_millis(300)));
    let pipeline = share_pipeline(&source, &fs, "")?.with_timeouts(Timeouts {
        write: Duration::from_millis(50),
        ..Timeouts::default()
    });
    let object = seed_object(source.as_ref(), BUCKET, "slow|1.csv", "payload").await?;

    let err = pipeline
        .relocate(&object)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("slow write did not time out"))?;
    assert!(matches!(
        err,
        RelocateError::Timeout {
            operation: "write",
            ..
        }
    ));

    for _ in 0..100 {
        if fs.closes() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(fs.closes(), 1);
    assert!(exists(&source, &object).await?);
    Ok(())
}

#[tokio::test]
async fn prefix_trim_renames_in_place() -> anyhow::Result<()> {
    let source = counting_source();
    let namer = DestinationNamer::new(
        NamingPolicy::PrefixTrim {
            prefix: "0000".into(),
        },
        Eligibility::any(),
    );
    let pipeline = rename_pipeline(&source, namer)?;
    let object = seed_object(source.as_ref(), BUCKET, "0000invoice.csv", "a~~b").await?;

    let report = pipeline.relocate(&object).await?;
    assert_eq!(
        report.outcome,
        Some(RelocationOutcome::Delivered {
            destination: "invoice.csv".into(),
            bytes: 3,
            source_deleted: true,
        })
    );
    let renamed = source.fetch(&object.sibling("invoice.csv")?, SHORT).await?;
    assert_eq!(renamed.as_ref(), b"a,b");
    assert!(!exists(&source, &object).await?);

    let untouched = StorageObjectRef::new(BUCKET, "invoice.csv")?;
    let report = pipeline.relocate(&untouched).await?;
    assert_eq!(
        report.outcome,
        Some(RelocationOutcome::Skipped {
            reason: SkipReason::PrefixAbsent
        })
    );
    Ok(())
}

#[tokio::test]
async fn existing_destination_fails_closed() -> anyhow::Result<()> {
    let source = counting_source();
    let pipeline = rename_pipeline(&source, delimiter_cut())?;
    let existing = seed_object(source.as_ref(), BUCKET, "out/report.csv", "original").await?;
    let object = seed_object(source.as_ref(), BUCKET, "out/report|9.csv", "newer").await?;

    let err = pipeline
        .relocate(&object)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("existing destination was overwritten"))?;
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(source.fetch(&existing, SHORT).await?.as_ref(), b"original");
    assert!(exists(&source, &object).await?);
    Ok(())
}

#[tokio::test]
async fn concurrent_renames_to_one_destination_have_one_winner() -> anyhow::Result<()> {
    let source = counting_source();
    let pipeline = rename_pipeline(&source, delimiter_cut())?;
    let first = seed_object(source.as_ref(), BUCKET, "daily/feed|1.csv", "one").await?;
    let second = seed_object(source.as_ref(), BUCKET, "daily/feed|2.csv", "two").await?;

    let (left, right) = tokio::join!(pipeline.relocate(&first), pipeline.relocate(&second));
    let (winner, loser) = match (left, right) {
        (Ok(_), Err(err)) => (first, (second, err)),
        (Err(err), Ok(_)) => (second, (first, err)),
        other => anyhow::bail!("expected exactly one winner, got {other:?}"),
    };
    let (loser, err) = loser;
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert!(!exists(&source, &winner).await?);
    assert!(exists(&source, &loser).await?);
    assert_eq!(source.deletes(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_delete_keeps_both_copies() -> anyhow::Result<()> {
    let source = counting_source();
    source.fail_deletes(true);
    let pipeline = rename_pipeline(&source, delimiter_cut())?;
    let object = seed_object(source.as_ref(), BUCKET, "x|1.txt", "body").await?;

    let err = pipeline
        .relocate(&object)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("delete failure was swallowed"))?;
    assert_eq!(err.operation(), Some("delete"));
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(exists(&source, &object).await?);
    assert!(exists(&source, &object.sibling("x.txt")?).await?);
    Ok(())
}
