//! Single-object relocation pipeline.
//!
//! # Design
//! - Steps run in a fixed order: naming, fetching, transforming, writing, deleting.
//! - Naming is pure and runs first, so ineligible names never touch the network.
//! - The source is deleted only after the destination write is confirmed.
//! - Every step is recorded in the `RelocationReport` and counted in metrics;
//!   failures are returned, never retried here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_config::{RelocationPolicy, Timeouts, TransportKind};
use courier_storage::{ObjectSource, StorageObjectRef};
use courier_telemetry::Metrics;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{RelocateError, RelocateResult};
use crate::model::{
    Deadline, RelocationOutcome, RelocationReport, StepKind, StepStatus, TransferTask,
};
use crate::naming::{DestinationNamer, NamingDecision};
use crate::transform::ByteTransform;
use crate::writer::RemoteWriter;

const FAILED_OUTCOME: &str = "failed";

enum StepOutcome<T> {
    Completed(T, Option<String>),
    Skipped(T, Option<String>),
}

impl<T> StepOutcome<T> {
    const fn status(&self) -> StepStatus {
        match self {
            Self::Completed(..) => StepStatus::Completed,
            Self::Skipped(..) => StepStatus::Skipped,
        }
    }

    fn into_parts(self) -> (T, Option<String>) {
        match self {
            Self::Completed(value, detail) | Self::Skipped(value, detail) => (value, detail),
        }
    }
}

/// Relocates one object per call: name, fetch, transform, write, delete.
///
/// The pipeline is immutable once built and shared across concurrent
/// invocations; each call owns its own report, deadline, and session.
#[derive(Clone)]
pub struct RelocationPipeline {
    source: Arc<dyn ObjectSource>,
    writer: Arc<dyn RemoteWriter>,
    namer: DestinationNamer,
    transform: ByteTransform,
    delete_source: bool,
    timeouts: Timeouts,
    metrics: Metrics,
}

impl RelocationPipeline {
    /// Pipeline with the identity transform, source retention, and default timeouts.
    #[must_use]
    pub fn new(
        source: Arc<dyn ObjectSource>,
        writer: Arc<dyn RemoteWriter>,
        namer: DestinationNamer,
        metrics: Metrics,
    ) -> Self {
        Self {
            source,
            writer,
            namer,
            transform: ByteTransform::identity(),
            delete_source: false,
            timeouts: Timeouts::default(),
            metrics,
        }
    }

    /// Build a pipeline from a configured relocation policy.
    ///
    /// # Errors
    ///
    /// Returns [`RelocateError::InvalidInput`] when the naming policy is incomplete.
    pub fn from_policy(
        source: Arc<dyn ObjectSource>,
        writer: Arc<dyn RemoteWriter>,
        policy: &RelocationPolicy,
        timeouts: Timeouts,
        metrics: Metrics,
    ) -> RelocateResult<Self> {
        let namer = DestinationNamer::from_policy(policy)?;
        Ok(Self::new(source, writer, namer, metrics)
            .with_transform(ByteTransform::from_preset(policy.transform))
            .with_delete_source(policy.delete_source)
            .with_timeouts(timeouts))
    }

    /// Replace the content transform.
    #[must_use]
    pub fn with_transform(mut self, transform: ByteTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Delete the source after a confirmed write.
    #[must_use]
    pub const fn with_delete_source(mut self, delete_source: bool) -> Self {
        self.delete_source = delete_source;
        self
    }

    /// Replace the network deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Transport of the configured writer.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.writer.kind()
    }

    /// Naming strategy and eligibility gate in use.
    #[must_use]
    pub const fn namer(&self) -> &DestinationNamer {
        &self.namer
    }

    /// Relocate `object` and return the per-step report.
    ///
    /// Skipped names and sources that are already gone finish successfully
    /// with the matching [`RelocationOutcome`].
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. A failed write leaves the
    /// source untouched; a failed delete leaves both copies in place.
    pub async fn relocate(&self, object: &StorageObjectRef) -> RelocateResult<RelocationReport> {
        let mut report = RelocationReport::new(object);
        let deadline = Deadline::start(self.timeouts.invocation);
        let span = info_span!(
            "relocation",
            invocation_id = %report.invocation_id,
            object = %object,
            transport = self.transport().as_str(),
        );

        let result = self
            .execute_pipeline(object, &mut report, deadline)
            .instrument(span)
            .await;
        let invocation_id = report.invocation_id;
        match result {
            Ok(outcome) => {
                self.metrics
                    .observe_relocation(outcome.as_str(), deadline.elapsed());
                if let RelocationOutcome::Delivered { bytes, .. } = &outcome {
                    self.metrics.add_relocated_bytes(*bytes);
                }
                info!(
                    invocation_id = %invocation_id,
                    object = %object,
                    outcome = outcome.as_str(),
                    elapsed_ms = duration_ms(deadline.elapsed()),
                    "relocation finished"
                );
                report.outcome = Some(outcome);
                Ok(report)
            }
            Err(err) => {
                self.metrics
                    .observe_relocation(FAILED_OUTCOME, deadline.elapsed());
                warn!(
                    invocation_id = %invocation_id,
                    object = %object,
                    error = %err,
                    kind = err.kind().as_str(),
                    operation = err.operation().unwrap_or_default(),
                    report = %serde_json::to_string(&report).unwrap_or_default(),
                    "relocation failed"
                );
                Err(err)
            }
        }
    }

    async fn execute_pipeline(
        &self,
        object: &StorageObjectRef,
        report: &mut RelocationReport,
        deadline: Deadline,
    ) -> RelocateResult<RelocationOutcome> {
        let destination = match self.run_naming(report, object).await? {
            NamingDecision::Relocate { destination, .. } => destination,
            NamingDecision::Skip { reason } => {
                return Ok(RelocationOutcome::Skipped { reason });
            }
        };
        let Some(payload) = self.run_fetch(report, object, deadline).await? else {
            return Ok(RelocationOutcome::SourceMissing);
        };
        let payload = self.run_transform(report, object, payload).await?;
        let task = TransferTask {
            source: object.clone(),
            payload,
            destination_name: destination,
        };
        let bytes = self.run_write(report, &task, deadline).await?;
        let source_deleted = self.run_delete(report, object, deadline).await?;

        Ok(RelocationOutcome::Delivered {
            destination: task.destination_name,
            bytes,
            source_deleted,
        })
    }

    async fn run_naming(
        &self,
        report: &mut RelocationReport,
        object: &StorageObjectRef,
    ) -> RelocateResult<NamingDecision> {
        let decision = self.namer.decide(object.name());
        let delete_source = self.delete_source;
        let same_store = self.transport() == TransportKind::SameStore;
        self.execute_step(report, StepKind::Naming, async move {
            match decision {
                NamingDecision::Skip { reason } => {
                    debug!(reason = reason.as_str(), "object not eligible");
                    Ok(StepOutcome::Skipped(
                        NamingDecision::Skip { reason },
                        Some(reason.as_str().to_string()),
                    ))
                }
                NamingDecision::Relocate { ref destination, .. }
                    if same_store && delete_source && destination == object.name() =>
                {
                    Err(RelocateError::InvalidInput {
                        field: "destination",
                        reason: "same_as_source",
                        value: Some(destination.clone()),
                    })
                }
                NamingDecision::Relocate { ref destination, .. } => {
                    let detail = format!("destination={destination}");
                    Ok(StepOutcome::Completed(decision, Some(detail)))
                }
            }
        })
        .await
    }

    async fn run_fetch(
        &self,
        report: &mut RelocationReport,
        object: &StorageObjectRef,
        deadline: Deadline,
    ) -> RelocateResult<Option<Bytes>> {
        let source = Arc::clone(&self.source);
        let budget = self.timeouts.fetch;
        self.execute_step(report, StepKind::Fetching, async move {
            let bound = deadline
                .bound(budget)
                .ok_or_else(|| budget_exhausted("fetch", object))?;
            match source.fetch(object, bound).await {
                Ok(payload) => {
                    let detail = format!("bytes={}", payload.len());
                    Ok(StepOutcome::Completed(Some(payload), Some(detail)))
                }
                Err(err) if err.is_not_found() => {
                    info!("source object already gone");
                    Ok(StepOutcome::Skipped(None, Some("source_missing".into())))
                }
                Err(err) => Err(RelocateError::storage("fetch", object, err)),
            }
        })
        .await
    }

    async fn run_transform(
        &self,
        report: &mut RelocationReport,
        object: &StorageObjectRef,
        payload: Bytes,
    ) -> RelocateResult<Bytes> {
        let transform = &self.transform;
        self.execute_step(report, StepKind::Transforming, async move {
            if transform.is_identity() {
                return Ok(StepOutcome::Skipped(payload, Some("identity".into())));
            }
            let bytes_in = payload.len();
            let stages = transform.clone();
            let rewritten = tokio::task::spawn_blocking(move || stages.apply_to_vec(&payload))
                .await
                .map_err(|source| RelocateError::Join {
                    operation: "transform",
                    object: object.to_string(),
                    source,
                })?
                .map_err(|source| RelocateError::Transform {
                    object: object.to_string(),
                    source,
                })?;
            let detail = format!("bytes_in={bytes_in} bytes_out={}", rewritten.len());
            Ok(StepOutcome::Completed(Bytes::from(rewritten), Some(detail)))
        })
        .await
    }

    async fn run_write(
        &self,
        report: &mut RelocationReport,
        task: &TransferTask,
        deadline: Deadline,
    ) -> RelocateResult<u64> {
        let writer = Arc::clone(&self.writer);
        let budget = self.timeouts.write;
        self.execute_step(report, StepKind::Writing, async move {
            let bound = deadline
                .bound(budget)
                .ok_or_else(|| budget_exhausted("write", &task.source))?;
            let written = writer.deliver(task, bound).await?;
            Ok(StepOutcome::Completed(
                written,
                Some(format!("bytes={written} destination={}", task.destination_name)),
            ))
        })
        .await
    }

    async fn run_delete(
        &self,
        report: &mut RelocationReport,
        object: &StorageObjectRef,
        deadline: Deadline,
    ) -> RelocateResult<bool> {
        let source = Arc::clone(&self.source);
        let delete_source = self.delete_source;
        let budget = self.timeouts.fetch;
        self.execute_step(report, StepKind::Deleting, async move {
            if !delete_source {
                return Ok(StepOutcome::Skipped(false, Some("retain_source".into())));
            }
            let bound = deadline
                .bound(budget)
                .ok_or_else(|| budget_exhausted("delete", object))?;
            source
                .delete(object, bound)
                .await
                .map_err(|err| RelocateError::storage("delete", object, err))?;
            Ok(StepOutcome::Completed(true, None))
        })
        .await
    }

    async fn execute_step<T, F>(
        &self,
        report: &mut RelocationReport,
        step: StepKind,
        work: F,
    ) -> RelocateResult<T>
    where
        F: Future<Output = RelocateResult<StepOutcome<T>>>,
    {
        self.record_step(report, step, StepStatus::Started, None);
        match work.await {
            Ok(outcome) => {
                let status = outcome.status();
                let (value, detail) = outcome.into_parts();
                self.record_step(report, step, status, detail);
                Ok(value)
            }
            Err(err) => {
                self.record_step(report, step, StepStatus::Failed, Some(err.to_string()));
                Err(err)
            }
        }
    }

    fn record_step(
        &self,
        report: &mut RelocationReport,
        step: StepKind,
        status: StepStatus,
        detail: Option<String>,
    ) {
        debug!(
            step = step.as_str(),
            status = status.as_str(),
            detail = detail.as_deref().unwrap_or_default(),
            "relocation step"
        );
        if report.update_step(step, status, detail) {
            self.metrics
                .inc_relocation_step(step.as_str(), status.as_str());
        }
    }
}

fn budget_exhausted(operation: &'static str, object: &StorageObjectRef) -> RelocateError {
    RelocateError::BudgetExhausted {
        operation,
        object: object.to_string(),
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
