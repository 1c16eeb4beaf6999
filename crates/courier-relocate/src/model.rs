//! Per-invocation data: transfer task, deadline budget, step records, and outcome.

use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use courier_storage::StorageObjectRef;
use serde::Serialize;
use uuid::Uuid;

use crate::naming::SkipReason;

/// Payload and destination for one relocation; never persisted.
#[derive(Debug, Clone)]
pub struct TransferTask {
    /// Object the payload was read from.
    pub source: StorageObjectRef,
    /// Transformed payload.
    pub payload: Bytes,
    /// Destination name relative to the writer's root.
    pub destination_name: String,
}

/// Time budget shared by every network call of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a budget now.
    #[must_use]
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Time left in the budget.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    /// Time elapsed since the budget started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Deadline for one call: the smaller of `step` and what is left, or `None` once spent.
    #[must_use]
    pub fn bound(&self, step: Duration) -> Option<Duration> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            None
        } else {
            Some(step.min(remaining))
        }
    }
}

/// Pipeline steps in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Eligibility and destination naming (no I/O).
    Naming,
    /// Download of the source object.
    Fetching,
    /// Byte substitution.
    Transforming,
    /// Destination write.
    Writing,
    /// Source removal after a confirmed write.
    Deleting,
}

impl StepKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Naming => "naming",
            Self::Fetching => "fetching",
            Self::Transforming => "transforming",
            Self::Writing => "writing",
            Self::Deleting => "deleting",
        }
    }
}

/// Status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step began.
    Started,
    /// The step finished.
    Completed,
    /// The step failed; the invocation stops here.
    Failed,
    /// The step had nothing to do.
    Skipped,
}

impl StepStatus {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Latest status of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step the record describes.
    pub step: StepKind,
    /// Latest status.
    pub status: StepStatus,
    /// Short detail string.
    pub detail: Option<String>,
    /// When the status was recorded.
    pub updated_at: DateTime<Utc>,
}

/// How a successful invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RelocationOutcome {
    /// The payload was written to the destination.
    Delivered {
        /// Destination name.
        destination: String,
        /// Bytes written.
        bytes: u64,
        /// Whether the source object was deleted afterwards.
        source_deleted: bool,
    },
    /// The name was filtered out before any I/O.
    Skipped {
        /// Why the object was skipped.
        reason: SkipReason,
    },
    /// The source was already gone, usually after an earlier delivery moved it.
    SourceMissing,
}

impl RelocationOutcome {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Skipped { .. } => "skipped",
            Self::SourceMissing => "source_missing",
        }
    }
}

/// Step-by-step record of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RelocationReport {
    /// Identifier attached to every log line of the invocation.
    pub invocation_id: Uuid,
    /// `bucket/name` of the source object.
    pub source: String,
    /// When the invocation began.
    pub started_at: DateTime<Utc>,
    /// Latest status per step, in first-seen order.
    pub steps: Vec<StepRecord>,
    /// Final outcome once the invocation reaches `Done`.
    pub outcome: Option<RelocationOutcome>,
}

impl RelocationReport {
    /// Empty report for `source`.
    #[must_use]
    pub fn new(source: &StorageObjectRef) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            source: source.to_string(),
            started_at: Utc::now(),
            steps: Vec::new(),
            outcome: None,
        }
    }

    /// Latest status recorded for `step`.
    #[must_use]
    pub fn step_status(&self, step: StepKind) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| record.status)
    }

    /// Record a status change; returns whether anything changed.
    pub fn update_step(
        &mut self,
        step: StepKind,
        status: StepStatus,
        detail: Option<String>,
    ) -> bool {
        let now = Utc::now();
        if let Some(record) = self.steps.iter_mut().find(|record| record.step == step) {
            if record.status == status && record.detail == detail {
                return false;
            }
            record.status = status;
            record.detail = detail;
            record.updated_at = now;
        } else {
            self.steps.push(StepRecord {
                step,
                status,
                detail,
                updated_at: now,
            });
        }
        true
    }
}
