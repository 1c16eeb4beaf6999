//! Create-only rewrite inside the source bucket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_config::TransportKind;
use courier_storage::{ObjectSource, Precondition};
use tracing::info;

use super::RemoteWriter;
use crate::error::{RelocateError, RelocateResult};
use crate::model::TransferTask;

/// Writes the payload next to the source under its new name.
///
/// The put is create-only: if the destination already exists the write fails
/// with a precondition error and nothing is overwritten.
#[derive(Clone)]
pub struct SameStoreRewriter {
    store: Arc<dyn ObjectSource>,
}

impl SameStoreRewriter {
    /// Rewriter over the shared object source.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectSource>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RemoteWriter for SameStoreRewriter {
    fn kind(&self) -> TransportKind {
        TransportKind::SameStore
    }

    async fn deliver(&self, task: &TransferTask, deadline: Duration) -> RelocateResult<u64> {
        let destination = task
            .source
            .sibling(task.destination_name.as_str())
            .map_err(|source| RelocateError::storage("write", &task.source, source))?;
        self.store
            .put(
                &destination,
                task.payload.clone(),
                Precondition::DoesNotExist,
                deadline,
            )
            .await
            .map_err(|source| RelocateError::storage("write", &task.source, source))?;
        let written = task.payload.len() as u64;
        info!(
            source = %task.source,
            destination = %destination,
            bytes = written,
            "object rewritten"
        );
        Ok(written)
    }
}
