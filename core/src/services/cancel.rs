//! Cancellation helpers shared by the engine and the gate

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::errors::{DomainError, DomainResult};

/// Race `fut` against `cancel`; a cancelled future is dropped where it stands
pub(crate) async fn cancellable<F>(cancel: &CancellationToken, fut: F) -> DomainResult<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DomainError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Last check before a write; writes themselves are never interrupted
pub(crate) fn ensure_active(cancel: &CancellationToken) -> DomainResult<()> {
    if cancel.is_cancelled() {
        Err(DomainError::Cancelled)
    } else {
        Ok(())
    }
}
