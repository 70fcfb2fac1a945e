//! Session store trait defining the persistence contract for verification sessions.
//!
//! Writes are conditional on the version the writer observed, which gives
//! every implementation the same "no lost updates" guarantee per session id
//! whether it is backed by a local map or a shared key-value store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::VerificationSession;
use crate::errors::StoreError;

/// Repository trait for `VerificationSession` persistence
///
/// `save` is an upsert guarded by an optimistic version check:
///
/// * `expected_version = None` creates the session and fails with
///   `StoreError::Conflict` if the id is already taken.
/// * `expected_version = Some(v)` replaces the stored session only if its
///   version is still `v`; otherwise `StoreError::Conflict`.
///
/// Callers bump `session.version` before saving. A successful write is
/// atomic per key: readers see either the old or the new session, never a mix.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session by id
    async fn get(&self, id: &Uuid) -> Result<Option<VerificationSession>, StoreError>;

    /// Conditionally write a session
    async fn save(
        &self,
        session: &VerificationSession,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError>;

    /// Backend liveness, used by the health endpoint
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
