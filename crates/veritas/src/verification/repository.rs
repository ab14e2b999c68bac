use chrono::{DateTime, Utc};
use mime::Mime;

use super::domain::{
    RemoteRequestId, RequestId, RequestStatus, VerificationRequest, VerificationResult,
};

/// Storage for verification requests.
///
/// Implementations must enforce uniqueness of both `id` and `remote_request_id`.
pub trait RequestRepository: Send + Sync {
    fn insert(&self, request: VerificationRequest) -> Result<VerificationRequest, RepositoryError>;
    /// Sets `status` and bumps `updated_at`.
    fn update_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<VerificationRequest>, RepositoryError>;
    fn find_by_remote_id(
        &self,
        remote_request_id: &RemoteRequestId,
    ) -> Result<Option<VerificationRequest>, RepositoryError>;
    /// Most recently created first.
    fn recent(&self, limit: usize) -> Result<Vec<VerificationRequest>, RepositoryError>;
}

/// Append-only storage for callback results.
pub trait ResultRepository: Send + Sync {
    /// Stores every row or none of them.
    fn insert_batch(&self, results: Vec<VerificationResult>) -> Result<(), RepositoryError>;
    fn for_request(&self, request_id: &RequestId)
        -> Result<Vec<VerificationResult>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Object storage for extracted report documents.
pub trait DocumentStore: Send + Sync {
    /// Stores `bytes` under `filename` and returns a retrievable URL.
    /// Must refuse to overwrite an existing key.
    fn put(
        &self,
        filename: &str,
        bytes: &[u8],
        content_type: &Mime,
    ) -> Result<String, DocumentStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document '{0}' already exists")]
    Conflict(String),
    #[error("document store unavailable: {0}")]
    Backend(String),
}
