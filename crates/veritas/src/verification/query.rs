use std::sync::Arc;

use serde::Serialize;

use super::domain::{RequestId, VerificationRequest, VerificationResult};
use super::error::VerificationError;
use super::repository::{RepositoryError, RequestRepository, ResultRepository};

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

/// A request joined with every result recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetail {
    pub request: VerificationRequest,
    pub results: Vec<VerificationResult>,
}

/// Read-only views used by the dashboard.
pub struct VerificationQueries {
    requests: Arc<dyn RequestRepository>,
    results: Arc<dyn ResultRepository>,
}

impl VerificationQueries {
    pub fn new(requests: Arc<dyn RequestRepository>, results: Arc<dyn ResultRepository>) -> Self {
        Self { requests, results }
    }

    pub fn recent(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<VerificationRequest>, VerificationError> {
        let limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        Ok(self.requests.recent(limit)?)
    }

    pub fn detail(&self, id: &RequestId) -> Result<RequestDetail, VerificationError> {
        let request = self.requests.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        let results = self.results.for_request(&request.id)?;
        Ok(RequestDetail { request, results })
    }
}
