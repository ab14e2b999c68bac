use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::codec::{self, ProviderReply};
use super::domain::{
    RemoteRequestId, RequestId, RequestStatus, SubmissionDetails, SubmissionReceipt,
    VerificationRequest,
};
use super::error::VerificationError;
use super::repository::RequestRepository;
use super::transport::{ProviderResponse, ProviderTransport};
use crate::config::ProviderConfig;

/// Creates verification requests and hands them to the provider.
///
/// A request is stored as `processing` before the provider is contacted, so every
/// attempt leaves a row behind even if the process dies mid-call. An accepted
/// submission stays `processing` until a callback completes it.
pub struct SubmissionOrchestrator {
    requests: Arc<dyn RequestRepository>,
    transport: Arc<dyn ProviderTransport>,
    provider: ProviderConfig,
}

impl SubmissionOrchestrator {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        transport: Arc<dyn ProviderTransport>,
        provider: ProviderConfig,
    ) -> Self {
        Self {
            requests,
            transport,
            provider,
        }
    }

    /// Blocks for at most the configured provider timeout.
    pub fn submit(
        &self,
        details: SubmissionDetails,
    ) -> Result<SubmissionReceipt, VerificationError> {
        let submission = details.validate()?;
        let credentials = self.provider.credentials.as_ref().ok_or_else(|| {
            VerificationError::Configuration("provider credentials not configured".to_string())
        })?;

        let now = Utc::now();
        let request =
            VerificationRequest::processing(submission, RemoteRequestId::generate(now), now);
        let stored = self.requests.insert(request)?;

        info!(
            request_id = %stored.id,
            remote_request_id = %stored.remote_request_id,
            types = ?stored.verification_types,
            "submitting verification request"
        );

        let envelope = codec::put_request_envelope(&stored, credentials, &self.provider.source);
        let outcome = self
            .transport
            .call(&self.provider.endpoint, &envelope)
            .map_err(VerificationError::from)
            .and_then(|response| interpret_acknowledgement(&response));

        match outcome {
            Ok(()) => {
                info!(
                    request_id = %stored.id,
                    remote_request_id = %stored.remote_request_id,
                    "provider accepted verification request"
                );
                Ok(SubmissionReceipt {
                    request_id: stored.id,
                    remote_request_id: stored.remote_request_id,
                })
            }
            Err(err) => {
                warn!(
                    request_id = %stored.id,
                    remote_request_id = %stored.remote_request_id,
                    error = %err,
                    "verification submission failed"
                );
                self.mark_failed(&stored.id);
                Err(err)
            }
        }
    }

    fn mark_failed(&self, id: &RequestId) {
        if let Err(err) = self
            .requests
            .update_status(id, RequestStatus::Failed, Utc::now())
        {
            warn!(request_id = %id, error = %err, "unable to mark request as failed");
        }
    }
}

fn interpret_acknowledgement(response: &ProviderResponse) -> Result<(), VerificationError> {
    match codec::interpret_reply(&response.body) {
        ProviderReply::Fault(reason) => Err(VerificationError::ProviderFault(reason)),
        ProviderReply::Empty => Err(VerificationError::ProviderUnavailable(
            "empty response from provider".to_string(),
        )),
        ProviderReply::Accepted if !response.is_success() => {
            Err(VerificationError::ProviderUnavailable(format!(
                "provider returned HTTP {} without a SOAP fault",
                response.status
            )))
        }
        ProviderReply::Accepted => Ok(()),
    }
}
