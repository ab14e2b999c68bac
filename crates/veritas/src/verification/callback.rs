use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use super::codec::{self, CallbackAck, CredentialBlock, EmbeddedDocument};
use super::domain::{
    ExtendedInfo, RemoteRequestId, RequestId, RequestStatus, ResultId, VerificationRequest,
    VerificationResult,
};
use super::error::VerificationError;
use super::repository::{DocumentStore, RequestRepository, ResultRepository};
use crate::config::{CallbackConfig, SharedSecret};

/// Form fields of a provider callback POST.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackDelivery {
    #[serde(rename = "kmieUser", default)]
    pub username: Option<String>,
    #[serde(rename = "kmiePass", default)]
    pub password: Option<String>,
    #[serde(rename = "kmieSys", default)]
    pub system_id: Option<String>,
    #[serde(rename = "kmieXml", default)]
    pub xml: Option<String>,
}

/// Summary of a processed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub request_id: RequestId,
    pub remote_request_id: RemoteRequestId,
    pub results_stored: usize,
    pub documents_stored: usize,
    pub status: RequestStatus,
}

/// Matches provider callbacks to stored requests and records their results.
pub struct CallbackCorrelator {
    requests: Arc<dyn RequestRepository>,
    results: Arc<dyn ResultRepository>,
    documents: Arc<dyn DocumentStore>,
    expected: Option<SharedSecret>,
}

impl CallbackCorrelator {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        results: Arc<dyn ResultRepository>,
        documents: Arc<dyn DocumentStore>,
        config: CallbackConfig,
    ) -> Self {
        Self {
            requests,
            results,
            documents,
            expected: config.credentials,
        }
    }

    /// Processes a delivery and always produces an acknowledgement for the provider.
    pub fn handle(&self, delivery: CallbackDelivery) -> CallbackAck {
        match self.process(delivery) {
            Ok(_) => CallbackAck::success(),
            Err(err) => acknowledgement_for(&err),
        }
    }

    pub fn process(
        &self,
        delivery: CallbackDelivery,
    ) -> Result<CallbackOutcome, VerificationError> {
        info!(
            system_id = delivery.system_id.as_deref().unwrap_or("-"),
            xml_len = delivery.xml.as_ref().map(String::len).unwrap_or(0),
            "received provider callback"
        );

        self.authenticate(&delivery)?;

        let xml = delivery.xml.as_deref().unwrap_or_default();
        let payload = codec::decode_callback(xml).map_err(|err| {
            warn!(error = %err, "rejecting undecodable callback");
            VerificationError::from(err)
        })?;

        let remote_request_id = RemoteRequestId(payload.remote_request_id);
        let request = self
            .requests
            .find_by_remote_id(&remote_request_id)?
            .ok_or_else(|| {
                warn!(%remote_request_id, "callback does not match any request");
                VerificationError::CorrelationMiss(remote_request_id.clone())
            })?;

        let completed_at = Utc::now();
        let mut clock = FilenameClock::default();
        let mut documents_stored = 0;
        let rows: Vec<VerificationResult> = payload
            .credentials
            .into_iter()
            .map(|block| {
                let url = self.store_document(&request, &block, &mut clock);
                if url.is_some() {
                    documents_stored += 1;
                }
                result_row(&request, &payload.inquiry_key, block, url, completed_at)
            })
            .collect();
        let results_stored = rows.len();

        if !rows.is_empty() {
            self.results.insert_batch(rows).map_err(|err| {
                error!(
                    request_id = %request.id,
                    error = %err,
                    "failed to persist callback results"
                );
                VerificationError::from(err)
            })?;
        }

        let status = self.complete(&request, completed_at);

        info!(
            request_id = %request.id,
            %remote_request_id,
            results = results_stored,
            documents = documents_stored,
            status = status.label(),
            "callback processed"
        );

        Ok(CallbackOutcome {
            request_id: request.id,
            remote_request_id,
            results_stored,
            documents_stored,
            status,
        })
    }

    /// Fails closed: without configured credentials nothing authenticates.
    fn authenticate(&self, delivery: &CallbackDelivery) -> Result<(), VerificationError> {
        let Some(expected) = self.expected.as_ref() else {
            error!("callback credentials not configured; rejecting callback");
            return Err(VerificationError::UnauthorizedCallback);
        };

        let username = delivery.username.as_deref().unwrap_or_default();
        let password = delivery.password.as_deref().unwrap_or_default();
        // Both comparisons always run.
        let user_ok = username.as_bytes().ct_eq(expected.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(expected.password.as_bytes());
        if bool::from(user_ok & pass_ok) {
            Ok(())
        } else {
            warn!("invalid callback credentials");
            Err(VerificationError::UnauthorizedCallback)
        }
    }

    /// Never fails the callback; a lost document only costs its URL.
    fn store_document(
        &self,
        request: &VerificationRequest,
        block: &CredentialBlock,
        clock: &mut FilenameClock,
    ) -> Option<String> {
        let bytes = match block.document.as_ref()? {
            EmbeddedDocument::Decoded(bytes) => bytes,
            EmbeddedDocument::Corrupt(reason) => {
                warn!(
                    request_id = %request.id,
                    verification_type = %block.verification_type,
                    %reason,
                    "skipping undecodable report document"
                );
                return None;
            }
        };

        let filename = codec::document_filename(
            request.remote_request_id.as_str(),
            &block.verification_type,
            clock.tick(),
        );
        match self.documents.put(&filename, bytes, &mime::APPLICATION_PDF) {
            Ok(url) => {
                info!(request_id = %request.id, %filename, "stored report document");
                Some(url)
            }
            Err(err) => {
                warn!(
                    request_id = %request.id,
                    %filename,
                    error = %err,
                    "report document upload failed"
                );
                None
            }
        }
    }

    /// Failures here are logged only; stored results stay visible.
    fn complete(&self, request: &VerificationRequest, at: DateTime<Utc>) -> RequestStatus {
        if !request.status.can_transition_to(RequestStatus::Completed) {
            warn!(
                request_id = %request.id,
                status = request.status.label(),
                "callback received for request that cannot complete; status left unchanged"
            );
            return request.status;
        }

        match self
            .requests
            .update_status(&request.id, RequestStatus::Completed, at)
        {
            Ok(()) => RequestStatus::Completed,
            Err(err) => {
                error!(
                    request_id = %request.id,
                    error = %err,
                    "results stored but request status update failed"
                );
                request.status
            }
        }
    }
}

/// Maps a callback failure to the provider-facing acknowledgement. Authentication
/// failures carry no detail.
pub fn acknowledgement_for(err: &VerificationError) -> CallbackAck {
    match err {
        VerificationError::UnauthorizedCallback => CallbackAck::failure("Unauthorized"),
        other => CallbackAck::failure(other),
    }
}

fn result_row(
    request: &VerificationRequest,
    inquiry_key: &str,
    block: CredentialBlock,
    pdf_report_url: Option<String>,
    completed_at: DateTime<Utc>,
) -> VerificationResult {
    VerificationResult {
        id: ResultId::generate(),
        request_id: request.id.clone(),
        verification_type: block.verification_type,
        result_code: block.result_code,
        result_description: block.result_description,
        supplier: block.supplier,
        risk_level: block.risk_level,
        extended_info: ExtendedInfo {
            inquiry_key: inquiry_key.to_string(),
            raw_credential: block.raw,
        },
        pdf_report_url,
        completed_at,
    }
}

/// Hands out strictly increasing timestamps so two documents of the same type in
/// one callback never share a filename.
#[derive(Debug, Default)]
struct FilenameClock {
    last: Option<DateTime<Utc>>,
}

impl FilenameClock {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}
