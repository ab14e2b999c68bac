use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::codec::{self, ProviderReply, ITEM_TYPES_RESULT_TAG};
use super::error::VerificationError;
use super::transport::ProviderTransport;
use crate::config::ProviderConfig;

/// Result of a successful connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub message: String,
    pub endpoint: String,
    pub raw_response: String,
}

/// Stateless `ksoGetItemTypes` ping of the provider.
pub struct DiagnosticsProbe {
    transport: Arc<dyn ProviderTransport>,
    provider: ProviderConfig,
}

impl DiagnosticsProbe {
    pub fn new(transport: Arc<dyn ProviderTransport>, provider: ProviderConfig) -> Self {
        Self {
            transport,
            provider,
        }
    }

    pub fn run(&self) -> Result<ProbeReport, VerificationError> {
        let credentials = self.provider.credentials.as_ref().ok_or_else(|| {
            VerificationError::Configuration("provider credentials not configured".to_string())
        })?;

        let endpoint = self.provider.probe_endpoint.as_str();
        info!(%endpoint, "testing provider connection");

        let envelope = codec::item_types_envelope(credentials, &self.provider.source);
        let response = self.transport.call(endpoint, &envelope)?;

        let outcome = match codec::interpret_reply(&response.body) {
            ProviderReply::Fault(reason) => Err(VerificationError::ProviderFault(reason)),
            ProviderReply::Empty => Err(VerificationError::ProviderUnavailable(
                "empty response from provider".to_string(),
            )),
            ProviderReply::Accepted if response.body.contains(ITEM_TYPES_RESULT_TAG) => {
                Ok(ProbeReport {
                    message: "provider connection successful".to_string(),
                    endpoint: endpoint.to_string(),
                    raw_response: response.body,
                })
            }
            ProviderReply::Accepted => Err(VerificationError::ProviderFault(format!(
                "unexpected response format from provider (HTTP {})",
                response.status
            ))),
        };

        if let Err(err) = &outcome {
            warn!(%endpoint, error = %err, "provider connection test failed");
        }
        outcome
    }
}
