use std::io::Read;
use std::time::Duration;

use tracing::debug;

use super::codec::SoapEnvelope;

/// Upper bound on a provider reply body.
const MAX_REPLY_BYTES: u64 = 16 * 1024 * 1024;

/// Raw reply from the provider. Non-2xx replies are still returned because
/// SOAP faults arrive with HTTP 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Network failure before any reply was read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error calling provider: {detail}")]
pub struct TransportError {
    pub kind: &'static str,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Blocking round trip to the provider's SOAP endpoint.
pub trait ProviderTransport: Send + Sync {
    fn call(&self, endpoint: &str, envelope: &SoapEnvelope)
        -> Result<ProviderResponse, TransportError>;
}

/// `ureq` transport with connect/read/write bounded by the configured timeout.
#[derive(Debug)]
pub struct HttpProviderTransport {
    agent: ureq::Agent,
}

impl HttpProviderTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .timeout(timeout)
            .user_agent(concat!("veritas/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl ProviderTransport for HttpProviderTransport {
    fn call(
        &self,
        endpoint: &str,
        envelope: &SoapEnvelope,
    ) -> Result<ProviderResponse, TransportError> {
        let action = envelope.action.header_value();
        debug!(%endpoint, %action, "calling provider");

        let response = match self
            .agent
            .post(endpoint)
            .set("Content-Type", SoapEnvelope::CONTENT_TYPE)
            .set("SOAPAction", &action)
            .send_string(&envelope.body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                let detail = transport.to_string();
                let kind = classify_transport_error(&format!("{:?} {detail}", transport.kind()));
                return Err(TransportError::new(kind, detail));
            }
        };

        let status = response.status();
        let body = read_reply(response.into_reader(), MAX_REPLY_BYTES)?;

        debug!(status, bytes = body.len(), "provider replied");
        Ok(ProviderResponse { status, body })
    }
}

/// Reads at most `limit` bytes; a longer reply is an error rather than a silent cut.
fn read_reply(reader: impl Read, limit: u64) -> Result<String, TransportError> {
    let mut body = String::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_string(&mut body)
        .map_err(|err| {
            let detail = err.to_string();
            TransportError::new(classify_transport_error(&detail), detail)
        })?;

    if body.len() as u64 > limit {
        return Err(TransportError::new(
            "oversized",
            format!("provider reply exceeds {limit} bytes"),
        ));
    }
    Ok(body)
}

fn classify_transport_error(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}
