use super::codec::CodecError;
use super::domain::RemoteRequestId;
use super::repository::RepositoryError;
use super::transport::TransportError;

/// Failure taxonomy shared by the submission, callback, and diagnostics flows.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("SOAP Fault: {0}")]
    ProviderFault(String),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("malformed callback: {0}")]
    MalformedCallback(String),
    #[error("invalid callback credentials")]
    UnauthorizedCallback,
    #[error("request not found for remote ID: {0}")]
    CorrelationMiss(RemoteRequestId),
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),
}

impl VerificationError {
    pub const fn kind(&self) -> &'static str {
        match self {
            VerificationError::Validation(_) => "validation_error",
            VerificationError::Configuration(_) => "configuration_error",
            VerificationError::ProviderFault(_) => "provider_fault",
            VerificationError::ProviderUnavailable(_) => "provider_unavailable",
            VerificationError::MalformedCallback(_) => "malformed_callback",
            VerificationError::UnauthorizedCallback => "unauthorized_callback",
            VerificationError::CorrelationMiss(_) => "correlation_miss",
            VerificationError::Persistence(_) => "persistence_error",
        }
    }
}

impl From<CodecError> for VerificationError {
    fn from(err: CodecError) -> Self {
        Self::MalformedCallback(err.to_string())
    }
}

impl From<TransportError> for VerificationError {
    fn from(err: TransportError) -> Self {
        Self::ProviderUnavailable(err.to_string())
    }
}
