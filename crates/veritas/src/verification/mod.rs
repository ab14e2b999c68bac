//! Background-verification requests submitted to the provider over SOAP, and the
//! asynchronous callbacks that carry their results back.
//!
//! Submission and callback handling never share process memory: the only link
//! between them is the stored request, found again by its remote request id.

pub mod callback;
pub mod codec;
pub mod domain;
pub mod error;
pub mod mapping;
pub mod probe;
pub mod query;
pub mod repository;
pub mod router;
pub mod submission;
pub mod transport;

#[cfg(test)]
mod tests;

pub use callback::{CallbackCorrelator, CallbackDelivery, CallbackOutcome};
pub use domain::{
    ExtendedInfo, RemoteRequestId, RequestId, RequestStatus, ResultId, SubjectDetails,
    SubmissionDetails, SubmissionReceipt, VerificationRequest, VerificationResult,
};
pub use error::VerificationError;
pub use probe::{DiagnosticsProbe, ProbeReport};
pub use query::{RequestDetail, VerificationQueries};
pub use repository::{
    DocumentStore, DocumentStoreError, RepositoryError, RequestRepository, ResultRepository,
};
pub use router::{verification_router, VerificationServices};
pub use submission::SubmissionOrchestrator;
pub use transport::{HttpProviderTransport, ProviderResponse, ProviderTransport, TransportError};
