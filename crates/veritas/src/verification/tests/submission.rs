use super::common::*;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::verification::codec::SoapAction;
use crate::verification::domain::RequestStatus;
use crate::verification::error::VerificationError;
use crate::verification::submission::SubmissionOrchestrator;

#[test]
fn accepted_submission_stays_processing() {
    let harness = Harness::new(ScriptedTransport::accepting());

    let receipt = harness
        .orchestrator()
        .submit(details())
        .expect("provider accepts");

    let stored = harness.requests.only();
    assert_eq!(stored.id, receipt.request_id);
    assert_eq!(stored.remote_request_id, receipt.remote_request_id);
    assert_eq!(stored.status, RequestStatus::Processing);
    assert_eq!(stored.subject.surname, "Doe");
    assert!(stored.remote_request_id.as_str().starts_with("REQ_"));
}

#[test]
fn envelope_carries_remote_id_and_mapped_item_codes() {
    let harness = Harness::new(ScriptedTransport::accepting());
    let mut submission = details();
    submission.verification_types = vec!["IDENTITY".to_string(), "CRIMINAL".to_string()];

    let receipt = harness.orchestrator().submit(submission).expect("accepted");

    let calls = harness.transport.calls();
    assert_eq!(calls.len(), 1);
    let (endpoint, envelope) = &calls[0];
    assert_eq!(endpoint, "https://provider.test/epcvrequest.asmx");
    assert_eq!(envelope.action, SoapAction::PutRequest);
    assert!(envelope.body.contains(receipt.remote_request_id.as_str()));
    assert!(envelope.body.contains("&lt;ItemTypeCode&gt;ID&lt;/ItemTypeCode&gt;"));
    assert!(envelope.body.contains("&lt;ItemTypeCode&gt;CIT&lt;/ItemTypeCode&gt;"));
}

#[test]
fn invalid_submission_never_reaches_storage_or_network() {
    let harness = Harness::new(ScriptedTransport::accepting());
    let mut submission = details();
    submission.verification_types.clear();

    let err = harness
        .orchestrator()
        .submit(submission)
        .expect_err("empty type list rejected");

    assert!(matches!(err, VerificationError::Validation(_)));
    assert!(harness.requests.all().is_empty());
    assert!(harness.transport.calls().is_empty());
}

#[test]
fn unparseable_birth_date_is_a_validation_error() {
    let harness = Harness::new(ScriptedTransport::accepting());
    let mut submission = details();
    submission.date_of_birth = "01/01/1980".to_string();

    let err = harness
        .orchestrator()
        .submit(submission)
        .expect_err("bad date rejected");

    assert_eq!(err.kind(), "validation_error");
    assert!(harness.transport.calls().is_empty());
}

#[test]
fn soap_fault_marks_request_failed() {
    let harness = Harness::new(ScriptedTransport::replying(500, FAULT_REPLY));

    let err = harness
        .orchestrator()
        .submit(details())
        .expect_err("fault surfaces");

    assert_eq!(err.to_string(), "SOAP Fault: Invalid client key");
    assert_eq!(harness.requests.only().status, RequestStatus::Failed);
}

#[test]
fn network_failure_marks_request_failed() {
    let harness = Harness::new(ScriptedTransport::failing("timeout"));

    let err = harness
        .orchestrator()
        .submit(details())
        .expect_err("timeout surfaces");

    assert!(matches!(err, VerificationError::ProviderUnavailable(_)));
    assert!(err.to_string().contains("timeout"));
    assert_eq!(harness.requests.only().status, RequestStatus::Failed);
}

#[test]
fn empty_reply_is_unavailable() {
    let harness = Harness::new(ScriptedTransport::replying(200, "   "));

    let err = harness
        .orchestrator()
        .submit(details())
        .expect_err("blank reply rejected");

    assert_eq!(err.kind(), "provider_unavailable");
    assert_eq!(harness.requests.only().status, RequestStatus::Failed);
}

#[test]
fn non_success_status_without_fault_is_unavailable() {
    let harness = Harness::new(ScriptedTransport::replying(
        503,
        "<html>Service Unavailable</html>",
    ));

    let err = harness
        .orchestrator()
        .submit(details())
        .expect_err("gateway error rejected");

    assert_eq!(err.kind(), "provider_unavailable");
    assert!(err.to_string().contains("503"));
}

#[test]
fn missing_credentials_fail_before_storage() {
    let requests = Arc::new(MemoryRequests::default());
    let transport = Arc::new(ScriptedTransport::accepting());
    let orchestrator =
        SubmissionOrchestrator::new(requests.clone(), transport.clone(), ProviderConfig::default());

    let err = orchestrator
        .submit(details())
        .expect_err("unconfigured provider");

    assert_eq!(err.kind(), "configuration_error");
    assert!(requests.all().is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn storage_failure_skips_the_provider() {
    let transport = Arc::new(ScriptedTransport::accepting());
    let orchestrator = SubmissionOrchestrator::new(
        Arc::new(UnavailableRequests),
        transport.clone(),
        provider_config(),
    );

    let err = orchestrator
        .submit(details())
        .expect_err("storage offline");

    assert_eq!(err.kind(), "persistence_error");
    assert!(transport.calls().is_empty());
}

#[test]
fn each_submission_gets_its_own_remote_id() {
    let harness = Harness::new(ScriptedTransport::accepting());

    let first = harness.orchestrator().submit(details()).expect("first");
    let second = harness.orchestrator().submit(details()).expect("second");

    assert_ne!(first.request_id, second.request_id);
    assert_ne!(first.remote_request_id, second.remote_request_id);
    assert_eq!(harness.requests.all().len(), 2);
}
