use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use mime::Mime;
use serde_json::Value;

use crate::config::{CallbackConfig, ProviderConfig, SharedSecret};
use crate::verification::callback::{CallbackCorrelator, CallbackDelivery};
use crate::verification::codec::SoapEnvelope;
use crate::verification::domain::{
    RemoteRequestId, RequestId, RequestStatus, SubmissionDetails, VerificationRequest,
    VerificationResult,
};
use crate::verification::repository::{
    DocumentStore, DocumentStoreError, RepositoryError, RequestRepository, ResultRepository,
};
use crate::verification::router::VerificationServices;
use crate::verification::submission::SubmissionOrchestrator;
use crate::verification::transport::{ProviderResponse, ProviderTransport, TransportError};

pub(super) const CALLBACK_USER: &str = "mie-callback";
pub(super) const CALLBACK_PASS: &str = "s3cret";

pub(super) const ACCEPTED_REPLY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ksoPutRequestResponse xmlns="http://www.kroll.co.za/">
      <ksoPutRequestResult>&lt;xml&gt;&lt;status&gt;0&lt;/status&gt;&lt;/xml&gt;</ksoPutRequestResult>
    </ksoPutRequestResponse>
  </soap:Body>
</soap:Envelope>"#;

pub(super) const FAULT_REPLY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Invalid client key</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

/// `%PDF-1.4\n`
pub(super) const PDF_BASE64: &str = "JVBERi0xLjQK";

pub(super) fn details() -> SubmissionDetails {
    SubmissionDetails {
        client_key: "45149".to_string(),
        first_name: "Jane".to_string(),
        surname: "Doe".to_string(),
        id_number: "8001015009087".to_string(),
        date_of_birth: "1980-01-01".to_string(),
        verification_types: vec!["IDENTITY".to_string()],
        additional_notes: None,
    }
}

pub(super) fn provider_config() -> ProviderConfig {
    ProviderConfig {
        endpoint: "https://provider.test/epcvrequest.asmx".to_string(),
        probe_endpoint: "https://provider.test/epcvrequest.asmx".to_string(),
        credentials: Some(SharedSecret::new("agent", "agent-pass")),
        ..ProviderConfig::default()
    }
}

pub(super) fn callback_config() -> CallbackConfig {
    CallbackConfig {
        credentials: Some(SharedSecret::new(CALLBACK_USER, CALLBACK_PASS)),
        ..CallbackConfig::default()
    }
}

/// One credential block of a synthesized callback.
pub(super) struct Block<'a> {
    pub(super) kind: &'a str,
    pub(super) code: &'a str,
    pub(super) document: Option<&'a str>,
}

pub(super) fn callback_xml(remote_request_id: &str, blocks: &[Block<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" standalone=\"yes\"?>\n<xml>\n  <inq_key>777001</inq_key>\n  <inq_rmtkey>{remote_request_id}</inq_rmtkey>\n"
    );
    for block in blocks {
        xml.push_str("  <crd_credential>\n");
        xml.push_str(&format!("    <crd_type>{}</crd_type>\n", block.kind));
        xml.push_str(&format!("    <crd_resultcode>{}</crd_resultcode>\n", block.code));
        xml.push_str("    <crd_supplier>Home Affairs</crd_supplier>\n");
        if let Some(document) = block.document {
            xml.push_str(&format!(
                "    <crd_file><document>{document}</document></crd_file>\n"
            ));
        }
        xml.push_str("  </crd_credential>\n");
    }
    xml.push_str("</xml>");
    xml
}

pub(super) fn delivery(username: &str, password: &str, xml: String) -> CallbackDelivery {
    CallbackDelivery {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        system_id: Some("KMIE".to_string()),
        xml: Some(xml),
    }
}

pub(super) fn authorized(xml: String) -> CallbackDelivery {
    delivery(CALLBACK_USER, CALLBACK_PASS, xml)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRequests {
    pub(super) rows: Arc<Mutex<Vec<VerificationRequest>>>,
}

impl MemoryRequests {
    pub(super) fn all(&self) -> Vec<VerificationRequest> {
        self.rows.lock().expect("request mutex poisoned").clone()
    }

    pub(super) fn only(&self) -> VerificationRequest {
        let rows = self.all();
        assert_eq!(rows.len(), 1, "expected exactly one stored request");
        rows.into_iter().next().expect("one request")
    }
}

impl RequestRepository for MemoryRequests {
    fn insert(&self, request: VerificationRequest) -> Result<VerificationRequest, RepositoryError> {
        let mut guard = self.rows.lock().expect("request mutex poisoned");
        if guard.iter().any(|row| {
            row.id == request.id || row.remote_request_id == request.remote_request_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(request.clone());
        Ok(request)
    }

    fn update_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("request mutex poisoned");
        let row = guard
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.status = status;
        row.updated_at = at;
        Ok(())
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<VerificationRequest>, RepositoryError> {
        let guard = self.rows.lock().expect("request mutex poisoned");
        Ok(guard.iter().find(|row| &row.id == id).cloned())
    }

    fn find_by_remote_id(
        &self,
        remote_request_id: &RemoteRequestId,
    ) -> Result<Option<VerificationRequest>, RepositoryError> {
        let guard = self.rows.lock().expect("request mutex poisoned");
        Ok(guard
            .iter()
            .find(|row| &row.remote_request_id == remote_request_id)
            .cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<VerificationRequest>, RepositoryError> {
        let mut rows = self.all();
        rows.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryResults {
    pub(super) rows: Arc<Mutex<Vec<VerificationResult>>>,
}

impl MemoryResults {
    pub(super) fn all(&self) -> Vec<VerificationResult> {
        self.rows.lock().expect("result mutex poisoned").clone()
    }
}

impl ResultRepository for MemoryResults {
    fn insert_batch(&self, results: Vec<VerificationResult>) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .expect("result mutex poisoned")
            .extend(results);
        Ok(())
    }

    fn for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<VerificationResult>, RepositoryError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|row| &row.request_id == request_id)
            .collect())
    }
}

pub(super) struct UnavailableResults;

impl ResultRepository for UnavailableResults {
    fn insert_batch(&self, _results: Vec<VerificationResult>) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("results table offline".to_string()))
    }

    fn for_request(
        &self,
        _request_id: &RequestId,
    ) -> Result<Vec<VerificationResult>, RepositoryError> {
        Err(RepositoryError::Unavailable("results table offline".to_string()))
    }
}

pub(super) struct UnavailableRequests;

impl RequestRepository for UnavailableRequests {
    fn insert(&self, _request: VerificationRequest) -> Result<VerificationRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("requests table offline".to_string()))
    }

    fn update_status(
        &self,
        _id: &RequestId,
        _status: RequestStatus,
        _at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("requests table offline".to_string()))
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<VerificationRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("requests table offline".to_string()))
    }

    fn find_by_remote_id(
        &self,
        _remote_request_id: &RemoteRequestId,
    ) -> Result<Option<VerificationRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("requests table offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<VerificationRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("requests table offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDocuments {
    pub(super) objects: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
}

impl MemoryDocuments {
    pub(super) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .lock()
            .expect("document mutex poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl DocumentStore for MemoryDocuments {
    fn put(
        &self,
        filename: &str,
        bytes: &[u8],
        content_type: &Mime,
    ) -> Result<String, DocumentStoreError> {
        let mut guard = self.objects.lock().expect("document mutex poisoned");
        if guard.contains_key(filename) {
            return Err(DocumentStoreError::Conflict(filename.to_string()));
        }
        guard.insert(
            filename.to_string(),
            (bytes.to_vec(), content_type.to_string()),
        );
        Ok(format!("https://files.test/reports/{filename}"))
    }
}

pub(super) struct BrokenDocuments;

impl DocumentStore for BrokenDocuments {
    fn put(
        &self,
        _filename: &str,
        _bytes: &[u8],
        _content_type: &Mime,
    ) -> Result<String, DocumentStoreError> {
        Err(DocumentStoreError::Backend("bucket unreachable".to_string()))
    }
}

/// Replies with a fixed outcome and records every envelope it was handed.
pub(super) struct ScriptedTransport {
    reply: Result<ProviderResponse, TransportError>,
    calls: Mutex<Vec<(String, SoapEnvelope)>>,
}

impl ScriptedTransport {
    pub(super) fn replying(status: u16, body: &str) -> Self {
        Self {
            reply: Ok(ProviderResponse {
                status,
                body: body.to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn accepting() -> Self {
        Self::replying(200, ACCEPTED_REPLY)
    }

    pub(super) fn failing(kind: &'static str) -> Self {
        Self {
            reply: Err(TransportError::new(kind, "simulated network failure")),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, SoapEnvelope)> {
        self.calls.lock().expect("transport mutex poisoned").clone()
    }
}

impl ProviderTransport for ScriptedTransport {
    fn call(
        &self,
        endpoint: &str,
        envelope: &SoapEnvelope,
    ) -> Result<ProviderResponse, TransportError> {
        self.calls
            .lock()
            .expect("transport mutex poisoned")
            .push((endpoint.to_string(), envelope.clone()));
        self.reply.clone()
    }
}

/// In-memory wiring of every service against one set of fakes.
pub(super) struct Harness {
    pub(super) requests: Arc<MemoryRequests>,
    pub(super) results: Arc<MemoryResults>,
    pub(super) documents: Arc<MemoryDocuments>,
    pub(super) transport: Arc<ScriptedTransport>,
    pub(super) services: VerificationServices,
}

impl Harness {
    pub(super) fn new(transport: ScriptedTransport) -> Self {
        let requests = Arc::new(MemoryRequests::default());
        let results = Arc::new(MemoryResults::default());
        let documents = Arc::new(MemoryDocuments::default());
        let transport = Arc::new(transport);
        let services = VerificationServices::assemble(
            provider_config(),
            callback_config(),
            requests.clone(),
            results.clone(),
            documents.clone(),
            transport.clone(),
        );
        Self {
            requests,
            results,
            documents,
            transport,
            services,
        }
    }

    pub(super) fn orchestrator(&self) -> &SubmissionOrchestrator {
        &self.services.submissions
    }

    pub(super) fn correlator(&self) -> &CallbackCorrelator {
        &self.services.callbacks
    }
}

pub(super) async fn read_body(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_str(&read_body(response).await).expect("json body")
}
