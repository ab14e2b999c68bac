use crate::infra::{InMemoryRequestRepository, InMemoryResultRepository, LocalDocumentStore};
use clap::Args;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use veritas::config::{CallbackConfig, DocumentStoreConfig, ProviderConfig, SharedSecret};
use veritas::error::AppError;
use veritas::verification::codec::{escape_text, SoapEnvelope};
use veritas::verification::mapping::provider_item_code;
use veritas::verification::{
    CallbackDelivery, ProviderResponse, ProviderTransport, SubmissionDetails, TransportError,
    VerificationServices,
};

const DEMO_CALLBACK_USER: &str = "demo-callback";
const DEMO_CALLBACK_PASS: &str = "demo-callback-pass";

/// `%PDF-1.4\n`
const DEMO_REPORT_BASE64: &str = "JVBERi0xLjQK";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Subject first names
    #[arg(long, default_value = "Jane")]
    pub(crate) first_name: String,
    /// Subject surname
    #[arg(long, default_value = "Doe")]
    pub(crate) surname: String,
    /// National identity number
    #[arg(long, default_value = "8001015009087")]
    pub(crate) id_number: String,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long, default_value = "1980-01-01")]
    pub(crate) date_of_birth: String,
    /// Client key sent to the provider
    #[arg(long, default_value = "45149")]
    pub(crate) client_key: String,
    /// Verification types to request; repeat the flag for several
    #[arg(long = "type", default_value = "IDENTITY")]
    pub(crate) types: Vec<String>,
    /// Directory for extracted report documents (defaults to a temp directory)
    #[arg(long)]
    pub(crate) documents_dir: Option<PathBuf>,
    /// Print the SOAP envelope sent to the provider
    #[arg(long)]
    pub(crate) show_envelope: bool,
}

/// Stands in for the provider: accepts every request and keeps the envelopes.
#[derive(Default)]
struct LoopbackProvider {
    sent: Mutex<Vec<SoapEnvelope>>,
}

impl LoopbackProvider {
    fn last_envelope(&self) -> Option<SoapEnvelope> {
        self.sent.lock().ok().and_then(|sent| sent.last().cloned())
    }
}

impl ProviderTransport for LoopbackProvider {
    fn call(
        &self,
        _endpoint: &str,
        envelope: &SoapEnvelope,
    ) -> Result<ProviderResponse, TransportError> {
        self.sent
            .lock()
            .map_err(|_| TransportError::new("transport", "loopback state poisoned"))?
            .push(envelope.clone());
        Ok(ProviderResponse {
            status: 200,
            body: format!(
                "<soap:Envelope><soap:Body><{op}Response><{op}Result>{}</{op}Result></{op}Response></soap:Body></soap:Envelope>",
                escape_text("<xml><status>0</status></xml>"),
                op = envelope.action.operation(),
            ),
        })
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        first_name,
        surname,
        id_number,
        date_of_birth,
        client_key,
        types,
        documents_dir,
        show_envelope,
    } = args;

    let documents_dir =
        documents_dir.unwrap_or_else(|| std::env::temp_dir().join("veritas-demo-reports"));
    let provider = Arc::new(LoopbackProvider::default());
    let documents = Arc::new(LocalDocumentStore::new(&DocumentStoreConfig {
        directory: documents_dir.clone(),
        public_base_url: format!("file://{}", documents_dir.display()),
    }));
    let services = VerificationServices::assemble(
        ProviderConfig {
            endpoint: "loopback://provider".to_string(),
            probe_endpoint: "loopback://provider".to_string(),
            credentials: Some(SharedSecret::new("demo-agent", "demo-agent-pass")),
            ..ProviderConfig::default()
        },
        CallbackConfig {
            credentials: Some(SharedSecret::new(DEMO_CALLBACK_USER, DEMO_CALLBACK_PASS)),
            ..CallbackConfig::default()
        },
        Arc::new(InMemoryRequestRepository::default()),
        Arc::new(InMemoryResultRepository::default()),
        documents,
        provider.clone(),
    );

    println!("Verification round-trip demo (loopback provider)");
    let receipt = services.submissions.submit(SubmissionDetails {
        client_key,
        first_name,
        surname,
        id_number,
        date_of_birth,
        verification_types: types.clone(),
        additional_notes: Some("cli demo".to_string()),
    })?;
    println!(
        "- Submitted request {} (remote {})",
        receipt.request_id, receipt.remote_request_id
    );
    for kind in &types {
        println!("  {kind} -> provider item {}", provider_item_code(kind.trim()));
    }

    if let Some(envelope) = provider.last_envelope().filter(|_| show_envelope) {
        println!(
            "\nSOAP envelope ({}):\n{}",
            envelope.action.operation(),
            envelope.body
        );
    }

    let callback_xml = synthesize_callback(receipt.remote_request_id.as_str(), &types);
    let ack = services.callbacks.handle(CallbackDelivery {
        username: Some(DEMO_CALLBACK_USER.to_string()),
        password: Some(DEMO_CALLBACK_PASS.to_string()),
        system_id: Some("DEMO".to_string()),
        xml: Some(callback_xml),
    });
    println!("\nCallback acknowledgement:\n{}", ack.to_xml());

    let detail = services.queries.detail(&receipt.request_id)?;
    println!(
        "\nRequest {} is now {} with {} result(s)",
        detail.request.id,
        detail.request.status.label(),
        detail.results.len()
    );
    for result in &detail.results {
        println!(
            "  - {}: {} ({})",
            result.verification_type,
            result.result_code.as_deref().unwrap_or("-"),
            result.pdf_report_url.as_deref().unwrap_or("no report")
        );
    }

    Ok(())
}

/// Builds the callback the provider would post once every item is finished.
/// Only the first item carries a report document.
fn synthesize_callback(remote_request_id: &str, types: &[String]) -> String {
    let mut blocks = String::new();
    for (index, kind) in types.iter().enumerate() {
        let document = if index == 0 {
            format!("<crd_file><document>{DEMO_REPORT_BASE64}</document></crd_file>")
        } else {
            String::new()
        };
        blocks.push_str(&format!(
            "<crd_credential><crd_type>{}</crd_type><crd_resultcode>PASS</crd_resultcode>\
             <crd_resultdesc>Demo result</crd_resultdesc><crd_supplier>Loopback</crd_supplier>\
             <crd_risk>LOW</crd_risk>{document}</crd_credential>",
            escape_text(provider_item_code(kind.trim()))
        ));
    }

    format!(
        "<?xml version=\"1.0\" standalone=\"yes\"?><xml><inq_key>DEMO-1</inq_key>\
         <inq_rmtkey>{}</inq_rmtkey>{blocks}</xml>",
        escape_text(remote_request_id)
    )
}
