use super::escape_text;
use super::lenient::first_tag;
use crate::config::SharedSecret;
use crate::verification::domain::VerificationRequest;
use crate::verification::mapping::provider_item_code;

const SERVICE_NAMESPACE: &str = "http://www.kroll.co.za/";
const ENTITY_KIND: &str = "PERSON";

/// Marker element of a successful `ksoGetItemTypes` reply.
pub const ITEM_TYPES_RESULT_TAG: &str = "ksoGetItemTypesResult";

/// Operations of the provider's request service used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapAction {
    PutRequest,
    GetItemTypes,
}

impl SoapAction {
    pub const fn operation(self) -> &'static str {
        match self {
            SoapAction::PutRequest => "ksoPutRequest",
            SoapAction::GetItemTypes => "ksoGetItemTypes",
        }
    }

    /// Value of the `SOAPAction` HTTP header.
    pub fn header_value(self) -> String {
        format!("{SERVICE_NAMESPACE}{}", self.operation())
    }
}

/// A ready-to-send SOAP 1.1 request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapEnvelope {
    pub action: SoapAction,
    pub body: String,
}

impl SoapEnvelope {
    pub const CONTENT_TYPE: &'static str = "text/xml; charset=utf-8";

    fn wrap(action: SoapAction, parameters: &[(&str, &str)]) -> Self {
        let mut params = String::new();
        for (name, document) in parameters {
            // Parameters carry whole XML documents as character data.
            params.push_str(&format!(
                "\n      <{name}>{}</{name}>",
                escape_text(document)
            ));
        }

        let operation = action.operation();
        let body = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <{operation} xmlns="{SERVICE_NAMESPACE}">{params}
    </{operation}>
  </soap:Body>
</soap:Envelope>"#
        );

        Self { action, body }
    }
}

/// Logon token document: `<xml><Token>..</Token></xml>`.
pub fn logon_document(credentials: &SharedSecret, source: &str) -> String {
    format!(
        "<xml><Token><UserName>{}</UserName><Password>{}</Password><Source>{}</Source></Token></xml>",
        escape_text(&credentials.username),
        escape_text(&credentials.password),
        escape_text(source),
    )
}

/// Request document describing the subject and one `Item` per verification type,
/// in submission order.
pub fn request_document(request: &VerificationRequest, source: &str) -> String {
    let subject = &request.subject;
    let client_key = escape_text(&subject.client_key);
    let remote = escape_text(request.remote_request_id.as_str());

    let mut items = String::new();
    for (index, kind) in request.verification_types.iter().enumerate() {
        items.push_str(&format!(
            "<Item><RemoteItemKey>{remote}_{index}</RemoteItemKey><ItemTypeCode>{}</ItemTypeCode><Indemnity>true</Indemnity><ItemInputGroupList/></Item>",
            escape_text(provider_item_code(kind)),
        ));
    }

    format!(
        "<xml><Request>\
         <ClientKey>{client_key}</ClientKey>\
         <AgentKey>{client_key}</AgentKey>\
         <AgentClient>{client_key}</AgentClient>\
         <RemoteRequest>{remote}</RemoteRequest>\
         <FirstNames>{}</FirstNames>\
         <Surname>{}</Surname>\
         <IdNumber>{}</IdNumber>\
         <DateOfBirth>{}</DateOfBirth>\
         <Source>{}</Source>\
         <EntityKind>{ENTITY_KIND}</EntityKind>\
         <ItemList>{items}</ItemList>\
         </Request></xml>",
        escape_text(&subject.first_name),
        escape_text(&subject.surname),
        escape_text(&subject.id_number),
        subject.date_of_birth.format("%Y-%m-%d"),
        escape_text(source),
    )
}

/// `ksoPutRequest` envelope for a stored request.
pub fn put_request_envelope(
    request: &VerificationRequest,
    credentials: &SharedSecret,
    source: &str,
) -> SoapEnvelope {
    let logon = logon_document(credentials, source);
    let document = request_document(request, source);
    SoapEnvelope::wrap(
        SoapAction::PutRequest,
        &[("aLogonXml", &logon), ("aRequestXml", &document)],
    )
}

/// `ksoGetItemTypes` envelope used by the diagnostics probe.
pub fn item_types_envelope(credentials: &SharedSecret, source: &str) -> SoapEnvelope {
    let logon = logon_document(credentials, source);
    SoapEnvelope::wrap(SoapAction::GetItemTypes, &[("aLogonXml", &logon)])
}

/// Classification of a synchronous provider reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderReply {
    Accepted,
    Fault(String),
    Empty,
}

/// A `Fault` element under any namespace prefix is a rejection; a blank body
/// is treated as no answer at all; everything else counts as accepted.
pub fn interpret_reply(body: &str) -> ProviderReply {
    if body.trim().is_empty() {
        return ProviderReply::Empty;
    }

    if body.contains(":Fault>") || body.contains("<Fault>") {
        let reason = first_tag(body, "faultstring")
            .map(|text| super::unescape_text(text.trim()).into_owned())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "Unknown SOAP error".to_string());
        return ProviderReply::Fault(reason);
    }

    ProviderReply::Accepted
}
