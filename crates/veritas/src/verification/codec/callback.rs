use super::document::{decode_document, EmbeddedDocument};
use super::lenient::{first_tag, optional_value, tag_blocks};
use super::{unescape_text, CodecError};

const INQUIRY_KEY_TAG: &str = "inq_key";
const REMOTE_KEY_TAG: &str = "inq_rmtkey";
const CREDENTIAL_TAG: &str = "crd_credential";

/// Label stored when a credential block does not say what it verified.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Structured view of a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub inquiry_key: String,
    pub remote_request_id: String,
    pub credentials: Vec<CredentialBlock>,
}

/// One `<crd_credential>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBlock {
    pub verification_type: String,
    pub result_code: Option<String>,
    pub result_description: Option<String>,
    pub supplier: Option<String>,
    pub risk_level: Option<String>,
    /// Block content exactly as received, kept for audit.
    pub raw: String,
    pub document: Option<EmbeddedDocument>,
}

impl CredentialBlock {
    fn decode(raw: &str) -> Self {
        let field =
            |tag: &str| optional_value(raw, tag).map(|value| unescape_text(value).into_owned());

        Self {
            verification_type: field("crd_type").unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            result_code: field("crd_resultcode"),
            result_description: field("crd_resultdesc"),
            supplier: field("crd_supplier"),
            risk_level: field("crd_risk"),
            raw: raw.to_string(),
            document: decode_document(raw),
        }
    }
}

/// Decodes a callback body.
///
/// Only the inquiry key and remote key are mandatory. A body with no credential
/// blocks decodes to an empty list; a bad document inside one block is recorded on
/// that block and never fails the callback.
pub fn decode_callback(xml: &str) -> Result<CallbackPayload, CodecError> {
    if xml.trim().is_empty() {
        return Err(CodecError::EmptyPayload);
    }

    let inquiry_key = required_key(xml, INQUIRY_KEY_TAG)?;
    let remote_request_id = required_key(xml, REMOTE_KEY_TAG)?;

    let credentials = tag_blocks(xml, CREDENTIAL_TAG)
        .into_iter()
        .map(CredentialBlock::decode)
        .collect();

    Ok(CallbackPayload {
        inquiry_key,
        remote_request_id,
        credentials,
    })
}

fn required_key(xml: &str, tag: &'static str) -> Result<String, CodecError> {
    first_tag(xml, tag)
        .map(|value| unescape_text(value.trim()).into_owned())
        .filter(|value| !value.is_empty())
        .ok_or(CodecError::MissingElement(tag))
}
