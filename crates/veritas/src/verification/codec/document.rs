use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, Utc};

use super::lenient::first_tag;

/// Binary report attached to a credential block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedDocument {
    Decoded(Vec<u8>),
    /// The payload was present but could not be decoded; holds the reason.
    Corrupt(String),
}

impl EmbeddedDocument {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            EmbeddedDocument::Decoded(bytes) => Some(bytes),
            EmbeddedDocument::Corrupt(_) => None,
        }
    }
}

/// Standard alphabet that accepts payloads with or without trailing `=`.
const REPORT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Looks for `<crd_file>..<document>base64</document>..</crd_file>` inside a
/// credential block. Returns `None` when no document is attached.
///
/// Line breaks and other whitespace inside the payload are ignored.
pub fn decode_document(credential: &str) -> Option<EmbeddedDocument> {
    let file = first_tag(credential, "crd_file")?;
    let payload = first_tag(file, "document")?;

    let compact: String = payload
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Some(EmbeddedDocument::Corrupt("document payload is empty".to_string()));
    }

    Some(match REPORT_BASE64.decode(compact.as_bytes()) {
        Ok(bytes) => EmbeddedDocument::Decoded(bytes),
        Err(err) => EmbeddedDocument::Corrupt(format!("invalid base64: {err}")),
    })
}

/// `{remoteRequestId}_{verificationType}_{timestamp}.pdf`.
///
/// The type label is reduced to `[A-Za-z0-9-]` so provider-supplied text cannot
/// introduce path separators. The timestamp has nanosecond resolution.
pub fn document_filename(
    remote_request_id: &str,
    verification_type: &str,
    at: DateTime<Utc>,
) -> String {
    let label: String = verification_type
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    let remote: String = remote_request_id
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'))
        .collect();
    format!(
        "{remote}_{label}_{}.pdf",
        at.format("%Y-%m-%dT%H-%M-%S-%9fZ")
    )
}
