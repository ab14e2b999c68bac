//! Wire format of the provider's SOAP service and its callback payloads.
//!
//! Outbound requests nest XML documents inside SOAP parameters as escaped text;
//! inbound callbacks are read with the lenient extractors in [`lenient`].

mod ack;
mod callback;
mod document;
mod envelope;
pub mod lenient;

use std::borrow::Cow;

pub use ack::{AckStatus, CallbackAck};
pub use callback::{decode_callback, CallbackPayload, CredentialBlock, UNKNOWN_TYPE};
pub use document::{decode_document, document_filename, EmbeddedDocument};
pub use envelope::{
    interpret_reply, item_types_envelope, logon_document, put_request_envelope,
    request_document, ProviderReply, SoapAction, SoapEnvelope, ITEM_TYPES_RESULT_TAG,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("required element <{0}> not found in callback XML")]
    MissingElement(&'static str),
    #[error("no XML data received in callback")]
    EmptyPayload,
}

/// Escapes `&`, `<` and `>` for use as XML character data.
pub fn escape_text(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 16);
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Resolves the predefined XML entities and numeric character references.
/// Anything that does not look like a valid reference is kept as written.
pub fn unescape_text(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|end| *end <= 10) {
            Some(end) => match resolve_entity(&candidate[1..end]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &candidate[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
