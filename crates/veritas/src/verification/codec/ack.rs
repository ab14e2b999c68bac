use super::escape_text;

/// `kmie_status` value returned to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Accepted,
    Rejected,
}

impl AckStatus {
    pub const fn code(self) -> u8 {
        match self {
            AckStatus::Accepted => 0,
            AckStatus::Rejected => 1,
        }
    }
}

/// Acknowledgement document the provider expects in reply to every callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAck {
    pub status: AckStatus,
    pub description: String,
}

impl CallbackAck {
    pub fn success() -> Self {
        Self {
            status: AckStatus::Accepted,
            description: "Success".to_string(),
        }
    }

    pub fn failure(reason: impl std::fmt::Display) -> Self {
        Self {
            status: AckStatus::Rejected,
            description: format!("Error: {reason}"),
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" standalone=\"yes\"?>\n<xml>\n  <kmie_status>{}</kmie_status>\n  <kmie_statusdesc>{}</kmie_statusdesc>\n</xml>",
            self.status.code(),
            escape_text(&self.description)
        )
    }
}
