use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::VerificationError;

/// Local primary key of a verification request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("vr_{:032x}", rand::random::<u128>()))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation key sent to the provider and echoed back in its callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRequestId(pub String);

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

impl RemoteRequestId {
    /// `REQ_{epoch millis}_{9 random base36 chars}`. The time prefix keeps ids
    /// sortable in provider logs; the random suffix keeps them unguessable.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("REQ_{}_{}", now.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(pub String);

impl ResultId {
    pub fn generate() -> Self {
        Self(format!("vres_{:032x}", rand::random::<u128>()))
    }
}

/// Lifecycle of a submission: `pending -> processing -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    /// Completed and failed are terminal, except that a redelivered callback may
    /// re-assert `completed` on an already completed request.
    pub const fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Processing)
                | (RequestStatus::Pending, RequestStatus::Failed)
                | (RequestStatus::Processing, RequestStatus::Completed)
                | (RequestStatus::Processing, RequestStatus::Failed)
                | (RequestStatus::Completed, RequestStatus::Completed)
        )
    }
}

/// Raw submission as received from the dashboard form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetails {
    pub client_key: String,
    pub first_name: String,
    pub surname: String,
    pub id_number: String,
    pub date_of_birth: String,
    #[serde(default)]
    pub verification_types: Vec<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

/// Identification of the person being verified. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDetails {
    pub client_key: String,
    pub id_number: String,
    pub first_name: String,
    pub surname: String,
    pub date_of_birth: NaiveDate,
}

/// A submission that passed validation and can be turned into a request row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub subject: SubjectDetails,
    pub verification_types: Vec<String>,
    pub additional_notes: Option<String>,
}

impl SubmissionDetails {
    pub fn validate(self) -> Result<ValidatedSubmission, VerificationError> {
        let mut verification_types: Vec<String> = Vec::new();
        for raw in &self.verification_types {
            let kind = raw.trim();
            if !kind.is_empty() && !verification_types.iter().any(|seen| seen == kind) {
                verification_types.push(kind.to_string());
            }
        }
        if verification_types.is_empty() {
            return Err(VerificationError::Validation(
                "at least one verification type must be selected".to_string(),
            ));
        }

        let client_key = required("clientKey", &self.client_key)?;
        let first_name = required("firstName", &self.first_name)?;
        let surname = required("surname", &self.surname)?;
        let id_number = required("idNumber", &self.id_number)?;
        let date_of_birth = parse_birth_date(&self.date_of_birth)?;

        let additional_notes = self
            .additional_notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());

        Ok(ValidatedSubmission {
            subject: SubjectDetails {
                client_key,
                id_number,
                first_name,
                surname,
                date_of_birth,
            },
            verification_types,
            additional_notes,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, VerificationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(VerificationError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_birth_date(raw: &str) -> Result<NaiveDate, VerificationError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.date_naive());
    }
    Err(VerificationError::Validation(format!(
        "dateOfBirth '{raw}' is not a valid YYYY-MM-DD date"
    )))
}

/// One row per submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub id: RequestId,
    #[serde(flatten)]
    pub subject: SubjectDetails,
    pub verification_types: Vec<String>,
    pub additional_notes: Option<String>,
    pub remote_request_id: RemoteRequestId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRequest {
    /// Builds the row the orchestrator stores before calling the provider.
    pub fn processing(
        submission: ValidatedSubmission,
        remote_request_id: RemoteRequestId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            subject: submission.subject,
            verification_types: submission.verification_types,
            additional_notes: submission.additional_notes,
            remote_request_id,
            status: RequestStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Audit payload kept alongside each result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtendedInfo {
    pub inquiry_key: String,
    pub raw_credential: String,
}

/// One row per credential block of a callback delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub id: ResultId,
    pub request_id: RequestId,
    pub verification_type: String,
    pub result_code: Option<String>,
    pub result_description: Option<String>,
    pub supplier: Option<String>,
    pub risk_level: Option<String>,
    pub extended_info: ExtendedInfo,
    pub pdf_report_url: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Returned to the caller when the provider accepted a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub request_id: RequestId,
    pub remote_request_id: RemoteRequestId,
}
