use std::fmt;

use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

/// Fields typed by the applicant. Snapshotted once a submission begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFields {
    pub name: String,
    pub email: String,
}

impl ApplicationFields {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns a trimmed copy after basic shape checks.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        let email = self.email.trim();
        if !is_plausible_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}

fn is_plausible_email(raw: &str) -> bool {
    if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels
            .iter()
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}

/// The résumé file selected for an attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ResumeAsset {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl ResumeAsset {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ResumeAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeAsset")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Durable pointer to a stored résumé, minted once per successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadReference(String);

impl UploadReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload handed to the forms backend; only exists once the upload succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub fields: ApplicationFields,
    pub resume_url: UploadReference,
}

impl SubmissionRecord {
    pub fn new(fields: ApplicationFields, resume_url: UploadReference) -> Self {
        Self { fields, resume_url }
    }
}

/// Which leg of the attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Credential,
    Upload,
    Submit,
}

impl FailureStage {
    pub fn label(&self) -> &'static str {
        match self {
            FailureStage::Credential => "credential",
            FailureStage::Upload => "upload",
            FailureStage::Submit => "submit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub stage: FailureStage,
    pub detail: String,
}

/// Lifecycle of a single submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Uploading,
    Submitting,
    Succeeded,
    Failed(FailureReason),
}

impl SubmissionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionState::Uploading | SubmissionState::Submitting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Succeeded | SubmissionState::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Uploading => "uploading",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Succeeded => "succeeded",
            SubmissionState::Failed(_) => "failed",
        }
    }
}

/// Returned once both backends accepted the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionAck {
    pub resume_url: UploadReference,
    pub submitted_at: DateTime<Utc>,
}

/// Local checks applied to the résumé before any network activity.
#[derive(Debug, Clone)]
pub struct ResumePolicy {
    accepted: Vec<Mime>,
    max_bytes: usize,
}

impl ResumePolicy {
    pub fn new(accepted: Vec<Mime>, max_bytes: usize) -> Self {
        let accepted = if accepted.is_empty() {
            vec![mime::APPLICATION_PDF]
        } else {
            accepted
        };
        let max_bytes = if max_bytes == 0 {
            DEFAULT_MAX_RESUME_BYTES
        } else {
            max_bytes
        };

        Self {
            accepted,
            max_bytes,
        }
    }

    pub fn pdf_only(max_bytes: usize) -> Self {
        Self::new(vec![mime::APPLICATION_PDF], max_bytes)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn accepted(&self) -> &[Mime] {
        &self.accepted
    }

    pub fn check(&self, asset: &ResumeAsset) -> Result<(), ValidationError> {
        if asset.filename.trim().is_empty() {
            return Err(ValidationError::MissingFilename);
        }
        if asset.is_empty() {
            return Err(ValidationError::EmptyResume);
        }
        if asset.len() > self.max_bytes {
            return Err(ValidationError::ResumeTooLarge {
                max: self.max_bytes,
                found: asset.len(),
            });
        }

        let parsed: Mime = asset
            .mime_type
            .parse()
            .map_err(|_| ValidationError::UnsupportedMediaType(asset.mime_type.clone()))?;
        let accepted = self
            .accepted
            .iter()
            .any(|candidate| candidate.essence_str() == parsed.essence_str());
        if !accepted {
            return Err(ValidationError::UnsupportedMediaType(asset.mime_type.clone()));
        }

        Ok(())
    }
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self::pdf_only(DEFAULT_MAX_RESUME_BYTES)
    }
}

/// Local input problems. Raised before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("applicant name is required")]
    MissingName,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("a résumé file is required")]
    MissingResume,
    #[error("the résumé file has no name")]
    MissingFilename,
    #[error("the résumé file is empty")]
    EmptyResume,
    #[error("résumé media type '{0}' is not accepted")]
    UnsupportedMediaType(String),
    #[error("résumé is {found} bytes; the limit is {max}")]
    ResumeTooLarge { max: usize, found: usize },
}
