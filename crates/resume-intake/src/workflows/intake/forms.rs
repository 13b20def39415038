use async_trait::async_trait;
use serde::Serialize;

use super::domain::SubmissionRecord;
use super::wire;

/// Backend entry identifiers for each record field.
///
/// The identifiers belong to the forms backend; when it renumbers its entries this table
/// changes, not the orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: String,
    pub email: String,
    pub resume_url: String,
}

impl FieldMapping {
    pub const V1_NAME: &'static str = "entry.714037552";
    pub const V1_EMAIL: &'static str = "entry.1056543652";
    pub const V1_RESUME_URL: &'static str = "entry.1423805949";

    pub fn v1() -> Self {
        Self {
            name: Self::V1_NAME.to_string(),
            email: Self::V1_EMAIL.to_string(),
            resume_url: Self::V1_RESUME_URL.to_string(),
        }
    }

    pub fn encode<'a>(&'a self, record: &'a SubmissionRecord) -> [(&'a str, &'a str); 3] {
        [
            (self.name.as_str(), record.fields.name.as_str()),
            (self.email.as_str(), record.fields.email.as_str()),
            (self.resume_url.as_str(), record.resume_url.as_str()),
        ]
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::v1()
    }
}

/// How a transport-successful response is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SoftFailurePolicy {
    /// Any 2xx response is an acknowledgement.
    #[default]
    AcceptTransportSuccess,
    /// A 2xx response whose body contains the marker is a rejection.
    RejectWhenBodyContains(String),
}

impl SoftFailurePolicy {
    fn rejects(&self, body: &str) -> bool {
        match self {
            SoftFailurePolicy::AcceptTransportSuccess => false,
            SoftFailurePolicy::RejectWhenBodyContains(marker) => {
                !marker.is_empty() && body.contains(marker.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormAck {
    pub status: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("forms transport failed: {0}")]
    Transport(String),
    #[error("forms backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },
    #[error("forms backend accepted the request but rejected the entry ({status}): {detail}")]
    SoftFailure { status: u16, detail: String },
}

/// Records one application in the forms backend.
#[async_trait]
pub trait FormBackend: Send + Sync {
    async fn post(&self, record: &SubmissionRecord) -> Result<FormAck, SubmitError>;
}

/// Posts entries to a public Google Form's `formResponse` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleFormsClient {
    client: reqwest::Client,
    endpoint: String,
    mapping: FieldMapping,
    soft_failure: SoftFailurePolicy,
}

impl GoogleFormsClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        form_id: &str,
        mapping: FieldMapping,
        soft_failure: SoftFailurePolicy,
    ) -> Self {
        Self {
            client,
            endpoint: wire::join_url(base_url, &format!("forms/d/e/{form_id}/formResponse")),
            mapping,
            soft_failure,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }
}

#[async_trait]
impl FormBackend for GoogleFormsClient {
    async fn post(&self, record: &SubmissionRecord) -> Result<FormAck, SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&self.mapping.encode(record))
            .send()
            .await
            .map_err(|err| SubmitError::Transport(wire::describe_transport(&err)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SubmitError::Transport(wire::describe_transport(&err)))?;

        if !status.is_success() {
            return Err(SubmitError::Backend {
                status: status.as_u16(),
                detail: wire::excerpt(&body),
            });
        }

        if self.soft_failure.rejects(&body) {
            return Err(SubmitError::SoftFailure {
                status: status.as_u16(),
                detail: wire::excerpt(&body),
            });
        }

        tracing::debug!(status = status.as_u16(), "form response accepted");
        Ok(FormAck {
            status: status.as_u16(),
        })
    }
}
