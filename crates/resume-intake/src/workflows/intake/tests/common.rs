use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::{watch, Notify};

use crate::workflows::intake::credentials::{
    Credential, CredentialError, CredentialSource, StaticCredentialSource,
};
use crate::workflows::intake::domain::{
    ApplicationFields, ResumeAsset, ResumePolicy, SubmissionRecord, SubmissionState,
    UploadReference,
};
use crate::workflows::intake::forms::{FormAck, FormBackend, SubmitError};
use crate::workflows::intake::service::{ApplicationIntake, SubmissionOrchestrator};
use crate::workflows::intake::storage::{FileStore, UploadError};

pub(super) type CallLog = Arc<Mutex<Vec<String>>>;

pub(super) fn fields() -> ApplicationFields {
    ApplicationFields::new("Ada Lovelace", "ada@example.com")
}

pub(super) fn pdf_asset() -> ResumeAsset {
    ResumeAsset::new(vec![b'%'; 17 * 1024], "resume.pdf", "application/pdf")
}

pub(super) fn credential() -> Credential {
    Credential::bearer("test-token")
}

#[derive(Debug, Clone, Copy)]
pub(super) enum StoreStep {
    Succeed,
    BackendError,
    TransportError,
    ExpiredCredential,
}

/// Records every upload and answers from a script; defaults to success once exhausted.
#[derive(Default)]
pub(super) struct FakeStore {
    log: CallLog,
    uploads: AtomicUsize,
    script: Mutex<VecDeque<StoreStep>>,
    gate: Option<Arc<Notify>>,
}

impl FakeStore {
    pub(super) fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub(super) fn scripted(log: CallLog, steps: Vec<StoreStep>) -> Self {
        Self {
            log,
            script: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub(super) fn gated(log: CallLog, gate: Arc<Notify>) -> Self {
        Self {
            log,
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(super) fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileStore for FakeStore {
    async fn upload(
        &self,
        asset: &ResumeAsset,
        _credential: &Credential,
    ) -> Result<UploadReference, UploadError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        self.log
            .lock()
            .expect("call log poisoned")
            .push(format!("upload:{}", asset.filename));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let step = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or(StoreStep::Succeed);
        match step {
            StoreStep::Succeed => Ok(UploadReference::new(format!(
                "https://store.example/resumes/{n}/{}",
                asset.filename
            ))),
            StoreStep::BackendError => Err(UploadError::Backend {
                status: 503,
                detail: "storage unavailable".to_string(),
            }),
            StoreStep::TransportError => {
                Err(UploadError::Transport("connection reset".to_string()))
            }
            StoreStep::ExpiredCredential => Err(UploadError::Credential(
                CredentialError::Expired(chrono::Utc::now()),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum FormStep {
    Succeed,
    BackendError,
    SoftFailure,
}

#[derive(Default)]
pub(super) struct FakeForms {
    log: CallLog,
    records: Mutex<Vec<SubmissionRecord>>,
    attempts: AtomicUsize,
    script: Mutex<VecDeque<FormStep>>,
    gate: Option<Arc<Notify>>,
}

impl FakeForms {
    pub(super) fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub(super) fn scripted(log: CallLog, steps: Vec<FormStep>) -> Self {
        Self {
            log,
            script: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub(super) fn gated(log: CallLog, gate: Arc<Notify>) -> Self {
        Self {
            log,
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Entries the backend actually kept.
    pub(super) fn records(&self) -> Vec<SubmissionRecord> {
        self.records.lock().expect("records poisoned").clone()
    }

    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FormBackend for FakeForms {
    async fn post(&self, record: &SubmissionRecord) -> Result<FormAck, SubmitError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .expect("call log poisoned")
            .push(format!("post:{}", record.resume_url));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let step = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or(FormStep::Succeed);
        match step {
            FormStep::Succeed => {
                self.records
                    .lock()
                    .expect("records poisoned")
                    .push(record.clone());
                Ok(FormAck { status: 200 })
            }
            FormStep::BackendError => Err(SubmitError::Backend {
                status: 500,
                detail: "form closed".to_string(),
            }),
            FormStep::SoftFailure => Err(SubmitError::SoftFailure {
                status: 200,
                detail: "This is a required question".to_string(),
            }),
        }
    }
}

/// Counts acquisitions and answers with a fixed result.
pub(super) struct CountingCredentials {
    pub(super) acquired: AtomicUsize,
    result: Result<Credential, CredentialError>,
}

impl CountingCredentials {
    pub(super) fn new(result: Result<Credential, CredentialError>) -> Self {
        Self {
            acquired: AtomicUsize::new(0),
            result,
        }
    }
}

#[async_trait]
impl CredentialSource for CountingCredentials {
    async fn acquire(&self) -> Result<Credential, CredentialError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

pub(super) fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(super) fn calls(log: &CallLog) -> Vec<String> {
    log.lock().expect("call log poisoned").clone()
}

pub(super) fn orchestrator(
    store: Arc<FakeStore>,
    forms: Arc<FakeForms>,
) -> SubmissionOrchestrator<FakeStore, FakeForms> {
    SubmissionOrchestrator::new(store, forms, ResumePolicy::default())
}

pub(super) fn intake(
    store: Arc<FakeStore>,
    forms: Arc<FakeForms>,
) -> ApplicationIntake<FakeStore, FakeForms> {
    ApplicationIntake::new(
        orchestrator(store, forms),
        Arc::new(StaticCredentialSource::new(Some(credential()))),
    )
}

pub(super) async fn wait_for_state(
    receiver: &mut watch::Receiver<SubmissionState>,
    target: SubmissionState,
) {
    receiver
        .wait_for(|state| *state == target)
        .await
        .map(|_| ())
        .expect("orchestrator dropped");
}

pub(super) const BOUNDARY: &str = "intake-test-boundary";

pub(super) fn multipart_body(
    name: &str,
    email: &str,
    resume: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, value) in [("name", name), ("email", email)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, mime_type, bytes)) = resume {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: {mime_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn multipart_request(body: Vec<u8>) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post("/api/v1/applications")
        .header(
            axum::http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(axum::body::Body::from(body))
        .unwrap()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
