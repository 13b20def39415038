use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::credentials::{Credential, CredentialError, CredentialSource};
use super::domain::{
    ApplicationFields, FailureReason, FailureStage, ResumeAsset, ResumePolicy, SubmissionAck,
    SubmissionRecord, SubmissionState, ValidationError,
};
use super::forms::{FormBackend, SubmitError};
use super::storage::{FileStore, UploadError};

/// Error surfaced to callers of the intake workflow.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in progress")]
    AlreadyInProgress,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("résumé upload failed: {0}")]
    Upload(UploadError),
    #[error("application could not be recorded: {0}")]
    Submit(SubmitError),
    #[error("forms backend rejected the application ({status}): {detail}")]
    BackendSoftFailure { status: u16, detail: String },
}

impl SubmissionError {
    /// Stage to report in a `Failed` state; `None` for errors raised before the attempt began.
    pub fn failure_stage(&self) -> Option<FailureStage> {
        match self {
            SubmissionError::Validation(_) | SubmissionError::AlreadyInProgress => None,
            SubmissionError::Credential(_) => Some(FailureStage::Credential),
            SubmissionError::Upload(_) => Some(FailureStage::Upload),
            SubmissionError::Submit(_) | SubmissionError::BackendSoftFailure { .. } => {
                Some(FailureStage::Submit)
            }
        }
    }
}

impl From<UploadError> for SubmissionError {
    fn from(value: UploadError) -> Self {
        match value {
            UploadError::Credential(err) => Self::Credential(err),
            other => Self::Upload(other),
        }
    }
}

impl From<SubmitError> for SubmissionError {
    fn from(value: SubmitError) -> Self {
        match value {
            SubmitError::SoftFailure { status, detail } => {
                Self::BackendSoftFailure { status, detail }
            }
            other => Self::Submit(other),
        }
    }
}

/// Input that passed local validation; the only way into an attempt.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    fields: ApplicationFields,
    asset: ResumeAsset,
}

impl PreparedSubmission {
    pub fn fields(&self) -> &ApplicationFields {
        &self.fields
    }

    pub fn asset(&self) -> &ResumeAsset {
        &self.asset
    }
}

/// Sequences the résumé upload and the form post, one attempt at a time.
pub struct SubmissionOrchestrator<S: ?Sized, F: ?Sized> {
    store: Arc<S>,
    forms: Arc<F>,
    policy: ResumePolicy,
    state: watch::Sender<SubmissionState>,
    last_outcome: Mutex<Option<SubmissionState>>,
}

impl<S, F> SubmissionOrchestrator<S, F>
where
    S: FileStore + ?Sized + 'static,
    F: FormBackend + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, forms: Arc<F>, policy: ResumePolicy) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            store,
            forms,
            policy,
            state,
            last_outcome: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &ResumePolicy {
        &self.policy
    }

    pub fn current_state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    /// Watch transitions for UI gating. Receivers may coalesce quick successive updates.
    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    /// Terminal state of the most recent completed attempt.
    pub fn last_outcome(&self) -> Option<SubmissionState> {
        self.last_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate input without touching the network.
    pub fn prepare(
        &self,
        fields: &ApplicationFields,
        resume: Option<ResumeAsset>,
    ) -> Result<PreparedSubmission, SubmissionError> {
        if self.state.borrow().is_in_flight() {
            return Err(SubmissionError::AlreadyInProgress);
        }

        let fields = fields.validated()?;
        let asset = resume.ok_or(ValidationError::MissingResume)?;
        self.policy.check(&asset)?;

        Ok(PreparedSubmission { fields, asset })
    }

    pub async fn submit(
        &self,
        fields: &ApplicationFields,
        resume: Option<ResumeAsset>,
        credential: &Credential,
    ) -> Result<SubmissionAck, SubmissionError> {
        let prepared = self.prepare(fields, resume)?;
        self.submit_prepared(prepared, credential).await
    }

    pub async fn submit_prepared(
        &self,
        prepared: PreparedSubmission,
        credential: &Credential,
    ) -> Result<SubmissionAck, SubmissionError> {
        let flight = self.begin()?;
        let outcome = self.run(&flight, prepared, credential).await;

        let terminal = match &outcome {
            Ok(_) => SubmissionState::Succeeded,
            Err(err) => SubmissionState::Failed(FailureReason {
                stage: err.failure_stage().unwrap_or(FailureStage::Submit),
                detail: err.to_string(),
            }),
        };
        *self
            .last_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(terminal.clone());
        flight.advance(terminal);

        outcome
    }

    fn begin(&self) -> Result<InFlight<'_>, SubmissionError> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == SubmissionState::Idle {
                *state = SubmissionState::Uploading;
                true
            } else {
                false
            }
        });

        if claimed {
            Ok(InFlight { state: &self.state })
        } else {
            Err(SubmissionError::AlreadyInProgress)
        }
    }

    async fn run(
        &self,
        flight: &InFlight<'_>,
        prepared: PreparedSubmission,
        credential: &Credential,
    ) -> Result<SubmissionAck, SubmissionError> {
        let PreparedSubmission { fields, asset } = prepared;

        info!(
            filename = %asset.filename,
            bytes = asset.len(),
            "uploading résumé"
        );
        let reference = self
            .store
            .upload(&asset, credential)
            .await
            .map_err(|err| {
                warn!(error = %err, "résumé upload failed; form will not be posted");
                SubmissionError::from(err)
            })?;

        flight.advance(SubmissionState::Submitting);
        let record = SubmissionRecord::new(fields, reference);

        let ack = self.forms.post(&record).await.map_err(|err| {
            warn!(
                error = %err,
                resume_url = %record.resume_url,
                "form post failed; uploaded résumé left in storage"
            );
            SubmissionError::from(err)
        })?;

        info!(
            status = ack.status,
            resume_url = %record.resume_url,
            "application recorded"
        );
        Ok(SubmissionAck {
            resume_url: record.resume_url,
            submitted_at: Utc::now(),
        })
    }
}

/// Holds the single-flight slot; returning to `Idle` on drop covers early returns and
/// dropped futures alike.
struct InFlight<'a> {
    state: &'a watch::Sender<SubmissionState>,
}

impl InFlight<'_> {
    fn advance(&self, next: SubmissionState) {
        self.state.send_replace(next);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_replace(SubmissionState::Idle);
    }
}

/// Orchestrator paired with the credential capability used for each attempt.
pub struct ApplicationIntake<S: ?Sized, F: ?Sized> {
    orchestrator: SubmissionOrchestrator<S, F>,
    credentials: Arc<dyn CredentialSource>,
}

impl<S, F> ApplicationIntake<S, F>
where
    S: FileStore + ?Sized + 'static,
    F: FormBackend + ?Sized + 'static,
{
    pub fn new(
        orchestrator: SubmissionOrchestrator<S, F>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            orchestrator,
            credentials,
        }
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator<S, F> {
        &self.orchestrator
    }

    /// Validate, acquire a credential, then run one attempt.
    pub async fn submit(
        &self,
        fields: &ApplicationFields,
        resume: Option<ResumeAsset>,
    ) -> Result<SubmissionAck, SubmissionError> {
        let prepared = self.orchestrator.prepare(fields, resume)?;
        let credential = self.credentials.acquire().await.map_err(|err| {
            warn!(error = %err, "storage credential unavailable");
            SubmissionError::Credential(err)
        })?;
        self.orchestrator.submit_prepared(prepared, &credential).await
    }
}
