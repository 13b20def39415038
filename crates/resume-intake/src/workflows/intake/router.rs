use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::domain::{ApplicationFields, ResumeAsset, SubmissionState};
use super::forms::FormBackend;
use super::service::{ApplicationIntake, SubmissionError};
use super::storage::FileStore;

const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Router exposing the intake form and its state for UI gating.
pub fn intake_router<S, F>(intake: Arc<ApplicationIntake<S, F>>) -> Router
where
    S: FileStore + ?Sized + 'static,
    F: FormBackend + ?Sized + 'static,
{
    let body_limit = intake
        .orchestrator()
        .policy()
        .max_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/api/v1/applications", post(submit_handler::<S, F>))
        .route("/api/v1/applications/state", get(state_handler::<S, F>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(intake)
}

#[derive(Debug, Serialize)]
pub struct SubmissionStatusView {
    pub current: SubmissionState,
    pub last_outcome: Option<SubmissionState>,
}

pub(crate) async fn submit_handler<S, F>(
    State(intake): State<Arc<ApplicationIntake<S, F>>>,
    multipart: Multipart,
) -> Response
where
    S: FileStore + ?Sized + 'static,
    F: FormBackend + ?Sized + 'static,
{
    let (fields, resume) = match read_application_form(multipart).await {
        Ok(parsed) => parsed,
        Err((status, message)) => {
            return (status, axum::Json(json!({ "error": message }))).into_response();
        }
    };

    match intake.submit(&fields, resume).await {
        Ok(ack) => {
            let payload = json!({
                "status": "succeeded",
                "resume_url": ack.resume_url,
                "submitted_at": ack.submitted_at,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn state_handler<S, F>(
    State(intake): State<Arc<ApplicationIntake<S, F>>>,
) -> Response
where
    S: FileStore + ?Sized + 'static,
    F: FormBackend + ?Sized + 'static,
{
    let orchestrator = intake.orchestrator();
    let view = SubmissionStatusView {
        current: orchestrator.current_state(),
        last_outcome: orchestrator.last_outcome(),
    };
    (StatusCode::OK, axum::Json(view)).into_response()
}

fn error_response(error: SubmissionError) -> Response {
    let status = match &error {
        SubmissionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionError::AlreadyInProgress => StatusCode::CONFLICT,
        SubmissionError::Credential(_) => StatusCode::SERVICE_UNAVAILABLE,
        SubmissionError::Upload(_)
        | SubmissionError::Submit(_)
        | SubmissionError::BackendSoftFailure { .. } => StatusCode::BAD_GATEWAY,
    };

    let payload = match error.failure_stage() {
        Some(stage) => json!({ "error": error.to_string(), "stage": stage.label() }),
        None => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

async fn read_application_form(
    mut multipart: Multipart,
) -> Result<(ApplicationFields, Option<ResumeAsset>), (StatusCode, String)> {
    let mut name = String::new();
    let mut email = String::new();
    let mut resume = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| (err.status(), err.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                name = field
                    .text()
                    .await
                    .map_err(|err| (err.status(), err.body_text()))?;
            }
            "email" => {
                email = field
                    .text()
                    .await
                    .map_err(|err| (err.status(), err.body_text()))?;
            }
            "resume" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| (err.status(), err.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if !(filename.is_empty() && bytes.is_empty()) {
                    resume = Some(ResumeAsset::new(bytes.to_vec(), filename, mime_type));
                }
            }
            _ => {}
        }
    }

    Ok((ApplicationFields::new(name, email), resume))
}
