use metrics_exporter_prometheus::PrometheusHandle;
use resume_intake::config::{AppConfig, StorageConfig};
use resume_intake::error::AppError;
use resume_intake::workflows::intake::{
    http_client, ApplicationIntake, DriveFileStore, FileStore, GoogleFormsClient,
    HttpObjectStore, ResumePolicy, SoftFailurePolicy, StaticCredentialSource,
    SubmissionOrchestrator,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Intake wired against whichever storage backend the environment selects.
pub(crate) type Intake = ApplicationIntake<dyn FileStore, GoogleFormsClient>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_intake(config: &AppConfig) -> Result<Arc<Intake>, AppError> {
    let client = http_client(config.http.timeout)?;

    let store: Arc<dyn FileStore> = match &config.storage {
        StorageConfig::Drive {
            api_base,
            folder_id,
        } => Arc::new(DriveFileStore::new(
            client.clone(),
            api_base.clone(),
            folder_id.clone(),
        )),
        StorageConfig::Object {
            upload_url,
            public_url,
        } => Arc::new(HttpObjectStore::new(
            client.clone(),
            upload_url.clone(),
            public_url.clone(),
        )),
    };

    let soft_failure = match &config.forms.soft_failure_marker {
        Some(marker) => SoftFailurePolicy::RejectWhenBodyContains(marker.clone()),
        None => SoftFailurePolicy::AcceptTransportSuccess,
    };
    let forms = Arc::new(GoogleFormsClient::new(
        client,
        &config.forms.base_url,
        &config.forms.form_id,
        config.forms.mapping.clone(),
        soft_failure,
    ));

    let orchestrator = SubmissionOrchestrator::new(
        store,
        forms,
        ResumePolicy::pdf_only(config.resume.max_bytes),
    );
    let credentials = Arc::new(StaticCredentialSource::from_config(&config.credentials));

    Ok(Arc::new(ApplicationIntake::new(orchestrator, credentials)))
}

pub(crate) fn storage_label(storage: &StorageConfig) -> &'static str {
    match storage {
        StorageConfig::Drive { .. } => "drive",
        StorageConfig::Object { .. } => "object",
    }
}
