//! Job application intake: store the résumé, then record the application in the forms
//! backend, one attempt at a time.

pub mod credentials;
pub mod domain;
pub mod forms;
pub mod manifest;
pub mod router;
pub mod service;
pub mod storage;
mod wire;

#[cfg(test)]
mod tests;

pub use credentials::{
    Credential, CredentialError, CredentialIssuer, CredentialSource, RefreshingCredentialSource,
    StaticCredentialSource,
};
pub use domain::{
    ApplicationFields, FailureReason, FailureStage, ResumeAsset, ResumePolicy, SubmissionAck,
    SubmissionRecord, SubmissionState, UploadReference, ValidationError,
};
pub use forms::{
    FieldMapping, FormAck, FormBackend, GoogleFormsClient, SoftFailurePolicy, SubmitError,
};
pub use manifest::{ApplicantManifest, ManifestEntry, ManifestError};
pub use router::{intake_router, SubmissionStatusView};
pub use service::{ApplicationIntake, PreparedSubmission, SubmissionError, SubmissionOrchestrator};
pub use storage::{DriveFileStore, FileStore, HttpObjectStore, UploadError};
pub use wire::http_client;
