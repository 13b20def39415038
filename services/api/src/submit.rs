use crate::infra::build_intake;
use chrono::Local;
use clap::Args;
use resume_intake::config::AppConfig;
use resume_intake::error::AppError;
use resume_intake::telemetry;
use resume_intake::workflows::intake::{
    ApplicantManifest, ApplicationFields, ApplicationIntake, FileStore, FormBackend,
    ManifestEntry, ResumeAsset,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// Applicant name as it should appear on the form
    #[arg(long)]
    pub(crate) name: String,
    /// Applicant email address
    #[arg(long)]
    pub(crate) email: String,
    /// Path to the résumé file
    #[arg(long)]
    pub(crate) resume: PathBuf,
    /// Media type of the résumé; guessed from the file extension when omitted
    #[arg(long)]
    pub(crate) mime_type: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV with `name,email,resume_path` columns
    #[arg(long)]
    pub(crate) manifest: PathBuf,
    /// Print one JSON object per row instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let intake = build_intake(&config)?;

    let resume = load_resume(&args.resume, args.mime_type.as_deref())?;
    let fields = ApplicationFields::new(args.name, args.email);
    let ack = intake.submit(&fields, Some(resume)).await?;

    println!("Application recorded");
    println!("  Résumé: {}", ack.resume_url);
    println!(
        "  Submitted: {}",
        ack.submitted_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %Z")
    );
    Ok(())
}

pub(crate) async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let intake = build_intake(&config)?;

    let entries = ApplicantManifest::from_path(&args.manifest)?;
    let rows = submit_manifest(intake.as_ref(), &entries).await;

    for row in &rows {
        if args.json {
            println!("{}", serde_json::to_string(row).map_err(std::io::Error::from)?);
        } else {
            println!("{}", row.describe());
        }
    }

    if !args.json {
        let recorded = rows.iter().filter(|row| row.succeeded()).count();
        println!(
            "\n{recorded} recorded, {} failed ({} rows)",
            rows.len() - recorded,
            rows.len()
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchRow {
    pub(crate) line: u64,
    pub(crate) email: String,
    #[serde(flatten)]
    pub(crate) outcome: RowOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum RowOutcome {
    Recorded {
        resume_url: String,
    },
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<&'static str>,
        error: String,
    },
}

impl BatchRow {
    fn succeeded(&self) -> bool {
        matches!(self.outcome, RowOutcome::Recorded { .. })
    }

    fn describe(&self) -> String {
        match &self.outcome {
            RowOutcome::Recorded { resume_url } => {
                format!("line {} {}: recorded ({resume_url})", self.line, self.email)
            }
            RowOutcome::Failed {
                stage: Some(stage),
                error,
            } => format!("line {} {}: failed at {stage}: {error}", self.line, self.email),
            RowOutcome::Failed { stage: None, error } => {
                format!("line {} {}: rejected: {error}", self.line, self.email)
            }
        }
    }
}

/// Submits each entry in order; a failed row is reported and the batch moves on.
pub(crate) async fn submit_manifest<S, F>(
    intake: &ApplicationIntake<S, F>,
    entries: &[ManifestEntry],
) -> Vec<BatchRow>
where
    S: FileStore + ?Sized + 'static,
    F: FormBackend + ?Sized + 'static,
{
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let outcome = match load_resume(&entry.resume_path, None) {
            Ok(resume) => match intake.submit(&entry.fields, Some(resume)).await {
                Ok(ack) => RowOutcome::Recorded {
                    resume_url: ack.resume_url.to_string(),
                },
                Err(err) => RowOutcome::Failed {
                    stage: err.failure_stage().map(|stage| stage.label()),
                    error: err.to_string(),
                },
            },
            Err(err) => RowOutcome::Failed {
                stage: None,
                error: format!("cannot read {}: {err}", entry.resume_path.display()),
            },
        };
        rows.push(BatchRow {
            line: entry.line,
            email: entry.fields.email.trim().to_string(),
            outcome,
        });
    }
    rows
}

fn load_resume(path: &Path, mime_type: Option<&str>) -> std::io::Result<ResumeAsset> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = match mime_type {
        Some(explicit) => explicit.to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };
    Ok(ResumeAsset::new(bytes, filename, mime_type))
}
