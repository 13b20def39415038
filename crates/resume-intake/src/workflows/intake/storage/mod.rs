//! Résumé storage backends.

mod drive;
mod object;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::credentials::{Credential, CredentialError};
use super::domain::{ResumeAsset, UploadReference};
use super::wire;

pub use drive::DriveFileStore;
pub use object::HttpObjectStore;

/// Uploads one résumé and returns a durable reference to it.
///
/// Implementations create exactly one stored object per successful call and never delete.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(
        &self,
        asset: &ResumeAsset,
        credential: &Credential,
    ) -> Result<UploadReference, UploadError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("storage transport failed: {0}")]
    Transport(String),
    #[error("storage backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },
}

impl UploadError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport(wire::describe_transport(&err))
    }

    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => Self::Backend {
                status,
                detail: wire::excerpt(&body),
            },
            Err(err) => Self::Backend {
                status,
                detail: format!("unreadable body: {}", wire::describe_transport(&err)),
            },
        }
    }
}

static OBJECT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Object name that cannot collide with earlier or concurrent uploads.
pub fn object_name_for(filename: &str, now: DateTime<Utc>) -> String {
    let sequence = OBJECT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{sequence:06}-{}",
        now.format("%Y%m%dT%H%M%S%3fZ"),
        sanitize_filename(filename)
    )
}

fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let mut cleaned = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>();
    while cleaned.contains("--") {
        cleaned = cleaned.replace("--", "-");
    }
    let trimmed = cleaned.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        "resume".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn object_names_keep_the_original_filename() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let name = object_name_for("resume.pdf", now);
        assert!(name.starts_with("20250314T092653000Z-"));
        assert!(name.ends_with("-resume.pdf"));
    }

    #[test]
    fn object_names_differ_for_the_same_instant() {
        let now = Utc::now();
        assert_ne!(
            object_name_for("resume.pdf", now),
            object_name_for("resume.pdf", now)
        );
    }

    #[test]
    fn sanitize_strips_paths_and_spaces() {
        assert_eq!(sanitize_filename("C:\\docs\\Ada CV (final).pdf"), "Ada-CV-final-.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("???"), "resume");
    }
}
