use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::domain::ApplicationFields;

#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestError::Io(err) => write!(f, "failed to read applicant manifest: {}", err),
            ManifestError::Csv(err) => write!(f, "invalid applicant manifest: {}", err),
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Io(err) => Some(err),
            ManifestError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ManifestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ManifestError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct ManifestRow {
    name: String,
    email: String,
    resume_path: PathBuf,
}

/// One applicant queued for batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub line: u64,
    pub fields: ApplicationFields,
    pub resume_path: PathBuf,
}

/// CSV list of applicants (`name,email,resume_path`) submitted one after another.
pub struct ApplicantManifest;

impl ApplicantManifest {
    /// Relative résumé paths are resolved against the manifest's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ManifestEntry>, ManifestError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let entries = Self::from_reader(file)?
            .into_iter()
            .map(|mut entry| {
                if entry.resume_path.is_relative() {
                    entry.resume_path = base.join(&entry.resume_path);
                }
                entry
            })
            .collect();
        Ok(entries)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ManifestEntry>, ManifestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut entries = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let row: ManifestRow = record.deserialize(Some(&headers))?;
            entries.push(ManifestEntry {
                line,
                fields: ApplicationFields::new(row.name, row.email),
                resume_path: row.resume_path,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_rows_in_order() {
        let csv = "name,email,resume_path\nAda Lovelace,ada@example.com,ada.pdf\n Grace Hopper , grace@example.com ,/tmp/grace.pdf\n";
        let entries = ApplicantManifest::from_reader(Cursor::new(csv)).expect("manifest parses");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].fields.name, "Ada Lovelace");
        assert_eq!(entries[0].line, 2);
        assert_eq!(entries[1].fields.email, "grace@example.com");
        assert_eq!(entries[1].resume_path, PathBuf::from("/tmp/grace.pdf"));
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let csv = "name,email\nAda,ada@example.com\n";
        match ApplicantManifest::from_reader(Cursor::new(csv)) {
            Err(ManifestError::Csv(_)) => {}
            other => panic!("expected csv error, got {other:?}"),
        }
    }
}
