//! Submission and answer-key loading from JSON and TOML files

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rubric::{ConfigError, Value};

/// Error type for document and exam loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid rubric: {0}")]
    Rubric(#[from] ConfigError),

    #[error("Answer key not found: {0}")]
    MissingAnswerKey(PathBuf),
}

/// Document formats recognized by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(DocumentFormat::Json),
            "toml" => Some(DocumentFormat::Toml),
            _ => None,
        }
    }
}

/// Parse document text in the given format
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<Value, LoadError> {
    let parsed = match format {
        DocumentFormat::Json => Value::from_json(content),
        DocumentFormat::Toml => Value::from_toml(content),
    };
    parsed.map_err(|e| LoadError::Parse(e.to_string()))
}

/// Load a JSON or TOML document, choosing the parser by extension
pub fn load_document(path: impl AsRef<Path>) -> Result<Value, LoadError> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        LoadError::Parse(format!("{}: unsupported document type (expected .json or .toml)", path.display()))
    })?;
    let content = std::fs::read_to_string(path)?;
    parse_document(&content, format).map_err(|e| match e {
        LoadError::Parse(msg) => LoadError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// A candidate's submission, identified by its file stem
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub path: PathBuf,
    pub document: Value,
}

pub fn load_submission(path: impl AsRef<Path>) -> Result<Submission, LoadError> {
    let path = path.as_ref();
    let document = load_document(path)?;
    Ok(Submission {
        id: submission_id(path),
        path: path.to_path_buf(),
        document,
    })
}

fn submission_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("submission")
        .to_string()
}

/// A file in a submissions directory that could not be loaded
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of scanning a submissions directory
#[derive(Debug, Default)]
pub struct SubmissionSet {
    pub submissions: Vec<Submission>,
    pub skipped: Vec<SkippedFile>,
}

/// Load every `.json`/`.toml` file in `dir`, sorted by submission id.
/// Unreadable files are skipped with a warning and listed in `skipped`.
/// When two files share a stem, the first in path order wins and the
/// other is skipped as a duplicate.
pub fn load_submissions_from_directory(dir: impl AsRef<Path>) -> Result<SubmissionSet, LoadError> {
    let mut set = SubmissionSet::default();

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && DocumentFormat::from_path(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut seen = HashSet::new();
    for path in paths {
        let id = submission_id(&path);
        if !seen.insert(id.clone()) {
            tracing::warn!("Skipping {:?}: duplicate submission id {}", path, id);
            set.skipped.push(SkippedFile {
                path,
                reason: format!("duplicate submission id: {}", id),
            });
            continue;
        }

        match load_submission(&path) {
            Ok(submission) => set.submissions.push(submission),
            Err(e) => {
                tracing::warn!("Failed to load submission from {:?}: {}", path, e);
                set.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    set.submissions.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(set)
}
