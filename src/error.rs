use fastnbt::error::Error as NbtError;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Semaphore acquire error: {0}")]
    Semaphore(#[from] tokio::sync::AcquireError),

    #[error("Tauri error: {0}")]
    Tauri(#[from] tauri::Error),

    #[error("NBT parsing error: {0}")]
    Nbt(#[from] NbtError),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch for {path:?}: expected {expected}, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Archive entry escapes extraction directory: {0:?}")]
    PathTraversal(PathBuf),

    #[error("Instance '{instance}' uses schema version {found}, this launcher supports up to {supported}")]
    SchemaTooNew {
        instance: String,
        found: u32,
        supported: u32,
    },

    #[error("Invalid instance metadata: {0}")]
    SchemaInvalid(String),

    #[error("Java {required} required but {path} reports {actual:?}")]
    JavaIncompatible {
        actual: Option<u32>,
        required: u32,
        path: String,
    },

    #[error("An install is already running for instance {0}")]
    Busy(Uuid),

    #[error("Instance not found: {0}")]
    InstanceNotFound(Uuid),

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(Uuid),

    #[error("Process spawn failed: {0}")]
    ProcessSpawnFailed(String),

    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("Unresolved launch argument variable: {0}")]
    MissingArgument(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Invalid mod loader: {0}")]
    InvalidModLoader(String),

    #[error("Loader error: {0}")]
    LoaderError(String),

    #[error("Could not find primary file for Modrinth version '{version_id}'")]
    ModrinthPrimaryFileNotFound { version_id: String },

    #[error("Mrpack error: {0}")]
    MrpackError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown error: {0}")]
    Other(String),
}

impl AppError {
    /// Stable error-kind string used by the command surface; mirrors the
    /// launcher's public error taxonomy rather than the enum variant names.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Request(_) | AppError::Download(_) | AppError::HttpStatus { .. } => "Network",
            AppError::ChecksumMismatch { .. } | AppError::SizeMismatch { .. } => "Checksum",
            AppError::Io(_) | AppError::PathTraversal(_) | AppError::FileNotFound(_) => {
                "Filesystem"
            }
            AppError::SchemaTooNew { .. } => "SchemaTooNew",
            AppError::SchemaInvalid(_) | AppError::Json(_) => "SchemaInvalid",
            AppError::JavaIncompatible { .. } => "JavaIncompatible",
            AppError::Busy(_) => "Busy",
            AppError::InstanceNotFound(_)
            | AppError::VersionNotFound(_)
            | AppError::ProcessNotFound(_)
            | AppError::ModrinthPrimaryFileNotFound { .. } => "NotFound",
            AppError::Cancelled => "Cancelled",
            AppError::InvalidInput(_) | AppError::InvalidModLoader(_) => "InvalidInput",
            _ => "Internal",
        }
    }
}

/// Removes the query string from a URL before it is surfaced in an error
/// message. Signed download links carry tokens in the query.
pub fn strip_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}

#[derive(Serialize, Debug)]
pub struct CommandError {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        let context = match &error {
            AppError::JavaIncompatible {
                actual,
                required,
                path,
            } => Some(serde_json::json!({
                "actual": actual,
                "required": required,
                "path": path,
            })),
            AppError::SchemaTooNew {
                instance,
                found,
                supported,
            } => Some(serde_json::json!({
                "instance": instance,
                "found": found,
                "supported": supported,
            })),
            _ => None,
        };
        CommandError {
            kind: error.kind().to_string(),
            message: error.to_string(),
            context,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_covers_taxonomy() {
        assert_eq!(AppError::Download("x".into()).kind(), "Network");
        assert_eq!(
            AppError::ChecksumMismatch {
                url: "u".into(),
                expected: "a".into(),
                actual: "b".into()
            }
            .kind(),
            "Checksum"
        );
        assert_eq!(AppError::Busy(Uuid::new_v4()).kind(), "Busy");
        assert_eq!(AppError::Cancelled.kind(), "Cancelled");
        assert_eq!(AppError::Other("boom".into()).kind(), "Internal");
        assert_eq!(
            AppError::InstanceNotFound(Uuid::new_v4()).kind(),
            "NotFound"
        );
    }

    #[test]
    fn strip_query_removes_tokens() {
        assert_eq!(
            strip_query("https://cdn.example/file.jar?sig=secret"),
            "https://cdn.example/file.jar"
        );
        assert_eq!(strip_query("https://cdn.example/a"), "https://cdn.example/a");
    }

    #[test]
    fn java_incompatible_carries_context() {
        let err = CommandError::from(AppError::JavaIncompatible {
            actual: Some(8),
            required: 17,
            path: "/usr/bin/java".into(),
        });
        assert_eq!(err.kind, "JavaIncompatible");
        let ctx = err.context.expect("context");
        assert_eq!(ctx["actual"], 8);
        assert_eq!(ctx["required"], 17);
    }
}
