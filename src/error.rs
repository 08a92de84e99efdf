use std::path::PathBuf;
use thiserror::Error;

/// Structured errors for opening and reading executables. Everything the
/// analysis itself hits (unparsable source files, unknown statements,
/// spanless nodes) is deliberately non-fatal and only logged.
#[derive(Debug, Error)]
pub enum StepcheckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized executable container in {path}: {message}")]
    UnrecognizedContainer { path: PathBuf, message: String },

    #[error("unsupported architecture {arch} (only x86-64 is supported)")]
    UnsupportedArchitecture { arch: String },

    #[error("no text section in {path}")]
    MissingTextSection { path: PathBuf },

    #[error("no DWARF debug information in {path}")]
    MissingDebugInfo { path: PathBuf },

    #[error("invalid function pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("DWARF parsing failed: {0}")]
    Dwarf(#[from] gimli::Error),
}

pub type Result<T> = std::result::Result<T, StepcheckError>;

impl StepcheckError {
    pub fn unrecognized_container<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::UnrecognizedContainer {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether a caller scanning several executables can keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedContainer { .. }
                | Self::UnsupportedArchitecture { .. }
                | Self::MissingDebugInfo { .. }
        )
    }
}
