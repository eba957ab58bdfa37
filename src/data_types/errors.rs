
use std::path::{Path, PathBuf};

/// Failure modes shared by the link store and the plain-text readers.
#[derive(thiserror::Error, Debug)]
pub enum HicError {
    /// Holds the offending ID or name, already formatted
    #[error("entity {0} is not registered in the link store")]
    UnknownEntity(String),
    #[error("no usable records: {context}")]
    EmptyResult { context: String },
    /// `location` names the file and line, or the record, that broke the grammar
    #[error("unsupported format at {location}: {reason}")]
    UnsupportedFormat { location: String, reason: String },
    #[error("unable to access {path:?}: {source}")]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error
    }
}

impl HicError {
    /// Shorthand for the `EmptyResult` variant
    pub fn empty(context: impl Into<String>) -> HicError {
        HicError::EmptyResult { context: context.into() }
    }

    /// Shorthand for wrapping an I/O failure with the path it happened on
    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> HicError {
        HicError::ResourceUnavailable { path: path.into(), source }
    }

    /// Shorthand for a grammar violation at a given 1-based line of a file
    pub fn unsupported(path: &Path, line: usize, reason: impl Into<String>) -> HicError {
        HicError::UnsupportedFormat { location: format!("{path:?} line {line}"), reason: reason.into() }
    }

    /// Shorthand for a grammar violation inside a single record
    pub fn unsupported_record(location: impl Into<String>, reason: impl Into<String>) -> HicError {
        HicError::UnsupportedFormat { location: location.into(), reason: reason.into() }
    }
}

/// Picks the process exit code for a workflow failure
pub fn exit_code(error: &(dyn std::error::Error + 'static)) -> exitcode::ExitCode {
    if let Some(hic_error) = error.downcast_ref::<HicError>() {
        match hic_error {
            HicError::ResourceUnavailable { source, .. } if source.kind() == std::io::ErrorKind::NotFound => exitcode::NOINPUT,
            HicError::ResourceUnavailable { .. } => exitcode::IOERR,
            _ => exitcode::DATAERR
        }
    } else if error.downcast_ref::<std::io::Error>().is_some() || error.downcast_ref::<csv::Error>().is_some() {
        exitcode::IOERR
    } else {
        exitcode::SOFTWARE
    }
}
