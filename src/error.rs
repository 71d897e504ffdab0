use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtaError {
    #[error("I/O error on {}: {source}", .path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid value on line {line} of {}: '{value}' ({reason})", .path.display())]
    ParseFailure {
        path: PathBuf,
        line: usize,
        value: String,
        reason: String,
    },
    #[error("Sample files disagree: {timestamps} timestamps but {counts} counts")]
    LengthMismatch { timestamps: usize, counts: usize },
    #[error("Degree {degree} fit needs at least {} samples, have {samples}", .degree + 1)]
    InsufficientSamples { degree: usize, samples: usize },
    #[error("No usable zero crossing: {0}")]
    NoConvergence(String),
    #[error("Polynomial degree must be at least 1, got {0}")]
    InvalidDegree(usize),
    #[error("File index {index} is past the total of {total} files")]
    IndexOutOfRange { index: u64, total: u64 },
}

pub type Result<T> = std::result::Result<T, EtaError>;

impl EtaError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EtaError::PersistenceFailure {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_samples_message_names_required_count() {
        let err = EtaError::InsufficientSamples {
            degree: 2,
            samples: 2,
        };
        assert_eq!(
            err.to_string(),
            "Degree 2 fit needs at least 3 samples, have 2"
        );
    }

    #[test]
    fn test_parse_failure_message_includes_location() {
        let err = EtaError::ParseFailure {
            path: PathBuf::from("data/timestamps.txt"),
            line: 4,
            value: "yesterday".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 4"));
        assert!(msg.contains("data/timestamps.txt"));
        assert!(msg.contains("'yesterday'"));
    }
}
