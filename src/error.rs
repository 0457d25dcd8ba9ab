//! Error types for the tagging and clustering pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::services::clustering::ClusterError;

/// Result type alias using the pipeline [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Why the clustering stage had nothing to work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyInput {
    /// The launcher database yielded no applications.
    NoApplications,
    /// Every application was skipped before vectorization.
    NoVectors,
}

impl fmt::Display for EmptyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyInput::NoApplications => {
                write!(f, "no applications found in the launcher database")
            }
            EmptyInput::NoVectors => {
                write!(f, "no application produced a vector; nothing to cluster")
            }
        }
    }
}

/// Pipeline error kinds.
#[derive(Error, Debug)]
pub enum Error {
    #[error("launcher database not found: {}", .0.display())]
    DataSourceMissing(PathBuf),

    #[error("failed to open launcher database {}: {source}", path.display())]
    DataSource {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to query launcher database: {0}")]
    Extraction(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("classification failed for {package}: {reason}")]
    Classification { package: String, reason: String },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("failed to persist tag cache to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("{0}")]
    EmptyInput(EmptyInput),
}

impl Error {
    /// Whether this error ends the run.
    ///
    /// Classification, embedding and persistence failures are downgraded where
    /// they occur and never abort the pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Classification { .. } | Error::Embedding(_) | Error::Persistence { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_follows_propagation_policy() {
        assert!(Error::Configuration("missing key".into()).is_fatal());
        assert!(Error::DataSourceMissing(PathBuf::from("x.db")).is_fatal());
        assert!(Error::EmptyInput(EmptyInput::NoVectors).is_fatal());

        assert!(!Error::Embedding("timeout".into()).is_fatal());
        assert!(!Error::Classification {
            package: "com.example".into(),
            reason: "503".into(),
        }
        .is_fatal());
        assert!(!Error::Persistence {
            path: PathBuf::from("cache.json"),
            source: std::io::Error::other("disk full"),
        }
        .is_fatal());
    }

    #[test]
    fn test_empty_input_messages() {
        let err = Error::EmptyInput(EmptyInput::NoApplications);
        assert!(err.to_string().contains("no applications"));
    }
}
