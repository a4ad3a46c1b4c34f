use thiserror::Error;

/// Errors raised while importing, retrieving, aggregating or chatting about
/// publication data
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (surfaced immediately, never retried)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    // Registry errors (per subject; isolated in batch mode)
    #[error("Retrieval failed for {orcid}: {reason}")]
    Retrieval { orcid: String, reason: String },

    // Text-generation backend errors
    #[error("Generation error: {0}")]
    Format(String),

    // Configuration errors
    #[error("{component} is not configured: {hint}")]
    NotConfigured { component: String, hint: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {operation} failed - {reason}")]
    Storage { operation: String, reason: String },
}

/// Error taxonomy used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed identifier or input file
    Validation,
    /// A registry call failed for one subject
    Retrieval,
    /// The text-generation backend rejected or garbled the exchange
    Format,
    /// A component is missing required configuration
    Configuration,
    /// I/O, serialization and storage failures
    Internal,
}

impl Error {
    /// Categorize the error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } | Self::MissingColumn { .. } => ErrorKind::Validation,
            Self::Retrieval { .. } => ErrorKind::Retrieval,
            Self::Format(_) => ErrorKind::Format,
            Self::NotConfigured { .. } | Self::Config(_) => ErrorKind::Configuration,
            Self::Io(_) | Self::Serde(_) | Self::Http(_) | Self::Storage { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the error was caused by the caller's input
    pub const fn is_validation(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation)
    }

    pub(crate) fn retrieval(orcid: impl ToString, reason: impl ToString) -> Self {
        Self::Retrieval {
            orcid: orcid.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::invalid_input("orcid", "bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::MissingColumn {
                column: "orcid".to_string()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::retrieval("0000-0002-1825-0097", "HTTP 404").kind(),
            ErrorKind::Retrieval
        );
        assert_eq!(Error::Format("boom".to_string()).kind(), ErrorKind::Format);
        assert_eq!(
            Error::NotConfigured {
                component: "generation".to_string(),
                hint: "set GEMINI_API_KEY".to_string(),
            }
            .kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::retrieval("0000-0002-1825-0097", "HTTP 404 Not Found");
        assert_eq!(
            err.to_string(),
            "Retrieval failed for 0000-0002-1825-0097: HTTP 404 Not Found"
        );
        assert!(!err.is_validation());
    }
}
