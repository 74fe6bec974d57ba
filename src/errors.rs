use thiserror::Error;

/// All errors that can occur in sops-transit.
#[derive(Debug, Error)]
pub enum SopsTransitError {
    // --- Configuration errors ---
    #[error("Conflicting scope options: {} are set, but at most one may be used", .0.join(", "))]
    ScopeConflict(Vec<&'static str>),

    #[error("Invalid {field} '{pattern}': {reason}")]
    InvalidScopeRegex {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("Config error: {0}")]
    ConfigError(String),

    // --- Input errors ---
    #[error("Invalid input document: {0}")]
    InputFormat(String),

    // --- External service errors ---
    #[error("Key wrap failed: {0}")]
    KeyWrap(String),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Broad classes of failure, used by callers deciding how to report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller supplied conflicting or invalid options.
    Configuration,
    /// The source document is malformed.
    InputFormat,
    /// The key-wrapping service failed or answered unexpectedly.
    ExternalService,
    /// The encrypted tree cannot be rendered in the target format.
    Serialization,
    /// Local failures (IO, cipher setup, CLI plumbing).
    Internal,
}

impl SopsTransitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ScopeConflict(_) | Self::InvalidScopeRegex { .. } | Self::ConfigError(_) => {
                ErrorCategory::Configuration
            }
            Self::InputFormat(_) => ErrorCategory::InputFormat,
            Self::KeyWrap(_) => ErrorCategory::ExternalService,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::EncryptionFailed(_) | Self::Io(_) | Self::CommandFailed(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Convenience type alias for sops-transit results.
pub type Result<T> = std::result::Result<T, SopsTransitError>;
