//! Errors raised while setting up observability.

/// Observability error
#[derive(Debug, thiserror::Error, Clone)]
pub enum ObservabilityError {
    /// Bad logging configuration, e.g. an unparseable filter directive
    #[error("Logging error: {message}")]
    Logging {
        /// Description
        message: String,
    },

    /// A global subscriber was already installed
    #[error("Initialization error: {message}")]
    Init {
        /// Description
        message: String,
    },

    /// File system failure while preparing the log directory
    #[error("IO error: {message}")]
    Io {
        /// Description
        message: String,
    },
}

impl ObservabilityError {
    /// Create a logging error
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    /// Create an initialization error
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }

    /// Short category name, used in diagnostics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Logging { .. } => "logging",
            Self::Init { .. } => "init",
            Self::Io { .. } => "io",
        }
    }
}

impl From<std::io::Error> for ObservabilityError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ObservabilityError>;
