//! Domain-specific error types for prompt-shim

use thiserror::Error;

use crate::clients::AgentError;

/// Failures while building a default instance from a schema.
///
/// Neither kind is retryable: the same schema and overrides always fail the
/// same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("no default for field '{field}': enumerated literal has no allowed values")]
    UnsatisfiableDefault { field: String },

    #[error("instantiation of '{schema}' rejected: {reason}")]
    InstantiationRejected { schema: String, reason: String },
}

/// Main error type for the prompt-shim library and binary
#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },
}

impl From<anyhow::Error> for ShimError {
    fn from(err: anyhow::Error) -> Self {
        ShimError::Config {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ShimError {
    fn from(err: std::io::Error) -> Self {
        ShimError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ShimError {
    fn from(err: serde_json::Error) -> Self {
        ShimError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShimError {
    fn from(err: toml::de::Error) -> Self {
        ShimError::Config {
            message: format!("invalid TOML: {}", err),
        }
    }
}

/// Result type alias for prompt-shim operations
pub type Result<T> = std::result::Result<T, ShimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_error_messages() {
        let err = SynthesisError::UnsatisfiableDefault {
            field: "action".into(),
        };
        assert!(err.to_string().contains("'action'"));

        let err = SynthesisError::InstantiationRejected {
            schema: "Signal".into(),
            reason: "confidence below minimum".into(),
        };
        assert_eq!(
            err.to_string(),
            "instantiation of 'Signal' rejected: confidence below minimum"
        );
    }

    #[test]
    fn test_synthesis_error_converts_into_shim_error() {
        let err: ShimError = SynthesisError::UnsatisfiableDefault {
            field: "x".into(),
        }
        .into();
        assert!(matches!(err, ShimError::Synthesis(_)));
    }
}
