//! Error types for Cadence

use thiserror::Error;

/// The main error type for Cadence operations
#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Declaration load error: {0}")]
    DeclarationLoadError(String),

    #[error("Unknown participant type: {0}")]
    UnknownParticipantType(String),

    #[error("Invalid instance: {0}")]
    InvalidInstance(String),

    #[error("Hook failed: {0}")]
    HookFailed(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Ordering declaration problems found while resolving ranks.
///
/// None of these abort a resolution pass. The offending type falls back to
/// rank 0 and the error is collected for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Cyclic execution order between `{first}` and `{second}`")]
    CyclicDependency { first: String, second: String },

    #[error("`{0}` declares a dependency on itself")]
    SelfDependency(String),

    #[error("`{type_name}` lists {dependencies} dependencies but {flags} include_subclasses flags")]
    LengthMismatch {
        type_name: String,
        dependencies: usize,
        flags: usize,
    },

    #[error("`{0}` is not a participant type")]
    NotParticipantType(String),

    #[error("`{type_name}` depends on `{dependency}`, which is not a participant type")]
    InvalidDependency {
        type_name: String,
        dependency: String,
    },

    #[error("`{0}` declares an empty dependency name")]
    EmptyDependency(String),
}

impl ConfigurationError {
    /// The type whose rank was degraded by this error
    pub fn type_name(&self) -> &str {
        match self {
            ConfigurationError::CyclicDependency { first, .. } => first,
            ConfigurationError::SelfDependency(name)
            | ConfigurationError::NotParticipantType(name)
            | ConfigurationError::EmptyDependency(name) => name,
            ConfigurationError::LengthMismatch { type_name, .. }
            | ConfigurationError::InvalidDependency { type_name, .. } => type_name,
        }
    }
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;

impl From<toml::de::Error> for CadenceError {
    fn from(err: toml::de::Error) -> Self {
        CadenceError::TomlParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_both_types() {
        let err = ConfigurationError::CyclicDependency {
            first: "Pool".into(),
            second: "Factory".into(),
        };
        let message = err.to_string();
        assert!(message.contains("Pool"));
        assert!(message.contains("Factory"));
        assert_eq!(err.type_name(), "Pool");
    }

    #[test]
    fn test_configuration_error_wraps() {
        let err: CadenceError = ConfigurationError::SelfDependency("Logger".into()).into();
        assert!(matches!(err, CadenceError::Configuration(_)));
        assert_eq!(err.to_string(), "`Logger` declares a dependency on itself");
    }

    #[test]
    fn test_toml_error_conversion() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("[broken");
        let err: CadenceError = parsed.unwrap_err().into();
        assert!(matches!(err, CadenceError::TomlParseError(_)));
    }
}
