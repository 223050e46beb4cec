//! Error types for the SIGMA rule evaluation crate.

use std::fmt;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    YamlError(String),
    InvalidRule(String),
    ConfigError(String),
    CapabilityError(String),
    GenerationError(String),
    IoError(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::YamlError(msg) => write!(f, "YAML parsing error: {msg}"),
            EvalError::InvalidRule(msg) => write!(f, "Invalid rule: {msg}"),
            EvalError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            EvalError::CapabilityError(msg) => write!(f, "Capability error: {msg}"),
            EvalError::GenerationError(msg) => write!(f, "Rule generation error: {msg}"),
            EvalError::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        EvalError::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for EvalError {
    fn from(err: serde_yaml::Error) -> Self {
        EvalError::YamlError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_yaml_error_display() {
        let error = EvalError::YamlError("bad indent".to_string());
        assert_eq!(error.to_string(), "YAML parsing error: bad indent");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_invalid_rule_display() {
        let error = EvalError::InvalidRule("missing condition".to_string());
        assert_eq!(error.to_string(), "Invalid rule: missing condition");
    }

    #[test]
    fn test_capability_error_display() {
        let error = EvalError::CapabilityError("judge timed out".to_string());
        assert_eq!(error.to_string(), "Capability error: judge timed out");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: EvalError = io_err.into();
        assert!(matches!(error, EvalError::IoError(_)));
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("{").unwrap_err();
        let error: EvalError = yaml_err.into();
        assert!(matches!(error, EvalError::YamlError(_)));
    }
}
