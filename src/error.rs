use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(kalenteri::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(kalenteri::config))]
    Config(String),

    #[error("Event store error: {0}")]
    #[diagnostic(code(kalenteri::store))]
    Store(String),

    #[error("Validation error: {0}")]
    #[diagnostic(code(kalenteri::validation))]
    Validation(String),

    #[error("Event not found: {0}")]
    #[diagnostic(code(kalenteri::not_found))]
    NotFound(String),

    #[error("Oracle error: {0}")]
    #[diagnostic(code(kalenteri::oracle))]
    Oracle(String),

    #[error(transparent)]
    #[diagnostic(code(kalenteri::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(kalenteri::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(kalenteri::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Invalid value for environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create event store errors
pub fn store_error(message: &str) -> Error {
    Error::Store(message.to_string())
}

/// Helper to create validation errors
pub fn validation_error(message: &str) -> Error {
    Error::Validation(message.to_string())
}

/// Helper to create oracle errors
pub fn oracle_error(message: &str) -> Error {
    Error::Oracle(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_errors_become_store_errors() {
        let err: Error = redis::RedisError::from((redis::ErrorKind::IoError, "connection refused")).into();
        match err {
            Error::Store(message) => assert!(message.contains("connection refused")),
            other => panic!("expected a store error, got {:?}", other),
        }
    }
}
