use thiserror::Error;

#[derive(Debug, Error)]
pub enum PsError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<toml::de::Error> for PsError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}

pub fn config_error<T>(message: impl Into<String>) -> crate::Result<T> {
    Err(PsError::ConfigError(message.into()))
}
