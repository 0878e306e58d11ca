use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error on `{field}`: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Unsupported media type: {media_type}")]
    NotAcceptable { media_type: String },

    #[error("{what} not found: {name}")]
    NotFound { what: String, name: String },

    #[error("Operation not supported: {message}")]
    Unsupported { message: String },

    #[error("Model run failed ({status}): {stderr_tail}")]
    ModelFailed { status: String, stderr_tail: String },

    #[error("Model run exceeded {seconds}s and was killed")]
    ModelTimeout { seconds: u64 },

    #[error("No {kind} result found in {path}")]
    ResultMissing { kind: String, path: String },

    #[error("Simulation '{name}' is already running")]
    CaseBusy { name: String },

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ApiError::ConfigError {
            message: message.into(),
        }
    }

    /// HTTP status used when the error reaches the serving layer.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
            ApiError::ModelTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::CaseBusy { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ApiError::ConfigError { .. }
            | ApiError::MissingConfigError { .. }
            | ApiError::InvalidConfigValueError { .. } => {
                format!("The service is misconfigured: {}", self)
            }
            ApiError::ValidationError { field, reason } => {
                format!("Invalid request argument `{}`: {}", field, reason)
            }
            ApiError::ModelFailed { .. } => {
                "The Medslik-II simulation did not finish successfully".to_string()
            }
            ApiError::ModelTimeout { seconds } => {
                format!("The simulation took longer than {} seconds", seconds)
            }
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ApiError::ConfigError { .. }
            | ApiError::MissingConfigError { .. }
            | ApiError::InvalidConfigValueError { .. } => {
                "Check the environment variables (MODEL_HOME, DATA_PATH, MODELS_PATH, MEDSLIK_COMMAND)"
            }
            ApiError::ValidationError { .. } => "Fix the request payload and try again",
            ApiError::NotAcceptable { .. } => {
                "Use one of: image/png, video/mp4, application/json, application/zip"
            }
            ApiError::NotFound { .. } => "List available models and datasets via the metadata endpoint",
            ApiError::Unsupported { .. } => "This model does not provide that operation",
            ApiError::ModelFailed { .. } => {
                "Inspect the simulation log; check credentials and spill coordinates"
            }
            ApiError::ModelTimeout { .. } => "Shorten the simulation or raise MEDSLIK_TIMEOUT_SECS",
            ApiError::ResultMissing { .. } => {
                "Make sure plotting is enabled in the model configuration template"
            }
            ApiError::CaseBusy { .. } => "Wait for the running simulation or pick another name",
            _ => "Check the service logs for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::validation("name", "empty").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Unsupported {
                message: "train".into()
            }
            .status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ApiError::ModelTimeout { seconds: 5 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::CaseBusy {
                name: "my_experiment".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::config("broken").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_friendly_message_names_field() {
        let err = ApiError::validation("spill_lat", "Length must be between 1 and 5");
        assert!(err.user_friendly_message().contains("spill_lat"));
        assert!(err.is_client_error());
    }
}
