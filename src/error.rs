use std::io;
use std::result::Result as StdResult;
use teloxide::ApiError;
use teloxide::RequestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Template error: {0}")]
    TemplateError(String),
    #[error("Missing template: {0}")]
    TemplateMissing(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Delivery target not found: {0}")]
    TargetNotFound(String),
    #[error("Delivery target forbidden: {0}")]
    TargetForbidden(String),
    #[error("Delivery error: {0}")]
    DeliveryError(String),
    #[error("Metrics error: {0}")]
    MetricsError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl Error {
    /// True for failures of the data source (file, network or payload).
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Error::IoError(_) | Error::HttpError(_) | Error::ParseError(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::TemplateError(err.to_string())
    }
}

impl From<RequestError> for Error {
    fn from(err: RequestError) -> Self {
        match &err {
            RequestError::Api(ApiError::ChatNotFound) => Error::TargetNotFound(err.to_string()),
            RequestError::Api(ApiError::BotBlocked)
            | RequestError::Api(ApiError::BotKicked)
            | RequestError::Api(ApiError::NotEnoughRightsToPostMessages) => {
                Error::TargetForbidden(err.to_string())
            }
            _ => Error::DeliveryError(err.to_string()),
        }
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::MetricsError(err.to_string())
    }
}

pub type Result<T> = StdResult<T, Error>;
