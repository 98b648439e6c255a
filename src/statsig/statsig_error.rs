use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StatsigError {
    #[error("Failed to acquire lock on Statsig instance")]
    SingletonLockFailure,
    #[error("Statsig is already initialized")]
    AlreadyInitialized,
    #[error("You must call and await Statsig.initialize first.")]
    Uninitialized,
    #[error("Was unable to gracefully shutdown the Statsig instance")]
    ShutdownFailure,
    #[error("Network request failed: {message}")]
    NetworkError {
        status_code: Option<u16>,
        message: String,
    },
    #[error("Network request timed out: {0}")]
    NetworkTimeout(String),
    #[error("Failed to parse config specs: {0}")]
    MalformedSpecs(String),
}

impl From<reqwest::Error> for StatsigError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() || value.is_connect() {
            return StatsigError::NetworkTimeout(value.without_url().to_string());
        }

        StatsigError::NetworkError {
            status_code: value.status().map(|s| s.as_u16()),
            message: value.without_url().to_string(),
        }
    }
}

/// Failures inside the evaluation engine. These never reach callers; the config being
/// evaluated falls back to its default value instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum EvaluationError {
    #[error("Unsupported evaluation: {0}")]
    Unsupported(String),
}
