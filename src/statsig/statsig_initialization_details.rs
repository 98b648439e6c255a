use serde::Serialize;

use super::statsig_error::StatsigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum InitializeFailReason {
    /// `init_timeout_ms` elapsed before the first download finished.
    Timeout,
    NetworkTimeout,
    NetworkError,
    InternalError,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeFailure {
    pub reason: InitializeFailReason,
    pub message: String,
    pub status_code: Option<u16>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializationDetails {
    pub duration_ms: u64,
    pub success: bool,
    pub failure: Option<InitializeFailure>,
}

impl InitializationDetails {
    pub(crate) fn success(duration_ms: u64) -> Self {
        InitializationDetails {
            duration_ms,
            success: true,
            failure: None,
        }
    }

    pub(crate) fn failure(duration_ms: u64, failure: InitializeFailure) -> Self {
        InitializationDetails {
            duration_ms,
            success: false,
            failure: Some(failure),
        }
    }
}

impl From<&StatsigError> for InitializeFailure {
    fn from(error: &StatsigError) -> Self {
        let (reason, status_code) = match error {
            StatsigError::NetworkTimeout(_) => (InitializeFailReason::NetworkTimeout, None),
            StatsigError::NetworkError { status_code, .. } => {
                (InitializeFailReason::NetworkError, *status_code)
            }
            _ => (InitializeFailReason::InternalError, None),
        };

        InitializeFailure {
            reason,
            message: error.to_string(),
            status_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_keep_status_code() {
        let failure = InitializeFailure::from(&StatsigError::NetworkError {
            status_code: Some(503),
            message: "unavailable".to_string(),
        });
        assert_eq!(failure.reason, InitializeFailReason::NetworkError);
        assert_eq!(failure.status_code, Some(503));

        let failure = InitializeFailure::from(&StatsigError::MalformedSpecs("eof".to_string()));
        assert_eq!(failure.reason, InitializeFailReason::InternalError);
        assert!(failure.message.contains("eof"));
    }
}
