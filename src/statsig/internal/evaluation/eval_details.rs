use serde::{Deserialize, Serialize};

use crate::statsig::internal::helpers::get_time_in_millis;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalDetails {
    pub reason: EvaluationReason,
    pub config_sync_time: u64,
    pub server_time: u64,
}

impl EvalDetails {
    pub fn new(reason: EvaluationReason, config_sync_time: u64) -> Self {
        // Nothing has been synced yet, so there is no meaningful sync time to report.
        let config_sync_time = match reason {
            EvaluationReason::Uninitialized => 0,
            _ => config_sync_time,
        };

        EvalDetails {
            reason,
            config_sync_time,
            server_time: get_time_in_millis(),
        }
    }
}

impl Default for EvalDetails {
    fn default() -> Self {
        EvalDetails::new(EvaluationReason::Uninitialized, 0)
    }
}

/// Where an evaluation's data came from. Attached to every result so callers can tell live
/// values from degraded ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationReason {
    Network,
    Uninitialized,
    Unrecognized,
    Bootstrap,
    InvalidBootstrap,
    Cache,
    Unsupported,
    Persisted,
    LocalOverride,
}

impl EvaluationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationReason::Network => "Network",
            EvaluationReason::Uninitialized => "Uninitialized",
            EvaluationReason::Unrecognized => "Unrecognized",
            EvaluationReason::Bootstrap => "Bootstrap",
            EvaluationReason::InvalidBootstrap => "InvalidBootstrap",
            EvaluationReason::Cache => "Cache",
            EvaluationReason::Unsupported => "Unsupported",
            EvaluationReason::Persisted => "Persisted",
            EvaluationReason::LocalOverride => "LocalOverride",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_details_have_no_sync_time() {
        let details = EvalDetails::new(EvaluationReason::Uninitialized, 1234);
        assert_eq!(details.config_sync_time, 0);

        let details = EvalDetails::new(EvaluationReason::Network, 1234);
        assert_eq!(details.config_sync_time, 1234);
    }

    #[test]
    fn reason_serializes_to_wire_name() {
        let json = serde_json::to_string(&EvaluationReason::InvalidBootstrap).unwrap();
        assert_eq!(json, "\"InvalidBootstrap\"");
        assert_eq!(EvaluationReason::LocalOverride.as_str(), "LocalOverride");
    }
}
