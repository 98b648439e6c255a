use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::eval_details::{EvalDetails, EvaluationReason};
use crate::statsig::internal::data_types::APISpec;
use crate::statsig::internal::helpers::get_time_in_millis;
use crate::statsig::internal::{DynamicConfig, Layer};

/// Records that evaluating one entity required checking a gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryExposure {
    pub gate: String,
    #[serde(rename = "gateValue")]
    pub gate_value: String,
    #[serde(rename = "ruleID")]
    pub rule_id: String,
}

/// Outcome of evaluating a gate, config, experiment or layer.
///
/// `undelegated_secondary_exposures` is the exposure trail as it stood before a rule handed
/// evaluation off to a delegate config. When no delegation happened both lists are equal.
#[derive(Clone, Debug)]
pub struct EvalResult {
    pub bool_value: bool,
    pub json_value: Option<Value>,
    pub rule_id: String,
    pub group_name: Option<String>,
    pub secondary_exposures: Vec<SecondaryExposure>,
    pub undelegated_secondary_exposures: Vec<SecondaryExposure>,
    pub explicit_parameters: Option<Vec<String>>,
    pub config_delegate: Option<String>,
    pub is_experiment_group: bool,
    pub evaluation_details: EvalDetails,
    pub config_version: Option<u32>,
}

impl EvalResult {
    pub fn boolean(bool_value: bool) -> Self {
        Self {
            bool_value,
            ..Self::default()
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            evaluation_details: EvalDetails::new(EvaluationReason::Uninitialized, 0),
            ..Self::default()
        }
    }

    pub fn unrecognized(lcut: u64) -> Self {
        Self {
            json_value: Some(Value::Object(Map::new())),
            evaluation_details: EvalDetails::new(EvaluationReason::Unrecognized, lcut),
            ..Self::default()
        }
    }

    pub fn unsupported(spec: &APISpec, lcut: u64) -> Self {
        Self {
            json_value: Some(spec.default_value.clone()),
            rule_id: "default".to_string(),
            explicit_parameters: spec.explicit_parameters.clone(),
            evaluation_details: EvalDetails::new(EvaluationReason::Unsupported, lcut),
            config_version: spec.version,
            ..Self::default()
        }
    }

    pub fn disabled(spec: &APISpec, evaluation_details: EvalDetails) -> Self {
        Self {
            json_value: Some(spec.default_value.clone()),
            rule_id: "disabled".to_string(),
            evaluation_details,
            config_version: spec.version,
            ..Self::default()
        }
    }

    pub fn fallthrough(
        spec: &APISpec,
        exposures: Vec<SecondaryExposure>,
        evaluation_details: EvalDetails,
    ) -> Self {
        Self {
            json_value: Some(spec.default_value.clone()),
            rule_id: "default".to_string(),
            evaluation_details,
            config_version: spec.version,
            ..Self::default()
        }
        .with_secondary_exposures(exposures)
    }

    /// Sets both exposure lists to the same trail.
    pub fn with_secondary_exposures(mut self, exposures: Vec<SecondaryExposure>) -> Self {
        self.undelegated_secondary_exposures = exposures.clone();
        self.secondary_exposures = exposures;
        self
    }

    /// Wraps the result of a delegate config. The caller's trail becomes the undelegated list
    /// and is followed by the delegate's own exposures in the full list.
    pub fn delegated(
        delegated: EvalResult,
        undelegated_exposures: Vec<SecondaryExposure>,
        config_delegate: &str,
        explicit_parameters: Option<Vec<String>>,
    ) -> Self {
        let mut secondary_exposures = undelegated_exposures.clone();
        secondary_exposures.extend(delegated.secondary_exposures);

        Self {
            secondary_exposures,
            undelegated_secondary_exposures: undelegated_exposures,
            config_delegate: Some(config_delegate.to_string()),
            explicit_parameters,
            ..delegated
        }
    }

    pub fn from_gate_override(value: bool, lcut: u64) -> Self {
        Self {
            bool_value: value,
            evaluation_details: EvalDetails::new(EvaluationReason::LocalOverride, lcut),
            ..Self::default()
        }
    }

    pub fn from_config_override(config: &DynamicConfig, lcut: u64) -> Self {
        Self {
            json_value: Some(Value::Object(config.value.clone().into_iter().collect())),
            rule_id: config.rule_id.clone(),
            group_name: config.group_name.clone(),
            evaluation_details: EvalDetails::new(EvaluationReason::LocalOverride, lcut),
            ..Self::default()
        }
        .with_secondary_exposures(config.secondary_exposures.clone())
    }

    pub fn from_layer_override(layer: &Layer, lcut: u64) -> Self {
        Self {
            json_value: Some(Value::Object(layer.value.clone().into_iter().collect())),
            rule_id: layer.rule_id.clone(),
            group_name: layer.group_name.clone(),
            config_delegate: layer.allocated_experiment_name.clone(),
            evaluation_details: EvalDetails::new(EvaluationReason::LocalOverride, lcut),
            ..Self::default()
        }
        .with_secondary_exposures(layer.secondary_exposures.clone())
    }
}

impl Default for EvalResult {
    fn default() -> Self {
        Self {
            bool_value: false,
            json_value: None,
            rule_id: "".to_string(),
            group_name: None,
            secondary_exposures: vec![],
            undelegated_secondary_exposures: vec![],
            explicit_parameters: None,
            config_delegate: None,
            is_experiment_group: false,
            evaluation_details: EvalDetails::default(),
            config_version: None,
        }
    }
}

/// Serialized form of a sticky experiment assignment, as handed to `UserPersistentStorage`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedValueConfig {
    #[serde(default)]
    pub value: bool,
    #[serde(default)]
    pub json_value: Option<Value>,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub secondary_exposures: Vec<SecondaryExposure>,
    #[serde(default)]
    pub explicit_parameters: Option<Vec<String>>,
    #[serde(default)]
    pub config_delegate: Option<String>,
    #[serde(default)]
    pub undelegated_secondary_exposures: Vec<SecondaryExposure>,
    #[serde(default)]
    pub time: Option<u64>,
}

impl PersistedValueConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn into_eval_result(self) -> EvalResult {
        let config_sync_time = self.time.unwrap_or_else(get_time_in_millis);
        EvalResult {
            bool_value: self.value,
            json_value: self.json_value,
            rule_id: self.rule_id,
            group_name: self.group_name,
            secondary_exposures: self.secondary_exposures,
            undelegated_secondary_exposures: self.undelegated_secondary_exposures,
            explicit_parameters: self.explicit_parameters,
            config_delegate: self.config_delegate,
            is_experiment_group: true,
            evaluation_details: EvalDetails::new(EvaluationReason::Persisted, config_sync_time),
            config_version: None,
        }
    }
}

impl From<&EvalResult> for PersistedValueConfig {
    fn from(result: &EvalResult) -> Self {
        PersistedValueConfig {
            value: result.bool_value,
            json_value: result.json_value.clone(),
            rule_id: result.rule_id.clone(),
            group_name: result.group_name.clone(),
            secondary_exposures: result.secondary_exposures.clone(),
            explicit_parameters: result.explicit_parameters.clone(),
            config_delegate: result.config_delegate.clone(),
            undelegated_secondary_exposures: result.undelegated_secondary_exposures.clone(),
            time: Some(result.evaluation_details.config_sync_time),
        }
    }
}
