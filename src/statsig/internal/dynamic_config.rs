use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{from_value, Value};

use super::evaluation::eval_details::EvalDetails;
use super::evaluation::{EvalResult, SecondaryExposure};

/// Value of a dynamic config or experiment for one user.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicConfig {
    pub name: String,
    pub value: HashMap<String, Value>,
    #[serde(rename = "ruleID")]
    pub rule_id: String,
    pub group_name: Option<String>,
    pub secondary_exposures: Vec<SecondaryExposure>,
    pub evaluation_details: EvalDetails,
}

impl DynamicConfig {
    /// An override value, for use with an `OverrideAdapter`.
    pub fn new(name: &str, value: HashMap<String, Value>) -> Self {
        DynamicConfig {
            name: name.to_string(),
            value,
            rule_id: "override".to_string(),
            group_name: None,
            secondary_exposures: vec![],
            evaluation_details: EvalDetails::default(),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.value.get(key) {
            Some(value) => from_value(value.clone()).unwrap_or(default),
            None => default,
        }
    }

    pub(crate) fn from_eval_result(name: &str, eval_result: EvalResult) -> Self {
        DynamicConfig {
            name: name.to_string(),
            value: json_object_to_map(eval_result.json_value),
            rule_id: eval_result.rule_id,
            group_name: eval_result.group_name,
            secondary_exposures: eval_result.secondary_exposures,
            evaluation_details: eval_result.evaluation_details,
        }
    }
}

pub(crate) fn json_object_to_map(value: Option<Value>) -> HashMap<String, Value> {
    match value {
        Some(Value::Object(map)) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}
