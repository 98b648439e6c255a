use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{from_value, Value};

use crate::StatsigUser;

use super::dynamic_config::json_object_to_map;
use super::evaluation::eval_details::EvalDetails;
use super::evaluation::{EvalResult, SecondaryExposure};
use super::statsig_logger::StatsigLogger;

/// Value of a layer for one user. Reading a parameter with `get` logs a layer exposure for
/// that parameter unless exposure logging was disabled when the layer was fetched.
#[derive(Clone)]
pub struct Layer {
    pub name: String,
    pub rule_id: String,
    pub group_name: Option<String>,
    pub value: HashMap<String, Value>,
    pub secondary_exposures: Vec<SecondaryExposure>,
    pub allocated_experiment_name: Option<String>,
    pub evaluation_details: EvalDetails,

    pub(crate) log_data: Option<LayerLogData>,
}

#[derive(Clone)]
pub struct LayerLogData {
    pub(crate) user: StatsigUser,
    pub(crate) eval_result: EvalResult,
    pub(crate) logger: Arc<StatsigLogger>,
}

impl Layer {
    /// An override value, for use with an `OverrideAdapter`.
    pub fn new(name: &str, value: HashMap<String, Value>) -> Self {
        Layer {
            name: name.to_string(),
            rule_id: "override".to_string(),
            group_name: None,
            value,
            secondary_exposures: vec![],
            allocated_experiment_name: None,
            evaluation_details: EvalDetails::default(),
            log_data: None,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let value = match self.value.get(key) {
            Some(value) => value,
            None => return default,
        };

        match from_value(value.clone()) {
            Ok(typed) => {
                self.log_parameter_exposure(key);
                typed
            }
            Err(_) => default,
        }
    }

    pub(crate) fn from_eval_result(
        name: &str,
        eval_result: EvalResult,
        log_data: Option<LayerLogData>,
    ) -> Self {
        Layer {
            name: name.to_string(),
            rule_id: eval_result.rule_id,
            group_name: eval_result.group_name,
            value: json_object_to_map(eval_result.json_value),
            secondary_exposures: eval_result.secondary_exposures,
            allocated_experiment_name: eval_result.config_delegate,
            evaluation_details: eval_result.evaluation_details,
            log_data,
        }
    }

    fn log_parameter_exposure(&self, parameter_name: &str) {
        if let Some(data) = &self.log_data {
            data.logger.log_layer_exposure(
                &data.user,
                &self.name,
                parameter_name,
                &data.eval_result,
                false,
            );
        }
    }
}
