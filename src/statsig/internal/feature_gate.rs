use serde::Serialize;

use super::evaluation::eval_details::EvalDetails;
use super::evaluation::{EvalResult, SecondaryExposure};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGate {
    pub name: String,
    pub value: bool,
    #[serde(rename = "ruleID")]
    pub rule_id: String,
    pub secondary_exposures: Vec<SecondaryExposure>,
    pub evaluation_details: EvalDetails,
}

impl FeatureGate {
    pub(crate) fn from_eval_result(name: &str, eval_result: EvalResult) -> Self {
        FeatureGate {
            name: name.to_string(),
            value: eval_result.bool_value,
            rule_id: eval_result.rule_id,
            secondary_exposures: eval_result.secondary_exposures,
            evaluation_details: eval_result.evaluation_details,
        }
    }
}
