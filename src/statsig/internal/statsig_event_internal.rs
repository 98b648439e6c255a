use std::collections::HashMap;

use serde_json::{json, Value};

use crate::statsig::statsig_event::{StatsigEvent, StatsigEventInternal};
use crate::StatsigUser;

use super::evaluation::EvalResult;
use super::helpers::get_time_in_millis;

pub(crate) const GATE_EXPOSURE_EVENT: &str = "statsig::gate_exposure";
pub(crate) const CONFIG_EXPOSURE_EVENT: &str = "statsig::config_exposure";
pub(crate) const LAYER_EXPOSURE_EVENT: &str = "statsig::layer_exposure";

pub(crate) fn make_gate_exposure(
    user: &StatsigUser,
    gate_name: &str,
    eval_result: &EvalResult,
    is_manual_exposure: bool,
) -> StatsigEventInternal {
    let mut metadata = HashMap::from([
        ("gate".to_string(), json!(gate_name)),
        ("gateValue".to_string(), json!(eval_result.bool_value.to_string())),
        ("ruleID".to_string(), json!(eval_result.rule_id)),
        ("isManualExposure".to_string(), json!(is_manual_exposure.to_string())),
    ]);
    append_evaluation_metadata(&mut metadata, eval_result);

    let mut event = finalize_event(StatsigEvent {
        user: user.clone(),
        event_name: GATE_EXPOSURE_EVENT.to_string(),
        value: None,
        metadata: Some(metadata),
    });
    event.secondary_exposures = eval_result.secondary_exposures.clone();
    event
}

pub(crate) fn make_config_exposure(
    user: &StatsigUser,
    config_name: &str,
    eval_result: &EvalResult,
    is_manual_exposure: bool,
) -> StatsigEventInternal {
    let mut metadata = HashMap::from([
        ("config".to_string(), json!(config_name)),
        ("ruleID".to_string(), json!(eval_result.rule_id)),
        ("rulePassed".to_string(), json!(eval_result.bool_value.to_string())),
        ("isManualExposure".to_string(), json!(is_manual_exposure.to_string())),
    ]);
    append_evaluation_metadata(&mut metadata, eval_result);

    let mut event = finalize_event(StatsigEvent {
        user: user.clone(),
        event_name: CONFIG_EXPOSURE_EVENT.to_string(),
        value: None,
        metadata: Some(metadata),
    });
    event.secondary_exposures = eval_result.secondary_exposures.clone();
    event
}

/// Explicit parameters are credited to the allocated experiment along with its full exposure
/// trail. Any other parameter belongs to the layer itself and only carries the exposures
/// gathered before delegation.
pub(crate) fn make_layer_exposure(
    user: &StatsigUser,
    layer_name: &str,
    parameter_name: &str,
    eval_result: &EvalResult,
    is_manual_exposure: bool,
) -> StatsigEventInternal {
    let is_explicit = eval_result
        .explicit_parameters
        .as_ref()
        .map_or(false, |params| params.iter().any(|p| p == parameter_name));

    let (allocated_experiment, secondary_exposures) = if is_explicit {
        (
            eval_result.config_delegate.clone().unwrap_or_default(),
            eval_result.secondary_exposures.clone(),
        )
    } else {
        (
            String::new(),
            eval_result.undelegated_secondary_exposures.clone(),
        )
    };

    let mut metadata = HashMap::from([
        ("config".to_string(), json!(layer_name)),
        ("ruleID".to_string(), json!(eval_result.rule_id)),
        ("allocatedExperiment".to_string(), json!(allocated_experiment)),
        ("parameterName".to_string(), json!(parameter_name)),
        ("isExplicitParameter".to_string(), json!(is_explicit.to_string())),
        ("isManualExposure".to_string(), json!(is_manual_exposure.to_string())),
    ]);
    append_evaluation_metadata(&mut metadata, eval_result);

    let mut event = finalize_event(StatsigEvent {
        user: user.clone(),
        event_name: LAYER_EXPOSURE_EVENT.to_string(),
        value: None,
        metadata: Some(metadata),
    });
    event.secondary_exposures = secondary_exposures;
    event
}

pub(crate) fn finalize_event(mut event: StatsigEvent) -> StatsigEventInternal {
    event.user.private_attributes = None;

    StatsigEventInternal {
        event_data: event,
        time: get_time_in_millis(),
        secondary_exposures: vec![],
    }
}

fn append_evaluation_metadata(metadata: &mut HashMap<String, Value>, eval_result: &EvalResult) {
    let details = &eval_result.evaluation_details;
    metadata.insert("reason".to_string(), json!(details.reason.as_str()));
    metadata.insert(
        "time".to_string(),
        json!(details.config_sync_time.to_string()),
    );

    if let Some(version) = eval_result.config_version {
        metadata.insert("configVersion".to_string(), json!(version.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::statsig::internal::evaluation::eval_details::{EvalDetails, EvaluationReason};
    use crate::statsig::internal::SecondaryExposure;

    fn exposure(gate: &str) -> SecondaryExposure {
        SecondaryExposure {
            gate: gate.to_string(),
            gate_value: "false".to_string(),
            rule_id: "default".to_string(),
        }
    }

    fn layer_result() -> EvalResult {
        EvalResult {
            rule_id: "layer_rule".to_string(),
            explicit_parameters: Some(vec!["color".to_string()]),
            config_delegate: Some("an_experiment".to_string()),
            secondary_exposures: vec![exposure("outer"), exposure("inner")],
            undelegated_secondary_exposures: vec![exposure("outer")],
            evaluation_details: EvalDetails::new(EvaluationReason::Network, 123),
            ..EvalResult::default()
        }
    }

    fn metadata_str(event: &StatsigEventInternal, key: &str) -> String {
        event.event_data.metadata.as_ref().unwrap()[key]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn gate_exposure_strips_private_attributes() {
        let mut user = StatsigUser::with_user_id("u".to_string());
        user.private_attributes = Some(HashMap::from([("secret".to_string(), json!("x"))]));

        let result = EvalResult {
            bool_value: true,
            rule_id: "r".to_string(),
            config_version: Some(4),
            evaluation_details: EvalDetails::new(EvaluationReason::Bootstrap, 99),
            ..EvalResult::default()
        };
        let event = make_gate_exposure(&user, "a_gate", &result, true);

        assert_eq!(event.event_data.event_name, GATE_EXPOSURE_EVENT);
        assert!(event.event_data.user.private_attributes.is_none());
        assert_eq!(metadata_str(&event, "gateValue"), "true");
        assert_eq!(metadata_str(&event, "reason"), "Bootstrap");
        assert_eq!(metadata_str(&event, "time"), "99");
        assert_eq!(metadata_str(&event, "isManualExposure"), "true");
        assert_eq!(metadata_str(&event, "configVersion"), "4");
    }

    #[test]
    fn explicit_layer_parameter_credits_allocated_experiment() {
        let user = StatsigUser::with_user_id("u".to_string());
        let event = make_layer_exposure(&user, "a_layer", "color", &layer_result(), false);

        assert_eq!(metadata_str(&event, "allocatedExperiment"), "an_experiment");
        assert_eq!(metadata_str(&event, "isExplicitParameter"), "true");
        assert_eq!(event.secondary_exposures.len(), 2);
    }

    #[test]
    fn implicit_layer_parameter_uses_undelegated_exposures() {
        let user = StatsigUser::with_user_id("u".to_string());
        let event = make_layer_exposure(&user, "a_layer", "size", &layer_result(), false);

        assert_eq!(metadata_str(&event, "allocatedExperiment"), "");
        assert_eq!(metadata_str(&event, "isExplicitParameter"), "false");
        assert_eq!(event.secondary_exposures, vec![exposure("outer")]);
    }
}
