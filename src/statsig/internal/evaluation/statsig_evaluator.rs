use std::sync::Arc;

use log::warn;
use serde_json::Value::Null;
use serde_json::{json, Value};

use crate::statsig::internal::data_types::{APICondition, APIRule, APISpec};
use crate::statsig::internal::helpers::get_time_in_millis;
use crate::statsig::internal::statsig_store::StatsigStore;
use crate::statsig::statsig_error::EvaluationError;
use crate::statsig::statsig_override_adapter::OverrideAdapter;
use crate::statsig::statsig_persistent_storage::{
    get_storage_key, PersistedValues, UserPersistentStorage,
};
use crate::{
    unwrap_or_return, CheckGateOptions, GetConfigOptions, GetExperimentOptions, GetLayerOptions,
    StatsigOptions, StatsigUser,
};

use super::eval_details::{EvalDetails, EvaluationReason};
use super::eval_helpers::{
    compare_numbers, compare_str_with_regex, compare_strings_in_array, compare_time,
    compare_versions, value_to_f64, value_to_string,
};
use super::eval_result::{EvalResult, PersistedValueConfig, SecondaryExposure};
use super::specs::Specs;
use super::user_hasher::UserHasher;

pub struct StatsigEvaluator {
    spec_store: Arc<StatsigStore>,
    hasher: UserHasher,
    override_adapter: Option<Arc<dyn OverrideAdapter>>,
    persistent_storage: Option<Arc<dyn UserPersistentStorage>>,
    max_evaluation_depth: u32,
}

impl StatsigEvaluator {
    pub fn new(spec_store: Arc<StatsigStore>, options: &StatsigOptions) -> StatsigEvaluator {
        StatsigEvaluator {
            spec_store,
            hasher: UserHasher::new(),
            override_adapter: options.override_adapter.clone(),
            persistent_storage: options.user_persistent_storage.clone(),
            max_evaluation_depth: options.max_evaluation_depth,
        }
    }

    pub fn check_gate(
        &self,
        user: &StatsigUser,
        gate_name: &str,
        options: &CheckGateOptions,
    ) -> EvalResult {
        let specs = self.spec_store.get_specs();
        self.check_gate_with_specs(user, gate_name, options, &specs, 0)
    }

    /// Dynamic configs never read or write persisted values.
    pub fn get_config(
        &self,
        user: &StatsigUser,
        config_name: &str,
        options: &GetConfigOptions,
    ) -> EvalResult {
        let specs = self.spec_store.get_specs();

        if let Some(adapter) = &self.override_adapter {
            if let Some(config) = adapter.get_config(user, config_name, options) {
                return EvalResult::from_config_override(&config, specs.lcut);
            }
        }

        if specs.init_reason == EvaluationReason::Uninitialized {
            return EvalResult::uninitialized();
        }

        match specs.configs.get(config_name) {
            Some(spec) => self.eval_spec(user, spec, &specs, 0),
            None => EvalResult::unrecognized(specs.lcut),
        }
    }

    pub fn get_experiment(
        &self,
        user: &StatsigUser,
        experiment_name: &str,
        options: &GetExperimentOptions,
    ) -> EvalResult {
        let specs = self.spec_store.get_specs();

        if let Some(adapter) = &self.override_adapter {
            if let Some(experiment) = adapter.get_experiment(user, experiment_name, options) {
                return EvalResult::from_config_override(&experiment, specs.lcut);
            }
        }

        if specs.init_reason == EvaluationReason::Uninitialized {
            return EvalResult::uninitialized();
        }

        let spec = unwrap_or_return!(
            specs.configs.get(experiment_name),
            EvalResult::unrecognized(specs.lcut)
        );

        self.eval_experiment_with_persisted_values(
            user,
            experiment_name,
            spec,
            options.user_persisted_values.as_ref(),
            &specs,
        )
    }

    pub fn get_layer(
        &self,
        user: &StatsigUser,
        layer_name: &str,
        options: &GetLayerOptions,
    ) -> EvalResult {
        let specs = self.spec_store.get_specs();

        if let Some(adapter) = &self.override_adapter {
            if let Some(layer) = adapter.get_layer(user, layer_name, options) {
                return EvalResult::from_layer_override(&layer, specs.lcut);
            }
        }

        if specs.init_reason == EvaluationReason::Uninitialized {
            return EvalResult::uninitialized();
        }

        let spec = unwrap_or_return!(
            specs.layers.get(layer_name),
            EvalResult::unrecognized(specs.lcut)
        );

        self.eval_layer_with_persisted_values(
            user,
            layer_name,
            spec,
            options.user_persisted_values.as_ref(),
            &specs,
        )
    }

    fn check_gate_with_specs(
        &self,
        user: &StatsigUser,
        gate_name: &str,
        options: &CheckGateOptions,
        specs: &Specs,
        depth: u32,
    ) -> EvalResult {
        if let Some(adapter) = &self.override_adapter {
            if let Some(value) = adapter.check_gate(user, gate_name, options) {
                return EvalResult::from_gate_override(value, specs.lcut);
            }
        }

        if specs.init_reason == EvaluationReason::Uninitialized {
            return EvalResult::uninitialized();
        }

        match specs.gates.get(gate_name) {
            Some(spec) => self.eval_spec(user, spec, specs, depth),
            None => EvalResult::unrecognized(specs.lcut),
        }
    }

    /* -- Persisted values -- */

    fn eval_experiment_with_persisted_values(
        &self,
        user: &StatsigUser,
        name: &str,
        spec: &APISpec,
        persisted_values: Option<&PersistedValues>,
        specs: &Specs,
    ) -> EvalResult {
        let persisted_values = match persisted_values {
            Some(values) if spec.is_active() => values,
            _ => return self.eval_and_delete_persisted_value(user, name, spec, specs),
        };

        let sticky = match persisted_values.get(name) {
            Some(raw) => self.parse_persisted_value(name, raw),
            None => return self.eval_and_save_persisted_value(user, name, spec, specs),
        };

        match sticky {
            Some(result)
                if result.config_delegate.is_none()
                    || allocated_experiment_is_active(&result, specs) =>
            {
                result
            }
            Some(_) => self.eval_and_delete_persisted_value(user, name, spec, specs),
            None => {
                self.delete_persisted_value(user, name, spec);
                self.eval_and_save_persisted_value(user, name, spec, specs)
            }
        }
    }

    fn eval_layer_with_persisted_values(
        &self,
        user: &StatsigUser,
        name: &str,
        spec: &APISpec,
        persisted_values: Option<&PersistedValues>,
        specs: &Specs,
    ) -> EvalResult {
        let persisted_values = match persisted_values {
            Some(values) => values,
            None => return self.eval_and_delete_persisted_value(user, name, spec, specs),
        };

        if let Some(raw) = persisted_values.get(name) {
            return match self.parse_persisted_value(name, raw) {
                Some(result)
                    if allocated_experiment_is_active(&result, specs)
                        && allocated_experiment_in_layer(&result, name, specs) =>
                {
                    result
                }
                _ => self.eval_and_delete_persisted_value(user, name, spec, specs),
            };
        }

        let result = self.eval_spec(user, spec, specs, 0);
        if allocated_experiment_is_active(&result, specs) {
            if result.is_experiment_group {
                self.save_persisted_value(user, name, spec, &result);
            }
        } else {
            self.delete_persisted_value(user, name, spec);
        }

        result
    }

    fn eval_and_save_persisted_value(
        &self,
        user: &StatsigUser,
        name: &str,
        spec: &APISpec,
        specs: &Specs,
    ) -> EvalResult {
        let result = self.eval_spec(user, spec, specs, 0);
        if result.is_experiment_group {
            self.save_persisted_value(user, name, spec, &result);
        }
        result
    }

    fn eval_and_delete_persisted_value(
        &self,
        user: &StatsigUser,
        name: &str,
        spec: &APISpec,
        specs: &Specs,
    ) -> EvalResult {
        self.delete_persisted_value(user, name, spec);
        self.eval_spec(user, spec, specs, 0)
    }

    fn parse_persisted_value(&self, name: &str, raw: &str) -> Option<EvalResult> {
        match PersistedValueConfig::from_json(raw) {
            Ok(persisted) => Some(persisted.into_eval_result()),
            Err(e) => {
                warn!(target: "statsig", "Discarding unreadable persisted value for {}: {}", name, e);
                None
            }
        }
    }

    fn save_persisted_value(&self, user: &StatsigUser, name: &str, spec: &APISpec, result: &EvalResult) {
        let storage = unwrap_or_return!(&self.persistent_storage, ());

        match PersistedValueConfig::from(result).to_json() {
            Ok(data) => storage.save(&get_storage_key(user, &spec.id_type), name, &data),
            Err(e) => warn!(target: "statsig", "Failed to serialize persisted value for {}: {}", name, e),
        }
    }

    fn delete_persisted_value(&self, user: &StatsigUser, name: &str, spec: &APISpec) {
        if let Some(storage) = &self.persistent_storage {
            storage.delete(&get_storage_key(user, &spec.id_type), name);
        }
    }

    /* -- Evaluation -- */

    fn eval_spec(&self, user: &StatsigUser, spec: &APISpec, specs: &Specs, depth: u32) -> EvalResult {
        match self.eval_spec_impl(user, spec, specs, depth) {
            Ok(result) => result,
            Err(e) => {
                warn!(target: "statsig", "{} while evaluating {}", e, spec.name);
                EvalResult::unsupported(spec, specs.lcut)
            }
        }
    }

    fn eval_spec_impl(
        &self,
        user: &StatsigUser,
        spec: &APISpec,
        specs: &Specs,
        depth: u32,
    ) -> Result<EvalResult, EvaluationError> {
        let evaluation_details = EvalDetails::new(specs.init_reason, specs.lcut);

        if !spec.enabled {
            return Ok(EvalResult::disabled(spec, evaluation_details));
        }

        let mut exposures: Vec<SecondaryExposure> = vec![];

        for rule in spec.rules.iter() {
            let result = self.eval_rule(user, rule, specs, depth)?;
            exposures.extend(result.secondary_exposures);

            if !result.bool_value {
                continue;
            }

            if let Some(delegated_result) = self.eval_delegate(user, rule, &exposures, specs, depth)? {
                return Ok(delegated_result);
            }

            let pass = self.eval_pass_percentage(user, rule, &spec.salt);
            return Ok(EvalResult {
                bool_value: pass,
                json_value: match pass {
                    true => result.json_value,
                    false => Some(spec.default_value.clone()),
                },
                rule_id: result.rule_id,
                group_name: result.group_name,
                is_experiment_group: result.is_experiment_group,
                evaluation_details,
                config_version: spec.version,
                ..EvalResult::default()
            }
            .with_secondary_exposures(exposures));
        }

        Ok(EvalResult::fallthrough(spec, exposures, evaluation_details))
    }

    // Every condition is evaluated so the exposure trail is complete even once the rule
    // has already failed.
    fn eval_rule(
        &self,
        user: &StatsigUser,
        rule: &APIRule,
        specs: &Specs,
        depth: u32,
    ) -> Result<EvalResult, EvaluationError> {
        let mut exposures: Vec<SecondaryExposure> = vec![];
        let mut pass = true;

        for condition in rule.conditions.iter() {
            let result = self.eval_condition(user, condition, specs, depth)?;
            exposures.extend(result.secondary_exposures);

            if !result.bool_value {
                pass = false;
            }
        }

        Ok(EvalResult {
            bool_value: pass,
            json_value: Some(rule.return_value.clone()),
            rule_id: rule.id.clone(),
            group_name: rule.group_name.clone(),
            is_experiment_group: rule.is_experiment_group.unwrap_or(false),
            ..EvalResult::default()
        }
        .with_secondary_exposures(exposures))
    }

    fn eval_delegate(
        &self,
        user: &StatsigUser,
        rule: &APIRule,
        exposures: &[SecondaryExposure],
        specs: &Specs,
        depth: u32,
    ) -> Result<Option<EvalResult>, EvaluationError> {
        let delegate = unwrap_or_return!(&rule.config_delegate, Ok(None));
        let delegate_spec = unwrap_or_return!(specs.configs.get(delegate), Ok(None));
        self.check_depth(depth)?;

        let result = self.eval_spec(user, delegate_spec, specs, depth + 1);
        Ok(Some(EvalResult::delegated(
            result,
            exposures.to_vec(),
            delegate,
            delegate_spec.explicit_parameters.clone(),
        )))
    }

    fn eval_condition(
        &self,
        user: &StatsigUser,
        condition: &APICondition,
        specs: &Specs,
        depth: u32,
    ) -> Result<EvalResult, EvaluationError> {
        let target_value = condition.target_value.clone().unwrap_or(Null);
        let condition_type = condition.condition_type.to_lowercase();

        let value = match condition_type.as_str() {
            "public" => return Ok(EvalResult::boolean(true)),
            "fail_gate" | "pass_gate" => {
                return self.eval_nested_gate(user, &target_value, &condition_type, specs, depth)
            }
            "ip_based" | "ua_based" | "user_field" => user.get_user_value(&condition.field),
            "environment_field" => user.get_value_from_environment(&condition.field),
            "current_time" => json!(get_time_in_millis()),
            "user_bucket" => json!(self.get_hash_for_user_bucket(user, condition)),
            "unit_id" => json!(user.get_unit_id(&condition.id_type)),
            _ => {
                return Err(EvaluationError::Unsupported(format!(
                    "condition type {}",
                    condition.condition_type
                )))
            }
        };

        let operator = match &condition.operator {
            Some(operator) => operator.as_str(),
            None => {
                return Err(EvaluationError::Unsupported(
                    "condition without operator".to_string(),
                ))
            }
        };

        let result = match operator {
            // numerical comparison
            "gt" | "gte" | "lt" | "lte" => {
                compare_numbers(&value, &target_value, operator).unwrap_or(false)
            }

            // version comparison
            "version_gt" | "version_gte" | "version_lt" | "version_lte" | "version_eq"
            | "version_neq" => compare_versions(&value, &target_value, operator).unwrap_or(false),

            // string/array comparison
            "any" | "none" | "str_starts_with_any" | "str_ends_with_any" | "str_contains_any"
            | "str_contains_none" => compare_strings_in_array(&value, &target_value, operator, true),
            "any_case_sensitive" | "none_case_sensitive" => {
                compare_strings_in_array(&value, &target_value, operator, false)
            }
            "str_matches" => compare_str_with_regex(&value, &target_value),

            // time comparison
            "before" | "after" | "on" => {
                compare_time(&value, &target_value, operator).unwrap_or(false)
            }

            "eq" => values_equal(&value, &target_value),
            "neq" => !values_equal(&value, &target_value),

            _ => {
                return Err(EvaluationError::Unsupported(format!(
                    "operator {}",
                    operator
                )))
            }
        };

        Ok(EvalResult::boolean(result))
    }

    // Segments are internal and never recorded as secondary exposures.
    fn eval_nested_gate(
        &self,
        user: &StatsigUser,
        target_value: &Value,
        condition_type: &str,
        specs: &Specs,
        depth: u32,
    ) -> Result<EvalResult, EvaluationError> {
        self.check_depth(depth)?;

        let gate_name = value_to_string(target_value).unwrap_or_default();
        let result = self.check_gate_with_specs(
            user,
            &gate_name,
            &CheckGateOptions::default(),
            specs,
            depth + 1,
        );

        let mut exposures = result.secondary_exposures;
        if !gate_name.starts_with("segment:") {
            exposures.push(SecondaryExposure {
                gate: gate_name,
                gate_value: result.bool_value.to_string(),
                rule_id: result.rule_id,
            });
        }

        let gate_value = match condition_type {
            "fail_gate" => !result.bool_value,
            _ => result.bool_value,
        };

        Ok(EvalResult {
            json_value: result.json_value,
            ..EvalResult::boolean(gate_value)
        }
        .with_secondary_exposures(exposures))
    }

    fn check_depth(&self, depth: u32) -> Result<(), EvaluationError> {
        if depth >= self.max_evaluation_depth {
            return Err(EvaluationError::Unsupported(format!(
                "evaluation depth exceeded {}",
                self.max_evaluation_depth
            )));
        }
        Ok(())
    }

    fn eval_pass_percentage(&self, user: &StatsigUser, rule: &APIRule, spec_salt: &str) -> bool {
        let rule_salt = rule.salt.as_ref().unwrap_or(&rule.id);
        let unit_id = user.get_unit_id(&rule.id_type).unwrap_or_default();
        let hash = self
            .hasher
            .hash(&format!("{}.{}.{}", spec_salt, rule_salt, unit_id));

        hash % 10000 < (rule.pass_percentage * 100.0) as u64
    }

    fn get_hash_for_user_bucket(&self, user: &StatsigUser, condition: &APICondition) -> u64 {
        let unit_id = user.get_unit_id(&condition.id_type).unwrap_or_default();
        let salt = condition
            .additional_values
            .as_ref()
            .and_then(|values| values.get("salt"))
            .and_then(value_to_string)
            .unwrap_or_default();

        self.hasher.hash(&format!("{}.{}", salt, unit_id)) % 1000
    }
}

fn allocated_experiment_is_active(result: &EvalResult, specs: &Specs) -> bool {
    result
        .config_delegate
        .as_ref()
        .and_then(|delegate| specs.configs.get(delegate))
        .map_or(false, |spec| spec.is_active())
}

// A sticky layer value is stale once its experiment moves to another layer.
fn allocated_experiment_in_layer(result: &EvalResult, layer_name: &str, specs: &Specs) -> bool {
    result
        .config_delegate
        .as_ref()
        .and_then(|delegate| specs.experiment_to_layer.get(delegate))
        .map_or(false, |layer| layer == layer_name)
}

// Numbers compare by value so 759 and 759.0 are equal.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => value_to_f64(left) == value_to_f64(right),
        _ => left == right,
    }
}
