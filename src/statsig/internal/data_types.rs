use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct APISpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub _type: String,
    pub salt: String,
    #[serde(default)]
    pub default_value: Value,
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<APIRule>,
    pub id_type: String,
    pub explicit_parameters: Option<Vec<String>>,
    #[serde(default)]
    pub entity: String,
    pub has_shared_params: Option<bool>,
    pub is_active: Option<bool>,
    #[serde(rename = "targetAppIDs")]
    pub target_app_ids: Option<Vec<String>>,
    pub version: Option<u32>,
}

impl APISpec {
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(false)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct APIRule {
    #[serde(default)]
    pub name: String,
    pub pass_percentage: f64,
    #[serde(default)]
    pub return_value: Value,
    pub id: String,
    pub salt: Option<String>,
    #[serde(default)]
    pub conditions: Vec<APICondition>,
    pub id_type: String,
    pub group_name: Option<String>,
    pub config_delegate: Option<String>,
    pub is_experiment_group: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct APICondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub target_value: Option<Value>,
    pub operator: Option<String>,
    pub field: Option<String>,
    pub additional_values: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub id_type: String,
}

/// Wire shape of a `download_config_specs` response. A response with `has_updates == false`
/// usually carries nothing else, so every collection defaults to empty.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct APIDownloadedConfigs {
    #[serde(default)]
    pub feature_gates: Vec<APISpec>,
    #[serde(default)]
    pub dynamic_configs: Vec<APISpec>,
    #[serde(default)]
    pub layer_configs: Vec<APISpec>,
    pub layers: Option<HashMap<String, Vec<String>>>,
    pub has_updates: bool,
    #[serde(default)]
    pub time: u64,
    pub default_environment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_no_updates_response() {
        let parsed: APIDownloadedConfigs =
            serde_json::from_str(r#"{"has_updates": false}"#).unwrap();
        assert!(!parsed.has_updates);
        assert!(parsed.feature_gates.is_empty());
        assert_eq!(parsed.time, 0);
    }

    #[test]
    fn parses_spec_with_optional_fields_missing() {
        let spec: APISpec = serde_json::from_str(
            r#"{
                "name": "a_gate",
                "type": "feature_gate",
                "salt": "a_salt",
                "defaultValue": false,
                "enabled": true,
                "idType": "userID",
                "rules": [{
                    "name": "everyone",
                    "passPercentage": 100,
                    "returnValue": true,
                    "id": "rule_1",
                    "salt": null,
                    "idType": "userID",
                    "conditions": [{"type": "public", "targetValue": null, "operator": null, "field": null, "additionalValues": {}, "idType": "userID"}]
                }]
            }"#,
        )
        .unwrap();

        assert!(!spec.is_active());
        assert_eq!(spec.rules[0].pass_percentage, 100.0);
        assert_eq!(spec.rules[0].conditions[0].condition_type, "public");
        assert!(spec.target_app_ids.is_none());
    }
}
