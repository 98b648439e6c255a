use std::collections::HashMap;
use std::sync::RwLock;

use crate::statsig::internal::{DynamicConfig, Layer};
use crate::{CheckGateOptions, GetConfigOptions, GetExperimentOptions, GetLayerOptions, StatsigUser};

/// Consulted before every evaluation. Returning `Some` replaces the evaluated value.
pub trait OverrideAdapter: Send + Sync {
    fn check_gate(&self, user: &StatsigUser, name: &str, options: &CheckGateOptions) -> Option<bool>;

    fn get_config(
        &self,
        user: &StatsigUser,
        name: &str,
        options: &GetConfigOptions,
    ) -> Option<DynamicConfig>;

    fn get_experiment(
        &self,
        user: &StatsigUser,
        name: &str,
        options: &GetExperimentOptions,
    ) -> Option<DynamicConfig>;

    fn get_layer(&self, user: &StatsigUser, name: &str, options: &GetLayerOptions) -> Option<Layer>;
}

#[derive(Clone, Default)]
struct OverrideStore {
    gates: HashMap<String, bool>,
    configs: HashMap<String, DynamicConfig>,
    experiments: HashMap<String, DynamicConfig>,
    layers: HashMap<String, Layer>,
}

/// In-memory overrides keyed on one of the user's unit ids.
pub struct LocalOverrideAdapter {
    id_type: String,
    store: RwLock<HashMap<String, OverrideStore>>,
}

impl LocalOverrideAdapter {
    pub fn new() -> Self {
        Self::with_id_type("userID")
    }

    pub fn with_id_type(id_type: &str) -> Self {
        LocalOverrideAdapter {
            id_type: id_type.to_string(),
            store: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_gate(&self, user: &StatsigUser, name: &str, value: bool) {
        self.update(user, |s| {
            s.gates.insert(name.to_string(), value);
        });
    }

    pub fn remove_gate(&self, user: &StatsigUser, name: &str) {
        self.update(user, |s| {
            s.gates.remove(name);
        });
    }

    pub fn set_config(&self, user: &StatsigUser, config: DynamicConfig) {
        self.update(user, |s| {
            s.configs.insert(config.name.clone(), config);
        });
    }

    pub fn remove_config(&self, user: &StatsigUser, name: &str) {
        self.update(user, |s| {
            s.configs.remove(name);
        });
    }

    pub fn set_experiment(&self, user: &StatsigUser, experiment: DynamicConfig) {
        self.update(user, |s| {
            s.experiments.insert(experiment.name.clone(), experiment);
        });
    }

    pub fn remove_experiment(&self, user: &StatsigUser, name: &str) {
        self.update(user, |s| {
            s.experiments.remove(name);
        });
    }

    pub fn set_layer(&self, user: &StatsigUser, layer: Layer) {
        self.update(user, |s| {
            s.layers.insert(layer.name.clone(), layer);
        });
    }

    pub fn remove_layer(&self, user: &StatsigUser, name: &str) {
        self.update(user, |s| {
            s.layers.remove(name);
        });
    }

    fn user_key(&self, user: &StatsigUser) -> String {
        user.get_unit_id(&self.id_type).unwrap_or_default()
    }

    fn update(&self, user: &StatsigUser, func: impl FnOnce(&mut OverrideStore)) {
        let key = self.user_key(user);
        if let Ok(mut store) = self.store.write() {
            func(store.entry(key).or_default());
        }
    }

    fn read<T>(&self, user: &StatsigUser, func: impl FnOnce(&OverrideStore) -> Option<T>) -> Option<T> {
        let store = self.store.read().ok()?;
        func(store.get(&self.user_key(user))?)
    }
}

impl Default for LocalOverrideAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideAdapter for LocalOverrideAdapter {
    fn check_gate(&self, user: &StatsigUser, name: &str, _options: &CheckGateOptions) -> Option<bool> {
        self.read(user, |s| s.gates.get(name).copied())
    }

    fn get_config(
        &self,
        user: &StatsigUser,
        name: &str,
        _options: &GetConfigOptions,
    ) -> Option<DynamicConfig> {
        self.read(user, |s| s.configs.get(name).cloned())
    }

    fn get_experiment(
        &self,
        user: &StatsigUser,
        name: &str,
        _options: &GetExperimentOptions,
    ) -> Option<DynamicConfig> {
        self.read(user, |s| s.experiments.get(name).cloned())
    }

    fn get_layer(&self, user: &StatsigUser, name: &str, _options: &GetLayerOptions) -> Option<Layer> {
        self.read(user, |s| s.layers.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn overrides_are_scoped_to_the_user() {
        let adapter = LocalOverrideAdapter::new();
        let user_a = StatsigUser::with_user_id("a".to_string());
        let user_b = StatsigUser::with_user_id("b".to_string());
        let options = CheckGateOptions::default();

        adapter.set_gate(&user_a, "a_gate", true);
        assert_eq!(adapter.check_gate(&user_a, "a_gate", &options), Some(true));
        assert_eq!(adapter.check_gate(&user_b, "a_gate", &options), None);

        adapter.remove_gate(&user_a, "a_gate");
        assert_eq!(adapter.check_gate(&user_a, "a_gate", &options), None);
    }

    #[test]
    fn configs_and_experiments_are_stored_separately() {
        let adapter = LocalOverrideAdapter::new();
        let user = StatsigUser::with_user_id("a".to_string());
        let config = DynamicConfig::new("shared_name", HashMap::from([("k".to_string(), json!(1))]));

        adapter.set_experiment(&user, config);
        assert!(adapter
            .get_config(&user, "shared_name", &GetConfigOptions::default())
            .is_none());
        let experiment = adapter
            .get_experiment(&user, "shared_name", &GetExperimentOptions::default())
            .unwrap();
        assert_eq!(experiment.get("k", 0), 1);
    }

    #[test]
    fn custom_id_type_keys_overrides() {
        let adapter = LocalOverrideAdapter::with_id_type("deviceID");
        let user = StatsigUser::with_custom_ids(HashMap::from([(
            "deviceID".to_string(),
            "d1".to_string(),
        )]));
        let other_device = StatsigUser::with_custom_ids(HashMap::from([(
            "deviceID".to_string(),
            "d2".to_string(),
        )]));

        adapter.set_layer(&user, Layer::new("a_layer", HashMap::new()));
        let options = GetLayerOptions::default();
        assert!(adapter.get_layer(&user, "a_layer", &options).is_some());
        assert!(adapter.get_layer(&other_device, "a_layer", &options).is_none());
    }
}
