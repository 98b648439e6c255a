use std::collections::HashMap;
use std::sync::Arc;

use super::statsig_adapters::{EventLoggingAdapter, SpecsAdapter};
use super::statsig_datastore::StatsigDatastore;
use super::statsig_override_adapter::OverrideAdapter;
use super::statsig_persistent_storage::{PersistedValues, UserPersistentStorage};

#[derive(Clone)]
pub struct StatsigOptions {
    pub environment: Option<HashMap<String, String>>,
    pub api: String,
    /// 0 waits for the first download without a deadline.
    pub init_timeout_ms: u64,
    /// A `download_config_specs` payload. When set, initialize does not touch the network.
    pub initialize_values: Option<String>,
    /// 0 disables background syncing.
    pub rulesets_sync_interval_ms: u32,
    pub logger_max_queue_size: u32,
    pub logger_flush_interval_ms: u32,
    pub max_evaluation_depth: u32,
    pub override_adapter: Option<Arc<dyn OverrideAdapter>>,
    pub user_persistent_storage: Option<Arc<dyn UserPersistentStorage>>,
    pub datastore: Option<Arc<dyn StatsigDatastore>>,
    pub specs_adapter: Option<Arc<dyn SpecsAdapter>>,
    pub event_logging_adapter: Option<Arc<dyn EventLoggingAdapter>>,
}

impl StatsigOptions {
    pub fn set_tier(&mut self, tier: &str) {
        self.set_environment_parameter("tier", tier);
    }

    pub fn set_environment_parameter(&mut self, key: &str, value: &str) {
        self.environment
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
    }
}

impl Default for StatsigOptions {
    fn default() -> Self {
        StatsigOptions {
            environment: None,
            api: "https://statsigapi.net/v1".to_string(),
            init_timeout_ms: 6_000,
            initialize_values: None,
            rulesets_sync_interval_ms: 10_000,
            logger_max_queue_size: 500,
            logger_flush_interval_ms: 60_000,
            max_evaluation_depth: 100,
            override_adapter: None,
            user_persistent_storage: None,
            datastore: None,
            specs_adapter: None,
            event_logging_adapter: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CheckGateOptions {
    pub disable_exposure_logging: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GetConfigOptions {
    pub disable_exposure_logging: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GetExperimentOptions {
    pub disable_exposure_logging: bool,
    pub user_persisted_values: Option<PersistedValues>,
}

#[derive(Clone, Debug, Default)]
pub struct GetLayerOptions {
    pub disable_exposure_logging: bool,
    pub user_persisted_values: Option<PersistedValues>,
}

#[cfg(test)]
mod tests {
    use super::StatsigOptions;

    #[test]
    fn tier_is_stored_in_environment() {
        let mut options = StatsigOptions::default();
        options.set_tier("staging");
        options.set_environment_parameter("region", "eu");

        let environment = options.environment.unwrap();
        assert_eq!(environment.get("tier").map(String::as_str), Some("staging"));
        assert_eq!(environment.get("region").map(String::as_str), Some("eu"));
    }
}
