use std::sync::{Arc, RwLock};

use log::{debug, warn};

use crate::statsig::statsig_adapters::SpecsAdapter;
use crate::statsig::statsig_datastore::{StatsigDatastore, CONFIG_SPEC_KEY};
use crate::statsig::statsig_error::StatsigError;

use super::data_types::APIDownloadedConfigs;
use super::evaluation::eval_details::EvaluationReason;
use super::evaluation::specs::Specs;

/// Holds the current spec snapshot. Updates build a fresh `Specs` and swap the pointer, so a
/// reader holding an `Arc<Specs>` never sees a half-applied bundle.
pub struct StatsigStore {
    specs: RwLock<Arc<Specs>>,
    specs_adapter: Arc<dyn SpecsAdapter>,
    datastore: Option<Arc<dyn StatsigDatastore>>,
}

impl StatsigStore {
    pub fn new(
        specs_adapter: Arc<dyn SpecsAdapter>,
        datastore: Option<Arc<dyn StatsigDatastore>>,
    ) -> StatsigStore {
        StatsigStore {
            specs: RwLock::new(Arc::new(Specs::new())),
            specs_adapter,
            datastore,
        }
    }

    pub fn get_specs(&self) -> Arc<Specs> {
        match self.specs.read() {
            Ok(specs) => specs.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn get_lcut(&self) -> u64 {
        self.get_specs().lcut
    }

    /// Applies a bundle. Returns false when the bundle had nothing new: `has_updates` unset,
    /// or older than what is already held. A bundle without updates still confirms the held
    /// data, so only the reason is refreshed.
    pub fn set_downloaded_configs(
        &self,
        downloaded_configs: APIDownloadedConfigs,
        reason: EvaluationReason,
    ) -> bool {
        let mut specs = match self.specs.write() {
            Ok(specs) => specs,
            Err(_) => return false,
        };

        if !downloaded_configs.has_updates {
            debug!(target: "statsig", "Received config specs without updates");
            if specs.init_reason != reason {
                *specs = Arc::new(specs.with_reason(reason));
            }
            return false;
        }

        if specs.init_reason != EvaluationReason::Uninitialized
            && downloaded_configs.time < specs.lcut
        {
            debug!(
                target: "statsig",
                "Ignoring config specs from {} older than current {}",
                downloaded_configs.time,
                specs.lcut
            );
            return false;
        }

        *specs = Arc::new(Specs::from_downloaded_configs(downloaded_configs, reason));
        true
    }

    /// Applies a bootstrap payload. A payload that fails to parse keeps the current data but
    /// marks it `InvalidBootstrap`.
    pub fn bootstrap(&self, initialize_values: &str) -> bool {
        match serde_json::from_str::<APIDownloadedConfigs>(initialize_values) {
            Ok(configs) => self.set_downloaded_configs(configs, EvaluationReason::Bootstrap),
            Err(e) => {
                warn!(target: "statsig", "Failed to parse bootstrap values: {}", e);
                if let Ok(mut specs) = self.specs.write() {
                    *specs = Arc::new(specs.with_reason(EvaluationReason::InvalidBootstrap));
                }
                false
            }
        }
    }

    pub async fn load_from_datastore(&self) -> bool {
        let datastore = match &self.datastore {
            Some(datastore) => datastore,
            None => return false,
        };

        let raw = match datastore.get(CONFIG_SPEC_KEY).await {
            Some(raw) => raw,
            None => return false,
        };

        match serde_json::from_str::<APIDownloadedConfigs>(&raw) {
            Ok(configs) => self.set_downloaded_configs(configs, EvaluationReason::Cache),
            Err(e) => {
                warn!(target: "statsig", "Failed to parse cached config specs: {}", e);
                false
            }
        }
    }

    /// Fetches the latest bundle. Successful updates are written back to the datastore.
    pub async fn download_config_specs(&self) -> Result<bool, StatsigError> {
        let raw = self.specs_adapter.fetch_specs(self.get_lcut()).await?;

        let configs = serde_json::from_str::<APIDownloadedConfigs>(&raw)
            .map_err(|e| StatsigError::MalformedSpecs(e.to_string()))?;

        let updated = self.set_downloaded_configs(configs, EvaluationReason::Network);
        if updated {
            if let Some(datastore) = &self.datastore {
                datastore.set(CONFIG_SPEC_KEY, &raw).await;
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::thread;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::statsig::internal::evaluation::StatsigEvaluator;
    use crate::{CheckGateOptions, StatsigOptions, StatsigUser};

    struct FixedSpecsAdapter {
        response: Result<String, StatsigError>,
    }

    #[async_trait]
    impl SpecsAdapter for FixedSpecsAdapter {
        async fn fetch_specs(&self, _since_time: u64) -> Result<String, StatsigError> {
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct MemoryDatastore {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl StatsigDatastore for MemoryDatastore {
        async fn get(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }

        async fn set(&self, key: &str, value: &str) {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }
    }

    fn bundle(time: u64, gate_name: &str) -> String {
        json!({
            "has_updates": true,
            "time": time,
            "feature_gates": [{
                "name": gate_name,
                "type": "feature_gate",
                "salt": "salt",
                "defaultValue": false,
                "enabled": true,
                "rules": [],
                "idType": "userID",
                "entity": "feature_gate"
            }],
            "dynamic_configs": [],
            "layer_configs": [],
            "layers": {"a_layer": ["exp_1", "exp_2"]}
        })
        .to_string()
    }

    fn make_store(response: Result<String, StatsigError>) -> StatsigStore {
        StatsigStore::new(Arc::new(FixedSpecsAdapter { response }), None)
    }

    #[test]
    fn bootstrap_swaps_in_new_snapshot() {
        let store = make_store(Ok(String::new()));
        let before = store.get_specs();

        assert!(store.bootstrap(&bundle(100, "gate_a")));

        let after = store.get_specs();
        assert_eq!(before.init_reason, EvaluationReason::Uninitialized);
        assert!(before.gates.is_empty());
        assert_eq!(after.init_reason, EvaluationReason::Bootstrap);
        assert_eq!(after.lcut, 100);
        assert!(after.gates.contains_key("gate_a"));
        assert_eq!(after.experiment_to_layer.get("exp_2").map(String::as_str), Some("a_layer"));
    }

    #[test]
    fn no_update_bundle_leaves_store_untouched() {
        let store = make_store(Ok(String::new()));
        store.bootstrap(&bundle(100, "gate_a"));

        let applied = store.bootstrap(&json!({"has_updates": false, "time": 500}).to_string());

        let specs = store.get_specs();
        assert!(!applied);
        assert_eq!(specs.lcut, 100);
        assert!(specs.gates.contains_key("gate_a"));
        assert_eq!(specs.init_reason, EvaluationReason::Bootstrap);
    }

    #[tokio::test]
    async fn no_update_download_confirms_cached_data() {
        let datastore = Arc::new(MemoryDatastore::default());
        datastore.set(CONFIG_SPEC_KEY, &bundle(100, "gate_cached")).await;
        let store = StatsigStore::new(
            Arc::new(FixedSpecsAdapter {
                response: Ok(json!({"has_updates": false}).to_string()),
            }),
            Some(datastore),
        );
        store.load_from_datastore().await;

        assert!(!store.download_config_specs().await.unwrap());

        let specs = store.get_specs();
        assert_eq!(specs.init_reason, EvaluationReason::Network);
        assert_eq!(specs.lcut, 100);
        assert!(specs.gates.contains_key("gate_cached"));
    }

    #[test]
    fn older_bundle_is_ignored() {
        let store = make_store(Ok(String::new()));
        store.bootstrap(&bundle(100, "gate_a"));

        assert!(!store.bootstrap(&bundle(50, "gate_b")));
        assert!(store.get_specs().gates.contains_key("gate_a"));
    }

    #[test]
    fn invalid_bootstrap_keeps_data_and_marks_reason() {
        let store = make_store(Ok(String::new()));
        store.bootstrap(&bundle(100, "gate_a"));

        assert!(!store.bootstrap("{not json"));

        let specs = store.get_specs();
        assert_eq!(specs.init_reason, EvaluationReason::InvalidBootstrap);
        assert!(specs.gates.contains_key("gate_a"));
    }

    #[tokio::test]
    async fn download_writes_datastore_and_cache_reloads() {
        let datastore = Arc::new(MemoryDatastore::default());
        let store = StatsigStore::new(
            Arc::new(FixedSpecsAdapter {
                response: Ok(bundle(200, "gate_net")),
            }),
            Some(datastore.clone()),
        );

        assert!(store.download_config_specs().await.unwrap());
        assert_eq!(store.get_specs().init_reason, EvaluationReason::Network);

        let cached = StatsigStore::new(
            Arc::new(FixedSpecsAdapter {
                response: Ok(String::new()),
            }),
            Some(datastore),
        );
        assert!(cached.load_from_datastore().await);
        let specs = cached.get_specs();
        assert_eq!(specs.init_reason, EvaluationReason::Cache);
        assert!(specs.gates.contains_key("gate_net"));
    }

    #[tokio::test]
    async fn malformed_download_is_an_error() {
        let store = make_store(Ok("<html>".to_string()));

        let result = store.download_config_specs().await;

        assert!(matches!(result, Err(StatsigError::MalformedSpecs(_))));
        assert_eq!(store.get_specs().init_reason, EvaluationReason::Uninitialized);
    }

    fn ruled_bundle(time: u64, rule_id: &str) -> String {
        json!({
            "has_updates": true,
            "time": time,
            "feature_gates": [{
                "name": "shared_gate",
                "type": "feature_gate",
                "salt": "salt",
                "defaultValue": false,
                "enabled": true,
                "idType": "userID",
                "entity": "feature_gate",
                "rules": [{
                    "name": rule_id,
                    "id": rule_id,
                    "passPercentage": 100,
                    "returnValue": true,
                    "idType": "userID",
                    "conditions": [{"type": "public", "idType": "userID"}]
                }]
            }],
            "dynamic_configs": [],
            "layer_configs": []
        })
        .to_string()
    }

    #[test]
    fn concurrent_evaluations_see_whole_snapshots() {
        let store = Arc::new(make_store(Ok(String::new())));
        store.bootstrap(&ruled_bundle(1000, "even_rule"));
        let evaluator = StatsigEvaluator::new(store.clone(), &StatsigOptions::default());
        let user = StatsigUser::with_user_id("a".to_string());
        let done = AtomicBool::new(false);
        let (evaluator, user, done) = (&evaluator, &user, &done);

        thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(move || {
                        let mut checked = 0;
                        while !done.load(Ordering::Acquire) || checked == 0 {
                            let result =
                                evaluator.check_gate(user, "shared_gate", &CheckGateOptions::default());
                            let time = result.evaluation_details.config_sync_time;
                            let expected = if time % 2 == 0 { "even_rule" } else { "odd_rule" };
                            assert!(result.bool_value);
                            assert_eq!(result.rule_id, expected, "mixed snapshot at lcut {}", time);
                            checked += 1;
                        }
                    })
                })
                .collect();

            for i in 1..=500u64 {
                let rule_id = if i % 2 == 0 { "even_rule" } else { "odd_rule" };
                assert!(store.bootstrap(&ruled_bundle(1000 + i, rule_id)));
            }
            done.store(true, Ordering::Release);

            for reader in readers {
                reader.join().unwrap();
            }
        });

        assert_eq!(store.get_lcut(), 1500);
    }
}
