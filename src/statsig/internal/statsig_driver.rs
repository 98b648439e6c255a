use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::statsig::statsig_adapters::{EventLoggingAdapter, SpecsAdapter};
use crate::statsig::statsig_error::StatsigError;
use crate::statsig::statsig_initialization_details::{
    InitializationDetails, InitializeFailReason, InitializeFailure,
};
use crate::statsig::statsig_persistent_storage::{get_storage_key, PersistedValues};
use crate::{
    CheckGateOptions, GetConfigOptions, GetExperimentOptions, GetLayerOptions, StatsigEvent,
    StatsigOptions, StatsigUser,
};

use super::evaluation::eval_details::EvaluationReason;
use super::evaluation::StatsigEvaluator;
use super::helpers::get_time_in_millis;
use super::statsig_logger::StatsigLogger;
use super::statsig_network::StatsigNetwork;
use super::statsig_store::StatsigStore;
use super::{DynamicConfig, FeatureGate, Layer, LayerLogData};

pub struct StatsigDriver {
    pub secret_key: String,
    pub options: StatsigOptions,
    store: Arc<StatsigStore>,
    evaluator: StatsigEvaluator,
    logger: Arc<StatsigLogger>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl StatsigDriver {
    pub fn new(secret_key: &str, options: StatsigOptions) -> Self {
        let network = Arc::new(StatsigNetwork::new(secret_key, &options));
        let specs_adapter = options
            .specs_adapter
            .clone()
            .unwrap_or_else(|| network.clone() as Arc<dyn SpecsAdapter>);
        let event_logging_adapter = options
            .event_logging_adapter
            .clone()
            .unwrap_or_else(|| network.clone() as Arc<dyn EventLoggingAdapter>);

        let store = Arc::new(StatsigStore::new(specs_adapter, options.datastore.clone()));
        let evaluator = StatsigEvaluator::new(store.clone(), &options);
        let logger = Arc::new(StatsigLogger::new(event_logging_adapter, &options));

        StatsigDriver {
            secret_key: secret_key.to_string(),
            options,
            store,
            evaluator,
            logger,
            sync_task: Mutex::new(None),
        }
    }

    /// Loads the datastore cache, then either applies `initialize_values` or downloads specs
    /// within `init_timeout_ms`. A download that times out keeps running in the background.
    pub async fn initialize(&self) -> InitializationDetails {
        let start_time = get_time_in_millis();

        if let Some(datastore) = &self.options.datastore {
            datastore.initialize().await;
        }
        self.store.load_from_datastore().await;
        self.logger.start_background_flush();

        if let Some(values) = &self.options.initialize_values {
            let details = self.bootstrap(values, start_time);
            self.schedule_background_updates();
            return details;
        }

        let store = self.store.clone();
        let download = tokio::spawn(async move { store.download_config_specs().await });

        let outcome = match self.options.init_timeout_ms {
            0 => Some(download.await),
            timeout_ms => tokio::time::timeout(Duration::from_millis(timeout_ms), download)
                .await
                .ok(),
        };

        let duration_ms = get_time_in_millis().saturating_sub(start_time);
        let details = match outcome {
            Some(Ok(Ok(_))) => InitializationDetails::success(duration_ms),
            Some(Ok(Err(e))) => {
                warn!(target: "statsig", "Failed to download config specs: {}", e);
                InitializationDetails::failure(duration_ms, InitializeFailure::from(&e))
            }
            Some(Err(e)) => InitializationDetails::failure(
                duration_ms,
                InitializeFailure {
                    reason: InitializeFailReason::InternalError,
                    message: e.to_string(),
                    status_code: None,
                },
            ),
            None => {
                warn!(target: "statsig", "Initialization timed out after {}ms", duration_ms);
                InitializationDetails::failure(
                    duration_ms,
                    InitializeFailure {
                        reason: InitializeFailReason::Timeout,
                        message: format!("Timed out after {}ms", self.options.init_timeout_ms),
                        status_code: None,
                    },
                )
            }
        };

        self.schedule_background_updates();
        details
    }

    /// Bootstrap-only initialization. Never touches the network.
    pub fn initialize_sync(&self, initialize_values: &str) -> InitializationDetails {
        self.logger.start_background_flush();
        self.bootstrap(initialize_values, get_time_in_millis())
    }

    fn bootstrap(&self, initialize_values: &str, start_time: u64) -> InitializationDetails {
        self.store.bootstrap(initialize_values);
        let duration_ms = get_time_in_millis().saturating_sub(start_time);

        if self.store.get_specs().init_reason == EvaluationReason::InvalidBootstrap {
            return InitializationDetails::failure(
                duration_ms,
                InitializeFailure {
                    reason: InitializeFailReason::InternalError,
                    message: "initialize_values could not be parsed".to_string(),
                    status_code: None,
                },
            );
        }

        InitializationDetails::success(duration_ms)
    }

    /// Downloads specs once. Returns whether anything changed.
    pub async fn update(&self) -> Result<bool, StatsigError> {
        self.store.download_config_specs().await
    }

    /// Starts polling every `rulesets_sync_interval_ms`. Does nothing when the interval is 0,
    /// when polling already runs, or outside a tokio runtime.
    pub fn schedule_background_updates(&self) {
        let interval_ms = self.options.rulesets_sync_interval_ms;
        if interval_ms == 0 {
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => return,
        };

        let mut sync_task = match self.sync_task.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if sync_task.is_some() {
            return;
        }

        let store = self.store.clone();
        let interval = Duration::from_millis(interval_ms as u64);
        *sync_task = Some(runtime.spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match store.download_config_specs().await {
                    Ok(updated) => debug!(target: "statsig", "Background sync finished, updated: {}", updated),
                    Err(e) => warn!(target: "statsig", "Background sync failed: {}", e),
                }
            }
        }));
    }

    /* -- Evaluation -- */

    pub fn check_gate(&self, user: &StatsigUser, gate_name: &str, options: &CheckGateOptions) -> bool {
        self.get_feature_gate(user, gate_name, options).value
    }

    pub fn get_feature_gate(
        &self,
        user: &StatsigUser,
        gate_name: &str,
        options: &CheckGateOptions,
    ) -> FeatureGate {
        let user = self.normalize_user(user);
        let eval_result = self.evaluator.check_gate(&user, gate_name, options);

        if !options.disable_exposure_logging {
            self.logger.log_gate_exposure(&user, gate_name, &eval_result, false);
        }

        FeatureGate::from_eval_result(gate_name, eval_result)
    }

    pub fn get_config(
        &self,
        user: &StatsigUser,
        config_name: &str,
        options: &GetConfigOptions,
    ) -> DynamicConfig {
        let user = self.normalize_user(user);
        let eval_result = self.evaluator.get_config(&user, config_name, options);

        if !options.disable_exposure_logging {
            self.logger.log_config_exposure(&user, config_name, &eval_result, false);
        }

        DynamicConfig::from_eval_result(config_name, eval_result)
    }

    pub fn get_experiment(
        &self,
        user: &StatsigUser,
        experiment_name: &str,
        options: &GetExperimentOptions,
    ) -> DynamicConfig {
        let user = self.normalize_user(user);
        let eval_result = self.evaluator.get_experiment(&user, experiment_name, options);

        if !options.disable_exposure_logging {
            self.logger.log_config_exposure(&user, experiment_name, &eval_result, false);
        }

        DynamicConfig::from_eval_result(experiment_name, eval_result)
    }

    pub fn get_layer(&self, user: &StatsigUser, layer_name: &str, options: &GetLayerOptions) -> Layer {
        let user = self.normalize_user(user);
        let eval_result = self.evaluator.get_layer(&user, layer_name, options);

        let log_data = match options.disable_exposure_logging {
            true => None,
            false => Some(LayerLogData {
                user,
                eval_result: eval_result.clone(),
                logger: self.logger.clone(),
            }),
        };

        Layer::from_eval_result(layer_name, eval_result, log_data)
    }

    /* -- Manual exposures -- */

    pub fn log_gate_exposure(&self, user: &StatsigUser, gate_name: &str) {
        let user = self.normalize_user(user);
        let eval_result = self
            .evaluator
            .check_gate(&user, gate_name, &CheckGateOptions::default());
        self.logger.log_gate_exposure(&user, gate_name, &eval_result, true);
    }

    pub fn log_config_exposure(&self, user: &StatsigUser, config_name: &str) {
        let user = self.normalize_user(user);
        let eval_result = self
            .evaluator
            .get_config(&user, config_name, &GetConfigOptions::default());
        self.logger.log_config_exposure(&user, config_name, &eval_result, true);
    }

    pub fn log_experiment_exposure(&self, user: &StatsigUser, experiment_name: &str) {
        let user = self.normalize_user(user);
        let eval_result = self
            .evaluator
            .get_config(&user, experiment_name, &GetConfigOptions::default());
        self.logger.log_config_exposure(&user, experiment_name, &eval_result, true);
    }

    pub fn log_layer_parameter_exposure(&self, user: &StatsigUser, layer_name: &str, parameter_name: &str) {
        let user = self.normalize_user(user);
        let eval_result = self
            .evaluator
            .get_layer(&user, layer_name, &GetLayerOptions::default());
        self.logger
            .log_layer_exposure(&user, layer_name, parameter_name, &eval_result, true);
    }

    /* -- Persisted values -- */

    pub async fn load_user_persisted_values(&self, user: &StatsigUser, id_type: &str) -> PersistedValues {
        let storage = match &self.options.user_persistent_storage {
            Some(storage) => storage,
            None => return HashMap::new(),
        };

        let user = self.normalize_user(user);
        storage.load(&get_storage_key(&user, id_type)).await
    }

    /* -- Events & lifecycle -- */

    pub fn log_event(&self, mut event: StatsigEvent) {
        event.user = self.normalize_user(&event.user);
        self.logger.log_event(event);
    }

    pub async fn flush(&self) {
        self.logger.flush().await;
    }

    pub async fn shutdown(&self) {
        if let Ok(mut sync_task) = self.sync_task.lock() {
            if let Some(task) = sync_task.take() {
                task.abort();
            }
        }

        let datastore_shutdown = async {
            if let Some(datastore) = &self.options.datastore {
                datastore.shutdown().await;
            }
        };

        futures::join!(self.logger.shutdown(), datastore_shutdown);
    }

    /// Options environment wins over the user's own; the bundle's default tier fills in when
    /// neither is set.
    fn normalize_user(&self, user: &StatsigUser) -> StatsigUser {
        let mut normalized = user.clone();

        if let Some(environment) = &self.options.environment {
            normalized.statsig_environment = Some(environment.clone());
        }

        if normalized.statsig_environment.is_none() {
            if let Some(default_environment) = &self.store.get_specs().default_environment {
                normalized.statsig_environment = Some(HashMap::from([(
                    "tier".to_string(),
                    default_environment.clone(),
                )]));
            }
        }

        normalized
    }
}
