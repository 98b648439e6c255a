mod statsig;

// re-export public objects to top level
pub use statsig::internal::{
    DynamicConfig, EvalDetails, EvaluationReason, FeatureGate, Layer, SecondaryExposure,
    StatsigDriver,
};
pub use statsig::statsig_adapters::{EventLoggingAdapter, SpecsAdapter};
pub use statsig::statsig_datastore::{StatsigDatastore, CONFIG_SPEC_KEY};
pub use statsig::statsig_error::StatsigError;
pub use statsig::statsig_event::{StatsigEvent, StatsigEventInternal};
pub use statsig::statsig_initialization_details::{
    InitializationDetails, InitializeFailReason, InitializeFailure,
};
pub use statsig::statsig_options::{
    CheckGateOptions, GetConfigOptions, GetExperimentOptions, GetLayerOptions, StatsigOptions,
};
pub use statsig::statsig_override_adapter::{LocalOverrideAdapter, OverrideAdapter};
pub use statsig::statsig_persistent_storage::{
    get_storage_key, PersistedValues, UserPersistentStorage,
};
pub use statsig::statsig_user::StatsigUser;

use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use statsig::internal::helpers::make_arc;

lazy_static! {
    static ref INSTANCE: Arc<RwLock<Option<Arc<StatsigDriver>>>> = make_arc(None);
}

/// Process-wide client. Every call other than `initialize` fails with
/// `StatsigError::Uninitialized` until `initialize` has run.
pub struct Statsig {}

impl Statsig {
    pub async fn initialize(
        secret: &str,
        options: StatsigOptions,
    ) -> Result<InitializationDetails, StatsigError> {
        let driver = Self::install(secret, options)?;
        Ok(driver.initialize().await)
    }

    /// Initializes from `options.initialize_values` without any network access.
    pub fn initialize_sync(
        secret: &str,
        options: StatsigOptions,
    ) -> Result<InitializationDetails, StatsigError> {
        let initialize_values = options.initialize_values.clone().ok_or_else(|| {
            StatsigError::MalformedSpecs("initialize_values is required".to_string())
        })?;

        let driver = Self::install(secret, options)?;
        Ok(driver.initialize_sync(&initialize_values))
    }

    pub async fn update() -> Result<bool, StatsigError> {
        Self::get_driver()?.update().await
    }

    pub async fn shutdown() -> Result<(), StatsigError> {
        let driver = {
            let mut guard = INSTANCE
                .write()
                .map_err(|_| StatsigError::SingletonLockFailure)?;
            guard.take().ok_or(StatsigError::Uninitialized)?
        };

        driver.shutdown().await;
        Ok(())
    }

    pub async fn flush() -> Result<(), StatsigError> {
        Self::get_driver()?.flush().await;
        Ok(())
    }

    /* -- Evaluation -- */

    pub fn check_gate(user: &StatsigUser, gate_name: &str) -> Result<bool, StatsigError> {
        Self::check_gate_with_options(user, gate_name, &CheckGateOptions::default())
    }

    pub fn check_gate_with_options(
        user: &StatsigUser,
        gate_name: &str,
        options: &CheckGateOptions,
    ) -> Result<bool, StatsigError> {
        Ok(Self::get_driver()?.check_gate(user, gate_name, options))
    }

    pub fn get_feature_gate(user: &StatsigUser, gate_name: &str) -> Result<FeatureGate, StatsigError> {
        Ok(Self::get_driver()?.get_feature_gate(user, gate_name, &CheckGateOptions::default()))
    }

    pub fn get_config(user: &StatsigUser, config_name: &str) -> Result<DynamicConfig, StatsigError> {
        Self::get_config_with_options(user, config_name, &GetConfigOptions::default())
    }

    pub fn get_config_with_options(
        user: &StatsigUser,
        config_name: &str,
        options: &GetConfigOptions,
    ) -> Result<DynamicConfig, StatsigError> {
        Ok(Self::get_driver()?.get_config(user, config_name, options))
    }

    pub fn get_experiment(
        user: &StatsigUser,
        experiment_name: &str,
    ) -> Result<DynamicConfig, StatsigError> {
        Self::get_experiment_with_options(user, experiment_name, &GetExperimentOptions::default())
    }

    pub fn get_experiment_with_options(
        user: &StatsigUser,
        experiment_name: &str,
        options: &GetExperimentOptions,
    ) -> Result<DynamicConfig, StatsigError> {
        Ok(Self::get_driver()?.get_experiment(user, experiment_name, options))
    }

    pub fn get_layer(user: &StatsigUser, layer_name: &str) -> Result<Layer, StatsigError> {
        Self::get_layer_with_options(user, layer_name, &GetLayerOptions::default())
    }

    pub fn get_layer_with_options(
        user: &StatsigUser,
        layer_name: &str,
        options: &GetLayerOptions,
    ) -> Result<Layer, StatsigError> {
        Ok(Self::get_driver()?.get_layer(user, layer_name, options))
    }

    /* -- Manual exposures -- */

    pub fn log_gate_exposure(user: &StatsigUser, gate_name: &str) -> Result<(), StatsigError> {
        Self::get_driver()?.log_gate_exposure(user, gate_name);
        Ok(())
    }

    pub fn log_config_exposure(user: &StatsigUser, config_name: &str) -> Result<(), StatsigError> {
        Self::get_driver()?.log_config_exposure(user, config_name);
        Ok(())
    }

    pub fn log_experiment_exposure(
        user: &StatsigUser,
        experiment_name: &str,
    ) -> Result<(), StatsigError> {
        Self::get_driver()?.log_experiment_exposure(user, experiment_name);
        Ok(())
    }

    pub fn log_layer_parameter_exposure(
        user: &StatsigUser,
        layer_name: &str,
        parameter_name: &str,
    ) -> Result<(), StatsigError> {
        Self::get_driver()?.log_layer_parameter_exposure(user, layer_name, parameter_name);
        Ok(())
    }

    /* -- Persisted values & events -- */

    pub async fn load_user_persisted_values(
        user: &StatsigUser,
        id_type: &str,
    ) -> Result<PersistedValues, StatsigError> {
        Ok(Self::get_driver()?
            .load_user_persisted_values(user, id_type)
            .await)
    }

    pub fn log_event(event: StatsigEvent) -> Result<(), StatsigError> {
        Self::get_driver()?.log_event(event);
        Ok(())
    }

    fn install(secret: &str, options: StatsigOptions) -> Result<Arc<StatsigDriver>, StatsigError> {
        let mut guard = INSTANCE
            .write()
            .map_err(|_| StatsigError::SingletonLockFailure)?;

        if guard.is_some() {
            return Err(StatsigError::AlreadyInitialized);
        }

        let driver = Arc::new(StatsigDriver::new(secret, options));
        *guard = Some(driver.clone());
        Ok(driver)
    }

    fn get_driver() -> Result<Arc<StatsigDriver>, StatsigError> {
        let guard = INSTANCE
            .read()
            .map_err(|_| StatsigError::SingletonLockFailure)?;

        guard.clone().ok_or(StatsigError::Uninitialized)
    }
}
