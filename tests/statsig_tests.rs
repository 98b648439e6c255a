use std::sync::Arc;

use async_trait::async_trait;

use statsig_local_eval::{
    EventLoggingAdapter, Statsig, StatsigError, StatsigEventInternal, StatsigOptions, StatsigUser,
};

const SPECS: &str = include_str!("data/download_config_specs.json");

struct NoopLoggingAdapter;

#[async_trait]
impl EventLoggingAdapter for NoopLoggingAdapter {
    async fn log_events(&self, _events: Vec<StatsigEventInternal>) -> Result<(), StatsigError> {
        Ok(())
    }
}

fn bootstrap_options() -> StatsigOptions {
    StatsigOptions {
        initialize_values: Some(SPECS.to_string()),
        event_logging_adapter: Some(Arc::new(NoopLoggingAdapter)),
        rulesets_sync_interval_ms: 0,
        ..StatsigOptions::default()
    }
}

// The singleton is process wide, so its whole lifecycle lives in one test.
#[tokio::test]
async fn singleton_lifecycle() {
    let user = StatsigUser::with_user_id("u1".to_string());

    assert!(matches!(
        Statsig::check_gate(&user, "always_on_gate"),
        Err(StatsigError::Uninitialized)
    ));

    let details = Statsig::initialize("secret-key", bootstrap_options())
        .await
        .unwrap();
    assert!(details.success);

    assert!(matches!(
        Statsig::initialize_sync("secret-key", bootstrap_options()),
        Err(StatsigError::AlreadyInitialized)
    ));

    assert!(Statsig::check_gate(&user, "always_on_gate").unwrap());
    assert!(!Statsig::check_gate(&user, "disabled_gate").unwrap());
    let config = Statsig::get_config(&user, "test_config").unwrap();
    assert_eq!(config.get("color", String::new()), "blue");
    let layer = Statsig::get_layer(&user, "test_layer").unwrap();
    assert_eq!(layer.get("size", String::new()), "large");

    Statsig::shutdown().await.unwrap();

    assert!(matches!(
        Statsig::get_experiment(&user, "sticky_experiment"),
        Err(StatsigError::Uninitialized)
    ));
    assert!(matches!(
        Statsig::shutdown().await,
        Err(StatsigError::Uninitialized)
    ));

    let details = Statsig::initialize_sync("secret-key", bootstrap_options()).unwrap();
    assert!(details.success);
    Statsig::shutdown().await.unwrap();
}
