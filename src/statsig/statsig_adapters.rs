use async_trait::async_trait;

use super::statsig_error::StatsigError;
use super::statsig_event::StatsigEventInternal;

/// Source of config specs. Returns the raw `download_config_specs` JSON; parsing happens in the
/// store so a malformed payload never replaces a good one.
#[async_trait]
pub trait SpecsAdapter: Send + Sync {
    async fn fetch_specs(&self, since_time: u64) -> Result<String, StatsigError>;
}

/// Destination for exposure and custom events.
#[async_trait]
pub trait EventLoggingAdapter: Send + Sync {
    async fn log_events(&self, events: Vec<StatsigEventInternal>) -> Result<(), StatsigError>;
}
