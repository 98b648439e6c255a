use async_trait::async_trait;

pub const CONFIG_SPEC_KEY: &str = "statsig.cache";

/// Cache for the last good spec bundle, consulted at startup before the network.
#[async_trait] // when implementing this trait, use the #[async_trait] macro
pub trait StatsigDatastore: Send + Sync {
    async fn initialize(&self) {}
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
    async fn shutdown(&self) {}
}
