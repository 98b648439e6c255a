pub use dynamic_config::DynamicConfig;
pub use evaluation::{EvalDetails, EvaluationReason, SecondaryExposure};
pub use feature_gate::FeatureGate;
pub use layer::{Layer, LayerLogData};
pub use statsig_driver::StatsigDriver;

pub mod helpers;

pub(crate) mod evaluation;

mod data_types;
mod dynamic_config;
mod feature_gate;
mod layer;
mod statsig_driver;
mod statsig_event_internal;
mod statsig_logger;
mod statsig_network;
mod statsig_store;
