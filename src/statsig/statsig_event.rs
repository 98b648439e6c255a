use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::statsig::internal::SecondaryExposure;
use crate::StatsigUser;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsigEvent {
    pub user: StatsigUser,
    pub event_name: String,
    pub value: Option<Value>,
    pub metadata: Option<HashMap<String, Value>>,
}

/// An event as it is sent to the logging endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsigEventInternal {
    #[serde(flatten)]
    pub event_data: StatsigEvent,
    pub time: u64,
    pub secondary_exposures: Vec<SecondaryExposure>,
}
