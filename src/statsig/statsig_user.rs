use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsigUser {
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    #[serde(rename = "customIDs")]
    pub custom_ids: Option<HashMap<String, String>>,
    pub email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub locale: Option<String>,
    pub app_version: Option<String>,
    pub custom: Option<HashMap<String, Value>>,
    pub private_attributes: Option<HashMap<String, Value>>,
    pub statsig_environment: Option<HashMap<String, String>>,
}

impl StatsigUser {
    pub fn with_user_id(user_id: String) -> Self {
        StatsigUser {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_custom_ids(custom_ids: HashMap<String, String>) -> Self {
        StatsigUser {
            custom_ids: Some(custom_ids),
            ..Self::default()
        }
    }

    /// Identity used to dedupe exposures for this user.
    pub(crate) fn get_cache_key(&self) -> String {
        let mut key = format!("userID:{}", self.user_id.as_deref().unwrap_or(""));

        if let Some(custom_ids) = &self.custom_ids {
            let mut entries: Vec<_> = custom_ids.iter().collect();
            entries.sort();
            for (id_type, id) in entries {
                key.push_str(&format!(";{}:{}", id_type, id));
            }
        }

        key
    }
}
