use std::collections::HashMap;

use async_trait::async_trait;

use crate::StatsigUser;

/// Experiment name to serialized sticky evaluation.
pub type PersistedValues = HashMap<String, String>;

/// Storage for sticky experiment assignments.
///
/// `save` and `delete` are called from inside evaluation and must not block; implementations
/// that talk to slow storage should hand the work off and return immediately.
#[async_trait]
pub trait UserPersistentStorage: Send + Sync {
    async fn load(&self, key: &str) -> PersistedValues;
    fn save(&self, key: &str, config_name: &str, data: &str);
    fn delete(&self, key: &str, config_name: &str);
}

/// `"<unit id>:<id type>"`
pub fn get_storage_key(user: &StatsigUser, id_type: &str) -> String {
    format!("{}:{}", user.get_unit_id(id_type).unwrap_or_default(), id_type)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::get_storage_key;
    use crate::StatsigUser;

    #[test]
    fn storage_key_uses_unit_id_for_id_type() {
        let mut user = StatsigUser::with_user_id("a_user".to_string());
        user.custom_ids = Some(HashMap::from([("companyID".to_string(), "c_1".to_string())]));

        assert_eq!(get_storage_key(&user, "userID"), "a_user:userID");
        assert_eq!(get_storage_key(&user, "companyID"), "c_1:companyID");
        assert_eq!(get_storage_key(&user, "stableID"), ":stableID");
    }
}
