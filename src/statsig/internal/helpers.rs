use std::sync::{Arc, RwLock};

use chrono::Utc;

pub fn make_arc<T>(value: T) -> Arc<RwLock<T>> {
    Arc::new(RwLock::new(value))
}

pub fn get_time_in_millis() -> u64 {
    Utc::now().timestamp_millis() as u64
}

#[macro_export]
macro_rules! unwrap_or_return {
    ($res: expr, $code: expr) => {
        match $res {
            Some(v) => v,
            None => return $code,
        }
    };
}
