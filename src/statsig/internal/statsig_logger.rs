use std::collections::HashMap;
use std::mem::take;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::statsig::statsig_adapters::EventLoggingAdapter;
use crate::statsig::statsig_event::{StatsigEvent, StatsigEventInternal};
use crate::{StatsigOptions, StatsigUser};

use super::evaluation::EvalResult;
use super::helpers::get_time_in_millis;
use super::statsig_event_internal::{
    finalize_event, make_config_exposure, make_gate_exposure, make_layer_exposure,
};

const EXPOSURE_DEDUPE_INTERVAL_MS: u64 = 10 * 60 * 1000;
const MAX_DEDUPE_ENTRIES: usize = 10_000;

pub struct StatsigLogger {
    adapter: Arc<dyn EventLoggingAdapter>,
    events: Arc<RwLock<Vec<StatsigEventInternal>>>,
    logged_exposures: Mutex<HashMap<String, u64>>,
    max_queue_size: usize,
    flush_interval_ms: u32,
    bg_task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl StatsigLogger {
    pub fn new(adapter: Arc<dyn EventLoggingAdapter>, options: &StatsigOptions) -> Self {
        Self {
            adapter,
            events: Arc::new(RwLock::new(vec![])),
            logged_exposures: Mutex::new(HashMap::new()),
            max_queue_size: options.logger_max_queue_size as usize,
            flush_interval_ms: options.logger_flush_interval_ms,
            bg_task_handle: Mutex::new(None),
        }
    }

    /// Starts the periodic flush. Needs a tokio runtime; without one events are only sent on
    /// explicit flushes.
    pub fn start_background_flush(&self) {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(target: "statsig", "No tokio runtime available, background event flushing is disabled");
                return;
            }
        };

        let mut handle = match self.bg_task_handle.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if handle.is_some() || self.flush_interval_ms == 0 {
            return;
        }

        let adapter = self.adapter.clone();
        let events = self.events.clone();
        let interval = Duration::from_millis(self.flush_interval_ms as u64);

        *handle = Some(runtime.spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                Self::flush_impl(&adapter, &events).await;
            }
        }));
    }

    pub fn enqueue(&self, event: StatsigEventInternal) {
        let mut should_flush = false;
        if let Ok(mut mut_events) = self.events.write() {
            mut_events.push(event);
            should_flush = mut_events.len() > self.max_queue_size;
        };

        if !should_flush {
            return;
        }

        if let Ok(runtime) = Handle::try_current() {
            let adapter = self.adapter.clone();
            let events = self.events.clone();
            runtime.spawn(async move {
                Self::flush_impl(&adapter, &events).await;
            });
        }
    }

    pub fn log_event(&self, event: StatsigEvent) {
        self.enqueue(finalize_event(event));
    }

    pub fn log_gate_exposure(
        &self,
        user: &StatsigUser,
        gate_name: &str,
        eval_result: &EvalResult,
        is_manual_exposure: bool,
    ) {
        let dedupe_key = format!(
            "gate:{}:{}:{}",
            gate_name,
            eval_result.rule_id,
            eval_result.evaluation_details.reason.as_str()
        );
        if !self.should_log_exposure(user, &dedupe_key) {
            return;
        }

        self.enqueue(make_gate_exposure(user, gate_name, eval_result, is_manual_exposure));
    }

    pub fn log_config_exposure(
        &self,
        user: &StatsigUser,
        config_name: &str,
        eval_result: &EvalResult,
        is_manual_exposure: bool,
    ) {
        let dedupe_key = format!(
            "config:{}:{}:{}",
            config_name,
            eval_result.rule_id,
            eval_result.evaluation_details.reason.as_str()
        );
        if !self.should_log_exposure(user, &dedupe_key) {
            return;
        }

        self.enqueue(make_config_exposure(user, config_name, eval_result, is_manual_exposure));
    }

    pub fn log_layer_exposure(
        &self,
        user: &StatsigUser,
        layer_name: &str,
        parameter_name: &str,
        eval_result: &EvalResult,
        is_manual_exposure: bool,
    ) {
        let event = make_layer_exposure(
            user,
            layer_name,
            parameter_name,
            eval_result,
            is_manual_exposure,
        );

        let metadata = event.event_data.metadata.clone().unwrap_or_default();
        let field = |key: &str| {
            metadata
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let dedupe_key = format!(
            "layer:{}:{}:{}:{}:{}:{}",
            layer_name,
            eval_result.rule_id,
            field("allocatedExperiment"),
            parameter_name,
            field("isExplicitParameter"),
            eval_result.evaluation_details.reason.as_str()
        );
        if !self.should_log_exposure(user, &dedupe_key) {
            return;
        }

        self.enqueue(event);
    }

    pub async fn flush(&self) {
        Self::flush_impl(&self.adapter, &self.events).await;
    }

    pub async fn shutdown(&self) {
        if let Ok(mut handle) = self.bg_task_handle.lock() {
            if let Some(task) = handle.take() {
                task.abort();
            }
        }

        self.flush().await;
    }

    pub(crate) fn pending_events(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    async fn flush_impl(
        adapter: &Arc<dyn EventLoggingAdapter>,
        events: &RwLock<Vec<StatsigEventInternal>>,
    ) {
        let local_events = match events.write() {
            Ok(mut mut_events) => take(&mut *mut_events),
            Err(_) => return,
        };

        if local_events.is_empty() {
            return;
        }

        let count = local_events.len();
        match adapter.log_events(local_events).await {
            Ok(()) => debug!(target: "statsig", "Flushed {} events", count),
            Err(e) => warn!(target: "statsig", "Failed to flush {} events: {}", count, e),
        }
    }

    fn should_log_exposure(&self, user: &StatsigUser, key: &str) -> bool {
        let dedupe_key = format!("{}:{}", user.get_cache_key(), key);
        let now = get_time_in_millis();

        let mut logged = match self.logged_exposures.lock() {
            Ok(guard) => guard,
            Err(_) => return true,
        };

        if let Some(last_time) = logged.get(&dedupe_key) {
            if last_time + EXPOSURE_DEDUPE_INTERVAL_MS > now {
                debug!(target: "statsig", "Skipping duplicate exposure {}", dedupe_key);
                return false;
            }
        }

        if logged.len() >= MAX_DEDUPE_ENTRIES {
            logged.clear();
        }
        logged.insert(dedupe_key, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::statsig::statsig_error::StatsigError;

    #[derive(Default)]
    struct RecordingAdapter {
        batches: Mutex<Vec<Vec<StatsigEventInternal>>>,
    }

    #[async_trait]
    impl EventLoggingAdapter for RecordingAdapter {
        async fn log_events(&self, events: Vec<StatsigEventInternal>) -> Result<(), StatsigError> {
            self.batches.lock().unwrap().push(events);
            Ok(())
        }
    }

    fn make_logger(adapter: Arc<RecordingAdapter>) -> StatsigLogger {
        StatsigLogger::new(adapter, &StatsigOptions::default())
    }

    #[test]
    fn identical_exposures_are_deduped_per_user() {
        let logger = make_logger(Arc::new(RecordingAdapter::default()));
        let result = EvalResult::boolean(true);

        let user_a = StatsigUser::with_user_id("a".to_string());
        let user_b = StatsigUser::with_user_id("b".to_string());

        logger.log_gate_exposure(&user_a, "gate", &result, false);
        logger.log_gate_exposure(&user_a, "gate", &result, false);
        logger.log_gate_exposure(&user_b, "gate", &result, false);
        logger.log_config_exposure(&user_a, "gate", &result, false);

        assert_eq!(logger.pending_events(), 3);
    }

    #[test]
    fn gate_and_config_exposures_never_share_a_dedupe_entry() {
        let logger = make_logger(Arc::new(RecordingAdapter::default()));
        let user = StatsigUser::with_user_id("a".to_string());
        let result = EvalResult::boolean(false);

        logger.log_config_exposure(&user, "shared_name", &result, false);
        logger.log_gate_exposure(&user, "shared_name", &result, false);
        logger.log_config_exposure(&user, "shared_name", &result, false);

        assert_eq!(logger.pending_events(), 2);
    }

    #[test]
    fn layer_exposures_dedupe_per_parameter() {
        let logger = make_logger(Arc::new(RecordingAdapter::default()));
        let user = StatsigUser::with_user_id("a".to_string());
        let result = EvalResult::default();

        logger.log_layer_exposure(&user, "layer", "color", &result, false);
        logger.log_layer_exposure(&user, "layer", "color", &result, false);
        logger.log_layer_exposure(&user, "layer", "size", &result, false);

        assert_eq!(logger.pending_events(), 2);
    }

    #[tokio::test]
    async fn flush_sends_queued_events_once() {
        let adapter = Arc::new(RecordingAdapter::default());
        let logger = make_logger(adapter.clone());

        logger.log_event(StatsigEvent {
            user: StatsigUser::with_user_id("a".to_string()),
            event_name: "purchase".to_string(),
            value: None,
            metadata: None,
        });
        logger.flush().await;
        logger.flush().await;

        let batches = adapter.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].event_data.event_name, "purchase");
        assert_eq!(logger.pending_events(), 0);
    }
}
