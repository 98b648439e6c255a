use std::collections::HashMap;
use std::sync::Arc;

use crate::statsig::internal::data_types::{APIDownloadedConfigs, APISpec};

use super::eval_details::EvaluationReason;

/// Immutable snapshot of a spec bundle. A new snapshot replaces the old one on every update.
/// The indexes are shared, so a snapshot that only changes the reason reuses them.
#[derive(Clone)]
pub struct Specs {
    pub lcut: u64,
    pub init_reason: EvaluationReason,
    pub gates: Arc<HashMap<String, APISpec>>,
    pub configs: Arc<HashMap<String, APISpec>>,
    pub layers: Arc<HashMap<String, APISpec>>,
    pub experiment_to_layer: Arc<HashMap<String, String>>,
    pub default_environment: Option<String>,
}

impl Specs {
    pub fn new() -> Specs {
        Specs {
            lcut: 0,
            init_reason: EvaluationReason::Uninitialized,
            gates: Arc::new(HashMap::new()),
            configs: Arc::new(HashMap::new()),
            layers: Arc::new(HashMap::new()),
            experiment_to_layer: Arc::new(HashMap::new()),
            default_environment: None,
        }
    }

    pub fn from_downloaded_configs(
        downloaded_configs: APIDownloadedConfigs,
        reason: EvaluationReason,
    ) -> Specs {
        let mut experiment_to_layer = HashMap::new();
        if let Some(layers) = downloaded_configs.layers {
            for (layer_name, experiments) in layers {
                for experiment_name in experiments {
                    experiment_to_layer.insert(experiment_name, layer_name.clone());
                }
            }
        }

        Specs {
            lcut: downloaded_configs.time,
            init_reason: reason,
            gates: index_by_name(downloaded_configs.feature_gates),
            configs: index_by_name(downloaded_configs.dynamic_configs),
            layers: index_by_name(downloaded_configs.layer_configs),
            experiment_to_layer: Arc::new(experiment_to_layer),
            default_environment: downloaded_configs.default_environment,
        }
    }

    pub fn with_reason(&self, reason: EvaluationReason) -> Specs {
        Specs {
            init_reason: reason,
            ..self.clone()
        }
    }
}

fn index_by_name(specs: Vec<APISpec>) -> Arc<HashMap<String, APISpec>> {
    Arc::new(
        specs
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect(),
    )
}
