pub use eval_details::{EvalDetails, EvaluationReason};
pub use eval_result::{EvalResult, SecondaryExposure};
pub use statsig_evaluator::StatsigEvaluator;

pub(crate) mod eval_details;
pub(crate) mod specs;

mod eval_helpers;
mod eval_result;
mod statsig_evaluator;
mod statsig_user_eval_ext;
mod user_hasher;
