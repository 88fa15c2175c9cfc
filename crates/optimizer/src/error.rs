use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Analytics error during optimization: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("All {attempts} algorithms failed in comprehensive mode")]
    AllAlgorithmsFailed { attempts: usize },
}
