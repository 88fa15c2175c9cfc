use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Analytics error during weight calculation: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("No weight method produced a result")]
    NoMethodSucceeded,
}
