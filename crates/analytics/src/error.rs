use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Ensemble model failure: {0}")]
    Model(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
