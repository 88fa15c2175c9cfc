use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Analytics error during validation: {0}")]
    Analytics(#[from] analytics::AnalyticsError),
}
