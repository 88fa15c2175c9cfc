use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Analytics error during detection: {0}")]
    Analytics(#[from] analytics::AnalyticsError),
}
