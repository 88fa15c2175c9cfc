use core_types::CoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Analytics error during monitoring: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("No deployment registered under id {0}")]
    UnknownDeployment(Uuid),
}
