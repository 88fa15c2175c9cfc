use core_types::CoreError;
use thiserror::Error;

/// Umbrella error for the orchestrated pipeline. Each stage keeps its own
/// error type; this just lets the pipeline bubble any of them up.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] configuration::ConfigError),

    #[error("Detection failed: {0}")]
    Detector(#[from] detector::DetectorError),

    #[error("Weight calculation failed: {0}")]
    Calculator(#[from] calculator::CalculatorError),

    #[error("Optimization failed: {0}")]
    Optimizer(#[from] optimizer::OptimizerError),

    #[error("Validation failed: {0}")]
    Validator(#[from] validator::ValidatorError),

    #[error("Monitoring failed: {0}")]
    Monitor(#[from] monitor::MonitorError),
}
