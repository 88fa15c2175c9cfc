// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    Config, DetectionSettings, MonitoringSettings, OptimizationSettings, ValidationSettings,
    WeightingSettings,
};

/// Loads the engine configuration from the `acumen.toml` file.
///
/// The file is optional: every section falls back to its documented defaults,
/// so a missing or partial file still yields a complete `Config`.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `acumen.toml`
        .add_source(config::File::with_name("acumen").required(false))
        .add_source(config::Environment::with_prefix("ACUMEN").separator("__"))
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_falls_back_to_field_defaults() {
        // A file overriding a single key must not invalidate the rest of
        // its section.
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                "[detection]\nmax_lag = 6\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<Config>()
            .unwrap();
        assert_eq!(config.detection.max_lag, 6);
        assert_eq!(config.detection.min_samples, 10);
        assert!((config.detection.min_synergy_gain - 0.01).abs() < 1e-12);
        assert_eq!(config.validation.folds, 5);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.detection.min_samples, 10);
        assert!((config.detection.min_synergy_gain - 0.01).abs() < 1e-12);
        assert_eq!(config.detection.max_lag, 12);
        assert_eq!(config.validation.folds, 5);
        assert_eq!(config.validation.bootstrap_samples, 100);
        assert!((config.optimization.tolerance - 1e-6).abs() < 1e-15);
        assert!((config.monitoring.drift_threshold - 0.3).abs() < 1e-12);
        assert_eq!(config.monitoring.consecutive_breaches, 2);
    }
}
