use std::env;

/// Pipeline policy configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// When true, error-severity integrity violations block snapshot
    /// publication and the previously published snapshot stays visible.
    pub strict: bool,
    /// Maximum violating rows retained per check in the validation report.
    pub sample_limit: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            strict: true,
            sample_limit: 10,
        }
    }
}

impl WarehouseConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            strict: env::var("MEDMART_STRICT")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.strict),
            sample_limit: env::var("MEDMART_SAMPLE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sample_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_with_small_samples() {
        let config = WarehouseConfig::default();
        assert!(config.strict);
        assert_eq!(config.sample_limit, 10);
    }
}
