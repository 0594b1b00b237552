use std::path::Path;

use serde::Deserialize;

use crate::errors::ConfigError;

/// How failures during [crate::provider::ServiceProvider::boot] are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Log the failure and continue with the next service
    #[default]
    Permissive,
    /// Abort with the first failure
    Strict,
}

/// Container settings
///
/// ```
/// use strt_di::config::{ContainerConfig, ErrorMode};
///
/// let config = ContainerConfig::from_toml_str(r#"error_mode = "strict""#).unwrap();
/// assert_eq!(config.error_mode, ErrorMode::Strict);
/// assert!(!config.warn_on_rebind);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub error_mode: ErrorMode,
    /// Report overwritten bindings as warnings instead of debug events
    pub warn_on_rebind: bool,
}

impl ContainerConfig {
    pub fn strict() -> Self {
        ContainerConfig {
            error_mode: ErrorMode::Strict,
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn is_strict(&self) -> bool {
        self.error_mode == ErrorMode::Strict
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ContainerConfig::from_toml_str("").unwrap();

        assert_eq!(config, ContainerConfig::default());
        assert_eq!(config.error_mode, ErrorMode::Permissive);
    }

    #[test]
    fn parse_all_fields() {
        let config = ContainerConfig::from_toml_str(
            r#"
            error_mode = "strict"
            warn_on_rebind = true
        "#,
        )
        .unwrap();

        assert!(config.is_strict());
        assert!(config.warn_on_rebind);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = ContainerConfig::from_toml_str(r#"error_mode = "lenient""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"error_mode = "strict""#).unwrap();

        let config = ContainerConfig::from_file(file.path()).unwrap();
        assert!(config.is_strict());
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = ContainerConfig::from_file("/nonexistent/strt-di.toml").unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/strt-di.toml"));
    }
}
