use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notebook_engine::ProcessingSettings;
use notebook_logging::nb_info;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// On-disk settings, stored as RON. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_frame_bytes: usize,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let settings = ProcessingSettings::default();
        Self {
            endpoint: settings.endpoint,
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            idle_timeout_secs: settings.idle_timeout.as_secs(),
            max_frame_bytes: settings.max_frame_bytes,
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn processing_settings(&self) -> ProcessingSettings {
        ProcessingSettings {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

/// Loads `path`; a missing file yields the defaults.
pub(crate) fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: AppConfig = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    nb_info!("Loaded config from {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("notebook.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notebook.ron");
        fs::write(
            &path,
            r#"(endpoint: "https://backend.example/process-pdf", idle_timeout_secs: 5)"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.endpoint, "https://backend.example/process-pdf");
        assert_eq!(config.idle_timeout_secs, 5);
        assert_eq!(config.max_frame_bytes, AppConfig::default().max_frame_bytes);

        let settings = config.processing_settings();
        assert_eq!(settings.idle_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notebook.ron");
        fs::write(&path, "(endpoint: 42)").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
