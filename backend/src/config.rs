use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/insulator.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub model_cache_dir: PathBuf,
    pub model_name: String,
    pub max_upload_bytes: usize,
    pub inference_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            model_cache_dir: PathBuf::from("./model_cache"),
            model_name: "clip-vit-base-patch32".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            inference_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Reads `.env`, then the YAML file named by `CONFIG_PATH` (or the default
    /// location when present), then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Zero would reject every upload or time out every classification.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_upload_bytes",
                value: self.max_upload_bytes.to_string(),
            });
        }
        if self.inference_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "inference_timeout_secs",
                value: self.inference_timeout_secs.to_string(),
            });
        }
        Ok(())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_value("PORT", port)?;
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MODEL_CACHE_DIR") {
            self.model_cache_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("MODEL_NAME") {
            self.model_name = name;
        }
        if let Some(bytes) = lookup("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_nonzero("MAX_UPLOAD_BYTES", bytes)?;
        }
        if let Some(secs) = lookup("INFERENCE_TIMEOUT_SECS") {
            self.inference_timeout_secs = parse_nonzero("INFERENCE_TIMEOUT_SECS", secs)?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

fn parse_nonzero<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let parsed: T = parse_value(key, value.clone())?;
    if parsed == T::default() {
        return Err(ConfigError::InvalidValue { key, value });
    }
    Ok(parsed)
}
