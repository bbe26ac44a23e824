use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "./config.json";
pub const DEFAULT_LEDFX_HOST: &str = "http://127.0.0.1:8888";

/// Highest universe number an sACN source may transmit on.
pub const MAX_UNIVERSE: u16 = 65279;
/// Slots per universe; channels are numbered from 1.
pub const MAX_CHANNEL: u16 = 512;

/// Errors raised while loading or persisting the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

// Configuration data saved to JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(rename = "sAcnUniverse", default = "default_universe")]
    pub universe: u16,
    #[serde(default = "default_channel")]
    pub channel: u16,
    #[serde(default)] // An empty list maps no channel values
    pub scenes: Vec<String>,
    #[serde(default = "default_ledfx_host")]
    pub ledfx_host: String,
}

fn default_universe() -> u16 {
    1
}

fn default_channel() -> u16 {
    1
}

fn default_ledfx_host() -> String {
    DEFAULT_LEDFX_HOST.to_string()
}

// Default values for a new configuration
impl Default for ConfigData {
    fn default() -> Self {
        Self {
            universe: default_universe(),
            channel: default_channel(),
            scenes: vec![],
            ledfx_host: default_ledfx_host(),
        }
    }
}

impl ConfigData {
    /// Zero-based slot index of the configured channel.
    pub fn channel_index(&self) -> usize {
        usize::from(self.channel.saturating_sub(1))
    }

    /// Rejects field values serde accepts but the bridge cannot use.
    pub fn check_ranges(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_UNIVERSE).contains(&self.universe) {
            return Err(ConfigError::InvalidParameter(format!(
                "sAcnUniverse {} (must be 1-{})",
                self.universe, MAX_UNIVERSE
            )));
        }
        if !(1..=MAX_CHANNEL).contains(&self.channel) {
            return Err(ConfigError::InvalidParameter(format!(
                "channel {} (must be 1-{})",
                self.channel, MAX_CHANNEL
            )));
        }
        Ok(())
    }
}

/// The committed configuration together with where it lives on disk.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    pub data: ConfigData,
    from_file: bool,
}

impl ConfigStore {
    /// Loads the configuration at `path`.
    ///
    /// A missing file is not an error: defaults are used and the store reports
    /// that nothing has been saved yet. Malformed JSON or an out-of-range field
    /// is returned as an error, which the caller treats as fatal.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(text) => {
                let data: ConfigData = serde_json::from_str(&text)?;
                data.check_ranges()?;
                log::info!("Loaded configuration from {}", path.display());
                Ok(Self {
                    path,
                    data,
                    from_file: true,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!(
                    "No configuration at {}, using defaults",
                    path.display()
                );
                Ok(Self::with_defaults(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: ConfigData::default(),
            from_file: false,
        }
    }

    /// Writes the committed configuration as pretty-printed JSON.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        let out = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, out)?;
        self.from_file = true;
        log::info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the on-disk file reflects a load or a successful save.
    pub fn from_file(&self) -> bool {
        self.from_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_disk_key_names() {
        let data = ConfigData {
            universe: 7,
            channel: 12,
            scenes: vec!["Red".to_string()],
            ledfx_host: "http://h".to_string(),
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["sAcnUniverse"], 7);
        assert_eq!(value["channel"], 12);
        assert_eq!(value["scenes"][0], "Red");
        assert_eq!(value["ledfx_host"], "http://h");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let data: ConfigData = serde_json::from_str(r#"{"channel": 5}"#).unwrap();
        assert_eq!(data.universe, 1);
        assert_eq!(data.channel, 5);
        assert!(data.scenes.is_empty());
        assert_eq!(data.ledfx_host, DEFAULT_LEDFX_HOST);
    }

    #[test]
    fn test_channel_index_is_zero_based() {
        let data = ConfigData {
            channel: 512,
            ..ConfigData::default()
        };
        assert_eq!(data.channel_index(), 511);
    }

    #[test]
    fn test_range_checks() {
        let zero_universe = ConfigData {
            universe: 0,
            ..ConfigData::default()
        };
        assert!(zero_universe.check_ranges().is_err());

        let big_channel = ConfigData {
            channel: 513,
            ..ConfigData::default()
        };
        assert!(big_channel.check_ranges().is_err());

        assert!(ConfigData::default().check_ranges().is_ok());
    }
}
