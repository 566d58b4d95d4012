//! Monitor configuration, persisted as TOML under the user config dir.
//!
//! A missing file is replaced with the defaults on first start so the file
//! is always there to edit afterwards. Missing fields fall back to the
//! defaults, so old config files keep working across upgrades.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Broker hostname, without scheme or port.
    pub broker_host: String,
    pub broker_port: u16,
    /// Single telemetry topic the band publishes to.
    pub topic: String,
    pub keep_alive_secs: u64,
    pub client_id: String,
    /// Where `save` writes the decimated table.
    pub export_destination: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            broker_host: "broker.emqx.io".to_string(),
            broker_port: 1883,
            topic: "SB_PI_DATA".to_string(),
            keep_alive_secs: 60,
            client_id: "bandmon".to_string(),
            export_destination: PathBuf::from("band_data.csv"),
        }
    }
}

impl MonitorConfig {
    fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| eyre!("No user config directory available"))?;
        Ok(base.join("bandmon").join("config.toml"))
    }

    /// Loads the config file, writing the defaults first if it is absent.
    pub async fn load_or_create() -> Result<Self> {
        let path = Self::config_path()?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Loading config from {}", path.display());
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| eyre!("Failed to read config file: {}", e))?;
            return toml::from_str(&content)
                .map_err(|e| eyre!("Failed to parse config file: {}", e));
        }

        let config = Self::default();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(&config)
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config: {}", e))?;
        info!("Wrote default config to {}", path.display());
        Ok(config)
    }
}
