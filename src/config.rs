use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const STATE_DIR: &str = ".commcal";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the state directory; defaults to `~/.commcal`.
    pub state_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(STATE_DIR))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save()?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "commcal", "commcal")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.state_dir, None);
    }

    #[test]
    fn test_state_dir_override_wins() -> Result<()> {
        let storage = StorageConfig { state_dir: Some(PathBuf::from("/tmp/commcal-test")) };
        assert_eq!(storage.resolved_state_dir()?, PathBuf::from("/tmp/commcal-test"));
        Ok(())
    }

    #[test]
    fn test_config_round_trips_through_toml() -> Result<()> {
        let config = Config {
            server: ServerConfig { host: "127.0.0.1".to_string(), port: 9100 },
            storage: StorageConfig { state_dir: Some(PathBuf::from("/var/lib/commcal")) },
        };
        let text = toml::to_string_pretty(&config)?;
        let parsed: Config = toml::from_str(&text)?;
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert_eq!(parsed.server.port, 9100);
        assert_eq!(parsed.storage.state_dir, Some(PathBuf::from("/var/lib/commcal")));
        Ok(())
    }
}
