use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::{ImageOptimizationSettings, LiveSessionConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config/lecture-live.toml";
const ENV_PREFIX: &str = "LECTURE_LIVE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub live: LiveConfig,
    pub nats: NatsConfig,
    pub images: ImageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// May start with `~` or reference environment variables
    pub sessions_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    pub save_debounce_ms: u64,
    pub auto_mute_ms: u64,
    pub slide_select_debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    pub max_dimension: u32,
    pub grayscale: bool,
}

impl Config {
    /// Layer built-in defaults, an optional config file and `LECTURE_LIVE__*`
    /// environment overrides (e.g. `LECTURE_LIVE__NATS__URL`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "lecture-live")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 3030)?
            .set_default("storage.sessions_path", "~/.lecture-live/sessions")?
            .set_default("live.save_debounce_ms", 2000)?
            .set_default("live.auto_mute_ms", 1500)?
            .set_default("live.slide_select_debounce_ms", 200)?
            .set_default("nats.url", "nats://localhost:4222")?
            .set_default("images.max_dimension", 256)?
            .set_default("images.grayscale", true)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn sessions_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.storage.sessions_path)
            .with_context(|| format!("Failed to expand {}", self.storage.sessions_path))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }

    pub fn live_session(&self) -> LiveSessionConfig {
        LiveSessionConfig {
            save_debounce: Duration::from_millis(self.live.save_debounce_ms),
            auto_mute_delay: Duration::from_millis(self.live.auto_mute_ms),
            slide_select_debounce: Duration::from_millis(self.live.slide_select_debounce_ms),
        }
    }

    pub fn image_optimization(&self) -> ImageOptimizationSettings {
        ImageOptimizationSettings {
            max_dimension: self.images.max_dimension,
            grayscale: self.images.grayscale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load("does/not/exist").unwrap();
        assert_eq!(config.service.name, "lecture-live");
        assert_eq!(config.live_session().save_debounce, Duration::from_millis(2000));
        assert_eq!(config.image_optimization(), ImageOptimizationSettings::default());
        assert!(config.sessions_dir().unwrap().ends_with(".lecture-live/sessions"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture-live.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[service.http]\nport = 9000\n\n[live]\nauto_mute_ms = 500").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.service.http.port, 9000);
        assert_eq!(config.live_session().auto_mute_delay, Duration::from_millis(500));
        assert_eq!(config.live.save_debounce_ms, 2000);
    }
}
