//! Handles settings for the application. Configuration is read from
//! `config/barcontrol.toml` when present and can be overridden through
//! `BARCONTROL__<SECTION>__<KEY>` environment variables.
use config::{Config, ConfigError, Environment, File};
use engine::EngineOptions;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/barcontrol";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    /// Directory holding one file per stored key.
    pub path: String,
    /// Cap on the bytes stored, unbounded when missing.
    pub quota_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub storage: Storage,
    #[serde(default)]
    pub engine: EngineOptions,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("storage.path", "data/barcontrol")?
            .set_default("storage.quota_bytes", 5_i64 * 1024 * 1024)?
            .add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false))
            .add_source(
                Environment::with_prefix("BARCONTROL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
