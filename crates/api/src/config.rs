//! Server configuration

use crate::model::ModelParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `POSE_BOOTH__SERVER__BIND_ADDR`
pub const ENV_PREFIX: &str = "POSE_BOOTH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// JSON file of recorded samples (label -> feature vectors)
    pub data_file: PathBuf,
    pub neighbors: usize,
    pub anomaly_threshold: f64,
    pub log_level: String,
    pub json_logs: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            data_file: PathBuf::from("pose_data.json"),
            neighbors: 3,
            anomaly_threshold: 2.0,
            log_level: "info".to_string(),
            json_logs: false,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileLayout {
    server: ServerConfig,
}

impl ServerConfig {
    /// Defaults, then the `[server]` table of the optional file, then `POSE_BOOTH__SERVER__*`
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.cors_origins"),
        );

        let layout: FileLayout = builder.build()?.try_deserialize()?;
        Ok(layout.server)
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            neighbors: self.neighbors,
            anomaly_threshold: self.anomaly_threshold,
        }
    }
}
