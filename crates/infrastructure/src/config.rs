use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::printer::TransportKind;

/// Max characters of the first column in 3- and 4-column text lists.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct FirstRankConfig {
    pub three_columns: u32,
    pub four_columns: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrinterAgentConfig {
    #[serde(default)]
    pub transport: TransportKind,
    /// Transport-specific settings, handed to the transport factory as-is.
    #[serde(default = "default_transport_config")]
    pub transport_config: serde_json::Value,
    /// Paper width in millimetres.
    #[serde(default = "default_page_width")]
    pub page_width: u32,
    #[serde(default)]
    pub first_rank_max_length: Option<FirstRankConfig>,
    #[serde(default)]
    pub keep_scanning: bool,
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default = "default_permissions_granted")]
    pub permissions_granted: bool,
}

fn default_transport_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
fn default_page_width() -> u32 {
    58
}
fn default_permissions_granted() -> bool {
    true
}

impl Default for PrinterAgentConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            transport_config: default_transport_config(),
            page_width: default_page_width(),
            first_rank_max_length: None,
            keep_scanning: false,
            auto_connect: false,
            permissions_granted: default_permissions_granted(),
        }
    }
}

impl PrinterAgentConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("transport", "simulated")?
            .set_default("page_width", default_page_width())?
            // e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. BTPRINT__PAGE_WIDTH=80)
            .add_source(Environment::with_prefix("BTPRINT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
