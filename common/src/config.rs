use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub org: OrgConfig,
    #[serde(default = "default_profiler_config")]
    pub profiler: ProfilerConfig,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrgConfig {
    /// Instance host, e.g. `acme.my.salesforce.com`. A leading `.` (cookie
    /// domain form) is tolerated.
    pub domain: String,
    pub token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfilerConfig {
    /// Sub-requests per composite call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_chart_page_size")]
    pub chart_page_size: usize,
    #[serde(default = "default_chart_width")]
    pub chart_width: f64,
    #[serde(default = "default_chart_height")]
    pub chart_height: f64,
}

fn default_profiler_config() -> ProfilerConfig {
    ProfilerConfig {
        batch_size: default_batch_size(),
        chart_page_size: default_chart_page_size(),
        chart_width: default_chart_width(),
        chart_height: default_chart_height(),
    }
}

fn default_api_version() -> String {
    "v57.0".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_chart_page_size() -> usize {
    50
}

fn default_chart_width() -> f64 {
    1000.0
}

fn default_chart_height() -> f64 {
    320.0
}

fn default_api_port() -> u16 {
    3000
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            domain = %settings.org.domain,
            api_version = %settings.org.api_version,
            batch_size = settings.profiler.batch_size,
            "Loaded profiler settings"
        );

        Ok(settings)
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        default_profiler_config()
    }
}
