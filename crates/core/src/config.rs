use serde::Deserialize;
use std::path::Path;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `BRANDKIT__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub customizer: CustomizerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_max_logo_bytes")]
    pub max_logo_bytes: usize,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

/// What to do with customization map keys that no longer match the
/// template's content schema when a record is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Drop the offending keys, report them as a warning and persist the rest.
    #[default]
    DropAndWarn,
    /// Fail the whole commit.
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomizerConfig {
    #[serde(default)]
    pub stale_policy: StalePolicy,
    /// Appended to the template title to name a committed customization.
    #[serde(default = "default_name_suffix")]
    pub name_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
}

fn default_public_base_url() -> String {
    "https://storage.local/brandkit".to_string()
}
fn default_max_logo_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "svg", "webp", "gif"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_name_suffix() -> String {
    "Customized".to_string()
}
fn default_log_filter() -> String {
    "brandkit=info".to_string()
}
fn default_log_json() -> bool {
    true
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            public_base_url: default_public_base_url(),
            max_logo_bytes: default_max_logo_bytes(),
            max_image_bytes: default_max_image_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Default for CustomizerConfig {
    fn default() -> Self {
        Self {
            stale_policy: StalePolicy::default(),
            name_suffix: default_name_suffix(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: default_log_json(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    /// Environment variables win over the file.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("BRANDKIT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("upload.allowed_extensions"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
