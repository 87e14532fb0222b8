//! Configuration loader and validator for the story feed syncer.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::layout::FeedLayout;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub feed: Feed,
    #[serde(default)]
    pub layout: Layout,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

/// Remote feed endpoint and the fixed query it is asked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub base_url: String,
    pub site_id: String,
    pub category: String,
    pub number: u32,
    pub fields: Vec<String>,
}

/// Grid slot layout used by readers of the local store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Layout {
    #[serde(default)]
    pub ad_interval: u32,
    #[serde(default)]
    pub ad_initial_offset: u32,
}

pub const DEFAULT_BASE_URL: &str = "https://public-api.wordpress.com/rest/v1.1/sites/";
pub const DEFAULT_SITE_ID: &str = "113100833";
pub const DEFAULT_CATEGORY: &str = "historias-infantis-abobrinha";
pub const DEFAULT_NUMBER: u32 = 100;
/// Upper bound the WordPress.com posts endpoint accepts for `number`.
pub const MAX_NUMBER: u32 = 100;

fn default_sync_interval_secs() -> u64 {
    3600
}

impl Default for Feed {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            site_id: DEFAULT_SITE_ID.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            number: DEFAULT_NUMBER,
            fields: ["ID", "title", "content", "excerpt", "featured_image", "categories"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl Feed {
    /// Comma-separated field selection as sent in the `fields` query parameter.
    pub fn fields_csv(&self) -> String {
        self.fields.join(",")
    }
}

impl From<Layout> for FeedLayout {
    fn from(l: Layout) -> Self {
        FeedLayout::new(l.ad_interval, l.ad_initial_offset)
    }
}

impl App {
    /// `data_dir` with a leading `~/` expanded to `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return format!("{}/{}", home.trim_end_matches('/'), rest);
            }
        }
        self.data_dir.clone()
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.resolved_data_dir())
    }

    /// SQLite URL for the local store: `DATABASE_URL` wins over `app.data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/storybox.db", self.app.resolved_data_dir()))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.sync_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.sync_interval_secs must be > 0"));
    }

    if Url::parse(&cfg.feed.base_url).is_err() {
        return Err(ConfigError::Invalid("feed.base_url must be an absolute URL"));
    }
    if cfg.feed.site_id.trim().is_empty() {
        return Err(ConfigError::Invalid("feed.site_id must be non-empty"));
    }
    if cfg.feed.category.trim().is_empty() {
        return Err(ConfigError::Invalid("feed.category must be non-empty"));
    }
    if cfg.feed.number == 0 || cfg.feed.number > MAX_NUMBER {
        return Err(ConfigError::Invalid("feed.number must be within 1..=100"));
    }
    if cfg.feed.fields.is_empty() || cfg.feed.fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ConfigError::Invalid("feed.fields must list non-empty field names"));
    }
    // ID and title are what the parser cannot do without.
    for required in ["ID", "title"] {
        if !cfg.feed.fields.iter().any(|f| f == required) {
            return Err(ConfigError::Invalid("feed.fields must include ID and title"));
        }
    }

    Ok(())
}

/// Returns the example YAML shipped as `config.example.yaml`.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  sync_interval_secs: 3600

feed:
  base_url: "https://public-api.wordpress.com/rest/v1.1/sites/"
  site_id: "113100833"
  category: "historias-infantis-abobrinha"
  number: 100
  fields: ["ID", "title", "content", "excerpt", "featured_image", "categories"]

layout:
  ad_interval: 0
  ad_initial_offset: 0
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.feed, Feed::default());
    }

    #[test]
    fn feed_and_layout_sections_are_optional() {
        let cfg: Config = serde_yaml::from_str("app:\n  data_dir: \"./data\"\n").unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.sync_interval_secs, 3600);
        assert_eq!(cfg.feed.number, 100);
        assert_eq!(cfg.layout, Layout::default());
    }

    #[test]
    fn fields_csv_joins_with_commas() {
        let feed = Feed::default();
        assert_eq!(
            feed.fields_csv(),
            "ID,title,content,excerpt,featured_image,categories"
        );
    }

    #[test]
    fn invalid_app_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = "  ".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("data_dir")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.sync_interval_secs = 0;
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("sync_interval_secs")), _ => panic!("wrong error") }
    }

    #[test]
    fn invalid_feed_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.base_url = "not a url".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("base_url")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.site_id = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.category = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.number = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
        cfg.feed.number = 101;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.fields.retain(|f| f != "ID");
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("ID and title")), _ => panic!("wrong error") }
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.feed.site_id, "113100833");
        assert_eq!(cfg.feed.category, "historias-infantis-abobrinha");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = load(Some(&td.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
