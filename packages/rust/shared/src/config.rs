//! Application configuration for InternScout.
//!
//! User config lives at `~/.internscout/internscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{InternScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "internscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".internscout";

// ---------------------------------------------------------------------------
// Config structs (matching internscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub scrape: ScrapeSettings,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub keywords: KeywordsConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[feed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Endpoint returning the JSON array of postings.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Request timeout for the feed fetch, in seconds.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_secs: default_feed_timeout(),
        }
    }
}

fn default_feed_url() -> String {
    "https://jobs.cvrve.me/api/intern".into()
}
fn default_feed_timeout() -> u64 {
    10
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSettings {
    /// Number of concurrent workers (and browser sessions).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Lower bound of the randomized delay before each navigation.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized delay before each navigation.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// Character cap for the whole-body fallback description.
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,

    /// A selector's text must be strictly longer than this to be used.
    #[serde(default = "default_min_selector_match")]
    pub min_selector_match_length: usize,

    /// A selector's text longer than this stops the selector scan.
    #[serde(default = "default_confident_match")]
    pub confident_match_length: usize,

    /// Characters of description scanned for keywords.
    #[serde(default = "default_keyword_scan_limit")]
    pub keyword_scan_limit: usize,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Browser window size as `"width,height"`.
    #[serde(default = "default_window_size")]
    pub window_size: String,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            page_load_timeout_secs: default_page_load_timeout(),
            max_description_length: default_max_description_length(),
            min_selector_match_length: default_min_selector_match(),
            confident_match_length: default_confident_match(),
            keyword_scan_limit: default_keyword_scan_limit(),
            headless: true,
            window_size: default_window_size(),
        }
    }
}

fn default_worker_count() -> usize {
    5
}
fn default_min_delay() -> u64 {
    500
}
fn default_max_delay() -> u64 {
    2000
}
fn default_page_load_timeout() -> u64 {
    5
}
fn default_max_description_length() -> usize {
    2000
}
fn default_min_selector_match() -> usize {
    100
}
fn default_confident_match() -> usize {
    500
}
fn default_keyword_scan_limit() -> usize {
    3000
}
fn default_true() -> bool {
    true
}
fn default_window_size() -> String {
    "1920,1080".into()
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Postings whose latest timestamp is older than this are skipped.
    #[serde(default = "default_cutoff")]
    pub date_cutoff_timestamp: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            date_cutoff_timestamp: default_cutoff(),
        }
    }
}

/// 2025-05-01T00:00:00Z
fn default_cutoff() -> i64 {
    1_746_057_600
}

/// `[keywords]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// The fixed vocabulary matched against descriptions.
    #[serde(default = "default_vocabulary")]
    pub vocabulary: Vec<String>,

    /// Also admit mined entities containing an indicator word such as
    /// "framework". Off by default, which keeps keywords inside the vocabulary.
    /// Only has an effect when a phrase miner is attached to the extractor;
    /// plain vocabulary matching ignores it.
    #[serde(default)]
    pub admit_indicator_entities: bool,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            vocabulary: default_vocabulary(),
            admit_indicator_entities: false,
        }
    }
}

const DEFAULT_VOCABULARY: &[&str] = &[
    // Programming languages
    "python", "java", "javascript", "typescript", "c++", "c#", "ruby", "go", "golang",
    "rust", "swift", "kotlin", "scala", "r", "matlab", "julia", "php", "perl", "html", "css",
    // Web
    "react", "angular", "vue", "vue.js", "node.js", "nodejs", "express", "django", "flask",
    "spring", "spring boot", "rails", "ruby on rails", "laravel", "asp.net", "jquery",
    "bootstrap", "tailwind", "tailwindcss", "next.js", "nextjs", "nuxt.js", "gatsby",
    // Data & ML
    "machine learning", "deep learning", "tensorflow", "pytorch", "scikit-learn", "sklearn",
    "pandas", "numpy", "data science", "data analysis", "data engineering", "data analytics",
    "big data", "spark", "apache spark", "hadoop", "kafka", "apache kafka", "etl",
    "sql", "nosql", "mongodb", "postgresql", "mysql", "redis", "elasticsearch", "cassandra",
    "tableau", "power bi", "looker", "airflow", "mlflow", "kubeflow",
    // Cloud & DevOps
    "aws", "amazon web services", "azure", "microsoft azure", "gcp", "google cloud",
    "docker", "kubernetes", "k8s", "jenkins", "gitlab", "github actions", "circleci",
    "ci/cd", "devops", "terraform", "ansible", "puppet", "chef", "linux", "unix",
    "bash", "shell", "powershell", "cloudformation", "helm",
    // Mobile
    "ios", "android", "react native", "flutter", "xamarin", "objective-c",
    "mobile development", "swiftui", "jetpack compose",
    // Other
    "api", "rest", "restful", "graphql", "grpc", "microservices", "blockchain",
    "ai", "artificial intelligence", "nlp", "natural language processing",
    "computer vision", "opencv", "git", "github", "bitbucket", "svn",
    "agile", "scrum", "kanban", "jira", "confluence", "testing", "qa",
    "quality assurance", "automation", "selenium", "cypress", "jest", "pytest",
    "junit", "security", "cybersecurity", "oauth", "jwt", "ssl", "https",
    // Databases & tools
    "oracle", "sqlite", "dynamodb", "firebase", "supabase", "prisma", "sequelize",
    "mongoose", "memcached", "rabbitmq", "celery", "nginx", "apache",
    // Soft skills
    "communication", "teamwork", "problem solving", "problem-solving", "analytical",
    "leadership", "project management", "presentation", "collaboration",
    "critical thinking", "time management", "attention to detail", "creative",
    "innovative", "self-motivated", "proactive", "organized", "adaptable",
];

fn default_vocabulary() -> Vec<String> {
    DEFAULT_VOCABULARY.iter().map(|s| s.to_string()).collect()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite/libSQL database holding enriched postings.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// JSON checkpoint of processed posting ids.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            checkpoint_path: default_checkpoint_path(),
        }
    }
}

fn default_database_path() -> String {
    "internships.db".into()
}
fn default_checkpoint_path() -> String {
    "scraper_progress.json".into()
}

// ---------------------------------------------------------------------------
// Scrape config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scrape configuration, merged from the config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub feed_url: String,
    pub feed_timeout: Duration,
    pub worker_count: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub page_load_timeout: Duration,
    pub date_cutoff_timestamp: i64,
    pub vocabulary: Vec<String>,
    pub admit_indicator_entities: bool,
    pub max_description_length: usize,
    pub min_selector_match_length: usize,
    pub confident_match_length: usize,
    pub keyword_scan_limit: usize,
    pub headless: bool,
    pub window_size: (u32, u32),
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            feed_url: config.feed.url.clone(),
            feed_timeout: Duration::from_secs(config.feed.timeout_secs),
            worker_count: config.scrape.worker_count,
            min_delay: Duration::from_millis(config.scrape.min_delay_ms),
            max_delay: Duration::from_millis(config.scrape.max_delay_ms),
            page_load_timeout: Duration::from_secs(config.scrape.page_load_timeout_secs),
            date_cutoff_timestamp: config.filter.date_cutoff_timestamp,
            vocabulary: config.keywords.vocabulary.clone(),
            admit_indicator_entities: config.keywords.admit_indicator_entities,
            max_description_length: config.scrape.max_description_length,
            min_selector_match_length: config.scrape.min_selector_match_length,
            confident_match_length: config.scrape.confident_match_length,
            keyword_scan_limit: config.scrape.keyword_scan_limit,
            headless: config.scrape.headless,
            window_size: parse_window_size(&config.scrape.window_size).unwrap_or((1920, 1080)),
        }
    }
}

impl ScrapeConfig {
    /// Reject configurations the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(InternScoutError::config("worker_count must be at least 1"));
        }
        if self.min_delay > self.max_delay {
            return Err(InternScoutError::config(format!(
                "min_delay ({:?}) exceeds max_delay ({:?})",
                self.min_delay, self.max_delay
            )));
        }
        if self.min_selector_match_length > self.confident_match_length {
            return Err(InternScoutError::config(
                "min_selector_match_length must not exceed confident_match_length",
            ));
        }
        if self.page_load_timeout.is_zero() {
            return Err(InternScoutError::config("page_load_timeout must be non-zero"));
        }
        if !self.vocabulary.iter().any(|term| !term.trim().is_empty()) {
            return Err(InternScoutError::config("keyword vocabulary is empty"));
        }
        Url::parse(&self.feed_url).map_err(|e| {
            InternScoutError::config(format!("invalid feed url '{}': {e}", self.feed_url))
        })?;
        Ok(())
    }
}

/// Parse `"1920,1080"` into `(1920, 1080)`.
fn parse_window_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once(',')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.internscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| InternScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.internscout/internscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| InternScoutError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        InternScoutError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| InternScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| InternScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| InternScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("worker_count"));
        assert!(toml_str.contains("jobs.cvrve.me"));
        assert!(toml_str.contains("machine learning"));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let toml_str = r#"
[scrape]
worker_count = 8

[keywords]
vocabulary = ["rust", "go"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.scrape.worker_count, 8);
        assert_eq!(config.scrape.min_delay_ms, 500);
        assert_eq!(config.keywords.vocabulary, vec!["rust", "go"]);
        assert_eq!(config.filter.date_cutoff_timestamp, 1_746_057_600);
        assert_eq!(config.storage.checkpoint_path, "scraper_progress.json");
    }

    #[test]
    fn scrape_config_from_app_config() {
        let app = AppConfig::default();
        let scrape = ScrapeConfig::from(&app);
        assert_eq!(scrape.worker_count, 5);
        assert_eq!(scrape.min_delay, Duration::from_millis(500));
        assert_eq!(scrape.max_delay, Duration::from_secs(2));
        assert_eq!(scrape.page_load_timeout, Duration::from_secs(5));
        assert_eq!(scrape.window_size, (1920, 1080));
        assert!(scrape.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let app = AppConfig::default();

        let mut scrape = ScrapeConfig::from(&app);
        scrape.worker_count = 0;
        assert!(scrape.validate().unwrap_err().to_string().contains("worker_count"));

        let mut scrape = ScrapeConfig::from(&app);
        scrape.min_delay = Duration::from_secs(5);
        assert!(scrape.validate().is_err());

        let mut scrape = ScrapeConfig::from(&app);
        scrape.vocabulary = vec!["  ".into()];
        assert!(scrape.validate().unwrap_err().to_string().contains("vocabulary"));

        let mut scrape = ScrapeConfig::from(&app);
        scrape.feed_url = "not a url".into();
        assert!(scrape.validate().is_err());
    }

    #[test]
    fn window_size_parsing() {
        assert_eq!(parse_window_size("1280, 720"), Some((1280, 720)));
        assert_eq!(parse_window_size("wide"), None);
    }
}
