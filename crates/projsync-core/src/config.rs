//! Configuration module for projsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for projsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub watcher: WatcherConfig,
    pub filter: FilterConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

/// Remote document store endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the project document API.
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

/// Sync job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Files larger than this are skipped instead of uploaded.
    pub max_file_size_bytes: u64,
    /// Seconds before an in-flight job is failed. `0` disables the timeout.
    pub job_timeout_secs: u64,
}

/// Polling watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Milliseconds between filesystem polls.
    pub poll_interval_ms: u64,
    /// Milliseconds a file must stay unchanged before it is considered stable.
    pub stability_threshold_ms: u64,
    /// Milliseconds between checks of pending (unstable) files.
    pub stability_poll_ms: u64,
    /// Capacity of the raw event channel.
    pub event_buffer: usize,
}

/// Path filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Base names to ignore. `*.ext` entries match by suffix.
    pub ignore: Vec<String>,
    /// File extensions (without the dot) that may be synced.
    pub allowed_extensions: Vec<String>,
    /// Extension-less file names that may be synced.
    pub allowed_names: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite settings database.
    pub database: PathBuf,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/projsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("projsync")
            .join("config.yaml")
    }
}

impl SyncConfig {
    /// Per-job timeout, `None` when disabled.
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stability_threshold(&self) -> Duration {
        Duration::from_millis(self.stability_threshold_ms)
    }

    pub fn stability_poll(&self) -> Duration {
        Duration::from_millis(self.stability_poll_ms)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default maximum upload size: 100 KiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024;

const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    ".DS_Store",
    "Thumbs.db",
    "*.tmp",
    "*.log",
    "node_modules",
    ".idea",
    ".env",
];

const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    // text and documents
    "txt", "md", "markdown", "rst", "adoc", "org", "tex", "csv", "tsv", "rtf",
    // config and data
    "json", "jsonc", "yaml", "yml", "toml", "xml", "ini", "cfg", "conf", "properties", "lock",
    "sql", "graphql", "proto",
    // web
    "html", "htm", "css", "scss", "sass", "less", "svg", "vue", "svelte",
    // code
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "py", "pyi", "rb", "php", "java", "kt", "kts",
    "scala", "go", "rs", "c", "h", "cc", "cpp", "hpp", "cs", "swift", "m", "mm", "dart", "lua",
    "r", "pl", "ex", "exs", "erl", "hs", "clj", "zig", "nim", "gradle",
    // scripts
    "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd",
];

const DEFAULT_ALLOWED_NAMES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "LICENSE",
    "README",
    "CHANGELOG",
    "Gemfile",
    "Rakefile",
    "Procfile",
    "Jenkinsfile",
    ".gitignore",
    ".editorconfig",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.claude.ai/api".to_string(),
            user_agent: format!("projsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            job_timeout_secs: 120,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            stability_threshold_ms: 2000,
            stability_poll_ms: 100,
            event_buffer: 1024,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore: owned(DEFAULT_IGNORE),
            allowed_extensions: owned(DEFAULT_ALLOWED_EXTENSIONS),
            allowed_names: owned(DEFAULT_ALLOWED_NAMES),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("projsync");
        Self {
            database: data_dir.join("settings.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"watcher.poll_interval_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        let url = self.remote.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.remote.base_url),
            });
        }
        if self.remote.user_agent.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.user_agent".into(),
                message: "must not be empty".into(),
            });
        }

        // --- sync ---
        positive(
            &mut errors,
            "sync.max_file_size_bytes",
            self.sync.max_file_size_bytes,
        );

        // --- watcher ---
        positive(
            &mut errors,
            "watcher.poll_interval_ms",
            self.watcher.poll_interval_ms,
        );
        positive(
            &mut errors,
            "watcher.stability_poll_ms",
            self.watcher.stability_poll_ms,
        );
        positive(
            &mut errors,
            "watcher.event_buffer",
            self.watcher.event_buffer as u64,
        );
        if self.watcher.stability_poll_ms > self.watcher.stability_threshold_ms {
            errors.push(ValidationError {
                field: "watcher.stability_poll_ms".into(),
                message: format!(
                    "must not exceed stability_threshold_ms ({})",
                    self.watcher.stability_threshold_ms
                ),
            });
        }

        // --- filter ---
        for raw in &self.filter.ignore {
            let message = if raw.trim().is_empty() || raw == "*" {
                format!("pattern '{raw}' is empty or matches every name")
            } else if let Err(e) = glob::Pattern::new(raw) {
                format!("invalid glob '{raw}': {e}")
            } else {
                continue;
            };
            errors.push(ValidationError {
                field: "filter.ignore".into(),
                message,
            });
        }
        if let Some(bad) = self
            .filter
            .allowed_extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            errors.push(ValidationError {
                field: "filter.allowed_extensions".into(),
                message: format!("extensions must be non-empty and given without a dot, got '{bad}'"),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "must be one of {:?}, got '{}'",
                    VALID_LOG_LEVELS, self.logging.level
                ),
            });
        }

        // --- storage ---
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use projsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .remote_base_url("http://localhost:8080/api")
///     .sync_max_file_size_bytes(50 * 1024)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.remote.user_agent = agent.into();
        self
    }

    // --- sync ---

    pub fn sync_max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.sync.max_file_size_bytes = bytes;
        self
    }

    pub fn sync_job_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.sync.job_timeout_secs = seconds;
        self
    }

    // --- watcher ---

    pub fn watcher_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.watcher.poll_interval_ms = ms;
        self
    }

    pub fn watcher_stability_threshold_ms(mut self, ms: u64) -> Self {
        self.config.watcher.stability_threshold_ms = ms;
        self
    }

    pub fn watcher_stability_poll_ms(mut self, ms: u64) -> Self {
        self.config.watcher.stability_poll_ms = ms;
        self
    }

    pub fn watcher_event_buffer(mut self, capacity: usize) -> Self {
        self.config.watcher.event_buffer = capacity;
        self
    }

    // --- filter ---

    pub fn filter_ignore(mut self, patterns: Vec<String>) -> Self {
        self.config.filter.ignore = patterns;
        self
    }

    pub fn filter_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.filter.allowed_extensions = extensions;
        self
    }

    pub fn filter_allowed_names(mut self, names: Vec<String>) -> Self {
        self.config.filter.allowed_names = names;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- storage ---

    pub fn storage_database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.remote.base_url, "https://api.claude.ai/api");
        assert!(cfg.remote.user_agent.starts_with("projsync/"));
        assert_eq!(cfg.sync.max_file_size_bytes, 102_400);
        assert_eq!(cfg.sync.job_timeout_secs, 120);
        assert_eq!(cfg.watcher.poll_interval_ms, 100);
        assert_eq!(cfg.watcher.stability_threshold_ms, 2000);
        assert_eq!(cfg.watcher.stability_poll_ms, 100);
        assert_eq!(cfg.watcher.event_buffer, 1024);
        assert!(cfg.filter.ignore.contains(&"node_modules".to_string()));
        assert!(cfg.filter.ignore.contains(&"*.log".to_string()));
        assert!(cfg.filter.allowed_extensions.contains(&"md".to_string()));
        assert!(cfg.filter.allowed_names.contains(&"Makefile".to_string()));
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.storage.database.ends_with("projsync/settings.db"));
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn durations_from_config() {
        let cfg = Config::default();
        assert_eq!(cfg.watcher.poll_interval(), Duration::from_millis(100));
        assert_eq!(cfg.watcher.stability_threshold(), Duration::from_secs(2));
        assert_eq!(cfg.sync.job_timeout(), Some(Duration::from_secs(120)));

        let mut cfg = cfg;
        cfg.sync.job_timeout_secs = 0;
        assert_eq!(cfg.sync.job_timeout(), None);
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
remote:
  base_url: http://localhost:9000/api
  user_agent: test-agent
sync:
  max_file_size_bytes: 2048
  job_timeout_secs: 0
watcher:
  poll_interval_ms: 250
  stability_threshold_ms: 500
  stability_poll_ms: 50
  event_buffer: 16
filter:
  ignore: [".git", "*.bak"]
  allowed_extensions: ["txt"]
  allowed_names: []
logging:
  level: debug
storage:
  database: /tmp/projsync-test.db
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.remote.base_url, "http://localhost:9000/api");
        assert_eq!(cfg.remote.user_agent, "test-agent");
        assert_eq!(cfg.sync.max_file_size_bytes, 2048);
        assert_eq!(cfg.sync.job_timeout(), None);
        assert_eq!(cfg.watcher.poll_interval_ms, 250);
        assert_eq!(cfg.watcher.event_buffer, 16);
        assert_eq!(cfg.filter.ignore, vec![".git", "*.bak"]);
        assert_eq!(cfg.filter.allowed_extensions, vec!["txt"]);
        assert!(cfg.filter.allowed_names.is_empty());
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.storage.database, PathBuf::from("/tmp/projsync-test.db"));
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"sync:\n  max_file_size_bytes: 10\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.max_file_size_bytes, 10);
        assert_eq!(cfg.sync.job_timeout_secs, 120);
        assert_eq!(cfg.watcher.stability_threshold_ms, 2000);
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.max_file_size_bytes, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_values() {
        let mut cfg = Config::default();
        cfg.sync.max_file_size_bytes = 0;
        cfg.watcher.poll_interval_ms = 0;
        cfg.watcher.event_buffer = 0;
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"sync.max_file_size_bytes"));
        assert!(fields.contains(&"watcher.poll_interval_ms"));
        assert!(fields.contains(&"watcher.event_buffer"));
    }

    #[test]
    fn validate_catches_stability_poll_exceeding_threshold() {
        let mut cfg = Config::default();
        cfg.watcher.stability_threshold_ms = 50;
        cfg.watcher.stability_poll_ms = 100;
        let errors = cfg.validate();
        assert!(errors.iter().any(
            |e| e.field == "watcher.stability_poll_ms" && e.message.contains("must not exceed")
        ));
    }

    #[test]
    fn validate_catches_bad_url_and_log_level() {
        let mut cfg = Config::default();
        cfg.remote.base_url = "ftp://example.com".into();
        cfg.logging.level = "verbose".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "remote.base_url"));
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_catches_bad_filter_entries() {
        let mut cfg = Config::default();
        cfg.filter.ignore.push("*".into());
        cfg.filter.allowed_extensions.push(".rs".into());
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "filter.ignore"));
        assert!(errors.iter().any(|e| e.field == "filter.allowed_extensions"));
    }

    #[test]
    fn validate_rejects_malformed_glob() {
        let mut cfg = Config::default();
        cfg.filter.ignore.push("build-[".into());
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "filter.ignore" && e.message.contains("build-[")));
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .remote_base_url("http://127.0.0.1:1/api")
            .sync_max_file_size_bytes(10)
            .sync_job_timeout_secs(5)
            .watcher_stability_threshold_ms(300)
            .logging_level("warn")
            .build();
        assert_eq!(cfg.remote.base_url, "http://127.0.0.1:1/api");
        assert_eq!(cfg.sync.max_file_size_bytes, 10);
        assert_eq!(cfg.sync.job_timeout_secs, 5);
        assert_eq!(cfg.watcher.stability_threshold_ms, 300);
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new().logging_level("loud").build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "logging.level");
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        let path = Config::default_path();
        assert!(path.ends_with("projsync/config.yaml"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "sync.max_file_size_bytes".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "sync.max_file_size_bytes: must be greater than 0");
    }
}
