use crate::error::{Result, StrideError};
use crate::store::{DeletePolicy, StoreRules};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrideConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Simulated latency before a command lands. 0 disables the wait.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// What to do with a command submitted while another is in flight:
    /// `reject` or `queue`.
    #[serde(default = "default_concurrency")]
    pub concurrency: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            concurrency: default_concurrency(),
        }
    }
}

impl DispatchConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn concurrency_policy(&self) -> ConcurrencyPolicy {
        self.concurrency.parse().unwrap_or_default()
    }
}

/// Handling of commands that arrive during another command's latency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    #[default]
    Reject,
    Queue,
}

impl std::fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

impl std::str::FromStr for ConcurrencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            _ => Err(format!("unknown concurrency policy: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `orphan`, `cascade` or `restrict`.
    #[serde(default = "default_delete_policy")]
    pub delete_policy: String,
    #[serde(default = "default_true")]
    pub enforce_capacity: bool,
    /// Session count given to enrollments created without one.
    #[serde(default = "default_total_sessions")]
    pub default_total_sessions: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            delete_policy: default_delete_policy(),
            enforce_capacity: true,
            default_total_sessions: default_total_sessions(),
        }
    }
}

impl StoreConfig {
    pub fn rules(&self) -> StoreRules {
        StoreRules {
            delete_policy: self.delete_policy.parse().unwrap_or_default(),
            enforce_capacity: self.enforce_capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold: u8,
    #[serde(default = "default_at_risk_threshold")]
    pub at_risk_threshold: u8,
    #[serde(default = "default_top_performers")]
    pub top_performers: usize,
    #[serde(default = "default_trend_sessions")]
    pub trend_sessions: usize,
    #[serde(default = "default_upcoming_sessions")]
    pub upcoming_sessions: usize,
    #[serde(default = "default_recent_records")]
    pub recent_records: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            completion_threshold: default_completion_threshold(),
            at_risk_threshold: default_at_risk_threshold(),
            top_performers: default_top_performers(),
            trend_sessions: default_trend_sessions(),
            upcoming_sessions: default_upcoming_sessions(),
            recent_records: default_recent_records(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// How many prior snapshots `undo` can walk back through.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_events: default_max_events(),
            max_snapshots: default_max_snapshots(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    /// JSON seed file. The built-in fixture is used when unset.
    #[serde(default)]
    pub path: Option<String>,
}

/// Valid concurrency policy names.
pub const VALID_CONCURRENCY: &[&str] = &["reject", "queue"];

/// Valid course delete policy names.
pub const VALID_DELETE_POLICIES: &[&str] = &["orphan", "cascade", "restrict"];

// -- Defaults --

fn default_latency_ms() -> u64 {
    500
}
fn default_concurrency() -> String {
    "reject".to_string()
}
fn default_delete_policy() -> String {
    "orphan".to_string()
}
fn default_true() -> bool {
    true
}
fn default_total_sessions() -> u32 {
    12
}
fn default_completion_threshold() -> u8 {
    80
}
fn default_at_risk_threshold() -> u8 {
    60
}
fn default_top_performers() -> usize {
    10
}
fn default_trend_sessions() -> usize {
    10
}
fn default_upcoming_sessions() -> usize {
    3
}
fn default_recent_records() -> usize {
    5
}
fn default_max_events() -> usize {
    1000
}
fn default_max_snapshots() -> usize {
    50
}
fn default_web_port() -> u16 {
    37740
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

impl StrideConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/stride/config.toml (global)
    /// 2. .stride/config.toml (project)
    /// 3. .stride/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".stride").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".stride").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| StrideError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| StrideError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only, no files.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Lenient validation: out-of-range values are fixed rather than
    /// rejected. Returns one warning per fix.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_CONCURRENCY.contains(&self.dispatch.concurrency.to_lowercase().as_str()) {
            warnings.push(format!(
                "unknown dispatch.concurrency '{}', valid: {}; using reject",
                self.dispatch.concurrency,
                VALID_CONCURRENCY.join(", ")
            ));
            self.dispatch.concurrency = default_concurrency();
        }

        if self
            .store
            .delete_policy
            .parse::<DeletePolicy>()
            .is_err()
        {
            warnings.push(format!(
                "unknown store.delete_policy '{}', valid: {}; using orphan",
                self.store.delete_policy,
                VALID_DELETE_POLICIES.join(", ")
            ));
            self.store.delete_policy = default_delete_policy();
        }

        let percent_checks: Vec<(&str, &mut u8)> = vec![
            (
                "analytics.completion_threshold",
                &mut self.analytics.completion_threshold,
            ),
            (
                "analytics.at_risk_threshold",
                &mut self.analytics.at_risk_threshold,
            ),
        ];
        for (name, val) in percent_checks {
            if *val > 100 {
                warnings.push(format!("{name} = {val} out of range [0, 100], clamping"));
                *val = 100;
            }
        }

        let limit_checks: Vec<(&str, &mut usize)> = vec![
            ("analytics.top_performers", &mut self.analytics.top_performers),
            ("analytics.trend_sessions", &mut self.analytics.trend_sessions),
            (
                "analytics.upcoming_sessions",
                &mut self.analytics.upcoming_sessions,
            ),
            ("analytics.recent_records", &mut self.analytics.recent_records),
            ("history.max_events", &mut self.history.max_events),
            ("history.max_snapshots", &mut self.history.max_snapshots),
        ];
        for (name, val) in limit_checks {
            if *val == 0 {
                warnings.push(format!("{name} = 0, setting to 1"));
                *val = 1;
            }
        }

        if self.store.default_total_sessions == 0 {
            warnings.push("store.default_total_sessions = 0, setting to 1".to_string());
            self.store.default_total_sessions = 1;
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stride").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrideConfig::default_config();
        assert_eq!(config.dispatch.latency_ms, 500);
        assert_eq!(config.dispatch.concurrency_policy(), ConcurrencyPolicy::Reject);
        assert_eq!(config.store.rules(), StoreRules::default());
        assert_eq!(config.store.default_total_sessions, 12);
        assert_eq!(config.analytics.completion_threshold, 80);
        assert_eq!(config.analytics.at_risk_threshold, 60);
        assert_eq!(config.analytics.top_performers, 10);
        assert_eq!(config.web.port, 37740);
        assert!(config.seed.path.is_none());
    }

    #[test]
    fn test_load_config_no_files() {
        let config = StrideConfig::load(Some(Path::new("/nonexistent/path"))).unwrap();
        assert_eq!(config.web.port, 37740);
        assert_eq!(config.history.max_snapshots, 50);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = StrideConfig::default_config();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: StrideConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.web.port, config.web.port);
        assert_eq!(parsed.dispatch.latency_ms, config.dispatch.latency_ms);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_str = r#"
[dispatch]
latency_ms = 0
concurrency = "queue"

[store]
delete_policy = "cascade"
"#;
        let config: StrideConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dispatch.latency(), Duration::ZERO);
        assert_eq!(config.dispatch.concurrency_policy(), ConcurrencyPolicy::Queue);
        assert_eq!(config.store.rules().delete_policy, DeletePolicy::Cascade);
        assert!(config.store.enforce_capacity);
        assert_eq!(config.analytics.top_performers, 10);
    }

    #[test]
    fn test_load_project_layers() {
        let dir = std::env::temp_dir().join(format!("stride-config-test-{}", std::process::id()));
        let stride_dir = dir.join(".stride");
        std::fs::create_dir_all(&stride_dir).unwrap();
        std::fs::write(
            stride_dir.join("config.toml"),
            "[web]\nport = 8080\n[analytics]\nat_risk_threshold = 50\n",
        )
        .unwrap();
        std::fs::write(stride_dir.join("config.local.toml"), "[web]\nport = 9090\n").unwrap();

        let config = StrideConfig::load(Some(&dir)).unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.analytics.at_risk_threshold, 50);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_fixes_bad_values() {
        let mut config = StrideConfig::default_config();
        config.dispatch.concurrency = "parallel".into();
        config.store.delete_policy = "nuke".into();
        config.analytics.completion_threshold = 150;
        config.analytics.top_performers = 0;
        config.store.default_total_sessions = 0;

        let warnings = config.validate();
        assert_eq!(warnings.len(), 5);
        assert_eq!(config.dispatch.concurrency, "reject");
        assert_eq!(config.store.delete_policy, "orphan");
        assert_eq!(config.analytics.completion_threshold, 100);
        assert_eq!(config.analytics.top_performers, 1);
        assert_eq!(config.store.default_total_sessions, 1);
    }

    #[test]
    fn test_validate_clean_config_no_warnings() {
        let mut config = StrideConfig::default_config();
        assert!(config.validate().is_empty());
    }
}
