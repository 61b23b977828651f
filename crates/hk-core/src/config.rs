use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::types::Channel;

/// Top-level configuration loaded from `~/.hawker/config.toml`.
///
/// **Security**: This struct NEVER stores API keys, tokens, or wallet
/// addresses. All credentials are read from environment variables at
/// runtime; config holds only the *names* of those variables.
/// See [`CredentialProvider`] for the env-var-based credential model.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub localization: LocalizationConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub marketing: MarketingConfig,
    #[serde(default)]
    pub intel: IntelConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load config from `~/.hawker/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            let text =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
            let cfg: Config =
                toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
            cfg.validate()?;
            Ok(cfg)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic validation for settings that are not fully expressible
    /// via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.daemon.validate()?;
        self.health.validate()?;
        self.pipeline.validate()?;
        self.localization.validate(&self.pipeline.default_locale)?;
        self.publish.validate()?;
        self.quality.validate()?;
        self.marketing.validate()?;
        Ok(())
    }

    /// Root of all on-disk state. `general.state_dir` when set (with a
    /// leading `~` expanded), otherwise `~/.hawker`.
    pub fn state_dir(&self) -> PathBuf {
        match &self.general.state_dir {
            Some(raw) => expand_home(raw),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".hawker"),
        }
    }

    /// Directory cycle reports are written into.
    pub fn reports_dir(&self) -> PathBuf {
        self.state_dir().join("reports")
    }

    /// Path of the continuously-replaced daemon status file.
    pub fn status_path(&self) -> PathBuf {
        self.state_dir().join("status.json")
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hawker")
            .join("config.toml")
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        return dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest);
    }
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    PathBuf::from(raw)
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    /// Override for the state directory. Defaults to `~/.hawker`.
    #[serde(default)]
    pub state_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds to sleep between successful cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    /// Consecutive failed-cycle retries before giving up until the next
    /// regular interval.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds to wait before retrying a failed cycle.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// A cycle with more than this many errors counts as failed.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            error_threshold: default_error_threshold(),
        }
    }
}

impl DaemonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_interval_secs == 0 || self.cycle_interval_secs > 604_800 {
            return Err(ConfigError::Validation(
                "daemon.cycle_interval_secs must be between 1 and 604800".to_string(),
            ));
        }
        if self.retry_delay_secs == 0 || self.retry_delay_secs > 86_400 {
            return Err(ConfigError::Validation(
                "daemon.retry_delay_secs must be between 1 and 86400".to_string(),
            ));
        }
        if self.max_retries == 0 || self.max_retries > 10 {
            return Err(ConfigError::Validation(
                "daemon.max_retries must be between 1 and 10".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cycle_interval_secs() -> u64 {
    3600
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    300
}
fn default_error_threshold() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_cpu_warn_percent")]
    pub cpu_warn_percent: f64,
    #[serde(default = "default_memory_warn_percent")]
    pub memory_warn_percent: f64,
    #[serde(default = "default_disk_warn_percent")]
    pub disk_warn_percent: f64,
    /// Cumulative error count at which health turns critical.
    #[serde(default = "default_error_critical_threshold")]
    pub error_critical_threshold: u64,
    /// URL probed to decide whether the network is reachable.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cpu_warn_percent: default_cpu_warn_percent(),
            memory_warn_percent: default_memory_warn_percent(),
            disk_warn_percent: default_disk_warn_percent(),
            error_critical_threshold: default_error_critical_threshold(),
            probe_url: default_probe_url(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("health.cpu_warn_percent", self.cpu_warn_percent),
            ("health.memory_warn_percent", self.memory_warn_percent),
            ("health.disk_warn_percent", self.disk_warn_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be between 0 and 100"
                )));
            }
        }
        if self.error_critical_threshold == 0 {
            return Err(ConfigError::Validation(
                "health.error_critical_threshold must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout_secs == 0 || self.probe_timeout_secs > 60 {
            return Err(ConfigError::Validation(
                "health.probe_timeout_secs must be between 1 and 60".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cpu_warn_percent() -> f64 {
    80.0
}
fn default_memory_warn_percent() -> f64 {
    80.0
}
fn default_disk_warn_percent() -> f64 {
    90.0
}
fn default_error_critical_threshold() -> u64 {
    10
}
fn default_probe_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_probe_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// List price used before any tier or market adjustment applies.
    #[serde(default = "default_base_price_usd")]
    pub base_price_usd: f64,
    /// Locale content is authored in.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// Concurrent publish requests during the multi-target phase.
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
    /// Timeout applied to every outbound capability request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_price_usd: default_base_price_usd(),
            default_locale: default_locale(),
            fanout_concurrency: default_fanout_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_price_usd <= 0.0 {
            return Err(ConfigError::Validation(
                "pipeline.base_price_usd must be positive".to_string(),
            ));
        }
        if self.default_locale.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pipeline.default_locale must not be empty".to_string(),
            ));
        }
        if self.fanout_concurrency == 0 || self.fanout_concurrency > 64 {
            return Err(ConfigError::Validation(
                "pipeline.fanout_concurrency must be between 1 and 64".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "pipeline.request_timeout_secs must be between 1 and 300".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_base_price_usd() -> f64 {
    49.0
}
fn default_locale() -> String {
    "en".to_string()
}
fn default_fanout_concurrency() -> usize {
    4
}
fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Env var holding the model API key. The key itself never lands in
    /// config.
    #[serde(default = "default_content_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_content_model")]
    pub model: String,
    #[serde(default = "default_content_base_url")]
    pub base_url: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: default_content_api_key_env(),
            model: default_content_model(),
            base_url: default_content_base_url(),
        }
    }
}

fn default_content_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_content_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_content_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Locales every listing is rendered in, source locale included.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locales: default_locales(),
        }
    }
}

impl LocalizationConfig {
    pub fn validate(&self, default_locale: &str) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.locales.is_empty() {
            return Err(ConfigError::Validation(
                "localization.locales must not be empty".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for locale in &self.locales {
            let locale = locale.trim();
            if locale.is_empty() {
                return Err(ConfigError::Validation(
                    "localization.locales entries must not be empty".to_string(),
                ));
            }
            if !seen.insert(locale.to_string()) {
                return Err(ConfigError::Validation(format!(
                    "localization.locales contains duplicate locale '{locale}'"
                )));
            }
        }
        if !seen.contains(default_locale.trim()) {
            return Err(ConfigError::Validation(format!(
                "localization.locales must include pipeline.default_locale '{default_locale}'"
            )));
        }
        Ok(())
    }
}

fn default_locales() -> Vec<String> {
    ["en", "es", "pt", "ja", "de"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Sales targets to fan out to. An empty list degrades the publish
    /// phase to its demo fallback.
    #[serde(default = "default_publish_targets")]
    pub targets: Vec<PublishTargetConfig>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            targets: default_publish_targets(),
        }
    }
}

impl PublishConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for target in &self.targets {
            let name = target.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Validation(
                    "publish.targets entries must have non-empty name".to_string(),
                ));
            }
            if !names.insert(name.to_string()) {
                return Err(ConfigError::Validation(format!(
                    "publish.targets contains duplicate target '{name}'"
                )));
            }
            if target.api_key_env.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "publish.targets target '{name}' must name an api_key_env"
                )));
            }
            if target.daily_cap == 0 {
                return Err(ConfigError::Validation(format!(
                    "publish.targets target '{name}' daily_cap must be at least 1"
                )));
            }
        }
        Ok(())
    }
}

/// One sales target. `base_url` overrides the built-in endpoint for the
/// named platform, which is how tests point publishers at a local server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishTargetConfig {
    pub name: String,
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,
}

fn default_daily_cap() -> u32 {
    10
}

fn default_publish_targets() -> Vec<PublishTargetConfig> {
    vec![
        PublishTargetConfig {
            name: "gumroad".to_string(),
            api_key_env: "GUMROAD_API_KEY".to_string(),
            base_url: None,
            daily_cap: 10,
        },
        PublishTargetConfig {
            name: "lemonsqueezy".to_string(),
            api_key_env: "LEMON_SQUEEZY_API_KEY".to_string(),
            base_url: None,
            daily_cap: 10,
        },
        PublishTargetConfig {
            name: "etsy".to_string(),
            api_key_env: "ETSY_API_KEY".to_string(),
            base_url: None,
            daily_cap: 5,
        },
        PublishTargetConfig {
            name: "payhip".to_string(),
            api_key_env: "PAYHIP_API_KEY".to_string(),
            base_url: None,
            daily_cap: 10,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Risk ceiling. Listings scoring above it are called out at warn
    /// level in the cycle log; publication still proceeds.
    #[serde(default = "default_max_risk_score")]
    pub max_risk_score: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_risk_score: default_max_risk_score(),
        }
    }
}

impl QualityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.max_risk_score) {
            return Err(ConfigError::Validation(
                "quality.max_risk_score must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_risk_score() -> f64 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Env var holding the Telegram bot token.
    #[serde(default = "default_telegram_token_env")]
    pub telegram_token_env: String,
    /// Env var holding the Telegram chat id posts go to.
    #[serde(default = "default_telegram_chat_id_env")]
    pub telegram_chat_id_env: String,
    /// Env var holding the Discord webhook URL.
    #[serde(default = "default_discord_webhook_env")]
    pub discord_webhook_env: String,
}

impl Default for MarketingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: default_channels(),
            telegram_token_env: default_telegram_token_env(),
            telegram_chat_id_env: default_telegram_chat_id_env(),
            discord_webhook_env: default_discord_webhook_env(),
        }
    }
}

impl MarketingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for raw in &self.channels {
            let Some(channel) = Channel::parse(raw) else {
                return Err(ConfigError::Validation(format!(
                    "marketing.channels contains unknown channel '{raw}'"
                )));
            };
            if !seen.insert(channel) {
                return Err(ConfigError::Validation(format!(
                    "marketing.channels contains duplicate channel '{channel}'"
                )));
            }
        }
        Ok(())
    }

    /// Channels as parsed enum values, in config order.
    pub fn parsed_channels(&self) -> Vec<Channel> {
        self.channels.iter().filter_map(|c| Channel::parse(c)).collect()
    }
}

fn default_channels() -> Vec<String> {
    ["tiktok", "youtube", "telegram", "discord", "email"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_telegram_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}
fn default_telegram_chat_id_env() -> String {
    "TELEGRAM_CHAT_ID".to_string()
}
fn default_discord_webhook_env() -> String {
    "DISCORD_WEBHOOK_URL".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// CredentialProvider
// ---------------------------------------------------------------------------

/// Runtime credential lookup. Every secret the pipeline touches comes
/// through here, never through [`Config`].
pub struct CredentialProvider;

impl CredentialProvider {
    /// Read a credential from a named env var. Unset and whitespace-only
    /// values both count as absent.
    pub fn from_env(var_name: &str) -> Option<String> {
        std::env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
