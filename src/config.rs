use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fields::FieldAliases;

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub aliases: FieldAliases,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TargetConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,
    #[serde(default = "default_scenario_timeout")]
    pub scenario_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub driver: DriverKind,
    /// Chrome/Chromium binary; looked up on `PATH` when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

/// How pages are loaded for the UI scenarios.
#[derive(Deserialize, ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Headless Chrome; client-side scripts run
    #[default]
    Browser,
    /// Plain GET of the server-rendered markup
    Http,
}

#[derive(Deserialize, Clone, Debug)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ScanConfig {
    /// Case-insensitive substring a lot name must contain.
    #[serde(default = "default_keyword")]
    pub keyword: String,
    /// Tried in order; the first 2xx response wins.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default = "default_accepted_statuses")]
    pub accepted_statuses: Vec<u16>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct WaitConfig {
    /// Upper bound for condition polling after navigation or a click.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Locator strings, see `page::locator` for the accepted syntax.
#[derive(Deserialize, Clone, Debug)]
pub struct SelectorConfig {
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,
    #[serde(default = "default_details_link")]
    pub details_link: String,
    /// Defaults to `text=<scan.keyword>`.
    #[serde(default)]
    pub keyword_text: Option<String>,
    #[serde(default = "default_report_links")]
    pub report_links: String,
}

fn default_base_url() -> String {
    "https://jornallicitante.vercel.app".to_string()
}
fn default_request_timeout() -> u64 {
    15
}
fn default_action_timeout() -> u64 {
    10_000
}
fn default_scenario_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    "editais-e2e/0.1 (verification suite)".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("playwright")
}
fn default_keyword() -> String {
    "calculadora".to_string()
}
fn default_endpoints() -> Vec<String> {
    ["/api/editais", "/api/edital", "/api/publicacoes", "/api/licitacoes", "/api"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_root_path() -> String {
    "/api".to_string()
}
fn default_accepted_statuses() -> Vec<u16> {
    vec![200, 204, 301, 302, 404]
}
fn default_settle_ms() -> u64 {
    1500
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_candidates() -> Vec<String> {
    [
        "article",
        ".card",
        ".edital",
        r#"[data-testid="edital"]"#,
        r#"div:has-text("Edital")"#,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_details_link() -> String {
    r#"a:has-text("Detalhes"), a:has-text("Ver edital")"#.to_string()
}
fn default_report_links() -> String {
    r#"a:has-text("Relatório"), a:has-text("relatorios"), a:has-text("relatórios"), .reports a"#
        .to_string()
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            action_timeout_ms: default_action_timeout(),
            scenario_timeout_secs: default_scenario_timeout(),
            user_agent: default_user_agent(),
            driver: DriverKind::default(),
            chrome_path: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            endpoints: default_endpoints(),
            root_path: default_root_path(),
            accepted_statuses: default_accepted_statuses(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            details_link: default_details_link(),
            keyword_text: None,
            report_links: default_report_links(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to built-in defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Applies `EDITAIS_BASE_URL` / `EDITAIS_OUTPUT_DIR` when set and non-empty.
    pub fn apply_env(&mut self) {
        if let Some(url) = std::env::var("EDITAIS_BASE_URL").ok().filter(|s| !s.is_empty()) {
            self.target.base_url = url;
        }
        if let Some(dir) = std::env::var("EDITAIS_OUTPUT_DIR").ok().filter(|s| !s.is_empty()) {
            self.output.dir = PathBuf::from(dir);
        }
    }

    /// Locator for keyword texts on the page; follows `scan.keyword` unless
    /// set explicitly.
    pub fn keyword_locator(&self) -> String {
        match &self.selectors.keyword_text {
            Some(locator) => locator.clone(),
            None => format!("text={}", self.scan.keyword),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.target.request_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.target.action_timeout_ms)
    }

    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_secs(self.target.scenario_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.wait.settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait.poll_interval_ms)
    }
}
