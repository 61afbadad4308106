//! Scenario configuration
//!
//! Resolved once at process start and handed to every lifecycle by
//! reference. Precedence: environment, then `config/test-config.json`,
//! then the defaults below. The CLI applies its own flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::{BrowserKind, LaunchOptions, Viewport};

pub const DEFAULT_BASE_URL: &str = "https://practicesoftwaretesting.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.practicesoftwaretesting.com";
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CONFIG_PATH: &str = "config/test-config.json";

/// Configuration consumed by the scenario lifecycle
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Base address of the web application under test
    pub base_url: String,

    /// Base address of the REST API under test
    pub api_base_url: String,

    /// Launch the browser without a window
    pub headless: bool,

    /// Per-step timeout enforced by the runner
    pub step_timeout_ms: u64,

    /// Request timeout for the HTTP session
    pub http_timeout_ms: u64,

    /// Browser engine driven by Playwright
    pub browser: BrowserKind,

    /// Viewport of the scenario's browsing context
    pub viewport: Viewport,

    /// Directory whose `node_modules` provides `playwright`
    pub node_project_dir: PathBuf,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            headless: true,
            step_timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            browser: BrowserKind::default(),
            viewport: Viewport::default(),
            node_project_dir: PathBuf::from("."),
        }
    }
}

/// On-disk project configuration, all keys optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "BASE_URL", default)]
    pub base_url: Option<String>,

    #[serde(rename = "API_BASE_URL", default)]
    pub api_base_url: Option<String>,

    #[serde(rename = "HEADLESS", default)]
    pub headless: Option<Value>,

    #[serde(rename = "STEP_TIMEOUT_MS", default)]
    pub step_timeout_ms: Option<Value>,

    #[serde(rename = "BROWSER", default)]
    pub browser: Option<String>,
}

impl ConfigFile {
    /// Read the config file; a missing or malformed file yields an empty config.
    pub fn read(path: &Path) -> Self {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Self::default();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(file) => file,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl TestConfig {
    /// Load from the given config file (or the default path) and the process environment
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        Self::resolve(ConfigFile::read(path), |key| std::env::var(key).ok())
    }

    /// Merge a config file with an environment lookup
    pub fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_url = env("BASE_URL")
            .or(file.base_url)
            .unwrap_or(defaults.base_url);

        let api_base_url = env("API_BASE_URL")
            .or(file.api_base_url)
            .unwrap_or(defaults.api_base_url);

        let headless = parse_bool(
            env("HEADLESS").or_else(|| file.headless.as_ref().and_then(scalar)).as_deref(),
            defaults.headless,
        );

        let step_timeout_ms = env("STEP_TIMEOUT_MS")
            .or_else(|| file.step_timeout_ms.as_ref().and_then(scalar))
            .and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Some(ms),
                _ => {
                    warn!("Ignoring invalid STEP_TIMEOUT_MS '{}'", raw);
                    None
                }
            })
            .unwrap_or(defaults.step_timeout_ms);

        let browser = env("BROWSER")
            .or(file.browser)
            .and_then(|name| match name.parse::<BrowserKind>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            })
            .unwrap_or(defaults.browser);

        Self {
            base_url,
            api_base_url,
            headless,
            step_timeout_ms,
            browser,
            ..defaults
        }
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            browser: self.browser,
            headless: self.headless,
            viewport: self.viewport,
        }
    }
}

/// Lenient boolean parsing; anything unrecognized falls back to `default`.
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "false" | "0" | "no" | "off" => false,
        "true" | "1" | "yes" | "on" => true,
        _ => default,
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
