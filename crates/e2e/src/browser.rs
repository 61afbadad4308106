//! Browser driver seam
//!
//! The lifecycle only talks to these traits. `playwright` provides the real
//! implementation; tests plug in an in-memory driver.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// Shared handle to the scenario's single page
pub type PageHandle = Arc<dyn Page>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(format!("Unknown browser '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Options for launching the scenario's browser process
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport: Viewport,
}

/// Starts browser processes
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> E2eResult<Box<dyn BrowserProcess>>;
}

/// One OS-level browser process
#[async_trait]
pub trait BrowserProcess: Send + Sync {
    /// Create an isolated cookie/storage sandbox
    async fn new_context(&self) -> E2eResult<Box<dyn BrowsingContext>>;

    /// Terminate the process
    async fn close(&self) -> E2eResult<()>;

    fn is_running(&self) -> bool;
}

/// An isolated browsing context inside a browser process
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    async fn new_page(&self) -> E2eResult<PageHandle>;

    async fn close(&self) -> E2eResult<()>;

    fn is_closed(&self) -> bool;
}

/// A navigable surface. Selectors use Playwright selector syntax.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn click(&self, selector: &str) -> E2eResult<()>;

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()>;

    async fn press(&self, selector: &str, key: &str) -> E2eResult<()>;

    /// Text of the first matching element, `None` when it has no text node
    async fn text_content(&self, selector: &str) -> E2eResult<Option<String>>;

    /// Text of every matching element
    async fn all_text_contents(&self, selector: &str) -> E2eResult<Vec<String>>;

    async fn is_visible(&self, selector: &str) -> E2eResult<bool>;

    async fn count(&self, selector: &str) -> E2eResult<usize>;

    /// Wait until the first matching element is visible
    async fn wait_for(&self, selector: &str, timeout: Duration) -> E2eResult<()>;

    async fn url(&self) -> E2eResult<String>;

    /// PNG bytes of the current viewport, or the whole page when `full_page`
    async fn screenshot(&self, full_page: bool) -> E2eResult<Vec<u8>>;

    async fn close(&self) -> E2eResult<()>;

    fn is_closed(&self) -> bool;
}
