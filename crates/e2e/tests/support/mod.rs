//! In-memory browser driver for lifecycle and runner tests
//!
//! Every acquisition and release is appended to a shared journal so tests can
//! assert ordering and exactly-once release.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use toolshop_e2e::browser::{
    BrowserLauncher, BrowserProcess, BrowsingContext, LaunchOptions, Page, PageHandle,
};
use toolshop_e2e::config::TestConfig;
use toolshop_e2e::{E2eError, E2eResult};

pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Acquisition step that should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Launch,
    Context,
    Page,
}

#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().iter().position(|e| e == event)
    }
}

#[derive(Default)]
struct Knobs {
    fail_at: Option<FailAt>,
    fail_close: HashSet<&'static str>,
    fail_screenshot: bool,
    texts: HashMap<String, Vec<String>>,
}

/// Launcher handing out fake browsers; keeps every handle for inspection
#[derive(Default)]
pub struct FakeLauncher {
    pub journal: Arc<Journal>,
    knobs: Arc<Mutex<Knobs>>,
    browsers: Mutex<Vec<Arc<FakeBrowser>>>,
    last_options: Mutex<Option<LaunchOptions>>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_at(fail_at: FailAt) -> Arc<Self> {
        let launcher = Self::default();
        launcher.knobs.lock().fail_at = Some(fail_at);
        Arc::new(launcher)
    }

    /// Make `close()` fail for "page", "context" or "browser"
    pub fn fail_close(&self, resource: &'static str) {
        self.knobs.lock().fail_close.insert(resource);
    }

    pub fn fail_screenshot(&self) {
        self.knobs.lock().fail_screenshot = true;
    }

    /// Text every new page reports for `selector`
    pub fn set_texts(&self, selector: &str, texts: &[&str]) {
        self.knobs.lock().texts.insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
    }

    pub fn browsers(&self) -> Vec<Arc<FakeBrowser>> {
        self.browsers.lock().clone()
    }

    pub fn last_options(&self) -> Option<LaunchOptions> {
        *self.last_options.lock()
    }

    pub fn last_browser(&self) -> Arc<FakeBrowser> {
        self.browsers().last().cloned().expect("no browser launched")
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> E2eResult<Box<dyn BrowserProcess>> {
        if self.knobs.lock().fail_at == Some(FailAt::Launch) {
            return Err(E2eError::Playwright("browser executable missing".to_string()));
        }
        self.journal.record("launch");
        *self.last_options.lock() = Some(*options);
        let browser = Arc::new(FakeBrowser {
            journal: Arc::clone(&self.journal),
            knobs: Arc::clone(&self.knobs),
            running: AtomicBool::new(true),
            contexts: Mutex::new(Vec::new()),
        });
        self.browsers.lock().push(Arc::clone(&browser));
        Ok(Box::new(BrowserHandle(browser)))
    }
}

pub struct FakeBrowser {
    journal: Arc<Journal>,
    knobs: Arc<Mutex<Knobs>>,
    running: AtomicBool,
    contexts: Mutex<Vec<Arc<FakeContext>>>,
}

impl FakeBrowser {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<Arc<FakeContext>> {
        self.contexts.lock().clone()
    }

    pub fn page(&self) -> Arc<FakePage> {
        self.contexts()
            .first()
            .and_then(|c| c.pages().first().cloned())
            .expect("no page opened")
    }
}

struct BrowserHandle(Arc<FakeBrowser>);

#[async_trait]
impl BrowserProcess for BrowserHandle {
    async fn new_context(&self) -> E2eResult<Box<dyn BrowsingContext>> {
        let browser = &self.0;
        if !browser.is_running() {
            return Err(E2eError::ResourceClosed("Browser"));
        }
        if browser.knobs.lock().fail_at == Some(FailAt::Context) {
            return Err(E2eError::Playwright("context refused".to_string()));
        }
        browser.journal.record("new_context");
        let context = Arc::new(FakeContext {
            journal: Arc::clone(&browser.journal),
            knobs: Arc::clone(&browser.knobs),
            closed: AtomicBool::new(false),
            pages: Mutex::new(Vec::new()),
        });
        browser.contexts.lock().push(Arc::clone(&context));
        Ok(Box::new(ContextHandle(context)))
    }

    async fn close(&self) -> E2eResult<()> {
        let browser = &self.0;
        if !browser.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        browser.journal.record("close browser");
        if browser.knobs.lock().fail_close.contains("browser") {
            return Err(E2eError::Playwright("browser did not exit".to_string()));
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.0.is_running()
    }
}

pub struct FakeContext {
    journal: Arc<Journal>,
    knobs: Arc<Mutex<Knobs>>,
    closed: AtomicBool,
    pages: Mutex<Vec<Arc<FakePage>>>,
}

impl FakeContext {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> Vec<Arc<FakePage>> {
        self.pages.lock().clone()
    }
}

struct ContextHandle(Arc<FakeContext>);

#[async_trait]
impl BrowsingContext for ContextHandle {
    async fn new_page(&self) -> E2eResult<PageHandle> {
        let context = &self.0;
        if context.is_closed() {
            return Err(E2eError::ResourceClosed("Browser context"));
        }
        let knobs = context.knobs.lock();
        if knobs.fail_at == Some(FailAt::Page) {
            return Err(E2eError::Playwright("page crashed".to_string()));
        }
        context.journal.record("new_page");
        let page = Arc::new(FakePage {
            journal: Arc::clone(&context.journal),
            closed: AtomicBool::new(false),
            url: Mutex::new("about:blank".to_string()),
            texts: knobs.texts.clone(),
            fail_screenshot: knobs.fail_screenshot,
            fail_close: knobs.fail_close.contains("page"),
            clicks: Mutex::new(Vec::new()),
        });
        context.pages.lock().push(Arc::clone(&page));
        Ok(page)
    }

    async fn close(&self) -> E2eResult<()> {
        let context = &self.0;
        if context.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        context.journal.record("close context");
        if context.knobs.lock().fail_close.contains("context") {
            return Err(E2eError::Playwright("context close failed".to_string()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

pub struct FakePage {
    journal: Arc<Journal>,
    closed: AtomicBool,
    url: Mutex<String>,
    texts: HashMap<String, Vec<String>>,
    fail_screenshot: bool,
    fail_close: bool,
    clicks: Mutex<Vec<String>>,
}

impl FakePage {
    fn ensure_open(&self) -> E2eResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(E2eError::ResourceClosed("Page"))
        } else {
            Ok(())
        }
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().clone()
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.ensure_open()?;
        *self.url.lock() = url.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.ensure_open()?;
        self.clicks.lock().push(selector.to_string());
        Ok(())
    }

    async fn fill(&self, _selector: &str, _value: &str) -> E2eResult<()> {
        self.ensure_open()
    }

    async fn press(&self, _selector: &str, _key: &str) -> E2eResult<()> {
        self.ensure_open()
    }

    async fn text_content(&self, selector: &str) -> E2eResult<Option<String>> {
        self.ensure_open()?;
        Ok(self.texts.get(selector).and_then(|t| t.first().cloned()))
    }

    async fn all_text_contents(&self, selector: &str) -> E2eResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        self.ensure_open()?;
        Ok(self.texts.contains_key(selector))
    }

    async fn count(&self, selector: &str) -> E2eResult<usize> {
        self.ensure_open()?;
        Ok(self.texts.get(selector).map(Vec::len).unwrap_or(0))
    }

    async fn wait_for(&self, _selector: &str, _timeout: Duration) -> E2eResult<()> {
        self.ensure_open()
    }

    async fn url(&self) -> E2eResult<String> {
        self.ensure_open()?;
        Ok(self.url.lock().clone())
    }

    async fn screenshot(&self, full_page: bool) -> E2eResult<Vec<u8>> {
        self.ensure_open()?;
        if self.fail_screenshot {
            return Err(E2eError::Playwright("screenshot failed".to_string()));
        }
        self.journal.record(format!("screenshot full_page={}", full_page));
        Ok(FAKE_PNG.to_vec())
    }

    async fn close(&self) -> E2eResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.journal.record("close page");
        if self.fail_close {
            return Err(E2eError::Playwright("page close failed".to_string()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Config pointing at hosts that are never contacted
pub fn test_config() -> Arc<TestConfig> {
    Arc::new(TestConfig {
        base_url: "https://toolshop.test".to_string(),
        api_base_url: "https://api.toolshop.test".to_string(),
        step_timeout_ms: 2_000,
        ..TestConfig::default()
    })
}
