//! Playwright browser automation
//!
//! Every scenario gets its own `node` process running the bundled bridge
//! script. The bridge owns exactly one Playwright browser and answers
//! newline-delimited JSON requests on stdin/stdout, so the Rust side keeps
//! real browser, context and page handles alive across steps.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::browser::{
    BrowserLauncher, BrowserProcess, BrowsingContext, LaunchOptions, Page, PageHandle, Viewport,
};
use crate::config::TestConfig;
use crate::error::{E2eError, E2eResult};

const BRIDGE_SCRIPT: &str = include_str!("playwright_bridge.js");

/// Configuration for the Playwright bridge
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// `node` executable
    pub node_binary: PathBuf,

    /// Working directory; its `node_modules` must contain `playwright`
    pub project_dir: PathBuf,

    /// Upper bound for a single bridge call
    pub call_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            project_dir: PathBuf::from("."),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl PlaywrightConfig {
    pub fn from_test_config(config: &TestConfig) -> Self {
        Self {
            project_dir: config.node_project_dir.clone(),
            // Individual steps are bounded by the runner; leave headroom for slow navigations.
            call_timeout: config.step_timeout().max(Duration::from_secs(10)),
            ..Default::default()
        }
    }
}

/// Launches one Playwright bridge per browser process
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed(&self) -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&self.config.project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self, options: &LaunchOptions) -> E2eResult<Box<dyn BrowserProcess>> {
        self.check_playwright_installed().await?;

        let bridge = Arc::new(Bridge::spawn(&self.config).await?);
        let launched = bridge
            .call(
                "browser.launch",
                json!({ "browser": options.browser.as_str(), "headless": options.headless }),
            )
            .await;

        match launched {
            Ok(reply) => {
                info!(
                    "Launched {} {} (headless: {})",
                    options.browser,
                    reply["version"].as_str().unwrap_or("unknown"),
                    options.headless
                );
            }
            Err(e) => {
                if let Err(kill_err) = bridge.shutdown().await {
                    warn!("Failed to stop Playwright bridge: {}", kill_err);
                }
                return Err(e);
            }
        }

        Ok(Box::new(PlaywrightBrowser {
            bridge,
            viewport: options.viewport,
            closed: AtomicBool::new(false),
        }))
    }
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// The `node` process hosting Playwright
struct Bridge {
    child: Mutex<Child>,
    // Whole request lines; the writer task owns stdin.
    requests: mpsc::UnboundedSender<String>,
    replies: Mutex<Lines<BufReader<ChildStdout>>>,
    next_id: AtomicU64,
    call_timeout: Duration,
    // Holds the bridge script on disk for the lifetime of the process.
    _script_dir: tempfile::TempDir,
}

impl Bridge {
    async fn spawn(config: &PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        tokio::fs::write(&script_path, BRIDGE_SCRIPT).await?;

        let mut child = Command::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "Failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        debug!("Playwright bridge started (pid: {:?})", child.id());

        let (requests, queue) = mpsc::unbounded_channel();
        tokio::spawn(write_requests(stdin, queue));

        Ok(Self {
            child: Mutex::new(child),
            requests,
            replies: Mutex::new(BufReader::new(stdout).lines()),
            next_id: AtomicU64::new(1),
            call_timeout: config.call_timeout,
            _script_dir: script_dir,
        })
    }

    async fn call(&self, method: &str, params: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&BridgeRequest { id, method, params })?;
        line.push('\n');

        let mut replies = self.replies.lock().await;
        debug!("bridge -> #{} {}", id, method);
        self.requests
            .send(line)
            .map_err(|_| E2eError::Playwright("bridge stdin closed".to_string()))?;

        let reply = tokio::time::timeout(self.call_timeout, read_reply(&mut replies, id))
            .await
            .map_err(|_| E2eError::Timeout(format!("Playwright {}", method)))??;

        if reply.ok {
            Ok(reply.result)
        } else {
            Err(E2eError::Playwright(format!(
                "{}: {}",
                method,
                reply.error.unwrap_or_else(|| "unknown error".to_string())
            )))
        }
    }

    async fn shutdown(&self) -> E2eResult<()> {
        let mut child = self.child.lock().await;
        if child.try_wait()?.is_none() {
            child.kill().await?;
        }
        debug!("Playwright bridge stopped");
        Ok(())
    }
}

/// Drains queued request lines into the bridge's stdin.
///
/// Callers only enqueue complete lines, so dropping a call mid-flight never
/// leaves a partial request for the next one to be appended to.
async fn write_requests<W>(mut stdin: W, mut queue: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = queue.recv().await {
        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Playwright bridge stdin closed: {}", e);
            break;
        }
    }
}

async fn read_reply(stdout: &mut Lines<BufReader<ChildStdout>>, id: u64) -> E2eResult<BridgeReply> {
    while let Some(line) = stdout.next_line().await? {
        match serde_json::from_str::<BridgeReply>(&line) {
            Ok(reply) if reply.id == id => return Ok(reply),
            Ok(reply) => debug!("Discarding stale bridge reply #{}", reply.id),
            Err(_) => debug!("bridge: {}", line),
        }
    }
    Err(E2eError::Playwright("bridge process exited".to_string()))
}

fn reply_id(reply: &Value, what: &str) -> E2eResult<String> {
    reply["id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| E2eError::Playwright(format!("{} reply carried no id", what)))
}

pub struct PlaywrightBrowser {
    bridge: Arc<Bridge>,
    viewport: Viewport,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserProcess for PlaywrightBrowser {
    async fn new_context(&self) -> E2eResult<Box<dyn BrowsingContext>> {
        if !self.is_running() {
            return Err(E2eError::ResourceClosed("browser process"));
        }

        let reply = self
            .bridge
            .call(
                "browser.newContext",
                json!({ "viewport": { "width": self.viewport.width, "height": self.viewport.height } }),
            )
            .await?;

        Ok(Box::new(PlaywrightContext {
            bridge: Arc::clone(&self.bridge),
            id: reply_id(&reply, "browser.newContext")?,
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> E2eResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let graceful = self.bridge.call("browser.close", json!({})).await;
        let stopped = self.bridge.shutdown().await;
        graceful.and(stopped)
    }

    fn is_running(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

pub struct PlaywrightContext {
    bridge: Arc<Bridge>,
    id: String,
    closed: AtomicBool,
}

#[async_trait]
impl BrowsingContext for PlaywrightContext {
    async fn new_page(&self) -> E2eResult<PageHandle> {
        if self.is_closed() {
            return Err(E2eError::ResourceClosed("browsing context"));
        }

        let reply = self
            .bridge
            .call("context.newPage", json!({ "context": self.id }))
            .await?;

        Ok(Arc::new(PlaywrightPage {
            bridge: Arc::clone(&self.bridge),
            id: reply_id(&reply, "context.newPage")?,
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> E2eResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.bridge
            .call("context.close", json!({ "context": self.id }))
            .await
            .map(drop)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct PlaywrightPage {
    bridge: Arc<Bridge>,
    id: String,
    closed: AtomicBool,
}

impl PlaywrightPage {
    async fn call(&self, method: &str, mut params: Value) -> E2eResult<Value> {
        if self.is_closed() {
            return Err(E2eError::ResourceClosed("page"));
        }
        if let Value::Object(map) = &mut params {
            map.insert("page".to_string(), Value::String(self.id.clone()));
        }
        self.bridge.call(method, params).await
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.call("page.goto", json!({ "url": url })).await.map(drop)
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.call("page.click", json!({ "selector": selector }))
            .await
            .map(drop)
    }

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.call("page.fill", json!({ "selector": selector, "value": value }))
            .await
            .map(drop)
    }

    async fn press(&self, selector: &str, key: &str) -> E2eResult<()> {
        self.call("page.press", json!({ "selector": selector, "key": key }))
            .await
            .map(drop)
    }

    async fn text_content(&self, selector: &str) -> E2eResult<Option<String>> {
        let reply = self
            .call("page.textContent", json!({ "selector": selector }))
            .await?;
        Ok(reply.as_str().map(str::to_string))
    }

    async fn all_text_contents(&self, selector: &str) -> E2eResult<Vec<String>> {
        let reply = self
            .call("page.allTextContents", json!({ "selector": selector }))
            .await?;
        Ok(serde_json::from_value(reply)?)
    }

    async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        let reply = self
            .call("page.isVisible", json!({ "selector": selector }))
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    async fn count(&self, selector: &str) -> E2eResult<usize> {
        let reply = self.call("page.count", json!({ "selector": selector })).await?;
        Ok(reply.as_u64().unwrap_or(0) as usize)
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.call(
            "page.waitFor",
            json!({ "selector": selector, "timeout": timeout.as_millis() as u64 }),
        )
        .await
        .map(drop)
    }

    async fn url(&self) -> E2eResult<String> {
        let reply = self.call("page.url", json!({})).await?;
        Ok(reply.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&self, full_page: bool) -> E2eResult<Vec<u8>> {
        let reply = self
            .call("page.screenshot", json!({ "fullPage": full_page }))
            .await?;
        let encoded = reply
            .as_str()
            .ok_or_else(|| E2eError::Playwright("page.screenshot returned no data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| E2eError::Playwright(format!("invalid screenshot payload: {}", e)))
    }

    async fn close(&self) -> E2eResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.bridge
            .call("page.close", json!({ "page": self.id }))
            .await
            .map(drop)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
