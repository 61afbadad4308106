//! Scenario lifecycle
//!
//! Owns the four session resources of one scenario: browser process,
//! browsing context, page and HTTP session. Set-up acquires all four or
//! none; teardown releases them in reverse order and always runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::browser::{BrowserLauncher, BrowserProcess, BrowsingContext, PageHandle};
use crate::config::TestConfig;
use crate::diagnostics::{Attachment, AttachmentSink};
use crate::error::{E2eError, E2eResult};
use crate::http::HttpSession;
use crate::registry::{EntityRegistry, ResetScope, SessionBindings};
use crate::state::ScenarioState;
use crate::world::World;

const DIAGNOSTIC_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ScenarioLifecycle {
    config: Arc<TestConfig>,
    launcher: Arc<dyn BrowserLauncher>,
    browser: Option<Box<dyn BrowserProcess>>,
    context: Option<Box<dyn BrowsingContext>>,
    page: Option<PageHandle>,
    http: Option<Arc<HttpSession>>,
    world: Option<World>,
    /// State outside an active scenario; moved into the world at set-up
    retained_state: ScenarioState,
    diagnostic_timeout: Duration,
}

impl ScenarioLifecycle {
    pub fn new(config: Arc<TestConfig>, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config,
            launcher,
            browser: None,
            context: None,
            page: None,
            http: None,
            world: None,
            retained_state: ScenarioState::new(),
            diagnostic_timeout: DIAGNOSTIC_TIMEOUT,
        }
    }

    /// Bound on each diagnostic capture in `on_step_failure`
    pub fn with_diagnostic_timeout(mut self, limit: Duration) -> Self {
        self.diagnostic_timeout = limit;
        self
    }

    pub fn config(&self) -> &Arc<TestConfig> {
        &self.config
    }

    /// Acquire the session resources, build the entity registry and clear
    /// scenario state. On failure every resource acquired so far is released
    /// before the initialization error is returned.
    pub async fn set_up(&mut self) -> E2eResult<()> {
        if self.is_active() {
            warn!("Scenario set up twice; tearing down the previous one");
            self.tear_down().await?;
        }

        if let Err(e) = self.acquire().await {
            warn!("Scenario set-up failed: {}", e);
            if let Err(release) = self.release().await {
                warn!("Releasing partially acquired resources: {}", release);
            }
            return Err(e);
        }

        let bindings = SessionBindings {
            page: self.page.clone(),
            http: self.http.clone(),
            base_url: self.config.base_url.clone(),
        };
        let mut state = std::mem::take(&mut self.retained_state);
        state.clear();

        self.world = Some(World {
            entities: EntityRegistry::new(bindings),
            state,
            config: Arc::clone(&self.config),
        });
        info!(
            "Scenario ready ({}, headless={})",
            self.config.browser, self.config.headless
        );
        Ok(())
    }

    async fn acquire(&mut self) -> E2eResult<()> {
        let options = self.config.launch_options();

        let browser = self
            .launcher
            .launch(&options)
            .await
            .map_err(initialization("browser process"))?;
        let browser = self.browser.insert(browser);
        debug!("Browser process launched");

        let context = browser
            .new_context()
            .await
            .map_err(initialization("browsing context"))?;
        let context = self.context.insert(context);
        debug!("Browsing context created");

        let page = context.new_page().await.map_err(initialization("page"))?;
        self.page = Some(page);
        debug!("Page opened");

        let http = HttpSession::open(&self.config.api_base_url, self.config.http_timeout())
            .map_err(initialization("HTTP session"))?;
        self.http = Some(Arc::new(http));
        debug!("HTTP session opened against {}", self.config.api_base_url);

        Ok(())
    }

    /// Release page, context, process, then dispose the HTTP session.
    /// Every resource is attempted; failures are reported together.
    async fn release(&mut self) -> E2eResult<()> {
        let mut failures = Vec::new();

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                failures.push(format!("page: {}", e));
            }
        }
        if let Some(context) = self.context.take() {
            if let Err(e) = context.close().await {
                failures.push(format!("browsing context: {}", e));
            }
        }
        if let Some(browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                failures.push(format!("browser process: {}", e));
            }
        }
        if let Some(http) = self.http.take() {
            if let Err(e) = http.dispose() {
                failures.push(format!("HTTP session: {}", e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(E2eError::Teardown(failures))
        }
    }

    /// Release every session resource. Safe to call after a partial set-up
    /// and more than once.
    pub async fn tear_down(&mut self) -> E2eResult<()> {
        if let Some(world) = self.world.take() {
            world.entities.reset(ResetScope::All);
            self.retained_state = world.state;
        }

        let result = self.release().await;
        match &result {
            Ok(()) => info!("Scenario resources released"),
            Err(e) => warn!("{}", e),
        }
        result
    }

    /// Attach a screenshot and the current URL when the page is alive, then
    /// the failed step text. Capture problems are logged, never returned.
    pub async fn on_step_failure(&self, step: &str, sink: &mut dyn AttachmentSink) {
        if let Some(page) = self.page.as_ref().filter(|page| !page.is_closed()) {
            match timeout(self.diagnostic_timeout, page.screenshot(true)).await {
                Ok(Ok(bytes)) => sink.attach(Attachment::png(step, bytes)),
                Ok(Err(e)) => warn!("Screenshot for failed step '{}' not captured: {}", step, e),
                Err(_) => warn!("Screenshot for failed step '{}' timed out", step),
            }

            match timeout(self.diagnostic_timeout, page.url()).await {
                Ok(Ok(url)) => sink.attach(Attachment::text(step, format!("Current URL: {}", url))),
                Ok(Err(e)) => warn!("Current URL for failed step '{}' not captured: {}", step, e),
                Err(_) => warn!("Current URL for failed step '{}' timed out", step),
            }
        }

        sink.attach(Attachment::text(step, format!("Failed step: {}", step)));
    }

    pub fn is_active(&self) -> bool {
        self.world.is_some()
    }

    pub fn world(&self) -> E2eResult<&World> {
        self.world.as_ref().ok_or(E2eError::ScenarioNotActive)
    }

    pub fn world_mut(&mut self) -> E2eResult<&mut World> {
        self.world.as_mut().ok_or(E2eError::ScenarioNotActive)
    }

    /// Scenario state, whether or not a scenario is active
    pub fn state(&self) -> &ScenarioState {
        match &self.world {
            Some(world) => &world.state,
            None => &self.retained_state,
        }
    }

    pub fn page(&self) -> Option<&PageHandle> {
        self.page.as_ref()
    }

    pub fn http_session(&self) -> Option<&Arc<HttpSession>> {
        self.http.as_ref()
    }
}

impl Drop for ScenarioLifecycle {
    fn drop(&mut self) {
        if self.browser.is_some() || self.http.is_some() {
            warn!("Scenario dropped without teardown; handles release on drop");
        }
    }
}

/// Wrap an acquisition error as an initialization failure of `resource`
fn initialization(resource: &'static str) -> impl FnOnce(E2eError) -> E2eError {
    move |err| match err {
        err @ E2eError::Initialization { .. } => err,
        other => E2eError::Initialization {
            resource,
            reason: other.to_string(),
        },
    }
}
