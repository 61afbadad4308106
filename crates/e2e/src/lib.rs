//! Toolshop E2E scenario execution core
//!
//! This crate runs behavior scenarios against the Toolshop demo store and its
//! REST API. It:
//! - Owns one browser process, browsing context, page and HTTP session per scenario
//! - Lazily builds page objects and API services bound to those resources
//! - Threads values between steps through typed scenario state
//! - Captures a screenshot and the current URL when a step fails
//! - Always tears the session down, in reverse order of acquisition
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── run_all / run_tagged / run_named                     │
//! │    └── run_scenario(case) -> ScenarioResult                 │
//! │          ├── lifecycle.set_up()                             │
//! │          ├── steps.run(world, step)  (per-step timeout)     │
//! │          ├── lifecycle.on_step_failure(step, sink)          │
//! │          └── lifecycle.tear_down()                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  World                                                      │
//! │    ├── entities: EntityRegistry                             │
//! │    │     ├── pages:    HomePage, ProductPage, CartPage, ... │
//! │    │     └── services: ProductService, BrandService, ...    │
//! │    ├── state: ScenarioState  (Slot<T> keys)                 │
//! │    └── config: Arc<TestConfig>                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session resources                                          │
//! │    ├── BrowserProcess -> BrowsingContext -> Page            │
//! │    │     (Playwright via a Node JSON-lines bridge)          │
//! │    └── HttpSession (reqwest)                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod browser;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod pages;
pub mod payload;
pub mod playwright;
pub mod registry;
pub mod runner;
pub mod spec;
pub mod state;
pub mod steps;
pub mod world;

pub use config::TestConfig;
pub use error::{E2eError, E2eResult};
pub use lifecycle::ScenarioLifecycle;
pub use registry::EntityRegistry;
pub use runner::{RunnerConfig, ScenarioRunner, SuiteResult};
pub use spec::{FeatureSpec, ScenarioCase, StepSpec};
pub use state::ScenarioState;
pub use steps::StepRegistry;
pub use world::World;
