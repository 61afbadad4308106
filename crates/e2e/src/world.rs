//! Per-scenario bundle handed to step definitions

use std::sync::Arc;

use crate::config::TestConfig;
use crate::registry::EntityRegistry;
use crate::state::ScenarioState;

/// Entities, state and configuration of the running scenario.
///
/// Entity accessors return owned `Arc`s, so a step can hold a page object or
/// service while it writes to `state`.
#[derive(Debug)]
pub struct World {
    pub entities: EntityRegistry,
    pub state: ScenarioState,
    pub config: Arc<TestConfig>,
}
