//! Scenario runner: lifecycle hooks, per-step timeouts and the results report

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::browser::BrowserLauncher;
use crate::config::TestConfig;
use crate::diagnostics::{Attachment, AttachmentBody, MemorySink};
use crate::error::{E2eError, E2eResult};
use crate::lifecycle::ScenarioLifecycle;
use crate::spec::{FeatureSpec, ScenarioCase};
use crate::steps::StepRegistry;

pub const RESULTS_FILE: &str = "test-results.json";
const SCREENSHOT_DIR: &str = "screenshots";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Not run because an earlier step failed or set-up failed
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub feature: String,
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub attachments: Vec<Attachment>,
    pub error: Option<String>,
    pub teardown_error: Option<String>,
}

impl ScenarioResult {
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub features_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Scenarios in flight at once, each with its own browser and session
    pub workers: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            features_dir: PathBuf::from("features"),
            output_dir: PathBuf::from("test-results"),
            workers: 1,
        }
    }
}

pub struct ScenarioRunner {
    config: Arc<TestConfig>,
    launcher: Arc<dyn BrowserLauncher>,
    steps: Arc<StepRegistry>,
    runner: RunnerConfig,
}

impl ScenarioRunner {
    pub fn new(
        config: Arc<TestConfig>,
        launcher: Arc<dyn BrowserLauncher>,
        steps: Arc<StepRegistry>,
        runner: RunnerConfig,
    ) -> Self {
        Self {
            config,
            launcher,
            steps,
            runner,
        }
    }

    /// Run every scenario under the features directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let features = FeatureSpec::load_all(&self.runner.features_dir)?;
        Ok(self.run_cases(&FeatureSpec::all_cases(&features)).await)
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let features = FeatureSpec::load_all(&self.runner.features_dir)?;
        Ok(self
            .run_cases(&FeatureSpec::filter_by_tag(&features, tag))
            .await)
    }

    /// Run a specific scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<ScenarioResult> {
        let features = FeatureSpec::load_all(&self.runner.features_dir)?;
        let case = FeatureSpec::all_cases(&features)
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {}", name)))?;
        Ok(self.run_scenario(&case).await)
    }

    /// Run scenarios on the configured number of workers. Results keep the
    /// order of `cases`.
    pub async fn run_cases(&self, cases: &[ScenarioCase]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let workers = self.runner.workers.max(1);

        info!("Running {} scenario(s) on {} worker(s)...", cases.len(), workers);

        let results: Vec<ScenarioResult> = stream::iter(cases)
            .map(|case| self.run_scenario(case))
            .buffered(workers)
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            started_at,
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Set up, run each step under the step timeout, capture diagnostics on
    /// the first failure, skip the rest, and always tear down.
    pub async fn run_scenario(&self, case: &ScenarioCase) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", case.name);

        let mut lifecycle = ScenarioLifecycle::new(Arc::clone(&self.config), Arc::clone(&self.launcher));
        let mut sink = MemorySink::new();
        let mut steps = Vec::with_capacity(case.steps.len());
        let mut scenario_error: Option<String> = None;

        if let Err(e) = lifecycle.set_up().await {
            scenario_error = Some(e.to_string());
        }

        for step in &case.steps {
            let text = step.to_string();
            if scenario_error.is_some() {
                steps.push(StepResult {
                    step: text,
                    status: StepStatus::Skipped,
                    duration_ms: 0,
                    error: None,
                });
                continue;
            }

            let step_start = Instant::now();
            let outcome = match lifecycle.world_mut() {
                Ok(world) => match timeout(self.config.step_timeout(), self.steps.run(world, step)).await {
                    Ok(result) => result,
                    Err(_) => Err(E2eError::Timeout(format!(
                        "step '{}' after {} ms",
                        text, self.config.step_timeout_ms
                    ))),
                },
                Err(e) => Err(e),
            };
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => steps.push(StepResult {
                    step: text,
                    status: StepStatus::Passed,
                    duration_ms,
                    error: None,
                }),
                Err(e) => {
                    lifecycle.on_step_failure(&text, &mut sink).await;
                    scenario_error = Some(e.to_string());
                    steps.push(StepResult {
                        step: text,
                        status: StepStatus::Failed,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let teardown_error = lifecycle.tear_down().await.err().map(|e| e.to_string());

        let success = scenario_error.is_none() && teardown_error.is_none();
        let duration_ms = start.elapsed().as_millis() as u64;
        if success {
            info!("✓ {} ({} ms)", case.name, duration_ms);
        } else {
            error!(
                "✗ {} - {}",
                case.name,
                scenario_error
                    .as_deref()
                    .or(teardown_error.as_deref())
                    .unwrap_or("unknown error")
            );
        }

        ScenarioResult {
            feature: case.feature.clone(),
            name: case.name.clone(),
            tags: case.tags.clone(),
            success,
            duration_ms,
            steps,
            attachments: sink.into_attachments(),
            error: scenario_error,
            teardown_error,
        }
    }

    /// Write the JSON report and the captured screenshots
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.runner.output_dir, results)
    }
}

/// Write `test-results.json` and one PNG per screenshot attachment under `dir`
pub fn write_results(dir: &Path, results: &SuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    for (index, result) in results.results.iter().enumerate() {
        let screenshots = result
            .attachments
            .iter()
            .filter_map(|a| match &a.body {
                AttachmentBody::Bytes(bytes) if a.is_image() => Some(bytes),
                _ => None,
            })
            .enumerate();
        for (n, bytes) in screenshots {
            let shots = dir.join(SCREENSHOT_DIR);
            std::fs::create_dir_all(&shots)?;
            let path = shots.join(format!("{:03}-{}-{}.png", index + 1, slug(&result.name), n + 1));
            if let Err(e) = std::fs::write(&path, bytes) {
                warn!("Could not write screenshot {}: {}", path.display(), e);
            }
        }
    }

    let path = dir.join(RESULTS_FILE);
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
