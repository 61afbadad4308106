//! Scenario runner entry point
//!
//! Run with: cargo run --package toolshop-e2e -- --tag smoke

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use toolshop_e2e::browser::BrowserKind;
use toolshop_e2e::playwright::{PlaywrightConfig, PlaywrightLauncher};
use toolshop_e2e::runner::{RunnerConfig, ScenarioRunner, SuiteResult};
use toolshop_e2e::{E2eResult, StepRegistry, TestConfig};

#[derive(Parser, Debug)]
#[command(name = "toolshop-e2e")]
#[command(about = "Runs Toolshop UI and API scenarios")]
struct Args {
    /// Directory of YAML feature files
    #[arg(short, long, default_value = "crates/e2e/features")]
    features: PathBuf,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Web application base URL (overrides BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// REST API base URL (overrides API_BASE_URL)
    #[arg(long)]
    api_base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Per-step timeout in milliseconds (overrides STEP_TIMEOUT_MS)
    #[arg(long)]
    step_timeout_ms: Option<u64>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<BrowserKind>,

    /// Scenarios to run concurrently
    #[arg(short, long, default_value = "1")]
    workers: usize,

    /// Directory containing node_modules/playwright
    #[arg(long)]
    node_project_dir: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Project config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn test_config(&self) -> TestConfig {
        let mut config = TestConfig::load(self.config.as_deref());
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(ms) = self.step_timeout_ms.filter(|ms| *ms > 0) {
            config.step_timeout_ms = ms;
        }
        if let Some(browser) = self.browser {
            config.browser = browser;
        }
        if let Some(dir) = &self.node_project_dir {
            config.node_project_dir = dir.clone();
        }
        config
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = Arc::new(args.test_config());
    info!(
        "Toolshop at {} / API at {} ({}, headless={})",
        config.base_url, config.api_base_url, config.browser, config.headless
    );

    let launcher = Arc::new(PlaywrightLauncher::new(PlaywrightConfig::from_test_config(&config)));
    let steps = Arc::new(StepRegistry::toolshop()?);

    let runner = ScenarioRunner::new(
        config,
        launcher,
        steps,
        RunnerConfig {
            features_dir: args.features,
            output_dir: args.output,
            workers: args.workers,
        },
    );

    let results = if let Some(name) = args.name {
        let result = runner.run_named(&name).await?;
        SuiteResult {
            started_at: chrono::Utc::now(),
            total: 1,
            passed: usize::from(result.success),
            failed: usize::from(!result.success),
            duration_ms: result.duration_ms,
            results: vec![result],
        }
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&tag).await?
    } else {
        runner.run_all().await?
    };

    runner.write_results(&results)?;

    Ok(results.success())
}
