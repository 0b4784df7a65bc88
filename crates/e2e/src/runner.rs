//! Main scenario runner that orchestrates the server, the browser and result reporting

use std::path::PathBuf;
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};
use crate::scenario::{Scenario, StepLog, StepRecord};
use crate::server::{ServerConfig, ServerHandle};

/// Overall bound for a scenario, sized for backfills
pub const SCENARIO_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub started_at: String,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,

    /// Step in progress when the scenario aborted
    pub failed_step: Option<String>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            results,
        }
    }
}

/// Run a scenario against a page, bounded by `timeout`
///
/// The first failing expectation aborts the scenario; nothing is retried.
pub async fn run_on(page: &dyn Page, scenario: Scenario, timeout: Duration) -> ScenarioResult {
    let started_at = chrono::Utc::now().to_rfc3339();
    let start = Instant::now();
    let mut log = StepLog::new();

    info!("START {}", scenario);

    let outcome = match tokio::time::timeout(timeout, scenario.run(page, &mut log)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(E2eError::ScenarioTimeout(timeout.as_millis() as u64)),
    };

    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => {
            info!("✓ {} ({} ms)", scenario, duration_ms);
            ScenarioResult {
                name: scenario.name().to_string(),
                success: true,
                started_at,
                duration_ms,
                steps: log.finish(),
                failed_step: None,
                error: None,
            }
        }
        Err(e) => {
            let failed_step = log.current().map(String::from);
            error!(
                "✗ {} - {} (step: {})",
                scenario,
                e,
                failed_step.as_deref().unwrap_or("none")
            );
            ScenarioResult {
                name: scenario.name().to_string(),
                success: false,
                started_at,
                duration_ms,
                steps: log.completed().to_vec(),
                failed_step,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Main E2E scenario runner
pub struct ScenarioRunner {
    /// Server to spawn; `None` attaches to `playwright.base_url`
    server_config: Option<ServerConfig>,

    playwright_config: PlaywrightConfig,

    scenario_timeout: Duration,

    /// Running server handle (if any)
    server: Option<ServerHandle>,

    /// Output directory for results
    output_dir: PathBuf,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            server_config: config.server,
            playwright_config: config.playwright,
            scenario_timeout: config.scenario_timeout,
            server: None,
            output_dir: config.output_dir,
        }
    }

    /// Start the server
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(());
        }

        let Some(config) = self.server_config.clone() else {
            debug!("No server configured, using {}", self.playwright_config.base_url);
            return Ok(());
        };

        let server = ServerHandle::spawn(config).await?;
        self.playwright_config.base_url = server.base_url().to_string();
        self.server = Some(server);
        Ok(())
    }

    /// Stop the server
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Run scenarios one after another, each in a fresh browser
    pub async fn run_all(&mut self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        self.start_server().await?;

        info!("Running {} scenario(s)...", scenarios.len());

        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            results.push(self.run(*scenario).await?);
        }

        let suite = SuiteResult::from_results(results);
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        Ok(suite)
    }

    /// Run a single scenario
    pub async fn run(&mut self, scenario: Scenario) -> E2eResult<ScenarioResult> {
        self.start_server().await?;

        let page = PlaywrightHandle::launch(self.playwright_config.clone()).await?;
        let result = run_on(&page, scenario, self.scenario_timeout).await;

        if let Err(e) = page.close().await {
            warn!("Failed to close browser: {}", e);
        }

        Ok(result)
    }

    /// Write results to a JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScenarioRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub server: Option<ServerConfig>,
    pub playwright: PlaywrightConfig,
    pub scenario_timeout: Duration,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: Some(ServerConfig::default()),
            playwright: PlaywrightConfig::default(),
            scenario_timeout: SCENARIO_TIMEOUT,
            output_dir: PathBuf::from("test-results"),
        }
    }
}
