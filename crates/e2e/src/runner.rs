//! Main test runner: executes scenarios, captures failure screenshots, writes reports

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::E2eResult;
use crate::fixture::Fixture;
use crate::page::{Page, PageFactory};
use crate::playwright::PlaywrightConfig;
use crate::scenario::{RegistrationFlow, Scenario, ScenarioState};
use crate::site::SiteMap;
use crate::suffix::SuffixGenerator;
use crate::wait::WaitConfig;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?i)[^a-z0-9]").expect("static regex is valid"));

/// Screenshot name for a failed scenario: `failed-` plus the sanitized title
pub fn failure_screenshot_name(title: &str) -> String {
    format!(
        "failed-{}",
        NON_ALPHANUMERIC.replace_all(title, "_").to_lowercase()
    )
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub title: String,
    pub success: bool,
    pub duration_ms: u64,
    pub states: Vec<ScenarioState>,
    pub suffix: String,
    pub error: Option<String>,
    pub error_kind: Option<String>,
    pub screenshot_path: Option<String>,
    pub screenshot_sha256: Option<String>,
}

/// Result of running the whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub site: SiteMap,
    pub playwright: PlaywrightConfig,
    pub wait: WaitConfig,

    /// Fixture file; the built-in fixture is used when absent
    pub fixture_path: Option<PathBuf>,

    pub output_dir: PathBuf,

    /// Scenarios to run, in order; empty means all
    pub scenarios: Vec<Scenario>,

    /// Number of times the selected scenarios are run
    pub repeat: usize,

    /// Check that the target answers before launching a browser
    pub preflight: bool,

    pub preflight_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            site: SiteMap::default(),
            playwright: PlaywrightConfig::default(),
            wait: WaitConfig::default(),
            fixture_path: None,
            output_dir: PathBuf::from("test-results"),
            scenarios: Vec::new(),
            repeat: 1,
            preflight: true,
            preflight_timeout: Duration::from_secs(30),
        }
    }
}

impl RunnerConfig {
    pub fn load_fixture(&self) -> E2eResult<Fixture> {
        match &self.fixture_path {
            Some(path) => {
                info!("Loading fixture from {}", path.display());
                Fixture::from_file(path)
            }
            None => Ok(Fixture::default()),
        }
    }

    pub fn selected_scenarios(&self) -> Vec<Scenario> {
        if self.scenarios.is_empty() {
            Scenario::ALL.to_vec()
        } else {
            self.scenarios.clone()
        }
    }
}

/// Runs registration scenarios one after another, each on a fresh page
pub struct TestRunner<F: PageFactory> {
    factory: F,
    fixture: Fixture,
    site: SiteMap,
    wait: WaitConfig,
    suffixes: SuffixGenerator,
    output_dir: PathBuf,
}

impl<F: PageFactory> TestRunner<F> {
    pub fn new(factory: F, fixture: Fixture, site: SiteMap, wait: WaitConfig, output_dir: PathBuf) -> Self {
        Self::with_suffixes(factory, fixture, site, wait, output_dir, SuffixGenerator::new())
    }

    pub fn with_suffixes(
        factory: F,
        fixture: Fixture,
        site: SiteMap,
        wait: WaitConfig,
        output_dir: PathBuf,
        suffixes: SuffixGenerator,
    ) -> Self {
        Self {
            factory,
            fixture,
            site,
            wait,
            suffixes,
            output_dir,
        }
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }

    /// Run the given scenarios sequentially; failures never stop the suite
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> SuiteReport {
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());

        info!("Running {} scenario(s)...", scenarios.len());

        for &scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        SuiteReport {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run the given scenarios `repeat` times and merge the reports
    pub async fn run_repeated(&self, scenarios: &[Scenario], repeat: usize) -> SuiteReport {
        let start = Instant::now();
        let mut merged = SuiteReport {
            total: 0,
            passed: 0,
            failed: 0,
            duration_ms: 0,
            results: Vec::new(),
        };

        for round in 1..=repeat.max(1) {
            if repeat > 1 {
                info!("Round {}/{}", round, repeat);
            }
            let report = self.run_scenarios(scenarios).await;
            merged.total += report.total;
            merged.passed += report.passed;
            merged.failed += report.failed;
            merged.results.extend(report.results);
        }

        merged.duration_ms = start.elapsed().as_millis() as u64;
        merged
    }

    /// Run a single scenario on its own page
    pub async fn run_scenario(&self, scenario: Scenario) -> ScenarioReport {
        let start = Instant::now();
        // One suffix per scenario, drawn before any data is generated.
        let suffix = self.suffixes.next();
        debug!("Running scenario {} with suffix {}", scenario, suffix);

        let mut report = ScenarioReport {
            name: scenario.name().to_string(),
            title: scenario.title().to_string(),
            success: false,
            duration_ms: 0,
            states: vec![ScenarioState::NotStarted],
            suffix: suffix.to_string(),
            error: None,
            error_kind: None,
            screenshot_path: None,
            screenshot_sha256: None,
        };

        let page = match self.factory.new_page().await {
            Ok(page) => page,
            Err(e) => {
                report.states.push(ScenarioState::Failed);
                report.error_kind = Some(e.kind().to_string());
                report.error = Some(e.to_string());
                report.duration_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        };

        let mut flow = RegistrationFlow::new(&page, &self.fixture, &self.site, &self.wait, suffix);
        let outcome = match flow.setup().await {
            Ok(()) => scenario.run(&mut flow).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            flow.fail();
            report.error_kind = Some(e.kind().to_string());
            report.error = Some(e.to_string());

            match self.capture_failure(&page, scenario.title()).await {
                Ok((path, digest)) => {
                    report.screenshot_path = Some(path.to_string_lossy().to_string());
                    report.screenshot_sha256 = Some(digest);
                }
                Err(e) => warn!("Could not capture failure screenshot: {}", e),
            }
        }

        report.success = flow.state() == ScenarioState::Asserted;
        report.states = flow.history().to_vec();

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    /// Screenshot the page under the failure name and hash the file
    async fn capture_failure(&self, page: &F::Page, title: &str) -> E2eResult<(PathBuf, String)> {
        let path = self
            .screenshot_dir()
            .join(format!("{}.png", failure_screenshot_name(title)));
        page.screenshot(&path).await?;
        let digest = hash_file(&path)?;
        info!("Failure screenshot: {}", path.display());
        Ok((path, digest))
    }

    /// Write the suite report to JSON
    pub fn write_results(&self, results: &SuiteReport) -> E2eResult<PathBuf> {
        write_results(&self.output_dir, results)
    }
}

/// Write a suite report to `<output_dir>/test-results.json`
pub fn write_results(output_dir: &Path, results: &SuiteReport) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

fn hash_file(path: &Path) -> E2eResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
