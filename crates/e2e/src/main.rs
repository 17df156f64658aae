//! Registration E2E runner entry point
//!
//! Run with: cargo run --package registration-e2e -- --fixture fixtures/RegistrationData.json

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use registration_e2e::playwright::{Browser, PlaywrightConfig, PlaywrightLauncher};
use registration_e2e::site::{wait_for_reachable, SiteMap};
use registration_e2e::wait::WaitConfig;
use registration_e2e::{E2eResult, RunnerConfig, Scenario, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "registration-e2e")]
#[command(about = "E2E runner for the company registration flow")]
struct Args {
    /// Fixture file (JSON or YAML); the built-in data is used when omitted
    #[arg(short, long, env = "REGISTRATION_E2E_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Application root
    #[arg(long, env = "REGISTRATION_E2E_BASE_URL")]
    base_url: Option<String>,

    /// Collected-forms endpoint the registration form posts to
    #[arg(long, env = "REGISTRATION_E2E_FORM_ENDPOINT")]
    form_endpoint: Option<String>,

    /// Run only these scenarios (repeatable)
    #[arg(short, long = "scenario", value_enum)]
    scenarios: Vec<Scenario>,

    /// Run the selected scenarios this many times
    #[arg(long, default_value = "1")]
    repeat: usize,

    /// Browser to use
    #[arg(long, value_enum, default_value = "chromium", env = "REGISTRATION_E2E_BROWSER")]
    browser: Browser,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Viewport width
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Per-action timeout in milliseconds
    #[arg(long, default_value = "4000")]
    action_timeout_ms: u64,

    /// Page load timeout in milliseconds
    #[arg(long, default_value = "60000", env = "REGISTRATION_E2E_NAVIGATION_TIMEOUT_MS")]
    navigation_timeout_ms: u64,

    /// Timeout for the intercepted form submission in milliseconds
    #[arg(long, default_value = "30000")]
    intercept_timeout_ms: u64,

    /// Interval between visibility checks in milliseconds
    #[arg(long, default_value = "100")]
    poll_interval_ms: u64,

    /// Directory containing node_modules/playwright
    #[arg(long, default_value = ".", env = "REGISTRATION_E2E_NODE_PROJECT")]
    node_project: PathBuf,

    /// Skip the reachability check of the base URL
    #[arg(long)]
    skip_preflight: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> RunnerConfig {
        let mut site = SiteMap::default();
        if let Some(base_url) = self.base_url {
            site.base_url = base_url;
        }
        if let Some(endpoint) = self.form_endpoint {
            site.form_endpoint = endpoint;
        }

        let action_timeout = Duration::from_millis(self.action_timeout_ms);

        RunnerConfig {
            site,
            playwright: PlaywrightConfig {
                browser: self.browser,
                headless: !self.headed,
                viewport_width: self.viewport_width,
                viewport_height: self.viewport_height,
                action_timeout,
                navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
                project_dir: self.node_project,
                ..Default::default()
            },
            wait: WaitConfig {
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                default_timeout: action_timeout,
                intercept_timeout: Duration::from_millis(self.intercept_timeout_ms),
            },
            fixture_path: self.fixture,
            output_dir: self.output,
            scenarios: self.scenarios,
            repeat: self.repeat,
            preflight: !self.skip_preflight,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match run(args.into_config()).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn run(config: RunnerConfig) -> E2eResult<bool> {
    let fixture = config.load_fixture()?;

    if config.preflight {
        wait_for_reachable(&config.site.base_url, config.preflight_timeout).await?;
    }

    let launcher = PlaywrightLauncher::new(config.playwright.clone())?;
    let runner = TestRunner::new(
        launcher,
        fixture,
        config.site.clone(),
        config.wait.clone(),
        config.output_dir.clone(),
    );

    let scenarios = config.selected_scenarios();
    let results = runner.run_repeated(&scenarios, config.repeat).await;
    runner.write_results(&results)?;

    info!("{} of {} scenario run(s) passed", results.passed, results.total);
    Ok(results.success())
}
