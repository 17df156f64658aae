//! Registration E2E Test Framework
//!
//! This crate drives the company-registration flow of a web application
//! through Playwright and checks what a user would see:
//! - Loads registration test data from a JSON/YAML fixture
//! - Controls a browser through a Node.js bridge speaking JSON lines
//! - Intercepts the outbound form submission and checks its payload
//! - Captures a screenshot for every failed scenario
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Registration E2E Runner (Rust)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner<F: PageFactory>                                 │
//! │    ├── run_scenarios([Scenario]) -> SuiteReport             │
//! │    ├── run_scenario(Scenario) -> ScenarioReport             │
//! │    │     ├── SuffixGenerator::next() -> UniqueSuffix        │
//! │    │     ├── RegistrationFlow::setup()                      │
//! │    │     ├── Scenario::run(flow)                            │
//! │    │     └── screenshot on failure                          │
//! │    └── write_results(report)                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenarios                                                  │
//! │    ├── happy-path          submit, intercept, accept terms  │
//! │    ├── invalid-password    required-fields error            │
//! │    ├── mismatched-password confirmation error               │
//! │    └── invalid-email       field-level email error          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fixture;
pub mod intercept;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod site;
pub mod suffix;
pub mod wait;

pub use error::{E2eError, E2eResult};
pub use fixture::Fixture;
pub use runner::{RunnerConfig, TestRunner};
pub use scenario::{Scenario, ScenarioState};
