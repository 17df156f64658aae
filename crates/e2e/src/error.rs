//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Invalid fixture: {0}")]
    Fixture(String),

    #[error("Target unreachable at {url} after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Timed out after {timeout_ms} ms waiting for: {what}")]
    ElementTimeout { what: String, timeout_ms: u64 },

    #[error("Assertion failed: {what}: expected {expected:?}, got {actual:?}")]
    AssertionMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("No outbound request matching {matcher} within {timeout_ms} ms")]
    InterceptTimeout { matcher: String, timeout_ms: u64 },

    #[error("Illegal scenario transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Shorthand for an [`E2eError::AssertionMismatch`]
    pub fn mismatch(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        E2eError::AssertionMismatch {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Stable identifier used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            E2eError::PlaywrightNotFound => "playwright_not_found",
            E2eError::Bridge(_) => "bridge",
            E2eError::Fixture(_) => "fixture",
            E2eError::TargetUnreachable { .. } => "target_unreachable",
            E2eError::ElementTimeout { .. } => "element_timeout",
            E2eError::AssertionMismatch { .. } => "assertion_mismatch",
            E2eError::InterceptTimeout { .. } => "intercept_timeout",
            E2eError::InvalidTransition { .. } => "invalid_transition",
            E2eError::UnknownScenario(_) => "unknown_scenario",
            E2eError::Io(_) => "io",
            E2eError::Json(_) => "json",
            E2eError::Yaml(_) => "yaml",
            E2eError::Http(_) => "http",
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
