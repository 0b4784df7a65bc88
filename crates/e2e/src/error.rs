//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Bridge protocol error: {0}")]
    Bridge(String),

    /// An expectation did not become true within its timeout
    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    /// A value was observed but differs from the expected one
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Unexpected status for {url}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        url: String,
        expected: u16,
        actual: u16,
    },

    #[error("Editor content of {path} does not match the API content")]
    ContentMismatch { path: String },

    #[error("Invalid plan transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Scenario timed out after {0} ms")]
    ScenarioTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl E2eError {
    /// Shorthand for a wrong-value failure
    pub fn assertion(msg: impl Into<String>) -> Self {
        E2eError::AssertionFailed(msg.into())
    }

    /// True for failures caused by a wait that never resolved
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout(_) | E2eError::ScenarioTimeout(_))
    }
}
