//! The browser automation capability consumed by the helpers
//!
//! Everything the helper library needs from a browser goes through the
//! [`Page`] trait: navigation, response waits, element actions and bounded
//! expectations. [`crate::playwright::PlaywrightHandle`] drives a real
//! browser; the integration tests drive an in-process model of the
//! application.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::path::PathSeparator;

/// Default bound for a single expectation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound for waits on long-running backend work such as backfills
pub const EXTENDED_TIMEOUT: Duration = Duration::from_secs(60);

/// Condition an element must reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Visible,
    Hidden,
    Enabled,
    Disabled,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Expectation::Visible => "visible",
            Expectation::Hidden => "hidden",
            Expectation::Enabled => "enabled",
            Expectation::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub default: Duration,
    pub extended: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default: DEFAULT_TIMEOUT,
            extended: EXTENDED_TIMEOUT,
        }
    }
}

/// A registered wait for a network response
///
/// Obtained from [`Page::expect_response`] before the action that produces
/// the response, then resolved with [`Page::await_response`].
#[derive(Debug, PartialEq, Eq)]
pub struct ResponseWaiter {
    pub id: u64,
    pub url: String,
}

/// An intercepted response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl NetworkResponse {
    pub fn expect_status(&self, expected: u16) -> E2eResult<&Self> {
        if self.status != expected {
            return Err(E2eError::UnexpectedStatus {
                url: self.url.clone(),
                expected,
                actual: self.status,
            });
        }
        Ok(self)
    }

    /// JSON body, failing if the response carried none
    pub fn json(&self) -> E2eResult<&serde_json::Value> {
        self.body
            .as_ref()
            .ok_or_else(|| E2eError::assertion(format!("response for {} has no body", self.url)))
    }

    pub fn expect_empty_body(&self) -> E2eResult<&Self> {
        match &self.body {
            None => Ok(self),
            Some(serde_json::Value::String(s)) if s.is_empty() => Ok(self),
            Some(_) => Err(E2eError::assertion(format!(
                "response for {} was expected to carry no body",
                self.url
            ))),
        }
    }
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to a route relative to the base URL
    async fn goto(&self, route: &str) -> E2eResult<()>;

    /// Wait until the page URL matches a route
    async fn wait_for_url(&self, route: &str) -> E2eResult<()>;

    /// Start listening for the next response to `url`
    async fn expect_response(&self, url: &str) -> E2eResult<ResponseWaiter>;

    /// Resolve a previously registered response wait
    async fn await_response(&self, waiter: ResponseWaiter) -> E2eResult<NetworkResponse>;

    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    /// Replace the content of an editable element
    async fn fill(&self, locator: &Locator, text: &str) -> E2eResult<()>;

    /// Press a key combination while the element is focused
    async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()>;

    async fn inner_text(&self, locator: &Locator) -> E2eResult<String>;

    /// Wait until the element reaches `expectation`, failing with
    /// [`E2eError::Timeout`] once `timeout` elapses
    async fn expect(
        &self,
        locator: &Locator,
        expectation: Expectation,
        timeout: Duration,
    ) -> E2eResult<()>;

    fn timeouts(&self) -> Timeouts;

    /// Separator the application uses in explorer and tab titles
    fn separator(&self) -> PathSeparator;

    async fn expect_visible(&self, locator: &Locator) -> E2eResult<()> {
        self.expect(locator, Expectation::Visible, self.timeouts().default).await
    }

    async fn expect_hidden(&self, locator: &Locator) -> E2eResult<()> {
        self.expect(locator, Expectation::Hidden, self.timeouts().default).await
    }

    async fn expect_enabled(&self, locator: &Locator) -> E2eResult<()> {
        self.expect(locator, Expectation::Enabled, self.timeouts().default).await
    }

    async fn expect_disabled(&self, locator: &Locator) -> E2eResult<()> {
        self.expect(locator, Expectation::Disabled, self.timeouts().default).await
    }
}
