//! Browser page abstraction used by the scenarios

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;
use crate::intercept::{CapturedExchange, InterceptId, RequestMatcher};

/// What a locator resolves against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A CSS selector
    Css(String),
    /// The deepest element whose text contains the given string
    Text(String),
}

/// Which of several matches to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nth {
    Index(usize),
    Last,
}

/// A description of an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub target: Target,

    /// Restrict the search to descendants of this CSS selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<String>,

    /// Keep only matches whose text contains this string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<Nth>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            target: Target::Css(selector.into()),
            within: None,
            has_text: None,
            nth: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            target: Target::Text(text.into()),
            within: None,
            has_text: None,
            nth: None,
        }
    }

    pub fn within(mut self, scope: impl Into<String>) -> Self {
        self.within = Some(scope.into());
        self
    }

    pub fn has_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(Nth::Index(index));
        self
    }

    pub fn last(mut self) -> Self {
        self.nth = Some(Nth::Last);
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.within {
            write!(f, "{} >> ", scope)?;
        }
        match &self.target {
            Target::Css(selector) => write!(f, "{}", selector)?,
            Target::Text(text) => write!(f, "text={:?}", text)?,
        }
        if let Some(text) = &self.has_text {
            write!(f, " (has text {:?})", text)?;
        }
        match self.nth {
            Some(Nth::Index(i)) => write!(f, " [{}]", i),
            Some(Nth::Last) => write!(f, " [last]"),
            None => Ok(()),
        }
    }
}

/// One browser page, exclusively owned by a scenario.
///
/// Actions wait for their element to become actionable using the page's
/// own action timeout. Visibility checks never wait; callers poll them with
/// [`crate::wait::poll_until`].
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// Click the element; `force` bypasses visibility and actionability checks
    async fn click(&self, locator: &Locator, force: bool) -> E2eResult<()>;

    /// Type text into the element key by key
    async fn type_text(&self, locator: &Locator, text: &str) -> E2eResult<()>;

    async fn clear(&self, locator: &Locator) -> E2eResult<()>;

    async fn focus(&self, locator: &Locator) -> E2eResult<()>;

    /// Scroll the element's content to its maximum scroll extent
    async fn scroll_to_end(&self, locator: &Locator) -> E2eResult<()>;

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    /// Start observing outbound requests that match `matcher`
    async fn expect_exchange(&self, matcher: &RequestMatcher) -> E2eResult<InterceptId>;

    /// Wait for the first matching request and its response
    async fn await_exchange(&self, id: InterceptId, timeout: Duration)
        -> E2eResult<CapturedExchange>;

    /// Number of matching requests seen since registration
    async fn observed_requests(&self, id: InterceptId) -> E2eResult<usize>;

    async fn screenshot(&self, path: &Path) -> E2eResult<()>;

    async fn close(&self) -> E2eResult<()>;
}

/// Opens a fresh page for every scenario
#[async_trait]
pub trait PageFactory: Send + Sync {
    type Page: Page;

    async fn new_page(&self) -> E2eResult<Self::Page>;
}
