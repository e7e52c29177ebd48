//! Narrow page-automation surface the Zap extractor runs against.
//!
//! Drivers (headless Chrome, saved HTML snapshots) implement [`PageDriver`];
//! elements are addressed with owned [`Locator`] chains so a driver can move
//! them onto a blocking thread.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum PageError {
    #[error("no element matches `{0}`")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("unexpected script result for `{locator}`: {detail}")]
    Script { locator: String, detail: String },

    #[error("page session is closed")]
    Closed,
}

impl PageError {
    /// The page itself is gone, as opposed to one element misbehaving
    pub fn is_page_level(&self) -> bool {
        matches!(self, Self::Closed | Self::Browser(_))
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Browser(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub selector: String,
    pub nth: Option<usize>,
}

/// Chain of CSS scopes, each searched inside every match of the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            steps: vec![Step {
                selector: selector.into(),
                nth: None,
            }],
        }
    }

    /// Descendants of this locator's matches
    pub fn locate(&self, selector: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(Step {
            selector: selector.into(),
            nth: None,
        });
        Self { steps }
    }

    /// Narrow the current matches to the one at `index`
    pub fn nth(mut self, index: usize) -> Self {
        if let Some(last) = self.steps.last_mut() {
            last.nth = Some(index);
        }
        self
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            f.write_str(&step.selector)?;
            if let Some(nth) = step.nth {
                write!(f, " >> nth={nth}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Result of a bounded wait; running out of time is an answer, not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    DomContentLoaded,
    Load,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<(), PageError>;

    async fn count(&self, locator: &Locator) -> Result<usize, PageError>;

    async fn inner_text(&self, locator: &Locator) -> Result<String, PageError>;

    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>, PageError>;

    async fn attribute(&self, locator: &Locator, name: &str)
        -> Result<Option<String>, PageError>;

    async fn is_visible(&self, locator: &Locator) -> Result<bool, PageError>;

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), PageError>;

    async fn click(&self, locator: &Locator) -> Result<(), PageError>;

    async fn press_key(&self, key: &str) -> Result<(), PageError>;

    /// Full HTML of the current document
    async fn content(&self) -> Result<String, PageError>;

    /// Poll until `locator` reaches `state` or `timeout` elapses.
    ///
    /// A failed visibility check counts as "not visible".
    /// The whole wait, visibility checks included, is capped at `timeout`.
    async fn wait_for(&self, locator: &Locator, state: Visibility, timeout: Duration) -> WaitOutcome {
        let want_visible = state == Visibility::Visible;
        let poll = async {
            while self.is_visible(locator).await.unwrap_or(false) != want_visible {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(()) => WaitOutcome::Satisfied,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

/// A page owned by one property's scrape; must be closed when done
#[async_trait]
pub trait PageSession: PageDriver {
    async fn close(self: Box<Self>) -> Result<(), PageError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>, PageError>;
}

/// Run one driver call under a deadline
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, PageError>
where
    F: Future<Output = Result<T, PageError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| PageError::Timeout(limit))?
}
