use crate::scrapers::page::{Locator, PageDriver, PageError, PageSession, SessionFactory, WaitUntil};
use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::seq::IndexedRandom;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.96 Safari/537.36",
];

const ACCEPT_LANGUAGE: &str = "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7";

const CHROME_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// Launches one headless Chrome per scrape session
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
    idle_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            idle_timeout: Duration::from_secs(120),
        }
    }

    fn launch(&self) -> anyhow::Result<ChromeSession> {
        info!("Launching Chrome (headless={})...", self.headless);

        let args: Vec<&OsStr> = CHROME_ARGS.iter().map(OsStr::new).collect();
        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false)
            .args(args)
            .idle_browser_timeout(self.idle_timeout)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;

        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        tab.set_user_agent(user_agent, Some(ACCEPT_LANGUAGE), None)
            .context("Failed to set user agent")?;
        debug!("Using user agent: {}", user_agent);

        Ok(ChromeSession { browser, tab })
    }
}

#[async_trait]
impl SessionFactory for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn PageSession>, PageError> {
        let launcher = self.clone();
        let session = tokio::task::spawn_blocking(move || launcher.launch())
            .await
            .map_err(join_error)??;
        Ok(Box::new(session))
    }
}

/// One browser with a single tab; the browser process dies when this drops
pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
}

#[derive(Deserialize)]
struct AttributeRead {
    found: bool,
    value: Option<String>,
}

impl ChromeSession {
    async fn blocking<T, F>(&self, call: F) -> Result<T, PageError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, PageError> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || call(&tab))
            .await
            .map_err(join_error)?
    }

    /// Evaluate `body` (a JS function of the matched element list)
    async fn script<T>(&self, locator: &Locator, body: &str) -> Result<T, PageError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let expression = locator_script(locator, body);
        let label = locator.to_string();
        self.blocking(move |tab| evaluate_json(tab, &expression, &label))
            .await
    }

    async fn ready_state(&self) -> Result<String, PageError> {
        self.blocking(|tab| {
            evaluate_json(
                tab,
                "JSON.stringify(document.readyState)",
                "document.readyState",
            )
        })
        .await
    }
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn navigate(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<(), PageError> {
        let target = url.to_string();
        self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&target)?;
            Ok(())
        })
        .await?;

        let deadline = Instant::now() + timeout;
        loop {
            let state = self.ready_state().await.unwrap_or_default();
            let ready = match wait_until {
                WaitUntil::DomContentLoaded => state == "interactive" || state == "complete",
                WaitUntil::Load => state == "complete",
            };
            if ready {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PageError::Timeout(timeout));
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn count(&self, locator: &Locator) -> Result<usize, PageError> {
        self.script(locator, "els => els.length").await
    }

    async fn inner_text(&self, locator: &Locator) -> Result<String, PageError> {
        let text: Option<String> = self
            .script(locator, "els => els.length ? els[0].innerText : null")
            .await?;
        text.ok_or_else(|| PageError::NotFound(locator.to_string()))
    }

    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>, PageError> {
        self.script(locator, "els => els.map(e => e.innerText)")
            .await
    }

    async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let body = format!(
            "els => els.length ? {{ found: true, value: els[0].getAttribute({}) }} : {{ found: false }}",
            json!(name)
        );
        let read: AttributeRead = self.script(locator, &body).await?;
        if read.found {
            Ok(read.value)
        } else {
            Err(PageError::NotFound(locator.to_string()))
        }
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, PageError> {
        self.script(
            locator,
            "els => {
                if (!els.length) return false;
                const style = getComputedStyle(els[0]);
                if (style.visibility === 'hidden' || style.display === 'none') return false;
                const rect = els[0].getBoundingClientRect();
                return rect.width > 0 && rect.height > 0;
            }",
        )
        .await
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), PageError> {
        let found: bool = self
            .script(
                locator,
                "els => { if (!els.length) return false; els[0].scrollIntoView({ block: 'center' }); return true; }",
            )
            .await?;
        found
            .then_some(())
            .ok_or_else(|| PageError::NotFound(locator.to_string()))
    }

    async fn click(&self, locator: &Locator) -> Result<(), PageError> {
        // Dispatched from script: the site's overlays swallow synthetic mouse events
        let found: bool = self
            .script(
                locator,
                "els => { if (!els.length) return false; els[0].click(); return true; }",
            )
            .await?;
        found
            .then_some(())
            .ok_or_else(|| PageError::NotFound(locator.to_string()))
    }

    async fn press_key(&self, key: &str) -> Result<(), PageError> {
        let key = key.to_string();
        self.blocking(move |tab| {
            tab.press_key(&key)?;
            Ok(())
        })
        .await
    }

    async fn content(&self) -> Result<String, PageError> {
        self.blocking(|tab| {
            evaluate_json(
                tab,
                "JSON.stringify(document.documentElement.outerHTML)",
                "document",
            )
        })
        .await
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn close(self: Box<Self>) -> Result<(), PageError> {
        let ChromeSession { browser, tab } = *self;
        tokio::task::spawn_blocking(move || {
            if let Err(e) = tab.close(true) {
                warn!("Failed to close tab cleanly: {:#}", e);
            }
            drop(browser);
        })
        .await
        .map_err(join_error)?;
        debug!("Chrome session closed");
        Ok(())
    }
}

/// Wrap `body` so the page resolves `locator` Playwright-style and returns
/// the JSON-encoded result of `body(elements)`.
fn locator_script(locator: &Locator, body: &str) -> String {
    let steps: Vec<_> = locator
        .steps()
        .iter()
        .map(|s| json!([s.selector, s.nth]))
        .collect();

    format!(
        "(() => {{
            let els = [document];
            for (const [sel, nth] of {steps}) {{
                els = els.flatMap(e => Array.from(e.querySelectorAll(sel)));
                if (nth !== null) els = els[nth] ? [els[nth]] : [];
            }}
            return JSON.stringify(({body})(els));
        }})()",
        steps = serde_json::Value::Array(steps),
    )
}

fn evaluate_json<T: DeserializeOwned>(tab: &Tab, expression: &str, label: &str) -> Result<T, PageError> {
    let result = tab.evaluate(expression, false)?;
    let raw = result
        .value
        .as_ref()
        .and_then(|v| v.as_str())
        .ok_or_else(|| PageError::Script {
            locator: label.to_string(),
            detail: "script returned no value".into(),
        })?;

    serde_json::from_str(raw).map_err(|e| PageError::Script {
        locator: label.to_string(),
        detail: e.to_string(),
    })
}

fn join_error(err: tokio::task::JoinError) -> PageError {
    PageError::Browser(format!("blocking browser task failed: {err}"))
}
