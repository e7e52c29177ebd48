//! Offline driver over a saved results page.
//!
//! Pages saved with `--dump-html` can be replayed through the same extractor
//! without a browser. Interactions are inert: clicks land but nothing opens,
//! so whatever the HTML already contains is what the extractor sees.

use crate::scrapers::page::{
    Locator, PageDriver, PageError, PageSession, SessionFactory, WaitUntil,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "dialog", "div", "footer", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "li", "main", "nav", "ol", "p", "section", "table", "tr", "ul",
];

#[derive(Debug, Clone)]
pub struct SnapshotPage {
    html: String,
}

impl SnapshotPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        debug!("Loaded snapshot {} ({} bytes)", path.display(), html.len());
        Ok(Self::new(html))
    }

    /// Resolve `locator` against a fresh parse and hand the matches to `f`
    fn query<T>(&self, locator: &Locator, f: impl FnOnce(&[ElementRef<'_>]) -> T) -> Result<T, PageError> {
        let document = Html::parse_document(&self.html);
        let mut matches: Vec<ElementRef<'_>> = Vec::new();

        for (i, step) in locator.steps().iter().enumerate() {
            let selector = Selector::parse(&step.selector).map_err(|e| PageError::Script {
                locator: locator.to_string(),
                detail: e.to_string(),
            })?;

            matches = if i == 0 {
                document.select(&selector).collect()
            } else {
                matches.iter().flat_map(|el| el.select(&selector)).collect()
            };

            if let Some(nth) = step.nth {
                matches = matches.get(nth).copied().into_iter().collect();
            }
        }

        Ok(f(&matches))
    }

    fn first<T>(&self, locator: &Locator, f: impl FnOnce(ElementRef<'_>) -> T) -> Result<T, PageError> {
        self.query(locator, |els| els.first().map(|el| f(*el)))?
            .ok_or_else(|| PageError::NotFound(locator.to_string()))
    }
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    let value = el.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value
        .attr("style")
        .map(|style| style.replace(' ', "").contains("display:none"))
        .unwrap_or(false)
}

fn is_visible(el: ElementRef<'_>) -> bool {
    !is_hidden(el) && !el.ancestors().filter_map(ElementRef::wrap).any(is_hidden)
}

/// Rough `innerText`: block elements and `<br>` break lines, whitespace collapses
fn inner_text(el: ElementRef<'_>) -> String {
    fn walk(el: ElementRef<'_>, out: &mut String) {
        let tag = el.value().name();
        if tag == "br" {
            out.push('\n');
            return;
        }
        if tag == "script" || tag == "style" {
            return;
        }
        let block = BLOCK_TAGS.contains(&tag);
        if block {
            out.push('\n');
        }
        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                walk(child_el, out);
            } else if let Node::Text(text) = child.value() {
                out.push_str(text);
            }
        }
        if block {
            out.push('\n');
        }
    }

    let mut raw = String::new();
    walk(el, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl PageDriver for SnapshotPage {
    async fn navigate(
        &self,
        url: &str,
        _wait_until: WaitUntil,
        _timeout: Duration,
    ) -> Result<(), PageError> {
        debug!("Snapshot ignores navigation to {}", url);
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, PageError> {
        self.query(locator, |els| els.len())
    }

    async fn inner_text(&self, locator: &Locator) -> Result<String, PageError> {
        self.first(locator, inner_text)
    }

    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>, PageError> {
        self.query(locator, |els| els.iter().map(|el| inner_text(*el)).collect())
    }

    async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        self.first(locator, |el| el.value().attr(name).map(str::to_owned))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, PageError> {
        self.query(locator, |els| els.first().is_some_and(|el| is_visible(*el)))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), PageError> {
        self.first(locator, |_| ())
    }

    async fn click(&self, locator: &Locator) -> Result<(), PageError> {
        self.first(locator, |_| ())
    }

    async fn press_key(&self, _key: &str) -> Result<(), PageError> {
        Ok(())
    }

    async fn content(&self) -> Result<String, PageError> {
        Ok(self.html.clone())
    }
}

#[async_trait]
impl PageSession for SnapshotPage {
    async fn close(self: Box<Self>) -> Result<(), PageError> {
        Ok(())
    }
}

/// Every session opens the same document
#[async_trait]
impl SessionFactory for SnapshotPage {
    async fn open(&self) -> Result<Box<dyn PageSession>, PageError> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <ul>
          <li class="card"><a role="button" href="/a" title="First">x</a><div class="price">R$ 1.000<br>Cond. R$ 10</div></li>
          <li class="card"><a role="button" href="/b">y</a><span hidden class="tag">gone</span></li>
        </ul>
    "#;

    #[tokio::test]
    async fn resolves_nested_locators() {
        let page = SnapshotPage::new(PAGE);
        let cards = Locator::css("li.card");
        assert_eq!(page.count(&cards).await.unwrap(), 2);

        let second_link = cards.clone().nth(1).locate(r#"a[role="button"]"#);
        assert_eq!(
            page.attribute(&second_link, "href").await.unwrap().as_deref(),
            Some("/b")
        );
        assert_eq!(page.attribute(&second_link, "title").await.unwrap(), None);
    }

    #[tokio::test]
    async fn inner_text_breaks_lines_on_br() {
        let page = SnapshotPage::new(PAGE);
        let price = Locator::css("li.card").first().locate(".price");
        assert_eq!(
            page.inner_text(&price).await.unwrap(),
            "R$ 1.000\nCond. R$ 10"
        );
    }

    #[tokio::test]
    async fn hidden_and_missing_elements_are_not_visible() {
        let page = SnapshotPage::new(PAGE);
        assert!(!page.is_visible(&Locator::css(".tag")).await.unwrap());
        assert!(!page.is_visible(&Locator::css(".nope")).await.unwrap());
        assert!(page.is_visible(&Locator::css(".price")).await.unwrap());
    }

    #[tokio::test]
    async fn missing_element_text_is_not_found() {
        let page = SnapshotPage::new(PAGE);
        let err = page.inner_text(&Locator::css(".nope")).await.unwrap_err();
        assert!(matches!(err, PageError::NotFound(_)));
    }
}
