//! Session release and failure handling with a scripted page driver.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use zap_scout::models::{CardVariant, ReferenceProperty};
use zap_scout::scrapers::page::{
    Locator, PageDriver, PageError, PageSession, SessionFactory, WaitUntil,
};
use zap_scout::scrapers::zap::selectors::{RESULT_CARD, STREET_TEXT};
use zap_scout::scrapers::zap::{extract_card, Timeouts};
use zap_scout::scrapers::{ListingScraper, ScrapeOutcome, SnapshotPage, ZapScraper};

const PAGE: &str = r#"
<html><body>
  <ul>
    <li data-cy="rp-property-cd">
      <a role="button" href="/imovel/1" title="Apartamento">
        <p data-cy="rp-cardProperty-location-txt">Botafogo, Rio de Janeiro</p>
        <p data-cy="rp-cardProperty-street-txt">Rua Real Grandeza</p>
        <div data-cy="rp-cardProperty-price-txt">R$ 520.000</div>
        <p data-cy="rp-cardProperty-propertyArea-txt">82 m²</p>
        <p data-cy="rp-cardProperty-bedroomQuantity-txt">2</p>
      </a>
      <button data-cy="rp-cardProperty-phone-btn">Telefone</button>
    </li>
    <li data-cy="rp-property-cd">
      <a role="button" href="/imovel/2">
        <p data-cy="rp-cardProperty-street-txt">Rua Sorocaba</p>
      </a>
    </li>
    <li data-cy="rp-property-cd">
      <a role="button" href="/imovel/3">
        <p data-cy="rp-cardProperty-street-txt">Rua São Clemente</p>
      </a>
    </li>
  </ul>
  <div data-cy="contact-dialog">
    <h2 class="ListingInfoSection-module__3f6Rqq__title">Imobiliária Sol</h2>
  </div>
</body></html>
"#;

const HANG: Duration = Duration::from_secs(60);

/// How the scripted page misbehaves
#[derive(Debug, Clone, Copy, Default)]
struct Script {
    fail_navigation: bool,
    fail_count: bool,
    /// Browser dies on this (1-based) `href` read
    close_on_href_read: Option<usize>,
    hang_street: bool,
    hang_keys: bool,
}

/// A saved page that follows a [`Script`]
struct ScriptedPage {
    inner: SnapshotPage,
    script: Script,
    href_reads: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl ScriptedPage {
    fn new(script: Script) -> Self {
        Self {
            inner: SnapshotPage::new(PAGE),
            script,
            href_reads: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn targets(locator: &Locator, selector: &str) -> bool {
    locator
        .steps()
        .last()
        .is_some_and(|step| step.selector == selector)
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<(), PageError> {
        if self.script.fail_navigation {
            return Err(PageError::Timeout(timeout));
        }
        self.inner.navigate(url, wait_until, timeout).await
    }

    async fn count(&self, locator: &Locator) -> Result<usize, PageError> {
        if self.script.fail_count {
            return Err(PageError::Browser("target crashed".into()));
        }
        self.inner.count(locator).await
    }

    async fn inner_text(&self, locator: &Locator) -> Result<String, PageError> {
        if self.script.hang_street && targets(locator, STREET_TEXT) {
            tokio::time::sleep(HANG).await;
        }
        self.inner.inner_text(locator).await
    }

    async fn all_inner_texts(&self, locator: &Locator) -> Result<Vec<String>, PageError> {
        self.inner.all_inner_texts(locator).await
    }

    async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        if name == "href" {
            let read = self.href_reads.fetch_add(1, Ordering::SeqCst) + 1;
            if self.script.close_on_href_read == Some(read) {
                return Err(PageError::Closed);
            }
        }
        self.inner.attribute(locator, name).await
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, PageError> {
        self.inner.is_visible(locator).await
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), PageError> {
        self.inner.scroll_into_view(locator).await
    }

    async fn click(&self, locator: &Locator) -> Result<(), PageError> {
        self.inner.click(locator).await
    }

    async fn press_key(&self, key: &str) -> Result<(), PageError> {
        if self.script.hang_keys {
            tokio::time::sleep(HANG).await;
        }
        self.inner.press_key(key).await
    }

    async fn content(&self) -> Result<String, PageError> {
        self.inner.content().await
    }
}

#[async_trait]
impl PageSession for ScriptedPage {
    async fn close(self: Box<Self>) -> Result<(), PageError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens scripted pages and counts how many get closed
struct ScriptedSessions {
    script: Script,
    opened: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl ScriptedSessions {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            opened: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessions {
    async fn open(&self) -> Result<Box<dyn PageSession>, PageError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut page = ScriptedPage::new(self.script);
        page.closes = Arc::clone(&self.closes);
        Ok(Box::new(page))
    }
}

fn reference() -> ReferenceProperty {
    serde_json::from_value(serde_json::json!({
        "id": 1,
        "dna_id": "DNA-1",
        "type": "apartamento",
        "street": "Rua Real Grandeza",
        "neighborhood": "Botafogo",
        "city": "Rio de Janeiro",
        "price": 500000,
        "active": true
    }))
    .unwrap()
}

async fn scrape(script: Script) -> (Arc<ScriptedSessions>, zap_scout::scrapers::PropertyScrape) {
    let sessions = ScriptedSessions::new(script);
    let scraper = ZapScraper::new(sessions.clone());
    let result = scraper.scrape_for(&reference()).await.unwrap();
    (sessions, result)
}

#[tokio::test(start_paused = true)]
async fn session_is_closed_after_a_full_page() {
    let (sessions, result) = scrape(Script::default()).await;

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.cards.len(), 3);
    assert_eq!(sessions.opened(), 1);
    assert_eq!(sessions.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_is_closed_when_navigation_fails() {
    let (sessions, result) = scrape(Script {
        fail_navigation: true,
        ..Script::default()
    })
    .await;

    assert!(matches!(result.outcome, ScrapeOutcome::PageError(_)));
    assert!(result.cards.is_empty());
    assert_eq!(sessions.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_is_closed_when_counting_cards_fails() {
    let (sessions, result) = scrape(Script {
        fail_count: true,
        ..Script::default()
    })
    .await;

    assert_eq!(
        result.outcome,
        ScrapeOutcome::PageError("browser error: target crashed".into())
    );
    assert!(result.cards.is_empty());
    assert_eq!(sessions.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn lost_page_keeps_cards_already_read() {
    let (sessions, result) = scrape(Script {
        close_on_href_read: Some(2),
        ..Script::default()
    })
    .await;

    assert_eq!(
        result.outcome,
        ScrapeOutcome::PageError("page session is closed".into())
    );
    assert_eq!(result.cards.len(), 1);
    assert_eq!(result.cards[0].href.as_deref(), Some("/imovel/1"));
    assert_eq!(sessions.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_field_empties_only_that_field() {
    let page = ScriptedPage::new(Script {
        hang_street: true,
        ..Script::default()
    });
    let timeouts = Timeouts::default();

    let started = Instant::now();
    let card = extract_card(&page, &Locator::css(RESULT_CARD).nth(0), &timeouts)
        .await
        .unwrap();

    assert_eq!(card.street_text, "");
    assert_eq!(card.href.as_deref(), Some("/imovel/1"));
    assert_eq!(card.location_text, "Botafogo, Rio de Janeiro");
    assert_eq!(card.price_number, "520000");
    assert_eq!(card.area_m2, Some(82));
    assert_eq!(card.bedrooms, Some(2));
    assert_eq!(card.seller_name(), Some("Imobiliária Sol"));
    assert!(started.elapsed() < HANG);
}

#[tokio::test(start_paused = true)]
async fn stuck_escape_key_does_not_stall_the_card() {
    let page = ScriptedPage::new(Script {
        hang_keys: true,
        ..Script::default()
    });

    let started = Instant::now();
    let card = extract_card(&page, &Locator::css(RESULT_CARD).nth(0), &Timeouts::default())
        .await
        .unwrap();

    assert!(matches!(card.variant, CardVariant::Standard { .. }));
    assert_eq!(card.seller_name(), Some("Imobiliária Sol"));
    assert!(started.elapsed() < Duration::from_secs(5));
}
