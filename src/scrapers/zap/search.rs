use crate::models::{ReferenceProperty, ZapCard};
use crate::scrapers::page::{
    bounded, Locator, PageDriver, PageError, SessionFactory, Visibility, WaitOutcome, WaitUntil,
};
use crate::scrapers::traits::ListingScraper;
use crate::scrapers::types::{PropertyScrape, ScrapeOutcome};
use crate::scrapers::zap::card::extract_card;
use crate::scrapers::zap::selectors::RESULT_CARD;
use crate::scrapers::zap::url::build_zap_url;
use crate::scrapers::zap::Timeouts;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Searches Zap Imóveis for one reference property at a time
pub struct ZapScraper {
    sessions: Arc<dyn SessionFactory>,
    timeouts: Timeouts,
    dump_dir: Option<PathBuf>,
}

impl ZapScraper {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions,
            timeouts: Timeouts::default(),
            dump_dir: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Save each results page as `<dir>/<dna_id>.html` for offline replay
    pub fn with_html_dump(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Visit every result card on `url` in page order, appending to `cards`
    pub async fn scrape_page<D: PageDriver + ?Sized>(
        &self,
        page: &D,
        property: &ReferenceProperty,
        url: &str,
        cards: &mut Vec<ZapCard>,
    ) -> Result<ScrapeOutcome, PageError> {
        bounded(
            self.timeouts.navigation,
            page.navigate(url, WaitUntil::DomContentLoaded, self.timeouts.navigation),
        )
        .await?;

        let results = Locator::css(RESULT_CARD);
        let first = results.clone().first();
        if page
            .wait_for(&first, Visibility::Visible, self.timeouts.first_card)
            .await
            == WaitOutcome::TimedOut
        {
            warn!("No cards found on Zap for DNA ID {}", property.dna_id);
            return Ok(ScrapeOutcome::NoCards);
        }

        self.dump_html(page, property).await;

        let count = bounded(self.timeouts.field_read, page.count(&results)).await?;
        debug!("Found {} result cards", count);

        for index in 0..count {
            let card = extract_card(page, &results.clone().nth(index), &self.timeouts).await?;
            debug!(
                "Card {}: href={:?} street='{}' price='{}'",
                index, card.href, card.street_text, card.price_number
            );
            cards.push(card);
        }

        Ok(ScrapeOutcome::Completed)
    }

    async fn dump_html<D: PageDriver + ?Sized>(&self, page: &D, property: &ReferenceProperty) {
        let Some(dir) = &self.dump_dir else {
            return;
        };

        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not capture page HTML: {}", e);
                return;
            }
        };

        let path = dir.join(format!("{}.html", property.dna_id));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, &html).await
        }
        .await;

        match written {
            Ok(()) => info!("Saved page HTML to {} ({} bytes)", path.display(), html.len()),
            Err(e) => warn!("Failed to save page HTML to {}: {}", path.display(), e),
        }
    }
}

#[async_trait]
impl ListingScraper for ZapScraper {
    async fn scrape_for(&self, property: &ReferenceProperty) -> Result<PropertyScrape> {
        let url = build_zap_url(property);
        info!("Opening Zap search for DNA ID {}: {}", property.dna_id, url);

        let session = self
            .sessions
            .open()
            .await
            .context("Failed to open browser session")?;

        let mut cards = Vec::new();
        let result = self.scrape_page(&*session, property, &url, &mut cards).await;

        // Released before the next property may open its own session
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        let outcome = result.unwrap_or_else(|e| {
            warn!("Error scraping Zap for DNA ID {}: {}", property.dna_id, e);
            ScrapeOutcome::PageError(e.to_string())
        });

        info!(
            "Found {} cards on Zap for DNA ID {}",
            cards.len(),
            property.dna_id
        );

        Ok(PropertyScrape { cards, outcome })
    }

    fn source_name(&self) -> &'static str {
        "Zap Imóveis"
    }
}
