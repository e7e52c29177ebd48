use crate::models::ReferenceProperty;
use crate::scrapers::types::PropertyScrape;
use anyhow::Result;
use async_trait::async_trait;

/// A classifieds site searched for re-advertisements of a reference property
#[async_trait]
pub trait ListingScraper: Send + Sync {
    /// Scrape the site's results for one property.
    ///
    /// Page trouble is reported in [`PropertyScrape::outcome`]; `Err` means
    /// no page could be opened at all.
    async fn scrape_for(&self, property: &ReferenceProperty) -> Result<PropertyScrape>;

    /// Get the name of the scraper source
    fn source_name(&self) -> &'static str;
}
