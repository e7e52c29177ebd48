//! Zap Imóveis: search URL, per-card extraction and the per-property scrape.

pub mod card;
pub mod search;
pub mod selectors;
pub mod seller;
pub mod url;

pub use card::extract_card;
pub use search::ZapScraper;
pub use seller::extract_seller;
pub use url::build_zap_url;

use std::time::Duration;

pub const BASE_URL: &str = "https://www.zapimoveis.com.br";

/// Bounded waits used while scraping one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub first_card: Duration,
    pub contact_dialog: Duration,
    pub dialog_close: Duration,
    /// Ceiling for any single read or visibility check on a card
    pub field_read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            first_card: Duration::from_secs(30),
            contact_dialog: Duration::from_secs(10),
            dialog_close: Duration::from_millis(500),
            field_read: Duration::from_secs(5),
        }
    }
}
