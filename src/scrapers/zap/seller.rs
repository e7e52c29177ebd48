//! Seller identity for one result card.
//!
//! A card comes in one of three layouts. The "phone" control opens a contact
//! dialog holding the seller's name and codes; the "see N listings" control
//! marks a card the site merged from several ads; some cards carry neither.
//! Every interaction failure here degrades to empty seller fields.

use crate::models::CardVariant;
use crate::scrapers::page::{bounded, Locator, PageDriver, Visibility, WaitOutcome};
use crate::scrapers::zap::selectors::{
    ADVERTISER_CODE_PREFIX, CONTACT_DIALOG, DEDUP_BUTTON, PHONE_BUTTON, SELLER_INFO_LINES,
    SELLER_TITLE, ZAP_CODE_PREFIX,
};
use crate::scrapers::zap::Timeouts;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid number regex"));

/// Which layout a card uses, from the controls that are visible on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardLayout {
    Standard,
    Deduplicated,
    Unknown,
}

impl CardLayout {
    /// The phone control wins when both are present
    pub fn classify(has_phone: bool, has_dedup: bool) -> Self {
        match (has_phone, has_dedup) {
            (true, _) => Self::Standard,
            (false, true) => Self::Deduplicated,
            (false, false) => Self::Unknown,
        }
    }
}

/// Codes found in the dialog's "label: value" lines
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SellerCodes {
    pub advertiser_code: Option<String>,
    pub zap_code: Option<String>,
}

pub fn parse_info_lines<S: AsRef<str>>(lines: &[S]) -> SellerCodes {
    let mut codes = SellerCodes::default();
    for line in lines {
        let trimmed = line.as_ref().trim();
        if let Some(rest) = trimmed.strip_prefix(ADVERTISER_CODE_PREFIX) {
            codes.advertiser_code = Some(rest.trim().to_string());
        }
        if let Some(rest) = trimmed.strip_prefix(ZAP_CODE_PREFIX) {
            codes.zap_code = Some(rest.trim().to_string());
        }
    }
    codes
}

/// "Ver os 2 anúncios deste imóvel" -> 2
pub fn parse_offers_count(label: &str) -> Option<u32> {
    FIRST_NUMBER
        .captures(label)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|count| *count > 0)
}

async fn has_control<D: PageDriver + ?Sized>(page: &D, control: &Locator, timeouts: &Timeouts) -> bool {
    bounded(timeouts.field_read, page.is_visible(control))
        .await
        .unwrap_or(false)
}

/// Classify `card` and resolve its seller fields
pub async fn extract_seller<D: PageDriver + ?Sized>(
    page: &D,
    card: &Locator,
    timeouts: &Timeouts,
) -> CardVariant {
    let phone = card.locate(PHONE_BUTTON);
    let dedup = card.locate(DEDUP_BUTTON);

    let has_phone = has_control(page, &phone, timeouts).await;
    let has_dedup = has_control(page, &dedup, timeouts).await;

    match CardLayout::classify(has_phone, has_dedup) {
        CardLayout::Standard => read_contact_dialog(page, &phone, timeouts).await,
        CardLayout::Deduplicated => {
            let label = bounded(timeouts.field_read, page.inner_text(&dedup))
                .await
                .unwrap_or_default();
            CardVariant::Deduplicated {
                offers_count: parse_offers_count(label.trim()),
            }
        }
        CardLayout::Unknown => CardVariant::Unknown,
    }
}

async fn read_contact_dialog<D: PageDriver + ?Sized>(
    page: &D,
    phone: &Locator,
    timeouts: &Timeouts,
) -> CardVariant {
    if let Err(e) = bounded(timeouts.field_read, page.scroll_into_view(phone)).await {
        debug!("Could not scroll phone button into view: {}", e);
    }
    if let Err(e) = bounded(timeouts.field_read, page.click(phone)).await {
        warn!("Phone button click failed: {}", e);
        return CardVariant::standard_unresolved();
    }

    let dialog = Locator::css(CONTACT_DIALOG).first();
    if page
        .wait_for(&dialog, Visibility::Visible, timeouts.contact_dialog)
        .await
        == WaitOutcome::TimedOut
    {
        warn!(
            "Contact dialog did not open within {:?}",
            timeouts.contact_dialog
        );
        return CardVariant::standard_unresolved();
    }

    let seller_name = bounded(timeouts.field_read, page.inner_text(&dialog.locate(SELLER_TITLE)))
        .await
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let lines = bounded(
        timeouts.field_read,
        page.all_inner_texts(&dialog.locate(SELLER_INFO_LINES)),
    )
    .await
    .unwrap_or_default();
    let codes = parse_info_lines(&lines);

    if let Err(e) = bounded(timeouts.dialog_close, page.press_key("Escape")).await {
        debug!("Escape did not reach the contact dialog: {}", e);
    }
    if page
        .wait_for(&dialog, Visibility::Hidden, timeouts.dialog_close)
        .await
        == WaitOutcome::TimedOut
    {
        debug!("Contact dialog still visible after Escape");
    }

    CardVariant::Standard {
        seller_name,
        advertiser_code: codes.advertiser_code,
        zap_code: codes.zap_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_control_takes_precedence() {
        assert_eq!(CardLayout::classify(true, true), CardLayout::Standard);
        assert_eq!(CardLayout::classify(true, false), CardLayout::Standard);
        assert_eq!(CardLayout::classify(false, true), CardLayout::Deduplicated);
        assert_eq!(CardLayout::classify(false, false), CardLayout::Unknown);
    }

    #[test]
    fn info_lines_yield_codes() {
        let codes = parse_info_lines(&[
            "  No anunciante: NBAP12462 ",
            "No Zap: 2830072830",
            "CRECI: 1234",
        ]);
        assert_eq!(codes.advertiser_code.as_deref(), Some("NBAP12462"));
        assert_eq!(codes.zap_code.as_deref(), Some("2830072830"));
    }

    #[test]
    fn info_line_prefixes_are_case_sensitive() {
        let codes = parse_info_lines(&["no anunciante: X", "NO ZAP: Y"]);
        assert_eq!(codes, SellerCodes::default());
    }

    #[test]
    fn offers_count_takes_first_number() {
        assert_eq!(parse_offers_count("Ver os 2 anúncios deste imóvel"), Some(2));
        assert_eq!(parse_offers_count("Ver 12 de 30"), Some(12));
        assert_eq!(parse_offers_count("Ver anúncios"), None);
        assert_eq!(parse_offers_count("Ver 0 anúncios"), None);
    }
}
