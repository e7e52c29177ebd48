use crate::models::ZapCard;
use crate::price::price_digits;
use crate::scrapers::page::{bounded, Locator, PageDriver, PageError};
use crate::scrapers::zap::selectors::{
    AREA_TEXT, BATHROOMS_TEXT, BEDROOMS_TEXT, CARD_LINK, LOCATION_TEXT, PRICE_TEXT, STREET_TEXT,
};
use crate::scrapers::zap::seller::extract_seller;
use crate::scrapers::zap::Timeouts;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static AREA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*m²").expect("valid area regex"));
static COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("valid count regex"));

fn first_capture(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text).and_then(|caps| caps[1].parse().ok())
}

/// "82 m²" -> 82
pub fn parse_area(text: &str) -> Option<u32> {
    first_capture(&AREA, text)
}

/// "2 quartos" -> 2
pub fn parse_count(text: &str) -> Option<u32> {
    first_capture(&COUNT, text)
}

/// `Ok(None)` when the element is missing or slow; `Err` only once the page
/// itself is gone.
async fn read_text<D: PageDriver + ?Sized>(
    page: &D,
    locator: &Locator,
    timeouts: &Timeouts,
) -> Result<Option<String>, PageError> {
    match bounded(timeouts.field_read, page.inner_text(locator)).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.is_page_level() => Err(e),
        Err(e) => {
            debug!("No text at {}: {}", locator, e);
            Ok(None)
        }
    }
}

async fn read_attribute<D: PageDriver + ?Sized>(
    page: &D,
    locator: &Locator,
    name: &str,
    timeouts: &Timeouts,
) -> Result<Option<String>, PageError> {
    match bounded(timeouts.field_read, page.attribute(locator, name)).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_page_level() => Err(e),
        Err(e) => {
            debug!("No {} at {}: {}", name, locator, e);
            Ok(None)
        }
    }
}

/// Read every field of one result card.
///
/// Each read stands alone: a missing element or a timeout empties that field
/// and extraction moves on to the next one. Only a lost page is an error.
pub async fn extract_card<D: PageDriver + ?Sized>(
    page: &D,
    card: &Locator,
    timeouts: &Timeouts,
) -> Result<ZapCard, PageError> {
    let link = card.locate(CARD_LINK);
    let href = read_attribute(page, &link, "href", timeouts).await?;
    let title = read_attribute(page, &link, "title", timeouts).await?;

    let location_text = read_text(page, &card.locate(LOCATION_TEXT), timeouts)
        .await?
        .unwrap_or_default();
    let street_text = read_text(page, &card.locate(STREET_TEXT), timeouts)
        .await?
        .unwrap_or_default();
    let price_number = read_text(page, &card.locate(PRICE_TEXT), timeouts)
        .await?
        .map(|text| price_digits(&text))
        .unwrap_or_default();

    let variant = extract_seller(page, card, timeouts).await;

    let area_m2 = read_text(page, &card.locate(AREA_TEXT), timeouts)
        .await?
        .and_then(|text| parse_area(&text));
    let bedrooms = read_text(page, &card.locate(BEDROOMS_TEXT), timeouts)
        .await?
        .and_then(|text| parse_count(&text));
    let bathrooms = read_text(page, &card.locate(BATHROOMS_TEXT), timeouts)
        .await?
        .and_then(|text| parse_count(&text));

    Ok(ZapCard {
        href,
        title,
        location_text,
        street_text,
        price_number,
        area_m2,
        bedrooms,
        bathrooms,
        variant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_needs_square_meter_unit() {
        assert_eq!(parse_area("82 m²"), Some(82));
        assert_eq!(parse_area("Tamanho do imóvel 120m²"), Some(120));
        assert_eq!(parse_area("82"), None);
    }

    #[test]
    fn counts_take_first_digits() {
        assert_eq!(parse_count("Quantidade de quartos 3"), Some(3));
        assert_eq!(parse_count("2-3"), Some(2));
        assert_eq!(parse_count("—"), None);
    }
}
