use crate::models::{ReferenceProperty, ZapCard};
use serde::{Deserialize, Serialize};

/// Highest room count the site's filters accept
pub const MAX_ROOM_FILTER: u32 = 4;

/// Fraction of the reference price searched above and below it
pub const PRICE_BAND: f64 = 0.2;

/// Search parameters derived from one reference property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    /// "apartamento", "casa", ...
    pub property_type: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
    /// Minimum price (R$)
    pub min_price: Option<i64>,
    /// Maximum price (R$)
    pub max_price: Option<i64>,
    /// Smallest bedroom count accepted; the filter runs up to [`MAX_ROOM_FILTER`]
    pub min_bedrooms: u32,
    pub min_bathrooms: u32,
    /// Minimum size in square meters
    pub min_sqm: Option<f64>,
    /// Maximum size in square meters
    pub max_sqm: Option<f64>,
}

impl SearchParams {
    pub fn for_property(property: &ReferenceProperty) -> Self {
        let band = |factor: f64| property.price.map(|p| (p * factor).round() as i64);

        Self {
            property_type: property.property_type.clone(),
            city: property.city.clone().unwrap_or_default(),
            neighborhood: property.neighborhood.clone().unwrap_or_default(),
            street: property.street.clone().unwrap_or_default(),
            min_price: band(1.0 - PRICE_BAND),
            max_price: band(1.0 + PRICE_BAND),
            min_bedrooms: property.bedrooms.unwrap_or(0).max(1),
            min_bathrooms: property.bathrooms.unwrap_or(0).max(1),
            // Exact area: the site matches on the advertised figure
            min_sqm: property.area_m2,
            max_sqm: property.area_m2,
        }
    }

    pub fn bedroom_range(&self) -> Vec<u32> {
        (self.min_bedrooms..=MAX_ROOM_FILTER).collect()
    }

    pub fn bathroom_range(&self) -> Vec<u32> {
        (self.min_bathrooms..=MAX_ROOM_FILTER).collect()
    }
}

pub const NO_CARDS_MESSAGE: &str = "no cards found";

/// How a property's results page went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Every card on the page was visited
    Completed,
    /// The results list never showed up
    NoCards,
    /// The page failed part-way; cards read before the failure are kept
    PageError(String),
}

impl ScrapeOutcome {
    /// What the job records when the property counts as failed
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Completed => None,
            Self::NoCards => Some(NO_CARDS_MESSAGE),
            Self::PageError(message) => Some(message),
        }
    }
}

/// Cards scraped for one reference property, in page order
#[derive(Debug, Clone)]
pub struct PropertyScrape {
    pub cards: Vec<ZapCard>,
    pub outcome: ScrapeOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_pages_count_as_success() {
        assert_eq!(ScrapeOutcome::Completed.error_message(), None);
        assert_eq!(ScrapeOutcome::NoCards.error_message(), Some("no cards found"));
        assert_eq!(
            ScrapeOutcome::PageError("navigation timed out".into()).error_message(),
            Some("navigation timed out")
        );
    }
}
