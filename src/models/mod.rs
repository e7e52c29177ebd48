use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::price::parse_price;

/// Outcome label stored on jobs and on the reference property after a scrape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
}

/// A property tracked internally (a `dna_properties` row).
///
/// Read-only to the matching pipeline; only the batch runner stamps the
/// `last_scraped_at` / `last_scrape_status` pair after an attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceProperty {
    pub id: i64,
    /// Stable identifier in the source of truth
    pub dna_id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// "apartamento", "casa", ...
    #[serde(rename = "type", default)]
    pub property_type: String,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub parking_spaces: Option<u32>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Listed price (R$)
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub url_dna: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_scraped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_scrape_status: Option<JobStatus>,
}

/// Seller identity resolved for one card.
///
/// The card layout decides which branch applies; seller fields only exist
/// on the standard layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum CardVariant {
    /// Card with a "phone" control; seller read from the contact dialog
    Standard {
        seller_name: Option<String>,
        advertiser_code: Option<String>,
        zap_code: Option<String>,
    },
    /// Card aggregating several ads of the same unit
    Deduplicated { offers_count: Option<u32> },
    Unknown,
}

impl CardVariant {
    /// Standard variant with nothing resolved (dialog never showed up)
    pub fn standard_unresolved() -> Self {
        Self::Standard {
            seller_name: None,
            advertiser_code: None,
            zap_code: None,
        }
    }
}

/// One search-result card scraped from the classifieds site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZapCard {
    pub href: Option<String>,
    pub title: Option<String>,
    pub location_text: String,
    pub street_text: String,
    /// Digits of the headline price, e.g. "520000"
    pub price_number: String,
    pub area_m2: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    #[serde(flatten)]
    pub variant: CardVariant,
}

impl ZapCard {
    /// Cards without a link or a street can't be persisted or compared
    pub fn is_valid_for_reconciliation(&self) -> bool {
        self.href.as_deref().is_some_and(|h| !h.is_empty()) && !self.street_text.is_empty()
    }

    pub fn price(&self) -> Option<f64> {
        parse_price(&self.price_number)
    }

    pub fn seller_name(&self) -> Option<&str> {
        match &self.variant {
            CardVariant::Standard { seller_name, .. } => seller_name.as_deref(),
            _ => None,
        }
    }

    pub fn advertiser_code(&self) -> Option<&str> {
        match &self.variant {
            CardVariant::Standard {
                advertiser_code, ..
            } => advertiser_code.as_deref(),
            _ => None,
        }
    }

    pub fn zap_code(&self) -> Option<&str> {
        match &self.variant {
            CardVariant::Standard { zap_code, .. } => zap_code.as_deref(),
            _ => None,
        }
    }

    pub fn is_deduplicated(&self) -> bool {
        matches!(self.variant, CardVariant::Deduplicated { .. })
    }

    pub fn deduplicated_offers_count(&self) -> Option<u32> {
        match self.variant {
            CardVariant::Deduplicated { offers_count } => offers_count,
            _ => None,
        }
    }
}

/// Raw values that produced a similarity score, kept for audits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchCriteria {
    pub dna_street: Option<String>,
    pub zap_street: String,
    #[serde(rename = "locationText")]
    pub location_text: String,
    pub dna_area_m2: Option<f64>,
    pub zap_area_m2: Option<u32>,
    pub area_diff_pct: Option<f64>,
    pub dna_bedrooms: Option<u32>,
    pub zap_bedrooms: Option<u32>,
    pub dna_bathrooms: Option<u32>,
    pub zap_bathrooms: Option<u32>,
}

/// Scored correspondence between a reference property and one card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationRecord {
    pub similarity_score: f64,
    pub price_diff_pct: Option<f64>,
    #[serde(rename = "within_10pct")]
    pub within_tolerance_pct: Option<bool>,
    #[serde(rename = "criteria_json")]
    pub criteria: MatchCriteria,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(href: Option<&str>, street: &str, variant: CardVariant) -> ZapCard {
        ZapCard {
            href: href.map(str::to_owned),
            title: None,
            location_text: String::new(),
            street_text: street.to_owned(),
            price_number: "450000".to_owned(),
            area_m2: None,
            bedrooms: None,
            bathrooms: None,
            variant,
        }
    }

    #[test]
    fn card_needs_link_and_street() {
        assert!(card(Some("/imovel/1"), "Rua A", CardVariant::Unknown).is_valid_for_reconciliation());
        assert!(!card(None, "Rua A", CardVariant::Unknown).is_valid_for_reconciliation());
        assert!(!card(Some(""), "Rua A", CardVariant::Unknown).is_valid_for_reconciliation());
        assert!(!card(Some("/imovel/1"), "", CardVariant::Unknown).is_valid_for_reconciliation());
    }

    #[test]
    fn deduplicated_card_has_no_seller() {
        let c = card(
            Some("/imovel/1"),
            "Rua A",
            CardVariant::Deduplicated {
                offers_count: Some(3),
            },
        );
        assert!(c.is_deduplicated());
        assert_eq!(c.deduplicated_offers_count(), Some(3));
        assert!(c.seller_name().is_none());
        assert!(c.advertiser_code().is_none());
        assert!(c.zap_code().is_none());
    }

    #[test]
    fn variant_serializes_flat_with_tag() {
        let c = card(
            Some("/imovel/1"),
            "Rua A",
            CardVariant::Standard {
                seller_name: Some("Imobiliária X".into()),
                advertiser_code: Some("NBAP12462".into()),
                zap_code: None,
            },
        );
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["variant"], "standard");
        assert_eq!(value["advertiser_code"], "NBAP12462");
        let back: ZapCard = serde_json::from_value(value).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn reference_property_reads_supabase_row() {
        let row = serde_json::json!({
            "id": 7,
            "dna_id": "DNA-123",
            "type": "apartamento",
            "area_m2": 80,
            "bedrooms": 2,
            "bathrooms": 1,
            "street": "Rua Real Grandeza",
            "neighborhood": "Botafogo",
            "city": "Rio de Janeiro",
            "price": 500000,
            "active": true,
            "last_scrape_status": null
        });
        let property: ReferenceProperty = serde_json::from_value(row).unwrap();
        assert_eq!(property.property_type, "apartamento");
        assert_eq!(property.area_m2, Some(80.0));
        assert!(property.last_scraped_at.is_none());
    }
}
