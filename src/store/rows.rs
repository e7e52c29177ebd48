use crate::models::{ReconciliationRecord, ZapCard};
use crate::normalize::normalize_name;
use crate::scrapers::zap::BASE_URL;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Advertisers whose normalized name contains this are our own agency
const OWN_AGENCY_MARKER: &str = "DNA IMOVEIS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvertiserUpsert {
    pub name: String,
    pub normalized_name: String,
    /// Advertiser code shown in the contact dialog
    pub creci: Option<String>,
    pub is_dna: bool,
}

impl AdvertiserUpsert {
    pub fn for_seller(name: &str, advertiser_code: Option<&str>) -> Self {
        let name = name.trim().to_string();
        let normalized_name = normalize_name(Some(&name)).unwrap_or_default();
        Self {
            is_dna: normalized_name.contains(OWN_AGENCY_MARKER),
            name,
            normalized_name,
            creci: advertiser_code.map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingUpsert {
    pub url: String,
    pub source_listing_id: Option<String>,
    pub title: Option<String>,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub price: Option<f64>,
    pub advertiser_id: Option<i64>,
    pub area_m2: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub last_seen_at: DateTime<Utc>,
}

/// Card links are usually site-relative
pub fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{BASE_URL}{href}")
    }
}

impl ListingUpsert {
    /// `None` for cards without a link
    pub fn from_card(card: &ZapCard, advertiser_id: Option<i64>, seen_at: DateTime<Utc>) -> Option<Self> {
        let href = card.href.as_deref().filter(|h| !h.is_empty())?;

        // Cards carry no neighborhood of their own; city mirrors it as the
        // existing listings table does.
        let neighborhood: Option<String> = None;

        Some(Self {
            url: absolute_url(href),
            source_listing_id: card.zap_code().map(str::to_owned),
            title: card.title.clone(),
            street: Some(card.street_text.clone()).filter(|s| !s.is_empty()),
            city: neighborhood.clone(),
            neighborhood,
            price: card.price(),
            advertiser_id,
            area_m2: card.area_m2,
            bedrooms: card.bedrooms,
            bathrooms: card.bathrooms,
            last_seen_at: seen_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceInsert {
    pub zap_listing_id: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchInsert {
    pub dna_property_id: i64,
    pub zap_listing_id: i64,
    pub run_id: Option<i64>,
    #[serde(flatten)]
    pub record: ReconciliationRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardVariant;

    #[test]
    fn relative_links_get_site_prefix() {
        assert_eq!(
            absolute_url("/imovel/venda-1"),
            "https://www.zapimoveis.com.br/imovel/venda-1"
        );
        assert_eq!(absolute_url("https://x.test/a"), "https://x.test/a");
    }

    #[test]
    fn own_agency_is_flagged() {
        let ours = AdvertiserUpsert::for_seller("  DNA Imóveis Ltda ", Some("NBAP1"));
        assert!(ours.is_dna);
        assert_eq!(ours.name, "DNA Imóveis Ltda");
        assert_eq!(ours.normalized_name, "DNA IMOVEIS LTDA");
        assert_eq!(ours.creci.as_deref(), Some("NBAP1"));

        assert!(!AdvertiserUpsert::for_seller("Outra Imobiliária", None).is_dna);
    }

    #[test]
    fn listing_row_from_card() {
        let card = ZapCard {
            href: Some("/imovel/1".into()),
            title: Some("Apto".into()),
            location_text: "Botafogo, Rio de Janeiro".into(),
            street_text: "Rua Real Grandeza".into(),
            price_number: "520000".into(),
            area_m2: Some(82),
            bedrooms: Some(2),
            bathrooms: Some(1),
            variant: CardVariant::Standard {
                seller_name: Some("X".into()),
                advertiser_code: None,
                zap_code: Some("2830072830".into()),
            },
        };
        let row = ListingUpsert::from_card(&card, Some(9), Utc::now()).unwrap();
        assert_eq!(row.url, "https://www.zapimoveis.com.br/imovel/1");
        assert_eq!(row.source_listing_id.as_deref(), Some("2830072830"));
        assert_eq!(row.price, Some(520_000.0));
        assert_eq!(row.advertiser_id, Some(9));
        assert_eq!(row.city, row.neighborhood);
    }
}
