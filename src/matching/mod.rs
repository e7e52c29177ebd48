//! Similarity scoring and price comparison between a reference property and
//! the cards scraped for it.
//!
//! Points are counted in hundredths so the sum is exact before it is scaled
//! to `[0, 1]`:
//!
//! | signal | points |
//! |---|---|
//! | same normalized street | 40 |
//! | neighborhood inside the card's location text | 20 |
//! | area within 5% (within 10%) | 20 (10) |
//! | bedrooms equal (off by one) | 10 (5) |
//! | bathrooms equal (off by one) | 10 (5) |

use crate::models::{MatchCriteria, ReconciliationRecord, ReferenceProperty, ZapCard};
use crate::normalize::normalize_name;
use thiserror::Error;
use tracing::{debug, warn};

/// Largest absolute price difference still considered the same listing
pub const PRICE_TOLERANCE_PCT: f64 = 10.0;

const STREET_POINTS: u32 = 40;
const NEIGHBORHOOD_POINTS: u32 = 20;
const AREA_TIGHT_POINTS: u32 = 20;
const AREA_LOOSE_POINTS: u32 = 10;
const ROOM_EXACT_POINTS: u32 = 10;
const ROOM_NEAR_POINTS: u32 = 5;
const MAX_POINTS: u32 = 100;

const AREA_TIGHT_PCT: f64 = 5.0;
const AREA_LOOSE_PCT: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("reference {field} is not a usable number: {value}")]
    InvalidReference { field: &'static str, value: f64 },
}

/// A card paired with its score
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<'a> {
    pub card: &'a ZapCard,
    pub record: ReconciliationRecord,
}

/// A card that could not be scored; the rest of the batch is unaffected
#[derive(Debug, Clone, PartialEq)]
pub struct MatchFailure {
    /// Position of the card in the scraped list
    pub index: usize,
    pub href: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation<'a> {
    pub matched: Vec<Reconciled<'a>>,
    pub failures: Vec<MatchFailure>,
    /// Cards dropped for lacking a link or a street
    pub skipped: usize,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Signed percentage of the external price over the reference price.
///
/// `None` when either price is unknown or the reference price is not positive.
pub fn price_diff_pct(reference: Option<f64>, external: Option<f64>) -> Option<f64> {
    let reference = reference.filter(|p| *p > 0.0)?;
    let external = external.filter(|p| *p != 0.0)?;
    Some(round2((external - reference) / reference * 100.0))
}

pub fn within_tolerance(diff_pct: Option<f64>) -> Option<bool> {
    diff_pct.map(|d| d.abs() <= PRICE_TOLERANCE_PCT)
}

/// Relative area difference in percent, `None` unless both areas are known
pub fn area_diff_pct(reference: Option<f64>, external: Option<u32>) -> Option<f64> {
    let reference = reference.filter(|a| *a > 0.0)?;
    let external = f64::from(external.filter(|a| *a != 0)?);
    Some((external - reference).abs() / reference * 100.0)
}

fn room_points(reference: Option<u32>, external: Option<u32>) -> u32 {
    match (reference, external) {
        (Some(r), Some(e)) if r == e => ROOM_EXACT_POINTS,
        (Some(r), Some(e)) if r.abs_diff(e) == 1 => ROOM_NEAR_POINTS,
        _ => 0,
    }
}

fn area_points(diff_pct: Option<f64>) -> u32 {
    match diff_pct {
        Some(d) if d <= AREA_TIGHT_PCT => AREA_TIGHT_POINTS,
        Some(d) if d <= AREA_LOOSE_PCT => AREA_LOOSE_POINTS,
        _ => 0,
    }
}

/// Similarity in `[0, 1]`, independent of price
pub fn similarity_score(property: &ReferenceProperty, card: &ZapCard) -> f64 {
    let mut points = 0;

    let ref_street = normalize_name(property.street.as_deref());
    let card_street = normalize_name(Some(&card.street_text));
    if let (Some(a), Some(b)) = (&ref_street, &card_street) {
        if !a.is_empty() && a == b {
            points += STREET_POINTS;
        }
    }

    let neighborhood = normalize_name(property.neighborhood.as_deref());
    let location = normalize_name(Some(&card.location_text));
    if let (Some(n), Some(loc)) = (&neighborhood, &location) {
        if !n.is_empty() && loc.contains(n.as_str()) {
            points += NEIGHBORHOOD_POINTS;
        }
    }

    points += area_points(area_diff_pct(property.area_m2, card.area_m2));
    points += room_points(property.bedrooms, card.bedrooms);
    points += room_points(property.bathrooms, card.bathrooms);

    f64::from(points.min(MAX_POINTS)) / f64::from(MAX_POINTS)
}

fn check_reference(property: &ReferenceProperty) -> Result<(), MatchError> {
    for (field, value) in [("price", property.price), ("area_m2", property.area_m2)] {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(MatchError::InvalidReference { field, value: v });
            }
        }
    }
    Ok(())
}

/// Score one card against the reference property
pub fn score_card(
    property: &ReferenceProperty,
    card: &ZapCard,
) -> Result<ReconciliationRecord, MatchError> {
    check_reference(property)?;

    let price_diff = price_diff_pct(property.price, card.price());

    let criteria = MatchCriteria {
        dna_street: property.street.clone(),
        zap_street: card.street_text.clone(),
        location_text: card.location_text.clone(),
        dna_area_m2: property.area_m2,
        zap_area_m2: card.area_m2,
        area_diff_pct: area_diff_pct(property.area_m2, card.area_m2).map(round2),
        dna_bedrooms: property.bedrooms,
        zap_bedrooms: card.bedrooms,
        dna_bathrooms: property.bathrooms,
        zap_bathrooms: card.bathrooms,
    };

    Ok(ReconciliationRecord {
        similarity_score: similarity_score(property, card),
        price_diff_pct: price_diff,
        within_tolerance_pct: within_tolerance(price_diff),
        criteria,
    })
}

/// Score every usable card against `property`.
///
/// Cards lacking a link or a street are dropped silently. A card that fails
/// to score is reported in [`Reconciliation::failures`] and the rest proceed.
pub fn reconcile<'a>(property: &ReferenceProperty, cards: &'a [ZapCard]) -> Reconciliation<'a> {
    let mut outcome = Reconciliation::default();

    for (index, card) in cards.iter().enumerate() {
        if !card.is_valid_for_reconciliation() {
            outcome.skipped += 1;
            continue;
        }

        match score_card(property, card) {
            Ok(record) => {
                debug!(
                    "Card {} scored {:.2} (price diff {:?})",
                    index, record.similarity_score, record.price_diff_pct
                );
                outcome.matched.push(Reconciled { card, record });
            }
            Err(e) => {
                warn!(
                    "Failed to score card {} for DNA ID {}: {}",
                    index, property.dna_id, e
                );
                outcome.failures.push(MatchFailure {
                    index,
                    href: card.href.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome
}
