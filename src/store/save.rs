use crate::matching::{reconcile, Reconciled};
use crate::models::{ReferenceProperty, ZapCard};
use crate::store::rows::{AdvertiserUpsert, ListingUpsert, MatchInsert};
use crate::store::{ListingStore, ReferenceSource, StoreError};
use chrono::Utc;
use tracing::{error, info, warn};

/// What happened to the cards of one property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub saved: usize,
    /// Cards whose writes failed
    pub failed: usize,
    /// Cards that could not be scored
    pub unscored: usize,
    /// Cards without link or street
    pub skipped: usize,
}

async fn save_one(
    listings: &dyn ListingStore,
    property_row_id: i64,
    matched: &Reconciled<'_>,
    run_id: Option<i64>,
) -> Result<(), StoreError> {
    let card = matched.card;

    let advertiser_id = match card.seller_name() {
        Some(name) => {
            let advertiser = AdvertiserUpsert::for_seller(name, card.advertiser_code());
            Some(listings.upsert_advertiser(&advertiser).await?)
        }
        None => None,
    };

    let Some(listing) = ListingUpsert::from_card(card, advertiser_id, Utc::now()) else {
        return Ok(());
    };
    let listing_id = listings.upsert_listing(&listing).await?;

    if let Some(price) = listing.price {
        listings.insert_price(listing_id, price).await?;
    }

    listings
        .insert_match(&MatchInsert {
            dna_property_id: property_row_id,
            zap_listing_id: listing_id,
            run_id,
            record: matched.record.clone(),
        })
        .await
}

/// Score `cards` against `property` and write advertisers, listings, price
/// history and matches.
///
/// Only the property lookup can fail the call; each card's writes are
/// isolated and a failing card is logged and counted.
pub async fn save_results(
    reference: &dyn ReferenceSource,
    listings: &dyn ListingStore,
    property: &ReferenceProperty,
    cards: &[ZapCard],
    run_id: Option<i64>,
) -> Result<SaveSummary, StoreError> {
    let Some(row) = reference.property_by_dna_id(&property.dna_id).await? else {
        warn!(
            "Skipping persistence for DNA ID {}: not found in dna_properties",
            property.dna_id
        );
        return Ok(SaveSummary::default());
    };

    let reconciliation = reconcile(property, cards);
    let mut summary = SaveSummary {
        unscored: reconciliation.failures.len(),
        skipped: reconciliation.skipped,
        ..SaveSummary::default()
    };

    for matched in &reconciliation.matched {
        match save_one(listings, row.id, matched, run_id).await {
            Ok(()) => summary.saved += 1,
            Err(e) => {
                error!(
                    "Failed to save Zap card {:?} for DNA ID {}: {}",
                    matched.card.href, property.dna_id, e
                );
                summary.failed += 1;
            }
        }
    }

    info!(
        "Saved {} of {} cards for DNA ID {} ({} failed, {} unscored, {} skipped)",
        summary.saved,
        cards.len(),
        property.dna_id,
        summary.failed,
        summary.unscored,
        summary.skipped
    );

    Ok(summary)
}
