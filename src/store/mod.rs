//! Seams to the reference data source and the results database.
//!
//! Handles are built once per batch run and passed in explicitly; nothing
//! here is process-global.

pub mod local;
pub mod rows;
pub mod save;
pub mod supabase;

pub use local::LocalStore;
pub use rows::{AdvertiserUpsert, ListingUpsert, MatchInsert};
pub use save::{save_results, SaveSummary};
pub use supabase::SupabaseStore;

use crate::models::{JobStatus, ReferenceProperty};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {table}: {body}")]
    UnexpectedStatus {
        status: u16,
        table: String,
        body: String,
    },

    #[error("{table} returned no row")]
    EmptyResponse { table: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{table} has no row with id {id}")]
    MissingRow { table: &'static str, id: i64 },
}

/// Source of truth for reference properties
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Active properties ordered by id, at most `limit`
    async fn active_properties(&self, limit: usize) -> Result<Vec<ReferenceProperty>, StoreError>;

    async fn property_by_dna_id(&self, dna_id: &str)
        -> Result<Option<ReferenceProperty>, StoreError>;
}

/// Advertisers, external listings, their price history and matches
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Keyed by normalized name; returns the advertiser id
    async fn upsert_advertiser(&self, advertiser: &AdvertiserUpsert) -> Result<i64, StoreError>;

    /// Keyed by URL; returns the listing id
    async fn upsert_listing(&self, listing: &ListingUpsert) -> Result<i64, StoreError>;

    async fn insert_price(&self, listing_id: i64, price: f64) -> Result<(), StoreError>;

    async fn insert_match(&self, record: &MatchInsert) -> Result<(), StoreError>;
}

/// Run and per-property job bookkeeping
#[async_trait]
pub trait RunLedger: Send + Sync {
    async fn start_run(&self, total_properties: usize) -> Result<i64, StoreError>;

    async fn start_job(&self, run_id: i64, property_id: i64) -> Result<i64, StoreError>;

    async fn finish_job(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Stamp `last_scraped_at` / `last_scrape_status` on the property
    async fn mark_property(&self, property_id: i64, status: JobStatus) -> Result<(), StoreError>;

    async fn record_progress(&self, run_id: i64, processed: usize) -> Result<(), StoreError>;

    async fn finish_run(&self, run_id: i64) -> Result<(), StoreError>;
}

/// The three handles one batch run works with
#[derive(Clone)]
pub struct Stores {
    pub reference: Arc<dyn ReferenceSource>,
    pub listings: Arc<dyn ListingStore>,
    pub ledger: Arc<dyn RunLedger>,
}

impl Stores {
    /// All three roles served by one backend
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ReferenceSource + ListingStore + RunLedger + 'static,
    {
        Self {
            reference: store.clone(),
            listings: store.clone(),
            ledger: store,
        }
    }
}
