//! File-backed store for running without a database.
//!
//! Reference properties come from a JSON array on disk; everything the run
//! writes is kept in memory and dumped as pretty JSON when the run finishes.

use crate::models::{JobStatus, ReferenceProperty, RunStatus};
use crate::store::rows::{AdvertiserUpsert, ListingUpsert, MatchInsert, PriceInsert};
use crate::store::{ListingStore, ReferenceSource, RunLedger, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stored<T> {
    pub id: i64,
    #[serde(flatten)]
    pub row: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRow {
    #[serde(flatten)]
    pub price: PriceInsert,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRow {
    pub status: RunStatus,
    pub total_properties: usize,
    pub processed_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRow {
    pub run_id: i64,
    pub dna_property_id: i64,
    pub status: JobStatus,
    pub attempts: u32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Everything a [`LocalStore`] holds
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalSnapshot {
    pub properties: Vec<ReferenceProperty>,
    pub advertisers: Vec<Stored<AdvertiserUpsert>>,
    pub listings: Vec<Stored<ListingUpsert>>,
    pub prices: Vec<Stored<PriceRow>>,
    pub matches: Vec<Stored<MatchInsert>>,
    pub runs: Vec<Stored<RunRow>>,
    pub jobs: Vec<Stored<JobRow>>,
    next_id: i64,
}

impl LocalSnapshot {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn find_mut<'a, T>(
    rows: &'a mut [Stored<T>],
    id: i64,
    table: &'static str,
) -> Result<&'a mut T, StoreError> {
    rows.iter_mut()
        .find(|r| r.id == id)
        .map(|r| &mut r.row)
        .ok_or(StoreError::MissingRow { table, id })
}

pub struct LocalStore {
    state: Mutex<LocalSnapshot>,
    output_dir: Option<PathBuf>,
}

impl LocalStore {
    pub fn new(properties: Vec<ReferenceProperty>) -> Self {
        Self {
            state: Mutex::new(LocalSnapshot {
                properties,
                ..LocalSnapshot::default()
            }),
            output_dir: None,
        }
    }

    /// Load reference properties from a JSON array file
    pub async fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let properties: Vec<ReferenceProperty> = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} reference properties from {}",
            properties.len(),
            path.display()
        );
        Ok(Self::new(properties))
    }

    /// Write `run_<id>.json` into `dir` when a run finishes
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, LocalSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> LocalSnapshot {
        self.lock().clone()
    }

    async fn flush(&self, run_id: i64) -> Result<(), StoreError> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.snapshot())?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("run_{run_id}.json"));
        tokio::fs::write(&path, json).await?;
        info!("💾 Saved run results to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl ReferenceSource for LocalStore {
    async fn active_properties(&self, limit: usize) -> Result<Vec<ReferenceProperty>, StoreError> {
        let mut active: Vec<_> = self
            .lock()
            .properties
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect();
        active.sort_by_key(|p| p.id);
        active.truncate(limit);
        Ok(active)
    }

    async fn property_by_dna_id(
        &self,
        dna_id: &str,
    ) -> Result<Option<ReferenceProperty>, StoreError> {
        Ok(self
            .lock()
            .properties
            .iter()
            .find(|p| p.dna_id == dna_id)
            .cloned())
    }
}

#[async_trait]
impl ListingStore for LocalStore {
    async fn upsert_advertiser(&self, advertiser: &AdvertiserUpsert) -> Result<i64, StoreError> {
        let mut state = self.lock();
        if let Some(existing) = state
            .advertisers
            .iter_mut()
            .find(|a| a.row.normalized_name == advertiser.normalized_name)
        {
            existing.row = advertiser.clone();
            return Ok(existing.id);
        }
        let id = state.next_id();
        state.advertisers.push(Stored {
            id,
            row: advertiser.clone(),
        });
        Ok(id)
    }

    async fn upsert_listing(&self, listing: &ListingUpsert) -> Result<i64, StoreError> {
        let mut state = self.lock();
        if let Some(existing) = state.listings.iter_mut().find(|l| l.row.url == listing.url) {
            existing.row = listing.clone();
            return Ok(existing.id);
        }
        let id = state.next_id();
        state.listings.push(Stored {
            id,
            row: listing.clone(),
        });
        Ok(id)
    }

    async fn insert_price(&self, listing_id: i64, price: f64) -> Result<(), StoreError> {
        let mut state = self.lock();
        let id = state.next_id();
        state.prices.push(Stored {
            id,
            row: PriceRow {
                price: PriceInsert {
                    zap_listing_id: listing_id,
                    price,
                },
                recorded_at: Utc::now(),
            },
        });
        Ok(())
    }

    async fn insert_match(&self, record: &MatchInsert) -> Result<(), StoreError> {
        let mut state = self.lock();
        let id = state.next_id();
        state.matches.push(Stored {
            id,
            row: record.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl RunLedger for LocalStore {
    async fn start_run(&self, total_properties: usize) -> Result<i64, StoreError> {
        let mut state = self.lock();
        let id = state.next_id();
        state.runs.push(Stored {
            id,
            row: RunRow {
                status: RunStatus::Running,
                total_properties,
                processed_count: 0,
                started_at: Utc::now(),
                finished_at: None,
            },
        });
        Ok(id)
    }

    async fn start_job(&self, run_id: i64, property_id: i64) -> Result<i64, StoreError> {
        let mut state = self.lock();
        let id = state.next_id();
        state.jobs.push(Stored {
            id,
            row: JobRow {
                run_id,
                dna_property_id: property_id,
                status: JobStatus::Running,
                attempts: 1,
                error_message: None,
                started_at: Utc::now(),
                finished_at: None,
            },
        });
        Ok(id)
    }

    async fn finish_job(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let job = find_mut(&mut state.jobs, job_id, "property_scrape_jobs")?;
        job.status = status;
        job.error_message = error_message.map(str::to_owned);
        job.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_property(&self, property_id: i64, status: JobStatus) -> Result<(), StoreError> {
        let mut state = self.lock();
        let property = state
            .properties
            .iter_mut()
            .find(|p| p.id == property_id)
            .ok_or(StoreError::MissingRow {
                table: "dna_properties",
                id: property_id,
            })?;
        property.last_scraped_at = Some(Utc::now());
        property.last_scrape_status = Some(status);
        Ok(())
    }

    async fn record_progress(&self, run_id: i64, processed: usize) -> Result<(), StoreError> {
        let mut state = self.lock();
        find_mut(&mut state.runs, run_id, "scrape_runs")?.processed_count = processed;
        Ok(())
    }

    async fn finish_run(&self, run_id: i64) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            let run = find_mut(&mut state.runs, run_id, "scrape_runs")?;
            run.status = RunStatus::Finished;
            run.finished_at = Some(Utc::now());
        }
        self.flush(run_id).await
    }
}
