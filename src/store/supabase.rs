//! Supabase (PostgREST) backend for reference data, results and bookkeeping.

use crate::models::{JobStatus, ReferenceProperty, RunStatus};
use crate::store::rows::{AdvertiserUpsert, ListingUpsert, MatchInsert, PriceInsert};
use crate::store::{ListingStore, ReferenceSource, RunLedger, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DNA_PROPERTIES: &str = "dna_properties";
const ADVERTISERS: &str = "advertisers";
const ZAP_LISTINGS: &str = "zap_listings";
const ZAP_LISTING_PRICES: &str = "zap_listing_prices";
const PROPERTY_MATCHES: &str = "property_matches";
const SCRAPE_RUNS: &str = "scrape_runs";
const PROPERTY_SCRAPE_JOBS: &str = "property_scrape_jobs";

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: Response, table: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::UnexpectedStatus {
            status: status.as_u16(),
            table: table.to_string(),
            body,
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = self.request(Method::GET, table).query(query).send().await?;
        let response = Self::check(response, table).await?;
        Ok(response.json().await?)
    }

    /// Insert (or upsert on `on_conflict`) and return the row id
    async fn insert_returning_id<B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
        on_conflict: Option<&str>,
    ) -> Result<i64, StoreError> {
        let mut query = vec![("select", "id".to_string())];
        let mut prefer = String::from("return=representation");
        if let Some(column) = on_conflict {
            query.push(("on_conflict", column.to_string()));
            prefer.push_str(",resolution=merge-duplicates");
        }

        let response = self
            .request(Method::POST, table)
            .query(&query)
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await?;
        let rows: Vec<IdRow> = Self::check(response, table).await?.json().await?;

        rows.first()
            .map(|row| row.id)
            .ok_or_else(|| StoreError::EmptyResponse {
                table: table.to_string(),
            })
    }

    async fn insert<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(response, table).await?;
        Ok(())
    }

    async fn update<B: Serialize + ?Sized>(
        &self,
        table: &str,
        id: i64,
        body: &B,
    ) -> Result<(), StoreError> {
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", format!("eq.{id}"))])
            .json(body)
            .send()
            .await?;
        Self::check(response, table).await?;
        debug!("Updated {} #{}", table, id);
        Ok(())
    }
}

#[async_trait]
impl ReferenceSource for SupabaseStore {
    async fn active_properties(&self, limit: usize) -> Result<Vec<ReferenceProperty>, StoreError> {
        self.select(
            DNA_PROPERTIES,
            &[
                ("select", "*".to_string()),
                ("active", "eq.true".to_string()),
                ("order", "id.asc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn property_by_dna_id(
        &self,
        dna_id: &str,
    ) -> Result<Option<ReferenceProperty>, StoreError> {
        let rows: Vec<ReferenceProperty> = self
            .select(
                DNA_PROPERTIES,
                &[
                    ("select", "*".to_string()),
                    ("dna_id", format!("eq.{dna_id}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl ListingStore for SupabaseStore {
    async fn upsert_advertiser(&self, advertiser: &AdvertiserUpsert) -> Result<i64, StoreError> {
        self.insert_returning_id(ADVERTISERS, advertiser, Some("normalized_name"))
            .await
    }

    async fn upsert_listing(&self, listing: &ListingUpsert) -> Result<i64, StoreError> {
        self.insert_returning_id(ZAP_LISTINGS, listing, Some("url"))
            .await
    }

    async fn insert_price(&self, listing_id: i64, price: f64) -> Result<(), StoreError> {
        self.insert(
            ZAP_LISTING_PRICES,
            &PriceInsert {
                zap_listing_id: listing_id,
                price,
            },
        )
        .await
    }

    async fn insert_match(&self, record: &MatchInsert) -> Result<(), StoreError> {
        self.insert(PROPERTY_MATCHES, record).await
    }
}

#[async_trait]
impl RunLedger for SupabaseStore {
    async fn start_run(&self, total_properties: usize) -> Result<i64, StoreError> {
        let body = json!({
            "status": RunStatus::Running,
            "total_properties": total_properties,
            "processed_count": 0,
            "notes": format!("Batch run ({total_properties} properties)"),
        });
        self.insert_returning_id(SCRAPE_RUNS, &body, None).await
    }

    async fn start_job(&self, run_id: i64, property_id: i64) -> Result<i64, StoreError> {
        let body = json!({
            "run_id": run_id,
            "dna_property_id": property_id,
            "status": JobStatus::Running,
            "attempts": 1,
            "started_at": Utc::now(),
        });
        self.insert_returning_id(PROPERTY_SCRAPE_JOBS, &body, None)
            .await
    }

    async fn finish_job(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut body = json!({
            "status": status,
            "finished_at": Utc::now(),
        });
        if let Some(message) = error_message {
            body["error_message"] = json!(message);
        }
        self.update(PROPERTY_SCRAPE_JOBS, job_id, &body).await
    }

    async fn mark_property(&self, property_id: i64, status: JobStatus) -> Result<(), StoreError> {
        let body = json!({
            "last_scraped_at": Utc::now(),
            "last_scrape_status": status,
        });
        self.update(DNA_PROPERTIES, property_id, &body).await
    }

    async fn record_progress(&self, run_id: i64, processed: usize) -> Result<(), StoreError> {
        self.update(SCRAPE_RUNS, run_id, &json!({ "processed_count": processed }))
            .await
    }

    async fn finish_run(&self, run_id: i64) -> Result<(), StoreError> {
        let body = json!({
            "status": RunStatus::Finished,
            "finished_at": Utc::now(),
        });
        self.update(SCRAPE_RUNS, run_id, &body).await
    }
}
