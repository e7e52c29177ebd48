//! Batch run: every active reference property, one after another.

use crate::models::{JobStatus, ReferenceProperty};
use crate::scrapers::ListingScraper;
use crate::store::{save_results, SaveSummary, Stores};
use anyhow::{Context, Result};
use tracing::{error, info, warn};

/// Totals for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub run_id: Option<i64>,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cards_seen: usize,
    pub matches_saved: usize,
}

/// Scrape, score and persist one property.
///
/// Returns the job error message, if any, and what was saved.
async fn process_property(
    stores: &Stores,
    scraper: &dyn ListingScraper,
    property: &ReferenceProperty,
    run_id: i64,
) -> (Option<String>, usize, SaveSummary) {
    let scrape = match scraper.scrape_for(property).await {
        Ok(scrape) => scrape,
        Err(e) => {
            error!("Scrape failed for DNA ID {}: {:#}", property.dna_id, e);
            return (Some(format!("{e:#}")), 0, SaveSummary::default());
        }
    };

    let mut message = scrape.outcome.error_message().map(str::to_owned);

    let summary = match save_results(
        stores.reference.as_ref(),
        stores.listings.as_ref(),
        property,
        &scrape.cards,
        Some(run_id),
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!("Failed to save results for DNA ID {}: {}", property.dna_id, e);
            message.get_or_insert_with(|| e.to_string());
            SaveSummary::default()
        }
    };

    (message, scrape.cards.len(), summary)
}

/// Run the pipeline over up to `limit` active properties.
///
/// Only loading the properties and opening the run are fatal; everything
/// after that is logged and the batch moves on.
pub async fn run_batch(
    stores: &Stores,
    scraper: &dyn ListingScraper,
    limit: usize,
) -> Result<BatchReport> {
    let properties = stores
        .reference
        .active_properties(limit)
        .await
        .context("Failed to fetch active reference properties")?;

    if properties.is_empty() {
        info!("No active properties to scrape");
        return Ok(BatchReport::default());
    }

    let run_id = stores
        .ledger
        .start_run(properties.len())
        .await
        .context("Failed to create scrape run")?;

    info!(
        "🏠 Run {} started: {} properties on {}",
        run_id,
        properties.len(),
        scraper.source_name()
    );

    let mut report = BatchReport {
        run_id: Some(run_id),
        ..BatchReport::default()
    };

    for (i, property) in properties.iter().enumerate() {
        info!(
            "[{}/{}] DNA ID {} ({})",
            i + 1,
            properties.len(),
            property.dna_id,
            property.title.as_deref().unwrap_or("untitled")
        );

        let job_id = match stores.ledger.start_job(run_id, property.id).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to create job for DNA ID {}: {}", property.dna_id, e);
                continue;
            }
        };

        let (message, cards, summary) = process_property(stores, scraper, property, run_id).await;
        report.cards_seen += cards;
        report.matches_saved += summary.saved;

        let status = if message.is_some() {
            report.failed += 1;
            JobStatus::Error
        } else {
            report.succeeded += 1;
            JobStatus::Success
        };

        if let Err(e) = stores
            .ledger
            .finish_job(job_id, status, message.as_deref())
            .await
        {
            warn!("Failed to update job {}: {}", job_id, e);
        }
        if let Err(e) = stores.ledger.mark_property(property.id, status).await {
            warn!("Failed to stamp DNA ID {}: {}", property.dna_id, e);
        }

        report.processed += 1;
        if let Err(e) = stores.ledger.record_progress(run_id, report.processed).await {
            warn!("Failed to record progress for run {}: {}", run_id, e);
        }
    }

    if let Err(e) = stores.ledger.finish_run(run_id).await {
        warn!("Failed to finish run {}: {}", run_id, e);
    }

    info!(
        "✅ Run {} finished: {} ok, {} failed, {} cards, {} matches saved",
        run_id, report.succeeded, report.failed, report.cards_seen, report.matches_saved
    );

    Ok(report)
}
