use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zap_scout::config::{Cli, Command, StoreKind};
use zap_scout::matching::reconcile;
use zap_scout::models::ReferenceProperty;
use zap_scout::runner::run_batch;
use zap_scout::scrapers::zap::build_zap_url;
use zap_scout::scrapers::{ChromeLauncher, ListingScraper, SnapshotPage, ZapScraper};
use zap_scout::store::{LocalStore, Stores, SupabaseStore};

const SUPABASE_TIMEOUT: Duration = Duration::from_secs(30);

async fn open_stores(cli: &Cli) -> Result<Stores> {
    match cli.store {
        StoreKind::Supabase => {
            let url = cli
                .supabase_url
                .as_deref()
                .ok_or_else(|| anyhow!("SUPABASE_URL is not set"))?;
            let key = cli
                .supabase_service_key
                .as_deref()
                .ok_or_else(|| anyhow!("SUPABASE_SERVICE_KEY is not set"))?;
            let store = SupabaseStore::new(url, key, SUPABASE_TIMEOUT)
                .context("Failed to build Supabase client")?;
            Ok(Stores::shared(Arc::new(store)))
        }
        StoreKind::Local => {
            let store = LocalStore::from_file(&cli.properties_file)
                .await
                .with_context(|| {
                    format!("Failed to load {}", cli.properties_file.display())
                })?
                .with_output_dir(&cli.output_dir);
            Ok(Stores::shared(Arc::new(store)))
        }
    }
}

async fn find_property(stores: &Stores, dna_id: &str) -> Result<ReferenceProperty> {
    match stores.reference.property_by_dna_id(dna_id).await? {
        Some(property) => Ok(property),
        None => bail!("DNA ID {} not found", dna_id),
    }
}

async fn replay(cli: &Cli, stores: &Stores, html: &std::path::Path, dna_id: &str) -> Result<()> {
    let property = find_property(stores, dna_id).await?;
    let page = SnapshotPage::from_file(html).await?;
    let scraper = ZapScraper::new(Arc::new(page)).with_timeouts(cli.timeouts());

    let scrape = scraper.scrape_for(&property).await?;
    let reconciliation = reconcile(&property, &scrape.cards);

    info!(
        "✅ {} cards, {} scored, {} skipped",
        scrape.cards.len(),
        reconciliation.matched.len(),
        reconciliation.skipped
    );

    for (i, matched) in reconciliation.matched.iter().enumerate() {
        let card = matched.card;
        println!(
            "{}. {} (R$ {})",
            i + 1,
            card.street_text,
            card.price_number
        );
        println!(
            "   score {:.2}, price diff {:?}%",
            matched.record.similarity_score, matched.record.price_diff_pct
        );
        if let Some(seller) = card.seller_name() {
            println!("   Seller: {}", seller);
        }
        if let Some(count) = card.deduplicated_offers_count() {
            println!("   Offers: {}", count);
        }
        println!("   URL: {}", card.href.as_deref().unwrap_or_default());
        println!();
    }

    for failure in &reconciliation.failures {
        println!("Card {} not scored: {}", failure.index, failure.reason);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🏠 Zap Scout");
    info!("==========================================");

    let stores = open_stores(&cli).await?;

    match cli.command() {
        Command::Run => {
            let mut scraper = ZapScraper::new(Arc::new(ChromeLauncher::new(cli.headless)))
                .with_timeouts(cli.timeouts());
            if let Some(dir) = &cli.dump_html {
                scraper = scraper.with_html_dump(dir);
            }
            run_batch(&stores, &scraper, cli.limit).await?;
        }
        Command::Url { dna_id } => {
            let property = find_property(&stores, &dna_id).await?;
            println!("{}", build_zap_url(&property));
        }
        Command::Replay { html, dna_id } => {
            replay(&cli, &stores, &html, &dna_id).await?;
        }
    }

    Ok(())
}
