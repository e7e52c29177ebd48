pub mod browser;
pub mod page;
pub mod snapshot;
pub mod traits;
pub mod types;
pub mod zap;

pub use browser::ChromeLauncher;
pub use page::{Locator, PageDriver, PageError, PageSession, SessionFactory};
pub use snapshot::SnapshotPage;
pub use traits::ListingScraper;
pub use types::{PropertyScrape, ScrapeOutcome, SearchParams};
pub use zap::ZapScraper;
