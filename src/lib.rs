pub mod config;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod price;
pub mod runner;
pub mod scrapers;
pub mod store;
