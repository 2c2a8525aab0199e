pub mod analysis;
pub mod api;
pub mod concurrent_fetcher;
pub mod errors;
pub mod models;
pub mod notification;
pub mod pipeline;
pub mod report;
pub mod ticker_source;
pub mod utils;

pub use errors::ScreenerError;
pub use models::Config;
pub use pipeline::{Pipeline, RunSummary};
