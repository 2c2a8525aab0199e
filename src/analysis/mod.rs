pub mod filters;
pub mod metrics;
pub mod sector_pe;

pub use filters::FilterEngine;
pub use metrics::derive_metrics;
pub use sector_pe::{calculate_sector_averages, sector_averages};
