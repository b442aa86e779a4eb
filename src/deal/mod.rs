//! Deal assumptions and deal sheet loading

mod data;
pub mod loader;

pub use data::{AssumptionPatch, Deal, DealAssumptions, MAX_TERM_YEARS};
pub use loader::{load_deals, load_deals_from_reader, load_sample_deals};
