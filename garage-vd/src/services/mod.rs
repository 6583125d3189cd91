//! Business logic for vehicle data aggregation

pub mod aggregator;
pub mod completeness;
pub mod pricing;
pub mod record_builder;
pub mod spec_extractor;

pub use aggregator::{AggregatorSettings, VehicleDataAggregator};
pub use completeness::completeness_score;
pub use pricing::PriceList;
pub use spec_extractor::{extract_spec_fields, SpecFields};
