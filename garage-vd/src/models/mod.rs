//! Data models for garage-vd
//!
//! - Payload shapes cached per data type
//! - The normalized vehicle record
//! - Aggregation request/result and handler results

pub mod aggregation;
pub mod payloads;
pub mod vehicle;

pub use aggregation::{
    AggregationRequest, AggregationResult, HandlerResult, ProviderAttempt, SourceSummary,
};
pub use payloads::{
    BasicData, ImageData, MotData, Payload, ServiceData, SpecItem, TechnicalData, TyreFitment,
};
pub use vehicle::{normalize_registration, VehicleRecord};
