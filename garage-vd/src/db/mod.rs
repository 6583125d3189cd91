//! Database access for garage-vd
//!
//! Tables are created by `garage_common::db`; these modules hold the
//! queries the aggregator and request handlers run against them.

pub mod cache;
pub mod settings;
pub mod usage;
pub mod vehicles;
