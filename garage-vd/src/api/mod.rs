//! HTTP API handlers for garage-vd

pub mod health;
pub mod settings;
pub mod usage;
pub mod vehicle_data;

pub use health::health_routes;
pub use settings::settings_routes;
pub use usage::usage_routes;
pub use vehicle_data::vehicle_data_routes;
