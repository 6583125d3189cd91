//! Normalized vehicle record (one per registration)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized vehicle record
///
/// Every attribute is optional: a record is created from whatever the first
/// lookup resolved and filled in by later ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub registration: String,
    pub vin: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub fuel_type: Option<String>,
    pub derivative: Option<String>,
    pub colour: Option<String>,
    pub engine_capacity_cc: Option<i64>,
    pub power_bhp: Option<f64>,
    pub torque_nm: Option<f64>,
    pub fuel_economy_mpg: Option<f64>,
    pub co2_emissions: Option<f64>,
    pub euro_status: Option<String>,
    pub image_url: Option<String>,
    pub image_expiry: Option<String>,
    pub engine_code: Option<String>,
    pub radio_code: Option<String>,
    pub tyre_size_front: Option<String>,
    pub tyre_size_rear: Option<String>,
    pub tyre_pressure_front: Option<String>,
    pub tyre_pressure_rear: Option<String>,
    pub service_interval: Option<String>,
    pub mot_expiry_date: Option<String>,
    pub tax_status: Option<String>,
    pub tax_due_date: Option<String>,
    pub technical_specs: Option<Value>,
    pub service_data: Option<Value>,
    /// Data type -> provider that supplied it
    pub data_sources: Map<String, Value>,
    pub last_update: Option<String>,
    pub completeness_score: u8,
}

impl VehicleRecord {
    pub fn new(registration: impl Into<String>) -> Self {
        Self {
            registration: registration.into(),
            ..Default::default()
        }
    }
}

/// Longest UK registration mark, spaces removed
pub const MAX_REGISTRATION_LEN: usize = 8;

/// Canonical registration form: uppercase, whitespace removed
///
/// Returns `None` unless the result is 1-8 ASCII alphanumerics.
pub fn normalize_registration(input: &str) -> Option<String> {
    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = !normalized.is_empty()
        && normalized.len() <= MAX_REGISTRATION_LEN
        && normalized.chars().all(|c| c.is_ascii_alphanumeric());

    valid.then_some(normalized)
}
