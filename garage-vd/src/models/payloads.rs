//! Normalized payload shapes
//!
//! Each data type is cached and merged in one of these shapes, whichever
//! provider produced it. They serialize to camelCase JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payloads can tell whether a provider actually returned anything useful
pub trait Payload: Serialize {
    fn is_empty(&self) -> bool;
}

/// Registration-level data (free vehicle enquiry, or the paid base package)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicData {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub fuel_type: Option<String>,
    pub engine_capacity: Option<i64>,
    pub colour: Option<String>,
    pub vin: Option<String>,
    pub tax_status: Option<String>,
    pub tax_due_date: Option<String>,
    pub mot_expiry_date: Option<String>,
}

impl Payload for BasicData {
    fn is_empty(&self) -> bool {
        self.make.is_none() && self.model.is_none() && self.year.is_none()
    }
}

impl From<TechnicalData> for BasicData {
    fn from(tech: TechnicalData) -> Self {
        Self {
            make: tech.make,
            model: tech.model,
            year: tech.year,
            fuel_type: tech.fuel_type,
            engine_capacity: tech.engine_capacity,
            colour: tech.colour,
            vin: tech.vin,
            ..Default::default()
        }
    }
}

/// One `{name, value}` specification pair from a technical lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecItem {
    pub name: String,
    pub value: String,
}

impl SpecItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Tyre fitment for one axle position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TyreFitment {
    /// "front" or "rear"
    pub position: String,
    pub size: Option<String>,
    pub pressure: Option<String>,
}

/// Technical / specification payload from the paid multi-package provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TechnicalData {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub fuel_type: Option<String>,
    pub derivative: Option<String>,
    pub vin: Option<String>,
    pub colour: Option<String>,
    pub engine_capacity: Option<i64>,
    pub power_bhp: Option<f64>,
    pub torque_nm: Option<f64>,
    pub fuel_economy_mpg: Option<f64>,
    pub co2_emissions: Option<f64>,
    pub euro_status: Option<String>,
    pub engine_code: Option<String>,
    pub radio_code: Option<String>,
    pub image_url: Option<String>,
    pub image_expiry: Option<String>,
    pub tyres: Vec<TyreFitment>,
    pub specifications: Vec<SpecItem>,
    /// MOT history block, present only for the MOT package
    pub mot_history: Option<Value>,
}

impl TechnicalData {
    /// Combine two partial responses for the same vehicle
    ///
    /// Scalars keep the first non-null value (`self` wins); list-valued
    /// fields are appended.
    pub fn merge(self, other: TechnicalData) -> TechnicalData {
        let mut tyres = self.tyres;
        tyres.extend(other.tyres);
        let mut specifications = self.specifications;
        specifications.extend(other.specifications);

        TechnicalData {
            make: self.make.or(other.make),
            model: self.model.or(other.model),
            year: self.year.or(other.year),
            fuel_type: self.fuel_type.or(other.fuel_type),
            derivative: self.derivative.or(other.derivative),
            vin: self.vin.or(other.vin),
            colour: self.colour.or(other.colour),
            engine_capacity: self.engine_capacity.or(other.engine_capacity),
            power_bhp: self.power_bhp.or(other.power_bhp),
            torque_nm: self.torque_nm.or(other.torque_nm),
            fuel_economy_mpg: self.fuel_economy_mpg.or(other.fuel_economy_mpg),
            co2_emissions: self.co2_emissions.or(other.co2_emissions),
            euro_status: self.euro_status.or(other.euro_status),
            engine_code: self.engine_code.or(other.engine_code),
            radio_code: self.radio_code.or(other.radio_code),
            image_url: self.image_url.or(other.image_url),
            image_expiry: self.image_expiry.or(other.image_expiry),
            tyres,
            specifications,
            mot_history: self.mot_history.or(other.mot_history),
        }
    }
}

impl Payload for TechnicalData {
    fn is_empty(&self) -> bool {
        self.make.is_none()
            && self.model.is_none()
            && self.specifications.is_empty()
            && self.tyres.is_empty()
            && self.image_url.is_none()
            && self.mot_history.is_none()
    }
}

/// Vehicle image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageData {
    pub image_url: Option<String>,
    pub image_expiry: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
}

impl From<TechnicalData> for ImageData {
    fn from(tech: TechnicalData) -> Self {
        Self {
            image_url: tech.image_url,
            image_expiry: tech.image_expiry,
            make: tech.make,
            model: tech.model,
        }
    }
}

impl Payload for ImageData {
    fn is_empty(&self) -> bool {
        self.image_url.is_none()
    }
}

/// MOT history, kept in the provider's own format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MotData {
    /// Provider that produced `history`
    pub format: String,
    pub mot_expiry_date: Option<String>,
    pub history: Value,
}

impl MotData {
    /// Wrap a DVSA MOT history response
    ///
    /// The latest test comes first in `motTests`; its `expiryDate` is the
    /// current MOT expiry.
    pub fn from_dvsa(history: Value) -> Self {
        let mot_expiry_date = history
            .get("motTests")
            .and_then(Value::as_array)
            .and_then(|tests| {
                tests
                    .iter()
                    .find_map(|t| t.get("expiryDate").and_then(Value::as_str))
            })
            .map(str::to_string)
            .or_else(|| {
                history
                    .get("motTestDueDate")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });

        Self {
            format: "DVSA".to_string(),
            mot_expiry_date,
            history,
        }
    }

    /// Wrap the MOT block of a paid-provider lookup
    pub fn from_vdg(tech: TechnicalData) -> Self {
        let history = tech.mot_history.unwrap_or(Value::Null);
        let mot_expiry_date = history
            .get("MotDueDate")
            .or_else(|| history.get("motExpiryDate"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            format: "VDG".to_string(),
            mot_expiry_date,
            history,
        }
    }
}

impl Payload for MotData {
    fn is_empty(&self) -> bool {
        json_is_empty(&self.history)
    }
}

/// Specialist technical / service data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceData {
    pub engine_code: Option<String>,
    pub radio_code: Option<String>,
    pub service_data: Option<Value>,
}

impl Payload for ServiceData {
    fn is_empty(&self) -> bool {
        self.engine_code.is_none()
            && self.radio_code.is_none()
            && self.service_data.as_ref().map_or(true, json_is_empty)
    }
}

impl Payload for Value {
    fn is_empty(&self) -> bool {
        json_is_empty(self)
    }
}

/// Null, empty object and empty array count as "no data"
pub fn json_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
