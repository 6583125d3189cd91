//! Core Types for garage-vd
//!
//! Defines the vocabulary shared by the sources, the aggregator and the
//! persistence layer:
//! - **DataType:** logical category of vehicle attributes, fetched and cached independently
//! - **Provider:** external data source (free government APIs or paid vendors)
//! - **FetchStatus:** outcome recorded in the usage log for every attempt
//! - **Packages:** billable unit names of the paid providers

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Data Types
// ============================================================================

/// Logical category of vehicle data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Registration-level descriptive data (make, model, year, fuel, colour)
    Basic,
    /// Technical specification (power, torque, tyres, engine code)
    Technical,
    /// Stock vehicle image
    Image,
    /// MOT test history
    Mot,
    /// Service / workshop data
    Service,
    /// Full multi-package paid lookup
    Comprehensive,
}

impl DataType {
    /// Every data type, in canonical order
    pub const ALL: [DataType; 6] = [
        DataType::Basic,
        DataType::Technical,
        DataType::Image,
        DataType::Mot,
        DataType::Service,
        DataType::Comprehensive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Basic => "basic",
            DataType::Technical => "technical",
            DataType::Image => "image",
            DataType::Mot => "mot",
            DataType::Service => "service",
            DataType::Comprehensive => "comprehensive",
        }
    }

    /// Weight of this type in the completeness score (weights sum to 100)
    ///
    /// `Comprehensive` carries no weight of its own.
    pub fn completeness_weight(&self) -> u8 {
        match self {
            DataType::Basic => 30,
            DataType::Technical => 25,
            DataType::Image => 15,
            DataType::Mot => 20,
            DataType::Service => 10,
            DataType::Comprehensive => 0,
        }
    }

    /// How long a cached payload of this type stays valid
    pub fn default_cache_ttl(&self) -> Duration {
        match self {
            DataType::Basic => Duration::days(7),
            DataType::Technical => Duration::days(30),
            DataType::Comprehensive => Duration::days(30),
            // Vendor image URLs are signed and expire
            DataType::Image => Duration::days(7),
            DataType::Mot => Duration::days(1),
            DataType::Service => Duration::days(30),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(DataType::Basic),
            "technical" => Ok(DataType::Technical),
            "image" => Ok(DataType::Image),
            "mot" => Ok(DataType::Mot),
            "service" => Ok(DataType::Service),
            "comprehensive" => Ok(DataType::Comprehensive),
            other => Err(format!("unknown data type '{}'", other)),
        }
    }
}

// ============================================================================
// Providers
// ============================================================================

/// External vehicle data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    /// DVLA Vehicle Enquiry Service (free)
    Dvla,
    /// DVSA MOT History API (free)
    Dvsa,
    /// Paid multi-package vehicle data vendor
    Vdg,
    /// Specialist technical / workshop data vendor (paid)
    Sws,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Provider::Dvla, Provider::Dvsa, Provider::Vdg, Provider::Sws];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Dvla => "DVLA",
            Provider::Dvsa => "DVSA",
            Provider::Vdg => "VDG",
            Provider::Sws => "SWS",
        }
    }

    /// Free government APIs never incur a charge
    pub fn is_free(&self) -> bool {
        matches!(self, Provider::Dvla | Provider::Dvsa)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DVLA" => Ok(Provider::Dvla),
            "DVSA" => Ok(Provider::Dvsa),
            "VDG" => Ok(Provider::Vdg),
            "SWS" => Ok(Provider::Sws),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

// ============================================================================
// Fetch Status
// ============================================================================

/// Outcome of one fetch attempt, as recorded in the usage log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    /// Provider unreachable, non-2xx, or unparseable
    Error,
    /// Provider answered but had nothing for this registration
    NoData,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Success => "success",
            FetchStatus::Error => "error",
            FetchStatus::NoData => "no_data",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Packages
// ============================================================================

/// Billable package names
pub mod packages {
    /// DVLA vehicle enquiry (free)
    pub const VEHICLE_ENQUIRY: &str = "VehicleEnquiry";
    /// DVSA MOT history (free)
    pub const MOT_HISTORY: &str = "MotHistory";

    pub const VEHICLE_DETAILS: &str = "VehicleDetails";
    pub const VEHICLE_DETAILS_WITH_IMAGE: &str = "VehicleDetailsWithImage";
    pub const SPEC_AND_OPTION_DETAILS: &str = "SpecAndOptionDetails";
    pub const TYRE_DETAILS: &str = "TyreDetails";
    pub const MOT_HISTORY_DETAILS: &str = "MotHistoryDetails";

    /// Packages requested together by a comprehensive lookup
    pub const COMPREHENSIVE: [&str; 3] = [VEHICLE_DETAILS, SPEC_AND_OPTION_DETAILS, TYRE_DETAILS];

    /// SWS technical data lookup
    pub const TECHNICAL_DATA: &str = "TechnicalData";

    /// Package recorded against cache hits
    pub const CACHE: &str = "cache";
}
