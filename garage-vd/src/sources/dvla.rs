//! DVLA Vehicle Enquiry Service client
//!
//! Free lookup of registration-level data. The service does not return a
//! model name; that comes from the paid fallback when needed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{error_for_status, http_client, rate_limiter, Limiter, SourceError};
use crate::models::BasicData;

pub const DVLA_BASE_URL: &str = "https://driver-vehicle-licensing.api.gov.uk";
const RATE_LIMIT_PER_SEC: u32 = 10;

/// Vehicle Enquiry response body (fields the aggregator uses)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VehicleEnquiryResponse {
    registration_number: Option<String>,
    make: Option<String>,
    colour: Option<String>,
    year_of_manufacture: Option<i32>,
    fuel_type: Option<String>,
    engine_capacity: Option<i64>,
    tax_status: Option<String>,
    tax_due_date: Option<String>,
    mot_expiry_date: Option<String>,
}

impl From<VehicleEnquiryResponse> for BasicData {
    fn from(vehicle: VehicleEnquiryResponse) -> Self {
        BasicData {
            make: vehicle.make,
            model: None,
            year: vehicle.year_of_manufacture,
            fuel_type: vehicle.fuel_type,
            engine_capacity: vehicle.engine_capacity,
            colour: vehicle.colour,
            vin: None,
            tax_status: vehicle.tax_status,
            tax_due_date: vehicle.tax_due_date,
            mot_expiry_date: vehicle.mot_expiry_date,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VehicleEnquiryRequest<'a> {
    registration_number: &'a str,
}

/// DVLA VES client
pub struct DvlaClient {
    http_client: reqwest::Client,
    rate_limiter: Limiter,
    base_url: String,
    api_key: String,
}

impl DvlaClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            rate_limiter: rate_limiter(RATE_LIMIT_PER_SEC),
            base_url: base_url.unwrap_or_else(|| DVLA_BASE_URL.to_string()),
            api_key,
        })
    }

    /// Look up a registration; `None` when DVLA has no such vehicle
    pub async fn lookup(&self, registration: &str) -> Result<Option<BasicData>, SourceError> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/vehicle-enquiry/v1/vehicles",
            self.base_url.trim_end_matches('/')
        );
        tracing::debug!(registration = %registration, "Querying DVLA vehicle enquiry");

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&VehicleEnquiryRequest {
                registration_number: registration,
            })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(registration = %registration, "DVLA has no record");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let vehicle: VehicleEnquiryResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        tracing::debug!(
            registration = ?vehicle.registration_number,
            make = ?vehicle.make,
            "DVLA lookup successful"
        );

        Ok(Some(vehicle.into()))
    }
}
