//! VDG paid vehicle data client
//!
//! One `r2/lookup` request may name several packages; the response carries a
//! status block and one result section per package. Sections are flattened
//! into a single [`TechnicalData`].

use serde_json::Value;
use std::time::Duration;

use super::{error_for_status, http_client, json_f64, json_string, rate_limiter, Limiter, SourceError};
use crate::models::{Payload, SpecItem, TechnicalData, TyreFitment};

pub const VDG_BASE_URL: &str = "https://uk.api.vehicledataglobal.com";
const RATE_LIMIT_PER_SEC: u32 = 5;

/// VDG client
pub struct VdgClient {
    http_client: reqwest::Client,
    rate_limiter: Limiter,
    base_url: String,
    api_key: String,
}

impl VdgClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            rate_limiter: rate_limiter(RATE_LIMIT_PER_SEC),
            base_url: base_url.unwrap_or_else(|| VDG_BASE_URL.to_string()),
            api_key,
        })
    }

    /// Look up one or more packages in a single request
    pub async fn lookup(
        &self,
        registration: &str,
        packages: &[&str],
    ) -> Result<Option<TechnicalData>, SourceError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/r2/lookup", self.base_url.trim_end_matches('/'));
        let package_name = packages.join(",");
        let params = [
            ("packagename", package_name.as_str()),
            ("apikey", self.api_key.as_str()),
            ("vrm", registration),
        ];

        tracing::debug!(
            registration = %registration,
            packages = %package_name,
            "Querying VDG lookup"
        );

        let response = self.http_client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        parse_lookup(&body)
    }
}

/// Interpret a lookup response body
///
/// A failed status block whose message reports missing data is `None`; any
/// other failure is an API error.
pub fn parse_lookup(body: &Value) -> Result<Option<TechnicalData>, SourceError> {
    let info = body.get("ResponseInformation");
    let succeeded = info
        .and_then(|i| i.get("IsSuccessStatusCode"))
        .and_then(Value::as_bool)
        .unwrap_or(true);

    if !succeeded {
        let code = info
            .and_then(|i| i.get("StatusCode"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let message = json_string(info.and_then(|i| i.get("StatusMessage"))).unwrap_or_default();
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("no results") || lowered.contains("not found") || lowered.contains("no match") {
            return Ok(None);
        }
        return Err(SourceError::Api(code as u16, message));
    }

    let Some(results) = body.get("Results").filter(|r| r.is_object()) else {
        return Ok(None);
    };

    let data = parse_results(results);
    Ok(if data.is_empty() { None } else { Some(data) })
}

fn at<'a>(results: &'a Value, pointer: &str) -> Option<&'a Value> {
    results.pointer(pointer).filter(|v| !v.is_null())
}

fn first_string(results: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| json_string(at(results, p)))
}

fn first_f64(results: &Value, pointers: &[&str]) -> Option<f64> {
    pointers.iter().find_map(|p| json_f64(at(results, p)))
}

fn parse_results(results: &Value) -> TechnicalData {
    TechnicalData {
        make: first_string(
            results,
            &[
                "/ModelDetails/ModelIdentification/Make",
                "/VehicleDetails/VehicleIdentification/DvlaMake",
            ],
        ),
        model: first_string(
            results,
            &[
                "/ModelDetails/ModelIdentification/Range",
                "/ModelDetails/ModelIdentification/Model",
                "/VehicleDetails/VehicleIdentification/DvlaModel",
            ],
        ),
        year: first_f64(results, &["/VehicleDetails/VehicleIdentification/YearOfManufacture"])
            .map(|y| y as i32),
        fuel_type: first_string(
            results,
            &[
                "/VehicleDetails/VehicleIdentification/DvlaFuelType",
                "/ModelDetails/Powertrain/FuelType",
            ],
        ),
        derivative: first_string(results, &["/ModelDetails/ModelIdentification/ModelVariant"]),
        vin: first_string(results, &["/VehicleDetails/VehicleIdentification/Vin"]),
        colour: first_string(
            results,
            &["/VehicleDetails/VehicleHistory/ColourDetails/CurrentColour"],
        ),
        engine_capacity: first_f64(
            results,
            &[
                "/VehicleDetails/DvlaTechnicalDetails/EngineCapacityCc",
                "/ModelDetails/Powertrain/IceDetails/EngineCapacityCc",
            ],
        )
        .map(|cc| cc as i64),
        power_bhp: first_f64(results, &["/ModelDetails/Performance/Power/Bhp"]),
        torque_nm: first_f64(results, &["/ModelDetails/Performance/Torque/Nm"]),
        fuel_economy_mpg: first_f64(results, &["/ModelDetails/Performance/FuelEconomy/CombinedMpg"]),
        co2_emissions: first_f64(
            results,
            &[
                "/ModelDetails/Emissions/ManufacturerCo2",
                "/VehicleDetails/DvlaTechnicalDetails/Co2Emissions",
            ],
        ),
        euro_status: first_string(results, &["/ModelDetails/Emissions/EuroStatus"]),
        engine_code: first_string(results, &["/ModelDetails/Powertrain/IceDetails/EngineCode"]),
        radio_code: None,
        image_url: first_string(results, &["/VehicleImageDetails/VehicleImageList/0/ImageUrl"]),
        image_expiry: first_string(results, &["/VehicleImageDetails/VehicleImageList/0/ExpiryDate"]),
        tyres: parse_tyres(results),
        specifications: parse_specifications(results),
        mot_history: at(results, "/MotHistoryDetails").cloned(),
    }
}

fn parse_tyres(results: &Value) -> Vec<TyreFitment> {
    let Some(fitment) = at(results, "/TyreDetails/TyreDetailsList/0") else {
        return Vec::new();
    };

    ["Front", "Rear"]
        .iter()
        .filter_map(|axle| {
            let axle_data = fitment.get(*axle)?;
            let size = json_string(axle_data.pointer("/Tyre/SizeDescription"));
            let pressure = json_string(axle_data.pointer("/Pressure/Psi"));
            if size.is_none() && pressure.is_none() {
                return None;
            }
            Some(TyreFitment {
                position: axle.to_ascii_lowercase(),
                size,
                pressure,
            })
        })
        .collect()
}

/// Collect `{Name, Value}` pairs from the spec package
fn parse_specifications(results: &Value) -> Vec<SpecItem> {
    let Some(items) = at(results, "/SpecAndOptionDetails/SpecificationList").and_then(Value::as_array)
    else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = json_string(item.get("Name").or_else(|| item.get("Description")))?;
            let value = json_string(item.get("Value"))?;
            Some(SpecItem::new(name, value))
        })
        .collect()
}
