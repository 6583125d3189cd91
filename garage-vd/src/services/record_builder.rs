//! Build a normalized vehicle record from resolved payloads
//!
//! Field precedence:
//! - identity/descriptive fields: basic, then comprehensive, then technical
//! - technical fields: technical, then comprehensive
//! - explicit payload fields win over values extracted from the
//!   specification list
//!
//! Blank strings are treated as missing so they never overwrite stored
//! values on merge.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::spec_extractor::{extract_spec_fields, SpecFields};
use crate::models::{BasicData, ImageData, MotData, ServiceData, SourceSummary, TechnicalData, VehicleRecord};
use crate::types::DataType;

fn payload<T: DeserializeOwned>(resolved: &BTreeMap<DataType, Value>, data_type: DataType) -> Option<T> {
    let value = resolved.get(&data_type)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(data_type = %data_type, error = %e, "Payload does not match its data type");
            None
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// First non-blank string across candidates
fn pick(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates.into_iter().find_map(clean)
}

fn pick_num<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

fn tyre(tech: &TechnicalData, position: &str) -> (Option<String>, Option<String>) {
    tech.tyres
        .iter()
        .find(|t| t.position == position)
        .map(|t| (t.size.clone(), t.pressure.clone()))
        .unwrap_or((None, None))
}

/// Build the record for one aggregation call
///
/// `resolved` holds the payloads produced by this call (cache or provider);
/// `sources` names the provider per data type.
pub fn build_record(
    registration: &str,
    resolved: &BTreeMap<DataType, Value>,
    sources: &BTreeMap<DataType, SourceSummary>,
    completeness_score: u8,
    last_update: String,
) -> VehicleRecord {
    let basic: BasicData = payload(resolved, DataType::Basic).unwrap_or_default();
    let comprehensive: TechnicalData = payload(resolved, DataType::Comprehensive).unwrap_or_default();
    let technical: TechnicalData = payload(resolved, DataType::Technical).unwrap_or_default();
    let image: ImageData = payload(resolved, DataType::Image).unwrap_or_default();
    let mot: Option<MotData> = payload(resolved, DataType::Mot);
    let service: ServiceData = payload(resolved, DataType::Service).unwrap_or_default();

    // Extracted specs: technical list first, then comprehensive
    let mut spec_items = technical.specifications.clone();
    spec_items.extend(comprehensive.specifications.iter().cloned());
    let specs: SpecFields = extract_spec_fields(&spec_items);

    let (tech_front_size, tech_front_pressure) = tyre(&technical, "front");
    let (tech_rear_size, tech_rear_pressure) = tyre(&technical, "rear");
    let (comp_front_size, comp_front_pressure) = tyre(&comprehensive, "front");
    let (comp_rear_size, comp_rear_pressure) = tyre(&comprehensive, "rear");

    let technical_specs = resolved
        .get(&DataType::Technical)
        .or_else(|| resolved.get(&DataType::Comprehensive))
        .cloned();

    let data_sources: Map<String, Value> = sources
        .iter()
        .map(|(data_type, summary)| {
            (
                data_type.as_str().to_string(),
                Value::String(summary.source.as_str().to_string()),
            )
        })
        .collect();

    VehicleRecord {
        registration: registration.to_string(),
        vin: pick([basic.vin.clone(), comprehensive.vin.clone(), technical.vin.clone()]),
        make: pick([
            basic.make.clone(),
            comprehensive.make.clone(),
            technical.make.clone(),
            image.make.clone(),
        ]),
        model: pick([
            basic.model.clone(),
            comprehensive.model.clone(),
            technical.model.clone(),
            image.model.clone(),
        ]),
        year: pick_num([basic.year, comprehensive.year, technical.year]),
        fuel_type: pick([
            basic.fuel_type.clone(),
            comprehensive.fuel_type.clone(),
            technical.fuel_type.clone(),
        ]),
        derivative: pick([technical.derivative.clone(), comprehensive.derivative.clone()]),
        colour: pick([
            basic.colour.clone(),
            comprehensive.colour.clone(),
            technical.colour.clone(),
        ]),
        engine_capacity_cc: pick_num([
            basic.engine_capacity,
            comprehensive.engine_capacity,
            technical.engine_capacity,
        ]),
        power_bhp: pick_num([technical.power_bhp, comprehensive.power_bhp, specs.power_bhp]),
        torque_nm: pick_num([technical.torque_nm, comprehensive.torque_nm, specs.torque_nm]),
        fuel_economy_mpg: pick_num([
            technical.fuel_economy_mpg,
            comprehensive.fuel_economy_mpg,
            specs.fuel_economy_mpg,
        ]),
        co2_emissions: pick_num([
            technical.co2_emissions,
            comprehensive.co2_emissions,
            specs.co2_emissions,
        ]),
        euro_status: pick([
            technical.euro_status.clone(),
            comprehensive.euro_status.clone(),
            specs.euro_status.clone(),
        ]),
        image_url: pick([
            image.image_url.clone(),
            technical.image_url.clone(),
            comprehensive.image_url.clone(),
        ]),
        image_expiry: pick([
            image.image_expiry.clone(),
            technical.image_expiry.clone(),
            comprehensive.image_expiry.clone(),
        ]),
        engine_code: pick([
            technical.engine_code.clone(),
            comprehensive.engine_code.clone(),
            specs.engine_code.clone(),
            service.engine_code.clone(),
        ]),
        radio_code: pick([
            technical.radio_code.clone(),
            comprehensive.radio_code.clone(),
            service.radio_code.clone(),
        ]),
        tyre_size_front: pick([tech_front_size, comp_front_size, specs.tyre_size_front.clone()]),
        tyre_size_rear: pick([tech_rear_size, comp_rear_size, specs.tyre_size_rear.clone()]),
        tyre_pressure_front: pick([
            tech_front_pressure,
            comp_front_pressure,
            specs.tyre_pressure_front.clone(),
        ]),
        tyre_pressure_rear: pick([
            tech_rear_pressure,
            comp_rear_pressure,
            specs.tyre_pressure_rear.clone(),
        ]),
        service_interval: clean(specs.service_interval),
        mot_expiry_date: pick([
            mot.as_ref().and_then(|m| m.mot_expiry_date.clone()),
            basic.mot_expiry_date.clone(),
        ]),
        tax_status: clean(basic.tax_status),
        tax_due_date: clean(basic.tax_due_date),
        technical_specs,
        service_data: service.service_data,
        data_sources,
        last_update: Some(last_update),
        completeness_score,
    }
}
