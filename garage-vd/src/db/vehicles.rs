//! Vehicle record persistence
//!
//! One row per registration. Upserts coalesce every attribute, so a lookup
//! that resolves fewer fields never erases what an earlier lookup stored.

use garage_common::{Error, Result};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};

use crate::models::VehicleRecord;

fn json_text(value: &Option<Value>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(Error::from)
}

fn parse_json(text: Option<String>) -> Option<Value> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

/// Insert or merge a vehicle record
///
/// Attributes use `COALESCE(new, existing)`; `data_sources` objects are
/// merged key by key; score and last update always take the new values.
pub async fn upsert_vehicle(pool: &SqlitePool, record: &VehicleRecord) -> Result<()> {
    let data_sources = serde_json::to_string(&record.data_sources)?;
    let last_update = record
        .last_update
        .clone()
        .unwrap_or_else(|| garage_common::time::to_db(garage_common::time::now()));

    sqlx::query(
        r#"
        INSERT INTO vehicle_data (
            registration, vin, make, model, year, fuel_type, derivative, color,
            engine_capacity_cc, power_bhp, torque_nm, fuel_economy_mpg, co2_emissions,
            euro_status, image_url, image_expiry, engine_code, radio_code,
            tyre_size_front, tyre_size_rear, tyre_pressure_front, tyre_pressure_rear,
            service_interval, mot_expiry_date, tax_status, tax_due_date,
            technical_specs, service_data, data_sources, last_update, completeness_score
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(registration) DO UPDATE SET
            vin = COALESCE(excluded.vin, vin),
            make = COALESCE(excluded.make, make),
            model = COALESCE(excluded.model, model),
            year = COALESCE(excluded.year, year),
            fuel_type = COALESCE(excluded.fuel_type, fuel_type),
            derivative = COALESCE(excluded.derivative, derivative),
            color = COALESCE(excluded.color, color),
            engine_capacity_cc = COALESCE(excluded.engine_capacity_cc, engine_capacity_cc),
            power_bhp = COALESCE(excluded.power_bhp, power_bhp),
            torque_nm = COALESCE(excluded.torque_nm, torque_nm),
            fuel_economy_mpg = COALESCE(excluded.fuel_economy_mpg, fuel_economy_mpg),
            co2_emissions = COALESCE(excluded.co2_emissions, co2_emissions),
            euro_status = COALESCE(excluded.euro_status, euro_status),
            image_url = COALESCE(excluded.image_url, image_url),
            image_expiry = COALESCE(excluded.image_expiry, image_expiry),
            engine_code = COALESCE(excluded.engine_code, engine_code),
            radio_code = COALESCE(excluded.radio_code, radio_code),
            tyre_size_front = COALESCE(excluded.tyre_size_front, tyre_size_front),
            tyre_size_rear = COALESCE(excluded.tyre_size_rear, tyre_size_rear),
            tyre_pressure_front = COALESCE(excluded.tyre_pressure_front, tyre_pressure_front),
            tyre_pressure_rear = COALESCE(excluded.tyre_pressure_rear, tyre_pressure_rear),
            service_interval = COALESCE(excluded.service_interval, service_interval),
            mot_expiry_date = COALESCE(excluded.mot_expiry_date, mot_expiry_date),
            tax_status = COALESCE(excluded.tax_status, tax_status),
            tax_due_date = COALESCE(excluded.tax_due_date, tax_due_date),
            technical_specs = COALESCE(excluded.technical_specs, technical_specs),
            service_data = COALESCE(excluded.service_data, service_data),
            data_sources = json_patch(COALESCE(data_sources, '{}'), excluded.data_sources),
            last_update = excluded.last_update,
            completeness_score = excluded.completeness_score
        "#,
    )
    .bind(&record.registration)
    .bind(&record.vin)
    .bind(&record.make)
    .bind(&record.model)
    .bind(record.year)
    .bind(&record.fuel_type)
    .bind(&record.derivative)
    .bind(&record.colour)
    .bind(record.engine_capacity_cc)
    .bind(record.power_bhp)
    .bind(record.torque_nm)
    .bind(record.fuel_economy_mpg)
    .bind(record.co2_emissions)
    .bind(&record.euro_status)
    .bind(&record.image_url)
    .bind(&record.image_expiry)
    .bind(&record.engine_code)
    .bind(&record.radio_code)
    .bind(&record.tyre_size_front)
    .bind(&record.tyre_size_rear)
    .bind(&record.tyre_pressure_front)
    .bind(&record.tyre_pressure_rear)
    .bind(&record.service_interval)
    .bind(&record.mot_expiry_date)
    .bind(&record.tax_status)
    .bind(&record.tax_due_date)
    .bind(json_text(&record.technical_specs)?)
    .bind(json_text(&record.service_data)?)
    .bind(data_sources)
    .bind(last_update)
    .bind(record.completeness_score as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the stored record for a registration
pub async fn load_vehicle(pool: &SqlitePool, registration: &str) -> Result<Option<VehicleRecord>> {
    let row = sqlx::query(
        r#"
        SELECT registration, vin, make, model, year, fuel_type, derivative, color,
               engine_capacity_cc, power_bhp, torque_nm, fuel_economy_mpg, co2_emissions,
               euro_status, image_url, image_expiry, engine_code, radio_code,
               tyre_size_front, tyre_size_rear, tyre_pressure_front, tyre_pressure_rear,
               service_interval, mot_expiry_date, tax_status, tax_due_date,
               technical_specs, service_data, data_sources, last_update, completeness_score
        FROM vehicle_data
        WHERE registration = ?
        "#,
    )
    .bind(registration)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let data_sources: Map<String, Value> = row
        .get::<Option<String>, _>("data_sources")
        .and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_default();
    let score: i64 = row.get("completeness_score");

    Ok(Some(VehicleRecord {
        registration: row.get("registration"),
        vin: row.get("vin"),
        make: row.get("make"),
        model: row.get("model"),
        year: row.get("year"),
        fuel_type: row.get("fuel_type"),
        derivative: row.get("derivative"),
        colour: row.get("color"),
        engine_capacity_cc: row.get("engine_capacity_cc"),
        power_bhp: row.get("power_bhp"),
        torque_nm: row.get("torque_nm"),
        fuel_economy_mpg: row.get("fuel_economy_mpg"),
        co2_emissions: row.get("co2_emissions"),
        euro_status: row.get("euro_status"),
        image_url: row.get("image_url"),
        image_expiry: row.get("image_expiry"),
        engine_code: row.get("engine_code"),
        radio_code: row.get("radio_code"),
        tyre_size_front: row.get("tyre_size_front"),
        tyre_size_rear: row.get("tyre_size_rear"),
        tyre_pressure_front: row.get("tyre_pressure_front"),
        tyre_pressure_rear: row.get("tyre_pressure_rear"),
        service_interval: row.get("service_interval"),
        mot_expiry_date: row.get("mot_expiry_date"),
        tax_status: row.get("tax_status"),
        tax_due_date: row.get("tax_due_date"),
        technical_specs: parse_json(row.get("technical_specs")),
        service_data: parse_json(row.get("service_data")),
        data_sources,
        last_update: row.get("last_update"),
        completeness_score: score.clamp(0, 100) as u8,
    }))
}
