//! Test Helper Utilities
//!
//! Shared utilities for testing garage-vd: a scripted in-process provider
//! set that records every call, and aggregator/app constructors over an
//! in-memory database.

#![allow(dead_code)]

use async_trait::async_trait;
use garage_vd::models::{BasicData, ServiceData, SpecItem, TechnicalData, TyreFitment};
use garage_vd::services::{AggregatorSettings, VehicleDataAggregator};
use garage_vd::sources::{SourceError, VehicleDataSources};
use garage_vd::AppState;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Scripted answer for one provider call
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Data(T),
    Empty,
    Fail(String),
}

impl<T: Clone> Reply<T> {
    fn answer(&self) -> Result<Option<T>, SourceError> {
        match self {
            Reply::Data(data) => Ok(Some(data.clone())),
            Reply::Empty => Ok(None),
            Reply::Fail(message) => Err(SourceError::Network(message.clone())),
        }
    }
}

/// Provider set with scripted replies
///
/// VDG replies are keyed by the comma-joined package list; unscripted
/// package combinations answer empty.
pub struct FakeSources {
    pub dvla: Reply<BasicData>,
    pub mot: Reply<Value>,
    pub vdg: HashMap<String, Reply<TechnicalData>>,
    pub sws: Reply<ServiceData>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeSources {
    fn default() -> Self {
        Self {
            dvla: Reply::Empty,
            mot: Reply::Empty,
            vdg: HashMap::new(),
            sws: Reply::Empty,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSources {
    pub fn with_vdg(mut self, packages: &[&str], reply: Reply<TechnicalData>) -> Self {
        self.vdg.insert(packages.join(","), reply);
        self
    }

    /// Calls made so far ("dvla", "dvsa", "sws", "vdg:<packages>")
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VehicleDataSources for FakeSources {
    async fn dvla_lookup(&self, _registration: &str) -> Result<Option<BasicData>, SourceError> {
        self.record("dvla".to_string());
        self.dvla.answer()
    }

    async fn mot_history(&self, _registration: &str) -> Result<Option<Value>, SourceError> {
        self.record("dvsa".to_string());
        self.mot.answer()
    }

    async fn vdg_lookup(
        &self,
        _registration: &str,
        packages: &[&str],
    ) -> Result<Option<TechnicalData>, SourceError> {
        let key = packages.join(",");
        self.record(format!("vdg:{}", key));
        self.vdg.get(&key).map_or(Ok(None), Reply::answer)
    }

    async fn sws_lookup(&self, _registration: &str) -> Result<Option<ServiceData>, SourceError> {
        self.record("sws".to_string());
        self.sws.answer()
    }
}

/// Fresh in-memory database with the full schema
pub async fn create_test_db() -> SqlitePool {
    garage_common::db::init_memory_database().await.unwrap()
}

pub fn create_test_aggregator(
    db: &SqlitePool,
    sources: Arc<FakeSources>,
    settings: AggregatorSettings,
) -> VehicleDataAggregator {
    VehicleDataAggregator::new(db.clone(), sources, settings)
}

pub fn create_test_state(db: &SqlitePool, sources: Arc<FakeSources>) -> AppState {
    let aggregator = create_test_aggregator(db, sources, AggregatorSettings::default());
    AppState::new(db.clone(), Arc::new(aggregator))
}

// ============================================================================
// Sample payloads
// ============================================================================

/// Free-enquiry answer for a 2016 Ford Fiesta
pub fn fiesta_basic() -> BasicData {
    BasicData {
        make: Some("FORD".to_string()),
        year: Some(2016),
        fuel_type: Some("PETROL".to_string()),
        engine_capacity: Some(998),
        colour: Some("BLUE".to_string()),
        tax_status: Some("Taxed".to_string()),
        mot_expiry_date: Some("2025-06-30".to_string()),
        ..Default::default()
    }
}

pub fn fiesta_vehicle_details() -> TechnicalData {
    TechnicalData {
        make: Some("FORD".to_string()),
        model: Some("FIESTA".to_string()),
        year: Some(2016),
        fuel_type: Some("PETROL".to_string()),
        ..Default::default()
    }
}

/// Multi-package answer without an engine code
pub fn fiesta_comprehensive() -> TechnicalData {
    TechnicalData {
        make: Some("FORD".to_string()),
        model: Some("FIESTA".to_string()),
        derivative: Some("Zetec 1.0 EcoBoost".to_string()),
        year: Some(2016),
        tyres: vec![TyreFitment {
            position: "front".to_string(),
            size: Some("195/50 R16".to_string()),
            pressure: Some("33".to_string()),
        }],
        specifications: vec![
            SpecItem::new("Power (bhp)", "99"),
            SpecItem::new("CO2 Emissions", "99"),
        ],
        ..Default::default()
    }
}

pub fn fiesta_specs() -> TechnicalData {
    TechnicalData {
        specifications: vec![
            SpecItem::new("Engine Code", "SFJA"),
            SpecItem::new("Max Torque (Nm)", "170"),
        ],
        ..Default::default()
    }
}

pub fn fiesta_tyres() -> TechnicalData {
    TechnicalData {
        tyres: vec![TyreFitment {
            position: "front".to_string(),
            size: Some("195/50 R16".to_string()),
            pressure: Some("33".to_string()),
        }],
        ..Default::default()
    }
}

pub fn fiesta_image() -> TechnicalData {
    TechnicalData {
        make: Some("FORD".to_string()),
        model: Some("FIESTA".to_string()),
        image_url: Some("https://images.example.test/fiesta.jpg".to_string()),
        ..Default::default()
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
