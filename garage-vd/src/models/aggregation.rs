//! Aggregation request/response and per-handler result shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::{DataType, FetchStatus, Provider};

/// A request to resolve data types for one registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    pub registration: String,
    #[serde(default = "default_data_types")]
    pub data_types: Vec<DataType>,
    /// Skip the cache entirely for this call
    #[serde(default)]
    pub force_refresh: bool,
    /// Use the multi-package provider for technical data
    #[serde(default)]
    pub comprehensive: bool,
}

fn default_data_types() -> Vec<DataType> {
    vec![DataType::Basic]
}

impl AggregationRequest {
    pub fn new(registration: impl Into<String>, data_types: Vec<DataType>) -> Self {
        Self {
            registration: registration.into(),
            data_types,
            force_refresh: false,
            comprehensive: false,
        }
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn comprehensive(mut self, comprehensive: bool) -> Self {
        self.comprehensive = comprehensive;
        self
    }
}

/// Where one resolved data type came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub source: Provider,
    pub packages: Vec<String>,
    pub cost: f64,
    pub cached: bool,
}

/// Outcome of one aggregation call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub registration: String,
    /// Resolved payload per data type
    pub data: BTreeMap<DataType, Value>,
    pub sources: BTreeMap<DataType, SourceSummary>,
    /// Failure message per unresolved data type
    pub errors: BTreeMap<DataType, String>,
    pub cache_hits: u32,
    pub api_calls: u32,
    pub total_cost: f64,
    /// Weighted score of the types resolved by this call (0-100)
    pub completeness_score: u8,
    pub cache_warmed: bool,
}

impl AggregationResult {
    pub fn new(registration: impl Into<String>) -> Self {
        Self {
            registration: registration.into(),
            data: BTreeMap::new(),
            sources: BTreeMap::new(),
            errors: BTreeMap::new(),
            cache_hits: 0,
            api_calls: 0,
            total_cost: 0.0,
            completeness_score: 0,
            cache_warmed: false,
        }
    }
}

/// One call made to one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAttempt {
    pub provider: Provider,
    pub packages: Vec<String>,
    pub cost: f64,
    pub status: FetchStatus,
    pub error: Option<String>,
}

impl ProviderAttempt {
    /// Package list as stored in the usage log ("A+B")
    pub fn package_label(&self) -> String {
        self.packages.join("+")
    }
}

/// Uniform result of a data-type handler
#[derive(Debug, Clone, Default)]
pub struct HandlerResult {
    pub success: bool,
    pub data: Option<Value>,
    pub provider: Option<Provider>,
    pub packages: Vec<String>,
    pub cost: f64,
    pub error: Option<String>,
    /// Every provider call made, in order
    pub attempts: Vec<ProviderAttempt>,
}

impl HandlerResult {
    /// Failed handler carrying the attempts that were made
    pub fn failure(error: impl Into<String>, attempts: Vec<ProviderAttempt>) -> Self {
        let cost = attempts.iter().map(|a| a.cost).sum();
        Self {
            success: false,
            data: None,
            provider: None,
            packages: Vec::new(),
            cost,
            error: Some(error.into()),
            attempts,
        }
    }
}
