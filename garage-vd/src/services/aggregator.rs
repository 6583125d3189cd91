//! Vehicle data aggregator
//!
//! Resolves the requested data types for one registration at the lowest
//! cost:
//!
//! 1. **Cache check:** valid cache entries satisfy their data type (skipped
//!    on force refresh)
//! 2. **Provider fetch:** each missing type runs one handler, which walks an
//!    ordered fallback chain (free providers before paid ones)
//! 3. **Merge + persist:** resolved payloads are normalized into the vehicle
//!    record and upserted with coalesce semantics
//! 4. **Score:** completeness of the types resolved by this call
//! 5. **Warm cache:** expensive multi-type calls cache every resolved type
//!
//! Every cache hit and provider attempt writes one usage-log row and adds
//! its cost to the provider's monthly spend. Provider failures never abort
//! an aggregation; database failures do.

use chrono::Duration;
use futures::future::BoxFuture;
use futures::FutureExt;
use garage_common::config::TomlConfig;
use garage_common::time::{month_key, now, to_db};
use garage_common::{Error, Result};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::completeness::completeness_score;
use super::pricing::PriceList;
use super::record_builder::build_record;
use super::spec_extractor::extract_spec_fields;
use crate::db::{cache, usage, vehicles};
use crate::models::{
    normalize_registration, AggregationRequest, AggregationResult, BasicData, HandlerResult,
    ImageData, MotData, Payload, ProviderAttempt, ServiceData, SourceSummary, TechnicalData,
};
use crate::sources::{SourceError, VehicleDataSources};
use crate::types::{packages, DataType, FetchStatus, Provider};

/// Default total-cost threshold above which a call warms the cache
pub const DEFAULT_CACHE_WARMING_THRESHOLD: f64 = 0.20;

// ============================================================================
// Settings
// ============================================================================

/// Injected aggregator behaviour
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub prices: PriceList,
    pub cache_warming_enabled: bool,
    pub cache_warming_threshold: f64,
    /// Per-type cache lifetime overrides
    pub cache_ttl: HashMap<DataType, Duration>,
    /// Monthly budget limits; exceeding one is logged, never enforced
    pub budget_limits: HashMap<Provider, f64>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            prices: PriceList::default(),
            cache_warming_enabled: true,
            cache_warming_threshold: DEFAULT_CACHE_WARMING_THRESHOLD,
            cache_ttl: HashMap::new(),
            budget_limits: HashMap::new(),
        }
    }
}

impl AggregatorSettings {
    /// Build settings from the TOML `[aggregator]`, `[prices]` and
    /// `[budgets]` sections; unknown names are skipped with a warning
    pub fn from_config(config: &TomlConfig) -> Self {
        let mut settings = Self {
            prices: PriceList::with_overrides(&config.prices),
            ..Default::default()
        };

        if let Some(enabled) = config.aggregator.cache_warming_enabled {
            settings.cache_warming_enabled = enabled;
        }
        if let Some(threshold) = config.aggregator.cache_warming_threshold {
            settings.cache_warming_threshold = threshold;
        }

        for (name, hours) in &config.aggregator.cache_ttl_hours {
            match name.parse::<DataType>() {
                Ok(data_type) if *hours > 0 => {
                    settings.cache_ttl.insert(data_type, Duration::hours(*hours));
                }
                Ok(_) => warn!(data_type = %name, "Ignoring non-positive cache TTL"),
                Err(e) => warn!("Ignoring cache TTL override: {}", e),
            }
        }

        for (name, limit) in &config.budgets {
            match name.parse::<Provider>() {
                Ok(provider) => {
                    settings.budget_limits.insert(provider, *limit);
                }
                Err(e) => warn!("Ignoring budget limit: {}", e),
            }
        }

        settings
    }

    /// Cache lifetime for a data type
    pub fn cache_ttl(&self, data_type: DataType) -> Duration {
        self.cache_ttl
            .get(&data_type)
            .copied()
            .unwrap_or_else(|| data_type.default_cache_ttl())
    }
}

// ============================================================================
// Provider attempts
// ============================================================================

/// One provider attempt and the payload it produced, if any
struct ProviderOutcome {
    attempt: ProviderAttempt,
    data: Option<Value>,
}

/// A deferred provider call in a fallback chain
type ProviderStep<'a> = Box<dyn FnOnce() -> BoxFuture<'a, ProviderOutcome> + Send + 'a>;

fn package_list(package_names: &[&str]) -> Vec<String> {
    package_names.iter().map(|p| p.to_string()).collect()
}

/// Convert a source call result into a logged attempt
///
/// Data is success; an empty answer is `no_data` and still billed; an error
/// costs nothing.
fn settle<T: Payload>(
    provider: Provider,
    package_names: &[&str],
    prices: &PriceList,
    outcome: std::result::Result<Option<T>, SourceError>,
) -> ProviderOutcome {
    let packages = package_list(package_names);
    let cost = prices.packages_cost(provider, package_names);

    let (status, cost, data, error) = match outcome {
        Ok(Some(payload)) if !payload.is_empty() => match serde_json::to_value(&payload) {
            Ok(value) => (FetchStatus::Success, cost, Some(value), None),
            Err(e) => (FetchStatus::Error, 0.0, None, Some(e.to_string())),
        },
        Ok(_) => (FetchStatus::NoData, cost, None, None),
        Err(e) => {
            error!(provider = %provider, packages = ?packages, error = %e, "Provider call failed");
            (FetchStatus::Error, 0.0, None, Some(e.to_string()))
        }
    };

    debug!(provider = %provider, packages = ?packages, status = %status, cost, "Provider attempt");

    ProviderOutcome {
        attempt: ProviderAttempt {
            provider,
            packages,
            cost,
            status,
            error,
        },
        data,
    }
}

/// Try each step in order until one produces data
async fn run_chain(steps: Vec<ProviderStep<'_>>) -> HandlerResult {
    let mut attempts = Vec::new();

    for step in steps {
        let outcome = step().await;
        let provider = outcome.attempt.provider;
        let packages = outcome.attempt.packages.clone();
        attempts.push(outcome.attempt);

        if let Some(data) = outcome.data {
            let cost = attempts.iter().map(|a| a.cost).sum();
            return HandlerResult {
                success: true,
                data: Some(data),
                provider: Some(provider),
                packages,
                cost,
                error: None,
                attempts,
            };
        }
    }

    let error = attempts
        .iter()
        .rev()
        .find_map(|a| a.error.clone())
        .unwrap_or_else(|| "No provider returned data".to_string());
    HandlerResult::failure(error, attempts)
}

// ============================================================================
// Aggregator
// ============================================================================

/// Cache-first, cost-aware vehicle data aggregator
pub struct VehicleDataAggregator {
    db: SqlitePool,
    sources: Arc<dyn VehicleDataSources>,
    settings: AggregatorSettings,
}

impl VehicleDataAggregator {
    pub fn new(db: SqlitePool, sources: Arc<dyn VehicleDataSources>, settings: AggregatorSettings) -> Self {
        Self { db, sources, settings }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Resolve the requested data types for one registration
    ///
    /// **Errors:** invalid registration or empty type list
    /// (`Error::InvalidInput`); any database failure.
    pub async fn aggregate(&self, request: AggregationRequest) -> Result<AggregationResult> {
        let registration = normalize_registration(&request.registration).ok_or_else(|| {
            Error::InvalidInput(format!("Invalid registration: '{}'", request.registration))
        })?;

        let mut data_types: Vec<DataType> = Vec::new();
        for data_type in &request.data_types {
            if !data_types.contains(data_type) {
                data_types.push(*data_type);
            }
        }
        if data_types.is_empty() {
            return Err(Error::InvalidInput("No data types requested".to_string()));
        }

        info!(
            registration = %registration,
            data_types = ?data_types,
            force_refresh = request.force_refresh,
            comprehensive = request.comprehensive,
            "Aggregating vehicle data"
        );

        let started = now();
        let month = month_key(started);
        let mut result = AggregationResult::new(registration.clone());

        // CACHE_CHECK
        let mut missing = Vec::new();
        for data_type in data_types {
            if request.force_refresh {
                missing.push(data_type);
                continue;
            }
            match cache::find_valid(&self.db, &registration, data_type, started).await? {
                Some(entry) => {
                    self.record_cache_hit(&registration, data_type, &entry, &month).await?;
                    result.cache_hits += 1;
                    result.sources.insert(
                        data_type,
                        SourceSummary {
                            source: entry.provider,
                            packages: vec![packages::CACHE.to_string()],
                            cost: 0.0,
                            cached: true,
                        },
                    );
                    result.data.insert(data_type, entry.payload);
                }
                None => missing.push(data_type),
            }
        }

        // PROVIDER_FETCH
        let mut fetched: BTreeMap<DataType, Value> = BTreeMap::new();
        for data_type in missing {
            let handled = self.handle(data_type, &registration, request.comprehensive).await;

            for attempt in &handled.attempts {
                self.record_attempt(&registration, data_type, &request, attempt, &month)
                    .await?;
                result.api_calls += 1;
                result.total_cost += attempt.cost;
            }

            match (handled.success, handled.data, handled.provider) {
                (true, Some(payload), Some(provider)) => {
                    cache::store(
                        &self.db,
                        &registration,
                        data_type,
                        provider,
                        &payload,
                        self.settings.cache_ttl(data_type),
                    )
                    .await?;
                    result.sources.insert(
                        data_type,
                        SourceSummary {
                            source: provider,
                            packages: handled.packages,
                            cost: handled.cost,
                            cached: false,
                        },
                    );
                    fetched.insert(data_type, payload.clone());
                    result.data.insert(data_type, payload);
                }
                _ => {
                    let message = handled
                        .error
                        .unwrap_or_else(|| "No provider returned data".to_string());
                    warn!(registration = %registration, data_type = %data_type, error = %message, "Data type unresolved");
                    result.errors.insert(data_type, message);
                }
            }
        }

        // MERGE / PERSIST / SCORE
        result.completeness_score = completeness_score(result.data.keys());
        if !result.data.is_empty() {
            let record = build_record(
                &registration,
                &result.data,
                &result.sources,
                result.completeness_score,
                to_db(now()),
            );
            vehicles::upsert_vehicle(&self.db, &record).await?;
        }

        // WARM_CACHE
        // Cache-served types keep their original expiry
        if self.settings.cache_warming_enabled
            && result.total_cost > self.settings.cache_warming_threshold
            && result.data.len() > 1
            && !fetched.is_empty()
        {
            self.warm_cache(&registration, &fetched).await?;
            result.cache_warmed = true;
        }

        info!(
            registration = %registration,
            cache_hits = result.cache_hits,
            api_calls = result.api_calls,
            total_cost = result.total_cost,
            completeness = result.completeness_score,
            cache_warmed = result.cache_warmed,
            "Aggregation complete"
        );

        Ok(result)
    }

    /// Log a cache hit and count the access in the background
    async fn record_cache_hit(
        &self,
        registration: &str,
        data_type: DataType,
        entry: &cache::CacheEntry,
        month: &str,
    ) -> Result<()> {
        debug!(registration = %registration, data_type = %data_type, provider = %entry.provider, "Cache hit");

        let db = self.db.clone();
        let id = entry.id.clone();
        tokio::spawn(async move {
            if let Err(e) = cache::record_access(&db, &id, now()).await {
                warn!(cache_entry = %id, error = %e, "Failed to update cache access count");
            }
        });

        let log = usage::UsageLogEntry {
            registration: registration.to_string(),
            provider: entry.provider,
            package: packages::CACHE.to_string(),
            cost: 0.0,
            status: FetchStatus::Success,
            data_retrieved: true,
            cached_hit: true,
            request_details: Some(json!({ "dataType": data_type })),
            response_summary: Some(json!({
                "cacheEntryId": entry.id,
                "estimatedSaving": self.settings.prices.estimated_saving(data_type),
            })),
        };
        usage::insert_usage(&self.db, &log, now()).await?;
        self.add_spend(entry.provider, month, 0.0).await
    }

    /// Log one provider attempt and add its cost to the monthly spend
    async fn record_attempt(
        &self,
        registration: &str,
        data_type: DataType,
        request: &AggregationRequest,
        attempt: &ProviderAttempt,
        month: &str,
    ) -> Result<()> {
        let log = usage::UsageLogEntry {
            registration: registration.to_string(),
            provider: attempt.provider,
            package: attempt.package_label(),
            cost: attempt.cost,
            status: attempt.status,
            data_retrieved: attempt.status == FetchStatus::Success,
            cached_hit: false,
            request_details: Some(json!({
                "dataType": data_type,
                "comprehensive": request.comprehensive,
                "forceRefresh": request.force_refresh,
            })),
            response_summary: Some(json!({
                "status": attempt.status,
                "error": attempt.error,
            })),
        };
        usage::insert_usage(&self.db, &log, now()).await?;
        self.add_spend(attempt.provider, month, attempt.cost).await
    }

    async fn add_spend(&self, provider: Provider, month: &str, cost: f64) -> Result<()> {
        let limit = self.settings.budget_limits.get(&provider).copied();
        let row = usage::add_spend(&self.db, provider, month, cost, limit).await?;
        if row.over_budget() {
            warn!(
                provider = %provider,
                month = %month,
                spend = row.current_spend,
                limit = ?row.budget_limit,
                "Monthly budget exceeded"
            );
        }
        Ok(())
    }

    /// Cache the types fetched this call under the paid provider tag
    async fn warm_cache(&self, registration: &str, data: &BTreeMap<DataType, Value>) -> Result<()> {
        for (data_type, payload) in data {
            cache::store(
                &self.db,
                registration,
                *data_type,
                Provider::Vdg,
                payload,
                self.settings.cache_ttl(*data_type),
            )
            .await?;
        }
        info!(registration = %registration, data_types = data.len(), "Cache warmed");
        Ok(())
    }

    // ========================================================================
    // Data-type handlers
    // ========================================================================

    async fn handle(&self, data_type: DataType, registration: &str, comprehensive: bool) -> HandlerResult {
        match data_type {
            DataType::Technical if comprehensive => self.technical_comprehensive(registration).await,
            DataType::Technical => self.technical_mid_tier(registration).await,
            other => run_chain(self.chain(other, registration)).await,
        }
    }

    /// Ordered fallback chain for the single-call data types
    fn chain<'a>(&'a self, data_type: DataType, registration: &'a str) -> Vec<ProviderStep<'a>> {
        let sources = &self.sources;
        let prices = &self.settings.prices;

        match data_type {
            DataType::Basic => vec![
                Box::new(move || {
                    async move {
                        let outcome = sources.dvla_lookup(registration).await;
                        settle(Provider::Dvla, &[packages::VEHICLE_ENQUIRY], prices, outcome)
                    }
                    .boxed()
                }),
                Box::new(move || {
                    async move {
                        let outcome = sources
                            .vdg_lookup(registration, &[packages::VEHICLE_DETAILS])
                            .await
                            .map(|found| found.map(BasicData::from));
                        settle(Provider::Vdg, &[packages::VEHICLE_DETAILS], prices, outcome)
                    }
                    .boxed()
                }),
            ],
            DataType::Image => vec![Box::new(move || {
                async move {
                    let outcome = sources
                        .vdg_lookup(registration, &[packages::VEHICLE_DETAILS_WITH_IMAGE])
                        .await
                        .map(|found| found.map(ImageData::from));
                    settle(Provider::Vdg, &[packages::VEHICLE_DETAILS_WITH_IMAGE], prices, outcome)
                }
                .boxed()
            })],
            DataType::Mot => vec![
                Box::new(move || {
                    async move {
                        let outcome = sources
                            .mot_history(registration)
                            .await
                            .map(|found| found.map(MotData::from_dvsa));
                        settle(Provider::Dvsa, &[packages::MOT_HISTORY], prices, outcome)
                    }
                    .boxed()
                }),
                Box::new(move || {
                    async move {
                        let outcome = sources
                            .vdg_lookup(registration, &[packages::MOT_HISTORY_DETAILS])
                            .await
                            .map(|found| found.map(MotData::from_vdg));
                        settle(Provider::Vdg, &[packages::MOT_HISTORY_DETAILS], prices, outcome)
                    }
                    .boxed()
                }),
            ],
            DataType::Service => vec![Box::new(move || {
                async move {
                    let outcome = sources.sws_lookup(registration).await;
                    settle(Provider::Sws, &[packages::TECHNICAL_DATA], prices, outcome)
                }
                .boxed()
            })],
            DataType::Comprehensive => vec![Box::new(move || {
                async move {
                    let outcome = sources.vdg_lookup(registration, &packages::COMPREHENSIVE).await;
                    settle(Provider::Vdg, &packages::COMPREHENSIVE, prices, outcome)
                }
                .boxed()
            })],
            // Technical has dedicated handlers
            DataType::Technical => Vec::new(),
        }
    }

    /// Spec and tyre packages fetched concurrently and merged into one attempt
    ///
    /// The attempt costs the sub-calls that did not error; it succeeds if
    /// either returned data.
    async fn technical_mid_tier(&self, registration: &str) -> HandlerResult {
        let prices = &self.settings.prices;
        let (spec, tyres) = tokio::join!(
            self.sources
                .vdg_lookup(registration, &[packages::SPEC_AND_OPTION_DETAILS]),
            self.sources.vdg_lookup(registration, &[packages::TYRE_DETAILS]),
        );

        let mut cost = 0.0;
        let mut errors = Vec::new();
        let mut parts = Vec::new();
        for (package, outcome) in [
            (packages::SPEC_AND_OPTION_DETAILS, spec),
            (packages::TYRE_DETAILS, tyres),
        ] {
            match outcome {
                Ok(found) => {
                    cost += prices.cost(Provider::Vdg, package);
                    parts.extend(found);
                }
                Err(e) => {
                    error!(provider = %Provider::Vdg, package, error = %e, "Provider call failed");
                    errors.push(format!("{}: {}", package, e));
                }
            }
        }

        let merged = parts
            .into_iter()
            .reduce(TechnicalData::merge)
            .filter(|data| !data.is_empty());

        let (status, data) = match merged {
            Some(data) => match serde_json::to_value(&data) {
                Ok(value) => (FetchStatus::Success, Some(value)),
                Err(e) => {
                    errors.push(e.to_string());
                    (FetchStatus::Error, None)
                }
            },
            None if errors.len() == 2 => (FetchStatus::Error, None),
            None => (FetchStatus::NoData, None),
        };

        let attempt = ProviderAttempt {
            provider: Provider::Vdg,
            packages: package_list(&[packages::SPEC_AND_OPTION_DETAILS, packages::TYRE_DETAILS]),
            cost,
            status,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        };
        debug!(provider = %Provider::Vdg, packages = %attempt.package_label(), status = %status, cost, "Provider attempt");

        match data {
            Some(data) => HandlerResult {
                success: true,
                data: Some(data),
                provider: Some(Provider::Vdg),
                packages: attempt.packages.clone(),
                cost,
                error: None,
                attempts: vec![attempt],
            },
            None => {
                let error = attempt
                    .error
                    .clone()
                    .unwrap_or_else(|| "No provider returned data".to_string());
                HandlerResult::failure(error, vec![attempt])
            }
        }
    }

    /// Multi-package lookup, supplemented by SWS when the engine code is missing
    async fn technical_comprehensive(&self, registration: &str) -> HandlerResult {
        let prices = &self.settings.prices;
        let vdg = self.sources.vdg_lookup(registration, &packages::COMPREHENSIVE).await;

        let mut technical = match vdg {
            Ok(Some(data)) if !data.is_empty() => data,
            other => {
                let outcome = settle(Provider::Vdg, &packages::COMPREHENSIVE, prices, other);
                let error = outcome
                    .attempt
                    .error
                    .clone()
                    .unwrap_or_else(|| "No provider returned data".to_string());
                return HandlerResult::failure(error, vec![outcome.attempt]);
            }
        };

        let mut attempts = vec![ProviderAttempt {
            provider: Provider::Vdg,
            packages: package_list(&packages::COMPREHENSIVE),
            cost: prices.packages_cost(Provider::Vdg, &packages::COMPREHENSIVE),
            status: FetchStatus::Success,
            error: None,
        }];
        let mut result_packages = package_list(&packages::COMPREHENSIVE);

        let engine_code_known = technical.engine_code.is_some()
            || extract_spec_fields(&technical.specifications).engine_code.is_some();

        if !engine_code_known {
            debug!(registration = %registration, "Engine code missing, querying SWS");
            let sws = self.sources.sws_lookup(registration).await;
            let outcome = settle(Provider::Sws, &[packages::TECHNICAL_DATA], prices, sws);

            if let Some(value) = &outcome.data {
                if let Ok(service) = serde_json::from_value::<ServiceData>(value.clone()) {
                    technical.engine_code = technical.engine_code.or(service.engine_code);
                    technical.radio_code = technical.radio_code.or(service.radio_code);
                }
            }
            attempts.push(outcome.attempt);
            result_packages.push(packages::TECHNICAL_DATA.to_string());
        }

        let cost = attempts.iter().map(|a| a.cost).sum();
        match serde_json::to_value(&technical) {
            Ok(value) => HandlerResult {
                success: true,
                data: Some(value),
                provider: Some(Provider::Vdg),
                packages: result_packages,
                cost,
                error: None,
                attempts,
            },
            Err(e) => HandlerResult::failure(e.to_string(), attempts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_common::config::{AggregatorConfig, TomlConfig};

    #[test]
    fn test_settings_from_config() {
        let mut config = TomlConfig::default();
        config.aggregator = AggregatorConfig {
            cache_warming_enabled: Some(false),
            cache_warming_threshold: Some(0.5),
            cache_ttl_hours: [("mot".to_string(), 6), ("bogus".to_string(), 1)]
                .into_iter()
                .collect(),
        };
        config.budgets.insert("VDG".into(), 25.0);

        let settings = AggregatorSettings::from_config(&config);
        assert!(!settings.cache_warming_enabled);
        assert_eq!(settings.cache_warming_threshold, 0.5);
        assert_eq!(settings.cache_ttl(DataType::Mot), Duration::hours(6));
        assert_eq!(settings.cache_ttl(DataType::Basic), Duration::days(7));
        assert_eq!(settings.budget_limits.get(&Provider::Vdg), Some(&25.0));
    }

    #[test]
    fn test_settle_classifies_outcomes() {
        let prices = PriceList::default();

        let found = settle(
            Provider::Vdg,
            &[packages::VEHICLE_DETAILS],
            &prices,
            Ok(Some(BasicData {
                make: Some("Ford".into()),
                ..Default::default()
            })),
        );
        assert_eq!(found.attempt.status, FetchStatus::Success);
        assert!((found.attempt.cost - 0.05).abs() < 1e-9);
        assert!(found.data.is_some());

        let empty = settle::<BasicData>(Provider::Vdg, &[packages::VEHICLE_DETAILS], &prices, Ok(None));
        assert_eq!(empty.attempt.status, FetchStatus::NoData);
        assert!((empty.attempt.cost - 0.05).abs() < 1e-9);

        let failed = settle::<BasicData>(
            Provider::Vdg,
            &[packages::VEHICLE_DETAILS],
            &prices,
            Err(SourceError::Network("timeout".into())),
        );
        assert_eq!(failed.attempt.status, FetchStatus::Error);
        assert_eq!(failed.attempt.cost, 0.0);
        assert!(failed.attempt.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_run_chain_stops_at_first_data() {
        let prices = PriceList::default();
        let prices = &prices;
        let steps: Vec<ProviderStep<'_>> = vec![
            Box::new(move || {
                async move {
                    settle::<BasicData>(
                        Provider::Dvla,
                        &[packages::VEHICLE_ENQUIRY],
                        prices,
                        Err(SourceError::Unauthorized),
                    )
                }
                .boxed()
            }),
            Box::new(move || {
                async move {
                    settle(
                        Provider::Vdg,
                        &[packages::VEHICLE_DETAILS],
                        prices,
                        Ok(Some(BasicData {
                            make: Some("Ford".into()),
                            ..Default::default()
                        })),
                    )
                }
                .boxed()
            }),
            Box::new(move || {
                async move {
                    settle(
                        Provider::Sws,
                        &[packages::TECHNICAL_DATA],
                        prices,
                        Ok(Some(ServiceData {
                            engine_code: Some("M0JA".into()),
                            ..Default::default()
                        })),
                    )
                }
                .boxed()
            }),
        ];

        let result = run_chain(steps).await;
        assert!(result.success);
        assert_eq!(result.provider, Some(Provider::Vdg));
        // The SWS step never ran
        assert_eq!(result.attempts.len(), 2);
        assert!((result.cost - 0.05).abs() < 1e-9);
    }
}
