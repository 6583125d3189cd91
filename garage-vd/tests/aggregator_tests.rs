//! Aggregator integration tests
//!
//! Drives full aggregation calls against scripted providers and an
//! in-memory database, then inspects the result, the stored vehicle record,
//! the cache and the usage log.

mod helpers;

use garage_common::Error;
use garage_vd::db::{cache, usage, vehicles};
use garage_vd::models::{AggregationRequest, ServiceData};
use garage_vd::services::AggregatorSettings;
use garage_vd::types::{packages, DataType, FetchStatus, Provider};
use helpers::*;
use serde_json::json;
use std::sync::Arc;

const REG: &str = "AB12CDE";

fn request(data_types: &[DataType]) -> AggregationRequest {
    AggregationRequest::new(REG, data_types.to_vec())
}

#[tokio::test]
async fn test_basic_lookup_uses_free_provider() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources {
        dvla: Reply::Data(fiesta_basic()),
        ..Default::default()
    });
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let result = aggregator.aggregate(request(&[DataType::Basic])).await.unwrap();

    assert_eq!(result.registration, REG);
    assert_eq!(result.api_calls, 1);
    assert_eq!(result.cache_hits, 0);
    assert_eq!(result.total_cost, 0.0);
    assert_eq!(result.completeness_score, 30);
    assert_eq!(result.sources[&DataType::Basic].source, Provider::Dvla);
    assert_eq!(result.data[&DataType::Basic]["make"], "FORD");
    assert!(result.errors.is_empty());
    assert_eq!(sources.calls(), vec!["dvla"]);

    let record = vehicles::load_vehicle(&db, REG).await.unwrap().unwrap();
    assert_eq!(record.make.as_deref(), Some("FORD"));
    assert_eq!(record.year, Some(2016));
    assert_eq!(record.colour.as_deref(), Some("BLUE"));
    assert_eq!(record.mot_expiry_date.as_deref(), Some("2025-06-30"));
    assert_eq!(record.data_sources.get("basic"), Some(&json!("DVLA")));
    assert_eq!(record.completeness_score, 30);
}

#[tokio::test]
async fn test_repeat_lookup_is_served_from_cache() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources {
        dvla: Reply::Data(fiesta_basic()),
        ..Default::default()
    });
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    aggregator.aggregate(request(&[DataType::Basic])).await.unwrap();
    let second = aggregator.aggregate(request(&[DataType::Basic])).await.unwrap();

    assert_eq!(second.cache_hits, 1);
    assert_eq!(second.api_calls, 0);
    assert_eq!(second.total_cost, 0.0);
    assert!(second.sources[&DataType::Basic].cached);
    assert_eq!(second.sources[&DataType::Basic].source, Provider::Dvla);
    assert_eq!(second.data[&DataType::Basic]["make"], "FORD");
    assert_eq!(sources.calls().len(), 1, "cache hit must not call a provider");

    let log = usage::entries_for_registration(&db, REG).await.unwrap();
    assert_eq!(log.len(), 2);
    let hit = &log[1];
    assert!(hit.cached_hit);
    assert_eq!(hit.package, packages::CACHE);
    assert_eq!(hit.cost, 0.0);
    assert_eq!(hit.status, FetchStatus::Success);
    assert!(hit.response_summary.as_ref().unwrap().get("estimatedSaving").is_some());

    // Access count is bumped in the background
    let mut access_count = 0;
    for _ in 0..50 {
        let entry = cache::find_valid(&db, REG, DataType::Basic, garage_common::time::now())
            .await
            .unwrap()
            .unwrap();
        access_count = entry.access_count;
        if access_count > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(access_count, 1);
}

#[tokio::test]
async fn test_registration_is_normalized() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources {
        dvla: Reply::Data(fiesta_basic()),
        ..Default::default()
    });
    let aggregator = create_test_aggregator(&db, sources, AggregatorSettings::default());

    let result = aggregator
        .aggregate(AggregationRequest::new(" ab12 cde ", vec![DataType::Basic]))
        .await
        .unwrap();

    assert_eq!(result.registration, REG);
    assert!(vehicles::load_vehicle(&db, REG).await.unwrap().is_some());
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources::default());
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let bad_reg = aggregator
        .aggregate(AggregationRequest::new("AB-12!", vec![DataType::Basic]))
        .await;
    assert!(matches!(bad_reg, Err(Error::InvalidInput(_))));

    let too_long = aggregator
        .aggregate(AggregationRequest::new("ABCDEFGHJ", vec![DataType::Basic]))
        .await;
    assert!(matches!(too_long, Err(Error::InvalidInput(_))));

    let no_types = aggregator.aggregate(request(&[])).await;
    assert!(matches!(no_types, Err(Error::InvalidInput(_))));

    assert!(sources.calls().is_empty());
}

#[tokio::test]
async fn test_comprehensive_technical_fetches_missing_engine_code() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources {
            sws: Reply::Data(ServiceData {
                engine_code: Some("SFJA".to_string()),
                radio_code: Some("1234".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
        .with_vdg(&packages::COMPREHENSIVE, Reply::Data(fiesta_comprehensive())),
    );
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let result = aggregator
        .aggregate(request(&[DataType::Technical]).comprehensive(true))
        .await
        .unwrap();

    assert_eq!(
        sources.calls(),
        vec!["vdg:VehicleDetails,SpecAndOptionDetails,TyreDetails", "sws"]
    );
    assert_eq!(result.api_calls, 2);
    assert!(approx(result.total_cost, 0.27 + 0.12));

    let summary = &result.sources[&DataType::Technical];
    assert_eq!(summary.source, Provider::Vdg);
    assert!(summary.packages.iter().any(|p| p == packages::TECHNICAL_DATA));
    assert!(approx(summary.cost, 0.39));
    assert_eq!(result.data[&DataType::Technical]["engineCode"], "SFJA");

    // One resolved type: no warming even above the threshold
    assert!(!result.cache_warmed);

    let record = vehicles::load_vehicle(&db, REG).await.unwrap().unwrap();
    assert_eq!(record.engine_code.as_deref(), Some("SFJA"));
    assert_eq!(record.radio_code.as_deref(), Some("1234"));
    assert_eq!(record.derivative.as_deref(), Some("Zetec 1.0 EcoBoost"));
    assert_eq!(record.tyre_size_front.as_deref(), Some("195/50 R16"));
}

#[tokio::test]
async fn test_comprehensive_technical_with_engine_code_skips_sws() {
    let db = create_test_db().await;
    let mut details = fiesta_comprehensive();
    details.engine_code = Some("SFJA".to_string());
    let sources = Arc::new(FakeSources::default().with_vdg(&packages::COMPREHENSIVE, Reply::Data(details)));
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let result = aggregator
        .aggregate(request(&[DataType::Technical]).comprehensive(true))
        .await
        .unwrap();

    assert!(!sources.calls().contains(&"sws".to_string()));
    assert_eq!(result.api_calls, 1);
    assert!(approx(result.total_cost, 0.27));
    assert!(!result.sources[&DataType::Technical]
        .packages
        .iter()
        .any(|p| p == packages::TECHNICAL_DATA));
}

#[tokio::test]
async fn test_mid_tier_technical_is_one_attempt() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources::default()
            .with_vdg(&[packages::SPEC_AND_OPTION_DETAILS], Reply::Data(fiesta_specs()))
            .with_vdg(&[packages::TYRE_DETAILS], Reply::Data(fiesta_tyres())),
    );
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let result = aggregator.aggregate(request(&[DataType::Technical])).await.unwrap();

    assert_eq!(sources.calls().len(), 2);
    assert_eq!(result.api_calls, 1);
    assert!(approx(result.total_cost, 0.18 + 0.04));
    assert_eq!(
        result.sources[&DataType::Technical].packages,
        vec![packages::SPEC_AND_OPTION_DETAILS, packages::TYRE_DETAILS]
    );

    let log = usage::entries_for_registration(&db, REG).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].package, "SpecAndOptionDetails+TyreDetails");

    let record = vehicles::load_vehicle(&db, REG).await.unwrap().unwrap();
    assert_eq!(record.engine_code.as_deref(), Some("SFJA"));
    assert_eq!(record.tyre_pressure_front.as_deref(), Some("33"));
}

#[tokio::test]
async fn test_mid_tier_partial_failure_bills_only_the_answered_call() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources::default()
            .with_vdg(&[packages::SPEC_AND_OPTION_DETAILS], Reply::Fail("timeout".into()))
            .with_vdg(&[packages::TYRE_DETAILS], Reply::Data(fiesta_tyres())),
    );
    let aggregator = create_test_aggregator(&db, sources, AggregatorSettings::default());

    let result = aggregator.aggregate(request(&[DataType::Technical])).await.unwrap();

    assert!(result.data.contains_key(&DataType::Technical));
    assert!(approx(result.total_cost, 0.04));
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources {
        dvla: Reply::Data(fiesta_basic()),
        ..Default::default()
    });
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    aggregator.aggregate(request(&[DataType::Basic])).await.unwrap();
    let refreshed = aggregator
        .aggregate(request(&[DataType::Basic]).force_refresh(true))
        .await
        .unwrap();

    assert_eq!(refreshed.cache_hits, 0);
    assert_eq!(refreshed.api_calls, 1);
    assert!(!refreshed.sources[&DataType::Basic].cached);
    assert_eq!(sources.calls(), vec!["dvla", "dvla"]);

    // The refreshed payload replaces the cached one instead of duplicating it
    assert_eq!(cache::count_entries(&db, REG).await.unwrap(), 1);
}

#[tokio::test]
async fn test_free_provider_error_falls_back_to_paid() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources {
            dvla: Reply::Fail("connection reset".into()),
            ..Default::default()
        }
        .with_vdg(&[packages::VEHICLE_DETAILS], Reply::Data(fiesta_vehicle_details())),
    );
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let result = aggregator.aggregate(request(&[DataType::Basic])).await.unwrap();

    assert_eq!(sources.calls(), vec!["dvla", "vdg:VehicleDetails"]);
    assert_eq!(result.api_calls, 2);
    assert!(approx(result.total_cost, 0.05));
    assert_eq!(result.sources[&DataType::Basic].source, Provider::Vdg);
    assert!(result.errors.is_empty());

    let log = usage::entries_for_registration(&db, REG).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].provider, Provider::Dvla);
    assert_eq!(log[0].status, FetchStatus::Error);
    assert_eq!(log[0].cost, 0.0);
    assert!(!log[0].data_retrieved);
    assert_eq!(log[1].provider, Provider::Vdg);
    assert_eq!(log[1].status, FetchStatus::Success);
    assert!(approx(log[1].cost, 0.05));

    let record = vehicles::load_vehicle(&db, REG).await.unwrap().unwrap();
    assert_eq!(record.model.as_deref(), Some("FIESTA"));
    assert_eq!(record.data_sources.get("basic"), Some(&json!("VDG")));
}

#[tokio::test]
async fn test_mot_no_data_is_billed_and_logged() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources {
        mot: Reply::Empty,
        ..Default::default()
    });
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let result = aggregator.aggregate(request(&[DataType::Mot])).await.unwrap();

    // DVSA empty, VDG MOT package unscripted (empty): both logged, type unresolved
    assert_eq!(sources.calls(), vec!["dvsa", "vdg:MotHistoryDetails"]);
    assert_eq!(result.api_calls, 2);
    assert!(approx(result.total_cost, 0.05));
    assert!(result.errors.contains_key(&DataType::Mot));
    assert_eq!(result.completeness_score, 0);

    let log = usage::entries_for_registration(&db, REG).await.unwrap();
    assert!(log.iter().all(|e| e.status == FetchStatus::NoData));

    // Nothing resolved: no record is written
    assert!(vehicles::load_vehicle(&db, REG).await.unwrap().is_none());
}

#[tokio::test]
async fn test_provider_failure_is_reported_per_type() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources {
        dvla: Reply::Data(fiesta_basic()),
        sws: Reply::Fail("HTTP 503".into()),
        ..Default::default()
    });
    let aggregator = create_test_aggregator(&db, sources, AggregatorSettings::default());

    let result = aggregator
        .aggregate(request(&[DataType::Basic, DataType::Service]))
        .await
        .unwrap();

    assert!(result.data.contains_key(&DataType::Basic));
    assert!(result.errors[&DataType::Service].contains("503"));
    assert_eq!(result.total_cost, 0.0);
    assert_eq!(result.completeness_score, 30);
}

#[tokio::test]
async fn test_later_lookup_never_nulls_stored_fields() {
    let db = create_test_db().await;

    let first = Arc::new(FakeSources {
        dvla: Reply::Data(fiesta_basic()),
        ..Default::default()
    });
    create_test_aggregator(&db, first, AggregatorSettings::default())
        .aggregate(request(&[DataType::Basic]))
        .await
        .unwrap();

    let mut sparse = fiesta_basic();
    sparse.colour = None;
    sparse.tax_status = None;
    let second = Arc::new(
        FakeSources {
            dvla: Reply::Data(sparse),
            ..Default::default()
        }
        .with_vdg(&[packages::VEHICLE_DETAILS_WITH_IMAGE], Reply::Data(fiesta_image())),
    );
    create_test_aggregator(&db, second, AggregatorSettings::default())
        .aggregate(request(&[DataType::Basic, DataType::Image]).force_refresh(true))
        .await
        .unwrap();

    let record = vehicles::load_vehicle(&db, REG).await.unwrap().unwrap();
    assert_eq!(record.colour.as_deref(), Some("BLUE"));
    assert_eq!(record.tax_status.as_deref(), Some("Taxed"));
    assert_eq!(
        record.image_url.as_deref(),
        Some("https://images.example.test/fiesta.jpg")
    );
    assert_eq!(record.data_sources.get("basic"), Some(&json!("DVLA")));
    assert_eq!(record.data_sources.get("image"), Some(&json!("VDG")));
}

#[tokio::test]
async fn test_completeness_reflects_current_call_only() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources {
            dvla: Reply::Data(fiesta_basic()),
            mot: Reply::Data(json!({"motTests": [{"expiryDate": "2025-06-30", "testResult": "PASSED"}]})),
            ..Default::default()
        }
        .with_vdg(&[packages::VEHICLE_DETAILS_WITH_IMAGE], Reply::Data(fiesta_image())),
    );
    let aggregator = create_test_aggregator(&db, sources, AggregatorSettings::default());

    let first = aggregator
        .aggregate(request(&[DataType::Basic, DataType::Mot]))
        .await
        .unwrap();
    assert_eq!(first.completeness_score, 50);

    let second = aggregator.aggregate(request(&[DataType::Image])).await.unwrap();
    assert_eq!(second.completeness_score, 15);

    let record = vehicles::load_vehicle(&db, REG).await.unwrap().unwrap();
    assert_eq!(record.completeness_score, 15);
}

#[tokio::test]
async fn test_fully_cached_request_makes_no_provider_calls() {
    let db = create_test_db().await;
    let sources = Arc::new(FakeSources {
        dvla: Reply::Data(fiesta_basic()),
        mot: Reply::Data(json!({"motTests": [{"expiryDate": "2025-06-30"}]})),
        ..Default::default()
    });
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    aggregator
        .aggregate(request(&[DataType::Basic, DataType::Mot]))
        .await
        .unwrap();
    let calls_before = sources.calls().len();

    let cached = aggregator
        .aggregate(request(&[DataType::Mot, DataType::Basic, DataType::Mot]))
        .await
        .unwrap();

    assert_eq!(sources.calls().len(), calls_before);
    assert_eq!(cached.cache_hits, 2);
    assert_eq!(cached.api_calls, 0);
    assert_eq!(cached.completeness_score, 50);
}

#[tokio::test]
async fn test_expensive_call_warms_cache_idempotently() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources {
            dvla: Reply::Data(fiesta_basic()),
            ..Default::default()
        }
        .with_vdg(&[packages::VEHICLE_DETAILS_WITH_IMAGE], Reply::Data(fiesta_image()))
        .with_vdg(&[packages::SPEC_AND_OPTION_DETAILS], Reply::Data(fiesta_specs()))
        .with_vdg(&[packages::TYRE_DETAILS], Reply::Data(fiesta_tyres())),
    );
    let aggregator = create_test_aggregator(&db, sources, AggregatorSettings::default());
    let types = [DataType::Basic, DataType::Image, DataType::Technical];

    let first = aggregator.aggregate(request(&types)).await.unwrap();
    assert!(approx(first.total_cost, 0.14 + 0.18 + 0.04));
    assert!(first.cache_warmed);

    // Provider entries plus a VDG copy of the free basic payload
    let entries = cache::count_entries(&db, REG).await.unwrap();
    assert_eq!(entries, 4);

    let second = aggregator
        .aggregate(request(&types).force_refresh(true))
        .await
        .unwrap();
    assert!(second.cache_warmed);
    assert_eq!(cache::count_entries(&db, REG).await.unwrap(), entries);
}

#[tokio::test]
async fn test_cache_warming_skips_types_served_from_cache() {
    let db = create_test_db().await;
    cache::store(
        &db,
        REG,
        DataType::Mot,
        Provider::Dvsa,
        &json!({"format": "DVSA", "motExpiryDate": "2025-06-30", "history": {"motTests": []}}),
        chrono::Duration::minutes(1),
    )
    .await
    .unwrap();

    let sources = Arc::new(
        FakeSources::default()
            .with_vdg(&[packages::VEHICLE_DETAILS_WITH_IMAGE], Reply::Data(fiesta_image()))
            .with_vdg(&[packages::SPEC_AND_OPTION_DETAILS], Reply::Data(fiesta_specs()))
            .with_vdg(&[packages::TYRE_DETAILS], Reply::Data(fiesta_tyres())),
    );
    let aggregator = create_test_aggregator(&db, sources.clone(), AggregatorSettings::default());

    let result = aggregator
        .aggregate(request(&[DataType::Mot, DataType::Image, DataType::Technical]))
        .await
        .unwrap();

    assert_eq!(result.cache_hits, 1);
    assert!(approx(result.total_cost, 0.14 + 0.18 + 0.04));
    assert!(result.cache_warmed);
    assert!(!sources.calls().contains(&"dvsa".to_string()));

    // The short-lived MOT entry was not re-stored with a fresh TTL
    let later = garage_common::time::now() + chrono::Duration::hours(12);
    assert!(cache::find_valid(&db, REG, DataType::Mot, later).await.unwrap().is_none());
    let image = cache::find_valid(&db, REG, DataType::Image, later).await.unwrap().unwrap();
    assert_eq!(image.provider, Provider::Vdg);
    assert_eq!(cache::count_entries(&db, REG).await.unwrap(), 3);
}

#[tokio::test]
async fn test_cache_warming_can_be_disabled() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources {
            dvla: Reply::Data(fiesta_basic()),
            ..Default::default()
        }
        .with_vdg(&[packages::VEHICLE_DETAILS_WITH_IMAGE], Reply::Data(fiesta_image()))
        .with_vdg(&[packages::SPEC_AND_OPTION_DETAILS], Reply::Data(fiesta_specs())),
    );
    let settings = AggregatorSettings {
        cache_warming_enabled: false,
        ..Default::default()
    };
    let aggregator = create_test_aggregator(&db, sources, settings);

    let result = aggregator
        .aggregate(request(&[DataType::Basic, DataType::Image, DataType::Technical]))
        .await
        .unwrap();

    assert!(!result.cache_warmed);
    assert_eq!(cache::count_entries(&db, REG).await.unwrap(), 3);
}

#[tokio::test]
async fn test_spend_is_tracked_per_provider_and_month() {
    let db = create_test_db().await;
    let sources = Arc::new(
        FakeSources {
            dvla: Reply::Fail("timeout".into()),
            ..Default::default()
        }
        .with_vdg(&[packages::VEHICLE_DETAILS], Reply::Data(fiesta_vehicle_details())),
    );
    let mut settings = AggregatorSettings::default();
    settings.budget_limits.insert(Provider::Vdg, 0.01);
    let aggregator = create_test_aggregator(&db, sources, settings);

    // Over budget is reported, never enforced
    let result = aggregator.aggregate(request(&[DataType::Basic])).await.unwrap();
    assert!(result.data.contains_key(&DataType::Basic));

    let month = garage_common::time::month_key(garage_common::time::now());
    let budgets = usage::budget_rows(&db, &month).await.unwrap();
    let vdg = budgets.iter().find(|b| b.provider == "VDG").unwrap();
    assert!(approx(vdg.current_spend, 0.05));
    assert!(vdg.over_budget());
    let dvla = budgets.iter().find(|b| b.provider == "DVLA").unwrap();
    assert_eq!(dvla.current_spend, 0.0);

    let summary = usage::usage_summary(&db, &month).await.unwrap();
    let dvla_usage = summary.iter().find(|u| u.provider == "DVLA").unwrap();
    assert_eq!(dvla_usage.calls, 1);
    assert_eq!(dvla_usage.errors, 1);
}
