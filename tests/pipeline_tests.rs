//! End-to-end runs of the orchestrator against in-memory services.

mod fixtures;

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use urban_journeys::config::RunSettings;
use urban_journeys::error::PipelineError;
use urban_journeys::haversine::{HaversineFallback, HaversineRouter};
use urban_journeys::model::{Coordinate, TravelMode};
use urban_journeys::traits::RoutingProvider;
use urban_journeys::pipeline::{FailurePolicy, GridOutcome, Pipeline};

use fixtures::{FixedRouter, MockGeocoder, MockGridSource, MockWarehouse, berlin, city_grid, lisbon};

fn settings(policy: FailurePolicy) -> RunSettings {
    RunSettings {
        radius_m: 300.0,
        failure_policy: policy,
        ..RunSettings::default()
    }
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(2024)
}

// ============================================================================
// Successful runs
// ============================================================================

#[test]
fn run_writes_two_stops_and_one_journey_per_grid() {
    let settings = settings(FailurePolicy::AbortRun);
    let grids = MockGridSource::new(vec![berlin(), lisbon()]);
    let geocoder = MockGeocoder::default();
    let router = FixedRouter::new(600, 5000);
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(report.is_clean());
    assert_eq!(report.processed(), 2);
    assert_eq!(warehouse.call_count(), 2);
    {
        let calls = warehouse.calls.borrow();
        assert_eq!(calls[0].0, "stops");
        assert_eq!(calls[1].0, "journeys");
    }

    let stops = warehouse.rows_for("stops");
    let journeys = warehouse.rows_for("journeys");
    assert_eq!(stops.len(), 4);
    assert_eq!(journeys.len(), 2);
    assert_eq!(geocoder.calls.get(), 4);
    assert_eq!(router.calls.borrow().len(), 6);

    let roles: Vec<&str> = stops.iter().map(|stop| stop["type"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["origin", "destination", "origin", "destination"]);

    assert_eq!(stops[0]["city"], "Berlin");
    assert_eq!(stops[2]["city"], "Lisboa");
    assert_eq!(stops[0]["country"], "Testland");
    assert!(stops[0]["house_number"].is_null());
    assert!(stops[0]["postcode"].is_null());

    for (pair, journey) in stops.chunks(2).zip(&journeys) {
        let origin = pair[0]["id"].as_i64().unwrap();
        let destination = pair[1]["id"].as_i64().unwrap();
        assert_eq!(destination, origin + 1);
        assert_eq!(journey["origin"].as_i64(), Some(origin));
        assert_eq!(journey["destination"].as_i64(), Some(destination));
        assert_eq!(journey["insertion_time"], pair[0]["insertion_time"]);
        for field in ["driving_duration", "transit_duration", "bicycling_duration"] {
            assert_eq!(journey[field], 600);
        }
        for field in ["driving_distance", "transit_distance", "bicycling_distance"] {
            assert_eq!(journey[field], 5000);
        }
    }
}

#[test]
fn stop_ids_never_collide_across_grids() {
    let settings = settings(FailurePolicy::AbortRun);
    let grids = MockGridSource::new(vec![
        berlin(),
        lisbon(),
        city_grid("porto.csv", "Porto", &[(41.15, -8.61, 10.0), (41.16, -8.62, 20.0)]),
    ]);
    let geocoder = MockGeocoder::default();
    let router = FixedRouter::new(60, 500);
    let warehouse = MockWarehouse::default();

    Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    let ids: Vec<i64> = warehouse
        .rows_for("stops")
        .iter()
        .map(|stop| stop["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 6);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 6);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn sampled_points_stay_near_their_city() {
    let settings = settings(FailurePolicy::AbortRun);
    let grids = MockGridSource::new(vec![berlin()]);
    let geocoder = MockGeocoder::default();
    let router = FixedRouter::new(60, 500);
    let warehouse = MockWarehouse::default();

    Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    for stop in warehouse.rows_for("stops") {
        let latitude = stop["latitude"].as_f64().unwrap();
        let longitude = stop["longitude"].as_f64().unwrap();
        assert!((52.47..52.55).contains(&latitude), "latitude {}", latitude);
        assert!((13.39..13.45).contains(&longitude), "longitude {}", longitude);
    }
}

#[test]
fn rejected_rows_do_not_abort_the_run() {
    let settings = settings(FailurePolicy::AbortRun);
    let grids = MockGridSource::new(vec![berlin()]);
    let geocoder = MockGeocoder::default();
    let router = FixedRouter::new(600, 5000);
    let warehouse = MockWarehouse {
        reject_index: Some(1),
        ..MockWarehouse::default()
    };

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(!report.aborted);
    assert_eq!(warehouse.call_count(), 2);
    let stops = report.stops.as_ref().unwrap();
    assert_eq!(stops.submitted, 2);
    assert_eq!(stops.accepted(), 1);
    assert!(report.journeys.as_ref().unwrap().is_complete());
    assert!(!report.is_clean());
}

#[test]
fn road_router_without_transit_still_produces_journeys() {
    let settings = settings(FailurePolicy::AbortRun);
    let grids = MockGridSource::new(vec![berlin(), lisbon()]);
    let geocoder = MockGeocoder::default();
    // shaped like the OSRM backend: no timetable data
    let router = HaversineFallback::new(FixedRouter {
        unsupported: Some(TravelMode::Transit),
        ..FixedRouter::new(600, 5000)
    });
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(report.is_clean());
    assert_eq!(router.primary().calls.borrow().len(), 6);
    let stops = warehouse.rows_for("stops");
    let journeys = warehouse.rows_for("journeys");
    assert_eq!(journeys.len(), 2);

    let at = |stop: &serde_json::Value| {
        Coordinate::new(stop["latitude"].as_f64().unwrap(), stop["longitude"].as_f64().unwrap())
    };
    for (pair, journey) in stops.chunks(2).zip(&journeys) {
        let estimate = HaversineRouter::default()
            .leg(at(&pair[0]), at(&pair[1]), TravelMode::Transit, chrono::Utc::now())
            .unwrap();
        assert_eq!(journey["driving_duration"], 600);
        assert_eq!(journey["bicycling_distance"], 5000);
        assert_eq!(journey["transit_distance"].as_u64(), Some(estimate.distance_m));
        assert_eq!(journey["transit_duration"].as_u64(), Some(estimate.duration_s));
    }
}

// ============================================================================
// Failures under the abort policy
// ============================================================================

#[test]
fn enrichment_failure_on_second_grid_discards_everything() {
    let settings = settings(FailurePolicy::AbortRun);
    let grids = MockGridSource::new(vec![berlin(), lisbon()]);
    // calls 1-2 enrich Berlin, call 3 is Lisbon's origin
    let geocoder = MockGeocoder::failing_on_call(3);
    let router = FixedRouter::new(600, 5000);
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(report.aborted);
    assert_eq!(warehouse.call_count(), 0);
    assert!(report.stops.is_none() && report.journeys.is_none());
    assert_eq!(report.outcomes.len(), 2);
    assert!(matches!(report.outcomes[0], GridOutcome::Processed { ref city, .. } if city == "Berlin"));
    assert!(matches!(
        report.outcomes[1],
        GridOutcome::Failed { error: PipelineError::Geocode(_), .. }
    ));
    // Lisbon's destination is never geocoded and no route is queried for it
    assert_eq!(geocoder.calls.get(), 3);
    assert_eq!(router.calls.borrow().len(), 3);
}

#[test]
fn route_failure_stops_remaining_modes_and_grids() {
    let settings = settings(FailurePolicy::AbortRun);
    let grids = MockGridSource::new(vec![berlin(), lisbon()]);
    let geocoder = MockGeocoder::default();
    let router = FixedRouter {
        failing: Some(TravelMode::Transit),
        ..FixedRouter::new(600, 5000)
    };
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(report.aborted);
    assert_eq!(warehouse.call_count(), 0);
    assert_eq!(*router.calls.borrow(), vec![TravelMode::Driving, TravelMode::Transit]);
    assert_eq!(*grids.loads.borrow(), vec!["berlin.csv".to_string()]);
    assert!(matches!(
        report.outcomes[0],
        GridOutcome::Failed { error: PipelineError::RouteLookup(_), .. }
    ));
}

#[test]
fn listing_failure_processes_nothing() {
    let settings = settings(FailurePolicy::SkipGrid);
    let grids = MockGridSource {
        fail_listing: true,
        ..MockGridSource::new(vec![berlin()])
    };
    let geocoder = MockGeocoder::default();
    let router = FixedRouter::new(600, 5000);
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(report.aborted);
    assert!(matches!(report.listing_error, Some(PipelineError::GridLoad(_))));
    assert!(grids.loads.borrow().is_empty());
    assert_eq!(warehouse.call_count(), 0);
}

// ============================================================================
// Failures under the skip policy
// ============================================================================

#[test]
fn skip_policy_flushes_grids_that_succeeded() {
    let settings = settings(FailurePolicy::SkipGrid);
    let grids = MockGridSource::new(vec![berlin(), lisbon()]);
    let geocoder = MockGeocoder::failing_on_call(3);
    let router = FixedRouter::new(600, 5000);
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(!report.aborted);
    assert_eq!(report.processed(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(warehouse.call_count(), 2);
    let stops = warehouse.rows_for("stops");
    assert_eq!(stops.len(), 2);
    assert!(stops.iter().all(|stop| stop["city"] == "Berlin"));
    assert_eq!(warehouse.rows_for("journeys").len(), 1);
}

#[test]
fn skip_policy_survives_unusable_grids() {
    let settings = settings(FailurePolicy::SkipGrid);
    let grids = MockGridSource::new(vec![
        city_grid("tiny.csv", "Tiny", &[(10.0, 10.0, 5.0)]),
        berlin(),
        city_grid("ghost.csv", "Ghost", &[(11.0, 11.0, 0.0), (11.1, 11.1, 0.0)]),
    ]);
    let geocoder = MockGeocoder::default();
    let router = FixedRouter::new(600, 5000);
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    let failed: Vec<&str> = report
        .outcomes
        .iter()
        .filter(|outcome| outcome.is_failure())
        .map(GridOutcome::grid)
        .collect();
    assert_eq!(failed, vec!["tiny.csv", "ghost.csv"]);
    assert!(report
        .outcomes
        .iter()
        .all(|outcome| !outcome.is_failure() || matches!(outcome, GridOutcome::Failed { error: PipelineError::Sampling(_), .. })));
    assert_eq!(warehouse.rows_for("stops").len(), 2);
    assert_eq!(warehouse.rows_for("journeys").len(), 1);
    // sampling failures happen before any lookup
    assert_eq!(geocoder.calls.get(), 2);
}

#[test]
fn skip_policy_with_every_grid_failing_writes_nothing() {
    let settings = settings(FailurePolicy::SkipGrid);
    let grids = MockGridSource::new(vec![city_grid("tiny.csv", "Tiny", &[(10.0, 10.0, 5.0)])]);
    let geocoder = MockGeocoder::default();
    let router = FixedRouter::new(600, 5000);
    let warehouse = MockWarehouse::default();

    let report = Pipeline::new(&settings, &grids, &geocoder, &router, &warehouse).run(&mut rng());

    assert!(!report.aborted);
    assert_eq!(warehouse.call_count(), 0);
    assert_eq!(report.stops.as_ref().map(|stops| stops.submitted), Some(0));
    assert_eq!(report.journeys.as_ref().map(|journeys| journeys.submitted), Some(0));
}
