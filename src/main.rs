use std::process::ExitCode;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use urban_journeys::bigquery::BigQueryWarehouse;
use urban_journeys::config::{GridBackend, PipelineConfig, RoutingBackend, WarehouseBackend};
use urban_journeys::gcs::GcsGridSource;
use urban_journeys::geocode::NominatimClient;
use urban_journeys::google::GoogleDistanceMatrix;
use urban_journeys::grid::DirectoryGridSource;
use urban_journeys::haversine::{HaversineFallback, HaversineRouter};
use urban_journeys::osrm::OsrmRouter;
use urban_journeys::pipeline::Pipeline;
use urban_journeys::traits::{GridSource, RoutingProvider, Warehouse};
use urban_journeys::warehouse::JsonLinesWarehouse;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %err, "could not build HTTP clients");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the run completed without aborting.
fn run(config: &PipelineConfig) -> Result<bool, reqwest::Error> {
    let grids: Box<dyn GridSource> = match &config.grids {
        GridBackend::Directory(dir) => Box::new(DirectoryGridSource::new(dir)),
        GridBackend::Bucket(gcs) => Box::new(GcsGridSource::new(gcs.clone())?),
    };
    let geocoder = NominatimClient::new(config.geocoder.clone())?;
    let router: Box<dyn RoutingProvider> = match &config.routing {
        RoutingBackend::Google(google) => Box::new(GoogleDistanceMatrix::new(google.clone())?),
        RoutingBackend::Osrm(osrm) => Box::new(HaversineFallback::new(OsrmRouter::new(osrm.clone())?)),
        RoutingBackend::Haversine => Box::new(HaversineRouter::default()),
    };
    let warehouse: Box<dyn Warehouse> = match &config.warehouse {
        WarehouseBackend::BigQuery(bq) => Box::new(BigQueryWarehouse::new(bq.clone())?),
        WarehouseBackend::JsonLines { dir } => Box::new(JsonLinesWarehouse::new(dir)),
    };

    let mut rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = Pipeline::new(&config.run, &grids, &geocoder, &router, &warehouse).run(&mut rng);

    for outcome in report.outcomes.iter().filter(|outcome| outcome.is_failure()) {
        info!(grid = outcome.grid(), "grid did not produce records");
    }
    if let Some(stops) = &report.stops {
        info!(table = %stops.table, accepted = stops.accepted(), submitted = stops.submitted, "stops written");
    }
    if let Some(journeys) = &report.journeys {
        info!(table = %journeys.table, accepted = journeys.accepted(), submitted = journeys.submitted, "journeys written");
    }

    Ok(!report.aborted)
}
