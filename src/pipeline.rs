//! Orchestrates one run over every available city grid.
//!
//! Grids are processed strictly one after another. Records are staged in
//! memory and flushed with exactly two bulk writes (stops, then journeys)
//! once the loop ends. Under [`FailurePolicy::AbortRun`] the first failing
//! grid ends the run and everything staged so far is discarded without any
//! write; under [`FailurePolicy::SkipGrid`] the failure is recorded and the
//! remaining grids still run.

use std::str::FromStr;

use chrono::Utc;
use rand::Rng;
use tracing::{error, info, warn};

use crate::config::RunSettings;
use crate::error::PipelineError;
use crate::geocode::GeocodeEnricher;
use crate::ids::StopIdentifier;
use crate::journey::JourneyComputer;
use crate::model::{JourneyRecord, StopRecord, StopRole};
use crate::sampler::GridSampler;
use crate::traits::{GridSource, ReverseGeocoder, RoutingProvider, Warehouse};
use crate::warehouse::{WarehouseWriter, WriteReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing grid and write nothing.
    #[default]
    AbortRun,
    /// Record the failure, continue, and flush what was staged.
    SkipGrid,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::AbortRun),
            "skip" => Ok(FailurePolicy::SkipGrid),
            other => Err(format!("unknown failure policy {:?}, expected abort or skip", other)),
        }
    }
}

#[derive(Debug)]
pub enum GridOutcome {
    Processed { grid: String, city: String },
    Failed { grid: String, error: PipelineError },
}

impl GridOutcome {
    pub fn grid(&self) -> &str {
        match self {
            GridOutcome::Processed { grid, .. } | GridOutcome::Failed { grid, .. } => grid,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, GridOutcome::Failed { .. })
    }
}

/// Everything one run did.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<GridOutcome>,
    /// The run stopped early; no writes were made.
    pub aborted: bool,
    /// Listing the grids failed; nothing was processed.
    pub listing_error: Option<PipelineError>,
    pub stops: Option<WriteReport>,
    pub journeys: Option<WriteReport>,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| !outcome.is_failure()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_failure()).count()
    }

    /// True when every grid was processed and every row written.
    pub fn is_clean(&self) -> bool {
        !self.aborted
            && self.listing_error.is_none()
            && self.failed() == 0
            && self.stops.as_ref().is_none_or(WriteReport::is_complete)
            && self.journeys.as_ref().is_none_or(WriteReport::is_complete)
    }
}

/// Records produced by one grid.
struct StagedGrid {
    city: String,
    stops: [StopRecord; 2],
    journey: JourneyRecord,
}

pub struct Pipeline<'a, S, G, R, W> {
    settings: &'a RunSettings,
    grids: &'a S,
    geocoder: &'a G,
    router: &'a R,
    warehouse: &'a W,
}

impl<'a, S, G, R, W> Pipeline<'a, S, G, R, W>
where
    S: GridSource,
    G: ReverseGeocoder,
    R: RoutingProvider,
    W: Warehouse,
{
    pub fn new(settings: &'a RunSettings, grids: &'a S, geocoder: &'a G, router: &'a R, warehouse: &'a W) -> Self {
        Self {
            settings,
            grids,
            geocoder,
            router,
            warehouse,
        }
    }

    pub fn run<Rn: Rng + ?Sized>(&self, rng: &mut Rn) -> RunReport {
        let mut report = RunReport::default();

        let names = match self.grids.grid_names() {
            Ok(names) => names,
            Err(err) => {
                let err = PipelineError::from(err);
                error!(kind = err.kind(), error = %err, "could not list grids, aborting run");
                report.aborted = true;
                report.listing_error = Some(err);
                return report;
            }
        };
        info!(grids = names.len(), policy = ?self.settings.failure_policy, "starting run");

        let sampler = GridSampler::new(self.settings.radius_m);
        let mut ids = StopIdentifier::new();
        let mut stops: Vec<StopRecord> = Vec::with_capacity(names.len() * 2);
        let mut journeys: Vec<JourneyRecord> = Vec::with_capacity(names.len());

        for name in names {
            info!(grid = %name, "processing grid");
            match self.process_grid(&name, &sampler, &mut ids, rng) {
                Ok(staged) => {
                    info!(grid = %name, city = %staged.city, "grid processed");
                    stops.extend(staged.stops);
                    journeys.push(staged.journey);
                    report.outcomes.push(GridOutcome::Processed {
                        grid: name,
                        city: staged.city,
                    });
                }
                Err(err) => {
                    error!(grid = %name, kind = err.kind(), error = %err, "grid failed");
                    report.outcomes.push(GridOutcome::Failed { grid: name, error: err });
                    if self.settings.failure_policy == FailurePolicy::AbortRun {
                        warn!(
                            discarded_stops = stops.len(),
                            discarded_journeys = journeys.len(),
                            "aborting run, staged records are discarded"
                        );
                        report.aborted = true;
                        return report;
                    }
                }
            }
        }

        let writer = WarehouseWriter::new(self.warehouse);
        report.stops = Some(writer.write(&self.settings.stops_table, &stops));
        report.journeys = Some(writer.write(&self.settings.journeys_table, &journeys));

        info!(
            processed = report.processed(),
            failed = report.failed(),
            stops = stops.len(),
            journeys = journeys.len(),
            "run finished"
        );
        report
    }

    fn process_grid<Rn: Rng + ?Sized>(
        &self,
        name: &str,
        sampler: &GridSampler,
        ids: &mut StopIdentifier,
        rng: &mut Rn,
    ) -> Result<StagedGrid, PipelineError> {
        let grid = self.grids.load_grid(name)?;
        let pair = sampler.sample_pair(&grid, rng)?;

        let enricher = GeocodeEnricher::new(self.geocoder);
        let origin = enricher.enrich(&pair.origin, &pair.city)?;
        let destination = enricher.enrich(&pair.destination, &pair.city)?;

        let stop_ids = ids.next_pair();
        let journey = JourneyComputer::new(self.router).compute(&origin, &destination, &stop_ids, Utc::now())?;

        Ok(StagedGrid {
            city: pair.city,
            stops: [
                StopRecord {
                    id: stop_ids.origin_id,
                    insertion_time: stop_ids.origin_time,
                    role: StopRole::Origin,
                    point: origin,
                },
                StopRecord {
                    id: stop_ids.destination_id,
                    insertion_time: stop_ids.destination_time,
                    role: StopRole::Destination,
                    point: destination,
                },
            ],
            journey,
        })
    }
}
