//! Test fixtures for urban-journeys.
//!
//! Provides:
//! - small population grids built from real city coordinates
//! - deterministic in-memory implementations of every capability trait
//! - log capture for asserting on `tracing` output

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use urban_journeys::error::{GeocodeError, GridLoadError, RouteLookupError, WarehouseError};
use urban_journeys::model::{Coordinate, GridRow, ModeLeg, PopulationGrid, TravelMode};
use urban_journeys::traits::{GridSource, ReverseGeocoder, RoutingProvider, RowError, Warehouse};

// ============================================================================
// Grids
// ============================================================================

/// Grid with densities derived from the given `(lat, lng, population)` cells.
pub fn city_grid(name: &str, city: &str, cells: &[(f64, f64, f64)]) -> PopulationGrid {
    let rows = cells
        .iter()
        .map(|(latitude, longitude, population)| GridRow {
            latitude: *latitude,
            longitude: *longitude,
            population: *population,
            city: city.to_string(),
            density: 0.0,
        })
        .collect();
    PopulationGrid::with_derived_density(name, rows)
}

pub fn berlin() -> PopulationGrid {
    city_grid(
        "berlin.csv",
        "Berlin",
        &[
            (52.5200, 13.4050, 3200.0), // Mitte
            (52.4990, 13.4180, 2800.0), // Kreuzberg
            (52.5390, 13.4240, 2500.0), // Prenzlauer Berg
            (52.4800, 13.4350, 1500.0), // Neukölln
        ],
    )
}

pub fn lisbon() -> PopulationGrid {
    city_grid(
        "lisbon.csv",
        "Lisboa",
        &[
            (38.7110, -9.1390, 1800.0), // Baixa
            (38.7130, -9.1300, 1200.0), // Alfama
            (38.7370, -9.1390, 2100.0), // Avenidas Novas
        ],
    )
}

// ============================================================================
// Grid source
// ============================================================================

#[derive(Default)]
pub struct MockGridSource {
    pub grids: Vec<PopulationGrid>,
    pub fail_listing: bool,
    pub loads: RefCell<Vec<String>>,
}

impl MockGridSource {
    pub fn new(grids: Vec<PopulationGrid>) -> Self {
        Self {
            grids,
            ..Self::default()
        }
    }
}

impl GridSource for MockGridSource {
    fn grid_names(&self) -> Result<Vec<String>, GridLoadError> {
        if self.fail_listing {
            return Err(GridLoadError::Location("bucket does not exist".to_string()));
        }
        Ok(self.grids.iter().map(|grid| grid.name().to_string()).collect())
    }

    fn load_grid(&self, name: &str) -> Result<PopulationGrid, GridLoadError> {
        self.loads.borrow_mut().push(name.to_string());
        self.grids
            .iter()
            .find(|grid| grid.name() == name)
            .cloned()
            .ok_or_else(|| GridLoadError::Location(format!("no grid named {}", name)))
    }
}

// ============================================================================
// Geocoder
// ============================================================================

/// Answers every lookup with a road and country, and a city that must be
/// ignored. Call number `fail_on_call` (1-based) gets an error body instead.
#[derive(Default)]
pub struct MockGeocoder {
    pub fail_on_call: Option<usize>,
    pub calls: Cell<usize>,
}

impl MockGeocoder {
    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }
}

impl ReverseGeocoder for MockGeocoder {
    fn reverse(&self, at: Coordinate) -> Result<Value, GeocodeError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.fail_on_call == Some(call) {
            return Ok(json!({"error": "Unable to geocode"}));
        }
        Ok(json!({
            "lat": at.latitude.to_string(),
            "lon": at.longitude.to_string(),
            "address": {
                "road": format!("Road {}", call),
                "country": "Testland",
                "city": "Geocoder City"
            }
        }))
    }
}

// ============================================================================
// Router
// ============================================================================

/// Returns the same leg for every mode unless the mode is listed as failing
/// or unsupported.
pub struct FixedRouter {
    pub leg: ModeLeg,
    pub failing: Option<TravelMode>,
    pub unsupported: Option<TravelMode>,
    pub calls: RefCell<Vec<TravelMode>>,
}

impl FixedRouter {
    pub fn new(duration_s: u64, distance_m: u64) -> Self {
        Self {
            leg: ModeLeg {
                duration_s,
                traffic_duration_s: None,
                distance_m,
            },
            failing: None,
            unsupported: None,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl RoutingProvider for FixedRouter {
    fn leg(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
        mode: TravelMode,
        _departure: DateTime<Utc>,
    ) -> Result<ModeLeg, RouteLookupError> {
        self.calls.borrow_mut().push(mode);
        if self.failing == Some(mode) {
            return Err(RouteLookupError::MissingField {
                mode,
                field: "duration",
            });
        }
        if self.unsupported == Some(mode) {
            return Err(RouteLookupError::UnsupportedMode { mode });
        }
        Ok(self.leg)
    }
}

// ============================================================================
// Warehouse
// ============================================================================

/// Records every insert call. Rows at `reject_index` are reported as failed.
#[derive(Default)]
pub struct MockWarehouse {
    pub reject_index: Option<usize>,
    pub calls: RefCell<Vec<(String, Vec<Value>)>>,
}

impl MockWarehouse {
    pub fn rows_for(&self, table: &str) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .filter(|(name, _)| name == table)
            .flat_map(|(_, rows)| rows.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Warehouse for MockWarehouse {
    fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<Vec<RowError>, WarehouseError> {
        self.calls.borrow_mut().push((table.to_string(), rows.to_vec()));
        Ok(self
            .reject_index
            .filter(|index| *index < rows.len())
            .map(|index| RowError {
                index,
                message: "invalid: no such field".to_string(),
            })
            .into_iter()
            .collect())
    }
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a subscriber that writes plain-text logs into a buffer and
/// returns the result together with everything logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::TRACE)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
