//! Capability traits for every external service the pipeline calls.
//!
//! These are intentionally minimal. Concrete HTTP adapters live in their own
//! modules; tests substitute deterministic in-memory implementations.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{GeocodeError, GridLoadError, RouteLookupError, WarehouseError};
use crate::model::{Coordinate, ModeLeg, PopulationGrid, TravelMode};

/// Enumerates and loads city population grids.
pub trait GridSource {
    /// Names of all available grids, in processing order.
    fn grid_names(&self) -> Result<Vec<String>, GridLoadError>;

    fn load_grid(&self, name: &str) -> Result<PopulationGrid, GridLoadError>;
}

/// Reverse-geocoding service.
pub trait ReverseGeocoder {
    /// Raw response body for the coordinate. Address extraction is left to
    /// the caller so every backend is interpreted the same way.
    fn reverse(&self, at: Coordinate) -> Result<Value, GeocodeError>;
}

/// Provides travel duration and distance between two points for one mode.
pub trait RoutingProvider {
    fn leg(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        departure: DateTime<Utc>,
    ) -> Result<ModeLeg, RouteLookupError>;
}

/// A row rejected by a bulk insert.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RowError {
    /// Position of the row in the submitted batch.
    pub index: usize,
    pub message: String,
}

/// Bulk row sink for warehouse tables.
pub trait Warehouse {
    /// Inserts `rows` into `table` with a single call. An empty result means
    /// every row was accepted.
    fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<Vec<RowError>, WarehouseError>;
}

impl<T: GridSource + ?Sized> GridSource for Box<T> {
    fn grid_names(&self) -> Result<Vec<String>, GridLoadError> {
        (**self).grid_names()
    }

    fn load_grid(&self, name: &str) -> Result<PopulationGrid, GridLoadError> {
        (**self).load_grid(name)
    }
}

impl<T: ReverseGeocoder + ?Sized> ReverseGeocoder for Box<T> {
    fn reverse(&self, at: Coordinate) -> Result<Value, GeocodeError> {
        (**self).reverse(at)
    }
}

impl<T: RoutingProvider + ?Sized> RoutingProvider for Box<T> {
    fn leg(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        departure: DateTime<Utc>,
    ) -> Result<ModeLeg, RouteLookupError> {
        (**self).leg(origin, destination, mode, departure)
    }
}

impl<T: Warehouse + ?Sized> Warehouse for Box<T> {
    fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<Vec<RowError>, WarehouseError> {
        (**self).insert_rows(table, rows)
    }
}
