//! Error types for each pipeline stage.
//!
//! Grid, sampling, geocoding and routing errors are fatal to the grid they
//! occur on and are collected into [`PipelineError`]. Warehouse errors never
//! leave the writer; they are folded into its write report.

use thiserror::Error;

use crate::model::TravelMode;

#[derive(Debug, Error)]
pub enum GridLoadError {
    #[error("I/O error reading grid {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed grid {name}: {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    #[error("grid {name} has no `{column}` column")]
    MissingColumn { name: String, column: &'static str },

    #[error("HTTP error fetching {name}: {source}")]
    Http {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid grid location: {0}")]
    Location(String),
}

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("grid has {rows} rows, at least 2 are required")]
    TooFewRows { rows: usize },

    #[error("row {row} has invalid density {density}")]
    InvalidDensity { row: usize, density: f64 },

    #[error("only {positive} rows carry a positive density, at least 2 are required")]
    InsufficientWeight { positive: usize },

    #[error("densities sum to {sum}, expected 1")]
    DensitySum { sum: f64 },

    #[error("weighted draw failed: {0}")]
    Weights(#[from] rand::distributions::WeightedError),
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("reverse geocode request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reverse geocode returned no address for {latitude}, {longitude}")]
    MissingAddress { latitude: f64, longitude: f64 },
}

#[derive(Debug, Error)]
pub enum RouteLookupError {
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{mode} route lookup returned status {status}")]
    Status { mode: TravelMode, status: String },

    #[error("{mode} route lookup response is missing {field}")]
    MissingField { mode: TravelMode, field: &'static str },

    #[error("{mode} is not supported by this routing backend")]
    UnsupportedMode { mode: TravelMode },
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("warehouse rejected insert with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("conflicting settings: {0}")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("expected exactly one MultiPolygon feature, found {0}")]
    MultiPolygonCount(usize),

    #[error("boundary encloses no area")]
    Degenerate,
}

/// Any failure that aborts processing of a single grid.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    GridLoad(#[from] GridLoadError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    RouteLookup(#[from] RouteLookupError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::GridLoad(_) => "grid_load",
            PipelineError::Sampling(_) => "sampling",
            PipelineError::Geocode(_) => "geocode",
            PipelineError::RouteLookup(_) => "route_lookup",
        }
    }
}
