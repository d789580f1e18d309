//! urban-journeys
//!
//! Samples population-weighted origin/destination pairs inside cities,
//! enriches them with reverse-geocoded addresses, measures multi-modal travel
//! between them and persists stops and journeys to warehouse tables.

pub mod model;
pub mod error;
pub mod traits;
pub mod config;
pub mod grid;
pub mod gcs;
pub mod jitter;
pub mod sampler;
pub mod boundary;
pub mod geocode;
pub mod ids;
pub mod journey;
pub mod google;
pub mod osrm;
pub mod haversine;
pub mod warehouse;
pub mod bigquery;
pub mod pipeline;
