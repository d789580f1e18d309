//! Google Distance Matrix adapter for single origin/destination queries.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::http_client;
use crate::error::RouteLookupError;
use crate::model::{Coordinate, ModeLeg, TravelMode};
use crate::traits::RoutingProvider;

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: Option<u64>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            api_key: String::new(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleDistanceMatrix {
    config: GoogleConfig,
    client: reqwest::blocking::Client,
}

impl GoogleDistanceMatrix {
    pub fn new(config: GoogleConfig) -> Result<Self, reqwest::Error> {
        let client = http_client(config.timeout_secs, None)?;
        Ok(Self { config, client })
    }
}

impl RoutingProvider for GoogleDistanceMatrix {
    fn leg(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        departure: DateTime<Utc>,
    ) -> Result<ModeLeg, RouteLookupError> {
        let url = format!(
            "{}/distancematrix/json",
            self.config.base_url.trim_end_matches('/')
        );

        let body = self
            .client
            .get(url)
            .query(&[
                ("origins", format!("{:.6},{:.6}", origin.latitude, origin.longitude)),
                ("destinations", format!("{:.6},{:.6}", destination.latitude, destination.longitude)),
                ("mode", mode.as_str().to_string()),
                ("departure_time", departure.timestamp().to_string()),
                ("key", self.config.api_key.clone()),
            ])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<DistanceMatrixResponse>())?;

        body.into_leg(mode)
    }
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<Measured>,
    duration_in_traffic: Option<Measured>,
    distance: Option<Measured>,
}

#[derive(Debug, Deserialize)]
struct Measured {
    value: u64,
}

impl DistanceMatrixResponse {
    /// Reads the single element of a one-by-one matrix.
    fn into_leg(self, mode: TravelMode) -> Result<ModeLeg, RouteLookupError> {
        if self.status != "OK" {
            return Err(RouteLookupError::Status {
                mode,
                status: self.status,
            });
        }
        let element = self
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or(RouteLookupError::MissingField {
                mode,
                field: "rows[0].elements[0]",
            })?;
        if element.status != "OK" {
            return Err(RouteLookupError::Status {
                mode,
                status: element.status,
            });
        }

        Ok(ModeLeg {
            duration_s: element
                .duration
                .ok_or(RouteLookupError::MissingField { mode, field: "duration" })?
                .value,
            traffic_duration_s: element.duration_in_traffic.map(|measured| measured.value),
            distance_m: element
                .distance
                .ok_or(RouteLookupError::MissingField { mode, field: "distance" })?
                .value,
        })
    }
}
