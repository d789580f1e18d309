//! OSRM HTTP adapter for point-to-point routes.
//!
//! OSRM has no timetable data, so transit lookups fail with
//! [`RouteLookupError::UnsupportedMode`]. The binary wraps this router in
//! [`HaversineFallback`](crate::haversine::HaversineFallback) to fill them in.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::http_client;
use crate::error::RouteLookupError;
use crate::model::{Coordinate, ModeLeg, TravelMode};
use crate::traits::RoutingProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: Some(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmRouter {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmRouter {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = http_client(config.timeout_secs, None)?;
        Ok(Self { config, client })
    }
}

fn profile(mode: TravelMode) -> Option<&'static str> {
    match mode {
        TravelMode::Driving => Some("driving"),
        TravelMode::Bicycling => Some("cycling"),
        TravelMode::Transit => None,
    }
}

impl RoutingProvider for OsrmRouter {
    /// OSRM ignores the departure time.
    fn leg(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        _departure: DateTime<Utc>,
    ) -> Result<ModeLeg, RouteLookupError> {
        let profile = profile(mode).ok_or(RouteLookupError::UnsupportedMode { mode })?;

        let url = format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.config.base_url.trim_end_matches('/'),
            profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
        );

        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>())?;

        body.into_leg(mode)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: Option<f64>,
    distance: Option<f64>,
}

impl OsrmRouteResponse {
    fn into_leg(self, mode: TravelMode) -> Result<ModeLeg, RouteLookupError> {
        if self.code != "Ok" {
            return Err(RouteLookupError::Status {
                mode,
                status: self.code,
            });
        }
        let route = self
            .routes
            .into_iter()
            .next()
            .ok_or(RouteLookupError::MissingField { mode, field: "routes[0]" })?;
        let duration = route
            .duration
            .ok_or(RouteLookupError::MissingField { mode, field: "duration" })?;
        let distance = route
            .distance
            .ok_or(RouteLookupError::MissingField { mode, field: "distance" })?;

        Ok(ModeLeg {
            duration_s: duration.max(0.0).round() as u64,
            traffic_duration_s: None,
            distance_m: distance.max(0.0).round() as u64,
        })
    }
}
