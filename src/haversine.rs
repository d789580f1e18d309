//! Straight-line routing estimates.
//!
//! [`HaversineRouter`] needs no service and is used for offline runs.
//! [`HaversineFallback`] puts it behind a real router so modes that router
//! cannot serve still produce a leg.

use chrono::{DateTime, Utc};
use geo::{HaversineDistance, Point};
use tracing::debug;

use crate::error::RouteLookupError;
use crate::model::{Coordinate, ModeLeg, TravelMode};
use crate::traits::RoutingProvider;

const DEFAULT_DRIVING_KMH: f64 = 40.0;
const DEFAULT_TRANSIT_KMH: f64 = 25.0;
const DEFAULT_BICYCLING_KMH: f64 = 15.0;

/// Great-circle distance at an assumed average speed per mode.
#[derive(Debug, Clone)]
pub struct HaversineRouter {
    pub driving_kmh: f64,
    pub transit_kmh: f64,
    pub bicycling_kmh: f64,
}

impl Default for HaversineRouter {
    fn default() -> Self {
        Self {
            driving_kmh: DEFAULT_DRIVING_KMH,
            transit_kmh: DEFAULT_TRANSIT_KMH,
            bicycling_kmh: DEFAULT_BICYCLING_KMH,
        }
    }
}

impl HaversineRouter {
    fn speed_kmh(&self, mode: TravelMode) -> f64 {
        match mode {
            TravelMode::Driving => self.driving_kmh,
            TravelMode::Transit => self.transit_kmh,
            TravelMode::Bicycling => self.bicycling_kmh,
        }
    }
}

impl RoutingProvider for HaversineRouter {
    fn leg(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        _departure: DateTime<Utc>,
    ) -> Result<ModeLeg, RouteLookupError> {
        let meters = Point::new(origin.longitude, origin.latitude)
            .haversine_distance(&Point::new(destination.longitude, destination.latitude));
        let speed_ms = self.speed_kmh(mode) / 3.6;
        let duration_s = if speed_ms > 0.0 {
            (meters / speed_ms).round() as u64
        } else {
            0
        };

        Ok(ModeLeg {
            duration_s,
            traffic_duration_s: None,
            distance_m: meters.round() as u64,
        })
    }
}

/// Routes through `primary` and answers with a straight-line estimate when
/// it reports [`RouteLookupError::UnsupportedMode`]. Every other error is
/// passed through.
#[derive(Debug, Clone)]
pub struct HaversineFallback<P> {
    primary: P,
    fallback: HaversineRouter,
}

impl<P: RoutingProvider> HaversineFallback<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: HaversineRouter::default(),
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }
}

impl<P: RoutingProvider> RoutingProvider for HaversineFallback<P> {
    fn leg(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        departure: DateTime<Utc>,
    ) -> Result<ModeLeg, RouteLookupError> {
        match self.primary.leg(origin, destination, mode, departure) {
            Err(RouteLookupError::UnsupportedMode { .. }) => {
                debug!(mode = %mode, "router does not serve mode, using straight-line estimate");
                self.fallback.leg(origin, destination, mode, departure)
            }
            other => other,
        }
    }
}
