//! Multi-modal travel time and distance between an enriched stop pair.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::RouteLookupError;
use crate::ids::StopIds;
use crate::model::{EnrichedPoint, JourneyRecord, ModeLeg, TravelMode};
use crate::traits::RoutingProvider;

pub struct JourneyComputer<'a, R> {
    router: &'a R,
}

impl<'a, R: RoutingProvider> JourneyComputer<'a, R> {
    pub fn new(router: &'a R) -> Self {
        Self { router }
    }

    /// Queries every mode once, in driving/transit/bicycling order, and
    /// aggregates the results. The first failing mode aborts the journey.
    ///
    /// Driving prefers the traffic-adjusted duration when the service
    /// reports one. The journey's insertion time is the origin's.
    pub fn compute(
        &self,
        origin: &EnrichedPoint,
        destination: &EnrichedPoint,
        ids: &StopIds,
        departure: DateTime<Utc>,
    ) -> Result<JourneyRecord, RouteLookupError> {
        let from = origin.coordinate();
        let to = destination.coordinate();
        let leg = |mode| -> Result<ModeLeg, RouteLookupError> {
            let leg = self.router.leg(from, to, mode, departure)?;
            debug!(%mode, duration_s = leg.duration_s, distance_m = leg.distance_m, "route leg");
            Ok(leg)
        };

        let driving = leg(TravelMode::Driving)?;
        let transit = leg(TravelMode::Transit)?;
        let bicycling = leg(TravelMode::Bicycling)?;

        Ok(JourneyRecord {
            origin: ids.origin_id,
            destination: ids.destination_id,
            insertion_time: ids.origin_time.clone(),
            driving_duration: driving.traffic_duration_s.unwrap_or(driving.duration_s),
            transit_duration: transit.duration_s,
            bicycling_duration: bicycling.duration_s,
            driving_distance: driving.distance_m,
            transit_distance: transit.distance_m,
            bicycling_distance: bicycling.distance_m,
        })
    }
}
