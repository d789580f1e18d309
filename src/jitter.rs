//! Random geodesic displacement of sampled cell centers.
//!
//! The offset distance is drawn uniformly in `[0, R]` and the bearing
//! uniformly in `[0°, 360°)`. Drawing the distance rather than the area
//! uniformly concentrates points towards the center; downstream analyses
//! depend on this distribution, so it must stay as is.

use geo::{GeodesicDestination, Point};
use rand::Rng;

use crate::model::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointJitter {
    radius_m: f64,
}

impl PointJitter {
    /// Negative radii are treated as zero.
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m: radius_m.max(0.0),
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn jitter<R: Rng + ?Sized>(&self, center: Coordinate, rng: &mut R) -> Coordinate {
        let distance = rng.gen_range(0.0..=self.radius_m);
        let bearing = rng.gen_range(0.0..360.0);
        project(center, bearing, distance)
    }
}

/// Destination reached from `center` after `distance_m` meters along
/// `bearing_deg` (clockwise from north) on the WGS-84 ellipsoid.
pub fn project(center: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let destination = Point::new(center.longitude, center.latitude)
        .geodesic_destination(bearing_deg, distance_m);
    Coordinate::new(destination.y(), destination.x())
}
