//! City boundary polygons and uniform point sampling inside them.

use chrono::NaiveDate;
use geo::{Area, BoundingRect, Contains, MultiPolygon, Point, Rect};
use geojson::{FeatureCollection, GeoJson};
use rand::Rng;

use crate::error::BoundaryError;
use crate::model::Coordinate;

/// Object name under which a city boundary fetched on `date` is stored.
pub fn boundary_object_name(city: &str, admin_level: u8, date: NaiveDate) -> String {
    format!("{}-{}-{}.geojson", city, admin_level, date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone)]
pub struct CityBoundary {
    shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl CityBoundary {
    pub fn new(shape: MultiPolygon<f64>) -> Result<Self, BoundaryError> {
        let bounds = shape.bounding_rect().ok_or(BoundaryError::Degenerate)?;
        if shape.unsigned_area() <= 0.0 || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(BoundaryError::Degenerate);
        }
        Ok(Self { shape, bounds })
    }

    /// Reads a FeatureCollection that must contain exactly one MultiPolygon
    /// feature. Features of other geometry types are ignored.
    pub fn from_geojson(text: &str) -> Result<Self, BoundaryError> {
        let geojson: GeoJson = text.parse()?;
        let collection = FeatureCollection::try_from(geojson)?;

        let mut multipolygons: Vec<geojson::Value> = collection
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .map(|geometry| geometry.value)
            .filter(|value| matches!(value, geojson::Value::MultiPolygon(_)))
            .collect();
        if multipolygons.len() != 1 {
            return Err(BoundaryError::MultiPolygonCount(multipolygons.len()));
        }

        let shape = MultiPolygon::<f64>::try_from(multipolygons.remove(0))?;
        Self::new(shape)
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn contains(&self, at: Coordinate) -> bool {
        self.shape.contains(&Point::new(at.longitude, at.latitude))
    }

    /// Draws `count` points uniformly over the boundary by rejection
    /// sampling within its bounding box.
    pub fn sample_points<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Coordinate> {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        let mut points = Vec::with_capacity(count);
        while points.len() < count {
            let candidate = Coordinate::new(rng.gen_range(min.y..max.y), rng.gen_range(min.x..max.x));
            if self.contains(candidate) {
                points.push(candidate);
            }
        }
        points
    }
}
