//! Records flowing through the pipeline, from grid rows to warehouse rows.

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// One cell of a population grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub latitude: f64,
    pub longitude: f64,
    pub population: f64,
    pub city: String,
    /// Share of the grid's total population held by this cell.
    pub density: f64,
}

impl GridRow {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Population grid for a single city, loaded once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationGrid {
    name: String,
    rows: Vec<GridRow>,
}

impl PopulationGrid {
    pub fn new(name: impl Into<String>, rows: Vec<GridRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Builds a grid whose densities are each row's share of the total
    /// population. Rows keep a density of zero when the total is not positive.
    pub fn with_derived_density(name: impl Into<String>, mut rows: Vec<GridRow>) -> Self {
        let total: f64 = rows.iter().map(|row| row.population).sum();
        for row in &mut rows {
            row.density = if total > 0.0 {
                row.population / total
            } else {
                0.0
            };
        }
        Self::new(name, rows)
    }

    /// Source name the grid was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// City label of the grid, read from its first row.
    pub fn city(&self) -> Option<&str> {
        self.rows.first().map(|row| row.city.as_str())
    }

    pub fn total_population(&self) -> f64 {
        self.rows.iter().map(|row| row.population).sum()
    }

    pub fn density_sum(&self) -> f64 {
        self.rows.iter().map(|row| row.density).sum()
    }
}

/// A jittered coordinate drawn from a grid row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledPoint {
    pub coordinate: Coordinate,
    /// Center of the grid cell the point was drawn from.
    pub cell: Coordinate,
}

/// Address attributes resolved by reverse geocoding. Absent attributes stay
/// `None` and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub city_district: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

/// A sampled coordinate merged with its address. `city` always comes from
/// the grid, never from the geocoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub address: Address,
    pub city: String,
}

impl EnrichedPoint {
    pub fn new(coordinate: Coordinate, city: impl Into<String>, address: Address) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            address,
            city: city.into(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopRole {
    Origin,
    Destination,
}

/// Row of the stops table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRecord {
    pub id: i64,
    pub insertion_time: String,
    #[serde(rename = "type")]
    pub role: StopRole,
    #[serde(flatten)]
    pub point: EnrichedPoint,
}

/// Transport modes queried for every journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Transit,
    Bicycling,
}

impl TravelMode {
    pub const ALL: [TravelMode; 3] = [TravelMode::Driving, TravelMode::Transit, TravelMode::Bicycling];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
            TravelMode::Bicycling => "bicycling",
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Duration and distance of one mode between two points, as reported by a
/// routing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeLeg {
    /// Seconds.
    pub duration_s: u64,
    /// Seconds, when the service adjusts for current traffic.
    pub traffic_duration_s: Option<u64>,
    /// Meters.
    pub distance_m: u64,
}

/// Row of the journeys table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyRecord {
    pub origin: i64,
    pub destination: i64,
    pub insertion_time: String,
    pub driving_duration: u64,
    pub transit_duration: u64,
    pub bicycling_duration: u64,
    pub driving_distance: u64,
    pub transit_distance: u64,
    pub bicycling_distance: u64,
}
