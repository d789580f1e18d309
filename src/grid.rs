//! Population grid parsing and the local-directory grid source.
//!
//! # CSV format
//!
//! ```csv
//! latitude,longitude,population,city,density
//! 52.5200,13.4050,1200,Berlin,0.4
//! 52.5100,13.3900,1800,Berlin,0.6
//! ```
//!
//! `density` is optional. Without it, each row's density is derived as its
//! share of the grid's total population. A declared column must sum to 1;
//! sampling rejects it otherwise.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GridLoadError;
use crate::model::{GridRow, PopulationGrid};
use crate::traits::GridSource;

const REQUIRED_COLUMNS: [&str; 4] = ["latitude", "longitude", "population", "city"];

#[derive(Deserialize)]
struct GridRecord {
    latitude: f64,
    longitude: f64,
    population: f64,
    city: String,
    #[serde(default)]
    density: Option<f64>,
}

/// Parse a grid from CSV.
///
/// When the `density` column exists, empty cells become `NaN` so that
/// sampling rejects the grid instead of silently deriving a weight.
pub fn parse_grid<R: Read>(name: &str, reader: R) -> Result<PopulationGrid, GridLoadError> {
    let csv_error = |source| GridLoadError::Csv {
        name: name.to_string(),
        source,
    };

    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(GridLoadError::MissingColumn {
                name: name.to_string(),
                column,
            });
        }
    }
    let has_density = headers.iter().any(|header| header == "density");

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<GridRecord>() {
        let record = record.map_err(csv_error)?;
        rows.push(GridRow {
            latitude: record.latitude,
            longitude: record.longitude,
            population: record.population,
            city: record.city,
            density: record.density.unwrap_or(f64::NAN),
        });
    }

    if has_density {
        Ok(PopulationGrid::new(name, rows))
    } else {
        Ok(PopulationGrid::with_derived_density(name, rows))
    }
}

/// Grid source backed by a directory of `.csv` files, processed in file name
/// order.
#[derive(Debug, Clone)]
pub struct DirectoryGridSource {
    dir: PathBuf,
}

impl DirectoryGridSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl GridSource for DirectoryGridSource {
    fn grid_names(&self) -> Result<Vec<String>, GridLoadError> {
        let io_error = |source| GridLoadError::Io {
            name: self.dir.display().to_string(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let is_csv = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load_grid(&self, name: &str) -> Result<PopulationGrid, GridLoadError> {
        if Path::new(name).components().count() != 1 {
            return Err(GridLoadError::Location(format!(
                "{} is not a plain file name",
                name
            )));
        }
        let file = fs::File::open(self.dir.join(name)).map_err(|source| GridLoadError::Io {
            name: name.to_string(),
            source,
        })?;
        parse_grid(name, file)
    }
}
