//! Density-weighted sampling of origin/destination pairs from a grid.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::error::SamplingError;
use crate::jitter::PointJitter;
use crate::model::{PopulationGrid, SampledPoint};

/// Allowed distance of a grid's density sum from 1.
pub const DENSITY_SUM_TOLERANCE: f64 = 1e-6;

/// Two jittered points drawn from distinct rows of one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPair {
    pub city: String,
    pub origin: SampledPoint,
    pub destination: SampledPoint,
}

#[derive(Debug, Clone, Copy)]
pub struct GridSampler {
    jitter: PointJitter,
}

impl GridSampler {
    pub fn new(radius_m: f64) -> Self {
        Self {
            jitter: PointJitter::new(radius_m),
        }
    }

    /// Draws two distinct rows without replacement, each draw proportional to
    /// row density among the rows still available, and jitters both centers.
    ///
    /// The origin is the first draw, so its cell frequencies follow the
    /// declared densities directly.
    pub fn sample_pair<R: Rng + ?Sized>(
        &self,
        grid: &PopulationGrid,
        rng: &mut R,
    ) -> Result<SampledPair, SamplingError> {
        let rows = grid.rows();
        if rows.len() < 2 {
            return Err(SamplingError::TooFewRows { rows: rows.len() });
        }
        if let Some((row, bad)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| !row.density.is_finite() || row.density < 0.0)
        {
            return Err(SamplingError::InvalidDensity {
                row,
                density: bad.density,
            });
        }
        let positive = rows.iter().filter(|row| row.density > 0.0).count();
        if positive < 2 {
            return Err(SamplingError::InsufficientWeight { positive });
        }
        // also catches finite densities whose sum overflows
        let sum = grid.density_sum();
        if !sum.is_finite() || (sum - 1.0).abs() > DENSITY_SUM_TOLERANCE {
            return Err(SamplingError::DensitySum { sum });
        }

        let mut weights = WeightedIndex::new(rows.iter().map(|row| row.density))?;
        let first = weights.sample(rng);
        weights.update_weights(&[(first, &0.0)])?;
        let second = weights.sample(rng);

        let city = rows[0].city.clone();
        let origin = self.jittered(grid, first, rng);
        let destination = self.jittered(grid, second, rng);

        Ok(SampledPair {
            city,
            origin,
            destination,
        })
    }

    fn jittered<R: Rng + ?Sized>(&self, grid: &PopulationGrid, index: usize, rng: &mut R) -> SampledPoint {
        let cell = grid.rows()[index].coordinate();
        SampledPoint {
            coordinate: self.jitter.jitter(cell, rng),
            cell,
        }
    }
}
