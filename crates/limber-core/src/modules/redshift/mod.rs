//! Redshift grid construction and galaxy-sample normalization.

mod broadcast;
mod parser;

pub use broadcast::GridInput;
pub use parser::DndzTable;

use crate::domain::{validate_sample_index, LimberError, LimberResult};
use crate::numerics::{linear_grid, trapezoid, CubicSpline, Extrapolation};
use faer::Mat;

/// Uniform redshift grid shared by every sample and every cosmology.
#[derive(Debug, Clone, PartialEq)]
pub struct RedshiftGrid {
    values: Vec<f64>,
}

impl RedshiftGrid {
    pub fn new(zmin: f64, zmax: f64, count: usize) -> LimberResult<Self> {
        if !(zmin.is_finite() && zmax.is_finite()) || zmin >= zmax {
            return Err(LimberError::input_validation(
                "INPUT.CONFIG_REDSHIFT",
                format!("invalid redshift range [{}, {}]", zmin, zmax),
            ));
        }
        let values = linear_grid(zmin, zmax, count).ok_or_else(|| {
            LimberError::input_validation(
                "INPUT.CONFIG_REDSHIFT",
                format!("redshift grid needs at least 2 nodes, got {}", count),
            )
        })?;
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn zmin(&self) -> f64 {
        self.values[0]
    }

    pub fn zmax(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Constant node spacing.
    pub fn step(&self) -> f64 {
        self.values[1] - self.values[0]
    }
}

/// Per-sample redshift distributions resampled onto a [`RedshiftGrid`] and
/// normalized to unit trapezoid integral. Stored as an `(nz, ng)` matrix.
#[derive(Debug, Clone)]
pub struct SampleDistributions {
    dndz: Mat<f64>,
}

impl SampleDistributions {
    /// Interpolates each sample column with a cubic spline that is zero
    /// outside the tabulated redshift range, then rescales it so that
    /// `∫ dN/dz dz = 1` over the grid.
    pub fn normalize(table: &DndzTable, grid: &RedshiftGrid) -> LimberResult<Self> {
        let nz = grid.len();
        let ng = table.sample_count();
        let mut dndz = Mat::<f64>::zeros(nz, ng);
        let mut norms = Vec::with_capacity(ng);

        for sample in 0..ng {
            let density = table.density(sample).ok_or_else(|| {
                LimberError::internal(
                    "INTERNAL.DNDZ_COLUMN",
                    format!("sample column {} disappeared from table", sample),
                )
            })?;
            let spline = CubicSpline::new(table.redshift(), density, Extrapolation::Zero)
                .map_err(|error| {
                    LimberError::input_validation(
                        "INPUT.DNDZ_VALUE",
                        format!("sample {} cannot be interpolated: {}", sample, error),
                    )
                })?;
            let resampled = spline.evaluate_many(grid.values()).map_err(|error| {
                LimberError::computation("RUN.DNDZ_RESAMPLE", error.to_string())
            })?;

            let norm = trapezoid(&resampled, grid.values()).map_err(|error| {
                LimberError::computation("RUN.DNDZ_NORMALIZATION", error.to_string())
            })?;
            if !norm.is_finite() || norm <= 0.0 {
                return Err(LimberError::input_validation(
                    "INPUT.DNDZ_NORMALIZATION",
                    format!(
                        "sample {} integrates to {} over [{}, {}]; it cannot be normalized",
                        sample,
                        norm,
                        grid.zmin(),
                        grid.zmax()
                    ),
                ));
            }

            for (row, value) in resampled.into_iter().enumerate() {
                dndz[(row, sample)] = value;
            }
            norms.push(norm);
        }

        let norm_grid = GridInput::PerSample(norms).broadcast(nz, ng)?;
        for row in 0..nz {
            for col in 0..ng {
                dndz[(row, col)] /= norm_grid[(row, col)];
            }
        }

        Ok(Self { dndz })
    }

    pub fn sample_count(&self) -> usize {
        self.dndz.ncols()
    }

    pub fn redshift_count(&self) -> usize {
        self.dndz.nrows()
    }

    pub fn matrix(&self) -> &Mat<f64> {
        &self.dndz
    }

    pub fn sample(&self, index: usize) -> LimberResult<Vec<f64>> {
        validate_sample_index(index, self.sample_count())?;
        Ok(matrix_column(&self.dndz, index))
    }
}

pub(crate) fn matrix_column(matrix: &Mat<f64>, col: usize) -> Vec<f64> {
    (0..matrix.nrows()).map(|row| matrix[(row, col)]).collect()
}
