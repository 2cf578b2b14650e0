//! Line-of-sight integration and assembly of the angular spectra.

mod engine;

pub use engine::{LimberEngine, LimberEngineBuilder, SampleEvaluation};

use super::redshift::matrix_column;
use crate::domain::{LimberError, LimberResult, SpectrumKind};
use crate::numerics::{log_grid, simpson, CubicSpline, Extrapolation};
use faer::Mat;

/// Output multipoles `0..=lmax` and the sparse log-spaced multipoles in
/// `[1, lmax]` on which the integrals are actually evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipoleGrid {
    output: Vec<f64>,
    sparse: Vec<f64>,
}

impl MultipoleGrid {
    pub fn new(lmax: usize, nlval: usize) -> LimberResult<Self> {
        if lmax < 2 || nlval < 4 || nlval > lmax {
            return Err(LimberError::input_validation(
                "INPUT.CONFIG_MULTIPOLE",
                format!(
                    "multipole grid needs lmax >= 2 and 4 <= nlval <= lmax, got lmax={} nlval={}",
                    lmax, nlval
                ),
            ));
        }
        let sparse = log_grid(1.0, lmax as f64, nlval).ok_or_else(|| {
            LimberError::internal(
                "INTERNAL.MULTIPOLE_GRID",
                format!("log-spaced multipoles in [1, {}] could not be built", lmax),
            )
        })?;
        let output = (0..=lmax).map(|ell| ell as f64).collect();
        Ok(Self { output, sparse })
    }

    pub fn lmax(&self) -> usize {
        self.output.len() - 1
    }

    pub fn output(&self) -> &[f64] {
        &self.output
    }

    pub fn sparse(&self) -> &[f64] {
        &self.sparse
    }
}

/// Column bookkeeping for spectra decomposed by bias monomial.
///
/// `auto` and `cross` count the Pgg and Pgm monomials including the leading
/// "1" term. Columns are `[leading, auto_1.., shot noise, cross_1..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonomialLayout {
    auto: usize,
    cross: usize,
}

impl MonomialLayout {
    pub fn new(auto: usize, cross: usize) -> LimberResult<Self> {
        if auto == 0 || cross == 0 {
            return Err(LimberError::input_validation(
                "INPUT.MONOMIAL_COUNT",
                format!(
                    "spectra need at least one monomial each, got auto={} cross={}",
                    auto, cross
                ),
            ));
        }
        Ok(Self { auto, cross })
    }

    pub fn auto_count(&self) -> usize {
        self.auto
    }

    pub fn cross_count(&self) -> usize {
        self.cross
    }

    pub fn total(&self) -> usize {
        self.auto + self.cross
    }

    pub fn shot_noise_column(&self) -> usize {
        self.auto
    }

    /// Column of the `monomial`-th Pgg term, `monomial` in `1..auto`.
    pub fn auto_column(&self, monomial: usize) -> usize {
        monomial
    }

    /// Column of the `monomial`-th Pgm term, `monomial` in `1..cross`.
    pub fn cross_column(&self, monomial: usize) -> usize {
        self.auto + monomial
    }
}

/// `(lmax + 1) x columns` table of one spectrum kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularSpectrum {
    kind: SpectrumKind,
    layout: MonomialLayout,
    values: Mat<f64>,
}

impl AngularSpectrum {
    pub(crate) fn zeros(kind: SpectrumKind, layout: MonomialLayout, multipole_count: usize) -> Self {
        Self {
            kind,
            layout,
            values: Mat::<f64>::zeros(multipole_count, layout.total()),
        }
    }

    pub(crate) fn set_column(&mut self, column: usize, values: &[f64]) {
        for (row, value) in values.iter().enumerate() {
            self.values[(row, column)] = *value;
        }
    }

    pub fn kind(&self) -> SpectrumKind {
        self.kind
    }

    pub fn layout(&self) -> MonomialLayout {
        self.layout
    }

    pub fn multipole_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn column_count(&self) -> usize {
        self.values.ncols()
    }

    pub fn matrix(&self) -> &Mat<f64> {
        &self.values
    }

    pub fn value(&self, ell: usize, column: usize) -> Option<f64> {
        (ell < self.values.nrows() && column < self.values.ncols())
            .then(|| self.values[(ell, column)])
    }

    pub fn column(&self, column: usize) -> Option<Vec<f64>> {
        (column < self.values.ncols()).then(|| matrix_column(&self.values, column))
    }

    /// `Σ_j coefficients[j] * C_l[j]`, one value per output multipole.
    pub fn combine(&self, coefficients: &[f64]) -> LimberResult<Vec<f64>> {
        if coefficients.len() != self.values.ncols() {
            return Err(LimberError::input_validation(
                "INPUT.MONOMIAL_COUNT",
                format!(
                    "{} coefficient(s) supplied for {} {} column(s)",
                    coefficients.len(),
                    self.values.ncols(),
                    self.kind
                ),
            ));
        }
        Ok((0..self.values.nrows())
            .map(|row| {
                coefficients
                    .iter()
                    .enumerate()
                    .map(|(column, coefficient)| coefficient * self.values[(row, column)])
                    .sum()
            })
            .collect())
    }
}

/// Galaxy auto-spectrum and galaxy x CMB-lensing cross-spectrum of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LimberSpectra {
    pub cgg: AngularSpectrum,
    pub ckg: AngularSpectrum,
}

/// Accumulates `Σ kernel(z) / chi(z)^2 * P(z, k(l))` on the `(nz, nl)` grid.
pub(crate) struct LimberIntegrand<'a> {
    comoving_distance: &'a [f64],
    values: Mat<f64>,
}

impl<'a> LimberIntegrand<'a> {
    pub(crate) fn new(comoving_distance: &'a [f64], multipole_count: usize) -> Self {
        Self {
            comoving_distance,
            values: Mat::<f64>::zeros(comoving_distance.len(), multipole_count),
        }
    }

    pub(crate) fn add(&mut self, kernel: &[f64], spectrum: &Mat<f64>) -> &mut Self {
        for (row, (weight, chi)) in kernel.iter().zip(self.comoving_distance).enumerate() {
            let projected = weight / (chi * chi);
            for col in 0..self.values.ncols() {
                self.values[(row, col)] += projected * spectrum[(row, col)];
            }
        }
        self
    }

    pub(crate) fn integrate(&self, multipoles: &MultipoleGrid) -> LimberResult<Vec<f64>> {
        limber_integrate(&self.values, self.comoving_distance, multipoles)
    }
}

/// Integrates every column of an `(nz, nlval)` integrand over `chi` with
/// Simpson's rule and resamples the result onto integer multipoles with an
/// extrapolating cubic spline.
pub fn limber_integrate(
    integrand: &Mat<f64>,
    comoving_distance: &[f64],
    multipoles: &MultipoleGrid,
) -> LimberResult<Vec<f64>> {
    if integrand.nrows() != comoving_distance.len() || integrand.ncols() != multipoles.sparse().len()
    {
        return Err(LimberError::internal(
            "INTERNAL.INTEGRAND_SHAPE",
            format!(
                "integrand is {}x{}, expected {}x{}",
                integrand.nrows(),
                integrand.ncols(),
                comoving_distance.len(),
                multipoles.sparse().len()
            ),
        ));
    }

    let mut sparse = Vec::with_capacity(integrand.ncols());
    for col in 0..integrand.ncols() {
        let column = matrix_column(integrand, col);
        let integral = simpson(&column, comoving_distance).map_err(|error| {
            LimberError::computation("RUN.LIMBER_QUADRATURE", error.to_string())
        })?;
        sparse.push(integral);
    }

    let spline = CubicSpline::new(multipoles.sparse(), &sparse, Extrapolation::Extrapolate)
        .map_err(|error| LimberError::computation("RUN.LIMBER_RESAMPLE", error.to_string()))?;
    spline
        .evaluate_many(multipoles.output())
        .map_err(|error| LimberError::computation("RUN.LIMBER_RESAMPLE", error.to_string()))
}
