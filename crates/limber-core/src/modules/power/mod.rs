//! Tabulated 3-D power spectra and their evaluation on the Limber
//! `(z, k = (l + 1/2) / chi)` grid.

mod analytic;

pub use analytic::{ConstantSpectrum, PowerLawSpectrum};

use crate::domain::{LimberError, LimberResult};
use crate::numerics::{CubicSpline, Extrapolation};
use faer::Mat;

/// Wavenumber column plus value columns.
///
/// For Pgg/Pgm tables every value column is the coefficient of one bias
/// monomial; for Pmm tables evaluated on a redshift array there is one
/// column per redshift.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumTable {
    wavenumbers: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

pub type MonomialSpectrumTable = SpectrumTable;
pub type RedshiftResolvedTable = SpectrumTable;

impl SpectrumTable {
    pub fn new(wavenumbers: Vec<f64>, columns: Vec<Vec<f64>>) -> LimberResult<Self> {
        if wavenumbers.len() < 2 {
            return Err(LimberError::input_validation(
                "INPUT.SPECTRUM_SHAPE",
                format!(
                    "power-spectrum table needs at least 2 wavenumbers, got {}",
                    wavenumbers.len()
                ),
            ));
        }
        if columns.is_empty() {
            return Err(LimberError::input_validation(
                "INPUT.SPECTRUM_SHAPE",
                "power-spectrum table needs at least one value column",
            ));
        }
        for (index, pair) in wavenumbers.windows(2).enumerate() {
            if !pair[0].is_finite() || !pair[1].is_finite() || pair[1] <= pair[0] {
                return Err(LimberError::input_validation(
                    "INPUT.SPECTRUM_WAVENUMBER",
                    format!(
                        "wavenumbers must be finite and strictly increasing, row {} has {} after {}",
                        index + 1,
                        pair[1],
                        pair[0]
                    ),
                ));
            }
        }
        for (index, column) in columns.iter().enumerate() {
            if column.len() != wavenumbers.len() {
                return Err(LimberError::input_validation(
                    "INPUT.SPECTRUM_SHAPE",
                    format!(
                        "column {} has {} value(s) for {} wavenumber(s)",
                        index,
                        column.len(),
                        wavenumbers.len()
                    ),
                ));
            }
            if column.iter().any(|value| !value.is_finite()) {
                return Err(LimberError::input_validation(
                    "INPUT.SPECTRUM_VALUE",
                    format!("column {} contains non-finite values", index),
                ));
            }
        }

        Ok(Self {
            wavenumbers,
            columns,
        })
    }

    /// Builds a table from rows of `[k, c_0(k), c_1(k), ...]`.
    pub fn from_rows(rows: &[Vec<f64>]) -> LimberResult<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width < 2 {
            return Err(LimberError::input_validation(
                "INPUT.SPECTRUM_SHAPE",
                format!(
                    "power-spectrum rows need a wavenumber and at least one value, got {} column(s)",
                    width
                ),
            ));
        }
        let mut wavenumbers = Vec::with_capacity(rows.len());
        let mut columns = vec![Vec::with_capacity(rows.len()); width - 1];
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(LimberError::input_validation(
                    "INPUT.SPECTRUM_SHAPE",
                    format!(
                        "power-spectrum row {} has {} column(s), expected {}",
                        row_index,
                        row.len(),
                        width
                    ),
                ));
            }
            wavenumbers.push(row[0]);
            for (column, value) in row[1..].iter().enumerate() {
                columns[column].push(*value);
            }
        }
        Self::new(wavenumbers, columns)
    }

    pub fn wavenumbers(&self) -> &[f64] {
        &self.wavenumbers
    }

    /// Number of value columns (monomials, or redshifts for Pmm).
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    /// Contracts the monomial columns with bias coefficients,
    /// `Σ_j coefficients[j] * column_j(k)`.
    pub fn reduce(&self, coefficients: &[f64]) -> LimberResult<Vec<f64>> {
        if coefficients.len() != self.columns.len() {
            return Err(LimberError::input_validation(
                "INPUT.MONOMIAL_COUNT",
                format!(
                    "{} bias coefficient(s) supplied for a table with {} monomial(s)",
                    coefficients.len(),
                    self.columns.len()
                ),
            ));
        }
        let mut reduced = vec![0.0; self.wavenumbers.len()];
        for (column, coefficient) in self.columns.iter().zip(coefficients) {
            for (total, value) in reduced.iter_mut().zip(column) {
                *total += coefficient * value;
            }
        }
        Ok(reduced)
    }

    fn spline(&self, column: usize, extrapolation: Extrapolation) -> LimberResult<CubicSpline> {
        let values = self.column(column).ok_or_else(|| {
            LimberError::input_validation(
                "INPUT.SPECTRUM_SHAPE",
                format!(
                    "column {} requested from a table with {} column(s)",
                    column,
                    self.columns.len()
                ),
            )
        })?;
        CubicSpline::new(&self.wavenumbers, values, extrapolation)
            .map_err(|error| LimberError::input_validation("INPUT.SPECTRUM_SPLINE", error.to_string()))
    }
}

/// Pgm / Pgg provider: one monomial table at a single redshift.
pub trait SpectrumProvider<P>: Send + Sync {
    fn table_at(&self, params: &P, redshift: f64) -> LimberResult<MonomialSpectrumTable>;
}

impl<P, F> SpectrumProvider<P> for F
where
    F: Fn(&P, f64) -> LimberResult<MonomialSpectrumTable> + Send + Sync,
{
    fn table_at(&self, params: &P, redshift: f64) -> LimberResult<MonomialSpectrumTable> {
        self(params, redshift)
    }
}

/// Pmm provider: one column per requested redshift.
pub trait MatterSpectrumProvider<P>: Send + Sync {
    fn tables_on_grid(&self, params: &P, redshift: &[f64]) -> LimberResult<RedshiftResolvedTable>;
}

impl<P, F> MatterSpectrumProvider<P> for F
where
    F: Fn(&P, &[f64]) -> LimberResult<RedshiftResolvedTable> + Send + Sync,
{
    fn tables_on_grid(&self, params: &P, redshift: &[f64]) -> LimberResult<RedshiftResolvedTable> {
        self(params, redshift)
    }
}

/// `k[z, l] = (l + 1/2) / chi(z)`, shape `(nz, nl)`.
pub fn limber_wavenumbers(comoving_distance: &[f64], multipoles: &[f64]) -> Mat<f64> {
    let mut kgrid = Mat::<f64>::zeros(comoving_distance.len(), multipoles.len());
    for (row, chi) in comoving_distance.iter().enumerate() {
        for (col, ell) in multipoles.iter().enumerate() {
            kgrid[(row, col)] = (ell + 0.5) / chi;
        }
    }
    kgrid
}

/// Interpolates one column of a single-redshift table at every point of the
/// wavenumber grid.
pub fn interpolate_on_grid(
    table: &SpectrumTable,
    column: usize,
    kgrid: &Mat<f64>,
    extrapolation: Extrapolation,
) -> LimberResult<Mat<f64>> {
    let spline = table.spline(column, extrapolation)?;
    let mut values = Mat::<f64>::zeros(kgrid.nrows(), kgrid.ncols());
    for row in 0..kgrid.nrows() {
        for col in 0..kgrid.ncols() {
            values[(row, col)] = spline
                .evaluate(kgrid[(row, col)])
                .map_err(|error| LimberError::computation("RUN.SPECTRUM_EVALUATION", error.to_string()))?;
        }
    }
    Ok(values)
}

/// Interpolates a redshift-resolved table: column `z` is evaluated on row `z`
/// of the wavenumber grid.
pub fn interpolate_per_redshift(
    table: &RedshiftResolvedTable,
    kgrid: &Mat<f64>,
    extrapolation: Extrapolation,
) -> LimberResult<Mat<f64>> {
    if table.column_count() != kgrid.nrows() {
        return Err(LimberError::input_validation(
            "INPUT.SPECTRUM_SHAPE",
            format!(
                "redshift-resolved table has {} column(s) for {} redshift node(s)",
                table.column_count(),
                kgrid.nrows()
            ),
        ));
    }
    let mut values = Mat::<f64>::zeros(kgrid.nrows(), kgrid.ncols());
    for row in 0..kgrid.nrows() {
        let spline = table.spline(row, extrapolation)?;
        for col in 0..kgrid.ncols() {
            values[(row, col)] = spline
                .evaluate(kgrid[(row, col)])
                .map_err(|error| LimberError::computation("RUN.SPECTRUM_EVALUATION", error.to_string()))?;
        }
    }
    Ok(values)
}

/// Contracts a monomial table with bias coefficients and interpolates the
/// reduced spectrum at `wavenumbers`.
pub fn interpolate_reduced(
    table: &MonomialSpectrumTable,
    coefficients: &[f64],
    wavenumbers: &[f64],
    extrapolation: Extrapolation,
) -> LimberResult<Vec<f64>> {
    let reduced = table.reduce(coefficients)?;
    let spline = CubicSpline::new(table.wavenumbers(), &reduced, extrapolation)
        .map_err(|error| LimberError::input_validation("INPUT.SPECTRUM_SPLINE", error.to_string()))?;
    spline
        .evaluate_many(wavenumbers)
        .map_err(|error| LimberError::computation("RUN.SPECTRUM_EVALUATION", error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{
        interpolate_on_grid, interpolate_per_redshift, interpolate_reduced, limber_wavenumbers,
        SpectrumTable,
    };
    use crate::numerics::Extrapolation;

    fn linear_table() -> SpectrumTable {
        let k = vec![0.01, 0.1, 0.2, 0.5, 1.0];
        let first = k.iter().map(|value| 2.0 * value).collect();
        let second = k.iter().map(|value| 1.0 - value).collect();
        SpectrumTable::new(k, vec![first, second]).expect("table")
    }

    #[test]
    fn wavenumber_grid_follows_limber_mapping() {
        let kgrid = limber_wavenumbers(&[100.0, 200.0], &[1.0, 9.5]);
        assert_eq!(kgrid[(0, 0)], 0.015);
        assert_eq!(kgrid[(1, 1)], 0.05);
    }

    #[test]
    fn row_layout_matches_column_layout() {
        let from_rows = SpectrumTable::from_rows(&[
            vec![0.01, 0.02, 0.99],
            vec![0.1, 0.2, 0.9],
            vec![0.2, 0.4, 0.8],
            vec![0.5, 1.0, 0.5],
            vec![1.0, 2.0, 0.0],
        ])
        .expect("table");
        assert_eq!(from_rows, linear_table());
        assert_eq!(from_rows.column_count(), 2);
    }

    #[test]
    fn reduce_contracts_bias_coefficients() {
        let reduced = linear_table().reduce(&[1.0, 2.0]).expect("reduce");
        assert!((reduced[1] - (0.2 + 1.8)).abs() < 1.0e-15);
        assert_eq!(
            linear_table().reduce(&[1.0]).expect_err("count").placeholder(),
            "INPUT.MONOMIAL_COUNT"
        );
    }

    #[test]
    fn grid_interpolation_honours_extrapolation_policy() {
        let table = linear_table();
        // chi = 1 puts l = 2.5 at k = 3.0, beyond the table.
        let kgrid = limber_wavenumbers(&[1.0], &[0.0, 2.5]);

        let extrapolated =
            interpolate_on_grid(&table, 0, &kgrid, Extrapolation::Extrapolate).expect("values");
        assert!((extrapolated[(0, 0)] - 1.0).abs() < 1.0e-12);
        assert!((extrapolated[(0, 1)] - 6.0).abs() < 1.0e-10);

        let clamped =
            interpolate_on_grid(&table, 0, &kgrid, Extrapolation::Boundary).expect("values");
        assert_eq!(clamped[(0, 1)], 2.0);
    }

    #[test]
    fn per_redshift_interpolation_pairs_columns_with_rows() {
        let table = linear_table();
        let kgrid = limber_wavenumbers(&[10.0, 20.0], &[1.5]);
        let values =
            interpolate_per_redshift(&table, &kgrid, Extrapolation::Boundary).expect("values");
        assert!((values[(0, 0)] - 0.4).abs() < 1.0e-12);
        assert!((values[(1, 0)] - 0.9).abs() < 1.0e-12);

        let too_many_rows = limber_wavenumbers(&[10.0, 20.0, 30.0], &[1.5]);
        assert_eq!(
            interpolate_per_redshift(&table, &too_many_rows, Extrapolation::Boundary)
                .expect_err("shape")
                .placeholder(),
            "INPUT.SPECTRUM_SHAPE"
        );
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert_eq!(
            SpectrumTable::new(vec![0.1, 0.1], vec![vec![1.0, 1.0]])
                .expect_err("repeated k")
                .placeholder(),
            "INPUT.SPECTRUM_WAVENUMBER"
        );
        assert_eq!(
            SpectrumTable::new(vec![0.1, 0.2], vec![])
                .expect_err("no columns")
                .placeholder(),
            "INPUT.SPECTRUM_SHAPE"
        );
    }

    #[test]
    fn reduced_interpolation_contracts_before_splining() {
        let values = interpolate_reduced(
            &linear_table(),
            &[1.0, -1.0],
            &[0.3, 2.0],
            Extrapolation::Boundary,
        )
        .expect("values");
        assert!((values[0] - (0.6 - 0.7)).abs() < 1.0e-12);
        assert!((values[1] - 2.0).abs() < 1.0e-12);
    }
}
