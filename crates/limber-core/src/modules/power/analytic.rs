use super::{
    MatterSpectrumProvider, MonomialSpectrumTable, RedshiftResolvedTable, SpectrumProvider,
    SpectrumTable,
};
use crate::domain::{LimberError, LimberResult};
use crate::numerics::log_grid;

const DEFAULT_K_MIN: f64 = 1.0e-4;
const DEFAULT_K_MAX: f64 = 10.0;
const DEFAULT_K_COUNT: usize = 256;

fn default_wavenumbers() -> LimberResult<Vec<f64>> {
    log_grid(DEFAULT_K_MIN, DEFAULT_K_MAX, DEFAULT_K_COUNT).ok_or_else(|| {
        LimberError::internal(
            "INTERNAL.SPECTRUM_GRID",
            "default wavenumber grid could not be constructed",
        )
    })
}

fn require_amplitudes(amplitudes: &[f64]) -> LimberResult<()> {
    if amplitudes.is_empty() {
        return Err(LimberError::input_validation(
            "INPUT.SPECTRUM_SHAPE",
            "analytic spectrum needs at least one monomial amplitude",
        ));
    }
    if amplitudes.iter().any(|value| !value.is_finite()) {
        return Err(LimberError::input_validation(
            "INPUT.SPECTRUM_VALUE",
            "analytic spectrum amplitudes must be finite",
        ));
    }
    Ok(())
}

/// Every monomial column is a constant amplitude on a fixed log-spaced k range.
///
/// As a matter provider the first amplitude is used at every redshift.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantSpectrum {
    amplitudes: Vec<f64>,
}

impl ConstantSpectrum {
    pub fn new(amplitudes: Vec<f64>) -> LimberResult<Self> {
        require_amplitudes(&amplitudes)?;
        Ok(Self { amplitudes })
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn table(&self) -> LimberResult<MonomialSpectrumTable> {
        let k = default_wavenumbers()?;
        let columns = self
            .amplitudes
            .iter()
            .map(|amplitude| vec![*amplitude; k.len()])
            .collect();
        SpectrumTable::new(k, columns)
    }
}

impl<P> SpectrumProvider<P> for ConstantSpectrum {
    fn table_at(&self, _params: &P, _redshift: f64) -> LimberResult<MonomialSpectrumTable> {
        self.table()
    }
}

impl<P> MatterSpectrumProvider<P> for ConstantSpectrum {
    fn tables_on_grid(&self, _params: &P, redshift: &[f64]) -> LimberResult<RedshiftResolvedTable> {
        let k = default_wavenumbers()?;
        let columns = vec![vec![self.amplitudes[0]; k.len()]; redshift.len()];
        SpectrumTable::new(k, columns)
    }
}

/// `A_j (k / k_pivot)^{n_j}` per monomial column.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLawSpectrum {
    amplitudes: Vec<f64>,
    indices: Vec<f64>,
    pivot: f64,
}

impl PowerLawSpectrum {
    pub fn new(amplitudes: Vec<f64>, indices: Vec<f64>, pivot: f64) -> LimberResult<Self> {
        require_amplitudes(&amplitudes)?;
        if indices.len() != amplitudes.len() {
            return Err(LimberError::input_validation(
                "INPUT.SPECTRUM_SHAPE",
                format!(
                    "{} spectral index(es) supplied for {} amplitude(s)",
                    indices.len(),
                    amplitudes.len()
                ),
            ));
        }
        if indices.iter().any(|value| !value.is_finite()) || !pivot.is_finite() || pivot <= 0.0 {
            return Err(LimberError::input_validation(
                "INPUT.SPECTRUM_VALUE",
                format!(
                    "power-law indices must be finite and the pivot positive, got pivot {}",
                    pivot
                ),
            ));
        }
        Ok(Self {
            amplitudes,
            indices,
            pivot,
        })
    }

    pub fn pivot(&self) -> f64 {
        self.pivot
    }

    fn column(&self, k: &[f64], monomial: usize) -> Vec<f64> {
        let amplitude = self.amplitudes[monomial];
        let index = self.indices[monomial];
        k.iter()
            .map(|wavenumber| amplitude * (wavenumber / self.pivot).powf(index))
            .collect()
    }

    pub fn table(&self) -> LimberResult<MonomialSpectrumTable> {
        let k = default_wavenumbers()?;
        let columns = (0..self.amplitudes.len())
            .map(|monomial| self.column(&k, monomial))
            .collect();
        SpectrumTable::new(k, columns)
    }
}

impl<P> SpectrumProvider<P> for PowerLawSpectrum {
    fn table_at(&self, _params: &P, _redshift: f64) -> LimberResult<MonomialSpectrumTable> {
        self.table()
    }
}

impl<P> MatterSpectrumProvider<P> for PowerLawSpectrum {
    fn tables_on_grid(&self, _params: &P, redshift: &[f64]) -> LimberResult<RedshiftResolvedTable> {
        let k = default_wavenumbers()?;
        let leading = self.column(&k, 0);
        SpectrumTable::new(k, vec![leading; redshift.len()])
    }
}
