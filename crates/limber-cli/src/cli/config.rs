//! JSON run configuration consumed by the `limber` binary.

use limber_core::common::constants::Z_LAST_SCATTERING;
use limber_core::common::EngineConfig;
use limber_core::modules::background::{FlatLcdm, FlatLcdmParams};
use limber_core::modules::power::{
    ConstantSpectrum, MatterSpectrumProvider, MonomialSpectrumTable, PowerLawSpectrum,
    RedshiftResolvedTable, SpectrumProvider,
};
use limber_core::modules::redshift::DndzTable;
use limber_core::{Extrapolation, LimberEngine, LimberError, LimberResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RunConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub cosmology: CosmologyConfig,
    pub spectra: SpectraConfig,
    #[serde(default)]
    pub sample: usize,
    #[serde(default = "default_magnification_slope")]
    pub magnification_slope: f64,
    #[serde(default)]
    pub extrapolation: Extrapolation,
}

fn default_magnification_slope() -> f64 {
    0.4
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct CosmologyConfig {
    pub omega_m: f64,
    pub z_star: f64,
}

impl Default for CosmologyConfig {
    fn default() -> Self {
        Self {
            omega_m: 0.3,
            z_star: Z_LAST_SCATTERING,
        }
    }
}

impl CosmologyConfig {
    pub fn params(&self) -> FlatLcdmParams {
        FlatLcdmParams {
            omega_m: self.omega_m,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SpectraConfig {
    pub galaxy_matter: SpectrumModel,
    pub galaxy_galaxy: SpectrumModel,
    pub matter: SpectrumModel,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "model", rename_all = "camelCase")]
pub(super) enum SpectrumModel {
    #[serde(rename_all = "camelCase")]
    Constant { amplitudes: Vec<f64> },
    #[serde(rename_all = "camelCase")]
    PowerLaw {
        amplitudes: Vec<f64>,
        indices: Vec<f64>,
        pivot: f64,
    },
}

impl SpectrumModel {
    fn provider(&self) -> LimberResult<AnalyticProvider> {
        match self {
            Self::Constant { amplitudes } => {
                ConstantSpectrum::new(amplitudes.clone()).map(AnalyticProvider::Constant)
            }
            Self::PowerLaw {
                amplitudes,
                indices,
                pivot,
            } => PowerLawSpectrum::new(amplitudes.clone(), indices.clone(), *pivot)
                .map(AnalyticProvider::PowerLaw),
        }
    }
}

enum AnalyticProvider {
    Constant(ConstantSpectrum),
    PowerLaw(PowerLawSpectrum),
}

impl<P> SpectrumProvider<P> for AnalyticProvider {
    fn table_at(&self, params: &P, redshift: f64) -> LimberResult<MonomialSpectrumTable> {
        match self {
            Self::Constant(spectrum) => spectrum.table_at(params, redshift),
            Self::PowerLaw(spectrum) => spectrum.table_at(params, redshift),
        }
    }
}

impl<P> MatterSpectrumProvider<P> for AnalyticProvider {
    fn tables_on_grid(&self, params: &P, redshift: &[f64]) -> LimberResult<RedshiftResolvedTable> {
        match self {
            Self::Constant(spectrum) => spectrum.tables_on_grid(params, redshift),
            Self::PowerLaw(spectrum) => spectrum.tables_on_grid(params, redshift),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(super) enum RunConfigError {
    #[error("failed to read run config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse run config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<RunConfigError> for LimberError {
    fn from(error: RunConfigError) -> Self {
        match &error {
            RunConfigError::Read { .. } => {
                LimberError::io_system("IO.RUN_CONFIG_READ", error.to_string())
            }
            RunConfigError::Parse { .. } => {
                LimberError::input_validation("INPUT.RUN_CONFIG_PARSE", error.to_string())
            }
        }
    }
}

pub(super) fn load_run_config(path: &Path) -> Result<RunConfig, RunConfigError> {
    let source = fs::read_to_string(path).map_err(|source| RunConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| RunConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Wires the flat ΛCDM background and the analytic spectra into an engine.
pub(super) fn build_engine(
    dndz_path: &Path,
    config: &RunConfig,
) -> LimberResult<LimberEngine<FlatLcdmParams>> {
    let dndz = DndzTable::from_path(dndz_path)?;
    LimberEngine::builder(dndz, config.cosmology.params())
        .config(config.engine)
        .background(FlatLcdm::with_last_scattering(config.cosmology.z_star))
        .galaxy_matter(config.spectra.galaxy_matter.provider()?)
        .galaxy_galaxy(config.spectra.galaxy_galaxy.provider()?)
        .matter(config.spectra.matter.provider()?)
        .build()
}

#[cfg(test)]
mod tests {
    use super::{RunConfig, SpectrumModel};
    use limber_core::Extrapolation;

    #[test]
    fn minimal_run_config_falls_back_to_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{
              "spectra": {
                "galaxyMatter": { "model": "constant", "amplitudes": [1.0, 2.0] },
                "galaxyGalaxy": { "model": "constant", "amplitudes": [3.0] },
                "matter": { "model": "powerLaw", "amplitudes": [1.0], "indices": [-1.0], "pivot": 0.1 }
              }
            }"#,
        )
        .expect("run config");
        assert_eq!(config.sample, 0);
        assert_eq!(config.magnification_slope, 0.4);
        assert_eq!(config.extrapolation, Extrapolation::Extrapolate);
        assert_eq!(config.cosmology.omega_m, 0.3);
        assert_eq!(config.engine.nz, 50);
        assert_eq!(
            config.spectra.matter,
            SpectrumModel::PowerLaw {
                amplitudes: vec![1.0],
                indices: vec![-1.0],
                pivot: 0.1
            }
        );
    }

    #[test]
    fn malformed_spectrum_models_fail_validation_instead_of_panicking() {
        let empty: SpectrumModel =
            serde_json::from_str(r#"{ "model": "constant", "amplitudes": [] }"#).expect("model");
        let error = empty.provider().err().expect("empty amplitudes");
        assert_eq!(error.placeholder(), "INPUT.SPECTRUM_SHAPE");

        let mismatched: SpectrumModel = serde_json::from_str(
            r#"{ "model": "powerLaw", "amplitudes": [1.0, 2.0], "indices": [0.0], "pivot": 0.1 }"#,
        )
        .expect("model");
        let error = mismatched.provider().err().expect("index count");
        assert_eq!(error.placeholder(), "INPUT.SPECTRUM_SHAPE");
    }
}
