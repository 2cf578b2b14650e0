//! Grid configuration for the Limber engine.
//!
//! The redshift grid and the sparse multipole grid are fixed for the lifetime
//! of an engine; everything cosmology-dependent is passed per call.

use super::constants::{DEFAULT_LMAX, DEFAULT_NLVAL, DEFAULT_NZ, DEFAULT_ZMAX, DEFAULT_ZMIN};
use crate::domain::{LimberError, LimberResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub zmin: f64,
    pub zmax: f64,
    pub nz: usize,
    pub lmax: usize,
    pub nlval: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zmin: DEFAULT_ZMIN,
            zmax: DEFAULT_ZMAX,
            nz: DEFAULT_NZ,
            lmax: DEFAULT_LMAX,
            nlval: DEFAULT_NLVAL,
        }
    }
}

impl EngineConfig {
    pub fn with_redshift_range(mut self, zmin: f64, zmax: f64, nz: usize) -> Self {
        self.zmin = zmin;
        self.zmax = zmax;
        self.nz = nz;
        self
    }

    pub fn with_multipoles(mut self, lmax: usize, nlval: usize) -> Self {
        self.lmax = lmax;
        self.nlval = nlval;
        self
    }

    pub fn validate(&self) -> LimberResult<()> {
        if !self.zmin.is_finite() || !self.zmax.is_finite() || self.zmin < 0.0 {
            return Err(LimberError::input_validation(
                "INPUT.CONFIG_REDSHIFT",
                format!(
                    "redshift bounds must be finite and non-negative, got [{}, {}]",
                    self.zmin, self.zmax
                ),
            ));
        }
        if self.zmin >= self.zmax {
            return Err(LimberError::input_validation(
                "INPUT.CONFIG_REDSHIFT",
                format!(
                    "zmin must be below zmax, got zmin={} zmax={}",
                    self.zmin, self.zmax
                ),
            ));
        }
        if self.nz < 3 {
            return Err(LimberError::input_validation(
                "INPUT.CONFIG_REDSHIFT",
                format!("redshift grid needs at least 3 nodes, got {}", self.nz),
            ));
        }
        if self.lmax < 2 {
            return Err(LimberError::input_validation(
                "INPUT.CONFIG_MULTIPOLE",
                format!("lmax must be at least 2, got {}", self.lmax),
            ));
        }
        if self.nlval < 4 || self.nlval > self.lmax {
            return Err(LimberError::input_validation(
                "INPUT.CONFIG_MULTIPOLE",
                format!(
                    "sparse multipole count must lie in [4, lmax={}], got {}",
                    self.lmax, self.nlval
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineConfigError {
    #[error("failed to read engine config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse engine config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("engine config '{}' is invalid: {source}", path.display())]
    Invalid { path: PathBuf, source: LimberError },
}

impl From<EngineConfigError> for LimberError {
    fn from(error: EngineConfigError) -> Self {
        match &error {
            EngineConfigError::Read { .. } => {
                LimberError::io_system("IO.CONFIG_READ", error.to_string())
            }
            EngineConfigError::Parse { .. } => {
                LimberError::input_validation("INPUT.CONFIG_PARSE", error.to_string())
            }
            EngineConfigError::Invalid { source, .. } => source.clone(),
        }
    }
}

/// Reads and validates an [`EngineConfig`] from a JSON file. Missing fields
/// fall back to the defaults.
pub fn load_engine_config(path: impl AsRef<Path>) -> Result<EngineConfig, EngineConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| EngineConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: EngineConfig =
        serde_json::from_str(&source).map_err(|source| EngineConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config
        .validate()
        .map_err(|source| EngineConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(config)
}
