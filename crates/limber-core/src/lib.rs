//! Limber-approximation angular power spectra of galaxy clustering and
//! galaxy x CMB-lensing cross-correlations.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;

pub use common::EngineConfig;
pub use domain::{LimberError, LimberErrorCategory, LimberResult, SpectrumKind};
pub use modules::{
    AngularSpectrum, BackgroundSolver, BackgroundState, DndzTable, LimberEngine,
    LimberEngineBuilder, LimberSpectra, MagnificationSlope,
};
pub use numerics::Extrapolation;
