pub mod errors;

pub use errors::{LimberError, LimberErrorCategory, LimberResult, ParserResult};

use std::fmt::{Display, Formatter};

/// Which angular spectrum a column table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrumKind {
    /// Galaxy clustering auto-spectrum, Cgg.
    GalaxyAuto,
    /// Galaxy cross CMB-lensing convergence, Ckg.
    GalaxyLensing,
}

impl SpectrumKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GalaxyAuto => "Cgg",
            Self::GalaxyLensing => "Ckg",
        }
    }
}

impl Display for SpectrumKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Rejects sample indices outside `[0, sample_count)`.
pub fn validate_sample_index(index: usize, sample_count: usize) -> LimberResult<()> {
    if index >= sample_count {
        return Err(LimberError::input_validation(
            "INPUT.SAMPLE_INDEX",
            format!(
                "galaxy sample index {} is out of range for {} sample(s)",
                index, sample_count
            ),
        ));
    }
    Ok(())
}
