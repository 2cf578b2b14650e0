pub mod background;
pub mod kernels;
pub mod limber;
pub mod power;
pub mod redshift;
pub mod zeff;

pub use background::{BackgroundSolver, BackgroundState, FlatLcdm, FlatLcdmParams};
pub use kernels::{MagnificationSlope, ProjectionKernels};
pub use limber::{AngularSpectrum, LimberEngine, LimberEngineBuilder, LimberSpectra};
pub use power::{MatterSpectrumProvider, SpectrumProvider, SpectrumTable};
pub use redshift::{DndzTable, GridInput, RedshiftGrid, SampleDistributions};
