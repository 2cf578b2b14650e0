use super::{AngularSpectrum, LimberIntegrand, LimberSpectra, MonomialLayout, MultipoleGrid};
use crate::common::EngineConfig;
use crate::domain::{validate_sample_index, LimberError, LimberResult, SpectrumKind};
use crate::modules::background::{BackgroundSolver, BackgroundState};
use crate::modules::kernels::{build_projection_kernels, MagnificationSlope, ProjectionKernels};
use crate::modules::power::{
    interpolate_on_grid, interpolate_per_redshift, interpolate_reduced, limber_wavenumbers,
    MatterSpectrumProvider, MonomialSpectrumTable, RedshiftResolvedTable, SpectrumProvider,
};
use crate::modules::redshift::{DndzTable, RedshiftGrid, SampleDistributions};
use crate::modules::zeff::effective_redshifts;
use crate::numerics::Extrapolation;
use faer::Mat;
use std::path::Path;
use tracing::{debug, info};

/// Everything one cosmology evaluation produces for a sample before any
/// line-of-sight integration.
#[derive(Debug, Clone)]
pub struct SampleEvaluation {
    pub background: BackgroundState,
    pub kernels: ProjectionKernels,
    /// Pgm table at the sample's effective redshift.
    pub galaxy_matter: MonomialSpectrumTable,
    /// Pgg table at the sample's effective redshift.
    pub galaxy_galaxy: MonomialSpectrumTable,
    /// Pmm with one column per grid redshift.
    pub matter: RedshiftResolvedTable,
}

pub struct LimberEngineBuilder<P> {
    dndz: DndzTable,
    fiducial: P,
    config: EngineConfig,
    background: Option<Box<dyn BackgroundSolver<P>>>,
    galaxy_matter: Option<Box<dyn SpectrumProvider<P>>>,
    galaxy_galaxy: Option<Box<dyn SpectrumProvider<P>>>,
    matter: Option<Box<dyn MatterSpectrumProvider<P>>>,
}

impl<P> LimberEngineBuilder<P> {
    pub fn new(dndz: DndzTable, fiducial: P) -> Self {
        Self {
            dndz,
            fiducial,
            config: EngineConfig::default(),
            background: None,
            galaxy_matter: None,
            galaxy_galaxy: None,
            matter: None,
        }
    }

    /// Loads the redshift distribution from a whitespace-delimited file.
    pub fn from_path(path: impl AsRef<Path>, fiducial: P) -> LimberResult<Self> {
        Ok(Self::new(DndzTable::from_path(path)?, fiducial))
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn background(mut self, solver: impl BackgroundSolver<P> + 'static) -> Self {
        self.background = Some(Box::new(solver));
        self
    }

    pub fn galaxy_matter(mut self, provider: impl SpectrumProvider<P> + 'static) -> Self {
        self.galaxy_matter = Some(Box::new(provider));
        self
    }

    pub fn galaxy_galaxy(mut self, provider: impl SpectrumProvider<P> + 'static) -> Self {
        self.galaxy_galaxy = Some(Box::new(provider));
        self
    }

    pub fn matter(mut self, provider: impl MatterSpectrumProvider<P> + 'static) -> Self {
        self.matter = Some(Box::new(provider));
        self
    }

    /// Normalizes the samples and, when a background solver is present,
    /// computes the fiducial effective redshifts.
    pub fn build(self) -> LimberResult<LimberEngine<P>> {
        self.config.validate()?;
        let grid = RedshiftGrid::new(self.config.zmin, self.config.zmax, self.config.nz)?;
        let multipoles = MultipoleGrid::new(self.config.lmax, self.config.nlval)?;
        let samples = SampleDistributions::normalize(&self.dndz, &grid)?;

        let mut engine = LimberEngine {
            config: self.config,
            grid,
            multipoles,
            samples,
            fiducial: self.fiducial,
            zeff: None,
            background: self.background,
            galaxy_matter: self.galaxy_matter,
            galaxy_galaxy: self.galaxy_galaxy,
            matter: self.matter,
        };
        engine.zeff = engine.fiducial_effective_redshifts(&engine.fiducial)?;
        debug!(
            samples = engine.samples.sample_count(),
            nz = engine.grid.len(),
            nlval = engine.multipoles.sparse().len(),
            has_background = engine.background.is_some(),
            "limber engine constructed"
        );
        Ok(engine)
    }
}

/// Limber integration engine over a fixed set of galaxy samples.
pub struct LimberEngine<P> {
    config: EngineConfig,
    grid: RedshiftGrid,
    multipoles: MultipoleGrid,
    samples: SampleDistributions,
    fiducial: P,
    zeff: Option<Vec<f64>>,
    background: Option<Box<dyn BackgroundSolver<P>>>,
    galaxy_matter: Option<Box<dyn SpectrumProvider<P>>>,
    galaxy_galaxy: Option<Box<dyn SpectrumProvider<P>>>,
    matter: Option<Box<dyn MatterSpectrumProvider<P>>>,
}

impl<P> LimberEngine<P> {
    pub fn builder(dndz: DndzTable, fiducial: P) -> LimberEngineBuilder<P> {
        LimberEngineBuilder::new(dndz, fiducial)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn redshift_grid(&self) -> &RedshiftGrid {
        &self.grid
    }

    pub fn multipoles(&self) -> &MultipoleGrid {
        &self.multipoles
    }

    pub fn samples(&self) -> &SampleDistributions {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.sample_count()
    }

    pub fn fiducial_cosmology(&self) -> &P {
        &self.fiducial
    }

    /// `None` when the engine has no background solver.
    pub fn effective_redshifts(&self) -> Option<&[f64]> {
        self.zeff.as_deref()
    }

    /// Replaces the fiducial cosmology and recomputes the effective redshifts.
    ///
    /// On error the previous fiducial cosmology and redshifts are kept.
    pub fn set_fiducial_cosmology(&mut self, params: P) -> LimberResult<Option<&[f64]>> {
        let zeff = self.fiducial_effective_redshifts(&params)?;
        self.fiducial = params;
        self.zeff = zeff;
        if let Some(values) = self.zeff.as_deref() {
            info!(samples = values.len(), zeff = ?values, "fiducial cosmology updated");
        }
        Ok(self.zeff.as_deref())
    }

    fn fiducial_effective_redshifts(&self, params: &P) -> LimberResult<Option<Vec<f64>>> {
        if self.background.is_none() {
            return Ok(None);
        }
        let background = self.background(params)?;
        let kernels = self.projection_kernels(params, Some(&background))?;
        effective_redshifts(&self.grid, &background, &kernels).map(Some)
    }

    fn require_background(&self) -> LimberResult<&dyn BackgroundSolver<P>> {
        self.background.as_deref().ok_or_else(|| {
            LimberError::input_validation(
                "INPUT.BACKGROUND_MISSING",
                "a background solver is required to compute projection kernels",
            )
        })
    }

    fn require_effective_redshift(&self, sample: usize) -> LimberResult<f64> {
        validate_sample_index(sample, self.sample_count())?;
        let zeff = self.zeff.as_deref().ok_or_else(|| {
            LimberError::input_validation(
                "INPUT.BACKGROUND_MISSING",
                "effective redshifts are unavailable without a background solver",
            )
        })?;
        Ok(zeff[sample])
    }

    fn require_provider<'a, T: ?Sized>(
        provider: &'a Option<Box<T>>,
        name: &str,
    ) -> LimberResult<&'a T> {
        provider.as_deref().ok_or_else(|| {
            LimberError::input_validation(
                "INPUT.PROVIDER_MISSING",
                format!("no {} power-spectrum provider was configured", name),
            )
        })
    }

    /// Runs the background solver on the redshift grid.
    pub fn background(&self, params: &P) -> LimberResult<BackgroundState> {
        let state = self.require_background()?.evaluate(params, self.grid.values())?;
        state.validate(self.grid.len())?;
        Ok(state)
    }

    /// Projection kernels for `params`; a precomputed background skips the
    /// solver call.
    pub fn projection_kernels(
        &self,
        params: &P,
        background: Option<&BackgroundState>,
    ) -> LimberResult<ProjectionKernels> {
        let solver = self.require_background()?;
        match background {
            Some(state) => build_projection_kernels(&self.grid, &self.samples, state),
            None => {
                let state = solver.evaluate(params, self.grid.values())?;
                build_projection_kernels(&self.grid, &self.samples, &state)
            }
        }
    }

    /// Background, kernels and the three power-spectrum tables for `sample`.
    pub fn evaluate(&self, sample: usize, params: &P) -> LimberResult<SampleEvaluation> {
        let zeff = self.require_effective_redshift(sample)?;
        let background = self.background(params)?;
        let kernels = self.projection_kernels(params, Some(&background))?;
        let galaxy_matter =
            Self::require_provider(&self.galaxy_matter, "Pgm")?.table_at(params, zeff)?;
        let galaxy_galaxy =
            Self::require_provider(&self.galaxy_galaxy, "Pgg")?.table_at(params, zeff)?;
        let matter =
            Self::require_provider(&self.matter, "Pmm")?.tables_on_grid(params, self.grid.values())?;
        debug!(
            sample,
            zeff,
            pgm_monomials = galaxy_matter.column_count(),
            pgg_monomials = galaxy_galaxy.column_count(),
            "sample evaluated"
        );
        Ok(SampleEvaluation {
            background,
            kernels,
            galaxy_matter,
            galaxy_galaxy,
            matter,
        })
    }

    /// Cgg and Ckg of `sample`, decomposed by bias monomial.
    ///
    /// Pgg and Pgm use `extrapolation` outside their tabulated wavenumbers;
    /// Pmm is always held at its boundary value.
    pub fn compute_cgg_ckg(
        &self,
        sample: usize,
        params: &P,
        slope: &MagnificationSlope,
        extrapolation: Extrapolation,
    ) -> LimberResult<LimberSpectra> {
        let evaluation = self.evaluate(sample, params)?;
        let nz = self.grid.len();
        let chi = &evaluation.background.comoving_distance;
        let sparse = self.multipoles.sparse();
        let kgrid = limber_wavenumbers(chi, sparse);

        let layout = MonomialLayout::new(
            evaluation.galaxy_galaxy.column_count(),
            evaluation.galaxy_matter.column_count(),
        )?;
        let pgg = (0..layout.auto_count())
            .map(|column| {
                interpolate_on_grid(&evaluation.galaxy_galaxy, column, &kgrid, extrapolation)
            })
            .collect::<LimberResult<Vec<Mat<f64>>>>()?;
        let pgm = (0..layout.cross_count())
            .map(|column| {
                interpolate_on_grid(&evaluation.galaxy_matter, column, &kgrid, extrapolation)
            })
            .collect::<LimberResult<Vec<Mat<f64>>>>()?;
        let pmm = interpolate_per_redshift(&evaluation.matter, &kgrid, Extrapolation::Boundary)?;

        let factors = slope.factors(nz)?;
        let clustering = evaluation.kernels.clustering_for(sample)?;
        let magnification = evaluation.kernels.magnification_for(sample)?;
        let lensing = evaluation.kernels.lensing();

        let clustering_sq = pointwise(nz, |z| clustering[z] * clustering[z]);
        let clustering_mag = pointwise(nz, |z| 2.0 * factors[z] * clustering[z] * magnification[z]);
        let magnification_sq =
            pointwise(nz, |z| factors[z] * factors[z] * magnification[z] * magnification[z]);
        let lensing_clustering = pointwise(nz, |z| lensing[z] * clustering[z]);
        let lensing_mag = pointwise(nz, |z| factors[z] * lensing[z] * magnification[z]);

        let multipole_count = self.multipoles.output().len();
        let mut cgg = AngularSpectrum::zeros(SpectrumKind::GalaxyAuto, layout, multipole_count);
        let mut ckg = AngularSpectrum::zeros(SpectrumKind::GalaxyLensing, layout, multipole_count);

        let leading = LimberIntegrand::new(chi, sparse.len())
            .add(&clustering_sq, &pgg[0])
            .add(&clustering_mag, &pgm[0])
            .add(&magnification_sq, &pmm)
            .integrate(&self.multipoles)?;
        cgg.set_column(0, &leading);
        for (monomial, spectrum) in pgg.iter().enumerate().skip(1) {
            let column = LimberIntegrand::new(chi, sparse.len())
                .add(&clustering_sq, spectrum)
                .integrate(&self.multipoles)?;
            cgg.set_column(layout.auto_column(monomial), &column);
        }
        cgg.set_column(layout.shot_noise_column(), &vec![1.0; multipole_count]);
        for (monomial, spectrum) in pgm.iter().enumerate().skip(1) {
            let column = LimberIntegrand::new(chi, sparse.len())
                .add(&clustering_mag, spectrum)
                .integrate(&self.multipoles)?;
            cgg.set_column(layout.cross_column(monomial), &column);
        }

        let leading = LimberIntegrand::new(chi, sparse.len())
            .add(&lensing_clustering, &pgm[0])
            .add(&lensing_mag, &pmm)
            .integrate(&self.multipoles)?;
        ckg.set_column(0, &leading);
        for (monomial, spectrum) in pgm.iter().enumerate().skip(1) {
            let column = LimberIntegrand::new(chi, sparse.len())
                .add(&lensing_clustering, spectrum)
                .integrate(&self.multipoles)?;
            ckg.set_column(layout.cross_column(monomial), &column);
        }

        debug!(
            sample,
            nz,
            nlval = sparse.len(),
            columns = layout.total(),
            "cgg and ckg integrated"
        );
        Ok(LimberSpectra { cgg, ckg })
    }

    /// Cross-spectrum of samples `sample_i` and `sample_j` with redshift
    /// dependent parameters, bias monomials and magnification slope.
    ///
    /// Background, kernels and Pmm use `params(zeff_i)`; Pgm and Pgg are
    /// evaluated at every grid redshift with `params(z)` and reduced with
    /// `[1, mono(z)...]`. All spectra are held at their boundary values
    /// outside the tables. No shot noise is added.
    pub fn compute_cross_zevolution<Fp, Fa, Fc, Fs>(
        &self,
        sample_i: usize,
        sample_j: usize,
        params: Fp,
        mono_auto: Fa,
        mono_cross: Fc,
        slope: Fs,
    ) -> LimberResult<Vec<f64>>
    where
        Fp: Fn(f64) -> P,
        Fa: Fn(f64) -> Vec<f64>,
        Fc: Fn(f64) -> Vec<f64>,
        Fs: Fn(f64) -> f64,
    {
        let zeff = self.require_effective_redshift(sample_i)?;
        validate_sample_index(sample_j, self.sample_count())?;
        let galaxy_matter = Self::require_provider(&self.galaxy_matter, "Pgm")?;
        let galaxy_galaxy = Self::require_provider(&self.galaxy_galaxy, "Pgg")?;
        let matter = Self::require_provider(&self.matter, "Pmm")?;

        let anchor = params(zeff);
        let background = self.background(&anchor)?;
        let kernels = self.projection_kernels(&anchor, Some(&background))?;
        let z = self.grid.values();
        let chi = &background.comoving_distance;
        let sparse = self.multipoles.sparse();
        let kgrid = limber_wavenumbers(chi, sparse);
        let pmm = interpolate_per_redshift(
            &matter.tables_on_grid(&anchor, z)?,
            &kgrid,
            Extrapolation::Boundary,
        )?;

        let mut pgm = Mat::<f64>::zeros(z.len(), sparse.len());
        let mut pgg = Mat::<f64>::zeros(z.len(), sparse.len());
        for (row, redshift) in z.iter().enumerate() {
            let local = params(*redshift);
            let wavenumbers: Vec<f64> = (0..sparse.len()).map(|col| kgrid[(row, col)]).collect();
            let cross = leading_coefficients(mono_cross(*redshift));
            let auto = leading_coefficients(mono_auto(*redshift));
            let pgm_row = interpolate_reduced(
                &galaxy_matter.table_at(&local, *redshift)?,
                &cross,
                &wavenumbers,
                Extrapolation::Boundary,
            )?;
            let pgg_row = interpolate_reduced(
                &galaxy_galaxy.table_at(&local, *redshift)?,
                &auto,
                &wavenumbers,
                Extrapolation::Boundary,
            )?;
            for col in 0..sparse.len() {
                pgm[(row, col)] = pgm_row[col];
                pgg[(row, col)] = pgg_row[col];
            }
        }

        let factors: Vec<f64> = z.iter().map(|redshift| 5.0 * slope(*redshift) - 2.0).collect();
        let clustering_i = kernels.clustering_for(sample_i)?;
        let clustering_j = kernels.clustering_for(sample_j)?;
        let magnification_i = kernels.magnification_for(sample_i)?;
        let magnification_j = kernels.magnification_for(sample_j)?;

        let nz = z.len();
        let clustering_pair = pointwise(nz, |k| clustering_i[k] * clustering_j[k]);
        let mixed = pointwise(nz, |k| {
            factors[k] * (magnification_i[k] * clustering_j[k] + magnification_j[k] * clustering_i[k])
        });
        let magnification_pair =
            pointwise(nz, |k| factors[k] * factors[k] * magnification_i[k] * magnification_j[k]);

        let spectrum = LimberIntegrand::new(chi, sparse.len())
            .add(&clustering_pair, &pgg)
            .add(&mixed, &pgm)
            .add(&magnification_pair, &pmm)
            .integrate(&self.multipoles)?;
        debug!(sample_i, sample_j, zeff, nz, "redshift-evolving cross-spectrum integrated");
        Ok(spectrum)
    }
}

fn pointwise(count: usize, value: impl Fn(usize) -> f64) -> Vec<f64> {
    (0..count).map(value).collect()
}

fn leading_coefficients(monomials: Vec<f64>) -> Vec<f64> {
    let mut coefficients = Vec::with_capacity(monomials.len() + 1);
    coefficients.push(1.0);
    coefficients.extend(monomials);
    coefficients
}
