use super::CliError;
use super::config::{build_engine, load_run_config};
use anyhow::Context;
use limber_core::domain::LimberError;
use limber_core::{Extrapolation, MagnificationSlope};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(clap::Args)]
pub(super) struct SpectraArgs {
    /// Redshift distribution: z followed by one dN/dz column per sample
    #[arg(long)]
    dndz: PathBuf,

    /// JSON run configuration
    #[arg(long)]
    config: PathBuf,

    /// Galaxy sample index (overrides the run configuration)
    #[arg(long)]
    sample: Option<usize>,

    /// Output file for the spectra (pretty JSON). Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ZeffArgs {
    /// Redshift distribution: z followed by one dN/dz column per sample
    #[arg(long)]
    dndz: PathBuf,

    /// JSON run configuration
    #[arg(long)]
    config: PathBuf,

    /// Output file (pretty JSON). Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutReport {
    auto_monomials: usize,
    cross_monomials: usize,
    shot_noise_column: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpectraReport {
    sample: usize,
    effective_redshift: Option<f64>,
    magnification_slope: f64,
    extrapolation: Extrapolation,
    layout: LayoutReport,
    ell: Vec<usize>,
    /// One row per multipole, one entry per column.
    cgg: Vec<Vec<f64>>,
    ckg: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZeffReport {
    omega_m: f64,
    effective_redshifts: Vec<f64>,
}

pub(super) fn run_spectra_command(args: SpectraArgs) -> Result<i32, CliError> {
    let config = load_run_config(&args.config).map_err(LimberError::from)?;
    let sample = args.sample.unwrap_or(config.sample);
    let engine = build_engine(&args.dndz, &config)?;
    info!(sample, dndz = %args.dndz.display(), "computing angular spectra");

    let spectra = engine.compute_cgg_ckg(
        sample,
        engine.fiducial_cosmology(),
        &MagnificationSlope::Constant(config.magnification_slope),
        config.extrapolation,
    )?;
    let zeff = engine
        .effective_redshifts()
        .and_then(|values| values.get(sample).copied());
    let layout = spectra.cgg.layout();
    let rows = |spectrum: &limber_core::AngularSpectrum| -> Vec<Vec<f64>> {
        let matrix = spectrum.matrix();
        (0..matrix.nrows())
            .map(|row| (0..matrix.ncols()).map(|col| matrix[(row, col)]).collect())
            .collect()
    };
    let report = SpectraReport {
        sample,
        effective_redshift: zeff,
        magnification_slope: config.magnification_slope,
        extrapolation: config.extrapolation,
        layout: LayoutReport {
            auto_monomials: layout.auto_count(),
            cross_monomials: layout.cross_count(),
            shot_noise_column: layout.shot_noise_column(),
        },
        ell: (0..spectra.cgg.multipole_count()).collect(),
        cgg: rows(&spectra.cgg),
        ckg: rows(&spectra.ckg),
    };

    write_json(args.output.as_deref(), &report)?;
    Ok(0)
}

pub(super) fn run_zeff_command(args: ZeffArgs) -> Result<i32, CliError> {
    let config = load_run_config(&args.config).map_err(LimberError::from)?;
    let engine = build_engine(&args.dndz, &config)?;
    let effective_redshifts = engine
        .effective_redshifts()
        .map(<[f64]>::to_vec)
        .unwrap_or_default();
    info!(samples = effective_redshifts.len(), "effective redshifts computed");

    let report = ZeffReport {
        omega_m: config.cosmology.omega_m,
        effective_redshifts,
    };
    write_json(args.output.as_deref(), &report)?;
    Ok(0)
}

fn write_json<T: Serialize>(output: Option<&Path>, value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create '{}'", parent.display()))?;
            }
            fs::write(path, rendered)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
