use limber_core::common::{load_engine_config, EngineConfig};
use limber_core::modules::background::{BackgroundState, FlatLcdm, FlatLcdmParams};
use limber_core::modules::power::{ConstantSpectrum, PowerLawSpectrum, SpectrumTable};
use limber_core::modules::redshift::DndzTable;
use limber_core::{Extrapolation, LimberEngine, LimberResult, MagnificationSlope};
use std::fs;

fn assert_scalar_close(label: &str, expected: f64, actual: f64, abs_tol: f64, rel_tol: f64) {
    let abs_diff = (actual - expected).abs();
    let rel_diff = abs_diff / expected.abs().max(f64::MIN_POSITIVE);
    assert!(
        abs_diff <= abs_tol || rel_diff <= rel_tol,
        "{label} expected={expected:.15e} actual={actual:.15e} abs_diff={abs_diff:.15e} rel_diff={rel_diff:.15e} abs_tol={abs_tol:.15e} rel_tol={rel_tol:.15e}"
    );
}

fn gaussian_rows(mean: f64, sigma: f64) -> Vec<Vec<f64>> {
    (0..=400)
        .map(|index| {
            let z = 0.005 * index as f64;
            vec![z, (-0.5 * ((z - mean) / sigma).powi(2)).exp()]
        })
        .collect()
}

fn gaussian_engine(omega_m: f64) -> LimberEngine<FlatLcdmParams> {
    let dndz = DndzTable::from_rows(&gaussian_rows(0.5, 0.05)).expect("dndz");
    LimberEngine::builder(dndz, FlatLcdmParams { omega_m })
        .background(FlatLcdm::default())
        .galaxy_matter(PowerLawSpectrum::new(vec![2.0e3, 50.0], vec![-1.0, -1.0], 0.1).expect("pgm"))
        .galaxy_galaxy(PowerLawSpectrum::new(vec![4.0e3], vec![-1.0], 0.1).expect("pgg"))
        .matter(PowerLawSpectrum::new(vec![1.0e3], vec![-1.0], 0.1).expect("pmm"))
        .build()
        .expect("engine")
}

#[test]
fn gaussian_sample_auto_spectrum_is_positive_and_falls_at_high_multipoles() {
    let params = FlatLcdmParams { omega_m: 0.3 };
    let engine = gaussian_engine(0.3);
    let zeff = engine.effective_redshifts().expect("zeff")[0];
    assert_scalar_close("zeff", 0.5, zeff, 0.02, 0.0);

    let spectra = engine
        .compute_cgg_ckg(
            0,
            &params,
            &MagnificationSlope::Constant(0.4),
            Extrapolation::Boundary,
        )
        .expect("spectra");
    let leading = spectra.cgg.column(0).expect("leading");
    assert_eq!(leading.len(), 1001);
    assert!(leading[10..].iter().all(|value| *value > 0.0));
    assert!(leading[200] > leading[500]);
    assert!(leading[500] > leading[1000]);

    let lensing = spectra.ckg.column(0).expect("leading cross");
    assert!(lensing[100] > 0.0);
}

#[test]
fn constant_amplitude_spectra_give_a_scale_free_auto_spectrum() {
    let params = FlatLcdmParams { omega_m: 0.3 };
    let dndz = DndzTable::from_rows(&gaussian_rows(0.5, 0.05)).expect("dndz");
    let amplitude = 1.0e4;
    let engine = LimberEngine::builder(dndz, params)
        .background(FlatLcdm::default())
        .galaxy_matter(ConstantSpectrum::new(vec![amplitude]).expect("pgm"))
        .galaxy_galaxy(ConstantSpectrum::new(vec![amplitude]).expect("pgg"))
        .matter(ConstantSpectrum::new(vec![amplitude]).expect("pmm"))
        .build()
        .expect("engine");
    let spectra = engine
        .compute_cgg_ckg(
            0,
            &params,
            &MagnificationSlope::Constant(0.4),
            Extrapolation::Extrapolate,
        )
        .expect("spectra");

    let leading = spectra.cgg.column(0).expect("leading");
    assert!(leading[0] > 0.0);
    for ell in [1, 10, 100, 500, 1000] {
        assert_scalar_close(&format!("Cgg(l={ell})"), leading[0], leading[ell], 0.0, 1.0e-10);
    }
}

#[test]
fn lensing_cross_spectrum_vanishes_without_matter() {
    let params = FlatLcdmParams { omega_m: 0.0 };
    let engine = gaussian_engine(0.0);
    let spectra = engine
        .compute_cgg_ckg(
            0,
            &params,
            &MagnificationSlope::Constant(0.8),
            Extrapolation::Boundary,
        )
        .expect("spectra");

    for column in 0..spectra.ckg.column_count() {
        let values = spectra.ckg.column(column).expect("column");
        assert!(values.iter().all(|value| *value == 0.0), "column {column}");
    }
    assert!(spectra.cgg.value(300, 0).expect("cgg") > 0.0);
}

#[test]
fn auto_columns_of_the_cross_spectrum_are_identically_zero() {
    let params = FlatLcdmParams { omega_m: 0.3 };
    let engine = gaussian_engine(0.3);
    let spectra = engine
        .compute_cgg_ckg(
            0,
            &params,
            &MagnificationSlope::Constant(0.3),
            Extrapolation::Extrapolate,
        )
        .expect("spectra");
    let layout = spectra.ckg.layout();
    assert_eq!(layout.total(), 3);
    for column in 1..=layout.auto_count() {
        assert!(
            spectra
                .ckg
                .column(column)
                .expect("column")
                .iter()
                .all(|value| *value == 0.0)
        );
    }
    assert!(spectra.ckg.value(50, layout.cross_column(1)).expect("cross") > 0.0);
}

#[test]
fn out_of_range_sample_index_is_rejected() {
    let engine = gaussian_engine(0.3);
    let error = engine
        .compute_cgg_ckg(
            1,
            engine.fiducial_cosmology(),
            &MagnificationSlope::Constant(0.4),
            Extrapolation::Extrapolate,
        )
        .expect_err("only one sample");
    assert_eq!(error.placeholder(), "INPUT.SAMPLE_INDEX");
    assert_eq!(error.exit_code(), 2);
}

#[test]
fn effective_redshifts_are_bit_identical_across_runs() {
    let first = gaussian_engine(0.3).effective_redshifts().expect("zeff").to_vec();
    let second = gaussian_engine(0.3).effective_redshifts().expect("zeff").to_vec();
    assert_eq!(
        first.iter().map(|value| value.to_bits()).collect::<Vec<_>>(),
        second.iter().map(|value| value.to_bits()).collect::<Vec<_>>()
    );
}

#[test]
fn closures_serve_as_background_and_spectrum_providers() {
    let dndz = DndzTable::from_rows(&gaussian_rows(0.7, 0.1)).expect("dndz");
    let config = EngineConfig::default()
        .with_redshift_range(0.05, 1.5, 31)
        .with_multipoles(300, 12);
    let background = |omega_m: &f64, z: &[f64]| -> LimberResult<BackgroundState> {
        let distances = z
            .iter()
            .map(|redshift| FlatLcdm::comoving_distance(*omega_m, *redshift))
            .collect::<LimberResult<Vec<f64>>>()?;
        Ok(BackgroundState {
            omega_m: *omega_m,
            chistar: 9_400.0,
            hubble_rate: z
                .iter()
                .map(|redshift| FlatLcdm::hubble_rate(*omega_m, *redshift))
                .collect(),
            comoving_distance: distances,
        })
    };
    let galaxy = |_: &f64, _: f64| -> LimberResult<SpectrumTable> {
        SpectrumTable::new(vec![1.0e-4, 1.0e-2, 1.0, 100.0], vec![vec![5.0e3; 4], vec![1.0; 4]])
    };

    let engine = LimberEngine::builder(dndz, 0.31)
        .config(config)
        .background(background)
        .galaxy_matter(galaxy)
        .galaxy_galaxy(galaxy)
        .matter(ConstantSpectrum::new(vec![5.0e3]).expect("pmm"))
        .build()
        .expect("engine");

    let spectra = engine
        .compute_cgg_ckg(0, &0.31, &MagnificationSlope::Constant(0.4), Extrapolation::Zero)
        .expect("spectra");
    assert_eq!(spectra.cgg.column_count(), 4);
    assert_eq!(spectra.cgg.multipole_count(), 301);
    let combined = spectra.cgg.combine(&[1.0, 0.0, 0.0, 0.0]).expect("combine");
    assert_eq!(combined, spectra.cgg.column(0).expect("leading"));
}

#[test]
fn file_based_workflow_matches_in_memory_tables() {
    let directory = tempfile::tempdir().expect("tempdir");
    let dndz_path = directory.path().join("dndz.txt");
    let config_path = directory.path().join("engine.json");

    let rows = gaussian_rows(0.5, 0.05);
    let mut text = String::from("# z dN/dz\n");
    for row in &rows {
        text.push_str(&format!("{:.17e} {:.17e}\n", row[0], row[1]));
    }
    fs::write(&dndz_path, text).expect("write dndz");
    fs::write(
        &config_path,
        r#"{"zmin": 0.001, "zmax": 2.0, "nz": 50, "lmax": 1000, "nlval": 64}"#,
    )
    .expect("write config");

    let config = load_engine_config(&config_path).expect("config");
    assert_eq!(config, EngineConfig::default());

    let from_file = LimberEngine::builder(
        DndzTable::from_path(&dndz_path).expect("dndz file"),
        FlatLcdmParams { omega_m: 0.3 },
    )
    .config(config)
    .background(FlatLcdm::default())
    .build()
    .expect("engine");
    let in_memory = gaussian_engine(0.3);

    assert_eq!(
        from_file.effective_redshifts().expect("zeff"),
        in_memory.effective_redshifts().expect("zeff")
    );
}
