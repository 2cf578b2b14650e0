use super::background::BackgroundState;
use super::kernels::ProjectionKernels;
use super::redshift::{matrix_column, RedshiftGrid};
use crate::domain::{LimberError, LimberResult};
use crate::numerics::trapezoid;

/// Clustering-weighted effective redshift of every sample,
/// `∫ z Wg² / chi² dz / ∫ Wg² / chi² dz`, using the clustering-only kernel.
pub fn effective_redshifts(
    grid: &RedshiftGrid,
    background: &BackgroundState,
    kernels: &ProjectionKernels,
) -> LimberResult<Vec<f64>> {
    background.validate(grid.len())?;
    let z = grid.values();
    let chi = &background.comoving_distance;

    (0..kernels.sample_count())
        .map(|sample| {
            let clustering = matrix_column(kernels.clustering(), sample);
            let weight: Vec<f64> = clustering
                .iter()
                .zip(chi)
                .map(|(kernel, distance)| kernel * kernel / (distance * distance))
                .collect();
            let weighted_z: Vec<f64> = weight.iter().zip(z).map(|(w, z)| w * z).collect();

            let denominator = trapezoid(&weight, z).map_err(|error| {
                LimberError::computation("RUN.ZEFF_QUADRATURE", error.to_string())
            })?;
            let numerator = trapezoid(&weighted_z, z).map_err(|error| {
                LimberError::computation("RUN.ZEFF_QUADRATURE", error.to_string())
            })?;
            if denominator <= 0.0 || !denominator.is_finite() {
                return Err(LimberError::computation(
                    "RUN.ZEFF_WEIGHT",
                    format!(
                        "sample {} has clustering weight {}; effective redshift is undefined",
                        sample, denominator
                    ),
                ));
            }
            Ok(numerator / denominator)
        })
        .collect()
}
