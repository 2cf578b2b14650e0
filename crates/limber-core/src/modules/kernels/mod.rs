//! CMB-lensing and galaxy projection kernels in h/Mpc.

use super::background::BackgroundState;
use super::redshift::{matrix_column, GridInput, RedshiftGrid, SampleDistributions};
use crate::common::constants::HUBBLE_H_PER_MPC;
use crate::domain::{validate_sample_index, LimberError, LimberResult};
use crate::numerics::reverse_cumulative_sum;
use faer::Mat;

/// Slope `s` of the cumulative magnitude function; enters the galaxy kernel
/// as `Wg = Wg_clust + (5 s - 2) Wg_mag`.
#[derive(Debug, Clone, PartialEq)]
pub enum MagnificationSlope {
    Constant(f64),
    PerRedshift(Vec<f64>),
}

impl MagnificationSlope {
    /// `5 s - 2` at every grid node.
    pub fn factors(&self, redshift_count: usize) -> LimberResult<Vec<f64>> {
        match self {
            Self::Constant(slope) => Ok(vec![5.0 * slope - 2.0; redshift_count]),
            Self::PerRedshift(slopes) => {
                if slopes.len() != redshift_count {
                    return Err(LimberError::input_validation(
                        "INPUT.BROADCAST_SHAPE",
                        format!(
                            "magnification slope has {} value(s) for {} redshift node(s)",
                            slopes.len(),
                            redshift_count
                        ),
                    ));
                }
                Ok(slopes.iter().map(|slope| 5.0 * slope - 2.0).collect())
            }
        }
    }
}

impl From<f64> for MagnificationSlope {
    fn from(slope: f64) -> Self {
        Self::Constant(slope)
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionKernels {
    lensing: Vec<f64>,
    clustering: Mat<f64>,
    magnification: Mat<f64>,
}

impl ProjectionKernels {
    /// CMB-lensing kernel `Wk(z)`.
    pub fn lensing(&self) -> &[f64] {
        &self.lensing
    }

    /// Clustering kernels, `(nz, ng)`.
    pub fn clustering(&self) -> &Mat<f64> {
        &self.clustering
    }

    /// Magnification kernels, `(nz, ng)`.
    pub fn magnification(&self) -> &Mat<f64> {
        &self.magnification
    }

    pub fn sample_count(&self) -> usize {
        self.clustering.ncols()
    }

    pub fn clustering_for(&self, sample: usize) -> LimberResult<Vec<f64>> {
        validate_sample_index(sample, self.sample_count())?;
        Ok(matrix_column(&self.clustering, sample))
    }

    pub fn magnification_for(&self, sample: usize) -> LimberResult<Vec<f64>> {
        validate_sample_index(sample, self.sample_count())?;
        Ok(matrix_column(&self.magnification, sample))
    }

    /// Full galaxy kernel `Wg_clust + (5 s - 2) Wg_mag` for one sample.
    pub fn galaxy(&self, sample: usize, slope: &MagnificationSlope) -> LimberResult<Vec<f64>> {
        let clustering = self.clustering_for(sample)?;
        let magnification = self.magnification_for(sample)?;
        let factors = slope.factors(clustering.len())?;
        Ok(clustering
            .iter()
            .zip(&magnification)
            .zip(&factors)
            .map(|((clust, mag), factor)| clust + factor * mag)
            .collect())
    }
}

/// Builds every kernel from one background evaluation.
///
/// The magnification integrals `∫_z^{zmax} dN/dz' dz'` and
/// `∫_z^{zmax} dN/dz' / chi(z') dz'` are right-anchored Riemann sums with the
/// constant grid step, not adaptive quadrature.
pub fn build_projection_kernels(
    grid: &RedshiftGrid,
    samples: &SampleDistributions,
    background: &BackgroundState,
) -> LimberResult<ProjectionKernels> {
    let nz = grid.len();
    let ng = samples.sample_count();
    background.validate(nz)?;

    let h0 = HUBBLE_H_PER_MPC;
    let z = grid.values();
    let chi = &background.comoving_distance;
    let chistar = background.chistar;
    let lensing_prefactor: Vec<f64> = z
        .iter()
        .map(|redshift| 1.5 * background.omega_m * h0 * h0 * (1.0 + redshift))
        .collect();

    let lensing = lensing_prefactor
        .iter()
        .zip(chi)
        .map(|(prefactor, distance)| prefactor * distance * (chistar - distance) / chistar)
        .collect();

    let expansion: Vec<f64> = background
        .hubble_rate
        .iter()
        .map(|rate| h0 * rate)
        .collect();
    let expansion_grid = GridInput::PerRedshift(expansion).broadcast(nz, ng)?;
    let dndz = samples.matrix();

    let step = grid.step();
    let mut clustering = Mat::<f64>::zeros(nz, ng);
    let mut magnification = Mat::<f64>::zeros(nz, ng);
    for sample in 0..ng {
        let density = matrix_column(dndz, sample);
        let weighted: Vec<f64> = density
            .iter()
            .zip(chi)
            .map(|(value, distance)| value / distance)
            .collect();
        let tail_count = reverse_cumulative_sum(&density, step);
        let tail_weighted = reverse_cumulative_sum(&weighted, step);

        for row in 0..nz {
            clustering[(row, sample)] = expansion_grid[(row, sample)] * density[row];
            magnification[(row, sample)] = lensing_prefactor[row]
                * (chi[row] * tail_count[row] - chi[row] * chi[row] * tail_weighted[row]);
        }
    }

    Ok(ProjectionKernels {
        lensing,
        clustering,
        magnification,
    })
}

#[cfg(test)]
mod tests {
    use super::{build_projection_kernels, MagnificationSlope};
    use crate::common::constants::HUBBLE_H_PER_MPC;
    use crate::modules::background::BackgroundState;
    use crate::modules::redshift::{DndzTable, RedshiftGrid, SampleDistributions};

    fn fixture() -> (RedshiftGrid, SampleDistributions, BackgroundState) {
        let grid = RedshiftGrid::new(0.1, 1.0, 10).expect("grid");
        let rows: Vec<Vec<f64>> = (0..=20)
            .map(|index| {
                let z = 0.3 + 0.02 * index as f64;
                let bump = (-0.5 * ((z - 0.5) / 0.06_f64).powi(2)).exp();
                vec![z, bump]
            })
            .collect();
        let table = DndzTable::from_rows(&rows).expect("table");
        let samples = SampleDistributions::normalize(&table, &grid).expect("normalize");
        let background = BackgroundState {
            omega_m: 0.3,
            chistar: 9_500.0,
            hubble_rate: grid.values().iter().map(|z| 1.0 + 0.5 * z).collect(),
            comoving_distance: grid.values().iter().map(|z| 2_900.0 * z).collect(),
        };
        (grid, samples, background)
    }

    #[test]
    fn lensing_kernel_matches_closed_form() {
        let (grid, samples, background) = fixture();
        let kernels = build_projection_kernels(&grid, &samples, &background).expect("kernels");
        let h0 = HUBBLE_H_PER_MPC;
        for (index, z) in grid.values().iter().enumerate() {
            let chi = background.comoving_distance[index];
            let expected = 1.5 * 0.3 * h0 * h0 * (1.0 + z) * chi * (9_500.0 - chi) / 9_500.0;
            assert!((kernels.lensing()[index] - expected).abs() <= 1.0e-15 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn clustering_kernel_is_expansion_rate_times_density() {
        let (grid, samples, background) = fixture();
        let kernels = build_projection_kernels(&grid, &samples, &background).expect("kernels");
        let density = samples.sample(0).expect("sample");
        let clustering = kernels.clustering_for(0).expect("clustering");
        for index in 0..grid.len() {
            let expected = HUBBLE_H_PER_MPC * background.hubble_rate[index] * density[index];
            assert!((clustering[index] - expected).abs() <= 1.0e-18);
        }
    }

    #[test]
    fn magnification_kernel_vanishes_above_the_sample() {
        // dN/dz is zero for z > 0.7, so both tail integrals vanish there.
        let (grid, samples, background) = fixture();
        let kernels = build_projection_kernels(&grid, &samples, &background).expect("kernels");
        let magnification = kernels.magnification_for(0).expect("magnification");
        for (z, value) in grid.values().iter().zip(&magnification) {
            if *z > 0.75 {
                assert_eq!(*value, 0.0, "z={z}");
            }
        }
        // Below the sample, chi * (I1 - chi * I2) > 0 because chi(z') > chi(z).
        assert!(magnification[0] > 0.0);
    }

    #[test]
    fn lensing_kernel_vanishes_where_chi_reaches_chistar() {
        let (grid, samples, mut background) = fixture();
        background.chistar = background.comoving_distance[grid.len() - 1];
        let kernels = build_projection_kernels(&grid, &samples, &background).expect("kernels");
        assert_eq!(kernels.lensing()[grid.len() - 1], 0.0);
    }

    #[test]
    fn galaxy_kernel_combines_clustering_and_magnification() {
        let (grid, samples, background) = fixture();
        let kernels = build_projection_kernels(&grid, &samples, &background).expect("kernels");
        let slope = MagnificationSlope::from(0.6);
        let galaxy = kernels.galaxy(0, &slope).expect("galaxy kernel");
        let clustering = kernels.clustering_for(0).expect("clustering");
        let magnification = kernels.magnification_for(0).expect("magnification");
        for index in 0..grid.len() {
            let expected = clustering[index] + 1.0 * magnification[index];
            assert!((galaxy[index] - expected).abs() <= 1.0e-15);
        }

        let wrong = MagnificationSlope::PerRedshift(vec![0.4; 3]);
        assert_eq!(
            kernels.galaxy(0, &wrong).expect_err("shape").placeholder(),
            "INPUT.BROADCAST_SHAPE"
        );
        assert_eq!(
            kernels.galaxy(1, &slope).expect_err("index").placeholder(),
            "INPUT.SAMPLE_INDEX"
        );
    }
}
