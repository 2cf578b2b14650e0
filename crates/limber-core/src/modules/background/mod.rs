//! Background-cosmology interface and a reference flat ΛCDM solver.

mod model;

pub use model::{FlatLcdm, FlatLcdmParams, HasMatterDensity};

use crate::domain::{LimberError, LimberResult};

/// Background quantities for one cosmology on the redshift grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundState {
    /// Matter density fraction today.
    pub omega_m: f64,
    /// Comoving distance to last scattering [Mpc/h].
    pub chistar: f64,
    /// Dimensionless expansion rate `E(z) = H(z) / H0`.
    pub hubble_rate: Vec<f64>,
    /// Comoving distance [Mpc/h].
    pub comoving_distance: Vec<f64>,
}

impl BackgroundState {
    pub fn validate(&self, redshift_count: usize) -> LimberResult<()> {
        if self.hubble_rate.len() != redshift_count
            || self.comoving_distance.len() != redshift_count
        {
            return Err(LimberError::input_validation(
                "INPUT.BACKGROUND_SHAPE",
                format!(
                    "background returned E(z) with {} and chi(z) with {} entries for {} redshifts",
                    self.hubble_rate.len(),
                    self.comoving_distance.len(),
                    redshift_count
                ),
            ));
        }
        if !self.omega_m.is_finite() || !self.chistar.is_finite() || self.chistar <= 0.0 {
            return Err(LimberError::input_validation(
                "INPUT.BACKGROUND_VALUE",
                format!(
                    "background scalars must be finite with chistar > 0, got omega_m={} chistar={}",
                    self.omega_m, self.chistar
                ),
            ));
        }
        let all_finite = self
            .hubble_rate
            .iter()
            .chain(&self.comoving_distance)
            .all(|value| value.is_finite());
        if !all_finite {
            return Err(LimberError::input_validation(
                "INPUT.BACKGROUND_VALUE",
                "background arrays must contain finite values",
            ));
        }
        if let Some(index) = self.comoving_distance.iter().position(|chi| *chi <= 0.0) {
            return Err(LimberError::input_validation(
                "INPUT.BACKGROUND_VALUE",
                format!(
                    "comoving distance must be positive on the grid, index {} has {}",
                    index, self.comoving_distance[index]
                ),
            ));
        }
        Ok(())
    }
}

/// Anything that maps cosmological parameters and a redshift array onto
/// background quantities.
pub trait BackgroundSolver<P>: Send + Sync {
    fn evaluate(&self, params: &P, redshift: &[f64]) -> LimberResult<BackgroundState>;
}

impl<P, F> BackgroundSolver<P> for F
where
    F: Fn(&P, &[f64]) -> LimberResult<BackgroundState> + Send + Sync,
{
    fn evaluate(&self, params: &P, redshift: &[f64]) -> LimberResult<BackgroundState> {
        self(params, redshift)
    }
}

#[cfg(test)]
mod tests {
    use super::{BackgroundSolver, BackgroundState};
    use crate::domain::LimberResult;

    fn constant_background(omega_m: &f64, redshift: &[f64]) -> LimberResult<BackgroundState> {
        Ok(BackgroundState {
            omega_m: *omega_m,
            chistar: 10_000.0,
            hubble_rate: vec![1.0; redshift.len()],
            comoving_distance: redshift.iter().map(|z| 3000.0 * z).collect(),
        })
    }

    #[test]
    fn closures_and_functions_act_as_solvers() {
        let solver: &dyn BackgroundSolver<f64> = &constant_background;
        let state = solver.evaluate(&0.3, &[0.1, 0.2]).expect("state");
        assert_eq!(state.omega_m, 0.3);
        assert_eq!(state.comoving_distance, vec![300.0, 600.0]);
        assert!(state.validate(2).is_ok());
    }

    #[test]
    fn validation_rejects_shape_and_value_problems() {
        let mut state = constant_background(&0.3, &[0.1, 0.2]).expect("state");
        assert_eq!(
            state.validate(3).expect_err("shape").placeholder(),
            "INPUT.BACKGROUND_SHAPE"
        );

        state.comoving_distance[0] = 0.0;
        assert_eq!(
            state.validate(2).expect_err("zero distance").placeholder(),
            "INPUT.BACKGROUND_VALUE"
        );

        state.comoving_distance[0] = 300.0;
        state.chistar = f64::NAN;
        assert!(state.validate(2).is_err());
    }
}
