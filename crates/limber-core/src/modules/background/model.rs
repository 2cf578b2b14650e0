use super::{BackgroundSolver, BackgroundState};
use crate::common::constants::{HUBBLE_DISTANCE_MPC_H, Z_LAST_SCATTERING};
use crate::domain::{LimberError, LimberResult};
use crate::numerics::{linear_grid, simpson};
use serde::{Deserialize, Serialize};

const DISTANCE_INTERVALS: usize = 2048;

/// Parameter types the reference background can read Ωm from.
pub trait HasMatterDensity {
    fn omega_m(&self) -> f64;
}

impl HasMatterDensity for f64 {
    fn omega_m(&self) -> f64 {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatLcdmParams {
    pub omega_m: f64,
}

impl HasMatterDensity for FlatLcdmParams {
    fn omega_m(&self) -> f64 {
        self.omega_m
    }
}

/// Flat ΛCDM background: `E(z) = sqrt(Ωm (1+z)^3 + 1 - Ωm)` and
/// `chi(z) = (c / H0) ∫_0^z dz' / E(z')` in Mpc/h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatLcdm {
    z_star: f64,
}

impl Default for FlatLcdm {
    fn default() -> Self {
        Self {
            z_star: Z_LAST_SCATTERING,
        }
    }
}

impl FlatLcdm {
    pub fn with_last_scattering(z_star: f64) -> Self {
        Self { z_star }
    }

    pub fn z_star(&self) -> f64 {
        self.z_star
    }

    pub fn hubble_rate(omega_m: f64, z: f64) -> f64 {
        let growth = (1.0 + z).powi(3);
        (omega_m * growth + 1.0 - omega_m).sqrt()
    }

    /// Integrates in `u = ln(1+z)`, where the integrand `(1+z)/E(z)` stays
    /// smooth out to last scattering.
    pub fn comoving_distance(omega_m: f64, z: f64) -> LimberResult<f64> {
        if !z.is_finite() || z < 0.0 {
            return Err(LimberError::input_validation(
                "INPUT.BACKGROUND_REDSHIFT",
                format!("comoving distance needs a finite z >= 0, got {}", z),
            ));
        }
        if z == 0.0 {
            return Ok(0.0);
        }

        let nodes = linear_grid(0.0, z.ln_1p(), DISTANCE_INTERVALS + 1).ok_or_else(|| {
            LimberError::internal("SYS.BACKGROUND_GRID", "distance grid construction failed")
        })?;
        let integrand: Vec<f64> = nodes
            .iter()
            .map(|u| {
                let one_plus_z = u.exp();
                one_plus_z / Self::hubble_rate(omega_m, one_plus_z - 1.0)
            })
            .collect();
        let integral = simpson(&integrand, &nodes).map_err(|error| {
            LimberError::computation("RUN.BACKGROUND_DISTANCE", error.to_string())
        })?;
        Ok(HUBBLE_DISTANCE_MPC_H * integral)
    }
}

impl<P> BackgroundSolver<P> for FlatLcdm
where
    P: HasMatterDensity,
{
    fn evaluate(&self, params: &P, redshift: &[f64]) -> LimberResult<BackgroundState> {
        let omega_m = params.omega_m();
        if !omega_m.is_finite() || !(0.0..=1.0).contains(&omega_m) {
            return Err(LimberError::input_validation(
                "INPUT.BACKGROUND_OMEGA_M",
                format!("flat LCDM needs 0 <= omega_m <= 1, got {}", omega_m),
            ));
        }

        let hubble_rate = redshift
            .iter()
            .map(|z| Self::hubble_rate(omega_m, *z))
            .collect();
        let comoving_distance = redshift
            .iter()
            .map(|z| Self::comoving_distance(omega_m, *z))
            .collect::<LimberResult<Vec<f64>>>()?;
        let chistar = Self::comoving_distance(omega_m, self.z_star)?;

        Ok(BackgroundState {
            omega_m,
            chistar,
            hubble_rate,
            comoving_distance,
        })
    }
}
