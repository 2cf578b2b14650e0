//! Physical constants and engine defaults shared by the kernel builder,
//! the reference background solver and the configuration layer.

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458_f64;
/// Hubble constant in h/Mpc units (`100 km/s/Mpc / c`).
pub const HUBBLE_H_PER_MPC: f64 = 100.0 / SPEED_OF_LIGHT_KM_S;
/// Hubble distance `c / H0` in Mpc/h.
pub const HUBBLE_DISTANCE_MPC_H: f64 = SPEED_OF_LIGHT_KM_S / 100.0;
/// Redshift of the last-scattering surface used by the reference background.
pub const Z_LAST_SCATTERING: f64 = 1_089.92_f64;

pub const DEFAULT_ZMIN: f64 = 0.001;
pub const DEFAULT_ZMAX: f64 = 2.0;
pub const DEFAULT_NZ: usize = 50;
pub const DEFAULT_LMAX: usize = 1000;
pub const DEFAULT_NLVAL: usize = 64;
