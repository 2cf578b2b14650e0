pub mod quadrature;
pub mod spline;

pub use quadrature::{reverse_cumulative_sum, simpson, trapezoid, QuadratureError};
pub use spline::{CubicSpline, Extrapolation, SplineError};

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linear_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    if count < 2 {
        return None;
    }

    let step = (end - start) / ((count - 1) as f64);
    let mut grid = Vec::with_capacity(count);
    for index in 0..count {
        grid.push(start + step * (index as f64));
    }

    if let Some(last) = grid.last_mut() {
        *last = end;
    }

    Some(grid)
}

/// `count` values evenly spaced in `log10` between `start` and `end`, both
/// of which must be strictly positive.
pub fn log_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    if start <= 0.0 || end <= 0.0 || !start.is_finite() || !end.is_finite() {
        return None;
    }

    let exponents = linear_grid(start.log10(), end.log10(), count)?;
    let mut grid: Vec<f64> = exponents
        .into_iter()
        .map(|exponent| 10f64.powf(exponent))
        .collect();
    grid[0] = start;
    if let Some(last) = grid.last_mut() {
        *last = end;
    }

    Some(grid)
}

#[cfg(test)]
mod tests {
    use super::{linear_grid, log_grid};

    #[test]
    fn linear_grid_is_inclusive_and_rejects_invalid_counts() {
        assert_eq!(linear_grid(0.0, 1.0, 1), None);
        let grid = linear_grid(0.0, 2.0, 5).expect("grid");
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn log_grid_spans_decades_with_exact_endpoints() {
        let grid = log_grid(1.0, 1000.0, 4).expect("grid");
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0], 1.0);
        assert_eq!(grid[3], 1000.0);
        assert!((grid[1] - 10.0).abs() < 1.0e-12);
        assert!((grid[2] - 100.0).abs() < 1.0e-10);
        assert!(grid.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn log_grid_rejects_non_positive_bounds() {
        assert_eq!(log_grid(0.0, 10.0, 8), None);
        assert_eq!(log_grid(1.0, -10.0, 8), None);
    }
}
