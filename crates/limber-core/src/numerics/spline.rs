//! Interpolating cubic splines with not-a-knot end conditions.
//!
//! With four or more knots this is the classic interpolating cubic spline
//! whose third derivative is continuous across the second and penultimate
//! knots. Three knots give the interpolating parabola and two knots the
//! straight line, so short tables still interpolate.

use serde::{Deserialize, Serialize};

/// Behaviour of [`CubicSpline::evaluate`] outside `[x_first, x_last]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Extrapolation {
    /// Continue the end polynomial piece.
    #[default]
    Extrapolate,
    /// Return zero.
    Zero,
    /// Fail with [`SplineError::OutOfDomain`].
    Raise,
    /// Return the first/last tabulated value.
    Boundary,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplineError {
    #[error("spline requires at least 2 knots, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("spline input length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("spline knot must be finite at index {index}, got {value}")]
    NonFiniteKnot { index: usize, value: f64 },
    #[error("spline value must be finite at index {index}, got {value}")]
    NonFiniteValue { index: usize, value: f64 },
    #[error("spline knots must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingKnots {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("spline query must be finite, got {value}")]
    NonFiniteQuery { value: f64 },
    #[error("spline query {value} lies outside [{lower}, {upper}]")]
    OutOfDomain { value: f64, lower: f64, upper: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    knots: Vec<f64>,
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
    extrapolation: Extrapolation,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64], extrapolation: Extrapolation) -> Result<Self, SplineError> {
        validate_knots(x, y)?;
        let second_derivatives = match x.len() {
            2 => vec![0.0; 2],
            3 => {
                let h0 = x[1] - x[0];
                let h1 = x[2] - x[1];
                let curvature = 2.0 * ((y[2] - y[1]) / h1 - (y[1] - y[0]) / h0) / (h0 + h1);
                vec![curvature; 3]
            }
            _ => not_a_knot_second_derivatives(x, y),
        };

        Ok(Self {
            knots: x.to_vec(),
            values: y.to_vec(),
            second_derivatives,
            extrapolation,
        })
    }

    pub fn evaluate(&self, x: f64) -> Result<f64, SplineError> {
        if !x.is_finite() {
            return Err(SplineError::NonFiniteQuery { value: x });
        }

        let last = self.knots.len() - 1;
        let lower = self.knots[0];
        let upper = self.knots[last];
        if x < lower || x > upper {
            match self.extrapolation {
                Extrapolation::Extrapolate => {}
                Extrapolation::Zero => return Ok(0.0),
                Extrapolation::Raise => {
                    return Err(SplineError::OutOfDomain {
                        value: x,
                        lower,
                        upper,
                    });
                }
                Extrapolation::Boundary => {
                    return Ok(if x < lower {
                        self.values[0]
                    } else {
                        self.values[last]
                    });
                }
            }
        }

        let interval = self
            .knots
            .partition_point(|knot| *knot <= x)
            .saturating_sub(1)
            .min(last - 1);
        Ok(self.evaluate_piece(interval, x))
    }

    pub fn evaluate_many(&self, x: &[f64]) -> Result<Vec<f64>, SplineError> {
        x.iter().map(|value| self.evaluate(*value)).collect()
    }

    fn evaluate_piece(&self, interval: usize, x: f64) -> f64 {
        let x0 = self.knots[interval];
        let x1 = self.knots[interval + 1];
        let y0 = self.values[interval];
        let y1 = self.values[interval + 1];
        let m0 = self.second_derivatives[interval];
        let m1 = self.second_derivatives[interval + 1];
        let h = x1 - x0;
        let right = x1 - x;
        let left = x - x0;

        m0 * right * right * right / (6.0 * h)
            + m1 * left * left * left / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * right
            + (y1 / h - m1 * h / 6.0) * left
    }
}

/// Second derivatives at the knots for `x.len() >= 4`.
///
/// The two not-a-knot rows are folded into the first and last interior
/// equations so the remaining system on `M[1..n-1]` stays tridiagonal.
fn not_a_knot_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let slope: Vec<f64> = y
        .windows(2)
        .zip(&h)
        .map(|(pair, step)| (pair[1] - pair[0]) / step)
        .collect();

    let size = n - 2;
    let mut sub = vec![0.0; size];
    let mut diag = vec![0.0; size];
    let mut sup = vec![0.0; size];
    let mut rhs = vec![0.0; size];
    for row in 0..size {
        let i = row + 1;
        sub[row] = h[i - 1];
        diag[row] = 2.0 * (h[i - 1] + h[i]);
        sup[row] = h[i];
        rhs[row] = 6.0 * (slope[i] - slope[i - 1]);
    }

    // M0 = ((h0 + h1) M1 - h0 M2) / h1
    let (h0, h1) = (h[0], h[1]);
    diag[0] += h0 * (h0 + h1) / h1;
    sup[0] -= h0 * h0 / h1;
    sub[0] = 0.0;

    // M[n-1] = ((a + b) M[n-2] - b M[n-3]) / a
    let (a, b) = (h[n - 3], h[n - 2]);
    diag[size - 1] += b * (a + b) / a;
    sub[size - 1] -= b * b / a;
    sup[size - 1] = 0.0;

    let interior = solve_tridiagonal(&sub, &diag, &sup, &rhs);

    let mut second = vec![0.0; n];
    second[1..n - 1].copy_from_slice(&interior);
    second[0] = ((h0 + h1) * second[1] - h0 * second[2]) / h1;
    second[n - 1] = ((a + b) * second[n - 2] - b * second[n - 3]) / a;
    second
}

/// Thomas algorithm; `sub[0]` and `sup[last]` are ignored.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let size = diag.len();
    let mut upper = vec![0.0; size];
    let mut forward = vec![0.0; size];

    let mut pivot = diag[0];
    upper[0] = sup[0] / pivot;
    forward[0] = rhs[0] / pivot;
    for row in 1..size {
        pivot = diag[row] - sub[row] * upper[row - 1];
        upper[row] = sup[row] / pivot;
        forward[row] = (rhs[row] - sub[row] * forward[row - 1]) / pivot;
    }

    let mut solution = forward;
    for row in (0..size - 1).rev() {
        solution[row] -= upper[row] * solution[row + 1];
    }
    solution
}

fn validate_knots(x: &[f64], y: &[f64]) -> Result<(), SplineError> {
    if x.len() != y.len() {
        return Err(SplineError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(SplineError::InsufficientPoints { actual: x.len() });
    }

    for (index, value) in x.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(SplineError::NonFiniteKnot { index, value });
        }
        if index > 0 && value <= x[index - 1] {
            return Err(SplineError::NonIncreasingKnots {
                index,
                previous: x[index - 1],
                current: value,
            });
        }
    }

    for (index, value) in y.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(SplineError::NonFiniteValue { index, value });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CubicSpline, Extrapolation, SplineError};

    fn cubic(x: f64) -> f64 {
        0.5 * x * x * x - 2.0 * x * x + x - 3.0
    }

    #[test]
    fn not_a_knot_spline_reproduces_cubics_everywhere() {
        let x = [0.0, 0.4, 1.1, 1.5, 2.6, 3.0, 4.2];
        let y: Vec<f64> = x.iter().copied().map(cubic).collect();
        let spline = CubicSpline::new(&x, &y, Extrapolation::Extrapolate).expect("spline");

        for query in [0.0, 0.2, 0.77, 1.5, 2.9, 4.2, -0.5, 5.0] {
            let actual = spline.evaluate(query).expect("evaluate");
            assert!(
                (actual - cubic(query)).abs() < 1.0e-10,
                "query={query} actual={actual} expected={}",
                cubic(query)
            );
        }
    }

    #[test]
    fn four_knot_spline_is_the_interpolating_cubic() {
        let x = [0.0, 1.0, 2.5, 3.0];
        let y: Vec<f64> = x.iter().copied().map(cubic).collect();
        let spline = CubicSpline::new(&x, &y, Extrapolation::Extrapolate).expect("spline");
        assert!((spline.evaluate(1.7).expect("evaluate") - cubic(1.7)).abs() < 1.0e-11);
    }

    #[test]
    fn short_tables_fall_back_to_parabola_and_line() {
        let parabola =
            CubicSpline::new(&[0.0, 1.0, 3.0], &[1.0, 2.0, 10.0], Extrapolation::Extrapolate)
                .expect("parabola");
        // y = x^2 + 1
        assert!((parabola.evaluate(2.0).expect("evaluate") - 5.0).abs() < 1.0e-12);

        let line = CubicSpline::new(&[0.0, 2.0], &[1.0, 5.0], Extrapolation::Extrapolate)
            .expect("line");
        assert!((line.evaluate(0.5).expect("evaluate") - 2.0).abs() < 1.0e-12);
        assert!((line.evaluate(3.0).expect("evaluate") - 7.0).abs() < 1.0e-12);
    }

    #[test]
    fn extrapolation_modes_follow_policy() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];

        let zero = CubicSpline::new(&x, &y, Extrapolation::Zero).expect("spline");
        assert_eq!(zero.evaluate(0.5).expect("evaluate"), 0.0);
        assert_eq!(zero.evaluate(5.5).expect("evaluate"), 0.0);
        assert!((zero.evaluate(5.0).expect("evaluate") - 10.0).abs() < 1.0e-12);

        let boundary = CubicSpline::new(&x, &y, Extrapolation::Boundary).expect("spline");
        assert_eq!(boundary.evaluate(-3.0).expect("evaluate"), 2.0);
        assert_eq!(boundary.evaluate(9.0).expect("evaluate"), 10.0);

        let extrapolate = CubicSpline::new(&x, &y, Extrapolation::Extrapolate).expect("spline");
        assert!((extrapolate.evaluate(6.0).expect("evaluate") - 12.0).abs() < 1.0e-10);

        let raise = CubicSpline::new(&x, &y, Extrapolation::Raise).expect("spline");
        assert_eq!(
            raise.evaluate(6.0),
            Err(SplineError::OutOfDomain {
                value: 6.0,
                lower: 1.0,
                upper: 5.0,
            })
        );
    }

    #[test]
    fn construction_rejects_invalid_knots() {
        assert_eq!(
            CubicSpline::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0], Extrapolation::Zero),
            Err(SplineError::NonIncreasingKnots {
                index: 2,
                previous: 1.0,
                current: 1.0,
            })
        );
        assert_eq!(
            CubicSpline::new(&[0.0], &[0.0], Extrapolation::Zero),
            Err(SplineError::InsufficientPoints { actual: 1 })
        );
        assert!(matches!(
            CubicSpline::new(&[0.0, 1.0], &[0.0, f64::NAN], Extrapolation::Zero),
            Err(SplineError::NonFiniteValue { index: 1, .. })
        ));
    }
}
