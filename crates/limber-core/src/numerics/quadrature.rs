//! Fixed-rule quadratures over tabulated samples.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuadratureError {
    #[error("quadrature requires at least 2 samples, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("quadrature input length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error(
        "abscissa must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasingAbscissa {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// Composite trapezoid rule on arbitrary (possibly non-uniform) abscissae.
pub fn trapezoid(y: &[f64], x: &[f64]) -> Result<f64, QuadratureError> {
    validate_shape(y, x)?;
    Ok(x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum())
}

/// Composite Simpson rule on strictly increasing, possibly irregular
/// abscissae.
///
/// Pairs of intervals use the irregular three-point parabola. With an even
/// sample count the final interval is closed with Cartwright's three-point
/// correction instead of averaging two half-rules. Two samples degrade to the
/// trapezoid rule.
pub fn simpson(y: &[f64], x: &[f64]) -> Result<f64, QuadratureError> {
    validate_shape(y, x)?;
    validate_increasing(x)?;

    let count = x.len();
    if count == 2 {
        return trapezoid(y, x);
    }

    let simpson_end = if count % 2 == 1 { count } else { count - 1 };
    let mut integral = 0.0;
    let mut start = 0;
    while start + 2 < simpson_end {
        integral += parabola_segment(
            x[start + 1] - x[start],
            x[start + 2] - x[start + 1],
            y[start],
            y[start + 1],
            y[start + 2],
        );
        start += 2;
    }

    if count % 2 == 0 {
        let h0 = x[count - 2] - x[count - 3];
        let h1 = x[count - 1] - x[count - 2];
        let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
        let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
        let eta = h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));
        integral += alpha * y[count - 1] + beta * y[count - 2] - eta * y[count - 3];
    }

    Ok(integral)
}

/// Approximates `∫_{x_i}^{x_max} f dx` at every node with a right-anchored
/// cumulative sum times the constant step, i.e.
/// `out[i] = step * Σ_{j >= i} values[j]`.
pub fn reverse_cumulative_sum(values: &[f64], step: f64) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    let mut running = 0.0;
    for (index, value) in values.iter().enumerate().rev() {
        running += value;
        out[index] = running * step;
    }
    out
}

fn parabola_segment(h0: f64, h1: f64, y0: f64, y1: f64, y2: f64) -> f64 {
    let hsum = h0 + h1;
    let hprod = h0 * h1;
    hsum / 6.0 * (y0 * (2.0 - h1 / h0) + y1 * (hsum * hsum / hprod) + y2 * (2.0 - h0 / h1))
}

fn validate_shape(y: &[f64], x: &[f64]) -> Result<(), QuadratureError> {
    if x.len() != y.len() {
        return Err(QuadratureError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(QuadratureError::InsufficientPoints { actual: x.len() });
    }
    Ok(())
}

fn validate_increasing(x: &[f64]) -> Result<(), QuadratureError> {
    for (index, pair) in x.windows(2).enumerate() {
        if pair[1] <= pair[0] || pair[1].is_nan() || pair[0].is_nan() {
            return Err(QuadratureError::NonIncreasingAbscissa {
                index: index + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}
