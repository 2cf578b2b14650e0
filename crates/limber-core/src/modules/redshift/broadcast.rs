use crate::domain::{LimberError, LimberResult};
use faer::Mat;

/// A quantity that is either constant, depends only on the galaxy sample, or
/// depends only on redshift. [`GridInput::broadcast`] expands it onto the
/// `(nz, ng)` shape used for per-sample redshift tables.
#[derive(Debug, Clone, PartialEq)]
pub enum GridInput {
    Scalar(f64),
    PerSample(Vec<f64>),
    PerRedshift(Vec<f64>),
}

impl GridInput {
    /// Classifies an untagged array by its length.
    ///
    /// When the sample count equals the redshift-node count the length alone
    /// cannot decide the axis, and the caller has to build the variant
    /// explicitly.
    pub fn from_len_inferred(
        values: Vec<f64>,
        redshift_count: usize,
        sample_count: usize,
    ) -> LimberResult<Self> {
        let len = values.len();
        if len == sample_count && len == redshift_count {
            return Err(LimberError::input_validation(
                "INPUT.BROADCAST_AMBIGUOUS",
                format!(
                    "input of length {} matches both the sample count and the redshift grid size; tag it as per-sample or per-redshift",
                    len
                ),
            ));
        }
        if len == sample_count {
            return Ok(Self::PerSample(values));
        }
        if len == redshift_count {
            return Ok(Self::PerRedshift(values));
        }
        Err(shape_error(len, redshift_count, sample_count))
    }

    pub fn broadcast(&self, redshift_count: usize, sample_count: usize) -> LimberResult<Mat<f64>> {
        let mut grid = Mat::<f64>::zeros(redshift_count, sample_count);
        match self {
            Self::Scalar(value) => {
                for row in 0..redshift_count {
                    for col in 0..sample_count {
                        grid[(row, col)] = *value;
                    }
                }
            }
            Self::PerSample(values) => {
                if values.len() != sample_count {
                    return Err(shape_error(values.len(), redshift_count, sample_count));
                }
                for row in 0..redshift_count {
                    for (col, value) in values.iter().enumerate() {
                        grid[(row, col)] = *value;
                    }
                }
            }
            Self::PerRedshift(values) => {
                if values.len() != redshift_count {
                    return Err(shape_error(values.len(), redshift_count, sample_count));
                }
                for (row, value) in values.iter().enumerate() {
                    for col in 0..sample_count {
                        grid[(row, col)] = *value;
                    }
                }
            }
        }
        Ok(grid)
    }
}

fn shape_error(len: usize, redshift_count: usize, sample_count: usize) -> LimberError {
    LimberError::input_validation(
        "INPUT.BROADCAST_SHAPE",
        format!(
            "input length {} matches neither the sample count ({}) nor the redshift grid size ({})",
            len, sample_count, redshift_count
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::GridInput;

    #[test]
    fn scalar_fills_every_cell() {
        let grid = GridInput::Scalar(2.5).broadcast(3, 2).expect("broadcast");
        assert_eq!(grid.nrows(), 3);
        assert_eq!(grid.ncols(), 2);
        for row in 0..3 {
            for col in 0..2 {
                assert_eq!(grid[(row, col)], 2.5);
            }
        }
    }

    #[test]
    fn per_sample_repeats_down_redshift_and_per_redshift_across_samples() {
        let per_sample = GridInput::PerSample(vec![1.0, 2.0]).broadcast(3, 2).expect("broadcast");
        assert_eq!(per_sample[(0, 1)], 2.0);
        assert_eq!(per_sample[(2, 0)], 1.0);

        let per_redshift = GridInput::PerRedshift(vec![1.0, 2.0, 3.0])
            .broadcast(3, 2)
            .expect("broadcast");
        assert_eq!(per_redshift[(2, 0)], 3.0);
        assert_eq!(per_redshift[(2, 1)], 3.0);
        assert_eq!(per_redshift[(0, 1)], 1.0);
    }

    #[test]
    fn inference_picks_axis_by_length() {
        assert_eq!(
            GridInput::from_len_inferred(vec![1.0, 2.0], 5, 2).expect("per sample"),
            GridInput::PerSample(vec![1.0, 2.0])
        );
        assert_eq!(
            GridInput::from_len_inferred(vec![0.0; 5], 5, 2).expect("per redshift"),
            GridInput::PerRedshift(vec![0.0; 5])
        );
    }

    #[test]
    fn inference_refuses_ambiguous_and_mismatched_lengths() {
        let ambiguous = GridInput::from_len_inferred(vec![0.0; 4], 4, 4).expect_err("ambiguous");
        assert_eq!(ambiguous.placeholder(), "INPUT.BROADCAST_AMBIGUOUS");

        let mismatched = GridInput::from_len_inferred(vec![0.0; 3], 5, 2).expect_err("mismatch");
        assert_eq!(mismatched.placeholder(), "INPUT.BROADCAST_SHAPE");

        let tagged = GridInput::PerSample(vec![0.0; 3]).broadcast(5, 2).expect_err("mismatch");
        assert_eq!(tagged.placeholder(), "INPUT.BROADCAST_SHAPE");
    }
}
