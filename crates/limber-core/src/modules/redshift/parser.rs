use crate::domain::{LimberError, LimberResult, ParserResult};
use std::fs;
use std::path::Path;

/// Raw redshift-distribution table: a redshift column and one un-normalized
/// density column per galaxy sample.
#[derive(Debug, Clone, PartialEq)]
pub struct DndzTable {
    redshift: Vec<f64>,
    densities: Vec<Vec<f64>>,
}

impl DndzTable {
    /// Builds a table from rows of `[z, n_0(z), n_1(z), ...]`.
    pub fn from_rows(rows: &[Vec<f64>]) -> LimberResult<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width < 2 {
            return Err(LimberError::input_validation(
                "INPUT.DNDZ_COLUMNS",
                format!(
                    "redshift distribution needs a redshift column and at least one sample column, got {} column(s)",
                    width
                ),
            ));
        }

        let sample_count = width - 1;
        let mut redshift = Vec::with_capacity(rows.len());
        let mut densities = vec![Vec::with_capacity(rows.len()); sample_count];
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(LimberError::input_validation(
                    "INPUT.DNDZ_SHAPE",
                    format!(
                        "redshift distribution row {} has {} column(s), expected {}",
                        row_index,
                        row.len(),
                        width
                    ),
                ));
            }
            redshift.push(row[0]);
            for (sample, value) in row[1..].iter().enumerate() {
                densities[sample].push(*value);
            }
        }

        Self::from_columns(redshift, densities)
    }

    pub fn from_columns(redshift: Vec<f64>, densities: Vec<Vec<f64>>) -> LimberResult<Self> {
        if densities.is_empty() {
            return Err(LimberError::input_validation(
                "INPUT.DNDZ_COLUMNS",
                "redshift distribution needs at least one sample column",
            ));
        }
        if redshift.len() < 2 {
            return Err(LimberError::input_validation(
                "INPUT.DNDZ_SHAPE",
                format!(
                    "redshift distribution needs at least 2 rows, got {}",
                    redshift.len()
                ),
            ));
        }

        for (index, pair) in redshift.windows(2).enumerate() {
            if !pair[0].is_finite() || !pair[1].is_finite() || pair[1] <= pair[0] {
                return Err(LimberError::input_validation(
                    "INPUT.DNDZ_REDSHIFT",
                    format!(
                        "redshift column must be finite and strictly increasing, row {} has {} after {}",
                        index + 1,
                        pair[1],
                        pair[0]
                    ),
                ));
            }
        }

        for (sample, column) in densities.iter().enumerate() {
            if column.len() != redshift.len() {
                return Err(LimberError::input_validation(
                    "INPUT.DNDZ_SHAPE",
                    format!(
                        "sample {} has {} value(s) for {} redshift(s)",
                        sample,
                        column.len(),
                        redshift.len()
                    ),
                ));
            }
            if let Some(row) = column.iter().position(|value| !value.is_finite()) {
                return Err(LimberError::input_validation(
                    "INPUT.DNDZ_VALUE",
                    format!("sample {} has a non-finite density at row {}", sample, row),
                ));
            }
        }

        Ok(Self {
            redshift,
            densities,
        })
    }

    /// Parses whitespace-delimited text. Blank lines and `#` comments are
    /// skipped.
    pub fn parse(source: &str) -> ParserResult<Self> {
        let mut rows = Vec::new();
        for (line_index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let row = trimmed
                .split_whitespace()
                .map(|token| {
                    token.parse::<f64>().map_err(|_| {
                        LimberError::input_validation(
                            "INPUT.DNDZ_PARSE",
                            format!(
                                "invalid numeric token '{}' at line {}",
                                token,
                                line_index + 1
                            ),
                        )
                    })
                })
                .collect::<ParserResult<Vec<f64>>>()?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(LimberError::input_validation(
                "INPUT.DNDZ_PARSE",
                "redshift distribution source contains no data rows",
            ));
        }

        Self::from_rows(&rows)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ParserResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| {
            LimberError::io_system(
                "IO.DNDZ_READ",
                format!(
                    "failed to read redshift distribution '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
        Self::parse(&source)
    }

    pub fn sample_count(&self) -> usize {
        self.densities.len()
    }

    pub fn redshift(&self) -> &[f64] {
        &self.redshift
    }

    pub fn density(&self, sample: usize) -> Option<&[f64]> {
        self.densities.get(sample).map(Vec::as_slice)
    }
}
