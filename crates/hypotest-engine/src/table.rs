//! Input tables of the three tests.
//!
//! Tables are built once from rows of string fields and are read-only
//! afterwards. Derived totals are computed at construction so the parallel
//! phase of the engine only reads them.

use crate::{
    bucket::{self, Bucket},
    error::{EngineError, Location, ParseError},
};

/// One row of a goodness-of-fit frequency table.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRow {
    /// The label as written in the input.
    pub label: String,
    pub bucket: Bucket,
    /// Observed count, finite and non-negative.
    pub observed: f64,
}

/// Observed counts per bucket, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    rows: Vec<FrequencyRow>,
    total: f64,
}

impl FrequencyTable {
    /// Creates a table, checking that every observed count is finite and
    /// non-negative.
    pub fn new(rows: Vec<FrequencyRow>) -> Result<Self, EngineError> {
        for (index, row) in rows.iter().enumerate() {
            if !row.observed.is_finite() || row.observed < 0.0 {
                return Err(EngineError::Parse {
                    row: index,
                    text: row.observed.to_string(),
                    source: ParseError::NegativeCount,
                });
            }
        }
        let total = rows.iter().map(|row| row.observed).sum();
        Ok(Self { rows, total })
    }

    /// Reads rows whose field 0 is a bucket label and field 1 the observed
    /// count. Further fields are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::{bucket::Bucket, table::FrequencyTable};
    ///
    /// let table = FrequencyTable::from_records(&[["<10", "5"], ["10-30", "20"]]).unwrap();
    /// assert_eq!(table.total(), 25.0);
    /// assert_eq!(table.rows()[1].bucket, Bucket::ClosedRange { lo: 10.0, hi: 30.0 });
    /// ```
    pub fn from_records<R, S>(records: &[R]) -> Result<Self, EngineError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let rows = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let fields = record.as_ref();
                let [label, observed, ..] = fields else {
                    return Err(EngineError::Shape {
                        row: index,
                        expected: 2,
                        found: fields.len(),
                    });
                };
                let label = label.as_ref().trim();
                let bucket = Bucket::parse(label).map_err(|source| EngineError::Parse {
                    row: index,
                    text: label.to_owned(),
                    source,
                })?;
                let observed = parse_count(index, observed.as_ref())?;
                Ok(FrequencyRow {
                    label: label.to_owned(),
                    bucket,
                    observed,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rows)
    }

    #[must_use]
    pub fn rows(&self) -> &[FrequencyRow] {
        &self.rows
    }

    /// Returns the sum of all observed counts (`N`).
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }
}

/// A two-way table of observed counts with cached marginal totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    rows: usize,
    cols: usize,
    /// Row-major cells.
    cells: Vec<f64>,
    row_totals: Vec<f64>,
    col_totals: Vec<f64>,
    grand_total: f64,
}

impl ContingencyTable {
    /// Creates a table from rows of counts.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::table::ContingencyTable;
    ///
    /// let table = ContingencyTable::from_rows(vec![vec![10.0, 20.0], vec![30.0, 40.0]]).unwrap();
    /// assert_eq!(table.row_totals(), &[30.0, 70.0]);
    /// assert_eq!(table.col_totals(), &[40.0, 60.0]);
    /// assert_eq!(table.grand_total(), 100.0);
    /// ```
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, EngineError> {
        let cols = rows.first().map_or(0, Vec::len);
        if cols == 0 {
            return Err(EngineError::degenerate(Location::Input, "table is empty"));
        }

        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(EngineError::Shape {
                    row: index,
                    expected: cols,
                    found: row.len(),
                });
            }
            if let Some(bad) = row.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(EngineError::Parse {
                    row: index,
                    text: bad.to_string(),
                    source: ParseError::NegativeCount,
                });
            }
            cells.extend_from_slice(row);
        }

        let row_totals = cells
            .chunks(cols)
            .map(|row| row.iter().sum())
            .collect::<Vec<f64>>();
        let col_totals = (0..cols)
            .map(|j| cells.iter().skip(j).step_by(cols).sum())
            .collect::<Vec<f64>>();
        let grand_total = row_totals.iter().sum();

        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
            row_totals,
            col_totals,
            grand_total,
        })
    }

    /// Reads rows of numeric cells. With `label_column`, field 0 of every row
    /// is a category label and is skipped.
    pub fn from_records<R, S>(records: &[R], label_column: bool) -> Result<Self, EngineError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let skip = usize::from(label_column);
        let rows = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .as_ref()
                    .iter()
                    .skip(skip)
                    .map(|field| parse_count(index, field.as_ref()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(rows)
    }

    /// Checks that the table can be tested for independence: at least two
    /// rows and columns, and no category without observations.
    pub fn ensure_testable(&self) -> Result<(), EngineError> {
        if self.rows < 2 {
            return Err(EngineError::degenerate(
                Location::Input,
                "at least two rows are required",
            ));
        }
        if self.cols < 2 {
            return Err(EngineError::degenerate(
                Location::Input,
                "at least two columns are required",
            ));
        }
        if let Some(index) = self.row_totals.iter().position(|t| *t <= 0.0) {
            return Err(EngineError::degenerate(
                Location::Row { index },
                "row has no observations",
            ));
        }
        if let Some(index) = self.col_totals.iter().position(|t| *t <= 0.0) {
            return Err(EngineError::degenerate(
                Location::Column { index },
                "column has no observations",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns all cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    #[must_use]
    pub fn row_totals(&self) -> &[f64] {
        &self.row_totals
    }

    #[must_use]
    pub fn col_totals(&self) -> &[f64] {
        &self.col_totals
    }

    #[must_use]
    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }
}

/// Observations of several groups for the mean comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSamples {
    groups: Vec<Vec<f64>>,
}

impl GroupedSamples {
    pub fn new(groups: Vec<Vec<f64>>) -> Result<Self, EngineError> {
        for (index, group) in groups.iter().enumerate() {
            if let Some(bad) = group.iter().find(|v| !v.is_finite()) {
                return Err(EngineError::Parse {
                    row: index,
                    text: bad.to_string(),
                    source: ParseError::NotNumeric,
                });
            }
        }
        Ok(Self { groups })
    }

    /// Reads one group per record; every field is an observation.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::table::GroupedSamples;
    ///
    /// let samples = GroupedSamples::from_records(&[vec!["1", " 2", "3"], vec!["4", "5"]]).unwrap();
    /// assert_eq!(samples.groups()[0], vec![1.0, 2.0, 3.0]);
    /// assert_eq!(samples.total_count(), 5);
    /// ```
    pub fn from_records<R, S>(records: &[R]) -> Result<Self, EngineError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let groups = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .as_ref()
                    .iter()
                    .map(|field| {
                        let text = field.as_ref();
                        bucket::parse_number(text).map_err(|source| EngineError::Parse {
                            row: index,
                            text: text.to_owned(),
                            source,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(groups)
    }

    /// Checks that there are at least two groups and that every group has at
    /// least two observations.
    pub fn ensure_testable(&self) -> Result<(), EngineError> {
        if self.groups.len() < 2 {
            return Err(EngineError::degenerate(
                Location::Input,
                "at least two groups are required",
            ));
        }
        if let Some(index) = self.groups.iter().position(|g| g.len() < 2) {
            return Err(EngineError::degenerate(
                Location::Group { index },
                "fewer than two observations",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn groups(&self) -> &[Vec<f64>] {
        &self.groups
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

fn parse_count(row: usize, text: &str) -> Result<f64, EngineError> {
    let parse_error = |source| EngineError::Parse {
        row,
        text: text.trim().to_owned(),
        source,
    };
    let value = bucket::parse_number(text).map_err(parse_error)?;
    if value < 0.0 {
        return Err(parse_error(ParseError::NegativeCount));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_table_reports_bad_row() {
        let err = FrequencyTable::from_records(&[["<10", "5"], ["1-2-3", "4"]]).unwrap_err();
        let EngineError::Parse { row, text, source } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(row, 1);
        assert_eq!(text, "1-2-3");
        assert_eq!(source, ParseError::MultipleDelimiters);
    }

    #[test]
    fn test_frequency_table_rejects_bad_counts() {
        let err = FrequencyTable::from_records(&[["<10", "x"]]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Parse {
                source: ParseError::NotNumeric,
                ..
            }
        ));
        let err = FrequencyTable::from_records(&[["<10", "-1"]]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Parse {
                source: ParseError::NegativeCount,
                ..
            }
        ));
    }

    #[test]
    fn test_frequency_table_missing_field() {
        let err = FrequencyTable::from_records(&[vec!["<10"]]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Shape {
                row: 0,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_contingency_totals() {
        let table =
            ContingencyTable::from_records(&[["a", "1", "2", "3"], ["b", "4", "5", "6"]], true)
                .unwrap();
        assert_eq!(table.rows(), 2);
        assert_eq!(table.cols(), 3);
        assert_eq!(table.row_totals(), &[6.0, 15.0]);
        assert_eq!(table.col_totals(), &[5.0, 7.0, 9.0]);
        assert_eq!(table.grand_total(), 21.0);
        assert_eq!(table.cell(1, 2), 6.0);
    }

    #[test]
    fn test_contingency_ragged_rows() {
        let err = ContingencyTable::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Shape {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_contingency_zero_category_is_degenerate() {
        let table = ContingencyTable::from_rows(vec![vec![1.0, 0.0], vec![3.0, 0.0]]).unwrap();
        let err = table.ensure_testable().unwrap_err();
        assert!(matches!(
            err,
            EngineError::DegenerateInput {
                location: Location::Column { index: 1 },
                ..
            }
        ));
    }

    #[test]
    fn test_contingency_single_row_is_degenerate() {
        let table = ContingencyTable::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        assert!(table.ensure_testable().unwrap_err().is_degenerate_input());
    }

    #[test]
    fn test_groups_require_two_observations() {
        let samples = GroupedSamples::from_records(&[vec!["1", "2"], vec!["3"]]).unwrap();
        let err = samples.ensure_testable().unwrap_err();
        assert!(matches!(
            err,
            EngineError::DegenerateInput {
                location: Location::Group { index: 1 },
                ..
            }
        ));
    }

    #[test]
    fn test_groups_reject_non_numeric() {
        let err = GroupedSamples::from_records(&[vec!["1", "two"]]).unwrap_err();
        assert!(matches!(err, EngineError::Parse { row: 0, .. }));
    }
}
