//! Bounded-parallel computation of expected values.
//!
//! # Work partitioning
//!
//! One unit of work per frequency row (goodness-of-fit) or per table cell
//! (independence). A unit is a pure function of read-only shared inputs (the
//! rows, the cached totals, the distribution) and writes only its own slot of
//! a pre-sized output vector.
//!
//! # Concurrency
//!
//! The output vector is split into at most `P` disjoint chunks, one scoped
//! worker thread per chunk, where `P` is the engine's parallelism (available
//! hardware parallelism by default). Because every worker owns a disjoint
//! `&mut` slice no lock is involved. The scope joins every worker before the
//! profile is returned, so callers never observe a partially written profile.
//!
//! # Failure
//!
//! A worker stops at its first failing unit. After the barrier the error with
//! the lowest unit index is returned and the partial output is dropped. If the
//! parallelism cannot be determined or a worker cannot be spawned, the
//! computation fails with [`EngineError::ConcurrencyAdmission`] without retry.

use std::{num::NonZeroUsize, panic, thread};

use crate::{
    distribution::Cdf,
    error::{EngineError, Location},
    table::{ContingencyTable, FrequencyTable},
};

/// Expected probabilities or counts, index-aligned with the input rows/cells.
///
/// Produced once by [`ExpectedValueEngine`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ExpectedProfile {
    values: Vec<f64>,
}

impl ExpectedProfile {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Computes expected values with a bounded number of worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedValueEngine {
    parallelism: NonZeroUsize,
}

impl ExpectedValueEngine {
    /// Creates an engine sized to the available hardware parallelism.
    pub fn new() -> Result<Self, EngineError> {
        let parallelism = thread::available_parallelism()
            .map_err(|source| EngineError::ConcurrencyAdmission { source })?;
        Ok(Self { parallelism })
    }

    /// Creates an engine running at most `parallelism` workers.
    #[must_use]
    pub fn with_parallelism(parallelism: NonZeroUsize) -> Self {
        Self { parallelism }
    }

    #[must_use]
    pub fn parallelism(&self) -> NonZeroUsize {
        self.parallelism
    }

    /// Computes the probability `distribution` assigns to every bucket.
    ///
    /// A bucket whose probability is not strictly positive raises
    /// [`EngineError::DegenerateInput`]: its chi-square contribution would be
    /// undefined.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::{
    ///     distribution::Normal, expected::ExpectedValueEngine, table::FrequencyTable,
    /// };
    ///
    /// let table = FrequencyTable::from_records(&[["<0", "7"], [">0", "9"]]).unwrap();
    /// let normal = Normal::new(0.0, 1.0).unwrap();
    /// let engine = ExpectedValueEngine::new().unwrap();
    /// let profile = engine.goodness_of_fit(&table, &normal).unwrap();
    /// assert!((profile.as_slice()[0] - 0.5).abs() < 1e-12);
    /// assert!((profile.sum() - 1.0).abs() < 1e-12);
    /// ```
    pub fn goodness_of_fit<D>(
        &self,
        table: &FrequencyTable,
        distribution: &D,
    ) -> Result<ExpectedProfile, EngineError>
    where
        D: Cdf + Sync + ?Sized,
    {
        let rows = table.rows();
        let values = self.fan_out(rows.len(), |index| {
            let row = &rows[index];
            let probability = row.bucket.probability(distribution);
            if !probability.is_finite() || probability <= 0.0 {
                return Err(EngineError::degenerate(
                    Location::Bucket {
                        index,
                        label: row.label.clone(),
                    },
                    format!("expected probability is {probability}"),
                ));
            }
            Ok(probability)
        })?;
        Ok(ExpectedProfile::new(values))
    }

    /// Computes the expected count `row_total * col_total / grand_total` of
    /// every cell, in row-major order.
    pub fn independence(&self, table: &ContingencyTable) -> Result<ExpectedProfile, EngineError> {
        table.ensure_testable()?;
        let cols = table.cols();
        let row_totals = table.row_totals();
        let col_totals = table.col_totals();
        let grand_total = table.grand_total();
        let values = self.fan_out(table.rows() * cols, |index| {
            let (i, j) = (index / cols, index % cols);
            Ok(row_totals[i] * col_totals[j] / grand_total)
        })?;
        Ok(ExpectedProfile::new(values))
    }

    /// Runs `unit` for every index in `0..len` on at most `parallelism`
    /// workers and collects the results by index.
    fn fan_out<F>(&self, len: usize, unit: F) -> Result<Vec<f64>, EngineError>
    where
        F: Fn(usize) -> Result<f64, EngineError> + Sync,
    {
        let mut slots = vec![0.0; len];
        if len == 0 {
            return Ok(slots);
        }
        let workers = self.parallelism.get().min(len);
        let chunk_len = len.div_ceil(workers);
        tracing::debug!(units = len, workers, chunk_len, "fanning out");

        let unit = &unit;
        thread::scope(|s| -> Result<(), EngineError> {
            let mut handles = Vec::with_capacity(workers);
            for (chunk_index, chunk) in slots.chunks_mut(chunk_len).enumerate() {
                let offset = chunk_index * chunk_len;
                let handle = thread::Builder::new()
                    .name(format!("expected-{chunk_index}"))
                    .spawn_scoped(s, move || {
                        for (i, slot) in chunk.iter_mut().enumerate() {
                            *slot = unit(offset + i)?;
                        }
                        Ok::<(), EngineError>(())
                    })
                    .map_err(|source| EngineError::ConcurrencyAdmission { source })?;
                handles.push(handle);
            }

            // Chunks are joined in index order, so the first error kept is the
            // one with the lowest unit index.
            let mut first_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        first_error.get_or_insert(err);
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            first_error.map_or(Ok(()), Err)
        })?;

        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bucket::Bucket, distribution::Normal, table::FrequencyRow};

    fn engine(parallelism: usize) -> ExpectedValueEngine {
        ExpectedValueEngine::with_parallelism(NonZeroUsize::new(parallelism).unwrap())
    }

    fn table(labels: &[&str]) -> FrequencyTable {
        let records = labels.iter().map(|l| [*l, "1"]).collect::<Vec<_>>();
        FrequencyTable::from_records(&records).unwrap()
    }

    #[test]
    fn test_interval_law() {
        let normal = Normal::new(34.93, 21.82).unwrap();
        let table = table(&["10-30", "30-50", "-20--10"]);
        let profile = engine(2).goodness_of_fit(&table, &normal).unwrap();
        for (row, p) in table.rows().iter().zip(profile.iter()) {
            let Bucket::ClosedRange { lo, hi } = row.bucket else {
                unreachable!()
            };
            let expected = Cdf::cdf(&normal, hi) - Cdf::cdf(&normal, lo);
            assert!((p - expected).abs() < 1e-15);
            assert!(p >= 0.0);
        }
    }

    #[test]
    fn test_partition_conserves_probability() {
        let normal = Normal::new(34.93, 21.82).unwrap();
        let table = table(&["<10", "10-30", "30-50", ">50"]);
        let profile = engine(4).goodness_of_fit(&table, &normal).unwrap();
        assert_eq!(profile.len(), 4);
        assert!((profile.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_independence_counts() {
        let table = ContingencyTable::from_rows(vec![vec![10.0, 20.0], vec![30.0, 40.0]]).unwrap();
        let profile = engine(3).independence(&table).unwrap();
        let expected = [12.0, 18.0, 28.0, 42.0];
        for (actual, expected) in profile.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-12);
        }
        assert!((profile.sum() - table.grand_total()).abs() < 1e-9);
    }

    #[test]
    fn test_independence_conservation_on_larger_table() {
        let rows = (0..7)
            .map(|i| (0..5).map(|j| f64::from(i * 3 + j + 1)).collect())
            .collect();
        let table = ContingencyTable::from_rows(rows).unwrap();
        let profile = engine(4).independence(&table).unwrap();
        assert_eq!(profile.len(), 35);
        assert!((profile.sum() - table.grand_total()).abs() < 1e-9);
    }

    #[test]
    fn test_parallelism_does_not_change_result() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let labels = (0..40)
            .map(|i| format!("{}-{}", f64::from(i) / 10.0 - 2.0, f64::from(i + 1) / 10.0 - 2.0))
            .collect::<Vec<_>>();
        let labels = labels.iter().map(String::as_str).collect::<Vec<_>>();
        let table = table(&labels);
        let serial = engine(1).goodness_of_fit(&table, &normal).unwrap();
        for workers in [2, 3, 8, 64] {
            assert_eq!(
                engine(workers).goodness_of_fit(&table, &normal).unwrap(),
                serial
            );
        }
    }

    #[test]
    fn test_zero_probability_is_degenerate() {
        struct Step;
        impl Cdf for Step {
            fn cdf(&self, x: f64) -> f64 {
                if x < 0.0 { 0.0 } else { 1.0 }
            }
        }
        let table = table(&["<-1", "1-2", ">-1"]);
        let err = engine(2).goodness_of_fit(&table, &Step).unwrap_err();
        let EngineError::DegenerateInput { location, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(
            *location,
            Location::Bucket {
                index: 0,
                label: "<-1".to_owned()
            }
        );
    }

    #[test]
    fn test_first_error_by_index_wins() {
        struct UndefinedTail;
        impl Cdf for UndefinedTail {
            fn cdf(&self, x: f64) -> f64 {
                if x > 100.0 { f64::NAN } else { 0.5 }
            }
        }
        let rows = ["<1", ">200", "<2", "<3", ">300", "<4", ">400", "<5"]
            .iter()
            .map(|label| FrequencyRow {
                label: (*label).to_owned(),
                bucket: label.parse().unwrap(),
                observed: 1.0,
            })
            .collect();
        let table = FrequencyTable::new(rows).unwrap();
        let err = engine(4)
            .goodness_of_fit(&table, &UndefinedTail)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::DegenerateInput {
                location: Location::Bucket { index: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        let table = FrequencyTable::new(vec![]).unwrap();
        let normal = Normal::new(0.0, 1.0).unwrap();
        assert!(engine(2).goodness_of_fit(&table, &normal).unwrap().is_empty());
    }

    #[test]
    fn test_independence_rejects_empty_row() {
        let table = ContingencyTable::from_rows(vec![vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
        assert!(engine(2).independence(&table).unwrap_err().is_degenerate_input());
    }

    #[test]
    fn test_default_engine_uses_available_parallelism() {
        let engine = ExpectedValueEngine::new().unwrap();
        assert_eq!(
            engine.parallelism(),
            thread::available_parallelism().unwrap()
        );
    }
}
