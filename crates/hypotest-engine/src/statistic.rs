//! Test statistics.
//!
//! Every statistic is a single-threaded reduction over values the engine
//! already computed, or over cached table totals. Summation order affects
//! rounding only; compare results with a relative tolerance.

use hypotest_stats::descriptive::DescriptiveStats;

use crate::{
    distribution::ReferenceDistribution,
    error::{EngineError, Location},
    expected::ExpectedProfile,
    table::{ContingencyTable, FrequencyTable, GroupedSamples},
};

/// A computed test statistic and the distribution it is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TestStatistic {
    pub value: f64,
    pub reference: ReferenceDistribution,
}

impl TestStatistic {
    /// Chi-square goodness-of-fit statistic
    /// `K = sum (o_i - p_i N)^2 / (N p_i)` with `buckets - 1` degrees of freedom.
    ///
    /// `expected` must hold one probability per bucket of `table`; a profile of
    /// any other length is a [`EngineError::Shape`] error.
    #[expect(clippy::cast_precision_loss)]
    pub fn goodness_of_fit(
        table: &FrequencyTable,
        expected: &ExpectedProfile,
    ) -> Result<Self, EngineError> {
        let buckets = table.rows().len();
        if expected.len() != buckets {
            return Err(EngineError::Shape {
                row: buckets.min(expected.len()),
                expected: buckets,
                found: expected.len(),
            });
        }
        if buckets < 2 {
            return Err(EngineError::degenerate(
                Location::Input,
                "at least two buckets are required",
            ));
        }
        let n = table.total();
        if n <= 0.0 {
            return Err(EngineError::degenerate(
                Location::Input,
                "observed counts sum to zero",
            ));
        }

        let mut value = 0.0;
        for (index, (row, p)) in table.rows().iter().zip(expected.iter()).enumerate() {
            if p <= 0.0 {
                return Err(EngineError::degenerate(
                    Location::Bucket {
                        index,
                        label: row.label.clone(),
                    },
                    format!("expected probability is {p}"),
                ));
            }
            value += (row.observed - p * n).powi(2) / (n * p);
        }

        Ok(Self {
            value,
            reference: ReferenceDistribution::ChiSquared {
                freedom: (buckets - 1) as f64,
            },
        })
    }

    /// Chi-square independence statistic in closed form,
    /// `K = sum N (o_ij - r_i c_j / N)^2 / (r_i c_j)`, with
    /// `(rows - 1)(cols - 1)` degrees of freedom.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::{statistic::TestStatistic, table::ContingencyTable};
    ///
    /// let table = ContingencyTable::from_rows(vec![vec![10.0, 20.0], vec![30.0, 40.0]]).unwrap();
    /// let statistic = TestStatistic::independence(&table).unwrap();
    /// assert!((statistic.value - 200.0 / 252.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn independence(table: &ContingencyTable) -> Result<Self, EngineError> {
        table.ensure_testable()?;
        let n = table.grand_total();
        let mut value = 0.0;
        for (i, &r) in table.row_totals().iter().enumerate() {
            for (j, &c) in table.col_totals().iter().enumerate() {
                let rc = r * c;
                value += n * (table.cell(i, j) - rc / n).powi(2) / rc;
            }
        }
        Ok(Self {
            value,
            reference: ReferenceDistribution::ChiSquared {
                freedom: ((table.rows() - 1) * (table.cols() - 1)) as f64,
            },
        })
    }
}

/// One-way analysis of variance of several groups.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MeanComparison {
    /// `F = S1^2 / S2^2` with `(groups - 1, total - groups)` degrees of freedom.
    pub statistic: TestStatistic,
    /// Between-group variance `S1^2`.
    pub between_variance: f64,
    /// Pooled within-group variance `S2^2`.
    pub within_variance: f64,
    /// Per-group summaries, in input order.
    pub groups: Vec<DescriptiveStats>,
}

impl MeanComparison {
    /// Computes the F statistic.
    ///
    /// `S1^2 = sum n_i (mean_i - mean)^2 / (k - 1)` and
    /// `S2^2 = sum (n_i - 1) var_i / (T - k)` where `var_i` is the
    /// Bessel-corrected variance of group `i`, `k` the number of groups and
    /// `T` the total number of observations.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::{statistic::MeanComparison, table::GroupedSamples};
    ///
    /// let samples = GroupedSamples::new(vec![
    ///     vec![1.0, 2.0, 3.0],
    ///     vec![4.0, 5.0, 6.0],
    ///     vec![7.0, 8.0, 9.0],
    /// ])
    /// .unwrap();
    /// let comparison = MeanComparison::from_samples(&samples).unwrap();
    /// assert!((comparison.statistic.value - 27.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn from_samples(samples: &GroupedSamples) -> Result<Self, EngineError> {
        samples.ensure_testable()?;

        let mut groups = Vec::with_capacity(samples.groups().len());
        for (index, group) in samples.groups().iter().enumerate() {
            let stats = DescriptiveStats::new(group.iter().copied()).ok_or_else(|| {
                EngineError::degenerate(Location::Group { index }, "group is empty")
            })?;
            groups.push(stats);
        }

        let k = groups.len() as f64;
        let total = samples.total_count() as f64;
        let grand_mean = groups
            .iter()
            .map(|g| g.count as f64 * g.mean)
            .sum::<f64>()
            / total;

        let between_variance = groups
            .iter()
            .map(|g| g.count as f64 * (g.mean - grand_mean).powi(2))
            .sum::<f64>()
            / (k - 1.0);
        let within_variance = groups
            .iter()
            .map(|g| (g.count as f64 - 1.0) * g.sample_variance.unwrap_or(0.0))
            .sum::<f64>()
            / (total - k);

        if within_variance <= 0.0 {
            return Err(EngineError::degenerate(
                Location::Input,
                "within-group variance is zero",
            ));
        }

        Ok(Self {
            statistic: TestStatistic {
                value: between_variance / within_variance,
                reference: ReferenceDistribution::F {
                    numerator: k - 1.0,
                    denominator: total - k,
                },
            },
            between_variance,
            within_variance,
            groups,
        })
    }
}
