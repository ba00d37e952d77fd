//! End-to-end test runs.
//!
//! A run moves through [`Stage::Parse`], [`Stage::ExpectedValues`],
//! [`Stage::Statistic`], [`Stage::CriticalValue`] and [`Stage::Decision`] in
//! that order. The first failing stage ends the run; the returned
//! [`RunError`] names it. Nothing computed by earlier stages is reported on
//! failure.

use hypotest_stats::descriptive::DescriptiveStats;

use crate::{
    distribution::Cdf,
    error::{EngineError, Location},
    expected::ExpectedValueEngine,
    significance::Significance,
    statistic::{MeanComparison, TestStatistic},
    table::{ContingencyTable, FrequencyTable, GroupedSamples},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    #[display("parse")]
    Parse,
    #[display("expected-values")]
    ExpectedValues,
    #[display("statistic")]
    Statistic,
    #[display("critical-value")]
    CriticalValue,
    #[display("decision")]
    Decision,
}

/// A failed run, tagged with the stage that failed.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("{stage} stage failed: {source}")]
pub struct RunError {
    pub stage: Stage,
    pub source: EngineError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    #[display("goodness-of-fit")]
    GoodnessOfFit,
    #[display("independence")]
    Independence,
    #[display("compare-means")]
    MeanComparison,
}

/// Outcome of an upper-tailed test.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Decision {
    pub statistic: f64,
    pub critical_value: f64,
    /// `true` when the null hypothesis is rejected.
    pub reject: bool,
}

impl Decision {
    /// Rejects iff `statistic > critical_value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::runner::Decision;
    ///
    /// assert!(Decision::new(5.0, 3.84).reject);
    /// assert!(!Decision::new(3.84, 3.84).reject);
    /// ```
    #[must_use]
    pub fn new(statistic: f64, critical_value: f64) -> Self {
        Self {
            statistic,
            critical_value,
            reject: statistic > critical_value,
        }
    }
}

/// Expected value of one goodness-of-fit bucket.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BucketExpectation {
    pub label: String,
    pub observed: f64,
    pub probability: f64,
    /// `probability * N`.
    pub expected: f64,
}

/// Test-specific intermediate results.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ReportDetails {
    GoodnessOfFit {
        total: f64,
        buckets: Vec<BucketExpectation>,
    },
    Independence {
        row_totals: Vec<f64>,
        col_totals: Vec<f64>,
        grand_total: f64,
        /// Expected counts, one row per table row.
        expected: Vec<Vec<f64>>,
    },
    MeanComparison {
        between_variance: f64,
        within_variance: f64,
        groups: Vec<DescriptiveStats>,
    },
}

/// Everything a successful run produces.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TestReport {
    pub test: TestKind,
    pub alpha: Significance,
    pub statistic: TestStatistic,
    pub decision: Decision,
    pub details: ReportDetails,
}

/// Runs the three tests with a shared engine and significance level.
#[derive(Debug, Clone, Copy)]
pub struct HypothesisTestRunner {
    engine: ExpectedValueEngine,
    significance: Significance,
}

impl HypothesisTestRunner {
    #[must_use]
    pub fn new(engine: ExpectedValueEngine, significance: Significance) -> Self {
        Self {
            engine,
            significance,
        }
    }

    #[must_use]
    pub fn engine(&self) -> ExpectedValueEngine {
        self.engine
    }

    #[must_use]
    pub fn significance(&self) -> Significance {
        self.significance
    }

    /// Tests whether the frequency table in `records` fits `distribution`.
    ///
    /// Field 0 of each record is a bucket label, field 1 its observed count.
    /// The statistic has `buckets - 1` degrees of freedom.
    pub fn goodness_of_fit<R, S, D>(
        &self,
        records: &[R],
        distribution: &D,
    ) -> Result<TestReport, RunError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
        D: Cdf + Sync + ?Sized,
    {
        let test = TestKind::GoodnessOfFit;
        let table = stage(test, Stage::Parse, || FrequencyTable::from_records(records))?;
        let profile = stage(test, Stage::ExpectedValues, || {
            self.engine.goodness_of_fit(&table, distribution)
        })?;
        let statistic = stage(test, Stage::Statistic, || {
            TestStatistic::goodness_of_fit(&table, &profile)
        })?;

        let total = table.total();
        let buckets = table
            .rows()
            .iter()
            .zip(profile.iter())
            .map(|(row, probability)| BucketExpectation {
                label: row.label.clone(),
                observed: row.observed,
                probability,
                expected: probability * total,
            })
            .collect();
        self.finish(
            test,
            statistic,
            ReportDetails::GoodnessOfFit { total, buckets },
        )
    }

    /// Tests two categorical attributes of a contingency table for
    /// independence, with `(rows - 1)(cols - 1)` degrees of freedom.
    ///
    /// With `label_column`, field 0 of every record is a row label.
    pub fn independence<R, S>(
        &self,
        records: &[R],
        label_column: bool,
    ) -> Result<TestReport, RunError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let test = TestKind::Independence;
        let table = stage(test, Stage::Parse, || {
            ContingencyTable::from_records(records, label_column)
        })?;
        let profile = stage(test, Stage::ExpectedValues, || {
            self.engine.independence(&table)
        })?;
        let statistic = stage(test, Stage::Statistic, || {
            TestStatistic::independence(&table)
        })?;

        let expected = profile
            .as_slice()
            .chunks(table.cols())
            .map(<[f64]>::to_vec)
            .collect();
        self.finish(
            test,
            statistic,
            ReportDetails::Independence {
                row_totals: table.row_totals().to_vec(),
                col_totals: table.col_totals().to_vec(),
                grand_total: table.grand_total(),
                expected,
            },
        )
    }

    /// Compares the means of the groups in `records` (one group per record)
    /// with a one-way ANOVA F-test.
    ///
    /// There is no expected-value phase; the run goes straight from parsing
    /// to the statistic.
    pub fn compare_means<R, S>(&self, records: &[R]) -> Result<TestReport, RunError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let test = TestKind::MeanComparison;
        let samples = stage(test, Stage::Parse, || GroupedSamples::from_records(records))?;
        let comparison = stage(test, Stage::Statistic, || {
            MeanComparison::from_samples(&samples)
        })?;
        let MeanComparison {
            statistic,
            between_variance,
            within_variance,
            groups,
        } = comparison;
        self.finish(
            test,
            statistic,
            ReportDetails::MeanComparison {
                between_variance,
                within_variance,
                groups,
            },
        )
    }

    fn finish(
        &self,
        test: TestKind,
        statistic: TestStatistic,
        details: ReportDetails,
    ) -> Result<TestReport, RunError> {
        let critical_value = stage(test, Stage::CriticalValue, || {
            let value = statistic.reference.critical_value(self.significance)?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(EngineError::degenerate(
                    Location::Input,
                    format!("critical value is {value}"),
                ))
            }
        })?;
        let decision = stage(test, Stage::Decision, || {
            if statistic.value.is_finite() {
                Ok(Decision::new(statistic.value, critical_value))
            } else {
                Err(EngineError::degenerate(
                    Location::Input,
                    format!("test statistic is {}", statistic.value),
                ))
            }
        })?;
        tracing::info!(
            %test,
            statistic = decision.statistic,
            critical_value = decision.critical_value,
            reject = decision.reject,
            "decided"
        );

        Ok(TestReport {
            test,
            alpha: self.significance,
            statistic,
            decision,
            details,
        })
    }
}

fn stage<T, F>(test: TestKind, stage: Stage, f: F) -> Result<T, RunError>
where
    F: FnOnce() -> Result<T, EngineError>,
{
    let span = tracing::info_span!("stage", %test, %stage);
    let _enter = span.enter();
    f().map_err(|source| {
        tracing::warn!(error = %source, "stage failed");
        RunError { stage, source }
    })
}

#[cfg(test)]
mod tests {
    use std::{error::Error as _, io, num::NonZeroUsize};

    use super::*;
    use crate::{
        distribution::{Normal, ReferenceDistribution},
        error::ParseError,
    };

    fn runner() -> HypothesisTestRunner {
        HypothesisTestRunner::new(
            ExpectedValueEngine::with_parallelism(NonZeroUsize::new(2).unwrap()),
            Significance::default(),
        )
    }

    #[test]
    fn test_goodness_of_fit_accepts_scenario() {
        let normal = Normal::new(34.93, 21.82).unwrap();
        let records = [["<10", "5"], ["10-30", "20"], ["30-50", "15"], [">50", "10"]];
        let report = runner().goodness_of_fit(&records, &normal).unwrap();

        assert_eq!(report.test, TestKind::GoodnessOfFit);
        assert!((report.decision.statistic - 3.347_101_5).abs() < 1e-6);
        assert!((report.decision.critical_value - 7.814_727_903_251_178).abs() < 1e-6);
        assert!(!report.decision.reject);
        let ReportDetails::GoodnessOfFit { total, buckets } = &report.details else {
            panic!("unexpected details: {:?}", report.details);
        };
        assert_eq!(*total, 50.0);
        let expected = buckets.iter().map(|b| b.expected).sum::<f64>();
        assert!((expected - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_goodness_of_fit_rejects_shifted_data() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let records = [["<-1", "2"], ["-1-1", "10"], [">1", "88"]];
        let report = runner().goodness_of_fit(&records, &normal).unwrap();
        assert!(report.decision.reject);
        assert_eq!(
            report.statistic.reference,
            ReferenceDistribution::ChiSquared { freedom: 2.0 }
        );
    }

    #[test]
    fn test_independence_decisions() {
        let report = runner()
            .independence(&[["10", "20"], ["30", "40"]], false)
            .unwrap();
        assert!((report.decision.statistic - 200.0 / 252.0).abs() < 1e-12);
        assert!(!report.decision.reject);
        let ReportDetails::Independence { expected, .. } = &report.details else {
            panic!("unexpected details: {:?}", report.details);
        };
        assert_eq!(expected.len(), 2);
        assert!((expected[1][1] - 42.0).abs() < 1e-12);

        let report = runner()
            .independence(&[["a", "50", "1"], ["b", "2", "47"]], true)
            .unwrap();
        assert!(report.decision.reject);
    }

    #[test]
    fn test_compare_means_rejects() {
        let report = runner()
            .compare_means(&[["1", "2", "3"], ["4", "5", "6"], ["7", "8", "9"]])
            .unwrap();
        assert_eq!(report.test, TestKind::MeanComparison);
        assert!((report.decision.statistic - 27.0).abs() < 1e-9);
        assert!(report.decision.reject);
        assert_eq!(
            report.statistic.reference,
            ReferenceDistribution::F {
                numerator: 2.0,
                denominator: 6.0
            }
        );
    }

    #[test]
    fn test_stricter_alpha_raises_critical_value() {
        let records = [["1", "2", "3"], ["2", "3", "4"]];
        let loose = runner().compare_means(&records).unwrap();
        let strict = HypothesisTestRunner::new(
            runner().engine(),
            Significance::new(0.001).unwrap(),
        )
        .compare_means(&records)
        .unwrap();
        assert!(strict.decision.critical_value > loose.decision.critical_value);
        assert_eq!(strict.alpha.alpha(), 0.001);
    }

    #[test]
    fn test_failing_stage_is_reported() {
        let normal = Normal::new(0.0, 1.0).unwrap();

        let err = runner()
            .goodness_of_fit(&[["<0", "1"], ["abc", "2"]], &normal)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Parse);
        assert!(matches!(
            err.source,
            EngineError::Parse {
                row: 1,
                source: ParseError::NotNumeric,
                ..
            }
        ));

        let err = runner()
            .goodness_of_fit(&[["<0", "1"], ["2-2", "2"]], &normal)
            .unwrap_err();
        assert_eq!(err.stage, Stage::ExpectedValues);
        assert!(err.to_string().starts_with("expected-values stage failed"));

        let err = runner()
            .independence(&[["0", "0"], ["1", "2"]], false)
            .unwrap_err();
        assert_eq!(err.stage, Stage::ExpectedValues);

        let err = runner()
            .compare_means(&[["1", "1"], ["2", "2"]])
            .unwrap_err();
        assert_eq!(err.stage, Stage::Statistic);
        assert!(err.source.is_degenerate_input());
    }

    #[test]
    fn test_report_serializes() {
        let report = runner()
            .independence(&[["10", "20"], ["30", "40"]], false)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["test"], "independence");
        assert_eq!(json["alpha"], 0.05);
        assert_eq!(json["statistic"]["reference"]["kind"], "chi-squared");
        assert_eq!(json["decision"]["reject"], false);
        assert_eq!(json["details"]["grand_total"], 100.0);
    }

    #[test]
    fn test_thread_admission_failure_names_expected_values_stage() {
        let err = stage(TestKind::GoodnessOfFit, Stage::ExpectedValues, || {
            Err::<(), _>(EngineError::ConcurrencyAdmission {
                source: io::Error::other("no threads"),
            })
        })
        .unwrap_err();
        assert_eq!(err.stage, Stage::ExpectedValues);
        assert!(err.source.is_concurrency_admission());
        assert_eq!(
            err.to_string(),
            "expected-values stage failed: cannot admit worker threads: no threads"
        );
        let io_err = err
            .source()
            .and_then(|e| e.source())
            .and_then(|e| e.downcast_ref::<io::Error>())
            .unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
    }
}
