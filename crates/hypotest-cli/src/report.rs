//! Human-readable rendering of test reports.

use std::io::{self, Write};

use hypotest_engine::runner::{ReportDetails, TestReport};
use hypotest_stats::descriptive::DescriptiveStats;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Format {
    #[default]
    Text,
    Json,
}

pub(crate) fn write_report(out: &mut dyn Write, report: &TestReport) -> io::Result<()> {
    writeln!(out, "Test:            {}", report.test)?;
    match report.statistic.reference.degrees_of_freedom() {
        (freedom, None) => writeln!(out, "Reference:       chi-squared, df = {freedom}")?,
        (numerator, Some(denominator)) => {
            writeln!(out, "Reference:       F, df = ({numerator}, {denominator})")?;
        }
    }
    writeln!(out)?;

    match &report.details {
        ReportDetails::GoodnessOfFit { total, buckets } => {
            writeln!(
                out,
                "  {:<16} {:>10} {:>12} {:>12}",
                "Bucket", "Observed", "Probability", "Expected"
            )?;
            writeln!(out, "  {}", "-".repeat(53))?;
            for bucket in buckets {
                writeln!(
                    out,
                    "  {:<16} {:>10} {:>12.6} {:>12.4}",
                    bucket.label, bucket.observed, bucket.probability, bucket.expected
                )?;
            }
            writeln!(out, "  {:<16} {:>10}", "Total", total)?;
        }
        ReportDetails::Independence {
            row_totals,
            col_totals,
            grand_total,
            expected,
        } => {
            writeln!(out, "  Expected counts:")?;
            for (row, total) in expected.iter().zip(row_totals) {
                let cells = row
                    .iter()
                    .map(|v| format!("{v:>10.4}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(out, "  {cells} | {total:>10}")?;
            }
            let totals = col_totals
                .iter()
                .map(|v| format!("{v:>10}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "  {totals} | {grand_total:>10}")?;
        }
        ReportDetails::MeanComparison {
            between_variance,
            within_variance,
            groups,
        } => {
            writeln!(
                out,
                "  {:<8} {:>8} {:>12} {:>12}",
                "Group", "Count", "Mean", "Variance"
            )?;
            writeln!(out, "  {}", "-".repeat(43))?;
            for (index, group) in groups.iter().enumerate() {
                write_group(out, index, group)?;
            }
            writeln!(out, "  S1^2 (between groups): {between_variance:.6}")?;
            writeln!(out, "  S2^2 (within groups):  {within_variance:.6}")?;
        }
    }
    writeln!(out)?;

    let decision = &report.decision;
    writeln!(out, "Statistic:       {:.6}", decision.statistic)?;
    writeln!(
        out,
        "Critical value:  {:.6} (alpha = {})",
        decision.critical_value, report.alpha
    )?;
    let verdict = if decision.reject {
        "reject the null hypothesis"
    } else {
        "do not reject the null hypothesis"
    };
    writeln!(out, "Decision:        {verdict}")?;
    Ok(())
}

fn write_group(out: &mut dyn Write, index: usize, group: &DescriptiveStats) -> io::Result<()> {
    let variance = group
        .sample_variance
        .map_or_else(|| "-".to_owned(), |v| format!("{v:.6}"));
    writeln!(
        out,
        "  {:<8} {:>8} {:>12.6} {:>12}",
        index, group.count, group.mean, variance
    )
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use hypotest_engine::{
        HypothesisTestRunner, expected::ExpectedValueEngine, significance::Significance,
    };

    use super::*;

    fn render(report: &TestReport) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, report).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn runner() -> HypothesisTestRunner {
        HypothesisTestRunner::new(
            ExpectedValueEngine::with_parallelism(NonZeroUsize::MIN),
            Significance::default(),
        )
    }

    #[test]
    fn test_independence_text() {
        let report = runner()
            .independence(&[["10", "20"], ["30", "40"]], false)
            .unwrap();
        let text = render(&report);
        assert!(text.contains("Test:            independence"));
        assert!(text.contains("chi-squared, df = 1"));
        assert!(text.contains("do not reject the null hypothesis"));
        assert!(text.contains("alpha = 0.05"));
    }

    #[test]
    fn test_mean_comparison_text() {
        let report = runner()
            .compare_means(&[["1", "2", "3"], ["4", "5", "6"], ["7", "8", "9"]])
            .unwrap();
        let text = render(&report);
        assert!(text.contains("F, df = (2, 6)"));
        assert!(text.contains("S1^2 (between groups): 27.000000"));
        assert!(text.contains("Statistic:       27.000000"));
        assert!(text.contains("Decision:        reject the null hypothesis"));
    }
}
