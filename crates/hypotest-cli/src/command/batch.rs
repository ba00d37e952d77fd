//! Runs several independent tests from one JSON configuration file.
//!
//! ```json
//! {
//!   "alpha": 0.05,
//!   "jobs": [
//!     {
//!       "name": "ages",
//!       "test": "goodness-of-fit",
//!       "input": "ages.csv",
//!       "distribution": { "kind": "normal", "mean": 34.93, "std_dev": 21.82 }
//!     },
//!     { "name": "colours", "test": "independence", "input": "colours.csv", "label_column": true },
//!     { "name": "yields", "test": "compare-means", "input": "yields.txt", "alpha": 0.01 }
//!   ]
//! }
//! ```
//!
//! Relative input paths are resolved against the directory of the
//! configuration file. A failing job does not stop the others.

use std::{
    io,
    path::{Path, PathBuf},
};

use clap::Args;
use hypotest_engine::{
    HypothesisTestRunner, TestReport, distribution::DistributionSpec,
    expected::ExpectedValueEngine, significance::Significance,
};

use super::ReportArg;
use crate::{
    report::{self, Format},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct BatchArg {
    /// Path to the batch configuration JSON file
    config: PathBuf,
    #[command(flatten)]
    report: ReportArg,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct BatchConfig {
    #[serde(default)]
    alpha: Option<Significance>,
    jobs: Vec<Job>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct Job {
    name: String,
    input: PathBuf,
    #[serde(default)]
    alpha: Option<Significance>,
    #[serde(flatten)]
    test: JobTest,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "test", rename_all = "kebab-case")]
enum JobTest {
    GoodnessOfFit {
        #[serde(default = "default_header")]
        header: bool,
        distribution: DistributionSpec,
    },
    Independence {
        #[serde(default = "default_header")]
        header: bool,
        #[serde(default)]
        label_column: bool,
    },
    CompareMeans,
}

fn default_header() -> bool {
    true
}

#[derive(Debug, serde::Serialize)]
struct JobOutcome {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<TestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub(crate) fn run(arg: &BatchArg, engine: ExpectedValueEngine) -> anyhow::Result<()> {
    let config: BatchConfig = util::read_json_file("batch config", &arg.config)?;
    let base_dir = arg.config.parent().unwrap_or_else(|| Path::new(""));
    let default_alpha = config.alpha.unwrap_or(arg.report.alpha);

    let outcomes = run_jobs(&config.jobs, base_dir, engine, default_alpha);
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();

    let mut output = Output::from_output_path(arg.report.output.as_deref())?;
    match arg.report.format {
        Format::Text => output.write_text(|out| write_outcomes(out, &outcomes))?,
        Format::Json => output.write_json(&outcomes)?,
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} batch jobs failed", outcomes.len());
    }
    Ok(())
}

fn run_jobs(
    jobs: &[Job],
    base_dir: &Path,
    engine: ExpectedValueEngine,
    default_alpha: Significance,
) -> Vec<JobOutcome> {
    jobs.iter()
        .enumerate()
        .map(|(index, job)| {
            eprintln!("Running job {}/{}: {}", index + 1, jobs.len(), job.name);
            let runner = HypothesisTestRunner::new(engine, job.alpha.unwrap_or(default_alpha));
            match run_job(&runner, job, base_dir) {
                Ok(report) => JobOutcome {
                    name: job.name.clone(),
                    report: Some(report),
                    error: None,
                },
                Err(err) => {
                    tracing::error!(job = %job.name, error = %format!("{err:#}"), "job failed");
                    JobOutcome {
                        name: job.name.clone(),
                        report: None,
                        error: Some(format!("{err:#}")),
                    }
                }
            }
        })
        .collect()
}

fn run_job(
    runner: &HypothesisTestRunner,
    job: &Job,
    base_dir: &Path,
) -> anyhow::Result<TestReport> {
    let input = base_dir.join(&job.input);
    let report = match &job.test {
        JobTest::GoodnessOfFit {
            header,
            distribution,
        } => {
            let distribution = distribution.build()?;
            let records = util::read_records(&input, *header)?;
            runner.goodness_of_fit(&records, &*distribution)?
        }
        JobTest::Independence {
            header,
            label_column,
        } => {
            let records = util::read_records(&input, *header)?;
            runner.independence(&records, *label_column)?
        }
        JobTest::CompareMeans => {
            let records = util::read_records(&input, false)?;
            runner.compare_means(&records)?
        }
    };
    Ok(report)
}

fn write_outcomes(out: &mut dyn io::Write, outcomes: &[JobOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        writeln!(out, "== {} ==", outcome.name)?;
        if let Some(report) = &outcome.report {
            report::write_report(out, report)?;
        }
        if let Some(error) = &outcome.error {
            writeln!(out, "Error: {error}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, num::NonZeroUsize};

    use super::*;

    #[test]
    fn test_config_deserialize() {
        let config: BatchConfig = serde_json::from_str(
            r#"{
                "jobs": [
                    {
                        "name": "fit",
                        "test": "goodness-of-fit",
                        "input": "a.csv",
                        "distribution": { "kind": "chi-squared", "freedom": 3 }
                    },
                    { "name": "ind", "test": "independence", "input": "b.csv", "alpha": 0.01 },
                    { "name": "anova", "test": "compare-means", "input": "c.txt" }
                ]
            }"#,
        )
        .unwrap();
        assert!(config.alpha.is_none());
        assert_eq!(config.jobs.len(), 3);
        assert!(matches!(
            config.jobs[0].test,
            JobTest::GoodnessOfFit {
                header: true,
                distribution: DistributionSpec::ChiSquared { .. }
            }
        ));
        assert!(matches!(
            config.jobs[1].test,
            JobTest::Independence {
                header: true,
                label_column: false
            }
        ));
        assert_eq!(config.jobs[1].alpha.unwrap().alpha(), 0.01);
        assert!(matches!(config.jobs[2].test, JobTest::CompareMeans));
    }

    #[test]
    fn test_config_rejects_invalid_alpha() {
        let result = serde_json::from_str::<BatchConfig>(r#"{ "alpha": 0, "jobs": [] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_job_does_not_stop_others() {
        let dir = std::env::temp_dir().join(format!("hypotest-batch-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("table.csv"), "a,b\n10,20\n30,40\n").unwrap();
        fs::write(dir.join("groups.txt"), "1,1\n2,2\n").unwrap();

        let jobs: Vec<Job> = serde_json::from_str(
            r#"[
                { "name": "missing", "test": "compare-means", "input": "nope.txt" },
                { "name": "flat", "test": "compare-means", "input": "groups.txt" },
                { "name": "table", "test": "independence", "input": "table.csv" }
            ]"#,
        )
        .unwrap();
        let engine = ExpectedValueEngine::with_parallelism(NonZeroUsize::MIN);
        let outcomes = run_jobs(&jobs, &dir, engine, Significance::default());
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].error.as_ref().unwrap().contains("nope.txt"));
        assert!(
            outcomes[1]
                .error
                .as_ref()
                .unwrap()
                .contains("statistic stage failed")
        );
        let report = outcomes[2].report.as_ref().unwrap();
        assert!(!report.decision.reject);

        let mut text = Vec::new();
        write_outcomes(&mut text, &outcomes).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("== table =="));
        assert!(text.contains("Error: "));
    }
}
