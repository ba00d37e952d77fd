use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use hypotest_engine::{distribution::DistributionSpec, expected::ExpectedValueEngine};

use super::ReportArg;
use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum DistributionKind {
    Normal,
    StudentsT,
    ChiSquared,
    F,
}

/// Candidate distribution and its parameters.
#[derive(Debug, Clone, Args)]
pub(crate) struct DistributionArg {
    /// Distribution family to test against
    #[arg(long, value_enum, default_value_t = DistributionKind::Normal)]
    distribution: DistributionKind,
    /// Mean of the normal distribution
    #[arg(long, allow_negative_numbers = true)]
    mean: Option<f64>,
    /// Standard deviation of the normal distribution
    #[arg(long)]
    std_dev: Option<f64>,
    /// Location of the Student's t distribution
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    location: f64,
    /// Scale of the Student's t distribution
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
    /// Degrees of freedom (Student's t, chi-squared, F numerator)
    #[arg(long)]
    freedom: Option<f64>,
    /// Denominator degrees of freedom of the F distribution
    #[arg(long)]
    freedom2: Option<f64>,
}

impl DistributionArg {
    pub(crate) fn to_spec(&self) -> anyhow::Result<DistributionSpec> {
        let required = |value: Option<f64>, flag: &str| {
            value.ok_or_else(|| {
                anyhow::anyhow!(
                    "--{flag} is required for the {:?} distribution",
                    self.distribution
                )
            })
        };
        let spec = match self.distribution {
            DistributionKind::Normal => DistributionSpec::Normal {
                mean: required(self.mean, "mean")?,
                std_dev: required(self.std_dev, "std-dev")?,
            },
            DistributionKind::StudentsT => DistributionSpec::StudentsT {
                location: self.location,
                scale: self.scale,
                freedom: required(self.freedom, "freedom")?,
            },
            DistributionKind::ChiSquared => DistributionSpec::ChiSquared {
                freedom: required(self.freedom, "freedom")?,
            },
            DistributionKind::F => DistributionSpec::F {
                freedom1: required(self.freedom, "freedom")?,
                freedom2: required(self.freedom2, "freedom2")?,
            },
        };
        Ok(spec)
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct GoodnessOfFitArg {
    /// CSV file of bucket labels and observed counts
    input: PathBuf,
    /// The input has no header line
    #[arg(long)]
    no_header: bool,
    #[command(flatten)]
    distribution: DistributionArg,
    #[command(flatten)]
    report: ReportArg,
}

pub(crate) fn run(arg: &GoodnessOfFitArg, engine: ExpectedValueEngine) -> anyhow::Result<()> {
    let spec = arg.distribution.to_spec()?;
    let distribution = spec.build()?;
    let records = util::read_records(&arg.input, !arg.no_header)?;
    let report = super::runner(engine, &arg.report)
        .goodness_of_fit(&records, &*distribution)
        .with_context(|| format!("Goodness-of-fit test failed for {}", arg.input.display()))?;
    arg.report.write(&report)
}
