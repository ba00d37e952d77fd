use std::{num::NonZeroUsize, path::PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use hypotest_engine::{
    HypothesisTestRunner, TestReport, expected::ExpectedValueEngine, significance::Significance,
};

use self::{
    batch::BatchArg, compare_means::CompareMeansArg, goodness_of_fit::GoodnessOfFitArg,
    independence::IndependenceArg,
};
use crate::{
    report::{self, Format},
    util::{self, Output},
};

mod batch;
mod compare_means;
mod goodness_of_fit;
mod independence;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v: info, -vv: debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Maximum number of worker threads [default: available parallelism]
    #[arg(long, global = true)]
    jobs: Option<NonZeroUsize>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Chi-square goodness-of-fit of a frequency table to a distribution
    GoodnessOfFit(#[clap(flatten)] GoodnessOfFitArg),
    /// Chi-square test of independence on a contingency table
    Independence(#[clap(flatten)] IndependenceArg),
    /// One-way ANOVA F-test comparing group means
    CompareMeans(#[clap(flatten)] CompareMeansArg),
    /// Run the tests listed in a JSON configuration file
    Batch(#[clap(flatten)] BatchArg),
}

/// Options shared by every test.
#[derive(Debug, Clone, Args)]
pub(crate) struct ReportArg {
    /// Significance level of the test
    #[arg(long, default_value_t = Significance::default())]
    alpha: Significance,
    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Output file path [default: stdout]
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ReportArg {
    fn write(&self, report: &TestReport) -> anyhow::Result<()> {
        let mut output = Output::from_output_path(self.output.as_deref())?;
        match self.format {
            Format::Text => output.write_text(|out| report::write_report(out, report)),
            Format::Json => output.write_json(report),
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    util::init_tracing(args.verbose);

    let engine = match args.jobs {
        Some(jobs) => ExpectedValueEngine::with_parallelism(jobs),
        None => ExpectedValueEngine::new()?,
    };
    tracing::debug!(parallelism = engine.parallelism().get(), "engine ready");

    match &args.mode {
        Mode::GoodnessOfFit(arg) => goodness_of_fit::run(arg, engine)?,
        Mode::Independence(arg) => independence::run(arg, engine)?,
        Mode::CompareMeans(arg) => compare_means::run(arg, engine)?,
        Mode::Batch(arg) => batch::run(arg, engine)?,
    }
    Ok(())
}

fn runner(engine: ExpectedValueEngine, arg: &ReportArg) -> HypothesisTestRunner {
    HypothesisTestRunner::new(engine, arg.alpha)
}
