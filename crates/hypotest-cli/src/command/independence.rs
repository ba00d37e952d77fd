use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use hypotest_engine::expected::ExpectedValueEngine;

use super::ReportArg;
use crate::util;

#[derive(Debug, Clone, Args)]
pub(crate) struct IndependenceArg {
    /// CSV file with a header line and one contingency table row per line
    input: PathBuf,
    /// The input has no header line
    #[arg(long)]
    no_header: bool,
    /// The first field of every line is a row label
    #[arg(long)]
    label_column: bool,
    #[command(flatten)]
    report: ReportArg,
}

pub(crate) fn run(arg: &IndependenceArg, engine: ExpectedValueEngine) -> anyhow::Result<()> {
    let records = util::read_records(&arg.input, !arg.no_header)?;
    let report = super::runner(engine, &arg.report)
        .independence(&records, arg.label_column)
        .with_context(|| format!("Independence test failed for {}", arg.input.display()))?;
    arg.report.write(&report)
}
