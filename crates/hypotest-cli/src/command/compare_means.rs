use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use hypotest_engine::expected::ExpectedValueEngine;

use super::ReportArg;
use crate::util;

#[derive(Debug, Clone, Args)]
pub(crate) struct CompareMeansArg {
    /// File with one group per line, observations separated by commas
    input: PathBuf,
    #[command(flatten)]
    report: ReportArg,
}

pub(crate) fn run(arg: &CompareMeansArg, engine: ExpectedValueEngine) -> anyhow::Result<()> {
    let records = util::read_records(&arg.input, false)?;
    let report = super::runner(engine, &arg.report)
        .compare_means(&records)
        .with_context(|| format!("Mean comparison failed for {}", arg.input.display()))?;
    arg.report.write(&report)
}
