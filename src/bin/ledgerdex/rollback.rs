use miette::IntoDiagnostic;

use ledgerdex::core::config::RootConfig;

#[derive(Debug, clap::Args)]
pub struct Args {}

pub fn run(config: &RootConfig, _args: &Args) -> miette::Result<()> {
    crate::common::setup_tracing(&config.logging)?;

    let indexer = crate::common::open_indexer(config)?;

    indexer.remove_uncommitted_changes().into_diagnostic()?;

    Ok(())
}
