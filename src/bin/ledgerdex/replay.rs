use std::path::PathBuf;

use miette::IntoDiagnostic;
use tracing::info;

use ledgerdex::core::config::RootConfig;
use ledgerdex::prelude::*;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// json lines file with accepted and committed ledger updates
    #[arg(long)]
    events: Option<PathBuf>,

    /// first slot to apply, defaults to the one after the committed slot
    #[arg(long)]
    from: Option<SlotIndex>,
}

pub fn run(config: &RootConfig, args: &Args) -> miette::Result<()> {
    crate::common::setup_tracing(&config.logging)?;

    let indexer = crate::common::open_indexer(config)?;

    // fails early when nothing was imported yet
    let status = indexer.status().into_diagnostic()?;

    indexer.remove_uncommitted_changes().into_diagnostic()?;

    let bridge = crate::common::file_bridge(&config.bridge, None, None, args.events.as_ref());

    let from = args.from.unwrap_or(status.committed_slot + 1);
    let applied = follow(&indexer, &bridge, from).map_err(Error::from)?;

    info!(applied, committed_slot = indexer.committed_slot(), "replay finished");

    Ok(())
}
