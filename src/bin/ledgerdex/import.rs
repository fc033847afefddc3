use std::path::PathBuf;

use miette::IntoDiagnostic;
use tracing::info;

use ledgerdex::core::config::RootConfig;
use ledgerdex::prelude::*;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// json document describing the node
    #[arg(long)]
    node_info: Option<PathBuf>,

    /// json lines file with the unspent outputs
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// drop the current index even if it is still compatible
    #[arg(long, action)]
    force: bool,
}

pub fn run(config: &RootConfig, args: &Args) -> miette::Result<()> {
    crate::common::setup_tracing(&config.logging)?;

    let indexer = crate::common::open_indexer(config)?;

    let bridge = crate::common::file_bridge(
        &config.bridge,
        args.node_info.as_ref(),
        args.snapshot.as_ref(),
        None,
    );

    if args.force {
        indexer.clear().into_diagnostic()?;
    }

    let status = bootstrap(&indexer, &bridge).map_err(Error::from)?;

    info!(
        committed_slot = status.committed_slot,
        network = status.network_name,
        "index ready"
    );

    Ok(())
}
