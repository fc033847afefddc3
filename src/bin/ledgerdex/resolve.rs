use miette::IntoDiagnostic;
use serde_json::json;

use ledgerdex::core::config::RootConfig;
use ledgerdex::prelude::*;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// hex encoded reference id of the multi address
    id: String,
}

pub fn run(config: &RootConfig, args: &Args) -> miette::Result<()> {
    let id = args.id.strip_prefix("0x").unwrap_or(&args.id);
    let id = hex::decode(id).map_err(Error::parse)?;

    let indexer = crate::common::open_indexer(config)?;
    let multi = indexer.resolve_multi_address(&id).into_diagnostic()?;

    let members: Vec<_> = multi
        .addresses
        .iter()
        .map(|x| json!({ "address": x.address, "weight": x.weight }))
        .collect();

    crate::common::print_json(&json!({
        "addresses": members,
        "threshold": multi.threshold,
    }))
}
