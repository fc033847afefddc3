use std::collections::BTreeMap;

use miette::IntoDiagnostic;
use serde_json::json;

use ledgerdex::core::config::RootConfig;
use ledgerdex::prelude::*;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// include storage level stats of the output tables
    #[arg(long, action)]
    tables: bool,
}

pub fn run(config: &RootConfig, args: &Args) -> miette::Result<()> {
    let indexer = crate::common::open_indexer(config)?;

    let status = match indexer.status() {
        Ok(x) => Some(x),
        Err(IndexError::StatusNotFound) => None,
        Err(err) => return Err(err).into_diagnostic(),
    };

    let rows: BTreeMap<_, _> = indexer
        .store()
        .stats()
        .map_err(Error::from)?
        .into_iter()
        .collect();

    let mut out = json!({
        "status": status,
        "rows": rows,
    });

    if args.tables {
        let tables: BTreeMap<_, _> = indexer
            .store()
            .table_stats()
            .map_err(Error::from)?
            .into_iter()
            .map(|(name, x)| {
                let stats = json!({
                    "tree_height": x.tree_height(),
                    "leaf_pages": x.leaf_pages(),
                    "branch_pages": x.branch_pages(),
                    "stored_bytes": x.stored_bytes(),
                    "metadata_bytes": x.metadata_bytes(),
                    "fragmented_bytes": x.fragmented_bytes(),
                });

                (name, stats)
            })
            .collect();

        out["tables"] = json!(tables);
    }

    crate::common::print_json(&out)
}
