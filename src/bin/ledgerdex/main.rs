use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ledgerdex::core::config::RootConfig;

mod clear;
mod common;
mod import;
mod query;
mod replay;
mod resolve;
mod rollback;
mod status;

#[derive(Debug, Subcommand)]
enum Command {
    /// imports the unspent outputs of a node snapshot
    Import(import::Args),
    /// applies ledger events on top of the current index
    Replay(replay::Args),
    /// runs an output query against the index
    Query(query::Args),
    /// resolves a multi address from its reference id
    ResolveMulti(resolve::Args),
    /// shows the indexer status and table stats
    Status(status::Args),
    /// discards uncommitted changes left by an interrupted run
    Rollback(rollback::Args),
    /// drops every table of the index
    Clear(clear::Args),
}

#[derive(Debug, Parser)]
#[clap(name = "Ledgerdex")]
#[clap(bin_name = "ledgerdex")]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(explicit_file: &Option<PathBuf>) -> Result<RootConfig, config::ConfigError> {
    let mut s = config::Config::builder();

    // our base config will always be in /etc/ledgerdex
    s = s.add_source(config::File::with_name("/etc/ledgerdex/daemon.toml").required(false));

    // but we can override it by having a file in the working dir
    s = s.add_source(config::File::with_name("ledgerdex.toml").required(false));

    // if an explicit file was passed, then we load it as mandatory
    if let Some(explicit) = explicit_file.as_ref().and_then(|x| x.to_str()) {
        s = s.add_source(config::File::with_name(explicit).required(true));
    }

    // finally, we use env vars to make some last-step overrides
    s = s.add_source(config::Environment::with_prefix("LEDGERDEX").separator("_"));

    s.build()?.try_deserialize()
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = load_config(&args.config).into_diagnostic()?;

    match args.command {
        Command::Import(x) => import::run(&config, &x)?,
        Command::Replay(x) => replay::run(&config, &x)?,
        Command::Query(x) => query::run(&config, &x)?,
        Command::ResolveMulti(x) => resolve::run(&config, &x)?,
        Command::Status(x) => status::run(&config, &x)?,
        Command::Rollback(x) => rollback::run(&config, &x)?,
        Command::Clear(x) => clear::run(&config, &x)?,
    };

    Ok(())
}
