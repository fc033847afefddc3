use std::path::PathBuf;

use tracing_subscriber::{filter::Targets, prelude::*};

use ledgerdex::core::config::{BridgeConfig, LoggingConfig, RootConfig};
use ledgerdex::prelude::*;

pub fn setup_tracing(config: &LoggingConfig) -> miette::Result<()> {
    let level = config.max_level;

    let mut filter = Targets::new()
        .with_target("ledgerdex", level)
        .with_target("ledgerdex_core", level)
        .with_target("ledgerdex_redb3", level);

    if config.include_redb {
        filter = filter.with_target("redb", level);
    }

    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish()
        .with(filter)
        .init();

    Ok(())
}

pub fn open_store(config: &RootConfig) -> Result<OutputStore, Error> {
    let path = &config.storage.path;

    if let Some(parent) = path.parent().filter(|x| !x.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(Error::storage)?;
    }

    let store = OutputStore::open(path, config.storage.cache)?;

    Ok(store)
}

pub fn open_indexer(config: &RootConfig) -> Result<Indexer<OutputStore>, Error> {
    let store = open_store(config)?;
    let indexer = Indexer::open(store)?;

    Ok(indexer)
}

/// Builds a file bridge, letting command-line paths win over the config.
pub fn file_bridge(
    config: &BridgeConfig,
    node_info: Option<&PathBuf>,
    snapshot: Option<&PathBuf>,
    events: Option<&PathBuf>,
) -> FileBridge {
    FileBridge::new(
        node_info.or(config.node_info.as_ref()).cloned(),
        snapshot.or(config.snapshot.as_ref()).cloned(),
        events.or(config.events.as_ref()).cloned(),
    )
}

pub fn print_json<T: serde::Serialize>(value: &T) -> miette::Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(Error::parse)?;
    println!("{out}");

    Ok(())
}
