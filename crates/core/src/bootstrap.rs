use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    BridgeError, IndexStore, Indexer, LedgerOutput, NodeBridge, NodeInfo, SlotIndex, Status,
    DATABASE_VERSION,
};

const IMPORT_BATCH_SIZE: usize = 10_000;

/// Why an existing index can't keep following the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetReason {
    #[error("protocol version changed: {stored} vs {node}")]
    ProtocolVersionChanged { stored: u8, node: u8 },

    #[error("network name changed: {stored} vs {node}")]
    NetworkChanged { stored: String, node: String },

    #[error("database version changed: {stored} vs {expected}")]
    DatabaseVersionChanged { stored: u32, expected: u32 },

    #[error("network has been reset: indexer slot {indexer} > ledger slot {node}")]
    NodeBehind { indexer: SlotIndex, node: SlotIndex },

    #[error("node pruned past the indexer: pruning slot {pruning} > indexer slot {indexer}")]
    PrunedPastIndexer {
        pruning: SlotIndex,
        indexer: SlotIndex,
    },
}

impl Status {
    pub fn reset_reason(&self, node: &NodeInfo) -> Option<ResetReason> {
        if self.protocol_version != node.protocol_version {
            return Some(ResetReason::ProtocolVersionChanged {
                stored: self.protocol_version,
                node: node.protocol_version,
            });
        }

        if self.network_name != node.network_name {
            return Some(ResetReason::NetworkChanged {
                stored: self.network_name.clone(),
                node: node.network_name.clone(),
            });
        }

        if self.database_version != DATABASE_VERSION {
            return Some(ResetReason::DatabaseVersionChanged {
                stored: self.database_version,
                expected: DATABASE_VERSION,
            });
        }

        if node.ledger_slot < self.committed_slot {
            return Some(ResetReason::NodeBehind {
                indexer: self.committed_slot,
                node: node.ledger_slot,
            });
        }

        if node.pruning_slot > self.committed_slot {
            return Some(ResetReason::PrunedPastIndexer {
                pruning: node.pruning_slot,
                indexer: self.committed_slot,
            });
        }

        None
    }
}

/// Loads the node's unspent outputs into an empty index.
pub fn import_snapshot<S, B>(indexer: &Indexer<S>, bridge: &B) -> Result<Status, BridgeError>
where
    S: IndexStore,
    B: NodeBridge,
{
    let node = bridge.node_info()?;
    let mut tx = indexer.import_transaction()?;

    let snapshot = bridge.unspent_outputs()?;

    for chunk in &snapshot.chunks(IMPORT_BATCH_SIZE) {
        let batch = chunk.collect::<Result<Vec<LedgerOutput>, _>>()?;
        tx.add_outputs(&batch)?;

        debug!(imported = tx.imported(), "imported snapshot batch");
    }

    let status = tx.finalize(node.ledger_slot, node.protocol_version, &node.network_name)?;

    Ok(status)
}

/// Brings the index to a state from which ledger updates can be followed.
///
/// A missing index is imported; an index that no longer matches the node is
/// cleared and imported again. Otherwise the tentative state left behind by
/// a previous run is rolled back.
pub fn bootstrap<S, B>(indexer: &Indexer<S>, bridge: &B) -> Result<Status, BridgeError>
where
    S: IndexStore,
    B: NodeBridge,
{
    let node = bridge.node_info()?;

    let existing = indexer.store().read_status()?;

    let needs_import = match existing {
        None => {
            info!("indexer is empty, importing initial ledger");
            true
        }
        Some(status) => match status.reset_reason(&node) {
            Some(reason) => {
                info!(%reason, "re-importing initial ledger");
                indexer.clear()?;
                true
            }
            None => false,
        },
    };

    if needs_import {
        let status = import_snapshot(indexer, bridge)?;
        info!(slot = status.committed_slot, "imported initial ledger");
        return Ok(status);
    }

    indexer.remove_uncommitted_changes()?;

    let status = indexer.status()?;
    info!(slot = status.committed_slot, "indexer started");

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> Status {
        Status {
            committed_slot: 100,
            protocol_version: 3,
            network_name: "testnet".into(),
            database_version: DATABASE_VERSION,
        }
    }

    fn node() -> NodeInfo {
        NodeInfo {
            network_name: "testnet".into(),
            protocol_version: 3,
            ledger_slot: 120,
            pruning_slot: 50,
        }
    }

    #[test]
    fn compatible_status_needs_no_reset() {
        assert_eq!(status().reset_reason(&node()), None);
    }

    #[test]
    fn detects_each_reset_reason() {
        let mut other = node();
        other.protocol_version = 4;
        assert!(matches!(
            status().reset_reason(&other),
            Some(ResetReason::ProtocolVersionChanged { stored: 3, node: 4 })
        ));

        let mut other = node();
        other.network_name = "mainnet".into();
        assert!(matches!(
            status().reset_reason(&other),
            Some(ResetReason::NetworkChanged { .. })
        ));

        let mut old = status();
        old.database_version = DATABASE_VERSION + 1;
        assert!(matches!(
            old.reset_reason(&node()),
            Some(ResetReason::DatabaseVersionChanged { .. })
        ));

        let mut other = node();
        other.ledger_slot = 99;
        assert!(matches!(
            status().reset_reason(&other),
            Some(ResetReason::NodeBehind {
                indexer: 100,
                node: 99
            })
        ));

        let mut other = node();
        other.pruning_slot = 101;
        assert!(matches!(
            status().reset_reason(&other),
            Some(ResetReason::PrunedPastIndexer { .. })
        ));
    }
}
