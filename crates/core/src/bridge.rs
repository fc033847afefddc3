//! Interface to the node feeding the indexer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{IndexError, LedgerOutput, LedgerUpdate, SlotIndex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub network_name: String,
    pub protocol_version: u8,
    /// Latest slot of the node's ledger.
    pub ledger_slot: SlotIndex,
    /// Oldest slot the node still keeps data for.
    #[serde(default)]
    pub pruning_slot: SlotIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    Accepted(LedgerUpdate),
    Committed(LedgerUpdate),
}

impl LedgerEvent {
    pub fn update(&self) -> &LedgerUpdate {
        match self {
            LedgerEvent::Accepted(x) | LedgerEvent::Committed(x) => x,
        }
    }

    pub fn slot(&self) -> SlotIndex {
        self.update().slot
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed bridge payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub trait NodeBridge {
    type Snapshot: Iterator<Item = Result<LedgerOutput, BridgeError>>;
    type Updates: Iterator<Item = Result<LedgerEvent, BridgeError>>;

    fn node_info(&self) -> Result<NodeInfo, BridgeError>;

    /// Every output unspent at the node's current ledger slot.
    fn unspent_outputs(&self) -> Result<Self::Snapshot, BridgeError>;

    /// Accepted and committed updates in slot order, starting at `from`.
    fn ledger_updates(&self, from: SlotIndex) -> Result<Self::Updates, BridgeError>;
}
