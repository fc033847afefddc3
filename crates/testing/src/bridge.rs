use std::sync::{Arc, Mutex, PoisonError};

use ledgerdex_core::{
    BridgeError, LedgerEvent, LedgerOutput, NodeBridge, NodeInfo, SlotIndex,
};

/// Node bridge backed by in-memory vectors.
#[derive(Clone)]
pub struct MemoryBridge {
    info: Arc<Mutex<NodeInfo>>,
    snapshot: Arc<Mutex<Vec<LedgerOutput>>>,
    events: Arc<Mutex<Vec<LedgerEvent>>>,
}

impl MemoryBridge {
    pub fn new(info: NodeInfo) -> Self {
        Self {
            info: Arc::new(Mutex::new(info)),
            snapshot: Default::default(),
            events: Default::default(),
        }
    }

    pub fn with_snapshot(self, outputs: Vec<LedgerOutput>) -> Self {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = outputs;
        self
    }

    pub fn push_event(&self, event: LedgerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn set_info(&self, info: NodeInfo) {
        *self.info.lock().unwrap_or_else(PoisonError::into_inner) = info;
    }
}

impl NodeBridge for MemoryBridge {
    type Snapshot = std::vec::IntoIter<Result<LedgerOutput, BridgeError>>;
    type Updates = std::vec::IntoIter<Result<LedgerEvent, BridgeError>>;

    fn node_info(&self) -> Result<NodeInfo, BridgeError> {
        Ok(self
            .info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn unspent_outputs(&self) -> Result<Self::Snapshot, BridgeError> {
        let outputs = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(outputs
            .iter()
            .cloned()
            .map(Ok)
            .collect::<Vec<_>>()
            .into_iter())
    }

    fn ledger_updates(&self, from: SlotIndex) -> Result<Self::Updates, BridgeError> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(events
            .iter()
            .filter(|event| event.slot() >= from)
            .cloned()
            .map(Ok)
            .collect::<Vec<_>>()
            .into_iter())
    }
}
