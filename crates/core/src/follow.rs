use tracing::{info, warn};

use crate::{BridgeError, IndexError, IndexStore, Indexer, LedgerEvent, NodeBridge, SlotIndex};

pub fn apply_event<S: IndexStore>(
    indexer: &Indexer<S>,
    event: &LedgerEvent,
) -> Result<(), IndexError> {
    match event {
        LedgerEvent::Accepted(update) => indexer.accept_ledger_update(update),
        LedgerEvent::Committed(update) => indexer.commit_ledger_update(update),
    }
}

/// Feeds ledger updates from the bridge into the indexer until the stream
/// ends. Stale updates are skipped; any other failure stops the loop.
///
/// Returns the number of applied events.
pub fn follow<S, B>(indexer: &Indexer<S>, bridge: &B, from: SlotIndex) -> Result<u64, BridgeError>
where
    S: IndexStore,
    B: NodeBridge,
{
    let mut applied = 0;

    for event in bridge.ledger_updates(from)? {
        let event = event?;

        match apply_event(indexer, &event) {
            Ok(()) => applied += 1,
            Err(IndexError::LedgerUpdateSkipped {
                slot,
                committed_slot,
            }) => {
                warn!(slot, committed_slot, "skipping stale ledger update");
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(applied, slot = indexer.committed_slot(), "ledger updates consumed");

    Ok(applied)
}
