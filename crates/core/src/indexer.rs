//! Reconciliation of accepted and committed ledger updates.
//!
//! Accepted updates are written as tentative rows (`committed == false`) and
//! tentative deletion markers so queries reflect them right away. When the
//! commitment for a slot arrives, every tentative row booked up to that slot
//! is discarded and every deletion up to that slot is reverted before the
//! authoritative update is applied, so nothing speculative survives the
//! commitment unless the committed update says so again.

use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, info, instrument};

use crate::{
    addresses_in_output, entry_for_ledger_output, ImportTransaction, IndexError, IndexStore,
    IndexWriter, LedgerOutput, LedgerSpent, LedgerUpdate, MultiAddress, OutputId, SlotIndex,
    Status, MAX_SLOT_INDEX,
};

/// Shared view of the last committed slot.
#[derive(Debug, Clone, Default)]
pub(crate) struct SlotCache(Arc<RwLock<SlotIndex>>);

impl SlotCache {
    pub(crate) fn get(&self) -> SlotIndex {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raises the cached slot; lower values are ignored.
    pub(crate) fn advance(&self, slot: SlotIndex) {
        if self.get() >= slot {
            return;
        }

        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);

        if *guard < slot {
            *guard = slot;
        }
    }

    pub(crate) fn reset(&self, slot: SlotIndex) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = slot;
    }
}

#[derive(Clone)]
pub struct Indexer<S: IndexStore> {
    store: S,
    committed_slot: SlotCache,
}

/// Splits an update into the consumed and created outputs that survive the
/// batch. Outputs created and consumed within the same batch cancel out.
fn net_changes(update: &LedgerUpdate) -> (Vec<&LedgerSpent>, Vec<&LedgerOutput>) {
    let consumed: HashSet<&OutputId> = update.consumed.iter().map(|x| x.output_id()).collect();
    let created: HashSet<&OutputId> = update.created.iter().map(|x| &x.output_id).collect();

    let spent = update
        .consumed
        .iter()
        .filter(|x| !created.contains(x.output_id()))
        .collect();

    let new = update
        .created
        .iter()
        .filter(|x| !consumed.contains(&x.output_id))
        .collect();

    (spent, new)
}

fn insert_output<W: IndexWriter>(
    writer: &W,
    output: &LedgerOutput,
    committed: bool,
) -> Result<(), IndexError> {
    match writer.read_output(output.kind(), &output.output_id)? {
        Some(mut existing) => {
            if committed && !existing.meta().committed {
                existing.meta_mut().committed = true;
                writer.write_output(&existing)?;
            }
        }
        None => {
            let record = entry_for_ledger_output(output, committed)?;
            writer.write_output(&record)?;
            writer.record_references(&output.output_id, &addresses_in_output(&output.output))?;
        }
    }

    Ok(())
}

fn mark_spent<W: IndexWriter>(writer: &W, spent: &LedgerSpent) -> Result<(), IndexError> {
    let output = &spent.output;

    match writer.read_output(output.kind(), &output.output_id)? {
        Some(mut existing) => {
            if existing.meta().deleted_at_slot != spent.spent_at {
                existing.meta_mut().deleted_at_slot = spent.spent_at;
                writer.write_output(&existing)?;
            }
        }
        None => {
            // never seen before: keep a dead tentative row so the spend is
            // undone together with the rest of the speculative state
            let mut record = entry_for_ledger_output(output, false)?;
            record.meta_mut().deleted_at_slot = spent.spent_at;
            writer.write_output(&record)?;
            writer.record_references(&output.output_id, &addresses_in_output(&output.output))?;
        }
    }

    Ok(())
}

fn remove_spent<W: IndexWriter>(writer: &W, spent: &LedgerSpent) -> Result<(), IndexError> {
    let output = &spent.output;

    if writer
        .remove_output(output.kind(), &output.output_id)?
        .is_some()
    {
        writer.release_references(&output.output_id)?;
    }

    Ok(())
}

/// Drops tentative rows up to `slot` and reverts deletions up to `slot`.
fn remove_uncommitted_up_to<W: IndexWriter>(
    writer: &W,
    slot: SlotIndex,
) -> Result<(usize, usize), IndexError> {
    let discarded = writer.discard_uncommitted(slot)?;

    for output_id in discarded.iter() {
        writer.release_references(output_id)?;
    }

    let reverted = writer.revert_spent(slot)?;

    Ok((discarded.len(), reverted))
}

impl<S: IndexStore> Indexer<S> {
    pub fn open(store: S) -> Result<Self, IndexError> {
        let committed_slot = SlotCache::default();

        if let Some(status) = store.read_status()? {
            committed_slot.reset(status.committed_slot);
        }

        Ok(Self {
            store,
            committed_slot,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Last committed slot as seen by this instance.
    pub fn committed_slot(&self) -> SlotIndex {
        self.committed_slot.get()
    }

    pub fn status(&self) -> Result<Status, IndexError> {
        self.store.read_status()?.ok_or(IndexError::StatusNotFound)
    }

    pub fn resolve_multi_address(&self, id: &[u8]) -> Result<MultiAddress, IndexError> {
        self.store
            .read_multi_address(id)?
            .ok_or_else(|| IndexError::MultiAddressNotFound(hex::encode(id)))
    }

    /// Drops every table and forgets the committed slot.
    pub fn clear(&self) -> Result<(), IndexError> {
        self.store.clear()?;
        self.committed_slot.reset(0);

        info!("indexer cleared");

        Ok(())
    }

    /// Starts a bulk load of unspent outputs. The store must not receive
    /// ledger updates until the import is finalized.
    pub fn import_transaction(&self) -> Result<ImportTransaction<S::Writer>, IndexError> {
        let writer = self.store.start_import()?;
        Ok(ImportTransaction::new(writer, self.committed_slot.clone()))
    }

    /// Applies an accepted update as tentative state.
    #[instrument(skip_all, fields(slot = update.slot))]
    pub fn accept_ledger_update(&self, update: &LedgerUpdate) -> Result<(), IndexError> {
        let committed_slot = self.committed_slot.get();

        if update.slot <= committed_slot {
            return Err(IndexError::LedgerUpdateSkipped {
                slot: update.slot,
                committed_slot,
            });
        }

        let (spent, created) = net_changes(update);

        let writer = self.store.start_writer()?;

        for output in spent.iter() {
            mark_spent(&writer, output)?;
        }

        for output in created.iter() {
            insert_output(&writer, output, false)?;
        }

        writer.commit()?;

        debug!(
            consumed = spent.len(),
            created = created.len(),
            "accepted ledger update"
        );

        Ok(())
    }

    /// Applies the authoritative update for a slot in a single transaction.
    #[instrument(skip_all, fields(slot = update.slot))]
    pub fn commit_ledger_update(&self, update: &LedgerUpdate) -> Result<(), IndexError> {
        let committed_slot = self.committed_slot.get();

        if update.slot < committed_slot {
            return Err(IndexError::LedgerUpdateSkipped {
                slot: update.slot,
                committed_slot,
            });
        }

        let writer = self.store.start_writer()?;

        let mut status = writer.read_status()?.ok_or(IndexError::StatusNotFound)?;

        if update.slot < status.committed_slot {
            return Err(IndexError::LedgerUpdateSkipped {
                slot: update.slot,
                committed_slot: status.committed_slot,
            });
        }

        let (discarded, reverted) = remove_uncommitted_up_to(&writer, update.slot)?;

        let (spent, created) = net_changes(update);

        for output in spent.iter() {
            remove_spent(&writer, output)?;
        }

        for output in created.iter() {
            insert_output(&writer, output, true)?;
        }

        status.committed_slot = update.slot;
        writer.write_status(&status)?;

        writer.commit()?;

        self.committed_slot.advance(update.slot);

        debug!(
            consumed = spent.len(),
            created = created.len(),
            discarded,
            reverted,
            "committed ledger update"
        );

        Ok(())
    }

    /// Wipes every tentative row and reverts every tentative deletion.
    pub fn remove_uncommitted_changes(&self) -> Result<(), IndexError> {
        let writer = self.store.start_writer()?;

        let (discarded, reverted) = remove_uncommitted_up_to(&writer, MAX_SLOT_INDEX)?;
        let purged = writer.purge_orphans()?;

        writer.commit()?;

        info!(discarded, reverted, purged, "removed uncommitted changes");

        Ok(())
    }
}
