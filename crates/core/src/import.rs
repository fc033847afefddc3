//! Bulk load of the unspent output set.
//!
//! The import runs inside one long-lived writer with secondary indexes
//! dropped; they are rebuilt once from the primary rows when the import is
//! finalized. Every imported row is committed and live.

use rayon::prelude::*;
use tracing::{info, instrument};

use crate::{
    addresses_in_output, entry_for_ledger_output, indexer::SlotCache, IndexError, IndexWriter,
    LedgerOutput, SlotIndex, Status, DATABASE_VERSION,
};

const PROGRESS_INTERVAL: u64 = 100_000;

pub struct ImportTransaction<W: IndexWriter> {
    writer: W,
    committed_slot: SlotCache,
    max_slot: SlotIndex,
    imported: u64,
}

impl<W: IndexWriter> ImportTransaction<W> {
    pub(crate) fn new(writer: W, committed_slot: SlotCache) -> Self {
        Self {
            writer,
            committed_slot,
            max_slot: 0,
            imported: 0,
        }
    }

    pub fn imported(&self) -> u64 {
        self.imported
    }

    fn track(&mut self, booked_at: SlotIndex) {
        self.max_slot = self.max_slot.max(booked_at);
        self.imported += 1;

        if self.imported % PROGRESS_INTERVAL == 0 {
            info!(imported = self.imported, "importing unspent outputs");
        }
    }

    pub fn add_output(&mut self, output: &LedgerOutput) -> Result<(), IndexError> {
        let record = entry_for_ledger_output(output, true)?;

        self.writer.write_output(&record)?;
        self.writer
            .record_references(&output.output_id, &addresses_in_output(&output.output))?;

        self.track(output.booked_at);

        Ok(())
    }

    /// Adds a batch of outputs, encoding the records in parallel.
    pub fn add_outputs(&mut self, outputs: &[LedgerOutput]) -> Result<(), IndexError> {
        let prepared = outputs
            .par_iter()
            .map(|output| -> Result<_, IndexError> {
                let record = entry_for_ledger_output(output, true)?;
                Ok((record, addresses_in_output(&output.output)))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        for (record, addresses) in prepared {
            self.writer.write_output(&record)?;
            self.writer
                .record_references(record.output_id(), &addresses)?;

            self.track(record.meta().created_at_slot);
        }

        Ok(())
    }

    /// Rebuilds the indexes, stamps the status and commits the import.
    ///
    /// The committed slot is the highest of `ledger_slot` and every booking
    /// slot seen during the import.
    #[instrument(skip_all, fields(slot = ledger_slot))]
    pub fn finalize(
        self,
        ledger_slot: SlotIndex,
        protocol_version: u8,
        network_name: &str,
    ) -> Result<Status, IndexError> {
        info!(imported = self.imported, "finished insertion, rebuilding indexes");

        self.writer.build_indexes()?;

        let status = Status {
            committed_slot: ledger_slot.max(self.max_slot),
            protocol_version,
            network_name: network_name.to_string(),
            database_version: DATABASE_VERSION,
        };

        self.writer.write_status(&status)?;
        self.writer.commit()?;

        self.committed_slot.reset(status.committed_slot);

        info!(
            committed_slot = status.committed_slot,
            imported = self.imported,
            "import finalized"
        );

        Ok(status)
    }
}
