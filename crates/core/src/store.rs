//! Storage seams of the indexer.
//!
//! The reconciliation, query and import logic lives in this crate and talks
//! to persistence exclusively through [`IndexStore`] and [`IndexWriter`].
//! Implementations must give every writer an isolated transaction and every
//! [`IndexStore::scan`] call a consistent snapshot.

use crate::{
    Address, AddressKey, IndexError, MultiAddress, OutputId, OutputKind, OutputRecord, SlotIndex,
    SortKey, Status,
};

/// Index used to enumerate candidate rows for a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDriver {
    /// Walk every row of the kind in sort order.
    All,
    /// Walk rows carrying the address key in any of their address fields.
    Address(AddressKey),
    /// Walk rows sharing a chain identifier.
    Identity(Vec<u8>),
}

pub type RecordPredicate<'a> = Box<dyn Fn(&OutputRecord) -> bool + 'a>;

/// One output kind taking part in a query.
pub struct ScanSource<'a> {
    pub kind: OutputKind,
    pub driver: ScanDriver,
    pub predicate: RecordPredicate<'a>,
}

impl<'a> ScanSource<'a> {
    pub fn new(kind: OutputKind, driver: ScanDriver, predicate: RecordPredicate<'a>) -> Self {
        Self {
            kind,
            driver,
            predicate,
        }
    }
}

/// Rows matched by a scan, one ascending list per source, together with the
/// committed slot read from the same snapshot.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub rows: Vec<Vec<SortKey>>,
    pub committed_slot: Option<SlotIndex>,
}

/// Transactional writer over the index.
///
/// Nothing written through a writer is visible to readers until
/// [`IndexWriter::commit`] succeeds; dropping a writer discards its changes.
pub trait IndexWriter {
    fn read_status(&self) -> Result<Option<Status>, IndexError>;

    fn write_status(&self, status: &Status) -> Result<(), IndexError>;

    fn read_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError>;

    /// Inserts the record, replacing any previous row with the same output
    /// id and keeping the secondary indexes in sync with it.
    fn write_output(&self, record: &OutputRecord) -> Result<(), IndexError>;

    /// Physically removes a row, returning it if it existed.
    fn remove_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError>;

    /// Removes every tentative row booked at or before `up_to`, whatever its
    /// deletion state, returning the removed output ids.
    fn discard_uncommitted(&self, up_to: SlotIndex) -> Result<Vec<OutputId>, IndexError>;

    /// Clears the deletion marker of every row deleted at or before `up_to`.
    fn revert_spent(&self, up_to: SlotIndex) -> Result<usize, IndexError>;

    /// Stores the multi addresses found among `addresses` and records that
    /// `output_id` references them.
    fn record_references(
        &self,
        output_id: &OutputId,
        addresses: &[Address],
    ) -> Result<(), IndexError>;

    /// Drops the references held by `output_id`, deleting definitions no
    /// output references anymore. Returns the number of deleted definitions.
    fn release_references(&self, output_id: &OutputId) -> Result<usize, IndexError>;

    /// Deletes every definition without references.
    fn purge_orphans(&self) -> Result<usize, IndexError>;

    /// Rebuilds all secondary indexes from the primary output rows.
    fn build_indexes(&self) -> Result<(), IndexError>;

    fn commit(self) -> Result<(), IndexError>;
}

pub trait IndexStore: Clone + Send + Sync + 'static {
    type Writer: IndexWriter;

    fn read_status(&self) -> Result<Option<Status>, IndexError>;

    fn read_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError>;

    fn read_multi_address(&self, id: &[u8]) -> Result<Option<MultiAddress>, IndexError>;

    /// Runs every source against one snapshot. Each source yields the rows
    /// whose sort key is at or after `from` and satisfy its predicate, in
    /// ascending order, stopping after `limit` rows when given.
    fn scan(
        &self,
        sources: &[ScanSource<'_>],
        from: Option<&SortKey>,
        limit: Option<usize>,
    ) -> Result<ScanOutcome, IndexError>;

    fn start_writer(&self) -> Result<Self::Writer, IndexError>;

    /// Starts a bulk-load writer. Secondary indexes are dropped and left
    /// unmaintained until [`IndexWriter::build_indexes`] runs.
    fn start_import(&self) -> Result<Self::Writer, IndexError>;

    /// Drops and recreates every table.
    fn clear(&self) -> Result<(), IndexError>;
}
