use std::{cell::Cell, collections::HashMap, path::Path, sync::Arc};

use ledgerdex_core::{
    Address, CodecError, IndexError, IndexStore, IndexWriter, MultiAddress, OutputId, OutputKind,
    OutputRecord, ScanOutcome, ScanSource, SlotIndex, SortKey, Status,
};
use redb::{Database, Durability, ReadableDatabase, WriteTransaction};
use tracing::{debug, warn};

mod multiaddress;
mod scan;
mod tables;

#[cfg(test)]
mod tests;

use multiaddress::MultiAddressTable;
use tables::{KindTables, StatusTable, TrackedTable};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    DatabaseError(#[from] ::redb::DatabaseError),

    #[error(transparent)]
    TransactionError(#[from] ::redb::TransactionError),

    #[error(transparent)]
    CommitError(#[from] ::redb::CommitError),

    #[error(transparent)]
    TableError(#[from] ::redb::TableError),

    #[error(transparent)]
    StorageError(#[from] ::redb::StorageError),

    #[error(transparent)]
    SetDurabilityError(#[from] ::redb::SetDurabilityError),

    #[error(transparent)]
    CodecError(#[from] CodecError),
}

impl From<Error> for IndexError {
    fn from(error: Error) -> Self {
        match error {
            Error::CodecError(e) => IndexError::Codec(e),
            e => IndexError::storage(e),
        }
    }
}

const DEFAULT_CACHE_SIZE_MB: usize = 500;

#[derive(Clone)]
pub struct OutputStore {
    db: Arc<Database>,
}

impl OutputStore {
    pub fn open(path: impl AsRef<Path>, cache_size: Option<usize>) -> Result<Self, Error> {
        let db = Database::builder()
            .set_repair_callback(|x| {
                warn!(progress = x.progress() * 100f64, "index db is repairing")
            })
            .set_cache_size(1024 * 1024 * cache_size.unwrap_or(DEFAULT_CACHE_SIZE_MB))
            .create(path)?;

        let store = Self { db: db.into() };

        store.initialize_schema()?;

        Ok(store)
    }

    pub fn in_memory() -> Result<Self, Error> {
        let db =
            Database::builder().create_with_backend(::redb::backends::InMemoryBackend::new())?;

        let store = Self { db: db.into() };

        store.initialize_schema()?;

        Ok(store)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn initialize_tables(wx: &WriteTransaction) -> Result<(), Error> {
        for tables in KindTables::ALL.iter() {
            tables.initialize(wx)?;
        }

        TrackedTable::initialize(wx)?;
        MultiAddressTable::initialize(wx)?;
        StatusTable::initialize(wx)?;

        Ok(())
    }

    pub fn initialize_schema(&self) -> Result<(), Error> {
        let mut wx = self.db().begin_write()?;
        wx.set_durability(Durability::Immediate)?;

        Self::initialize_tables(&wx)?;

        wx.commit()?;

        Ok(())
    }

    fn begin_writer(&self, defer_indexes: bool) -> Result<OutputStoreWriter, Error> {
        let mut wx = self.db().begin_write()?;
        wx.set_durability(Durability::Immediate)?;
        wx.set_quick_repair(true);

        if defer_indexes {
            for tables in KindTables::ALL.iter() {
                tables.delete_indexes(&wx)?;
            }

            TrackedTable::delete(&wx)?;
        }

        Ok(OutputStoreWriter {
            wx,
            defer_indexes: Cell::new(defer_indexes),
        })
    }

    /// Row count of every table that holds records.
    pub fn stats(&self) -> Result<HashMap<&'static str, u64>, Error> {
        let rx = self.db().begin_read()?;

        let mut stats = HashMap::new();

        for tables in KindTables::ALL.iter() {
            stats.insert(tables.kind.name(), tables.len(&rx)?);
        }

        stats.insert(
            "uncommitted",
            TrackedTable::len(&rx, TrackedTable::UNCOMMITTED)?,
        );
        stats.insert("spent", TrackedTable::len(&rx, TrackedTable::SPENT)?);
        stats.insert("multiaddresses", MultiAddressTable::len(&rx)?);

        Ok(stats)
    }

    /// Storage level stats of the primary output tables.
    pub fn table_stats(&self) -> Result<HashMap<&'static str, redb::TableStats>, Error> {
        let rx = self.db().begin_read()?;

        let mut stats = HashMap::new();

        for tables in KindTables::ALL.iter() {
            stats.insert(tables.kind.name(), tables.stats(&rx)?);
        }

        Ok(stats)
    }
}

pub struct OutputStoreWriter {
    wx: WriteTransaction,
    defer_indexes: Cell<bool>,
}

impl OutputStoreWriter {
    fn indexed(&self) -> bool {
        !self.defer_indexes.get()
    }

    fn unindex(&self, tables: &KindTables, record: &OutputRecord) -> Result<(), Error> {
        if self.indexed() {
            tables.unindex(&self.wx, record)?;
            TrackedTable::unindex(&self.wx, record)?;
        }

        Ok(())
    }

    fn index(&self, tables: &KindTables, record: &OutputRecord) -> Result<(), Error> {
        if self.indexed() {
            tables.index(&self.wx, record)?;
            TrackedTable::index(&self.wx, record)?;
        }

        Ok(())
    }

    fn write_output(&self, record: &OutputRecord) -> Result<(), Error> {
        let tables = KindTables::of(record.kind());

        if self.indexed() {
            if let Some(previous) = tables.read_output(&self.wx, record.output_id())? {
                self.unindex(tables, &previous)?;
            }
        }

        tables.write_output(&self.wx, record)?;
        self.index(tables, record)?;

        Ok(())
    }

    fn remove_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, Error> {
        let tables = KindTables::of(kind);

        let removed = tables.remove_output(&self.wx, output_id)?;

        if let Some(record) = removed.as_ref() {
            self.unindex(tables, record)?;
        }

        Ok(removed)
    }

    fn discard_uncommitted(&self, up_to: SlotIndex) -> Result<Vec<OutputId>, Error> {
        let tentative = TrackedTable::up_to(&self.wx, TrackedTable::UNCOMMITTED, up_to)?;

        let mut discarded = Vec::with_capacity(tentative.len());

        for (kind, output_id) in tentative {
            if self.remove_output(kind, &output_id)?.is_some() {
                discarded.push(output_id);
            }
        }

        Ok(discarded)
    }

    fn revert_spent(&self, up_to: SlotIndex) -> Result<usize, Error> {
        let spent = TrackedTable::up_to(&self.wx, TrackedTable::SPENT, up_to)?;

        let mut reverted = 0;

        for (kind, output_id) in spent {
            let tables = KindTables::of(kind);

            if let Some(mut record) = tables.read_output(&self.wx, &output_id)? {
                record.meta_mut().deleted_at_slot = 0;
                self.write_output(&record)?;
                reverted += 1;
            }
        }

        Ok(reverted)
    }

    fn build_indexes(&self) -> Result<(), Error> {
        TrackedTable::delete(&self.wx)?;
        TrackedTable::initialize(&self.wx)?;

        for tables in KindTables::ALL.iter() {
            tables.delete_indexes(&self.wx)?;
            tables.initialize_indexes(&self.wx)?;

            let mut count = 0u64;

            tables.for_each_output(&self.wx, |record| {
                tables.index(&self.wx, &record)?;
                TrackedTable::index(&self.wx, &record)?;
                count += 1;
                Ok(())
            })?;

            debug!(kind = %tables.kind, count, "indexes rebuilt");
        }

        self.defer_indexes.set(false);

        Ok(())
    }
}

impl IndexWriter for OutputStoreWriter {
    fn read_status(&self) -> Result<Option<Status>, IndexError> {
        Ok(StatusTable::read(&self.wx)?)
    }

    fn write_status(&self, status: &Status) -> Result<(), IndexError> {
        Ok(StatusTable::write(&self.wx, status)?)
    }

    fn read_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError> {
        Ok(KindTables::of(kind).read_output(&self.wx, output_id)?)
    }

    fn write_output(&self, record: &OutputRecord) -> Result<(), IndexError> {
        Ok(Self::write_output(self, record)?)
    }

    fn remove_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError> {
        Ok(Self::remove_output(self, kind, output_id)?)
    }

    fn discard_uncommitted(&self, up_to: SlotIndex) -> Result<Vec<OutputId>, IndexError> {
        Ok(Self::discard_uncommitted(self, up_to)?)
    }

    fn revert_spent(&self, up_to: SlotIndex) -> Result<usize, IndexError> {
        Ok(Self::revert_spent(self, up_to)?)
    }

    fn record_references(
        &self,
        output_id: &OutputId,
        addresses: &[Address],
    ) -> Result<(), IndexError> {
        Ok(MultiAddressTable::record_references(
            &self.wx, output_id, addresses,
        )?)
    }

    fn release_references(&self, output_id: &OutputId) -> Result<usize, IndexError> {
        Ok(MultiAddressTable::release_references(&self.wx, output_id)?)
    }

    fn purge_orphans(&self) -> Result<usize, IndexError> {
        Ok(MultiAddressTable::purge_orphans(&self.wx)?)
    }

    fn build_indexes(&self) -> Result<(), IndexError> {
        Ok(Self::build_indexes(self)?)
    }

    fn commit(self) -> Result<(), IndexError> {
        self.wx.commit().map_err(Error::from)?;

        Ok(())
    }
}

impl IndexStore for OutputStore {
    type Writer = OutputStoreWriter;

    fn read_status(&self) -> Result<Option<Status>, IndexError> {
        let rx = self.db().begin_read().map_err(Error::from)?;
        Ok(StatusTable::read_rx(&rx)?)
    }

    fn read_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError> {
        let rx = self.db().begin_read().map_err(Error::from)?;
        Ok(KindTables::of(kind).read_output_rx(&rx, output_id)?)
    }

    fn read_multi_address(&self, id: &[u8]) -> Result<Option<MultiAddress>, IndexError> {
        let rx = self.db().begin_read().map_err(Error::from)?;
        Ok(MultiAddressTable::read(&rx, id)?)
    }

    fn scan(
        &self,
        sources: &[ScanSource<'_>],
        from: Option<&SortKey>,
        limit: Option<usize>,
    ) -> Result<ScanOutcome, IndexError> {
        let rx = self.db().begin_read().map_err(Error::from)?;
        Ok(scan::scan(&rx, sources, from, limit)?)
    }

    fn start_writer(&self) -> Result<Self::Writer, IndexError> {
        Ok(self.begin_writer(false)?)
    }

    fn start_import(&self) -> Result<Self::Writer, IndexError> {
        Ok(self.begin_writer(true)?)
    }

    fn clear(&self) -> Result<(), IndexError> {
        let mut wx = self.db().begin_write().map_err(Error::from)?;
        wx.set_durability(Durability::Immediate)
            .map_err(Error::from)?;

        for tables in KindTables::ALL.iter() {
            tables.delete(&wx)?;
        }

        TrackedTable::delete(&wx)?;
        MultiAddressTable::delete(&wx)?;
        StatusTable::delete(&wx)?;

        Self::initialize_tables(&wx)?;

        wx.commit().map_err(Error::from)?;

        Ok(())
    }
}
