use ledgerdex_core::{OutputId, OutputKind, OutputRecord, SlotIndex, SortKey, Status};
use redb::{
    ReadTransaction, ReadableTable as _, ReadableTableMetadata as _, TableDefinition, TableStats,
    WriteTransaction,
};

use crate::Error;

pub type OutputKey = &'static [u8; OutputId::LENGTH];
pub type SortedKey = (u32, OutputKey);
pub type TrackedKey = (u32, u8, OutputKey);

/// Lookup key, then the sort key of the row, so that rows sharing a lookup
/// key are stored in query order.
pub type LookupKey = (&'static [u8], u32, OutputKey);

pub(crate) const MIN_OUTPUT_KEY: [u8; OutputId::LENGTH] = [0x00; OutputId::LENGTH];
pub(crate) const MAX_OUTPUT_KEY: [u8; OutputId::LENGTH] = [0xff; OutputId::LENGTH];

pub(crate) fn sorted_key(key: &SortKey) -> (u32, &[u8; OutputId::LENGTH]) {
    (key.slot, key.output_id.as_bytes())
}

pub(crate) fn sort_key_from((slot, id): (u32, &[u8; OutputId::LENGTH])) -> SortKey {
    SortKey::new(slot, OutputId::new(*id))
}

/// Tables holding the rows of a single output kind.
#[derive(Clone, Copy)]
pub struct KindTables {
    pub kind: OutputKind,
    pub outputs: TableDefinition<'static, OutputKey, &'static [u8]>,
    pub by_slot: TableDefinition<'static, SortedKey, ()>,
    pub by_address: TableDefinition<'static, LookupKey, ()>,
    pub by_identity: TableDefinition<'static, LookupKey, ()>,
}

impl KindTables {
    const fn new(
        kind: OutputKind,
        outputs: &'static str,
        by_slot: &'static str,
        by_address: &'static str,
        by_identity: &'static str,
    ) -> Self {
        Self {
            kind,
            outputs: TableDefinition::new(outputs),
            by_slot: TableDefinition::new(by_slot),
            by_address: TableDefinition::new(by_address),
            by_identity: TableDefinition::new(by_identity),
        }
    }

    pub const ALL: [KindTables; 6] = [
        KindTables::new(
            OutputKind::Basic,
            "basic-outputs",
            "basic-by-slot",
            "basic-by-address",
            "basic-by-identity",
        ),
        KindTables::new(
            OutputKind::Account,
            "account-outputs",
            "account-by-slot",
            "account-by-address",
            "account-by-identity",
        ),
        KindTables::new(
            OutputKind::Anchor,
            "anchor-outputs",
            "anchor-by-slot",
            "anchor-by-address",
            "anchor-by-identity",
        ),
        KindTables::new(
            OutputKind::Foundry,
            "foundry-outputs",
            "foundry-by-slot",
            "foundry-by-address",
            "foundry-by-identity",
        ),
        KindTables::new(
            OutputKind::Nft,
            "nft-outputs",
            "nft-by-slot",
            "nft-by-address",
            "nft-by-identity",
        ),
        KindTables::new(
            OutputKind::Delegation,
            "delegation-outputs",
            "delegation-by-slot",
            "delegation-by-address",
            "delegation-by-identity",
        ),
    ];

    pub fn of(kind: OutputKind) -> &'static KindTables {
        let idx = match kind {
            OutputKind::Basic => 0,
            OutputKind::Account => 1,
            OutputKind::Anchor => 2,
            OutputKind::Foundry => 3,
            OutputKind::Nft => 4,
            OutputKind::Delegation => 5,
        };

        &Self::ALL[idx]
    }

    pub fn initialize(&self, wx: &WriteTransaction) -> Result<(), Error> {
        wx.open_table(self.outputs)?;
        self.initialize_indexes(wx)?;

        Ok(())
    }

    pub fn initialize_indexes(&self, wx: &WriteTransaction) -> Result<(), Error> {
        wx.open_table(self.by_slot)?;
        wx.open_table(self.by_address)?;
        wx.open_table(self.by_identity)?;

        Ok(())
    }

    pub fn delete_indexes(&self, wx: &WriteTransaction) -> Result<(), Error> {
        wx.delete_table(self.by_slot)?;
        wx.delete_table(self.by_address)?;
        wx.delete_table(self.by_identity)?;

        Ok(())
    }

    pub fn delete(&self, wx: &WriteTransaction) -> Result<(), Error> {
        wx.delete_table(self.outputs)?;
        self.delete_indexes(wx)?;

        Ok(())
    }

    pub fn read_output_rx(
        &self,
        rx: &ReadTransaction,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, Error> {
        let table = rx.open_table(self.outputs)?;

        let record = match table.get(output_id.as_bytes())? {
            Some(raw) => Some(OutputRecord::decode(raw.value())?),
            None => None,
        };

        Ok(record)
    }

    pub fn read_output(
        &self,
        wx: &WriteTransaction,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, Error> {
        let table = wx.open_table(self.outputs)?;

        let record = match table.get(output_id.as_bytes())? {
            Some(raw) => Some(OutputRecord::decode(raw.value())?),
            None => None,
        };

        Ok(record)
    }

    pub fn write_output(&self, wx: &WriteTransaction, record: &OutputRecord) -> Result<(), Error> {
        let mut table = wx.open_table(self.outputs)?;
        let raw = record.encode()?;

        table.insert(record.output_id().as_bytes(), raw.as_slice())?;

        Ok(())
    }

    pub fn remove_output(
        &self,
        wx: &WriteTransaction,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, Error> {
        let mut table = wx.open_table(self.outputs)?;

        let removed = match table.remove(output_id.as_bytes())? {
            Some(raw) => Some(OutputRecord::decode(raw.value())?),
            None => None,
        };

        Ok(removed)
    }

    /// Adds the secondary index entries of a record.
    pub fn index(&self, wx: &WriteTransaction, record: &OutputRecord) -> Result<(), Error> {
        let sort_key = record.sort_key();
        let (slot, id) = sorted_key(&sort_key);

        let mut by_slot = wx.open_table(self.by_slot)?;
        by_slot.insert((slot, id), ())?;

        let mut by_address = wx.open_table(self.by_address)?;

        for address in record.address_keys() {
            by_address.insert((address, slot, id), ())?;
        }

        if let Some(identity) = record.identity_key() {
            let mut by_identity = wx.open_table(self.by_identity)?;
            by_identity.insert((identity.as_slice(), slot, id), ())?;
        }

        Ok(())
    }

    /// Removes the secondary index entries of a record.
    pub fn unindex(&self, wx: &WriteTransaction, record: &OutputRecord) -> Result<(), Error> {
        let sort_key = record.sort_key();
        let (slot, id) = sorted_key(&sort_key);

        let mut by_slot = wx.open_table(self.by_slot)?;
        by_slot.remove((slot, id))?;

        let mut by_address = wx.open_table(self.by_address)?;

        for address in record.address_keys() {
            by_address.remove((address, slot, id))?;
        }

        if let Some(identity) = record.identity_key() {
            let mut by_identity = wx.open_table(self.by_identity)?;
            by_identity.remove((identity.as_slice(), slot, id))?;
        }

        Ok(())
    }

    /// Iterates every row of the kind in storage order.
    pub fn for_each_output(
        &self,
        wx: &WriteTransaction,
        mut f: impl FnMut(OutputRecord) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let table = wx.open_table(self.outputs)?;

        for entry in table.iter()? {
            let (_, raw) = entry?;
            f(OutputRecord::decode(raw.value())?)?;
        }

        Ok(())
    }

    pub fn stats(&self, rx: &ReadTransaction) -> Result<TableStats, Error> {
        let table = rx.open_table(self.outputs)?;
        let stats = table.stats()?;

        Ok(stats)
    }

    pub fn len(&self, rx: &ReadTransaction) -> Result<u64, Error> {
        let table = rx.open_table(self.outputs)?;
        let len = table.len()?;

        Ok(len)
    }
}

/// Rows that still depend on a future commitment, keyed by the slot that
/// makes them final.
///
/// `UncommittedTable` tracks tentative rows by booking slot, `SpentTable`
/// tracks tentative deletions by deletion slot.
pub struct TrackedTable;

impl TrackedTable {
    pub const UNCOMMITTED: TableDefinition<'static, TrackedKey, ()> =
        TableDefinition::new("uncommitted");

    pub const SPENT: TableDefinition<'static, TrackedKey, ()> = TableDefinition::new("spent");

    pub fn initialize(wx: &WriteTransaction) -> Result<(), Error> {
        wx.open_table(Self::UNCOMMITTED)?;
        wx.open_table(Self::SPENT)?;

        Ok(())
    }

    pub fn delete(wx: &WriteTransaction) -> Result<(), Error> {
        wx.delete_table(Self::UNCOMMITTED)?;
        wx.delete_table(Self::SPENT)?;

        Ok(())
    }

    fn track(
        wx: &WriteTransaction,
        def: TableDefinition<'static, TrackedKey, ()>,
        slot: SlotIndex,
        record: &OutputRecord,
    ) -> Result<(), Error> {
        let mut table = wx.open_table(def)?;
        table.insert((slot, record.kind() as u8, record.output_id().as_bytes()), ())?;

        Ok(())
    }

    fn untrack(
        wx: &WriteTransaction,
        def: TableDefinition<'static, TrackedKey, ()>,
        slot: SlotIndex,
        record: &OutputRecord,
    ) -> Result<(), Error> {
        let mut table = wx.open_table(def)?;
        table.remove((slot, record.kind() as u8, record.output_id().as_bytes()))?;

        Ok(())
    }

    pub fn index(wx: &WriteTransaction, record: &OutputRecord) -> Result<(), Error> {
        let meta = record.meta();

        if !meta.committed {
            Self::track(wx, Self::UNCOMMITTED, meta.created_at_slot, record)?;
        }

        if !meta.is_live() {
            Self::track(wx, Self::SPENT, meta.deleted_at_slot, record)?;
        }

        Ok(())
    }

    pub fn unindex(wx: &WriteTransaction, record: &OutputRecord) -> Result<(), Error> {
        let meta = record.meta();

        if !meta.committed {
            Self::untrack(wx, Self::UNCOMMITTED, meta.created_at_slot, record)?;
        }

        if !meta.is_live() {
            Self::untrack(wx, Self::SPENT, meta.deleted_at_slot, record)?;
        }

        Ok(())
    }

    /// Entries whose slot is at or before `up_to`, in slot order.
    pub fn up_to(
        wx: &WriteTransaction,
        def: TableDefinition<'static, TrackedKey, ()>,
        up_to: SlotIndex,
    ) -> Result<Vec<(OutputKind, OutputId)>, Error> {
        let table = wx.open_table(def)?;

        let mut out = vec![];

        for entry in table.range::<TrackedKey>(..=(up_to, u8::MAX, &MAX_OUTPUT_KEY))? {
            let (key, _) = entry?;
            let (_, kind, id) = key.value();

            let kind = OutputKind::try_from(kind)?;
            out.push((kind, OutputId::new(*id)));
        }

        Ok(out)
    }

    pub fn len(
        rx: &ReadTransaction,
        def: TableDefinition<'static, TrackedKey, ()>,
    ) -> Result<u64, Error> {
        let table = rx.open_table(def)?;
        let len = table.len()?;

        Ok(len)
    }
}

/// Key for the single entry in the status table.
pub const CURRENT_STATUS_KEY: u16 = 0;

pub struct StatusTable;

impl StatusTable {
    pub const DEF: TableDefinition<'static, u16, Vec<u8>> = TableDefinition::new("status");

    pub fn initialize(wx: &WriteTransaction) -> Result<(), Error> {
        wx.open_table(Self::DEF)?;

        Ok(())
    }

    pub fn delete(wx: &WriteTransaction) -> Result<(), Error> {
        wx.delete_table(Self::DEF)?;

        Ok(())
    }

    pub fn read_rx(rx: &ReadTransaction) -> Result<Option<Status>, Error> {
        let table = rx.open_table(Self::DEF)?;

        let status = match table.get(CURRENT_STATUS_KEY)? {
            Some(raw) => Some(Status::decode(&raw.value())?),
            None => None,
        };

        Ok(status)
    }

    pub fn read(wx: &WriteTransaction) -> Result<Option<Status>, Error> {
        let table = wx.open_table(Self::DEF)?;

        let status = match table.get(CURRENT_STATUS_KEY)? {
            Some(raw) => Some(Status::decode(&raw.value())?),
            None => None,
        };

        Ok(status)
    }

    pub fn write(wx: &WriteTransaction, status: &Status) -> Result<(), Error> {
        let mut table = wx.open_table(Self::DEF)?;
        table.insert(CURRENT_STATUS_KEY, status.encode()?)?;

        Ok(())
    }
}
