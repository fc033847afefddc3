use ledgerdex_core::{multi_addresses, Address, CodecError, MultiAddress, OutputId};
use redb::{
    MultimapTableDefinition, ReadTransaction, ReadableMultimapTable as _, ReadableTable as _,
    ReadableTableMetadata as _, TableDefinition, WriteTransaction,
};

use crate::{tables::OutputKey, Error};

/// Multi address definitions keyed by their reference id, together with the
/// outputs referencing each of them.
///
/// A definition lives exactly as long as at least one stored output refers
/// to it. References are tracked in both directions so that releasing an
/// output doesn't require decoding it again.
pub struct MultiAddressTable;

impl MultiAddressTable {
    pub const DEF: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("multiaddresses");

    pub const REFS: MultimapTableDefinition<'static, &'static [u8], OutputKey> =
        MultimapTableDefinition::new("multiaddress-refs");

    pub const BY_OUTPUT: MultimapTableDefinition<'static, OutputKey, &'static [u8]> =
        MultimapTableDefinition::new("multiaddress-by-output");

    pub fn initialize(wx: &WriteTransaction) -> Result<(), Error> {
        wx.open_table(Self::DEF)?;
        wx.open_multimap_table(Self::REFS)?;
        wx.open_multimap_table(Self::BY_OUTPUT)?;

        Ok(())
    }

    pub fn delete(wx: &WriteTransaction) -> Result<(), Error> {
        wx.delete_table(Self::DEF)?;
        wx.delete_multimap_table(Self::REFS)?;
        wx.delete_multimap_table(Self::BY_OUTPUT)?;

        Ok(())
    }

    fn decode(raw: &[u8]) -> Result<MultiAddress, Error> {
        match Address::from_bytes(raw)? {
            Address::Multi(multi) => Ok(multi),
            other => Err(CodecError::InvalidAddress(format!(
                "expected a multi address definition, found kind {}",
                other.kind()
            ))
            .into()),
        }
    }

    pub fn read(rx: &ReadTransaction, id: &[u8]) -> Result<Option<MultiAddress>, Error> {
        let table = rx.open_table(Self::DEF)?;

        let multi = match table.get(id)? {
            Some(raw) => Some(Self::decode(raw.value())?),
            None => None,
        };

        Ok(multi)
    }

    pub fn record_references(
        wx: &WriteTransaction,
        output_id: &OutputId,
        addresses: &[Address],
    ) -> Result<(), Error> {
        let found = multi_addresses(addresses);

        if found.is_empty() {
            return Ok(());
        }

        let mut defs = wx.open_table(Self::DEF)?;
        let mut refs = wx.open_multimap_table(Self::REFS)?;
        let mut by_output = wx.open_multimap_table(Self::BY_OUTPUT)?;

        for (id, multi) in found {
            if defs.get(id.as_slice())?.is_none() {
                defs.insert(id.as_slice(), multi.to_bytes().as_slice())?;
            }

            refs.insert(id.as_slice(), output_id.as_bytes())?;
            by_output.insert(output_id.as_bytes(), id.as_slice())?;
        }

        Ok(())
    }

    pub fn release_references(wx: &WriteTransaction, output_id: &OutputId) -> Result<usize, Error> {
        let mut by_output = wx.open_multimap_table(Self::BY_OUTPUT)?;

        let mut ids = vec![];

        for entry in by_output.remove_all(output_id.as_bytes())? {
            ids.push(entry?.value().to_vec());
        }

        drop(by_output);

        let mut defs = wx.open_table(Self::DEF)?;
        let mut refs = wx.open_multimap_table(Self::REFS)?;

        let mut deleted = 0;

        for id in ids {
            refs.remove(id.as_slice(), output_id.as_bytes())?;

            if refs.get(id.as_slice())?.next().is_none() {
                defs.remove(id.as_slice())?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    pub fn purge_orphans(wx: &WriteTransaction) -> Result<usize, Error> {
        let mut defs = wx.open_table(Self::DEF)?;
        let refs = wx.open_multimap_table(Self::REFS)?;

        let mut orphans = vec![];

        for entry in defs.iter()? {
            let (id, _) = entry?;

            if refs.get(id.value())?.next().is_none() {
                orphans.push(id.value().to_vec());
            }
        }

        for id in orphans.iter() {
            defs.remove(id.as_slice())?;
        }

        Ok(orphans.len())
    }

    pub fn len(rx: &ReadTransaction) -> Result<u64, Error> {
        let table = rx.open_table(Self::DEF)?;
        let len = table.len()?;

        Ok(len)
    }
}
