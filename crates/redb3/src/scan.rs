use ledgerdex_core::{OutputId, OutputRecord, ScanDriver, ScanOutcome, ScanSource, SortKey};
use redb::{ReadOnlyTable, ReadTransaction, TableDefinition};

use crate::{
    tables::{
        sort_key_from, sorted_key, KindTables, LookupKey, OutputKey, SortedKey, StatusTable,
        MAX_OUTPUT_KEY, MIN_OUTPUT_KEY,
    },
    Error,
};

/// Accumulates the rows of one source until the limit is reached.
struct Collector<'a, 'p> {
    outputs: ReadOnlyTable<OutputKey, &'static [u8]>,
    source: &'a ScanSource<'p>,
    limit: Option<usize>,
    rows: Vec<SortKey>,
}

impl Collector<'_, '_> {
    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.rows.len() >= limit)
    }

    /// Checks a candidate against the predicate. Returns false once no
    /// more rows are wanted.
    fn offer(&mut self, key: SortKey) -> Result<bool, Error> {
        if self.is_full() {
            return Ok(false);
        }

        let Some(raw) = self.outputs.get(key.output_id.as_bytes())? else {
            return Ok(true);
        };

        let record = OutputRecord::decode(raw.value())?;

        if (self.source.predicate)(&record) {
            self.rows.push(key);
        }

        Ok(!self.is_full())
    }
}

/// Seeks to the first row of `key` at or after `from` and walks the rows
/// sharing that key in sort order.
fn walk_lookup(
    rx: &ReadTransaction,
    def: TableDefinition<'static, LookupKey, ()>,
    key: &[u8],
    from: Option<&SortKey>,
    collector: &mut Collector<'_, '_>,
) -> Result<(), Error> {
    let table = rx.open_table(def)?;

    let (slot, id) = match from {
        Some(from) => sorted_key(from),
        None => (0, &MIN_OUTPUT_KEY),
    };

    let lower = (key, slot, id);
    let upper = (key, u32::MAX, &MAX_OUTPUT_KEY);

    for entry in table.range::<(&[u8], u32, &[u8; OutputId::LENGTH])>(lower..=upper)? {
        let (row, _) = entry?;
        let (_, slot, id) = row.value();

        if !collector.offer(sort_key_from((slot, id)))? {
            break;
        }
    }

    Ok(())
}

fn scan_source(
    rx: &ReadTransaction,
    source: &ScanSource<'_>,
    from: Option<&SortKey>,
    limit: Option<usize>,
) -> Result<Vec<SortKey>, Error> {
    let tables = KindTables::of(source.kind);

    let mut collector = Collector {
        outputs: rx.open_table(tables.outputs)?,
        source,
        limit,
        rows: vec![],
    };

    if limit == Some(0) {
        return Ok(collector.rows);
    }

    match &source.driver {
        ScanDriver::All => {
            let by_slot = rx.open_table(tables.by_slot)?;

            let range = match from {
                Some(from) => by_slot.range::<(u32, &[u8; OutputId::LENGTH])>(sorted_key(from)..)?,
                None => by_slot.range::<SortedKey>(..)?,
            };

            for entry in range {
                let (key, _) = entry?;

                if !collector.offer(sort_key_from(key.value()))? {
                    break;
                }
            }
        }
        ScanDriver::Address(address) => {
            walk_lookup(rx, tables.by_address, address, from, &mut collector)?;
        }
        ScanDriver::Identity(identity) => {
            walk_lookup(rx, tables.by_identity, identity, from, &mut collector)?;
        }
    }

    Ok(collector.rows)
}

/// Runs every source against the same read transaction, so rows and the
/// committed slot come from one snapshot.
pub fn scan(
    rx: &ReadTransaction,
    sources: &[ScanSource<'_>],
    from: Option<&SortKey>,
    limit: Option<usize>,
) -> Result<ScanOutcome, Error> {
    let rows = sources
        .iter()
        .map(|source| scan_source(rx, source, from, limit))
        .collect::<Result<Vec<_>, _>>()?;

    let committed_slot = StatusTable::read_rx(rx)?.map(|status| status.committed_slot);

    Ok(ScanOutcome {
        rows,
        committed_slot,
    })
}
