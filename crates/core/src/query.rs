use itertools::Itertools;
use serde::Serialize;

use crate::{
    AccountId, AnchorId, DelegationId, FoundryId, IndexError, IndexStore, Indexer, NftId,
    OutputId, OutputKind, OutputRecord, QueryFilter, ScanDriver, ScanSource, SlotIndex, SortKey,
};

/// A page of matching output ids, stamped with the slot it reflects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexerResult {
    pub output_ids: Vec<OutputId>,
    pub committed_slot: SlotIndex,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

fn live_by_identity<'a>(kind: OutputKind, key: Vec<u8>) -> ScanSource<'a> {
    ScanSource::new(
        kind,
        ScanDriver::Identity(key),
        Box::new(|record: &OutputRecord| record.meta().is_live()),
    )
}

impl<S: IndexStore> Indexer<S> {
    fn run_query(
        &self,
        sources: &[ScanSource<'_>],
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<IndexerResult, IndexError> {
        let from = match cursor {
            Some(_) if page_size == 0 => {
                return Err(IndexError::UnsupportedQuery(
                    "a cursor requires a page size".into(),
                ))
            }
            Some(cursor) => Some(SortKey::from_cursor(cursor)?),
            None => None,
        };

        // one extra row tells whether another page exists
        let limit = (page_size > 0).then_some(page_size as usize + 1);

        let outcome = self.store().scan(sources, from.as_ref(), limit)?;

        let mut rows: Vec<SortKey> = outcome
            .rows
            .into_iter()
            .kmerge()
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        let next_cursor = match limit {
            Some(limit) if rows.len() == limit => rows.pop().map(|key| key.to_cursor()),
            _ => None,
        };

        Ok(IndexerResult {
            output_ids: rows.into_iter().map(|key| key.output_id).collect(),
            committed_slot: outcome.committed_slot.unwrap_or_default(),
            page_size,
            next_cursor,
        })
    }

    /// Runs a filtered query for any output kind.
    pub fn query<F: QueryFilter>(&self, filter: &F) -> Result<IndexerResult, IndexError> {
        let sources = filter.scan_sources();
        self.run_query(&sources, filter.page_size(), filter.cursor())
    }

    fn by_identity(&self, kind: OutputKind, key: &[u8]) -> Result<IndexerResult, IndexError> {
        let sources = [live_by_identity(kind, key.to_vec())];
        let mut result = self.run_query(&sources, 0, None)?;

        // several rows share an identity only while a transition is in flight
        result.output_ids.truncate(1);

        Ok(result)
    }

    pub fn account_by_id(&self, id: &AccountId) -> Result<IndexerResult, IndexError> {
        self.by_identity(OutputKind::Account, id.as_bytes())
    }

    pub fn anchor_by_id(&self, id: &AnchorId) -> Result<IndexerResult, IndexError> {
        self.by_identity(OutputKind::Anchor, id.as_bytes())
    }

    pub fn nft_by_id(&self, id: &NftId) -> Result<IndexerResult, IndexError> {
        self.by_identity(OutputKind::Nft, id.as_bytes())
    }

    pub fn foundry_by_id(&self, id: &FoundryId) -> Result<IndexerResult, IndexError> {
        self.by_identity(OutputKind::Foundry, id.as_bytes())
    }

    pub fn delegation_by_id(&self, id: &DelegationId) -> Result<IndexerResult, IndexError> {
        self.by_identity(OutputKind::Delegation, id.as_bytes())
    }
}
