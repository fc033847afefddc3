use ledgerdex_core::{
    Address, BridgeError, IndexError, IndexStore, IndexWriter, LedgerEvent, MultiAddress,
    NodeBridge, NodeInfo, OutputId, OutputKind, OutputRecord, ScanOutcome, ScanSource, SlotIndex,
    SortKey, Status,
};

use crate::MemoryBridge;

/// Writer operation that fails when targeted by [`TestFault::WriterError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterCall {
    WriteStatus,
    WriteOutput,
    RemoveOutput,
    Commit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TestFault {
    #[default]
    None,
    NodeInfoError,
    SnapshotError,
    /// Fails the update stream after yielding this many events.
    UpdatesError(usize),
    /// Fails the lookups served to queries by the index store.
    IndexStoreError,
    /// Fails one operation of every writer handed out by the store.
    WriterError(WriterCall),
}

fn fault_err(fault: TestFault) -> std::io::Error {
    std::io::Error::other(format!("fault injection: {fault:?}"))
}

#[derive(Clone)]
pub struct FaultyBridge {
    inner: MemoryBridge,
    fault: TestFault,
}

impl FaultyBridge {
    pub fn new(inner: MemoryBridge, fault: TestFault) -> Self {
        Self { inner, fault }
    }

    fn fault_err(&self) -> BridgeError {
        BridgeError::Io(fault_err(self.fault))
    }
}

impl NodeBridge for FaultyBridge {
    type Snapshot = <MemoryBridge as NodeBridge>::Snapshot;
    type Updates = std::vec::IntoIter<Result<LedgerEvent, BridgeError>>;

    fn node_info(&self) -> Result<NodeInfo, BridgeError> {
        if self.fault == TestFault::NodeInfoError {
            return Err(self.fault_err());
        }
        self.inner.node_info()
    }

    fn unspent_outputs(&self) -> Result<Self::Snapshot, BridgeError> {
        if self.fault == TestFault::SnapshotError {
            return Err(self.fault_err());
        }
        self.inner.unspent_outputs()
    }

    fn ledger_updates(&self, from: SlotIndex) -> Result<Self::Updates, BridgeError> {
        let events = self.inner.ledger_updates(from)?;

        let TestFault::UpdatesError(after) = self.fault else {
            return Ok(events.collect::<Vec<_>>().into_iter());
        };

        let mut out: Vec<_> = events.take(after).collect();
        out.push(Err(self.fault_err()));

        Ok(out.into_iter())
    }
}

/// Wraps any index store, failing the operations selected by the fault.
#[derive(Clone)]
pub struct FaultyIndexStore<S: IndexStore> {
    inner: S,
    fault: TestFault,
}

impl<S: IndexStore> FaultyIndexStore<S> {
    pub fn new(inner: S, fault: TestFault) -> Self {
        Self { inner, fault }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn should_fault(&self) -> bool {
        matches!(self.fault, TestFault::IndexStoreError)
    }

    fn fault_err(&self) -> IndexError {
        IndexError::storage(fault_err(self.fault))
    }
}

impl<S: IndexStore> IndexStore for FaultyIndexStore<S> {
    type Writer = FaultyIndexWriter<S::Writer>;

    fn read_status(&self) -> Result<Option<Status>, IndexError> {
        self.inner.read_status()
    }

    fn read_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError> {
        self.inner.read_output(kind, output_id)
    }

    fn read_multi_address(&self, id: &[u8]) -> Result<Option<MultiAddress>, IndexError> {
        if self.should_fault() {
            return Err(self.fault_err());
        }
        self.inner.read_multi_address(id)
    }

    fn scan(
        &self,
        sources: &[ScanSource<'_>],
        from: Option<&SortKey>,
        limit: Option<usize>,
    ) -> Result<ScanOutcome, IndexError> {
        if self.should_fault() {
            return Err(self.fault_err());
        }
        self.inner.scan(sources, from, limit)
    }

    fn start_writer(&self) -> Result<Self::Writer, IndexError> {
        let inner = self.inner.start_writer()?;
        Ok(FaultyIndexWriter::new(inner, self.fault))
    }

    fn start_import(&self) -> Result<Self::Writer, IndexError> {
        let inner = self.inner.start_import()?;
        Ok(FaultyIndexWriter::new(inner, self.fault))
    }

    fn clear(&self) -> Result<(), IndexError> {
        self.inner.clear()
    }
}

pub struct FaultyIndexWriter<W: IndexWriter> {
    inner: W,
    fault: TestFault,
}

impl<W: IndexWriter> FaultyIndexWriter<W> {
    fn new(inner: W, fault: TestFault) -> Self {
        Self { inner, fault }
    }

    fn check(&self, call: WriterCall) -> Result<(), IndexError> {
        if self.fault == TestFault::WriterError(call) {
            return Err(IndexError::storage(fault_err(self.fault)));
        }
        Ok(())
    }
}

impl<W: IndexWriter> IndexWriter for FaultyIndexWriter<W> {
    fn read_status(&self) -> Result<Option<Status>, IndexError> {
        self.inner.read_status()
    }

    fn write_status(&self, status: &Status) -> Result<(), IndexError> {
        self.check(WriterCall::WriteStatus)?;
        self.inner.write_status(status)
    }

    fn read_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError> {
        self.inner.read_output(kind, output_id)
    }

    fn write_output(&self, record: &OutputRecord) -> Result<(), IndexError> {
        self.check(WriterCall::WriteOutput)?;
        self.inner.write_output(record)
    }

    fn remove_output(
        &self,
        kind: OutputKind,
        output_id: &OutputId,
    ) -> Result<Option<OutputRecord>, IndexError> {
        self.check(WriterCall::RemoveOutput)?;
        self.inner.remove_output(kind, output_id)
    }

    fn discard_uncommitted(&self, up_to: SlotIndex) -> Result<Vec<OutputId>, IndexError> {
        self.inner.discard_uncommitted(up_to)
    }

    fn revert_spent(&self, up_to: SlotIndex) -> Result<usize, IndexError> {
        self.inner.revert_spent(up_to)
    }

    fn record_references(
        &self,
        output_id: &OutputId,
        addresses: &[Address],
    ) -> Result<(), IndexError> {
        self.inner.record_references(output_id, addresses)
    }

    fn release_references(&self, output_id: &OutputId) -> Result<usize, IndexError> {
        self.inner.release_references(output_id)
    }

    fn purge_orphans(&self) -> Result<usize, IndexError> {
        self.inner.purge_orphans()
    }

    fn build_indexes(&self) -> Result<(), IndexError> {
        self.inner.build_indexes()
    }

    fn commit(self) -> Result<(), IndexError> {
        self.check(WriterCall::Commit)?;
        self.inner.commit()
    }
}
