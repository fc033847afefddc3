//! Node bridge reading exports from the filesystem.
//!
//! The node info is a single JSON document. The snapshot and the event log
//! are JSON lines files, one [`LedgerOutput`] or [`LedgerEvent`] per line,
//! the latter in slot order.

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

use ledgerdex_core::{BridgeError, LedgerEvent, LedgerOutput, NodeBridge, NodeInfo, SlotIndex};

pub struct JsonLines<T> {
    lines: Lines<BufReader<File>>,
    _item: PhantomData<T>,
}

impl<T> JsonLines<T> {
    pub fn open(path: &Path) -> Result<Self, BridgeError> {
        let file = File::open(path)?;

        Ok(Self {
            lines: BufReader::new(file).lines(),
            _item: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Iterator for JsonLines<T> {
    type Item = Result<T, BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(x) => x,
                Err(err) => return Some(Err(err.into())),
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(BridgeError::from));
        }
    }
}

/// Events of the log at or after a given slot.
pub struct EventLog {
    inner: JsonLines<LedgerEvent>,
    from: SlotIndex,
}

impl Iterator for EventLog {
    type Item = Result<LedgerEvent, BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(event) if event.slot() < self.from => continue,
                x => return Some(x),
            }
        }
    }
}

fn missing(what: &str) -> BridgeError {
    BridgeError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no {what} file configured"),
    ))
}

#[derive(Debug, Clone, Default)]
pub struct FileBridge {
    node_info: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    events: Option<PathBuf>,
}

impl FileBridge {
    pub fn new(
        node_info: Option<PathBuf>,
        snapshot: Option<PathBuf>,
        events: Option<PathBuf>,
    ) -> Self {
        Self {
            node_info,
            snapshot,
            events,
        }
    }
}

impl NodeBridge for FileBridge {
    type Snapshot = JsonLines<LedgerOutput>;
    type Updates = EventLog;

    fn node_info(&self) -> Result<NodeInfo, BridgeError> {
        let path = self.node_info.as_ref().ok_or_else(|| missing("node info"))?;
        let file = File::open(path)?;

        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn unspent_outputs(&self) -> Result<Self::Snapshot, BridgeError> {
        let path = self.snapshot.as_ref().ok_or_else(|| missing("snapshot"))?;

        JsonLines::open(path)
    }

    fn ledger_updates(&self, from: SlotIndex) -> Result<Self::Updates, BridgeError> {
        let path = self.events.as_ref().ok_or_else(|| missing("event log"))?;

        Ok(EventLog {
            inner: JsonLines::open(path)?,
            from,
        })
    }
}
