use std::fmt;

use crate::{IndexError, OutputId, SlotIndex};

const SLOT_DIGITS: usize = 8;

/// Length of an encoded cursor: the zero-padded slot followed by the hex
/// output id.
pub const CURSOR_LENGTH: usize = SLOT_DIGITS + 2 * OutputId::LENGTH;

/// Position of a record in query order: booking slot first, output id as
/// the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub slot: SlotIndex,
    pub output_id: OutputId,
}

impl SortKey {
    pub fn new(slot: SlotIndex, output_id: OutputId) -> Self {
        Self { slot, output_id }
    }

    /// Encodes the key so that comparing cursors as strings orders them the
    /// same way as comparing the keys.
    pub fn to_cursor(&self) -> String {
        format!("{:08x}{}", self.slot, self.output_id.to_hex())
    }

    pub fn from_cursor(cursor: &str) -> Result<Self, IndexError> {
        if cursor.len() != CURSOR_LENGTH {
            return Err(IndexError::InvalidCursor(format!(
                "expected {CURSOR_LENGTH} characters, got {}",
                cursor.len()
            )));
        }

        if !cursor.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IndexError::InvalidCursor(
                "cursor must be hexadecimal".into(),
            ));
        }

        let (slot, output_id) = cursor.split_at(SLOT_DIGITS);

        let slot = SlotIndex::from_str_radix(slot, 16)
            .map_err(|e| IndexError::InvalidCursor(e.to_string()))?;

        let output_id = output_id
            .to_ascii_lowercase()
            .parse()
            .map_err(|e: hex::FromHexError| IndexError::InvalidCursor(e.to_string()))?;

        Ok(Self { slot, output_id })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cursor())
    }
}
