use std::{fmt, str::FromStr};

use blake2::{digest::consts::U32, Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod address;
pub mod bootstrap;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod filters;
pub mod follow;
pub mod import;
pub mod indexer;
pub mod output;
pub mod query;
pub mod store;

pub use address::*;
pub use bootstrap::*;
pub use bridge::*;
pub use codec::*;
pub use cursor::*;
pub use filters::*;
pub use follow::*;
pub use import::*;
pub use indexer::*;
pub use output::*;
pub use query::*;
pub use store::*;

pub type SlotIndex = u32;

/// The highest slot a ledger can ever reach; used to sweep every tentative
/// change regardless of the slot it was booked at.
pub const MAX_SLOT_INDEX: SlotIndex = SlotIndex::MAX;

/// Schema version expected by this build. Stores stamped with a different
/// value must be cleared and re-imported.
pub const DATABASE_VERSION: u32 = 1;

pub type BaseToken = u64;

type Blake2b256 = Blake2b<U32>;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

macro_rules! hex_identifier {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LENGTH: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// An all-zero identifier is the on-ledger way of saying "derive
            /// me from the output that created me".
            pub fn is_empty(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let mut out = [0u8; $len];
                hex::decode_to_slice(s, &mut out)?;
                Ok(Self(out))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                use serde::de::Error as _;

                if deserializer.is_human_readable() {
                    let raw = String::deserialize(deserializer)?;
                    raw.parse().map_err(D::Error::custom)
                } else {
                    let raw = Vec::<u8>::deserialize(deserializer)?;
                    Self::from_slice(&raw).ok_or_else(|| {
                        D::Error::invalid_length(raw.len(), &stringify!($name))
                    })
                }
            }
        }
    };
}

hex_identifier!(OutputId, 38);
hex_identifier!(AccountId, 32);
hex_identifier!(AnchorId, 32);
hex_identifier!(NftId, 32);
hex_identifier!(DelegationId, 32);
hex_identifier!(FoundryId, 38);

pub type NativeTokenId = FoundryId;

impl OutputId {
    pub fn new_from_parts(transaction_id: [u8; 32], creation_slot: SlotIndex, index: u16) -> Self {
        let mut out = [0u8; Self::LENGTH];
        out[..32].copy_from_slice(&transaction_id);
        out[32..36].copy_from_slice(&creation_slot.to_le_bytes());
        out[36..].copy_from_slice(&index.to_le_bytes());
        Self(out)
    }

    pub fn transaction_id(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[..32]);
        out
    }

    pub fn creation_slot(&self) -> SlotIndex {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.0[32..36]);
        SlotIndex::from_le_bytes(raw)
    }

    pub fn index(&self) -> u16 {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(&self.0[36..]);
        u16::from_le_bytes(raw)
    }
}

macro_rules! implicit_chain_id {
    ($name:ident) => {
        impl $name {
            /// Derives the identifier of a chain output created without an
            /// explicit id.
            pub fn from_output_id(output_id: &OutputId) -> Self {
                Self(blake2b_256(output_id.as_bytes()))
            }

            /// Returns the explicit id, or the derived one when the explicit
            /// id is empty.
            pub fn or_from_output_id(self, output_id: &OutputId) -> Self {
                if self.is_empty() {
                    Self::from_output_id(output_id)
                } else {
                    self
                }
            }
        }
    };
}

implicit_chain_id!(AccountId);
implicit_chain_id!(AnchorId);
implicit_chain_id!(NftId);
implicit_chain_id!(DelegationId);

impl FoundryId {
    pub fn build(account: &AccountId, serial_number: u32, token_scheme_kind: u8) -> Self {
        let mut out = [0u8; Self::LENGTH];
        out[0] = address::ACCOUNT_ADDRESS_KIND;
        out[1..33].copy_from_slice(account.as_bytes());
        out[33..37].copy_from_slice(&serial_number.to_le_bytes());
        out[37] = token_scheme_kind;
        Self(out)
    }
}

/// Singleton describing what the index currently reflects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub committed_slot: SlotIndex,
    pub protocol_version: u8,
    pub network_name: String,
    pub database_version: u32,
}

impl Status {
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        Ok(bincode::deserialize(raw)?)
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown output kind {0}")]
    UnknownOutputKind(u8),

    #[error("payload is truncated")]
    Truncated,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("output is missing the {0} unlock condition")]
    MissingUnlockCondition(&'static str),

    #[error("malformed payload: {0}")]
    Malformed(#[from] bincode::Error),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("indexer status not found, a full import is required")]
    StatusNotFound,

    #[error("ledger update for slot {slot} skipped, already committed up to {committed_slot}")]
    LedgerUpdateSkipped {
        slot: SlotIndex,
        committed_slot: SlotIndex,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("multi address {0} not found")]
    MultiAddressNotFound(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IndexError {
    pub fn storage<T>(value: T) -> Self
    where
        T: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        IndexError::Storage(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_id_parts() {
        let id = OutputId::new_from_parts([7; 32], 42, 3);

        assert_eq!(id.transaction_id(), [7; 32]);
        assert_eq!(id.creation_slot(), 42);
        assert_eq!(id.index(), 3);
    }

    #[test]
    fn output_id_hex_parsing() {
        let id = OutputId::new_from_parts([0xab; 32], 1, 0);
        let hex = id.to_string();

        assert_eq!(hex.len(), 76);
        assert_eq!(hex.parse::<OutputId>().unwrap(), id);
        assert_eq!(format!("0x{hex}").parse::<OutputId>().unwrap(), id);
        assert!("abcd".parse::<OutputId>().is_err());
    }

    #[test]
    fn implicit_ids_resolve_to_derived_key() {
        let output_id = OutputId::new_from_parts([1; 32], 5, 0);
        let derived = AccountId::from_output_id(&output_id);

        assert!(!derived.is_empty());
        assert_eq!(AccountId::new([0; 32]).or_from_output_id(&output_id), derived);
        assert_eq!(derived.or_from_output_id(&output_id), derived);

        let explicit = AccountId::new([9; 32]);
        assert_eq!(explicit.or_from_output_id(&output_id), explicit);
    }

    #[test]
    fn identifiers_survive_both_serde_flavors() {
        let id = NftId::new([0x11; 32]);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
        assert_eq!(serde_json::from_str::<NftId>(&json).unwrap(), id);

        let raw = bincode::serialize(&id).unwrap();
        assert_eq!(bincode::deserialize::<NftId>(&raw).unwrap(), id);
    }

    #[test]
    fn foundry_id_layout() {
        let account = AccountId::new([3; 32]);
        let id = FoundryId::build(&account, 7, 0);

        assert_eq!(id.0[0], address::ACCOUNT_ADDRESS_KIND);
        assert_eq!(&id.0[1..33], account.as_bytes());
        assert_eq!(&id.0[33..37], &7u32.to_le_bytes());
        assert_eq!(id.0[37], 0);
    }
}
