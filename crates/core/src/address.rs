//! Ledger addresses and their canonical byte forms.
//!
//! Every address has two byte representations. [`Address::to_bytes`] is the
//! full serialization and round-trips through [`Address::from_bytes`].
//! [`Address::id`] is the canonical key stored on output records: it equals
//! the serialization for plain addresses, while multi addresses collapse to a
//! fixed-size digest of their definition so that records never carry the full
//! composite payload.

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{blake2b_256, AccountId, AnchorId, CodecError, NftId};

pub const ED25519_ADDRESS_KIND: u8 = 0;
pub const ACCOUNT_ADDRESS_KIND: u8 = 8;
pub const NFT_ADDRESS_KIND: u8 = 16;
pub const ANCHOR_ADDRESS_KIND: u8 = 24;
pub const IMPLICIT_ACCOUNT_CREATION_ADDRESS_KIND: u8 = 32;
pub const MULTI_ADDRESS_KIND: u8 = 40;
pub const RESTRICTED_ADDRESS_KIND: u8 = 48;

/// Canonical address bytes, as produced by [`Address::id`].
pub type AddressKey = Vec<u8>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeightedAddress {
    pub address: Address,
    pub weight: u8,
}

/// A composite address unlocked once the weights of the signing members
/// reach the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultiAddress {
    pub addresses: Vec<WeightedAddress>,
    pub threshold: u16,
}

impl MultiAddress {
    pub fn new(addresses: Vec<WeightedAddress>, threshold: u16) -> Self {
        Self {
            addresses,
            threshold,
        }
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.push(MULTI_ADDRESS_KIND);
        out.push(self.addresses.len() as u8);

        for member in &self.addresses {
            member.address.write_bytes(out);
            out.push(member.weight);
        }

        out.extend_from_slice(&self.threshold.to_le_bytes());
    }

    /// Full serialization of the definition, kind byte included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_bytes(&mut out);
        out
    }

    /// Reference key of the definition: the kind byte followed by the
    /// digest of the serialized definition.
    pub fn id(&self) -> AddressKey {
        let mut out = Vec::with_capacity(33);
        out.push(MULTI_ADDRESS_KIND);
        out.extend_from_slice(&blake2b_256(&self.to_bytes()));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestrictedAddress {
    pub address: Address,
    pub capabilities: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Ed25519([u8; 32]),
    Account(AccountId),
    Nft(NftId),
    Anchor(AnchorId),
    ImplicitAccountCreation([u8; 32]),
    Multi(MultiAddress),
    Restricted(Box<RestrictedAddress>),
}

impl Address {
    pub fn restricted(address: Address, capabilities: Vec<u8>) -> Self {
        Address::Restricted(Box::new(RestrictedAddress {
            address,
            capabilities,
        }))
    }

    pub fn kind(&self) -> u8 {
        match self {
            Address::Ed25519(_) => ED25519_ADDRESS_KIND,
            Address::Account(_) => ACCOUNT_ADDRESS_KIND,
            Address::Nft(_) => NFT_ADDRESS_KIND,
            Address::Anchor(_) => ANCHOR_ADDRESS_KIND,
            Address::ImplicitAccountCreation(_) => IMPLICIT_ACCOUNT_CREATION_ADDRESS_KIND,
            Address::Multi(_) => MULTI_ADDRESS_KIND,
            Address::Restricted(_) => RESTRICTED_ADDRESS_KIND,
        }
    }

    pub fn is_account(&self) -> bool {
        matches!(self, Address::Account(_))
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Address::Ed25519(hash) | Address::ImplicitAccountCreation(hash) => {
                out.push(self.kind());
                out.extend_from_slice(hash);
            }
            Address::Account(id) => {
                out.push(self.kind());
                out.extend_from_slice(id.as_bytes());
            }
            Address::Nft(id) => {
                out.push(self.kind());
                out.extend_from_slice(id.as_bytes());
            }
            Address::Anchor(id) => {
                out.push(self.kind());
                out.extend_from_slice(id.as_bytes());
            }
            Address::Multi(multi) => multi.write_bytes(out),
            Address::Restricted(restricted) => {
                out.push(RESTRICTED_ADDRESS_KIND);
                restricted.address.write_bytes(out);
                out.push(restricted.capabilities.len() as u8);
                out.extend_from_slice(&restricted.capabilities);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33);
        self.write_bytes(&mut out);
        out
    }

    /// Canonical key stored on records.
    pub fn id(&self) -> AddressKey {
        match self {
            Address::Multi(multi) => multi.id(),
            Address::Restricted(restricted) => {
                let mut out = vec![RESTRICTED_ADDRESS_KIND];
                out.extend(restricted.address.id());
                out.push(restricted.capabilities.len() as u8);
                out.extend_from_slice(&restricted.capabilities);
                out
            }
            _ => self.to_bytes(),
        }
    }

    /// Compares against a stored key without materializing plain keys.
    pub fn matches_key(&self, key: &[u8]) -> bool {
        let payload: &[u8] = match self {
            Address::Ed25519(hash) | Address::ImplicitAccountCreation(hash) => hash,
            Address::Account(id) => id.as_bytes(),
            Address::Nft(id) => id.as_bytes(),
            Address::Anchor(id) => id.as_bytes(),
            Address::Multi(_) | Address::Restricted(_) => return self.id() == key,
        };

        key.split_first()
            .is_some_and(|(kind, rest)| *kind == self.kind() && rest == payload)
    }

    /// The multi address this address is, or structurally wraps.
    pub fn multi_address(&self) -> Option<&MultiAddress> {
        match self {
            Address::Multi(multi) => Some(multi),
            Address::Restricted(restricted) => restricted.address.multi_address(),
            _ => None,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (address, rest) = Self::read(bytes)?;

        if !rest.is_empty() {
            return Err(CodecError::InvalidAddress(format!(
                "{} trailing bytes",
                rest.len()
            )));
        }

        Ok(address)
    }

    fn read(bytes: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (kind, rest) = bytes.split_first().ok_or(CodecError::Truncated)?;

        match *kind {
            ED25519_ADDRESS_KIND => {
                let (hash, rest) = take_hash(rest)?;
                Ok((Address::Ed25519(hash), rest))
            }
            ACCOUNT_ADDRESS_KIND => {
                let (hash, rest) = take_hash(rest)?;
                Ok((Address::Account(AccountId::new(hash)), rest))
            }
            NFT_ADDRESS_KIND => {
                let (hash, rest) = take_hash(rest)?;
                Ok((Address::Nft(NftId::new(hash)), rest))
            }
            ANCHOR_ADDRESS_KIND => {
                let (hash, rest) = take_hash(rest)?;
                Ok((Address::Anchor(AnchorId::new(hash)), rest))
            }
            IMPLICIT_ACCOUNT_CREATION_ADDRESS_KIND => {
                let (hash, rest) = take_hash(rest)?;
                Ok((Address::ImplicitAccountCreation(hash), rest))
            }
            MULTI_ADDRESS_KIND => {
                let (count, mut rest) = rest.split_first().ok_or(CodecError::Truncated)?;
                let mut addresses = Vec::with_capacity(*count as usize);

                for _ in 0..*count {
                    let (address, after) = Self::read(rest)?;
                    let (weight, after) = after.split_first().ok_or(CodecError::Truncated)?;

                    addresses.push(WeightedAddress {
                        address,
                        weight: *weight,
                    });

                    rest = after;
                }

                if rest.len() < 2 {
                    return Err(CodecError::Truncated);
                }

                let threshold = u16::from_le_bytes([rest[0], rest[1]]);

                Ok((Address::Multi(MultiAddress::new(addresses, threshold)), &rest[2..]))
            }
            RESTRICTED_ADDRESS_KIND => {
                let (address, rest) = Self::read(rest)?;
                let (len, rest) = rest.split_first().ok_or(CodecError::Truncated)?;
                let len = *len as usize;

                if rest.len() < len {
                    return Err(CodecError::Truncated);
                }

                let (capabilities, rest) = rest.split_at(len);

                Ok((Address::restricted(address, capabilities.to_vec()), rest))
            }
            other => Err(CodecError::InvalidAddress(format!(
                "unknown address kind {other}"
            ))),
        }
    }
}

fn take_hash(bytes: &[u8]) -> Result<([u8; 32], &[u8]), CodecError> {
    if bytes.len() < 32 {
        return Err(CodecError::Truncated);
    }

    let (hash, rest) = bytes.split_at(32);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash);

    Ok((out, rest))
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(s).map_err(|e| CodecError::InvalidAddress(e.to_string()))?;
        Address::from_bytes(&raw)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        if deserializer.is_human_readable() {
            let raw = String::deserialize(deserializer)?;
            raw.parse().map_err(D::Error::custom)
        } else {
            let raw = Vec::<u8>::deserialize(deserializer)?;
            Address::from_bytes(&raw).map_err(D::Error::custom)
        }
    }
}

/// Collects the distinct multi addresses among `addresses`, unwrapping
/// restricted wrappers, keyed by their reference id.
pub fn multi_addresses<'a>(
    addresses: impl IntoIterator<Item = &'a Address>,
) -> Vec<(AddressKey, &'a MultiAddress)> {
    let mut seen = HashSet::new();

    addresses
        .into_iter()
        .filter_map(Address::multi_address)
        .map(|multi| (multi.id(), multi))
        .filter(|(id, _)| seen.insert(id.clone()))
        .collect()
}
