//! Conversion of ledger outputs into the typed records the index stores.
//!
//! Records keep only what the filters need: addresses in their canonical key
//! form, presence markers and slots. The full output payload is never
//! persisted.

use serde::{Deserialize, Serialize};

use crate::{
    AccountId, Address, AddressKey, AnchorId, BaseToken, CodecError, DelegationId, FoundryId,
    LedgerOutput, NativeTokenId, NftId, Output, OutputId, OutputKind, SlotIndex, SortKey,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub output_id: OutputId,
    pub amount: BaseToken,
    pub created_at_slot: SlotIndex,
    pub deleted_at_slot: SlotIndex,
    pub committed: bool,
}

impl RecordMeta {
    fn new(
        output_id: OutputId,
        amount: BaseToken,
        created_at_slot: SlotIndex,
        committed: bool,
    ) -> Self {
        Self {
            output_id,
            amount,
            created_at_slot,
            deleted_at_slot: 0,
            committed,
        }
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at_slot == 0
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey {
            slot: self.created_at_slot,
            output_id: self.output_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicRecord {
    pub meta: RecordMeta,
    pub address: AddressKey,
    pub sender: Option<AddressKey>,
    pub tag: Option<Vec<u8>>,
    pub native_token: Option<NativeTokenId>,
    pub storage_deposit_return: Option<BaseToken>,
    pub storage_deposit_return_address: Option<AddressKey>,
    pub timelock_slot: Option<SlotIndex>,
    pub expiration_slot: Option<SlotIndex>,
    pub expiration_return_address: Option<AddressKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub meta: RecordMeta,
    pub account_id: AccountId,
    pub address: AddressKey,
    pub issuer: Option<AddressKey>,
    pub sender: Option<AddressKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub meta: RecordMeta,
    pub anchor_id: AnchorId,
    pub state_controller: AddressKey,
    pub governor: AddressKey,
    pub issuer: Option<AddressKey>,
    pub sender: Option<AddressKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftRecord {
    pub meta: RecordMeta,
    pub nft_id: NftId,
    pub address: AddressKey,
    pub issuer: Option<AddressKey>,
    pub sender: Option<AddressKey>,
    pub tag: Option<Vec<u8>>,
    pub storage_deposit_return: Option<BaseToken>,
    pub storage_deposit_return_address: Option<AddressKey>,
    pub timelock_slot: Option<SlotIndex>,
    pub expiration_slot: Option<SlotIndex>,
    pub expiration_return_address: Option<AddressKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundryRecord {
    pub meta: RecordMeta,
    pub foundry_id: FoundryId,
    pub account_address: AddressKey,
    pub native_token: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub meta: RecordMeta,
    pub delegation_id: DelegationId,
    pub address: AddressKey,
    pub validator: AddressKey,
}

/// One indexed output, shaped by its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputRecord {
    Basic(BasicRecord),
    Account(AccountRecord),
    Anchor(AnchorRecord),
    Foundry(FoundryRecord),
    Nft(NftRecord),
    Delegation(DelegationRecord),
}

impl OutputRecord {
    pub fn kind(&self) -> OutputKind {
        match self {
            OutputRecord::Basic(_) => OutputKind::Basic,
            OutputRecord::Account(_) => OutputKind::Account,
            OutputRecord::Anchor(_) => OutputKind::Anchor,
            OutputRecord::Foundry(_) => OutputKind::Foundry,
            OutputRecord::Nft(_) => OutputKind::Nft,
            OutputRecord::Delegation(_) => OutputKind::Delegation,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            OutputRecord::Basic(x) => &x.meta,
            OutputRecord::Account(x) => &x.meta,
            OutputRecord::Anchor(x) => &x.meta,
            OutputRecord::Foundry(x) => &x.meta,
            OutputRecord::Nft(x) => &x.meta,
            OutputRecord::Delegation(x) => &x.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            OutputRecord::Basic(x) => &mut x.meta,
            OutputRecord::Account(x) => &mut x.meta,
            OutputRecord::Anchor(x) => &mut x.meta,
            OutputRecord::Foundry(x) => &mut x.meta,
            OutputRecord::Nft(x) => &mut x.meta,
            OutputRecord::Delegation(x) => &mut x.meta,
        }
    }

    pub fn output_id(&self) -> &OutputId {
        &self.meta().output_id
    }

    pub fn sort_key(&self) -> SortKey {
        self.meta().sort_key()
    }

    /// Bytes of the kind's chain identifier; Basic outputs have none.
    pub fn identity_key(&self) -> Option<Vec<u8>> {
        match self {
            OutputRecord::Basic(_) => None,
            OutputRecord::Account(x) => Some(x.account_id.as_bytes().to_vec()),
            OutputRecord::Anchor(x) => Some(x.anchor_id.as_bytes().to_vec()),
            OutputRecord::Foundry(x) => Some(x.foundry_id.as_bytes().to_vec()),
            OutputRecord::Nft(x) => Some(x.nft_id.as_bytes().to_vec()),
            OutputRecord::Delegation(x) => Some(x.delegation_id.as_bytes().to_vec()),
        }
    }

    /// Distinct address keys present on the record, in sorted order.
    pub fn address_keys(&self) -> Vec<&[u8]> {
        let mut keys: Vec<&[u8]> = match self {
            OutputRecord::Basic(x) => [
                Some(&x.address),
                x.sender.as_ref(),
                x.storage_deposit_return_address.as_ref(),
                x.expiration_return_address.as_ref(),
            ]
            .into_iter()
            .flatten()
            .map(Vec::as_slice)
            .collect(),
            OutputRecord::Account(x) => [Some(&x.address), x.issuer.as_ref(), x.sender.as_ref()]
                .into_iter()
                .flatten()
                .map(Vec::as_slice)
                .collect(),
            OutputRecord::Anchor(x) => [
                Some(&x.state_controller),
                Some(&x.governor),
                x.issuer.as_ref(),
                x.sender.as_ref(),
            ]
            .into_iter()
            .flatten()
            .map(Vec::as_slice)
            .collect(),
            OutputRecord::Foundry(x) => vec![x.account_address.as_slice()],
            OutputRecord::Nft(x) => [
                Some(&x.address),
                x.issuer.as_ref(),
                x.sender.as_ref(),
                x.storage_deposit_return_address.as_ref(),
                x.expiration_return_address.as_ref(),
            ]
            .into_iter()
            .flatten()
            .map(Vec::as_slice)
            .collect(),
            OutputRecord::Delegation(x) => vec![x.address.as_slice(), x.validator.as_slice()],
        };

        keys.sort();
        keys.dedup();
        keys
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        Ok(bincode::deserialize(raw)?)
    }
}

fn key(address: &Address) -> AddressKey {
    address.id()
}

fn required<'a>(
    address: Option<&'a Address>,
    condition: &'static str,
) -> Result<&'a Address, CodecError> {
    address.ok_or(CodecError::MissingUnlockCondition(condition))
}

fn non_empty(tag: Option<&[u8]>) -> Option<Vec<u8>> {
    tag.filter(|t| !t.is_empty()).map(<[u8]>::to_vec)
}

/// Builds the typed record for `output`.
pub fn entry_for_output(
    output_id: OutputId,
    output: &Output,
    booked_at: SlotIndex,
    committed: bool,
) -> Result<OutputRecord, CodecError> {
    let meta = RecordMeta::new(output_id, output.amount(), booked_at, committed);

    let record = match output {
        Output::Basic(basic) => {
            let conditions = &basic.unlock_conditions;
            let features = &basic.features;
            let sdr = conditions.storage_deposit_return();
            let expiration = conditions.expiration();

            OutputRecord::Basic(BasicRecord {
                meta,
                address: key(required(conditions.address(), "address")?),
                sender: features.sender().map(key),
                tag: non_empty(features.tag()),
                native_token: features.native_token().map(|(id, _)| *id),
                storage_deposit_return: sdr.map(|(_, amount)| amount),
                storage_deposit_return_address: sdr.map(|(address, _)| key(address)),
                timelock_slot: conditions.timelock(),
                expiration_slot: expiration.map(|(_, slot)| slot),
                expiration_return_address: expiration.map(|(address, _)| key(address)),
            })
        }
        Output::Account(account) => {
            let conditions = &account.unlock_conditions;

            OutputRecord::Account(AccountRecord {
                meta,
                account_id: account.account_id.or_from_output_id(&output_id),
                address: key(required(conditions.address(), "address")?),
                issuer: account.immutable_features.issuer().map(key),
                sender: account.features.sender().map(key),
            })
        }
        Output::Anchor(anchor) => {
            let conditions = &anchor.unlock_conditions;

            OutputRecord::Anchor(AnchorRecord {
                meta,
                anchor_id: anchor.anchor_id.or_from_output_id(&output_id),
                state_controller: key(required(conditions.state_controller(), "state controller")?),
                governor: key(required(conditions.governor(), "governor")?),
                issuer: anchor.immutable_features.issuer().map(key),
                sender: anchor.features.sender().map(key),
            })
        }
        Output::Foundry(foundry) => {
            let account = required(
                foundry.unlock_conditions.immutable_account(),
                "immutable account",
            )?;

            let Address::Account(account_id) = account else {
                return Err(CodecError::InvalidAddress(format!(
                    "foundry controlled by non-account address kind {}",
                    account.kind()
                )));
            };

            OutputRecord::Foundry(FoundryRecord {
                meta,
                foundry_id: FoundryId::build(
                    account_id,
                    foundry.serial_number,
                    foundry.token_scheme.kind(),
                ),
                account_address: key(account),
                native_token: foundry.features.native_token().is_some(),
            })
        }
        Output::Nft(nft) => {
            let conditions = &nft.unlock_conditions;
            let sdr = conditions.storage_deposit_return();
            let expiration = conditions.expiration();

            OutputRecord::Nft(NftRecord {
                meta,
                nft_id: nft.nft_id.or_from_output_id(&output_id),
                address: key(required(conditions.address(), "address")?),
                issuer: nft.immutable_features.issuer().map(key),
                sender: nft.features.sender().map(key),
                tag: non_empty(nft.features.tag()),
                storage_deposit_return: sdr.map(|(_, amount)| amount),
                storage_deposit_return_address: sdr.map(|(address, _)| key(address)),
                timelock_slot: conditions.timelock(),
                expiration_slot: expiration.map(|(_, slot)| slot),
                expiration_return_address: expiration.map(|(address, _)| key(address)),
            })
        }
        Output::Delegation(delegation) => OutputRecord::Delegation(DelegationRecord {
            meta,
            delegation_id: delegation.delegation_id.or_from_output_id(&output_id),
            address: key(required(delegation.unlock_conditions.address(), "address")?),
            validator: Address::Account(delegation.validator_address).id(),
        }),
    };

    Ok(record)
}

pub fn entry_for_ledger_output(
    output: &LedgerOutput,
    committed: bool,
) -> Result<OutputRecord, CodecError> {
    entry_for_output(output.output_id, &output.output, output.booked_at, committed)
}

/// Every address referenced anywhere in the output: unlock conditions,
/// features, immutable features and the delegation validator.
pub fn addresses_in_output(output: &Output) -> Vec<Address> {
    let mut out: Vec<Address> = output.unlock_conditions().addresses().cloned().collect();

    if let Some(features) = output.features() {
        out.extend(features.addresses().cloned());
    }

    if let Some(features) = output.immutable_features() {
        out.extend(features.addresses().cloned());
    }

    if let Output::Delegation(delegation) = output {
        out.push(Address::Account(delegation.validator_address));
    }

    out
}
