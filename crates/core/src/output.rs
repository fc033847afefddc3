use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{
    AccountId, Address, AnchorId, BaseToken, CodecError, DelegationId, NativeTokenId, NftId,
    OutputId, SlotIndex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Basic = 0,
    Account = 1,
    Anchor = 2,
    Foundry = 3,
    Nft = 4,
    Delegation = 5,
}

impl OutputKind {
    pub const ALL: [OutputKind; 6] = [
        OutputKind::Basic,
        OutputKind::Account,
        OutputKind::Anchor,
        OutputKind::Foundry,
        OutputKind::Nft,
        OutputKind::Delegation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OutputKind::Basic => "basic",
            OutputKind::Account => "account",
            OutputKind::Anchor => "anchor",
            OutputKind::Foundry => "foundry",
            OutputKind::Nft => "nft",
            OutputKind::Delegation => "delegation",
        }
    }
}

impl TryFrom<u8> for OutputKind {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        OutputKind::ALL
            .into_iter()
            .find(|kind| *kind as u8 == value)
            .ok_or(CodecError::UnknownOutputKind(value))
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockCondition {
    Address {
        address: Address,
    },
    StorageDepositReturn {
        return_address: Address,
        amount: BaseToken,
    },
    Timelock {
        slot: SlotIndex,
    },
    Expiration {
        return_address: Address,
        slot: SlotIndex,
    },
    StateController {
        address: Address,
    },
    Governor {
        address: Address,
    },
    ImmutableAccount {
        address: Address,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockConditions(pub Vec<UnlockCondition>);

impl UnlockConditions {
    pub fn iter(&self) -> impl Iterator<Item = &UnlockCondition> {
        self.0.iter()
    }

    pub fn address(&self) -> Option<&Address> {
        self.iter().find_map(|c| match c {
            UnlockCondition::Address { address } => Some(address),
            _ => None,
        })
    }

    pub fn storage_deposit_return(&self) -> Option<(&Address, BaseToken)> {
        self.iter().find_map(|c| match c {
            UnlockCondition::StorageDepositReturn {
                return_address,
                amount,
            } => Some((return_address, *amount)),
            _ => None,
        })
    }

    pub fn timelock(&self) -> Option<SlotIndex> {
        self.iter().find_map(|c| match c {
            UnlockCondition::Timelock { slot } => Some(*slot),
            _ => None,
        })
    }

    pub fn expiration(&self) -> Option<(&Address, SlotIndex)> {
        self.iter().find_map(|c| match c {
            UnlockCondition::Expiration {
                return_address,
                slot,
            } => Some((return_address, *slot)),
            _ => None,
        })
    }

    pub fn state_controller(&self) -> Option<&Address> {
        self.iter().find_map(|c| match c {
            UnlockCondition::StateController { address } => Some(address),
            _ => None,
        })
    }

    pub fn governor(&self) -> Option<&Address> {
        self.iter().find_map(|c| match c {
            UnlockCondition::Governor { address } => Some(address),
            _ => None,
        })
    }

    pub fn immutable_account(&self) -> Option<&Address> {
        self.iter().find_map(|c| match c {
            UnlockCondition::ImmutableAccount { address } => Some(address),
            _ => None,
        })
    }

    /// Every address carried by any condition.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.iter().filter_map(|c| match c {
            UnlockCondition::Address { address }
            | UnlockCondition::StateController { address }
            | UnlockCondition::Governor { address }
            | UnlockCondition::ImmutableAccount { address } => Some(address),
            UnlockCondition::StorageDepositReturn { return_address, .. }
            | UnlockCondition::Expiration { return_address, .. } => Some(return_address),
            UnlockCondition::Timelock { .. } => None,
        })
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Sender {
        address: Address,
    },
    Issuer {
        address: Address,
    },
    Metadata {
        #[serde_as(as = "Hex")]
        data: Vec<u8>,
    },
    Tag {
        #[serde_as(as = "Hex")]
        tag: Vec<u8>,
    },
    NativeToken {
        id: NativeTokenId,
        amount: u128,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(pub Vec<Feature>);

impl Features {
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.0.iter()
    }

    pub fn sender(&self) -> Option<&Address> {
        self.iter().find_map(|f| match f {
            Feature::Sender { address } => Some(address),
            _ => None,
        })
    }

    pub fn issuer(&self) -> Option<&Address> {
        self.iter().find_map(|f| match f {
            Feature::Issuer { address } => Some(address),
            _ => None,
        })
    }

    pub fn tag(&self) -> Option<&[u8]> {
        self.iter().find_map(|f| match f {
            Feature::Tag { tag } => Some(tag.as_slice()),
            _ => None,
        })
    }

    pub fn native_token(&self) -> Option<(&NativeTokenId, u128)> {
        self.iter().find_map(|f| match f {
            Feature::NativeToken { id, amount } => Some((id, *amount)),
            _ => None,
        })
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.iter().filter_map(|f| match f {
            Feature::Sender { address } | Feature::Issuer { address } => Some(address),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicOutput {
    pub amount: BaseToken,
    #[serde(default)]
    pub mana: u64,
    pub unlock_conditions: UnlockConditions,
    #[serde(default)]
    pub features: Features,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOutput {
    pub amount: BaseToken,
    #[serde(default)]
    pub mana: u64,
    pub account_id: AccountId,
    #[serde(default)]
    pub foundry_counter: u32,
    pub unlock_conditions: UnlockConditions,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub immutable_features: Features,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorOutput {
    pub amount: BaseToken,
    #[serde(default)]
    pub mana: u64,
    pub anchor_id: AnchorId,
    #[serde(default)]
    pub state_index: u32,
    pub unlock_conditions: UnlockConditions,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub immutable_features: Features,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScheme {
    Simple {
        minted_tokens: u128,
        melted_tokens: u128,
        maximum_supply: u128,
    },
}

impl TokenScheme {
    pub fn kind(&self) -> u8 {
        match self {
            TokenScheme::Simple { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundryOutput {
    pub amount: BaseToken,
    pub serial_number: u32,
    pub token_scheme: TokenScheme,
    pub unlock_conditions: UnlockConditions,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub immutable_features: Features,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftOutput {
    pub amount: BaseToken,
    #[serde(default)]
    pub mana: u64,
    pub nft_id: NftId,
    pub unlock_conditions: UnlockConditions,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub immutable_features: Features,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationOutput {
    pub amount: BaseToken,
    pub delegated_amount: BaseToken,
    pub delegation_id: DelegationId,
    pub validator_address: AccountId,
    pub start_epoch: u32,
    pub end_epoch: u32,
    pub unlock_conditions: UnlockConditions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    Basic(BasicOutput),
    Account(AccountOutput),
    Anchor(AnchorOutput),
    Foundry(FoundryOutput),
    Nft(NftOutput),
    Delegation(DelegationOutput),
}

impl Output {
    pub fn kind(&self) -> OutputKind {
        match self {
            Output::Basic(_) => OutputKind::Basic,
            Output::Account(_) => OutputKind::Account,
            Output::Anchor(_) => OutputKind::Anchor,
            Output::Foundry(_) => OutputKind::Foundry,
            Output::Nft(_) => OutputKind::Nft,
            Output::Delegation(_) => OutputKind::Delegation,
        }
    }

    pub fn amount(&self) -> BaseToken {
        match self {
            Output::Basic(x) => x.amount,
            Output::Account(x) => x.amount,
            Output::Anchor(x) => x.amount,
            Output::Foundry(x) => x.amount,
            Output::Nft(x) => x.amount,
            Output::Delegation(x) => x.amount,
        }
    }

    pub fn unlock_conditions(&self) -> &UnlockConditions {
        match self {
            Output::Basic(x) => &x.unlock_conditions,
            Output::Account(x) => &x.unlock_conditions,
            Output::Anchor(x) => &x.unlock_conditions,
            Output::Foundry(x) => &x.unlock_conditions,
            Output::Nft(x) => &x.unlock_conditions,
            Output::Delegation(x) => &x.unlock_conditions,
        }
    }

    pub fn features(&self) -> Option<&Features> {
        match self {
            Output::Basic(x) => Some(&x.features),
            Output::Account(x) => Some(&x.features),
            Output::Anchor(x) => Some(&x.features),
            Output::Foundry(x) => Some(&x.features),
            Output::Nft(x) => Some(&x.features),
            Output::Delegation(_) => None,
        }
    }

    pub fn immutable_features(&self) -> Option<&Features> {
        match self {
            Output::Account(x) => Some(&x.immutable_features),
            Output::Anchor(x) => Some(&x.immutable_features),
            Output::Foundry(x) => Some(&x.immutable_features),
            Output::Nft(x) => Some(&x.immutable_features),
            Output::Basic(_) | Output::Delegation(_) => None,
        }
    }

    /// Raw form: the kind byte followed by the bincode body.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let body = match self {
            Output::Basic(x) => bincode::serialize(x),
            Output::Account(x) => bincode::serialize(x),
            Output::Anchor(x) => bincode::serialize(x),
            Output::Foundry(x) => bincode::serialize(x),
            Output::Nft(x) => bincode::serialize(x),
            Output::Delegation(x) => bincode::serialize(x),
        }?;

        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(self.kind() as u8);
        out.extend(body);

        Ok(out)
    }

    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        let (kind, body) = raw.split_first().ok_or(CodecError::Truncated)?;

        let output = match OutputKind::try_from(*kind)? {
            OutputKind::Basic => Output::Basic(bincode::deserialize(body)?),
            OutputKind::Account => Output::Account(bincode::deserialize(body)?),
            OutputKind::Anchor => Output::Anchor(bincode::deserialize(body)?),
            OutputKind::Foundry => Output::Foundry(bincode::deserialize(body)?),
            OutputKind::Nft => Output::Nft(bincode::deserialize(body)?),
            OutputKind::Delegation => Output::Delegation(bincode::deserialize(body)?),
        };

        Ok(output)
    }
}

/// An output together with where it was booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOutput {
    pub output_id: OutputId,
    pub output: Output,
    pub booked_at: SlotIndex,
}

impl LedgerOutput {
    pub fn kind(&self) -> OutputKind {
        self.output.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSpent {
    pub output: LedgerOutput,
    pub spent_at: SlotIndex,
}

impl LedgerSpent {
    pub fn output_id(&self) -> &OutputId {
        &self.output.output_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerUpdate {
    pub slot: SlotIndex,
    #[serde(default)]
    pub consumed: Vec<LedgerSpent>,
    #[serde(default)]
    pub created: Vec<LedgerOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic() -> Output {
        Output::Basic(BasicOutput {
            amount: 1_000,
            mana: 0,
            unlock_conditions: UnlockConditions(vec![
                UnlockCondition::Address {
                    address: Address::Ed25519([1; 32]),
                },
                UnlockCondition::Timelock { slot: 10 },
            ]),
            features: Features(vec![Feature::Tag {
                tag: b"hello".to_vec(),
            }]),
        })
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(OutputKind::try_from(0).unwrap(), OutputKind::Basic);
        assert_eq!(OutputKind::try_from(4).unwrap(), OutputKind::Nft);
        assert_eq!(OutputKind::try_from(5).unwrap(), OutputKind::Delegation);
        assert!(matches!(
            OutputKind::try_from(6),
            Err(CodecError::UnknownOutputKind(6))
        ));
    }

    #[test]
    fn raw_payload_carries_kind() {
        let output = basic();
        let raw = output.encode().unwrap();

        assert_eq!(raw[0], OutputKind::Basic as u8);
        assert_eq!(Output::decode(&raw).unwrap(), output);
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let mut raw = basic().encode().unwrap();
        raw[0] = 42;

        assert!(matches!(
            Output::decode(&raw),
            Err(CodecError::UnknownOutputKind(42))
        ));
        assert!(matches!(Output::decode(&[]), Err(CodecError::Truncated)));
    }

    #[test]
    fn condition_accessors() {
        let output = basic();
        let conditions = output.unlock_conditions();

        assert_eq!(conditions.address(), Some(&Address::Ed25519([1; 32])));
        assert_eq!(conditions.timelock(), Some(10));
        assert!(conditions.expiration().is_none());
        assert_eq!(output.features().unwrap().tag(), Some(&b"hello"[..]));
    }

    #[test]
    fn json_shape_is_readable() {
        let json = serde_json::to_value(basic()).unwrap();

        assert!(json.get("basic").is_some());
        assert_eq!(json["basic"]["features"][0]["tag"]["tag"], "68656c6c6f");
    }
}
