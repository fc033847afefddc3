use rand::Rng;

use ledgerdex_core::*;

pub mod bridge;
pub mod faults;

pub use bridge::MemoryBridge;

pub const TEST_NETWORK: &str = "testnet";
pub const TEST_PROTOCOL_VERSION: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestAddress {
    Alice,
    Bob,
    Carol,
    Dave,
    Eve,
}

impl TestAddress {
    pub fn ordinal(&self) -> u8 {
        match self {
            TestAddress::Alice => 0,
            TestAddress::Bob => 1,
            TestAddress::Carol => 2,
            TestAddress::Dave => 3,
            TestAddress::Eve => 4,
        }
    }

    pub fn address(&self) -> Address {
        Address::Ed25519([0xa0 + self.ordinal(); 32])
    }

    pub fn key(&self) -> AddressKey {
        self.address().id()
    }
}

impl From<TestAddress> for Address {
    fn from(value: TestAddress) -> Self {
        value.address()
    }
}

/// A multi address shared by `members`, each with weight one.
pub fn multi_address(members: &[TestAddress], threshold: u16) -> Address {
    let addresses = members
        .iter()
        .map(|member| WeightedAddress {
            address: member.address(),
            weight: 1,
        })
        .collect();

    Address::Multi(MultiAddress::new(addresses, threshold))
}

pub fn tx_sequence_to_hash(sequence: u64) -> [u8; 32] {
    blake2b_256(&sequence.to_le_bytes())
}

/// Deterministic output id for the `index`-th output created at `slot`.
pub fn fake_output_id(slot: SlotIndex, index: u16) -> OutputId {
    OutputId::new_from_parts(tx_sequence_to_hash(slot as u64), slot, index)
}

pub fn random_chain_id() -> [u8; 32] {
    let mut id = [0u8; 32];
    rand::rng().fill(&mut id[..]);
    id
}

pub fn basic_output(owner: impl Into<Address>, amount: BaseToken) -> Output {
    Output::Basic(BasicOutput {
        amount,
        mana: 0,
        unlock_conditions: UnlockConditions(vec![UnlockCondition::Address {
            address: owner.into(),
        }]),
        features: Features::default(),
    })
}

pub fn account_output(account_id: AccountId, owner: impl Into<Address>) -> Output {
    Output::Account(AccountOutput {
        amount: 1_000,
        mana: 0,
        account_id,
        foundry_counter: 0,
        unlock_conditions: UnlockConditions(vec![UnlockCondition::Address {
            address: owner.into(),
        }]),
        features: Features::default(),
        immutable_features: Features::default(),
    })
}

pub fn anchor_output(
    anchor_id: AnchorId,
    state_controller: impl Into<Address>,
    governor: impl Into<Address>,
) -> Output {
    Output::Anchor(AnchorOutput {
        amount: 1_000,
        mana: 0,
        anchor_id,
        state_index: 0,
        unlock_conditions: UnlockConditions(vec![
            UnlockCondition::StateController {
                address: state_controller.into(),
            },
            UnlockCondition::Governor {
                address: governor.into(),
            },
        ]),
        features: Features::default(),
        immutable_features: Features::default(),
    })
}

pub fn nft_output(nft_id: NftId, owner: impl Into<Address>) -> Output {
    Output::Nft(NftOutput {
        amount: 1_000,
        mana: 0,
        nft_id,
        unlock_conditions: UnlockConditions(vec![UnlockCondition::Address {
            address: owner.into(),
        }]),
        features: Features::default(),
        immutable_features: Features::default(),
    })
}

pub fn foundry_output(account_id: AccountId, serial_number: u32) -> Output {
    Output::Foundry(FoundryOutput {
        amount: 1_000,
        serial_number,
        token_scheme: TokenScheme::Simple {
            minted_tokens: 100,
            melted_tokens: 0,
            maximum_supply: 1_000,
        },
        unlock_conditions: UnlockConditions(vec![UnlockCondition::ImmutableAccount {
            address: Address::Account(account_id),
        }]),
        features: Features::default(),
        immutable_features: Features::default(),
    })
}

pub fn delegation_output(
    delegation_id: DelegationId,
    owner: impl Into<Address>,
    validator: AccountId,
) -> Output {
    Output::Delegation(DelegationOutput {
        amount: 1_000,
        delegated_amount: 1_000,
        delegation_id,
        validator_address: validator,
        start_epoch: 1,
        end_epoch: 0,
        unlock_conditions: UnlockConditions(vec![UnlockCondition::Address {
            address: owner.into(),
        }]),
    })
}

fn push_unlock_condition(output: &mut Output, condition: UnlockCondition) {
    let conditions = match output {
        Output::Basic(x) => &mut x.unlock_conditions,
        Output::Account(x) => &mut x.unlock_conditions,
        Output::Anchor(x) => &mut x.unlock_conditions,
        Output::Foundry(x) => &mut x.unlock_conditions,
        Output::Nft(x) => &mut x.unlock_conditions,
        Output::Delegation(x) => &mut x.unlock_conditions,
    };

    conditions.0.push(condition);
}

fn push_feature(output: &mut Output, feature: Feature) {
    let features = match output {
        Output::Basic(x) => &mut x.features,
        Output::Account(x) => &mut x.features,
        Output::Anchor(x) => &mut x.features,
        Output::Foundry(x) => &mut x.features,
        Output::Nft(x) => &mut x.features,
        Output::Delegation(_) => unreachable!("delegation outputs carry no features"),
    };

    features.0.push(feature);
}

pub fn with_sender(mut output: Output, sender: impl Into<Address>) -> Output {
    push_feature(
        &mut output,
        Feature::Sender {
            address: sender.into(),
        },
    );
    output
}

pub fn with_tag(mut output: Output, tag: &[u8]) -> Output {
    push_feature(&mut output, Feature::Tag { tag: tag.to_vec() });
    output
}

pub fn with_native_token(mut output: Output, id: NativeTokenId, amount: u128) -> Output {
    push_feature(&mut output, Feature::NativeToken { id, amount });
    output
}

pub fn with_timelock(mut output: Output, slot: SlotIndex) -> Output {
    push_unlock_condition(&mut output, UnlockCondition::Timelock { slot });
    output
}

pub fn with_expiration(
    mut output: Output,
    return_address: impl Into<Address>,
    slot: SlotIndex,
) -> Output {
    push_unlock_condition(
        &mut output,
        UnlockCondition::Expiration {
            return_address: return_address.into(),
            slot,
        },
    );
    output
}

pub fn with_storage_deposit_return(
    mut output: Output,
    return_address: impl Into<Address>,
    amount: BaseToken,
) -> Output {
    push_unlock_condition(
        &mut output,
        UnlockCondition::StorageDepositReturn {
            return_address: return_address.into(),
            amount,
        },
    );
    output
}

/// The `index`-th output created at `slot`.
pub fn ledger_output(slot: SlotIndex, index: u16, output: Output) -> LedgerOutput {
    LedgerOutput {
        output_id: fake_output_id(slot, index),
        output,
        booked_at: slot,
    }
}

pub fn spend(output: &LedgerOutput, slot: SlotIndex) -> LedgerSpent {
    LedgerSpent {
        output: output.clone(),
        spent_at: slot,
    }
}

pub fn ledger_update(
    slot: SlotIndex,
    consumed: Vec<LedgerSpent>,
    created: Vec<LedgerOutput>,
) -> LedgerUpdate {
    LedgerUpdate {
        slot,
        consumed,
        created,
    }
}

pub fn fake_node_info(ledger_slot: SlotIndex) -> NodeInfo {
    NodeInfo {
        network_name: TEST_NETWORK.into(),
        protocol_version: TEST_PROTOCOL_VERSION,
        ledger_slot,
        pruning_slot: 0,
    }
}

pub fn fake_status(committed_slot: SlotIndex) -> Status {
    Status {
        committed_slot,
        protocol_version: TEST_PROTOCOL_VERSION,
        network_name: TEST_NETWORK.into(),
        database_version: DATABASE_VERSION,
    }
}

/// Sorts output ids the way queries return rows created at one slot.
pub fn sorted(mut ids: Vec<OutputId>) -> Vec<OutputId> {
    ids.sort();
    ids
}
