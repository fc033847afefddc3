//! Filter options for every output kind.
//!
//! Each field is independent: an absent option imposes no constraint and the
//! present ones are AND-composed. Slot ranges are strict on both sides. Only
//! live rows ever match.

use crate::{
    AccountRecord, Address, AddressKey, AnchorRecord, BasicRecord, DelegationRecord,
    FoundryRecord, NativeTokenId, NftRecord, OutputKind, OutputRecord, ScanDriver, ScanSource,
    SlotIndex,
};

/// Pagination and scan inputs shared by every filter.
pub trait QueryFilter {
    fn scan_sources(&self) -> Vec<ScanSource<'_>>;

    /// Zero disables pagination.
    fn page_size(&self) -> u32;

    fn cursor(&self) -> Option<&str>;
}

fn matches_address(filter: &Option<Address>, key: &[u8]) -> bool {
    filter.as_ref().is_none_or(|address| address.matches_key(key))
}

fn matches_optional_address(filter: &Option<Address>, key: &Option<AddressKey>) -> bool {
    match filter {
        None => true,
        Some(address) => key.as_deref().is_some_and(|k| address.matches_key(k)),
    }
}

fn matches_presence(filter: Option<bool>, present: bool) -> bool {
    filter.is_none_or(|wanted| wanted == present)
}

fn matches_before(filter: Option<SlotIndex>, value: Option<SlotIndex>) -> bool {
    match filter {
        None => true,
        Some(bound) => value.is_some_and(|v| v < bound),
    }
}

fn matches_after(filter: Option<SlotIndex>, value: Option<SlotIndex>) -> bool {
    match filter {
        None => true,
        Some(bound) => value.is_some_and(|v| v > bound),
    }
}

fn matches_tag(filter: &Option<Vec<u8>>, tag: &Option<Vec<u8>>) -> bool {
    match filter {
        Some(wanted) if !wanted.is_empty() => tag.as_deref() == Some(wanted.as_slice()),
        _ => true,
    }
}

/// Picks the first address option present to drive the scan through the
/// address index; the predicate still checks the exact field.
fn address_driver<'a>(candidates: impl IntoIterator<Item = &'a Option<Address>>) -> ScanDriver {
    candidates
        .into_iter()
        .find_map(Option::as_ref)
        .map(|address| ScanDriver::Address(address.id()))
        .unwrap_or(ScanDriver::All)
}

macro_rules! kind_filter {
    ($filter:ty, $kind:ident) => {
        impl $filter {
            pub fn scan_source(&self) -> ScanSource<'_> {
                ScanSource::new(
                    OutputKind::$kind,
                    self.driver(),
                    Box::new(move |record: &OutputRecord| {
                        matches!(record, OutputRecord::$kind(r) if self.matches(r))
                    }),
                )
            }

            fn into_scan_source(self) -> ScanSource<'static> {
                let driver = self.driver();

                ScanSource::new(
                    OutputKind::$kind,
                    driver,
                    Box::new(move |record: &OutputRecord| {
                        matches!(record, OutputRecord::$kind(r) if self.matches(r))
                    }),
                )
            }
        }

        impl QueryFilter for $filter {
            fn scan_sources(&self) -> Vec<ScanSource<'_>> {
                vec![self.scan_source()]
            }

            fn page_size(&self) -> u32 {
                self.page_size
            }

            fn cursor(&self) -> Option<&str> {
                self.cursor.as_deref()
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicFilter {
    pub has_native_token: Option<bool>,
    pub native_token: Option<NativeTokenId>,
    /// Matches the owning address, the expiration return address or the
    /// storage deposit return address.
    pub unlockable_by_address: Option<Address>,
    pub address: Option<Address>,
    pub has_storage_deposit_return: Option<bool>,
    pub storage_deposit_return_address: Option<Address>,
    pub has_expiration: Option<bool>,
    pub expiration_return_address: Option<Address>,
    pub expires_before: Option<SlotIndex>,
    pub expires_after: Option<SlotIndex>,
    pub has_timelock: Option<bool>,
    pub timelocked_before: Option<SlotIndex>,
    pub timelocked_after: Option<SlotIndex>,
    pub sender: Option<Address>,
    pub tag: Option<Vec<u8>>,
    pub created_before: Option<SlotIndex>,
    pub created_after: Option<SlotIndex>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl BasicFilter {
    fn driver(&self) -> ScanDriver {
        address_driver([
            &self.address,
            &self.unlockable_by_address,
            &self.sender,
            &self.storage_deposit_return_address,
            &self.expiration_return_address,
        ])
    }

    pub fn matches(&self, r: &BasicRecord) -> bool {
        r.meta.is_live()
            && matches_presence(self.has_native_token, r.native_token.is_some())
            && self
                .native_token
                .is_none_or(|id| r.native_token == Some(id))
            && self.unlockable_by_address.as_ref().is_none_or(|address| {
                address.matches_key(&r.address)
                    || r.expiration_return_address
                        .as_deref()
                        .is_some_and(|k| address.matches_key(k))
                    || r.storage_deposit_return_address
                        .as_deref()
                        .is_some_and(|k| address.matches_key(k))
            })
            && matches_address(&self.address, &r.address)
            && matches_presence(
                self.has_storage_deposit_return,
                r.storage_deposit_return.is_some(),
            )
            && matches_optional_address(
                &self.storage_deposit_return_address,
                &r.storage_deposit_return_address,
            )
            && matches_presence(self.has_expiration, r.expiration_return_address.is_some())
            && matches_optional_address(
                &self.expiration_return_address,
                &r.expiration_return_address,
            )
            && matches_before(self.expires_before, r.expiration_slot)
            && matches_after(self.expires_after, r.expiration_slot)
            && matches_presence(self.has_timelock, r.timelock_slot.is_some())
            && matches_before(self.timelocked_before, r.timelock_slot)
            && matches_after(self.timelocked_after, r.timelock_slot)
            && matches_optional_address(&self.sender, &r.sender)
            && matches_tag(&self.tag, &r.tag)
            && matches_before(self.created_before, Some(r.meta.created_at_slot))
            && matches_after(self.created_after, Some(r.meta.created_at_slot))
    }
}

kind_filter!(BasicFilter, Basic);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub address: Option<Address>,
    pub issuer: Option<Address>,
    pub sender: Option<Address>,
    pub created_before: Option<SlotIndex>,
    pub created_after: Option<SlotIndex>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl AccountFilter {
    fn driver(&self) -> ScanDriver {
        address_driver([&self.address, &self.issuer, &self.sender])
    }

    pub fn matches(&self, r: &AccountRecord) -> bool {
        r.meta.is_live()
            && matches_address(&self.address, &r.address)
            && matches_optional_address(&self.issuer, &r.issuer)
            && matches_optional_address(&self.sender, &r.sender)
            && matches_before(self.created_before, Some(r.meta.created_at_slot))
            && matches_after(self.created_after, Some(r.meta.created_at_slot))
    }
}

kind_filter!(AccountFilter, Account);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorFilter {
    /// Matches the state controller or the governor.
    pub unlockable_by_address: Option<Address>,
    pub state_controller: Option<Address>,
    pub governor: Option<Address>,
    pub issuer: Option<Address>,
    pub sender: Option<Address>,
    pub created_before: Option<SlotIndex>,
    pub created_after: Option<SlotIndex>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl AnchorFilter {
    fn driver(&self) -> ScanDriver {
        address_driver([
            &self.state_controller,
            &self.governor,
            &self.unlockable_by_address,
            &self.issuer,
            &self.sender,
        ])
    }

    pub fn matches(&self, r: &AnchorRecord) -> bool {
        r.meta.is_live()
            && self.unlockable_by_address.as_ref().is_none_or(|address| {
                address.matches_key(&r.state_controller) || address.matches_key(&r.governor)
            })
            && matches_address(&self.state_controller, &r.state_controller)
            && matches_address(&self.governor, &r.governor)
            && matches_optional_address(&self.issuer, &r.issuer)
            && matches_optional_address(&self.sender, &r.sender)
            && matches_before(self.created_before, Some(r.meta.created_at_slot))
            && matches_after(self.created_after, Some(r.meta.created_at_slot))
    }
}

kind_filter!(AnchorFilter, Anchor);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NftFilter {
    /// Matches the owning address, the expiration return address or the
    /// storage deposit return address.
    pub unlockable_by_address: Option<Address>,
    pub address: Option<Address>,
    pub has_storage_deposit_return: Option<bool>,
    pub storage_deposit_return_address: Option<Address>,
    pub has_expiration: Option<bool>,
    pub expiration_return_address: Option<Address>,
    pub expires_before: Option<SlotIndex>,
    pub expires_after: Option<SlotIndex>,
    pub has_timelock: Option<bool>,
    pub timelocked_before: Option<SlotIndex>,
    pub timelocked_after: Option<SlotIndex>,
    pub issuer: Option<Address>,
    pub sender: Option<Address>,
    pub tag: Option<Vec<u8>>,
    pub created_before: Option<SlotIndex>,
    pub created_after: Option<SlotIndex>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl NftFilter {
    fn driver(&self) -> ScanDriver {
        address_driver([
            &self.address,
            &self.unlockable_by_address,
            &self.issuer,
            &self.sender,
            &self.storage_deposit_return_address,
            &self.expiration_return_address,
        ])
    }

    pub fn matches(&self, r: &NftRecord) -> bool {
        r.meta.is_live()
            && self.unlockable_by_address.as_ref().is_none_or(|address| {
                address.matches_key(&r.address)
                    || r.expiration_return_address
                        .as_deref()
                        .is_some_and(|k| address.matches_key(k))
                    || r.storage_deposit_return_address
                        .as_deref()
                        .is_some_and(|k| address.matches_key(k))
            })
            && matches_address(&self.address, &r.address)
            && matches_presence(
                self.has_storage_deposit_return,
                r.storage_deposit_return.is_some(),
            )
            && matches_optional_address(
                &self.storage_deposit_return_address,
                &r.storage_deposit_return_address,
            )
            && matches_presence(self.has_expiration, r.expiration_return_address.is_some())
            && matches_optional_address(
                &self.expiration_return_address,
                &r.expiration_return_address,
            )
            && matches_before(self.expires_before, r.expiration_slot)
            && matches_after(self.expires_after, r.expiration_slot)
            && matches_presence(self.has_timelock, r.timelock_slot.is_some())
            && matches_before(self.timelocked_before, r.timelock_slot)
            && matches_after(self.timelocked_after, r.timelock_slot)
            && matches_optional_address(&self.issuer, &r.issuer)
            && matches_optional_address(&self.sender, &r.sender)
            && matches_tag(&self.tag, &r.tag)
            && matches_before(self.created_before, Some(r.meta.created_at_slot))
            && matches_after(self.created_after, Some(r.meta.created_at_slot))
    }
}

kind_filter!(NftFilter, Nft);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundryFilter {
    pub has_native_token: Option<bool>,
    /// Matches the foundry minting the token.
    pub native_token: Option<NativeTokenId>,
    /// Controlling account address.
    pub account: Option<Address>,
    pub created_before: Option<SlotIndex>,
    pub created_after: Option<SlotIndex>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl FoundryFilter {
    fn driver(&self) -> ScanDriver {
        address_driver([&self.account])
    }

    pub fn matches(&self, r: &FoundryRecord) -> bool {
        r.meta.is_live()
            && matches_presence(self.has_native_token, r.native_token)
            && self.native_token.is_none_or(|id| r.foundry_id == id)
            && matches_address(&self.account, &r.account_address)
            && matches_before(self.created_before, Some(r.meta.created_at_slot))
            && matches_after(self.created_after, Some(r.meta.created_at_slot))
    }
}

kind_filter!(FoundryFilter, Foundry);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationFilter {
    pub address: Option<Address>,
    pub validator: Option<Address>,
    pub created_before: Option<SlotIndex>,
    pub created_after: Option<SlotIndex>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl DelegationFilter {
    fn driver(&self) -> ScanDriver {
        address_driver([&self.address, &self.validator])
    }

    pub fn matches(&self, r: &DelegationRecord) -> bool {
        r.meta.is_live()
            && matches_address(&self.address, &r.address)
            && matches_address(&self.validator, &r.validator)
            && matches_before(self.created_before, Some(r.meta.created_at_slot))
            && matches_after(self.created_after, Some(r.meta.created_at_slot))
    }
}

kind_filter!(DelegationFilter, Delegation);

/// Options meaningful across every output kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedFilter {
    pub has_native_token: Option<bool>,
    pub native_token: Option<NativeTokenId>,
    pub unlockable_by_address: Option<Address>,
    pub created_before: Option<SlotIndex>,
    pub created_after: Option<SlotIndex>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl CombinedFilter {
    fn wants_native_tokens(&self) -> bool {
        self.has_native_token == Some(true) || self.native_token.is_some()
    }

    pub fn basic(&self) -> BasicFilter {
        BasicFilter {
            has_native_token: self.has_native_token,
            native_token: self.native_token,
            unlockable_by_address: self.unlockable_by_address.clone(),
            created_before: self.created_before,
            created_after: self.created_after,
            ..Default::default()
        }
    }

    pub fn account(&self) -> Option<AccountFilter> {
        (!self.wants_native_tokens()).then(|| AccountFilter {
            address: self.unlockable_by_address.clone(),
            created_before: self.created_before,
            created_after: self.created_after,
            ..Default::default()
        })
    }

    pub fn anchor(&self) -> Option<AnchorFilter> {
        (!self.wants_native_tokens()).then(|| AnchorFilter {
            unlockable_by_address: self.unlockable_by_address.clone(),
            created_before: self.created_before,
            created_after: self.created_after,
            ..Default::default()
        })
    }

    pub fn nft(&self) -> Option<NftFilter> {
        (!self.wants_native_tokens()).then(|| NftFilter {
            unlockable_by_address: self.unlockable_by_address.clone(),
            created_before: self.created_before,
            created_after: self.created_after,
            ..Default::default()
        })
    }

    /// Foundries are only ever controlled by accounts.
    pub fn foundry(&self) -> Option<FoundryFilter> {
        let account = self.unlockable_by_address.as_ref();

        account.is_none_or(Address::is_account).then(|| FoundryFilter {
            has_native_token: self.has_native_token,
            native_token: self.native_token,
            account: account.cloned(),
            created_before: self.created_before,
            created_after: self.created_after,
            ..Default::default()
        })
    }

    pub fn delegation(&self) -> Option<DelegationFilter> {
        (!self.wants_native_tokens()).then(|| DelegationFilter {
            address: self.unlockable_by_address.clone(),
            created_before: self.created_before,
            created_after: self.created_after,
            ..Default::default()
        })
    }
}

impl QueryFilter for CombinedFilter {
    fn scan_sources(&self) -> Vec<ScanSource<'_>> {
        let mut sources = vec![self.basic().into_scan_source()];

        sources.extend(self.account().map(AccountFilter::into_scan_source));
        sources.extend(self.anchor().map(AnchorFilter::into_scan_source));
        sources.extend(self.foundry().map(FoundryFilter::into_scan_source));
        sources.extend(self.nft().map(NftFilter::into_scan_source));
        sources.extend(self.delegation().map(DelegationFilter::into_scan_source));

        sources
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountId, OutputId, RecordMeta};

    fn ed25519(seed: u8) -> Address {
        Address::Ed25519([seed; 32])
    }

    fn basic_record() -> BasicRecord {
        BasicRecord {
            meta: RecordMeta {
                output_id: OutputId::new([1; 38]),
                amount: 10,
                created_at_slot: 10,
                deleted_at_slot: 0,
                committed: true,
            },
            address: ed25519(1).id(),
            sender: Some(ed25519(2).id()),
            tag: Some(b"tag".to_vec()),
            native_token: None,
            storage_deposit_return: Some(5),
            storage_deposit_return_address: Some(ed25519(3).id()),
            timelock_slot: None,
            expiration_slot: Some(20),
            expiration_return_address: Some(ed25519(4).id()),
        }
    }

    #[test]
    fn empty_filter_matches_live_rows_only() {
        let mut record = basic_record();
        assert!(BasicFilter::default().matches(&record));

        record.meta.deleted_at_slot = 11;
        assert!(!BasicFilter::default().matches(&record));
    }

    #[test]
    fn unlockable_covers_return_addresses() {
        let record = basic_record();

        for seed in [1, 3, 4] {
            let filter = BasicFilter {
                unlockable_by_address: Some(ed25519(seed)),
                ..Default::default()
            };
            assert!(filter.matches(&record), "seed {seed}");
        }

        let sender = BasicFilter {
            unlockable_by_address: Some(ed25519(2)),
            ..Default::default()
        };
        assert!(!sender.matches(&record));
    }

    #[test]
    fn slot_ranges_are_strict() {
        let record = basic_record();

        let at = |filter: BasicFilter| filter.matches(&record);

        assert!(!at(BasicFilter {
            expires_before: Some(20),
            ..Default::default()
        }));
        assert!(at(BasicFilter {
            expires_before: Some(21),
            ..Default::default()
        }));
        assert!(!at(BasicFilter {
            expires_after: Some(20),
            ..Default::default()
        }));
        assert!(!at(BasicFilter {
            created_after: Some(10),
            ..Default::default()
        }));
        assert!(at(BasicFilter {
            created_after: Some(9),
            ..Default::default()
        }));
        assert!(!at(BasicFilter {
            timelocked_before: Some(100),
            ..Default::default()
        }));
    }

    #[test]
    fn presence_flags() {
        let record = basic_record();

        assert!(BasicFilter {
            has_storage_deposit_return: Some(true),
            has_expiration: Some(true),
            has_timelock: Some(false),
            has_native_token: Some(false),
            ..Default::default()
        }
        .matches(&record));

        assert!(!BasicFilter {
            has_timelock: Some(true),
            ..Default::default()
        }
        .matches(&record));
    }

    #[test]
    fn empty_tag_is_ignored() {
        let record = basic_record();

        assert!(BasicFilter {
            tag: Some(vec![]),
            ..Default::default()
        }
        .matches(&record));

        assert!(!BasicFilter {
            tag: Some(b"other".to_vec()),
            ..Default::default()
        }
        .matches(&record));
    }

    #[test]
    fn driver_prefers_owning_address() {
        let filter = BasicFilter {
            sender: Some(ed25519(2)),
            address: Some(ed25519(1)),
            ..Default::default()
        };

        assert_eq!(filter.driver(), ScanDriver::Address(ed25519(1).id()));
        assert_eq!(BasicFilter::default().driver(), ScanDriver::All);
    }

    #[test]
    fn combined_narrows_kinds() {
        let plain = CombinedFilter::default();
        assert_eq!(plain.scan_sources().len(), 6);

        let tokens = CombinedFilter {
            has_native_token: Some(true),
            ..Default::default()
        };
        let kinds: Vec<_> = tokens.scan_sources().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![OutputKind::Basic, OutputKind::Foundry]);

        let by_key = CombinedFilter {
            unlockable_by_address: Some(ed25519(1)),
            ..Default::default()
        };
        assert!(by_key.foundry().is_none());
        assert_eq!(by_key.scan_sources().len(), 5);

        let by_account = CombinedFilter {
            unlockable_by_address: Some(Address::Account(AccountId::new([1; 32]))),
            ..Default::default()
        };
        assert!(by_account.foundry().is_some());
    }
}
