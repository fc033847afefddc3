use ledgerdex_core::*;
use ledgerdex_testing::{faults::*, *};

use super::OutputStore;

/// Helper to create an empty, imported in-memory indexer at slot 0.
fn test_indexer() -> Indexer<OutputStore> {
    let store = OutputStore::in_memory().unwrap();
    let indexer = Indexer::open(store).unwrap();

    let bridge = MemoryBridge::new(fake_node_info(0));
    bootstrap(&indexer, &bridge).unwrap();

    indexer
}

fn accept(indexer: &Indexer<OutputStore>, update: &LedgerUpdate) {
    indexer.accept_ledger_update(update).unwrap();
}

fn commit(indexer: &Indexer<OutputStore>, update: &LedgerUpdate) {
    indexer.commit_ledger_update(update).unwrap();
}

fn by_address(indexer: &Indexer<OutputStore>, owner: impl Into<Address>) -> IndexerResult {
    let filter = BasicFilter {
        address: Some(owner.into()),
        ..Default::default()
    };

    indexer.query(&filter).unwrap()
}

/// Looks an output up through the query that fits its kind best.
fn lookup(indexer: &Indexer<OutputStore>, output: &LedgerOutput) -> IndexerResult {
    match &output.output {
        Output::Basic(x) => {
            let filter = BasicFilter {
                address: x.unlock_conditions.address().cloned(),
                ..Default::default()
            };
            indexer.query(&filter).unwrap()
        }
        Output::Account(x) => indexer.account_by_id(&x.account_id).unwrap(),
        Output::Anchor(x) => indexer.anchor_by_id(&x.anchor_id).unwrap(),
        Output::Foundry(x) => {
            let account = match x.unlock_conditions.immutable_account() {
                Some(Address::Account(id)) => *id,
                _ => unreachable!(),
            };
            let id = FoundryId::build(&account, x.serial_number, x.token_scheme.kind());
            indexer.foundry_by_id(&id).unwrap()
        }
        Output::Nft(x) => indexer.nft_by_id(&x.nft_id).unwrap(),
        Output::Delegation(x) => indexer.delegation_by_id(&x.delegation_id).unwrap(),
    }
}

fn one_of_each_kind(slot: SlotIndex) -> Vec<LedgerOutput> {
    let account = AccountId::new(random_chain_id());

    vec![
        ledger_output(slot, 0, basic_output(TestAddress::Alice, 100)),
        ledger_output(slot, 1, account_output(account, TestAddress::Alice)),
        ledger_output(
            slot,
            2,
            anchor_output(
                AnchorId::new(random_chain_id()),
                TestAddress::Alice,
                TestAddress::Bob,
            ),
        ),
        ledger_output(slot, 3, foundry_output(account, 1)),
        ledger_output(
            slot,
            4,
            nft_output(NftId::new(random_chain_id()), TestAddress::Alice),
        ),
        ledger_output(
            slot,
            5,
            delegation_output(
                DelegationId::new(random_chain_id()),
                TestAddress::Alice,
                account,
            ),
        ),
    ]
}

#[test]
fn test_basic_output_by_address() {
    let indexer = test_indexer();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    commit(&indexer, &ledger_update(1, vec![], vec![output.clone()]));

    let found = by_address(&indexer, TestAddress::Alice);
    assert_eq!(found.output_ids, vec![output.output_id]);
    assert_eq!(found.committed_slot, 1);
    assert_eq!(found.next_cursor, None);

    let other = by_address(&indexer, TestAddress::Bob);
    assert!(other.output_ids.is_empty());
    assert_eq!(other.committed_slot, 1);
}

#[test]
fn test_accept_then_commit_every_kind() {
    let indexer = test_indexer();

    let outputs = one_of_each_kind(1);
    let update = ledger_update(1, vec![], outputs.clone());

    accept(&indexer, &update);

    // tentative rows are visible before the commitment arrives
    for output in outputs.iter() {
        let found = lookup(&indexer, output);
        assert_eq!(found.output_ids, vec![output.output_id], "{:?}", output.kind());
        assert_eq!(found.committed_slot, 0);
    }

    commit(&indexer, &update);

    for output in outputs.iter() {
        let found = lookup(&indexer, output);
        assert_eq!(found.output_ids, vec![output.output_id], "{:?}", output.kind());
        assert_eq!(found.committed_slot, 1);
    }

    let stats = indexer.store().stats().unwrap();
    assert_eq!(stats["uncommitted"], 0);
    assert_eq!(stats["basic"], 1);
    assert_eq!(stats["delegation"], 1);
}

#[test]
fn test_uncommitted_insert_is_discarded_by_commit() {
    let indexer = test_indexer();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    accept(&indexer, &ledger_update(1, vec![], vec![output.clone()]));

    assert_eq!(by_address(&indexer, TestAddress::Alice).output_ids.len(), 1);

    commit(&indexer, &ledger_update(1, vec![], vec![]));

    assert!(by_address(&indexer, TestAddress::Alice).output_ids.is_empty());
}

#[test]
fn test_uncommitted_insert_is_discarded_on_rollback() {
    let indexer = test_indexer();

    for output in one_of_each_kind(3) {
        accept(&indexer, &ledger_update(3, vec![], vec![output.clone()]));
    }

    indexer.remove_uncommitted_changes().unwrap();

    let stats = indexer.store().stats().unwrap();

    for kind in OutputKind::ALL {
        assert_eq!(stats[kind.name()], 0, "{kind}");
    }

    assert_eq!(stats["uncommitted"], 0);
}

#[test]
fn test_tentative_deletion_is_reverted() {
    let indexer = test_indexer();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    commit(&indexer, &ledger_update(1, vec![], vec![output.clone()]));

    accept(&indexer, &ledger_update(2, vec![spend(&output, 2)], vec![]));
    assert!(by_address(&indexer, TestAddress::Alice).output_ids.is_empty());

    commit(&indexer, &ledger_update(2, vec![], vec![]));

    let found = by_address(&indexer, TestAddress::Alice);
    assert_eq!(found.output_ids, vec![output.output_id]);
    assert_eq!(found.committed_slot, 2);
}

#[test]
fn test_full_round_trip_removes_output() {
    let indexer = test_indexer();

    let nft_id = NftId::new(random_chain_id());
    let output = ledger_output(1, 0, nft_output(nft_id, TestAddress::Carol));

    let create = ledger_update(1, vec![], vec![output.clone()]);
    accept(&indexer, &create);
    commit(&indexer, &create);

    let delete = ledger_update(2, vec![spend(&output, 2)], vec![]);
    accept(&indexer, &delete);
    commit(&indexer, &delete);

    for _ in 0..2 {
        let found = indexer.nft_by_id(&nft_id).unwrap();
        assert!(found.output_ids.is_empty());
        assert_eq!(found.committed_slot, 2);
    }

    let stats = indexer.store().stats().unwrap();
    assert_eq!(stats["nft"], 0);
    assert_eq!(stats["spent"], 0);
}

#[test]
fn test_same_batch_create_and_spend_never_shows() {
    let indexer = test_indexer();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    let update = ledger_update(1, vec![spend(&output, 1)], vec![output.clone()]);

    accept(&indexer, &update);
    assert!(by_address(&indexer, TestAddress::Alice).output_ids.is_empty());

    commit(&indexer, &update);
    assert!(by_address(&indexer, TestAddress::Alice).output_ids.is_empty());

    let stats = indexer.store().stats().unwrap();
    assert_eq!(stats["basic"], 0);
}

#[test]
fn test_duplicate_commit_is_idempotent() {
    let indexer = test_indexer();

    let first = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    let second = ledger_output(1, 1, basic_output(TestAddress::Alice, 200));
    let update = ledger_update(1, vec![], vec![first.clone(), second.clone()]);

    commit(&indexer, &update);
    let before = by_address(&indexer, TestAddress::Alice);

    commit(&indexer, &update);
    let after = by_address(&indexer, TestAddress::Alice);

    assert_eq!(before, after);
    assert_eq!(after.output_ids.len(), 2);
    assert_eq!(indexer.committed_slot(), 1);
}

#[test]
fn test_stale_updates_are_skipped() {
    let indexer = test_indexer();

    commit(&indexer, &ledger_update(5, vec![], vec![]));

    let output = ledger_output(5, 0, basic_output(TestAddress::Alice, 100));

    let err = indexer
        .accept_ledger_update(&ledger_update(5, vec![], vec![output.clone()]))
        .unwrap_err();

    assert!(matches!(
        err,
        IndexError::LedgerUpdateSkipped {
            slot: 5,
            committed_slot: 5
        }
    ));

    let err = indexer
        .commit_ledger_update(&ledger_update(4, vec![], vec![output]))
        .unwrap_err();

    assert!(matches!(err, IndexError::LedgerUpdateSkipped { slot: 4, .. }));
    assert!(by_address(&indexer, TestAddress::Alice).output_ids.is_empty());
}

#[test]
fn test_commit_without_status_fails() {
    let store = OutputStore::in_memory().unwrap();
    let indexer = Indexer::open(store).unwrap();

    let err = indexer
        .commit_ledger_update(&ledger_update(1, vec![], vec![]))
        .unwrap_err();

    assert!(matches!(err, IndexError::StatusNotFound));
}

#[test]
fn test_pagination_walks_every_row_once() {
    let indexer = test_indexer();

    let mut expected = vec![];

    for slot in 1..=5 {
        let created: Vec<_> = (0..5)
            .map(|idx| ledger_output(slot, idx, basic_output(TestAddress::Dave, 10)))
            .collect();

        expected.extend(created.iter().map(|x| x.output_id));
        commit(&indexer, &ledger_update(slot, vec![], created));
    }

    let mut seen = vec![];
    let mut cursor = None;
    let mut pages = 0;

    loop {
        let filter = BasicFilter {
            address: Some(TestAddress::Dave.into()),
            page_size: 10,
            cursor: cursor.clone(),
            ..Default::default()
        };

        let page = indexer.query(&filter).unwrap();
        assert!(page.output_ids.len() <= 10);
        assert_eq!(page.page_size, 10);

        seen.extend(page.output_ids);
        pages += 1;

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen, expected);
}

#[test]
fn test_pagination_over_combined_kinds() {
    let indexer = test_indexer();

    let mut expected = vec![];

    for slot in 1..=4 {
        let created = vec![
            ledger_output(slot, 0, basic_output(TestAddress::Eve, 10)),
            ledger_output(
                slot,
                1,
                nft_output(NftId::new(random_chain_id()), TestAddress::Eve),
            ),
        ];

        expected.extend(created.iter().map(|x| x.output_id));
        commit(&indexer, &ledger_update(slot, vec![], created));
    }

    let mut seen = vec![];
    let mut cursor = None;

    loop {
        let filter = CombinedFilter {
            unlockable_by_address: Some(TestAddress::Eve.into()),
            page_size: 3,
            cursor: cursor.clone(),
            ..Default::default()
        };

        let page = indexer.query(&filter).unwrap();
        seen.extend(page.output_ids);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seen, expected);
}

#[test]
fn test_cursor_requires_page_size() {
    let indexer = test_indexer();

    let filter = BasicFilter {
        cursor: Some(SortKey::new(1, fake_output_id(1, 0)).to_cursor()),
        ..Default::default()
    };

    assert!(matches!(
        indexer.query(&filter),
        Err(IndexError::UnsupportedQuery(_))
    ));

    let filter = BasicFilter {
        cursor: Some("nope".into()),
        page_size: 5,
        ..Default::default()
    };

    assert!(matches!(
        indexer.query(&filter),
        Err(IndexError::InvalidCursor(_))
    ));
}

#[test]
fn test_filters_narrow_results() {
    let indexer = test_indexer();

    let token = FoundryId::new([9; 38]);

    let plain = ledger_output(1, 0, basic_output(TestAddress::Alice, 10));
    let tagged = ledger_output(
        1,
        1,
        with_tag(
            with_sender(basic_output(TestAddress::Alice, 10), TestAddress::Bob),
            b"hello",
        ),
    );
    let rich = ledger_output(
        1,
        2,
        with_native_token(basic_output(TestAddress::Alice, 10), token, 50),
    );
    let expiring = ledger_output(
        1,
        3,
        with_expiration(basic_output(TestAddress::Alice, 10), TestAddress::Carol, 100),
    );

    commit(
        &indexer,
        &ledger_update(
            1,
            vec![],
            vec![plain.clone(), tagged.clone(), rich.clone(), expiring.clone()],
        ),
    );

    let query = |filter: BasicFilter| indexer.query(&filter).unwrap().output_ids;

    assert_eq!(
        query(BasicFilter {
            tag: Some(b"hello".to_vec()),
            ..Default::default()
        }),
        vec![tagged.output_id]
    );

    assert_eq!(
        query(BasicFilter {
            sender: Some(TestAddress::Bob.into()),
            ..Default::default()
        }),
        vec![tagged.output_id]
    );

    assert_eq!(
        query(BasicFilter {
            native_token: Some(token),
            ..Default::default()
        }),
        vec![rich.output_id]
    );

    assert_eq!(
        query(BasicFilter {
            has_expiration: Some(true),
            expires_before: Some(101),
            ..Default::default()
        }),
        vec![expiring.output_id]
    );

    assert!(query(BasicFilter {
        expires_before: Some(100),
        ..Default::default()
    })
    .is_empty());

    // expiration return addresses count as able to unlock
    assert_eq!(
        query(BasicFilter {
            unlockable_by_address: Some(TestAddress::Carol.into()),
            ..Default::default()
        }),
        vec![expiring.output_id]
    );

    assert_eq!(
        query(BasicFilter {
            address: Some(TestAddress::Alice.into()),
            has_native_token: Some(false),
            has_expiration: Some(false),
            ..Default::default()
        }),
        vec![plain.output_id, tagged.output_id]
    );

    assert_eq!(
        query(BasicFilter {
            created_after: Some(1),
            ..Default::default()
        }),
        vec![]
    );
}

#[test]
fn test_combined_filter_with_native_tokens() {
    let indexer = test_indexer();

    let account = AccountId::new(random_chain_id());
    let token = FoundryId::build(&account, 1, 0);

    let rich = ledger_output(
        1,
        0,
        with_native_token(basic_output(TestAddress::Alice, 10), token, 5),
    );
    let nft = ledger_output(
        1,
        1,
        nft_output(NftId::new(random_chain_id()), TestAddress::Alice),
    );
    let foundry = ledger_output(
        1,
        2,
        with_native_token(foundry_output(account, 1), token, 5),
    );

    commit(
        &indexer,
        &ledger_update(1, vec![], vec![rich.clone(), nft.clone(), foundry.clone()]),
    );

    let everything = indexer
        .query(&CombinedFilter::default())
        .unwrap()
        .output_ids;
    assert_eq!(
        everything,
        sorted(vec![rich.output_id, nft.output_id, foundry.output_id])
    );

    let with_tokens = indexer
        .query(&CombinedFilter {
            has_native_token: Some(true),
            ..Default::default()
        })
        .unwrap()
        .output_ids;
    assert_eq!(with_tokens, sorted(vec![rich.output_id, foundry.output_id]));

    let alice = indexer
        .query(&CombinedFilter {
            unlockable_by_address: Some(TestAddress::Alice.into()),
            ..Default::default()
        })
        .unwrap()
        .output_ids;
    assert_eq!(alice, sorted(vec![rich.output_id, nft.output_id]));
}

#[test]
fn test_delegation_by_validator() {
    let indexer = test_indexer();

    let validator = AccountId::new(random_chain_id());
    let other = AccountId::new(random_chain_id());

    let delegated = ledger_output(
        1,
        0,
        delegation_output(
            DelegationId::new(random_chain_id()),
            TestAddress::Bob,
            validator,
        ),
    );
    let elsewhere = ledger_output(
        1,
        1,
        delegation_output(DelegationId::new(random_chain_id()), TestAddress::Bob, other),
    );

    commit(
        &indexer,
        &ledger_update(1, vec![], vec![delegated.clone(), elsewhere]),
    );

    let found = indexer
        .query(&DelegationFilter {
            validator: Some(Address::Account(validator)),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(found.output_ids, vec![delegated.output_id]);
}

#[test]
fn test_implicit_account_id_is_derived() {
    let indexer = test_indexer();

    let output = ledger_output(
        1,
        0,
        account_output(AccountId::new([0; 32]), TestAddress::Alice),
    );
    commit(&indexer, &ledger_update(1, vec![], vec![output.clone()]));

    let id = AccountId::from_output_id(&output.output_id);
    let found = indexer.account_by_id(&id).unwrap();

    assert_eq!(found.output_ids, vec![output.output_id]);
}

#[test]
fn test_multi_address_lifecycle() {
    let indexer = test_indexer();

    let multi = multi_address(&[TestAddress::Alice, TestAddress::Bob], 2);
    let id = multi.id();

    let first = ledger_output(1, 0, basic_output(multi.clone(), 10));
    let second = ledger_output(1, 1, basic_output(multi.clone(), 20));

    commit(
        &indexer,
        &ledger_update(1, vec![], vec![first.clone(), second.clone()]),
    );

    let resolved = indexer.resolve_multi_address(&id).unwrap();
    assert_eq!(Some(&resolved), multi.multi_address());

    let found = by_address(&indexer, multi.clone());
    assert_eq!(found.output_ids, vec![first.output_id, second.output_id]);

    commit(&indexer, &ledger_update(2, vec![spend(&first, 2)], vec![]));
    assert!(indexer.resolve_multi_address(&id).is_ok());

    commit(&indexer, &ledger_update(3, vec![spend(&second, 3)], vec![]));

    assert!(matches!(
        indexer.resolve_multi_address(&id),
        Err(IndexError::MultiAddressNotFound(_))
    ));
}

#[test]
fn test_tentative_multi_address_is_dropped_with_its_output() {
    let indexer = test_indexer();

    let multi = multi_address(&[TestAddress::Carol, TestAddress::Dave], 1);
    let restricted = Address::restricted(multi.clone(), vec![1]);

    let output = ledger_output(1, 0, basic_output(restricted, 10));
    accept(&indexer, &ledger_update(1, vec![], vec![output]));

    assert!(indexer.resolve_multi_address(&multi.id()).is_ok());

    indexer.remove_uncommitted_changes().unwrap();

    assert!(indexer.resolve_multi_address(&multi.id()).is_err());
}

#[test]
fn test_import_snapshot_rebuilds_indexes() {
    let store = OutputStore::in_memory().unwrap();
    let indexer = Indexer::open(store).unwrap();

    let snapshot: Vec<_> = (0..50)
        .map(|idx| ledger_output(idx % 7, idx as u16, basic_output(TestAddress::Bob, 1)))
        .collect();

    let bridge = MemoryBridge::new(fake_node_info(3)).with_snapshot(snapshot.clone());

    let status = import_snapshot(&indexer, &bridge).unwrap();

    // booking slots beyond the ledger slot win
    assert_eq!(status.committed_slot, 6);
    assert_eq!(indexer.committed_slot(), 6);

    let found = by_address(&indexer, TestAddress::Bob);
    assert_eq!(found.output_ids.len(), 50);
    assert_eq!(found.committed_slot, 6);

    let mut keys: Vec<_> = snapshot
        .iter()
        .map(|x| SortKey::new(x.booked_at, x.output_id))
        .collect();
    keys.sort();

    let expected: Vec<_> = keys.into_iter().map(|x| x.output_id).collect();
    assert_eq!(found.output_ids, expected);
}

#[test]
fn test_bootstrap_reimports_on_network_change() {
    let store = OutputStore::in_memory().unwrap();
    let indexer = Indexer::open(store).unwrap();

    let old = ledger_output(1, 0, basic_output(TestAddress::Alice, 1));
    let bridge = MemoryBridge::new(fake_node_info(1)).with_snapshot(vec![old]);
    bootstrap(&indexer, &bridge).unwrap();

    assert_eq!(by_address(&indexer, TestAddress::Alice).output_ids.len(), 1);

    let mut info = fake_node_info(1);
    info.network_name = "othernet".into();

    let fresh = ledger_output(1, 0, basic_output(TestAddress::Bob, 1));
    let bridge = MemoryBridge::new(info).with_snapshot(vec![fresh.clone()]);

    let status = bootstrap(&indexer, &bridge).unwrap();
    assert_eq!(status.network_name, "othernet");

    assert!(by_address(&indexer, TestAddress::Alice).output_ids.is_empty());
    assert_eq!(
        by_address(&indexer, TestAddress::Bob).output_ids,
        vec![fresh.output_id]
    );
}

#[test]
fn test_bootstrap_discards_leftover_tentative_state() {
    let indexer = test_indexer();

    let output = ledger_output(4, 0, basic_output(TestAddress::Alice, 1));
    accept(&indexer, &ledger_update(4, vec![], vec![output]));

    let bridge = MemoryBridge::new(fake_node_info(10));
    let status = bootstrap(&indexer, &bridge).unwrap();

    assert_eq!(status.committed_slot, 0);
    assert!(by_address(&indexer, TestAddress::Alice).output_ids.is_empty());
}

#[test]
fn test_follow_applies_events_in_order() {
    let indexer = test_indexer();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 1));
    let update = ledger_update(1, vec![], vec![output.clone()]);

    let bridge = MemoryBridge::new(fake_node_info(1));
    bridge.push_event(LedgerEvent::Accepted(update.clone()));
    bridge.push_event(LedgerEvent::Committed(update.clone()));
    bridge.push_event(LedgerEvent::Accepted(update));

    let applied = follow(&indexer, &bridge, 1).unwrap();
    assert_eq!(applied, 2);

    let found = by_address(&indexer, TestAddress::Alice);
    assert_eq!(found.output_ids, vec![output.output_id]);
    assert_eq!(found.committed_slot, 1);
}

#[test]
fn test_follow_stops_on_bridge_failure() {
    let indexer = test_indexer();

    let bridge = MemoryBridge::new(fake_node_info(2));
    bridge.push_event(LedgerEvent::Committed(ledger_update(1, vec![], vec![])));
    bridge.push_event(LedgerEvent::Committed(ledger_update(2, vec![], vec![])));

    let faulty = FaultyBridge::new(bridge, TestFault::UpdatesError(1));

    assert!(follow(&indexer, &faulty, 0).is_err());
    assert_eq!(indexer.committed_slot(), 1);
}

#[test]
fn test_bootstrap_surfaces_snapshot_failure() {
    let store = OutputStore::in_memory().unwrap();
    let indexer = Indexer::open(store).unwrap();

    let bridge = FaultyBridge::new(
        MemoryBridge::new(fake_node_info(0)),
        TestFault::SnapshotError,
    );

    assert!(bootstrap(&indexer, &bridge).is_err());
    assert!(indexer.store().read_status().unwrap().is_none());
}

#[test]
fn test_clear_drops_everything() {
    let indexer = test_indexer();

    commit(
        &indexer,
        &ledger_update(1, vec![], one_of_each_kind(1)),
    );

    indexer.clear().unwrap();

    assert!(indexer.store().read_status().unwrap().is_none());
    assert_eq!(indexer.committed_slot(), 0);

    let stats = indexer.store().stats().unwrap();
    assert!(stats.values().all(|x| *x == 0));
}

#[test]
fn test_on_disk_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.redb");

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 1));

    {
        let store = OutputStore::open(&path, None).unwrap();
        let indexer = Indexer::open(store).unwrap();

        bootstrap(&indexer, &MemoryBridge::new(fake_node_info(0))).unwrap();
        commit(&indexer, &ledger_update(1, vec![], vec![output.clone()]));
    }

    let store = OutputStore::open(&path, Some(16)).unwrap();
    let indexer = Indexer::open(store).unwrap();

    assert_eq!(indexer.committed_slot(), 1);
    assert_eq!(indexer.status().unwrap(), fake_status(1));

    let found = by_address(&indexer, TestAddress::Alice);
    assert_eq!(found.output_ids, vec![output.output_id]);
}

#[test]
fn test_address_cursor_skips_neighbouring_keys() {
    let indexer = test_indexer();

    let mut expected = vec![];

    for slot in 1..=4 {
        let created: Vec<_> = (0..6)
            .map(|idx| {
                let owner = if idx % 2 == 0 {
                    TestAddress::Alice
                } else {
                    TestAddress::Bob
                };

                ledger_output(slot, idx, basic_output(owner, 10))
            })
            .collect();

        expected.extend(
            created
                .iter()
                .filter(|x| x.output_id.index() % 2 == 0)
                .map(|x| x.output_id),
        );

        commit(&indexer, &ledger_update(slot, vec![], created));
    }

    let mut seen = vec![];
    let mut sizes = vec![];
    let mut cursor = None;

    loop {
        let filter = BasicFilter {
            address: Some(TestAddress::Alice.into()),
            page_size: 5,
            cursor: cursor.clone(),
            ..Default::default()
        };

        let page = indexer.query(&filter).unwrap();

        sizes.push(page.output_ids.len());
        seen.extend(page.output_ids);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(seen, expected);
}

#[test]
fn test_import_one_output_at_a_time() {
    let store = OutputStore::in_memory().unwrap();
    let indexer = Indexer::open(store).unwrap();

    let first = ledger_output(2, 0, basic_output(TestAddress::Alice, 1));
    let last = ledger_output(9, 0, basic_output(TestAddress::Alice, 2));
    let nft = ledger_output(4, 1, nft_output(NftId::new(random_chain_id()), TestAddress::Alice));

    let mut tx = indexer.import_transaction().unwrap();

    for output in [&last, &nft, &first] {
        tx.add_output(output).unwrap();
    }

    assert_eq!(tx.imported(), 3);

    let status = tx.finalize(5, TEST_PROTOCOL_VERSION, TEST_NETWORK).unwrap();

    assert_eq!(status, fake_status(9));
    assert_eq!(indexer.status().unwrap(), fake_status(9));
    assert_eq!(indexer.committed_slot(), 9);

    let found = by_address(&indexer, TestAddress::Alice);
    assert_eq!(found.output_ids, vec![first.output_id, last.output_id]);
    assert_eq!(found.committed_slot, 9);

    assert_eq!(lookup(&indexer, &nft).output_ids, vec![nft.output_id]);

    // imported rows are final and survive a rollback
    indexer.remove_uncommitted_changes().unwrap();
    assert_eq!(by_address(&indexer, TestAddress::Alice).output_ids.len(), 2);
}

#[test]
fn test_failed_commit_leaves_no_partial_state() {
    let store = OutputStore::in_memory().unwrap();

    let plain = Indexer::open(store.clone()).unwrap();
    bootstrap(&plain, &MemoryBridge::new(fake_node_info(0))).unwrap();

    let faulty = FaultyIndexStore::new(store, TestFault::WriterError(WriterCall::WriteStatus));
    let indexer = Indexer::open(faulty).unwrap();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    let update = ledger_update(1, vec![], vec![output.clone()]);

    indexer.accept_ledger_update(&update).unwrap();

    let err = indexer.commit_ledger_update(&update).unwrap_err();
    assert!(matches!(err, IndexError::Storage(_)));

    let record = indexer
        .store()
        .read_output(OutputKind::Basic, &output.output_id)
        .unwrap()
        .unwrap();

    assert!(!record.meta().committed);
    assert_eq!(indexer.status().unwrap().committed_slot, 0);
    assert_eq!(indexer.committed_slot(), 0);

    let stats = indexer.store().inner().stats().unwrap();
    assert_eq!(stats["uncommitted"], 1);

    let found = by_address(&plain, TestAddress::Alice);
    assert_eq!(found.output_ids, vec![output.output_id]);
    assert_eq!(found.committed_slot, 0);
}

#[test]
fn test_failed_commit_keeps_spent_output() {
    let store = OutputStore::in_memory().unwrap();

    let plain = Indexer::open(store.clone()).unwrap();
    bootstrap(&plain, &MemoryBridge::new(fake_node_info(0))).unwrap();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    commit(&plain, &ledger_update(1, vec![], vec![output.clone()]));

    let faulty = FaultyIndexStore::new(store, TestFault::WriterError(WriterCall::Commit));
    let indexer = Indexer::open(faulty).unwrap();

    let created = ledger_output(2, 0, basic_output(TestAddress::Bob, 100));
    let update = ledger_update(2, vec![spend(&output, 2)], vec![created]);

    let err = indexer.commit_ledger_update(&update).unwrap_err();
    assert!(matches!(err, IndexError::Storage(_)));
    assert_eq!(indexer.committed_slot(), 1);

    assert_eq!(
        by_address(&plain, TestAddress::Alice).output_ids,
        vec![output.output_id]
    );
    assert!(by_address(&plain, TestAddress::Bob).output_ids.is_empty());
    assert_eq!(plain.status().unwrap().committed_slot, 1);
}

#[test]
fn test_store_failure_surfaces_from_queries() {
    let indexer = test_indexer();

    let output = ledger_output(1, 0, basic_output(TestAddress::Alice, 100));
    commit(&indexer, &ledger_update(1, vec![], vec![output]));

    let faulty = FaultyIndexStore::new(indexer.store().clone(), TestFault::IndexStoreError);
    let faulty = Indexer::open(faulty).unwrap();

    let filter = BasicFilter {
        address: Some(TestAddress::Alice.into()),
        ..Default::default()
    };

    assert!(matches!(faulty.query(&filter), Err(IndexError::Storage(_))));
    assert!(matches!(
        faulty.nft_by_id(&NftId::new([1; 32])),
        Err(IndexError::Storage(_))
    ));
    assert!(matches!(
        faulty.resolve_multi_address(&[MULTI_ADDRESS_KIND; 33]),
        Err(IndexError::Storage(_))
    ));
}

#[test]
fn test_table_stats_cover_every_kind() {
    let indexer = test_indexer();

    commit(&indexer, &ledger_update(1, vec![], one_of_each_kind(1)));

    let stats = indexer.store().table_stats().unwrap();

    assert_eq!(stats.len(), OutputKind::ALL.len());
    assert!(stats.values().all(|x| x.stored_bytes() > 0));
}
