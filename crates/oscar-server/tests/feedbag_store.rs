//! Feedbag store contract tests against the SQLite implementation.

use oscar_proto::snacs::feedbag::{CLASS_BUDDY, CLASS_DENY, FeedbagItem};
use oscar_proto::tlv::{Tlv, TlvLBlock};
use oscar_server::store::{Blocked, FeedbagStore, SqliteFeedbagStore, StoreError};

fn store() -> SqliteFeedbagStore {
    SqliteFeedbagStore::open_in_memory().unwrap()
}

fn buddy(owner_item_id: u16, name: &str) -> FeedbagItem {
    FeedbagItem {
        name: name.to_string(),
        group_id: 0,
        item_id: owner_item_id,
        class_id: CLASS_BUDDY,
        attributes: TlvLBlock::new(),
    }
}

fn deny(item_id: u16, name: &str) -> FeedbagItem {
    FeedbagItem {
        name: name.to_string(),
        group_id: 0,
        item_id,
        class_id: CLASS_DENY,
        attributes: TlvLBlock::new(),
    }
}

#[test]
fn upsert_retrieve_delete_round_trip() {
    let store = store();
    let item = FeedbagItem {
        name: "spimmer".to_string(),
        group_id: 0,
        item_id: 1805,
        class_id: CLASS_DENY,
        attributes: TlvLBlock::from(vec![Tlv::new_u16(0x0001, 1000)]),
    };

    store.upsert("mike", &[item.clone()]).unwrap();
    let items = store.retrieve("mike").unwrap();
    assert_eq!(items, vec![item.clone()]);

    store.delete("mike", &[item]).unwrap();
    assert!(store.retrieve("mike").unwrap().is_empty());
}

#[test]
fn upsert_replaces_on_owner_group_item_key() {
    let store = store();
    store.upsert("mike", &[buddy(1, "alice")]).unwrap();
    store.upsert("mike", &[buddy(1, "bob")]).unwrap();

    let items = store.retrieve("mike").unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "bob");
}

#[test]
fn last_modified_of_empty_feedbag_is_epoch_zero() {
    let store = store();
    assert_eq!(store.last_modified("nobody").unwrap(), 0);

    store.upsert("mike", &[buddy(1, "alice")]).unwrap();
    assert!(store.last_modified("mike").unwrap() > 0);
}

#[test]
fn unrelated_pair_is_not_blocked() {
    let store = store();
    store.upsert("alice", &[buddy(1, "bob")]).unwrap();
    assert_eq!(store.blocked("alice", "bob").unwrap(), Blocked::No);
    assert_eq!(store.blocked("bob", "alice").unwrap(), Blocked::No);
}

#[test]
fn block_relation_reports_the_blocking_side() {
    let store = store();
    store.upsert("alice", &[deny(1, "bob")]).unwrap();

    assert_eq!(store.blocked("alice", "bob").unwrap(), Blocked::A);
    assert_eq!(store.blocked("bob", "alice").unwrap(), Blocked::B);
}

#[test]
fn interested_users_are_the_watchers() {
    let store = store();
    store.upsert("bob", &[buddy(1, "alice")]).unwrap();
    store.upsert("carol", &[buddy(1, "alice")]).unwrap();
    store.upsert("dave", &[buddy(1, "someone-else")]).unwrap();

    let mut interested = store.interested_users("alice").unwrap();
    interested.sort();
    assert_eq!(interested, vec!["bob".to_string(), "carol".to_string()]);
}

#[test]
fn interested_users_never_contains_a_blocked_pair() {
    let store = store();
    store.upsert("bob", &[buddy(1, "alice")]).unwrap();
    store.upsert("carol", &[buddy(1, "alice")]).unwrap();
    // Blocks in each direction knock out one watcher each
    store.upsert("bob", &[deny(2, "alice")]).unwrap();
    store.upsert("alice", &[deny(1, "carol")]).unwrap();

    assert!(store.interested_users("alice").unwrap().is_empty());
}

#[test]
fn buddies_filter_blocked_pairs() {
    let store = store();
    store.upsert("alice", &[buddy(1, "bob"), buddy(2, "carol")]).unwrap();
    store.upsert("carol", &[deny(1, "alice")]).unwrap();

    assert_eq!(store.buddies("alice").unwrap(), vec!["bob".to_string()]);
}

#[test]
fn profile_requires_an_existing_user() {
    let store = store();
    match store.retrieve_profile("ghost") {
        Err(StoreError::UserNotFound(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected UserNotFound, got {other:?}"),
    }

    store.upsert_user("alice").unwrap();
    assert_eq!(store.retrieve_profile("alice").unwrap(), "");

    store.upsert_profile("alice", "my profile").unwrap();
    assert_eq!(store.retrieve_profile("alice").unwrap(), "my profile");

    store.upsert_profile("alice", "updated").unwrap();
    assert_eq!(store.retrieve_profile("alice").unwrap(), "updated");
}

#[test]
fn upsert_user_is_idempotent() {
    let store = store();
    store.upsert_user("alice").unwrap();
    store.upsert_user("alice").unwrap();
    assert_eq!(store.retrieve_profile("alice").unwrap(), "");
}
