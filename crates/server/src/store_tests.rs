// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::Store;
use crate::error::ServiceError;
use crate::notification::{Notification, NotificationType};

fn record(id: &str, user: &str) -> Arc<Notification> {
    Arc::new(Notification {
        id: id.to_owned(),
        user_id: user.to_owned(),
        r#type: NotificationType::System,
        title: "t".to_owned(),
        content: "c".to_owned(),
        is_read: false,
        created_at: None,
        priority: 0,
    })
}

#[test]
fn save_then_find_by_id() {
    let store = Store::new();
    let n = record("n1", "u1");
    store.save(Arc::clone(&n));

    let found = store.find_by_id("n1");
    assert!(found.as_ref().is_some_and(|f| Arc::ptr_eq(f, &n)));
    assert!(store.find_by_id("missing").is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn find_by_user_preserves_insertion_order() {
    let store = Store::new();
    store.save(record("a", "u1"));
    store.save(record("b", "u1"));
    store.save(record("c", "u2"));
    store.save(record("d", "u1"));

    let found = store.find_by_user("u1");
    let ids: Vec<&str> = found.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "d"]);
}

#[test]
fn find_by_user_unknown_is_empty_not_error() {
    let store = Store::new();
    assert!(store.find_by_user("nobody").is_empty());
}

#[test]
fn find_by_user_returns_a_snapshot() {
    let store = Store::new();
    store.save(record("a", "u1"));

    let before = store.find_by_user("u1");
    store.save(record("b", "u1"));

    assert_eq!(before.len(), 1, "earlier snapshot is unaffected by later saves");
    assert_eq!(store.find_by_user("u1").len(), 2);
}

#[test]
fn update_requires_existing_id() {
    let store = Store::new();
    assert_eq!(store.update(record("ghost", "u1")), Err(ServiceError::NotFound));
}

#[test]
fn update_replaces_primary_and_index_position() {
    let store = Store::new();
    store.save(record("a", "u1"));
    store.save(record("b", "u1"));

    let mut changed = (*record("a", "u1")).clone();
    changed.is_read = true;
    let changed = Arc::new(changed);
    assert!(store.update(Arc::clone(&changed)).is_ok());

    let primary = store.find_by_id("a");
    assert!(primary.as_ref().is_some_and(|p| p.is_read));

    let listed = store.find_by_user("u1");
    let ids: Vec<&str> = listed.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"], "index position is preserved");
    assert!(listed.first().is_some_and(|n| Arc::ptr_eq(n, &changed)), "index points at the new record");
}
