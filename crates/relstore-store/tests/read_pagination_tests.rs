// Integration tests for tuple reads and cursor pagination

mod common;

use std::collections::HashSet;

use common::{new_store, setup, setup_with, tk};
use relstore_core::errors::ExErrorKind;
use relstore_core::{Pagination, TupleKey, WriteOptions};
use relstore_store::{
    Datastore, ObjectRelation, ReadPageOptions, ReadStartingWithUserFilter,
    ReadUsersetTuplesFilter, UsersetRestriction,
};

fn seed(ds: &Datastore, store: &str, n: usize) -> Vec<TupleKey> {
    let keys: Vec<TupleKey> = (0..n)
        .map(|i| tk(&format!("doc:{:03}", i), "viewer", "user:anne"))
        .collect();
    ds.write(store, &[], &keys, WriteOptions::default()).unwrap();
    keys
}

fn page(
    ds: &Datastore,
    store: &str,
    pagination: Pagination,
) -> (Vec<String>, Option<String>) {
    let (tuples, token) = ds
        .read_page(store, &tk("doc:", "", ""), ReadPageOptions { pagination })
        .unwrap();
    (tuples.into_iter().map(|t| t.key.object).collect(), token)
}

#[test]
fn test_pages_cover_everything_exactly_once() {
    // Given: 25 tuples
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    seed(&ds, &store, 25);

    // When: Following tokens with a page size of 10
    let mut seen = Vec::new();
    let mut sizes = Vec::new();
    let mut pagination = Pagination::new(10);
    loop {
        let (objects, token) = page(&ds, &store, pagination.clone());
        sizes.push(objects.len());
        seen.extend(objects);
        match token {
            Some(t) => pagination = Pagination::new(10).from_token(t),
            None => break,
        }
    }

    // Then: Every tuple appears once, in write order
    assert_eq!(sizes, vec![10, 10, 5]);
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 25);
    assert_eq!(seen.first().map(String::as_str), Some("doc:000"));
    assert_eq!(seen.last().map(String::as_str), Some("doc:024"));
}

#[test]
fn test_exact_multiple_has_no_trailing_token() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    seed(&ds, &store, 20);

    let (first, token) = page(&ds, &store, Pagination::new(10));
    assert_eq!(first.len(), 10);
    let (second, token) = page(&ds, &store, Pagination::new(10).from_token(token.unwrap()));
    assert_eq!(second.len(), 10);
    assert!(token.is_none());
}

#[test]
fn test_zero_page_size_returns_all() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    seed(&ds, &store, 12);

    let (objects, token) = page(&ds, &store, Pagination::unbounded());
    assert_eq!(objects.len(), 12);
    assert!(token.is_none());
}

#[test]
fn test_tuples_written_after_token_are_not_skipped() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    seed(&ds, &store, 5);

    let (_, token) = page(&ds, &store, Pagination::new(3));
    ds.write(&store, &[], &[tk("doc:999", "viewer", "user:anne")], WriteOptions::default())
        .unwrap();
    let (rest, token) = page(&ds, &store, Pagination::new(10).from_token(token.unwrap()));

    assert_eq!(rest, vec!["doc:003", "doc:004", "doc:999"]);
    assert!(token.is_none());
}

#[test]
fn test_malformed_token_rejected() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    seed(&ds, &store, 3);

    let err = ds
        .read_page(
            &store,
            &tk("doc:", "", ""),
            ReadPageOptions {
                pagination: Pagination::new(2).from_token("%%% not a token %%%"),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidContinuationToken);
}

#[test]
fn test_iterator_crosses_batch_boundaries() {
    let (_dir, ds) = setup_with(|c| c.with_batch_size(4));
    let store = new_store(&ds);
    seed(&ds, &store, 11);

    let objects: Vec<String> = ds
        .read(&store, &tk("doc", "viewer", ""))
        .unwrap()
        .map(|t| t.unwrap().key.object)
        .collect();
    assert_eq!(objects.len(), 11);
    let unique: HashSet<_> = objects.iter().collect();
    assert_eq!(unique.len(), 11);
}

#[test]
fn test_read_filters() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    ds.write(
        &store,
        &[],
        &[
            tk("doc:1", "viewer", "user:anne"),
            tk("doc:1", "editor", "user:anne"),
            tk("doc:2", "viewer", "user:bob"),
            tk("folder:1", "viewer", "user:anne"),
        ],
        WriteOptions::default(),
    )
    .unwrap();

    let count = |key: TupleKey| ds.read(&store, &key).unwrap().count();
    assert_eq!(count(tk("", "", "")), 4);
    assert_eq!(count(tk("doc:", "", "")), 3);
    assert_eq!(count(tk("doc:1", "", "")), 2);
    assert_eq!(count(tk("doc:1", "viewer", "")), 1);
    assert_eq!(count(tk("doc:", "viewer", "user:anne")), 1);
    assert_eq!(count(tk("folder", "", "")), 1);
}

#[test]
fn test_read_user_tuple_not_found() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);

    let err = ds
        .read_user_tuple(&store, &tk("doc:1", "viewer", "user:anne"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_read_userset_tuples() {
    // Given: A direct user, a wildcard and two usersets on one relation
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    ds.write(
        &store,
        &[],
        &[
            tk("doc:1", "viewer", "user:anne"),
            tk("doc:1", "viewer", "user:*"),
            tk("doc:1", "viewer", "group:eng#member"),
            tk("doc:1", "viewer", "team:ops#lead"),
        ],
        WriteOptions::default(),
    )
    .unwrap();

    let users = |restrictions: Vec<UsersetRestriction>| -> Vec<String> {
        let mut users: Vec<String> = ds
            .read_userset_tuples(
                &store,
                ReadUsersetTuplesFilter {
                    object: "doc:1".into(),
                    relation: "viewer".into(),
                    allowed_user_type_restrictions: restrictions,
                },
            )
            .unwrap()
            .map(|t| t.unwrap().key.user)
            .collect();
        users.sort();
        users
    };

    // Then: Direct users are never returned
    assert_eq!(users(vec![]), vec!["group:eng#member", "team:ops#lead", "user:*"]);
    assert_eq!(
        users(vec![UsersetRestriction::relation("group", "member")]),
        vec!["group:eng#member"]
    );
    assert_eq!(users(vec![UsersetRestriction::wildcard("user")]), vec!["user:*"]);
    assert_eq!(
        users(vec![
            UsersetRestriction::relation("team", "lead"),
            UsersetRestriction::wildcard("user"),
        ]),
        vec!["team:ops#lead", "user:*"]
    );
}

#[test]
fn test_read_starting_with_user_orders_by_object_id() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    ds.write(
        &store,
        &[],
        &[
            tk("doc:c", "viewer", "group:eng#member"),
            tk("doc:b", "viewer", "user:anne"),
            tk("doc:a", "viewer", "user:anne"),
            tk("doc:d", "viewer", "user:bob"),
            tk("doc:e", "editor", "user:anne"),
        ],
        WriteOptions::default(),
    )
    .unwrap();

    let filter = ReadStartingWithUserFilter {
        object_type: "doc".into(),
        relation: "viewer".into(),
        user_filter: vec![
            ObjectRelation::new("user:anne"),
            ObjectRelation::new("group:eng").with_relation("member"),
        ],
        object_ids: None,
    };
    let objects: Vec<String> = ds
        .read_starting_with_user(&store, filter.clone())
        .unwrap()
        .map(|t| t.unwrap().key.object)
        .collect();
    assert_eq!(objects, vec!["doc:a", "doc:b", "doc:c"]);

    let narrowed: Vec<String> = ds
        .read_starting_with_user(
            &store,
            ReadStartingWithUserFilter {
                object_ids: Some(vec!["b".into(), "z".into()]),
                ..filter
            },
        )
        .unwrap()
        .map(|t| t.unwrap().key.object)
        .collect();
    assert_eq!(narrowed, vec!["doc:b"]);
}
