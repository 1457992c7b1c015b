//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records, collection names and
//! whole documents that the store accepts.

use crate::fixtures::User;
use jsonstore_core::{is_reserved, Document};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating user collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9_]{0,15}")
        .expect("Invalid regex")
        .prop_filter("Reserved names are not user collections", |s| {
            !is_reserved(s)
        })
}

/// Strategy for generating scalar JSON values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

/// Strategy for generating schema-less records.
pub fn dynamic_record_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", scalar_strategy(), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for generating documents with a few user collections.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(
        collection_name_strategy(),
        prop::collection::vec(dynamic_record_strategy(), 0..8),
        0..4,
    )
    .prop_map(|collections| {
        let mut document = Document::new();
        for (name, records) in collections {
            document.set_collection(&name, records.into_iter().map(Value::Object).collect());
        }
        document
    })
}

/// Strategy for generating named users with distinct ids.
pub fn users_strategy(max: usize) -> impl Strategy<Value = Vec<User>> {
    prop::collection::btree_set(any::<i32>(), 0..max).prop_map(|ids| {
        ids.into_iter()
            .map(|id| User::new(i64::from(id), &format!("user{id}")))
            .collect()
    })
}

/// Strategy for generating interleaved sequence names.
pub fn sequence_calls_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(vec!["User", "Order", "Invoice"]), 0..32)
        .prop_map(|names| names.into_iter().map(str::to_string).collect())
}
