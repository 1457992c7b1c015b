//! The document model.
//!
//! A document is a JSON object whose values are arrays. Each array is a
//! collection of records. The store's own metadata (constraints, sequences,
//! the collection catalogue) lives in reserved collections of the same
//! document, so every component reads it through the same machinery as user
//! data.

use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved collection holding constraint definitions.
pub const CONSTRAINTS: &str = "_constraints";
/// Reserved collection holding sequence counters.
pub const SEQUENCES: &str = "_sequences";
/// Reserved collection cataloguing user collections.
pub const COLLECTIONS: &str = "_collections";

const RESERVED: [&str; 3] = [CONSTRAINTS, SEQUENCES, COLLECTIONS];

/// Returns true if `name` is one of the store's metadata collections.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Catalogue entry written to `_collections` the first time a user
/// collection is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Unqualified type name of the records first written to it.
    pub element_type: String,
}

/// A full database snapshot: collection name to array of records.
///
/// Cloning a document is a deep copy; every transaction owns its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    collections: Map<String, Value>,
}

impl Document {
    /// Creates an empty document (`{}`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a stored stream.
    ///
    /// An empty (or whitespace-only) stream is an empty document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the bytes are not a JSON object of arrays.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }

        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::invalid_format(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Builds a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` unless the value is an object whose members
    /// are all arrays.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let Value::Object(collections) = value else {
            return Err(CoreError::invalid_format("top level must be a JSON object"));
        };

        if let Some((name, _)) = collections.iter().find(|(_, v)| !v.is_array()) {
            return Err(CoreError::invalid_format(format!(
                "collection '{name}' is not an array"
            )));
        }

        Ok(Self { collections })
    }

    /// Serializes the document for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self, pretty: bool) -> CoreResult<Vec<u8>> {
        let bytes = if pretty {
            serde_json::to_vec_pretty(&self.collections)?
        } else {
            serde_json::to_vec(&self.collections)?
        };
        Ok(bytes)
    }

    /// Returns the document as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.collections.clone())
    }

    /// Returns the raw records of a collection.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&Vec<Value>> {
        self.collections.get(name).and_then(Value::as_array)
    }

    /// Returns true if the collection exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Replaces a collection's records.
    pub fn set_collection(&mut self, name: &str, records: Vec<Value>) {
        self.collections
            .insert(name.to_string(), Value::Array(records));
    }

    /// Removes a collection, returning its records.
    pub fn remove_collection(&mut self, name: &str) -> Option<Vec<Value>> {
        match self.collections.remove(name) {
            Some(Value::Array(records)) => Some(records),
            _ => None,
        }
    }

    /// Returns the names of user collections (reserved ones excluded).
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        self.collections
            .keys()
            .filter(|name| !is_reserved(name))
            .cloned()
            .collect()
    }

    /// Returns the number of collections, reserved ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns true if the document has no collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Deserializes every record of a collection as shape `S`.
    ///
    /// The same array can be read as a typed record list or as
    /// [`DynamicRecord`](crate::DynamicRecord)s; the shape is chosen by the
    /// caller. A missing collection reads as empty.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a record does not fit `S`.
    pub fn records<S: DeserializeOwned>(&self, name: &str) -> CoreResult<Vec<S>> {
        let Some(values) = self.collection(name) else {
            return Ok(Vec::new());
        };

        values
            .iter()
            .map(|value| S::deserialize(value).map_err(CoreError::from))
            .collect()
    }

    /// Adds a catalogue row for a user collection if it has none yet.
    pub(crate) fn register_collection(&mut self, name: &str, element_type: &str) {
        if is_reserved(name) {
            return;
        }

        let known = self
            .collection(COLLECTIONS)
            .is_some_and(|rows| rows.iter().any(|row| row["name"] == name));
        if known {
            return;
        }

        let entry = serde_json::json!({ "name": name, "element_type": element_type });
        match self.collections.get_mut(COLLECTIONS) {
            Some(Value::Array(rows)) => rows.push(entry),
            _ => self.set_collection(COLLECTIONS, vec![entry]),
        }
    }

    /// Returns the catalogue of user collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue rows are malformed.
    pub fn collections(&self) -> CoreResult<Vec<CollectionInfo>> {
        self.records(COLLECTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_stream_is_empty_document() {
        assert!(Document::from_bytes(b"").unwrap().is_empty());
        assert!(Document::from_bytes(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn parse_and_serialize() {
        let doc = Document::from_bytes(br#"{"users":[{"name":"a"},{"name":"b"}]}"#).unwrap();
        assert_eq!(doc.collection("users").unwrap().len(), 2);

        let reparsed = Document::from_bytes(&doc.to_bytes(true).unwrap()).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn rejects_non_object() {
        let result = Document::from_bytes(b"[1,2,3]");
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn rejects_non_array_collection() {
        let result = Document::from_bytes(br#"{"users":{"name":"a"}}"#);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn rejects_garbage() {
        let result = Document::from_bytes(&[0x9f, 0x00, 0x13, 0x37]);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn records_as_typed_and_dynamic() {
        #[derive(Deserialize)]
        struct User {
            name: String,
        }

        let doc = Document::from_value(json!({"users": [{"name": "a", "age": 3}]})).unwrap();

        let typed: Vec<User> = doc.records("users").unwrap();
        assert_eq!(typed[0].name, "a");

        let dynamic: Vec<Map<String, Value>> = doc.records("users").unwrap();
        assert_eq!(dynamic[0]["age"], json!(3));
    }

    #[test]
    fn missing_collection_reads_empty() {
        let doc = Document::new();
        let rows: Vec<Value> = doc.records("nothing").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn collection_names_skip_reserved() {
        let mut doc = Document::new();
        doc.set_collection("users", vec![]);
        doc.set_collection(CONSTRAINTS, vec![]);
        doc.set_collection(SEQUENCES, vec![]);

        assert_eq!(doc.collection_names(), vec!["users".to_string()]);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn register_collection_once() {
        let mut doc = Document::new();
        doc.register_collection("users", "app::User");
        doc.register_collection("users", "app::User");
        doc.register_collection(SEQUENCES, "Sequence");

        let catalogue = doc.collections().unwrap();
        assert_eq!(
            catalogue,
            vec![CollectionInfo {
                name: "users".into(),
                element_type: "User".into(),
            }]
        );
    }

    #[test]
    fn clone_is_independent() {
        let mut original = Document::new();
        original.set_collection("users", vec![json!({"name": "a"})]);

        let mut snapshot = original.clone();
        snapshot.remove_collection("users");

        assert!(original.contains("users"));
        assert!(!snapshot.contains("users"));
    }
}
