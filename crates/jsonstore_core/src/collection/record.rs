//! Record trait for typed collections.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Schema-less record shape: a string-keyed JSON object.
///
/// Any collection can be read this way regardless of the type it was written
/// with. The integrity checker relies on it.
pub type DynamicRecord = serde_json::Map<String, serde_json::Value>;

/// Trait for types that live in a default-named collection.
///
/// The default collection name is the unqualified type name, so `app::User`
/// lives in `"User"`. Override [`collection_name`](Record::collection_name)
/// to pick another.
///
/// # Example
///
/// ```rust
/// use jsonstore_core::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Invoice {
///     number: i64,
/// }
///
/// impl Record for Invoice {}
///
/// assert_eq!(Invoice::collection_name(), "Invoice");
/// ```
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Returns the name of the collection this type is stored in.
    fn collection_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

impl Record for DynamicRecord {
    fn collection_name() -> &'static str {
        "DynamicRecord"
    }
}

/// Strips module path and generic arguments from a type name.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
