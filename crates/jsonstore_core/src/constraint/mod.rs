//! Integrity constraints.
//!
//! Constraints are ordinary records in the reserved `_constraints`
//! collection, so they are snapshotted, merged and rolled back exactly like
//! user data. They are only enforced when a transaction commits.

mod integrity;
pub(crate) mod registry;

pub(crate) use integrity::check;

use crate::collection::Record;
use crate::document::CONSTRAINTS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The rule a constraint enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    /// The attribute must be present and non-null.
    Required,
    /// No two records may share the attribute's value.
    Unique,
    /// Every value must exist in another collection's attribute.
    Reference,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Required => "REQUIRED",
            Self::Unique => "UNIQUE",
            Self::Reference => "REFERENCE",
        };
        f.write_str(name)
    }
}

/// A registered constraint on `collection_name.attribute_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// The constrained collection.
    pub collection_name: String,
    /// The constrained attribute.
    pub attribute_name: String,
    /// The rule.
    #[serde(rename = "constraint_type")]
    pub kind: ConstraintKind,
    /// Target collection of a `REFERENCE` constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_collection_name: Option<String>,
    /// Target attribute of a `REFERENCE` constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_attribute_name: Option<String>,
}

impl Constraint {
    /// Creates a `REQUIRED` constraint.
    pub fn required(collection: &str, attribute: &str) -> Self {
        Self::simple(ConstraintKind::Required, collection, attribute)
    }

    /// Creates a `UNIQUE` constraint.
    pub fn unique(collection: &str, attribute: &str) -> Self {
        Self::simple(ConstraintKind::Unique, collection, attribute)
    }

    /// Creates a `REFERENCE` constraint.
    pub fn reference(
        collection: &str,
        attribute: &str,
        reference_collection: &str,
        reference_attribute: &str,
    ) -> Self {
        Self {
            collection_name: collection.to_string(),
            attribute_name: attribute.to_string(),
            kind: ConstraintKind::Reference,
            reference_collection_name: Some(reference_collection.to_string()),
            reference_attribute_name: Some(reference_attribute.to_string()),
        }
    }

    fn simple(kind: ConstraintKind, collection: &str, attribute: &str) -> Self {
        Self {
            collection_name: collection.to_string(),
            attribute_name: attribute.to_string(),
            kind,
            reference_collection_name: None,
            reference_attribute_name: None,
        }
    }

    /// Returns true if this constraint targets `collection.attribute`.
    #[must_use]
    pub fn targets(&self, collection: &str, attribute: &str) -> bool {
        self.collection_name == collection && self.attribute_name == attribute
    }

    pub(crate) fn violation(&self) -> ConstraintViolation {
        ConstraintViolation {
            kind: self.kind,
            collection: self.collection_name.clone(),
            attribute: self.attribute_name.clone(),
            reference_collection: self.reference_collection_name.clone(),
            reference_attribute: self.reference_attribute_name.clone(),
        }
    }
}

impl Record for Constraint {
    fn collection_name() -> &'static str {
        CONSTRAINTS
    }
}

/// Details of a failed integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// The violated rule.
    pub kind: ConstraintKind,
    /// The constrained collection.
    pub collection: String,
    /// The constrained attribute.
    pub attribute: String,
    /// Target collection, for `REFERENCE`.
    pub reference_collection: Option<String>,
    /// Target attribute, for `REFERENCE`.
    pub reference_attribute: Option<String>,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}.{}", self.kind, self.collection, self.attribute)?;
        if let (Some(collection), Some(attribute)) =
            (&self.reference_collection, &self.reference_attribute)
        {
            write!(f, " -> {collection}.{attribute}")?;
        }
        Ok(())
    }
}
