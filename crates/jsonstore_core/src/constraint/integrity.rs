//! Commit-time integrity checking.

use crate::collection::DynamicRecord;
use crate::constraint::{Constraint, ConstraintKind};
use crate::document::{Document, CONSTRAINTS};
use crate::error::{CoreError, CoreResult};
use serde_json::Value;
use std::collections::HashSet;

/// Validates every registered constraint against `document`.
///
/// All `REQUIRED` constraints are checked first, then `UNIQUE`, then
/// `REFERENCE`. The first failing constraint is reported.
pub(crate) fn check(document: &Document) -> CoreResult<()> {
    let constraints: Vec<Constraint> = document.records(CONSTRAINTS)?;
    if constraints.is_empty() {
        return Ok(());
    }

    for kind in [
        ConstraintKind::Required,
        ConstraintKind::Unique,
        ConstraintKind::Reference,
    ] {
        for constraint in constraints.iter().filter(|c| c.kind == kind) {
            let records: Vec<DynamicRecord> = document.records(&constraint.collection_name)?;
            let holds = match kind {
                ConstraintKind::Required => check_required(&records, &constraint.attribute_name),
                ConstraintKind::Unique => check_unique(&records, &constraint.attribute_name),
                ConstraintKind::Reference => check_reference(document, &records, constraint)?,
            };
            if !holds {
                return Err(constraint.violation().into());
            }
        }
    }
    Ok(())
}

fn check_required(records: &[DynamicRecord], attribute: &str) -> bool {
    records
        .iter()
        .all(|record| record.get(attribute).is_some_and(|value| !value.is_null()))
}

/// Values compare by their JSON text; a missing attribute counts as `null`.
fn check_unique(records: &[DynamicRecord], attribute: &str) -> bool {
    let mut seen = HashSet::with_capacity(records.len());
    records.iter().all(|record| seen.insert(comparable(record.get(attribute))))
}

/// Null or missing dependent values are not checked.
fn check_reference(
    document: &Document,
    records: &[DynamicRecord],
    constraint: &Constraint,
) -> CoreResult<bool> {
    let (Some(target_collection), Some(target_attribute)) = (
        constraint.reference_collection_name.as_deref(),
        constraint.reference_attribute_name.as_deref(),
    ) else {
        return Err(CoreError::invalid_format(format!(
            "reference constraint on {}.{} has no target",
            constraint.collection_name, constraint.attribute_name
        )));
    };

    let targets: Vec<DynamicRecord> = document.records(target_collection)?;
    let known: HashSet<String> = targets
        .iter()
        .filter_map(|record| record.get(target_attribute))
        .filter(|value| !value.is_null())
        .map(|value| comparable(Some(value)))
        .collect();

    Ok(records
        .iter()
        .filter_map(|record| record.get(&constraint.attribute_name))
        .filter(|value| !value.is_null())
        .all(|value| known.contains(&comparable(Some(value)))))
}

fn comparable(value: Option<&Value>) -> String {
    value.map_or_else(|| Value::Null.to_string(), Value::to_string)
}
