//! Parent/child flattening.
//!
//! A parent entity with `n` children becomes `max(1, n)` rows over one schema.
//! Parent values are copied into every row; a child value wins over a parent
//! value of the same name. With no children the single row leaves every
//! child-only field absent.

use crate::record::{FieldSet, NormalizedRecord, Schema};

pub fn flatten(schema: Schema, parent: &FieldSet, children: &[FieldSet]) -> Vec<NormalizedRecord> {
    if children.is_empty() {
        return vec![NormalizedRecord::from_field_set(schema, parent)];
    }

    children
        .iter()
        .map(|child| NormalizedRecord::from_field_set(schema, &parent.overlaid_with(child)))
        .collect()
}
