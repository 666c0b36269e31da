//! Normalized record model shared by every source adapter.
//!
//! A [`NormalizedRecord`] is a row over a fixed, ordered [`Schema`]. Values are
//! [`FieldValue`]s, where [`FieldValue::Absent`] is an explicit "no value" marker
//! that is kept distinct from zero and from an empty string all the way to output.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

/// Ordered column names for one source. Order is part of the output contract.
pub type Schema = &'static [&'static str];

/// Columns that JSON output nests under one key, e.g. `revenue_amount` →
/// `revenue.amount`. Tabular output keeps them as flat columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGroup {
    pub key: &'static str,
    /// `(column, nested key)` pairs in nesting order.
    pub members: &'static [(&'static str, &'static str)],
}

impl FieldGroup {
    fn nested_key(&self, column: &str) -> Option<&'static str> {
        self.members
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, nested)| *nested)
    }
}

/// A categorical label with an optional icon reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub icon: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
        }
    }

    pub fn with_icon(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: Some(icon.into()),
        }
    }
}

// The icon key is omitted rather than written as null when there is no icon.
impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.icon.is_some() { 2 } else { 1 };
        let mut state = serializer.serialize_struct("Tag", len)?;
        state.serialize_field("name", &self.name)?;
        if let Some(icon) = &self.icon {
            state.serialize_field("icon", icon)?;
        }
        state.end()
    }
}

/// A normalized value, or the explicit absence of one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Absent,
    Number(f64),
    Integer(i64),
    Text(String),
    Tags(Vec<Tag>),
}

impl FieldValue {
    /// Text value; blank text is treated as absent.
    pub fn text(value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            FieldValue::Absent
        } else {
            FieldValue::Text(trimmed.to_string())
        }
    }

    pub fn number(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Number)
    }

    pub fn integer(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Integer)
    }

    pub fn optional_text(value: Option<String>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::text)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Rendering used for tabular output. Absent renders as an empty cell.
    pub fn to_cell(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Absent => Ok(()),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Tags(tags) => {
                let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
                f.write_str(&names.join("; "))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::text(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::text(value)
    }
}

impl From<Vec<Tag>> for FieldValue {
    fn from(value: Vec<Tag>) -> Self {
        FieldValue::Tags(value)
    }
}

/// Ordered, adapter-side collection of named values used to build records.
///
/// Inserting a name that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    entries: Vec<(&'static str, FieldValue)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Copy of `self` with every entry of `other` laid over it.
    pub fn overlaid_with(&self, other: &FieldSet) -> FieldSet {
        let mut merged = self.clone();
        for (name, value) in &other.entries {
            merged.insert(*name, value.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One output row. Always carries exactly the fields of its schema, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    schema: Schema,
    groups: &'static [FieldGroup],
    values: Vec<FieldValue>,
}

impl NormalizedRecord {
    /// Project a field set onto `schema`. Fields the set lacks are absent;
    /// fields the schema does not declare are dropped.
    pub fn from_field_set(schema: Schema, fields: &FieldSet) -> Self {
        let values = schema
            .iter()
            .map(|name| fields.get(name).cloned().unwrap_or(FieldValue::Absent))
            .collect();
        Self {
            schema,
            groups: &[],
            values,
        }
    }

    /// Like [`Self::from_field_set`], with `groups` nested in JSON output.
    pub fn grouped(schema: Schema, groups: &'static [FieldGroup], fields: &FieldSet) -> Self {
        Self {
            groups,
            ..Self::from_field_set(schema, fields)
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .iter()
            .position(|n| *n == name)
            .map(|idx| &self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.schema.iter().copied().zip(self.values.iter())
    }

    pub fn to_csv_row(&self) -> Vec<String> {
        self.values.iter().map(FieldValue::to_cell).collect()
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let nested: usize = self.groups.iter().map(|g| g.members.len()).sum();
        let mut map = serializer.serialize_map(Some(self.schema.len() - nested + self.groups.len()))?;
        let mut emitted: Vec<&'static str> = Vec::new();
        for (name, value) in self.iter() {
            match self.groups.iter().find(|g| g.nested_key(name).is_some()) {
                Some(group) if emitted.contains(&group.key) => {}
                Some(group) => {
                    emitted.push(group.key);
                    map.serialize_entry(group.key, &GroupView { group, record: self })?;
                }
                None => map.serialize_entry(name, value)?,
            }
        }
        map.end()
    }
}

/// One group of a record, serialized as a nested object.
struct GroupView<'a> {
    group: &'a FieldGroup,
    record: &'a NormalizedRecord,
}

impl Serialize for GroupView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.group.members.len()))?;
        for (column, nested) in self.group.members {
            match self.record.get(column) {
                Some(value) => map.serialize_entry(nested, value)?,
                None => map.serialize_entry(nested, &FieldValue::Absent)?,
            }
        }
        map.end()
    }
}
