//! Source adapters.
//!
//! Each source shape gets its own adapter behind the [`SourceAdapter`] contract:
//! one [`RawDocument`] in, an [`Extraction`] of fixed-schema records out. The
//! adapter is chosen from the [`SourceId`] at the call site.

pub mod badge_cards;
pub mod cards;
pub mod next_data;
pub mod rest_collection;
pub mod table_rows;

use crate::record::{FieldValue, NormalizedRecord, Schema};
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

pub use badge_cards::BadgeCardAdapter;
pub use cards::LabeledCardAdapter;
pub use next_data::NextDataAdapter;
pub use rest_collection::RestCollectionAdapter;
pub use table_rows::TableRowAdapter;

/// Identity of a configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum SourceId {
    StarterStory,
    AbbHome,
    BirBank,
    XalqBank,
    PashaBank,
}

impl SourceId {
    pub const ALL: [SourceId; 5] = [
        SourceId::StarterStory,
        SourceId::AbbHome,
        SourceId::BirBank,
        SourceId::XalqBank,
        SourceId::PashaBank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::StarterStory => "starterstory",
            SourceId::AbbHome => "abbhome",
            SourceId::BirBank => "birbank",
            SourceId::XalqBank => "xalqbank",
            SourceId::PashaBank => "pashabank",
        }
    }

    pub fn shape(&self) -> SourceShape {
        match self {
            SourceId::StarterStory => SourceShape::TabularRows,
            SourceId::AbbHome => SourceShape::EmbeddedData,
            SourceId::BirBank => SourceShape::RestCollection,
            SourceId::XalqBank => SourceShape::LabeledCards,
            SourceId::PashaBank => SourceShape::BadgeCards,
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            SourceId::StarterStory => table_rows::STARTERSTORY_SCHEMA,
            SourceId::AbbHome => next_data::ABBHOME_SCHEMA,
            SourceId::BirBank => rest_collection::BIRBANK_SCHEMA,
            SourceId::XalqBank => cards::XALQBANK_SCHEMA,
            SourceId::PashaBank => badge_cards::PASHABANK_SCHEMA,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    TabularRows,
    EmbeddedData,
    RestCollection,
    LabeledCards,
    BadgeCards,
}

impl fmt::Display for SourceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceShape::TabularRows => "html table rows",
            SourceShape::EmbeddedData => "embedded page JSON",
            SourceShape::RestCollection => "REST collection",
            SourceShape::LabeledCards => "cards with labeled lines",
            SourceShape::BadgeCards => "cards with icon badges",
        };
        f.write_str(label)
    }
}

/// Payload of one fetch: markup/JSON text, or JSON that is already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDocument {
    Text(String),
    Json(Value),
}

impl RawDocument {
    pub fn as_html(&self) -> Result<Html, StructureError> {
        match self {
            RawDocument::Text(text) => Ok(Html::parse_document(text)),
            RawDocument::Json(_) => Err(StructureError::UnexpectedDocument { expected: "markup" }),
        }
    }

    pub fn as_json(&self) -> Result<Cow<'_, Value>, StructureError> {
        match self {
            RawDocument::Json(value) => Ok(Cow::Borrowed(value)),
            RawDocument::Text(text) => serde_json::from_str(text)
                .map(Cow::Owned)
                .map_err(|e| StructureError::InvalidJson(e.to_string())),
        }
    }
}

/// A document that does not have the shape an adapter expects at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    #[error("expected container `{0}` not found")]
    MissingContainer(&'static str),

    #[error("expected JSON path `{0}` not found")]
    MissingPath(&'static str),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("document is not {expected}")]
    UnexpectedDocument { expected: &'static str },
}

/// Why a single entity (row, card, partner) was skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntityError {
    #[error("row has {found} cells, expected at least {required}")]
    TooFewCells { found: usize, required: usize },

    #[error("entity is not a JSON object")]
    NotAnObject,

    #[error("no name found")]
    MissingName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Top-level entities encountered, premium and malformed ones included.
    pub seen: usize,
    /// Malformed entities dropped, at any nesting level.
    pub skipped: usize,
    /// Rows hidden behind a paywall, dropped before parsing.
    pub premium_skipped: usize,
}

/// Records produced from one document plus the counts of what was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<NormalizedRecord>,
    pub stats: ExtractionStats,
}

impl Extraction {
    pub fn push_entity(&mut self, rows: impl IntoIterator<Item = NormalizedRecord>) {
        self.stats.seen += 1;
        self.records.extend(rows);
    }

    pub fn skip_entity(&mut self, source: SourceId, index: usize, reason: &EntityError) {
        self.stats.seen += 1;
        self.stats.skipped += 1;
        warn!("{}: skipping entity {}: {}", source, index + 1, reason);
    }

    /// A malformed entity nested under an entity that was otherwise kept.
    pub fn skip_nested(&mut self, source: SourceId, parent: usize, reason: &EntityError) {
        self.stats.skipped += 1;
        warn!("{}: skipping child of entity {}: {}", source, parent + 1, reason);
    }

    pub fn skip_premium(&mut self, source: SourceId, index: usize) {
        self.stats.seen += 1;
        self.stats.premium_skipped += 1;
        debug!("{}: skipping premium row {}", source, index + 1);
    }
}

/// Contract shared by every source shape.
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;

    fn schema(&self) -> Schema {
        self.source().schema()
    }

    /// Strict extraction: a structurally unusable document is an error.
    fn extract(&self, document: &RawDocument) -> Result<Extraction, StructureError>;

    /// Extraction that never fails: structural errors yield an empty result.
    fn adapt(&self, document: &RawDocument) -> Extraction {
        match self.extract(document) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("{}: document rejected: {}", self.source(), e);
                Extraction::default()
            }
        }
    }
}

/// Per-source knobs the adapters need beyond the document itself.
#[derive(Debug, Clone, Default)]
pub struct AdapterOptions {
    pub asset_base: Option<String>,
    pub address_label: Option<String>,
    pub phone_label: Option<String>,
}

/// Build the adapter for `source`.
pub fn adapter_for(source: SourceId, options: &AdapterOptions) -> Box<dyn SourceAdapter> {
    match source {
        SourceId::StarterStory => Box::new(TableRowAdapter),
        SourceId::AbbHome => Box::new(NextDataAdapter),
        SourceId::BirBank => Box::new(RestCollectionAdapter::new(
            options
                .asset_base
                .clone()
                .unwrap_or_else(|| rest_collection::DEFAULT_ASSET_BASE.to_string()),
        )),
        SourceId::XalqBank => {
            let mut adapter = LabeledCardAdapter::default();
            if let Some(label) = &options.address_label {
                adapter.address_label = label.clone();
            }
            if let Some(label) = &options.phone_label {
                adapter.phone_label = label.clone();
            }
            Box::new(adapter)
        }
        SourceId::PashaBank => Box::new(BadgeCardAdapter::new(
            options
                .asset_base
                .clone()
                .unwrap_or_else(|| badge_cards::DEFAULT_SITE_BASE.to_string()),
        )),
    }
}

/// Normalize a scalar JSON field. Null or missing is absent; `0` stays `0`.
pub(crate) fn json_field(value: Option<&Value>) -> FieldValue {
    match value {
        None | Some(Value::Null) => FieldValue::Absent,
        Some(Value::String(s)) => FieldValue::text(s),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::number(n.as_f64()),
        },
        Some(Value::Bool(b)) => FieldValue::Text(b.to_string()),
        Some(other) => FieldValue::text(other.to_string()),
    }
}

/// String content of a JSON field, empty when missing or not a string.
pub(crate) fn json_str<'a>(value: Option<&'a Value>) -> &'a str {
    value.and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_field_keeps_zero_distinct_from_null() {
        let obj = json!({"a": 0, "b": null, "c": "  x ", "d": 12.5});
        assert_eq!(json_field(obj.get("a")), FieldValue::Integer(0));
        assert_eq!(json_field(obj.get("b")), FieldValue::Absent);
        assert_eq!(json_field(obj.get("missing")), FieldValue::Absent);
        assert_eq!(json_field(obj.get("c")), FieldValue::Text("x".into()));
        assert_eq!(json_field(obj.get("d")), FieldValue::Number(12.5));
    }

    #[test]
    fn test_adapt_swallows_structural_errors() {
        let adapter = adapter_for(SourceId::BirBank, &AdapterOptions::default());
        let extraction = adapter.adapt(&RawDocument::Text("not json".into()));
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.stats, ExtractionStats::default());
    }

    #[test]
    fn test_every_source_has_distinct_non_empty_schema() {
        for source in SourceId::ALL {
            let schema = source.schema();
            assert!(!schema.is_empty());
            let mut names: Vec<&str> = schema.to_vec();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), schema.len(), "duplicate column in {}", source);
            assert_eq!(adapter_for(source, &AdapterOptions::default()).source(), source);
        }
    }

    #[test]
    fn test_source_id_round_trips_through_config_names() {
        for source in SourceId::ALL {
            let parsed: SourceId = serde_json::from_value(json!(source.as_str())).unwrap();
            assert_eq!(parsed, source);
        }
    }
}
