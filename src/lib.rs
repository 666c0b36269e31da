pub mod adapters;
pub mod cli;
pub mod config;
pub mod export;
pub mod fetch;
pub mod flatten;
pub mod logger;
pub mod normalize;
pub mod pipeline;
pub mod record;

pub use adapters::{adapter_for, AdapterOptions, Extraction, ExtractionStats, RawDocument, SourceAdapter, SourceId};
pub use pipeline::SourceReport;
pub use record::{FieldValue, NormalizedRecord, Tag};
