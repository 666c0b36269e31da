//! Card-markup adapter for cards whose contact lines carry a text label.
//!
//! Lines are classified by their leading label token (`Ünvan:` for the
//! address, `Tel:` for the phone), not by their position. A line with an
//! absolute link is the website; anything else is ignored.

use super::{EntityError, Extraction, RawDocument, SourceAdapter, SourceId, StructureError};
use crate::normalize::{spaced_text, strip_labeled_prefix};
use crate::record::{FieldSet, NormalizedRecord, Schema};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

pub const XALQBANK_SCHEMA: Schema = &["name", "region", "address", "phone", "website", "logo_url"];

pub const DEFAULT_ADDRESS_LABEL: &str = "Ünvan:";
pub const DEFAULT_PHONE_LABEL: &str = "Tel:";

static CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.loan__item").unwrap());
static LOGO_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.loan__icon img").unwrap());
static NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p.font-600").unwrap());
static REGION_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.partners__categ").unwrap());
static TEXT_BLOCK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.loan__text").unwrap());
static LINE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// What a free-text card line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardLine {
    Address(String),
    Phone(String),
    Website(String),
    Other,
}

#[derive(Debug, Clone)]
pub struct LabeledCardAdapter {
    pub address_label: String,
    pub phone_label: String,
}

impl Default for LabeledCardAdapter {
    fn default() -> Self {
        Self {
            address_label: DEFAULT_ADDRESS_LABEL.to_string(),
            phone_label: DEFAULT_PHONE_LABEL.to_string(),
        }
    }
}

impl LabeledCardAdapter {
    /// Classify one line by its label token; `href` is the line's first link target.
    pub fn classify_line(&self, text: &str, href: Option<&str>) -> CardLine {
        let lower = text.trim().to_lowercase();
        if lower.starts_with(&label_token(&self.address_label)) {
            CardLine::Address(strip_labeled_prefix(text, &self.address_label))
        } else if lower.starts_with(&label_token(&self.phone_label)) {
            CardLine::Phone(strip_labeled_prefix(text, &self.phone_label))
        } else {
            match href {
                Some(target) if target.starts_with("http") => CardLine::Website(target.to_string()),
                _ => CardLine::Other,
            }
        }
    }

    pub fn parse_card(&self, card: &ElementRef) -> Result<FieldSet, EntityError> {
        let logo = card.select(&LOGO_SELECTOR).next();
        let primary_name = card
            .select(&NAME_SELECTOR)
            .next()
            .map(|p| spaced_text(&p))
            .filter(|name| !name.is_empty());
        let fallback_name = logo
            .and_then(|img| img.value().attr("alt"))
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(str::to_string);
        let name = primary_name.or(fallback_name).ok_or(EntityError::MissingName)?;

        let mut fields = FieldSet::new()
            .with("name", name)
            .with("logo_url", logo.and_then(|img| img.value().attr("src")).unwrap_or(""))
            .with(
                "region",
                card.select(&REGION_SELECTOR).next().map(|e| spaced_text(&e)).unwrap_or_default(),
            );

        if let Some(block) = card.select(&TEXT_BLOCK_SELECTOR).next() {
            for line in block.select(&LINE_SELECTOR) {
                let text = spaced_text(&line);
                let href = line.select(&LINK_SELECTOR).next().and_then(|a| a.value().attr("href"));
                match self.classify_line(&text, href) {
                    CardLine::Address(address) => fields.insert("address", address),
                    CardLine::Phone(phone) => fields.insert("phone", phone),
                    CardLine::Website(url) => fields.insert("website", url),
                    CardLine::Other => {}
                }
            }
        }
        Ok(fields)
    }
}

/// Lowercased label without its trailing colon: `"Ünvan:"` → `"ünvan"`.
fn label_token(label: &str) -> String {
    label.trim().trim_end_matches(':').to_lowercase()
}

impl SourceAdapter for LabeledCardAdapter {
    fn source(&self) -> SourceId {
        SourceId::XalqBank
    }

    fn extract(&self, document: &RawDocument) -> Result<Extraction, StructureError> {
        let html = document.as_html()?;
        let mut extraction = Extraction::default();
        for (index, card) in html.select(&CARD_SELECTOR).enumerate() {
            match self.parse_card(&card) {
                Ok(fields) => extraction.push_entity([NormalizedRecord::from_field_set(XALQBANK_SCHEMA, &fields)]),
                Err(reason) => extraction.skip_entity(self.source(), index, &reason),
            }
        }
        Ok(extraction)
    }
}
