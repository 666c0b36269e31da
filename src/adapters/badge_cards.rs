//! Card-markup variant where contact fields are keyed by the badge icon.
//!
//! Each card lists mortgage terms in a `ul.d-flex` (down payment, annual rate,
//! term in that order) and contacts as badges whose `<img alt>` names the
//! field.

use super::{EntityError, Extraction, RawDocument, SourceAdapter, SourceId, StructureError};
use crate::normalize::{resolve_asset_url, spaced_text};
use crate::record::{FieldSet, NormalizedRecord, Schema};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

pub const PASHABANK_SCHEMA: Schema = &[
    "name",
    "down_payment",
    "annual_rate",
    "term",
    "address",
    "phone",
    "website",
    "logo_url",
];

/// Site origin that relative logo paths are resolved against.
pub const DEFAULT_SITE_BASE: &str = "https://ipoteka.pashabank.az";

const TERM_FIELDS: [&str; 3] = ["down_payment", "annual_rate", "term"];

static LIST_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("#partners-list").unwrap());
static CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#partners-list > div.col-lg-12").unwrap()
});
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.title h3, div.title h4").unwrap()
});
static LOGO_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img.partner-card__logo").unwrap());
static TERMS_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("ul.d-flex").unwrap());
static PREFIX_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.min_prefix").unwrap());
static VALUE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.fw-normal").unwrap());
static BADGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.partner-card__contacts-badge").unwrap()
});
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

#[derive(Debug, Clone)]
pub struct BadgeCardAdapter {
    site_base: String,
}

impl Default for BadgeCardAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_BASE)
    }
}

impl BadgeCardAdapter {
    pub fn new(site_base: impl Into<String>) -> Self {
        Self {
            site_base: site_base.into(),
        }
    }

    pub fn parse_card(&self, card: &ElementRef) -> Result<FieldSet, EntityError> {
        let logo = card.select(&LOGO_SELECTOR).next();
        let heading = card
            .select(&HEADING_SELECTOR)
            .next()
            .map(|h| spaced_text(&h))
            .filter(|name| !name.is_empty());
        let alt = logo
            .and_then(|img| img.value().attr("alt"))
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(str::to_string);
        let name = heading.or(alt).ok_or(EntityError::MissingName)?;

        let logo_url = logo
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| resolve_asset_url(&self.site_base, src));

        let mut fields = FieldSet::new()
            .with("name", name)
            .with("logo_url", logo_url.unwrap_or_default());

        if let Some(terms) = card.select(&TERMS_SELECTOR).next() {
            let items = terms
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == "li");
            for (field, item) in TERM_FIELDS.iter().zip(items) {
                fields.insert(*field, term_value(&item));
            }
        }

        for badge in card.select(&BADGE_SELECTOR) {
            let Some(icon) = badge.select(&IMG_SELECTOR).next() else {
                continue;
            };
            let alt = icon.value().attr("alt").unwrap_or("").to_lowercase();
            let text = badge
                .select(&PARAGRAPH_SELECTOR)
                .next()
                .map(|p| spaced_text(&p))
                .unwrap_or_default();
            if alt.contains("location") {
                fields.insert("address", text);
            } else if alt.contains("phone") {
                fields.insert("phone", text);
            } else if alt.contains("globus") {
                fields.insert("website", text);
            }
        }
        Ok(fields)
    }
}

/// `span.min_prefix` + `span.fw-normal` of a term item, or its whole text.
pub fn term_value(item: &ElementRef) -> String {
    let parts: Vec<String> = [&*PREFIX_SELECTOR, &*VALUE_SELECTOR]
        .iter()
        .filter_map(|selector| item.select(selector).next())
        .map(|span| spaced_text(&span))
        .filter(|text| !text.is_empty())
        .collect();
    if parts.is_empty() {
        spaced_text(item)
    } else {
        parts.join(" ")
    }
}

impl SourceAdapter for BadgeCardAdapter {
    fn source(&self) -> SourceId {
        SourceId::PashaBank
    }

    fn extract(&self, document: &RawDocument) -> Result<Extraction, StructureError> {
        let html = document.as_html()?;
        if html.select(&LIST_SELECTOR).next().is_none() {
            return Err(StructureError::MissingContainer("#partners-list"));
        }

        let mut extraction = Extraction::default();
        for (index, card) in html.select(&CARD_SELECTOR).enumerate() {
            match self.parse_card(&card) {
                Ok(fields) => extraction.push_entity([NormalizedRecord::from_field_set(PASHABANK_SCHEMA, &fields)]),
                Err(reason) => extraction.skip_entity(self.source(), index, &reason),
            }
        }
        Ok(extraction)
    }
}
