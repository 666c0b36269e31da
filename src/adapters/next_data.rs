//! Embedded-structured-data adapter for server-rendered Next.js pages.
//!
//! Next.js ships the page props as JSON in `<script id="__NEXT_DATA__">`. The
//! partner list and a shared `product` object both live under
//! `props.pageProps`; the product terms are copied onto every partner row.

use super::{json_field, json_str, EntityError, Extraction, RawDocument, SourceAdapter, SourceId, StructureError};
use crate::record::{FieldSet, FieldValue, NormalizedRecord, Schema};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use std::borrow::Cow;

pub const ABBHOME_SCHEMA: Schema = &[
    "name",
    "project_count",
    "phone",
    "address",
    "website",
    "min_down_payment",
    "min_annual_rate",
    "max_term",
    "max_loan_amount",
    "logo_url",
    "slug",
];

static NEXT_DATA_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[id="__NEXT_DATA__"]"#).unwrap()
});

/// Decode the `__NEXT_DATA__` payload of a page.
pub fn extract_next_data(html: &str) -> Result<Value, StructureError> {
    let document = Html::parse_document(html);
    let script = document
        .select(&NEXT_DATA_SELECTOR)
        .next()
        .ok_or(StructureError::MissingContainer("script#__NEXT_DATA__"))?;
    let json_text = script.text().collect::<String>();
    if json_text.trim().is_empty() {
        return Err(StructureError::MissingContainer("script#__NEXT_DATA__"));
    }
    serde_json::from_str(&json_text).map_err(|e| StructureError::InvalidJson(e.to_string()))
}

/// Label of the first `{logicalKey, label}` entry whose key matches; empty if none.
pub fn labeled_attribute(info: &[Value], key: &str) -> String {
    info.iter()
        .find(|item| item.get("logicalKey").and_then(Value::as_str) == Some(key))
        .map(|item| json_str(item.get("label")).trim().to_string())
        .unwrap_or_default()
}

/// Terms from the shared product object, applied to every partner of the page.
fn product_terms(page_props: &Value) -> FieldSet {
    let term = |key: &str| {
        let label = page_props
            .pointer(&format!("/product/additionalInfo/{}/label", key))
            .and_then(Value::as_str)
            .unwrap_or("");
        FieldValue::text(label)
    };
    FieldSet::new()
        .with("min_down_payment", term("minimumDownPayment"))
        .with("min_annual_rate", term("minimumAnnualInterestRate"))
        .with("max_term", term("maximumDuration"))
        .with("max_loan_amount", term("maximumLoanAmount"))
}

fn partner_fields(partner: &Value) -> Result<FieldSet, EntityError> {
    if !partner.is_object() {
        return Err(EntityError::NotAnObject);
    }
    let info: &[Value] = partner
        .get("additionalInfo")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    Ok(FieldSet::new()
        .with("name", json_str(partner.get("title")))
        .with("project_count", json_field(partner.get("mtkPartnerProjectsCount")))
        .with("phone", labeled_attribute(info, "phone"))
        .with("address", labeled_attribute(info, "address"))
        .with("website", labeled_attribute(info, "website"))
        .with("logo_url", json_str(partner.pointer("/mainImage/url")))
        .with("slug", json_str(partner.get("slug"))))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NextDataAdapter;

impl NextDataAdapter {
    fn decode<'a>(&self, document: &'a RawDocument) -> Result<Cow<'a, Value>, StructureError> {
        match document {
            RawDocument::Text(text) if text.trim_start().starts_with('{') => document.as_json(),
            RawDocument::Text(text) => extract_next_data(text).map(Cow::Owned),
            RawDocument::Json(value) => Ok(Cow::Borrowed(value)),
        }
    }
}

impl SourceAdapter for NextDataAdapter {
    fn source(&self) -> SourceId {
        SourceId::AbbHome
    }

    fn extract(&self, document: &RawDocument) -> Result<Extraction, StructureError> {
        let next_data = self.decode(document)?;
        let page_props = next_data
            .pointer("/props/pageProps")
            .filter(|v| v.is_object())
            .ok_or(StructureError::MissingPath("props.pageProps"))?;

        let shared = product_terms(page_props);
        let partners: &[Value] = page_props
            .get("partners")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut extraction = Extraction::default();
        for (index, partner) in partners.iter().enumerate() {
            match partner_fields(partner) {
                Ok(fields) => {
                    let fields = fields.overlaid_with(&shared);
                    extraction.push_entity([NormalizedRecord::from_field_set(ABBHOME_SCHEMA, &fields)]);
                }
                Err(reason) => extraction.skip_entity(self.source(), index, &reason),
            }
        }
        Ok(extraction)
    }
}
