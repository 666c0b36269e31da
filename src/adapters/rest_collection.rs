//! REST-collection adapter: partners with nested residential complexes.
//!
//! Each partner is flattened to one row per complex, or one row with empty
//! complex columns when it has none.

use super::{json_field, json_str, EntityError, Extraction, RawDocument, SourceAdapter, SourceId, StructureError};
use crate::flatten::flatten;
use crate::normalize::resolve_asset_url;
use crate::record::{FieldSet, FieldValue, Schema};
use serde_json::Value;

pub const BIRBANK_SCHEMA: Schema = &[
    // complex
    "complex_name",
    "complex_slug",
    "complex_logo_url",
    "region_id",
    "latitude",
    "longitude",
    // partner
    "partner_name",
    "partner_address",
    "phone_mobile1",
    "phone_mobile2",
    "phone_short",
    "email",
    "website",
    "facebook",
    "instagram",
    "partner_logo_url",
    // mortgage terms
    "initial_payment_pct",
    "mortgage_rate_pct",
    "mortgage_period_years",
    "min_loan_amount",
    "max_loan_amount",
];

/// Where bare logo file names are served from.
pub const DEFAULT_ASSET_BASE: &str = "https://ipoteka.birbank.az/api/files/";

#[derive(Debug, Clone)]
pub struct RestCollectionAdapter {
    asset_base: String,
}

impl Default for RestCollectionAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_BASE)
    }
}

impl RestCollectionAdapter {
    pub fn new(asset_base: impl Into<String>) -> Self {
        Self {
            asset_base: asset_base.into(),
        }
    }

    fn logo(&self, value: Option<&Value>) -> FieldValue {
        FieldValue::optional_text(resolve_asset_url(&self.asset_base, json_str(value)))
    }

    fn partner_fields(&self, partner: &Value) -> Result<FieldSet, EntityError> {
        if !partner.is_object() {
            return Err(EntityError::NotAnObject);
        }
        let field = |key: &str| json_field(partner.get(key));
        Ok(FieldSet::new()
            .with("partner_name", field("name"))
            .with("partner_address", field("address"))
            .with("phone_mobile1", field("mobileNumber1"))
            .with("phone_mobile2", field("mobileNumber2"))
            .with("phone_short", field("phoneNumber"))
            .with("email", field("email"))
            .with("website", field("website"))
            .with("facebook", field("facebook"))
            .with("instagram", field("instagram"))
            .with("partner_logo_url", self.logo(partner.get("logo")))
            .with("initial_payment_pct", field("initialPayment"))
            .with("mortgage_rate_pct", field("mortgageRate"))
            .with("mortgage_period_years", field("mortgagePeriod"))
            .with("min_loan_amount", field("minLoanAmount"))
            .with("max_loan_amount", field("maxLoanAmount")))
    }

    fn complex_fields(&self, complex: &Value) -> Result<FieldSet, EntityError> {
        if !complex.is_object() {
            return Err(EntityError::NotAnObject);
        }
        let field = |key: &str| json_field(complex.get(key));
        Ok(FieldSet::new()
            .with("complex_name", field("name"))
            .with("complex_slug", field("slug"))
            .with("complex_logo_url", self.logo(complex.get("logo")))
            .with("region_id", field("regionId"))
            .with("latitude", field("latitude"))
            .with("longitude", field("longitude")))
    }
}

impl SourceAdapter for RestCollectionAdapter {
    fn source(&self) -> SourceId {
        SourceId::BirBank
    }

    fn extract(&self, document: &RawDocument) -> Result<Extraction, StructureError> {
        let body = document.as_json()?;
        let data = body
            .get("data")
            .filter(|v| v.is_object())
            .ok_or(StructureError::MissingPath("data"))?;
        let partners: &[Value] = data
            .get("responseDto")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut extraction = Extraction::default();
        for (index, partner) in partners.iter().enumerate() {
            let parent = match self.partner_fields(partner) {
                Ok(parent) => parent,
                Err(reason) => {
                    extraction.skip_entity(self.source(), index, &reason);
                    continue;
                }
            };

            let mut children = Vec::new();
            if let Some(complexes) = partner.get("complexes").and_then(Value::as_array) {
                for complex in complexes {
                    match self.complex_fields(complex) {
                        Ok(child) => children.push(child),
                        Err(reason) => extraction.skip_nested(self.source(), index, &reason),
                    }
                }
            }

            extraction.push_entity(flatten(BIRBANK_SCHEMA, &parent, &children));
        }
        Ok(extraction)
    }
}
