//! Tabular-row adapter: one rendered `<tr>` per business.
//!
//! Cell positions are fixed. Financial cells go through `parse_magnitude`,
//! story cells prefer their tooltip text and the last three cells hold tags.

use super::{EntityError, Extraction, RawDocument, SourceAdapter, SourceId, StructureError};
use crate::normalize::{compact_text, extract_tags, extract_tooltip_text, first_integer, parse_magnitude};
use crate::record::{FieldGroup, FieldSet, FieldValue, NormalizedRecord, Schema};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::debug;

pub const STARTERSTORY_SCHEMA: Schema = &[
    "business_name",
    "business_icon",
    "idea_description",
    "revenue_amount",
    "revenue_raw_text",
    "revenue_period",
    "built_in_days",
    "revenue_per_visitor",
    "monthly_traffic",
    "startup_costs",
    "idea_origin_story",
    "how_they_built_it",
    "how_they_grew",
    "ideal_customer_profile",
    "growth_strategies",
    "tools_and_technologies",
];

/// JSON consumers read revenue as one `{amount, raw_text, period}` object.
pub const STARTERSTORY_JSON_GROUPS: &[FieldGroup] = &[FieldGroup {
    key: "revenue",
    members: &[
        ("revenue_amount", "amount"),
        ("revenue_raw_text", "raw_text"),
        ("revenue_period", "period"),
    ],
}];

/// Rows with fewer cells than this are malformed.
pub const MIN_CELLS: usize = 13;

/// Row class marking a paywalled row.
pub const PREMIUM_ROW_CLASS: &str = "blur-row";

static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table.w-full").unwrap());
static TBODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody").unwrap());
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").unwrap());

static NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span.text-base.font-bold").unwrap()
});

static ICON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"img[alt="tool-icon"]"#).unwrap()
});

static PERIOD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.text-slate-400").unwrap()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct TableRowAdapter;

impl SourceAdapter for TableRowAdapter {
    fn source(&self) -> SourceId {
        SourceId::StarterStory
    }

    fn extract(&self, document: &RawDocument) -> Result<Extraction, StructureError> {
        let html = document.as_html()?;
        let table = html
            .select(&TABLE_SELECTOR)
            .next()
            .ok_or(StructureError::MissingContainer("table.w-full"))?;
        let tbody = table
            .select(&TBODY_SELECTOR)
            .next()
            .ok_or(StructureError::MissingContainer("tbody"))?;

        let mut extraction = Extraction::default();
        for (index, row) in tbody.select(&ROW_SELECTOR).enumerate() {
            if is_premium_row(&row) {
                extraction.skip_premium(self.source(), index);
                continue;
            }
            match parse_row(&row) {
                Ok(fields) => {
                    debug!("Parsed: {}", fields.get("business_name").map(|v| v.to_cell()).unwrap_or_default());
                    extraction.push_entity([NormalizedRecord::grouped(
                        STARTERSTORY_SCHEMA,
                        STARTERSTORY_JSON_GROUPS,
                        &fields,
                    )]);
                }
                Err(reason) => extraction.skip_entity(self.source(), index, &reason),
            }
        }
        Ok(extraction)
    }
}

pub fn is_premium_row(row: &ElementRef) -> bool {
    row.value().classes().any(|class| class == PREMIUM_ROW_CLASS)
}

/// Map one row's cells onto the schema by position.
pub fn parse_row(row: &ElementRef) -> Result<FieldSet, EntityError> {
    let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
    if cells.len() < MIN_CELLS {
        return Err(EntityError::TooFewCells {
            found: cells.len(),
            required: MIN_CELLS,
        });
    }

    let business = &cells[0];
    let name = business.select(&NAME_SELECTOR).next().map(|e| compact_text(&e));
    let icon = business
        .select(&ICON_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    let revenue_text = first_div_text(&cells[2]);
    let revenue_period = cells[2].select(&PERIOD_SELECTOR).next().map(|e| compact_text(&e));
    let built_in_days = first_div_text(&cells[3]).and_then(|text| first_integer(&text));

    let mut fields = FieldSet::new();
    fields.insert("business_name", FieldValue::optional_text(name));
    fields.insert("business_icon", FieldValue::optional_text(icon));
    fields.insert("idea_description", extract_tooltip_text(&cells[1]));
    fields.insert(
        "revenue_amount",
        FieldValue::number(revenue_text.as_deref().and_then(parse_magnitude)),
    );
    fields.insert("revenue_raw_text", FieldValue::optional_text(revenue_text));
    fields.insert("revenue_period", FieldValue::optional_text(revenue_period));
    fields.insert("built_in_days", FieldValue::integer(built_in_days));
    fields.insert("revenue_per_visitor", magnitude_cell(&cells[4]));
    fields.insert("monthly_traffic", magnitude_cell(&cells[5]));
    fields.insert("startup_costs", magnitude_cell(&cells[6]));
    fields.insert("idea_origin_story", extract_tooltip_text(&cells[7]));
    fields.insert("how_they_built_it", extract_tooltip_text(&cells[8]));
    fields.insert("how_they_grew", extract_tooltip_text(&cells[9]));
    fields.insert("ideal_customer_profile", extract_tags(&cells[10]));
    fields.insert("growth_strategies", extract_tags(&cells[11]));
    fields.insert("tools_and_technologies", extract_tags(&cells[12]));
    Ok(fields)
}

fn first_div_text(cell: &ElementRef) -> Option<String> {
    cell.select(&DIV_SELECTOR).next().map(|div| compact_text(&div))
}

fn magnitude_cell(cell: &ElementRef) -> FieldValue {
    FieldValue::number(first_div_text(cell).as_deref().and_then(parse_magnitude))
}
