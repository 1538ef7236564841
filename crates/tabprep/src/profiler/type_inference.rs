//! Semantic type inference for columns.

use crate::dataset::Column;
use crate::types::SemanticType;
use crate::utils::sample_values;
use crate::value::{parse_number, temporal, Cell, DateFormat};
use std::borrow::Cow;

/// Minimum share of numeric values for a numeric column.
pub const NUMERIC_THRESHOLD: f64 = 0.8;
/// Minimum share of timestamps for a temporal column.
pub const TEMPORAL_THRESHOLD: f64 = 0.7;
/// Minimum share of both numeric and plain text values for a mixed column.
pub const MIXED_THRESHOLD: f64 = 0.2;

/// What the sampled values looked like.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TypeEvidence {
    pub sampled: usize,
    pub numeric_ratio: f64,
    pub temporal_ratio: f64,
    pub text_ratio: f64,
    pub date_format: Option<DateFormat>,
}

enum Reading<'a> {
    Numeric,
    Temporal(Cow<'a, str>),
    Text,
}

fn read(cell: &Cell) -> Reading<'_> {
    match cell {
        Cell::Number(_) => Reading::Numeric,
        Cell::Timestamp(ts) => Reading::Temporal(Cow::Owned(temporal::iso_text(ts))),
        Cell::Text(s) if parse_number(s, None).is_some() => Reading::Numeric,
        Cell::Text(s) if DateFormat::Auto.parse(s).is_some() => Reading::Temporal(Cow::Borrowed(s.as_str())),
        _ => Reading::Text,
    }
}

/// Infer the semantic type of a column from a seeded sample of its
/// non-missing values.
pub(crate) fn infer_semantic_type(column: &Column, sample_size: usize, seed: u64) -> (SemanticType, TypeEvidence) {
    let present: Vec<&Cell> = column.cells().iter().filter(|c| !c.is_missing()).collect();
    let sample = sample_values(&present, sample_size, seed);

    let mut numeric = 0usize;
    let mut temporal = 0usize;
    let mut date_texts: Vec<Cow<'_, str>> = Vec::new();

    for cell in &sample {
        match read(cell) {
            Reading::Numeric => numeric += 1,
            Reading::Temporal(text) => {
                temporal += 1;
                date_texts.push(text);
            }
            Reading::Text => {}
        }
    }

    let sampled = sample.len();
    let ratio = |count: usize| if sampled == 0 { 0.0 } else { count as f64 / sampled as f64 };
    let numeric_ratio = ratio(numeric);
    let temporal_ratio = ratio(temporal);
    let text_ratio = ratio(sampled - numeric - temporal);

    let semantic_type = if sampled > 0 && numeric_ratio >= NUMERIC_THRESHOLD {
        SemanticType::Numeric
    } else if sampled > 0 && temporal_ratio >= TEMPORAL_THRESHOLD {
        SemanticType::Temporal
    } else if numeric_ratio >= MIXED_THRESHOLD && text_ratio >= MIXED_THRESHOLD {
        SemanticType::Mixed
    } else {
        SemanticType::Categorical
    };

    // Timestamps built without a resolved pattern are read back in ISO form
    let date_format = match semantic_type {
        SemanticType::Temporal => column.date_format().or_else(|| {
            let texts: Vec<&str> = date_texts.iter().map(|text| text.as_ref()).collect();
            temporal::infer_date_format(&texts).map(|(format, _)| format)
        }),
        _ => None,
    };

    let evidence = TypeEvidence {
        sampled,
        numeric_ratio,
        temporal_ratio,
        text_ratio,
        date_format,
    };
    (semantic_type, evidence)
}
