//! Schema validation: raw model output → [`AnalysisRecord`].
//!
//! The backend is asked for a single JSON object with six string keys. This
//! module is the only place that decides whether a response honours that
//! contract. It never repairs a response: a prose preamble, a markdown fence
//! or a missing key are all hard failures, because a "repaired" review that
//! silently lost a section is worse than a clearly failed document.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The six sections of a paper review, in their fixed order.
///
/// The order is significant: it is the order headings appear in the Notion
/// page and the order in which validation reports the first bad field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewField {
    Summary,
    Novelty,
    Methodology,
    Validation,
    Discussion,
    NextSteps,
}

impl ReviewField {
    pub const ALL: [ReviewField; 6] = [
        ReviewField::Summary,
        ReviewField::Novelty,
        ReviewField::Methodology,
        ReviewField::Validation,
        ReviewField::Discussion,
        ReviewField::NextSteps,
    ];

    /// JSON key of the field in the backend response.
    pub fn key(&self) -> &'static str {
        match self {
            ReviewField::Summary => "summary",
            ReviewField::Novelty => "novelty",
            ReviewField::Methodology => "methodology",
            ReviewField::Validation => "validation",
            ReviewField::Discussion => "discussion",
            ReviewField::NextSteps => "next_steps",
        }
    }

    /// Heading shown above the section in the destination page.
    pub fn heading(&self) -> &'static str {
        match self {
            ReviewField::Summary => "Overview",
            ReviewField::Novelty => "1. Novelty & Impact",
            ReviewField::Methodology => "2. Methodology",
            ReviewField::Validation => "3. Validation",
            ReviewField::Discussion => "4. Discussion",
            ReviewField::NextSteps => "5. Next Steps",
        }
    }
}

/// A validated six-field paper review.
///
/// Values are kept exactly as the model wrote them; list detection happens
/// later in [`crate::pipeline::blocks`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub summary: String,
    pub novelty: String,
    pub methodology: String,
    pub validation: String,
    pub discussion: String,
    pub next_steps: String,
}

impl AnalysisRecord {
    pub fn get(&self, field: ReviewField) -> &str {
        match field {
            ReviewField::Summary => &self.summary,
            ReviewField::Novelty => &self.novelty,
            ReviewField::Methodology => &self.methodology,
            ReviewField::Validation => &self.validation,
            ReviewField::Discussion => &self.discussion,
            ReviewField::NextSteps => &self.next_steps,
        }
    }

    fn slot(&mut self, field: ReviewField) -> &mut String {
        match field {
            ReviewField::Summary => &mut self.summary,
            ReviewField::Novelty => &mut self.novelty,
            ReviewField::Methodology => &mut self.methodology,
            ReviewField::Validation => &mut self.validation,
            ReviewField::Discussion => &mut self.discussion,
            ReviewField::NextSteps => &mut self.next_steps,
        }
    }
}

/// Validate a raw backend response against the six-field contract.
///
/// Fields are checked in [`ReviewField::ALL`] order and the first failure is
/// returned, so the same bad payload always produces the same error.
/// Unknown keys are ignored.
pub fn validate(raw: &str) -> Result<AnalysisRecord, SchemaError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|e| SchemaError::Malformed {
        detail: e.to_string(),
    })?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(SchemaError::Malformed {
                detail: format!("expected a JSON object, got {}", json_kind(&other)),
            })
        }
    };

    let mut record = AnalysisRecord::default();
    for field in ReviewField::ALL {
        let key = field.key();
        match map.get(key) {
            None | Some(Value::Null) => return Err(SchemaError::MissingField { field: key }),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(SchemaError::MissingField { field: key })
            }
            Some(Value::String(s)) => *record.slot(field) = s.clone(),
            Some(_) => return Err(SchemaError::InvalidType { field: key }),
        }
    }

    Ok(record)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
