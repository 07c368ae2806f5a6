//! Schema checks for the homework-statuses payload.
//!
//! The grading API answers with `{"homeworks": [{"homework_name": .., "status": ..}, ..]}`,
//! newest first. Anything else is rejected before it reaches the notifier; a
//! single bad element fails the whole batch.
use serde_json::Value;
use thiserror::Error;

use crate::model::{AssignmentRecord, HomeworkStatus};

pub const HOMEWORKS_KEY: &str = "homeworks";
pub const NAME_FIELD: &str = "homework_name";
pub const STATUS_FIELD: &str = "status";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("API response is not a JSON object (got {found})")]
    NotAMapping { found: &'static str },
    #[error("API response has no `{key}` key")]
    MissingKey { key: &'static str },
    #[error("`{path}` must be a list (got {found})")]
    WrongShape { path: String, found: &'static str },
    #[error("homework #{index} has no `{field}` field")]
    MissingField { index: usize, field: &'static str },
    #[error("homework #{index} has unknown status {status}")]
    UnknownStatus { index: usize, status: String },
}

/// Validate a decoded API response and extract the assignment records.
pub fn validate(raw: &Value) -> Result<Vec<AssignmentRecord>, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAMapping {
        found: json_kind(raw),
    })?;

    let homeworks = obj
        .get(HOMEWORKS_KEY)
        .ok_or(ValidationError::MissingKey { key: HOMEWORKS_KEY })?;

    let items = homeworks
        .as_array()
        .ok_or_else(|| ValidationError::WrongShape {
            path: HOMEWORKS_KEY.to_string(),
            found: json_kind(homeworks),
        })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_record(index, item))
        .collect()
}

fn parse_record(index: usize, item: &Value) -> Result<AssignmentRecord, ValidationError> {
    let fields = item.as_object().ok_or_else(|| ValidationError::WrongShape {
        path: format!("{}[{}]", HOMEWORKS_KEY, index),
        found: json_kind(item),
    })?;

    let name = fields.get(NAME_FIELD).ok_or(ValidationError::MissingField {
        index,
        field: NAME_FIELD,
    })?;
    let status = fields
        .get(STATUS_FIELD)
        .ok_or(ValidationError::MissingField {
            index,
            field: STATUS_FIELD,
        })?;

    let status = status
        .as_str()
        .and_then(HomeworkStatus::from_code)
        .ok_or_else(|| ValidationError::UnknownStatus {
            index,
            status: status.to_string(),
        })?;

    let name = match name {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Ok(AssignmentRecord { name, status })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
