//! Per-field validation of a condition's operator and values
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use strum::Display;

use crate::core::models::Condition;
use crate::core::operator;
use crate::core::types::{ColumnType, InputShape};

/// User-correctable input problems; none of these are fatal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Operator is required")]
    MissingOperator,
    #[error("Operator '{operator}' is not available for {column_type} columns")]
    UnsupportedOperator { operator: String, column_type: ColumnType },
    #[error("Value is required")]
    MissingValue,
    #[error("Must be a valid number")]
    InvalidNumber,
    #[error("Must be a valid date")]
    InvalidDate,
}

/// Editable fields of a condition
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    Operator,
    Value,
    SecondaryValue,
}

/// Currently failing fields, at most one error per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, ValidationError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, error: ValidationError) {
        self.0.insert(field, error);
    }

    pub fn remove(&mut self, field: Field) -> Option<ValidationError> {
        self.0.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&ValidationError> {
        self.0.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace the recorded state of `field` with the outcome in `result`
    pub fn record(&mut self, field: Field, result: FieldErrors) {
        self.0.remove(&field);
        self.0.extend(result.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &ValidationError)> {
        self.0.iter().map(|(f, e)| (*f, e))
    }
}

/// Serialized as `{ field: message }` for display
impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, error) in &self.0 {
            map.serialize_entry(field, &error.to_string())?;
        }
        map.end()
    }
}

/// Validate one field of a candidate condition.
///
/// `operator` is the operator id being validated or in effect; `value` is the
/// text of the field under test (ignored for [`Field::Operator`]).
pub fn validate(field: Field, column_type: ColumnType, operator: &str, value: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let result = match field {
        Field::Operator => check_operator(column_type, operator),
        Field::Value => check_value(column_type, operator, value, false),
        Field::SecondaryValue => check_value(column_type, operator, value, true),
    };
    if let Err(error) = result {
        errors.insert(field, error);
    }
    errors
}

/// Run every applicable field check against a condition
pub fn validate_condition(condition: &Condition) -> FieldErrors {
    let mut errors = validate(Field::Operator, condition.column_type, &condition.operator, "");
    errors.record(
        Field::Value,
        validate(Field::Value, condition.column_type, &condition.operator, &condition.value),
    );
    errors.record(
        Field::SecondaryValue,
        validate(
            Field::SecondaryValue,
            condition.column_type,
            &condition.operator,
            condition.secondary_value.as_deref().unwrap_or(""),
        ),
    );
    errors
}

fn check_operator(column_type: ColumnType, operator: &str) -> Result<(), ValidationError> {
    if operator.trim().is_empty() {
        return Err(ValidationError::MissingOperator);
    }
    if !operator::is_legal(column_type, operator) {
        return Err(ValidationError::UnsupportedOperator {
            operator: operator.to_string(),
            column_type,
        });
    }
    Ok(())
}

fn check_value(
    column_type: ColumnType,
    operator: &str,
    value: &str,
    secondary: bool,
) -> Result<(), ValidationError> {
    let op = operator::effective_operator(column_type, operator);
    if !op.takes_value() || (secondary && !op.is_range()) {
        return Ok(());
    }
    if value.trim().is_empty() {
        return Err(ValidationError::MissingValue);
    }
    match (column_type, op.input) {
        (ColumnType::Number, InputShape::List) => {
            let items: Vec<&str> =
                value.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
            if items.is_empty() {
                Err(ValidationError::MissingValue)
            } else if items.iter().all(|item| is_number(item)) {
                Ok(())
            } else {
                Err(ValidationError::InvalidNumber)
            }
        }
        (ColumnType::Number, _) if !is_number(value) => Err(ValidationError::InvalidNumber),
        (ColumnType::Datetime, InputShape::Date) if !is_date(value) => {
            Err(ValidationError::InvalidDate)
        }
        _ => Ok(()),
    }
}

fn is_number(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

fn is_date(value: &str) -> bool {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || DateTime::parse_from_rfc3339(value).is_ok()
}
