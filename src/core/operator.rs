//! Operator catalog: the legal operators for each column type, in display order
use serde::Serialize;

use crate::core::types::{ColumnType, InputShape};

/// A comparison or test that can be applied to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub id: &'static str,
    pub label: &'static str,
    pub input: InputShape,
}

impl Operator {
    const fn new(id: &'static str, label: &'static str, input: InputShape) -> Self {
        Self { id, label, input }
    }

    /// Range operators take a secondary value as the upper bound
    pub fn is_range(&self) -> bool {
        matches!(self.id, "between" | "not_between")
    }

    pub fn takes_value(&self) -> bool {
        self.input.takes_value()
    }
}

static STRING_OPERATORS: [Operator; 10] = [
    Operator::new("equals", "Equals", InputShape::Text),
    Operator::new("not_equals", "Not Equals", InputShape::Text),
    Operator::new("contains", "Contains", InputShape::Text),
    Operator::new("not_contains", "Does Not Contain", InputShape::Text),
    Operator::new("starts_with", "Starts With", InputShape::Text),
    Operator::new("ends_with", "Ends With", InputShape::Text),
    Operator::new("in_list", "In List", InputShape::List),
    Operator::new("not_in_list", "Not In List", InputShape::List),
    Operator::new("is_blank", "Is Blank", InputShape::None),
    Operator::new("is_not_blank", "Is Not Blank", InputShape::None),
];

static NUMBER_OPERATORS: [Operator; 12] = [
    Operator::new("equals", "Equals", InputShape::Number),
    Operator::new("not_equals", "Not Equals", InputShape::Number),
    Operator::new("greater_than", "Greater Than", InputShape::Number),
    Operator::new("less_than", "Less Than", InputShape::Number),
    Operator::new("greater_equal", "Greater Than or Equal To", InputShape::Number),
    Operator::new("less_equal", "Less Than or Equal To", InputShape::Number),
    Operator::new("between", "Between", InputShape::Number),
    Operator::new("not_between", "Not Between", InputShape::Number),
    Operator::new("in_list", "In List", InputShape::List),
    Operator::new("not_in_list", "Not In List", InputShape::List),
    Operator::new("is_blank", "Is Blank", InputShape::None),
    Operator::new("is_not_blank", "Is Not Blank", InputShape::None),
];

static DATETIME_OPERATORS: [Operator; 16] = [
    Operator::new("equals", "Equals", InputShape::Date),
    Operator::new("not_equals", "Not Equals", InputShape::Date),
    Operator::new("before", "Before", InputShape::Date),
    Operator::new("after", "After", InputShape::Date),
    Operator::new("between", "Between", InputShape::Date),
    Operator::new("today", "Today", InputShape::None),
    Operator::new("yesterday", "Yesterday", InputShape::None),
    Operator::new("tomorrow", "Tomorrow", InputShape::None),
    Operator::new("last_7_days", "Last 7 Days", InputShape::None),
    Operator::new("last_30_days", "Last 30 Days", InputShape::None),
    Operator::new("this_month", "This Month", InputShape::None),
    Operator::new("last_month", "Last Month", InputShape::None),
    Operator::new("this_year", "This Year", InputShape::None),
    Operator::new("custom_range", "Custom Range", InputShape::Date),
    Operator::new("is_blank", "Is Blank", InputShape::None),
    Operator::new("is_not_blank", "Is Not Blank", InputShape::None),
];

/// Ordered operator list for a column type; unknown types get the string list
pub fn operators_for(column_type: ColumnType) -> &'static [Operator] {
    match column_type {
        ColumnType::String | ColumnType::Unknown => &STRING_OPERATORS,
        ColumnType::Number => &NUMBER_OPERATORS,
        ColumnType::Datetime => &DATETIME_OPERATORS,
    }
}

/// The operator a freshly assigned column starts with
pub fn default_operator(column_type: ColumnType) -> &'static Operator {
    &operators_for(column_type)[0]
}

/// Look up an operator by id within a column type's list
pub fn find_operator(column_type: ColumnType, id: &str) -> Option<&'static Operator> {
    operators_for(column_type).iter().find(|op| op.id == id)
}

pub fn is_legal(column_type: ColumnType, id: &str) -> bool {
    find_operator(column_type, id).is_some()
}

/// Operator used for display. Falls back to the first string operator when `id`
/// is not in the type's list; validation reports that case separately.
pub fn effective_operator(column_type: ColumnType, id: &str) -> &'static Operator {
    find_operator(column_type, id).unwrap_or(&STRING_OPERATORS[0])
}
