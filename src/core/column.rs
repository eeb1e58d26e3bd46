use derive_deref::Deref;
use serde::{Deserialize, Serialize};

use crate::core::types::ColumnType;

/// A filterable column from the schema catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, alias = "shortcode", skip_serializing_if = "Option::is_none")]
    pub short_code: Option<String>,
}

impl Column {
    pub fn new(id: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            column_type,
            short_code: None,
        }
    }

    pub fn with_short_code(mut self, code: impl Into<String>) -> Self {
        self.short_code = Some(code.into());
        self
    }
}

/// Ordered, read-only list of columns loaded once per session
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnCatalog(Vec<Column>);

impl ColumnCatalog {
    pub fn new(columns: Vec<Column>) -> Self {
        Self(columns)
    }

    pub fn by_id(&self, id: &str) -> Option<&Column> {
        self.0.iter().find(|c| c.id == id)
    }

    /// Conditions record the column's display name, so editors resolve by name
    pub fn by_name(&self, name: &str) -> Option<&Column> {
        self.0.iter().find(|c| c.name == name)
    }
}

impl From<Vec<Column>> for ColumnCatalog {
    fn from(columns: Vec<Column>) -> Self {
        Self(columns)
    }
}
