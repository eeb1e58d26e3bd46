use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for groups and conditions in a forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| format!("Invalid node id '{}': {}", s, e))
    }
}

/// Mints monotonically increasing node ids for a session. Once `u64::MAX` has
/// been handed out the generator is exhausted and mints nothing further.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: Option<u64>,
}

impl IdGenerator {
    /// Start numbering at 1
    pub fn new() -> Self {
        Self { next: Some(1) }
    }

    /// Continue numbering after an id already in use
    pub fn after(last: NodeId) -> Self {
        Self { next: last.0.checked_add(1) }
    }

    /// `None` once the id space is used up; never repeats an id
    pub fn next_id(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(NodeId(id))
    }

    /// The id the next call to `next_id` will hand out
    pub fn peek(&self) -> Option<NodeId> {
        self.next.map(NodeId)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Data type of a catalog column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Datetime,
    /// Any type name the operator catalog does not know; treated as string
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Datetime => "datetime",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    /// Never fails: unrecognised names map to `Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "number" => Self::Number,
            "datetime" => Self::Datetime,
            _ => Self::Unknown,
        })
    }
}

/// Value-entry modality an operator requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputShape {
    Text,
    Number,
    Date,
    List,
    /// Self-describing operator, carries no value
    None,
}

impl InputShape {
    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Date => write!(f, "date"),
            Self::List => write!(f, "list"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Boolean combinator applied across a group's direct children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Combinator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(format!("Unknown combinator: {}", s)),
        }
    }
}
