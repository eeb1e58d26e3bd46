use serde::{Deserialize, Serialize};
use strum::Display;

use crate::core::types::{Combinator, NodeId};
use crate::services::persistence::SaveTarget;

/// Intents the interaction layer sends to an editing session.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Action {
    /// Open a condition in the editor panel
    SelectCondition(NodeId),
    /// Pick a column in the catalog panel (by column id)
    SelectColumn(String),
    /// Close the editor / drop any selection
    ClearSelection,
    /// Column dropped onto a group
    AssignColumn { group_id: NodeId, column_id: String },
    /// Click-to-add of the currently selected column
    AssignSelectedColumn { group_id: NodeId },
    SetOperator(String),
    SetValue(String),
    SetSecondaryValue(String),
    /// Explicit save from the editor panel
    CommitCondition,
    SetCombinator { group_id: NodeId, combinator: Combinator },
    ToggleGroupExpanded(NodeId),
    AddGroup,
    AddNestedGroup { parent_id: NodeId },
    DeleteGroup(NodeId),
    DeleteCondition { group_id: NodeId, condition_id: NodeId },
    Save(SaveTarget),
}
