//! Filter tree model: a forest of AND/OR groups holding leaf conditions
//!
//! Nodes are shared behind `Arc` so that edits rebuild only the path from the
//! changed node up to the forest, leaving every other subtree shared with the
//! previous version.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::column::Column;
use crate::core::operator::{self, Operator};
use crate::core::types::{ColumnType, Combinator, InputShape, NodeId};

/// Leaf predicate: column + operator + value(s)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: NodeId,
    /// Display name of the source column
    pub column: String,
    /// Copied from the catalog at creation time
    pub column_type: ColumnType,
    pub operator: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<String>,
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.operator == other.operator
            && self.value == other.value
            && self.secondary_value == other.secondary_value
    }
}

impl Eq for Condition {}

impl Condition {
    /// New condition for a catalog column, starting at the type's default operator
    pub fn for_column(id: NodeId, column: &Column) -> Self {
        Self {
            id,
            column: column.name.clone(),
            column_type: column.column_type,
            operator: operator::default_operator(column.column_type).id.to_string(),
            value: String::new(),
            secondary_value: None,
        }
    }

    /// The catalog entry for `operator`, if it is legal for this column type
    pub fn operator_def(&self) -> Option<&'static Operator> {
        operator::find_operator(self.column_type, &self.operator)
    }

    pub fn effective_operator(&self) -> &'static Operator {
        operator::effective_operator(self.column_type, &self.operator)
    }

    /// Switch operator. A real change clears both values so nothing typed for
    /// the previous input shape survives.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        let operator = operator.into();
        if operator != self.operator {
            self.operator = operator;
            self.value.clear();
            self.secondary_value = None;
        }
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_secondary_value(mut self, value: impl Into<String>) -> Self {
        self.secondary_value = Some(value.into());
        self
    }

    /// Drop values the effective operator does not use
    pub fn normalized(mut self) -> Self {
        let op = self.effective_operator();
        if !op.takes_value() {
            self.value.clear();
        }
        if !op.is_range() {
            self.secondary_value = None;
        }
        self
    }

    /// One-line human readable form, e.g. `Amount between 10 and 20`
    pub fn summary(&self) -> String {
        let op = self.effective_operator();
        let label = op.label.to_lowercase();
        match op.input {
            InputShape::None => format!("{} {}", self.column, label),
            _ if op.is_range() => format!(
                "{} {} {} and {}",
                self.column,
                label,
                self.value,
                self.secondary_value.as_deref().unwrap_or("")
            ),
            InputShape::List => {
                let items: Vec<&str> = self
                    .value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                format!("{} {} [{}]", self.column, label, items.join(", "))
            }
            InputShape::Text => format!("{} {} \"{}\"", self.column, label, self.value),
            InputShape::Number | InputShape::Date => {
                format!("{} {} {}", self.column, label, self.value)
            }
        }
    }
}

fn default_expanded() -> bool {
    true
}

/// Composite node: a combinator over its conditions and subgroups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
pub struct Group {
    pub id: NodeId,
    #[serde(rename = "operator", default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub conditions: Vec<Arc<Condition>>,
    #[serde(rename = "groups", default)]
    pub subgroups: Vec<Arc<Group>>,
    /// Editor-only collapse state; not part of the canonical form
    #[serde(skip, default = "default_expanded")]
    pub expanded: bool,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.combinator == other.combinator
            && self.conditions == other.conditions
            && self.subgroups == other.subgroups
    }
}

impl Eq for Group {}

impl Group {
    /// Empty AND group
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            combinator: Combinator::And,
            conditions: Vec::new(),
            subgroups: Vec::new(),
            expanded: true,
        }
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub fn with_subgroup(mut self, group: Group) -> Self {
        self.subgroups.push(Arc::new(group));
        self
    }

    /// Same group with its subgroup list swapped; conditions stay shared
    pub(crate) fn with_subgroups(&self, subgroups: Vec<Arc<Group>>) -> Self {
        Self {
            id: self.id,
            combinator: self.combinator,
            conditions: self.conditions.clone(),
            subgroups,
            expanded: self.expanded,
        }
    }

    pub(crate) fn with_conditions(&self, conditions: Vec<Arc<Condition>>) -> Self {
        Self {
            id: self.id,
            combinator: self.combinator,
            conditions,
            subgroups: self.subgroups.clone(),
            expanded: self.expanded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.subgroups.is_empty()
    }

    /// Structural equality that also requires every group id to match
    pub fn same_tree_as(&self, other: &Group) -> bool {
        self.id == other.id
            && self.combinator == other.combinator
            && self.conditions == other.conditions
            && self.subgroups.len() == other.subgroups.len()
            && self.subgroups.iter().zip(&other.subgroups).all(|(a, b)| a.same_tree_as(b))
    }

    /// Does this group or any descendant hold the condition?
    pub fn contains_condition(&self, condition_id: NodeId) -> bool {
        self.conditions.iter().any(|c| c.id == condition_id)
            || self.subgroups.iter().any(|g| g.contains_condition(condition_id))
    }
}

/// One rendered line of a forest outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineLine {
    pub indent: usize,
    pub id: NodeId,
    pub label: String,
}

/// Ordered top-level groups making up the editable filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct Forest {
    groups: Vec<Arc<Group>>,
}

impl Forest {
    pub fn new(groups: Vec<Arc<Group>>) -> Self {
        Self { groups }
    }

    pub fn from_groups(groups: Vec<Group>) -> Self {
        Self::new(groups.into_iter().map(Arc::new).collect())
    }

    /// Starting state of an editor: one empty AND group
    pub fn initial(id: NodeId) -> Self {
        Self::from_groups(vec![Group::new(id)])
    }

    pub fn groups(&self) -> &[Arc<Group>] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every group with its depth (top level = 0), depth-first pre-order
    pub fn pre_order(&self) -> Vec<(usize, &Arc<Group>)> {
        fn walk<'a>(
            groups: &'a [Arc<Group>],
            depth: usize,
            out: &mut Vec<(usize, &'a Arc<Group>)>,
        ) {
            for group in groups {
                out.push((depth, group));
                walk(&group.subgroups, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.groups, 0, &mut out);
        out
    }

    pub fn find_group(&self, id: NodeId) -> Option<&Arc<Group>> {
        self.pre_order().into_iter().map(|(_, g)| g).find(|g| g.id == id)
    }

    pub fn group_depth(&self, id: NodeId) -> Option<usize> {
        self.pre_order().into_iter().find(|(_, g)| g.id == id).map(|(depth, _)| depth)
    }

    /// Conditions are located globally by id; first match in pre-order wins
    pub fn find_condition(&self, id: NodeId) -> Option<&Arc<Condition>> {
        self.pre_order()
            .into_iter()
            .find_map(|(_, g)| g.conditions.iter().find(|c| c.id == id))
    }

    pub fn group_containing_condition(&self, id: NodeId) -> Option<&Arc<Group>> {
        self.pre_order()
            .into_iter()
            .map(|(_, g)| g)
            .find(|g| g.conditions.iter().any(|c| c.id == id))
    }

    pub fn group_count(&self) -> usize {
        self.pre_order().len()
    }

    pub fn condition_count(&self) -> usize {
        self.pre_order().iter().map(|(_, g)| g.conditions.len()).sum()
    }

    /// Largest id held by any node, used to resume id minting after a load
    pub fn max_id(&self) -> Option<NodeId> {
        self.pre_order()
            .into_iter()
            .flat_map(|(_, g)| std::iter::once(g.id).chain(g.conditions.iter().map(|c| c.id)))
            .max()
    }

    /// True when both forests hold the very same top-level nodes
    pub fn shares_nodes_with(&self, other: &Forest) -> bool {
        self.groups.len() == other.groups.len()
            && self.groups.iter().zip(&other.groups).all(|(a, b)| Arc::ptr_eq(a, b))
    }

    /// Same shape, content and node ids. Unlike `==`, swapping one empty group
    /// for another with a different id counts as a change.
    pub fn same_tree_as(&self, other: &Forest) -> bool {
        self.groups.len() == other.groups.len()
            && self.groups.iter().zip(&other.groups).all(|(a, b)| a.same_tree_as(b))
    }

    /// Indented lines of (group combinator | condition summary)
    pub fn outline(&self) -> Vec<OutlineLine> {
        let mut lines = Vec::new();
        for (depth, group) in self.pre_order() {
            // a group's conditions are listed before its subgroups
            let indent = depth * 2;
            let label = if group.expanded {
                group.combinator.to_string()
            } else {
                format!("{} (collapsed)", group.combinator)
            };
            lines.push(OutlineLine { indent, id: group.id, label });
            if group.expanded {
                for condition in &group.conditions {
                    lines.push(OutlineLine {
                        indent: indent + 1,
                        id: condition.id,
                        label: condition.summary(),
                    });
                }
            }
        }
        lines
    }
}
