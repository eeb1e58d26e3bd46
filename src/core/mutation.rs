//! Pure copy-on-write edits over a [`Forest`]
//!
//! Every function takes the current forest and returns the next one. Only the
//! groups on the path from the root to the edited node are rebuilt; all other
//! subtrees are shared with the input. A target id that cannot be found is a
//! silent no-op: the input comes back unchanged.
use std::sync::Arc;

use crate::core::models::{Condition, Forest, Group};
use crate::core::types::{Combinator, NodeId};

enum Rewrite {
    Replace(Arc<Group>),
    Remove,
}

/// Apply `visit` to groups in depth-first pre-order and rewrite the first one it
/// claims. Returns the rebuilt sibling list, or None when nothing matched.
fn rewrite_first<F>(groups: &[Arc<Group>], visit: &mut F) -> Option<Vec<Arc<Group>>>
where
    F: FnMut(&Group) -> Option<Rewrite>,
{
    for (idx, group) in groups.iter().enumerate() {
        if let Some(rewrite) = visit(group.as_ref()) {
            let mut next = groups.to_vec();
            match rewrite {
                Rewrite::Replace(new_group) => next[idx] = new_group,
                Rewrite::Remove => {
                    next.remove(idx);
                }
            }
            return Some(next);
        }
        if let Some(subgroups) = rewrite_first(&group.subgroups, visit) {
            let mut next = groups.to_vec();
            next[idx] = Arc::new(group.with_subgroups(subgroups));
            return Some(next);
        }
    }
    None
}

fn apply<F>(forest: &Forest, mut visit: F) -> Forest
where
    F: FnMut(&Group) -> Option<Rewrite>,
{
    match rewrite_first(forest.groups(), &mut visit) {
        Some(groups) => Forest::new(groups),
        None => forest.clone(),
    }
}

/// Replace the group with `group_id`, wherever it sits, with `new_group`
pub fn replace_group(forest: &Forest, group_id: NodeId, new_group: Group) -> Forest {
    let new_group = Arc::new(new_group);
    apply(forest, |g| (g.id == group_id).then(|| Rewrite::Replace(Arc::clone(&new_group))))
}

/// Remove the group with `group_id` and its whole subtree
pub fn delete_group(forest: &Forest, group_id: NodeId) -> Forest {
    apply(forest, |g| (g.id == group_id).then_some(Rewrite::Remove))
}

/// Append a top-level group
pub fn add_group(forest: &Forest, group: Group) -> Forest {
    let mut groups = forest.groups().to_vec();
    groups.push(Arc::new(group));
    Forest::new(groups)
}

/// Append `group` to the subgroups of `parent_id`
pub fn add_subgroup(forest: &Forest, parent_id: NodeId, group: Group) -> Forest {
    let child = Arc::new(group);
    apply(forest, |g| {
        (g.id == parent_id).then(|| {
            let mut subgroups = g.subgroups.clone();
            subgroups.push(Arc::clone(&child));
            Rewrite::Replace(Arc::new(g.with_subgroups(subgroups)))
        })
    })
}

/// Append `condition` to the end of the target group's conditions
pub fn add_condition(forest: &Forest, group_id: NodeId, condition: Condition) -> Forest {
    let condition = Arc::new(condition);
    apply(forest, |g| {
        (g.id == group_id).then(|| {
            let mut conditions = g.conditions.clone();
            conditions.push(Arc::clone(&condition));
            Rewrite::Replace(Arc::new(g.with_conditions(conditions)))
        })
    })
}

/// Remove a condition from the named group's condition list
pub fn delete_condition(forest: &Forest, group_id: NodeId, condition_id: NodeId) -> Forest {
    apply(forest, |g| {
        if g.id != group_id || !g.conditions.iter().any(|c| c.id == condition_id) {
            return None;
        }
        let conditions = g.conditions.iter().filter(|c| c.id != condition_id).cloned().collect();
        Some(Rewrite::Replace(Arc::new(g.with_conditions(conditions))))
    })
}

/// Replace the first condition (searched across every group) whose id matches
/// `updated.id`. Identity fields (id, column, column type) of the stored
/// condition are kept; only operator and values are taken from `updated`.
pub fn update_condition(forest: &Forest, updated: &Condition) -> Forest {
    apply(forest, |g| {
        let idx = g.conditions.iter().position(|c| c.id == updated.id)?;
        let current = &g.conditions[idx];
        let merged = Condition {
            id: current.id,
            column: current.column.clone(),
            column_type: current.column_type,
            operator: updated.operator.clone(),
            value: updated.value.clone(),
            secondary_value: updated.secondary_value.clone(),
        };
        let mut conditions = g.conditions.clone();
        conditions[idx] = Arc::new(merged);
        Some(Rewrite::Replace(Arc::new(g.with_conditions(conditions))))
    })
}

pub fn set_combinator(forest: &Forest, group_id: NodeId, combinator: Combinator) -> Forest {
    match forest.find_group(group_id) {
        Some(group) => {
            let mut next = (**group).clone();
            next.combinator = combinator;
            replace_group(forest, group_id, next)
        }
        None => forest.clone(),
    }
}

pub fn toggle_expanded(forest: &Forest, group_id: NodeId) -> Forest {
    match forest.find_group(group_id) {
        Some(group) => {
            let mut next = (**group).clone();
            next.expanded = !next.expanded;
            replace_group(forest, group_id, next)
        }
        None => forest.clone(),
    }
}
