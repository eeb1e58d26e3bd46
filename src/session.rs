//! EditingSession: holds the filter being edited and applies intents to it
//!
//! Every intent runs to completion before the next one is accepted. Tree edits
//! go through the pure functions in [`crate::core::mutation`]; the session only
//! decides whether an edit is allowed and records the outcome.
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::core::column::{Column, ColumnCatalog};
use crate::core::models::{Condition, Forest, Group};
use crate::core::mutation;
use crate::core::operator::{self, Operator};
use crate::core::types::{ColumnType, IdGenerator, NodeId};
use crate::core::validation::{self, Field, FieldErrors};
use crate::services::persistence::{FilterSink, MemorySink, PersistError, SaveTarget};

/// When field edits reach the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// A field edit that passes validation is written immediately
    #[default]
    Live,
    /// Edits stay on the working copy until `CommitCondition`
    Staged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Deepest level a group may be created at; top-level groups are depth 0
    pub max_depth: usize,
    pub commit_mode: CommitMode,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_depth: 1,
            commit_mode: CommitMode::Live,
        }
    }
}

/// What the editor is focused on. A condition selection carries the working
/// copy being edited; its id identifies the node in the forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    None,
    Condition(Condition),
    Column(String),
}

impl Selection {
    pub fn condition_id(&self) -> Option<NodeId> {
        match self {
            Selection::Condition(c) => Some(c.id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("column '{0}' is not in the catalog")]
    UnknownColumn(String),
    #[error("condition {0} does not exist")]
    UnknownCondition(NodeId),
    #[error("no condition is selected")]
    NoConditionSelected,
    #[error("no column is selected")]
    NoColumnSelected,
    #[error("group {parent_id} is at the nesting limit ({max_depth})")]
    DepthLimit { parent_id: NodeId, max_depth: usize },
    #[error("node id space is exhausted")]
    IdsExhausted,
    #[error(transparent)]
    Persistence(#[from] PersistError),
}

/// Result of an intent that was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Tree or selection changed
    Applied,
    /// The target no longer exists; nothing happened
    Ignored,
    /// Validation failed; the tree was not touched
    Invalid(FieldErrors),
    Saved(SaveTarget),
    /// Save requested with no unsaved changes
    NothingToSave,
}

/// Details the editor panel shows for the selected condition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub column: String,
    pub short_code: Option<String>,
    pub column_type: ColumnType,
    pub operator: Operator,
    pub operators: Vec<Operator>,
    pub shows_value: bool,
    pub shows_secondary_value: bool,
}

/// State handed to the rendering layer after each transition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub forest: Forest,
    pub selection: Selection,
    pub errors: FieldErrors,
    pub dirty: bool,
    pub save_enabled: bool,
    pub editor: Option<EditorView>,
}

#[derive(Debug)]
pub struct EditingSession<S: FilterSink = MemorySink> {
    columns: ColumnCatalog,
    policy: SessionPolicy,
    forest: Forest,
    /// Forest as of the last save (or load)
    baseline: Forest,
    selection: Selection,
    errors: FieldErrors,
    dirty: bool,
    ids: IdGenerator,
    sink: S,
}

impl<S: FilterSink> EditingSession<S> {
    /// Fresh session: one empty AND group, nothing selected, clean
    pub fn new(columns: ColumnCatalog, sink: S) -> Self {
        let root = NodeId::new(1);
        Self::build(columns, Forest::initial(root), IdGenerator::after(root), sink)
    }

    /// Resume editing a previously saved forest. Fails when the forest already
    /// holds the largest possible id, since no new node could be numbered.
    pub fn with_forest(
        columns: ColumnCatalog,
        forest: Forest,
        sink: S,
    ) -> Result<Self, SessionError> {
        let ids = forest.max_id().map(IdGenerator::after).unwrap_or_default();
        if ids.is_exhausted() {
            return Err(SessionError::IdsExhausted);
        }
        Ok(Self::build(columns, forest, ids, sink))
    }

    fn build(columns: ColumnCatalog, forest: Forest, ids: IdGenerator, sink: S) -> Self {
        Self {
            columns,
            policy: SessionPolicy::default(),
            baseline: forest.clone(),
            forest,
            selection: Selection::None,
            errors: FieldErrors::new(),
            dirty: false,
            ids,
            sink,
        }
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save_enabled(&self) -> bool {
        self.dirty && self.errors.is_empty()
    }

    pub fn columns(&self) -> &ColumnCatalog {
        &self.columns
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn selected_condition(&self) -> Option<&Condition> {
        match &self.selection {
            Selection::Condition(c) => Some(c),
            _ => None,
        }
    }

    pub fn selected_column(&self) -> Option<&Column> {
        match &self.selection {
            Selection::Column(id) => self.columns.by_id(id),
            _ => None,
        }
    }

    pub fn editor(&self) -> Option<EditorView> {
        let condition = self.selected_condition()?;
        let operator = *condition.effective_operator();
        Some(EditorView {
            column: condition.column.clone(),
            short_code: self.columns.by_name(&condition.column).and_then(|c| c.short_code.clone()),
            column_type: condition.column_type,
            operator,
            operators: operator::operators_for(condition.column_type).to_vec(),
            shows_value: operator.takes_value(),
            shows_secondary_value: operator.is_range(),
        })
    }

    pub fn snapshot(&self) -> SessionView {
        SessionView {
            forest: self.forest.clone(),
            selection: self.selection.clone(),
            errors: self.errors.clone(),
            dirty: self.dirty,
            save_enabled: self.save_enabled(),
            editor: self.editor(),
        }
    }

    /// Apply one intent. Errors leave the session exactly as it was.
    pub fn update(&mut self, action: Action) -> Result<Outcome, SessionError> {
        debug!("Session action: {}", action);
        let result = match action {
            Action::SelectCondition(id) => self.select_condition(id),
            Action::SelectColumn(id) => self.select_column(id),
            Action::ClearSelection => {
                self.clear_selection();
                Ok(Outcome::Applied)
            }
            Action::AssignColumn { group_id, column_id } => {
                self.assign_column(group_id, &column_id)
            }
            Action::AssignSelectedColumn { group_id } => match &self.selection {
                Selection::Column(id) => {
                    let column_id = id.clone();
                    self.assign_column(group_id, &column_id)
                }
                _ => Err(SessionError::NoColumnSelected),
            },
            Action::SetOperator(op) => self.edit_field(Field::Operator, op),
            Action::SetValue(value) => self.edit_field(Field::Value, value),
            Action::SetSecondaryValue(value) => self.edit_field(Field::SecondaryValue, value),
            Action::CommitCondition => self.commit_condition(),
            Action::SetCombinator { group_id, combinator } => {
                let next = mutation::set_combinator(&self.forest, group_id, combinator);
                Ok(self.install(next))
            }
            Action::ToggleGroupExpanded(group_id) => {
                if self.forest.find_group(group_id).is_none() {
                    return Ok(Outcome::Ignored);
                }
                self.forest = mutation::toggle_expanded(&self.forest, group_id);
                Ok(Outcome::Applied)
            }
            Action::AddGroup => self.mint_id().map(|id| {
                let next = mutation::add_group(&self.forest, Group::new(id));
                self.install(next)
            }),
            Action::AddNestedGroup { parent_id } => self.add_nested_group(parent_id),
            Action::DeleteGroup(group_id) => {
                let next = mutation::delete_group(&self.forest, group_id);
                let outcome = self.install(next);
                self.drop_stale_selection();
                Ok(outcome)
            }
            Action::DeleteCondition { group_id, condition_id } => {
                let next = mutation::delete_condition(&self.forest, group_id, condition_id);
                let outcome = self.install(next);
                self.drop_stale_selection();
                Ok(outcome)
            }
            Action::Save(target) => self.save(target),
        };
        if let Err(e) = &result {
            warn!("Rejected session action: {}", e);
        }
        result
    }

    fn select_condition(&mut self, id: NodeId) -> Result<Outcome, SessionError> {
        let condition = self
            .forest
            .find_condition(id)
            .ok_or(SessionError::UnknownCondition(id))?;
        self.selection = Selection::Condition((**condition).clone());
        self.errors.clear();
        Ok(Outcome::Applied)
    }

    fn select_column(&mut self, id: String) -> Result<Outcome, SessionError> {
        if self.columns.by_id(&id).is_none() {
            return Err(SessionError::UnknownColumn(id));
        }
        self.selection = Selection::Column(id);
        // errors belong to the condition that was being edited
        self.errors.clear();
        Ok(Outcome::Applied)
    }

    fn clear_selection(&mut self) {
        self.selection = Selection::None;
        self.errors.clear();
    }

    /// The only way a condition is created: default operator, empty value
    fn assign_column(
        &mut self,
        group_id: NodeId,
        column_id: &str,
    ) -> Result<Outcome, SessionError> {
        let column = self
            .columns
            .by_id(column_id)
            .ok_or_else(|| SessionError::UnknownColumn(column_id.to_string()))?;
        // lookup first so an unknown column does not use up an id
        let id = self.ids.next_id().ok_or(SessionError::IdsExhausted)?;
        let condition = Condition::for_column(id, column);
        let next = mutation::add_condition(&self.forest, group_id, condition);
        Ok(self.install(next))
    }

    fn mint_id(&mut self) -> Result<NodeId, SessionError> {
        self.ids.next_id().ok_or(SessionError::IdsExhausted)
    }

    fn add_nested_group(&mut self, parent_id: NodeId) -> Result<Outcome, SessionError> {
        let Some(depth) = self.forest.group_depth(parent_id) else {
            return Ok(Outcome::Ignored);
        };
        if depth + 1 > self.policy.max_depth {
            return Err(SessionError::DepthLimit {
                parent_id,
                max_depth: self.policy.max_depth,
            });
        }
        let group = Group::new(self.mint_id()?);
        let next = mutation::add_subgroup(&self.forest, parent_id, group);
        Ok(self.install(next))
    }

    fn edit_field(&mut self, field: Field, text: String) -> Result<Outcome, SessionError> {
        let Selection::Condition(working) = &self.selection else {
            return Err(SessionError::NoConditionSelected);
        };
        let operator_changed = field == Field::Operator && text != working.operator;
        let edited = match field {
            Field::Operator => working.clone().with_operator(text),
            Field::Value => working.clone().with_value(text),
            Field::SecondaryValue => working.clone().with_secondary_value(text),
        };
        let field_text = match field {
            Field::Operator | Field::Value => edited.value.as_str(),
            Field::SecondaryValue => edited.secondary_value.as_deref().unwrap_or(""),
        };
        let result = validation::validate(field, edited.column_type, &edited.operator, field_text);

        if operator_changed {
            // values were reset, so errors about them no longer apply
            self.errors.remove(Field::Value);
            self.errors.remove(Field::SecondaryValue);
        }
        self.errors.record(field, result);

        // any failing field keeps the edit on the working copy
        if !self.errors.is_empty() {
            self.selection = Selection::Condition(edited);
            return Ok(Outcome::Invalid(self.errors.clone()));
        }
        match self.policy.commit_mode {
            CommitMode::Live => {
                let committed = edited.normalized();
                self.selection = Selection::Condition(committed.clone());
                Ok(self.commit(&committed))
            }
            CommitMode::Staged => {
                self.selection = Selection::Condition(edited);
                Ok(Outcome::Applied)
            }
        }
    }

    /// Re-validate every field of the working copy and write it if clean
    fn commit_condition(&mut self) -> Result<Outcome, SessionError> {
        let Selection::Condition(working) = &self.selection else {
            return Err(SessionError::NoConditionSelected);
        };
        let errors = validation::validate_condition(working);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Ok(Outcome::Invalid(errors));
        }
        let committed = working.clone().normalized();
        self.errors.clear();
        self.selection = Selection::Condition(committed.clone());
        Ok(self.commit(&committed))
    }

    fn commit(&mut self, condition: &Condition) -> Outcome {
        let next = mutation::update_condition(&self.forest, condition);
        self.install(next)
    }

    /// Swap in the next forest. A forest that still shares every top-level node
    /// with the current one is the same forest.
    fn install(&mut self, next: Forest) -> Outcome {
        if next.shares_nodes_with(&self.forest) {
            return Outcome::Ignored;
        }
        self.dirty =
            !next.shares_nodes_with(&self.baseline) && !next.same_tree_as(&self.baseline);
        self.forest = next;
        Outcome::Applied
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = self.selection.condition_id() {
            if self.forest.find_condition(id).is_none() {
                debug!("Selected condition {} was removed", id);
                self.clear_selection();
            }
        }
    }

    fn save(&mut self, target: SaveTarget) -> Result<Outcome, SessionError> {
        if !self.dirty {
            return Ok(Outcome::NothingToSave);
        }
        if !self.errors.is_empty() {
            return Ok(Outcome::Invalid(self.errors.clone()));
        }
        self.sink.persist(&self.forest, target)?;
        self.baseline = self.forest.clone();
        self.dirty = false;
        info!(
            "Saved {} groups / {} conditions ({})",
            self.forest.group_count(),
            self.forest.condition_count(),
            target
        );
        Ok(Outcome::Saved(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Combinator;
    use crate::core::validation::ValidationError;
    use pretty_assertions::assert_eq;

    fn catalog() -> ColumnCatalog {
        ColumnCatalog::new(vec![
            Column::new("item_id", "Item ID", ColumnType::String).with_short_code("ITM"),
            Column::new("amount", "Amount", ColumnType::Number).with_short_code("AMT"),
            Column::new("created_at", "Created At", ColumnType::Datetime).with_short_code("CRT"),
        ])
    }

    fn session() -> EditingSession {
        EditingSession::new(catalog(), MemorySink::new())
    }

    fn staged() -> SessionPolicy {
        SessionPolicy { commit_mode: CommitMode::Staged, ..Default::default() }
    }

    fn root(s: &EditingSession) -> NodeId {
        s.forest().groups()[0].id
    }

    /// Assign a column to the first group and select the new condition
    fn assign_and_select(s: &mut EditingSession, column_id: &str) -> NodeId {
        let group_id = root(s);
        s.update(Action::AssignColumn { group_id, column_id: column_id.into() }).unwrap();
        let id = s.forest().find_group(group_id).unwrap().conditions.last().unwrap().id;
        s.update(Action::SelectCondition(id)).unwrap();
        id
    }

    #[test]
    fn initial_state() {
        let s = session();
        assert_eq!(s.forest().groups().len(), 1);
        assert!(s.forest().groups()[0].is_empty());
        assert_eq!(s.forest().groups()[0].combinator, Combinator::And);
        assert!(s.selection().is_none());
        assert!(s.errors().is_empty());
        assert!(!s.is_dirty());
        assert!(!s.save_enabled());
    }

    #[test]
    fn assigning_a_number_column_uses_first_number_operator() {
        let mut s = session();
        let group_id = root(&s);
        let outcome = s
            .update(Action::AssignColumn { group_id, column_id: "amount".into() })
            .unwrap();

        assert_eq!(outcome, Outcome::Applied);
        let condition = &s.forest().groups()[0].conditions[0];
        assert_eq!(condition.operator, operator::default_operator(ColumnType::Number).id);
        assert_eq!(condition.value, "");
        assert_eq!(condition.column, "Amount");
        assert!(s.is_dirty());
    }

    #[test]
    fn assigning_unknown_column_is_rejected() {
        let mut s = session();
        let group_id = root(&s);
        let err = s
            .update(Action::AssignColumn { group_id, column_id: "nope".into() })
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownColumn(_)));
        assert!(!s.is_dirty());
    }

    #[test]
    fn assigning_to_missing_group_is_ignored() {
        let mut s = session();
        let outcome = s
            .update(Action::AssignColumn { group_id: NodeId::new(999), column_id: "amount".into() })
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(!s.is_dirty());
    }

    #[test]
    fn click_assign_uses_selected_column() {
        let mut s = session();
        let group_id = root(&s);
        assert!(matches!(
            s.update(Action::AssignSelectedColumn { group_id }),
            Err(SessionError::NoColumnSelected)
        ));

        s.update(Action::SelectColumn("created_at".into())).unwrap();
        assert_eq!(s.selected_column().map(|c| c.name.as_str()), Some("Created At"));
        s.update(Action::AssignSelectedColumn { group_id }).unwrap();
        assert_eq!(s.forest().groups()[0].conditions[0].column_type, ColumnType::Datetime);
    }

    #[test]
    fn selecting_column_replaces_condition_selection() {
        let mut s = session();
        assign_and_select(&mut s, "amount");
        s.update(Action::SetValue("abc".into())).unwrap();
        assert!(!s.errors().is_empty());

        s.update(Action::SelectColumn("item_id".into())).unwrap();
        assert_eq!(s.selection(), &Selection::Column("item_id".into()));
        assert!(s.selected_condition().is_none());
        assert!(s.errors().is_empty());
    }

    #[test]
    fn valid_value_edit_commits_immediately() {
        let mut s = session();
        let id = assign_and_select(&mut s, "amount");
        let outcome = s.update(Action::SetValue("1500".into())).unwrap();

        assert_eq!(outcome, Outcome::Applied);
        assert!(s.errors().is_empty());
        assert_eq!(s.forest().find_condition(id).unwrap().value, "1500");
        assert!(s.save_enabled());
    }

    #[test]
    fn invalid_value_edit_is_recorded_but_not_committed() {
        let mut s = session();
        let id = assign_and_select(&mut s, "amount");
        s.update(Action::SetValue("10".into())).unwrap();
        let outcome = s.update(Action::SetValue("ten".into())).unwrap();

        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(s.errors().get(Field::Value), Some(&ValidationError::InvalidNumber));
        assert_eq!(s.forest().find_condition(id).unwrap().value, "10");
        assert_eq!(s.selected_condition().unwrap().value, "ten");
        assert!(!s.save_enabled());
        assert_eq!(
            s.update(Action::Save(SaveTarget::Default)).unwrap(),
            Outcome::Invalid(s.errors().clone())
        );
        assert!(s.sink().saved().is_empty());
    }

    #[test]
    fn fixing_the_field_clears_its_error() {
        let mut s = session();
        assign_and_select(&mut s, "amount");
        s.update(Action::SetValue("ten".into())).unwrap();
        s.update(Action::SetValue("10".into())).unwrap();
        assert!(s.errors().is_empty());
    }

    #[test]
    fn operator_switch_resets_value() {
        let mut s = session();
        let id = assign_and_select(&mut s, "created_at");
        s.update(Action::SetValue("2025-02-27".into())).unwrap();
        s.update(Action::SetOperator("today".into())).unwrap();

        let stored = s.forest().find_condition(id).unwrap();
        assert_eq!(stored.operator, "today");
        assert_eq!(stored.value, "");

        s.update(Action::SetOperator("before".into())).unwrap();
        assert_eq!(s.forest().find_condition(id).unwrap().operator, "before");
        assert_eq!(s.forest().find_condition(id).unwrap().value, "");
    }

    #[test]
    fn operator_outside_catalog_is_not_committed() {
        let mut s = session();
        let id = assign_and_select(&mut s, "amount");
        let outcome = s.update(Action::SetOperator("contains".into())).unwrap();
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(s.forest().find_condition(id).unwrap().operator, "equals");

        // a valid value does not smuggle the bad operator into the tree
        let outcome = s.update(Action::SetValue("5".into())).unwrap();
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(s.forest().find_condition(id).unwrap().value, "");

        let outcome = s.update(Action::SetOperator("".into())).unwrap();
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(s.errors().get(Field::Operator), Some(&ValidationError::MissingOperator));
    }

    #[test]
    fn selecting_a_condition_starts_a_clean_slate() {
        let mut s = session();
        let first = assign_and_select(&mut s, "amount");
        s.update(Action::SetValue("x".into())).unwrap();
        let second = assign_and_select(&mut s, "item_id");
        assert!(s.errors().is_empty());
        assert_eq!(s.selection().condition_id(), Some(second));

        // revisiting shows the stored, not the abandoned, value
        s.update(Action::SelectCondition(first)).unwrap();
        assert_eq!(s.selected_condition().unwrap().value, "");
    }

    #[test]
    fn selecting_unknown_condition_is_rejected() {
        let mut s = session();
        assert!(matches!(
            s.update(Action::SelectCondition(NodeId::new(77))),
            Err(SessionError::UnknownCondition(_))
        ));
        assert!(matches!(
            s.update(Action::SetValue("1".into())),
            Err(SessionError::NoConditionSelected)
        ));
    }

    #[test]
    fn staged_mode_commits_only_on_explicit_commit() {
        let mut s = session().with_policy(staged());
        let id = assign_and_select(&mut s, "amount");
        s.update(Action::SetOperator("between".into())).unwrap();
        s.update(Action::SetValue("10".into())).unwrap();
        assert_eq!(s.forest().find_condition(id).unwrap().operator, "equals");

        let outcome = s.update(Action::CommitCondition).unwrap();
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(s.errors().get(Field::SecondaryValue), Some(&ValidationError::MissingValue));
        assert_eq!(s.forest().find_condition(id).unwrap().operator, "equals");

        s.update(Action::SetSecondaryValue("20".into())).unwrap();
        assert_eq!(s.update(Action::CommitCondition).unwrap(), Outcome::Applied);
        let stored = s.forest().find_condition(id).unwrap();
        assert_eq!(stored.operator, "between");
        assert_eq!((stored.value.as_str(), stored.secondary_value.as_deref()), ("10", Some("20")));
        assert!(s.errors().is_empty());
    }

    #[test]
    fn failed_commit_does_not_mark_dirty() {
        let mut s = session().with_policy(staged());
        let id = assign_and_select(&mut s, "amount");
        s.update(Action::Save(SaveTarget::Default)).unwrap();
        assert!(!s.is_dirty());

        s.update(Action::SetValue("abc".into())).unwrap();
        assert!(matches!(s.update(Action::CommitCondition).unwrap(), Outcome::Invalid(_)));
        assert!(!s.is_dirty());
        assert_eq!(s.forest().find_condition(id).unwrap().value, "");
    }

    #[test]
    fn commit_clears_value_for_valueless_operator() {
        let mut s = session().with_policy(staged());
        let id = assign_and_select(&mut s, "item_id");
        s.update(Action::SetOperator("is_blank".into())).unwrap();
        s.update(Action::SetValue("leftover".into())).unwrap();
        assert_eq!(s.update(Action::CommitCondition).unwrap(), Outcome::Applied);
        assert_eq!(s.forest().find_condition(id).unwrap().value, "");
    }

    #[test]
    fn nested_groups_are_capped_by_policy() {
        let mut s = session();
        let top = root(&s);
        s.update(Action::AddNestedGroup { parent_id: top }).unwrap();
        let child = s.forest().groups()[0].subgroups[0].id;
        assert_eq!(s.forest().group_depth(child), Some(1));

        let err = s.update(Action::AddNestedGroup { parent_id: child }).unwrap_err();
        assert!(matches!(err, SessionError::DepthLimit { max_depth: 1, .. }));

        let mut deep = session().with_policy(SessionPolicy { max_depth: 2, ..Default::default() });
        let top = root(&deep);
        deep.update(Action::AddNestedGroup { parent_id: top }).unwrap();
        let child = deep.forest().groups()[0].subgroups[0].id;
        assert_eq!(
            deep.update(Action::AddNestedGroup { parent_id: child }).unwrap(),
            Outcome::Applied
        );
        assert_eq!(deep.forest().group_count(), 3);
    }

    #[test]
    fn add_group_appends_empty_and_group() {
        let mut s = session();
        s.update(Action::AddGroup).unwrap();
        let groups = s.forest().groups();
        assert_eq!(groups.len(), 2);
        assert!(groups[1].is_empty());
        assert_eq!(groups[1].combinator, Combinator::And);
        assert!(groups[1].id > groups[0].id);
        assert!(s.is_dirty());
    }

    #[test]
    fn deleting_selected_condition_clears_selection() {
        let mut s = session();
        let id = assign_and_select(&mut s, "amount");
        let group_id = root(&s);
        s.update(Action::DeleteCondition { group_id, condition_id: id }).unwrap();
        assert!(s.selection().is_none());
        assert!(s.forest().find_condition(id).is_none());
    }

    #[test]
    fn deleting_group_clears_selection_inside_it() {
        let mut s = session();
        s.update(Action::AddGroup).unwrap();
        let second = s.forest().groups()[1].id;
        s.update(Action::AssignColumn { group_id: second, column_id: "amount".into() }).unwrap();
        let id = s.forest().groups()[1].conditions[0].id;
        s.update(Action::SelectCondition(id)).unwrap();

        s.update(Action::DeleteGroup(root(&s))).unwrap();
        assert_eq!(s.selection().condition_id(), Some(id));

        s.update(Action::DeleteGroup(second)).unwrap();
        assert!(s.selection().is_none());
        assert!(s.forest().is_empty());
    }

    #[test]
    fn deleting_missing_nodes_is_silent() {
        let mut s = session();
        assert_eq!(s.update(Action::DeleteGroup(NodeId::new(50))).unwrap(), Outcome::Ignored);
        assert_eq!(
            s.update(Action::DeleteCondition { group_id: root(&s), condition_id: NodeId::new(51) })
                .unwrap(),
            Outcome::Ignored
        );
        assert!(!s.is_dirty());
    }

    #[test]
    fn combinator_change_marks_dirty_but_collapse_does_not() {
        let mut s = session();
        let group_id = root(&s);
        s.update(Action::ToggleGroupExpanded(group_id)).unwrap();
        assert!(!s.forest().groups()[0].expanded);
        assert!(!s.is_dirty());

        s.update(Action::SetCombinator { group_id, combinator: Combinator::Or }).unwrap();
        assert_eq!(s.forest().groups()[0].combinator, Combinator::Or);
        assert!(s.is_dirty());
    }

    #[test]
    fn replacing_the_root_with_a_new_empty_group_is_a_change() {
        let mut s = session();
        let original = root(&s);
        s.update(Action::AddGroup).unwrap();
        s.update(Action::DeleteGroup(original)).unwrap();

        assert_eq!(s.forest().groups().len(), 1);
        assert_ne!(root(&s), original);
        assert!(s.is_dirty());
        assert_eq!(
            s.update(Action::Save(SaveTarget::Default)).unwrap(),
            Outcome::Saved(SaveTarget::Default)
        );
        let (_, saved) = s.sink().last().unwrap();
        assert_eq!(saved.groups()[0].id, root(&s));
    }

    #[test]
    fn live_edit_waits_until_every_field_passes() {
        let mut s = session();
        let id = assign_and_select(&mut s, "amount");
        s.update(Action::SetOperator("between".into())).unwrap();
        let stored = s.forest().find_condition(id).unwrap().clone();

        let outcome = s.update(Action::SetSecondaryValue("x".into())).unwrap();
        assert!(matches!(outcome, Outcome::Invalid(_)));
        let outcome = s.update(Action::SetValue("10".into())).unwrap();
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(s.errors().get(Field::SecondaryValue), Some(&ValidationError::InvalidNumber));
        assert!(!s.errors().contains(Field::Value));
        assert_eq!(s.forest().find_condition(id).unwrap(), &stored);

        assert_eq!(s.update(Action::SetSecondaryValue("20".into())).unwrap(), Outcome::Applied);
        assert!(s.errors().is_empty());
        let committed = s.forest().find_condition(id).unwrap();
        assert_eq!(committed.value, "10");
        assert_eq!(committed.secondary_value.as_deref(), Some("20"));
    }

    #[test]
    fn undoing_an_edit_leaves_session_clean() {
        let mut s = session();
        s.update(Action::AddGroup).unwrap();
        assert!(s.is_dirty());
        let added = s.forest().groups()[1].id;
        s.update(Action::DeleteGroup(added)).unwrap();
        assert!(!s.is_dirty());
    }

    #[test]
    fn save_hands_forest_over_unchanged() {
        let mut s = session();
        assert_eq!(s.update(Action::Save(SaveTarget::Default)).unwrap(), Outcome::NothingToSave);

        assign_and_select(&mut s, "amount");
        s.update(Action::SetValue("1500".into())).unwrap();
        let before = s.forest().clone();
        assert_eq!(
            s.update(Action::Save(SaveTarget::Preset)).unwrap(),
            Outcome::Saved(SaveTarget::Preset)
        );

        assert!(!s.is_dirty());
        let (target, saved) = s.sink().last().unwrap();
        assert_eq!(*target, SaveTarget::Preset);
        assert!(saved.shares_nodes_with(&before));
    }

    #[test]
    fn editor_view_describes_selected_condition() {
        let mut s = session();
        assign_and_select(&mut s, "amount");
        s.update(Action::SetOperator("between".into())).unwrap();
        let editor = s.editor().unwrap();

        assert_eq!(editor.short_code.as_deref(), Some("AMT"));
        assert_eq!(editor.operators.len(), operator::operators_for(ColumnType::Number).len());
        assert!(editor.shows_value);
        assert!(editor.shows_secondary_value);
    }

    #[test]
    fn resumed_session_mints_fresh_ids() {
        let forest = Forest::from_groups(vec![Group::new(NodeId::new(40))]);
        let mut s = EditingSession::with_forest(catalog(), forest, MemorySink::new()).unwrap();
        assert!(!s.is_dirty());
        s.update(Action::AddGroup).unwrap();
        assert_eq!(s.forest().groups()[1].id, NodeId::new(41));
    }

    #[test]
    fn forest_holding_the_last_id_cannot_be_resumed() {
        let forest = Forest::from_groups(vec![Group::new(NodeId::new(u64::MAX))]);
        let result = EditingSession::with_forest(catalog(), forest, MemorySink::new());
        assert!(matches!(result, Err(SessionError::IdsExhausted)));
    }

    #[test]
    fn ids_are_never_reused_when_the_id_space_runs_out() {
        let forest = Forest::from_groups(vec![Group::new(NodeId::new(u64::MAX - 1))]);
        let mut s = EditingSession::with_forest(catalog(), forest, MemorySink::new()).unwrap();

        assert_eq!(s.update(Action::AddGroup).unwrap(), Outcome::Applied);
        assert_eq!(s.forest().groups()[1].id, NodeId::new(u64::MAX));

        let before = s.forest().clone();
        assert!(matches!(s.update(Action::AddGroup), Err(SessionError::IdsExhausted)));
        let group_id = s.forest().groups()[0].id;
        assert!(matches!(
            s.update(Action::AssignColumn { group_id, column_id: "amount".into() }),
            Err(SessionError::IdsExhausted)
        ));
        assert!(matches!(
            s.update(Action::AddNestedGroup { parent_id: group_id }),
            Err(SessionError::IdsExhausted)
        ));
        assert!(s.forest().shares_nodes_with(&before));
    }
}
