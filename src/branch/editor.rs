use super::{Case, CompareOperator, Condition, LogicalOperator, renumber};
use crate::error::StoreError;
use crate::graph::{Node, NodeId, Side};
use crate::schema::{Param, ParamId, ValueSource};
use crate::store::{InputChange, WorkflowStore};
use tracing::{debug, info};

/// Which operand of a condition an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Left,
    Right,
}

/// Edits the cases of one branch node. Obtained from `WorkflowStore::branch`.
pub struct BranchEditor<'s> {
    store: &'s mut WorkflowStore,
    node_id: NodeId,
}

impl<'s> BranchEditor<'s> {
    pub(crate) fn new(store: &'s mut WorkflowStore, node_id: &str) -> Self {
        Self {
            store,
            node_id: node_id.to_string(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn cases(&self) -> &[Case] {
        self.store
            .node(&self.node_id)
            .and_then(|n| n.node_param.cases.as_deref())
            .unwrap_or_default()
    }

    pub fn case(&self, case_id: &str) -> Option<&Case> {
        self.cases().iter().find(|c| c.id == case_id)
    }

    /// Inserts a new case before the else-case and returns its id. The case starts
    /// with one condition backed by two fresh input params.
    pub fn add_case(&mut self) -> Result<String, StoreError> {
        self.store.snapshot("add case");
        let else_level = self.store.config.else_level;
        let condition = self.allocate_condition()?;
        let node = self.node_mut()?;
        let cases = cases_mut(node)?;
        let level = cases.iter().filter(|c| !c.is_else(else_level)).count() as u32 + 1;
        let case = Case::new(level, vec![condition]);
        let case_id = case.id.clone();
        let insert_at = cases
            .iter()
            .position(|c| c.is_else(else_level))
            .unwrap_or(cases.len());
        cases.insert(insert_at, case);
        renumber(cases, else_level);
        let total = cases.len();
        info!(node_id = %self.node_id, case_id = %case_id, cases = total, "added case");
        self.commit_inputs(InputChange::Updated(case_id.clone()));
        Ok(case_id)
    }

    /// Deletes a case, the params backing its operands and every edge leaving the
    /// node through the case's handle, then renumbers the remaining cases. A branch
    /// keeps at least one regular case besides the else-case.
    pub fn remove_case(&mut self, case_id: &str) -> Result<(), StoreError> {
        let operands = self.editable_case(case_id)?.operand_ids();
        let else_level = self.store.config.else_level;
        if self.cases().iter().filter(|c| !c.is_else(else_level)).count() < 2 {
            return Err(StoreError::LastCase {
                node_id: self.node_id.clone(),
                case_id: case_id.to_string(),
            });
        }
        self.store.snapshot("remove case");
        let node = self.node_mut()?;
        for param_id in &operands {
            // Operands may already be gone; a missing one is not an error here.
            let _ = node.inputs.remove(param_id);
        }
        let cases = cases_mut(node)?;
        cases.retain(|c| c.id != case_id);
        renumber(cases, else_level);

        let node_id = self.node_id.clone();
        let removed = self.store.graph.remove_edges_where(|e| {
            e.source == node_id && e.source_handle.as_deref() == Some(case_id)
        });
        if !removed.is_empty() {
            self.store.hooks.edges_removed(&removed);
        }
        info!(
            node_id = %self.node_id,
            case_id,
            edges_removed = removed.len(),
            "removed case"
        );
        self.commit_inputs(InputChange::Removed(case_id.to_string()));
        Ok(())
    }

    /// Appends a condition to a case and returns its index.
    pub fn add_condition(&mut self, case_id: &str) -> Result<usize, StoreError> {
        self.editable_case(case_id)?;
        self.store.snapshot("add condition");
        let condition = self.allocate_condition()?;
        let case = self.case_mut(case_id)?;
        case.conditions.push(condition);
        let index = case.conditions.len() - 1;
        debug!(node_id = %self.node_id, case_id, index, "added condition");
        self.commit_inputs(InputChange::Updated(case_id.to_string()));
        Ok(index)
    }

    /// Removes the condition at `index` with its operand params. A case keeps at
    /// least one condition.
    pub fn remove_condition(&mut self, case_id: &str, index: usize) -> Result<(), StoreError> {
        let case = self.editable_case(case_id)?;
        let condition = case
            .conditions
            .get(index)
            .ok_or_else(|| StoreError::ConditionNotFound {
                case_id: case_id.to_string(),
                index,
            })?;
        if case.conditions.len() == 1 {
            return Err(StoreError::LastCondition(case_id.to_string()));
        }
        let operands = [
            condition.left_var_index.clone(),
            condition.right_var_index.clone(),
        ];

        self.store.snapshot("remove condition");
        let node = self.node_mut()?;
        for param_id in &operands {
            let _ = node.inputs.remove(param_id);
        }
        let case = find_case_mut(node, case_id)?;
        case.conditions.remove(index);
        debug!(node_id = %self.node_id, case_id, index, "removed condition");
        self.commit_inputs(InputChange::Updated(case_id.to_string()));
        Ok(())
    }

    pub fn set_operator(&mut self, case_id: &str, operator: LogicalOperator) -> Result<(), StoreError> {
        self.editable_case(case_id)?;
        let case = self.case_mut(case_id)?;
        case.logical_operator = operator;
        debug!(node_id = %self.node_id, case_id, %operator, "set logical operator");
        self.store.commit(&self.node_id, Vec::new());
        Ok(())
    }

    /// Selects the compare operator of a condition. A unary operator resets the right
    /// operand to an empty literal.
    pub fn set_compare_operator(
        &mut self,
        case_id: &str,
        index: usize,
        operator: CompareOperator,
    ) -> Result<(), StoreError> {
        self.editable_case(case_id)?;
        let condition = self.condition_mut(case_id, index)?;
        condition.compare_operator = Some(operator);
        let right = condition.right_var_index.clone();
        if operator.is_unary() {
            let node = self.node_mut()?;
            if let Some(param) = node.inputs.get_mut(&right) {
                param.value = Some(ValueSource::empty_literal());
            }
        }
        debug!(node_id = %self.node_id, case_id, index, ?operator, "set compare operator");
        self.store.commit(&self.node_id, Vec::new());
        Ok(())
    }

    /// Sets the value of one operand. The right operand is read-only while a unary
    /// operator is selected.
    pub fn set_operand(
        &mut self,
        case_id: &str,
        index: usize,
        operand: Operand,
        value: ValueSource,
    ) -> Result<(), StoreError> {
        self.editable_case(case_id)?;
        let condition = self.condition_mut(case_id, index)?;
        if operand == Operand::Right && condition.is_unary() {
            return Err(StoreError::OperandLocked {
                case_id: case_id.to_string(),
                index,
            });
        }
        let param_id = match operand {
            Operand::Left => condition.left_var_index.clone(),
            Operand::Right => condition.right_var_index.clone(),
        };
        let node_id = self.node_id.clone();
        self.store.set_param(&node_id, &param_id, |param| {
            param.value = Some(value);
        })
    }

    fn allocate_condition(&mut self) -> Result<Condition, StoreError> {
        let prefix = self.store.config.input_name_prefix.clone();
        let node = self.node_mut()?;
        let mut allocate = || -> ParamId {
            let name = format!("{}{}", prefix, uuid::Uuid::new_v4().simple());
            node.inputs.push_root(Param::input(name))
        };
        let left = allocate();
        let right = allocate();
        Ok(Condition::new(left, right))
    }

    fn editable_case(&self, case_id: &str) -> Result<&Case, StoreError> {
        let case = self.case(case_id).ok_or_else(|| StoreError::CaseNotFound {
            node_id: self.node_id.clone(),
            case_id: case_id.to_string(),
        })?;
        if case.is_else(self.store.config.else_level) {
            return Err(StoreError::ElseCaseLocked(case_id.to_string()));
        }
        Ok(case)
    }

    fn node_mut(&mut self) -> Result<&mut Node, StoreError> {
        self.store.node_mut(&self.node_id)
    }

    fn case_mut(&mut self, case_id: &str) -> Result<&mut Case, StoreError> {
        let node = self.store.node_mut(&self.node_id)?;
        find_case_mut(node, case_id)
    }

    fn condition_mut(&mut self, case_id: &str, index: usize) -> Result<&mut Condition, StoreError> {
        self.case_mut(case_id)?
            .conditions
            .get_mut(index)
            .ok_or_else(|| StoreError::ConditionNotFound {
                case_id: case_id.to_string(),
                index,
            })
    }

    fn commit_inputs(&mut self, change: InputChange) {
        let events = self.store.input_events(&self.node_id, Side::Inputs, change);
        self.store.commit(&self.node_id, events);
    }
}

fn cases_mut(node: &mut Node) -> Result<&mut Vec<Case>, StoreError> {
    let node_id = node.id.clone();
    node.node_param
        .cases
        .as_mut()
        .ok_or(StoreError::NotABranchNode(node_id))
}

fn find_case_mut<'n>(node: &'n mut Node, case_id: &str) -> Result<&'n mut Case, StoreError> {
    let node_id = node.id.clone();
    cases_mut(node)?
        .iter_mut()
        .find(|c| c.id == case_id)
        .ok_or_else(|| StoreError::CaseNotFound {
            node_id,
            case_id: case_id.to_string(),
        })
}
