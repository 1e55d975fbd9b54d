use crate::schema::ParamId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of generated case ids.
pub const CASE_ID_PREFIX: &str = "branch_one_of::";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "and"),
            LogicalOperator::Or => write!(f, "or"),
        }
    }
}

/// Comparison applied between the left and right operand of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOperator {
    Contains,
    NotContains,
    Empty,
    NotEmpty,
    Is,
    IsNot,
    StartWith,
    EndWith,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Null,
    NotNull,
}

impl CompareOperator {
    pub const ALL: [CompareOperator; 16] = [
        CompareOperator::Contains,
        CompareOperator::NotContains,
        CompareOperator::Empty,
        CompareOperator::NotEmpty,
        CompareOperator::Is,
        CompareOperator::IsNot,
        CompareOperator::StartWith,
        CompareOperator::EndWith,
        CompareOperator::Eq,
        CompareOperator::Ne,
        CompareOperator::Gt,
        CompareOperator::Ge,
        CompareOperator::Lt,
        CompareOperator::Le,
        CompareOperator::Null,
        CompareOperator::NotNull,
    ];

    /// Unary operators ignore the right operand, which stays an empty literal.
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            CompareOperator::Null
                | CompareOperator::NotNull
                | CompareOperator::Empty
                | CompareOperator::NotEmpty
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOperator::Contains => "contains",
            CompareOperator::NotContains => "not contains",
            CompareOperator::Empty => "is empty",
            CompareOperator::NotEmpty => "is not empty",
            CompareOperator::Is => "is",
            CompareOperator::IsNot => "is not",
            CompareOperator::StartWith => "starts with",
            CompareOperator::EndWith => "ends with",
            CompareOperator::Eq => "==",
            CompareOperator::Ne => "!=",
            CompareOperator::Gt => ">",
            CompareOperator::Ge => ">=",
            CompareOperator::Lt => "<",
            CompareOperator::Le => "<=",
            CompareOperator::Null => "is null",
            CompareOperator::NotNull => "is not null",
        }
    }
}

/// One comparison. Operands are ids of params in the owning node's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub left_var_index: ParamId,
    pub right_var_index: ParamId,
    #[serde(default)]
    pub compare_operator: Option<CompareOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_operator_err_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand_err_msg: Option<String>,
}

impl Condition {
    pub fn new(left: impl Into<ParamId>, right: impl Into<ParamId>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            left_var_index: left.into(),
            right_var_index: right.into(),
            compare_operator: None,
            compare_operator_err_msg: None,
            operand_err_msg: None,
        }
    }

    pub fn is_unary(&self) -> bool {
        self.compare_operator.is_some_and(|op| op.is_unary())
    }

    pub fn uses_param(&self, param_id: &str) -> bool {
        self.left_var_index == param_id || self.right_var_index == param_id
    }
}

/// One branch of a conditional node. The trailing case carrying the else level is
/// the implicit fallback and has no editable conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub level: u32,
    #[serde(default)]
    pub logical_operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Case {
    pub fn new(level: u32, conditions: Vec<Condition>) -> Self {
        Self {
            id: format!("{}{}", CASE_ID_PREFIX, uuid::Uuid::new_v4()),
            level,
            logical_operator: LogicalOperator::And,
            conditions,
        }
    }

    pub fn is_else(&self, else_level: u32) -> bool {
        self.level == else_level
    }

    /// The operator selector only matters once a case holds two or more conditions.
    pub fn shows_logical_operator(&self) -> bool {
        self.conditions.len() >= 2
    }

    /// Ids of all params backing this case's operands.
    pub fn operand_ids(&self) -> Vec<ParamId> {
        self.conditions
            .iter()
            .flat_map(|c| [c.left_var_index.clone(), c.right_var_index.clone()])
            .collect()
    }
}

/// Keeps the else-case last and numbers the other cases `1..N` in their current order.
pub fn renumber(cases: &mut Vec<Case>, else_level: u32) {
    if let Some(pos) = cases.iter().position(|c| c.is_else(else_level))
        && pos + 1 != cases.len()
    {
        let else_case = cases.remove(pos);
        cases.push(else_case);
    }
    let mut level = 1;
    for case in cases.iter_mut().filter(|c| c.level != else_level) {
        case.level = level;
        level += 1;
    }
}
