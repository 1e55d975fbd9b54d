use thiserror::Error;

/// Errors raised by store mutators when a request cannot be applied to the graph.
///
/// Field-level validation problems are never reported through this type; they are
/// recorded on the affected param, condition or node parameter instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Node '{0}' not found in the workflow")]
    NodeNotFound(String),

    #[error("Param '{param_id}' not found on node '{node_id}'")]
    ParamNotFound { node_id: String, param_id: String },

    #[error("Param '{param_id}' on node '{node_id}' is not a container and cannot hold children")]
    NotAContainer { node_id: String, param_id: String },

    #[error(
        "Param '{param_id}' on node '{node_id}' is an array element and can only be removed with its array"
    )]
    ArrayElementLocked { node_id: String, param_id: String },

    #[error("'{path}' on node '{source_node_id}' is not visible from node '{node_id}'")]
    ReferenceNotVisible {
        node_id: String,
        source_node_id: String,
        path: String,
    },

    #[error("Node '{0}' has no branch cases")]
    NotABranchNode(String),

    #[error("Case '{case_id}' not found on node '{node_id}'")]
    CaseNotFound { node_id: String, case_id: String },

    #[error("The else-case '{0}' cannot be removed or edited")]
    ElseCaseLocked(String),

    #[error("Condition {index} not found in case '{case_id}'")]
    ConditionNotFound { case_id: String, index: usize },

    #[error("Case '{0}' must keep at least one condition")]
    LastCondition(String),

    #[error("Case '{case_id}' is the only regular case of node '{node_id}'")]
    LastCase { node_id: String, case_id: String },

    #[error(
        "The right operand of condition {index} in case '{case_id}' is locked by a unary compare operator"
    )]
    OperandLocked { case_id: String, index: usize },
}

/// Errors that can occur when converting a console JSON document into a `WorkflowGraph`.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    #[error("Failed to parse workflow JSON: {0}")]
    JsonParseError(String),

    #[error("Unknown param type '{0}'")]
    UnknownParamType(String),

    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Invalid workflow data: {0}")]
    ValidationError(String),
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        ConversionError::JsonParseError(err.to_string())
    }
}

/// Errors raised by the template editor for invalid cursor positions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Cursor offset {offset} is outside the text (length {len})")]
    CursorOutOfBounds { offset: usize, len: usize },

    #[error("Cursor offset {0} does not fall on a character boundary")]
    NotACharBoundary(usize),
}
