use super::ParamType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ParamId = String;

/// Name given to the locked element template of an `array-object` param.
pub const ARRAY_ELEMENT_NAME: &str = "[Array Item]";

/// Target of a `ref` value: a dotted path into an ancestor node's outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefTarget {
    #[serde(rename = "nodeId", default)]
    pub node_id: String,
    #[serde(default)]
    pub name: String,
    /// Id of the referenced output param, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ParamId>,
}

impl RefTarget {
    pub fn new(node_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            name: name.into(),
            id: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node_id.is_empty() && self.name.is_empty()
    }
}

/// Where an input param takes its value from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum ValueSource {
    Literal(String),
    Ref(RefTarget),
}

impl ValueSource {
    pub fn empty_ref() -> Self {
        ValueSource::Ref(RefTarget::default())
    }

    pub fn empty_literal() -> Self {
        ValueSource::Literal(String::new())
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, ValueSource::Literal(_))
    }

    pub fn as_ref_target(&self) -> Option<&RefTarget> {
        match self {
            ValueSource::Ref(target) => Some(target),
            ValueSource::Literal(_) => None,
        }
    }
}

/// Per-field validation messages. `None` means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub name: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.description.is_none()
    }

    pub fn clear(&mut self) {
        *self = FieldErrors::default();
    }
}

/// One entry of a node's input or output schema tree.
///
/// The editable fields are public and may be changed through
/// `WorkflowStore::set_param`; the type and the tree links are owned by the
/// `SchemaTree` so that type changes always rebuild the children.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: ParamId,
    pub name: String,
    pub default: Value,
    pub required: bool,
    pub description: Option<String>,
    pub value: Option<ValueSource>,
    pub errors: FieldErrors,
    pub(crate) param_type: ParamType,
    pub(crate) parent: Option<ParamId>,
    pub(crate) children: Vec<ParamId>,
    pub(crate) array_element: bool,
}

impl Param {
    /// A fresh param with a generated id and the type's default value.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name, param_type)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default: param_type.default_value(),
            required: false,
            description: None,
            value: None,
            errors: FieldErrors::default(),
            param_type,
            parent: None,
            children: Vec::new(),
            array_element: false,
        }
    }

    /// A `string` input whose value is an unset reference.
    pub fn input(name: impl Into<String>) -> Self {
        let mut param = Self::new(name, ParamType::String);
        param.value = Some(ValueSource::empty_ref());
        param
    }

    pub(crate) fn array_element() -> Self {
        let mut param = Self::new(ARRAY_ELEMENT_NAME, ParamType::Object);
        param.array_element = true;
        param
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn children(&self) -> &[ParamId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True for the locked element template of an `array-object`.
    pub fn is_array_element(&self) -> bool {
        self.array_element
    }
}
