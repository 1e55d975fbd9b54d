use super::{Edge, Node, NodeParam, RetryConfig, WorkflowGraph};
use crate::branch::Case;
use crate::error::ConversionError;
use crate::schema::{Param, ParamType, RefTarget, SchemaTree, ValueSource};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// A trait for workflow documents that can be loaded into a [`WorkflowGraph`].
///
/// [`UiWorkflow`], the console's own document shape, implements it. Other formats
/// provide their own translation by implementing it on their top-level type.
///
/// # Example
///
/// ```rust
/// use flowref::prelude::*;
/// use flowref::error::ConversionError;
///
/// struct Pipeline { steps: Vec<String> }
///
/// impl IntoWorkflow for Pipeline {
///     fn into_workflow(self) -> std::result::Result<WorkflowGraph, ConversionError> {
///         let nodes: Vec<Node> = self
///             .steps
///             .iter()
///             .map(|step| Node::new(step.as_str(), "code", step.as_str()))
///             .collect();
///         let edges = self
///             .steps
///             .windows(2)
///             .map(|pair| Edge::new(pair[0].as_str(), pair[1].as_str()))
///             .collect();
///         Ok(WorkflowGraph::new(nodes, edges))
///     }
/// }
///
/// let graph = Pipeline { steps: vec!["a".into(), "b".into()] }.into_workflow().unwrap();
/// assert_eq!(graph.parent_nodes("b").len(), 1);
/// ```
pub trait IntoWorkflow {
    /// Consumes the document and builds the in-memory graph.
    fn into_workflow(self) -> Result<WorkflowGraph, ConversionError>;
}

/// Complete console workflow document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiWorkflow {
    #[serde(default)]
    pub nodes: Vec<UiNode>,
    #[serde(default)]
    pub edges: Vec<UiEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiNode {
    pub id: String,
    /// Functional node type (`iteration`, `node-start`, `if-else`, ...).
    #[serde(rename = "nodeType", default, skip_serializing_if = "String::is_empty")]
    pub node_type: String,
    /// Canvas renderer type. The console writes `custom` here; older documents put
    /// the functional type here and omit `nodeType`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub data: UiNodeData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub inputs: Vec<UiParam>,
    #[serde(default)]
    pub outputs: Vec<UiParam>,
    #[serde(rename = "nodeParam", default)]
    pub node_param: Map<String, Value>,
    #[serde(rename = "retryConfig", default, skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
}

/// A param as the console stores it. Top-level params wrap their type, default and
/// value in `schema`; nested properties carry them inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiParam {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<UiSchema>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<UiParam>>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "nameErrMsg", default, skip_serializing_if = "Option::is_none")]
    pub name_err_msg: Option<String>,
    #[serde(rename = "descriptionErrMsg", default, skip_serializing_if = "Option::is_none")]
    pub description_err_msg: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiSchema {
    #[serde(rename = "type", default)]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<UiValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<UiParam>>,
}

/// `{type: "ref" | "literal", content}`. Ref content is `{nodeId, name, id?}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiValue {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: Value,
    #[serde(rename = "contentErrMsg", default, skip_serializing_if = "Option::is_none")]
    pub content_err_msg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(rename = "targetHandle", default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl UiWorkflow {
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConversionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Exports a graph back into the console shape, including the current
    /// validation messages.
    pub fn from_graph(graph: &WorkflowGraph) -> Self {
        Self {
            nodes: graph.nodes().iter().map(export_node).collect(),
            edges: graph
                .edges()
                .iter()
                .map(|e| UiEdge {
                    id: None,
                    source: e.source.clone(),
                    target: e.target.clone(),
                    source_handle: e.source_handle.clone(),
                    target_handle: e.target_handle.clone(),
                })
                .collect(),
        }
    }
}

impl IntoWorkflow for UiWorkflow {
    fn into_workflow(self) -> Result<WorkflowGraph, ConversionError> {
        let mut node_ids = AHashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for ui_node in self.nodes {
            if !node_ids.insert(ui_node.id.clone()) {
                return Err(ConversionError::DuplicateId {
                    kind: "node",
                    id: ui_node.id,
                });
            }
            nodes.push(import_node(ui_node)?);
        }

        let mut edges = Vec::with_capacity(self.edges.len());
        for ui_edge in self.edges {
            for end in [&ui_edge.source, &ui_edge.target] {
                if !node_ids.contains(end) {
                    return Err(ConversionError::ValidationError(format!(
                        "Edge references unknown node '{}'",
                        end
                    )));
                }
            }
            edges.push(Edge {
                source: ui_edge.source,
                target: ui_edge.target,
                source_handle: ui_edge.source_handle,
                target_handle: ui_edge.target_handle,
            });
        }
        Ok(WorkflowGraph::new(nodes, edges))
    }
}

fn import_node(ui: UiNode) -> Result<Node, ConversionError> {
    let mut seen = AHashSet::new();
    let node_type = if ui.node_type.is_empty() {
        ui.kind.unwrap_or_default()
    } else {
        ui.node_type
    };
    let mut node = Node::new(ui.id, node_type, ui.data.label);
    node.parent_id = ui.data.parent_id.or(ui.parent_id);
    node.inputs = import_tree(&ui.data.inputs, &mut seen)?;
    node.outputs = import_tree(&ui.data.outputs, &mut seen)?;
    node.node_param = import_node_param(ui.data.node_param)?;
    node.retry_config = ui.data.retry_config;
    Ok(node)
}

fn import_node_param(mut map: Map<String, Value>) -> Result<NodeParam, ConversionError> {
    let cases = match map.remove("cases") {
        Some(value) => Some(serde_json::from_value::<Vec<Case>>(value)?),
        None => None,
    };
    let template = map
        .remove("template")
        .and_then(|v| v.as_str().map(str::to_string));
    map.remove("templateErrMsg");
    Ok(NodeParam {
        cases,
        template,
        template_err_msg: None,
        extra: map,
    })
}

fn import_tree(params: &[UiParam], seen: &mut AHashSet<String>) -> Result<SchemaTree, ConversionError> {
    let mut tree = SchemaTree::new();
    for ui in params {
        import_param(&mut tree, None, ui, seen)?;
    }
    tree.take_dirty();
    Ok(tree)
}

fn import_param(
    tree: &mut SchemaTree,
    parent: Option<&str>,
    ui: &UiParam,
    seen: &mut AHashSet<String>,
) -> Result<(), ConversionError> {
    if !seen.insert(ui.id.clone()) {
        return Err(ConversionError::DuplicateId {
            kind: "param",
            id: ui.id.clone(),
        });
    }
    let schema = ui.schema.as_ref();
    let type_name = schema
        .map(|s| s.param_type.as_str())
        .or(ui.param_type.as_deref())
        .unwrap_or_default();
    // Freshly added iteration inputs carry an empty type until a reference is bound.
    let param_type = if type_name.is_empty() {
        ParamType::String
    } else {
        ParamType::from_str(type_name)?
    };

    let mut param = Param::with_id(ui.id.as_str(), ui.name.as_str(), param_type);
    if let Some(default) = schema.and_then(|s| s.default.clone()).or_else(|| ui.default.clone()) {
        param.default = default;
    }
    param.required = ui.required;
    param.description = schema
        .and_then(|s| s.description.clone())
        .or_else(|| ui.description.clone());
    param.value = schema.and_then(|s| s.value.as_ref()).map(import_value);

    let id = match parent {
        None => tree.push_root(param),
        Some(parent_id) => tree.push_child(parent_id, param).ok_or_else(|| {
            ConversionError::ValidationError(format!("Parent param '{}' not found", parent_id))
        })?,
    };

    let holder = match param_type {
        ParamType::ArrayObject => tree.ensure_element(&id),
        ParamType::Object => Some(id.clone()),
        _ => None,
    };
    let properties = schema
        .and_then(|s| s.properties.as_ref())
        .or(ui.properties.as_ref());
    if let (Some(holder), Some(properties)) = (holder, properties) {
        for child in properties {
            import_param(tree, Some(&holder), child, seen)?;
        }
    }
    Ok(())
}

fn import_value(ui: &UiValue) -> ValueSource {
    if ui.kind == "literal" {
        let text = match &ui.content {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ValueSource::Literal(text)
    } else {
        let target = serde_json::from_value::<RefTarget>(ui.content.clone()).unwrap_or_default();
        ValueSource::Ref(target)
    }
}

fn export_node(node: &Node) -> UiNode {
    let mut node_param = node.node_param.extra.clone();
    if let Some(cases) = &node.node_param.cases
        && let Ok(value) = serde_json::to_value(cases)
    {
        node_param.insert("cases".to_string(), value);
    }
    if let Some(template) = &node.node_param.template {
        node_param.insert("template".to_string(), Value::String(template.clone()));
    }
    if let Some(msg) = &node.node_param.template_err_msg {
        node_param.insert("templateErrMsg".to_string(), Value::String(msg.clone()));
    }
    UiNode {
        id: node.id.clone(),
        node_type: node.node_type.clone(),
        kind: Some("custom".to_string()),
        parent_id: None,
        data: UiNodeData {
            label: node.label.clone(),
            parent_id: node.parent_id.clone(),
            inputs: export_tree(&node.inputs),
            outputs: export_tree(&node.outputs),
            node_param,
            retry_config: node.retry_config.clone(),
        },
    }
}

fn export_tree(tree: &SchemaTree) -> Vec<UiParam> {
    tree.root_params().map(|p| export_param(tree, p, true)).collect()
}

fn export_param(tree: &SchemaTree, param: &Param, is_root: bool) -> UiParam {
    let children: Vec<UiParam> = tree
        .visible_children(&param.id)
        .into_iter()
        .map(|child| export_param(tree, child, false))
        .collect();
    let properties = param.param_type().is_container().then_some(children);
    let default = (!param.default.is_null()).then(|| param.default.clone());
    let mut ui = UiParam {
        id: param.id.clone(),
        name: param.name.clone(),
        required: param.required,
        name_err_msg: param.errors.name.clone(),
        description_err_msg: param.errors.description.clone(),
        ..UiParam::default()
    };
    if is_root {
        ui.schema = Some(UiSchema {
            param_type: param.param_type().to_string(),
            default,
            value: param.value.as_ref().map(|v| export_value(v, param.errors.content.clone())),
            description: param.description.clone(),
            properties,
        });
    } else {
        ui.param_type = Some(param.param_type().to_string());
        ui.default = default;
        ui.description = param.description.clone();
        ui.properties = properties;
    }
    ui
}

fn export_value(value: &ValueSource, content_err_msg: Option<String>) -> UiValue {
    let (kind, content) = match value {
        ValueSource::Literal(text) => ("literal", Value::String(text.clone())),
        ValueSource::Ref(target) => (
            "ref",
            serde_json::to_value(target).unwrap_or_else(|_| Value::Object(Map::new())),
        ),
    };
    UiValue {
        kind: kind.to_string(),
        content,
        content_err_msg,
    }
}
