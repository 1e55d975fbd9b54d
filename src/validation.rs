//! Field-level validation of nodes.
//!
//! Problems are recorded on the field they concern (`Param::errors`, the `*_err_msg`
//! fields of conditions, templates and retry settings) and never returned as errors.
//! A node is publishable when no such message remains.

use crate::config::EngineConfig;
use crate::graph::{Node, ReferenceEntry, lookup};
use crate::schema::naming::{EMPTY_NAME_MSG, validate_names};
use crate::schema::{ParamId, SchemaTree, ValueSource};
use crate::template::{input_options, validate_tokens};
use ahash::AHashSet;
use tracing::{trace, warn};

pub const EMPTY_VALUE_MSG: &str = EMPTY_NAME_MSG;
pub const REFERENCE_MISSING_MSG: &str = "reference missing";
pub const ITERATION_ARRAY_MSG: &str = "iteration input must reference an array";
pub const INVALID_JSON_MSG: &str = "value must be valid JSON";

/// Re-validates every field of `node` against the references visible to it and
/// returns whether the node is publishable.
pub fn validate_node(node: &mut Node, references: &[ReferenceEntry], config: &EngineConfig) -> bool {
    validate_names(&mut node.inputs);
    validate_names(&mut node.outputs);

    let operands = operand_ids(node);
    let exempt = exempt_operands(node);
    let is_iteration = node.is_iteration(config);
    validate_input_values(&mut node.inputs, references, &operands, &exempt, is_iteration);

    let needs_description = config
        .described_output_node_types
        .iter()
        .any(|t| *t == node.node_type);
    for param in node.outputs.params_mut() {
        let undocumented = param.description.as_deref().is_none_or(|d| d.trim().is_empty())
            && is_blank(&param.default);
        param.errors.description = (needs_description && !param.is_array_element() && undocumented)
            .then(|| EMPTY_VALUE_MSG.to_string());
    }

    validate_conditions(node);
    validate_template(node, references, config);
    validate_retry(node);

    let publishable = is_publishable(node);
    trace!(node_id = %node.id, publishable, "validated node");
    publishable
}

/// True when no field of the node carries a validation message.
pub fn is_publishable(node: &Node) -> bool {
    let params_ok = node
        .inputs
        .walk()
        .into_iter()
        .chain(node.outputs.walk())
        .all(|p| p.errors.is_empty());
    let conditions_ok = node.node_param.cases.iter().flatten().all(|case| {
        case.conditions
            .iter()
            .all(|c| c.compare_operator_err_msg.is_none() && c.operand_err_msg.is_none())
    });
    let retry_ok = node
        .retry_config
        .as_ref()
        .is_none_or(|r| r.custom_output_err_msg.is_none());
    params_ok && conditions_ok && retry_ok && node.node_param.template_err_msg.is_none()
}

fn operand_ids(node: &Node) -> AHashSet<ParamId> {
    node.node_param
        .cases
        .iter()
        .flatten()
        .flat_map(|case| case.operand_ids())
        .collect()
}

/// Right operands of unary conditions are never edited and never validated.
fn exempt_operands(node: &Node) -> AHashSet<ParamId> {
    node.node_param
        .cases
        .iter()
        .flatten()
        .flat_map(|case| case.conditions.iter())
        .filter(|c| c.is_unary())
        .map(|c| c.right_var_index.clone())
        .collect()
}

fn validate_input_values(
    inputs: &mut SchemaTree,
    references: &[ReferenceEntry],
    operands: &AHashSet<ParamId>,
    exempt: &AHashSet<ParamId>,
    is_iteration: bool,
) {
    for param in inputs.params_mut() {
        if exempt.contains(&param.id) {
            param.errors.content = None;
            continue;
        }
        let message = match param.value.as_ref() {
            None => None,
            Some(ValueSource::Ref(target)) if target.is_empty() => Some(EMPTY_VALUE_MSG),
            Some(ValueSource::Ref(target)) => match lookup(references, &target.node_id, &target.name) {
                None => {
                    warn!(
                        param_id = %param.id,
                        source_node_id = %target.node_id,
                        path = %target.name,
                        "dangling reference"
                    );
                    Some(REFERENCE_MISSING_MSG)
                }
                Some(entry) if is_iteration && !entry.param_type.is_some_and(|t| t.is_array()) => {
                    Some(ITERATION_ARRAY_MSG)
                }
                Some(_) => None,
            },
            Some(ValueSource::Literal(text)) => {
                let must_fill = param.required || operands.contains(&param.id);
                (must_fill && text.trim().is_empty()).then_some(EMPTY_VALUE_MSG)
            }
        };
        param.errors.content = message.map(str::to_string);
    }
}

fn validate_conditions(node: &mut Node) {
    let Some(cases) = node.node_param.cases.as_mut() else {
        return;
    };
    for condition in cases.iter_mut().flat_map(|c| c.conditions.iter_mut()) {
        condition.compare_operator_err_msg = condition
            .compare_operator
            .is_none()
            .then(|| EMPTY_VALUE_MSG.to_string());
        let missing = !node.inputs.contains(&condition.left_var_index)
            || (!condition.is_unary() && !node.inputs.contains(&condition.right_var_index));
        condition.operand_err_msg = missing.then(|| REFERENCE_MISSING_MSG.to_string());
    }
}

fn validate_template(node: &mut Node, references: &[ReferenceEntry], config: &EngineConfig) {
    let required = config
        .template_required_node_types
        .iter()
        .any(|t| *t == node.node_type);
    let message = match node.node_param.template.as_deref() {
        Some(text) if !text.trim().is_empty() => {
            let options = input_options(&node.inputs, references);
            let unresolved = validate_tokens(text, &options);
            (!unresolved.is_empty()).then(|| {
                let listed: Vec<String> = unresolved.iter().map(|p| format!("{{{{{}}}}}", p)).collect();
                format!("unresolved variables: {}", listed.join(", "))
            })
        }
        _ if required => Some(EMPTY_VALUE_MSG.to_string()),
        _ => None,
    };
    node.node_param.template_err_msg = message;
}

fn validate_retry(node: &mut Node) {
    let Some(retry) = node.retry_config.as_mut() else {
        return;
    };
    retry.custom_output_err_msg = if retry.error_strategy != 1 {
        None
    } else if retry.custom_output.trim().is_empty() {
        Some(EMPTY_VALUE_MSG.to_string())
    } else if serde_json::from_str::<serde_json::Value>(&retry.custom_output).is_err() {
        Some(INVALID_JSON_MSG.to_string())
    } else {
        None
    };
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
