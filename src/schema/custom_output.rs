//! The retry "custom output" document: a JSON object shaped like a node's outputs,
//! returned in place of real outputs when a node fails and its error strategy asks
//! for a fallback value.

use super::{Param, ParamType, SchemaTree};
use serde_json::{Map, Value};

/// Builds a JSON object from the outputs tree, keeping values of `old` wherever the
/// structure still matches and falling back to each type's default otherwise.
pub fn generate_or_update(outputs: &SchemaTree, old: &Value) -> Value {
    build_object(outputs, outputs.root_params().collect(), old)
}

fn build_object(tree: &SchemaTree, params: Vec<&Param>, old: &Value) -> Value {
    let mut map = Map::new();
    for param in params.into_iter().filter(|p| !p.name.is_empty()) {
        let previous = old.get(&param.name).unwrap_or(&Value::Null);
        map.insert(param.name.clone(), build_value(tree, param, previous));
    }
    Value::Object(map)
}

fn build_value(tree: &SchemaTree, param: &Param, old: &Value) -> Value {
    match param.param_type() {
        ParamType::Object => build_object(tree, tree.children_of(&param.id).collect(), old),
        ParamType::ArrayObject => {
            let first = old
                .as_array()
                .and_then(|items| items.first())
                .unwrap_or(&Value::Null);
            Value::Array(vec![build_object(
                tree,
                tree.visible_children(&param.id),
                first,
            )])
        }
        other if matches_type(other, old) => old.clone(),
        other => other.default_value(),
    }
}

fn matches_type(param_type: ParamType, value: &Value) -> bool {
    match param_type {
        ParamType::String | ParamType::File => value.is_string(),
        ParamType::Integer => value.is_i64() || value.is_u64(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::ArrayString
        | ParamType::ArrayInteger
        | ParamType::ArrayNumber
        | ParamType::ArrayBoolean => value.is_array(),
        ParamType::Object | ParamType::ArrayObject => false,
    }
}

/// Removes the field at `path` (a list of names). Arrays along the way are entered
/// through their first element. Returns whether a field was removed.
pub fn delete_path<S: AsRef<str>>(json: &mut Value, path: &[S]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let mut current = json;
    for segment in parents {
        let Some(next) = enter(current).and_then(|obj| obj.get_mut(segment.as_ref())) else {
            return false;
        };
        current = next;
    }
    enter(current)
        .map(|obj| obj.remove(last.as_ref()).is_some())
        .unwrap_or(false)
}

fn enter(value: &mut Value) -> Option<&mut Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first_mut().and_then(Value::as_object_mut),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs() -> SchemaTree {
        let mut tree = SchemaTree::new();
        tree.push_root(Param::new("answer", ParamType::String));
        let rows = tree.push_root(Param::new("rows", ParamType::String));
        tree.change_type(&rows, ParamType::ArrayObject).unwrap();
        let field = tree.visible_children(&rows)[0].id.clone();
        tree.get_mut(&field).unwrap().name = "score".to_string();
        tree.retype_leaf(&field, ParamType::Number).unwrap();
        tree
    }

    #[test]
    fn keeps_matching_values_and_defaults_the_rest() {
        let old = json!({"answer": "fallback", "rows": [{"score": "bad"}], "gone": 1});
        let out = generate_or_update(&outputs(), &old);
        assert_eq!(out, json!({"answer": "fallback", "rows": [{"score": 0}]}));
    }

    #[test]
    fn delete_path_enters_first_array_element() {
        let mut doc = json!({"rows": [{"score": 1, "name": "a"}]});
        assert!(delete_path(&mut doc, &["rows", "score"]));
        assert_eq!(doc, json!({"rows": [{"name": "a"}]}));
        assert!(!delete_path(&mut doc, &["rows", "missing"]));
    }
}
