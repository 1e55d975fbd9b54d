use super::{Case, CompareOperator, Condition, LogicalOperator};
use ahash::AHashMap;
use serde_json::Value;

/// Result of selecting a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchOutcome {
    /// Id of the selected case, `None` only when the list holds no case at all.
    pub case_id: Option<String>,
    pub level: Option<u32>,
    /// Human-readable explanation of the decision.
    pub reason: String,
}

/// Picks the first case, in level order, whose conditions hold, falling back to
/// the else-case. `values` maps operand param ids to their runtime values; missing
/// operands evaluate as null.
pub fn evaluate(cases: &[Case], values: &AHashMap<String, Value>, else_level: u32) -> BranchOutcome {
    let mut ordered: Vec<&Case> = cases.iter().filter(|c| !c.is_else(else_level)).collect();
    ordered.sort_by_key(|c| c.level);

    for case in ordered {
        let results: Vec<(bool, String)> = case
            .conditions
            .iter()
            .map(|c| evaluate_condition(c, values))
            .collect();
        let passed = match case.logical_operator {
            LogicalOperator::And => results.iter().all(|(ok, _)| *ok),
            LogicalOperator::Or => results.iter().any(|(ok, _)| *ok),
        };
        if passed && !results.is_empty() {
            let joiner = format!(" {} ", case.logical_operator);
            let reason = results
                .iter()
                .filter(|(ok, _)| *ok)
                .map(|(_, text)| text.as_str())
                .collect::<Vec<_>>()
                .join(&joiner);
            return BranchOutcome {
                case_id: Some(case.id.clone()),
                level: Some(case.level),
                reason,
            };
        }
    }

    match cases.iter().find(|c| c.is_else(else_level)) {
        Some(fallback) => BranchOutcome {
            case_id: Some(fallback.id.clone()),
            level: Some(fallback.level),
            reason: "no case matched, took the else branch".to_string(),
        },
        None => BranchOutcome {
            case_id: None,
            level: None,
            reason: "no case matched".to_string(),
        },
    }
}

fn evaluate_condition(condition: &Condition, values: &AHashMap<String, Value>) -> (bool, String) {
    let left = values
        .get(&condition.left_var_index)
        .unwrap_or(&Value::Null);
    let right = values
        .get(&condition.right_var_index)
        .unwrap_or(&Value::Null);
    let Some(op) = condition.compare_operator else {
        return (false, "no compare operator".to_string());
    };
    let ok = compare(op, left, right);
    let text = if op.is_unary() {
        format!("{} (was {}) {}", condition.left_var_index, left, op.symbol())
    } else {
        format!(
            "{} (was {}) {} {}",
            condition.left_var_index,
            left,
            op.symbol(),
            right
        )
    };
    (ok, text)
}

/// Applies one compare operator with the workflow runtime's loose typing: numbers
/// compare against numeric text, strings and arrays support containment.
pub fn compare(op: CompareOperator, actual: &Value, expected: &Value) -> bool {
    match op {
        CompareOperator::Null => actual.is_null(),
        CompareOperator::NotNull => !actual.is_null(),
        CompareOperator::Empty => is_empty(actual),
        CompareOperator::NotEmpty => !is_empty(actual),
        CompareOperator::Contains => contains(actual, expected).unwrap_or(false),
        CompareOperator::NotContains => contains(actual, expected).map(|c| !c).unwrap_or(false),
        CompareOperator::StartWith => match (actual.as_str(), as_text(expected)) {
            (Some(a), Some(e)) if !a.is_empty() => a.starts_with(&e),
            _ => false,
        },
        CompareOperator::EndWith => match (actual.as_str(), as_text(expected)) {
            (Some(a), Some(e)) if !a.is_empty() => a.ends_with(&e),
            _ => false,
        },
        CompareOperator::Is | CompareOperator::Eq => equals(actual, expected).unwrap_or(false),
        CompareOperator::IsNot | CompareOperator::Ne => {
            equals(actual, expected).map(|e| !e).unwrap_or(false)
        }
        CompareOperator::Gt => ordering(actual, expected).is_some_and(|o| o.is_gt()),
        CompareOperator::Ge => ordering(actual, expected).is_some_and(|o| o.is_ge()),
        CompareOperator::Lt => ordering(actual, expected).is_some_and(|o| o.is_lt()),
        CompareOperator::Le => ordering(actual, expected).is_some_and(|o| o.is_le()),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Null => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `None` when the actual value has a type containment is undefined for.
fn contains(actual: &Value, expected: &Value) -> Option<bool> {
    let needle = as_text(expected).unwrap_or_default();
    match actual {
        Value::String(s) if s.is_empty() => Some(needle.is_empty()),
        Value::String(s) => Some(s.contains(&needle)),
        Value::Array(items) if items.is_empty() => Some(false),
        Value::Array(items) => Some(
            items
                .iter()
                .any(|item| item == expected || as_text(item).as_deref() == Some(needle.as_str())),
        ),
        Value::Null => Some(false),
        _ => None,
    }
}

fn equals(actual: &Value, expected: &Value) -> Option<bool> {
    match actual {
        Value::Null => None,
        Value::Number(_) => Some(as_number(actual) == as_number(expected)),
        Value::String(s) => Some(as_text(expected).is_some_and(|e| *s == e)),
        Value::Bool(b) => {
            let expected = expected
                .as_bool()
                .or_else(|| as_text(expected).and_then(|t| t.parse().ok()));
            Some(expected == Some(*b))
        }
        _ => None,
    }
}

fn ordering(actual: &Value, expected: &Value) -> Option<std::cmp::Ordering> {
    let Value::Number(_) = actual else {
        return None;
    };
    as_number(actual)?.partial_cmp(&as_number(expected)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_operators_parse_literal_text() {
        assert!(compare(CompareOperator::Gt, &json!(5), &json!("3")));
        assert!(!compare(CompareOperator::Gt, &json!("5"), &json!("3")));
        assert!(compare(CompareOperator::Eq, &json!(2.0), &json!("2")));
        assert!(!compare(CompareOperator::Lt, &json!(1), &json!("abc")));
    }

    #[test]
    fn empty_depends_on_value_type() {
        assert!(compare(CompareOperator::Empty, &json!("  "), &Value::Null));
        assert!(compare(CompareOperator::Empty, &json!([]), &Value::Null));
        assert!(compare(CompareOperator::Empty, &json!(0), &Value::Null));
        assert!(!compare(CompareOperator::Empty, &Value::Null, &Value::Null));
        assert!(compare(CompareOperator::NotEmpty, &json!({"a": 1}), &Value::Null));
    }

    #[test]
    fn containment_on_strings_and_arrays() {
        assert!(compare(CompareOperator::Contains, &json!("hello world"), &json!("world")));
        assert!(compare(CompareOperator::Contains, &json!(["a", "b"]), &json!("b")));
        assert!(compare(CompareOperator::NotContains, &Value::Null, &json!("x")));
        assert!(compare(CompareOperator::NotContains, &json!("abc"), &json!("x")));
    }
}
