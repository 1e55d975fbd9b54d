use super::{ParamId, SchemaTree};
use ahash::{AHashMap, AHashSet};
use regex::Regex;
use std::sync::LazyLock;

pub const EMPTY_NAME_MSG: &str = "value cannot be empty";
pub const INVALID_ROOT_NAME_MSG: &str = "can only contain letters numbers hyphens or underscores";
pub const INVALID_NESTED_NAME_MSG: &str =
    "must start with a letter or underscore and contain only letters numbers or underscores";
pub const DUPLICATE_NAME_MSG: &str = "value cannot be repeated";

static ROOT_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid root name regex"));
static NESTED_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid nested name regex"));

/// Checks the format of a single name. Top-level names are looser than nested
/// object fields, which must be valid identifiers.
pub fn name_error(name: &str, is_root: bool) -> Option<&'static str> {
    if name.trim().is_empty() {
        return Some(EMPTY_NAME_MSG);
    }
    if is_root {
        (!ROOT_NAME_REGEX.is_match(name)).then_some(INVALID_ROOT_NAME_MSG)
    } else {
        (!NESTED_NAME_REGEX.is_match(name)).then_some(INVALID_NESTED_NAME_MSG)
    }
}

/// Sets `errors.name` on every param of the tree and returns how many are invalid.
pub fn validate_names(tree: &mut SchemaTree) -> usize {
    let mut found: AHashMap<ParamId, &'static str> = AHashMap::new();
    let mut visited_groups: AHashSet<Option<String>> = AHashSet::new();

    for param in tree.walk() {
        if param.is_array_element() {
            continue;
        }
        let is_root = tree.depth(&param.id) == 0;
        if let Some(msg) = name_error(&param.name, is_root) {
            found.insert(param.id.clone(), msg);
            continue;
        }

        // Duplicates are checked once per sibling group.
        let group = param.parent().map(str::to_string);
        if !visited_groups.insert(group) {
            continue;
        }
        let mut seen: AHashMap<&str, usize> = AHashMap::new();
        let siblings = tree.siblings_of(&param.id);
        for sibling in siblings.iter().filter_map(|id| tree.get(id)) {
            *seen.entry(sibling.name.as_str()).or_default() += 1;
        }
        for sibling in siblings.iter().filter_map(|id| tree.get(id)) {
            if seen.get(sibling.name.as_str()).copied().unwrap_or(0) > 1
                && name_error(&sibling.name, is_root).is_none()
            {
                found.insert(sibling.id.clone(), DUPLICATE_NAME_MSG);
            }
        }
    }

    for param in tree.params_mut() {
        param.errors.name = found.get(&param.id).map(|msg| msg.to_string());
    }
    found.len()
}
