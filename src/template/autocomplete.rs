use super::scanner::{current_line, match_token, path_segments};
use crate::error::TemplateError;
use crate::graph::{ReferenceEntry, lookup, path_to};
use crate::schema::{ParamType, SchemaTree, ValueSource};

/// What the autocomplete popup should show for the current cursor position.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AutocompleteState {
    #[default]
    Idle,
    Matching(TokenContext),
}

impl AutocompleteState {
    pub fn is_idle(&self) -> bool {
        matches!(self, AutocompleteState::Idle)
    }

    pub fn context(&self) -> Option<&TokenContext> {
        match self {
            AutocompleteState::Matching(ctx) => Some(ctx),
            AutocompleteState::Idle => None,
        }
    }

    pub fn candidates(&self) -> &[ReferenceEntry] {
        self.context()
            .map(|ctx| ctx.candidates.as_slice())
            .unwrap_or_default()
    }

    pub fn candidate_labels(&self) -> Vec<&str> {
        self.candidates().iter().map(|c| c.label.as_str()).collect()
    }
}

/// An open token around the cursor and the candidates it matches.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenContext {
    pub candidates: Vec<ReferenceEntry>,
    /// Token text typed before the cursor.
    pub typed: String,
    /// Part of `typed` up to and including its last `.`.
    pub prefix: String,
    /// Bytes between the token's `{{` and the cursor.
    pub left_offset: usize,
    /// Bytes between the cursor and the token's `}}`.
    pub right_offset: usize,
    pub cursor: usize,
    /// Whether the token already has its closing `}}`.
    pub closed: bool,
    /// Whole segment under the cursor, including text after the cursor.
    pub keyword: String,
    /// Part of the segment typed before the cursor; candidates are filtered by it.
    pub matching_keyword: String,
}

impl TokenContext {
    /// Byte range of the token text between the braces.
    pub fn replace_range(&self) -> std::ops::Range<usize> {
        self.cursor - self.left_offset..self.cursor + self.right_offset
    }
}

/// Computes the autocomplete state for `cursor` in `text` against `tree`, the
/// candidate roots (usually built by [`input_options`]).
///
/// Returns `Idle` when the cursor is not inside an unclosed `{{` on its line, or
/// when the typed path does not resolve and does not end with a dangling `.`.
pub fn on_cursor_move(
    text: &str,
    cursor: usize,
    tree: &[ReferenceEntry],
) -> Result<AutocompleteState, TemplateError> {
    let line = current_line(text, cursor)?;
    let Some(token) = match_token(&line) else {
        return Ok(AutocompleteState::Idle);
    };

    let typed = token.typed;
    let content = format!("{}{}", typed, token.trailing);
    let (prefix, partial) = match typed.rfind('.') {
        Some(dot) => (typed[..=dot].to_string(), typed[dot + 1..].to_string()),
        None => (String::new(), typed.clone()),
    };
    let keyword = content[prefix.len()..]
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string();

    let candidates = candidates_for(tree, &typed);
    if candidates.is_empty() && !typed.is_empty() && !typed.ends_with('.') {
        return Ok(AutocompleteState::Idle);
    }

    Ok(AutocompleteState::Matching(TokenContext {
        candidates,
        left_offset: typed.len(),
        right_offset: if token.closed { token.trailing.len() } else { 0 },
        prefix,
        typed,
        cursor,
        closed: token.closed,
        keyword,
        matching_keyword: partial,
    }))
}

/// Candidates for a typed path: the roots for an empty token, the children of the
/// last resolved level after a dangling `.`, and otherwise the entries at the
/// current level whose label starts with the partial last segment.
pub fn candidates_for(tree: &[ReferenceEntry], typed: &str) -> Vec<ReferenceEntry> {
    if typed.is_empty() {
        return tree.to_vec();
    }
    let segments = path_segments(typed);
    let Some((partial, parents)) = segments.split_last() else {
        return Vec::new();
    };
    let level: &[ReferenceEntry] = if parents.is_empty() {
        tree
    } else {
        match resolve_path(tree, parents) {
            Some(entry) => &entry.children,
            None => return Vec::new(),
        }
    };
    level
        .iter()
        .filter(|e| e.label.starts_with(partial))
        .cloned()
        .collect()
}

/// Resolves name segments level by level: the first against the roots, the rest
/// through children.
pub fn resolve_path<'a, S: AsRef<str>>(
    tree: &'a [ReferenceEntry],
    segments: &[S],
) -> Option<&'a ReferenceEntry> {
    let (first, rest) = segments.split_first()?;
    let root = tree.iter().find(|e| e.label == first.as_ref())?;
    root.find_by_path(rest)
}

/// The path inserted for `entry_id`, relative to `tree`. Array-of-object levels
/// contribute an index marker: `rows[0].score`.
pub fn path_for(tree: &[ReferenceEntry], entry_id: &str) -> Option<String> {
    let chain = path_to(tree, entry_id)?;
    let labels: Vec<String> = chain
        .iter()
        .map(|e| match e.param_type {
            Some(ParamType::ArrayObject) => format!("{}[0]", e.label),
            _ => e.label.clone(),
        })
        .collect();
    Some(labels.join("."))
}

/// Builds the candidate roots for a node's template: one entry per named input.
/// An input bound to a reference exposes the referenced output's children, so
/// `{{input.field}}` reaches into the upstream schema.
pub fn input_options(inputs: &SchemaTree, references: &[ReferenceEntry]) -> Vec<ReferenceEntry> {
    inputs
        .root_params()
        .filter(|p| !p.name.is_empty())
        .map(|param| {
            let referenced = param
                .value
                .as_ref()
                .and_then(ValueSource::as_ref_target)
                .filter(|t| !t.is_empty())
                .and_then(|t| lookup(references, &t.node_id, &t.name));
            match referenced {
                Some(entry) => ReferenceEntry {
                    id: param.id.clone(),
                    label: param.name.clone(),
                    param_type: entry.param_type,
                    node_id: entry.node_id.clone(),
                    path: param.name.clone(),
                    children: entry.children.clone(),
                },
                None => own_entry(inputs, param.id.as_str()),
            }
        })
        .collect()
}

fn own_entry(tree: &SchemaTree, id: &str) -> ReferenceEntry {
    let (label, param_type) = tree
        .get(id)
        .map(|p| (p.name.clone(), Some(p.param_type())))
        .unwrap_or_default();
    ReferenceEntry {
        id: id.to_string(),
        path: tree.reference_path(id).unwrap_or_default(),
        label,
        param_type,
        node_id: String::new(),
        children: tree
            .visible_children(id)
            .into_iter()
            .map(|child| own_entry(tree, &child.id))
            .collect(),
    }
}
