use super::NodeId;
use crate::schema::ParamType;
use serde::Serialize;
use std::fmt;

/// A read-only projection of an ancestor's outputs, used to populate pickers.
///
/// Root entries stand for a whole ancestor node: they carry the node label, the node
/// id as `id`, no type and an empty `path`. Every other entry maps back to one output
/// param through `node_id` and its dotted `path` (e.g. `rows[0].score`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParamType>,
    pub node_id: NodeId,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReferenceEntry>,
}

impl ReferenceEntry {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_node_root(&self) -> bool {
        self.param_type.is_none()
    }

    /// Resolves a name path below this entry, one child label per segment.
    pub fn find_by_path<S: AsRef<str>>(&self, segments: &[S]) -> Option<&ReferenceEntry> {
        segments.iter().try_fold(self, |entry, segment| {
            entry.children.iter().find(|c| c.label == segment.as_ref())
        })
    }

    /// Finds the entry whose referenced path equals `path`.
    pub fn find_by_reference_path(&self, path: &str) -> Option<&ReferenceEntry> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|c| c.find_by_reference_path(path))
    }

    pub fn find(&self, id: &str) -> Option<&ReferenceEntry> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Depth-first search for an entry id across a forest.
pub fn find_entry<'a>(entries: &'a [ReferenceEntry], id: &str) -> Option<&'a ReferenceEntry> {
    entries.iter().find_map(|e| e.find(id))
}

/// Finds the output at reference `path` under the root entry of `node_id`.
pub fn lookup<'a>(entries: &'a [ReferenceEntry], node_id: &str, path: &str) -> Option<&'a ReferenceEntry> {
    entries
        .iter()
        .find(|root| root.node_id == node_id)?
        .children
        .iter()
        .find_map(|c| c.find_by_reference_path(path))
}

/// The chain of entries from a root down to the entry with `id`, inclusive.
pub fn path_to<'a>(entries: &'a [ReferenceEntry], id: &str) -> Option<Vec<&'a ReferenceEntry>> {
    for entry in entries {
        if entry.id == id {
            return Some(vec![entry]);
        }
        if let Some(mut chain) = path_to(&entry.children, id) {
            chain.insert(0, entry);
            return Some(chain);
        }
    }
    None
}

/// Renders a reference forest as an indented tree.
pub struct DisplayReferences<'a>(pub &'a [ReferenceEntry]);

impl fmt::Display for DisplayReferences<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "(no references)");
        }
        for entry in self.0 {
            writeln!(f, "{} [{}]", entry.label, entry.node_id)?;
            fmt_children(&entry.children, f, "")?;
        }
        Ok(())
    }
}

fn fmt_children(entries: &[ReferenceEntry], f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
    for (i, entry) in entries.iter().enumerate() {
        let is_last = i + 1 == entries.len();
        let marker = if is_last { "└── " } else { "├── " };
        let type_name = entry
            .param_type
            .map(|t| t.display_name())
            .unwrap_or_default();
        writeln!(f, "{}{}{}: {}", prefix, marker, entry.label, type_name)?;
        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        fmt_children(&entry.children, f, &child_prefix)?;
    }
    Ok(())
}
