use super::{Param, ParamId, ParamType};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use tracing::debug;

/// Structural failures of a tree operation. The store maps these onto `StoreError`
/// with the owning node id attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TreeError {
    NotFound(ParamId),
    NotAContainer(ParamId),
    ArrayElementLocked(ParamId),
}

/// An arena of params addressed by id, with parent and children links stored as id lists.
///
/// Roots keep their insertion order, which is the display order of a node's inputs or
/// outputs. Every mutated param id lands in the dirty set until it is drained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaTree {
    params: AHashMap<ParamId, Param>,
    roots: Vec<ParamId>,
    dirty: AHashSet<ParamId>,
}

impl SchemaTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.params.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Param> {
        self.params.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Param> {
        let param = self.params.get_mut(id)?;
        self.dirty.insert(param.id.clone());
        Some(param)
    }

    /// Mutable access to every param without marking anything dirty. Used for
    /// validation state, which is not a structural change.
    pub(crate) fn params_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.params.values_mut()
    }

    pub fn roots(&self) -> &[ParamId] {
        &self.roots
    }

    pub fn root_params(&self) -> impl Iterator<Item = &Param> {
        self.roots.iter().filter_map(|id| self.params.get(id))
    }

    /// Position of a root param in display order.
    pub fn root_position(&self, id: &str) -> Option<usize> {
        self.roots.iter().position(|r| r == id)
    }

    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &Param> {
        self.params
            .get(id)
            .map(|p| p.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|c| self.params.get(c))
    }

    /// Children as seen by a user: an `array-object` exposes the fields of its element.
    pub fn visible_children(&self, id: &str) -> Vec<&Param> {
        match self.element_of(id) {
            Some(element) => self.children_of(&element.id).collect(),
            None => self.children_of(id).collect(),
        }
    }

    /// The locked element template of an `array-object` param.
    pub fn element_of(&self, id: &str) -> Option<&Param> {
        let param = self.params.get(id)?;
        if param.param_type != ParamType::ArrayObject {
            return None;
        }
        self.children_of(id).find(|c| c.array_element)
    }

    /// Ids sharing a parent with `id` (including `id` itself).
    pub fn siblings_of(&self, id: &str) -> &[ParamId] {
        match self.params.get(id).and_then(|p| p.parent.as_deref()) {
            Some(parent) => self
                .params
                .get(parent)
                .map(|p| p.children.as_slice())
                .unwrap_or_default(),
            None => &self.roots,
        }
    }

    /// Nesting depth, counting only user-visible levels (roots are depth 0).
    pub fn depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut current = self.params.get(id).and_then(|p| p.parent.clone());
        while let Some(parent_id) = current {
            let Some(parent) = self.params.get(&parent_id) else {
                break;
            };
            if !parent.array_element {
                depth += 1;
            }
            current = parent.parent.clone();
        }
        depth
    }

    /// Pre-order walk over every param in the tree.
    pub fn walk(&self) -> Vec<&Param> {
        let mut out = Vec::with_capacity(self.params.len());
        let mut stack: Vec<&ParamId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if let Some(param) = self.params.get(id) {
                out.push(param);
                stack.extend(param.children.iter().rev());
            }
        }
        out
    }

    /// Ids of `id` and all its descendants, pre-order.
    pub fn subtree_ids(&self, id: &str) -> Vec<ParamId> {
        let mut out = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(param) = self.params.get(&current) {
                stack.extend(param.children.iter().rev().cloned());
                out.push(current);
            }
        }
        out
    }

    /// Names from the root down to `id`, skipping array element templates.
    pub fn path_of(&self, id: &str) -> Option<Vec<String>> {
        let mut names = Vec::new();
        let mut current = Some(self.params.get(id)?);
        while let Some(param) = current {
            if !param.array_element {
                names.push(param.name.clone());
            }
            current = param.parent.as_deref().and_then(|p| self.params.get(p));
        }
        names.reverse();
        Some(names)
    }

    /// Dotted reference path of `id`; array containers contribute an `[0]` index segment.
    pub fn reference_path(&self, id: &str) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = Some(self.params.get(id)?);
        let mut child_is_element = false;
        while let Some(param) = current {
            if !param.array_element {
                if param.param_type == ParamType::ArrayObject && child_is_element {
                    segments.push(format!("{}[0]", param.name));
                } else {
                    segments.push(param.name.clone());
                }
            }
            child_is_element = param.array_element;
            current = param.parent.as_deref().and_then(|p| self.params.get(p));
        }
        Some(segments.iter().rev().join("."))
    }

    /// Finds a param by its name path, descending transparently through array elements.
    pub fn find_by_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Param> {
        let (first, rest) = path.split_first()?;
        let mut current = self.root_params().find(|p| p.name == first.as_ref())?;
        for segment in rest {
            current = self
                .visible_children(&current.id)
                .into_iter()
                .find(|c| c.name == segment.as_ref())?;
        }
        Some(current)
    }

    /// Finds a param by its reference path (`rows[0].score`), ignoring index markers.
    pub fn find_by_reference_path(&self, path: &str) -> Option<&Param> {
        let segments: Vec<&str> = path.split('.').map(strip_index).collect();
        self.find_by_path(&segments)
    }

    pub(crate) fn push_root(&mut self, mut param: Param) -> ParamId {
        let id = param.id.clone();
        param.parent = None;
        self.roots.push(id.clone());
        self.dirty.insert(id.clone());
        self.params.insert(id.clone(), param);
        id
    }

    /// Links `param` under `parent_id` without any container checks.
    pub(crate) fn push_child(&mut self, parent_id: &str, mut param: Param) -> Option<ParamId> {
        let parent = self.params.get_mut(parent_id)?;
        let id = param.id.clone();
        parent.children.push(id.clone());
        param.parent = Some(parent_id.to_string());
        self.dirty.insert(id.clone());
        self.dirty.insert(parent_id.to_string());
        self.params.insert(id.clone(), param);
        Some(id)
    }

    /// Returns the element template of an `array-object`, creating it when missing.
    pub(crate) fn ensure_element(&mut self, array_id: &str) -> Option<ParamId> {
        if let Some(element) = self.element_of(array_id) {
            return Some(element.id.clone());
        }
        self.push_child(array_id, Param::array_element())
    }

    /// Adds an empty `string` child under a container param.
    pub(crate) fn add_child(&mut self, parent_id: &str) -> Result<ParamId, TreeError> {
        let parent = self
            .params
            .get(parent_id)
            .ok_or_else(|| TreeError::NotFound(parent_id.to_string()))?;
        let holder = match parent.param_type {
            ParamType::Object => parent_id.to_string(),
            ParamType::ArrayObject => self
                .ensure_element(parent_id)
                .ok_or_else(|| TreeError::NotFound(parent_id.to_string()))?,
            _ => return Err(TreeError::NotAContainer(parent_id.to_string())),
        };
        let child = Param::new("", ParamType::String);
        self.push_child(&holder, child)
            .ok_or_else(|| TreeError::NotFound(holder.clone()))
    }

    /// Removes `id` with its whole subtree and returns the removed params, pre-order.
    pub(crate) fn remove(&mut self, id: &str) -> Result<Vec<Param>, TreeError> {
        let param = self
            .params
            .get(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
        if param.array_element {
            return Err(TreeError::ArrayElementLocked(id.to_string()));
        }
        match param.parent.clone() {
            Some(parent_id) => {
                if let Some(parent) = self.params.get_mut(&parent_id) {
                    parent.children.retain(|c| c != id);
                }
                self.dirty.insert(parent_id);
            }
            None => self.roots.retain(|r| r != id),
        }
        let removed = self.drop_subtree(id);
        debug!(param_id = id, removed = removed.len(), "removed schema subtree");
        Ok(removed)
    }

    fn drop_subtree(&mut self, id: &str) -> Vec<Param> {
        self.subtree_ids(id)
            .into_iter()
            .filter_map(|pid| {
                self.dirty.remove(&pid);
                self.params.remove(&pid)
            })
            .collect()
    }

    /// Changes the type of `id`, rebuilding its children.
    ///
    /// Becoming a container discards the default and seeds one placeholder child;
    /// becoming a scalar drops all children and regenerates the type default.
    /// Returns `false` when the param already has `new_type`.
    pub(crate) fn change_type(&mut self, id: &str, new_type: ParamType) -> Result<bool, TreeError> {
        let param = self
            .params
            .get(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
        if param.array_element {
            return Err(TreeError::ArrayElementLocked(id.to_string()));
        }
        if param.param_type == new_type {
            return Ok(false);
        }

        let children = param.children.clone();
        for child in &children {
            self.drop_subtree(child);
        }
        if let Some(param) = self.params.get_mut(id) {
            param.children.clear();
            param.param_type = new_type;
            param.default = new_type.default_value();
        }
        self.dirty.insert(id.to_string());

        match new_type {
            ParamType::Object => {
                self.push_child(id, Param::new("", ParamType::String));
            }
            ParamType::ArrayObject => {
                if let Some(element) = self.ensure_element(id) {
                    self.push_child(&element, Param::new("", ParamType::String));
                }
            }
            _ => {}
        }
        debug!(param_id = id, new_type = %new_type, "changed param type");
        Ok(true)
    }

    /// Sets the type of a param that mirrors a referenced value. Children are dropped
    /// and nothing is seeded, since such a param only describes what it points at.
    pub(crate) fn retype_leaf(&mut self, id: &str, new_type: ParamType) -> Result<(), TreeError> {
        let children = self
            .params
            .get(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?
            .children
            .clone();
        for child in &children {
            self.drop_subtree(child);
        }
        if let Some(param) = self.params.get_mut(id) {
            param.children.clear();
            if param.param_type != new_type {
                param.param_type = new_type;
                param.default = new_type.default_value();
            }
        }
        self.dirty.insert(id.to_string());
        Ok(())
    }

    /// Copies the children of `source_parent` in `source` under `target_parent`.
    /// Copied ids are `<id_prefix>::<source id>` so repeated copies stay stable.
    pub(crate) fn graft(
        &mut self,
        target_parent: &str,
        source: &SchemaTree,
        source_parent: &str,
        id_prefix: &str,
    ) {
        for child in source.children_of(source_parent) {
            let mut copy = Param::with_id(
                format!("{}::{}", id_prefix, child.id),
                child.name.clone(),
                child.param_type,
            );
            copy.array_element = child.array_element;
            copy.description = child.description.clone();
            copy.default = child.default.clone();
            if let Some(copy_id) = self.push_child(target_parent, copy) {
                self.graft(&copy_id, source, &child.id, id_prefix);
            }
        }
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.dirty.contains(id)
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drains the dirty set, returning the ids in sorted order.
    pub fn take_dirty(&mut self) -> Vec<ParamId> {
        let mut ids: Vec<ParamId> = self.dirty.drain().collect();
        ids.sort();
        ids
    }
}

/// Strips a trailing `[n]` index marker from a path segment.
pub(crate) fn strip_index(segment: &str) -> &str {
    match segment.rfind('[') {
        Some(open)
            if segment.ends_with(']')
                && segment[open + 1..segment.len() - 1]
                    .chars()
                    .all(|c| c.is_ascii_digit()) =>
        {
            &segment[..open]
        }
        _ => segment,
    }
}
