use super::{InputChange, OutputChange, WorkflowStore, refresh_custom_output_of};
use crate::error::StoreError;
use crate::graph::{NodeId, Side, lookup};
use crate::schema::{Param, ParamId, ParamType, RefTarget, TreeError, ValueSource, custom_output};
use tracing::{debug, warn};

fn tree_error(node_id: &str, err: TreeError) -> StoreError {
    match err {
        TreeError::NotFound(param_id) => StoreError::ParamNotFound {
            node_id: node_id.to_string(),
            param_id,
        },
        TreeError::NotAContainer(param_id) => StoreError::NotAContainer {
            node_id: node_id.to_string(),
            param_id,
        },
        TreeError::ArrayElementLocked(param_id) => StoreError::ArrayElementLocked {
            node_id: node_id.to_string(),
            param_id,
        },
    }
}

impl WorkflowStore {
    fn side_of(&self, node_id: &str, param_id: &str) -> Result<Side, StoreError> {
        self.require_node(node_id)?
            .side_of(param_id)
            .ok_or_else(|| {
                warn!(node_id, param_id, "unknown param");
                StoreError::ParamNotFound {
                    node_id: node_id.to_string(),
                    param_id: param_id.to_string(),
                }
            })
    }

    /// Edits the non-structural fields of a param (name, default, required,
    /// description, value). The id cannot be changed through the mutator.
    pub fn set_param<F>(&mut self, node_id: &str, param_id: &str, mutator: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Param),
    {
        let side = self.side_of(node_id, param_id)?;
        let node = self.node_mut(node_id)?;
        let tree = node.tree_mut(side);
        let position = tree.root_position(param_id);
        let mut renamed = None;
        if let Some(param) = tree.get_mut(param_id) {
            let id = param.id.clone();
            let old_name = param.name.clone();
            mutator(param);
            param.id = id;
            if param.name != old_name {
                renamed = Some(param.name.clone());
            }
        }
        debug!(node_id, param_id, ?side, "updated param");
        let mut events = self.input_events(node_id, side, InputChange::Updated(param_id.to_string()));
        if side == Side::Outputs {
            if renamed.is_some() {
                refresh_custom_output_of(self.node_mut(node_id)?);
            }
            self.relink_downstream_refs(node_id);
            if let (Some(position), Some(name)) = (position, renamed) {
                events.extend(self.output_events(node_id, OutputChange::Renamed { position, name }));
            }
        }
        self.commit(node_id, events);
        Ok(())
    }

    /// Appends a top-level param. Inputs start as `string` with an unset reference;
    /// outputs start as `string`, or `array-string` on iteration nodes.
    pub fn add_param(&mut self, node_id: &str, side: Side) -> Result<ParamId, StoreError> {
        self.require_node(node_id)?;
        self.snapshot("add param");
        let iteration_type = self.config.iteration_node_type.clone();
        let node = self.node_mut(node_id)?;
        let param = match side {
            Side::Inputs => Param::input(""),
            Side::Outputs if node.node_type == iteration_type => {
                Param::new("", ParamType::ArrayString)
            }
            Side::Outputs => Param::new("", ParamType::String),
        };
        let param_id = node.tree_mut(side).push_root(param);
        if side == Side::Outputs {
            refresh_custom_output_of(node);
        }
        debug!(node_id, param_id = %param_id, ?side, "added param");
        let mut events = self.input_events(node_id, side, InputChange::Added(param_id.clone()));
        if side == Side::Outputs {
            events.extend(self.output_events(node_id, OutputChange::Added));
        }
        self.commit(node_id, events);
        Ok(param_id)
    }

    /// Adds an empty `string` child under an `object` or `array-object` param.
    pub fn add_child(&mut self, node_id: &str, parent_param_id: &str) -> Result<ParamId, StoreError> {
        let side = self.side_of(node_id, parent_param_id)?;
        let is_container = self
            .require_node(node_id)?
            .tree(side)
            .get(parent_param_id)
            .is_some_and(|p| p.param_type().is_container());
        if !is_container {
            return Err(StoreError::NotAContainer {
                node_id: node_id.to_string(),
                param_id: parent_param_id.to_string(),
            });
        }

        self.snapshot("add child");
        let node = self.node_mut(node_id)?;
        let child_id = node
            .tree_mut(side)
            .add_child(parent_param_id)
            .map_err(|e| tree_error(node_id, e))?;
        if side == Side::Outputs {
            refresh_custom_output_of(node);
        }
        debug!(node_id, parent_param_id, child_id = %child_id, "added child param");
        let events = self.input_events(
            node_id,
            side,
            InputChange::Updated(parent_param_id.to_string()),
        );
        self.commit(node_id, events);
        Ok(child_id)
    }

    /// Removes a param with its subtree.
    ///
    /// For outputs, the removed path is deleted from the retry custom output and
    /// downstream references to it are cleared. Conditions using a removed input as an
    /// operand are flagged as missing their reference by the validation that follows.
    pub fn remove_param(&mut self, node_id: &str, param_id: &str) -> Result<(), StoreError> {
        let side = self.side_of(node_id, param_id)?;
        let (names, reference_path, position) = {
            let tree = self.require_node(node_id)?.tree(side);
            if tree.get(param_id).is_some_and(|p| p.is_array_element()) {
                return Err(StoreError::ArrayElementLocked {
                    node_id: node_id.to_string(),
                    param_id: param_id.to_string(),
                });
            }
            (
                tree.path_of(param_id).unwrap_or_default(),
                tree.reference_path(param_id).unwrap_or_default(),
                tree.root_position(param_id),
            )
        };

        self.snapshot("remove param");
        let node = self.node_mut(node_id)?;
        let removed = node
            .tree_mut(side)
            .remove(param_id)
            .map_err(|e| tree_error(node_id, e))?;

        if side == Side::Outputs
            && let Some(retry) = node.retry_config.as_mut()
            && let Ok(mut doc) = serde_json::from_str::<serde_json::Value>(&retry.custom_output)
            && custom_output::delete_path(&mut doc, &names)
            && let Ok(text) = serde_json::to_string_pretty(&doc)
        {
            retry.custom_output = text;
        }
        debug!(node_id, param_id, removed = removed.len(), "removed param");

        let cleared = if side == Side::Outputs {
            self.clear_downstream_refs(node_id, &reference_path)
        } else {
            Vec::new()
        };
        let mut events = self.input_events(node_id, side, InputChange::Removed(param_id.to_string()));
        if side == Side::Outputs
            && let Some(position) = position
        {
            events.extend(self.output_events(node_id, OutputChange::Removed { position }));
        }
        self.commit(node_id, events);
        for id in cleared {
            let events = self.input_events(&id, Side::Inputs, InputChange::Updated(id.clone()));
            self.commit(&id, events);
        }
        Ok(())
    }

    /// Changes the type of a param, rebuilding its children. Returns `false` when the
    /// param already had `new_type`.
    pub fn change_type(
        &mut self,
        node_id: &str,
        param_id: &str,
        new_type: ParamType,
    ) -> Result<bool, StoreError> {
        let side = self.side_of(node_id, param_id)?;
        let current = self
            .require_node(node_id)?
            .tree(side)
            .get(param_id)
            .map(|p| p.param_type());
        if current == Some(new_type) {
            return Ok(false);
        }

        self.snapshot("change type");
        let node = self.node_mut(node_id)?;
        let changed = node
            .tree_mut(side)
            .change_type(param_id, new_type)
            .map_err(|e| tree_error(node_id, e))?;
        if !changed {
            self.discard_snapshot();
            return Ok(false);
        }
        if side == Side::Outputs {
            refresh_custom_output_of(node);
            self.relink_downstream_refs(node_id);
        }
        let events = self.input_events(node_id, side, InputChange::Updated(param_id.to_string()));
        self.commit(node_id, events);
        Ok(true)
    }

    /// Points an input at an upstream output. `path` is the reference path of the
    /// output (e.g. `rows[0].score`); the input takes over the output's type.
    pub fn bind_ref(
        &mut self,
        node_id: &str,
        param_id: &str,
        source_node_id: &str,
        path: &str,
    ) -> Result<(), StoreError> {
        if self.side_of(node_id, param_id)? != Side::Inputs {
            return Err(StoreError::ParamNotFound {
                node_id: node_id.to_string(),
                param_id: param_id.to_string(),
            });
        }
        let references = self.references(node_id);
        let entry = lookup(&references, source_node_id, path)
            .ok_or_else(|| StoreError::ReferenceNotVisible {
                node_id: node_id.to_string(),
                source_node_id: source_node_id.to_string(),
                path: path.to_string(),
            })?;
        let target = RefTarget {
            node_id: source_node_id.to_string(),
            name: entry.path.clone(),
            id: Some(entry.id.clone()),
        };
        let new_type = entry.param_type;

        let node = self.node_mut(node_id)?;
        let tree = node.tree_mut(Side::Inputs);
        if let Some(new_type) = new_type {
            tree.retype_leaf(param_id, new_type)
                .map_err(|e| tree_error(node_id, e))?;
        }
        if let Some(param) = tree.get_mut(param_id) {
            param.value = Some(ValueSource::Ref(target));
        }
        debug!(node_id, param_id, source_node_id, path, "bound reference");
        let events = self.input_events(node_id, Side::Inputs, InputChange::Updated(param_id.to_string()));
        self.commit(node_id, events);
        Ok(())
    }

    /// Clears every downstream input that referenced `path` (or something below it)
    /// on `node_id`. Returns the ids of the nodes that changed.
    fn clear_downstream_refs(&mut self, node_id: &str, path: &str) -> Vec<NodeId> {
        let points_into = |name: &str| {
            name == path
                || name
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        };

        let mut changed = Vec::new();
        for id in self.graph.descendants(node_id) {
            let Some(node) = self.graph.node_state_mut(&id) else {
                continue;
            };
            let mut touched = false;
            for param in node.inputs.params_mut() {
                if let Some(ValueSource::Ref(target)) = param.value.as_mut()
                    && target.node_id == node_id
                    && points_into(&target.name)
                {
                    *target = RefTarget::default();
                    touched = true;
                }
            }
            if touched {
                changed.push(id);
            }
        }
        if !changed.is_empty() {
            self.graph.bump_revision();
            debug!(node_id, path, nodes = changed.len(), "cleared downstream references");
        }
        changed
    }

    /// Refreshes the path of downstream references that carry the id of one of
    /// `node_id`'s outputs, after a rename or retype.
    fn relink_downstream_refs(&mut self, node_id: &str) {
        let Some(source) = self.graph.node(node_id) else {
            return;
        };
        let outputs = source.outputs.clone();
        let mut changed = Vec::new();
        for id in self.graph.descendants(node_id) {
            let Some(node) = self.graph.node_state_mut(&id) else {
                continue;
            };
            let mut touched = false;
            for param in node.inputs.params_mut() {
                if let Some(ValueSource::Ref(target)) = param.value.as_mut()
                    && target.node_id == node_id
                    && let Some(path) = target.id.as_deref().and_then(|pid| outputs.reference_path(pid))
                    && path != target.name
                {
                    target.name = path;
                    touched = true;
                }
            }
            if touched {
                changed.push(id);
            }
        }
        if changed.is_empty() {
            return;
        }
        self.graph.bump_revision();
        for id in changed {
            self.mark_dirty(&id);
            self.validate_node(&id);
        }
    }
}
