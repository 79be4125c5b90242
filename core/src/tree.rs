//! Arena-backed parameter tree.
//!
//! Groups and parameters live in one vector owned by [`ParameterTree`];
//! parents and children refer to each other through [`GroupId`] and
//! [`ParamId`] handles, so the back-references used for lineage never form
//! ownership cycles.

use indexmap::IndexMap;
use tracing::debug;

use crate::document::Element;
use crate::error::{CtdError, Result};
use crate::parameter::{ConstructionMode, ParamSpec, Parameter};
use crate::types::ArgDict;

/// Handle of a [`ParameterGroup`] inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// Handle of a [`Parameter`] inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(usize);

/// A child slot of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Param(ParamId),
    Group(GroupId),
}

/// What happens when a name is registered twice in the same group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The new child replaces the old one and keeps its position. Handles
    /// into the replaced subtree stop resolving.
    #[default]
    Overwrite,
    /// Registration fails with [`CtdError::DuplicateName`].
    Reject,
}

/// A named namespace of parameters and nested groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    name: String,
    description: Option<String>,
    parent: Option<GroupId>,
    lineage: Vec<String>,
    children: IndexMap<String, Child>,
}

impl ParameterGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Parent handle; `None` only for the root group.
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Name path below the root group (empty for the root itself).
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&str, Child)> {
        self.children.iter().map(|(name, child)| (name.as_str(), *child))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Group(ParameterGroup),
    Param(Parameter),
    /// Slot of a node that was overwritten.
    Vacant,
}

/// Owner of every group and parameter of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTree {
    nodes: Vec<Node>,
    duplicates: DuplicatePolicy,
}

impl ParameterTree {
    /// Handle of the root group.
    pub const ROOT: GroupId = GroupId(0);

    /// Creates a tree holding only the root group.
    ///
    /// The root's name is the synthetic top-level container name and never
    /// appears in lineages.
    pub fn new(root_name: &str, description: Option<&str>) -> Self {
        Self {
            nodes: vec![Node::Group(ParameterGroup {
                name: root_name.to_string(),
                description: description.map(str::to_string),
                parent: None,
                lineage: Vec::new(),
                children: IndexMap::new(),
            })],
            duplicates: DuplicatePolicy::default(),
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) {
        self.duplicates = policy;
    }

    pub fn root(&self) -> &ParameterGroup {
        match &self.nodes[Self::ROOT.0] {
            Node::Group(group) => group,
            Node::Param(_) | Node::Vacant => unreachable!("slot 0 always holds the root group"),
        }
    }

    pub fn group(&self, id: GroupId) -> Option<&ParameterGroup> {
        match self.nodes.get(id.0)? {
            Node::Group(group) => Some(group),
            Node::Param(_) | Node::Vacant => None,
        }
    }

    pub fn parameter(&self, id: ParamId) -> Option<&Parameter> {
        match self.nodes.get(id.0)? {
            Node::Param(param) => Some(param),
            Node::Group(_) | Node::Vacant => None,
        }
    }

    /// Registers a parameter under `group` and returns its handle.
    ///
    /// # Errors
    ///
    /// Everything [`ParamSpec`] validation can fail with, plus
    /// [`CtdError::DuplicateName`] under [`DuplicatePolicy::Reject`].
    pub fn add(
        &mut self,
        group: GroupId,
        name: &str,
        spec: ParamSpec,
        mode: ConstructionMode,
    ) -> Result<ParamId> {
        let lineage = self.child_lineage(group, name)?;
        let param = Parameter::build(group, lineage, spec, mode)?;
        let id = ParamId(self.nodes.len());
        self.nodes.push(Node::Param(param));
        self.attach(group, name, Child::Param(id));
        Ok(id)
    }

    /// Registers a nested group under `parent` and returns its handle.
    pub fn add_group(
        &mut self,
        parent: GroupId,
        name: &str,
        description: Option<&str>,
    ) -> Result<GroupId> {
        let lineage = self.child_lineage(parent, name)?;
        let id = GroupId(self.nodes.len());
        self.nodes.push(Node::Group(ParameterGroup {
            name: name.to_string(),
            description: description.map(str::to_string),
            parent: Some(parent),
            lineage,
            children: IndexMap::new(),
        }));
        self.attach(parent, name, Child::Group(id));
        Ok(id)
    }

    fn child_lineage(&self, group: GroupId, name: &str) -> Result<Vec<String>> {
        let parent = self
            .group(group)
            .ok_or_else(|| CtdError::ModelParsing(format!("unknown group handle {group:?}")))?;
        if parent.children.contains_key(name) {
            match self.duplicates {
                DuplicatePolicy::Reject => {
                    return Err(CtdError::DuplicateName {
                        group: parent.name.clone(),
                        name: name.to_string(),
                    });
                }
                DuplicatePolicy::Overwrite => {
                    debug!(group = %parent.name, name, "Overwriting existing child");
                }
            }
        }
        let mut lineage = parent.lineage.clone();
        lineage.push(name.to_string());
        Ok(lineage)
    }

    fn attach(&mut self, group: GroupId, name: &str, child: Child) {
        let replaced = match self.nodes.get_mut(group.0) {
            Some(Node::Group(parent)) => parent.children.insert(name.to_string(), child),
            _ => None,
        };
        if let Some(old) = replaced {
            self.vacate(old);
        }
    }

    fn vacate(&mut self, child: Child) {
        let slot = match child {
            Child::Param(ParamId(slot)) | Child::Group(GroupId(slot)) => slot,
        };
        if let Some(Node::Group(group)) = self.nodes.get(slot) {
            let nested: Vec<Child> = group.children.values().copied().collect();
            for nested in nested {
                self.vacate(nested);
            }
        }
        if let Some(node) = self.nodes.get_mut(slot) {
            *node = Node::Vacant;
        }
    }

    /// Every parameter below `group`, in pre-order; groups are not yielded.
    pub fn flatten_leaves(&self, group: GroupId) -> Vec<&Parameter> {
        let mut leaves = Vec::new();
        self.collect_leaves(group, &mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, group: GroupId, leaves: &mut Vec<&'a Parameter>) {
        let Some(group) = self.group(group) else {
            return;
        };
        for child in group.children.values() {
            match *child {
                Child::Param(id) => leaves.extend(self.parameter(id)),
                Child::Group(id) => self.collect_leaves(id, leaves),
            }
        }
    }

    /// Renders `group` as a `NODE` element wrapping its children in order.
    pub fn to_document_node(&self, group: GroupId, overlay: Option<&ArgDict>) -> Element {
        let Some(group) = self.group(group) else {
            return Element::new("NODE");
        };
        let mut node = Element::new("NODE").with_attr("name", &group.name);
        if let Some(description) = &group.description {
            node = node.with_attr("description", description);
        }
        for child in group.children.values() {
            match *child {
                Child::Param(id) => {
                    if let Some(param) = self.parameter(id) {
                        node.push(param.to_document_node(overlay));
                    }
                }
                Child::Group(id) => node.push(self.to_document_node(id, overlay)),
            }
        }
        node
    }
}
