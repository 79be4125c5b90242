//! The tool model: metadata plus the parameter tree.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::codec;
use crate::dict;
use crate::document::Element;
use crate::error::Result;
use crate::metadata::{ExecutionLog, ToolMetadata};
use crate::parameter::{ConstructionMode, ParamSpec, Parameter};
use crate::tree::{DuplicatePolicy, GroupId, ParamId, ParameterGroup, ParameterTree};
use crate::types::ArgDict;

/// Name of the synthetic top-level group written to documents.
pub const ROOT_GROUP_NAME: &str = "1";

/// How a model came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOrigin {
    /// Created empty and populated through `add`/`add_group`.
    Built,
    /// Deserialized from a CTD document.
    Loaded,
}

/// A tool's parameter schema.
///
/// # Examples
///
/// ```
/// use ctd_params_core::{Model, ParamSpec, ParamType};
///
/// let mut model = Model::new("exampleTool", "2.0");
/// let group = model.add_group("output", Some("Output options")).unwrap();
/// model
///     .add_to(group, "format", ParamSpec::default().with_choices(["csv", "tsv"]).with_default("csv"))
///     .unwrap();
/// model.add("verbose", ParamSpec::new(ParamType::Boolean)).unwrap();
///
/// let flags: Vec<_> = model.list_parameters().iter().map(|p| p.flag_name("--")).collect();
/// assert_eq!(flags, ["--output:format", "--verbose"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    version: String,
    metadata: ToolMetadata,
    tree: ParameterTree,
    origin: ModelOrigin,
}

impl Model {
    /// Creates an empty model.
    pub fn new(name: &str, version: &str) -> Self {
        let description = format!("Parameters of {name}");
        Self {
            name: name.to_string(),
            version: version.to_string(),
            metadata: ToolMetadata::default(),
            tree: ParameterTree::new(ROOT_GROUP_NAME, Some(&description)),
            origin: ModelOrigin::Built,
        }
    }

    pub(crate) fn from_parts(
        name: &str,
        version: &str,
        metadata: ToolMetadata,
        tree: ParameterTree,
    ) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            metadata,
            tree,
            origin: ModelOrigin::Loaded,
        }
    }

    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.tree.set_duplicate_policy(policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    pub fn origin(&self) -> ModelOrigin {
        self.origin
    }

    pub fn tree(&self) -> &ParameterTree {
        &self.tree
    }

    /// Adds a parameter to the root group.
    pub fn add(&mut self, name: &str, spec: ParamSpec) -> Result<ParamId> {
        self.add_to(ParameterTree::ROOT, name, spec)
    }

    /// Adds a group to the root group.
    pub fn add_group(&mut self, name: &str, description: Option<&str>) -> Result<GroupId> {
        self.add_group_to(ParameterTree::ROOT, name, description)
    }

    /// Adds a parameter to `group`.
    pub fn add_to(&mut self, group: GroupId, name: &str, spec: ParamSpec) -> Result<ParamId> {
        self.tree.add(group, name, spec, ConstructionMode::Strict)
    }

    /// Adds a nested group to `parent`.
    pub fn add_group_to(
        &mut self,
        parent: GroupId,
        name: &str,
        description: Option<&str>,
    ) -> Result<GroupId> {
        self.tree.add_group(parent, name, description)
    }

    pub fn parameter(&self, id: ParamId) -> Option<&Parameter> {
        self.tree.parameter(id)
    }

    pub fn group(&self, id: GroupId) -> Option<&ParameterGroup> {
        self.tree.group(id)
    }

    /// Every parameter of the model in schema order.
    pub fn list_parameters(&self) -> Vec<&Parameter> {
        self.tree.flatten_leaves(ParameterTree::ROOT)
    }

    /// Nested dictionary of every stored default; parameters without one
    /// are omitted.
    ///
    /// # Examples
    ///
    /// ```
    /// use ctd_params_core::{ArgValue, Model, ParamSpec, ParamType};
    ///
    /// let mut model = Model::new("tool", "1.0");
    /// let g = model.add_group("g", None).unwrap();
    /// model.add_to(g, "k", ParamSpec::new(ParamType::Int).with_default("3")).unwrap();
    /// model.add("name", ParamSpec::default()).unwrap();
    ///
    /// let defaults = model.get_defaults();
    /// assert_eq!(defaults.len(), 1);
    /// assert_eq!(defaults["g"].as_group().unwrap()["k"], ArgValue::from(3));
    /// ```
    pub fn get_defaults(&self) -> ArgDict {
        let mut defaults = ArgDict::new();
        for param in self.list_parameters() {
            if let Some(default) = param.default_value() {
                dict::set(&mut defaults, param.lineage(), default.clone());
            }
        }
        defaults
    }

    /// Document tree for this model.
    ///
    /// With an overlay the leaves carry the overlay's values (falling back
    /// to defaults); without one they carry the defaults.
    pub fn to_document_tree(
        &self,
        overlay: Option<&ArgDict>,
        log: Option<&ExecutionLog>,
    ) -> Element {
        codec::model_to_document(self, overlay, log)
    }

    /// Pretty-printed document text.
    pub fn to_document_string(
        &self,
        overlay: Option<&ArgDict>,
        log: Option<&ExecutionLog>,
    ) -> Result<String> {
        self.to_document_tree(overlay, log).to_pretty_string()
    }

    /// Writes the document to a file, replacing it.
    pub fn write_document(
        &self,
        path: impl AsRef<Path>,
        overlay: Option<&ArgDict>,
        log: Option<&ExecutionLog>,
    ) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        self.write_document_to(std::io::BufWriter::new(file), overlay, log)?;
        debug!(path = %path.display(), tool = %self.name, "Wrote CTD document");
        Ok(())
    }

    /// Writes the document to any sink.
    pub fn write_document_to<W: Write>(
        &self,
        sink: W,
        overlay: Option<&ArgDict>,
        log: Option<&ExecutionLog>,
    ) -> Result<()> {
        self.to_document_tree(overlay, log).write_pretty(sink)
    }

    /// Loads a model from a CTD file.
    ///
    /// # Errors
    ///
    /// [`CtdError::Io`](crate::CtdError::Io) if the file cannot be read,
    /// [`CtdError::Xml`](crate::CtdError::Xml) for malformed XML and
    /// [`CtdError::ModelParsing`](crate::CtdError::ModelParsing) for
    /// documents that are not a valid tool description.
    pub fn load_from_document(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)?;
        let model = Self::from_document_str(&xml)?;
        debug!(path = %path.display(), tool = %model.name, "Loaded CTD document");
        Ok(model)
    }

    /// Loads a model from CTD text.
    pub fn from_document_str(xml: &str) -> Result<Self> {
        codec::model_from_document(&Element::parse(xml)?)
    }
}
