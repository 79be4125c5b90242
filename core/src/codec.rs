//! Conversion between models and CTD document trees.
//!
//! Written documents look like
//!
//! ```text
//! tool (name, version, docurl?, category?)
//! ├── manual / description / executableName / executablePath
//! ├── log?
//! └── PARAMETERS
//!     └── NODE name=<tool>
//!         ├── ITEM name="version"
//!         └── NODE name="1"           root group
//!             └── NODE / ITEM / ITEMLIST ...
//! ```
//!
//! Older files put the parameters directly in `NODE name=<tool>`. The reader
//! accepts both: when the tool node holds exactly one `NODE` and no leaves
//! other than the version item, that inner node is the root group;
//! otherwise the tool node itself is.

use std::path::Path;

use tracing::debug;

use crate::document::Element;
use crate::error::{CtdError, Result};
use crate::metadata::{ExecutionLog, ToolMetadata};
use crate::model::Model;
use crate::parameter::{ConstructionMode, ParamSpec};
use crate::tree::{DuplicatePolicy, GroupId, ParameterTree};
use crate::types::{ArgDict, ArgValue, Value};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const TOOL_SCHEMA_LOCATION: &str =
    "https://github.com/genericworkflownodes/CTDopts/raw/master/schemas/CTD_0_3.xsd";
const PARAM_SCHEMA_LOCATION: &str =
    "https://github.com/genericworkflownodes/CTDopts/raw/master/schemas/Param_1_6_2.xsd";
const PARAM_SCHEMA_VERSION: &str = "1.6.2";

const VERSION_ITEM: &str = "version";
const ADVANCED_TAG: &str = "advanced";

/// Where the parameters of a document start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    /// Parameters sit directly in the tool node.
    Flat,
    /// Parameters sit in a single group below the tool node.
    Wrapped,
}

pub(crate) fn model_to_document(
    model: &Model,
    overlay: Option<&ArgDict>,
    log: Option<&ExecutionLog>,
) -> Element {
    let metadata = model.metadata();
    let mut tool = Element::new("tool")
        .with_attr("version", model.version())
        .with_attr("name", model.name())
        .with_attr("xmlns:xsi", XSI_NAMESPACE)
        .with_attr("xsi:schemaLocation", TOOL_SCHEMA_LOCATION);
    if let Some(docurl) = &metadata.docurl {
        tool.set_attr("docurl", docurl);
    }
    if let Some(category) = &metadata.category {
        tool.set_attr("category", category);
    }
    for (tag, text) in metadata.text_fields() {
        if let Some(text) = text {
            tool.push(Element::new(tag).with_text(text));
        }
    }
    if let Some(log) = log {
        tool.push(log.to_document_node());
    }

    let version_item = Element::new("ITEM")
        .with_attr("name", VERSION_ITEM)
        .with_attr("value", model.version())
        .with_attr("type", "string")
        .with_attr("description", "Version of the tool that generated this parameters file.")
        .with_attr("tags", ADVANCED_TAG);
    let tool_node = Element::new("NODE")
        .with_attr("name", model.name())
        .with_attr("description", metadata.description.as_deref().unwrap_or_default())
        .with_child(version_item)
        .with_child(model.tree().to_document_node(ParameterTree::ROOT, overlay));

    let parameters = Element::new("PARAMETERS")
        .with_attr("version", PARAM_SCHEMA_VERSION)
        .with_attr("xmlns:xsi", XSI_NAMESPACE)
        .with_attr("xsi:noNamespaceSchemaLocation", PARAM_SCHEMA_LOCATION)
        .with_child(tool_node);
    tool.push(parameters);
    tool
}

pub(crate) fn model_from_document(root: &Element) -> Result<Model> {
    if root.tag != "tool" {
        return Err(CtdError::ModelParsing(format!(
            "invalid CTD document: root element is <{}>, expected <tool>",
            root.tag
        )));
    }
    let name = required_attr(root, "name")?;
    let version = required_attr(root, "version")?;
    let metadata = ToolMetadata::from_tool_element(root);

    let parameters = root.find("PARAMETERS").ok_or_else(|| {
        CtdError::ModelParsing(format!("tool '{name}' has no PARAMETERS element"))
    })?;
    let container = parameter_root(parameters)?;

    let mut tree = ParameterTree::new(
        container.attr("name").unwrap_or(name),
        container.attr("description"),
    );
    tree.set_duplicate_policy(DuplicatePolicy::Overwrite);
    build_group(&mut tree, ParameterTree::ROOT, container)?;
    debug!(
        tool = name,
        parameters = tree.flatten_leaves(ParameterTree::ROOT).len(),
        "Rebuilt parameter tree"
    );

    Ok(Model::from_parts(name, version, metadata, tree))
}

/// Extracts raw argument values from a CTD document without a schema.
///
/// Accepts a whole `tool` document or a bare `PARAMETERS` element. Values are
/// returned as strings; an `ITEMLIST` without `LISTITEM` children yields no
/// entry.
///
/// # Examples
///
/// ```
/// use ctd_params_core::{args_from_document_str, ArgValue};
///
/// let xml = r#"<PARAMETERS><NODE name="tool">
///     <ITEM name="version" value="1.0" type="string"/>
///     <NODE name="1">
///         <ITEM name="k" value="3" type="int"/>
///         <ITEMLIST name="xs" type="float"><LISTITEM value="1.5"/></ITEMLIST>
///     </NODE>
/// </NODE></PARAMETERS>"#;
/// let args = args_from_document_str(xml).unwrap();
/// assert_eq!(args["k"], ArgValue::from("3"));
/// assert_eq!(args["xs"], ArgValue::from(vec!["1.5"]));
/// ```
pub fn args_from_document_str(xml: &str) -> Result<ArgDict> {
    args_from_document(&Element::parse(xml)?)
}

/// Reads a CTD file and extracts its argument values; see
/// [`args_from_document_str`].
pub fn args_from_file(path: impl AsRef<Path>) -> Result<ArgDict> {
    let xml = std::fs::read_to_string(path)?;
    args_from_document_str(&xml)
}

/// Extracts argument values from a parsed document.
pub fn args_from_document(root: &Element) -> Result<ArgDict> {
    let parameters = if root.tag == "PARAMETERS" {
        root
    } else {
        root.find("PARAMETERS").ok_or_else(|| {
            CtdError::ModelParsing(format!("<{}> has no PARAMETERS element", root.tag))
        })?
    };
    Ok(collect_args(parameter_root(parameters)?))
}

fn collect_args(group: &Element) -> ArgDict {
    let mut args = ArgDict::new();
    for child in &group.children {
        let Some(name) = child.attr("name") else {
            continue;
        };
        match child.tag.as_str() {
            "NODE" => {
                args.insert(name.to_string(), ArgValue::Group(collect_args(child)));
            }
            "ITEM" => {
                if let Some(value) = child.attr("value").filter(|v| !v.is_empty()) {
                    args.insert(name.to_string(), ArgValue::from(value));
                }
            }
            "ITEMLIST" => {
                let items: Vec<Value> = child
                    .children_named("LISTITEM")
                    .filter_map(|item| item.attr("value"))
                    .map(Value::from)
                    .collect();
                if !items.is_empty() {
                    args.insert(name.to_string(), ArgValue::List(items));
                }
            }
            _ => {}
        }
    }
    args
}

/// Finds the element whose children are the root group's children.
fn parameter_root(parameters: &Element) -> Result<&Element> {
    let tool_node = parameters.find("NODE").ok_or_else(|| {
        CtdError::ModelParsing("PARAMETERS element has no NODE child".to_string())
    })?;
    let nesting = detect_nesting(tool_node);
    debug!(?nesting, node = tool_node.attr("name"), "Detected CTD nesting");
    match nesting {
        Nesting::Wrapped => tool_node.find("NODE").ok_or_else(|| {
            CtdError::ModelParsing("wrapped parameter node disappeared".to_string())
        }),
        Nesting::Flat => Ok(tool_node),
    }
}

fn detect_nesting(tool_node: &Element) -> Nesting {
    let groups = tool_node.children_named("NODE").count();
    let only_version_leaf = tool_node
        .children
        .iter()
        .filter(|c| c.tag == "ITEM" || c.tag == "ITEMLIST")
        .all(|c| c.tag == "ITEM" && c.attr("name") == Some(VERSION_ITEM));
    if groups == 1 && only_version_leaf {
        Nesting::Wrapped
    } else {
        Nesting::Flat
    }
}

fn build_group(tree: &mut ParameterTree, group: GroupId, element: &Element) -> Result<()> {
    for child in &element.children {
        match child.tag.as_str() {
            "NODE" => {
                let name = required_attr(child, "name")?;
                let id = tree.add_group(group, name, child.attr("description"))?;
                build_group(tree, id, child)?;
            }
            "ITEM" | "ITEMLIST" => {
                let name = required_attr(child, "name")?;
                tree.add(group, name, leaf_spec(child)?, ConstructionMode::Compatible)?;
            }
            other => debug!(tag = other, "Skipping unknown element"),
        }
    }
    Ok(())
}

fn leaf_spec(leaf: &Element) -> Result<ParamSpec> {
    let name = required_attr(leaf, "name")?;
    let mut spec = ParamSpec::typed(leaf.attr("type").unwrap_or("string"));

    if leaf.tag == "ITEMLIST" {
        spec = spec.list();
        let mut items = Vec::new();
        for item in leaf.children_named("LISTITEM") {
            items.push(Value::from(required_attr(item, "value")?));
        }
        if !items.is_empty() {
            spec = spec.with_default(items);
        }
    } else if let Some(value) = leaf.attr("value").filter(|v| !v.is_empty()) {
        spec = spec.with_default(value);
    }

    if let Some(description) = leaf.attr("description") {
        spec = spec.with_description(description);
    }
    if let Some(required) = leaf.attr("required") {
        spec = spec.set_required(Value::from(required).truthy());
    }

    let mut tags: Vec<String> = leaf
        .attr("tags")
        .unwrap_or_default()
        .split(',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    let advanced = leaf.attr("advanced").is_some_and(|a| Value::from(a).truthy());
    if advanced && !tags.iter().any(|t| t == ADVANCED_TAG) {
        tags.push(ADVANCED_TAG.to_string());
    }
    spec = spec.with_tags(tags);

    match (leaf.attr("restrictions"), leaf.attr("supported_formats")) {
        (Some(_), Some(_)) => {
            return Err(CtdError::ModelParsing(format!(
                "parameter '{name}' has both restrictions and supported_formats"
            )));
        }
        (Some(restrictions), None) if !restrictions.is_empty() => {
            spec = spec.with_restrictions(restrictions);
        }
        (None, Some(formats)) if !formats.is_empty() => {
            spec = spec.with_file_formats(formats.split(','));
        }
        _ => {}
    }
    Ok(spec)
}

fn required_attr<'a>(element: &'a Element, key: &str) -> Result<&'a str> {
    element.attr(key).ok_or_else(|| {
        CtdError::ModelParsing(format!(
            "<{}> element is missing the '{key}' attribute",
            element.tag
        ))
    })
}
