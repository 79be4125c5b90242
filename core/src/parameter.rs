//! Leaf parameters and the options used to declare them.

use std::fmt::Write as _;

use crate::dict;
use crate::document::Element;
use crate::error::{CtdError, Result};
use crate::restriction::{Choices, FileFormat, NumericRange, Restriction};
use crate::tree::GroupId;
use crate::types::{ArgDict, ArgValue, ParamType, Value};

/// How strictly parameter declarations are checked.
///
/// CTD files historically store a `value` on every leaf, including required
/// ones. Loading such files uses `Compatible`, which keeps those values as
/// defaults; declarations made in code use `Strict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructionMode {
    /// Required parameters may not carry a default.
    #[default]
    Strict,
    /// Required parameters keep whatever default the document gave them.
    Compatible,
}

/// Restriction as declared, before it is checked against the parameter type.
#[derive(Debug, Clone, PartialEq)]
enum RestrictionSpec {
    NumRange(Option<Value>, Option<Value>),
    Choices(Vec<Value>),
    FileFormats(Vec<String>),
    Ctd(String),
}

/// Declaration options for a parameter.
///
/// The type token is resolved when the parameter is added, so an unknown
/// token fails at that point with [`CtdError::UnsupportedType`].
///
/// # Examples
///
/// ```
/// use ctd_params_core::{Model, ParamSpec, ParamType, Value};
///
/// let mut model = Model::new("exampleTool", "1.0");
/// model
///     .add(
///         "positive_int",
///         ParamSpec::new(ParamType::Int)
///             .with_default(5)
///             .with_num_range(Some(Value::Int(0)), None)
///             .with_tags(["advanced", "magic"])
///             .with_description("A positive integer parameter"),
///     )
///     .unwrap();
/// model
///     .add(
///         "input_files",
///         ParamSpec::typed("input-file")
///             .required()
///             .list()
///             .with_file_formats(["fastq", "fastq.gz"]),
///     )
///     .unwrap();
///
/// assert_eq!(model.list_parameters().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    type_token: String,
    default: Option<ArgValue>,
    is_list: bool,
    required: bool,
    description: Option<String>,
    tags: Vec<String>,
    restriction: Option<RestrictionSpec>,
}

impl Default for ParamSpec {
    fn default() -> Self {
        Self::new(ParamType::String)
    }
}

impl ParamSpec {
    /// Options for a parameter of a known type.
    pub fn new(ty: ParamType) -> Self {
        Self::typed(ty.ctd_name())
    }

    /// Options for a parameter whose type is given as a token (`"int"`,
    /// `"double"`, `"input-file"`, ...).
    pub fn typed(type_token: &str) -> Self {
        Self {
            type_token: type_token.to_string(),
            default: None,
            is_list: false,
            required: false,
            description: None,
            tags: Vec::new(),
            restriction: None,
        }
    }

    /// Sets the default; converted to the parameter type on construction.
    pub fn with_default(mut self, default: impl Into<ArgValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Marks the parameter as accepting a list of values.
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub(crate) fn set_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Sets the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the tags from a comma-joined string; empty segments are dropped.
    pub fn with_tags_csv(self, tags: &str) -> Self {
        self.with_tags(tags.split(',').filter(|t| !t.is_empty()))
    }

    /// Restricts values to an inclusive range; `None` leaves a side open.
    pub fn with_num_range(mut self, min: Option<Value>, max: Option<Value>) -> Self {
        self.restriction = Some(RestrictionSpec::NumRange(min, max));
        self
    }

    /// Restricts values to a fixed set.
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.restriction = Some(RestrictionSpec::Choices(
            choices.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Restricts file names to the given extensions (`txt` or `*.txt`).
    pub fn with_file_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restriction = Some(RestrictionSpec::FileFormats(
            formats.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Sets a restriction from a CTD `restrictions` attribute (`0:10`, `a,b`).
    pub fn with_restrictions(mut self, restrictions: &str) -> Self {
        self.restriction = Some(RestrictionSpec::Ctd(restrictions.to_string()));
        self
    }
}

/// A named, typed leaf of the parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    ty: ParamType,
    is_list: bool,
    required: bool,
    default: Option<ArgValue>,
    tags: Vec<String>,
    description: Option<String>,
    restriction: Option<Restriction>,
    parent: GroupId,
    lineage: Vec<String>,
}

impl Parameter {
    /// Validates `spec` and builds the parameter.
    ///
    /// `lineage` is the full name path from the root group's child down to
    /// this parameter.
    pub(crate) fn build(
        parent: GroupId,
        lineage: Vec<String>,
        spec: ParamSpec,
        mode: ConstructionMode,
    ) -> Result<Self> {
        let name = lineage.last().cloned().unwrap_or_default();
        let ty: ParamType = spec.type_token.parse()?;

        let mut is_list = spec.is_list;
        let mut required = spec.required;
        let mut default = spec
            .default
            .map(|d| convert_default(&name, ty, is_list, d))
            .transpose()?;

        if ty == ParamType::Boolean {
            is_list = false;
            required = false;
            default = Some(ArgValue::Scalar(Value::Bool(false)));
        }

        if required && default.is_some() && mode == ConstructionMode::Strict {
            return Err(CtdError::ModelParsing(format!(
                "required parameter '{name}' has a default value"
            )));
        }

        let restriction = spec
            .restriction
            .map(|r| build_restriction(&name, ty, r))
            .transpose()?;

        Ok(Self {
            name,
            ty,
            is_list,
            required,
            default,
            tags: spec.tags,
            description: spec.description,
            restriction,
            parent,
            lineage,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.ty
    }

    pub fn is_list(&self) -> bool {
        self.is_list
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Stored default: a scalar, or a list for list parameters.
    pub fn default_value(&self) -> Option<&ArgValue> {
        self.default.as_ref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    /// Handle of the group this parameter belongs to.
    pub fn parent(&self) -> GroupId {
        self.parent
    }

    /// Name path from the root group's child down to this parameter.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Colon-joined lineage (`g1:g2:p3`), the key used on the command line.
    pub fn joined_lineage(&self) -> String {
        self.lineage.join(&dict::KEY_SEPARATOR.to_string())
    }

    /// Command-line flag for this parameter.
    pub fn flag_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.joined_lineage())
    }

    /// Multi-line human-readable description.
    ///
    /// # Examples
    ///
    /// ```
    /// use ctd_params_core::{Model, ParamSpec, ParamType};
    ///
    /// let mut model = Model::new("tool", "1.0");
    /// let id = model.add("n", ParamSpec::new(ParamType::Int).required()).unwrap();
    /// let summary = model.parameter(id).unwrap().summary();
    /// assert!(summary.starts_with("PARAMETER n (required)"));
    /// assert!(summary.contains("type: int"));
    /// ```
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "PARAMETER {}{}",
            self.name,
            if self.required { " (required)" } else { "" }
        );
        if self.is_list {
            let _ = write!(out, "\n  type: list of {}s", self.ty);
        } else {
            let _ = write!(out, "\n  type: {}", self.ty);
        }
        if let Some(default) = &self.default {
            let _ = write!(out, "\n  default: {default}");
        }
        if !self.tags.is_empty() {
            let _ = write!(out, "\n  tags: {}", self.tags.join(", "));
        }
        if let Some(restriction) = &self.restriction {
            let _ = write!(out, "\n  restrictions on {restriction}");
        }
        if let Some(description) = &self.description {
            let _ = write!(out, "\n  description: {description}");
        }
        out
    }

    /// Renders the parameter as an `ITEM` or `ITEMLIST` element.
    ///
    /// With an overlay, the value at this parameter's lineage replaces the
    /// default; a missing entry falls back to the default.
    pub fn to_document_node(&self, overlay: Option<&ArgDict>) -> Element {
        let value = overlay
            .and_then(|args| dict::get(args, &self.lineage))
            .filter(|v| !matches!(v, ArgValue::Group(_)))
            .or(self.default.as_ref());

        let mut node = Element::new(if self.is_list { "ITEMLIST" } else { "ITEM" })
            .with_attr("name", &self.name);
        if !self.is_list {
            node = node.with_attr("value", &self.render_scalar(value));
        }
        node = node.with_attr("type", self.ty.ctd_name());
        if let Some(description) = &self.description {
            node = node.with_attr("description", description);
        }
        if self.required {
            node = node.with_attr("required", "true");
        }
        if !self.tags.is_empty() {
            node = node.with_attr("tags", &self.tags.join(","));
        }
        if let Some(restriction) = &self.restriction {
            node = node.with_attr(restriction.ctd_attribute(), &restriction.to_canonical_string());
        }

        if self.is_list {
            let items: &[Value] = match value {
                Some(ArgValue::List(items)) => items,
                Some(ArgValue::Scalar(v)) => std::slice::from_ref(v),
                _ => &[],
            };
            for item in items {
                node.push(Element::new("LISTITEM").with_attr("value", &item.to_string()));
            }
        }
        node
    }

    fn render_scalar(&self, value: Option<&ArgValue>) -> String {
        match (self.ty, value) {
            (_, None) => String::new(),
            (ParamType::Boolean, Some(ArgValue::Scalar(v))) => v.truthy().to_string(),
            (_, Some(v)) => v.to_string(),
        }
    }
}

fn convert_default(name: &str, ty: ParamType, is_list: bool, default: ArgValue) -> Result<ArgValue> {
    let items = match (is_list, default) {
        (true, ArgValue::List(items)) => items,
        (true, ArgValue::Scalar(v)) => vec![v],
        (false, ArgValue::Scalar(v)) => {
            return v.coerce(ty).map(ArgValue::Scalar).ok_or_else(|| {
                CtdError::ModelParsing(format!(
                    "default value [{v}] of parameter '{name}' is not a valid {ty}"
                ))
            });
        }
        (_, other) => {
            return Err(CtdError::ModelParsing(format!(
                "default value {other} of parameter '{name}' does not match its shape"
            )));
        }
    };

    let mut converted = Vec::with_capacity(items.len());
    let mut invalid = Vec::new();
    for item in items {
        match item.coerce(ty) {
            Some(v) => converted.push(v),
            None => invalid.push(item.to_string()),
        }
    }
    if !invalid.is_empty() {
        return Err(CtdError::ModelParsing(format!(
            "default values [{}] of parameter '{name}' are not valid {ty} values",
            invalid.join(", ")
        )));
    }
    Ok(ArgValue::List(converted))
}

fn build_restriction(name: &str, ty: ParamType, spec: RestrictionSpec) -> Result<Restriction> {
    let restriction = match spec {
        RestrictionSpec::NumRange(min, max) => {
            Restriction::NumericRange(NumericRange::new(ty, min, max)?)
        }
        RestrictionSpec::Choices(values) => Restriction::Choices(Choices::new(ty, values)?),
        RestrictionSpec::FileFormats(formats) => Restriction::FileFormat(FileFormat::new(formats)),
        RestrictionSpec::Ctd(raw) => Restriction::parse(&raw, ty)?,
    };
    if matches!(restriction, Restriction::FileFormat(_)) && !ty.is_textual() {
        return Err(CtdError::ModelParsing(format!(
            "file format restriction on parameter '{name}' of type {ty}"
        )));
    }
    Ok(restriction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ParameterTree;

    fn build(spec: ParamSpec) -> Result<Parameter> {
        Parameter::build(
            ParameterTree::ROOT,
            vec!["p".to_string()],
            spec,
            ConstructionMode::Strict,
        )
    }

    #[test]
    fn test_unknown_type_token_fails() {
        let err = build(ParamSpec::typed("matrix")).unwrap_err();
        assert!(matches!(err, CtdError::UnsupportedType(ref t) if t == "matrix"));
    }

    #[test]
    fn test_numeric_default_errors_name_every_bad_element() {
        let err = build(
            ParamSpec::new(ParamType::Int)
                .list()
                .with_default(vec!["1", "x", "2", "y"]),
        )
        .unwrap_err();
        let CtdError::ModelParsing(message) = err else {
            panic!("expected ModelParsing");
        };
        assert!(message.contains("x, y"), "{message}");
    }

    #[test]
    fn test_defaults_are_converted_to_the_declared_type() {
        let p = build(ParamSpec::new(ParamType::Float).list().with_default(vec!["0", "2.5"])).unwrap();
        assert_eq!(
            p.default_value(),
            Some(&ArgValue::List(vec![Value::Float(0.0), Value::Float(2.5)]))
        );
    }

    #[test]
    fn test_boolean_overrides_caller_input() {
        let p = build(
            ParamSpec::new(ParamType::Boolean)
                .required()
                .list()
                .with_default(true),
        )
        .unwrap();
        assert!(!p.is_required());
        assert!(!p.is_list());
        assert_eq!(p.default_value(), Some(&ArgValue::from(false)));
    }

    #[test]
    fn test_required_with_default_depends_on_mode() {
        let spec = ParamSpec::new(ParamType::Int).required().with_default(3);
        assert!(matches!(
            build(spec.clone()).unwrap_err(),
            CtdError::ModelParsing(_)
        ));

        let p = Parameter::build(
            ParameterTree::ROOT,
            vec!["p".to_string()],
            spec,
            ConstructionMode::Compatible,
        )
        .unwrap();
        assert!(p.is_required());
        assert_eq!(p.default_value(), Some(&ArgValue::from(3)));
    }

    #[test]
    fn test_file_formats_require_textual_type() {
        let err = build(ParamSpec::new(ParamType::Int).with_file_formats(["txt"])).unwrap_err();
        assert!(matches!(err, CtdError::ModelParsing(_)));
    }

    #[test]
    fn test_tags_from_csv_drop_empty_segments() {
        let p = build(ParamSpec::default().with_tags_csv("a,,b,")).unwrap();
        assert_eq!(p.tags(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_document_node_uses_overlay_then_default() {
        let p = build(ParamSpec::new(ParamType::Int).with_default(5).with_num_range(Some(Value::Int(0)), None))
            .unwrap();

        let node = p.to_document_node(None);
        assert_eq!(node.tag, "ITEM");
        assert_eq!(node.attr("value"), Some("5"));
        assert_eq!(node.attr("restrictions"), Some("0:"));

        let mut overlay = ArgDict::new();
        overlay.insert("p".into(), ArgValue::from(9));
        assert_eq!(p.to_document_node(Some(&overlay)).attr("value"), Some("9"));

        let empty = ArgDict::new();
        assert_eq!(p.to_document_node(Some(&empty)).attr("value"), Some("5"));
    }

    #[test]
    fn test_boolean_node_uses_lowercase_tokens() {
        let p = build(ParamSpec::new(ParamType::Boolean)).unwrap();
        let mut overlay = ArgDict::new();
        overlay.insert("p".into(), ArgValue::from("True"));
        assert_eq!(p.to_document_node(Some(&overlay)).attr("value"), Some("true"));
        overlay.insert("p".into(), ArgValue::from("false"));
        assert_eq!(p.to_document_node(Some(&overlay)).attr("value"), Some("false"));
        assert_eq!(p.to_document_node(None).attr("value"), Some("false"));
    }

    #[test]
    fn test_list_node_emits_list_items() {
        let p = build(ParamSpec::new(ParamType::Float).list().required()).unwrap();
        let mut overlay = ArgDict::new();
        overlay.insert("p".into(), ArgValue::from(vec![1.0, 2.5]));

        let node = p.to_document_node(Some(&overlay));
        assert_eq!(node.tag, "ITEMLIST");
        assert_eq!(node.attr("value"), None);
        assert_eq!(node.attr("required"), Some("true"));
        let values: Vec<_> = node.children.iter().filter_map(|c| c.attr("value")).collect();
        assert_eq!(values, ["1.0", "2.5"]);
    }
}
