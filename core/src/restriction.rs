//! Value-domain restrictions attached to parameters.
//!
//! A [`Restriction`] is one of a numeric range, a fixed choice set or a set
//! of accepted file extensions. Each knows how to check a value and how to
//! render itself as the CTD attribute token it was read from.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{CtdError, Result};
use crate::types::{ArgValue, ParamType, Value};

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericRange {
    min: Option<Value>,
    max: Option<Value>,
}

impl NumericRange {
    /// Builds a range for a numeric `ty`, coercing both bounds to it.
    ///
    /// # Errors
    ///
    /// [`CtdError::ModelParsing`] if `ty` is not numeric or a bound does not
    /// convert to it.
    pub fn new(ty: ParamType, min: Option<Value>, max: Option<Value>) -> Result<Self> {
        if !ty.is_numeric() {
            return Err(CtdError::ModelParsing(format!(
                "numeric range restriction on a parameter of type {ty}"
            )));
        }
        let coerce = |bound: Option<Value>| -> Result<Option<Value>> {
            bound
                .map(|b| {
                    b.coerce(ty).ok_or_else(|| {
                        CtdError::ModelParsing(format!("range bound '{b}' is not a valid {ty}"))
                    })
                })
                .transpose()
        };
        Ok(Self {
            min: coerce(min)?,
            max: coerce(max)?,
        })
    }

    pub fn min(&self) -> Option<&Value> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Value> {
        self.max.as_ref()
    }

    fn check_one(&self, value: &Value) -> bool {
        let within = |bound: &Option<Value>, rejected: Ordering| match bound {
            None => true,
            Some(b) => matches!(compare_numbers(value, b), Some(ord) if ord != rejected),
        };
        value.as_f64().is_some()
            && within(&self.min, Ordering::Less)
            && within(&self.max, Ordering::Greater)
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Controlled vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct Choices {
    values: Vec<Value>,
}

impl Choices {
    /// Builds a choice set, coercing every choice to `ty`.
    ///
    /// # Errors
    ///
    /// [`CtdError::ModelParsing`] listing every choice that does not convert.
    pub fn new(ty: ParamType, values: Vec<Value>) -> Result<Self> {
        let mut converted = Vec::with_capacity(values.len());
        let mut invalid = Vec::new();
        for value in values {
            match value.coerce(ty) {
                Some(v) => converted.push(v),
                None => invalid.push(value.to_string()),
            }
        }
        if !invalid.is_empty() {
            return Err(CtdError::ModelParsing(format!(
                "choices [{}] are not valid {ty} values",
                invalid.join(", ")
            )));
        }
        Ok(Self { values: converted })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Accepted file extensions, without the leading `*.`.
///
/// A file matches when its full extension, everything after the first dot
/// of the file name, equals one of the accepted ones. `a.fastq.gz` matches
/// `fastq.gz` but `sample.v2.fastq.gz` does not, since its extension is
/// `v2.fastq.gz`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFormat {
    extensions: Vec<String>,
}

impl FileFormat {
    /// Accepts bare extensions (`fastq.gz`) or CTD patterns (`*.fastq.gz`).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| {
                    let e = e.as_ref().trim();
                    e.strip_prefix("*.").unwrap_or(e).to_string()
                })
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Parses a `supported_formats` attribute (`*.txt,*.csv`).
    pub fn from_ctd(formats: &str) -> Self {
        Self::new(formats.split(','))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn check_one(&self, value: &Value) -> bool {
        let Some(name) = value.as_str() else {
            return false;
        };
        full_extension(name).is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Everything after the first dot of the final path component.
///
/// Leading dots belong to the stem, so `.bashrc` has no extension and
/// `.cache.tar.gz` has `tar.gz`.
fn full_extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem_start = file_name.len() - file_name.trim_start_matches('.').len();
    let rest = &file_name[stem_start..];
    let dot = rest.find('.')?;
    let ext = &rest[dot + 1..];
    (!ext.is_empty()).then_some(ext)
}

/// A restriction on the values a parameter accepts.
///
/// # Examples
///
/// ```
/// use ctd_params_core::{ArgValue, ParamType, Restriction};
///
/// let range = Restriction::parse("0:", ParamType::Int).unwrap();
/// assert!(range.check(&ArgValue::from(0)));
/// assert!(!range.check(&ArgValue::from(-1)));
/// assert_eq!(range.to_canonical_string(), "0:");
///
/// let choices = Restriction::parse("this,that", ParamType::String).unwrap();
/// assert!(choices.check(&ArgValue::from(vec!["this", "that"])));
/// assert!(!choices.check(&ArgValue::from(vec!["this", "other"])));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    NumericRange(NumericRange),
    Choices(Choices),
    FileFormat(FileFormat),
}

impl Restriction {
    /// Classifies and parses a CTD `restrictions` attribute.
    ///
    /// A string containing `,` is a choice list; otherwise a string with a
    /// single `:` is a numeric range with optional bounds (`1:`, `:2.8`).
    ///
    /// # Errors
    ///
    /// [`CtdError::ModelParsing`] for strings that are neither, ranges with
    /// more than one `:`, ranges on non-numeric types and unconvertible
    /// bounds or choices.
    pub fn parse(restriction: &str, ty: ParamType) -> Result<Self> {
        if restriction.contains(',') {
            let choices = restriction
                .replace(", ", ",")
                .split(',')
                .map(Value::from)
                .collect();
            return Ok(Self::Choices(Choices::new(ty, choices)?));
        }
        if let Some((min, max)) = restriction.split_once(':') {
            if max.contains(':') {
                return Err(CtdError::ModelParsing(format!(
                    "invalid numeric range restriction [{restriction}]"
                )));
            }
            let bound = |b: &str| {
                let b = b.trim();
                (!b.is_empty()).then(|| Value::from(b))
            };
            return Ok(Self::NumericRange(NumericRange::new(
                ty,
                bound(min),
                bound(max),
            )?));
        }
        Err(CtdError::ModelParsing(format!(
            "invalid restriction [{restriction}]; restrictions are either comma separated \
             value lists or colon separated numeric ranges (e.g. 'true,false', '0:14', '1:', ':2.8')"
        )))
    }

    /// Checks a whole argument value; lists pass only if every element does.
    pub fn check(&self, value: &ArgValue) -> bool {
        match value {
            ArgValue::Scalar(v) => self.check_value(v),
            ArgValue::List(items) => items.iter().all(|v| self.check_value(v)),
            ArgValue::Group(_) => false,
        }
    }

    /// Checks a single scalar.
    pub fn check_value(&self, value: &Value) -> bool {
        match self {
            Self::NumericRange(range) => range.check_one(value),
            Self::Choices(choices) => choices.values.contains(value),
            Self::FileFormat(formats) => formats.check_one(value),
        }
    }

    /// The token written to the CTD document.
    pub fn to_canonical_string(&self) -> String {
        match self {
            Self::NumericRange(range) => {
                let side = |b: &Option<Value>| b.as_ref().map(Value::to_string).unwrap_or_default();
                format!("{}:{}", side(&range.min), side(&range.max))
            }
            Self::Choices(choices) => join(&choices.values, |v| v.to_string()),
            Self::FileFormat(formats) => join(&formats.extensions, |e| format!("*.{e}")),
        }
    }

    /// Name of the CTD leaf attribute carrying this restriction.
    pub fn ctd_attribute(&self) -> &'static str {
        match self {
            Self::FileFormat(_) => "supported_formats",
            Self::NumericRange(_) | Self::Choices(_) => "restrictions",
        }
    }
}

fn join<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(",")
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumericRange(range) => {
                let side = |b: &Option<Value>| {
                    b.as_ref()
                        .map(Value::to_string)
                        .unwrap_or_else(|| "unbounded".to_string())
                };
                write!(f, "numeric range: {} to {}", side(&range.min), side(&range.max))
            }
            Self::Choices(choices) => write!(
                f,
                "choices: {}",
                choices
                    .values
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::FileFormat(formats) => {
                write!(f, "file formats: {}", formats.extensions.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_range_is_inclusive() {
        let range = Restriction::parse("1:10", ParamType::Int).unwrap();
        assert!(range.check_value(&Value::Int(1)));
        assert!(range.check_value(&Value::Int(10)));
        assert!(!range.check_value(&Value::Int(0)));
        assert!(!range.check_value(&Value::Int(11)));
    }

    #[test]
    fn test_numeric_range_open_bound_is_unbounded() {
        let range =
            Restriction::NumericRange(NumericRange::new(ParamType::Int, Some(0.into()), None).unwrap());
        assert!(range.check_value(&Value::Int(0)));
        assert!(!range.check_value(&Value::Int(-1)));
        assert!(range.check_value(&Value::Int(i64::MAX)));
        assert_eq!(range.to_canonical_string(), "0:");
    }

    #[test]
    fn test_numeric_range_rejects_non_numbers() {
        let range = Restriction::parse(":2.8", ParamType::Float).unwrap();
        assert!(range.check_value(&Value::Float(2.8)));
        assert!(!range.check_value(&Value::from("2.0")));
        assert_eq!(range.to_canonical_string(), ":2.8");
    }

    #[test]
    fn test_float_range_bounds_render_as_floats() {
        let range = Restriction::parse("0:10", ParamType::Float).unwrap();
        assert_eq!(range.to_canonical_string(), "0.0:10.0");
    }

    #[test]
    fn test_range_bound_must_match_type() {
        let err = Restriction::parse("a:5", ParamType::Int).unwrap_err();
        assert!(matches!(err, CtdError::ModelParsing(_)));
        let err = Restriction::parse("1.5:", ParamType::Int).unwrap_err();
        assert!(matches!(err, CtdError::ModelParsing(_)));
    }

    #[test]
    fn test_unclassifiable_restrictions_fail() {
        for bad in ["", "just-one", "1:2:3"] {
            let err = Restriction::parse(bad, ParamType::Int).unwrap_err();
            assert!(matches!(err, CtdError::ModelParsing(_)), "{bad} should fail");
        }
        let err = Restriction::parse("1:", ParamType::String).unwrap_err();
        assert!(matches!(err, CtdError::ModelParsing(_)));
    }

    #[test]
    fn test_choices_with_colons_in_numeric_type_fail() {
        let err = Restriction::parse("1:3,5", ParamType::Int).unwrap_err();
        assert!(matches!(err, CtdError::ModelParsing(_)));
        let ok = Restriction::parse("a:b,c", ParamType::String).unwrap();
        assert!(ok.check_value(&Value::from("a:b")));
    }

    #[test]
    fn test_choices_tolerate_spaced_separators() {
        let choices = Restriction::parse("this, that", ParamType::String).unwrap();
        assert!(choices.check_value(&Value::from("that")));
        assert_eq!(choices.to_canonical_string(), "this,that");
    }

    #[test]
    fn test_numeric_choices_are_typed() {
        let choices = Restriction::parse("1,2,3", ParamType::Int).unwrap();
        assert!(choices.check_value(&Value::Int(2)));
        assert!(!choices.check_value(&Value::from("2")));
    }

    #[test]
    fn test_file_format_matches_full_extension() {
        let compound = Restriction::FileFormat(FileFormat::new(["fastq.gz"]));
        let bare = Restriction::FileFormat(FileFormat::new(["gz"]));

        assert!(compound.check_value(&Value::from("a.fastq.gz")));
        assert!(!bare.check_value(&Value::from("a.fastq.gz")));
        assert!(!compound.check_value(&Value::from("a.txt")));
        assert!(!bare.check_value(&Value::from("a.txt")));
        assert!(!compound.check_value(&Value::from("sample.v2.fastq.gz")));
    }

    #[test]
    fn test_file_format_is_case_sensitive_and_uses_file_name() {
        let formats = Restriction::FileFormat(FileFormat::from_ctd("*.txt,*.csv"));
        assert!(formats.check_value(&Value::from("data/v1.2/table.csv")));
        assert!(!formats.check_value(&Value::from("table.CSV")));
        assert!(!formats.check_value(&Value::from(".txt")));
        assert_eq!(formats.to_canonical_string(), "*.txt,*.csv");
        assert_eq!(formats.ctd_attribute(), "supported_formats");
    }

    #[test]
    fn test_list_values_are_checked_elementwise() {
        let formats = Restriction::FileFormat(FileFormat::new(["fastq", "fastq.gz"]));
        assert!(formats.check(&ArgValue::from(vec!["a.fastq", "b.fastq.gz"])));
        assert!(!formats.check(&ArgValue::from(vec!["a.fastq", "b.bam"])));
        assert!(formats.check(&ArgValue::List(Vec::new())));
    }
}
