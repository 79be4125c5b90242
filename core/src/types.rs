//! Value types shared by the schema, argument dictionaries and codecs.
//!
//! A parameter's element type is a closed [`ParamType`] resolved once from a
//! type token. Concrete values are [`Value`] scalars; an argument dictionary
//! ([`ArgDict`]) nests [`ArgValue`]s that are scalars, lists of scalars or
//! further dictionaries. All of them serialize through [`serde`] so argument
//! dictionaries convert to and from JSON or YAML without a schema.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CtdError;

/// Element type of a parameter.
///
/// `InputFile` and `OutputFile` behave exactly like `String`; they only tell
/// consumers that the value names a file to read or write.
///
/// # Examples
///
/// ```
/// use ctd_params_core::ParamType;
///
/// assert_eq!("double".parse::<ParamType>().unwrap(), ParamType::Float);
/// assert_eq!(ParamType::InputFile.ctd_name(), "input-file");
/// assert!("complex".parse::<ParamType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamType {
    Int,
    Float,
    #[default]
    String,
    Boolean,
    InputFile,
    OutputFile,
}

impl ParamType {
    /// Type token written to the `type` attribute of CTD leaves.
    pub fn ctd_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::InputFile => "input-file",
            Self::OutputFile => "output-file",
        }
    }

    /// Returns `true` for `Int` and `Float`.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Returns `true` for `String` and both file types.
    pub fn is_textual(self) -> bool {
        matches!(self, Self::String | Self::InputFile | Self::OutputFile)
    }
}

impl FromStr for ParamType {
    type Err = CtdError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "int" | "integer" => Ok(Self::Int),
            "float" | "double" => Ok(Self::Float),
            "string" | "str" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Boolean),
            "input-file" => Ok(Self::InputFile),
            "output-file" => Ok(Self::OutputFile),
            other => Err(CtdError::UnsupportedType(other.to_string())),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ctd_name())
    }
}

/// A single scalar value.
///
/// Values coming from the command line or a document are `Str` until
/// validation coerces them to the declared [`ParamType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Converts the value to `ty`, or `None` if it has no such reading.
    ///
    /// Textual targets accept anything (the display form is used). Boolean
    /// targets never fail; see [`Value::truthy`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ctd_params_core::{ParamType, Value};
    ///
    /// assert_eq!(Value::from("42").coerce(ParamType::Int), Some(Value::Int(42)));
    /// assert_eq!(Value::from("4.2").coerce(ParamType::Int), None);
    /// assert_eq!(Value::from("false").coerce(ParamType::Boolean), Some(Value::Bool(false)));
    /// ```
    pub fn coerce(&self, ty: ParamType) -> Option<Value> {
        match ty {
            ParamType::Int => match self {
                Self::Int(i) => Some(Self::Int(*i)),
                Self::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.2e18 => {
                    Some(Self::Int(*f as i64))
                }
                Self::Float(_) => None,
                Self::Bool(b) => Some(Self::Int(i64::from(*b))),
                Self::Str(s) => s.trim().parse::<i64>().ok().map(Self::Int),
            },
            ParamType::Float => match self {
                Self::Int(i) => Some(Self::Float(*i as f64)),
                Self::Float(f) => Some(Self::Float(*f)),
                Self::Bool(b) => Some(Self::Float(if *b { 1.0 } else { 0.0 })),
                Self::Str(s) => s.trim().parse::<f64>().ok().map(Self::Float),
            },
            ParamType::Boolean => Some(Self::Bool(self.truthy())),
            ParamType::String | ParamType::InputFile | ParamType::OutputFile => match self {
                Self::Str(s) => Some(Self::Str(s.clone())),
                other => Some(Self::Str(other.to_string())),
            },
        }
    }

    /// Boolean reading of the value.
    ///
    /// Strings are true only for the literal tokens `"true"`, `"True"` and
    /// `"1"`; a plain non-empty check would make `"false"` true.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => matches!(s.as_str(), "true" | "True" | "1"),
        }
    }

    /// Numeric view used by range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    /// Borrowed string for `Str` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            // Integral floats keep a trailing ".0" so they read back as floats.
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Nested argument dictionary keyed by parameter and group names.
pub type ArgDict = IndexMap<String, ArgValue>;

/// One entry of an [`ArgDict`].
///
/// # Examples
///
/// ```
/// use ctd_params_core::{ArgDict, ArgValue, Value};
///
/// let mut group = ArgDict::new();
/// group.insert("threads".into(), ArgValue::from(4));
/// let mut args = ArgDict::new();
/// args.insert("run".into(), ArgValue::Group(group));
/// args.insert("inputs".into(), ArgValue::from(vec!["a.txt", "b.txt"]));
///
/// let json = serde_json::to_string(&args).unwrap();
/// assert_eq!(json, r#"{"run":{"threads":4},"inputs":["a.txt","b.txt"]}"#);
/// assert_eq!(args["inputs"].as_list().unwrap()[1], Value::from("b.txt"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Scalar(Value),
    List(Vec<Value>),
    Group(ArgDict),
}

impl ArgValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&ArgDict> {
        match self {
            Self::Group(dict) => Some(dict),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Group(dict) => {
                f.write_str("{")?;
                for (i, (key, value)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! scalar_into_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Value::from(value))
                }
            }
        )*
    };
}

scalar_into_arg!(bool, i64, i32, f64, &str, String);

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for ArgValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<ArgDict> for ArgValue {
    fn from(dict: ArgDict) -> Self {
        Self::Group(dict)
    }
}
