//! Command-line parsing against a model, and directive flags.
//!
//! Every parameter gets one flag, `prefix + lineage joined by ':'`
//! (`--g1:g2:p3`). Boolean flags take no value; scalar flags take the next
//! token; list flags take the run of following tokens up to the next
//! option-like token. A token is option-like when it starts with `-`, is
//! longer than one character and is not a number, so `-5` and `-` are
//! values.

use std::collections::HashMap;

use crate::dict;
use crate::model::Model;
use crate::parameter::Parameter;
use crate::types::{ArgDict, ArgValue, ParamType, Value};

/// Arguments recognized on a command line plus every token that was not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedCommandLine {
    /// Raw string values keyed by lineage; booleans are `true` when present.
    pub args: ArgDict,
    /// Unrecognized tokens, in order. Everything from a bare `--` on is kept
    /// here verbatim, including the `--` itself.
    pub remainder: Vec<String>,
}

impl Model {
    /// Parses command-line tokens into a nested argument dictionary.
    ///
    /// Values stay strings; run the result through
    /// [`validate`](Model::validate) to coerce them. When a flag is given
    /// twice the last occurrence wins. A non-boolean flag may also be
    /// written `--flag=value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ctd_params_core::{ArgValue, Model, ParamSpec, ParamType};
    ///
    /// let mut model = Model::new("tool", "1.0");
    /// let g = model.add_group("g", None).unwrap();
    /// model.add_to(g, "k", ParamSpec::new(ParamType::Int)).unwrap();
    /// model.add("xs", ParamSpec::new(ParamType::Float).list()).unwrap();
    /// model.add("verbose", ParamSpec::new(ParamType::Boolean)).unwrap();
    ///
    /// let parsed = model.parse_command_line(
    ///     &["--g:k", "3", "--xs", "1", "-2.5", "--verbose", "--other"],
    ///     "--",
    /// );
    /// assert_eq!(parsed.args["g"].as_group().unwrap()["k"], ArgValue::from("3"));
    /// assert_eq!(parsed.args["xs"], ArgValue::from(vec!["1", "-2.5"]));
    /// assert_eq!(parsed.args["verbose"], ArgValue::from(true));
    /// assert_eq!(parsed.remainder, ["--other"]);
    /// ```
    pub fn parse_command_line<S: AsRef<str>>(&self, tokens: &[S], prefix: &str) -> ParsedCommandLine {
        let params = self.list_parameters();
        let flags: HashMap<String, &Parameter> = params
            .iter()
            .map(|p| (p.flag_name(prefix), *p))
            .collect();

        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        let mut parsed = ParsedCommandLine::default();
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            i += 1;
            if token == "--" {
                parsed.remainder.extend(tokens[i - 1..].iter().map(|t| t.to_string()));
                break;
            }

            let (flag, inline) = match token.split_once('=') {
                Some((flag, value)) if flags.contains_key(flag) => (flag, Some(value)),
                _ => (token, None),
            };
            let Some(param) = flags.get(flag) else {
                parsed.remainder.push(token.to_string());
                continue;
            };

            let value = match (param.param_type(), inline) {
                (ParamType::Boolean, None) => ArgValue::Scalar(Value::Bool(true)),
                (ParamType::Boolean, Some(_)) => {
                    parsed.remainder.push(token.to_string());
                    continue;
                }
                (_, Some(value)) if param.is_list() => ArgValue::List(vec![Value::from(value)]),
                (_, Some(value)) => ArgValue::from(value),
                (_, None) if param.is_list() => {
                    let start = i;
                    while i < tokens.len() && !is_option_like(tokens[i]) {
                        i += 1;
                    }
                    ArgValue::List(tokens[start..i].iter().map(|t| Value::from(*t)).collect())
                }
                (_, None) => match tokens.get(i) {
                    Some(next) if !is_option_like(next) => {
                        i += 1;
                        ArgValue::from(*next)
                    }
                    _ => {
                        parsed.remainder.push(token.to_string());
                        continue;
                    }
                },
            };
            dict::set(&mut parsed.args, param.lineage(), value);
        }
        parsed
    }

    /// Splits `raw` on whitespace and parses the tokens.
    pub fn parse_command_line_str(&self, raw: &str, prefix: &str) -> ParsedCommandLine {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        self.parse_command_line(&tokens, prefix)
    }
}

fn is_option_like(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

/// Names of the three directive flags, without prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveNames {
    pub write_tool_ctd: String,
    pub write_param_ctd: String,
    pub input_ctd: String,
    pub prefix: String,
}

impl Default for DirectiveNames {
    fn default() -> Self {
        Self {
            write_tool_ctd: "write_tool_ctd".to_string(),
            write_param_ctd: "write_param_ctd".to_string(),
            input_ctd: "input_ctd".to_string(),
            prefix: "--".to_string(),
        }
    }
}

/// A directive flag that was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveValue {
    /// Given without a file name.
    Flag,
    /// Given with a file name.
    File(String),
}

impl DirectiveValue {
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Flag => None,
            Self::File(path) => Some(path),
        }
    }
}

/// Result of [`parse_directives`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directives {
    pub write_tool_ctd: Option<DirectiveValue>,
    pub write_param_ctd: Option<DirectiveValue>,
    pub input_ctd: Option<DirectiveValue>,
    /// Tokens that are not part of a directive, in order.
    pub remainder: Vec<String>,
}

/// Scans tokens for the write-tool, write-values and load-values directives.
///
/// Works without a model. A directive followed by a value-like token (or
/// written `--name=file`) carries that file name; otherwise it is a bare
/// flag. Later occurrences win.
///
/// # Examples
///
/// ```
/// use ctd_params_core::{parse_directives, DirectiveNames, DirectiveValue};
///
/// let d = parse_directives(&["--k", "1", "--write_tool_ctd", "--input_ctd", "in.ctd"], &DirectiveNames::default());
/// assert_eq!(d.write_tool_ctd, Some(DirectiveValue::Flag));
/// assert_eq!(d.input_ctd, Some(DirectiveValue::File("in.ctd".into())));
/// assert_eq!(d.write_param_ctd, None);
/// assert_eq!(d.remainder, ["--k", "1"]);
/// ```
pub fn parse_directives<S: AsRef<str>>(tokens: &[S], names: &DirectiveNames) -> Directives {
    let write_tool = format!("{}{}", names.prefix, names.write_tool_ctd);
    let write_param = format!("{}{}", names.prefix, names.write_param_ctd);
    let input = format!("{}{}", names.prefix, names.input_ctd);

    let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
    let mut directives = Directives::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        i += 1;
        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (token, None),
        };
        let slot = if flag == write_tool {
            &mut directives.write_tool_ctd
        } else if flag == write_param {
            &mut directives.write_param_ctd
        } else if flag == input {
            &mut directives.input_ctd
        } else {
            directives.remainder.push(token.to_string());
            continue;
        };

        let value = match inline {
            Some(path) => DirectiveValue::File(path.to_string()),
            None => match tokens.get(i) {
                Some(next) if !is_option_like(next) && *next != "--" => {
                    i += 1;
                    DirectiveValue::File(next.to_string())
                }
                _ => DirectiveValue::Flag,
            },
        };
        *slot = Some(value);
    }
    directives
}
