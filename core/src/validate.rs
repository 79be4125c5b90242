//! Argument validation and normalization.
//!
//! [`Model::validate`] walks every parameter of the schema in order, looks up
//! its lineage in the argument dictionary and builds a fresh, normalized
//! dictionary. Three independent failure classes (missing required value,
//! wrong type, restriction violation) are each handled according to the
//! [`EnforcementPolicy`].
//!
//! # Examples
//!
//! ```
//! use ctd_params_core::*;
//!
//! let mut model = Model::new("tool", "1.0");
//! model
//!     .add("threads", ParamSpec::new(ParamType::Int).with_default(1).with_num_range(Some(Value::Int(1)), None))
//!     .unwrap();
//! model.add("input", ParamSpec::new(ParamType::InputFile).required()).unwrap();
//!
//! let mut args = ArgDict::new();
//! args.insert("threads".into(), ArgValue::from("4"));
//! args.insert("input".into(), ArgValue::from("reads.fastq"));
//!
//! let validated = model.validate(&args, EnforcementPolicy::strict()).unwrap();
//! assert_eq!(validated["threads"], ArgValue::from(4));
//!
//! // Missing required argument under a rejecting policy
//! let err = model.validate(&ArgDict::new(), EnforcementPolicy::strict()).unwrap_err();
//! assert!(matches!(err, CtdError::Argument(ArgumentError::Missing { .. })));
//! ```

use thiserror::Error;
use tracing::warn;

use crate::dict;
use crate::error::Result;
use crate::model::Model;
use crate::parameter::Parameter;
use crate::policy::{Enforcement, EnforcementPolicy};
use crate::types::{ArgDict, ArgValue, ParamType};

/// A single argument failure, named by the parameter's colon-joined lineage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    /// A required parameter has no value.
    #[error("required argument {name} is missing")]
    Missing { name: String },
    /// The value cannot be read as the parameter type.
    #[error("{name} {value} is not a valid {expected}")]
    Type {
        name: String,
        expected: ParamType,
        value: ArgValue,
    },
    /// The value fails the parameter's restriction.
    #[error("{name} {value} does not conform to restriction: {restriction}")]
    Restriction {
        name: String,
        restriction: String,
        value: ArgValue,
    },
}

impl ArgumentError {
    /// Lineage of the offending parameter (`g1:g2:p3`).
    pub fn name(&self) -> &str {
        match self {
            Self::Missing { name } | Self::Type { name, .. } | Self::Restriction { name, .. } => {
                name
            }
        }
    }
}

/// Normalized arguments plus every failure absorbed at [`Enforcement::Warn`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationOutcome {
    pub args: ArgDict,
    pub warnings: Vec<ArgumentError>,
}

impl Model {
    /// Validates `args` against the schema and returns the normalized copy.
    ///
    /// Present values are coerced to their parameter type; absent optional
    /// parameters receive their default; absent required parameters are
    /// omitted unless the policy rejects them. The input is never mutated.
    ///
    /// # Errors
    ///
    /// [`CtdError::Argument`](crate::CtdError::Argument) for the first
    /// failure whose class is set to [`Enforcement::Reject`].
    pub fn validate(&self, args: &ArgDict, policy: EnforcementPolicy) -> Result<ArgDict> {
        Ok(self.validate_report(args, policy)?.args)
    }

    /// Like [`validate`](Self::validate), also returning the warnings.
    pub fn validate_report(
        &self,
        args: &ArgDict,
        policy: EnforcementPolicy,
    ) -> Result<ValidationOutcome> {
        let mut outcome = ValidationOutcome::default();

        for param in self.list_parameters() {
            match dict::get(args, param.lineage()) {
                Some(value) => {
                    let value = check_argument(param, value, policy, &mut outcome.warnings)?;
                    dict::set(&mut outcome.args, param.lineage(), value);
                }
                None if param.is_required() => enforce(
                    policy.required,
                    ArgumentError::Missing {
                        name: param.joined_lineage(),
                    },
                    &mut outcome.warnings,
                )?,
                None => {
                    if let Some(default) = param.default_value() {
                        dict::set(&mut outcome.args, param.lineage(), default.clone());
                    }
                }
            }
        }

        Ok(outcome)
    }
}

fn check_argument(
    param: &Parameter,
    value: &ArgValue,
    policy: EnforcementPolicy,
    warnings: &mut Vec<ArgumentError>,
) -> Result<ArgValue> {
    let value = match coerce(param, value) {
        Some(coerced) => coerced,
        None => {
            enforce(
                policy.types,
                ArgumentError::Type {
                    name: param.joined_lineage(),
                    expected: param.param_type(),
                    value: value.clone(),
                },
                warnings,
            )?;
            value.clone()
        }
    };

    if let Some(restriction) = param.restriction() {
        if !restriction.check(&value) {
            enforce(
                policy.restrictions,
                ArgumentError::Restriction {
                    name: param.joined_lineage(),
                    restriction: restriction.to_string(),
                    value: value.clone(),
                },
                warnings,
            )?;
        }
    }

    Ok(value)
}

/// Coerces a value to the parameter's type and shape.
///
/// A scalar given for a list parameter becomes a one-element list; a list
/// for a scalar parameter, or a nested dictionary, has no reading.
fn coerce(param: &Parameter, value: &ArgValue) -> Option<ArgValue> {
    let ty = param.param_type();
    match (param.is_list(), value) {
        (true, ArgValue::List(items)) => items
            .iter()
            .map(|v| v.coerce(ty))
            .collect::<Option<Vec<_>>>()
            .map(ArgValue::List),
        (true, ArgValue::Scalar(v)) => v.coerce(ty).map(|v| ArgValue::List(vec![v])),
        (false, ArgValue::Scalar(v)) => v.coerce(ty).map(ArgValue::Scalar),
        _ => None,
    }
}

fn enforce(
    level: Enforcement,
    error: ArgumentError,
    warnings: &mut Vec<ArgumentError>,
) -> Result<()> {
    match level {
        Enforcement::Ignore => Ok(()),
        Enforcement::Warn => {
            warn!(parameter = error.name(), "{error}");
            warnings.push(error);
            Ok(())
        }
        Enforcement::Reject => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CtdError;
    use crate::parameter::ParamSpec;
    use crate::types::Value;

    fn policy(level: Enforcement) -> EnforcementPolicy {
        EnforcementPolicy::new(level, level, level)
    }

    fn args(entries: &[(&str, ArgValue)]) -> ArgDict {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn nested_model() -> Model {
        let mut model = Model::new("tool", "1.0");
        let g1 = model.add_group("g1", None).unwrap();
        let g2 = model.add_group_to(g1, "g2", None).unwrap();
        model
            .add_to(g2, "p3", ParamSpec::new(ParamType::Int).required())
            .unwrap();
        model
    }

    #[test]
    fn test_missing_required_at_each_level() {
        let model = nested_model();
        let empty = ArgDict::new();

        let ignored = model.validate_report(&empty, policy(Enforcement::Ignore)).unwrap();
        assert!(ignored.args.is_empty());
        assert!(ignored.warnings.is_empty());

        let warned = model.validate_report(&empty, policy(Enforcement::Warn)).unwrap();
        assert!(warned.args.is_empty());
        assert_eq!(
            warned.warnings,
            vec![ArgumentError::Missing {
                name: "g1:g2:p3".into()
            }]
        );

        let err = model.validate(&empty, policy(Enforcement::Reject)).unwrap_err();
        match err {
            CtdError::Argument(ArgumentError::Missing { name }) => assert_eq!(name, "g1:g2:p3"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_optional_missing_gets_default() {
        let mut model = Model::new("tool", "1.0");
        model
            .add("k", ParamSpec::new(ParamType::Float).with_default(0.5))
            .unwrap();
        model.add("no_default", ParamSpec::new(ParamType::String)).unwrap();

        let validated = model.validate(&ArgDict::new(), policy(Enforcement::Reject)).unwrap();
        assert_eq!(validated, args(&[("k", ArgValue::from(0.5))]));
    }

    #[test]
    fn test_type_failure_keeps_original_value() {
        let mut model = Model::new("tool", "1.0");
        model.add("n", ParamSpec::new(ParamType::Int)).unwrap();
        let input = args(&[("n", ArgValue::from("many"))]);

        let outcome = model.validate_report(&input, policy(Enforcement::Warn)).unwrap();
        assert_eq!(outcome.args["n"], ArgValue::from("many"));
        assert!(matches!(outcome.warnings[0], ArgumentError::Type { expected: ParamType::Int, .. }));

        let err = model.validate(&input, policy(Enforcement::Reject)).unwrap_err();
        assert!(matches!(err, CtdError::Argument(ArgumentError::Type { .. })));
    }

    #[test]
    fn test_restriction_checked_on_coerced_list() {
        let mut model = Model::new("tool", "1.0");
        model
            .add(
                "ks",
                ParamSpec::new(ParamType::Int)
                    .list()
                    .with_num_range(Some(Value::Int(0)), Some(Value::Int(10))),
            )
            .unwrap();

        let ok = args(&[("ks", ArgValue::from(vec!["0", "10"]))]);
        let validated = model.validate(&ok, policy(Enforcement::Reject)).unwrap();
        assert_eq!(validated["ks"], ArgValue::from(vec![0, 10]));

        let bad = args(&[("ks", ArgValue::from(vec!["3", "11"]))]);
        let err = model.validate(&bad, policy(Enforcement::Reject)).unwrap_err();
        assert!(matches!(err, CtdError::Argument(ArgumentError::Restriction { .. })));

        let outcome = model.validate_report(&bad, policy(Enforcement::Ignore)).unwrap();
        assert_eq!(outcome.args["ks"], ArgValue::from(vec![3, 11]));
    }

    #[test]
    fn test_scalar_for_list_parameter_is_wrapped() {
        let mut model = Model::new("tool", "1.0");
        model.add("xs", ParamSpec::new(ParamType::Float).list()).unwrap();
        let validated = model
            .validate(&args(&[("xs", ArgValue::from("2"))]), policy(Enforcement::Reject))
            .unwrap();
        assert_eq!(validated["xs"], ArgValue::from(vec![2.0]));
    }

    #[test]
    fn test_boolean_strings() {
        let mut model = Model::new("tool", "1.0");
        for name in ["a", "b", "c", "d"] {
            model.add(name, ParamSpec::new(ParamType::Boolean)).unwrap();
        }
        let input = args(&[
            ("a", ArgValue::from("false")),
            ("b", ArgValue::from("True")),
            ("c", ArgValue::from("1")),
            ("d", ArgValue::from("true")),
        ]);
        let validated = model.validate(&input, policy(Enforcement::Reject)).unwrap();
        let flags: Vec<_> = validated.values().cloned().collect();
        assert_eq!(
            flags,
            vec![
                ArgValue::from(false),
                ArgValue::from(true),
                ArgValue::from(true),
                ArgValue::from(true)
            ]
        );
    }

    #[test]
    fn test_validation_is_idempotent_and_pure() {
        let model = nested_model();
        let mut input = ArgDict::new();
        dict::set(&mut input, &["g1", "g2", "p3"], ArgValue::from("7"));
        let before = input.clone();

        let once = model.validate(&input, policy(Enforcement::Reject)).unwrap();
        let twice = model.validate(&once, policy(Enforcement::Reject)).unwrap();
        assert_eq!(once, twice);
        assert_eq!(input, before);
        assert_eq!(dict::get(&once, &["g1", "g2", "p3"]), Some(&ArgValue::from(7)));
    }

    #[test]
    fn test_unknown_arguments_are_dropped() {
        let mut model = Model::new("tool", "1.0");
        model.add("known", ParamSpec::default()).unwrap();
        let input = args(&[("known", ArgValue::from("x")), ("other", ArgValue::from("y"))]);
        let validated = model.validate(&input, policy(Enforcement::Reject)).unwrap();
        assert_eq!(validated, args(&[("known", ArgValue::from("x"))]));
    }
}
