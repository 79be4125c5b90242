//! Declarative parameter schemas for command-line tools, stored as CTD.
//!
//! This crate models a tool's parameters as a tree:
//!
//! - [`Model`]: tool name, version and [`ToolMetadata`] plus the
//!   [`ParameterTree`] of groups and parameters.
//! - [`Parameter`]: a typed leaf ([`ParamType`]) with an optional default,
//!   [`Restriction`], tags and description, declared through [`ParamSpec`].
//! - [`ParameterGroup`]: a named namespace of parameters and nested groups.
//!
//! The same data moves between four forms: the schema itself, nested
//! argument dictionaries ([`ArgDict`], see [`dict`]), CTD XML documents
//! ([`Model::write_document`], [`Model::load_from_document`],
//! [`args_from_file`]) and command-line tokens
//! ([`Model::parse_command_line`], [`parse_directives`]).
//! [`Model::validate`] coerces and checks dictionaries under an
//! [`EnforcementPolicy`].
//!
//! # Example
//!
//! ```
//! use ctd_params_core::*;
//!
//! let mut model = Model::new("exampleTool", "1.0");
//! let io = model.add_group("io", Some("Input and output")).unwrap();
//! model
//!     .add_to(io, "reads", ParamSpec::new(ParamType::InputFile).required().with_file_formats(["fastq", "fastq.gz"]))
//!     .unwrap();
//! model
//!     .add("threads", ParamSpec::new(ParamType::Int).with_default(1).with_num_range(Some(Value::Int(1)), None))
//!     .unwrap();
//!
//! let parsed = model.parse_command_line(&["--io:reads", "a.fastq.gz", "--threads", "4"], "--");
//! let args = model.validate(&parsed.args, EnforcementPolicy::strict()).unwrap();
//! assert_eq!(args["threads"], ArgValue::from(4));
//!
//! // Serialize the schema with the validated values, then read them back.
//! let xml = model.to_document_string(Some(&args), None).unwrap();
//! let restored = model.validate(&args_from_document_str(&xml).unwrap(), EnforcementPolicy::strict()).unwrap();
//! assert_eq!(restored, args);
//! ```

mod cmdline;
mod codec;
pub mod dict;
mod document;
mod error;
mod metadata;
mod model;
mod parameter;
mod policy;
mod restriction;
mod tree;
mod types;
mod validate;

pub use cmdline::{DirectiveNames, DirectiveValue, Directives, ParsedCommandLine, parse_directives};
pub use codec::{args_from_document, args_from_document_str, args_from_file};
pub use document::Element;
pub use error::{CtdError, Result};
pub use metadata::{ExecutionLog, ToolMetadata};
pub use model::{Model, ModelOrigin, ROOT_GROUP_NAME};
pub use parameter::{ConstructionMode, ParamSpec, Parameter};
pub use policy::{Enforcement, EnforcementPolicy};
pub use restriction::{Choices, FileFormat, NumericRange, Restriction};
pub use tree::{Child, DuplicatePolicy, GroupId, ParamId, ParameterGroup, ParameterTree};
pub use types::*;
pub use validate::{ArgumentError, ValidationOutcome};
