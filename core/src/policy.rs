//! Enforcement levels for argument validation.
//!
//! A policy sets one [`Enforcement`] level for each of the three failure
//! classes checked by [`Model::validate`](crate::Model::validate). Policies
//! are plain serde types and can be kept in a YAML file.
//!
//! # Example YAML
//!
//! ```yaml
//! required: reject
//! types: warn
//! restrictions: ignore
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CtdError, Result};

/// What validation does when a check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Level 0: absorb the failure silently.
    #[default]
    Ignore,
    /// Level 1: log a warning and continue.
    Warn,
    /// Level 2: abort with an [`ArgumentError`](crate::ArgumentError).
    Reject,
}

impl TryFrom<u8> for Enforcement {
    type Error = CtdError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Self::Ignore),
            1 => Ok(Self::Warn),
            2 => Ok(Self::Reject),
            other => Err(CtdError::ModelParsing(format!(
                "enforcement level must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

/// One enforcement level per failure class.
///
/// The default ignores everything.
///
/// # Examples
///
/// ```
/// use ctd_params_core::{Enforcement, EnforcementPolicy};
///
/// let policy = EnforcementPolicy::new(Enforcement::Reject, Enforcement::Warn, Enforcement::Ignore);
/// let yaml = serde_yaml::to_string(&policy).unwrap();
/// assert!(yaml.contains("required: reject"));
///
/// let strict = EnforcementPolicy::from_levels(2, 2, 2).unwrap();
/// assert_eq!(strict, EnforcementPolicy::strict());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementPolicy {
    /// Required parameter absent from the arguments.
    pub required: Enforcement,
    /// Value that cannot be coerced to the parameter type.
    pub types: Enforcement,
    /// Value that fails the parameter's restriction.
    pub restrictions: Enforcement,
}

impl EnforcementPolicy {
    pub fn new(required: Enforcement, types: Enforcement, restrictions: Enforcement) -> Self {
        Self {
            required,
            types,
            restrictions,
        }
    }

    /// Builds a policy from numeric levels (0 ignore, 1 warn, 2 reject).
    pub fn from_levels(required: u8, types: u8, restrictions: u8) -> Result<Self> {
        Ok(Self::new(
            required.try_into()?,
            types.try_into()?,
            restrictions.try_into()?,
        ))
    }

    /// Rejects every failure class.
    pub fn strict() -> Self {
        Self::new(Enforcement::Reject, Enforcement::Reject, Enforcement::Reject)
    }

    /// Loads a policy from a YAML file; missing keys default to `ignore`.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](CtdError::Io) if the file cannot be read, or
    /// [`Yaml`](CtdError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let policy = serde_yaml::from_reader(reader)?;
        Ok(policy)
    }

    /// Saves the policy as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
