//! Helpers for nested argument dictionaries.
//!
//! Argument dictionaries mirror the group/parameter tree: a parameter with
//! lineage `["g1", "g2", "p3"]` lives at `args["g1"]["g2"]["p3"]`. These
//! functions address such paths directly, flatten dictionaries into
//! path-keyed or colon-keyed maps, and merge several dictionaries with the
//! rightmost one winning.
//!
//! # Example
//!
//! ```
//! use ctd_params_core::dict::{get, override_args, set};
//! use ctd_params_core::{ArgDict, ArgValue};
//!
//! let mut from_file = ArgDict::new();
//! set(&mut from_file, &["run", "threads"], ArgValue::from("2"));
//! set(&mut from_file, &["run", "mode"], ArgValue::from("fast"));
//!
//! let mut from_cli = ArgDict::new();
//! set(&mut from_cli, &["run", "threads"], ArgValue::from("8"));
//!
//! let merged = override_args(&[&from_file, &from_cli]);
//! assert_eq!(get(&merged, &["run", "threads"]), Some(&ArgValue::from("8")));
//! assert_eq!(get(&merged, &["run", "mode"]), Some(&ArgValue::from("fast")));
//! ```

use indexmap::IndexMap;

use crate::types::{ArgDict, ArgValue};

/// Separator used for flat, colon-joined keys (`group:subgroup:param`).
pub const KEY_SEPARATOR: char = ':';

/// Looks up the value at `path`.
///
/// Returns `None` if any segment is missing or an intermediate value is not
/// a nested dictionary.
pub fn get<'a, S: AsRef<str>>(dict: &'a ArgDict, path: &[S]) -> Option<&'a ArgValue> {
    let (last, parents) = path.split_last()?;
    let mut current = dict;
    for key in parents {
        current = current.get(key.as_ref())?.as_group()?;
    }
    current.get(last.as_ref())
}

/// Inserts `value` at `path`, creating intermediate dictionaries as needed.
///
/// An intermediate entry that is not a dictionary is replaced by one. An
/// empty `path` leaves `dict` untouched.
pub fn set<S: AsRef<str>>(dict: &mut ArgDict, path: &[S], value: ArgValue) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = dict;
    for key in parents {
        let entry = current
            .entry(key.as_ref().to_string())
            .or_insert_with(|| ArgValue::Group(ArgDict::new()));
        if !matches!(entry, ArgValue::Group(_)) {
            *entry = ArgValue::Group(ArgDict::new());
        }
        let ArgValue::Group(next) = entry else {
            unreachable!("entry was just made a group");
        };
        current = next;
    }
    current.insert(last.as_ref().to_string(), value);
}

/// Flattens `dict` into a map keyed by full key paths.
///
/// Only non-dictionary values become entries; empty nested dictionaries
/// vanish.
///
/// # Examples
///
/// ```
/// use ctd_params_core::dict::{flatten, set};
/// use ctd_params_core::{ArgDict, ArgValue};
///
/// let mut args = ArgDict::new();
/// set(&mut args, &["g", "p"], ArgValue::from(1));
/// let flat = flatten(&args);
/// assert_eq!(flat[&vec!["g".to_string(), "p".to_string()]], ArgValue::from(1));
/// ```
pub fn flatten(dict: &ArgDict) -> IndexMap<Vec<String>, ArgValue> {
    let mut result = IndexMap::new();
    let mut prefix = Vec::new();
    flatten_into(dict, &mut prefix, &mut result);
    result
}

fn flatten_into(
    dict: &ArgDict,
    prefix: &mut Vec<String>,
    result: &mut IndexMap<Vec<String>, ArgValue>,
) {
    for (key, value) in dict {
        prefix.push(key.clone());
        match value {
            ArgValue::Group(nested) => flatten_into(nested, prefix, result),
            leaf => {
                result.insert(prefix.clone(), leaf.clone());
            }
        }
        prefix.pop();
    }
}

/// Flattens `dict` into a map keyed by colon-joined paths (`g1:g2:p3`).
pub fn flatten_joined(dict: &ArgDict) -> IndexMap<String, ArgValue> {
    let separator = KEY_SEPARATOR.to_string();
    flatten(dict)
        .into_iter()
        .map(|(path, value)| (path.join(&separator), value))
        .collect()
}

/// Rebuilds a nested dictionary from path-keyed entries.
///
/// Accepts the output of either [`flatten`] (path keys) or
/// [`flatten_joined`] (colon keys, split on [`KEY_SEPARATOR`]).
pub fn unflatten<I, K>(entries: I) -> ArgDict
where
    I: IntoIterator<Item = (K, ArgValue)>,
    K: FlatKey,
{
    let mut result = ArgDict::new();
    for (key, value) in entries {
        set(&mut result, &key.segments(), value);
    }
    result
}

/// Key types accepted by [`unflatten`].
pub trait FlatKey {
    fn segments(&self) -> Vec<String>;
}

impl FlatKey for Vec<String> {
    fn segments(&self) -> Vec<String> {
        self.clone()
    }
}

impl FlatKey for String {
    fn segments(&self) -> Vec<String> {
        self.split(KEY_SEPARATOR).map(str::to_string).collect()
    }
}

impl FlatKey for &str {
    fn segments(&self) -> Vec<String> {
        self.split(KEY_SEPARATOR).map(str::to_string).collect()
    }
}

/// Combines any number of dictionaries; later dictionaries win per leaf.
///
/// Merging happens at leaf granularity: a nested group present in two
/// inputs keeps the leaves of both.
///
/// # Examples
///
/// ```
/// use ctd_params_core::dict::override_args;
/// use ctd_params_core::{ArgDict, ArgValue};
///
/// let a: ArgDict = [("a".to_string(), ArgValue::from(1)), ("b".to_string(), ArgValue::from(2))]
///     .into_iter()
///     .collect();
/// let b: ArgDict = [("b".to_string(), ArgValue::from(3)), ("c".to_string(), ArgValue::from(4))]
///     .into_iter()
///     .collect();
///
/// let merged = override_args(&[&a, &b]);
/// assert_eq!(merged["a"], ArgValue::from(1));
/// assert_eq!(merged["b"], ArgValue::from(3));
/// assert_eq!(merged["c"], ArgValue::from(4));
/// ```
pub fn override_args(dicts: &[&ArgDict]) -> ArgDict {
    let mut combined: IndexMap<Vec<String>, ArgValue> = IndexMap::new();
    for dict in dicts {
        combined.extend(flatten(dict));
    }
    unflatten(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(entries: &[(&str, ArgValue)]) -> ArgDict {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_get_walks_nested_groups() {
        let mut args = ArgDict::new();
        set(&mut args, &["g1", "g2", "p3"], ArgValue::from("x"));

        assert_eq!(get(&args, &["g1", "g2", "p3"]), Some(&ArgValue::from("x")));
        assert!(get(&args, &["g1", "missing"]).is_none());
        assert!(get(&args, &["g1", "g2", "p3", "deeper"]).is_none());
        assert!(get::<&str>(&args, &[]).is_none());
    }

    #[test]
    fn test_set_replaces_scalar_intermediate() {
        let mut args = dict(&[("g", ArgValue::from(1))]);
        set(&mut args, &["g", "p"], ArgValue::from(2));
        assert_eq!(get(&args, &["g", "p"]), Some(&ArgValue::from(2)));
    }

    #[test]
    fn test_override_is_rightmost_wins() {
        let a = dict(&[("a", ArgValue::from(1)), ("b", ArgValue::from(2))]);
        let b = dict(&[("b", ArgValue::from(3)), ("c", ArgValue::from(4))]);

        let merged = override_args(&[&a, &b]);
        let expected = dict(&[
            ("a", ArgValue::from(1)),
            ("b", ArgValue::from(3)),
            ("c", ArgValue::from(4)),
        ]);
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_override_merges_nested_groups_leafwise() {
        let mut a = ArgDict::new();
        set(&mut a, &["g", "x"], ArgValue::from(1));
        set(&mut a, &["g", "y"], ArgValue::from(2));
        let mut b = ArgDict::new();
        set(&mut b, &["g", "y"], ArgValue::from(20));

        let merged = override_args(&[&a, &b]);
        assert_eq!(get(&merged, &["g", "x"]), Some(&ArgValue::from(1)));
        assert_eq!(get(&merged, &["g", "y"]), Some(&ArgValue::from(20)));
    }

    #[test]
    fn test_flatten_joined_and_unflatten_are_inverse() {
        let mut args = ArgDict::new();
        set(&mut args, &["top"], ArgValue::from(vec![1, 2]));
        set(&mut args, &["g1", "g2", "p3"], ArgValue::from("v"));

        let flat = flatten_joined(&args);
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["top", "g1:g2:p3"]);
        assert_eq!(unflatten(flat), args);
    }
}
