//! Variable handling: flattening variable lists into maps, merging global and item scoped
//! variables and reading (nested) values by their dotted path.

use std::{collections::BTreeMap, fmt};

use k8s_openapi::DeepMerge;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{OptionExt, ResultExt, Snafu};

use crate::hooks::Variable;

mod builtins;

pub use builtins::*;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("variable {name:?} does not exist"))]
    VariableNotFound { name: String },

    #[snafu(display("failed to parse value of variable {name:?}"))]
    ParseVariableValue {
        source: serde_json::Error,
        name: String,
    },

    #[snafu(display("field {field:?} of variable path {path:?} does not exist"))]
    FieldNotFound { field: String, path: String },

    #[snafu(display(
        "cannot access field {field:?} of variable path {path:?}: value is not an object"
    ))]
    NotAnObject { field: String, path: String },

    #[snafu(display(
        "cannot access index {index} of variable path {path:?}: value is not an array"
    ))]
    NotAnArray { index: usize, path: String },

    #[snafu(display("index {index} of variable path {path:?} is out of bounds"))]
    IndexOutOfBounds { index: usize, path: String },

    #[snafu(display("invalid array index in segment {segment:?} of variable path {path:?}"))]
    InvalidArrayIndex { segment: String, path: String },
}

#[derive(Debug, Snafu)]
pub enum MergeError {
    #[snafu(display("failed to parse builtin variable"))]
    ParseBuiltins { source: serde_json::Error },

    #[snafu(display("failed to serialize merged builtin variable"))]
    SerializeBuiltins { source: serde_json::Error },
}

/// Variables by name.
pub type VariableMap = BTreeMap<String, VariableValue>;

/// The value of a variable, kept in its serialized JSON form.
///
/// Values are only parsed when they are actually needed, e.g. for rendering templates.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableValue {
    raw: String,
}

impl VariableValue {
    /// Wraps already serialized JSON. The input is not validated, parsing happens lazily in
    /// [`VariableValue::to_value`].
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            raw: value.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.raw)
    }
}

impl From<serde_json::Value> for VariableValue {
    fn from(value: serde_json::Value) -> Self {
        Self::from_value(&value)
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for VariableValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VariableValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

/// Converts a list of variables into a [`VariableMap`]. Later variables win if a name is used
/// more than once.
pub fn to_map(variables: &[Variable]) -> VariableMap {
    variables
        .iter()
        .map(|variable| (variable.name.clone(), variable.value.clone()))
        .collect()
}

/// Merges variable maps, variables of later maps take precedence.
///
/// The [`BUILTINS_NAME`] variable is merged field by field instead of being replaced, so that
/// for example the global `builtin.cluster` and the item scoped `builtin.machineDeployment`
/// both end up in the merged builtins.
pub fn merge_variable_maps(variable_maps: &[&VariableMap]) -> Result<VariableMap, MergeError> {
    let mut merged = VariableMap::new();

    for variable_map in variable_maps {
        for (name, value) in *variable_map {
            let merged_value = match merged.get(name) {
                Some(existing) if name == BUILTINS_NAME => merge_builtins(existing, value)?,
                _ => value.clone(),
            };
            merged.insert(name.clone(), merged_value);
        }
    }

    Ok(merged)
}

fn merge_builtins(
    current: &VariableValue,
    other: &VariableValue,
) -> Result<VariableValue, MergeError> {
    let mut builtins = parse_builtins(current)?;
    builtins.merge_from(parse_builtins(other)?);

    serde_json::to_string(&builtins)
        .map(VariableValue::from_raw)
        .context(SerializeBuiltinsSnafu)
}

/// A `null` builtin variable is treated like an empty one.
fn parse_builtins(value: &VariableValue) -> Result<Builtins, MergeError> {
    let builtins: Option<Builtins> =
        serde_json::from_str(value.raw()).context(ParseBuiltinsSnafu)?;
    Ok(builtins.unwrap_or_default())
}

/// Returns the value at the dotted `path`, e.g. `builtin.cluster.name`.
///
/// The first segment of the path is the variable name, the following ones select fields of
/// nested objects. Array elements are selected with an index suffix, e.g. `nodes[0].name`.
pub fn get_variable_value(variables: &VariableMap, path: &str) -> Result<VariableValue> {
    let (first, rest) = match path.split_once('.') {
        Some((first, rest)) => (first, Some(rest)),
        None => (path, None),
    };

    let (name, index) = parse_segment(first, path)?;
    let variable = variables
        .get(name)
        .context(VariableNotFoundSnafu { name })?;

    if index.is_none() && rest.is_none() {
        return Ok(variable.clone());
    }

    let mut value = variable
        .to_value()
        .context(ParseVariableValueSnafu { name })?;
    if let Some(index) = index {
        value = element_at(value, index, path)?;
    }

    for segment in rest.into_iter().flat_map(|rest| rest.split('.')) {
        let (field, index) = parse_segment(segment, path)?;
        value = match value {
            serde_json::Value::Object(mut object) => {
                object.remove(field).context(FieldNotFoundSnafu { field, path })?
            }
            _ => return NotAnObjectSnafu { field, path }.fail(),
        };
        if let Some(index) = index {
            value = element_at(value, index, path)?;
        }
    }

    Ok(VariableValue::from(value))
}

/// Splits a path segment like `nodes[2]` into its name and optional index.
fn parse_segment<'a>(segment: &'a str, path: &str) -> Result<(&'a str, Option<usize>)> {
    let Some((name, index)) = segment.split_once('[') else {
        return Ok((segment, None));
    };

    index
        .strip_suffix(']')
        .and_then(|index| index.parse().ok())
        .map(|index| (name, Some(index)))
        .context(InvalidArrayIndexSnafu { segment, path })
}

fn element_at(value: serde_json::Value, index: usize, path: &str) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::Array(mut elements) => {
            if index < elements.len() {
                Ok(elements.swap_remove(index))
            } else {
                IndexOutOfBoundsSnafu { index, path }.fail()
            }
        }
        _ => NotAnArraySnafu { index, path }.fail(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn variables(value: serde_json::Value) -> VariableMap {
        serde_json::from_value(value).expect("test variables are valid")
    }

    #[test]
    fn to_map_last_variable_wins() {
        let map = to_map(&[
            Variable::new("replicas", json!(1).into()),
            Variable::new("name", json!("demo").into()),
            Variable::new("replicas", json!(3).into()),
        ]);

        assert_eq!(map.len(), 2);
        assert_eq!(map["replicas"].raw(), "3");
        assert_eq!(map["name"].raw(), r#""demo""#);
    }

    #[test]
    fn merge_overrides_plain_variables() {
        let global = variables(json!({"a": 1, "b": {"x": 1, "y": 2}}));
        let item = variables(json!({"b": {"x": 2}, "c": true}));

        let merged = merge_variable_maps(&[&global, &item]).expect("merge succeeds");

        assert_eq!(merged, variables(json!({"a": 1, "b": {"x": 2}, "c": true})));
    }

    #[test]
    fn merge_deep_merges_builtins() {
        let global = variables(json!({
            "builtin": {"cluster": {"name": "demo", "namespace": "default"}},
        }));
        let item = variables(json!({
            "builtin": {
                "cluster": {"namespace": "other"},
                "machineDeployment": {"class": "default-worker"},
            },
        }));

        let merged = merge_variable_maps(&[&global, &item]).expect("merge succeeds");

        assert_eq!(
            merged["builtin"].to_value().expect("merged builtins are valid JSON"),
            json!({
                "cluster": {"name": "demo", "namespace": "other"},
                "machineDeployment": {"class": "default-worker"},
            })
        );
    }

    #[test]
    fn merge_keeps_single_builtin_untouched() {
        let raw = r#"{"cluster": {"name": "demo", "unknown": 1}}"#;
        let global = VariableMap::from([("builtin".to_owned(), VariableValue::from_raw(raw))]);

        let merged = merge_variable_maps(&[&global, &VariableMap::new()]).expect("merge succeeds");

        assert_eq!(merged["builtin"].raw(), raw);
    }

    #[rstest]
    #[case(json!({"cluster": {"name": "demo"}}), json!(null))]
    #[case(json!(null), json!({"cluster": {"name": "demo"}}))]
    fn merge_treats_null_builtin_as_empty(
        #[case] global_builtin: serde_json::Value,
        #[case] item_builtin: serde_json::Value,
    ) {
        let global = variables(json!({ "builtin": global_builtin }));
        let item = variables(json!({ "builtin": item_builtin }));

        let merged = merge_variable_maps(&[&global, &item]).expect("merge succeeds");

        assert_eq!(merged["builtin"].raw(), r#"{"cluster":{"name":"demo"}}"#);
    }

    #[rstest]
    #[case(json!("not-an-object"))]
    #[case(json!({"cluster": {"name": 42}}))]
    #[case(json!({"controlPlane": {"replicas": "three"}}))]
    fn merge_fails_on_invalid_builtins(#[case] builtin: serde_json::Value) {
        let global = variables(json!({"builtin": {"cluster": {"name": "demo"}}}));
        let item = variables(json!({ "builtin": builtin }));

        let err = merge_variable_maps(&[&global, &item]).expect_err("merge must fail");
        assert!(matches!(err, MergeError::ParseBuiltins { .. }));
    }

    #[rstest]
    #[case("replicas", "3")]
    #[case("builtin", r#"{"cluster":{"name":"demo"},"machineDeployment":{"class":"default-worker"}}"#)]
    #[case("builtin.cluster.name", r#""demo""#)]
    #[case("builtin.machineDeployment.class", r#""default-worker""#)]
    #[case("nodes[1]", r#"{"name":"b"}"#)]
    #[case("nodes[0].name", r#""a""#)]
    #[case("nested.list[2]", "true")]
    fn get_variable_value_pass(#[case] path: &str, #[case] expected: &str) {
        let variables = variables(json!({
            "replicas": 3,
            "builtin": {
                "cluster": {"name": "demo"},
                "machineDeployment": {"class": "default-worker"},
            },
            "nodes": [{"name": "a"}, {"name": "b"}],
            "nested": {"list": [false, false, true]},
        }));

        let value = get_variable_value(&variables, path).expect("variable path exists");
        assert_eq!(value.raw(), expected);
    }

    #[test]
    fn get_variable_value_returns_raw_value() {
        let variables = VariableMap::from([(
            "spaced".to_owned(),
            VariableValue::from_raw(r#"{ "a" : 1 }"#),
        )]);

        let value = get_variable_value(&variables, "spaced").expect("variable exists");
        assert_eq!(value.raw(), r#"{ "a" : 1 }"#);
    }

    #[rstest]
    #[case("missing")]
    #[case("builtin.controlPlane.name")]
    #[case("builtin.cluster.name.first")]
    #[case("nodes[5]")]
    #[case("replicas[0]")]
    #[case("nodes[x]")]
    #[case("nodes[1")]
    fn get_variable_value_fail(#[case] path: &str) {
        let variables = variables(json!({
            "replicas": 3,
            "builtin": {"cluster": {"name": "demo"}},
            "nodes": [{"name": "a"}],
        }));

        assert!(get_variable_value(&variables, path).is_err());
    }

    #[test]
    fn get_variable_value_fails_on_malformed_value() {
        let variables = VariableMap::from([(
            "broken".to_owned(),
            VariableValue::from_raw("{not json"),
        )]);

        let err = get_variable_value(&variables, "broken.field").expect_err("lookup must fail");
        assert!(matches!(err, Error::ParseVariableValue { .. }));
    }
}
