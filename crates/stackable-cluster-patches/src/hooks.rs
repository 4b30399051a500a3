//! Request and response types of the generate patches hook.
//!
//! These mirror the wire format used by topology controllers when asking patch generators for
//! patches: a request carries global variables and one item per template, the response carries
//! one JSON patch per matching patch definition and item.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use kube::core::DynamicObject;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::variables::VariableValue;

/// A named variable, either global or scoped to a single request item.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: VariableValue,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: VariableValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Describes where in the cluster topology the object of a request item is referenced, e.g.
/// `Cluster` `spec.infrastructureRef`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderReference {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    pub field_path: String,
}

impl HolderReference {
    pub fn new(kind: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            field_path: field_path.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePatchesRequestItem {
    pub uid: String,
    pub holder_reference: HolderReference,
    pub object: DynamicObject,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePatchesRequest {
    /// Variables which apply to every item.
    #[serde(default)]
    pub variables: Vec<Variable>,

    #[serde(default)]
    pub items: Vec<GeneratePatchesRequestItem>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum PatchType {
    #[default]
    #[serde(rename = "JSONPatch")]
    JsonPatch,

    #[serde(rename = "JSONMergePatch")]
    JsonMergePatch,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePatchesResponseItem {
    pub uid: String,
    pub patch_type: PatchType,

    /// The rendered patch. Encoded as base64 on the wire.
    #[serde(serialize_with = "serialize_bytes", deserialize_with = "deserialize_bytes")]
    pub patch: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ResponseStatus {
    #[default]
    Success,
    Failure,
}

/// Either the list of generated patches or a single failure message, never both.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePatchesResponse {
    pub status: ResponseStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default)]
    pub items: Vec<GeneratePatchesResponseItem>,
}

impl GeneratePatchesResponse {
    pub fn success(items: Vec<GeneratePatchesResponseItem>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: String::new(),
            items,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failure,
            message: message.into(),
            items: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

impl<E: std::fmt::Display> From<Result<Vec<GeneratePatchesResponseItem>, E>>
    for GeneratePatchesResponse
{
    fn from(result: Result<Vec<GeneratePatchesResponseItem>, E>) -> Self {
        match result {
            Ok(items) => Self::success(items),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}

fn serialize_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

fn deserialize_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded)
        .map_err(serde::de::Error::custom)
}
