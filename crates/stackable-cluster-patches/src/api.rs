//! Patch definitions as declared in a ClusterClass and the [`Generator`] abstraction.

use serde::{Deserialize, Serialize};

use crate::hooks::{GeneratePatchesRequest, GeneratePatchesResponse};

/// Generates patches for the templates of a cluster topology.
pub trait Generator {
    fn generate(&self, request: &GeneratePatchesRequest) -> GeneratePatchesResponse;
}

/// A named patch of a ClusterClass.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterClassPatch {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template which must render to `true` for the patch to be applied. The patch is always
    /// applied if it is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_if: Option<String>,

    #[serde(default)]
    pub definitions: Vec<PatchDefinition>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDefinition {
    pub selector: PatchSelector,

    #[serde(default)]
    pub json_patches: Vec<JsonPatch>,
}

/// Selects the templates a [`PatchDefinition`] is applied to.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSelector {
    pub api_version: String,
    pub kind: String,

    #[serde(default)]
    pub match_resources: PatchSelectorMatch,
}

/// The roles of a template within the cluster topology a selector is interested in. A template
/// matches if it matches any of them.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSelectorMatch {
    /// Selects the control plane and the infrastructure machine template of the control plane.
    #[serde(default)]
    pub control_plane: bool,

    /// Selects the infrastructure cluster.
    #[serde(default)]
    pub infrastructure_cluster: bool,

    /// Selects the bootstrap config and infrastructure machine templates of the listed
    /// MachineDeployment classes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_deployment_class: Option<MachineDeploymentClassMatch>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeploymentClassMatch {
    #[serde(default)]
    pub names: Vec<String>,
}

/// A single RFC 6902 operation, with its value set inline via `value` or calculated via
/// `valueFrom`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPatch {
    pub op: String,
    pub path: String,

    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<JsonPatchValue>,
}

impl JsonPatch {
    pub fn new(op: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.value_from
            .get_or_insert_with(JsonPatchValue::default)
            .variable = Some(variable.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.value_from
            .get_or_insert_with(JsonPatchValue::default)
            .template = Some(template.into());
        self
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPatchValue {
    /// Dotted path of the variable the value is read from, e.g. `builtin.cluster.name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,

    /// Template the value is rendered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

// An explicit `value: null` is a value and must not collapse into "not set".
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}
