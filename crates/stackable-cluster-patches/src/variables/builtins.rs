//! The schema of the `builtin` variable.
//!
//! Builtins are provided by the topology controller and describe the cluster, the control plane
//! and (for MachineDeployment templates) the MachineDeployment the template belongs to. Global
//! and item variables both carry a partial builtin object, which is why builtins are merged
//! field by field with [`DeepMerge`] instead of being replaced as a whole.

use k8s_openapi::DeepMerge;
use serde::{Deserialize, Serialize};

/// Name of the variable holding the [`Builtins`].
pub const BUILTINS_NAME: &str = "builtin";

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Builtins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterBuiltins>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ControlPlaneBuiltins>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_deployment: Option<MachineDeploymentBuiltins>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<ClusterTopologyBuiltins>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<ClusterNetworkBuiltins>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTopologyBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_template: Option<ControlPlaneMachineTemplateBuiltins>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneMachineTemplateBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<TemplateRefBuiltins>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeploymentBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<MachineBootstrapBuiltins>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<TemplateRefBuiltins>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineBootstrapBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_ref: Option<TemplateRefBuiltins>,
}

/// Reference to a template by name.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRefBuiltins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// Lists are atomic, a later list replaces an earlier one.
fn merge_atomic_list(current: &mut Option<Vec<String>>, other: Option<Vec<String>>) {
    if other.is_some() {
        *current = other;
    }
}

impl DeepMerge for Builtins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.cluster, other.cluster);
        DeepMerge::merge_from(&mut self.control_plane, other.control_plane);
        DeepMerge::merge_from(&mut self.machine_deployment, other.machine_deployment);
    }
}

impl DeepMerge for ClusterBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.name, other.name);
        DeepMerge::merge_from(&mut self.namespace, other.namespace);
        DeepMerge::merge_from(&mut self.topology, other.topology);
        DeepMerge::merge_from(&mut self.network, other.network);
    }
}

impl DeepMerge for ClusterTopologyBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.version, other.version);
        DeepMerge::merge_from(&mut self.class, other.class);
    }
}

impl DeepMerge for ClusterNetworkBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.service_domain, other.service_domain);
        merge_atomic_list(&mut self.services, other.services);
        merge_atomic_list(&mut self.pods, other.pods);
        DeepMerge::merge_from(&mut self.ip_family, other.ip_family);
    }
}

impl DeepMerge for ControlPlaneBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.version, other.version);
        DeepMerge::merge_from(&mut self.name, other.name);
        DeepMerge::merge_from(&mut self.replicas, other.replicas);
        DeepMerge::merge_from(&mut self.machine_template, other.machine_template);
    }
}

impl DeepMerge for ControlPlaneMachineTemplateBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.infrastructure_ref, other.infrastructure_ref);
    }
}

impl DeepMerge for MachineDeploymentBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.version, other.version);
        DeepMerge::merge_from(&mut self.class, other.class);
        DeepMerge::merge_from(&mut self.name, other.name);
        DeepMerge::merge_from(&mut self.topology_name, other.topology_name);
        DeepMerge::merge_from(&mut self.replicas, other.replicas);
        DeepMerge::merge_from(&mut self.bootstrap, other.bootstrap);
        DeepMerge::merge_from(&mut self.infrastructure_ref, other.infrastructure_ref);
    }
}

impl DeepMerge for MachineBootstrapBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.config_ref, other.config_ref);
    }
}

impl DeepMerge for TemplateRefBuiltins {
    fn merge_from(&mut self, other: Self) {
        DeepMerge::merge_from(&mut self.name, other.name);
    }
}
