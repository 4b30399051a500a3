//! Matching of request items against [`PatchSelector`]s.

use tracing::debug;

use crate::{
    api::PatchSelector,
    hooks::GeneratePatchesRequestItem,
    variables::{self, VariableMap},
};

pub const CLUSTER_KIND: &str = "Cluster";
pub const MACHINE_DEPLOYMENT_KIND: &str = "MachineDeployment";

/// `Cluster.spec.infrastructureRef` holds the InfrastructureCluster.
pub const INFRASTRUCTURE_REF_FIELD_PATH: &str = "spec.infrastructureRef";

/// `Cluster.spec.controlPlaneRef` holds the ControlPlane.
pub const CONTROL_PLANE_REF_FIELD_PATH: &str = "spec.controlPlaneRef";

/// `<ControlPlane>.spec.machineTemplate.infrastructureRef` holds the InfrastructureMachineTemplate
/// of a ControlPlane. The ControlPlane kind is provider specific, but this field path is only
/// used by ControlPlanes.
pub const CONTROL_PLANE_MACHINE_INFRASTRUCTURE_REF_FIELD_PATH: &str =
    "spec.machineTemplate.infrastructureRef";

/// `MachineDeployment.spec.template.spec.bootstrap.configRef` holds the BootstrapConfigTemplate.
pub const MACHINE_DEPLOYMENT_BOOTSTRAP_CONFIG_REF_FIELD_PATH: &str =
    "spec.template.spec.bootstrap.configRef";

/// `MachineDeployment.spec.template.spec.infrastructureRef` holds the
/// InfrastructureMachineTemplate.
pub const MACHINE_DEPLOYMENT_INFRASTRUCTURE_REF_FIELD_PATH: &str =
    "spec.template.spec.infrastructureRef";

/// Variable path of the MachineDeployment class of a template.
pub const MACHINE_DEPLOYMENT_CLASS_VARIABLE: &str = "builtin.machineDeployment.class";

/// Returns true if the request item matches the selector.
///
/// The apiVersion and kind of the object always have to match. Additionally the item has to
/// be referenced from one of the places selected by `matchResources`.
pub fn matches_selector(
    item: &GeneratePatchesRequestItem,
    template_variables: &VariableMap,
    selector: &PatchSelector,
) -> bool {
    let Some(types) = &item.object.types else {
        return false;
    };
    if types.api_version != selector.api_version || types.kind != selector.kind {
        return false;
    }

    let holder = &item.holder_reference;
    let match_resources = &selector.match_resources;

    if match_resources.infrastructure_cluster
        && holder.kind == CLUSTER_KIND
        && holder.field_path == INFRASTRUCTURE_REF_FIELD_PATH
    {
        return true;
    }

    if match_resources.control_plane {
        if holder.kind == CLUSTER_KIND && holder.field_path == CONTROL_PLANE_REF_FIELD_PATH {
            return true;
        }
        if holder.field_path == CONTROL_PLANE_MACHINE_INFRASTRUCTURE_REF_FIELD_PATH {
            return true;
        }
    }

    if let Some(machine_deployment_class) = &match_resources.machine_deployment_class {
        let is_machine_deployment_template = holder.kind == MACHINE_DEPLOYMENT_KIND
            && (holder.field_path == MACHINE_DEPLOYMENT_BOOTSTRAP_CONFIG_REF_FIELD_PATH
                || holder.field_path == MACHINE_DEPLOYMENT_INFRASTRUCTURE_REF_FIELD_PATH);

        if is_machine_deployment_template {
            // An unreadable class only means that the template does not match
            let class = variables::get_variable_value(
                template_variables,
                MACHINE_DEPLOYMENT_CLASS_VARIABLE,
            );
            match class {
                Ok(class) => {
                    // The class is JSON, e.g. `"default-worker"`, so the names are compared quoted
                    return machine_deployment_class.names.iter().any(|name| {
                        class.raw() == serde_json::Value::from(name.as_str()).to_string()
                    });
                }
                Err(err) => {
                    debug!(
                        uid = %item.uid,
                        error = &err as &dyn std::error::Error,
                        "failed to read MachineDeployment class, template does not match"
                    );
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use kube::core::{DynamicObject, ObjectMeta, TypeMeta};
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::{
        api::{MachineDeploymentClassMatch, PatchSelectorMatch},
        hooks::HolderReference,
        variables::VariableValue,
    };

    fn item(
        api_version: &str,
        kind: &str,
        holder_kind: &str,
        field_path: &str,
    ) -> GeneratePatchesRequestItem {
        GeneratePatchesRequestItem {
            uid: "1a2b".to_owned(),
            holder_reference: HolderReference::new(holder_kind, field_path),
            object: DynamicObject {
                types: Some(TypeMeta {
                    api_version: api_version.to_owned(),
                    kind: kind.to_owned(),
                }),
                metadata: ObjectMeta::default(),
                data: json!({}),
            },
            variables: Vec::new(),
        }
    }

    fn selector(match_resources: PatchSelectorMatch) -> PatchSelector {
        PatchSelector {
            api_version: "infra/v1".to_owned(),
            kind: "InfraMachine".to_owned(),
            match_resources,
        }
    }

    fn infrastructure_cluster() -> PatchSelectorMatch {
        PatchSelectorMatch {
            infrastructure_cluster: true,
            ..Default::default()
        }
    }

    fn control_plane() -> PatchSelectorMatch {
        PatchSelectorMatch {
            control_plane: true,
            ..Default::default()
        }
    }

    fn machine_deployment_class(names: &[&str]) -> PatchSelectorMatch {
        PatchSelectorMatch {
            machine_deployment_class: Some(MachineDeploymentClassMatch {
                names: names.iter().map(ToString::to_string).collect(),
            }),
            ..Default::default()
        }
    }

    fn md_variables(class: &str) -> VariableMap {
        serde_json::from_value(json!({
            "builtin": {"machineDeployment": {"class": class}},
        }))
        .expect("test variables are valid")
    }

    #[rstest]
    #[case(infrastructure_cluster(), true)]
    #[case(control_plane(), false)]
    #[case(machine_deployment_class(&["default-worker"]), false)]
    #[case(PatchSelectorMatch::default(), false)]
    fn infrastructure_cluster_item(
        #[case] match_resources: PatchSelectorMatch,
        #[case] expected: bool,
    ) {
        let item = item("infra/v1", "InfraMachine", "Cluster", "spec.infrastructureRef");
        let variables = md_variables("default-worker");

        assert_eq!(
            matches_selector(&item, &variables, &selector(match_resources)),
            expected
        );
    }

    #[rstest]
    #[case("Cluster", "spec.controlPlaneRef")]
    #[case("KubeadmControlPlane", "spec.machineTemplate.infrastructureRef")]
    #[case("Cluster", "spec.machineTemplate.infrastructureRef")]
    fn control_plane_items(#[case] holder_kind: &str, #[case] field_path: &str) {
        let item = item("infra/v1", "InfraMachine", holder_kind, field_path);

        let variables = VariableMap::new();

        assert!(matches_selector(&item, &variables, &selector(control_plane())));
        assert!(!matches_selector(
            &item,
            &variables,
            &selector(infrastructure_cluster())
        ));
    }

    #[rstest]
    #[case("infra/v2", "InfraMachine")]
    #[case("infra/v1", "OtherMachine")]
    fn api_version_and_kind_must_match(#[case] api_version: &str, #[case] kind: &str) {
        let item = item(api_version, kind, "Cluster", "spec.infrastructureRef");

        assert!(!matches_selector(
            &item,
            &VariableMap::new(),
            &selector(infrastructure_cluster())
        ));
    }

    #[test]
    fn object_without_types_does_not_match() {
        let mut item = item("infra/v1", "InfraMachine", "Cluster", "spec.infrastructureRef");
        item.object.types = None;

        assert!(!matches_selector(
            &item,
            &VariableMap::new(),
            &selector(infrastructure_cluster())
        ));
    }

    #[rstest]
    #[case("spec.template.spec.bootstrap.configRef", &["default-worker"], true)]
    #[case("spec.template.spec.infrastructureRef", &["default-worker"], true)]
    #[case("spec.template.spec.bootstrap.configRef", &["other-worker", "default-worker"], true)]
    #[case("spec.template.spec.bootstrap.configRef", &["other-worker"], false)]
    #[case("spec.template.spec.bootstrap.configRef", &[], false)]
    #[case("spec.template.spec.otherRef", &["default-worker"], false)]
    fn machine_deployment_class_items(
        #[case] field_path: &str,
        #[case] names: &[&str],
        #[case] expected: bool,
    ) {
        let item = item("infra/v1", "InfraMachine", "MachineDeployment", field_path);

        assert_eq!(
            matches_selector(
                &item,
                &md_variables("default-worker"),
                &selector(machine_deployment_class(names))
            ),
            expected
        );
    }

    #[test]
    fn machine_deployment_class_requires_machine_deployment_holder() {
        let item = item(
            "infra/v1",
            "InfraMachine",
            "MachineSet",
            "spec.template.spec.infrastructureRef",
        );

        assert!(!matches_selector(
            &item,
            &md_variables("default-worker"),
            &selector(machine_deployment_class(&["default-worker"]))
        ));
    }

    #[rstest]
    #[case(VariableMap::new())]
    #[case(serde_json::from_value(json!({"builtin": {"cluster": {"name": "demo"}}})).expect("valid"))]
    #[case(VariableMap::from([("builtin".to_owned(), VariableValue::from_raw("{broken"))]))]
    fn unreadable_machine_deployment_class_does_not_match(#[case] variables: VariableMap) {
        let item = item(
            "infra/v1",
            "InfraMachine",
            "MachineDeployment",
            "spec.template.spec.bootstrap.configRef",
        );

        assert!(!matches_selector(
            &item,
            &variables,
            &selector(machine_deployment_class(&["default-worker"]))
        ));
    }

    #[test]
    fn machine_deployment_class_is_compared_as_json_string() {
        let item = item(
            "infra/v1",
            "InfraMachine",
            "MachineDeployment",
            "spec.template.spec.bootstrap.configRef",
        );
        let variables: VariableMap = serde_json::from_value(json!({
            "builtin": {"machineDeployment": {"class": 42}},
        }))
        .expect("test variables are valid");

        assert!(!matches_selector(
            &item,
            &variables,
            &selector(machine_deployment_class(&["42"]))
        ));
    }
}
