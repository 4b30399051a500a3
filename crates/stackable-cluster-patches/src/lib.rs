//! Inline JSON patch generation for ClusterClass topologies.
//!
//! A [`ClusterClassPatch`](api::ClusterClassPatch) contains a list of patch definitions, each
//! consisting of a selector and a list of JSON patches. For every item of a
//! [`GeneratePatchesRequest`](hooks::GeneratePatchesRequest) the [`JsonPatchGenerator`] picks
//! the definitions whose selector matches the item, evaluates the `enabledIf` condition of the
//! patch and renders the JSON patches into an RFC 6902 document.
//!
//! Patch values are either set inline, read from a variable or rendered from a template. See
//! [`template`] for the supported template syntax.
//!
//! ```
//! use stackable_cluster_patches::{
//!     JsonPatchGenerator,
//!     api::{ClusterClassPatch, Generator},
//!     hooks::GeneratePatchesRequest,
//! };
//!
//! let patch: ClusterClassPatch = serde_yaml::from_str(
//!     "
//! name: replicas
//! definitions:
//! - selector:
//!     apiVersion: controlplane.cluster.x-k8s.io/v1beta1
//!     kind: KubeadmControlPlaneTemplate
//!     matchResources:
//!       controlPlane: true
//!   jsonPatches:
//!   - op: replace
//!     path: /spec/replicas
//!     valueFrom:
//!       variable: replicas
//! ",
//! )
//! .expect("patch YAML is valid");
//!
//! let generator = JsonPatchGenerator::new(patch);
//! let response = generator.generate(&GeneratePatchesRequest::default());
//! assert!(response.items.is_empty());
//! ```

pub mod api;
pub mod generator;
pub mod hooks;
pub mod json_patch;
pub mod selector;
pub mod template;
pub mod variables;

pub use generator::JsonPatchGenerator;

// External re-exports
pub use k8s_openapi;
pub use kube;
