//! The [`JsonPatchGenerator`], which renders the JSON patches of a single [`ClusterClassPatch`].

use std::{error::Error as StdError, fmt};

use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument, warn};

use crate::{
    api::{ClusterClassPatch, Generator, PatchDefinition},
    hooks::{
        GeneratePatchesRequest, GeneratePatchesRequestItem, GeneratePatchesResponse,
        GeneratePatchesResponseItem, PatchType,
    },
    json_patch, selector, template,
    variables::{self, VariableMap},
};

/// Errors of a single request item.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "failed to merge global and template-specific variables for item with uid {uid:?}"
    ))]
    MergeVariables {
        source: variables::MergeError,
        uid: String,
    },

    #[snafu(display("failed to calculate if patch {patch} is enabled for item with uid {uid:?}"))]
    CalculateEnabled {
        source: template::Error,
        patch: String,
        uid: String,
    },

    #[snafu(display("failed to generate JSON patches for item with uid {uid:?}"))]
    GenerateJsonPatches {
        source: json_patch::Error,
        uid: String,
    },
}

impl Error {
    /// Returns the error including all of its sources, joined by `: `.
    pub fn as_human_readable_error_message(&self) -> String {
        let mut error_message = self.to_string();

        let mut source = self.source();
        while let Some(err) = source {
            error_message.push_str(": ");
            error_message.push_str(&err.to_string());
            source = err.source();
        }

        error_message
    }
}

/// All item errors of a request. Contains at least one error.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<Error>,
}

impl AggregateError {
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [error] => f.write_str(&error.as_human_readable_error_message()),
            errors => {
                let messages = errors
                    .iter()
                    .map(Error::as_human_readable_error_message)
                    .collect::<Vec<_>>();
                write!(f, "[{}]", messages.join(", "))
            }
        }
    }
}

impl StdError for AggregateError {}

/// Returns true if the patch is enabled. A patch without condition is always enabled, otherwise
/// the condition has to render to the boolean `true`. A rendered string `"true"` disables the
/// patch.
pub fn patch_is_enabled(
    enabled_if: Option<&str>,
    variables: &VariableMap,
) -> Result<bool, template::Error> {
    let Some(enabled_if) = enabled_if else {
        return Ok(true);
    };

    let value = template::render_value_template(enabled_if, variables)?;
    Ok(value == serde_json::Value::Bool(true))
}

/// Generates the patches of a single [`ClusterClassPatch`].
#[derive(Clone, Debug)]
pub struct JsonPatchGenerator {
    patch: ClusterClassPatch,
}

impl JsonPatchGenerator {
    pub fn new(patch: ClusterClassPatch) -> Self {
        Self { patch }
    }

    pub fn patch(&self) -> &ClusterClassPatch {
        &self.patch
    }

    /// Generates the patches for all items of the request.
    ///
    /// Every item is processed, even if a previous item failed. If any item fails, all errors
    /// are returned and the generated patches are discarded.
    pub fn try_generate(
        &self,
        request: &GeneratePatchesRequest,
    ) -> Result<Vec<GeneratePatchesResponseItem>, AggregateError> {
        let global_variables = variables::to_map(&request.variables);

        let mut items = Vec::new();
        let mut errors = Vec::new();

        for item in &request.items {
            self.generate_item(item, &global_variables, &mut items, &mut errors);
        }

        if errors.is_empty() {
            Ok(items)
        } else {
            Err(AggregateError { errors })
        }
    }

    /// Appends the patches of all matching definitions to `items` and the errors of the item to
    /// `errors`. A failing definition does not stop the remaining definitions of the item.
    fn generate_item(
        &self,
        item: &GeneratePatchesRequestItem,
        global_variables: &VariableMap,
        items: &mut Vec<GeneratePatchesResponseItem>,
        errors: &mut Vec<Error>,
    ) {
        let mut record = |err: Error| {
            warn!(
                uid = %item.uid,
                error = &err as &dyn StdError,
                "failed to generate patches for item"
            );
            errors.push(err);
        };

        let template_variables = variables::to_map(&item.variables);

        let definitions = self
            .patch
            .definitions
            .iter()
            .filter(|definition| {
                selector::matches_selector(item, &template_variables, &definition.selector)
            })
            .collect::<Vec<&PatchDefinition>>();

        if definitions.is_empty() {
            debug!(uid = %item.uid, "no patch definition matches item, skipping");
            return;
        }

        let merged = variables::merge_variable_maps(&[global_variables, &template_variables])
            .context(MergeVariablesSnafu { uid: &item.uid });
        let variables = match merged {
            Ok(variables) => variables,
            Err(err) => return record(err),
        };

        let enabled = patch_is_enabled(self.patch.enabled_if.as_deref(), &variables).context(
            CalculateEnabledSnafu {
                patch: &self.patch.name,
                uid: &item.uid,
            },
        );
        match enabled {
            Ok(true) => {}
            Ok(false) => {
                debug!(uid = %item.uid, "patch is disabled for item, skipping");
                return;
            }
            Err(err) => return record(err),
        }

        for definition in definitions {
            let patch = json_patch::generate_json_patches(&definition.json_patches, &variables)
                .context(GenerateJsonPatchesSnafu { uid: &item.uid });
            match patch {
                Ok(patch) => items.push(GeneratePatchesResponseItem {
                    uid: item.uid.clone(),
                    patch_type: PatchType::JsonPatch,
                    patch,
                }),
                Err(err) => record(err),
            }
        }
    }
}

impl Generator for JsonPatchGenerator {
    #[instrument(
        skip(self, request),
        fields(patch = %self.patch.name, items = request.items.len())
    )]
    fn generate(&self, request: &GeneratePatchesRequest) -> GeneratePatchesResponse {
        self.try_generate(request).into()
    }
}
