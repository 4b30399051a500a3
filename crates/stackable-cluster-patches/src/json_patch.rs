//! Rendering of [`JsonPatch`]es into RFC 6902 JSON patch documents.

use serde::Serialize;
use snafu::{ResultExt, Snafu};
use strum::{Display, EnumString};

use crate::{
    api::JsonPatch,
    template,
    variables::{self, VariableMap},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unknown JSON patch operation {op:?} for path {path:?}"))]
    UnknownOperation {
        source: strum::ParseError,
        op: String,
        path: String,
    },

    #[snafu(display("failed to calculate value: neither .value nor .valueFrom are set"))]
    NoValueSource,

    #[snafu(display("failed to calculate value: both .value and .valueFrom are set"))]
    BothValueSources,

    #[snafu(display(
        "failed to calculate value: .valueFrom is set, but neither .valueFrom.variable nor .valueFrom.template are set"
    ))]
    NoValueFromSource,

    #[snafu(display(
        "failed to calculate value: .valueFrom is set, but both .valueFrom.variable and .valueFrom.template are set"
    ))]
    BothValueFromSources,

    #[snafu(display("failed to calculate value from variable {variable:?}"))]
    ResolveVariable {
        source: variables::Error,
        variable: String,
    },

    #[snafu(display("failed to parse value of variable {variable:?}"))]
    ParseVariable {
        source: serde_json::Error,
        variable: String,
    },

    #[snafu(display("failed to calculate value from template"))]
    RenderTemplate { source: template::Error },

    #[snafu(display("failed to calculate value for JSON patch operation {op} on path {path:?}"))]
    CalculateValue {
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
        op: PatchOperation,
        path: String,
    },

    #[snafu(display("failed to serialize JSON patches"))]
    SerializePatches { source: serde_json::Error },
}

/// The operations defined by RFC 6902.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PatchOperation {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl PatchOperation {
    /// Only values of `add` and `replace` operations are calculated, all other operations are
    /// rendered without a value.
    pub fn has_value(self) -> bool {
        matches!(self, Self::Add | Self::Replace)
    }
}

/// A single rendered operation as it appears in the JSON patch document.
#[derive(Debug, Eq, PartialEq, Serialize)]
struct RenderedOperation<'a> {
    op: PatchOperation,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
}

/// Renders the JSON patches into a JSON patch document, keeping their order.
pub fn generate_json_patches(
    json_patches: &[JsonPatch],
    variables: &VariableMap,
) -> Result<Vec<u8>> {
    let operations = json_patches
        .iter()
        .map(|json_patch| {
            let op: PatchOperation = json_patch.op.parse().context(UnknownOperationSnafu {
                op: &json_patch.op,
                path: &json_patch.path,
            })?;

            let value = if op.has_value() {
                let value = calculate_value(json_patch, variables)
                    .context(CalculateValueSnafu {
                        op,
                        path: &json_patch.path,
                    })?;
                Some(value)
            } else {
                None
            };

            Ok(RenderedOperation {
                op,
                path: &json_patch.path,
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    serde_json::to_vec(&operations).context(SerializePatchesSnafu)
}

/// Calculates the value of a JSON patch from exactly one of `value`, `valueFrom.variable` and
/// `valueFrom.template`.
pub fn calculate_value(
    json_patch: &JsonPatch,
    variables: &VariableMap,
) -> Result<serde_json::Value> {
    let value_from = match (&json_patch.value, &json_patch.value_from) {
        (None, None) => return NoValueSourceSnafu.fail(),
        (Some(_), Some(_)) => return BothValueSourcesSnafu.fail(),
        (Some(value), None) => return Ok(value.clone()),
        (None, Some(value_from)) => value_from,
    };

    match (&value_from.variable, &value_from.template) {
        (None, None) => NoValueFromSourceSnafu.fail(),
        (Some(_), Some(_)) => BothValueFromSourcesSnafu.fail(),
        (Some(variable), None) => variables::get_variable_value(variables, variable)
            .context(ResolveVariableSnafu { variable })?
            .to_value()
            .context(ParseVariableSnafu { variable }),
        (None, Some(template)) => {
            template::render_value_template(template, variables).context(RenderTemplateSnafu)
        }
    }
}
