//! Rendering of value templates.
//!
//! Templates are rendered with [MiniJinja](minijinja), using the variables as context. Every
//! variable is exposed with its parsed value, so templates can access nested fields, index
//! arrays and iterate:
//!
//! ```text
//! {{ .builtin.cluster.name }}-{{ .builtin.machineDeployment.topologyName }}
//! {{ nodes[0].name | upper }}
//! {% for cidr in builtin.cluster.network.pods %}- {{ cidr }}
//! {% endfor %}
//! ```
//!
//! Field access may be written Go template style with a leading dot. Referencing an undefined
//! variable or field is an error.
//!
//! The rendered text is parsed as YAML (and therefore JSON), so `3` renders to a number, `true`
//! to a boolean and `"true"` to a string.

use std::collections::BTreeMap;

use minijinja::{Environment, UndefinedBehavior};
use snafu::{ResultExt, Snafu};

use crate::variables::VariableMap;

mod functions;
mod syntax;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse template {template:?}"))]
    ParseTemplate {
        source: minijinja::Error,
        template: String,
    },

    #[snafu(display("failed to convert variable {name:?} to template data"))]
    TemplateData {
        source: serde_json::Error,
        name: String,
    },

    #[snafu(display("failed to render template {template:?}"))]
    RenderTemplate {
        source: minijinja::Error,
        template: String,
    },

    #[snafu(display("failed to parse rendered template {rendered:?}"))]
    ParseRenderedTemplate {
        source: serde_yaml::Error,
        rendered: String,
    },
}

/// Renders `template` with the given variables and parses the result.
pub fn render_value_template(
    template: &str,
    variables: &VariableMap,
) -> Result<serde_json::Value> {
    let normalized = syntax::normalize_field_access(template);

    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    functions::register(&mut env);

    let compiled = env
        .template_from_str(&normalized)
        .context(ParseTemplateSnafu { template })?;

    let data = template_data(variables)?;
    let rendered = compiled
        .render(&data)
        .context(RenderTemplateSnafu { template })?;

    parse_rendered(&rendered)
}

/// Parses all variable values, so templates operate on actual objects, arrays, numbers, strings
/// and booleans instead of serialized JSON.
fn template_data(variables: &VariableMap) -> Result<BTreeMap<&str, serde_json::Value>> {
    variables
        .iter()
        .map(|(name, value)| {
            value
                .to_value()
                .map(|value| (name.as_str(), value))
                .context(TemplateDataSnafu { name })
        })
        .collect()
}

fn parse_rendered(rendered: &str) -> Result<serde_json::Value> {
    // An empty document is null
    if rendered.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }

    serde_yaml::from_str(rendered).context(ParseRenderedTemplateSnafu { rendered })
}
