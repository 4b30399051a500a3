//! Helper filters available in patch templates, in addition to the MiniJinja builtins like
//! `upper`, `lower`, `trim`, `replace` and `default`.
//!
//! The names follow the Sprig library commonly used with Go templates, so that existing patch
//! templates keep working with minimal changes. For the same reason booleans are printed as
//! `true` and `false`.


use base64::{Engine as _, engine::general_purpose::STANDARD};
use minijinja::{Environment, Error, ErrorKind, Output, State, Value, value::ValueKind};

pub(crate) fn register(env: &mut Environment<'_>) {
    env.set_formatter(format_value);

    env.add_filter("quote", quote);
    env.add_filter("squote", squote);
    env.add_filter("trimPrefix", trim_prefix);
    env.add_filter("trimSuffix", trim_suffix);
    env.add_filter("hasPrefix", has_prefix);
    env.add_filter("hasSuffix", has_suffix);
    env.add_filter("contains", contains);
    env.add_filter("b64enc", b64enc);
    env.add_filter("b64dec", b64dec);
    env.add_filter("toJson", to_json);
}

/// Booleans are printed lowercase, as Go templates do. Everything else uses the default
/// formatting.
fn format_value(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> Result<(), Error> {
    if value.kind() == ValueKind::Bool {
        out.write_str(&to_text(value))?;
        Ok(())
    } else {
        minijinja::escape_formatter(out, state, value)
    }
}

fn to_text(value: &Value) -> String {
    match value.kind() {
        ValueKind::Bool if value.is_true() => "true".to_owned(),
        ValueKind::Bool => "false".to_owned(),
        _ => value.to_string(),
    }
}

fn quote(value: &Value) -> String {
    format!("{:?}", to_text(value))
}

fn squote(value: &Value) -> String {
    format!("'{}'", to_text(value))
}

fn trim_prefix(value: String, prefix: &str) -> String {
    match value.strip_prefix(prefix) {
        Some(stripped) => stripped.to_owned(),
        None => value,
    }
}

fn trim_suffix(value: String, suffix: &str) -> String {
    match value.strip_suffix(suffix) {
        Some(stripped) => stripped.to_owned(),
        None => value,
    }
}

fn has_prefix(value: &str, prefix: &str) -> bool {
    value.starts_with(prefix)
}

fn has_suffix(value: &str, suffix: &str) -> bool {
    value.ends_with(suffix)
}

fn contains(value: &str, substring: &str) -> bool {
    value.contains(substring)
}

fn b64enc(value: &str) -> String {
    STANDARD.encode(value)
}

fn b64dec(value: &str) -> Result<String, Error> {
    let bytes = STANDARD.decode(value).map_err(|err| {
        Error::new(ErrorKind::InvalidOperation, "value is not valid base64").with_source(err)
    })?;

    String::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::InvalidOperation, "decoded value is not valid UTF-8").with_source(err)
    })
}

fn to_json(value: &Value) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::BadSerialization, "failed to serialize value as JSON")
            .with_source(err)
    })
}
