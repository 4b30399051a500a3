//! Go template style field access.
//!
//! Patches usually reference variables the way Go templates do, with a leading dot:
//! `{{ .builtin.cluster.name }}`. MiniJinja has no notion of a "current object", so the leading
//! dot is dropped before the template is compiled: `{{ builtin.cluster.name }}`.

/// Removes the leading dot of field accesses inside `{{ ... }}` and `{% ... %}` tags. Text
/// outside of tags and quoted strings inside of tags are preserved.
pub(crate) fn normalize_field_access(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = find_tag_start(remaining) {
        let close = if remaining[start..].starts_with("{{") {
            "}}"
        } else {
            "%}"
        };
        result.push_str(&remaining[..start + 2]);
        remaining = &remaining[start + 2..];

        if let Some(end) = remaining.find(close) {
            result.push_str(&strip_leading_dots(&remaining[..end]));
            result.push_str(close);
            remaining = &remaining[end + 2..];
        } else {
            // Unterminated tag, the template parser reports it
            result.push_str(remaining);
            remaining = "";
        }
    }

    result.push_str(remaining);
    result
}

fn find_tag_start(template: &str) -> Option<usize> {
    match (template.find("{{"), template.find("{%")) {
        (Some(variable), Some(block)) => Some(variable.min(block)),
        (variable, block) => variable.or(block),
    }
}

fn strip_leading_dots(expression: &str) -> String {
    let mut result = String::with_capacity(expression.len());
    let mut chars = expression.chars().peekable();
    let mut quote = None;

    while let Some(ch) = chars.next() {
        match (ch, quote) {
            ('\'' | '"', None) => {
                quote = Some(ch);
                result.push(ch);
            }
            (ch, Some(open)) if ch == open => {
                quote = None;
                result.push(ch);
            }
            ('.', None) => {
                // `a.b`, `f().b`, `x[0].b`, `{'a': 1}.a`, `'a'.upper()` and `1.5` are kept,
                // only a dot starting an identifier is dropped. Quotes are always closing
                // here, opening ones put us into a string.
                let starts_access = result
                    .chars()
                    .last()
                    .is_none_or(|prev| !continues_expression(prev));
                let next_is_identifier = chars
                    .peek()
                    .is_some_and(|next| next.is_alphabetic() || *next == '_');
                if !(starts_access && next_is_identifier) {
                    result.push(ch);
                }
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Returns true if a dot after `prev` accesses a field of the preceding expression.
fn continues_expression(prev: char) -> bool {
    prev.is_alphanumeric() || matches!(prev, '_' | ')' | ']' | '}' | '\'' | '"')
}
