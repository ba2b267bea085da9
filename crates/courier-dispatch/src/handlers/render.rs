//! `{{placeholder}}` substitution for message templates.

use std::collections::HashMap;

use crate::domain::handler::HandlerError;

/// Replaces every `{{ name }}` in `template` with `variables[name]`.
///
/// # Errors
///
/// Returns `HandlerError::InvalidPayload` for an unterminated placeholder or
/// one with no matching variable.
pub(crate) fn render(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, HandlerError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open.find("}}").ok_or_else(|| {
            HandlerError::InvalidPayload("unterminated template placeholder".into())
        })?;
        let name = after_open[..end].trim();
        let value = variables.get(name).ok_or_else(|| {
            HandlerError::InvalidPayload(format!("missing template variable: {name}"))
        })?;
        out.push_str(value);
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
