/// `{{key}}` template interpolation against an event context
///
/// Placeholders are `{{` + one or more ASCII word characters + `}}`, with no
/// whitespace allowed inside the braces. A placeholder whose key is missing
/// from the context is left untouched. Substitution is a single pass: values
/// containing `{{...}}` are not expanded again.

use crate::workflow::EventContext;
use serde_json::Value;

/// Replace every resolvable placeholder in `template`
pub fn interpolate(template: &str, context: &EventContext) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);

        let after_open = &rest[start + 2..];
        let key_len = after_open
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();

        if key_len > 0 && after_open[key_len..].starts_with("}}") {
            let key = &after_open[..key_len];
            match context.get(key) {
                Some(value) => output.push_str(&render_value(value)),
                None => output.push_str(&rest[start..start + key_len + 4]),
            }
            rest = &after_open[key_len + 2..];
        } else {
            // Advance one brace so "{{{key}}}" still matches at the next offset
            output.push('{');
            rest = &rest[start + 1..];
        }
    }

    output.push_str(rest);
    output
}

/// Interpolate an optional template; `None` stays `None`
pub fn interpolate_opt(template: Option<&str>, context: &EventContext) -> Option<String> {
    template.map(|t| interpolate(t, context))
}

/// Textual form of a context value
///
/// Strings are used verbatim; every other value uses its compact JSON text.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
