pub type Value = serde_json::Value;

/// Renders a value the way it should appear inside a prompt: strings verbatim,
/// everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
