//! Best-effort observability hooks (§4.6). `emit_event` and
//! `telemetry_settings` are available to the Turn Driver and the Session
//! Server; emission never blocks or fails the caller and a forwarding
//! transport (OTLP, if `AGENT_OBS_*` env vars are set) is out of scope —
//! the in-process sink is always `tracing`, target `observability.event`.

use serde_json::Value;
use std::collections::HashMap;

/// Whether emission is enabled at all (`AGENT_OBSERVABILITY_ENABLED`).
/// Even when disabled, `emit_event` never panics or returns an error —
/// it just skips the `tracing::event!` call.
#[must_use]
pub fn enabled() -> bool {
    std::env::var("AGENT_OBSERVABILITY_ENABLED")
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true)
}

/// Per-function telemetry metadata, threaded through from config/env so a
/// downstream collector can group spans by logical operation.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySettings {
    pub function_id: String,
    pub metadata: HashMap<String, String>,
}

#[must_use]
pub fn telemetry_settings(function_id: impl Into<String>) -> TelemetrySettings {
    TelemetrySettings { function_id: function_id.into(), metadata: HashMap::new() }
}

/// Emit one observability event. Attributes are sanitized before they
/// reach `tracing`: only numeric, boolean, short-string (<=256 chars), or
/// `*Id`-suffixed string values survive — anything else (long strings,
/// arrays, nested objects, which could carry prompt/output text) is
/// dropped rather than forwarded.
pub fn emit_event(name: &str, status: &str, duration_ms: Option<u64>, attributes: &HashMap<String, Value>) {
    if !enabled() {
        return;
    }
    let sanitized = sanitize(attributes);
    tracing::event!(
        target: "observability.event",
        tracing::Level::INFO,
        name,
        status,
        duration_ms,
        attributes = %serde_json::Value::Object(sanitized.into_iter().collect()),
    );
}

fn sanitize(attributes: &HashMap<String, Value>) -> HashMap<String, Value> {
    attributes
        .iter()
        .filter(|(key, value)| allowed(key, value))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn allowed(key: &str, value: &Value) -> bool {
    match value {
        Value::Number(_) | Value::Bool(_) => true,
        Value::String(s) => s.len() <= 256 || key.ends_with("Id"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_short_string_attributes_survive() {
        let attrs = HashMap::from([
            ("stepCount".to_string(), json!(3)),
            ("sessionId".to_string(), json!("abc-123")),
        ]);
        let sanitized = sanitize(&attrs);
        assert_eq!(sanitized.len(), 2);
    }

    #[test]
    fn long_strings_are_dropped_unless_id_suffixed() {
        let long = "x".repeat(300);
        let attrs = HashMap::from([
            ("prompt".to_string(), json!(long.clone())),
            ("traceId".to_string(), json!(long)),
        ]);
        let sanitized = sanitize(&attrs);
        assert_eq!(sanitized.len(), 1);
        assert!(sanitized.contains_key("traceId"));
    }

    #[test]
    fn nested_values_are_dropped() {
        let attrs = HashMap::from([("payload".to_string(), json!({"a": 1}))]);
        assert!(sanitize(&attrs).is_empty());
    }

    #[test]
    fn emit_event_never_panics_when_disabled() {
        std::env::set_var("AGENT_OBSERVABILITY_ENABLED", "0");
        emit_event("turn.step", "ok", Some(12), &HashMap::new());
        std::env::remove_var("AGENT_OBSERVABILITY_ENABLED");
    }
}
