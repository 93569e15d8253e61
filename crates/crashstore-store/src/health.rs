use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// One failed health check.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthError {
    pub name: String,
    pub msg: String,
}

/// Health report accumulated by walking every component.
///
/// Components append errors and informational values; the caller decides
/// what an unhealthy report means (e.g. a 503 from a heartbeat endpoint).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HealthState {
    errors: Vec<HealthError>,
    info: BTreeMap<String, Value>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed check for component `name`.
    pub fn add_error(&mut self, name: impl Into<String>, msg: impl Into<String>) {
        self.errors.push(HealthError {
            name: name.into(),
            msg: msg.into(),
        });
    }

    /// Record an informational value as `<component>.<key>`.
    pub fn add_info(&mut self, component: &str, key: &str, value: impl Into<Value>) {
        self.info.insert(format!("{component}.{key}"), value.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[HealthError] {
        &self.errors
    }

    pub fn info(&self) -> &BTreeMap<String, Value> {
        &self.info
    }

    /// Render as `{"errors": [...], "info": {...}}`.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "errors": self.errors,
            "info": self.info,
        })
    }
}
