//! Robot-mode output (JSON).
//!
//! Every command wraps its payload in the same envelope so scripts can rely
//! on `schemaVersion`, `command` and `data` being present.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::health::HealthWarning;
use crate::error::Result;

pub const SCHEMA_VERSION: &str = "studygym.v1";

/// Top-level JSON envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
    /// Outstanding provider warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<HealthWarning>,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            command: command.into(),
            data,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_notices(mut self, notices: Vec<HealthWarning>) -> Self {
        self.notices = notices;
        self
    }
}

/// Serialize an envelope.
///
/// # Errors
/// Returns error if serialization fails.
pub fn render_json<T: Serialize>(output: &RobotOutput<T>, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::health::WarningKind;
    use serde_json::Value;

    #[test]
    fn envelope_shape() {
        let out = RobotOutput::new("status", vec![1, 2]);
        let json: Value = serde_json::from_str(&render_json(&out, false).unwrap()).unwrap();
        assert_eq!(json["schemaVersion"], SCHEMA_VERSION);
        assert_eq!(json["command"], "status");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("notices").is_none());
    }

    #[test]
    fn notices_are_included() {
        let warning = HealthWarning::new("cascade", None, "down", WarningKind::AllProvidersFailed);
        let out = RobotOutput::new("grade", ()).with_notices(vec![warning]);
        let text = render_json(&out, true).unwrap();
        assert!(text.contains('\n'));
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["notices"][0]["kind"], "all_providers_failed");
    }
}
