//! The shared document and its wire envelopes.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Wire name of the settings section.
pub const CONFIG_SECTION: &str = "config";
/// Wire name of the contact request list section.
pub const CONTACT_REQUESTS_SECTION: &str = "contactRequests";
/// Wire name of the write timestamp field.
pub const LAST_MODIFIED_FIELD: &str = "lastModified";

/// The single shared document.
///
/// The two known sections get typed fields; any other top-level field a
/// client writes rides along verbatim in [`extra`](Self::extra). Nothing
/// beyond "valid JSON" is validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Arbitrary application settings.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Contact requests, newest first.
    #[serde(default, rename = "contactRequests")]
    pub contact_requests: Vec<Value>,
    /// RFC 3339 timestamp of the last successful write. Stamped by the
    /// store on every replace or section update.
    #[serde(
        default,
        rename = "lastModified",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<String>,
    /// Unknown top-level fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// The fixed shape a fresh store starts from: zeroed stats apart from a
    /// few seeded counters, empty lists, null placeholders.
    #[must_use]
    pub fn seed() -> Self {
        let mut config = Map::new();
        config.insert(
            "stats".into(),
            json!({
                "visits": 0,
                "members": 1,
                "features": 3,
                "regions": 1,
                "customers": 0,
                "projects": 0
            }),
        );
        config.insert(
            "counter".into(),
            json!({
                "current": 0,
                "maxType": "none",
                "maxValue": null
            }),
        );
        config.insert("gallery".into(), json!([]));
        config.insert("backgrounds".into(), json!([]));
        config.insert("sites".into(), json!([]));
        config.insert("particleImage".into(), Value::Null);
        config.insert("textColors".into(), json!([]));

        Self {
            config,
            ..Self::default()
        }
    }

    /// Assign a top-level section by its wire name.
    ///
    /// Known sections must deserialize to their typed shape; unknown names
    /// land in the extras bag untouched.
    pub fn set_section(&mut self, section: &str, value: Value) -> Result<()> {
        match section {
            CONFIG_SECTION => {
                self.config =
                    serde_json::from_value(value).map_err(|e| Error::Deserialize(e.to_string()))?;
            }
            CONTACT_REQUESTS_SECTION => {
                self.contact_requests =
                    serde_json::from_value(value).map_err(|e| Error::Deserialize(e.to_string()))?;
            }
            LAST_MODIFIED_FIELD => {
                self.last_modified =
                    serde_json::from_value(value).map_err(|e| Error::Deserialize(e.to_string()))?;
            }
            _ => {
                self.extra.insert(section.to_string(), value);
            }
        }
        Ok(())
    }

    /// Stamp [`last_modified`](Self::last_modified) with the current time.
    pub fn touch(&mut self) {
        self.last_modified = Some(now_rfc3339());
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Status envelope returned by every write endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the operation took effect.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl Ack {
    /// A success envelope.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failure envelope.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Body of a partial update: one top-level section and its new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionPatch {
    /// Wire name of the section to replace.
    pub section: String,
    /// Replacement value. Defaults to JSON null when absent.
    #[serde(default)]
    pub value: Value,
}
