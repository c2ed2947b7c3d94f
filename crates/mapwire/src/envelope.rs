//! # Event Envelopes
//!
//! One inbound message from the embedded runtime. A single delivery stream
//! carries three concerns: property/state events, async-task completions,
//! and resource requests. The router discriminates on the fields here.
//!
//! Only `type`, `mapId`, and `taskId` matter for routing. Everything else
//! (position, pixel, key info, progress, speed, timestamps) is opaque
//! payload forwarded to listeners untouched.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::Result;

/// Payload key under which task-completion envelopes carry the raw result.
pub const RESULT_KEY: &str = "result";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Event kind, e.g. `"click"`, `"zoomend"`, `"taskComplete"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The map instance this envelope targets, when any.
    #[serde(rename = "mapId", default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    /// Present on async-task completion notices; matches an outbound call id.
    #[serde(rename = "taskId", default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
    /// Runtime-side failure description, when the task failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    // Optional sub-targets. Global map events carry none of these.
    #[serde(rename = "markerId", default, skip_serializing_if = "Option::is_none")]
    pub marker_id: Option<String>,
    #[serde(rename = "popupId", default, skip_serializing_if = "Option::is_none")]
    pub popup_id: Option<String>,
    #[serde(rename = "controlId", default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<String>,
    #[serde(rename = "drawingManagerId", default, skip_serializing_if = "Option::is_none")]
    pub drawing_manager_id: Option<String>,
    #[serde(rename = "animationId", default, skip_serializing_if = "Option::is_none")]
    pub animation_id: Option<String>,

    /// Everything else: opaque per-event-kind payload.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Parses one envelope off the inbound stream.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// A bare event envelope with no sub-target and no payload.
    pub fn event(kind: &str, map_id: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            map_id: Some(map_id.to_owned()),
            task_id: None,
            error: None,
            marker_id: None,
            popup_id: None,
            control_id: None,
            drawing_manager_id: None,
            animation_id: None,
            payload: Map::new(),
        }
    }

    /// A task-completion notice carrying a raw result.
    pub fn completion(task_id: u64, result: Value) -> Self {
        let mut payload = Map::new();
        payload.insert(RESULT_KEY.to_owned(), result);
        Self {
            kind: "taskComplete".to_owned(),
            map_id: None,
            task_id: Some(task_id),
            error: None,
            marker_id: None,
            popup_id: None,
            control_id: None,
            drawing_manager_id: None,
            animation_id: None,
            payload,
        }
    }

    /// The first present sub-target id, if any.
    ///
    /// Marker, popup, control, drawing-manager, and animation events each
    /// set exactly one of these; the precedence order only matters for
    /// malformed envelopes setting several.
    pub fn target_id(&self) -> Option<&str> {
        self.marker_id
            .as_deref()
            .or(self.popup_id.as_deref())
            .or(self.control_id.as_deref())
            .or(self.drawing_manager_id.as_deref())
            .or(self.animation_id.as_deref())
    }

    /// The raw result carried by a task-completion notice.
    ///
    /// Absent fields read as `Null`, matching the decode contract: an
    /// intentionally-empty result decodes to absence downstream.
    pub fn take_result(&mut self) -> Value {
        self.payload.remove(RESULT_KEY).unwrap_or(Value::Null)
    }
}
