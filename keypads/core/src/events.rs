//! Input event model.
//!
//! Events are a closed set of kinds with a payload per kind; consumers
//! match on [`Event`] rather than downcasting through a type hierarchy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A grid or navigation button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    /// Grid key index (0-8) or captured navigation code (0xA1/0xA2)
    pub code: u8,
    pub pressed: bool,
    /// Milliseconds since the unix epoch
    pub timestamp_ms: u64,
}

/// A dial rotation step (dial devices only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEvent {
    /// Signed detent steps
    pub delta: i32,
    /// High resolution counts (120 per detent)
    pub delta_high_res: i32,
    /// Milliseconds since the unix epoch
    pub timestamp_ms: u64,
}

/// Every input event a device in this family can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Button(ButtonEvent),
    Rotation(RotationEvent),
}

impl Event {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Event::Button(e) => e.timestamp_ms,
            Event::Rotation(e) => e.timestamp_ms,
        }
    }
}

/// Callback invoked synchronously on the monitor thread for each decoded
/// event, in report-arrival order. It must not block indefinitely or it
/// stalls further event delivery for that device.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_json_shape() {
        let event = Event::Button(ButtonEvent {
            code: 4,
            pressed: true,
            timestamp_ms: 1234567,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"button","code":4,"pressed":true,"timestamp_ms":1234567}"#
        );
    }
}
