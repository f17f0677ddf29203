//! Core Device trait and related types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::events::EventCallback;
use crate::features::{HasAnimation, HasDisplay};

/// Discrete capability flags a device advertises.
///
/// The flags are resolved by the discovery layer and carried in
/// [`DeviceInfo`]; drivers trust them instead of re-probing the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCapability {
    /// Addressable grid buttons
    GridButtons,
    /// Rotary input (dial devices)
    Rotation,
    /// High resolution scroll counts
    HighResScroll,
    /// LCD surface behind the keys
    LcdDisplay,
    /// Chunked image upload to the LCD surface
    ImageUpload,
}

/// Immutable identity for one physical device, resolved by the discovery
/// layer before a driver is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human readable product name
    pub name: String,
    /// Path to the hidraw node, e.g. `/dev/hidraw3`
    pub device_path: PathBuf,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Capabilities advertised for this device
    pub capabilities: Vec<DeviceCapability>,
}

/// Core device trait - object-safe for `dyn Device`
pub trait Device: Send {
    /// Identity this driver was constructed with
    fn info(&self) -> &DeviceInfo;

    fn has_capability(&self, cap: DeviceCapability) -> bool {
        self.info().capabilities.contains(&cap)
    }

    /// Register the callback invoked for every decoded input event.
    /// Must be registered before `start_monitoring`.
    fn set_event_callback(&mut self, callback: EventCallback);

    /// Start the input monitor. No-op if already running or no callback
    /// is registered.
    fn start_monitoring(&mut self);

    /// Signal the input monitor and wait for it to exit.
    fn stop_monitoring(&mut self);

    fn is_monitoring(&self) -> bool;

    /// Feature opt-in methods - override to return `Some(self)` if the
    /// feature is supported
    fn as_display(&mut self) -> Option<&mut dyn HasDisplay> {
        None
    }
    fn as_animation(&mut self) -> Option<&mut dyn HasAnimation> {
        None
    }
}
