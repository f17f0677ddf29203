//! High level library for driving Logitech MX Creative Console keypads on
//! Linux.
//!
//! The heavy lifting lives in the member crates:
//! - [`mx_console_core`] - device traits, capability flags, input events
//! - [`mx_keypad`] - the hidraw driver: wire codec, transfer channel, GIF
//!   playback, button monitoring
//!
//! This crate re-exports both and adds [`media`] helpers for turning
//! arbitrary images into the JPEG payloads the keypad consumes.

pub use mx_console_core::{
    ButtonEvent, Device, DeviceCapability, DeviceError, DeviceInfo, Event, EventCallback,
    HasAnimation, HasDisplay, Result, RotationEvent,
};
pub use mx_keypad::abi::{Rect, ReportPlan, KEY_COUNT, KEY_SIZE, SCREEN_SIZE};
pub use mx_keypad::{consts, MxKeypad};

pub mod media;
