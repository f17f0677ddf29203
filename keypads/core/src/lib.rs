//! Core traits and types for the mx-console device abstraction.
//!
//! This crate provides:
//! - Feature traits (`HasDisplay`, `HasAnimation`) that devices can implement
//! - The `Device` trait with `as_*()` methods for feature discovery
//! - Common types like `DeviceInfo`, `DeviceCapability`, and the input `Event` enum

mod device;
mod events;
mod features;

pub use device::{Device, DeviceCapability, DeviceInfo};
pub use events::{ButtonEvent, Event, EventCallback, RotationEvent};
pub use features::{DeviceError, HasAnimation, HasDisplay, Result};
