//! Hidraw driver for the MX Creative Console keypad.
//!
//! The keypad is a 3x3 grid of 118x118 LCD keys behind one 434x434 logical
//! screen. This crate covers the vendor wire protocol (chunked JPEG upload
//! and button reports), the transfer channel, per-key and full-screen GIF
//! playback, and the input monitor loop. Device discovery is the caller's
//! job; construction takes an already-resolved [`DeviceInfo`].
//!
//! ```no_run
//! use mx_console_core::{DeviceCapability, DeviceInfo};
//! use mx_keypad::MxKeypad;
//!
//! let info = DeviceInfo {
//!     name: "MX Creative Console".into(),
//!     device_path: "/dev/hidraw3".into(),
//!     vendor_id: mx_keypad::consts::VENDOR_ID,
//!     product_id: mx_keypad::consts::PRODUCT_ID,
//!     capabilities: vec![
//!         DeviceCapability::GridButtons,
//!         DeviceCapability::LcdDisplay,
//!         DeviceCapability::ImageUpload,
//!     ],
//! };
//! let mut keypad = MxKeypad::new(info);
//! keypad.initialize()?;
//! keypad.set_key_image(4, &std::fs::read("icon.jpg")?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod abi;
pub mod animation;
pub mod gif;
pub mod input;
pub mod monitor;
pub mod transfer;

pub mod consts {
    /// Logitech vendor ID
    pub const VENDOR_ID: u16 = 0x046d;
    /// MX Creative Console keypad product ID
    pub const PRODUCT_ID: u16 = 0xc354;
}

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mx_console_core::{
    Device, DeviceError, DeviceInfo, EventCallback, HasAnimation, HasDisplay, Result,
};
use tracing::debug;

use crate::abi::{Rect, KEY_COUNT};
use crate::animation::AnimationController;
use crate::monitor::Monitor;
use crate::transfer::TransferChannel;

/// Pause after each handshake report; the firmware needs a beat between
/// diversion writes.
const HANDSHAKE_PAUSE: Duration = Duration::from_millis(10);

/// Driver for one connected keypad.
pub struct MxKeypad {
    info: DeviceInfo,
    channel: Option<Arc<TransferChannel>>,
    animations: AnimationController,
    monitor: Monitor,
    callback: Option<EventCallback>,
}

impl MxKeypad {
    /// Wrap a resolved device. No IO happens until [`initialize`].
    ///
    /// [`initialize`]: MxKeypad::initialize
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            channel: None,
            animations: AnimationController::default(),
            monitor: Monitor::new(),
            callback: None,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn is_initialized(&self) -> bool {
        self.channel.is_some()
    }

    /// Open the hidraw node and run the vendor handshake that diverts the
    /// navigation buttons into vendor reports. Required before any image or
    /// animation operation; a no-op when already initialized.
    pub fn initialize(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Ok(());
        }

        let channel = TransferChannel::open(&self.info.device_path)?;
        for report in abi::HANDSHAKE_REPORTS {
            channel.write_report(&report)?;
            thread::sleep(HANDSHAKE_PAUSE);
        }
        debug!(path = %self.info.device_path.display(), "keypad initialized");

        self.channel = Some(Arc::new(channel));
        Ok(())
    }

    fn channel(&self) -> Result<&Arc<TransferChannel>> {
        self.channel.as_ref().ok_or(DeviceError::NotInitialized)
    }

    fn key_rect(key: u8) -> Result<Rect> {
        if key >= KEY_COUNT {
            return Err(DeviceError::InvalidKey(key));
        }
        Ok(Rect::key(key))
    }

    /// Paint one key cell with an encoded JPEG image.
    pub fn set_key_image(&self, key: u8, image: &[u8]) -> Result<()> {
        self.set_raw_image(Self::key_rect(key)?, image)
    }

    /// Paint the full screen, covering all nine cells and the gaps between
    /// them.
    pub fn set_screen_image(&self, image: &[u8]) -> Result<()> {
        self.set_raw_image(Rect::screen(), image)
    }

    /// Paint an arbitrary region of the logical screen.
    pub fn set_raw_image(&self, rect: Rect, image: &[u8]) -> Result<()> {
        let plan = abi::image_reports(rect, image)?;
        self.channel()?.send(&plan)
    }

    /// Play a GIF on one key, superseding any animation already running
    /// there. The superseded task is fully stopped before the new one
    /// writes its first frame.
    pub fn play_key_gif(&mut self, key: u8, data: &[u8], looped: bool) -> Result<()> {
        let rect = Self::key_rect(key)?;
        let channel = Arc::clone(self.channel()?);
        self.animations.stop_key(key);
        let frames = gif::decode(data, rect.width.into(), rect.height.into())?;
        self.animations.play_key(key, channel, frames, looped)
    }

    /// [`play_key_gif`] reading the source from a file.
    ///
    /// [`play_key_gif`]: MxKeypad::play_key_gif
    pub fn play_key_gif_file(&mut self, key: u8, path: &Path, looped: bool) -> Result<()> {
        let rect = Self::key_rect(key)?;
        let channel = Arc::clone(self.channel()?);
        self.animations.stop_key(key);
        let frames = gif::decode_file(path, rect.width.into(), rect.height.into())?;
        self.animations.play_key(key, channel, frames, looped)
    }

    /// Play a GIF across the full screen, superseding a previous screen
    /// animation. Key animations keep running independently; a key's cell
    /// may be repainted by both tasks.
    pub fn play_screen_gif(&mut self, data: &[u8], looped: bool) -> Result<()> {
        let channel = Arc::clone(self.channel()?);
        self.animations.stop_screen();
        let rect = Rect::screen();
        let frames = gif::decode(data, rect.width.into(), rect.height.into())?;
        self.animations.play_screen(channel, frames, looped)
    }

    /// [`play_screen_gif`] reading the source from a file.
    ///
    /// [`play_screen_gif`]: MxKeypad::play_screen_gif
    pub fn play_screen_gif_file(&mut self, path: &Path, looped: bool) -> Result<()> {
        let channel = Arc::clone(self.channel()?);
        self.animations.stop_screen();
        let rect = Rect::screen();
        let frames = gif::decode_file(path, rect.width.into(), rect.height.into())?;
        self.animations.play_screen(channel, frames, looped)
    }

    /// Stop the animation on one key and wait for its task to exit. No-op
    /// when none is running.
    pub fn stop_key_animation(&mut self, key: u8) {
        self.animations.stop_key(key);
    }

    /// Stop the full-screen animation and wait for its task to exit. No-op
    /// when none is running.
    pub fn stop_screen_animation(&mut self) {
        self.animations.stop_screen();
    }

    /// Stop the screen animation, then every key animation.
    pub fn stop_all_animations(&mut self) {
        self.animations.stop_all();
    }

    /// Register the callback invoked for every decoded input event.
    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.callback = Some(callback);
    }

    /// Start the input monitor thread. No-op when already running or when
    /// no callback is registered.
    pub fn start_monitoring(&mut self) {
        let Some(callback) = self.callback.clone() else {
            return;
        };
        self.monitor
            .start(self.info.device_path.clone(), callback);
    }

    /// Signal the monitor thread and wait for it to exit.
    pub fn stop_monitoring(&mut self) {
        self.monitor.stop();
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }
}

impl Drop for MxKeypad {
    fn drop(&mut self) {
        self.stop_all_animations();
        self.stop_monitoring();
    }
}

// === Trait Implementations ===

impl Device for MxKeypad {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn set_event_callback(&mut self, callback: EventCallback) {
        MxKeypad::set_event_callback(self, callback)
    }

    fn start_monitoring(&mut self) {
        MxKeypad::start_monitoring(self)
    }

    fn stop_monitoring(&mut self) {
        MxKeypad::stop_monitoring(self)
    }

    fn is_monitoring(&self) -> bool {
        MxKeypad::is_monitoring(self)
    }

    fn as_display(&mut self) -> Option<&mut dyn HasDisplay> {
        Some(self)
    }

    fn as_animation(&mut self) -> Option<&mut dyn HasAnimation> {
        Some(self)
    }
}

impl HasDisplay for MxKeypad {
    fn set_key_image(&mut self, key: u8, image: &[u8]) -> Result<()> {
        MxKeypad::set_key_image(self, key, image)
    }

    fn set_screen_image(&mut self, image: &[u8]) -> Result<()> {
        MxKeypad::set_screen_image(self, image)
    }
}

impl HasAnimation for MxKeypad {
    fn play_key_gif(&mut self, key: u8, data: &[u8], looped: bool) -> Result<()> {
        MxKeypad::play_key_gif(self, key, data, looped)
    }

    fn play_screen_gif(&mut self, data: &[u8], looped: bool) -> Result<()> {
        MxKeypad::play_screen_gif(self, data, looped)
    }

    fn stop_key_animation(&mut self, key: u8) {
        MxKeypad::stop_key_animation(self, key)
    }

    fn stop_screen_animation(&mut self) {
        MxKeypad::stop_screen_animation(self)
    }

    fn stop_all_animations(&mut self) {
        MxKeypad::stop_all_animations(self)
    }
}

#[cfg(test)]
mod tests {
    use mx_console_core::DeviceCapability;

    use super::*;

    /// Device wired to /dev/null, which accepts any write in full.
    fn test_keypad() -> MxKeypad {
        MxKeypad::new(DeviceInfo {
            name: "test keypad".into(),
            device_path: "/dev/null".into(),
            vendor_id: consts::VENDOR_ID,
            product_id: consts::PRODUCT_ID,
            capabilities: vec![
                DeviceCapability::GridButtons,
                DeviceCapability::LcdDisplay,
                DeviceCapability::ImageUpload,
            ],
        })
    }

    #[test]
    fn operations_require_initialization() {
        let mut keypad = test_keypad();
        assert!(!keypad.is_initialized());
        assert!(matches!(
            keypad.set_key_image(0, &[0xff, 0xd8]),
            Err(DeviceError::NotInitialized)
        ));
        assert!(matches!(
            keypad.play_key_gif(0, &[], true),
            Err(DeviceError::NotInitialized)
        ));
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut keypad = test_keypad();
        keypad.initialize().unwrap();
        keypad.initialize().unwrap();
        assert!(keypad.is_initialized());
    }

    #[test]
    fn key_index_is_validated() {
        let mut keypad = test_keypad();
        keypad.initialize().unwrap();
        assert!(matches!(
            keypad.set_key_image(9, &[0xff, 0xd8]),
            Err(DeviceError::InvalidKey(9))
        ));
        assert!(keypad.set_key_image(8, &[0xff, 0xd8]).is_ok());
    }

    #[test]
    fn capability_flags_come_from_device_info() {
        let keypad = test_keypad();
        assert!(Device::has_capability(&keypad, DeviceCapability::LcdDisplay));
        assert!(!Device::has_capability(&keypad, DeviceCapability::Rotation));
    }

    #[test]
    fn monitoring_requires_callback() {
        let mut keypad = test_keypad();
        keypad.start_monitoring();
        assert!(!keypad.is_monitoring());
    }

    #[test]
    fn bad_gif_leaves_no_animation_installed() {
        let mut keypad = test_keypad();
        keypad.initialize().unwrap();
        assert!(keypad.play_key_gif(2, b"not a gif", true).is_err());
        // stop is a no-op, nothing was installed
        keypad.stop_key_animation(2);
    }
}
