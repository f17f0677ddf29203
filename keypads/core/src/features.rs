//! Feature traits for device capabilities.
//!
//! Devices opt-in to features by implementing these traits and returning
//! `Some(self)` from the corresponding `as_*()` method in the Device trait.

/// Errors that can occur during device operations
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Device has not completed its vendor handshake yet
    #[error("device not initialized")]
    NotInitialized,

    /// Key index outside the grid
    #[error("invalid key index: {0}")]
    InvalidKey(u8),

    /// Image payload does not fit the transfer length field
    #[error("image payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// Device accepted fewer bytes than a full report sequence
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Animation source decoded to zero frames
    #[error("animation has no frames")]
    EmptyAnimation,

    /// Image decode/encode error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Still image painting capability
pub trait HasDisplay {
    /// Paint one key cell with an encoded (JPEG) image
    fn set_key_image(&mut self, key: u8, image: &[u8]) -> Result<()>;
    /// Paint the full screen with an encoded (JPEG) image
    fn set_screen_image(&mut self, image: &[u8]) -> Result<()>;
}

/// Animated GIF playback capability
pub trait HasAnimation {
    /// Play a GIF on one key, superseding any animation already running
    /// there
    fn play_key_gif(&mut self, key: u8, data: &[u8], looped: bool) -> Result<()>;
    /// Play a GIF across the full screen, independent of key animations
    fn play_screen_gif(&mut self, data: &[u8], looped: bool) -> Result<()>;
    /// Stop the animation on one key. No-op if none is running.
    fn stop_key_animation(&mut self, key: u8);
    /// Stop the full-screen animation. No-op if none is running.
    fn stop_screen_animation(&mut self);
    /// Stop the screen animation, then every key animation.
    fn stop_all_animations(&mut self);
}
