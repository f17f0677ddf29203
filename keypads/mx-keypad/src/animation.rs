//! Concurrent frame playback for keys and the full screen.
//!
//! Each active animation is one OS thread looping display-sleep-advance
//! against its target rectangle. At most one animation runs per key index,
//! plus one independent full-screen slot. Cancellation is cooperative: a
//! stop flips the running flag and joins the thread, so frame buffers are
//! never freed while the task still reads them. Stopping can therefore
//! block for up to one frame delay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mx_console_core::{DeviceError, Result};
use tracing::{debug, warn};

use crate::abi::{self, Rect};
use crate::gif::GifFrame;
use crate::transfer::TransferChannel;

/// One running playback task. The frame sequence is owned by the thread;
/// joining before drop guarantees the invariant above.
struct Animation {
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Animation {
    fn start(
        channel: Arc<TransferChannel>,
        rect: Rect,
        frames: Vec<GifFrame>,
        looped: bool,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let task = thread::spawn(move || playback(channel, rect, frames, looped, flag));
        Self { running, task }
    }

    fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        let _ = self.task.join();
    }
}

fn playback(
    channel: Arc<TransferChannel>,
    rect: Rect,
    frames: Vec<GifFrame>,
    looped: bool,
    running: Arc<AtomicBool>,
) {
    let mut cursor = 0;
    while running.load(Ordering::Relaxed) {
        let frame = &frames[cursor];
        match abi::image_reports(rect, &frame.image) {
            Ok(plan) => {
                if let Err(err) = channel.send(&plan) {
                    warn!(%err, "dropped animation frame");
                }
            }
            Err(err) => warn!(%err, frame = cursor, "skipped unencodable frame"),
        }

        thread::sleep(frame.delay);

        cursor += 1;
        if cursor >= frames.len() {
            if looped {
                cursor = 0;
            } else {
                running.store(false, Ordering::Relaxed);
            }
        }
    }
    debug!(?rect, "animation task exited");
}

/// Owns zero-or-one running animation per key index and zero-or-one
/// full-screen animation.
#[derive(Default)]
pub struct AnimationController {
    keys: HashMap<u8, Animation>,
    screen: Option<Animation>,
}

impl AnimationController {
    /// Install and start a key animation, superseding any existing one on
    /// that key. The previous task is fully joined before the new one
    /// starts.
    pub fn play_key(
        &mut self,
        key: u8,
        channel: Arc<TransferChannel>,
        frames: Vec<GifFrame>,
        looped: bool,
    ) -> Result<()> {
        self.stop_key(key);
        if frames.is_empty() {
            return Err(DeviceError::EmptyAnimation);
        }
        self.keys
            .insert(key, Animation::start(channel, Rect::key(key), frames, looped));
        Ok(())
    }

    /// Install and start the full-screen animation, superseding any
    /// existing one. Key animations are left running; their cells may be
    /// repainted by both tasks.
    pub fn play_screen(
        &mut self,
        channel: Arc<TransferChannel>,
        frames: Vec<GifFrame>,
        looped: bool,
    ) -> Result<()> {
        self.stop_screen();
        if frames.is_empty() {
            return Err(DeviceError::EmptyAnimation);
        }
        self.screen = Some(Animation::start(channel, Rect::screen(), frames, looped));
        Ok(())
    }

    /// Stop the animation on one key. No-op when none is running.
    pub fn stop_key(&mut self, key: u8) {
        if let Some(animation) = self.keys.remove(&key) {
            animation.stop();
        }
    }

    /// Stop the full-screen animation. No-op when none is running.
    pub fn stop_screen(&mut self) {
        if let Some(animation) = self.screen.take() {
            animation.stop();
        }
    }

    /// Stop the screen animation, then every key animation.
    pub fn stop_all(&mut self) {
        self.stop_screen();
        for (_, animation) in self.keys.drain() {
            animation.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;

    fn null_channel() -> Arc<TransferChannel> {
        Arc::new(TransferChannel::open(Path::new("/dev/null")).unwrap())
    }

    fn frames(count: usize, delay_ms: u64) -> Vec<GifFrame> {
        (0..count)
            .map(|i| GifFrame {
                image: vec![i as u8; 64],
                delay: Duration::from_millis(delay_ms),
            })
            .collect()
    }

    #[test]
    fn empty_frames_install_nothing() {
        let mut controller = AnimationController::default();
        assert!(matches!(
            controller.play_key(0, null_channel(), Vec::new(), true),
            Err(DeviceError::EmptyAnimation)
        ));
        assert!(controller.keys.is_empty());
    }

    #[test]
    fn play_supersedes_running_animation() {
        let mut controller = AnimationController::default();
        let channel = null_channel();

        controller
            .play_key(4, Arc::clone(&channel), frames(3, 5), true)
            .unwrap();
        let first_flag = Arc::clone(&controller.keys[&4].running);

        controller
            .play_key(4, Arc::clone(&channel), frames(3, 5), true)
            .unwrap();

        // the superseded task was signalled and joined before the new start
        assert!(!first_flag.load(Ordering::Relaxed));
        assert_eq!(controller.keys.len(), 1);

        controller.stop_all();
        assert!(controller.keys.is_empty() && controller.screen.is_none());
    }

    #[test]
    fn non_looping_animation_stops_itself() {
        let mut controller = AnimationController::default();
        controller
            .play_key(1, null_channel(), frames(2, 1), false)
            .unwrap();

        let flag = Arc::clone(&controller.keys[&1].running);
        for _ in 0..100 {
            if !flag.load(Ordering::Relaxed) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!flag.load(Ordering::Relaxed));

        // stopping an already-finished animation is a no-op
        controller.stop_key(1);
    }

    #[test]
    fn screen_and_key_animations_are_independent() {
        let mut controller = AnimationController::default();
        let channel = null_channel();

        controller
            .play_screen(Arc::clone(&channel), frames(2, 5), true)
            .unwrap();
        controller
            .play_key(0, Arc::clone(&channel), frames(2, 5), true)
            .unwrap();

        assert!(controller.screen.is_some());
        assert_eq!(controller.keys.len(), 1);

        controller.stop_screen();
        assert!(controller.screen.is_none());
        assert_eq!(controller.keys.len(), 1, "key animation survives screen stop");

        controller.stop_all();
    }

    #[test]
    fn stop_without_animation_is_noop() {
        let mut controller = AnimationController::default();
        controller.stop_key(3);
        controller.stop_screen();
        controller.stop_all();
    }
}
