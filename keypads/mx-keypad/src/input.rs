//! Inbound report decoding and press-state tracking.
//!
//! The keypad emits two report shapes, recognized by their leading bytes:
//!
//! - Navigation report (`11 ff 0b 00 ...`): byte 4 = 0x01 with byte 5
//!   carrying the captured code (0xA1/0xA2) signals a press; byte 4 = 0x00
//!   signals the previously-down navigation button going up.
//! - Grid report (`13 ff 02 00 ?? 01 ...`): bytes 6+ hold every currently
//!   pressed key as a 1-based code, terminated by zero. Multiple keys can
//!   be down at once; transitions come from diffing against the prior
//!   snapshot.
//!
//! A navigation report can carry trailing bytes that would also parse as a
//! grid report, so the navigation shape is matched first and consumes the
//! whole report. Anything matching neither shape is device noise and is
//! dropped without touching the state.

use std::time::{SystemTime, UNIX_EPOCH};

use mx_console_core::{ButtonEvent, Event};

use crate::abi::KEY_COUNT;

/// Captured code of the left navigation button (P1).
pub const NAV_P1: u8 = 0xa1;
/// Captured code of the right navigation button (P2).
pub const NAV_P2: u8 = 0xa2;

const NAV_HEADER: [u8; 4] = [0x11, 0xff, 0x0b, 0x00];
const GRID_HEADER: [u8; 4] = [0x13, 0xff, 0x02, 0x00];

/// Currently-pressed keys of one device.
///
/// Owned and mutated only by that device's monitor loop.
#[derive(Debug, Default)]
pub struct PressState {
    /// Bit k set = grid key k currently down
    grid: u16,
    /// Navigation button currently down, if any
    nav: Option<u8>,
}

impl PressState {
    /// Grid keys currently down, 0-based.
    pub fn pressed_keys(&self) -> impl Iterator<Item = u8> + '_ {
        (0..KEY_COUNT).filter(|k| self.grid & (1 << k) != 0)
    }

    /// Navigation button currently down, if any.
    pub fn nav_down(&self) -> Option<u8> {
        self.nav
    }
}

/// Decode one raw report against the current press state, returning the
/// transition events it implies.
pub fn decode_report(data: &[u8], state: &mut PressState) -> Vec<Event> {
    let now = timestamp_ms();

    if data.len() >= 6 && data[..4] == NAV_HEADER {
        return decode_nav(data, state, now);
    }

    if data.len() >= 7 && data[..4] == GRID_HEADER && data[5] == 0x01 {
        return decode_grid(&data[6..], state, now);
    }

    Vec::new()
}

fn decode_nav(data: &[u8], state: &mut PressState, now: u64) -> Vec<Event> {
    match (data[4], data[5]) {
        (0x01, code @ (NAV_P1 | NAV_P2)) => {
            if state.nav == Some(code) {
                // repeat-down with the identical code
                return Vec::new();
            }
            state.nav = Some(code);
            vec![button(code, true, now)]
        }
        (0x00, _) => match state.nav.take() {
            Some(code) => vec![button(code, false, now)],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn decode_grid(codes: &[u8], state: &mut PressState, now: u64) -> Vec<Event> {
    let mut current = 0u16;
    for &raw in codes {
        if raw == 0 {
            break;
        }
        if (1..=KEY_COUNT).contains(&raw) {
            current |= 1 << (raw - 1);
        }
    }

    let pressed = current & !state.grid;
    let released = state.grid & !current;
    state.grid = current;

    let mut events = Vec::new();
    for key in 0..KEY_COUNT {
        if pressed & (1 << key) != 0 {
            events.push(button(key, true, now));
        }
    }
    for key in 0..KEY_COUNT {
        if released & (1 << key) != 0 {
            events.push(button(key, false, now));
        }
    }
    events
}

fn button(code: u8, pressed: bool, timestamp_ms: u64) -> Event {
    Event::Button(ButtonEvent {
        code,
        pressed,
        timestamp_ms,
    })
}

fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
