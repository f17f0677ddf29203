//! Outbound report protocol for the keypad LCD.
//!
//! Images are pushed as an ordered sequence of fixed 4095-byte reports.
//! The first report of a transfer carries a 20-byte header:
//! - Bytes 0-3: Report tag (0x14 0xff 0x02 0x2b)
//! - Byte 4: Continuation control byte
//! - Bytes 5-8: Geometry mode marker (0x01 0x00 0x01 0x00)
//! - Bytes 9-10: X position (big-endian)
//! - Bytes 11-12: Y position (big-endian)
//! - Bytes 13-14: Width (big-endian)
//! - Bytes 15-16: Height (big-endian)
//! - Byte 17: Reserved (0)
//! - Bytes 18-19: Payload length (big-endian)
//!
//! Continuation reports carry a 5-byte header (tag + control byte). The
//! control byte packs the 1-based part index into the low 5 bits together
//! with a constant framing bit; bit 7 marks the first report of a transfer
//! and bit 6 the last (a single-report transfer sets both). Every report is
//! zero-padded to the full 4095 bytes - the firmware rejects short frames.

use mx_console_core::{DeviceError, Result};

/// Fixed size of every outbound report.
pub const REPORT_SIZE: usize = 4095;
/// Header length of the first report in a transfer.
pub const FIRST_HEADER_LEN: usize = 20;
/// Header length of continuation reports.
pub const CONT_HEADER_LEN: usize = 5;

/// Leading tag on every outbound image report.
const REPORT_TAG: [u8; 4] = [0x14, 0xff, 0x02, 0x2b];
/// Geometry mode marker in the first report header.
const GEOMETRY_MODE: [u8; 4] = [0x01, 0x00, 0x01, 0x00];

/// Number of grid keys.
pub const KEY_COUNT: u8 = 9;
/// Key cell edge in pixels.
pub const KEY_SIZE: u16 = 118;
/// Gap between adjacent key cells in pixels.
pub const GAP_SIZE: u16 = 40;
/// Full screen edge: three cells plus two gaps.
pub const SCREEN_SIZE: u16 = 3 * KEY_SIZE + 2 * GAP_SIZE;
/// Top-left corner of key 0 on the logical screen.
pub const ORIGIN_X: u16 = 23;
pub const ORIGIN_Y: u16 = 6;

/// Reports written once at initialization. They divert the navigation
/// buttons into vendor notifications so the monitor loop can observe them.
pub const HANDSHAKE_REPORTS: [[u8; 20]; 2] = [
    [
        0x11, 0xff, 0x0b, 0x3b, 0x01, 0xa1, 0x03, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ],
    [
        0x11, 0xff, 0x0b, 0x3b, 0x01, 0xa2, 0x03, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ],
];

/// Target region on the 434x434 logical screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    /// Cell rectangle for a grid key, indexed 0-8 in row-major order.
    pub fn key(index: u8) -> Self {
        debug_assert!(index < KEY_COUNT);
        let row = (index / 3) as u16;
        let col = (index % 3) as u16;
        Self {
            x: ORIGIN_X + col * (KEY_SIZE + GAP_SIZE),
            y: ORIGIN_Y + row * (KEY_SIZE + GAP_SIZE),
            width: KEY_SIZE,
            height: KEY_SIZE,
        }
    }

    /// Full screen rectangle covering all nine cells and the gaps between
    /// them.
    pub fn screen() -> Self {
        Self {
            x: ORIGIN_X,
            y: ORIGIN_Y,
            width: SCREEN_SIZE,
            height: SCREEN_SIZE,
        }
    }
}

/// An ordered, non-empty report sequence for one image transfer.
///
/// Every report is exactly [`REPORT_SIZE`] bytes; exactly one report has the
/// first flag set and exactly one the last flag.
#[derive(Debug, Clone)]
pub struct ReportPlan {
    reports: Vec<Vec<u8>>,
}

impl ReportPlan {
    pub fn reports(&self) -> &[Vec<u8>] {
        &self.reports
    }

    pub fn count(&self) -> usize {
        self.reports.len()
    }

    /// Total bytes the device must accept for the transfer to succeed.
    pub fn total_len(&self) -> usize {
        self.reports.len() * REPORT_SIZE
    }
}

/// Continuation control byte.
fn control_byte(part: usize, first: bool, last: bool) -> u8 {
    let mut value = (part as u8 & 0x1f) | 0b0010_0000;
    if first {
        value |= 0b1000_0000;
    }
    if last {
        value |= 0b0100_0000;
    }
    value
}

/// Build the report sequence that paints `payload` at `rect`.
///
/// The payload is opaque to the codec (the device expects a JPEG). Fails if
/// the payload length does not fit the 16-bit length field.
pub fn image_reports(rect: Rect, payload: &[u8]) -> Result<ReportPlan> {
    if payload.len() > u16::MAX as usize {
        return Err(DeviceError::PayloadTooLarge(payload.len()));
    }

    let first_take = payload.len().min(REPORT_SIZE - FIRST_HEADER_LEN);
    let rest = &payload[first_take..];
    let cont_chunks: Vec<&[u8]> = rest.chunks(REPORT_SIZE - CONT_HEADER_LEN).collect();

    let mut reports = Vec::with_capacity(1 + cont_chunks.len());

    let mut first = vec![0u8; REPORT_SIZE];
    first[..4].copy_from_slice(&REPORT_TAG);
    first[4] = control_byte(1, true, cont_chunks.is_empty());
    first[5..9].copy_from_slice(&GEOMETRY_MODE);
    first[9..11].copy_from_slice(&rect.x.to_be_bytes());
    first[11..13].copy_from_slice(&rect.y.to_be_bytes());
    first[13..15].copy_from_slice(&rect.width.to_be_bytes());
    first[15..17].copy_from_slice(&rect.height.to_be_bytes());
    // byte 17 is reserved and stays zero
    first[18..20].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    first[FIRST_HEADER_LEN..FIRST_HEADER_LEN + first_take].copy_from_slice(&payload[..first_take]);
    reports.push(first);

    for (i, chunk) in cont_chunks.iter().enumerate() {
        let mut report = vec![0u8; REPORT_SIZE];
        report[..4].copy_from_slice(&REPORT_TAG);
        report[4] = control_byte(i + 2, false, i + 1 == cont_chunks.len());
        report[CONT_HEADER_LEN..CONT_HEADER_LEN + chunk.len()].copy_from_slice(chunk);
        reports.push(report);
    }

    Ok(ReportPlan { reports })
}
