//! Transmission buffer and temporal blending.
//!
//! The wire format is 3 bytes per physical LED in B, G, R order. The
//! blend window keeps the last N raw writes per LED in the same layout so
//! each output can be smoothed over recent frames before gamma correction.

use crate::Color;
use crate::gamma::GammaCorrection;

/// Bytes per LED on the wire.
pub const BYTES_PER_LED: usize = 3;

fn encode(block: &mut [u8], c: Color) {
    block[0] = c.b;
    block[1] = c.g;
    block[2] = c.r;
}

/// A rolling window of raw frames used to average each LED over time.
#[derive(Clone, Debug)]
pub struct BlendWindow {
    slots: Vec<Vec<u8>>,
    cursor: usize,
}

impl BlendWindow {
    /// Create a window of `frames` zeroed slots, or `None` when fewer than
    /// two frames would make blending a no-op.
    pub fn new(frames: usize, led_count: usize) -> Option<Self> {
        if frames < 2 {
            return None;
        }
        Some(Self {
            slots: vec![vec![0; led_count * BYTES_PER_LED]; frames],
            cursor: 0,
        })
    }

    /// Slot that the next write lands in.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Record `c` for `led` in the current slot and return the truncated
    /// mean of that LED across every slot.
    pub fn blend(&mut self, led: usize, c: Color) -> Color {
        let offset = led * BYTES_PER_LED;
        encode(&mut self.slots[self.cursor][offset..offset + BYTES_PER_LED], c);

        let mut sums = [0u64; BYTES_PER_LED];
        for slot in &self.slots {
            for (sum, byte) in sums.iter_mut().zip(&slot[offset..offset + BYTES_PER_LED]) {
                *sum += u64::from(*byte);
            }
        }

        let n = self.slots.len() as u64;
        Color {
            b: (sums[0] / n) as u8,
            g: (sums[1] / n) as u8,
            r: (sums[2] / n) as u8,
        }
    }

    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.slots.len();
    }
}

/// The bytes that go on the wire, plus the optional blend window feeding them.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    wire: Vec<u8>,
    window: Option<BlendWindow>,
    gamma: GammaCorrection,
}

impl FrameBuffer {
    pub fn new(led_count: usize, blended_frames: usize, gamma: GammaCorrection) -> Self {
        Self {
            wire: vec![0; led_count * BYTES_PER_LED],
            window: BlendWindow::new(blended_frames, led_count),
            gamma,
        }
    }

    pub fn led_count(&self) -> usize {
        self.wire.len() / BYTES_PER_LED
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.wire
    }

    pub fn window(&self) -> Option<&BlendWindow> {
        self.window.as_ref()
    }

    /// Blend, gamma-correct and encode `c` into the block for physical `led`.
    ///
    /// Panics if `led` is outside the buffer; callers resolve outputs
    /// through a validated strand map first.
    pub fn set_led(&mut self, led: usize, c: Color) {
        let blended = match self.window.as_mut() {
            Some(window) => window.blend(led, c),
            None => c,
        };
        let corrected = self.gamma.correct(blended);

        let offset = led * BYTES_PER_LED;
        encode(&mut self.wire[offset..offset + BYTES_PER_LED], corrected);
    }

    /// Zero every wire byte. The blend history is left alone.
    pub fn clear(&mut self) {
        self.wire.fill(0);
    }

    /// Move the blend window on to its next slot after a frame goes out.
    pub fn advance(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn identity() -> GammaCorrection {
        GammaCorrection::new(1.0, 1.0, 1.0)
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(25)]
    fn wire_is_three_bytes_per_led(#[case] leds: usize) {
        let frame = FrameBuffer::new(leds, 0, identity());
        assert_eq!(frame.as_bytes().len(), 3 * leds);
        assert_eq!(frame.led_count(), leds);
    }

    #[test]
    fn set_led_writes_bgr_block() {
        let mut frame = FrameBuffer::new(3, 0, identity());
        frame.set_led(1, Color::new(10, 20, 30));
        assert_eq!(frame.as_bytes(), &[0, 0, 0, 30, 20, 10, 0, 0, 0]);
    }

    #[test]
    fn set_led_applies_gamma_per_channel() {
        let mut frame = FrameBuffer::new(1, 0, GammaCorrection::new(2.0, -1.0, -1.0));
        frame.set_led(0, Color::new(128, 128, 64));
        assert_eq!(frame.as_bytes(), &[64, 128, 181]);
    }

    #[test]
    fn set_led_is_idempotent_without_blending() {
        let mut frame = FrameBuffer::new(2, 0, GammaCorrection::new(1.6, 1.6, 1.6));
        frame.set_led(0, Color::new(1, 2, 3));
        let first = frame.as_bytes().to_vec();
        frame.set_led(0, Color::new(1, 2, 3));
        assert_eq!(frame.as_bytes(), first.as_slice());
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn small_windows_disable_blending(#[case] frames: usize) {
        let frame = FrameBuffer::new(4, frames, identity());
        assert!(frame.window().is_none());
    }

    #[test]
    fn blending_averages_with_zeroed_history() {
        let mut frame = FrameBuffer::new(1, 2, identity());
        frame.set_led(0, Color::new(100, 51, 9));
        // (100 + 0) / 2, (51 + 0) / 2 truncated, (9 + 0) / 2 truncated
        assert_eq!(frame.as_bytes(), &[4, 25, 50]);
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    fn constant_input_converges_after_window_frames(#[case] frames: usize) {
        let mut frame = FrameBuffer::new(2, frames, identity());
        let c = Color::new(200, 7, 99);
        for _ in 0..frames {
            frame.set_led(1, c);
            frame.advance();
        }
        assert_eq!(&frame.as_bytes()[3..], &[99, 7, 200]);
    }

    #[test]
    fn rewriting_the_same_slot_is_idempotent() {
        let mut frame = FrameBuffer::new(1, 3, identity());
        frame.set_led(0, Color::new(90, 90, 90));
        frame.advance();
        frame.set_led(0, Color::new(30, 30, 30));
        let first = frame.as_bytes().to_vec();
        frame.set_led(0, Color::new(30, 30, 30));
        assert_eq!(frame.as_bytes(), first.as_slice());
        assert_eq!(first, vec![40, 40, 40]);
    }

    #[test]
    fn full_brightness_survives_the_largest_window() {
        let frames = crate::config::MAX_BLENDED_FRAMES as usize;
        let mut window = BlendWindow::new(frames, 1).unwrap();
        let mut last = Color::new(0, 0, 0);
        for _ in 0..frames {
            last = window.blend(0, Color::new(255, 255, 255));
            window.advance();
        }
        assert_eq!(last, Color::new(255, 255, 255));
    }

    #[test]
    fn window_cursor_wraps() {
        let mut window = BlendWindow::new(3, 1).unwrap();
        let cursors: Vec<usize> = (0..5)
            .map(|_| {
                let c = window.cursor();
                window.advance();
                c
            })
            .collect();
        assert_eq!(cursors, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn clear_zeroes_wire_but_keeps_history() {
        let mut frame = FrameBuffer::new(1, 2, identity());
        frame.set_led(0, Color::new(20, 20, 20));
        frame.clear();
        assert_eq!(frame.as_bytes(), &[0, 0, 0]);

        // History still holds the 20s in slot 0.
        frame.advance();
        frame.set_led(0, Color::new(40, 40, 40));
        assert_eq!(frame.as_bytes(), &[30, 30, 30]);
    }
}
