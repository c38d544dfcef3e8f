//! WS2801 output driver for an ambient-light LED frame around a screen.
//!
//! Upstream code decides what color each border position should show;
//! this crate gets that color onto the right physical LED:
//! - [`strand`]: logical outputs → physical LEDs → screen-edge points
//! - [`gamma`]: per-channel gamma lookup tables
//! - [`frame`]: temporal blending and the B, G, R wire buffer
//! - [`transport`]: device lifecycle and frame transfers
//! - [`config`]: the sink's command-line options
//! - [`sink`]: all of the above behind the [`Sink`] capability trait
//!
//! The spidev backend sits behind the `hardware` feature so the rest can
//! be tested anywhere with `cargo test --no-default-features`.

pub mod config;
pub mod frame;
pub mod gamma;
pub mod sink;
#[cfg(feature = "hardware")]
pub mod spidev;
pub mod strand;
pub mod transport;

pub use config::{ConfigError, SinkArgs, Ws2801Config};
pub use sink::{Error, Sink, Ws2801Sink};
pub use strand::{Point, Strand, StrandMap, StrandSpec};
pub use transport::{DeviceError, SpiConnector, SpiPort, SpiSettings, TransferError};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Color ──────────────────────────────────────────────────────────

/// An 8-bit RGB color as produced by the ambient-light pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a hue value (0-360), with full saturation and brightness.
    pub fn from_hue(hue: u16) -> Self {
        let hue = hue % 360;
        let sector = hue / 60;
        let fraction = ((hue % 60) as f32) / 60.0;
        let rising = (fraction * 255.0) as u8;
        let falling = ((1.0 - fraction) * 255.0) as u8;

        match sector {
            0 => Self::new(255, rising, 0),  // Red → Yellow
            1 => Self::new(falling, 255, 0), // Yellow → Green
            2 => Self::new(0, 255, rising),  // Green → Cyan
            3 => Self::new(0, falling, 255), // Cyan → Blue
            4 => Self::new(rising, 0, 255),  // Blue → Magenta
            _ => Self::new(255, 0, falling), // Magenta → Red
        }
    }

    /// Apply brightness scaling (0-100) to this color.
    pub fn apply_brightness(self, brightness: u8) -> Self {
        if brightness >= 100 {
            return self;
        }
        Self {
            r: ((self.r as u16 * brightness as u16) / 100) as u8,
            g: ((self.g as u16 * brightness as u16) / 100) as u8,
            b: ((self.b as u16 * brightness as u16) / 100) as u8,
        }
    }
}

// ── Shutdown ───────────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets the returned flag to false.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
