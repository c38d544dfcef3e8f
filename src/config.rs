//! Sink configuration: option parsing and validation.
//!
//! Options arrive as an argv-style list whose first element is the
//! component name, e.g.
//!
//! ```text
//! ws2801 --leds-top 33-56 --leds-left 32-28,X4,27-14 --blended-frames 4
//! ```

use crate::strand::{LayoutError, Strand, StrandMap, StrandSpec};
use crate::transport::{DEFAULT_DEVICE, DEFAULT_SPEED_HZ, SpiSettings};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

pub const DEFAULT_GAMMA: f64 = 1.6;

/// Largest accepted `--blended-frames`.
pub const MAX_BLENDED_FRAMES: u64 = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Unparseable value, bad LED string or stray positional argument.
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error("invalid LED layout: {0}")]
    Layout(#[from] LayoutError),
}

/// Options recognized by the WS2801 sink.
#[derive(Parser, Debug, Clone)]
#[command(
    about = "WS2801 LED strip on a spidev bus",
    disable_version_flag = true,
    args_override_self = true
)]
pub struct SinkArgs {
    /// SPI device to open
    #[arg(long, default_value = DEFAULT_DEVICE)]
    pub spi_device: PathBuf,

    /// SPI clock rate in Hz
    #[arg(long, default_value_t = DEFAULT_SPEED_HZ, value_parser = clap::value_parser!(u32).range(1..))]
    pub spi_speed_hz: u32,

    /// LEDs along the top edge, e.g. "33-56" or "0,X2,1-4"
    #[arg(long, allow_hyphen_values = true)]
    pub leds_top: Option<StrandSpec>,

    /// LEDs along the bottom edge
    #[arg(long, allow_hyphen_values = true)]
    pub leds_bottom: Option<StrandSpec>,

    /// LEDs along the left edge
    #[arg(long, allow_hyphen_values = true)]
    pub leds_left: Option<StrandSpec>,

    /// LEDs along the right edge
    #[arg(long, allow_hyphen_values = true)]
    pub leds_right: Option<StrandSpec>,

    /// Number of frames to average over (0 or 1 disables blending)
    #[arg(
        long,
        default_value_t = 0,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(0..=MAX_BLENDED_FRAMES)
    )]
    pub blended_frames: usize,

    /// Red gamma exponent (negative disables correction)
    #[arg(long, default_value_t = DEFAULT_GAMMA, allow_negative_numbers = true)]
    pub gamma_red: f64,

    /// Green gamma exponent (negative disables correction)
    #[arg(long, default_value_t = DEFAULT_GAMMA, allow_negative_numbers = true)]
    pub gamma_green: f64,

    /// Blue gamma exponent (negative disables correction)
    #[arg(long, default_value_t = DEFAULT_GAMMA, allow_negative_numbers = true)]
    pub gamma_blue: f64,

    /// Inset of the top strand's end LEDs, in percent of the screen width
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub led_inset_top: f64,

    /// Inset of the bottom strand's end LEDs, in percent of the screen width
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub led_inset_bottom: f64,

    /// Inset of the left strand's end LEDs, in percent of the screen height
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub led_inset_left: f64,

    /// Inset of the right strand's end LEDs, in percent of the screen height
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub led_inset_right: f64,
}

/// Validated sink configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Ws2801Config {
    pub spi: SpiSettings,
    pub strands: StrandMap,
    /// Blend window size; always 0 or at least 2.
    pub blended_frames: usize,
    /// Red, green, blue.
    pub gamma: [f64; 3],
}

impl Default for Ws2801Config {
    fn default() -> Self {
        Self {
            spi: SpiSettings::default(),
            strands: StrandMap::default(),
            blended_frames: 0,
            gamma: [DEFAULT_GAMMA; 3],
        }
    }
}

impl Ws2801Config {
    /// Parse and validate `args`. The first element is the component name.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        SinkArgs::try_parse_from(args)
            .map_err(ConfigError::from)
            .and_then(Self::try_from)
            .inspect_err(|e| tracing::error!("ws2801-spidev: {e}"))
    }

    /// Inset of `strand` in percent, as given on the command line.
    pub fn inset_percent(&self, strand: Strand) -> f64 {
        self.strands.inset(strand) * 100.0
    }
}

impl TryFrom<SinkArgs> for Ws2801Config {
    type Error = ConfigError;

    fn try_from(args: SinkArgs) -> Result<Self, Self::Error> {
        let strands = [args.leds_top, args.leds_bottom, args.leds_left, args.leds_right]
            .map(Option::unwrap_or_default);
        let insets = [
            args.led_inset_top,
            args.led_inset_bottom,
            args.led_inset_left,
            args.led_inset_right,
        ]
        .map(|percent| percent / 100.0);

        let blended_frames = if args.blended_frames > 1 {
            args.blended_frames
        } else {
            0
        };

        Ok(Self {
            spi: SpiSettings {
                device: args.spi_device,
                speed_hz: args.spi_speed_hz,
            },
            strands: StrandMap::new(strands, insets)?,
            blended_frames,
            gamma: [args.gamma_red, args.gamma_green, args.gamma_blue],
        })
    }
}
