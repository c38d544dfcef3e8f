//! The WS2801 sink: strand map, color pipeline and transport behind one
//! capability interface.
//!
//! Per frame the caller sets every output it cares about, then commits:
//!
//! ```ignore
//! # use ws2801_spidev::{Color, Sink, Ws2801Sink};
//! # fn main() -> Result<(), ws2801_spidev::Error> {
//! let mut sink = Ws2801Sink::from_args(["ws2801", "--leds-top", "0-9"])?;
//! sink.start()?;
//! for output in 0..sink.num_outputs() {
//!     let _ = sink.set_output_to_rgb(output, Color::new(255, 80, 0));
//! }
//! sink.commit()?;
//! sink.stop()?;
//! # Ok(())
//! # }
//! ```

use crate::Color;
use crate::config::{ConfigError, Ws2801Config};
use crate::frame::FrameBuffer;
use crate::gamma::GammaCorrection;
use crate::strand::{Point, Strand, StrandMap};
use crate::transport::{DeviceError, SpiConnector, TransferError, Transport};
use std::ffi::OsString;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("output {0} has no LED")]
    UnmappedOutput(usize),
}

/// What the ambient-light pipeline needs from an LED output device.
pub trait Sink {
    /// Acquire the device and blank it.
    fn start(&mut self) -> Result<(), Error>;
    /// Blank the device and release it. Safe to call when not started.
    fn stop(&mut self) -> Result<(), Error>;
    /// Number of logical outputs, including positions without an LED.
    fn num_outputs(&self) -> usize;
    /// Screen point that `output` samples from, or `None` when it has no LED.
    fn map_output_to_point(&self, output: usize, width: i32, height: i32) -> Option<Point>;
    fn set_output_to_rgb(&mut self, output: usize, color: Color) -> Result<(), Error>;
    /// Send the current frame.
    fn commit(&mut self) -> Result<(), Error>;
    /// Log the active configuration.
    fn print_configuration(&self);
}

/// A WS2801 strip on a spidev bus.
pub struct Ws2801Sink<C: SpiConnector> {
    config: Ws2801Config,
    transport: Transport<C>,
}

#[cfg(feature = "hardware")]
impl Ws2801Sink<crate::spidev::Spidev> {
    /// Configure a sink for the kernel spidev device named in `args`.
    pub fn from_args<I, T>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Ws2801Config::from_args(args)?;
        Ok(Self::new(config, crate::spidev::Spidev))
    }
}

impl<C: SpiConnector> Ws2801Sink<C> {
    /// Size the frame buffer and build the gamma tables for `config`.
    /// The device stays closed until [`Sink::start`].
    pub fn new(config: Ws2801Config, connector: C) -> Self {
        let [red, green, blue] = config.gamma;
        let frame = FrameBuffer::new(
            config.strands.led_count(),
            config.blended_frames,
            GammaCorrection::new(red, green, blue),
        );
        let transport = Transport::new(connector, config.spi.clone(), frame);
        Self { config, transport }
    }

    /// Like [`Ws2801Config::from_args`] with an explicit connector.
    pub fn with_connector<I, T>(args: I, connector: C) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::new(Ws2801Config::from_args(args)?, connector))
    }

    pub fn config(&self) -> &Ws2801Config {
        &self.config
    }

    pub fn strands(&self) -> &StrandMap {
        &self.config.strands
    }

    /// Number of physical LEDs on the wire.
    pub fn led_count(&self) -> usize {
        self.config.strands.led_count()
    }

    pub fn is_started(&self) -> bool {
        self.transport.is_open()
    }

    /// Bytes that the next commit will put on the wire.
    pub fn frame_bytes(&self) -> &[u8] {
        self.transport.frame().as_bytes()
    }

    /// Blank the strip without closing it.
    pub fn clear(&mut self) {
        self.transport.clear();
    }
}

impl<C: SpiConnector> Sink for Ws2801Sink<C> {
    fn start(&mut self) -> Result<(), Error> {
        self.transport.start()?;
        tracing::info!(
            "ws2801-spidev: started {} ({} LEDs)",
            self.config.spi.device.display(),
            self.led_count()
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        if self.transport.is_open() {
            self.transport.stop();
            tracing::info!("ws2801-spidev: stopped {}", self.config.spi.device.display());
        }
        Ok(())
    }

    fn num_outputs(&self) -> usize {
        self.config.strands.num_outputs()
    }

    fn map_output_to_point(&self, output: usize, width: i32, height: i32) -> Option<Point> {
        self.config.strands.project_to_screen(output, width, height)
    }

    fn set_output_to_rgb(&mut self, output: usize, color: Color) -> Result<(), Error> {
        let resolved = self
            .config
            .strands
            .resolve(output)
            .ok_or(Error::UnmappedOutput(output))?;
        self.transport.frame_mut().set_led(resolved.led, color);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Error> {
        Ok(self.transport.commit()?)
    }

    fn print_configuration(&self) {
        let c = &self.config;
        let [top, bottom, left, right] = Strand::ALL.map(|s| c.inset_percent(s));
        tracing::info!(
            "\tdevice name:       {}\n\
             \tspi hz:            {}\n\
             \tnumber of leds:    {}\n\
             \tblending frames:   {}\n\
             \tled insets (tblr): {top:.1}%, {bottom:.1}%, {left:.1}%, {right:.1}%\n\
             \tgamma (rgb):       {:.2}, {:.2}, {:.2}",
            c.spi.device.display(),
            c.spi.speed_hz,
            self.led_count(),
            c.blended_frames,
            c.gamma[0],
            c.gamma[1],
            c.gamma[2],
        );
    }
}

impl<C: SpiConnector> Drop for Ws2801Sink<C> {
    fn drop(&mut self) {
        if self.transport.is_open() {
            tracing::debug!("ws2801-spidev: stopping on drop");
            self.transport.stop();
        }
    }
}
