//! Bus transport: owns the device handle and pushes frames onto the wire.
//!
//! The transport is either Closed (no port) or Open (a configured port).
//! Opening goes through an [`SpiConnector`], so the hardware backend and
//! the in-memory test backend share one state machine.

use crate::frame::FrameBuffer;
use std::fmt;
use std::io;
use std::path::PathBuf;

pub const DEFAULT_DEVICE: &str = "/dev/spidev0.0";
pub const DEFAULT_SPEED_HZ: u32 = 2_500_000;

/// How many times [`Transport::clear`] sends the blank frame.
pub const CLEAR_REPEATS: usize = 3;

/// Fixed bus parameters plus the configurable device path and clock rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpiSettings {
    pub device: PathBuf,
    pub speed_hz: u32,
}

impl SpiSettings {
    /// SPI mode 0: clock idles low, data sampled on the leading edge.
    pub const MODE: u8 = 0;
    pub const BITS_PER_WORD: u8 = 8;
    /// Most-significant bit first.
    pub const LSB_FIRST: u8 = 0;
}

impl Default for SpiSettings {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            speed_hz: DEFAULT_SPEED_HZ,
        }
    }
}

/// The configuration step that failed while opening the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupStep {
    Mode,
    BitsPerWord,
    MaxSpeed,
    BitOrder,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStep::Mode => "spidev mode",
            SetupStep::BitsPerWord => "bits-per-word",
            SetupStep::MaxSpeed => "baudrate",
            SetupStep::BitOrder => "bit order",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to open device '{}': {source}", device.display())]
    Open {
        device: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to set {step} on device '{}': {source}", device.display())]
    Setup {
        step: SetupStep,
        device: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeviceError {
    /// Underlying OS error code, when there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            DeviceError::Open { source, .. } | DeviceError::Setup { source, .. } => {
                source.raw_os_error()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("device is not open")]
    NotOpen,
    #[error("write failed: {0}")]
    System(#[source] io::Error),
    #[error("incomplete transfer: wrote {written} of {expected} bytes")]
    Incomplete { written: usize, expected: usize },
}

/// An open, configured bus. Dropping it releases the device.
pub trait SpiPort {
    /// Send `bytes` in one transfer, returning how many were written.
    fn transfer(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

/// Opens and configures ports.
pub trait SpiConnector {
    type Port: SpiPort;

    fn connect(&mut self, settings: &SpiSettings) -> Result<Self::Port, DeviceError>;
}

/// The device handle plus the frame that gets written to it.
pub struct Transport<C: SpiConnector> {
    connector: C,
    settings: SpiSettings,
    port: Option<C::Port>,
    frame: FrameBuffer,
}

impl<C: SpiConnector> Transport<C> {
    pub fn new(connector: C, settings: SpiSettings, frame: FrameBuffer) -> Self {
        Self {
            connector,
            settings,
            port: None,
            frame,
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frame
    }

    /// Open and configure the bus, then blank the strip.
    ///
    /// Already open is fine; the strip is blanked again either way.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        if self.port.is_none() {
            match self.connector.connect(&self.settings) {
                Ok(port) => {
                    tracing::debug!("opened {}", self.settings.device.display());
                    self.port = Some(port);
                }
                Err(e) => {
                    tracing::error!(code = e.raw_os_error(), "ws2801-spidev: {e}");
                    return Err(e);
                }
            }
        }

        self.clear();
        Ok(())
    }

    /// Write the whole frame in one transfer, then advance the blend window.
    ///
    /// The window advances even when the write fails.
    pub fn commit(&mut self) -> Result<(), TransferError> {
        let result = match self.port.as_mut() {
            None => Err(TransferError::NotOpen),
            Some(port) => {
                let expected = self.frame.as_bytes().len();
                match port.transfer(self.frame.as_bytes()) {
                    Ok(written) if written == expected => Ok(()),
                    Ok(written) => Err(TransferError::Incomplete { written, expected }),
                    Err(e) => Err(TransferError::System(e)),
                }
            }
        };

        self.frame.advance();
        result
    }

    /// Blank the strip: zero the frame and send it three times in case
    /// noise on the line latched a stray LED. Failures are only logged.
    pub fn clear(&mut self) {
        self.frame.clear();
        if self.port.is_none() {
            return;
        }

        for attempt in 1..=CLEAR_REPEATS {
            if let Err(e) = self.commit() {
                tracing::warn!(attempt, "ws2801-spidev: clearing LEDs failed: {e}");
            }
        }
    }

    /// Blank the strip and release the device. No-op when already closed.
    pub fn stop(&mut self) {
        if self.port.is_none() {
            return;
        }

        self.clear();
        self.port = None;
        tracing::debug!("closed {}", self.settings.device.display());
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Behaviour, RecordingConnector};
    use super::*;
    use crate::Color;
    use crate::gamma::GammaCorrection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn transport(
        connector: RecordingConnector,
        leds: usize,
        blend: usize,
    ) -> Transport<RecordingConnector> {
        let frame = FrameBuffer::new(leds, blend, GammaCorrection::new(1.0, 1.0, 1.0));
        Transport::new(connector, SpiSettings::default(), frame)
    }

    #[test]
    fn start_opens_and_clears_three_times() {
        let connector = RecordingConnector::default();
        let wire = connector.wire.clone();
        let mut t = transport(connector, 2, 0);

        t.start().unwrap();

        assert!(t.is_open());
        let wire = wire.borrow();
        assert_eq!(wire.opens, 1);
        assert_eq!(wire.frames, vec![vec![0u8; 6]; 3]);
    }

    #[test]
    fn start_twice_does_not_reopen() {
        let connector = RecordingConnector::default();
        let wire = connector.wire.clone();
        let mut t = transport(connector, 1, 0);

        t.start().unwrap();
        t.start().unwrap();

        assert_eq!(wire.borrow().opens, 1);
        assert_eq!(wire.borrow().frames.len(), 6);
    }

    #[test]
    fn open_failure_leaves_transport_closed() {
        let connector = RecordingConnector {
            fail_open: Some(2),
            ..Default::default()
        };
        let mut t = transport(connector, 1, 0);

        let err = t.start().unwrap_err();

        assert!(matches!(err, DeviceError::Open { .. }));
        assert_eq!(err.raw_os_error(), Some(2));
        assert!(!t.is_open());
    }

    #[rstest]
    #[case(SetupStep::Mode)]
    #[case(SetupStep::BitsPerWord)]
    #[case(SetupStep::MaxSpeed)]
    #[case(SetupStep::BitOrder)]
    fn setup_failure_reports_step_and_releases_handle(#[case] step: SetupStep) {
        let connector = RecordingConnector {
            fail_step: Some(step),
            ..Default::default()
        };
        let wire = connector.wire.clone();
        let mut t = transport(connector, 1, 0);

        match t.start() {
            Err(DeviceError::Setup { step: failed, .. }) => assert_eq!(failed, step),
            other => panic!("expected setup error, got {other:?}"),
        }
        assert!(!t.is_open());
        assert_eq!(wire.borrow().closes, 1);
        assert!(wire.borrow().frames.is_empty());
    }

    #[test]
    fn commit_writes_whole_frame() {
        let connector = RecordingConnector::default();
        let wire = connector.wire.clone();
        let mut t = transport(connector, 2, 0);
        t.start().unwrap();

        t.frame_mut().set_led(1, Color::new(1, 2, 3));
        t.commit().unwrap();

        assert_eq!(wire.borrow().frames.last().unwrap(), &vec![0, 0, 0, 3, 2, 1]);
    }

    #[test]
    fn commit_when_closed_is_not_open() {
        let mut t = transport(RecordingConnector::default(), 1, 0);
        assert!(matches!(t.commit(), Err(TransferError::NotOpen)));
    }

    #[test]
    fn short_write_is_incomplete() {
        let connector = RecordingConnector::default();
        let behaviour = connector.behaviour.clone();
        let mut t = transport(connector, 2, 0);
        t.start().unwrap();

        *behaviour.borrow_mut() = Behaviour::Short(4);
        match t.commit() {
            Err(TransferError::Incomplete { written, expected }) => {
                assert_eq!((written, expected), (4, 6));
            }
            other => panic!("expected incomplete transfer, got {other:?}"),
        }
    }

    #[test]
    fn failed_write_carries_os_error() {
        let connector = RecordingConnector::default();
        let behaviour = connector.behaviour.clone();
        let mut t = transport(connector, 1, 0);
        t.start().unwrap();

        *behaviour.borrow_mut() = Behaviour::Fail(5);
        match t.commit() {
            Err(TransferError::System(e)) => assert_eq!(e.raw_os_error(), Some(5)),
            other => panic!("expected system error, got {other:?}"),
        }
    }

    #[test]
    fn commit_advances_window_even_on_failure() {
        let connector = RecordingConnector::default();
        let behaviour = connector.behaviour.clone();
        let mut t = transport(connector, 1, 4);
        t.start().unwrap();
        // start() cleared with three commits.
        assert_eq!(t.frame().window().unwrap().cursor(), 3);

        *behaviour.borrow_mut() = Behaviour::Fail(5);
        assert!(t.commit().is_err());
        assert_eq!(t.frame().window().unwrap().cursor(), 0);
    }

    #[test]
    fn clear_sends_three_frames_despite_failures() {
        let connector = RecordingConnector::default();
        let wire = connector.wire.clone();
        let behaviour = connector.behaviour.clone();
        let mut t = transport(connector, 2, 0);
        t.start().unwrap();
        t.frame_mut().set_led(0, Color::new(9, 9, 9));

        *behaviour.borrow_mut() = Behaviour::Fail(5);
        wire.borrow_mut().frames.clear();
        t.clear();

        assert!(t.frame().as_bytes().iter().all(|b| *b == 0));
        assert_eq!(wire.borrow().frames, vec![vec![0u8; 6]; CLEAR_REPEATS]);
    }

    #[test]
    fn stop_clears_then_closes() {
        let connector = RecordingConnector::default();
        let wire = connector.wire.clone();
        let mut t = transport(connector, 1, 0);
        t.start().unwrap();
        t.frame_mut().set_led(0, Color::new(255, 0, 0));
        t.commit().unwrap();

        t.stop();

        assert!(!t.is_open());
        let wire = wire.borrow();
        assert_eq!(wire.closes, 1);
        // 3 from start, 1 commit, 3 from stop.
        assert_eq!(wire.frames.len(), 7);
        assert_eq!(wire.frames[6], vec![0, 0, 0]);
    }

    #[test]
    fn stop_when_closed_is_a_no_op() {
        let connector = RecordingConnector::default();
        let wire = connector.wire.clone();
        let mut t = transport(connector, 1, 0);

        t.stop();
        t.stop();

        assert_eq!(wire.borrow().frames.len(), 0);
        assert_eq!(wire.borrow().closes, 0);
    }

    #[test]
    fn restart_after_stop_reopens() {
        let connector = RecordingConnector::default();
        let wire = connector.wire.clone();
        let mut t = transport(connector, 1, 0);

        t.start().unwrap();
        t.stop();
        t.start().unwrap();

        assert!(t.is_open());
        assert_eq!(wire.borrow().opens, 2);
    }
}
