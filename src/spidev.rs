//! Linux spidev backend.
//!
//! Opens `/dev/spidevB.C` write-only and configures it through the
//! `SPI_IOC_WR_*` ioctls. Frames go out with a single `write(2)`, which
//! spidev turns into one SPI transfer.

use crate::transport::{DeviceError, SetupStep, SpiConnector, SpiPort, SpiSettings};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};

// ── ioctl request numbers (linux/spi/spidev.h) ───────────────────────

const SPI_IOC_MAGIC: u8 = b'k';

/// `_IOW(SPI_IOC_MAGIC, nr, T)` for the common asm-generic encoding.
const fn iow<T>(nr: u8) -> u64 {
    const IOC_WRITE: u64 = 1;
    (IOC_WRITE << 30)
        | ((std::mem::size_of::<T>() as u64) << 16)
        | ((SPI_IOC_MAGIC as u64) << 8)
        | nr as u64
}

const SPI_IOC_WR_MODE: u64 = iow::<u8>(1);
const SPI_IOC_WR_LSB_FIRST: u64 = iow::<u8>(2);
const SPI_IOC_WR_BITS_PER_WORD: u64 = iow::<u8>(3);
const SPI_IOC_WR_MAX_SPEED_HZ: u64 = iow::<u32>(4);

fn write_param<T>(fd: RawFd, request: u64, value: &T) -> io::Result<()> {
    // SAFETY: `request` encodes `size_of::<T>()`, and the kernel only
    // reads that many bytes from `value`, which outlives the call.
    let ret = unsafe { libc::ioctl(fd, request as _, value as *const T) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Connector for kernel spidev devices.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spidev;

/// An open spidev file. Closed on drop.
#[derive(Debug)]
pub struct SpidevPort {
    file: File,
}

impl SpiPort for SpidevPort {
    fn transfer(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.file.write(bytes)
    }
}

impl SpiConnector for Spidev {
    type Port = SpidevPort;

    fn connect(&mut self, settings: &SpiSettings) -> Result<SpidevPort, DeviceError> {
        let device = &settings.device;
        let file = OpenOptions::new()
            .write(true)
            .open(device)
            .map_err(|source| DeviceError::Open {
                device: device.clone(),
                source,
            })?;

        let fd = file.as_raw_fd();
        let setup = |step: SetupStep| {
            move |source: io::Error| DeviceError::Setup {
                step,
                device: device.clone(),
                source,
            }
        };

        // Any early return drops `file`, closing the descriptor.
        write_param(fd, SPI_IOC_WR_MODE, &SpiSettings::MODE).map_err(setup(SetupStep::Mode))?;
        write_param(fd, SPI_IOC_WR_BITS_PER_WORD, &SpiSettings::BITS_PER_WORD)
            .map_err(setup(SetupStep::BitsPerWord))?;
        write_param(fd, SPI_IOC_WR_MAX_SPEED_HZ, &settings.speed_hz)
            .map_err(setup(SetupStep::MaxSpeed))?;
        write_param(fd, SPI_IOC_WR_LSB_FIRST, &SpiSettings::LSB_FIRST)
            .map_err(setup(SetupStep::BitOrder))?;

        Ok(SpidevPort { file })
    }
}
