//! Drivers for the Analog Devices AD3552R dual channel 16 bit DAC and the
//! ADXL367 3-axis accelerometer.
//!
//! Both drivers sit on top of an [`embedded_hal::spi::SpiDevice`], so the
//! chip select and the bus clock configuration belong to the HAL. Use
//! [`ad3552r::SPI_MODE`] and [`adxl367::SPI_MODE`] when setting up the bus.
//!
//! The DAC separates staging codes in the input registers from latching them
//! to the outputs, which keeps both channels phase aligned:
//! ```ignore
//! let mut dac = Ad3552r::new(spi, ad3552r::Config::fmcz());
//! dac.init(&mut delay)?;
//! dac.write_samples(&[1000, 3000], 1, Channel::Both, UpdateTarget::InputRegisters)?;
//! dac.ldac_trigger(Channel::Both, false)?;
//! ```

#![deny(unsafe_code, missing_docs)]
#![no_std]

use core::convert::Infallible;

use embedded_hal::digital::{self, ErrorType, OutputPin};

pub mod ad3552r;
pub mod adxl367;
pub mod board;
mod crc;

pub use ad3552r::Ad3552r;
pub use adxl367::Adxl367;

/// Errors for this crate
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// SPI communication error
    Spi(E),
    /// GPIO error
    Pin(digital::ErrorKind),
    /// CRC mismatch on a register read
    Crc {
        /// CRC computed over the received frame
        expected: u8,
        /// CRC sent by the device
        found: u8,
    },
    /// Identification register does not match the configured part
    UnexpectedId {
        /// Configured identifier
        expected: u16,
        /// Identifier read back from the device
        found: u16,
    },
    /// Scratch pad readback differs from the written value
    ScratchPad {
        /// Value written
        expected: u8,
        /// Value read back
        found: u8,
    },
    /// Device did not leave reset in time
    ResetTimeout,
    /// Self-test response out of tolerance
    SelfTest {
        /// Measured self-test delta in micro-g
        delta_ug: i32,
    },
    /// Operation not allowed in the current device state
    InvalidState,
    /// A destination buffer is too small for the data requested
    BufferOverflow,
    /// An operation needed a GPIO that was not provided
    MissingPin,
    /// Invalid argument
    InvalidArgument,
}

impl<E> Error<E> {
    pub(crate) fn pin<P: digital::Error>(err: P) -> Self {
        Error::Pin(err.kind())
    }
}

/// Stand-in for an optional GPIO that is not wired up.
///
/// Used as the default type parameter for optional pins so that a driver
/// without them can still be named, e.g. `Ad3552r<SPI>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
