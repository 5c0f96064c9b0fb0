//! ADXL367 3-axis accelerometer
//!
//! The driver tracks the power state of the part. Configuration is only
//! accepted in standby, the FIFO can only be drained while measuring:
//!
//! ```text
//! Uninitialized -> Standby <-> Measuring
//! ```
//!
//! FIFO samples are decoded into [`FractionalValue`]s in m/s² and °C.
use core::fmt;

use bitfield_struct::bitfield;
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{self, Operation, SpiDevice};
use embedded_hal_async::digital::Wait;

use crate::Error;

/// SPI mode of the ADXL367, data is clocked MSB first
pub const SPI_MODE: spi::Mode = spi::MODE_0;
/// Maximum SPI clock frequency in Hz
pub const MAX_SPI_HZ: u32 = 8_000_000;
/// Number of samples the FIFO can hold
pub const FIFO_DEPTH: u16 = 512;
/// Largest watermark the 9 bit FIFO_SAMPLES field holds
pub const MAX_WATERMARK: u16 = 511;

const DEVID_AD: u8 = 0xAD;
const DEVID_MST: u8 = 0x1D;
const PARTID: u8 = 0xF7;
const SOFT_RESET_CODE: u8 = 0x52;
const RESET_SETTLE_US: u32 = 1_000;

// FIFO words fetched per SPI transaction
const FIFO_CHUNK_WORDS: usize = 32;

const SELF_TEST_SETTLE_PERIODS: u32 = 4;
const SELF_TEST_MIN_UG: i32 = 90_000;
const SELF_TEST_MAX_UG: i32 = 270_000;

// 1 ug = 9806.65 nm/s^2
const NANO_PER_UG_X100: i64 = 980_665;
// degC = (raw + 1185) / 54
const TEMP_OFFSET_LSB: i64 = 1_185;
const TEMP_NANO_PER_LSB: i64 = 18_518_518;

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum Command {
    WriteRegister = 0x0A,
    ReadRegister = 0x0B,
    ReadFifo = 0x0D,
}

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum Register {
    DevIdAd = 0x00,
    Status = 0x0B,
    FifoEntriesL = 0x0C,
    XDataH = 0x0E,
    SoftReset = 0x1F,
    FifoControl = 0x28,
    IntMap1Lower = 0x2A,
    IntMap2Lower = 0x2B,
    FilterCtl = 0x2C,
    PowerCtl = 0x2D,
    SelfTest = 0x2E,
    TempCtl = 0x3D,
}

#[bitfield(u8)]
struct FilterCtl {
    #[bits(3)]
    odr: u8,
    #[bits(3)]
    _unused: u8,
    #[bits(2)]
    range: u8,
}

#[bitfield(u8)]
struct PowerCtl {
    #[bits(2)]
    measure: u8,
    #[bits(6)]
    _unused: u8,
}

#[bitfield(u8)]
struct FifoControl {
    #[bits(2)]
    mode: u8,
    #[bits(1)]
    samples_msb: bool,
    #[bits(4)]
    channel_select: u8,
    #[bits(1)]
    _unused: bool,
}

#[bitfield(u8)]
struct SelfTestRegister {
    #[bits(1)]
    st: bool,
    #[bits(1)]
    st_force: bool,
    #[bits(6)]
    _unused: u8,
}

#[bitfield(u8)]
struct TempCtl {
    #[bits(1)]
    temp_en: bool,
    #[bits(7)]
    _unused: u8,
}

/// Content of the STATUS register
#[bitfield(u8)]
pub struct Status {
    /// A new sample is available in the data registers
    #[bits(1)]
    pub data_ready: bool,
    /// The FIFO holds at least one sample
    #[bits(1)]
    pub fifo_ready: bool,
    /// The FIFO holds at least the watermark number of samples
    #[bits(1)]
    pub fifo_watermark: bool,
    /// Samples were lost because the FIFO was full
    #[bits(1)]
    pub fifo_overrun: bool,
    /// Activity detected
    #[bits(1)]
    pub activity: bool,
    /// Inactivity detected
    #[bits(1)]
    pub inactivity: bool,
    /// The part is awake
    #[bits(1)]
    pub awake: bool,
    /// User register configuration error
    #[bits(1)]
    pub err_user_regs: bool,
}

/// Interrupt sources routed to INT1 or INT2
#[bitfield(u8)]
pub struct IntMap {
    /// Data ready
    #[bits(1)]
    pub data_ready: bool,
    /// FIFO not empty
    #[bits(1)]
    pub fifo_ready: bool,
    /// FIFO watermark reached
    #[bits(1)]
    pub fifo_watermark: bool,
    /// FIFO overrun
    #[bits(1)]
    pub fifo_overrun: bool,
    /// Activity
    #[bits(1)]
    pub activity: bool,
    /// Inactivity
    #[bits(1)]
    pub inactivity: bool,
    /// Awake
    #[bits(1)]
    pub awake: bool,
    /// Drive the pin active low
    #[bits(1)]
    pub active_low: bool,
}

/// Measurement range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Range {
    /// ±2 g
    G2 = 0b00,
    /// ±4 g
    G4 = 0b01,
    /// ±8 g
    G8 = 0b10,
}

impl Range {
    /// Scale factor in micro-g per LSB
    pub fn lsb_ug(self) -> i32 {
        250 << (self as u8)
    }
}

/// Output data rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputRate {
    /// 12.5 Hz
    Hz12_5 = 0,
    /// 25 Hz
    Hz25 = 1,
    /// 50 Hz
    Hz50 = 2,
    /// 100 Hz
    Hz100 = 3,
    /// 200 Hz
    Hz200 = 4,
    /// 400 Hz
    Hz400 = 5,
}

impl OutputRate {
    /// Rate in millihertz
    pub fn millihertz(self) -> u32 {
        12_500 << (self as u8)
    }

    /// Sample period in microseconds
    pub fn period_us(self) -> u32 {
        1_000_000_000 / self.millihertz()
    }
}

/// Power mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerMode {
    /// No measurements, configuration allowed
    Standby = 0b00,
    /// Measuring, samples flow into the FIFO
    Measure = 0b10,
}

/// FIFO operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FifoMode {
    /// FIFO off
    Disabled = 0b00,
    /// Stop storing once full, the oldest samples are kept
    OldestSaved = 0b01,
    /// Overwrite the oldest samples once full
    Stream = 0b10,
    /// Keep samples around an activity event
    Triggered = 0b11,
}

/// Channels stored in the FIFO, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FifoFormat {
    /// X, Y and Z
    Xyz = 0,
    /// X only
    X = 1,
    /// Y only
    Y = 2,
    /// Z only
    Z = 3,
    /// X, Y, Z and temperature
    Xyzt = 4,
    /// X and temperature
    Xt = 5,
    /// Y and temperature
    Yt = 6,
    /// Z and temperature
    Zt = 7,
}

/// Channel id carried in the top two bits of a FIFO word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum FifoChannel {
    X = 0,
    Y = 1,
    Z = 2,
    Temp = 3,
}

impl FifoFormat {
    fn channels(self) -> &'static [FifoChannel] {
        match self {
            Self::Xyz => &[FifoChannel::X, FifoChannel::Y, FifoChannel::Z],
            Self::X => &[FifoChannel::X],
            Self::Y => &[FifoChannel::Y],
            Self::Z => &[FifoChannel::Z],
            Self::Xyzt => &[
                FifoChannel::X,
                FifoChannel::Y,
                FifoChannel::Z,
                FifoChannel::Temp,
            ],
            Self::Xt => &[FifoChannel::X, FifoChannel::Temp],
            Self::Yt => &[FifoChannel::Y, FifoChannel::Temp],
            Self::Zt => &[FifoChannel::Z, FifoChannel::Temp],
        }
    }
}

/// FIFO configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FifoConfig {
    /// Operating mode
    pub mode: FifoMode,
    /// Stored channels
    pub format: FifoFormat,
    /// Watermark in samples, at most [`MAX_WATERMARK`]
    pub watermark: u16,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            mode: FifoMode::Disabled,
            format: FifoFormat::Xyz,
            watermark: 0x80,
        }
    }
}

/// Device configuration, applied by [`Adxl367::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Measurement range
    pub range: Range,
    /// Output data rate
    pub odr: OutputRate,
    /// Sample the temperature sensor
    pub temperature: bool,
    /// FIFO setup
    pub fifo: FifoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            range: Range::G2,
            odr: OutputRate::Hz100,
            temperature: false,
            fifo: FifoConfig::default(),
        }
    }
}

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// [`Adxl367::init`] has not succeeded yet
    Uninitialized,
    /// Standby, configuration allowed
    Standby,
    /// Measuring
    Measuring,
}

/// Fixed point physical value, `integer + fractional / 1e9`.
///
/// The fractional part is always in `0..1e9`, negative values carry their
/// sign in the integer part: -0.25 is `{ integer: -1, fractional: 750_000_000 }`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FractionalValue {
    /// Integer part
    pub integer: i32,
    /// Fractional part in units of 1e-9
    pub fractional: u32,
}

impl FractionalValue {
    /// Units of `fractional` per unit of `integer`
    pub const SCALE: i64 = 1_000_000_000;

    /// Split a value given in units of 1e-9
    pub fn from_nanos(nanos: i64) -> Self {
        Self {
            integer: nanos.div_euclid(Self::SCALE) as i32,
            fractional: nanos.rem_euclid(Self::SCALE) as u32,
        }
    }

    /// The value in units of 1e-9
    pub fn to_nanos(self) -> i64 {
        i64::from(self.integer) * Self::SCALE + i64::from(self.fractional)
    }
}

impl fmt::Display for FractionalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.to_nanos();
        let sign = if nanos < 0 { "-" } else { "" };
        let abs = nanos.unsigned_abs();
        let scale = Self::SCALE as u64;
        write!(f, "{}{}.{:09}", sign, abs / scale, abs % scale)
    }
}

/// Convert a raw acceleration sample to m/s²
pub fn convert_accel(raw: i16, range: Range) -> FractionalValue {
    let ug_x100 = i64::from(raw) * i64::from(range.lsb_ug()) * NANO_PER_UG_X100;
    FractionalValue::from_nanos(ug_x100 / 100)
}

/// Convert a raw temperature sample to °C
pub fn convert_temp(raw: i16) -> FractionalValue {
    FractionalValue::from_nanos((i64::from(raw) + TEMP_OFFSET_LSB) * TEMP_NANO_PER_LSB)
}

/// Sign extend the 14 bit sample below the channel id
fn sample_of(word: u16) -> i16 {
    ((word << 2) as i16) >> 2
}

/// Groups FIFO words into complete records, resynchronising on channel ids
struct FifoDecoder {
    channels: &'static [FifoChannel],
    slot: usize,
    record: [i16; 4],
}

impl FifoDecoder {
    fn new(format: FifoFormat) -> Self {
        Self {
            channels: format.channels(),
            slot: 0,
            record: [0; 4],
        }
    }

    fn push(&mut self, word: u16) -> Option<[i16; 4]> {
        let id = (word >> 14) as u8;
        if id != self.channels[self.slot] as u8 {
            // partial record, start over if this word opens a new one
            self.slot = 0;
            if id != self.channels[0] as u8 {
                return None;
            }
        }
        self.record[self.slot] = sample_of(word);
        self.slot += 1;
        if self.slot == self.channels.len() {
            self.slot = 0;
            Some(self.record)
        } else {
            None
        }
    }
}

/// ADXL367 accelerometer on a SPI bus
pub struct Adxl367<DEV> {
    spi: DEV,
    cfg: Config,
    state: State,
}

impl<DEV> Adxl367<DEV> {
    /// Create a new driver. No bus traffic happens until [`Adxl367::init`].
    pub fn new(spi: DEV, cfg: Config) -> Self {
        Self {
            spi,
            cfg,
            state: State::Uninitialized,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current driver state
    pub fn state(&self) -> State {
        self.state
    }

    /// Power mode last written, `None` before [`Adxl367::init`]
    pub fn power_mode(&self) -> Option<PowerMode> {
        match self.state {
            State::Uninitialized => None,
            State::Standby => Some(PowerMode::Standby),
            State::Measuring => Some(PowerMode::Measure),
        }
    }

    /// Release the SPI device
    pub fn destroy(self) -> DEV {
        self.spi
    }
}

impl<DEV, E> Adxl367<DEV>
where
    DEV: SpiDevice<Error = E>,
{
    /// Soft reset the part, check its identification and apply the
    /// configuration. The device is left in standby.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        if self.cfg.fifo.watermark > MAX_WATERMARK {
            return Err(Error::InvalidArgument);
        }
        self.state = State::Uninitialized;
        self.write_reg(Register::SoftReset, SOFT_RESET_CODE)?;
        delay.delay_us(RESET_SETTLE_US);

        let mut id = [0u8; 3];
        self.read_regs(Register::DevIdAd, &mut id)?;
        for (found, expected) in id.into_iter().zip([DEVID_AD, DEVID_MST, PARTID]) {
            if found != expected {
                return Err(Error::UnexpectedId {
                    expected: expected.into(),
                    found: found.into(),
                });
            }
        }

        self.write_filter_ctl()?;
        self.write_temp_ctl()?;
        self.write_fifo_config()?;
        self.state = State::Standby;
        #[cfg(feature = "defmt")]
        defmt::debug!("adxl367: ready, {}", self.cfg);
        Ok(())
    }

    /// Run the built in self-test on the X axis.
    ///
    /// Only allowed in standby, the device returns to standby afterwards.
    pub fn self_test(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.ensure_standby()?;
        let measured = self.measure_self_test(delay);
        let restored = self
            .write_reg(Register::SelfTest, SelfTestRegister::new().into())
            .and_then(|()| self.enter(PowerMode::Standby));
        let delta_ug = measured?;
        restored?;
        #[cfg(feature = "defmt")]
        defmt::debug!("adxl367: self-test delta {=i32} ug", delta_ug);
        if (SELF_TEST_MIN_UG..=SELF_TEST_MAX_UG).contains(&delta_ug) {
            Ok(())
        } else {
            Err(Error::SelfTest { delta_ug })
        }
    }

    /// Set the output data rate
    pub fn set_output_rate(&mut self, odr: OutputRate) -> Result<(), Error<E>> {
        self.ensure_standby()?;
        self.cfg.odr = odr;
        self.write_filter_ctl()
    }

    /// Set the measurement range
    pub fn set_range(&mut self, range: Range) -> Result<(), Error<E>> {
        self.ensure_standby()?;
        self.cfg.range = range;
        self.write_filter_ctl()
    }

    /// Enable or disable the temperature sensor
    pub fn temp_read_en(&mut self, enabled: bool) -> Result<(), Error<E>> {
        self.ensure_standby()?;
        self.cfg.temperature = enabled;
        self.write_temp_ctl()
    }

    /// Configure the FIFO. Must happen before entering measurement mode.
    pub fn fifo_setup(
        &mut self,
        mode: FifoMode,
        format: FifoFormat,
        watermark: u16,
    ) -> Result<(), Error<E>> {
        self.ensure_standby()?;
        if watermark > MAX_WATERMARK {
            return Err(Error::InvalidArgument);
        }
        self.cfg.fifo = FifoConfig {
            mode,
            format,
            watermark,
        };
        self.write_fifo_config()
    }

    /// Route interrupt sources to INT1
    pub fn set_int1_map(&mut self, map: IntMap) -> Result<(), Error<E>> {
        self.ensure_standby()?;
        self.write_reg(Register::IntMap1Lower, map.into())
    }

    /// Route interrupt sources to INT2
    pub fn set_int2_map(&mut self, map: IntMap) -> Result<(), Error<E>> {
        self.ensure_standby()?;
        self.write_reg(Register::IntMap2Lower, map.into())
    }

    /// Switch between standby and measurement
    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), Error<E>> {
        if self.state == State::Uninitialized {
            return Err(Error::InvalidState);
        }
        self.enter(mode)
    }

    /// Read the STATUS register
    pub fn status(&mut self) -> Result<Status, Error<E>> {
        self.ensure_initialized()?;
        let mut status = [0u8];
        self.read_regs(Register::Status, &mut status)?;
        Ok(Status::from(status[0]))
    }

    /// Number of samples currently held in the FIFO
    pub fn fifo_entries(&mut self) -> Result<u16, Error<E>> {
        self.ensure_initialized()?;
        let mut entries = [0u8; 2];
        self.read_regs(Register::FifoEntriesL, &mut entries)?;
        Ok(u16::from_le_bytes(entries) & 0x3FF)
    }

    /// Drain the FIFO into per channel buffers and return the number of
    /// complete records written.
    ///
    /// At most as many records as the buffer of the first stored channel
    /// holds are read; the buffers of the other stored channels must be at
    /// least that long, or `BufferOverflow` is returned. Buffers of channels
    /// the format does not store are exempt from that check and left
    /// untouched, so they may be shorter or empty (e.g. `temp` with
    /// [`FifoFormat::Xyz`]). Incomplete records are dropped. An empty FIFO
    /// yields `Ok(0)`.
    pub fn read_converted_fifo(
        &mut self,
        x: &mut [FractionalValue],
        y: &mut [FractionalValue],
        z: &mut [FractionalValue],
        temp: &mut [FractionalValue],
    ) -> Result<usize, Error<E>> {
        if self.state != State::Measuring {
            return Err(Error::InvalidState);
        }
        let channels = self.cfg.fifo.format.channels();
        let len_of = |ch: &FifoChannel| match ch {
            FifoChannel::X => x.len(),
            FifoChannel::Y => y.len(),
            FifoChannel::Z => z.len(),
            FifoChannel::Temp => temp.len(),
        };
        let capacity = channels.first().map_or(0, len_of);
        if channels.iter().any(|ch| len_of(ch) < capacity) {
            return Err(Error::BufferOverflow);
        }
        if capacity == 0 {
            return Ok(0);
        }

        let available = self.fifo_entries()?;
        let mut remaining = usize::from(available).min(capacity * channels.len());
        let mut decoder = FifoDecoder::new(self.cfg.fifo.format);
        let range = self.cfg.range;
        let mut count = 0;
        let mut chunk = [0u8; FIFO_CHUNK_WORDS * 2];
        while remaining > 0 {
            let words = remaining.min(FIFO_CHUNK_WORDS);
            self.read_fifo(&mut chunk[..words * 2])?;
            for bytes in chunk[..words * 2].chunks_exact(2) {
                let Some(record) = decoder.push(u16::from_be_bytes([bytes[0], bytes[1]])) else {
                    continue;
                };
                for (ch, raw) in channels.iter().zip(record) {
                    match ch {
                        FifoChannel::X => x[count] = convert_accel(raw, range),
                        FifoChannel::Y => y[count] = convert_accel(raw, range),
                        FifoChannel::Z => z[count] = convert_accel(raw, range),
                        FifoChannel::Temp => temp[count] = convert_temp(raw),
                    }
                }
                count += 1;
            }
            remaining -= words;
        }
        #[cfg(feature = "defmt")]
        defmt::trace!("adxl367: {=u16} fifo entries, {=usize} records", available, count);
        Ok(count)
    }

    /// Wait until the interrupt pin carrying the FIFO watermark goes high
    /// and return the status at that point. The watermark has to be routed
    /// to that pin with [`Adxl367::set_int1_map`] or
    /// [`Adxl367::set_int2_map`], active high.
    pub async fn wait_for_watermark<P: Wait>(&mut self, int: &mut P) -> Result<Status, Error<E>> {
        if self.state != State::Measuring {
            return Err(Error::InvalidState);
        }
        int.wait_for_high().await.map_err(Error::pin)?;
        self.status()
    }

    fn measure_self_test(&mut self, delay: &mut impl DelayNs) -> Result<i32, Error<E>> {
        let settle_us = SELF_TEST_SETTLE_PERIODS * self.cfg.odr.period_us();
        self.enter(PowerMode::Measure)?;
        self.write_reg(
            Register::SelfTest,
            SelfTestRegister::new().with_st(true).into(),
        )?;
        delay.delay_us(settle_us);
        let idle = self.read_x_raw()?;
        self.write_reg(
            Register::SelfTest,
            SelfTestRegister::new().with_st(true).with_st_force(true).into(),
        )?;
        delay.delay_us(settle_us);
        let forced = self.read_x_raw()?;
        Ok((i32::from(forced) - i32::from(idle)) * self.cfg.range.lsb_ug())
    }

    fn read_x_raw(&mut self) -> Result<i16, Error<E>> {
        let mut data = [0u8; 2];
        self.read_regs(Register::XDataH, &mut data)?;
        Ok(i16::from_be_bytes(data) >> 2)
    }

    fn enter(&mut self, mode: PowerMode) -> Result<(), Error<E>> {
        self.write_reg(
            Register::PowerCtl,
            PowerCtl::new().with_measure(mode as u8).into(),
        )?;
        self.state = match mode {
            PowerMode::Standby => State::Standby,
            PowerMode::Measure => State::Measuring,
        };
        #[cfg(feature = "defmt")]
        defmt::debug!("adxl367: {}", mode);
        Ok(())
    }

    fn write_filter_ctl(&mut self) -> Result<(), Error<E>> {
        let filter = FilterCtl::new()
            .with_odr(self.cfg.odr as u8)
            .with_range(self.cfg.range as u8);
        self.write_reg(Register::FilterCtl, filter.into())
    }

    fn write_temp_ctl(&mut self) -> Result<(), Error<E>> {
        let temp = TempCtl::new().with_temp_en(self.cfg.temperature);
        self.write_reg(Register::TempCtl, temp.into())
    }

    fn write_fifo_config(&mut self) -> Result<(), Error<E>> {
        let fifo = self.cfg.fifo;
        let control = FifoControl::new()
            .with_mode(fifo.mode as u8)
            .with_samples_msb(fifo.watermark > 0xFF)
            .with_channel_select(fifo.format as u8);
        // FIFO_SAMPLES follows FIFO_CONTROL
        self.write_regs(Register::FifoControl, &[control.into(), fifo.watermark as u8])
    }

    fn ensure_standby(&self) -> Result<(), Error<E>> {
        match self.state {
            State::Standby => Ok(()),
            _ => Err(Error::InvalidState),
        }
    }

    fn ensure_initialized(&self) -> Result<(), Error<E>> {
        match self.state {
            State::Uninitialized => Err(Error::InvalidState),
            _ => Ok(()),
        }
    }

    fn write_reg(&mut self, reg: Register, val: u8) -> Result<(), Error<E>> {
        self.write_regs(reg, &[val])
    }

    fn write_regs(&mut self, reg: Register, data: &[u8]) -> Result<(), Error<E>> {
        let mut frame = [0u8; 4];
        let len = 2 + data.len();
        if len > frame.len() {
            return Err(Error::InvalidArgument);
        }
        frame[0] = Command::WriteRegister as u8;
        frame[1] = reg as u8;
        frame[2..len].copy_from_slice(data);
        self.spi.write(&frame[..len]).map_err(Error::Spi)
    }

    fn read_regs(&mut self, reg: Register, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[Command::ReadRegister as u8, reg as u8]),
                Operation::Read(buf),
            ])
            .map_err(Error::Spi)
    }

    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[Command::ReadFifo as u8]),
                Operation::Read(buf),
            ])
            .map_err(Error::Spi)
    }
}
