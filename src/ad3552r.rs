//! AD3552R dual channel 16 bit DAC
//!
//! Codes are staged in the input registers by [`Ad3552r::write_samples`] and
//! moved to the outputs of all selected channels at once by
//! [`Ad3552r::ldac_trigger`], either through the ~LDAC pin or the software
//! LDAC register.
use bitfield_struct::bitfield;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::crc::CRC_AD3552R;
use crate::{Error, NoPin};

/// SPI mode of the AD3552R, data is clocked MSB first
pub const SPI_MODE: spi::Mode = spi::MODE_0;
/// Maximum SPI clock frequency in Hz
pub const MAX_SPI_HZ: u32 = 66_000_000;

/// Product id of the AD3552R
pub const AD3552R_ID: u16 = 0x4008;
/// Product id of the AD3542R
pub const AD3542R_ID: u16 = 0x4009;

const RESET_PULSE_US: u32 = 1;
const RESET_POLL_US: u32 = 1_000;
const RESET_POLL_ATTEMPTS: u32 = 100;
const SCRATCH_PAD_PATTERNS: [u8; 2] = [0x34, 0xB2];
// instruction + 2 codes + SW_LDAC + crc
const MAX_FRAME: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Register {
    InterfaceConfigA,
    InterfaceConfigB,
    ProductIdH,
    ScratchPad,
    InterfaceConfigC,
    InterfaceConfigD,
    ErrStatus,
    PowerdownConfig,
    OutputRange,
    HwLdac,
    Dac(u8),
    SwLdac,
    Input(u8),
}

impl From<Register> for u8 {
    fn from(reg: Register) -> Self {
        match reg {
            Register::InterfaceConfigA => 0x00,
            Register::InterfaceConfigB => 0x01,
            Register::ProductIdH => 0x05,
            Register::ScratchPad => 0x0A,
            Register::InterfaceConfigC => 0x10,
            Register::InterfaceConfigD => 0x14,
            Register::ErrStatus => 0x17,
            Register::PowerdownConfig => 0x18,
            Register::OutputRange => 0x19,
            Register::HwLdac => 0x28,
            Register::Dac(ch) => 0x2A + 2 * ch,
            Register::SwLdac => 0x32,
            Register::Input(ch) => 0x34 + 2 * ch,
        }
    }
}

#[bitfield(u8)]
struct Instruction {
    #[bits(7)]
    addr: u8,
    #[bits(1)]
    read: bool,
}

#[bitfield(u8)]
struct InterfaceConfigA {
    #[bits(1)]
    sw_resetx: bool,
    #[bits(3)]
    _unused: u8,
    #[bits(1)]
    sdo_active: bool,
    #[bits(1)]
    addr_ascension: bool,
    #[bits(1)]
    _unused: bool,
    #[bits(1)]
    sw_reset: bool,
}

#[bitfield(u8)]
struct InterfaceConfigB {
    #[bits(3)]
    _unused: u8,
    #[bits(1)]
    short_instruction: bool,
    #[bits(3)]
    _unused: u8,
    #[bits(1)]
    single_instruction: bool,
}

/// CRC enable is written together with its inverted copy
#[bitfield(u8)]
struct InterfaceConfigC {
    #[bits(2)]
    crc_enable_n: u8,
    #[bits(4)]
    _unused: u8,
    #[bits(2)]
    crc_enable: u8,
}

#[bitfield(u8)]
struct InterfaceConfigD {
    #[bits(2)]
    _unused: u8,
    #[bits(2)]
    sdo_drive_strength: u8,
    #[bits(4)]
    _unused: u8,
}

#[bitfield(u8)]
struct ErrStatus {
    #[bits(1)]
    reset_status: bool,
    #[bits(7)]
    _unused: u8,
}

#[bitfield(u8)]
struct PowerdownConfig {
    #[bits(4)]
    _unused: u8,
    #[bits(1)]
    dac0_powerdown: bool,
    #[bits(1)]
    dac1_powerdown: bool,
    #[bits(1)]
    amp0_powerdown: bool,
    #[bits(1)]
    amp1_powerdown: bool,
}

#[bitfield(u8)]
struct OutputRangeRegister {
    #[bits(4)]
    ch0: u8,
    #[bits(4)]
    ch1: u8,
}

/// Available output ranges for the DAC channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputRange {
    /// 0V to +2.5V
    Unipolar2_5V = 0b000,
    /// 0V to +5V
    Unipolar5V = 0b001,
    /// 0V to +10V
    Unipolar10V = 0b010,
    /// -5V to +5V
    Bipolar5V = 0b011,
    /// -10V to +10V
    Bipolar10V = 0b100,
    /// Invalid readback result
    InvalidReadback,
}

impl From<u8> for OutputRange {
    fn from(value: u8) -> Self {
        match value {
            0b000 => Self::Unipolar2_5V,
            0b001 => Self::Unipolar5V,
            0b010 => Self::Unipolar10V,
            0b011 => Self::Bipolar5V,
            0b100 => Self::Bipolar10V,
            _ => Self::InvalidReadback,
        }
    }
}

impl OutputRange {
    /// Lower and upper end of the range in millivolts
    pub fn span_mv(self) -> Option<(i32, i32)> {
        match self {
            Self::Unipolar2_5V => Some((0, 2_500)),
            Self::Unipolar5V => Some((0, 5_000)),
            Self::Unipolar10V => Some((0, 10_000)),
            Self::Bipolar5V => Some((-5_000, 5_000)),
            Self::Bipolar10V => Some((-10_000, 10_000)),
            Self::InvalidReadback => None,
        }
    }

    /// Nominal output voltage for a straight binary code, rounded down to
    /// whole millivolts.
    pub fn millivolts(self, code: u16) -> Option<i32> {
        let (low, high) = self.span_mv()?;
        let step = i64::from(high - low) * i64::from(code) / i64::from(u16::MAX);
        Some(low + step as i32)
    }
}

/// DAC channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    /// DAC channel 0
    Ch0 = 0b01,
    /// DAC channel 1
    Ch1 = 0b10,
    /// Both DAC channels
    Both = 0b11,
}

impl Channel {
    fn mask(self) -> u8 {
        self as u8
    }

    fn index(self) -> Option<u8> {
        match self {
            Self::Ch0 => Some(0),
            Self::Ch1 => Some(1),
            Self::Both => None,
        }
    }
}

/// Registers targeted by [`Ad3552r::write_samples`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateTarget {
    /// Stage codes in the input registers, outputs change on the next LDAC
    InputRegisters,
    /// Write the DAC registers, outputs change immediately
    DacRegisters,
    /// Stage codes and issue a software LDAC for the same channels
    InputRegistersAndLdac,
}

/// Per channel configuration, applied by [`Ad3552r::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Powered channel. A disabled channel has its DAC and amplifier powered down.
    pub enabled: bool,
    /// Output voltage range
    pub range: OutputRange,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            range: OutputRange::Unipolar2_5V,
        }
    }
}

/// Device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Expected product id, [`AD3552R_ID`] or [`AD3542R_ID`]
    pub chip_id: u16,
    /// Channel 0 and 1 settings
    pub channels: [ChannelConfig; 2],
    /// Append and check a CRC-8 on every frame
    pub crc_enabled: bool,
    /// Send instruction and data in a single SPI transfer. Some carrier
    /// boards cannot split the two phases.
    pub single_transfer: bool,
    /// SDO drive strength, 0 to 3
    pub sdo_drive_strength: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chip_id: AD3552R_ID,
            channels: [ChannelConfig::default(); 2],
            crc_enabled: false,
            single_transfer: false,
            sdo_drive_strength: 1,
        }
    }
}

impl Config {
    /// Settings of the AD3552R FMC evaluation board: both channels at
    /// -10V to +10V, single transfer mode, no CRC.
    pub fn fmcz() -> Self {
        let channel = ChannelConfig {
            enabled: true,
            range: OutputRange::Bipolar10V,
        };
        Self {
            channels: [channel; 2],
            single_transfer: true,
            ..Self::default()
        }
    }
}

/// AD3552R DAC with an optional ~LDAC and ~RESET pin
pub struct Ad3552r<DEV, LDAC = NoPin, RST = NoPin> {
    spi: DEV,
    ldac: Option<LDAC>,
    reset: Option<RST>,
    cfg: Config,
    crc_active: bool,
    hw_ldac_mask: Option<u8>,
    ready: bool,
}

impl<DEV> Ad3552r<DEV> {
    /// Create a new driver. No bus traffic happens until [`Ad3552r::init`].
    pub fn new(spi: DEV, cfg: Config) -> Self {
        Self {
            spi,
            ldac: None,
            reset: None,
            cfg,
            crc_active: cfg.crc_enabled,
            hw_ldac_mask: None,
            ready: false,
        }
    }
}

impl<DEV, LDAC, RST> Ad3552r<DEV, LDAC, RST> {
    /// Attach the ~LDAC pin, enabling hardware triggered updates
    pub fn with_ldac_pin<P>(self, pin: P) -> Ad3552r<DEV, P, RST> {
        Ad3552r {
            spi: self.spi,
            ldac: Some(pin),
            reset: self.reset,
            cfg: self.cfg,
            crc_active: self.crc_active,
            hw_ldac_mask: self.hw_ldac_mask,
            ready: self.ready,
        }
    }

    /// Attach the ~RESET pin, used instead of the software reset
    pub fn with_reset_pin<P>(self, pin: P) -> Ad3552r<DEV, LDAC, P> {
        Ad3552r {
            spi: self.spi,
            ldac: self.ldac,
            reset: Some(pin),
            cfg: self.cfg,
            crc_active: self.crc_active,
            hw_ldac_mask: self.hw_ldac_mask,
            ready: self.ready,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Release the SPI device and the optional pins
    pub fn destroy(self) -> (DEV, Option<LDAC>, Option<RST>) {
        (self.spi, self.ldac, self.reset)
    }
}

impl<DEV, E, LDAC, RST> Ad3552r<DEV, LDAC, RST>
where
    DEV: SpiDevice<Error = E>,
    LDAC: OutputPin,
    RST: OutputPin,
{
    /// Reset the device, verify it and apply the configuration.
    ///
    /// Any error leaves the device in an undefined state; call `init` again
    /// before further use.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        if self.cfg.sdo_drive_strength > 3 {
            return Err(Error::InvalidArgument);
        }
        self.ready = false;
        self.hw_ldac_mask = None;
        if let Some(ldac) = self.ldac.as_mut() {
            ldac.set_high().map_err(Error::pin)?;
        }

        self.reset(delay)?;
        self.check_scratch_pad()?;

        let mut id = [0u8; 2];
        self.read_regs(Register::ProductIdH, &mut id)?;
        let id = u16::from_be_bytes(id);
        if id != self.cfg.chip_id {
            return Err(Error::UnexpectedId {
                expected: self.cfg.chip_id,
                found: id,
            });
        }

        self.write_reg(
            Register::InterfaceConfigB,
            InterfaceConfigB::new().with_short_instruction(true).into(),
        )?;
        self.write_reg(
            Register::InterfaceConfigD,
            InterfaceConfigD::new()
                .with_sdo_drive_strength(self.cfg.sdo_drive_strength)
                .into(),
        )?;
        if self.cfg.crc_enabled {
            self.write_reg(
                Register::InterfaceConfigC,
                InterfaceConfigC::new()
                    .with_crc_enable(0b01)
                    .with_crc_enable_n(0b10)
                    .into(),
            )?;
            self.crc_active = true;
        }

        self.write_reg(Register::PowerdownConfig, self.powerdown_config().into())?;
        self.write_reg(Register::OutputRange, self.range_config().into())?;

        self.ready = true;
        #[cfg(feature = "defmt")]
        defmt::debug!("ad3552r: id {=u16:#x} ready, crc {=bool}", id, self.crc_active);
        Ok(())
    }

    /// Write `repeat` frames of codes to the channels selected by `chan`.
    ///
    /// Each frame holds one code per selected and enabled channel, ordered
    /// by channel number, so `samples` needs at least `repeat` times that
    /// many entries.
    /// ```ignore
    /// dac.write_samples(&[0x1000, 0xF000], 1, Channel::Both, UpdateTarget::InputRegisters)?;
    /// ```
    pub fn write_samples(
        &mut self,
        samples: &[u16],
        repeat: usize,
        chan: Channel,
        target: UpdateTarget,
    ) -> Result<(), Error<E>> {
        self.ensure_ready()?;
        let mask = chan.mask() & self.enabled_mask();
        let per_frame = mask.count_ones() as usize;
        let needed = per_frame.checked_mul(repeat).ok_or(Error::InvalidArgument)?;
        if needed == 0 || samples.len() < needed {
            return Err(Error::InvalidArgument);
        }
        for frame in samples[..needed].chunks_exact(per_frame) {
            self.write_frame(frame, mask, target)?;
        }
        Ok(())
    }

    /// Move the input registers of the selected channels to their outputs.
    ///
    /// All selected channels update on the same edge. With `use_gpio` the
    /// ~LDAC pin is pulsed, otherwise the software LDAC register is written.
    pub fn ldac_trigger(&mut self, chan: Channel, use_gpio: bool) -> Result<(), Error<E>> {
        self.ensure_ready()?;
        let mask = chan.mask();
        #[cfg(feature = "defmt")]
        defmt::trace!("ad3552r: ldac {=u8:#x} gpio {=bool}", mask, use_gpio);
        if !use_gpio {
            return self.write_reg(Register::SwLdac, mask);
        }
        if self.ldac.is_none() {
            return Err(Error::MissingPin);
        }
        if self.hw_ldac_mask != Some(mask) {
            self.write_reg(Register::HwLdac, mask)?;
            self.hw_ldac_mask = Some(mask);
        }
        let ldac = self.ldac.as_mut().ok_or(Error::MissingPin)?;
        ldac.set_low().map_err(Error::pin)?;
        ldac.set_high().map_err(Error::pin)
    }

    /// Read back the code held in the input or DAC register of one channel
    pub fn read_code(&mut self, chan: Channel, target: UpdateTarget) -> Result<u16, Error<E>> {
        self.ensure_ready()?;
        let ch = chan.index().ok_or(Error::InvalidArgument)?;
        let reg = match target {
            UpdateTarget::DacRegisters => Register::Dac(ch),
            _ => Register::Input(ch),
        };
        let mut code = [0u8; 2];
        self.read_regs(reg, &mut code)?;
        Ok(u16::from_be_bytes(code))
    }

    /// Change the output range of the selected channels
    pub fn set_output_range(&mut self, chan: Channel, range: OutputRange) -> Result<(), Error<E>> {
        self.ensure_ready()?;
        if range == OutputRange::InvalidReadback {
            return Err(Error::InvalidArgument);
        }
        for (i, ch) in self.cfg.channels.iter_mut().enumerate() {
            if chan.mask() & (1 << i) != 0 {
                ch.range = range;
            }
        }
        self.write_reg(Register::OutputRange, self.range_config().into())
    }

    /// Get the output range of a single channel
    #[cfg(not(feature = "readback"))]
    pub fn output_range(&mut self, chan: Channel) -> Result<OutputRange, Error<E>> {
        let ch = chan.index().ok_or(Error::InvalidArgument)?;
        Ok(self.cfg.channels[usize::from(ch)].range)
    }
    /// Get the output range of a single channel
    #[cfg(feature = "readback")]
    pub fn output_range(&mut self, chan: Channel) -> Result<OutputRange, Error<E>> {
        self.ensure_ready()?;
        let reg = OutputRangeRegister::from(self.read_reg(Register::OutputRange)?);
        match chan {
            Channel::Ch0 => Ok(OutputRange::from(reg.ch0())),
            Channel::Ch1 => Ok(OutputRange::from(reg.ch1())),
            Channel::Both => Err(Error::InvalidArgument),
        }
    }

    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        match self.reset.as_mut() {
            Some(rst) => {
                rst.set_low().map_err(Error::pin)?;
                delay.delay_us(RESET_PULSE_US);
                rst.set_high().map_err(Error::pin)?;
            }
            // framed with the CRC setting the device is still running with
            None => self.write_reg(
                Register::InterfaceConfigA,
                InterfaceConfigA::new()
                    .with_sw_reset(true)
                    .with_sw_resetx(true)
                    .into(),
            )?,
        }
        self.crc_active = false;
        for _ in 0..RESET_POLL_ATTEMPTS {
            delay.delay_us(RESET_POLL_US);
            let cfg_a = InterfaceConfigA::from(self.read_reg(Register::InterfaceConfigA)?);
            if !cfg_a.sw_reset() && !cfg_a.sw_resetx() {
                // reset flag is write one to clear
                return self.write_reg(
                    Register::ErrStatus,
                    ErrStatus::new().with_reset_status(true).into(),
                );
            }
        }
        Err(Error::ResetTimeout)
    }

    fn check_scratch_pad(&mut self) -> Result<(), Error<E>> {
        for expected in SCRATCH_PAD_PATTERNS {
            self.write_reg(Register::ScratchPad, expected)?;
            let found = self.read_reg(Register::ScratchPad)?;
            if found != expected {
                return Err(Error::ScratchPad { expected, found });
            }
        }
        Ok(())
    }

    fn write_frame(&mut self, codes: &[u16], mask: u8, target: UpdateTarget) -> Result<(), Error<E>> {
        let top = if mask & Channel::Ch1.mask() != 0 { 1 } else { 0 };
        let start = match target {
            UpdateTarget::DacRegisters => Register::Dac(top),
            _ => Register::Input(top),
        };
        // codes are in channel order, the stream runs from the highest address down
        let mut data = [0u8; 5];
        let mut len = 0;
        for code in codes.iter().rev() {
            data[len..len + 2].copy_from_slice(&code.to_be_bytes());
            len += 2;
        }
        if target != UpdateTarget::InputRegistersAndLdac {
            return self.write_regs(start, &data[..len]);
        }
        if mask & Channel::Ch0.mask() != 0 {
            // SW_LDAC is the next address below the channel 0 input register
            data[len] = mask;
            len += 1;
            return self.write_regs(start, &data[..len]);
        }
        self.write_regs(start, &data[..len])?;
        self.write_reg(Register::SwLdac, mask)
    }

    fn write_reg(&mut self, reg: Register, val: u8) -> Result<(), Error<E>> {
        self.write_regs(reg, &[val])
    }

    fn read_reg(&mut self, reg: Register) -> Result<u8, Error<E>> {
        let mut val = [0u8];
        self.read_regs(reg, &mut val)?;
        Ok(val[0])
    }

    fn write_regs(&mut self, reg: Register, data: &[u8]) -> Result<(), Error<E>> {
        let mut len = 1 + data.len();
        if len + usize::from(self.crc_active) > MAX_FRAME {
            return Err(Error::InvalidArgument);
        }
        let mut frame = [0u8; MAX_FRAME];
        frame[0] = Instruction::new().with_addr(u8::from(reg)).into();
        frame[1..len].copy_from_slice(data);
        if self.crc_active {
            frame[len] = CRC_AD3552R.checksum(&frame[..len]);
            len += 1;
        }
        if self.cfg.single_transfer {
            self.spi.write(&frame[..len]).map_err(Error::Spi)
        } else {
            let (instr, payload) = frame[..len].split_at(1);
            self.spi
                .transaction(&mut [Operation::Write(instr), Operation::Write(payload)])
                .map_err(Error::Spi)
        }
    }

    fn read_regs(&mut self, reg: Register, buf: &mut [u8]) -> Result<(), Error<E>> {
        let n = buf.len() + usize::from(self.crc_active);
        if 1 + n > MAX_FRAME {
            return Err(Error::InvalidArgument);
        }
        let instr: u8 = Instruction::new()
            .with_addr(u8::from(reg))
            .with_read(true)
            .into();
        // instruction slot followed by data and the optional crc
        let mut rx = [0u8; MAX_FRAME];
        if self.cfg.single_transfer {
            let mut tx = [0u8; MAX_FRAME];
            tx[0] = instr;
            self.spi
                .transfer(&mut rx[..1 + n], &tx[..1 + n])
                .map_err(Error::Spi)?;
        } else {
            self.spi
                .transaction(&mut [Operation::Write(&[instr]), Operation::Read(&mut rx[1..1 + n])])
                .map_err(Error::Spi)?;
        }
        rx[0] = instr;
        let data_end = 1 + buf.len();
        if self.crc_active {
            let expected = CRC_AD3552R.checksum(&rx[..data_end]);
            let found = rx[data_end];
            if expected != found {
                return Err(Error::Crc { expected, found });
            }
        }
        buf.copy_from_slice(&rx[1..data_end]);
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), Error<E>> {
        if self.ready {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    fn enabled_mask(&self) -> u8 {
        self.cfg
            .channels
            .iter()
            .enumerate()
            .filter(|(_, ch)| ch.enabled)
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }

    fn powerdown_config(&self) -> PowerdownConfig {
        let [ch0, ch1] = self.cfg.channels;
        PowerdownConfig::new()
            .with_dac0_powerdown(!ch0.enabled)
            .with_amp0_powerdown(!ch0.enabled)
            .with_dac1_powerdown(!ch1.enabled)
            .with_amp1_powerdown(!ch1.enabled)
    }

    fn range_config(&self) -> OutputRangeRegister {
        let [ch0, ch1] = self.cfg.channels;
        OutputRangeRegister::new()
            .with_ch0(ch0.range as u8)
            .with_ch1(ch1.range as u8)
    }
}
