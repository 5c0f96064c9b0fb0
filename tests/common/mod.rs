//! Register level fakes of the AD3552R and ADXL367 for behavioural tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

/// Delay that returns immediately
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// SPI device whose every transaction fails
pub struct FailingSpi;

impl spi::ErrorType for FailingSpi {
    type Error = spi::ErrorKind;
}

impl SpiDevice for FailingSpi {
    fn transaction(&mut self, _ops: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }
}

const DAC_SW_LDAC: usize = 0x32;
const DAC_HW_LDAC: usize = 0x28;
const DAC_ERR_STATUS: usize = 0x17;

/// Register file of an AD3552R
pub struct DacState {
    pub regs: [u8; 0x40],
    /// Output codes after every change, in order
    pub output_log: Vec<[u16; 2]>,
    pub resets: usize,
    ldac_level: bool,
}

impl DacState {
    fn new(product_id: u16) -> Self {
        let mut state = Self {
            regs: [0; 0x40],
            output_log: Vec::new(),
            resets: 0,
            ldac_level: true,
        };
        state.power_on(product_id);
        state
    }

    fn power_on(&mut self, product_id: u16) {
        self.regs = [0; 0x40];
        self.regs[0x00] = 0x10;
        self.regs[0x04] = product_id as u8;
        self.regs[0x05] = (product_id >> 8) as u8;
        self.regs[DAC_ERR_STATUS] = 0x01;
    }

    fn product_id(&self) -> u16 {
        u16::from_be_bytes([self.regs[0x05], self.regs[0x04]])
    }

    fn code(&self, msb_addr: usize) -> u16 {
        u16::from_be_bytes([self.regs[msb_addr], self.regs[msb_addr - 1]])
    }

    /// Code of the DAC register of a channel, i.e. its output
    pub fn output(&self, ch: usize) -> u16 {
        self.code(0x2A + 2 * ch)
    }

    /// Code staged in the input register of a channel
    pub fn input(&self, ch: usize) -> u16 {
        self.code(0x34 + 2 * ch)
    }

    fn latch(&mut self, mask: u8) {
        for ch in 0..2 {
            if mask & (1 << ch) != 0 {
                self.regs[0x2A + 2 * ch] = self.regs[0x34 + 2 * ch];
                self.regs[0x29 + 2 * ch] = self.regs[0x33 + 2 * ch];
            }
        }
    }

    fn log_outputs(&mut self) {
        let now = [self.output(0), self.output(1)];
        if self.output_log.last() != Some(&now) {
            self.output_log.push(now);
        }
    }

    fn write(&mut self, addr: u8, val: u8) {
        let addr = usize::from(addr);
        match addr {
            0x00 if val & 0x81 != 0 => {
                let id = self.product_id();
                self.power_on(id);
                self.resets += 1;
            }
            DAC_ERR_STATUS => self.regs[addr] &= !val,
            DAC_SW_LDAC => self.latch(val),
            _ if addr < self.regs.len() => self.regs[addr] = val,
            _ => {}
        }
    }

    fn read(&self, addr: u8) -> u8 {
        self.regs.get(usize::from(addr)).copied().unwrap_or(0)
    }
}

/// AD3552R on the bus, decoding descending address streams
#[derive(Clone)]
pub struct FakeAd3552r(pub Rc<RefCell<DacState>>);

impl FakeAd3552r {
    pub fn new(product_id: u16) -> Self {
        Self(Rc::new(RefCell::new(DacState::new(product_id))))
    }

    /// ~LDAC line wired to this device
    pub fn ldac_pin(&self) -> FakeLdacPin {
        FakeLdacPin(self.0.clone())
    }
}

impl spi::ErrorType for FakeAd3552r {
    type Error = Infallible;
}

impl SpiDevice for FakeAd3552r {
    fn transaction(&mut self, ops: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut st = self.0.borrow_mut();
        // (read, next address) once the instruction has been seen
        let mut cursor: Option<(bool, u8)> = None;
        for op in ops.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    for &b in bytes.iter() {
                        cursor = Some(match cursor {
                            None => (b & 0x80 != 0, b & 0x7F),
                            Some((read, addr)) => {
                                if !read {
                                    st.write(addr, b);
                                }
                                (read, addr.wrapping_sub(1))
                            }
                        });
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        if let Some((read, addr)) = cursor {
                            *b = st.read(addr);
                            cursor = Some((read, addr.wrapping_sub(1)));
                        }
                    }
                }
                Operation::Transfer(rx, tx) => {
                    for (i, &b) in tx.iter().enumerate() {
                        let out = match cursor {
                            None => {
                                cursor = Some((b & 0x80 != 0, b & 0x7F));
                                0
                            }
                            Some((true, addr)) => {
                                cursor = Some((true, addr.wrapping_sub(1)));
                                st.read(addr)
                            }
                            Some((false, addr)) => {
                                st.write(addr, b);
                                cursor = Some((false, addr.wrapping_sub(1)));
                                0
                            }
                        };
                        if let Some(slot) = rx.get_mut(i) {
                            *slot = out;
                        }
                    }
                }
                Operation::TransferInPlace(_) => unimplemented!("not used by the driver"),
                Operation::DelayNs(_) => {}
            }
        }
        st.log_outputs();
        Ok(())
    }
}

/// ~LDAC pin latching the channels enabled in HW_LDAC on a falling edge
pub struct FakeLdacPin(Rc<RefCell<DacState>>);

impl digital::ErrorType for FakeLdacPin {
    type Error = Infallible;
}

impl OutputPin for FakeLdacPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut st = self.0.borrow_mut();
        if st.ldac_level {
            let mask = st.regs[DAC_HW_LDAC];
            st.latch(mask);
            st.log_outputs();
        }
        st.ldac_level = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().ldac_level = true;
        Ok(())
    }
}

const ACCEL_FIFO_ENTRIES_L: u8 = 0x0C;
const ACCEL_FIFO_ENTRIES_H: u8 = 0x0D;
const ACCEL_XDATA_H: u8 = 0x0E;
const ACCEL_XDATA_L: u8 = 0x0F;
const ACCEL_SOFT_RESET: u8 = 0x1F;
const ACCEL_SELF_TEST: u8 = 0x2E;

/// Register file and FIFO of an ADXL367
pub struct AccelState {
    pub regs: [u8; 0x40],
    pub fifo: VecDeque<u16>,
    /// X axis reading without self-test force
    pub x_idle: i16,
    /// Change of the X reading while the self-test force is applied
    pub self_test_delta: i16,
    pub resets: usize,
}

impl AccelState {
    fn power_on(&mut self) {
        self.regs = [0; 0x40];
        self.regs[0x00] = 0xAD;
        self.regs[0x01] = 0x1D;
        self.regs[0x02] = 0xF7;
        self.fifo.clear();
    }

    fn x_code(&self) -> u16 {
        let forced = self.regs[usize::from(ACCEL_SELF_TEST)] & 0b11 == 0b11;
        let x = if forced {
            self.x_idle + self.self_test_delta
        } else {
            self.x_idle
        };
        (x << 2) as u16
    }

    fn read(&self, addr: u8) -> u8 {
        let entries = self.fifo.len().min(0x3FF) as u16;
        match addr {
            ACCEL_FIFO_ENTRIES_L => entries as u8,
            ACCEL_FIFO_ENTRIES_H => (entries >> 8) as u8,
            ACCEL_XDATA_H => (self.x_code() >> 8) as u8,
            ACCEL_XDATA_L => self.x_code() as u8,
            _ => self.regs.get(usize::from(addr)).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, addr: u8, val: u8) {
        match addr {
            ACCEL_SOFT_RESET if val == 0x52 => {
                self.power_on();
                self.resets += 1;
            }
            _ => {
                if let Some(reg) = self.regs.get_mut(usize::from(addr)) {
                    *reg = val;
                }
            }
        }
    }

    /// Current value of a plain register
    pub fn reg(&self, addr: u8) -> u8 {
        self.regs[usize::from(addr)]
    }
}

enum AccelCursor {
    Command,
    Address(u8),
    Write(u8),
    Read(u8),
    Fifo { low: Option<u8> },
}

/// ADXL367 on the bus
#[derive(Clone)]
pub struct FakeAdxl367(pub Rc<RefCell<AccelState>>);

impl FakeAdxl367 {
    pub fn new() -> Self {
        let mut state = AccelState {
            regs: [0; 0x40],
            fifo: VecDeque::new(),
            x_idle: 0,
            self_test_delta: 0,
            resets: 0,
        };
        state.power_on();
        Self(Rc::new(RefCell::new(state)))
    }

    /// Queue a FIFO word holding `raw` tagged with channel `id`
    pub fn push_sample(&self, id: u8, raw: i16) {
        let word = (u16::from(id) << 14) | (raw as u16 & 0x3FFF);
        self.0.borrow_mut().fifo.push_back(word);
    }
}

impl spi::ErrorType for FakeAdxl367 {
    type Error = Infallible;
}

impl SpiDevice for FakeAdxl367 {
    fn transaction(&mut self, ops: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut st = self.0.borrow_mut();
        let mut cursor = AccelCursor::Command;
        for op in ops.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    for &b in bytes.iter() {
                        cursor = match cursor {
                            AccelCursor::Command => match b {
                                0x0A => AccelCursor::Address(0x0A),
                                0x0B => AccelCursor::Address(0x0B),
                                0x0D => AccelCursor::Fifo { low: None },
                                other => panic!("unknown command {other:#x}"),
                            },
                            AccelCursor::Address(0x0A) => AccelCursor::Write(b),
                            AccelCursor::Address(_) => AccelCursor::Read(b),
                            AccelCursor::Write(addr) => {
                                st.write(addr, b);
                                AccelCursor::Write(addr.wrapping_add(1))
                            }
                            other => other,
                        };
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        cursor = match cursor {
                            AccelCursor::Read(addr) => {
                                *b = st.read(addr);
                                AccelCursor::Read(addr.wrapping_add(1))
                            }
                            AccelCursor::Fifo { low: Some(low) } => {
                                *b = low;
                                AccelCursor::Fifo { low: None }
                            }
                            AccelCursor::Fifo { low: None } => {
                                let word = st.fifo.pop_front().unwrap_or(0);
                                *b = (word >> 8) as u8;
                                AccelCursor::Fifo {
                                    low: Some(word as u8),
                                }
                            }
                            other => {
                                *b = 0;
                                other
                            }
                        };
                    }
                }
                _ => unimplemented!("not used by the driver"),
            }
        }
        Ok(())
    }
}
