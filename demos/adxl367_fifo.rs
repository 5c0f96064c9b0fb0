#![no_main]
#![no_std]

// Setting up entry vector/panic handler and logging
use cortex_m_rt::entry;
use defmt::Display2Format;
use defmt_rtt as _;
use panic_probe as _;
// Imports for the shared bus
use core::cell::RefCell;
use embedded_hal::delay::DelayNs;
use embedded_hal_bus::spi::{NoDelay, RefCellDevice};
// Hal imports
use hal::prelude::*;
use hal::spi::{Mode, Spi};
use stm32f4xx_hal as hal;

use adi_eval::adxl367::{Config, FifoFormat, FifoMode, FractionalValue, OutputRate, PowerMode};
use adi_eval::Adxl367;

const WATERMARK: u16 = 50;

#[entry]
fn main() -> ! {
    // Take peripherals and set up the clocks.
    let p = hal::pac::Peripherals::take().unwrap();
    let pc = cortex_m::Peripherals::take().unwrap();
    let rcc = p.RCC.constrain();
    let ccdr = rcc.cfgr.sysclk(84.MHz()).freeze();
    // Create a SysTick based delay
    let mut delay = pc.SYST.delay(&ccdr);

    // Setup the accelerometer's SPI bus and CS pin
    let gpioa = p.GPIOA.split();
    let spi1_sclk = gpioa.pa5.into_alternate();
    let spi1_miso = gpioa.pa6.into_alternate();
    let spi1_mosi = gpioa.pa7.into_alternate();
    let spi1_cs = gpioa
        .pa4
        .into_push_pull_output_in_state(hal::gpio::PinState::High);
    // SPI Instance initialization in MODE 0
    let spi1 = Spi::new(
        p.SPI1,
        (spi1_sclk, spi1_miso, spi1_mosi),
        Mode {
            phase: hal::spi::Phase::CaptureOnFirstTransition,
            polarity: hal::spi::Polarity::IdleLow,
        },
        1.MHz(),
        &ccdr,
    );
    let spi_bus = RefCell::new(spi1);

    let mut accel = Adxl367::new(
        RefCellDevice::new(&spi_bus, spi1_cs, NoDelay),
        Config::default(),
    );
    accel.init(&mut delay).unwrap();
    accel.self_test(&mut delay).unwrap();
    accel.temp_read_en(true).unwrap();
    accel.set_output_rate(OutputRate::Hz200).unwrap();
    // all configuration has to happen before measuring
    accel
        .fifo_setup(FifoMode::OldestSaved, FifoFormat::Xyzt, WATERMARK)
        .unwrap();
    accel.set_power_mode(PowerMode::Measure).unwrap();

    let mut x = [FractionalValue::default(); 128];
    let mut y = [FractionalValue::default(); 128];
    let mut z = [FractionalValue::default(); 128];
    let mut temp = [FractionalValue::default(); 128];
    let period_us = accel.config().odr.period_us();
    loop {
        // wait for a watermark worth of records
        DelayNs::delay_us(&mut delay, u32::from(WATERMARK) * period_us);
        let entries = accel
            .read_converted_fifo(&mut x, &mut y, &mut z, &mut temp)
            .unwrap();
        defmt::info!("Number of read entries from the FIFO {=usize}", entries);
        for i in 0..entries {
            defmt::info!("x={} m/s^2", Display2Format(&x[i]));
            defmt::info!("y={} m/s^2", Display2Format(&y[i]));
            defmt::info!("z={} m/s^2", Display2Format(&z[i]));
            defmt::info!("temp={} C", Display2Format(&temp[i]));
        }
    }
}
