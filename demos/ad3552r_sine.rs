#![no_main]
#![no_std]

// Setting up entry vector/panic handler and logging
use cortex_m_rt::entry;
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

use adi_eval::ad3552r::{Channel, Config, UpdateTarget};
use adi_eval::board::{self, BoardPin, GpioDefaults};
use adi_eval::Ad3552r;

const TIME_BETWEEN_SAMPLES_US: u32 = 100;

// One period of a full scale sine
const SINE: [u16; 64] = [
    32768, 35979, 39160, 42279, 45307, 48214, 50972, 53555,
    55938, 58097, 60013, 61666, 63041, 64124, 64905, 65377,
    65535, 65377, 64905, 64124, 63041, 61666, 60013, 58097,
    55938, 53555, 50972, 48214, 45307, 42279, 39160, 35979,
    32768, 29556, 26375, 23256, 20228, 17321, 14563, 11980,
    9597, 7438, 5522, 3869, 2494, 1411, 630, 158,
    0, 158, 630, 1411, 2494, 3869, 5522, 7438,
    9597, 11980, 14563, 17321, 20228, 23256, 26375, 29556,
];

#[entry]
fn main() -> ! {
    // Take peripherals and set up the clocks.
    let p = hal::pac::Peripherals::take().unwrap();
    let pc = cortex_m::Peripherals::take().unwrap();
    let rcc = p.RCC.constrain();
    let ccdr = rcc.cfgr.sysclk(168.MHz()).freeze();
    // Create a SysTick based delay
    let mut delay = pc.SYST.delay(&ccdr);

    // Drive the FMC board lines to their defaults before talking to the DAC
    let defaults = GpioDefaults::fmcz();
    let gpiob = p.GPIOB.split();
    let gpioc = p.GPIOC.split();
    let mut reset_n = gpiob.pb0.into_push_pull_output();
    let mut ldac_n = gpiob.pb1.into_push_pull_output();
    let mut spi_qpi = gpiob.pb12.into_push_pull_output();
    let _alert_n = gpiob.pb13.into_pull_up_input();
    let mut gpio9 = gpiob.pb14.into_push_pull_output();
    let mut led_red = gpioc.pc0.into_push_pull_output();
    let mut led_green = gpioc.pc1.into_push_pull_output();
    let mut led_blue = gpioc.pc2.into_push_pull_output();
    defaults.apply(BoardPin::ResetN, &mut reset_n).unwrap();
    defaults.apply(BoardPin::LdacN, &mut ldac_n).unwrap();
    defaults.apply(BoardPin::SpiQpi, &mut spi_qpi).unwrap();
    defaults.apply(BoardPin::Gpio9, &mut gpio9).unwrap();
    defaults.apply(BoardPin::LedRed, &mut led_red).unwrap();
    defaults.apply(BoardPin::LedGreen, &mut led_green).unwrap();
    defaults.apply(BoardPin::LedBlue, &mut led_blue).unwrap();

    // Setup the DAC's SPI bus and CS pin
    let spi3_sclk = gpioc.pc10.into_alternate();
    let spi3_miso = gpioc.pc11.into_alternate();
    let spi3_mosi = gpioc.pc12.into_alternate();
    let gpioa = p.GPIOA.split();
    let spi3_dac_cs = gpioa
        .pa15
        .into_push_pull_output_in_state(hal::gpio::PinState::High);
    // SPI Instance initialization in MODE 0
    let spi3 = Spi::new(
        p.SPI3,
        (spi3_sclk, spi3_miso, spi3_mosi),
        Mode {
            phase: hal::spi::Phase::CaptureOnFirstTransition,
            polarity: hal::spi::Polarity::IdleLow,
        },
        10.MHz(),
        &ccdr,
    );
    // SPI Bus creation using embedded-hal-bus
    let spi_bus = RefCell::new(spi3);

    let mut dac = Ad3552r::new(
        RefCellDevice::new(&spi_bus, spi3_dac_cs, NoDelay),
        Config::fmcz(),
    )
    .with_ldac_pin(ldac_n)
    .with_reset_pin(reset_n);
    dac.init(&mut delay).unwrap();
    board::signal_power_up(&mut led_green).unwrap();
    defmt::info!("ad3552r up, sending sine, {=usize} samples per period", SINE.len());

    // Channel 1 runs half a period behind channel 0, both latch together
    let n = SINE.len();
    let mut i = 0;
    loop {
        let samples = [SINE[i], SINE[(i + n / 2) % n]];
        dac.write_samples(&samples, 1, Channel::Both, UpdateTarget::InputRegisters)
            .unwrap();
        DelayNs::delay_us(&mut delay, TIME_BETWEEN_SAMPLES_US);
        i = (i + 1) % n;
        dac.ldac_trigger(Channel::Both, false).unwrap();
    }
}
