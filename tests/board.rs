use adi_eval::board::{self, BoardError, BoardPin, GpioDefaults};
use embedded_hal::digital::{ErrorKind, PinState};
use embedded_hal_mock::eh1::digital::{
    Mock as MockPin, State as MockState, Transaction as PinTransaction,
};
use embedded_hal_mock::eh1::MockError;

#[test]
fn apply_fmcz_defaults() {
    let defaults = GpioDefaults::fmcz();
    let mut ldac = MockPin::new(&[PinTransaction::set(MockState::High)]);
    let mut qpi = MockPin::new(&[PinTransaction::set(MockState::Low)]);
    let mut alert = MockPin::new(&[]);

    defaults.apply(BoardPin::LdacN, &mut ldac).unwrap();
    defaults.apply(BoardPin::SpiQpi, &mut qpi).unwrap();
    assert_eq!(
        defaults.apply(BoardPin::AlertN, &mut alert),
        Err(BoardError::NotAnOutput(BoardPin::AlertN))
    );

    ldac.done();
    qpi.done();
    alert.done();
}

#[test]
fn outputs_in_offset_order() {
    let outputs: Vec<_> = GpioDefaults::fmcz().outputs().collect();
    assert_eq!(outputs.first(), Some(&(BoardPin::ResetN, PinState::High)));
    assert_eq!(outputs[2], (BoardPin::SpiQpi, PinState::Low));
    assert!(outputs.iter().all(|(pin, _)| *pin != BoardPin::AlertN));
}

#[test]
fn power_up_led() {
    let mut led = MockPin::new(&[PinTransaction::set(MockState::Low)]);
    board::signal_power_up(&mut led).unwrap();
    led.done();

    let mut broken = MockPin::new(&[PinTransaction::set(MockState::Low)
        .with_error(MockError::Io(std::io::ErrorKind::NotConnected))]);
    assert_eq!(
        board::signal_power_up(&mut broken),
        Err(BoardError::Pin(ErrorKind::Other))
    );
    broken.done();
}
