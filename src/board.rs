//! GPIO bring-up for the AD3552R FMC evaluation board
//!
//! The board lines are named instead of indexed, and a table of defaults is
//! checked to cover every line exactly once before it can be used.
use embedded_hal::digital::{self, OutputPin, PinState};

/// Number of board lines
pub const PIN_COUNT: usize = 8;

/// Board line, numbered from the first FMC GPIO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BoardPin {
    /// DAC reset, active low
    ResetN = 0,
    /// DAC LDAC, active low
    LdacN = 1,
    /// Selects the quad SPI interface when high
    SpiQpi = 2,
    /// DAC alert output, active low
    AlertN = 3,
    /// Spare line
    Gpio9 = 4,
    /// Red status LED, active low
    LedRed = 5,
    /// Green status LED, active low
    LedGreen = 6,
    /// Blue status LED, active low
    LedBlue = 7,
}

impl BoardPin {
    /// All lines in offset order
    pub const ALL: [BoardPin; PIN_COUNT] = [
        BoardPin::ResetN,
        BoardPin::LdacN,
        BoardPin::SpiQpi,
        BoardPin::AlertN,
        BoardPin::Gpio9,
        BoardPin::LedRed,
        BoardPin::LedGreen,
        BoardPin::LedBlue,
    ];

    /// Offset from the first board GPIO
    pub fn offset(self) -> u8 {
        self as u8
    }
}

/// Direction and initial level of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinDefault {
    /// Input
    Input,
    /// Output driven to the given level
    Output(PinState),
}

/// Board bring-up errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardError {
    /// The line appears more than once in the table
    Duplicate(BoardPin),
    /// The line has no entry in the table
    Missing(BoardPin),
    /// The line is an input and cannot be driven
    NotAnOutput(BoardPin),
    /// GPIO error
    Pin(digital::ErrorKind),
}

/// Defaults of the AD3552R FMC board, every line inactive and the red,
/// green and blue LEDs off
pub const FMCZ_DEFAULTS: [(BoardPin, PinDefault); PIN_COUNT] = [
    (BoardPin::ResetN, PinDefault::Output(PinState::High)),
    (BoardPin::LdacN, PinDefault::Output(PinState::High)),
    (BoardPin::SpiQpi, PinDefault::Output(PinState::Low)),
    (BoardPin::AlertN, PinDefault::Input),
    (BoardPin::Gpio9, PinDefault::Output(PinState::High)),
    (BoardPin::LedRed, PinDefault::Output(PinState::High)),
    (BoardPin::LedGreen, PinDefault::Output(PinState::High)),
    (BoardPin::LedBlue, PinDefault::Output(PinState::High)),
];

/// Validated table of line defaults
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioDefaults {
    table: [PinDefault; PIN_COUNT],
}

impl GpioDefaults {
    /// Build a table, every line has to be listed exactly once
    pub fn new(entries: &[(BoardPin, PinDefault)]) -> Result<Self, BoardError> {
        let mut seen = [None; PIN_COUNT];
        for &(pin, default) in entries {
            let slot = &mut seen[usize::from(pin.offset())];
            if slot.is_some() {
                return Err(BoardError::Duplicate(pin));
            }
            *slot = Some(default);
        }

        let mut table = [PinDefault::Input; PIN_COUNT];
        for ((entry, default), pin) in table.iter_mut().zip(seen).zip(BoardPin::ALL) {
            *entry = default.ok_or(BoardError::Missing(pin))?;
        }
        Ok(Self { table })
    }

    /// Table of the AD3552R FMC board
    pub fn fmcz() -> Self {
        Self {
            table: FMCZ_DEFAULTS.map(|(_, default)| default),
        }
    }

    /// Default of a line
    pub fn get(&self, pin: BoardPin) -> PinDefault {
        self.table[usize::from(pin.offset())]
    }

    /// Lines that are driven, with their initial level
    pub fn outputs(&self) -> impl Iterator<Item = (BoardPin, PinState)> + '_ {
        BoardPin::ALL
            .into_iter()
            .zip(self.table.iter())
            .filter_map(|(pin, default)| match default {
                PinDefault::Output(state) => Some((pin, *state)),
                PinDefault::Input => None,
            })
    }

    /// Drive `io` to the default level of `pin`
    pub fn apply<P: OutputPin>(&self, pin: BoardPin, io: &mut P) -> Result<(), BoardError> {
        match self.get(pin) {
            PinDefault::Output(state) => io
                .set_state(state)
                .map_err(|e| BoardError::Pin(digital::Error::kind(&e))),
            PinDefault::Input => Err(BoardError::NotAnOutput(pin)),
        }
    }
}

/// Light an active low LED to show the board came up
pub fn signal_power_up<P: OutputPin>(led: &mut P) -> Result<(), BoardError> {
    led.set_low()
        .map_err(|e| BoardError::Pin(digital::Error::kind(&e)))
}
