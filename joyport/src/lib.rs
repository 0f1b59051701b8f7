#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod axis;
pub mod config;
pub mod driver;
pub mod keymap;
pub mod matrix;
pub mod reporter;
pub mod sequencer;
pub mod state;
pub mod timing;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

pub use crate::axis::{AxisDigitizer, AxisSample};
pub use crate::config::PortConfig;
pub use crate::driver::flex_pin::FlexPin;
pub use crate::matrix::{Matrix, RowSnapshot};
pub use crate::sequencer::{Phase, Port, Sequencer};
pub use crate::state::{DeviceClass, PortState};
pub use crate::timing::{CycleClock, DeadlineClock};

/// Run the controller port emulator forever.
///
/// This is the firmware entry point: it takes the already configured pins, a cycle clock
/// for the timed loops, a millisecond-capable delay for the control line settle time and
/// the serial port the status lines are written to.
pub fn run_port<P, C, In, B, K, D, W>(
    port: Port<P, C, In, B>,
    clock: K,
    delay: D,
    serial: W,
    config: PortConfig,
) -> !
where
    P: FlexPin,
    C: InputPin,
    In: InputPin,
    B: InputPin,
    K: CycleClock,
    D: DelayNs,
    W: embedded_io::Write,
{
    info!("Controller port emulator started");
    let mut sequencer = Sequencer::new(port, clock, delay, serial, config);
    sequencer.run()
}
