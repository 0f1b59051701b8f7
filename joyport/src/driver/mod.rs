//! Hardware boundary of the port emulator.
//!
//! The timing core only depends on the capabilities defined here: [`flex_pin::FlexPin`] for
//! lines that are either released or driven, `embedded-hal` input pins for comparators,
//! columns and buttons, and [`crate::timing::CycleClock`] for busy waits.

pub mod flex_pin;
pub(crate) mod gpio;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use gpio::ControlLineState;
