use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

#[cfg(feature = "rp2040")]
pub mod rp;

/// Pin that can be switched between a high-impedance input and a driven output.
///
/// The port lines are all open-collector style: the sampling capacitors, the matrix rows and
/// the control line are either released (nothing drives them, the board circuitry decides
/// the level) or driven to a fixed level.
pub trait FlexPin: ErrorType + InputPin + OutputPin {
    /// Switch the pin to a high-impedance input, without any internal pull.
    fn release(&mut self);

    /// Switch the pin to an input held high by the internal pull-up.
    fn release_pull_up(&mut self);

    /// Latch low, then switch the pin to output.
    fn drive_low(&mut self);

    /// Latch high, then switch the pin to output.
    fn drive_high(&mut self);
}
