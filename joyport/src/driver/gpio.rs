use crate::driver::flex_pin::FlexPin;

/// State of the control line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlLineState {
    /// Not driven; the sensor front-end sees the static resistive divider
    #[default]
    Released,
    /// Driven high; the front-end sees the dynamic, encoder influenced signal
    Asserted,
}

/// The gpio driver for the CAV control line.
///
/// It wraps a [`FlexPin`], the line is released by turning the pin into a high-impedance
/// input and asserted by driving it high.
pub(crate) struct ControlLine<P: FlexPin> {
    pin: P,
    state: ControlLineState,
}

impl<P: FlexPin> ControlLine<P> {
    /// Create a new ControlLine instance, the line is released
    pub fn new(mut pin: P) -> Self {
        pin.release();
        Self {
            pin,
            state: ControlLineState::Released,
        }
    }

    /// Assert the control line
    pub fn assert(&mut self) {
        self.pin.drive_high();
        self.state = ControlLineState::Asserted;
    }

    /// Release the control line
    pub fn release(&mut self) {
        self.pin.release();
        self.state = ControlLineState::Released;
    }

    /// Last state the line was put into
    pub fn state(&self) -> ControlLineState {
        self.state
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}
