use core::fmt;

use crate::axis::AxisSample;
use crate::driver::ControlLineState;
use crate::matrix::RowSnapshot;

/// Kind of controller attached to the port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceClass {
    Joystick,
    #[default]
    TrackBall,
}

impl DeviceClass {
    /// Classify from the sample taken with the control line released.
    ///
    /// A resistive joystick keeps both comparators tripped close to the end of the pass while
    /// the control line is released, a trackball's encoder output never gets there. Both axes
    /// must be strictly above `threshold` for a joystick.
    pub fn classify(released: AxisSample, threshold: u8) -> Self {
        if released.x > threshold && released.y > threshold {
            DeviceClass::Joystick
        } else {
            DeviceClass::TrackBall
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Joystick => f.write_str("Joystick"),
            DeviceClass::TrackBall => f.write_str("TrackBall"),
        }
    }
}

/// Everything the sequencer knows about the port.
///
/// The sequencer is the only writer, components get the part they update by reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortState {
    /// Latest axis sample, written by both measurement phases
    pub axes: AxisSample,
    /// Latest matrix snapshot
    pub rows: RowSnapshot,
    /// Class derived from the released-phase sample of the current cycle
    pub device: DeviceClass,
    /// Control line state
    pub control_line: ControlLineState,
    /// Top button pressed
    pub top_button: bool,
    /// Bottom button pressed
    pub bottom_button: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(DeviceClass::classify(AxisSample::new(221, 225), 220), DeviceClass::Joystick);
        assert_eq!(DeviceClass::classify(AxisSample::new(150, 90), 220), DeviceClass::TrackBall);
        assert_eq!(DeviceClass::classify(AxisSample::new(220, 221), 220), DeviceClass::TrackBall);
        assert_eq!(DeviceClass::classify(AxisSample::new(227, 220), 220), DeviceClass::TrackBall);
        assert_eq!(DeviceClass::classify(AxisSample::new(227, 227), 220), DeviceClass::Joystick);
    }

    #[test]
    fn test_default_state() {
        let state = PortState::default();
        assert_eq!(state.axes, AxisSample::new(0, 0));
        assert_eq!(state.rows.rows, [0x0F; 4]);
        assert_eq!(state.device, DeviceClass::TrackBall);
        assert_eq!(state.control_line, ControlLineState::Released);
        assert!(!state.top_button && !state.bottom_button);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("[{}]", DeviceClass::Joystick), "[Joystick]");
        assert_eq!(format!("[{}]", DeviceClass::TrackBall), "[TrackBall]");
    }
}
