//! Control line sequencer.
//!
//! The sequencer owns every part of the port and runs them one after the other, so timed
//! loops never interleave. One cycle is:
//!
//! 1. [`Phase::ScanPre`]: scan the keypad matrix
//! 2. [`Phase::MeasureReleased`]: release the control line, settle, measure both axes
//! 3. [`Phase::Classify`]: derive the [`DeviceClass`] from that sample and report it
//! 4. [`Phase::MeasureAsserted`]: assert the control line, settle, measure again
//! 5. [`Phase::ScanPost`]: scan the keypad matrix again
//! 6. [`Phase::Report`]: read the buttons and write the status line
//!
//! Both measurements write the same [`AxisSample`](crate::axis::AxisSample), the reported
//! axes are the ones measured with the control line asserted.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_io::Error as _;

use crate::axis::AxisDigitizer;
use crate::config::PortConfig;
use crate::driver::flex_pin::FlexPin;
use crate::driver::gpio::ControlLine;
use crate::matrix::Matrix;
use crate::reporter::{self, StatusLine};
use crate::state::{DeviceClass, PortState};
use crate::timing::CycleClock;

/// Every line of the controller port.
pub struct Port<P: FlexPin, C: InputPin, In: InputPin, B: InputPin> {
    /// Sampling capacitor line of the X axis
    pub pot_x: P,
    /// Sampling capacitor line of the Y axis
    pub pot_y: P,
    /// Comparator output of the X axis
    pub comparator_x: C,
    /// Comparator output of the Y axis
    pub comparator_y: C,
    /// Keypad row drive lines
    pub rows: [P; 4],
    /// Keypad column sense lines
    pub columns: [In; 4],
    /// Control line
    pub cav: P,
    pub top_button: B,
    pub bottom_button: B,
}

/// Phases of one sequencer cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    #[default]
    ScanPre,
    MeasureReleased,
    Classify,
    MeasureAsserted,
    ScanPost,
    Report,
}

impl Phase {
    /// Phase that runs after this one, `Report` wraps around to `ScanPre`.
    pub fn next(self) -> Self {
        match self {
            Phase::ScanPre => Phase::MeasureReleased,
            Phase::MeasureReleased => Phase::Classify,
            Phase::Classify => Phase::MeasureAsserted,
            Phase::MeasureAsserted => Phase::ScanPost,
            Phase::ScanPost => Phase::Report,
            Phase::Report => Phase::ScanPre,
        }
    }
}

/// The outer state machine of the port.
pub struct Sequencer<P, C, In, B, K, D, W>
where
    P: FlexPin,
    C: InputPin,
    In: InputPin,
    B: InputPin,
    K: CycleClock,
    D: DelayNs,
    W: embedded_io::Write,
{
    digitizer: AxisDigitizer<P, C>,
    matrix: Matrix<In, P, 4, 4>,
    control_line: ControlLine<P>,
    top_button: B,
    bottom_button: B,
    /// Pacing of the timed loops
    clock: K,
    /// Settle delay after control line changes
    delay: D,
    serial: W,
    config: PortConfig,
    state: PortState,
    /// Phase that runs on the next `step`
    phase: Phase,
}

impl<P, C, In, B, K, D, W> Sequencer<P, C, In, B, K, D, W>
where
    P: FlexPin,
    C: InputPin,
    In: InputPin,
    B: InputPin,
    K: CycleClock,
    D: DelayNs,
    W: embedded_io::Write,
{
    /// Take over the port. Sampling lines start discharged, rows and control line released.
    pub fn new(port: Port<P, C, In, B>, clock: K, delay: D, serial: W, config: PortConfig) -> Self {
        debug!(
            "Creating sequencer, settle delay {}us, joystick threshold {}",
            config.settle_delay_us(),
            config.joystick_threshold
        );
        Self {
            digitizer: AxisDigitizer::new([port.pot_x, port.pot_y], [port.comparator_x, port.comparator_y]),
            matrix: Matrix::new(port.columns, port.rows),
            control_line: ControlLine::new(port.cav),
            top_button: port.top_button,
            bottom_button: port.bottom_button,
            clock,
            delay,
            serial,
            config,
            state: PortState::default(),
            phase: Phase::ScanPre,
        }
    }

    /// Run the current phase, advance to the next one and return the phase that ran.
    pub fn step(&mut self) -> Phase {
        let phase = self.phase;
        match phase {
            Phase::ScanPre | Phase::ScanPost => self.matrix.scan(&mut self.clock, &mut self.state.rows),
            Phase::MeasureReleased => {
                self.control_line.release();
                self.measure();
            }
            Phase::Classify => {
                let device = DeviceClass::classify(self.state.axes, self.config.joystick_threshold);
                if device != self.state.device {
                    info!("Device class changed: {:?}", device);
                }
                self.state.device = device;
                if let Err(e) = reporter::write_device_class(&mut self.serial, device) {
                    warn!("Failed to write device class: {:?}", e.kind());
                }
            }
            Phase::MeasureAsserted => {
                self.control_line.assert();
                self.measure();
            }
            Phase::Report => {
                // Buttons are active-low, a failed read counts as released
                self.state.top_button = self.top_button.is_low().unwrap_or(false);
                self.state.bottom_button = self.bottom_button.is_low().unwrap_or(false);
                let status = StatusLine::from(&self.state);
                if let Err(e) = reporter::write_status(&mut self.serial, &status) {
                    warn!("Failed to write status line: {:?}", e.kind());
                }
            }
        }
        self.phase = phase.next();
        phase
    }

    /// Run phases until a `Report` has run.
    ///
    /// Called on a fresh sequencer this is exactly one `ScanPre..=Report` cycle.
    pub fn run_cycle(&mut self) {
        while self.step() != Phase::Report {}
    }

    /// Run the port forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.run_cycle();
        }
    }

    /// Everything measured so far
    pub fn state(&self) -> &PortState {
        &self.state
    }

    /// Phase that runs on the next [`Sequencer::step`]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stop the sequencer and hand back the port and the peripherals.
    pub fn release(self) -> (Port<P, C, In, B>, K, D, W) {
        let ([pot_x, pot_y], [comparator_x, comparator_y]) = self.digitizer.release();
        let (columns, rows) = self.matrix.release();
        let port = Port {
            pot_x,
            pot_y,
            comparator_x,
            comparator_y,
            rows,
            columns,
            cav: self.control_line.into_inner(),
            top_button: self.top_button,
            bottom_button: self.bottom_button,
        };
        (port, self.clock, self.delay, self.serial)
    }

    /// Wait for the front-end to settle on the current control line state, then measure.
    fn measure(&mut self) {
        self.state.control_line = self.control_line.state();
        self.delay.delay_us(self.config.settle_delay_us());
        self.digitizer.measure(&mut self.clock, &mut self.state.axes);
    }
}
