//! Dual-slope axis digitizer.
//!
//! Each axis is an RC network: the potentiometer (or the trackball encoder output) charges a
//! sampling capacitor, and an analog comparator watches the capacitor voltage against a fixed
//! reference. The digitizer releases both capacitors, then polls both comparators once per
//! tick of a [`TimeBase`] pass. The value of an axis is the last tick at which its
//! comparator reported tripped.

use embedded_hal::digital::InputPin;

use crate::driver::flex_pin::FlexPin;
use crate::timing::{CycleClock, Poll, Tick, TimeBase};

/// Digitized position of both axes.
///
/// Each value is a [`Tick`], so it is always in `0..TICKS_PER_PASS`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisSample {
    pub x: Tick,
    pub y: Tick,
}

impl AxisSample {
    pub const fn new(x: Tick, y: Tick) -> Self {
        Self { x, y }
    }
}

/// Converts two comparator trip points into an [`AxisSample`].
pub struct AxisDigitizer<P: FlexPin, C: InputPin> {
    /// Sampling capacitor lines, X then Y
    sampling_pins: [P; 2],
    /// Comparator outputs, X then Y
    comparators: [C; 2],
}

impl<P: FlexPin, C: InputPin> AxisDigitizer<P, C> {
    /// Create a digitizer, both capacitors are held discharged until the first measurement.
    pub fn new(mut sampling_pins: [P; 2], comparators: [C; 2]) -> Self {
        for pin in sampling_pins.iter_mut() {
            pin.drive_low();
        }
        Self {
            sampling_pins,
            comparators,
        }
    }

    /// Run one measurement pass and update `sample` in place.
    ///
    /// An axis whose comparator never trips keeps its previous value.
    pub fn measure<K: CycleClock>(&mut self, clock: &mut K, sample: &mut AxisSample) {
        // Release capacitors to charge
        for pin in self.sampling_pins.iter_mut() {
            pin.release();
        }

        let [comparator_x, comparator_y] = &mut self.comparators;
        TimeBase::pass(clock, |tick, clock| {
            let x = poll(comparator_x);
            sample.x = x.latch(tick, sample.x);
            clock.spend(x.cost());

            let y = poll(comparator_y);
            sample.y = y.latch(tick, sample.y);
            clock.spend(y.cost());
        });

        // Hold capacitors on discharge
        for pin in self.sampling_pins.iter_mut() {
            pin.drive_low();
        }

        trace!("Axis pass done: x={}, y={}", sample.x, sample.y);
    }

    /// Give the pins back.
    pub fn release(self) -> ([P; 2], [C; 2]) {
        (self.sampling_pins, self.comparators)
    }
}

/// Read a comparator, a failed read counts as not tripped.
fn poll<C: InputPin>(comparator: &mut C) -> Poll {
    Poll::from_level(comparator.is_high().unwrap_or(false))
}

#[cfg(test)]
mod test {
    use core::cell::RefCell;

    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    use super::*;
    use crate::driver::sim::{self, Charge, CountingClock, FailingInput, Line, SimAxis, SimBoard, SimClock};
    use crate::timing::{LAST_TICK, PASS_CYCLES, TICKS_PER_PASS};

    #[ctor::ctor]
    fn init_log() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    fn measure_on(board: &RefCell<SimBoard>, sample: &mut AxisSample) -> u64 {
        let port = sim::port(board);
        let mut digitizer = AxisDigitizer::new([port.pot_x, port.pot_y], [port.comparator_x, port.comparator_y]);
        let mut clock = SimClock::new(board);
        let start = board.borrow().cycles;
        digitizer.measure(&mut clock, sample);
        board.borrow().cycles - start
    }

    #[test]
    fn test_measure_reports_last_tripped_tick() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes = [SimAxis::trackball(200, 0), SimAxis::trackball(17, 0)];

        let mut sample = AxisSample::default();
        measure_on(&board, &mut sample);
        assert_eq!(sample, AxisSample::new(200, 17));
    }

    #[test]
    fn test_measure_saturates_at_last_tick() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes = [SimAxis::joystick(10); 2];

        let mut sample = AxisSample::default();
        measure_on(&board, &mut sample);
        assert_eq!(sample, AxisSample::new(LAST_TICK, LAST_TICK));
    }

    #[test]
    fn test_measure_keeps_stale_value_when_never_tripped() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes[0].released = Charge::instant();
        board.borrow_mut().axes[1].released = Charge::reading(99);

        let mut sample = AxisSample::new(123, 45);
        measure_on(&board, &mut sample);
        assert_eq!(sample, AxisSample::new(123, 99));
    }

    #[test]
    fn test_measure_discharges_both_lines() {
        for charge in [Charge::Never, Charge::instant(), Charge::reading(60)] {
            let board = RefCell::new(SimBoard::new());
            board.borrow_mut().axes = [SimAxis { released: charge, asserted: charge }; 2];

            let mut sample = AxisSample::default();
            measure_on(&board, &mut sample);
            let board = board.borrow();
            assert!(board.line(Line::Pot(0)).is_driven_low());
            assert!(board.line(Line::Pot(1)).is_driven_low());
        }
    }

    #[test]
    fn test_measure_duration_independent_of_comparators() {
        let mut durations = heapless::Vec::<u64, 4>::new();
        for charge in [Charge::Never, Charge::instant(), Charge::reading(0), Charge::reading(150)] {
            let board = RefCell::new(SimBoard::new());
            board.borrow_mut().axes = [SimAxis { released: charge, asserted: charge }; 2];
            let mut sample = AxisSample::default();
            durations.push(measure_on(&board, &mut sample)).unwrap();
        }
        assert!(durations.iter().all(|d| *d == PASS_CYCLES as u64));
    }

    #[test]
    fn test_comparator_read_error_counts_as_not_tripped() {
        let board = RefCell::new(SimBoard::new());
        let port = sim::port(&board);
        let mut digitizer = AxisDigitizer::new([port.pot_x, port.pot_y], [FailingInput, FailingInput]);
        let mut clock = CountingClock::default();
        let mut sample = AxisSample::new(88, 3);
        digitizer.measure(&mut clock, &mut sample);

        assert_eq!(sample, AxisSample::new(88, 3));
        assert_eq!(clock.cycles, PASS_CYCLES as u64);
        assert!(board.borrow().line(Line::Pot(0)).is_driven_low());
        assert!(board.borrow().line(Line::Pot(1)).is_driven_low());
    }

    #[test]
    fn test_measure_with_mocked_comparators() {
        // X trips on the first two ticks only, Y never trips
        let mut x_expectations = vec![PinTransaction::get(State::Low); TICKS_PER_PASS as usize];
        x_expectations[0] = PinTransaction::get(State::High);
        x_expectations[1] = PinTransaction::get(State::High);
        let y_expectations = vec![PinTransaction::get(State::Low); TICKS_PER_PASS as usize];
        let mut comparator_x = PinMock::new(&x_expectations);
        let mut comparator_y = PinMock::new(&y_expectations);

        let board = RefCell::new(SimBoard::new());
        let port = sim::port(&board);
        let mut digitizer = AxisDigitizer::new(
            [port.pot_x, port.pot_y],
            [comparator_x.clone(), comparator_y.clone()],
        );
        let mut clock = CountingClock::default();
        let mut sample = AxisSample::new(5, 6);
        digitizer.measure(&mut clock, &mut sample);

        assert_eq!(sample, AxisSample::new(1, 6));
        assert_eq!(clock.cycles, PASS_CYCLES as u64);
        comparator_x.done();
        comparator_y.done();
    }
}
