//! Simulated board for host-side runs.
//!
//! [`SimBoard`] models the port electrically just enough to exercise the timing core:
//!
//! - a reference cycle counter advanced by [`SimClock`] and [`SimDelay`],
//! - two RC sampling capacitors whose comparators stay high until the capacitor has charged
//!   for a configurable number of cycles after its line was released,
//! - a 4×4 key matrix with pulled-up columns,
//! - the control line, the two discrete buttons and a serial transmit buffer.
//!
//! All handles borrow the same `RefCell<SimBoard>`, so a test can keep inspecting and
//! changing the board while the sequencer owns the handles.

use core::cell::RefCell;
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use heapless::Vec;

use crate::driver::ControlLineState;
use crate::driver::flex_pin::FlexPin;
use crate::sequencer::Port;
use crate::timing::{CYCLE_NS, CYCLES_PER_TICK, CycleClock, Tick};

/// Capacity of the simulated UART transmit buffer
pub const SIM_TX_CAPACITY: usize = 2048;

/// Rows of the simulated key matrix
pub const SIM_ROWS: usize = 4;

/// Columns of the simulated key matrix
pub const SIM_COLS: usize = 4;

/// How long a sampling capacitor takes to reach the comparator reference once released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charge {
    /// Never reaches the reference, the comparator stays high for the whole pass
    Never,
    /// Reaches the reference this many reference cycles after the line is released
    After(u32),
}

impl Charge {
    /// Charge time that makes the digitizer report `tick`.
    ///
    /// The comparator is high up to and including the poll of `tick`, and low from the poll
    /// of `tick + 1` on.
    pub const fn reading(tick: Tick) -> Self {
        Charge::After((tick as u32 + 1) * CYCLES_PER_TICK)
    }

    /// Capacitor already above the reference when the pass starts: the comparator never trips.
    pub const fn instant() -> Self {
        Charge::After(0)
    }

    fn below_reference(self, elapsed: u64) -> bool {
        match self {
            Charge::Never => true,
            Charge::After(cycles) => elapsed < cycles as u64,
        }
    }
}

/// Front-end behaviour of one axis for both control line states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimAxis {
    pub released: Charge,
    pub asserted: Charge,
}

impl SimAxis {
    /// Resistive joystick: slow static charge with the line released, the position with the line asserted.
    pub const fn joystick(position: Tick) -> Self {
        Self {
            released: Charge::Never,
            asserted: Charge::reading(position),
        }
    }

    /// Trackball: the encoder output charges the capacitor well before the end of the pass in both states.
    pub const fn trackball(released: Tick, asserted: Tick) -> Self {
        Self {
            released: Charge::reading(released),
            asserted: Charge::reading(asserted),
        }
    }

    fn charge(&self, cav: ControlLineState) -> Charge {
        match cav {
            ControlLineState::Released => self.released,
            ControlLineState::Asserted => self.asserted,
        }
    }
}

impl Default for SimAxis {
    fn default() -> Self {
        Self::joystick(Tick::MAX / 2)
    }
}

/// Direction and output latch of a simulated bidirectional line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimLineState {
    pub output: bool,
    pub latch: bool,
    /// Internal pull-up enabled
    pub pull_up: bool,
}

impl SimLineState {
    pub fn is_driven_low(&self) -> bool {
        self.output && !self.latch
    }

    pub fn is_driven_high(&self) -> bool {
        self.output && self.latch
    }
}

/// Bidirectional lines of the simulated board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    /// Sampling capacitor of axis 0 (X) or 1 (Y)
    Pot(usize),
    /// Matrix row drive line
    Row(usize),
    /// Control line
    Cav,
}

/// The simulated board.
pub struct SimBoard {
    /// Reference cycles elapsed
    pub cycles: u64,
    /// Nanoseconds spent in [`SimDelay`]
    pub delayed_ns: u64,
    /// Front-end behaviour of the X and Y axes
    pub axes: [SimAxis; 2],
    /// Pressed state of the key matrix, `[row][col]`
    pub keys: [[bool; SIM_COLS]; SIM_ROWS],
    /// Pressed state of the top and bottom buttons
    pub buttons: [bool; 2],
    /// Make every serial write fail
    pub serial_fails: bool,
    pots: [SimLineState; 2],
    released_at: [Option<u64>; 2],
    rows: [SimLineState; SIM_ROWS],
    cav: SimLineState,
    max_rows_driven: usize,
    column_reads: usize,
    non_exclusive_reads: usize,
    tx: Vec<u8, SIM_TX_CAPACITY>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            cycles: 0,
            delayed_ns: 0,
            axes: [SimAxis::default(); 2],
            keys: [[false; SIM_COLS]; SIM_ROWS],
            buttons: [false; 2],
            serial_fails: false,
            pots: [SimLineState::default(); 2],
            released_at: [None; 2],
            rows: [SimLineState::default(); SIM_ROWS],
            cav: SimLineState::default(),
            max_rows_driven: 0,
            column_reads: 0,
            non_exclusive_reads: 0,
            tx: Vec::new(),
        }
    }

    /// Press or release the key at `(row, col)`
    pub fn set_key(&mut self, row: usize, col: usize, pressed: bool) {
        self.keys[row][col] = pressed;
    }

    pub fn line(&self, line: Line) -> SimLineState {
        match line {
            Line::Pot(idx) => self.pots[idx],
            Line::Row(idx) => self.rows[idx],
            Line::Cav => self.cav,
        }
    }

    pub fn cav_state(&self) -> ControlLineState {
        if self.cav.is_driven_high() {
            ControlLineState::Asserted
        } else {
            ControlLineState::Released
        }
    }

    pub fn rows_driven(&self) -> usize {
        self.rows.iter().filter(|r| r.is_driven_low()).count()
    }

    /// Highest number of rows that were driven at the same time
    pub fn max_rows_driven(&self) -> usize {
        self.max_rows_driven
    }

    /// Number of column samples taken
    pub fn column_reads(&self) -> usize {
        self.column_reads
    }

    /// Number of column samples taken while not exactly one row was driven
    pub fn non_exclusive_reads(&self) -> usize {
        self.non_exclusive_reads
    }

    /// Everything written to the serial port so far
    pub fn serial_text(&self) -> &str {
        core::str::from_utf8(&self.tx).unwrap_or("")
    }

    pub fn clear_serial(&mut self) {
        self.tx.clear();
    }

    fn comparator_high(&self, axis: usize) -> bool {
        let Some(released_at) = self.released_at[axis] else {
            // Discharged capacitor sits below the reference
            return true;
        };
        let elapsed = self.cycles - released_at;
        self.axes[axis].charge(self.cav_state()).below_reference(elapsed)
    }

    fn column_high(&mut self, col: usize) -> bool {
        let driven = self.rows_driven();
        self.column_reads += 1;
        if driven != 1 {
            self.non_exclusive_reads += 1;
        }
        !self
            .rows
            .iter()
            .zip(self.keys.iter())
            .any(|(row, keys)| row.is_driven_low() && keys[col])
    }

    fn line_level(&self, line: Line) -> bool {
        let state = self.line(line);
        if state.output {
            return state.latch;
        }
        match line {
            // Released lines float low without their pull-up
            Line::Row(_) | Line::Cav => state.pull_up,
            Line::Pot(axis) => !self.comparator_high(axis),
        }
    }

    fn update_line(&mut self, line: Line, f: impl FnOnce(&mut SimLineState)) {
        match line {
            Line::Pot(idx) => {
                f(&mut self.pots[idx]);
                if self.pots[idx].output {
                    self.released_at[idx] = None;
                } else if self.released_at[idx].is_none() {
                    self.released_at[idx] = Some(self.cycles);
                }
            }
            Line::Row(idx) => {
                f(&mut self.rows[idx]);
                self.max_rows_driven = self.max_rows_driven.max(self.rows_driven());
            }
            Line::Cav => f(&mut self.cav),
        }
    }
}

/// Bidirectional line handle.
pub struct SimLine<'a> {
    board: &'a RefCell<SimBoard>,
    line: Line,
}

impl<'a> SimLine<'a> {
    pub fn new(board: &'a RefCell<SimBoard>, line: Line) -> Self {
        Self { board, line }
    }
}

impl ErrorType for SimLine<'_> {
    type Error = Infallible;
}

impl InputPin for SimLine<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.board.borrow().line_level(self.line))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for SimLine<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().update_line(self.line, |s| s.latch = false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().update_line(self.line, |s| s.latch = true);
        Ok(())
    }
}

impl FlexPin for SimLine<'_> {
    fn release(&mut self) {
        self.board.borrow_mut().update_line(self.line, |s| {
            s.output = false;
            s.pull_up = false;
        });
    }

    fn release_pull_up(&mut self) {
        self.board.borrow_mut().update_line(self.line, |s| {
            s.output = false;
            s.pull_up = true;
        });
    }

    fn drive_low(&mut self) {
        self.board.borrow_mut().update_line(self.line, |s| {
            s.latch = false;
            s.output = true;
        });
    }

    fn drive_high(&mut self) {
        self.board.borrow_mut().update_line(self.line, |s| {
            s.latch = true;
            s.output = true;
        });
    }
}

/// Comparator output of one axis, high while the capacitor is below the reference.
pub struct SimComparator<'a> {
    board: &'a RefCell<SimBoard>,
    axis: usize,
}

impl ErrorType for SimComparator<'_> {
    type Error = Infallible;
}

impl InputPin for SimComparator<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.board.borrow().comparator_high(self.axis))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Pulled-up matrix column.
pub struct SimColumn<'a> {
    board: &'a RefCell<SimBoard>,
    col: usize,
}

impl ErrorType for SimColumn<'_> {
    type Error = Infallible;
}

impl InputPin for SimColumn<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.board.borrow_mut().column_high(self.col))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Active-low discrete button, 0 is top and 1 is bottom.
pub struct SimButton<'a> {
    board: &'a RefCell<SimBoard>,
    index: usize,
}

impl ErrorType for SimButton<'_> {
    type Error = Infallible;
}

impl InputPin for SimButton<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.board.borrow().buttons[self.index])
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Input whose every read fails, for the error paths of the port.
pub struct FailingInput;

impl ErrorType for FailingInput {
    type Error = embedded_hal::digital::ErrorKind;
}

impl InputPin for FailingInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }
}

/// Cycle clock advancing the board's cycle counter.
pub struct SimClock<'a> {
    board: &'a RefCell<SimBoard>,
}

impl<'a> SimClock<'a> {
    pub fn new(board: &'a RefCell<SimBoard>) -> Self {
        Self { board }
    }
}

impl CycleClock for SimClock<'_> {
    fn spend(&mut self, cycles: u32) {
        self.board.borrow_mut().cycles += cycles as u64;
    }
}

/// Standalone cycle counter, for timing checks that need no board.
#[derive(Default)]
pub struct CountingClock {
    pub cycles: u64,
}

impl CycleClock for CountingClock {
    fn spend(&mut self, cycles: u32) {
        self.cycles += cycles as u64;
    }
}

/// Blocking delay advancing the board's time.
pub struct SimDelay<'a> {
    board: &'a RefCell<SimBoard>,
}

impl<'a> SimDelay<'a> {
    pub fn new(board: &'a RefCell<SimBoard>) -> Self {
        Self { board }
    }
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        let mut board = self.board.borrow_mut();
        board.delayed_ns += ns as u64;
        board.cycles += (ns / CYCLE_NS) as u64;
    }
}

/// Error of the simulated UART.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimSerialError {
    /// Transmit buffer is full
    Full,
    /// Failure injected through [`SimBoard::serial_fails`]
    Injected,
}

impl core::fmt::Display for SimSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SimSerialError::Full => f.write_str("transmit buffer full"),
            SimSerialError::Injected => f.write_str("injected serial failure"),
        }
    }
}

impl core::error::Error for SimSerialError {}

impl embedded_io::Error for SimSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            SimSerialError::Full => embedded_io::ErrorKind::OutOfMemory,
            SimSerialError::Injected => embedded_io::ErrorKind::Other,
        }
    }
}

/// UART transmitter writing into the board's transmit buffer.
pub struct SimSerial<'a> {
    board: &'a RefCell<SimBoard>,
}

impl<'a> SimSerial<'a> {
    pub fn new(board: &'a RefCell<SimBoard>) -> Self {
        Self { board }
    }
}

impl embedded_io::ErrorType for SimSerial<'_> {
    type Error = SimSerialError;
}

impl embedded_io::Write for SimSerial<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut board = self.board.borrow_mut();
        if board.serial_fails {
            return Err(SimSerialError::Injected);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let room = SIM_TX_CAPACITY - board.tx.len();
        if room == 0 {
            return Err(SimSerialError::Full);
        }
        let n = room.min(buf.len());
        // Cannot fail, `n` fits in the remaining capacity
        board.tx.extend_from_slice(&buf[..n]).ok();
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Port wired to the simulated board.
pub type SimPort<'a> = Port<SimLine<'a>, SimComparator<'a>, SimColumn<'a>, SimButton<'a>>;

/// Wire every line of the simulated board into a [`Port`].
pub fn port(board: &RefCell<SimBoard>) -> SimPort<'_> {
    Port {
        pot_x: SimLine::new(board, Line::Pot(0)),
        pot_y: SimLine::new(board, Line::Pot(1)),
        comparator_x: SimComparator { board, axis: 0 },
        comparator_y: SimComparator { board, axis: 1 },
        rows: core::array::from_fn(|idx| SimLine::new(board, Line::Row(idx))),
        columns: core::array::from_fn(|col| SimColumn { board, col }),
        cav: SimLine::new(board, Line::Cav),
        top_button: SimButton { board, index: 0 },
        bottom_button: SimButton { board, index: 1 },
    }
}
