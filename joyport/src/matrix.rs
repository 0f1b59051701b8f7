use embedded_hal::digital::InputPin;

use crate::driver::flex_pin::FlexPin;
use crate::timing::{CYCLES_PER_TICK, CycleClock};

/// Release the previous row
pub const ROW_RELEASE_CYCLES: u32 = 4;
/// Drive the current row low
pub const ROW_DRIVE_CYCLES: u32 = 4;
/// Let the line capacitance settle before sampling
pub const ROW_SETTLE_CYCLES: u32 = 54;
/// Read and store the column field
pub const COLUMN_SAMPLE_CYCLES: u32 = 23;
/// Keep the row driven until the end of its slot
pub const ROW_HOLD_CYCLES: u32 = 43;

/// One row slot lasts two horizontal lines
pub const ROW_DWELL_CYCLES: u32 =
    ROW_RELEASE_CYCLES + ROW_DRIVE_CYCLES + ROW_SETTLE_CYCLES + COLUMN_SAMPLE_CYCLES + ROW_HOLD_CYCLES;

const _: () = assert!(ROW_DWELL_CYCLES == 2 * CYCLES_PER_TICK, "a row slot must last two lines");

/// Snapshot of the matrix, one column mask per row.
///
/// Bit `c` of `rows[r]` is the level of column `c` while row `r` was driven: the matrix is
/// active-low, a cleared bit means the key at `(r, c)` is pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RowSnapshot<const ROW: usize = 4, const COL: usize = 4> {
    pub rows: [u8; ROW],
}

impl<const ROW: usize, const COL: usize> Default for RowSnapshot<ROW, COL> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<const ROW: usize, const COL: usize> RowSnapshot<ROW, COL> {
    /// Mask of a row with nothing pressed
    pub const IDLE_ROW: u8 = if COL >= 8 { u8::MAX } else { (1u8 << COL) - 1 };

    /// Snapshot with no key pressed
    pub const fn idle() -> Self {
        Self {
            rows: [Self::IDLE_ROW; ROW],
        }
    }

    /// Check whether the key at `(row, col)` is pressed
    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.rows.get(row).is_some_and(|mask| col < COL && mask & (1 << col) == 0)
    }

    /// Whether any key in the snapshot is pressed
    pub fn any_pressed(&self) -> bool {
        self.rows.iter().any(|mask| mask & Self::IDLE_ROW != Self::IDLE_ROW)
    }
}

/// Column sense lines, sampled together.
pub trait ColumnSense {
    /// Read all column lines into a mask, bit `c` set when column `c` is high.
    fn sample(&mut self) -> u8;
}

impl<In: InputPin, const INPUT_PIN_NUM: usize> ColumnSense for [In; INPUT_PIN_NUM] {
    fn sample(&mut self) -> u8 {
        self.iter_mut().enumerate().fold(0, |mask, (idx, pin)| {
            // A failed read counts as an idle, pulled-up column
            let high = pin.is_high().unwrap_or(true);
            mask | ((high as u8) << idx)
        })
    }
}

/// Matrix is the physical pcb layout of the keypad matrix.
///
/// Rows are driven low one at a time through [`FlexPin`]s and released to their pull-up,
/// columns are pulled up inputs.
pub struct Matrix<In: InputPin, Out: FlexPin, const INPUT_PIN_NUM: usize, const OUTPUT_PIN_NUM: usize> {
    /// Column sense pins of the pcb matrix
    input_pins: [In; INPUT_PIN_NUM],
    /// Row drive pins of the pcb matrix
    output_pins: [Out; OUTPUT_PIN_NUM],
}

impl<In: InputPin, Out: FlexPin, const INPUT_PIN_NUM: usize, const OUTPUT_PIN_NUM: usize>
    Matrix<In, Out, INPUT_PIN_NUM, OUTPUT_PIN_NUM>
{
    /// Create a matrix from input and output pins, all rows start released.
    pub fn new(input_pins: [In; INPUT_PIN_NUM], mut output_pins: [Out; OUTPUT_PIN_NUM]) -> Self {
        const { assert!(INPUT_PIN_NUM <= 8, "column masks are 8 bits wide") };
        const { assert!(OUTPUT_PIN_NUM > 0, "matrix needs at least one row") };
        for out_pin in output_pins.iter_mut() {
            out_pin.release_pull_up();
        }
        Matrix {
            input_pins,
            output_pins,
        }
    }

    /// Scan every row once, in order, and overwrite `snapshot`.
    ///
    /// Row `n` is only driven after row `n - 1` (wrapping) has been released, so at most one
    /// row is ever driven. The last row stays driven when the scan returns and is released
    /// at the start of the next scan.
    pub fn scan<K: CycleClock>(&mut self, clock: &mut K, snapshot: &mut RowSnapshot<OUTPUT_PIN_NUM, INPUT_PIN_NUM>) {
        clock.start();
        for out_idx in 0..OUTPUT_PIN_NUM {
            let prev_idx = (out_idx + OUTPUT_PIN_NUM - 1) % OUTPUT_PIN_NUM;

            self.output_pins[prev_idx].release_pull_up();
            clock.spend(ROW_RELEASE_CYCLES);

            self.output_pins[out_idx].drive_low();
            clock.spend(ROW_DRIVE_CYCLES);

            clock.spend(ROW_SETTLE_CYCLES);

            snapshot.rows[out_idx] = self.input_pins.sample();
            clock.spend(COLUMN_SAMPLE_CYCLES);

            clock.spend(ROW_HOLD_CYCLES);
        }

        if snapshot.any_pressed() {
            debug!("Matrix scan: {:?}", snapshot.rows);
        }
    }

    /// Give the pins back.
    pub fn release(self) -> ([In; INPUT_PIN_NUM], [Out; OUTPUT_PIN_NUM]) {
        (self.input_pins, self.output_pins)
    }
}
