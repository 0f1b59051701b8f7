//! Console keypad layout.
//!
//! The controller keypad is a 4×4 matrix with 15 keys:
//!
//! ```text
//!          col0  col1  col2  col3
//! row0      1     4     7     *
//! row1      2     5     8     0
//! row2      3     6     9     #
//! row3    Start Pause Reset
//! ```

use heapless::Vec;

use crate::matrix::RowSnapshot;

/// Number of keys on the keypad
pub const KEY_COUNT: usize = 15;

/// A key of the keypad and where it sits in the matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeypadKey {
    /// Character used for this key in the status line
    pub label: char,
    pub row: u8,
    pub col: u8,
}

const fn key(label: char, row: u8, col: u8) -> KeypadKey {
    KeypadKey { label, row, col }
}

/// Keypad layout in the order keys are reported.
#[rustfmt::skip]
pub const KEYPAD_LAYOUT: [KeypadKey; KEY_COUNT] = [
    key('0', 1, 3),
    key('1', 0, 0), key('2', 1, 0), key('3', 2, 0),
    key('4', 0, 1), key('5', 1, 1), key('6', 2, 1),
    key('7', 0, 2), key('8', 1, 2), key('9', 2, 2),
    key('*', 0, 3), key('#', 2, 3),
    // Reset, Pause, Start
    key('R', 3, 2), key('P', 3, 1), key('S', 3, 0),
];

/// Find the key wired at `(row, col)`, row 3 column 3 is not connected.
pub fn key_at(row: u8, col: u8) -> Option<KeypadKey> {
    KEYPAD_LAYOUT.iter().copied().find(|k| k.row == row && k.col == col)
}

impl RowSnapshot<4, 4> {
    /// Labels of every pressed key, in report order
    pub fn pressed_keys(&self) -> Vec<char, KEY_COUNT> {
        KEYPAD_LAYOUT
            .iter()
            .filter(|k| self.is_pressed(k.row as usize, k.col as usize))
            .map(|k| k.label)
            .collect()
    }
}
