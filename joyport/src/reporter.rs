//! Serial status reporter.
//!
//! The port reports over a plain text serial line. Every `\n` is followed by `\r`, so a dumb
//! terminal shows one status line per cycle:
//!
//! ```text
//! [Joystick]PotX:200 PotY:113 Top:0 Bot:1 Keys:7#
//! ```
//!
//! The device tag is written right after classification and has no terminator, the status
//! line follows at the end of the same cycle.

use core::fmt::{self, Write as _};

use crate::axis::AxisSample;
use crate::matrix::RowSnapshot;
use crate::state::{DeviceClass, PortState};

/// Content of one status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusLine {
    pub axes: AxisSample,
    pub top_button: bool,
    pub bottom_button: bool,
    pub rows: RowSnapshot,
}

impl From<&PortState> for StatusLine {
    fn from(state: &PortState) -> Self {
        Self {
            axes: state.axes,
            top_button: state.top_button,
            bottom_button: state.bottom_button,
            rows: state.rows,
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PotX:{:03} PotY:{:03} Top:{} Bot:{} Keys:",
            self.axes.x, self.axes.y, self.top_button as u8, self.bottom_button as u8
        )?;
        for label in self.rows.pressed_keys() {
            f.write_char(label)?;
        }
        f.write_char('\n')
    }
}

/// `core::fmt::Write` adapter over a serial port.
///
/// Adds a carriage return after each line feed, and keeps the first I/O error so it can be
/// returned instead of the opaque `fmt::Error`.
struct LineWriter<'a, W: embedded_io::Write> {
    serial: &'a mut W,
    error: Option<W::Error>,
}

impl<'a, W: embedded_io::Write> LineWriter<'a, W> {
    fn new(serial: &'a mut W) -> Self {
        Self { serial, error: None }
    }

    fn put(&mut self, bytes: &[u8]) -> fmt::Result {
        self.serial.write_all(bytes).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }

    /// Turn the result of a `write!` into the serial port's result.
    fn finish(self, result: fmt::Result) -> Result<(), W::Error> {
        match self.error {
            Some(e) => Err(e),
            None => {
                // Formatting itself never fails for the types written here
                debug_assert!(result.is_ok());
                Ok(())
            }
        }
    }
}

impl<W: embedded_io::Write> fmt::Write for LineWriter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut lines = s.split('\n');
        if let Some(first) = lines.next() {
            self.put(first.as_bytes())?;
        }
        for line in lines {
            self.put(b"\n\r")?;
            self.put(line.as_bytes())?;
        }
        Ok(())
    }
}

/// Write any displayable value with the serial line discipline.
pub fn write_text<W: embedded_io::Write>(serial: &mut W, text: impl fmt::Display) -> Result<(), W::Error> {
    let mut writer = LineWriter::new(serial);
    let result = write!(writer, "{}", text);
    writer.finish(result)
}

/// Write the bracketed device tag, without a terminator.
pub fn write_device_class<W: embedded_io::Write>(serial: &mut W, device: DeviceClass) -> Result<(), W::Error> {
    write_text(serial, format_args!("[{}]", device))
}

/// Write a complete status line.
pub fn write_status<W: embedded_io::Write>(serial: &mut W, status: &StatusLine) -> Result<(), W::Error> {
    write_text(serial, status)?;
    serial.flush()
}
