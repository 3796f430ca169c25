//! Terminal escape helpers for the dashboard painter.
//!
//! Functions return owned `String`s or static slices so call sites can write
//! them straight into any `io::Write`.

const CSI: &str = "\x1b[";

/// Move the cursor to an absolute 1-based `row` and `column`.
pub fn move_to(row: u16, column: u16) -> String {
    format!("{CSI}{row};{column}H")
}

/// Move to a 0-based cell, the coordinate space used by the surface.
pub fn move_to_cell(x: u16, y: u16) -> String {
    move_to(y.saturating_add(1), x.saturating_add(1))
}

/// Clear the whole screen and home the cursor.
pub fn clear_screen() -> &'static str {
    "\x1b[2J\x1b[H"
}

/// Hide the cursor.
pub fn hide() -> &'static str {
    "\x1b[?25l"
}

/// Show the cursor.
pub fn show() -> &'static str {
    "\x1b[?25h"
}

pub fn reset() -> &'static str {
    "\x1b[0m"
}

pub fn bold() -> &'static str {
    "\x1b[1m"
}

pub fn dim() -> &'static str {
    "\x1b[2m"
}

pub fn reverse() -> &'static str {
    "\x1b[7m"
}

/// Red foreground, used for error markers.
pub fn red() -> &'static str {
    "\x1b[31m"
}

pub fn yellow() -> &'static str {
    "\x1b[33m"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_position_is_well_formed() {
        assert_eq!(move_to(3, 5), "\x1b[3;5H");
    }

    #[test]
    fn cells_are_zero_based() {
        assert_eq!(move_to_cell(0, 0), "\x1b[1;1H");
        assert_eq!(move_to_cell(4, 2), "\x1b[3;5H");
    }
}
