//! Module that prints the node's log lines to the terminal.

use color_print::{ceprintln, cprintln};

/// Function that prints a debug message.
pub fn debug(msg: &str) {
    cprintln!("<blue, bold>[DEBUG]</blue, bold> {}", msg);
}

/// Function that prints an informational message.
pub fn info(msg: &str) {
    cprintln!("<green, bold>[INFO]</green, bold> {}", msg);
}

/// Function that prints a warning.
pub fn warn(msg: &str) {
    ceprintln!("<yellow, bold>[WARN]</yellow, bold> {}", msg);
}

/// Function that prints an error.
pub fn error(msg: &str) {
    ceprintln!("<red, bold>[ERROR]</red, bold> {}", msg);
}
