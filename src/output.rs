use std::cell::RefCell;
use std::io::{stdout, Write};
use std::path::Path;

use colored::{ColoredString, Colorize};

use crate::term;

/// Log a line to the instruction trace.
#[macro_export]
macro_rules! tprintln {
    ( $fmt:literal $($tt:tt)* ) => {{
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Trace.print_str(&s);
    }};
}

/// Host-side channels. The emulated console never goes through here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// Progress messages on stdout, hidden if `--minimal`.
    Status,
    /// Instruction trace on stderr.
    Trace,
}

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    /// Returns the previous value.
    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_str(&self, string: &str) {
        let string = term::crlf(string, term::is_raw_mode());
        match self {
            Self::Status => {
                if Self::is_minimal() {
                    return;
                }
                print!("{}", string);
                let _ = stdout().flush();
            }
            // Never colored if `--minimal`, so traces can be diffed
            Self::Trace => {
                if Self::is_minimal() {
                    eprint!("{}", string);
                } else {
                    eprint!("{}", ColoredString::from(&*string).blue());
                }
            }
        }
    }
}

/// Print a right-aligned colored verb followed by details.
pub fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    Output::Status.print_str(&format!("{left:>12} {right}\n"));
}

pub fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("image {}", right.display());
    message(color, left, &right);
}
