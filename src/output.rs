use std::cell::RefCell;
use std::io::{stdout, Write};

use colored::{ColoredString, Colorize};

use crate::runtime::RunState;
use crate::symbol::Register;

/// Print a trace line to stderr, only when verbose output is on.
#[macro_export]
macro_rules! vprintln {
    ( $fmt:literal $($tt:tt)* ) => {{
        if $crate::output::Output::is_verbose() {
            let s = format!(
                concat!($fmt, "\n")
                $($tt)*
            );
            $crate::output::Output::Trace.print_str(&s);
        }
    }};
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// Program output on stdout
    Normal,
    /// Emulator trace on stderr
    Trace,
}

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_VERBOSE: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_verbose(new_value: bool) -> bool {
        Self::IS_VERBOSE.with(|value| value.replace(new_value))
    }
    pub fn is_verbose() -> bool {
        Self::IS_VERBOSE.with(|value| *value.borrow())
    }

    fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }

    pub fn print_char(&self, ch: char) {
        match self {
            Self::Normal => {
                print!("{}", ch);
                let _ = stdout().flush();
            }
            Self::Trace => eprint!("{}", ch),
        }
        Self::set_line_start(ch == '\n');
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                print!("{}", string);
                let _ = stdout().flush();
            }
            Self::Trace => eprint!("{}", ColoredString::from(string).blue()),
        }
        if let Some(ch) = string.chars().last() {
            Self::set_line_start(ch == '\n');
        }
    }

    /// Terminate a line of program output left open, so status messages start on their own line.
    pub fn start_new_line(&self) {
        if !Self::is_line_start() {
            self.print_char('\n');
        }
    }

    pub fn print_registers(&self, state: &RunState) {
        self.print_str("\x1b[2m┌───────────────────────────────┐\x1b[0m\n");
        self.print_str("\x1b[2m│        \x1b[3mhex  uint   int  char\x1b[0m\x1b[2m │\x1b[0m\n");
        for reg in Register::ALL {
            self.print_str("\x1b[2m│\x1b[0m");
            self.print_str(&format!(" \x1b[1m{}\x1b[0m  ", reg.name()));
            self.print_integer(state.reg(reg));
            self.print_str(" \x1b[2m│\x1b[0m\n");
        }
        self.print_str("\x1b[2m│\x1b[0m");
        self.print_str(&format!(" \x1b[1mPC\x1b[0m  0x{:03x}", state.pc()));
        self.print_str(&format!("  \x1b[1mSP\x1b[0m 0x{:02x}", state.sp()));
        self.print_str(&format!("  \x1b[1mF\x1b[0m {}", state.flags()));
        self.print_str(" \x1b[2m│\x1b[0m\n");
        self.print_str("\x1b[2m└───────────────────────────────┘\x1b[0m\n");
    }

    fn print_integer(&self, value: u8) {
        self.print_str(&format!("0x{:02x}  ", value));
        self.print_str(&format!("{:-4}  ", value));
        self.print_str(&format!("{:-4}  ", value as i8));
        self.print_char_display(value);
    }

    fn print_char_display(&self, value: u8) {
        // Always 4 columns
        match value {
            0x00 => self.print_str(" NUL"),
            0x09 => self.print_str("  HT"),
            0x0a => self.print_str("  LF"),
            0x0d => self.print_str("  CR"),
            0x1b => self.print_str(" ESC"),
            0x7f => self.print_str(" DEL"),
            0x20 => self.print_str(" [_]"),
            0x21..=0x7e => self.print_str(&format!("{:>4}", value as char)),
            0x00..=0x7f => self.print_str("\x1b[2m ───\x1b[0m"),
            0x80.. => self.print_str("\x1b[2m ┄┄┄\x1b[0m"),
        }
    }
}
