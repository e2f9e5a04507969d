// Encoding
pub mod isa;
pub mod word;

// Assembling
pub mod asm;
pub use asm::{assemble, Assembler};
pub mod disasm;

// Running
pub mod io;
pub use io::Ports;
pub mod output;
pub mod runtime;
pub use runtime::{RunState, Status};

pub mod error;
pub mod symbol;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
