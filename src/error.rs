use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, Report, Severity};

use crate::io::Direction;
use crate::symbol::Span;

/// Failed instruction set lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    UnknownMnemonic(String),
    IllegalOpcode(u8),
}

impl Error for LookupError {}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMnemonic(mnemonic) => write!(f, "Unknown mnemonic `{}`", mnemonic),
            Self::IllegalOpcode(opcode) => write!(f, "Illegal opcode 0x{:02X}", opcode),
        }
    }
}

/// Assembly error, fatal to the whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsmError {
    pub kind: AsmErrorKind,
    /// Line number, counting from 1
    pub line: usize,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmErrorKind {
    UnknownMnemonic {
        mnemonic: String,
    },
    IllegalAddressingMode {
        token: String,
        expected: &'static str,
    },
    OperandOverflow {
        token: String,
        max: u16,
    },
    UndefinedLabel {
        name: String,
    },
    TooManyInstructionsOnLine {
        token: String,
    },
    DuplicateLabel {
        name: String,
        first_addr: u16,
    },
    MissingOperand {
        mnemonic: &'static str,
    },
    InvalidLiteral {
        token: String,
    },
    ProgramTooLarge {
        needed: usize,
        available: usize,
    },
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, line: usize, span: Span) -> Self {
        AsmError { kind, line, span }
    }

    fn code(&self) -> &'static str {
        match self.kind {
            AsmErrorKind::UnknownMnemonic { .. } => "asm::unknown_mnemonic",
            AsmErrorKind::IllegalAddressingMode { .. } => "asm::addressing_mode",
            AsmErrorKind::OperandOverflow { .. } => "asm::overflow",
            AsmErrorKind::UndefinedLabel { .. } => "asm::undefined_label",
            AsmErrorKind::TooManyInstructionsOnLine { .. } => "asm::too_many_instructions",
            AsmErrorKind::DuplicateLabel { .. } => "asm::duplicate_label",
            AsmErrorKind::MissingOperand { .. } => "asm::missing_operand",
            AsmErrorKind::InvalidLiteral { .. } => "asm::bad_lit",
            AsmErrorKind::ProgramTooLarge { .. } => "asm::too_large",
        }
    }

    fn help(&self) -> String {
        match &self.kind {
            AsmErrorKind::UnknownMnemonic { .. } => {
                "check the list of available instructions in the documentation.".to_string()
            }
            AsmErrorKind::IllegalAddressingMode { expected, .. } => {
                format!("this field of the instruction expects {expected}.")
            }
            AsmErrorKind::OperandOverflow { max, .. } => {
                format!("values from 0 to {max:#X} are allowed here.")
            }
            AsmErrorKind::UndefinedLabel { .. } => {
                "define the label with `NAME:` at the start of a line.".to_string()
            }
            AsmErrorKind::TooManyInstructionsOnLine { .. } => {
                "only one instruction is allowed per line, use `#` to start a comment.".to_string()
            }
            AsmErrorKind::DuplicateLabel { first_addr, .. } => {
                format!("this label was already defined at address {first_addr:#05X}.")
            }
            AsmErrorKind::MissingOperand { .. } => {
                "check the number of operands for this instruction.".to_string()
            }
            AsmErrorKind::InvalidLiteral { .. } => {
                "literals are decimal, hex with a 0x prefix, or octal with a leading 0.".to_string()
            }
            AsmErrorKind::ProgramTooLarge { available, .. } => {
                format!("the whole program must fit in {available} bytes of memory.")
            }
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            AsmErrorKind::UnknownMnemonic { .. } => "unknown mnemonic",
            AsmErrorKind::IllegalAddressingMode { .. } => "illegal operand",
            AsmErrorKind::OperandOverflow { .. } => "out-of-range literal",
            AsmErrorKind::UndefinedLabel { .. } => "undefined label",
            AsmErrorKind::TooManyInstructionsOnLine { .. } => "unexpected token",
            AsmErrorKind::DuplicateLabel { .. } => "duplicate label",
            AsmErrorKind::MissingOperand { .. } => "incomplete instruction",
            AsmErrorKind::InvalidLiteral { .. } => "incorrect literal",
            AsmErrorKind::ProgramTooLarge { .. } => "does not fit in memory",
        }
    }

    /// Turn into a diagnostic pointing into `src`.
    pub fn report(self, src: impl Into<String>) -> Report {
        miette!(
            severity = Severity::Error,
            code = self.code(),
            help = self.help(),
            labels = vec![LabeledSpan::at(self.span, self.label())],
            "{}",
            self
        )
        .with_source_code(src.into())
    }
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.kind)
    }
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMnemonic { mnemonic } => {
                write!(f, "Unknown instruction `{}`", mnemonic)
            }
            Self::IllegalAddressingMode { token, expected } => {
                write!(f, "Illegal addressing mode `{}` (expected {})", token, expected)
            }
            Self::OperandOverflow { token, max } => {
                write!(f, "Operand `{}` does not fit in field (max {:#X})", token, max)
            }
            Self::UndefinedLabel { name } => write!(f, "Label `{}` is not defined", name),
            Self::TooManyInstructionsOnLine { token } => {
                write!(f, "Only one instruction per line, found `{}`", token)
            }
            Self::DuplicateLabel { name, .. } => write!(f, "Duplicate label `{}`", name),
            Self::MissingOperand { mnemonic } => {
                write!(f, "Missing operand for `{}`", mnemonic)
            }
            Self::InvalidLiteral { token } => write!(f, "Invalid literal `{}`", token),
            Self::ProgramTooLarge { needed, available } => write!(
                f,
                "Program needs {} bytes, only {} are available",
                needed, available
            ),
        }
    }
}

/// Fault that halts the CPU, or prevents it from starting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    IllegalOpcode { opcode: u8, addr: u16 },
    IllegalAddressingMode { opcode: u8, addr: u16 },
    ResourceExhausted { needed: usize, available: usize },
}

impl Error for RuntimeError {}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalOpcode { opcode, addr } => {
                write!(f, "Invalid opcode 0x{:02X} at 0x{:03X}", opcode, addr)
            }
            Self::IllegalAddressingMode { opcode, addr } => write!(
                f,
                "Illegal addressing mode (register) for opcode 0x{:02X} at 0x{:03X}",
                opcode, addr
            ),
            Self::ResourceExhausted { needed, available } => write!(
                f,
                "Image of {} bytes does not fit in {} bytes of memory",
                needed, available
            ),
        }
    }
}

/// A second callback was registered on a port. The first registration is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortConflict {
    pub port: u8,
    pub direction: Direction,
}

impl Error for PortConflict {}

impl fmt::Display for PortConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} port 0x{:02X} already has a callback registered",
            self.direction, self.port
        )
    }
}
