//! Static description of every Femto instruction.
//!
//! Instruction format (`I`: opcode, `M`: addressing mode, `R`: registers, `D`: data, `A`: address):
//!
//! ```text
//! MIII IIII   RRRR xxxx   DDDD DDDD
//! MIII IIII   RRRR AAAA   AAAA AAAA
//! ```

use crate::error::LookupError;

/// Operand kinds accepted by one field (destination or source) of an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldMode {
    /// No field
    None,
    RegisterOnly,
    ImmediateOnly,
    /// Selected per instruction by the addressing mode bit
    RegisterOrImmediate,
}

impl FieldMode {
    pub fn is_present(self) -> bool {
        self != FieldMode::None
    }
}

/// Width of the immediate field of an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Width {
    /// 8 bit datum in byte 2
    Data,
    /// 12 bit address across bytes 1 and 2
    Address,
}

impl Width {
    pub fn max(self) -> u16 {
        match self {
            Width::Data => 0xFF,
            Width::Address => 0xFFF,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InstrDesc {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub dest: FieldMode,
    pub src: FieldMode,
    pub width: Width,
}

pub mod opcode {
    pub const HLT: u8 = 0x00;
    pub const LDR: u8 = 0x01;
    pub const LDM: u8 = 0x02;
    pub const STI: u8 = 0x03;
    pub const STR: u8 = 0x04;
    pub const ADD: u8 = 0x05;
    pub const SUB: u8 = 0x06;
    pub const CMP: u8 = 0x07;
    /// Jump if zero, same as "jump if equal"
    pub const JZ: u8 = 0x08;
    pub const JN: u8 = 0x09;
    /// Jump if carry, same as "jump if below"
    pub const JC: u8 = 0x0A;
    /// Jump if not carry, same as "jump if above or equal"
    pub const JNC: u8 = 0x0B;
    /// Carry or zero
    pub const JBE: u8 = 0x0C;
    /// Not carry and not zero
    pub const JA: u8 = 0x0D;
    pub const JMP: u8 = 0x0E;
    pub const JNZ: u8 = 0x0F;
    pub const JNN: u8 = 0x10;
    pub const PUSH: u8 = 0x11;
    pub const POP: u8 = 0x12;
    pub const CALL: u8 = 0x13;
    pub const RET: u8 = 0x14;
    pub const IN: u8 = 0x15;
    pub const OUT: u8 = 0x16;
    pub const SYS: u8 = 0x17;
    pub const SEI: u8 = 0x18;
    pub const SDI: u8 = 0x19;
}

/// Size of the opcode space the CPU dispatches on. Everything above is reserved.
pub const OPCODE_SPACE: usize = 0x20;

const fn desc(
    mnemonic: &'static str,
    opcode: u8,
    dest: FieldMode,
    src: FieldMode,
    width: Width,
) -> InstrDesc {
    InstrDesc {
        mnemonic,
        opcode,
        dest,
        src,
        width,
    }
}

use self::FieldMode::{
    ImmediateOnly as Imm, None as Nil, RegisterOnly as Reg, RegisterOrImmediate as Both,
};
use self::Width::{Address as A, Data as D};

/// Indexed by opcode.
pub static INSTRUCTIONS: [InstrDesc; 26] = [
    desc("HLT", opcode::HLT, Nil, Nil, D),
    desc("LDR", opcode::LDR, Reg, Both, D),
    desc("LDM", opcode::LDM, Reg, Both, A),
    desc("STI", opcode::STI, Reg, Imm, D),
    desc("STR", opcode::STR, Both, Reg, A),
    desc("ADD", opcode::ADD, Reg, Reg, D),
    desc("SUB", opcode::SUB, Reg, Reg, D),
    desc("CMP", opcode::CMP, Reg, Reg, D),
    desc("JZ", opcode::JZ, Imm, Nil, A),
    desc("JN", opcode::JN, Imm, Nil, A),
    desc("JC", opcode::JC, Imm, Nil, A),
    desc("JNC", opcode::JNC, Imm, Nil, A),
    desc("JBE", opcode::JBE, Imm, Nil, A),
    desc("JA", opcode::JA, Imm, Nil, A),
    desc("JMP", opcode::JMP, Imm, Nil, A),
    desc("JNZ", opcode::JNZ, Imm, Nil, A),
    desc("JNN", opcode::JNN, Imm, Nil, A),
    desc("PUSH", opcode::PUSH, Both, Nil, D),
    desc("POP", opcode::POP, Reg, Nil, D),
    desc("CALL", opcode::CALL, Imm, Nil, A),
    desc("RET", opcode::RET, Nil, Nil, D),
    desc("IN", opcode::IN, Reg, Both, D),
    desc("OUT", opcode::OUT, Both, Reg, D),
    desc("SYS", opcode::SYS, Nil, Nil, D),
    desc("SEI", opcode::SEI, Nil, Nil, D),
    desc("SDI", opcode::SDI, Nil, Nil, D),
];

/// Look up an instruction by its (uppercase) mnemonic.
pub fn by_mnemonic(mnemonic: &str) -> Result<&'static InstrDesc, LookupError> {
    INSTRUCTIONS
        .iter()
        .find(|desc| desc.mnemonic == mnemonic)
        .ok_or_else(|| LookupError::UnknownMnemonic(mnemonic.to_string()))
}

/// Look up an instruction by its 7 bit opcode.
pub fn by_opcode(opcode: u8) -> Result<&'static InstrDesc, LookupError> {
    INSTRUCTIONS
        .get(opcode as usize)
        .ok_or(LookupError::IllegalOpcode(opcode))
}
