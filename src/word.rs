//! Packing and unpacking of the 3 byte instruction word.

use std::fmt;

/// Bytes per instruction.
pub const WORD_SIZE: usize = 3;

/// Selects the operand kind of a `RegisterOrImmediate` field. Stored in the top bit of byte 0.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum AddrMode {
    #[default]
    Immediate = 0,
    Register = 1,
}

impl AddrMode {
    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            AddrMode::Immediate
        } else {
            AddrMode::Register
        }
    }
}

/// One encoded instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MachineWord(pub [u8; WORD_SIZE]);

/// Every field of a word. `data` and `addr` overlap, the instruction decides which one is meant.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Fields {
    pub opcode: u8,
    pub mode: AddrMode,
    pub dest: u8,
    pub src: u8,
    pub data: u8,
    pub addr: u16,
}

/// Pack fields into a word.
///
/// `operand` is either an 8 bit datum or a 12 bit address. Its bits above 0xFFF are dropped,
/// so a datum leaves the address nibble of byte 1 clear.
pub fn encode(opcode: u8, mode: AddrMode, dest: u8, src: u8, operand: u16) -> MachineWord {
    let b0 = ((mode as u8) << 7) | (opcode & 0x7F);
    let b1 = ((dest & 0b11) << 6) | ((src & 0b11) << 4) | ((operand >> 8) as u8 & 0x0F);
    let b2 = (operand & 0xFF) as u8;
    MachineWord([b0, b1, b2])
}

pub fn decode(word: MachineWord) -> Fields {
    let [b0, b1, b2] = word.0;
    Fields {
        opcode: b0 & 0x7F,
        mode: AddrMode::from_bit(b0 >> 7),
        dest: (b1 >> 6) & 0b11,
        src: (b1 >> 4) & 0b11,
        data: b2,
        addr: (((b1 & 0x0F) as u16) << 8) | b2 as u16,
    }
}

impl MachineWord {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; WORD_SIZE] = bytes.try_into().ok()?;
        Some(MachineWord(bytes))
    }

    pub fn bytes(&self) -> [u8; WORD_SIZE] {
        self.0
    }

    pub fn fields(self) -> Fields {
        decode(self)
    }
}

impl From<Fields> for MachineWord {
    fn from(f: Fields) -> Self {
        encode(f.opcode, f.mode, f.dest, f.src, f.addr)
    }
}

impl fmt::Display for MachineWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{self, opcode, FieldMode};

    #[test]
    fn byte0_bits() {
        for b0 in 0..=255u8 {
            let fields = decode(MachineWord([b0, 0, 0]));
            assert_eq!(fields.opcode, b0 & 0x7F);
            assert_eq!(fields.mode as u8, b0 >> 7);
        }
    }

    #[test]
    fn layout() {
        let word = encode(opcode::LDR, AddrMode::Immediate, 0, 0, 5);
        assert_eq!(word.bytes(), [0x01, 0x00, 0x05]);

        let word = encode(opcode::ADD, AddrMode::Immediate, 0, 1, 0);
        assert_eq!(word.bytes(), [0x05, 0x10, 0x00]);

        let word = encode(opcode::STR, AddrMode::Register, 3, 2, 0xABC);
        assert_eq!(word.bytes(), [0x84, 0xEA, 0xBC]);
        assert_eq!(word.to_string(), "84EABC");
    }

    #[test]
    fn address_shares_data_byte() {
        let fields = decode(MachineWord([opcode::JMP, 0x07, 0x42]));
        assert_eq!(fields.addr, 0x742);
        assert_eq!(fields.data, 0x42);
        assert_eq!(fields.dest, 0);
        assert_eq!(fields.src, 0);
    }

    #[test]
    fn roundtrip_fieldless() {
        for desc in isa::INSTRUCTIONS.iter() {
            if desc.dest != FieldMode::None || desc.src != FieldMode::None {
                continue;
            }
            let fields = Fields {
                opcode: desc.opcode,
                ..Default::default()
            };
            assert_eq!(decode(MachineWord::from(fields)), fields);
        }
    }

    #[test]
    fn from_slice_wants_three_bytes() {
        assert_eq!(
            MachineWord::from_slice(&[1, 2, 3]),
            Some(MachineWord([1, 2, 3]))
        );
        assert_eq!(MachineWord::from_slice(&[1, 2]), None);
    }
}
