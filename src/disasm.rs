use crate::error::LookupError;
use crate::isa::{self, FieldMode, Width};
use crate::symbol::Register;
use crate::word::{AddrMode, Fields, MachineWord, WORD_SIZE};

/// Render one word as assembly, e.g. `ADD R0, R1` or `JMP 0x003`.
///
/// Addresses are always printed raw, labels are not reconstructed.
pub fn disassemble(word: MachineWord) -> Result<String, LookupError> {
    let fields = word.fields();
    let desc = isa::by_opcode(fields.opcode)?;

    let operands: Vec<String> = [(desc.dest, fields.dest), (desc.src, fields.src)]
        .into_iter()
        .filter(|(mode, _)| mode.is_present())
        .map(|(mode, reg)| operand(mode, reg, &fields, desc.width))
        .collect();

    if operands.is_empty() {
        Ok(desc.mnemonic.to_string())
    } else {
        Ok(format!("{} {}", desc.mnemonic, operands.join(", ")))
    }
}

fn operand(mode: FieldMode, reg: u8, fields: &Fields, width: Width) -> String {
    let is_register = match mode {
        FieldMode::RegisterOnly => true,
        FieldMode::RegisterOrImmediate => fields.mode == AddrMode::Register,
        FieldMode::ImmediateOnly | FieldMode::None => false,
    };
    if is_register {
        return Register::from_bits(reg).name().to_string();
    }
    match width {
        Width::Data => format!("0x{:02X}", fields.data),
        Width::Address => format!("0x{:03X}", fields.addr),
    }
}

/// One line per word: `AAA : BBBBBB\tTEXT`. Words that do not decode show `???`.
///
/// A trailing partial word is padded with zeros.
pub fn listing(image: &[u8]) -> Vec<String> {
    image
        .chunks(WORD_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            let mut bytes = [0; WORD_SIZE];
            bytes[..chunk.len()].copy_from_slice(chunk);
            let word = MachineWord(bytes);
            let text = disassemble(word).unwrap_or_else(|_| "???".to_string());
            format!("{:03X} : {}\t{}", i * WORD_SIZE, word, text)
        })
        .collect()
}
