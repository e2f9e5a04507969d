//! Two pass assembler.
//!
//! Source is lexed once into [`Line`]s. The first pass records label offsets, the second
//! resolves operands and emits one [`MachineWord`](crate::word::MachineWord) per
//! instruction. Both passes size a line with [`Line::size`].

use std::str::FromStr;

use crate::error::{AsmError, AsmErrorKind};
use crate::isa::{self, FieldMode, InstrDesc, Width};
use crate::runtime::MEMORY_SIZE;
use crate::symbol::{LabelTable, Register, Span, SrcOffset};
use crate::word::{encode, AddrMode, WORD_SIZE};

use self::lexer::TokenKind;

pub mod lexer;

/// Case normalised token, with its location in the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub span: Span,
}

/// The words of one source line, comments removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Counting from 1
    pub number: usize,
    /// Name without the trailing `:`
    pub label: Option<Word>,
    pub mnemonic: Option<Word>,
    pub operands: Vec<Word>,
}

impl Line {
    fn new(number: usize, words: Vec<Word>) -> Self {
        let mut words = words.into_iter();
        let mut line = Line {
            number,
            label: None,
            mnemonic: None,
            operands: Vec::new(),
        };
        let mut next = words.next();
        if let Some(word) = &next {
            if let Some(name) = word.text.strip_suffix(':') {
                line.label = Some(Word {
                    text: name.to_string(),
                    span: word.span,
                });
                next = words.next();
            }
        }
        line.mnemonic = next;
        line.operands = words.collect();
        line
    }

    /// Bytes this line adds to the image.
    pub fn size(&self) -> usize {
        if self.mnemonic.is_some() {
            WORD_SIZE
        } else {
            0
        }
    }
}

/// Split source into lines of uppercased words.
pub fn lex(src: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut words = Vec::new();
    let mut offs = 0;
    for token in lexer::tokenize(src) {
        let len = token.len as usize;
        match token.kind {
            TokenKind::Word => words.push(Word {
                text: src[offs..offs + len].to_ascii_uppercase(),
                span: Span::new(SrcOffset(offs), len),
            }),
            TokenKind::Newline => {
                lines.push(Line::new(lines.len() + 1, std::mem::take(&mut words)));
            }
            TokenKind::Comment | TokenKind::Whitespace | TokenKind::Eof => {}
        }
        offs += len;
    }
    if !words.is_empty() {
        lines.push(Line::new(lines.len() + 1, words));
    }
    lines
}

pub struct Assembler {
    lines: Vec<Line>,
    labels: LabelTable,
}

impl Assembler {
    pub fn new(src: &str) -> Self {
        Assembler {
            lines: lex(src),
            labels: LabelTable::new(),
        }
    }

    /// Run both passes. Nothing is emitted unless every line assembles.
    pub fn assemble(&mut self) -> Result<Vec<u8>, AsmError> {
        self.labels = LabelTable::new();
        self.collect_labels()?;
        let mut image = Vec::with_capacity(self.lines.iter().map(Line::size).sum());
        for line in &self.lines {
            if let Some(bytes) = self.emit_line(line)? {
                image.extend(bytes);
            }
        }
        Ok(image)
    }

    /// Labels found by the first pass.
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn collect_labels(&mut self) -> Result<(), AsmError> {
        let mut offset = 0usize;
        for line in &self.lines {
            if let Some(mnemonic) = &line.mnemonic {
                if offset + line.size() > MEMORY_SIZE {
                    return Err(AsmError::new(
                        AsmErrorKind::ProgramTooLarge {
                            needed: offset + line.size(),
                            available: MEMORY_SIZE,
                        },
                        line.number,
                        mnemonic.span,
                    ));
                }
            }
            if let Some(label) = &line.label {
                // Bounded by the check above
                let addr = offset as u16;
                if let Err(first_addr) = self.labels.insert(&label.text, addr) {
                    return Err(AsmError::new(
                        AsmErrorKind::DuplicateLabel {
                            name: label.text.clone(),
                            first_addr,
                        },
                        line.number,
                        label.span,
                    ));
                }
            }
            offset += line.size();
        }
        Ok(())
    }

    fn emit_line(&self, line: &Line) -> Result<Option<[u8; WORD_SIZE]>, AsmError> {
        let Some(mnemonic) = &line.mnemonic else {
            return Ok(None);
        };
        let err = |kind, span| AsmError::new(kind, line.number, span);

        let desc = isa::by_mnemonic(&mnemonic.text).map_err(|_| {
            err(
                AsmErrorKind::UnknownMnemonic {
                    mnemonic: mnemonic.text.clone(),
                },
                mnemonic.span,
            )
        })?;

        let mut operands = line.operands.iter();
        let mut instr = Operands::default();
        let mut last_span = mnemonic.span;
        for (field, slot) in [(desc.dest, Slot::Dest), (desc.src, Slot::Src)] {
            if !field.is_present() {
                continue;
            }
            let Some(word) = operands.next() else {
                return Err(err(
                    AsmErrorKind::MissingOperand {
                        mnemonic: desc.mnemonic,
                    },
                    last_span,
                ));
            };
            last_span = word.span;
            self.resolve_field(desc, field, slot, word, &mut instr)
                .map_err(|kind| err(kind, word.span))?;
        }

        if let Some(extra) = operands.next() {
            return Err(err(
                AsmErrorKind::TooManyInstructionsOnLine {
                    token: extra.text.clone(),
                },
                extra.span,
            ));
        }

        let word = encode(desc.opcode, instr.mode, instr.dest, instr.src, instr.operand);
        Ok(Some(word.bytes()))
    }

    fn resolve_field(
        &self,
        desc: &InstrDesc,
        field: FieldMode,
        slot: Slot,
        word: &Word,
        instr: &mut Operands,
    ) -> Result<(), AsmErrorKind> {
        let reg = Register::from_str(&word.text).ok();
        match (field, reg) {
            (FieldMode::RegisterOnly, Some(reg)) => instr.set_reg(slot, reg),
            (FieldMode::RegisterOnly, None) => {
                return Err(AsmErrorKind::IllegalAddressingMode {
                    token: word.text.clone(),
                    expected: "a register",
                })
            }
            (FieldMode::ImmediateOnly, Some(_)) => {
                return Err(AsmErrorKind::IllegalAddressingMode {
                    token: word.text.clone(),
                    expected: "an immediate value",
                })
            }
            (FieldMode::RegisterOrImmediate, Some(reg)) => {
                instr.set_reg(slot, reg);
                instr.mode = AddrMode::Register;
            }
            (FieldMode::ImmediateOnly | FieldMode::RegisterOrImmediate, None) => {
                instr.operand = self.immediate(&word.text, desc.width)?;
            }
            (FieldMode::None, _) => unreachable!("absent fields are skipped"),
        }
        Ok(())
    }

    /// Address fields accept labels, which win over a numeric reading of the same token.
    fn immediate(&self, token: &str, width: Width) -> Result<u16, AsmErrorKind> {
        let value = match width {
            Width::Address => match self.labels.get(token) {
                Some(addr) => addr as i64,
                None => parse_literal(token).ok_or_else(|| AsmErrorKind::UndefinedLabel {
                    name: token.to_string(),
                })?,
            },
            Width::Data => parse_literal(token).ok_or_else(|| AsmErrorKind::InvalidLiteral {
                token: token.to_string(),
            })?,
        };
        if value < 0 || value > width.max() as i64 {
            return Err(AsmErrorKind::OperandOverflow {
                token: token.to_string(),
                max: width.max(),
            });
        }
        Ok(value as u16)
    }
}

/// Assemble source text into an image.
pub fn assemble(src: &str) -> Result<Vec<u8>, AsmError> {
    Assembler::new(src).assemble()
}

#[derive(Clone, Copy)]
enum Slot {
    Dest,
    Src,
}

#[derive(Default)]
struct Operands {
    mode: AddrMode,
    dest: u8,
    src: u8,
    operand: u16,
}

impl Operands {
    fn set_reg(&mut self, slot: Slot, reg: Register) {
        match slot {
            Slot::Dest => self.dest = reg.index(),
            Slot::Src => self.src = reg.index(),
        }
    }
}

/// Parse an integer with an optional sign. `0X` selects hex, a leading `0` octal.
/// Values too large for `i64` saturate so they are reported as overflowing.
pub fn parse_literal(token: &str) -> Option<i64> {
    let (negative, rest) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    let (radix, digits) = if let Some(hex) = rest
        .strip_prefix("0X")
        .or_else(|| rest.strip_prefix("0x"))
    {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
