use std::str::FromStr;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::SourceSpan;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Labels longer than this are truncated, both where they are defined and where they are used.
pub const LABEL_MAX_LEN: usize = 31;

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        (value.offs(), value.len()).into()
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct SrcOffset(pub usize);

/// The four general purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
}

impl Register {
    pub const ALL: [Register; 4] = [Register::R0, Register::R1, Register::R2, Register::R3];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Registers are encoded in two bits, so every input maps to a register.
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0b11) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::R0 => "R0",
            Register::R1 => "R1",
            Register::R2 => "R2",
            Register::R3 => "R3",
        }
    }
}

impl FromStr for Register {
    type Err = ();

    /// Expects an already uppercased token.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R0" => Ok(Register::R0),
            "R1" => Ok(Register::R1),
            "R2" => Ok(Register::R2),
            "R3" => Ok(Register::R3),
            _ => Err(()),
        }
    }
}

/// Label name -> byte offset, filled during the first assembler pass.
#[derive(Debug, Default)]
pub struct LabelTable {
    map: FxMap<String, u16>,
}

impl LabelTable {
    pub fn new() -> Self {
        LabelTable {
            map: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Record a label. Returns `Err` with the earlier address if the (truncated) name exists.
    pub fn insert(&mut self, name: &str, addr: u16) -> Result<(), u16> {
        let name = truncate_label(name);
        if let Some(&prev) = self.map.get(name) {
            return Err(prev);
        }
        self.map.insert(name.to_string(), addr);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.map.get(truncate_label(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn truncate_label(name: &str) -> &str {
    match name.char_indices().nth(LABEL_MAX_LEN) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}
