use std::fmt;

use crate::disasm;
use crate::error::RuntimeError;
use crate::io::Ports;
use crate::isa::OPCODE_SPACE;
use crate::symbol::Register;
use crate::vprintln;
use crate::word::{AddrMode, Fields, MachineWord, WORD_SIZE};

/// Femto can address 4KB of memory.
pub const MEMORY_SIZE: usize = 0x1000;
/// Every address is taken modulo the memory size.
pub const ADDR_MASK: u16 = 0x0FFF;
/// The 256 byte stack region starts here, indexed by the stack pointer.
pub const STACK_BASE: u16 = 0x0F00;
/// Little endian address of the interrupt handler.
pub const IRQ_VECTOR: u16 = 0x000;
/// Little endian address of the syscall handler.
pub const SYS_VECTOR: u16 = 0x002;

/// Flags register, `XXXX INCZ`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Flags(pub u8);

impl Flags {
    pub const ZERO: u8 = 0b0001;
    pub const CARRY: u8 = 0b0010;
    pub const NEGATIVE: u8 = 0b0100;
    pub const INTERRUPT: u8 = 0b1000;

    pub fn zero(self) -> bool {
        self.0 & Self::ZERO != 0
    }
    pub fn carry(self) -> bool {
        self.0 & Self::CARRY != 0
    }
    pub fn negative(self) -> bool {
        self.0 & Self::NEGATIVE != 0
    }
    pub fn interrupt_enabled(self) -> bool {
        self.0 & Self::INTERRUPT != 0
    }

    /// Replace the condition bits from a widened ALU result. Zero, Carry and Negative are
    /// mutually exclusive, at most one of them ends up set. Interrupt enable is not part of
    /// that set and is left alone.
    pub fn set_result(&mut self, result: i32) {
        let cond = match result {
            0 => Self::ZERO,
            r if r < 0 => Self::NEGATIVE,
            r if r > 0xFF => Self::CARRY,
            _ => 0,
        };
        self.0 = (self.0 & Self::INTERRUPT) | cond;
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |set: bool, ch: char| if set { ch } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            bit(self.interrupt_enabled(), 'I'),
            bit(self.negative(), 'N'),
            bit(self.carry(), 'C'),
            bit(self.zero(), 'Z'),
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    Running,
    Halted,
    /// Halted by an illegal instruction. No further instructions execute.
    Fault(RuntimeError),
}

/// Represents complete machine state during runtime.
pub struct RunState {
    mem: Box<[u8; MEMORY_SIZE]>,
    /// Program counter, 12 bits
    pc: u16,
    /// 4x 8-bit registers
    reg: [u8; 4],
    /// Offset into the stack region
    sp: u8,
    flags: Flags,
    status: Status,
    /// Raised by the host, serviced once interrupts are enabled
    irq_pending: bool,
    ports: Ports,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        RunState {
            mem: Box::new([0; MEMORY_SIZE]),
            pc: 0,
            reg: [0; 4],
            sp: 0,
            flags: Flags::default(),
            status: Status::Running,
            irq_pending: false,
            ports: Ports::new(),
        }
    }

    /// Load an image verbatim at address 0.
    pub fn from_image(image: &[u8]) -> Result<RunState, RuntimeError> {
        if image.len() > MEMORY_SIZE {
            return Err(RuntimeError::ResourceExhausted {
                needed: image.len(),
                available: MEMORY_SIZE,
            });
        }
        let mut state = RunState::new();
        state.mem[..image.len()].copy_from_slice(image);
        Ok(state)
    }

    const OP_TABLE: [fn(&mut RunState, Fields); OPCODE_SPACE] = [
        Self::hlt,     // 0x00
        Self::ldr,     // 0x01
        Self::ldm,     // 0x02
        Self::sti,     // 0x03
        Self::str,     // 0x04
        Self::add,     // 0x05
        Self::sub,     // 0x06
        Self::cmp,     // 0x07
        Self::jz,      // 0x08
        Self::jn,      // 0x09
        Self::jc,      // 0x0A
        Self::jnc,     // 0x0B
        Self::jbe,     // 0x0C
        Self::ja,      // 0x0D
        Self::jmp,     // 0x0E
        Self::jnz,     // 0x0F
        Self::jnn,     // 0x10
        Self::push,    // 0x11
        Self::pop,     // 0x12
        Self::call,    // 0x13
        Self::ret,     // 0x14
        Self::input,   // 0x15
        Self::output,  // 0x16
        Self::sys,     // 0x17
        Self::sei,     // 0x18
        Self::sdi,     // 0x19
        Self::illegal, // 0x1A
        Self::illegal, // 0x1B
        Self::illegal, // 0x1C
        Self::illegal, // 0x1D
        Self::illegal, // 0x1E
        Self::illegal, // 0x1F
    ];

    /// Run until halted, returning the fault if there was one.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.status == Status::Running {
            self.step();
        }
        match self.status {
            Status::Fault(err) => Err(err),
            _ => Ok(()),
        }
    }

    /// Service a pending interrupt, then fetch and execute one instruction.
    pub fn step(&mut self) {
        if self.status != Status::Running {
            return;
        }
        if self.irq_pending && self.flags.interrupt_enabled() {
            self.irq_pending = false;
            vprintln!("{:03X} : interrupt", self.pc);
            self.enter_vector(IRQ_VECTOR);
        }

        let addr = self.pc;
        let word = self.fetch();
        self.execute(word);

        vprintln!(
            "{:03X} : {}  {:<14} {}  sp={:02X} r={:02X?}",
            addr,
            word,
            disasm::disassemble(word).unwrap_or_else(|_| "???".to_string()),
            self.flags,
            self.sp,
            self.reg
        );
    }

    /// Execute a word as if it had just been fetched, with the PC already past it.
    pub fn execute(&mut self, word: MachineWord) {
        let fields = word.fields();
        match Self::OP_TABLE.get(fields.opcode as usize) {
            Some(op) => op(self, fields),
            None => self.illegal(fields),
        }
    }

    fn fetch(&mut self) -> MachineWord {
        let mut bytes = [0; WORD_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.mem(self.pc.wrapping_add(i as u16));
        }
        self.pc = self.pc.wrapping_add(WORD_SIZE as u16) & ADDR_MASK;
        MachineWord(bytes)
    }

    /// Queue a hardware interrupt. Stays pending while interrupts are disabled.
    pub fn request_interrupt(&mut self) {
        self.irq_pending = true;
    }

    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Host side syscall, same as executing `SYS`.
    pub fn syscall(&mut self) {
        self.enter_vector(SYS_VECTOR);
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc & ADDR_MASK;
    }

    pub fn reg(&self, reg: Register) -> u8 {
        self.reg[reg.index() as usize]
    }

    pub fn set_reg(&mut self, reg: Register, value: u8) {
        self.reg[reg.index() as usize] = value;
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut [u8; MEMORY_SIZE] {
        &mut self.mem
    }

    pub fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    #[inline]
    fn mem(&self, addr: u16) -> u8 {
        self.mem[(addr & ADDR_MASK) as usize]
    }

    #[inline]
    fn mem_mut(&mut self, addr: u16) -> &mut u8 {
        &mut self.mem[(addr & ADDR_MASK) as usize]
    }

    #[inline]
    fn r(&mut self, bits: u8) -> &mut u8 {
        &mut self.reg[(bits & 0b11) as usize]
    }

    /// Address of the instruction being executed.
    fn fault_addr(&self) -> u16 {
        self.pc.wrapping_sub(WORD_SIZE as u16) & ADDR_MASK
    }

    fn fault(&mut self, err: RuntimeError) {
        self.status = Status::Fault(err);
    }

    fn push_byte(&mut self, val: u8) {
        let slot = STACK_BASE + self.sp as u16;
        *self.mem_mut(slot) = val;
        self.sp = self.sp.wrapping_add(1);
    }

    fn pop_byte(&mut self) -> u8 {
        self.sp = self.sp.wrapping_sub(1);
        self.mem(STACK_BASE + self.sp as u16)
    }

    /// Low byte goes first, so `RET` pops the high byte first.
    fn push_pc(&mut self) {
        let low = (self.pc & 0x00FF) as u8;
        let high = ((self.pc & 0x0F00) >> 8) as u8;
        self.push_byte(low);
        self.push_byte(high);
    }

    fn read_vector(&self, vector: u16) -> u16 {
        let low = self.mem(vector) as u16;
        let high = self.mem(vector + 1) as u16;
        ((high << 8) | low) & ADDR_MASK
    }

    fn enter_vector(&mut self, vector: u16) {
        self.push_pc();
        self.pc = self.read_vector(vector);
    }

    fn jump_if(&mut self, cond: bool, f: Fields) {
        if cond {
            self.pc = f.addr & ADDR_MASK;
        }
    }

    fn hlt(&mut self, _f: Fields) {
        self.status = Status::Halted;
    }

    fn ldr(&mut self, f: Fields) {
        let val = match f.mode {
            AddrMode::Immediate => f.data,
            AddrMode::Register => *self.r(f.src),
        };
        *self.r(f.dest) = val;
    }

    fn ldm(&mut self, f: Fields) {
        let addr = match f.mode {
            AddrMode::Immediate => f.addr,
            AddrMode::Register => *self.r(f.src) as u16,
        };
        *self.r(f.dest) = self.mem(addr);
    }

    fn sti(&mut self, f: Fields) {
        if f.mode == AddrMode::Register {
            let addr = self.fault_addr();
            self.fault(RuntimeError::IllegalAddressingMode {
                opcode: f.opcode,
                addr,
            });
            return;
        }
        let addr = *self.r(f.dest) as u16;
        *self.mem_mut(addr) = f.data;
    }

    fn str(&mut self, f: Fields) {
        let val = *self.r(f.src);
        let addr = match f.mode {
            AddrMode::Immediate => f.addr,
            AddrMode::Register => *self.r(f.dest) as u16,
        };
        *self.mem_mut(addr) = val;
    }

    fn add(&mut self, f: Fields) {
        let res = *self.r(f.dest) as i32 + *self.r(f.src) as i32;
        self.flags.set_result(res);
        *self.r(f.dest) = res as u8;
    }

    fn sub(&mut self, f: Fields) {
        let res = *self.r(f.dest) as i32 - *self.r(f.src) as i32;
        self.flags.set_result(res);
        *self.r(f.dest) = res as u8;
    }

    fn cmp(&mut self, f: Fields) {
        let res = *self.r(f.dest) as i32 - *self.r(f.src) as i32;
        self.flags.set_result(res);
    }

    fn jz(&mut self, f: Fields) {
        self.jump_if(self.flags.zero(), f);
    }

    fn jnz(&mut self, f: Fields) {
        self.jump_if(!self.flags.zero(), f);
    }

    fn jn(&mut self, f: Fields) {
        self.jump_if(self.flags.negative(), f);
    }

    fn jnn(&mut self, f: Fields) {
        self.jump_if(!self.flags.negative(), f);
    }

    fn jc(&mut self, f: Fields) {
        self.jump_if(self.flags.carry(), f);
    }

    fn jnc(&mut self, f: Fields) {
        self.jump_if(!self.flags.carry(), f);
    }

    fn jbe(&mut self, f: Fields) {
        self.jump_if(self.flags.carry() || self.flags.zero(), f);
    }

    fn ja(&mut self, f: Fields) {
        self.jump_if(!self.flags.carry() && !self.flags.zero(), f);
    }

    fn jmp(&mut self, f: Fields) {
        self.jump_if(true, f);
    }

    fn push(&mut self, f: Fields) {
        let val = match f.mode {
            AddrMode::Immediate => f.data,
            AddrMode::Register => *self.r(f.dest),
        };
        self.push_byte(val);
    }

    fn pop(&mut self, f: Fields) {
        let val = self.pop_byte();
        *self.r(f.dest) = val;
    }

    fn call(&mut self, f: Fields) {
        self.push_pc();
        self.pc = f.addr & ADDR_MASK;
    }

    fn ret(&mut self, _f: Fields) {
        let high = self.pop_byte() as u16;
        let low = self.pop_byte() as u16;
        self.pc = ((high << 8) | low) & ADDR_MASK;
    }

    fn input(&mut self, f: Fields) {
        let port = match f.mode {
            AddrMode::Immediate => f.data,
            AddrMode::Register => *self.r(f.src),
        };
        let val = self.ports.read(port);
        *self.r(f.dest) = val;
    }

    fn output(&mut self, f: Fields) {
        let port = match f.mode {
            AddrMode::Immediate => f.data,
            AddrMode::Register => *self.r(f.dest),
        };
        let val = *self.r(f.src);
        self.ports.write(port, val);
    }

    fn sys(&mut self, _f: Fields) {
        self.syscall();
    }

    fn sei(&mut self, _f: Fields) {
        self.flags.0 |= Flags::INTERRUPT;
    }

    fn sdi(&mut self, _f: Fields) {
        self.flags.0 &= !Flags::INTERRUPT;
    }

    fn illegal(&mut self, f: Fields) {
        let addr = self.fault_addr();
        self.fault(RuntimeError::IllegalOpcode {
            opcode: f.opcode,
            addr,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::isa::opcode;
    use crate::symbol::Register::*;
    use crate::word::encode;

    fn imm(op: u8, dest: Register, src: Register, operand: u16) -> MachineWord {
        encode(op, AddrMode::Immediate, dest.index(), src.index(), operand)
    }

    fn reg(op: u8, dest: Register, src: Register) -> MachineWord {
        encode(op, AddrMode::Register, dest.index(), src.index(), 0)
    }

    fn with_flags(bits: u8) -> RunState {
        let mut state = RunState::new();
        state.set_flags(Flags(bits));
        state
    }

    #[test]
    fn hlt() {
        let mut state = RunState::new();
        state.execute(MachineWord([0, 0, 0]));
        assert_eq!(state.status(), Status::Halted);
    }

    #[test]
    fn ldr() {
        let mut state = RunState::new();
        state.execute(imm(opcode::LDR, R2, R0, 0xFF));
        assert_eq!(state.reg(R2), 0xFF);

        state.set_reg(R1, 0xAA);
        state.execute(reg(opcode::LDR, R2, R1));
        assert_eq!(state.reg(R2), 0xAA);
        assert_eq!(state.flags(), Flags(0));
    }

    #[test]
    fn ldm() {
        let mut state = RunState::new();
        state.memory_mut()[0x0AB] = 0xBA;
        state.execute(imm(opcode::LDM, R3, R0, 0x0AB));
        assert_eq!(state.reg(R3), 0xBA);

        state.set_reg(R3, 0);
        state.set_reg(R1, 0xAB);
        state.execute(reg(opcode::LDM, R3, R1));
        assert_eq!(state.reg(R3), 0xBA);
    }

    #[test]
    fn sti() {
        let mut state = RunState::new();
        state.set_reg(R1, 0x40);
        state.execute(imm(opcode::STI, R1, R0, 0xFB));
        assert_eq!(state.memory()[0x40], 0xFB);
        assert!(state.is_running());
    }

    #[test]
    fn sti_register_mode_faults() {
        let mut state = RunState::new();
        state.set_pc(0x00C);
        state.execute(reg(opcode::STI, R1, R0));
        assert_eq!(
            state.status(),
            Status::Fault(RuntimeError::IllegalAddressingMode {
                opcode: opcode::STI,
                addr: 0x009
            })
        );
    }

    #[test]
    fn str() {
        let mut state = RunState::new();
        state.set_reg(R2, 0xAD);
        state.execute(imm(opcode::STR, R0, R2, 0x123));
        assert_eq!(state.memory()[0x123], 0xAD);

        state.set_reg(R0, 0x77);
        state.execute(reg(opcode::STR, R0, R2));
        assert_eq!(state.memory()[0x077], 0xAD);
    }

    #[test]
    fn add() {
        let mut state = RunState::new();
        state.set_reg(R0, 20);
        state.set_reg(R1, 71);
        state.execute(reg(opcode::ADD, R0, R1));
        assert_eq!(state.reg(R0), 91);
        assert_eq!(state.reg(R1), 71);
        assert_eq!(state.flags(), Flags(0));

        state.set_reg(R0, 255);
        state.set_reg(R1, 2);
        state.execute(reg(opcode::ADD, R0, R1));
        assert_eq!(state.reg(R0), 1);
        assert_eq!(state.flags(), Flags(Flags::CARRY));
    }

    #[test]
    fn sub() {
        let mut state = RunState::new();
        state.set_reg(R0, 89);
        state.set_reg(R1, 17);
        state.execute(reg(opcode::SUB, R0, R1));
        assert_eq!(state.reg(R0), 89 - 17);
        assert_eq!(state.flags(), Flags(0));

        state.set_reg(R0, 58);
        state.set_reg(R1, 192);
        state.execute(reg(opcode::SUB, R0, R1));
        assert!(state.flags().negative());
        assert_eq!(state.reg(R0), (58i32 - 192) as u8);
    }

    #[test]
    fn cmp() {
        let mut state = RunState::new();
        state.set_reg(R2, 77);
        state.set_reg(R3, 77);
        state.execute(reg(opcode::CMP, R2, R3));
        assert_eq!(state.flags(), Flags(Flags::ZERO));
        assert_eq!(state.reg(R2), 77);
        assert_eq!(state.reg(R3), 77);

        state.set_reg(R3, 78);
        state.execute(reg(opcode::CMP, R2, R3));
        assert_eq!(state.flags(), Flags(Flags::NEGATIVE));
    }

    #[test]
    fn flags_keep_interrupt_enable() {
        let mut flags = Flags(Flags::INTERRUPT | Flags::CARRY);
        flags.set_result(0);
        assert_eq!(flags, Flags(Flags::INTERRUPT | Flags::ZERO));
        flags.set_result(0x42);
        assert_eq!(flags, Flags(Flags::INTERRUPT));
        assert_eq!(flags.to_string(), "I---");
    }

    #[test]
    fn jmp() {
        let mut state = RunState::new();
        state.execute(imm(opcode::JMP, R0, R0, 0xCAD));
        assert_eq!(state.pc(), 0xCAD);
    }

    #[test]
    fn single_flag_jumps() {
        let cases = [
            (opcode::JZ, Flags::ZERO, true),
            (opcode::JNZ, Flags::ZERO, false),
            (opcode::JC, Flags::CARRY, true),
            (opcode::JNC, Flags::CARRY, false),
            (opcode::JN, Flags::NEGATIVE, true),
            (opcode::JNN, Flags::NEGATIVE, false),
        ];
        for (op, flag, taken_when_set) in cases {
            for set in [false, true] {
                let mut state = with_flags(if set { flag } else { 0 });
                state.execute(imm(op, R0, R0, 0xF4A));
                let expected = if set == taken_when_set { 0xF4A } else { 0 };
                assert_eq!(state.pc(), expected, "opcode {op:#04X}, flag set: {set}");
            }
        }
    }

    #[test]
    fn jbe_and_ja() {
        let cases = [
            (0, false),
            (Flags::CARRY, true),
            (Flags::ZERO, true),
            (Flags::CARRY | Flags::ZERO, true),
        ];
        for (bits, below_or_equal) in cases {
            let mut state = with_flags(bits);
            state.execute(imm(opcode::JBE, R0, R0, 0xF4A));
            assert_eq!(state.pc() == 0xF4A, below_or_equal, "JBE with {}", Flags(bits));

            let mut state = with_flags(bits);
            state.execute(imm(opcode::JA, R0, R0, 0xF4A));
            assert_eq!(state.pc() == 0xF4A, !below_or_equal, "JA with {}", Flags(bits));
        }
    }

    #[test]
    fn push_pop() {
        let mut state = RunState::new();
        state.execute(imm(opcode::PUSH, R0, R0, 0xEA));
        assert_eq!(state.sp(), 1);
        assert_eq!(state.memory()[STACK_BASE as usize], 0xEA);

        state.set_reg(R1, 0x74);
        state.execute(reg(opcode::PUSH, R1, R0));
        assert_eq!(state.memory()[STACK_BASE as usize + 1], 0x74);

        state.execute(imm(opcode::POP, R3, R0, 0));
        assert_eq!(state.reg(R3), 0x74);
        state.execute(imm(opcode::POP, R3, R0, 0));
        assert_eq!(state.reg(R3), 0xEA);
        assert_eq!(state.sp(), 0);
    }

    #[test]
    fn stack_pointer_wraps() {
        let mut state = RunState::new();
        state.execute(imm(opcode::POP, R0, R0, 0));
        assert_eq!(state.sp(), 0xFF);
        state.execute(imm(opcode::PUSH, R0, R0, 0x9E));
        assert_eq!(state.sp(), 0);
        assert_eq!(state.memory()[0xFFF], 0x9E);
    }

    #[test]
    fn call_ret() {
        let mut state = RunState::new();
        state.set_pc(0x379);
        state.execute(imm(opcode::CALL, R0, R0, 0x666));
        assert_eq!(state.pc(), 0x666);
        assert_eq!(state.memory()[STACK_BASE as usize], 0x79);
        assert_eq!(state.memory()[STACK_BASE as usize + 1], 0x03);

        state.execute(imm(opcode::RET, R0, R0, 0));
        assert_eq!(state.pc(), 0x379);
        assert_eq!(state.sp(), 0);
    }

    #[test]
    fn input() {
        let mut state = RunState::new();
        state.ports_mut().register_input(0x10, || 0x91).unwrap();
        state.execute(imm(opcode::IN, R1, R0, 0x10));
        assert_eq!(state.reg(R1), 0x91);

        state.set_reg(R1, 0);
        state.set_reg(R2, 0x10);
        state.execute(reg(opcode::IN, R1, R2));
        assert_eq!(state.reg(R1), 0x91);

        state.execute(imm(opcode::IN, R3, R0, 0x11));
        assert_eq!(state.reg(R3), 0xFF);
    }

    #[test]
    fn output() {
        let mut state = RunState::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        state
            .ports_mut()
            .register_output(0x20, move |v| sink.borrow_mut().push(v))
            .unwrap();

        state.set_reg(R1, 0xAF);
        state.execute(imm(opcode::OUT, R0, R1, 0x20));

        state.set_reg(R2, 0x20);
        state.set_reg(R3, 0x5C);
        state.execute(reg(opcode::OUT, R2, R3));

        assert_eq!(*seen.borrow(), vec![0xAF, 0x5C]);
    }

    #[test]
    fn sys() {
        let mut state = RunState::new();
        state.memory_mut()[0x02] = 0xFF;
        state.memory_mut()[0x03] = 0x01;
        state.set_pc(0x123);
        state.execute(imm(opcode::SYS, R0, R0, 0));
        assert_eq!(state.pc(), 0x1FF);

        state.execute(imm(opcode::RET, R0, R0, 0));
        assert_eq!(state.pc(), 0x123);
    }

    #[test]
    fn sei_sdi() {
        let mut state = RunState::new();
        state.execute(imm(opcode::SEI, R0, R0, 0));
        assert!(state.flags().interrupt_enabled());
        state.execute(imm(opcode::SDI, R0, R0, 0));
        assert!(!state.flags().interrupt_enabled());
    }

    #[test]
    fn interrupt_waits_for_enable() {
        // 0x000: vector -> 0x030, then SDI, SEI, HLT
        let mut image = vec![0x30, 0x00, 0x00];
        image.extend(imm(opcode::SDI, R0, R0, 0).bytes());
        image.extend(imm(opcode::SEI, R0, R0, 0).bytes());
        image.extend(imm(opcode::HLT, R0, R0, 0).bytes());
        let mut state = RunState::from_image(&image).unwrap();
        state.set_pc(0x003);

        state.request_interrupt();
        state.step();
        assert_eq!(state.pc(), 0x006);
        assert!(state.irq_pending());

        state.step();
        assert_eq!(state.pc(), 0x009);
        assert!(state.flags().interrupt_enabled());

        // Serviced before the HLT at 0x009 is fetched; 0x030 is zeroed memory, so HLT
        state.step();
        assert!(!state.irq_pending());
        assert_eq!(state.pc(), 0x033);
        assert_eq!(state.status(), Status::Halted);
        assert_eq!(state.memory()[STACK_BASE as usize], 0x09);
        assert_eq!(state.memory()[STACK_BASE as usize + 1], 0x00);
    }

    #[test]
    fn illegal_opcode_faults() {
        let mut image = imm(opcode::LDR, R0, R0, 1).bytes().to_vec();
        image.extend([0x7F, 0x00, 0x00]);
        let mut state = RunState::from_image(&image).unwrap();
        assert_eq!(
            state.run(),
            Err(RuntimeError::IllegalOpcode {
                opcode: 0x7F,
                addr: 0x003
            })
        );
        assert_eq!(state.reg(R0), 1);
        assert!(!state.is_running());
        let pc = state.pc();
        state.step();
        assert_eq!(state.pc(), pc);

        let mut state = RunState::from_image(&[0x1A, 0, 0]).unwrap();
        assert!(matches!(
            state.run(),
            Err(RuntimeError::IllegalOpcode { opcode: 0x1A, .. })
        ));
    }

    #[test]
    fn pc_wraps() {
        let mut state = RunState::new();
        // JMP 0xFFF
        state.memory_mut()[..3].copy_from_slice(&imm(opcode::JMP, R0, R0, 0xFFF).bytes());
        state.step();
        assert_eq!(state.pc(), 0xFFF);
        // Word at 0xFFF, 0x000, 0x001
        state.memory_mut()[0xFFF] = opcode::LDR;
        state.step();
        assert_eq!(state.pc(), 0x002);
        assert_eq!(state.reg(R0), imm(opcode::JMP, R0, R0, 0xFFF).bytes()[1]);
    }

    #[test]
    fn image_too_large() {
        let image = vec![0; MEMORY_SIZE + 1];
        assert!(matches!(
            RunState::from_image(&image),
            Err(RuntimeError::ResourceExhausted { needed, .. }) if needed == MEMORY_SIZE + 1
        ));
        assert!(RunState::from_image(&[0; MEMORY_SIZE]).is_ok());
    }
}
