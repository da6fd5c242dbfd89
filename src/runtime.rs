use std::{cmp::Ordering, fmt};

use crate::console::Console;
use crate::tprintln;
use crate::DEFAULT_ENTRY;

/// LC3 can address 128KB of memory.
pub const MEMORY_MAX: usize = 0x10000;
/// Keyboard status register. Top bit is set while a key is latched.
pub const MR_KBSR: u16 = 0xFE00;
/// Keyboard data register. Holds the last latched key.
pub const MR_KBDR: u16 = 0xFE02;
/// Instructions executed between calls to [`Console::tick`].
pub const TICK_INTERVAL: u32 = 0x1000;

/// Represents complete machine state during runtime.
pub struct RunState {
    /// System memory - 128KB in size.
    mem: Box<[u16; MEMORY_MAX]>,
    /// Program counter
    pc: u16,
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Condition code
    flag: RunFlag,
    /// Cleared by the `HALT` trap
    running: bool,
    /// Log every executed instruction
    trace: bool,
}

/// Condition code, laid out to match the `nzp` bits of `BR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunFlag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

impl RunFlag {
    /// Flag describing the sign of `val` as a two's complement word.
    pub fn from_value(val: u16) -> Self {
        match (val as i16).cmp(&0) {
            Ordering::Less => RunFlag::N,
            Ordering::Equal => RunFlag::Z,
            Ordering::Greater => RunFlag::P,
        }
    }
}

/// Top nibble of an instruction word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    const ALL: [Opcode; 16] = [
        Opcode::Br,
        Opcode::Add,
        Opcode::Ld,
        Opcode::St,
        Opcode::Jsr,
        Opcode::And,
        Opcode::Ldr,
        Opcode::Str,
        Opcode::Rti,
        Opcode::Not,
        Opcode::Ldi,
        Opcode::Sti,
        Opcode::Jmp,
        Opcode::Res,
        Opcode::Lea,
        Opcode::Trap,
    ];

    pub fn from_instr(instr: u16) -> Self {
        Self::ALL[(instr >> 12) as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Br => "BR",
            Opcode::Add => "ADD",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Jsr => "JSR",
            Opcode::And => "AND",
            Opcode::Ldr => "LDR",
            Opcode::Str => "STR",
            Opcode::Rti => "RTI",
            Opcode::Not => "NOT",
            Opcode::Ldi => "LDI",
            Opcode::Sti => "STI",
            Opcode::Jmp => "JMP",
            Opcode::Res => "RES",
            Opcode::Lea => "LEA",
            Opcode::Trap => "TRAP",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Sign-extend the lowest `bits` bits of `val` to a full word.
///
/// Bits above the field are ignored, so whole instructions can be passed in.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    // Sign bit
    let sign = val & (1u16 << (bits - 1));
    // Bits lower than sign bit
    let magnitude = val & ((1u16 << bits) - 1);
    // Positive input: all bits unset; 0x0000
    // Negative input: sign bit and above will be set, lower bits will be reset
    //      Eg. bits=14 -> 0xE000
    let sign_extension = (!sign).wrapping_add(1); // sign * -1
    magnitude | sign_extension
}

type Handler = fn(&mut RunState, &mut dyn Console, u16);

impl RunState {
    /// Zeroed machine, ready to execute from `0x3000`.
    pub fn new() -> RunState {
        RunState {
            mem: Box::new([0; MEMORY_MAX]),
            pc: DEFAULT_ENTRY,
            reg: [0; 8],
            flag: RunFlag::Z,
            running: false,
            trace: false,
        }
    }

    const OP_TABLE: [Handler; 16] = [
        Self::br,   // 0x0
        Self::add,  // 0x1
        Self::ld,   // 0x2
        Self::st,   // 0x3
        Self::jsr,  // 0x4
        Self::and,  // 0x5
        Self::ldr,  // 0x6
        Self::str,  // 0x7
        Self::rti,  // 0x8
        Self::not,  // 0x9
        Self::ldi,  // 0xA
        Self::sti,  // 0xB
        Self::jmp,  // 0xC
        Self::res,  // 0xD
        Self::lea,  // 0xE
        Self::trap, // 0xF
    ];

    /// Run with preset memory until a `HALT` trap.
    ///
    /// Never returns if the program never halts.
    pub fn run(&mut self, io: &mut dyn Console) {
        self.running = true;
        let mut steps: u32 = 0;
        while self.running {
            self.step(io);
            steps = steps.wrapping_add(1);
            if steps % TICK_INTERVAL == 0 {
                io.tick();
            }
        }
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self, io: &mut dyn Console) {
        let addr = self.pc;
        let instr = self.read_mem(io, addr);
        // PC incremented before instruction is performed
        self.pc = self.pc.wrapping_add(1);
        let opcode = Opcode::from_instr(instr);
        if self.trace {
            tprintln!("{:#06x}  {:#06x}  {}", addr, instr, opcode);
        }
        Self::OP_TABLE[opcode as usize](self, io, instr);
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn reg(&self, reg: u16) -> u16 {
        self.reg[(reg & 0b111) as usize]
    }

    /// Does not touch the condition code.
    pub fn set_reg(&mut self, reg: u16, val: u16) {
        *self.reg_mut(reg) = val;
    }

    pub fn flag(&self) -> RunFlag {
        self.flag
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Peek at memory without triggering device registers.
    pub fn mem(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    /// Read memory as the running program sees it.
    ///
    /// Reading the keyboard status register polls `io` and latches a pending key.
    pub fn read_mem(&mut self, io: &mut dyn Console, addr: u16) -> u16 {
        if addr == MR_KBSR {
            match io.poll_byte() {
                Some(byte) => {
                    self.mem[MR_KBSR as usize] = 1 << 15;
                    self.mem[MR_KBDR as usize] = byte as u16;
                }
                None => self.mem[MR_KBSR as usize] = 0,
            }
        }
        self.mem[addr as usize]
    }

    pub fn write_mem(&mut self, addr: u16, val: u16) {
        self.mem[addr as usize] = val;
    }

    pub(crate) fn mem_slice_mut(&mut self) -> &mut [u16; MEMORY_MAX] {
        &mut self.mem
    }

    pub(crate) fn halt(&mut self) {
        self.running = false;
    }

    #[inline]
    fn reg_mut(&mut self, reg: u16) -> &mut u16 {
        &mut self.reg[(reg & 0b111) as usize]
    }

    /// Write `val` to `dr` and derive the condition code from it.
    #[inline]
    pub(crate) fn set_reg_flags(&mut self, dr: u16, val: u16) {
        *self.reg_mut(dr) = val;
        self.flag = RunFlag::from_value(val);
    }

    fn add(&mut self, _io: &mut dyn Console, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let sr = (instr >> 6) & 0b111;

        let val1 = self.reg(sr);
        let val2 = self.operand2(instr);
        self.set_reg_flags(dr, val1.wrapping_add(val2));
    }

    fn and(&mut self, _io: &mut dyn Console, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let sr = (instr >> 6) & 0b111;

        let val1 = self.reg(sr);
        let val2 = self.operand2(instr);
        self.set_reg_flags(dr, val1 & val2);
    }

    /// Second operand of `ADD`/`AND`.
    #[inline]
    fn operand2(&self, instr: u16) -> u16 {
        if instr & 0b100000 == 0 {
            // reg
            self.reg(instr & 0b111)
        } else {
            // imm
            sign_extend(instr, 5)
        }
    }

    fn br(&mut self, _io: &mut dyn Console, instr: u16) {
        let flag = (instr >> 9) & 0b111;
        if self.flag as u16 & flag != 0 {
            self.pc = self.pc.wrapping_add(sign_extend(instr, 9))
        }
    }

    fn jmp(&mut self, _io: &mut dyn Console, instr: u16) {
        let br = (instr >> 6) & 0b111;
        self.pc = self.reg(br)
    }

    fn jsr(&mut self, _io: &mut dyn Console, instr: u16) {
        *self.reg_mut(7) = self.pc;
        if instr & 0x800 == 0 {
            // reg, read after R7 is written
            let br = (instr >> 6) & 0b111;
            self.pc = self.reg(br)
        } else {
            // offs
            self.pc = self.pc.wrapping_add(sign_extend(instr, 11))
        }
    }

    fn ld(&mut self, io: &mut dyn Console, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let val = self.read_mem(io, self.pc.wrapping_add(sign_extend(instr, 9)));
        self.set_reg_flags(dr, val);
    }

    fn ldi(&mut self, io: &mut dyn Console, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let ptr = self.read_mem(io, self.pc.wrapping_add(sign_extend(instr, 9)));
        let val = self.read_mem(io, ptr);
        self.set_reg_flags(dr, val);
    }

    fn ldr(&mut self, io: &mut dyn Console, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let br = (instr >> 6) & 0b111;
        let ptr = self.reg(br).wrapping_add(sign_extend(instr, 6));
        let val = self.read_mem(io, ptr);
        self.set_reg_flags(dr, val);
    }

    fn lea(&mut self, _io: &mut dyn Console, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let val = self.pc.wrapping_add(sign_extend(instr, 9));
        self.set_reg_flags(dr, val);
    }

    fn not(&mut self, _io: &mut dyn Console, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let sr = (instr >> 6) & 0b111;
        let val = !self.reg(sr);
        self.set_reg_flags(dr, val);
    }

    /// No supervisor mode, so there is nothing to return to.
    fn rti(&mut self, _io: &mut dyn Console, _instr: u16) {}

    fn res(&mut self, _io: &mut dyn Console, _instr: u16) {}

    fn st(&mut self, _io: &mut dyn Console, instr: u16) {
        let sr = (instr >> 9) & 0b111;
        let val = self.reg(sr);
        self.write_mem(self.pc.wrapping_add(sign_extend(instr, 9)), val);
    }

    fn sti(&mut self, io: &mut dyn Console, instr: u16) {
        let sr = (instr >> 9) & 0b111;
        let val = self.reg(sr);
        let ptr = self.read_mem(io, self.pc.wrapping_add(sign_extend(instr, 9)));
        self.write_mem(ptr, val);
    }

    fn str(&mut self, _io: &mut dyn Console, instr: u16) {
        let sr = (instr >> 9) & 0b111;
        let br = (instr >> 6) & 0b111;
        let ptr = self.reg(br).wrapping_add(sign_extend(instr, 6));
        let val = self.reg(sr);
        self.write_mem(ptr, val);
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
