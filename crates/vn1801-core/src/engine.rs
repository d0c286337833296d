//! The execution engine: the micro-stepped fetch/decode/execute FSM.
//!
//! Step 0 is the universal fetch; the decoder runs at step 3; opcode-
//! specific work starts at step 4. Memory-referencing opcodes compute their
//! effective address at step 4; if the instruction's `I` bit is set, that
//! step performs the one allowed level of indirection and the opcode body
//! runs at step 5 instead — exactly one extra micro-step, never more.
//! Everything else's body runs directly at step 4.

use std::sync::{Arc, Mutex};

use emu_core::{Observable, Tickable, Value};

use crate::alu::Alu;
use crate::bits::Bits;
use crate::cache::L1Cache;
use crate::decode::Decoder;
use crate::io::{devid, IoChannel};
use crate::isa::{mnemonic_for_opcode, Mnemonic};
use crate::memory::{reserved, Memory, MEMORY_SIZE};
use crate::registers::{cc_flag, DecodedFields, RegisterFile};
use crate::system_bus::SystemBus;
use crate::word::{word, Word, WORD_WIDTH};
use crate::writebuffer::{MemoryController, WriteBuffer};

/// Stepping granularity requested by the driver's `execute(mode)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Execute exactly one micro-step.
    Micro,
    /// Execute exactly one whole instruction (run micro-steps until the
    /// step counter wraps back to 0).
    Macro,
    /// Execute one whole instruction, same as `Macro`. The driver is
    /// expected to call this repeatedly, updating the front end between
    /// calls — the mode exists as a distinct name for that caller intent,
    /// not a distinct engine behavior.
    Continue,
    /// Run whole instructions back-to-back, internally, until the program
    /// halts or suspends waiting for input. No intermediate front-end
    /// update — used for fast-forwarding (e.g. running the bootloader).
    Direct,
}

/// What happened as a result of a `step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One micro-op ran; the instruction is not yet complete.
    MicroStepped,
    /// An instruction completed normally; PC has been advanced (or a jump
    /// already set it).
    InstructionComplete,
    /// `HLT` executed in a user program: PC reset to 24, general/index
    /// registers cleared.
    ReturnedToBootloader,
    /// `HLT` executed while the bootloader itself was running: general/
    /// index registers cleared, engine idle until a new program is loaded.
    Idle,
    /// `IN` found an empty input buffer; the engine is suspended until
    /// `interrupt(IO)` is called.
    WaitingForInput,
}

impl StepOutcome {
    /// True if this outcome means the execution loop (`Continue`/`Direct`)
    /// should stop rather than keep running instructions.
    #[must_use]
    pub fn suspends(self) -> bool {
        !matches!(self, Self::MicroStepped | Self::InstructionComplete)
    }
}

fn opcode_uses_effective_address(mnemonic: Mnemonic) -> bool {
    matches!(
        mnemonic,
        Mnemonic::Ldr
            | Mnemonic::Str
            | Mnemonic::Lda
            | Mnemonic::Ldx
            | Mnemonic::Stx
            | Mnemonic::Jz
            | Mnemonic::Jne
            | Mnemonic::Jcc
            | Mnemonic::Jmp
            | Mnemonic::Jsr
            | Mnemonic::Sob
            | Mnemonic::Jge
            | Mnemonic::Amr
            | Mnemonic::Smr
    )
}

/// The execution engine: register file, ALU, decoder, bus and I/O channel,
/// wired into one fetch/decode/execute FSM.
pub struct ExecutionEngine {
    pub regs: RegisterFile,
    pub io: IoChannel,
    bus: SystemBus,
    memory_controller: MemoryController,
    fields: DecodedFields,
    /// Per-program-load table of resolved trampoline targets, keyed by the
    /// address of the jump instruction that uses them.
    trampolines: std::collections::HashMap<i32, i32>,
    step: u8,
    ea: i32,
    jump_taken: bool,
    instruction_address: i32,
    pub cycle_count: u64,
    /// True while the bootloader (not a loaded user program) is running;
    /// governs `HLT`'s behavior.
    pub bootloader_mode: bool,
}

impl ExecutionEngine {
    /// Construct a fresh engine. Spawns the memory-controller worker thread
    /// immediately; it runs for the engine's whole lifetime.
    #[must_use]
    pub fn new() -> Self {
        let memory = Arc::new(Mutex::new(Memory::new()));
        let cache = Arc::new(Mutex::new(L1Cache::new()));
        let (write_buffer, memory_controller) =
            MemoryController::spawn(Arc::clone(&memory), Arc::clone(&cache));
        let bus = SystemBus::new(cache, memory, write_buffer);

        Self {
            regs: RegisterFile::new(),
            io: IoChannel::new(),
            bus,
            memory_controller,
            fields: DecodedFields::default(),
            trampolines: std::collections::HashMap::new(),
            step: 0,
            ea: 0,
            jump_taken: false,
            instruction_address: 0,
            cycle_count: 0,
            bootloader_mode: false,
        }
    }

    /// Write `word` directly to memory at `addr`, bypassing the cache. Used
    /// by the loader, which writes to addresses the execution thread has
    /// not yet touched.
    pub fn load_word(&mut self, addr: i32, w: Word) {
        self.bus.write(addr, w);
    }

    /// Read a word directly (used by tests and the loader to verify state).
    #[must_use]
    pub fn peek(&mut self, addr: i32) -> Word {
        self.bus.read(addr)
    }

    /// Register the trampoline target for a jump instruction at
    /// `instruction_addr`.
    pub fn set_trampoline(&mut self, instruction_addr: i32, target: i32) {
        self.trampolines.insert(instruction_addr, target);
    }

    /// Resume after an `IN` suspension: clears the wait-for-input flag so
    /// the next `step` retries the read.
    pub fn interrupt_io(&mut self) {
        self.io.wait_for_interrupt = false;
    }

    /// Shut down the memory-controller worker cleanly.
    pub fn shutdown(&mut self) {
        self.memory_controller.stop();
    }

    /// Execute according to `mode`.
    pub fn step(&mut self, mode: Mode) -> StepOutcome {
        match mode {
            Mode::Micro => self.step_micro(),
            Mode::Macro | Mode::Continue => self.run_one_instruction(),
            Mode::Direct => loop {
                let outcome = self.run_one_instruction();
                if outcome.suspends() {
                    return outcome;
                }
            },
        }
    }

    fn run_one_instruction(&mut self) -> StepOutcome {
        loop {
            let outcome = self.step_micro();
            if outcome != StepOutcome::MicroStepped {
                return outcome;
            }
        }
    }

    fn bounds_ok(addr: i32) -> bool {
        (0..MEMORY_SIZE as i32).contains(&addr)
    }

    fn checked_read(&mut self, addr: i32) -> Option<Word> {
        if Self::bounds_ok(addr) {
            Some(self.bus.read(addr))
        } else {
            self.trigger_fault();
            None
        }
    }

    fn checked_write(&mut self, addr: i32, w: Word) -> bool {
        if Self::bounds_ok(addr) {
            self.bus.write(addr, w);
            true
        } else {
            self.trigger_fault();
            false
        }
    }

    /// Machine fault handler: out-of-range address or an
    /// undefined trap code.
    fn trigger_fault(&mut self) {
        let pc_word = self.regs.pc_as_word();
        self.regs.msr = pc_word;
        self.bus.write(reserved::FAULT_SAVED_PC, pc_word);
        self.bus.write(reserved::FAULT_SAVED_MSR, self.regs.msr);
        let entry = self.bus.read(reserved::FAULT_HANDLER_ENTRY);
        self.regs.set_pc(entry.as_unsigned());
        self.jump_taken = true;
    }

    /// One micro-step of the fetch/decode/execute FSM.
    fn step_micro(&mut self) -> StepOutcome {
        self.cycle_count += 1;

        match self.step {
            0 => {
                self.instruction_address = self.regs.pc_address() as i32;
                self.regs.mar = word(self.instruction_address as u32);
                self.jump_taken = false;
                self.step = 1;
                StepOutcome::MicroStepped
            }
            1 => {
                let Some(mdr) = self.checked_read(self.regs.mar.as_unsigned() as i32) else {
                    self.step = 0;
                    return StepOutcome::InstructionComplete;
                };
                self.regs.mdr = mdr;
                self.step = 2;
                StepOutcome::MicroStepped
            }
            2 => {
                self.regs.ir = self.regs.mdr;
                self.step = 3;
                StepOutcome::MicroStepped
            }
            3 => {
                self.fields = Decoder::decode(self.regs.ir);
                // Only I=1, ADDR=8 LS/LX-format instructions are trampoline
                // jumps; an immediate-format literal of 8 (e.g. `AIR r,8`)
                // must not be mistaken for one.
                if self.fields.i && self.fields.addr == reserved::JUMP_TRAMPOLINE as u8 {
                    if let Some(&target) = self.trampolines.get(&self.instruction_address) {
                        self.checked_write(reserved::JUMP_TRAMPOLINE, word(target as u32));
                    }
                }
                self.step = 4;
                StepOutcome::MicroStepped
            }
            4 => self.step_effective_address_or_body(),
            5 => self.execute_body(),
            _ => unreachable!("step counter out of range"),
        }
    }

    fn step_effective_address_or_body(&mut self) -> StepOutcome {
        let Some(mnemonic) = mnemonic_for_opcode(self.fields.opcode) else {
            // Unrecognized opcode: treat like an illegal trap, fault and move on.
            self.trigger_fault();
            self.step = 0;
            return StepOutcome::InstructionComplete;
        };

        if !opcode_uses_effective_address(mnemonic) {
            return self.finish_instruction(mnemonic);
        }

        let base = if matches!(mnemonic, Mnemonic::Ldx | Mnemonic::Stx) || self.fields.ix == 0 {
            i32::from(self.fields.addr)
        } else {
            self.regs.x[self.fields.ix as usize].as_unsigned() as i32 + i32::from(self.fields.addr)
        };
        self.ea = base;

        if self.fields.i {
            self.regs.mar = word(self.ea as u32);
            let Some(mdr) = self.checked_read(self.ea) else {
                self.step = 0;
                return StepOutcome::InstructionComplete;
            };
            self.regs.mdr = mdr;
            self.ea = mdr.as_unsigned() as i32;
            self.step = 5;
            StepOutcome::MicroStepped
        } else {
            self.finish_instruction(mnemonic)
        }
    }

    fn execute_body(&mut self) -> StepOutcome {
        let mnemonic = mnemonic_for_opcode(self.fields.opcode)
            .expect("opcode already validated at step 4");
        self.finish_instruction(mnemonic)
    }

    fn finish_instruction(&mut self, mnemonic: Mnemonic) -> StepOutcome {
        let outcome = self.run_opcode(mnemonic);
        self.step = 0;
        if matches!(outcome, StepOutcome::InstructionComplete) {
            if self.jump_taken {
                self.jump_taken = false;
            } else {
                self.regs.set_pc(self.regs.pc_address() + 1);
            }
        }
        outcome
    }

    #[allow(clippy::too_many_lines)]
    fn run_opcode(&mut self, mnemonic: Mnemonic) -> StepOutcome {
        let f = self.fields;
        match mnemonic {
            Mnemonic::Ldr => {
                self.regs.mar = word(self.ea as u32);
                if let Some(mdr) = self.checked_read(self.ea) {
                    self.regs.mdr = mdr;
                    self.regs.r[f.r as usize] = mdr;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Str => {
                self.regs.mar = word(self.ea as u32);
                self.regs.mdr = self.regs.r[f.r as usize];
                self.checked_write(self.ea, self.regs.mdr);
                StepOutcome::InstructionComplete
            }
            Mnemonic::Lda => {
                self.regs.r[f.r as usize] = word(self.ea as u32);
                StepOutcome::InstructionComplete
            }
            Mnemonic::Ldx => {
                if let Some(mdr) = self.checked_read(self.ea) {
                    self.regs.mdr = mdr;
                    self.regs.x[f.ix as usize] = mdr;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Stx => {
                self.regs.mdr = self.regs.x[f.ix as usize];
                self.checked_write(self.ea, self.regs.mdr);
                StepOutcome::InstructionComplete
            }
            Mnemonic::Jz | Mnemonic::Jne => {
                self.regs.op1 = self.regs.r[f.r as usize];
                self.regs.op2 = word(0);
                Alu::trr(&mut self.regs);
                let equal = self.regs.cc_flag(cc_flag::EQUALORNOT);
                let take = (mnemonic == Mnemonic::Jz && equal) || (mnemonic == Mnemonic::Jne && !equal);
                if take {
                    self.regs.set_pc(self.ea as u32);
                    self.jump_taken = true;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Jcc => {
                if self.regs.cc_flag(f.r) {
                    self.regs.set_pc(self.ea as u32);
                    self.jump_taken = true;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Jmp => {
                self.regs.set_pc(self.ea as u32);
                self.jump_taken = true;
                StepOutcome::InstructionComplete
            }
            Mnemonic::Jsr => {
                self.regs.r[3] = word((self.instruction_address + 1) as u32);
                self.regs.set_pc(self.ea as u32);
                self.jump_taken = true;
                StepOutcome::InstructionComplete
            }
            Mnemonic::Rfs => {
                self.regs.r[0] = word(u32::from(f.addr));
                self.regs.set_pc(self.regs.r[3].as_unsigned());
                self.jump_taken = true;
                StepOutcome::InstructionComplete
            }
            Mnemonic::Sob => {
                let r = f.r as usize;
                self.regs.r[r] = word(
                    (self.regs.r[r].as_signed().wrapping_sub(1)) as u32,
                );
                if self.regs.r[r].as_signed() >= 0 {
                    self.regs.set_pc(self.ea as u32);
                    self.jump_taken = true;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Jge => {
                if self.regs.r[f.r as usize].as_signed() >= 0 {
                    self.regs.set_pc(self.ea as u32);
                    self.jump_taken = true;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Amr | Mnemonic::Smr => {
                let Some(op2) = self.checked_read(self.ea) else {
                    return StepOutcome::InstructionComplete;
                };
                self.regs.op1 = self.regs.r[f.r as usize];
                self.regs.op2 = op2;
                if mnemonic == Mnemonic::Amr {
                    Alu::air(&mut self.regs);
                } else {
                    Alu::sir(&mut self.regs);
                }
                self.regs.r[f.r as usize] = self.regs.result;
                StepOutcome::InstructionComplete
            }
            Mnemonic::Air | Mnemonic::Sir => {
                self.regs.op1 = self.regs.r[f.r as usize];
                // ADDR here is the 5-bit signed immediate the assembler
                // encodes (see `immediate_operand_accepts_negative_literals`);
                // sign-extend it to the word width before handing it to the ALU.
                let immediate = Bits::from_unsigned(u32::from(f.addr), 5).as_signed();
                self.regs.op2 = Bits::from_signed(immediate, WORD_WIDTH);
                if mnemonic == Mnemonic::Air {
                    Alu::air(&mut self.regs);
                } else {
                    Alu::sir(&mut self.regs);
                }
                self.regs.r[f.r as usize] = self.regs.result;
                StepOutcome::InstructionComplete
            }
            Mnemonic::Mlt | Mnemonic::Dvd => {
                self.regs.op1 = self.regs.r[f.rx as usize];
                self.regs.op2 = self.regs.r[f.ry as usize];
                if mnemonic == Mnemonic::Mlt {
                    Alu::mlt(&mut self.regs);
                } else {
                    Alu::dvd(&mut self.regs);
                }
                // DVD-by-zero aborts without touching RESULT/RESULT2; leave
                // R[rx]/R[rx+1] as they were.
                if !self.regs.cc_flag(cc_flag::DIVZERO) {
                    self.regs.r[f.rx as usize] = self.regs.result;
                    self.regs.r[f.rx as usize + 1] = self.regs.result2;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Trr => {
                self.regs.op1 = self.regs.r[f.rx as usize];
                self.regs.op2 = self.regs.r[f.ry as usize];
                Alu::trr(&mut self.regs);
                StepOutcome::InstructionComplete
            }
            Mnemonic::And | Mnemonic::Orr => {
                self.regs.op1 = self.regs.r[f.rx as usize];
                self.regs.op2 = self.regs.r[f.ry as usize];
                if mnemonic == Mnemonic::And {
                    Alu::and(&mut self.regs);
                } else {
                    Alu::orr(&mut self.regs);
                }
                self.regs.r[f.rx as usize] = self.regs.result;
                StepOutcome::InstructionComplete
            }
            Mnemonic::Not => {
                self.regs.op1 = self.regs.r[f.rx as usize];
                Alu::not(&mut self.regs);
                self.regs.r[f.rx as usize] = self.regs.result;
                StepOutcome::InstructionComplete
            }
            Mnemonic::Src | Mnemonic::Rrc => {
                self.regs.op1 = self.regs.r[f.r as usize];
                self.regs.op2 = word(u32::from(f.count));
                self.regs.op3 = word(u32::from(f.lr));
                self.regs.op4 = word(u32::from(f.al));
                if mnemonic == Mnemonic::Src {
                    Alu::src(&mut self.regs);
                } else {
                    Alu::rrc(&mut self.regs);
                }
                self.regs.r[f.r as usize] = self.regs.result;
                StepOutcome::InstructionComplete
            }
            Mnemonic::In => {
                if f.devid == devid::KEYBOARD {
                    match self.io.read_char() {
                        Some(c) => {
                            self.regs.r[f.r as usize] = word(u32::from(c));
                            StepOutcome::InstructionComplete
                        }
                        None => StepOutcome::WaitingForInput,
                    }
                } else {
                    StepOutcome::InstructionComplete
                }
            }
            Mnemonic::Out => {
                if f.devid == devid::CONSOLE {
                    let byte = (self.regs.r[f.r as usize].as_unsigned() & 0xFF) as u8;
                    self.io.terminal.push(char::from(byte));
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Trap => {
                let return_pc = word(self.instruction_address as u32);
                self.bus.write(reserved::TRAP_SAVED_PC, return_pc);
                let table_base = self.bus.read(reserved::TRAP_TABLE_BASE).as_unsigned() as i32;
                let entry = self.bus.read(table_base + i32::from(f.trapcode));
                if entry.as_unsigned() == 0 {
                    self.trigger_fault();
                } else {
                    self.regs.set_pc(entry.as_unsigned());
                    self.jump_taken = true;
                }
                StepOutcome::InstructionComplete
            }
            Mnemonic::Hlt => {
                self.regs.clear_general();
                if self.bootloader_mode {
                    StepOutcome::Idle
                } else {
                    self.regs.set_pc(reserved::BOOT_AREA_START as u32);
                    self.jump_taken = true;
                    StepOutcome::ReturnedToBootloader
                }
            }
        }
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Tickable for ExecutionEngine {
    fn tick(&mut self) {
        self.step(Mode::Micro);
    }
}

impl Observable for ExecutionEngine {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "r0" => Some(Value::U32(self.regs.r[0].as_unsigned())),
            "r1" => Some(Value::U32(self.regs.r[1].as_unsigned())),
            "r2" => Some(Value::U32(self.regs.r[2].as_unsigned())),
            "r3" => Some(Value::U32(self.regs.r[3].as_unsigned())),
            "x1" => Some(Value::U32(self.regs.x[1].as_unsigned())),
            "x2" => Some(Value::U32(self.regs.x[2].as_unsigned())),
            "x3" => Some(Value::U32(self.regs.x[3].as_unsigned())),
            "pc" => Some(Value::U32(self.regs.pc_address())),
            "ir" => Some(Value::U32(self.regs.ir.as_unsigned())),
            "mar" => Some(Value::U32(self.regs.mar.as_unsigned())),
            "mdr" => Some(Value::U32(self.regs.mdr.as_unsigned())),
            "msr" => Some(Value::U32(self.regs.msr.as_unsigned())),
            "result" => Some(Value::U32(self.regs.result.as_unsigned())),
            "result2" => Some(Value::U32(self.regs.result2.as_unsigned())),
            "cc.overflow" => Some(Value::Bool(self.regs.cc_flag(cc_flag::OVERFLOW))),
            "cc.underflow" => Some(Value::Bool(self.regs.cc_flag(cc_flag::UNDERFLOW))),
            "cc.divzero" => Some(Value::Bool(self.regs.cc_flag(cc_flag::DIVZERO))),
            "cc.equalornot" => Some(Value::Bool(self.regs.cc_flag(cc_flag::EQUALORNOT))),
            "cycle_count" => Some(Value::U64(self.cycle_count)),
            "wait_for_interrupt" => Some(Value::Bool(self.io.wait_for_interrupt)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "r0", "r1", "r2", "r3", "x1", "x2", "x3", "pc", "ir", "mar", "mdr", "msr", "result",
            "result2", "cc.overflow", "cc.underflow", "cc.divzero", "cc.equalornot",
            "cycle_count", "wait_for_interrupt",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::lookup_mnemonic;

    fn encode_imm(opcode: u8, r: u8, addr: u8) -> Word {
        word((u32::from(opcode) << 12) | (u32::from(r) << 10) | u32::from(addr))
    }

    fn encode_ls(opcode: u8, r: u8, ix: u8, i: bool, addr: u8) -> Word {
        word(
            (u32::from(opcode) << 12)
                | (u32::from(r) << 10)
                | (u32::from(ix) << 8)
                | (u32::from(i) << 7)
                | (u32::from(addr) << 2),
        )
    }

    fn encode_hlt(opcode: u8) -> Word {
        word(u32::from(opcode) << 12)
    }

    /// S1: `AIR 0,5; AIR 0,7; HLT` at 100 -> R0 = 12.
    #[test]
    fn s1_immediate_add() {
        let mut engine = ExecutionEngine::new();
        let air = lookup_mnemonic("AIR").unwrap().opcode;
        let hlt = lookup_mnemonic("HLT").unwrap().opcode;
        engine.load_word(100, encode_imm(air, 0, 5));
        engine.load_word(101, encode_imm(air, 0, 7));
        engine.load_word(102, encode_hlt(hlt));
        engine.regs.set_pc(100);

        loop {
            match engine.step(Mode::Macro) {
                StepOutcome::ReturnedToBootloader | StepOutcome::Idle => break,
                _ => {}
            }
        }

        assert_eq!(engine.regs.r[0].as_unsigned(), 12);
        engine.shutdown();
    }

    /// S2: `LDA 0,0,42; STR 0,0,200; LDR 1,0,200; HLT` -> R0=42, R1=42, mem[200]=42.
    #[test]
    fn s2_memory_store_load() {
        let mut engine = ExecutionEngine::new();
        let lda = lookup_mnemonic("LDA").unwrap().opcode;
        let str_ = lookup_mnemonic("STR").unwrap().opcode;
        let ldr = lookup_mnemonic("LDR").unwrap().opcode;
        let hlt = lookup_mnemonic("HLT").unwrap().opcode;
        // 200 doesn't fit ADDR(5); route it through the trampoline.
        engine.load_word(100, encode_ls(lda, 0, 0, false, 42));
        engine.load_word(101, encode_ls(str_, 0, 0, true, 8));
        engine.set_trampoline(101, 200);
        engine.load_word(102, encode_ls(ldr, 1, 0, true, 8));
        engine.set_trampoline(102, 200);
        engine.load_word(103, encode_hlt(hlt));
        engine.regs.set_pc(100);

        loop {
            match engine.step(Mode::Macro) {
                StepOutcome::ReturnedToBootloader | StepOutcome::Idle => break,
                _ => {}
            }
        }

        assert_eq!(engine.regs.r[0].as_unsigned(), 42);
        assert_eq!(engine.regs.r[1].as_unsigned(), 42);
        assert_eq!(engine.peek(200).as_unsigned(), 42);
        engine.shutdown();
    }

    /// S6: R0=5, R2=0; `DVD 0,2` -> CC.DIVZERO set, R0/R1 unchanged.
    #[test]
    fn s6_divide_by_zero_sets_cc_and_preserves_registers() {
        let mut engine = ExecutionEngine::new();
        let dvd = lookup_mnemonic("DVD").unwrap().opcode;
        let hlt = lookup_mnemonic("HLT").unwrap().opcode;
        engine.regs.r[0] = word(5);
        engine.regs.r[2] = word(0);
        engine.load_word(100, word((u32::from(dvd) << 12) | (0b00 << 10) | (0b10 << 8)));
        engine.load_word(101, encode_hlt(hlt));
        engine.regs.set_pc(100);

        engine.step(Mode::Macro);
        assert!(engine.regs.cc_flag(cc_flag::DIVZERO));
        assert_eq!(engine.regs.r[0].as_unsigned(), 5);
        engine.shutdown();
    }

    #[test]
    fn hlt_in_user_mode_returns_to_boot_and_clears_general_registers() {
        let mut engine = ExecutionEngine::new();
        let hlt = lookup_mnemonic("HLT").unwrap().opcode;
        engine.regs.r[0] = word(99);
        engine.bootloader_mode = false;
        engine.load_word(100, encode_hlt(hlt));
        engine.regs.set_pc(100);

        let outcome = engine.step(Mode::Macro);
        assert_eq!(outcome, StepOutcome::ReturnedToBootloader);
        assert_eq!(engine.regs.r[0].as_unsigned(), 0);
        assert_eq!(engine.regs.pc_address(), reserved::BOOT_AREA_START as u32);
        engine.shutdown();
    }

    #[test]
    fn out_of_range_address_triggers_machine_fault() {
        let mut engine = ExecutionEngine::new();
        let fault_entry = 500;
        engine.load_word(reserved::FAULT_HANDLER_ENTRY, word(fault_entry));
        engine.regs.set_pc(4095); // well beyond the 2048-word memory
        engine.step(Mode::Macro);
        assert_eq!(engine.regs.pc_address(), fault_entry);
        engine.shutdown();
    }

    /// `AIR 0,-1` must subtract one, not add 31: the assembler packs the
    /// 5-bit ADDR field as a signed immediate, so the engine has to
    /// sign-extend it back out before handing it to the ALU.
    #[test]
    fn air_immediate_sign_extends_a_negative_literal() {
        let mut engine = ExecutionEngine::new();
        let air = lookup_mnemonic("AIR").unwrap().opcode;
        let hlt = lookup_mnemonic("HLT").unwrap().opcode;
        engine.regs.r[0] = word(10);
        // ADDR = 0b11111 (5 bits) is -1 in two's complement, matching how
        // `assemble::classify_addr` encodes a negative immediate literal.
        engine.load_word(100, encode_imm(air, 0, 0b11111));
        engine.load_word(101, encode_hlt(hlt));
        engine.regs.set_pc(100);

        engine.step(Mode::Macro);
        assert_eq!(engine.regs.r[0].as_signed(), 9);
        engine.shutdown();
    }

    /// `TRAP` indexes through the table whose *base address* lives at
    /// mem[0], not through mem[0] itself as a table: mem[0] must be
    /// dereferenced once before adding TRAPCODE.
    #[test]
    fn trap_dereferences_the_table_base_before_indexing() {
        let mut engine = ExecutionEngine::new();
        let trap = lookup_mnemonic("TRAP").unwrap().opcode;
        let table_base: i32 = 300;
        let handler_entry: u32 = 400;
        engine.load_word(reserved::TRAP_TABLE_BASE, word(table_base as u32));
        engine.load_word(table_base + 2, word(handler_entry));
        engine.load_word(100, word((u32::from(trap) << 12) | (0b0010 << 8)));
        engine.regs.set_pc(100);

        engine.step(Mode::Macro);
        assert_eq!(engine.regs.pc_address(), handler_entry);
        engine.shutdown();
    }
}
