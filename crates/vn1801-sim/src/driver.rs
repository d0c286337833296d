//! The driver: `load_rom`, `execute`, `interrupt`, `feed_input`, `shutdown`.
//! Owns the execution engine and the front-end adapter, and is
//! the only place that decides where a freshly-assembled program lands in
//! memory: the bootloader area if it's empty, otherwise the general
//! program area at 100.

use emu_core::Observable;
use vn1801_asm::{assemble, default_origin, AssembledProgram, AssembleError, ParseWarning};
use vn1801_core::engine::{ExecutionEngine, Mode, StepOutcome};
use vn1801_core::memory::reserved;
use vn1801_core::word::word;

use crate::adapter::FrontEndAdapter;
use crate::config::{Demo, EngineConfig};
use crate::demos::{paragraph_bytes, FAULT_HANDLER_ORIGIN};

/// What `interrupt(kind)` resumes. The only interrupt source
/// this machine defines is I/O; the enum exists
/// as a named surface rather than a bare method so additional interrupt
/// sources can be added without changing the driver's call shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Resume an `IN` that was waiting on empty input.
    Io,
}

/// The registers the driver pushes to the front end after every step;
/// mirrors `ExecutionEngine::query_paths` minus the internal
/// `cc.*`/`cycle_count` diagnostics, which a register display wouldn't
/// label as registers.
const DISPLAY_REGISTERS: &[&str] =
    &["r0", "r1", "r2", "r3", "x1", "x2", "x3", "pc", "ir", "mar", "mdr", "msr", "result", "result2"];

/// Owns the execution engine and the front-end adapter; this is the
/// headless-testable surface the GUI (or a CLI, or a test) drives.
pub struct Driver<A: FrontEndAdapter> {
    engine: ExecutionEngine,
    adapter: A,
    boot_loaded: bool,
}

impl<A: FrontEndAdapter> Driver<A> {
    /// Construct a driver with a fresh engine and the given front-end
    /// adapter, applying `config`'s preloaded demos.
    #[must_use]
    pub fn new(adapter: A, config: &EngineConfig) -> Self {
        let mut driver = Self { engine: ExecutionEngine::new(), adapter, boot_loaded: false };
        for demo in &config.demos {
            driver.load_demo(demo);
        }
        driver
    }

    fn load_demo(&mut self, demo: &Demo) {
        match demo {
            Demo::Bootloader { source } => {
                if let Err(err) = self.load_rom(source) {
                    panic!("bundled bootloader source failed to assemble: {err}");
                }
            }
            Demo::ParagraphSearch { text, .. } => {
                for (i, byte) in paragraph_bytes(text).into_iter().enumerate() {
                    self.engine.load_word(
                        reserved::PARAGRAPH_AREA_START + i as i32,
                        word(u32::from(byte)),
                    );
                }
            }
            Demo::FaultHandler { source } => {
                let program = assemble(source, FAULT_HANDLER_ORIGIN)
                    .expect("bundled fault handler source failed to assemble");
                self.install(&program);
                self.engine.load_word(reserved::FAULT_HANDLER_ENTRY, word(FAULT_HANDLER_ORIGIN as u32));
            }
        }
    }

    /// Assemble `source` and load it into memory.
    ///
    /// Lands in the bootloader area (24..99) the first time this is called
    /// (`bootloader_mode` is then `true`); every subsequent call lands at
    /// the general program area (100) with `bootloader_mode` cleared.
    ///
    /// # Errors
    ///
    /// Returns `AssembleError` if `source` contains no instructions.
    /// Non-fatal diagnostics (unknown mnemonics, duplicate/unresolved
    /// labels) are returned as warnings alongside a successful assembly;
    /// the CLI binary is what logs them.
    pub fn load_rom(&mut self, source: &str) -> Result<Vec<ParseWarning>, AssembleError> {
        let origin = default_origin(!self.boot_loaded);
        let program = assemble(source, origin)?;
        self.install(&program);
        self.engine.regs.set_pc(origin as u32);
        self.engine.bootloader_mode = !self.boot_loaded;
        self.boot_loaded = true;
        Ok(program.warnings)
    }

    fn install(&mut self, program: &AssembledProgram) {
        for (i, w) in program.words.iter().enumerate() {
            self.engine.load_word(program.origin + i as i32, *w);
        }
        for (&instr_addr, &target) in &program.trampolines {
            self.engine.set_trampoline(instr_addr, target);
        }
    }

    /// Execute according to `mode`, pushing register/terminal updates to
    /// the front end afterward.
    pub fn execute(&mut self, mode: Mode) -> StepOutcome {
        let outcome = self.engine.step(mode);
        self.publish(outcome);
        outcome
    }

    fn publish(&mut self, outcome: StepOutcome) {
        for &name in DISPLAY_REGISTERS {
            if let Some(value) = self.engine.query(name) {
                if let emu_core::Value::U32(bits) = value {
                    self.adapter.update_register(name, bits);
                }
            }
        }
        let terminal = self.engine.io.drain_terminal();
        if !terminal.is_empty() {
            self.adapter.append_terminal(&terminal);
        }
        match outcome {
            StepOutcome::Idle => self.adapter.disable_buttons(),
            StepOutcome::ReturnedToBootloader => self.adapter.toggle_button("run", true),
            StepOutcome::WaitingForInput => self.adapter.toggle_button("input", true),
            StepOutcome::MicroStepped | StepOutcome::InstructionComplete => {}
        }
    }

    /// Resume after a suspension.
    pub fn interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Io => self.engine.interrupt_io(),
        }
    }

    /// Feed new keyboard input.
    pub fn feed_input(&mut self, s: &str) {
        self.engine.io.feed_input(s);
    }

    /// Shut down the memory-controller worker cleanly.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }

    /// Read a word directly, bypassing instruction execution (used by
    /// tests and by a memory-dump front end).
    #[must_use]
    pub fn peek(&mut self, addr: i32) -> u32 {
        self.engine.peek(addr).as_unsigned()
    }

    /// Direct read-only access to the engine, for `Observable` queries a
    /// front end wants beyond the register set this driver pushes
    /// automatically.
    #[must_use]
    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::NoOpAdapter;

    fn run_to_suspension(driver: &mut Driver<NoOpAdapter>) -> StepOutcome {
        loop {
            let outcome = driver.execute(Mode::Macro);
            if outcome.suspends() {
                return outcome;
            }
        }
    }

    /// S1: `AIR 0,5; AIR 0,7; HLT` -> R0 = 12. The first `load_rom` call
    /// lands in the (empty) bootloader area and runs as the bootloader
    /// itself, so `HLT` goes idle rather than returning to boot.
    #[test]
    fn s1_immediate_add_through_the_driver() {
        let mut driver = Driver::new(NoOpAdapter, &EngineConfig::empty());
        driver.load_rom("AIR 0,5\nAIR 0,7\nHLT\n").unwrap();
        let outcome = run_to_suspension(&mut driver);
        assert_eq!(outcome, StepOutcome::Idle);
        assert_eq!(driver.engine().regs.r[0].as_unsigned(), 12);
        driver.shutdown();
    }

    /// First `load_rom` call lands in the bootloader area; the second lands
    /// at the general program area.
    #[test]
    fn second_load_lands_at_general_program_area() {
        let mut driver = Driver::new(NoOpAdapter, &EngineConfig::empty());
        driver.load_rom("HLT\n").unwrap();
        assert!(driver.engine().bootloader_mode);
        driver.load_rom("HLT\n").unwrap();
        assert!(!driver.engine().bootloader_mode);
        assert_eq!(driver.engine().regs.pc_address(), reserved::PROGRAM_AREA_START as u32);
        driver.shutdown();
    }

    #[test]
    fn input_stall_resumes_after_interrupt() {
        let mut driver = Driver::new(NoOpAdapter, &EngineConfig::empty());
        driver.load_rom("IN 0,0\nHLT\n").unwrap();
        let outcome = run_to_suspension(&mut driver);
        assert_eq!(outcome, StepOutcome::WaitingForInput);

        driver.feed_input("A");
        driver.interrupt(Interrupt::Io);
        run_to_suspension(&mut driver);
        assert_eq!(driver.engine().regs.r[0].as_unsigned(), u32::from(b'A'));
        driver.shutdown();
    }

    #[test]
    fn paragraph_demo_prefetches_text_terminated_by_eot() {
        let config = EngineConfig {
            demos: vec![Demo::ParagraphSearch { text: "hi", search_word: " is" }],
        };
        let mut driver = Driver::new(NoOpAdapter, &config);
        assert_eq!(driver.peek(reserved::PARAGRAPH_AREA_START), u32::from(b'h'));
        assert_eq!(driver.peek(reserved::PARAGRAPH_AREA_START + 1), u32::from(b'i'));
        assert_eq!(driver.peek(reserved::PARAGRAPH_AREA_START + 2), u32::from(crate::demos::EOT));
        driver.shutdown();
    }

    /// The bundled fault handler is wired to `mem[FAULT_HANDLER_ENTRY]`
    /// before any program loads; an undefined `TRAP` code routes there
    /// and the handler's `AIR 0,1` sentinel runs.
    #[test]
    fn fault_handler_demo_catches_an_illegal_trap() {
        let config = EngineConfig {
            demos: vec![Demo::FaultHandler { source: crate::demos::FAULT_HANDLER_SOURCE }],
        };
        let mut driver = Driver::new(NoOpAdapter, &config);
        assert_eq!(driver.peek(reserved::FAULT_HANDLER_ENTRY), FAULT_HANDLER_ORIGIN as u32);

        driver.load_rom("TRAP 0\nHLT\n").unwrap();
        let outcome = run_to_suspension(&mut driver);
        assert_eq!(outcome, StepOutcome::Idle);
        assert_eq!(driver.engine().regs.r[0].as_unsigned(), 1);
        driver.shutdown();
    }
}
