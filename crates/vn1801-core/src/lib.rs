//! Register file, ALU, cache and execution engine for the vn1801 machine.
//!
//! `word`/`bits` hold the fixed-width bit containers; `registers` the
//! register file; `memory`/`cache`/`writebuffer`/`system_bus` the addressable
//! storage stack; `alu` and `decode` the two stateless
//! per-instruction helpers; `isa` the shared mnemonic/opcode/format table;
//! `io` the keyboard/console channel; `engine` the fetch/decode/execute FSM.

pub mod alu;
pub mod bits;
pub mod cache;
pub mod decode;
pub mod engine;
pub mod io;
pub mod isa;
pub mod memory;
pub mod registers;
pub mod system_bus;
pub mod word;
pub mod writebuffer;

pub use alu::Alu;
pub use cache::{L1Cache, L1CacheLine};
pub use decode::Decoder;
pub use engine::{ExecutionEngine, Mode, StepOutcome};
pub use io::IoChannel;
pub use isa::{Format, Mnemonic};
pub use memory::{AddressFault, Memory};
pub use registers::RegisterFile;
pub use word::{word, Word};
