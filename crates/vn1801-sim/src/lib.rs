//! Driver, front-end adapter and headless CLI for the vn1801 machine.
//!
//! `adapter` is the `FrontEndAdapter` trait + no-op implementation the
//! engine is tested against; `config` bundles what demo (if
//! any) to preload; `demos` holds the bundled programs'
//! source/data; `driver` is the `load_rom`/`execute`/`interrupt`/
//! `feed_input`/`shutdown` surface that ties the engine to an
//! adapter.

pub mod adapter;
pub mod config;
pub mod demos;
pub mod driver;

pub use adapter::{FrontEndAdapter, NoOpAdapter};
pub use config::{Demo, EngineConfig};
pub use driver::{Driver, Interrupt};
