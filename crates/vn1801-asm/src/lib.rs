//! Two-pass assembler and loader for vn1801 source text.
//!
//! `parse` splits a source line into its mnemonic and comma-separated
//! operands; `operand_shape` says which operand positions a mnemonic
//! expects; `encode`/`label` turn those operands plus the label table into
//! instruction words; `assemble` drives the single-traversal two-pass walk
//! that ties all of it together and resolves the indirect-jump trampoline.

pub mod assemble;
pub mod encode;
pub mod error;
pub mod label;
pub mod operand_shape;
pub mod parse;

pub use assemble::{assemble, default_origin, AssembledProgram};
pub use error::{AssembleError, ParseWarning};
