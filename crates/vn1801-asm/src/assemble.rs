//! The two-pass-in-a-single-traversal assembler: walks the
//! source once, binding labels at the current write pointer and patching
//! every queued forward reference the instant its label binds.

use std::collections::HashMap;

use vn1801_core::bits::Bits;
use vn1801_core::isa::{lookup_mnemonic, Format};
use vn1801_core::memory::reserved;
use vn1801_core::word::Word;

use crate::encode::{encode, patch_addr, EncodeFields};
use crate::error::{AssembleError, ParseWarning};
use crate::label::LabelTable;
use crate::operand_shape::{operand_shape, supports_indirection, OperandShape};
use crate::parse::{label_definition, parse_instruction_line, strip_comment, AddrOperand};

/// Largest value the 5-bit ADDR field can hold directly. Above this, an
/// effective-address-capable instruction must route through the
/// indirect-jump trampoline instead of writing the address straight into
/// the field. Every ADDR field this implementation decodes is 5 bits wide,
/// 0..31, so treating "doesn't fit the field" as the cutover (rather than
/// some larger illustrative threshold) is what keeps addresses 32..127 —
/// squarely inside the reserved boot area, 24..99 — from being silently
/// truncated instead of trampolined.
const MAX_DIRECT_ADDR: i32 = 31;

/// Metadata kept for an instruction whose ADDR field is still waiting on a
/// forward-referenced label, so the fixup can be classified and packed once
/// the label binds.
struct ForwardFixup {
    format: Format,
    shape: OperandShape,
    explicit_i: bool,
}

/// A successfully assembled program, ready to load into memory starting at
/// `origin`.
#[derive(Debug, Clone)]
pub struct AssembledProgram {
    pub origin: i32,
    pub words: Vec<Word>,
    /// Instruction address -> resolved jump target, for every instruction
    /// that assembled to an indirect-jump trampoline reference. The driver
    /// feeds these into `ExecutionEngine::set_trampoline` after loading.
    pub trampolines: HashMap<i32, i32>,
    pub warnings: Vec<ParseWarning>,
}

impl AssembledProgram {
    /// The first address past the end of the loaded program.
    #[must_use]
    pub fn end_address(&self) -> i32 {
        self.origin + self.words.len() as i32
    }
}

/// Choose the program's load address: the bootloader region if it's
/// unoccupied, otherwise the general program area.
#[must_use]
pub fn default_origin(boot_area_empty: bool) -> i32 {
    if boot_area_empty {
        reserved::BOOT_AREA_START
    } else {
        reserved::PROGRAM_AREA_START
    }
}

/// Classify a resolved address into the ADDR field value and `I` bit an
/// instruction should carry, routing through the indirect-jump trampoline
/// when the address doesn't fit and the format supports indirection at all
/// (RImm and RFS's literal ADDR never indirect, see
/// `operand_shape::supports_indirection`).
fn classify_addr(
    instruction_addr: i32,
    resolved: i32,
    shape: OperandShape,
    explicit_i: bool,
    trampolines: &mut HashMap<i32, i32>,
) -> (u8, bool) {
    if !supports_indirection(shape) {
        return (Bits::from_signed(resolved, 5).as_unsigned() as u8, false);
    }
    if explicit_i {
        return (Bits::from_unsigned(resolved as u32, 5).as_unsigned() as u8, true);
    }
    if (0..=MAX_DIRECT_ADDR).contains(&resolved) {
        return (resolved as u8, false);
    }
    trampolines.insert(instruction_addr, resolved);
    (reserved::JUMP_TRAMPOLINE as u8, true)
}

/// Assemble `source` into a sequence of words starting at `origin`.
///
/// # Errors
///
/// Returns `AssembleError::Empty` if `source` contains no instruction
/// lines. Malformed lines, unknown mnemonics, duplicate labels and labels
/// that are referenced but never defined are non-fatal: they are collected
/// into the returned program's `warnings` instead of aborting assembly.
#[allow(clippy::too_many_lines)]
pub fn assemble(source: &str, origin: i32) -> Result<AssembledProgram, AssembleError> {
    let mut labels = LabelTable::new();
    let mut warnings = Vec::new();
    let mut words: Vec<Word> = Vec::new();
    let mut trampolines = HashMap::new();
    let mut forward_fixups: HashMap<i32, ForwardFixup> = HashMap::new();
    let mut any_instruction = false;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = strip_comment(raw_line).trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(name) = label_definition(trimmed) {
            let here = origin + words.len() as i32;
            match labels.bind(name, here) {
                Ok(forward_refs) => {
                    for ref_addr in forward_refs {
                        let Some(fixup) = forward_fixups.remove(&ref_addr) else { continue };
                        let (addr_field, indirect) = classify_addr(
                            ref_addr,
                            here,
                            fixup.shape,
                            fixup.explicit_i,
                            &mut trampolines,
                        );
                        let word_idx = (ref_addr - origin) as usize;
                        patch_addr(&mut words[word_idx], fixup.format, addr_field, indirect);
                    }
                }
                Err(()) => {
                    warnings.push(ParseWarning::DuplicateLabel {
                        line: line_no,
                        name: name.to_string(),
                    });
                }
            }
            continue;
        }

        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let mnemonic_token = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("");

        let parsed = match parse_instruction_line(mnemonic_token, rest) {
            Ok(p) => p,
            Err(message) => {
                if lookup_mnemonic(mnemonic_token).is_none() {
                    warnings.push(ParseWarning::UnknownMnemonic {
                        line: line_no,
                        text: mnemonic_token.to_string(),
                    });
                } else {
                    warnings.push(ParseWarning::Malformed { line: line_no, message });
                }
                continue;
            }
        };

        let here = origin + words.len() as i32;
        any_instruction = true;
        let shape = operand_shape(parsed.def.mnemonic);
        let explicit_i = parsed.operands.explicit_i.unwrap_or(false);

        let (addr_field, indirect) = match &parsed.operands.addr {
            None => (0, false),
            Some(AddrOperand::Literal(v)) => {
                classify_addr(here, *v, shape, explicit_i, &mut trampolines)
            }
            Some(AddrOperand::Label(name)) => match labels.reference(name, here) {
                Some(resolved) => classify_addr(here, resolved, shape, explicit_i, &mut trampolines),
                None => {
                    forward_fixups
                        .insert(here, ForwardFixup { format: parsed.def.format, shape, explicit_i });
                    (0, false)
                }
            },
        };

        let fields = EncodeFields {
            r: parsed.operands.r,
            ix: parsed.operands.ix,
            i: indirect,
            addr: addr_field,
            rx: parsed.operands.rx,
            ry: parsed.operands.ry,
            al: parsed.operands.al,
            lr: parsed.operands.lr,
            count: parsed.operands.count,
            devid: parsed.operands.devid,
            trapcode: parsed.operands.trapcode,
        };
        words.push(encode(parsed.def, fields));
    }

    if !any_instruction {
        return Err(AssembleError::Empty);
    }

    for name in labels.unresolved() {
        warnings.push(ParseWarning::UnresolvedLabel { name });
    }

    Ok(AssembledProgram { origin, words, trampolines, warnings })
}
