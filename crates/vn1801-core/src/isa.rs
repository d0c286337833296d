//! The instruction set: mnemonic table, opcode assignment, and instruction
//! formats. Shared between the decoder (opcode -> format, at execution
//! time) and the assembler (mnemonic -> opcode + format, at assembly time)
//! so the two never drift apart.

/// One of the eight bit-layouts an instruction word can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// OPCODE | R(2) | IX(2) | I(1) | ADDR(5).
    Ls,
    /// OPCODE | IX(2) | I(1) | ADDR(5) — no R.
    Lx,
    /// OPCODE | R(2) | ADDR(5) as immediate.
    Imm,
    /// OPCODE | TRAPCODE(4).
    Trap,
    /// OPCODE | RX(2) | RY(2).
    Xy,
    /// OPCODE | RX(2).
    MonoX,
    /// OPCODE | R(2) | AL(1) | LR(1) | COUNT(4).
    Shift,
    /// OPCODE | R(2) | DEVID(5).
    Io,
    /// OPCODE only (HLT).
    NoOperand,
}

/// A mnemonic recognized by the assembler and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Mnemonic {
    Ldr,
    Str,
    Lda,
    Ldx,
    Stx,
    Jz,
    Jne,
    Jcc,
    Jmp,
    Jsr,
    Rfs,
    Sob,
    Jge,
    Amr,
    Smr,
    Air,
    Sir,
    Mlt,
    Dvd,
    Trr,
    And,
    Orr,
    Not,
    Src,
    Rrc,
    In,
    Out,
    Trap,
    Hlt,
}

/// One row of the opcode table: a mnemonic, the opcode it assembles to, the
/// instruction format that governs its field layout, and the source text
/// the assembler matches against (case-insensitive).
pub struct InstructionDef {
    pub mnemonic: Mnemonic,
    pub opcode: u8,
    pub format: Format,
    pub text: &'static str,
}

/// The fixed opcode table. Opcode values are this
/// simulator's own assignment; the original system's TRAP-table slot 0 and
/// fault-handler slot 1 are *memory* addresses, unrelated to these values.
pub const INSTRUCTIONS: &[InstructionDef] = &[
    InstructionDef { mnemonic: Mnemonic::Ldr, opcode: 0, format: Format::Ls, text: "LDR" },
    InstructionDef { mnemonic: Mnemonic::Str, opcode: 1, format: Format::Ls, text: "STR" },
    InstructionDef { mnemonic: Mnemonic::Lda, opcode: 2, format: Format::Ls, text: "LDA" },
    InstructionDef { mnemonic: Mnemonic::Ldx, opcode: 3, format: Format::Lx, text: "LDX" },
    InstructionDef { mnemonic: Mnemonic::Stx, opcode: 4, format: Format::Lx, text: "STX" },
    InstructionDef { mnemonic: Mnemonic::Jz, opcode: 5, format: Format::Ls, text: "JZ" },
    InstructionDef { mnemonic: Mnemonic::Jne, opcode: 6, format: Format::Ls, text: "JNE" },
    InstructionDef { mnemonic: Mnemonic::Jcc, opcode: 7, format: Format::Ls, text: "JCC" },
    InstructionDef { mnemonic: Mnemonic::Jmp, opcode: 8, format: Format::Ls, text: "JMP" },
    InstructionDef { mnemonic: Mnemonic::Jsr, opcode: 9, format: Format::Ls, text: "JSR" },
    InstructionDef { mnemonic: Mnemonic::Rfs, opcode: 10, format: Format::Ls, text: "RFS" },
    InstructionDef { mnemonic: Mnemonic::Sob, opcode: 11, format: Format::Ls, text: "SOB" },
    InstructionDef { mnemonic: Mnemonic::Jge, opcode: 12, format: Format::Ls, text: "JGE" },
    InstructionDef { mnemonic: Mnemonic::Amr, opcode: 13, format: Format::Ls, text: "AMR" },
    InstructionDef { mnemonic: Mnemonic::Smr, opcode: 14, format: Format::Ls, text: "SMR" },
    InstructionDef { mnemonic: Mnemonic::Air, opcode: 15, format: Format::Imm, text: "AIR" },
    InstructionDef { mnemonic: Mnemonic::Sir, opcode: 16, format: Format::Imm, text: "SIR" },
    InstructionDef { mnemonic: Mnemonic::Mlt, opcode: 17, format: Format::Xy, text: "MLT" },
    InstructionDef { mnemonic: Mnemonic::Dvd, opcode: 18, format: Format::Xy, text: "DVD" },
    InstructionDef { mnemonic: Mnemonic::Trr, opcode: 19, format: Format::Xy, text: "TRR" },
    InstructionDef { mnemonic: Mnemonic::And, opcode: 20, format: Format::Xy, text: "AND" },
    InstructionDef { mnemonic: Mnemonic::Orr, opcode: 21, format: Format::Xy, text: "ORR" },
    InstructionDef { mnemonic: Mnemonic::Not, opcode: 22, format: Format::MonoX, text: "NOT" },
    InstructionDef { mnemonic: Mnemonic::Src, opcode: 23, format: Format::Shift, text: "SRC" },
    InstructionDef { mnemonic: Mnemonic::Rrc, opcode: 24, format: Format::Shift, text: "RRC" },
    InstructionDef { mnemonic: Mnemonic::In, opcode: 25, format: Format::Io, text: "IN" },
    InstructionDef { mnemonic: Mnemonic::Out, opcode: 26, format: Format::Io, text: "OUT" },
    InstructionDef { mnemonic: Mnemonic::Trap, opcode: 27, format: Format::Trap, text: "TRAP" },
    InstructionDef { mnemonic: Mnemonic::Hlt, opcode: 28, format: Format::NoOperand, text: "HLT" },
];

/// Look up the instruction format for a decoded opcode.
#[must_use]
pub fn format_for_opcode(opcode: u8) -> Option<Format> {
    INSTRUCTIONS.iter().find(|def| def.opcode == opcode).map(|def| def.format)
}

/// Look up the opcode for a decoded mnemonic (used by the execution engine
/// to dispatch on a strongly-typed tag instead of a raw opcode number).
#[must_use]
pub fn mnemonic_for_opcode(opcode: u8) -> Option<Mnemonic> {
    INSTRUCTIONS.iter().find(|def| def.opcode == opcode).map(|def| def.mnemonic)
}

/// Look up an instruction definition by its assembly mnemonic text,
/// case-insensitively.
#[must_use]
pub fn lookup_mnemonic(text: &str) -> Option<&'static InstructionDef> {
    INSTRUCTIONS.iter().find(|def| def.text.eq_ignore_ascii_case(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for def in INSTRUCTIONS {
            assert!(seen.insert(def.opcode), "duplicate opcode {}", def.opcode);
        }
    }

    #[test]
    fn lookup_roundtrips_through_opcode() {
        let def = lookup_mnemonic("air").unwrap();
        assert_eq!(def.mnemonic, Mnemonic::Air);
        assert_eq!(format_for_opcode(def.opcode), Some(Format::Imm));
    }
}
