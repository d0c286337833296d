//! How each mnemonic's comma-separated operand list maps onto its
//! instruction format's fields: the parser splits the remainder of a line by
//! comma to yield fields. The bit *layout* a format implies
//! doesn't by itself say which source-text position feeds
//! which field — `JMP 0,TARGET` and `LDA 0,0,42` are both LS-format but use
//! two and three operands respectively, because `JMP`/`JSR` never consume
//! the LS format's R field at execution (engine.rs `run_opcode`), so the
//! assembler doesn't ask the programmer to write it.

use vn1801_core::isa::Mnemonic;

/// The operand-list shape a mnemonic expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// `R, IX, ADDR[, I]` — LDR, STR, LDA, JZ, JNE, JCC, SOB, JGE, AMR, SMR.
    RIxAddr,
    /// `IX, ADDR[, I]` — JMP, JSR (R is unused at execution).
    IxAddr,
    /// `ADDR` — RFS (R0 and PC come from the opcode body, not an operand).
    AddrOnly,
    /// `IX, ADDR[, I]` — LDX, STX (LX format has no R field at all).
    LxIxAddr,
    /// `R, ADDR` (immediate, no indirection — IMM format has no I bit) —
    /// AIR, SIR.
    RImm,
    /// `TRAPCODE` — TRAP.
    Trapcode,
    /// `RX, RY` — MLT, DVD, TRR, AND, ORR.
    RxRy,
    /// `RX` — NOT.
    Rx,
    /// `R, COUNT, LR, AL` — SRC, RRC.
    Shift,
    /// `R, DEVID` — IN, OUT.
    RDevid,
    /// No operands — HLT.
    None,
}

/// The operand shape a mnemonic's source-text line is parsed with.
#[must_use]
pub fn operand_shape(mnemonic: Mnemonic) -> OperandShape {
    use Mnemonic::{
        Air, Amr, And, Dvd, Hlt, In, Jcc, Jge, Jmp, Jne, Jsr, Jz, Lda, Ldr, Ldx, Mlt, Not, Orr,
        Out, Rfs, Rrc, Sir, Smr, Sob, Src, Stx, Str, Trap, Trr,
    };
    match mnemonic {
        Ldr | Str | Lda | Jz | Jne | Jcc | Sob | Jge | Amr | Smr => OperandShape::RIxAddr,
        Jmp | Jsr => OperandShape::IxAddr,
        Rfs => OperandShape::AddrOnly,
        Ldx | Stx => OperandShape::LxIxAddr,
        Air | Sir => OperandShape::RImm,
        Trap => OperandShape::Trapcode,
        Mlt | Dvd | Trr | And | Orr => OperandShape::RxRy,
        Not => OperandShape::Rx,
        Src | Rrc => OperandShape::Shift,
        In | Out => OperandShape::RDevid,
        Hlt => OperandShape::None,
    }
}

/// Whether this shape carries a label-or-literal ADDR operand at all (the
/// only operand position that may be a symbolic reference).
#[must_use]
pub fn has_addr_operand(shape: OperandShape) -> bool {
    matches!(
        shape,
        OperandShape::RIxAddr
            | OperandShape::IxAddr
            | OperandShape::AddrOnly
            | OperandShape::LxIxAddr
            | OperandShape::RImm
    )
}

/// Whether this shape's ADDR field has an adjoining `I` bit it can route an
/// out-of-range value through the indirect-jump trampoline with. IMM
/// format (`RImm`) has no `I` bit, so AIR/SIR can never indirect;
/// RFS reads its ADDR field as a literal loaded straight into R0 (engine.rs
/// `run_opcode`'s `Rfs` arm never runs effective-address resolution for it),
/// so it can't indirect either even though its format byte has an `I` bit.
#[must_use]
pub fn supports_indirection(shape: OperandShape) -> bool {
    matches!(shape, OperandShape::RIxAddr | OperandShape::IxAddr | OperandShape::LxIxAddr)
}
