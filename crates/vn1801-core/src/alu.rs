//! The arithmetic/logic unit.
//!
//! Every operation reads from OP1..OP4 and writes RESULT (and RESULT2 for
//! multiply/divide) on the register file passed in. At most one CC flag is
//! set per call; arithmetic and compare operations clear CC before they run,
//! purely logical/shift operations leave it untouched.

use crate::bits::Bits;
use crate::registers::{cc_flag, RegisterFile};
use crate::word::{word, WORD_WIDTH};

/// The arithmetic/logic unit. Stateless: every operation is a pure function
/// of the register file's current OP1..OP4.
pub struct Alu;

impl Alu {
    /// AIR / AMR: RESULT = OP1 + OP2, OVERFLOW if the unsigned sum wraps.
    pub fn air(regs: &mut RegisterFile) {
        regs.cc.clear();
        let (op1, op2) = (regs.op1, regs.op2);
        let sum_unsigned = op1.as_unsigned() + op2.as_unsigned();
        let overflow = sum_unsigned > Self::max_unsigned();
        regs.result = if op2.as_unsigned() == 0 {
            op1
        } else {
            Bits::from_signed(op1.as_signed() + op2.as_signed(), WORD_WIDTH)
        };
        regs.set_cc_flag(cc_flag::OVERFLOW, overflow);
    }

    /// SIR / SMR: RESULT = OP1 - OP2, UNDERFLOW if the result is larger
    /// (unsigned) than the original OP1.
    pub fn sir(regs: &mut RegisterFile) {
        regs.cc.clear();
        let (op1, op2) = (regs.op1, regs.op2);
        regs.result = if op2.as_unsigned() == 0 {
            op1
        } else {
            Bits::from_signed(op1.as_signed() - op2.as_signed(), WORD_WIDTH)
        };
        let underflow = regs.result.as_unsigned() > op1.as_unsigned();
        regs.set_cc_flag(cc_flag::UNDERFLOW, underflow);
    }

    /// MLT: 36-bit unsigned product of OP1 and OP2, split into RESULT
    /// (high 18 bits) and RESULT2 (low 18 bits).
    pub fn mlt(regs: &mut RegisterFile) {
        regs.cc.clear();
        let product = u64::from(regs.op1.as_unsigned()) * u64::from(regs.op2.as_unsigned());
        let overflow = product > (1u64 << 36) - 1;
        regs.result = Bits::from_unsigned((product >> WORD_WIDTH) as u32, WORD_WIDTH);
        regs.result2 = Bits::from_unsigned(product as u32, WORD_WIDTH);
        regs.set_cc_flag(cc_flag::OVERFLOW, overflow);
    }

    /// DVD: RESULT = quotient, RESULT2 = remainder. Sets DIVZERO and leaves
    /// RESULT/RESULT2 untouched if OP2 is zero.
    pub fn dvd(regs: &mut RegisterFile) {
        regs.cc.clear();
        if regs.op2.as_unsigned() == 0 {
            regs.set_cc_flag(cc_flag::DIVZERO, true);
            return;
        }
        let (a, b) = (regs.op1.as_signed(), regs.op2.as_signed());
        regs.result = Bits::from_signed(a / b, WORD_WIDTH);
        regs.result2 = Bits::from_signed(a % b, WORD_WIDTH);
    }

    /// TRR: sets EQUALORNOT iff OP1 == OP2 (explicitly cleared otherwise).
    pub fn trr(regs: &mut RegisterFile) {
        regs.cc.clear();
        let equal = regs.op1.as_unsigned() == regs.op2.as_unsigned();
        regs.set_cc_flag(cc_flag::EQUALORNOT, equal);
    }

    /// AND: RESULT = OP1 & OP2.
    pub fn and(regs: &mut RegisterFile) {
        regs.result = regs.op1 & regs.op2;
    }

    /// ORR: RESULT = OP1 | OP2.
    pub fn orr(regs: &mut RegisterFile) {
        regs.result = regs.op1 | regs.op2;
    }

    /// NOT: RESULT = !OP1.
    pub fn not(regs: &mut RegisterFile) {
        regs.result = !regs.op1;
    }

    /// SRC: OP1 = value, OP2 = count, OP3 = left?, OP4 = logical?.
    /// Left shift is identical for arithmetic/logical; right shift is
    /// logical (fill 0) if OP4 != 0, else arithmetic (sign-extend).
    pub fn src(regs: &mut RegisterFile) {
        let value = regs.op1;
        // Clamp: a shift of 31 already empties (or fully sign-fills) an
        // 18-bit value, and Rust panics on a shift amount >= the operand's
        // own bit width (32 for u32/i32).
        let count = regs.op2.as_unsigned().min(31);
        let left = regs.op3.as_unsigned() != 0;
        let logical = regs.op4.as_unsigned() != 0;

        regs.result = if left {
            Bits::from_unsigned(value.as_unsigned() << count, WORD_WIDTH)
        } else if logical {
            Bits::from_unsigned(value.as_unsigned() >> count, WORD_WIDTH)
        } else {
            Bits::from_signed(value.as_signed() >> count, WORD_WIDTH)
        };
    }

    /// RRC: rotate OP1 by OP2 positions within the register's width.
    /// OP3 = left?, OP4 is ignored.
    pub fn rrc(regs: &mut RegisterFile) {
        let value = regs.op1.as_unsigned();
        let count = regs.op2.as_unsigned() % u32::from(WORD_WIDTH);
        let left = regs.op3.as_unsigned() != 0;
        let width = u32::from(WORD_WIDTH);
        let mask = (1u32 << width) - 1;

        let rotated = if count == 0 {
            value
        } else if left {
            ((value << count) | (value >> (width - count))) & mask
        } else {
            ((value >> count) | (value << (width - count))) & mask
        };
        regs.result = Bits::from_unsigned(rotated, WORD_WIDTH);
    }

    /// GTE: RESULT = 1 (LSB set) iff OP1 >= OP2, else 0.
    pub fn gte(regs: &mut RegisterFile) {
        regs.result = word(u32::from(regs.op1.as_signed() >= regs.op2.as_signed()));
    }

    const fn max_unsigned() -> u32 {
        (1u32 << WORD_WIDTH) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regs_with_ops(op1: i32, op2: i32) -> RegisterFile {
        let mut regs = RegisterFile::new();
        regs.op1 = Bits::from_signed(op1, WORD_WIDTH);
        regs.op2 = Bits::from_signed(op2, WORD_WIDTH);
        regs
    }

    #[test]
    fn air_adds() {
        let mut regs = regs_with_ops(5, 7);
        Alu::air(&mut regs);
        assert_eq!(regs.result.as_signed(), 12);
        assert!(!regs.cc_flag(cc_flag::OVERFLOW));
    }

    #[test]
    fn mlt_splits_36_bit_product() {
        // S5: R0=6, R2=7 -> high=0, low=42.
        let mut regs = regs_with_ops(6, 7);
        Alu::mlt(&mut regs);
        assert_eq!(regs.result.as_unsigned(), 0);
        assert_eq!(regs.result2.as_unsigned(), 42);
    }

    #[test]
    fn dvd_by_zero_sets_divzero_and_preserves_state() {
        // S6: R0=5, R2=0 -> CC DIVZERO set, RESULT/RESULT2 unchanged.
        let mut regs = regs_with_ops(5, 0);
        regs.result = word(111);
        regs.result2 = word(222);
        Alu::dvd(&mut regs);
        assert!(regs.cc_flag(cc_flag::DIVZERO));
        assert_eq!(regs.result.as_unsigned(), 111);
        assert_eq!(regs.result2.as_unsigned(), 222);
    }

    #[test]
    fn dvd_computes_quotient_and_remainder() {
        let mut regs = regs_with_ops(17, 5);
        Alu::dvd(&mut regs);
        assert_eq!(regs.result.as_signed(), 3);
        assert_eq!(regs.result2.as_signed(), 2);
    }

    #[test]
    fn trr_sets_and_clears_equalornot() {
        let mut regs = regs_with_ops(4, 4);
        Alu::trr(&mut regs);
        assert!(regs.cc_flag(cc_flag::EQUALORNOT));

        let mut regs = regs_with_ops(4, 5);
        Alu::trr(&mut regs);
        assert!(!regs.cc_flag(cc_flag::EQUALORNOT));
    }

    #[test]
    fn src_left_shift_truncates_at_width() {
        let mut regs = RegisterFile::new();
        regs.op1 = word(0b11);
        regs.op2 = word(1);
        regs.op3 = word(1); // left
        regs.op4 = word(0);
        Alu::src(&mut regs);
        assert_eq!(regs.result.as_unsigned(), 0b110);
    }

    #[test]
    fn src_right_arithmetic_sign_extends() {
        let mut regs = RegisterFile::new();
        regs.op1 = Bits::from_signed(-4, WORD_WIDTH);
        regs.op2 = word(1);
        regs.op3 = word(0); // right
        regs.op4 = word(0); // arithmetic
        Alu::src(&mut regs);
        assert_eq!(regs.result.as_signed(), -2);
    }

    #[test]
    fn src_right_logical_fills_zero() {
        let mut regs = RegisterFile::new();
        regs.op1 = Bits::from_signed(-4, WORD_WIDTH);
        regs.op2 = word(1);
        regs.op3 = word(0); // right
        regs.op4 = word(1); // logical
        Alu::src(&mut regs);
        assert_eq!(regs.result.as_unsigned(), Bits::from_signed(-4, WORD_WIDTH).as_unsigned() >> 1);
    }

    #[test]
    fn rrc_rotates_within_width() {
        let mut regs = RegisterFile::new();
        regs.op1 = word(1); // 0b0...01
        regs.op2 = word(1);
        regs.op3 = word(0); // right rotate
        Alu::rrc(&mut regs);
        assert_eq!(regs.result.as_unsigned(), 1 << (WORD_WIDTH - 1));
    }

    #[test]
    fn gte_sets_lsb() {
        let mut regs = regs_with_ops(5, 5);
        Alu::gte(&mut regs);
        assert_eq!(regs.result.as_unsigned(), 1);
        let mut regs = regs_with_ops(4, 5);
        Alu::gte(&mut regs);
        assert_eq!(regs.result.as_unsigned(), 0);
    }
}
