//! Per-line parsing: strips comments, recognizes label-definition lines, and
//! splits an instruction line's mnemonic from its comma-separated operands.

use crate::operand_shape::{has_addr_operand, operand_shape, OperandShape};
use vn1801_core::isa::{lookup_mnemonic, InstructionDef};

/// An ADDR-position operand: either a numeric literal or a label reference.
/// An alphabetic first character means a label reference; a numeric first
/// character is a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrOperand {
    Literal(i32),
    Label(String),
}

/// One instruction line's parsed operands, before any label resolution.
#[derive(Debug, Clone, Default)]
pub struct ParsedOperands {
    pub r: u8,
    pub ix: u8,
    pub rx: u8,
    pub ry: u8,
    pub al: u8,
    pub lr: u8,
    pub count: u8,
    pub devid: u8,
    pub trapcode: u8,
    pub addr: Option<AddrOperand>,
    /// Explicit trailing `I` operand, if the line supplied one beyond what
    /// its shape strictly requires (the indirect-jump trampoline is the
    /// assembler's own automatic use of `I`; a line can also set it by hand
    /// to indirect through an arbitrary memory slot).
    pub explicit_i: Option<bool>,
}

/// What a single non-blank, non-label-definition source line decoded to.
pub struct ParsedLine {
    pub def: &'static InstructionDef,
    pub operands: ParsedOperands,
}

/// Trim a `/...` comment: a leading `/` marks a whole-line comment; a
/// mid-line `/` trims the remainder.
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    match line.find('/') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// If `line` is a bare `LABEL:` definition, return the label name.
#[must_use]
pub fn label_definition(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let name = trimmed.strip_suffix(':')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(name)
}

fn parse_int(token: &str) -> Result<i32, String> {
    token.trim().parse::<i32>().map_err(|_| format!("not an integer: '{token}'"))
}

fn parse_addr_operand(token: &str) -> Result<AddrOperand, String> {
    let token = token.trim();
    let first = token.chars().next().ok_or_else(|| "empty operand".to_string())?;
    if first.is_ascii_alphabetic() || first == '_' {
        Ok(AddrOperand::Label(token.to_string()))
    } else {
        parse_int(token).map(AddrOperand::Literal)
    }
}

/// Parse one instruction line (mnemonic already split off) into its
/// mnemonic definition and operand fields.
///
/// # Errors
///
/// Returns a human-readable message for an unknown mnemonic or a malformed
/// operand list.
pub fn parse_instruction_line(mnemonic_token: &str, rest: &str) -> Result<ParsedLine, String> {
    let def = lookup_mnemonic(mnemonic_token)
        .ok_or_else(|| format!("unknown mnemonic '{mnemonic_token}'"))?;
    let fields: Vec<&str> = if rest.trim().is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };
    let shape = operand_shape(def.mnemonic);
    let operands = parse_operands(shape, &fields)?;
    Ok(ParsedLine { def, operands })
}

fn require_count(fields: &[&str], mnemonic: &str, min: usize, max: usize) -> Result<(), String> {
    if fields.len() < min || fields.len() > max {
        return Err(format!(
            "{mnemonic} expects {min}..={max} operands, got {}",
            fields.len()
        ));
    }
    Ok(())
}

fn parse_u8(token: &str) -> Result<u8, String> {
    parse_int(token).map(|v| v as u8)
}

fn parse_bool_field(token: &str) -> Result<bool, String> {
    Ok(parse_int(token)? != 0)
}

#[allow(clippy::too_many_lines)]
fn parse_operands(shape: OperandShape, fields: &[&str]) -> Result<ParsedOperands, String> {
    let mut out = ParsedOperands::default();
    match shape {
        OperandShape::RIxAddr => {
            require_count(fields, "this instruction", 2, 4)?;
            out.r = parse_u8(fields[0])?;
            if fields.len() == 2 {
                // `R, ADDR` — index defaults to 0.
                out.addr = Some(parse_addr_operand(fields[1])?);
            } else {
                out.ix = parse_u8(fields[1])?;
                out.addr = Some(parse_addr_operand(fields[2])?);
                if fields.len() == 4 {
                    out.explicit_i = Some(parse_bool_field(fields[3])?);
                }
            }
        }
        OperandShape::IxAddr => {
            require_count(fields, "JMP/JSR", 1, 3)?;
            if fields.len() == 1 {
                out.addr = Some(parse_addr_operand(fields[0])?);
            } else {
                out.ix = parse_u8(fields[0])?;
                out.addr = Some(parse_addr_operand(fields[1])?);
                if fields.len() == 3 {
                    out.explicit_i = Some(parse_bool_field(fields[2])?);
                }
            }
        }
        OperandShape::AddrOnly => {
            require_count(fields, "RFS", 1, 1)?;
            out.addr = Some(parse_addr_operand(fields[0])?);
        }
        OperandShape::LxIxAddr => {
            require_count(fields, "LDX/STX", 2, 3)?;
            out.ix = parse_u8(fields[0])?;
            out.addr = Some(parse_addr_operand(fields[1])?);
            if fields.len() == 3 {
                out.explicit_i = Some(parse_bool_field(fields[2])?);
            }
        }
        OperandShape::RImm => {
            require_count(fields, "AIR/SIR", 2, 2)?;
            out.r = parse_u8(fields[0])?;
            out.addr = Some(parse_addr_operand(fields[1])?);
        }
        OperandShape::Trapcode => {
            require_count(fields, "TRAP", 1, 1)?;
            out.trapcode = parse_u8(fields[0])?;
        }
        OperandShape::RxRy => {
            require_count(fields, "MLT/DVD/TRR/AND/ORR", 2, 2)?;
            out.rx = parse_u8(fields[0])?;
            out.ry = parse_u8(fields[1])?;
        }
        OperandShape::Rx => {
            require_count(fields, "NOT", 1, 1)?;
            out.rx = parse_u8(fields[0])?;
        }
        OperandShape::Shift => {
            require_count(fields, "SRC/RRC", 4, 4)?;
            out.r = parse_u8(fields[0])?;
            out.count = parse_u8(fields[1])?;
            out.lr = u8::from(parse_bool_field(fields[2])?);
            out.al = u8::from(parse_bool_field(fields[3])?);
        }
        OperandShape::RDevid => {
            require_count(fields, "IN/OUT", 2, 2)?;
            out.r = parse_u8(fields[0])?;
            out.devid = parse_u8(fields[1])?;
        }
        OperandShape::None => {
            require_count(fields, "HLT", 0, 0)?;
        }
    }
    debug_assert_eq!(out.addr.is_some(), has_addr_operand(shape));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whole_line_and_mid_line_comments() {
        assert_eq!(strip_comment("/ a whole comment"), "");
        assert_eq!(strip_comment("AIR 0,5 / add five").trim(), "AIR 0,5");
    }

    #[test]
    fn recognizes_label_definitions() {
        assert_eq!(label_definition("TARGET:"), Some("TARGET"));
        assert_eq!(label_definition("AIR 0,5"), None);
        assert_eq!(label_definition("_L1:"), Some("_L1"));
    }

    #[test]
    fn two_operand_ls_form_defaults_index_to_zero() {
        let line = parse_instruction_line("JMP", "0,TARGET").unwrap();
        assert_eq!(line.operands.ix, 0);
        assert_eq!(line.operands.addr, Some(AddrOperand::Label("TARGET".to_string())));
    }

    #[test]
    fn three_operand_ls_form_parses_r_ix_addr() {
        let line = parse_instruction_line("LDA", "0,0,42").unwrap();
        assert_eq!(line.operands.r, 0);
        assert_eq!(line.operands.ix, 0);
        assert_eq!(line.operands.addr, Some(AddrOperand::Literal(42)));
    }

    #[test]
    fn unknown_mnemonic_errors() {
        assert!(parse_instruction_line("ZZZ", "0,1").is_err());
    }

    #[test]
    fn wrong_operand_count_errors() {
        assert!(parse_instruction_line("AIR", "0").is_err());
        assert!(parse_instruction_line("HLT", "0").is_err());
    }
}
