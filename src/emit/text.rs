//! Textual assembly listing (§6.2): `.constants:`, `.start:`, `.functions:`,
//! then one `.F<idx>:` block per function. Instruction indices restart at
//! 0 in every block.

use std::io::{self, Write};

use crate::constant_pool::ConstKind;
use crate::instruction::Instruction;
use crate::translator::Program;

fn write_instructions<W: Write>(out: &mut W, code: &[Instruction]) -> io::Result<()> {
    for (i, instr) in code.iter().enumerate() {
        write!(out, "{}\t{}", i, instr.op.mnemonic())?;
        match instr.op.operand_count() {
            2 => write!(out, " {} {}", instr.x, instr.y)?,
            1 => write!(out, " {}", instr.x)?,
            _ => {}
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_program<W: Write>(out: &mut W, program: &Program) -> io::Result<()> {
    writeln!(out, ".constants:")?;
    for (i, entry) in program.constants.entries().iter().enumerate() {
        let tag = match entry.kind {
            ConstKind::S => "S",
            ConstKind::I => "I",
            ConstKind::D => "D",
        };
        match entry.kind {
            ConstKind::S => writeln!(out, "{} {} \"{}\"", i, tag, entry.text)?,
            _ => writeln!(out, "{} {} {}", i, tag, entry.text)?,
        }
    }

    writeln!(out, ".start:")?;
    write_instructions(out, &program.start_code)?;

    writeln!(out, ".functions:")?;
    for entry in program.functions.entries() {
        writeln!(out, "{} {} {}", entry.name_const_index, entry.param_slots, entry.level)?;
    }

    for (idx, code) in program.function_code.iter().enumerate() {
        writeln!(out, ".F{}:", idx)?;
        write_instructions(out, code)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::translator::translate;

    #[test]
    fn empty_main_lists_all_four_sections() {
        let tokens = Lexer::tokenize("void main() {}").unwrap();
        let program = translate(tokens).unwrap();
        let mut out = Vec::new();
        write_program(&mut out, &program).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(".constants:"));
        assert!(text.contains(".start:"));
        assert!(text.contains(".functions:"));
        assert!(text.contains(".F0:"));
    }

    #[test]
    fn string_constant_is_quoted() {
        let tokens = Lexer::tokenize("void main() { print(\"hi\"); }").unwrap();
        let program = translate(tokens).unwrap();
        let mut out = Vec::new();
        write_program(&mut out, &program).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("S \"hi\""));
    }
}
