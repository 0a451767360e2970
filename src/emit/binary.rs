//! Binary object format (§6.3): big-endian, byte-packed, written with
//! `byteorder`'s `WriteBytesExt` the way a hand-rolled framing format gets
//! written when there's no existing serde-compatible schema to reuse.

use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::constant_pool::{ConstEntry, ConstKind};
use crate::instruction::Instruction;
use crate::translator::Program;

const MAGIC: [u8; 4] = [0x43, 0x30, 0x3A, 0x29];
const VERSION: u32 = 1;

fn write_instruction<W: Write>(out: &mut W, instr: &Instruction) -> io::Result<()> {
    out.write_u8(instr.op as u8)?;
    match instr.op.operand_count() {
        2 => {
            out.write_u16::<BigEndian>(instr.x as u16)?;
            out.write_i32::<BigEndian>(instr.y)?;
        }
        1 if instr.op == crate::instruction::Opcode::Bipush => {
            out.write_u8(instr.x as u8)?;
        }
        1 if matches!(
            instr.op,
            crate::instruction::Opcode::Loadc | crate::instruction::Opcode::Call
        ) =>
        {
            out.write_u16::<BigEndian>(instr.x as u16)?;
        }
        1 if instr.op.is_jump() => {
            out.write_u16::<BigEndian>(instr.x as u16)?;
        }
        1 => {
            out.write_i32::<BigEndian>(instr.x)?;
        }
        _ => {}
    }
    Ok(())
}

fn write_code<W: Write>(out: &mut W, code: &[Instruction]) -> io::Result<()> {
    out.write_u16::<BigEndian>(code.len() as u16)?;
    for instr in code {
        write_instruction(out, instr)?;
    }
    Ok(())
}

fn write_constant<W: Write>(out: &mut W, entry: &ConstEntry) -> io::Result<()> {
    match entry.kind {
        ConstKind::S => {
            out.write_u8(0)?;
            let bytes = entry.text.as_bytes();
            out.write_u16::<BigEndian>(bytes.len() as u16)?;
            out.write_all(bytes)?;
        }
        ConstKind::I => {
            out.write_u8(1)?;
            let v: i32 = entry.text.parse().unwrap_or_else(|_| {
                i32::from_str_radix(entry.text.trim_start_matches("0x").trim_start_matches("0X"), 16)
                    .expect("interned integer constant must parse as decimal or hex")
            });
            out.write_i32::<BigEndian>(v)?;
        }
        ConstKind::D => {
            out.write_u8(2)?;
            let v: f64 = entry.text.parse().expect("interned double constant must parse");
            out.write_f64::<BigEndian>(v)?;
        }
    }
    Ok(())
}

pub fn write_program<W: Write>(out: &mut W, program: &Program) -> io::Result<()> {
    out.write_all(&MAGIC)?;
    out.write_u32::<BigEndian>(VERSION)?;

    out.write_u16::<BigEndian>(program.constants.len() as u16)?;
    for entry in program.constants.entries() {
        write_constant(out, entry)?;
    }

    write_code(out, &program.start_code)?;

    out.write_u16::<BigEndian>(program.functions.entries().len() as u16)?;
    for (entry, code) in program.functions.entries().iter().zip(program.function_code.iter()) {
        out.write_u16::<BigEndian>(entry.name_const_index as u16)?;
        out.write_u16::<BigEndian>(entry.param_slots as u16)?;
        out.write_u16::<BigEndian>(entry.level as u16)?;
        write_code(out, code)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::translator::translate;

    #[test]
    fn header_matches_magic_and_version() {
        let tokens = Lexer::tokenize("void main() {}").unwrap();
        let program = translate(tokens).unwrap();
        let mut out = Vec::new();
        write_program(&mut out, &program).unwrap();
        assert_eq!(&out[0..4], &MAGIC);
        assert_eq!(&out[4..8], &[0, 0, 0, 1]);
    }

    #[test]
    fn integer_constant_round_trips_as_i32() {
        let tokens = Lexer::tokenize("void main() { print(0x2A); }").unwrap();
        let program = translate(tokens).unwrap();
        let mut out = Vec::new();
        write_program(&mut out, &program).unwrap();
        // magic(4) + version(4) + consts_cnt(2) + kind(1) = offset 11 for value
        let value = &out[11..15];
        assert_eq!(i32::from_be_bytes([value[0], value[1], value[2], value[3]]), 0x2A);
    }
}
