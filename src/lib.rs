//! A compiler for c0, a small teaching language, targeting the `o0` stack
//! bytecode machine.
//!
//! The pipeline is a single pass: [`lexer::Lexer`] tokenizes the source,
//! then [`translator::translate`] walks the token stream once, doing
//! recursive-descent parsing, symbol resolution, and bytecode emission
//! together. The result is handed to one of the two [`emit`] backends.

pub mod config;
pub mod constant_pool;
pub mod cursor;
pub mod emit;
pub mod error;
pub mod function_table;
pub mod instruction;
pub mod lexer;
pub mod position;
pub mod symbol;
pub mod token;
pub mod translator;
pub mod types;

use std::io::Write;

use config::{CompilerConfig, EmitMode};
use error::Result;

/// Compile `source` and write the default (textual) artifact to `out`.
///
/// The outer `io::Result` reports a failed write (a broken pipe, a full
/// disk); the inner [`Result`] reports a compilation error. Keeping them
/// distinct lets a caller tell "your program doesn't compile" apart from
/// "the output couldn't be written" without inventing a combined error type.
pub fn compile_source<W: Write>(source: &str, out: &mut W) -> std::io::Result<Result<()>> {
    compile_source_with_config(source, out, &CompilerConfig::text())
}

/// Compile `source` and write whichever artifact `config.emit_mode`
/// selects to `out`.
pub fn compile_source_with_config<W: Write>(
    source: &str,
    out: &mut W,
    config: &CompilerConfig,
) -> std::io::Result<Result<()>> {
    let tokens = match lexer::Lexer::tokenize(source) {
        Ok(t) => t,
        Err(e) => return Ok(Err(e)),
    };
    let program = match translator::translate(tokens) {
        Ok(p) => p,
        Err(e) => return Ok(Err(e)),
    };
    match config.emit_mode {
        EmitMode::Text => emit::text::write_program(out, &program)?,
        EmitMode::Binary => emit::binary::write_program(out, &program)?,
    }
    Ok(Ok(()))
}
