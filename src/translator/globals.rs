//! Top-level declarations: global variables (emitted into start-code) and
//! function definitions (parameters, local frame, body).

use crate::error::{CompilationError, ErrorCode, Result};
use crate::instruction::{Instruction, Opcode};
use crate::token::TokenKind;
use crate::types::Type;

use super::state::Translator;

impl Translator {
    /// `[const] type ident [= expr] (, ident [= expr])* ;` at global scope.
    /// Each initializer runs in start-code against the global frame.
    pub(crate) fn translate_global_declaration(&mut self) -> Result<()> {
        let is_const = if self.cursor.peek().kind == TokenKind::Const {
            self.cursor.next();
            true
        } else {
            false
        };
        let ty = self.parse_type()?;
        loop {
            let name_tok = self.expect(TokenKind::Identifier, ErrorCode::NeedIdentifier)?;
            if self.symbols.is_declared_here(&name_tok.spelling()) {
                return Err(CompilationError::new(name_tok.start, ErrorCode::DuplicateDeclaration));
            }
            let slot = self.symbols.next_slot();
            self.emit(Instruction::with_x(Opcode::Snew, ty.width()));
            if self.cursor.peek().kind == TokenKind::Assign {
                self.cursor.next();
                if is_const {
                    self.symbols.declare_const(&name_tok, ty);
                } else {
                    self.symbols.declare_var(&name_tok, ty);
                }
                self.emit(Instruction::with_xy(Opcode::Loada, 0, slot));
                let val_pos = self.cursor.peek().start;
                let val_ty = self.translate_expression()?;
                self.coerce(val_ty, ty, val_pos, ErrorCode::InvalidVariableDeclaration)?;
                self.emit(Instruction::new(if ty == Type::Double {
                    Opcode::Dstore
                } else {
                    Opcode::Istore
                }));
            } else {
                if is_const {
                    return Err(CompilationError::new(name_tok.start, ErrorCode::ConstantNeedValue));
                }
                self.symbols.declare_uninit(&name_tok, ty);
            }
            if self.cursor.peek().kind == TokenKind::Comma {
                self.cursor.next();
                continue;
            }
            break;
        }
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;
        Ok(())
    }

    /// `type ident ( [type ident (, type ident)*] ) { ... }`. The `(
    /// type ident, ...)` parameter list has already been confirmed present
    /// by the caller's lookahead; parameters are declared at a fresh
    /// function-level frame starting at slot 0.
    pub(crate) fn translate_function_definition(&mut self, return_type: Type, name_tok: crate::token::Token) -> Result<()> {
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;
        let mut param_types = Vec::new();
        let mut param_names = Vec::new();
        if self.cursor.peek().kind != TokenKind::RParen {
            loop {
                let pty = self.parse_type()?;
                let pname = self.expect(TokenKind::Identifier, ErrorCode::NeedIdentifier)?;
                param_types.push(pty);
                param_names.push((pname, pty));
                if self.cursor.peek().kind == TokenKind::Comma {
                    self.cursor.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;

        if self.functions.declare(&name_tok, return_type, param_types, &mut self.pool).is_none() {
            return Err(CompilationError::new(name_tok.start, ErrorCode::DuplicateDeclaration));
        }

        if !self.start_code_closed {
            self.begin_function_body();
        }

        self.symbols.push_level(0);
        for (pname, pty) in param_names {
            if self.symbols.is_declared_here(&pname.spelling()) {
                return Err(CompilationError::new(pname.start, ErrorCode::DuplicateDeclaration));
            }
            self.symbols.declare_var(&pname, pty);
        }

        let saved_return_type = self.current_function_return_type;
        self.current_function_return_type = return_type;

        self.expect(TokenKind::LBrace, ErrorCode::NoLeftBrace)?;
        while self.cursor.peek().kind.starts_type() {
            self.translate_local_declaration()?;
        }
        while self.cursor.peek().kind != TokenKind::RBrace {
            self.translate_statement()?;
        }
        self.expect(TokenKind::RBrace, ErrorCode::NoRightBrace)?;

        // A `void` function falling off the end without an explicit
        // `return;` gets no auto-emitted trailing `ret`.
        self.current_function_return_type = saved_return_type;
        self.symbols.pop_level();
        let body = self.end_function_body();
        self.function_code.push(body);
        Ok(())
    }
}
