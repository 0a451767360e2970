//! Statement dispatch: declarations, assignment, `scan`/`print`, `return`,
//! compound statements, and the glue between a function body and the
//! control-flow forms in `control_flow.rs`.

use crate::error::{CompilationError, ErrorCode, Result};
use crate::instruction::{Instruction, Opcode};
use crate::token::TokenKind;
use crate::types::Type;

use super::state::Translator;

impl Translator {
    /// `{ decl* stmt* }`, opening a fresh lexical level that shares the
    /// enclosing function's display level.
    pub(crate) fn translate_block(&mut self) -> Result<()> {
        self.expect(TokenKind::LBrace, ErrorCode::NoLeftBrace)?;
        self.symbols.push_level(self.symbols.next_slot());
        while self.cursor.peek().kind.starts_type() {
            self.translate_local_declaration()?;
        }
        while self.cursor.peek().kind != TokenKind::RBrace {
            self.translate_statement()?;
        }
        self.expect(TokenKind::RBrace, ErrorCode::NoRightBrace)?;
        self.symbols.pop_level();
        Ok(())
    }

    pub(crate) fn translate_statement(&mut self) -> Result<()> {
        match self.cursor.peek().kind {
            TokenKind::LBrace => self.translate_block(),
            TokenKind::If => {
                self.cursor.next();
                self.translate_if()
            }
            TokenKind::While => {
                self.cursor.next();
                self.translate_while()
            }
            TokenKind::Do => {
                self.cursor.next();
                self.translate_do_while()
            }
            TokenKind::For => {
                self.cursor.next();
                self.translate_for()
            }
            TokenKind::Switch => {
                self.cursor.next();
                self.translate_switch()
            }
            TokenKind::Break => self.translate_break(),
            TokenKind::Continue => self.translate_continue(),
            TokenKind::Return => self.translate_return(),
            TokenKind::Scan => self.translate_scan(),
            TokenKind::Print => self.translate_print(),
            TokenKind::Semicolon => {
                self.cursor.next();
                Ok(())
            }
            _ => {
                self.translate_assignment_expr()?;
                self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;
                Ok(())
            }
        }
    }

    /// `ident = expr` as a statement or a for-loop clause; evaluates the
    /// right-hand side, coerces it to the declared type, stores it, and
    /// promotes the symbol out of the uninitialized table on first write.
    pub(crate) fn translate_assignment_expr(&mut self) -> Result<()> {
        let tok = self.cursor.peek().clone();
        if tok.kind != TokenKind::Identifier {
            return Err(self.cursor.error_here(ErrorCode::InvalidAssignment));
        }
        self.cursor.next();
        self.expect(TokenKind::Assign, ErrorCode::InvalidAssignment)?;

        let name = tok.spelling();
        if !self.symbols.is_visible(&name) {
            return Err(CompilationError::new(tok.start, ErrorCode::NotDeclared));
        }
        if self.symbols.is_constant(&name) {
            return Err(CompilationError::new(tok.start, ErrorCode::AssignToConstant));
        }
        let resolved = self.symbols.lookup(&name);
        let target_ty = self.symbols.type_of(&name);

        self.emit(Instruction::with_xy(Opcode::Loada, resolved.level_delta, resolved.offset));
        let rhs_pos = self.cursor.peek().start;
        let rhs_ty = self.translate_expression()?;
        self.coerce(rhs_ty, target_ty, rhs_pos, ErrorCode::InvalidAssignment)?;
        self.emit(Instruction::new(if target_ty == Type::Double {
            Opcode::Dstore
        } else {
            Opcode::Istore
        }));
        self.symbols.promote_to_initialized(&name);
        Ok(())
    }

    pub(crate) fn translate_return(&mut self) -> Result<()> {
        let pos = self.cursor.peek().start;
        self.expect(TokenKind::Return, ErrorCode::ErrReturnWrong)?;
        let expected = self.current_function_return_type;
        if self.cursor.peek().kind == TokenKind::Semicolon {
            self.cursor.next();
            if expected != Type::Void {
                return Err(CompilationError::new(pos, ErrorCode::ErrReturnWrong));
            }
            self.emit(Instruction::new(Opcode::Ret));
        } else {
            if expected == Type::Void {
                return Err(CompilationError::new(pos, ErrorCode::ErrReturnWrong));
            }
            let val_pos = self.cursor.peek().start;
            let ty = self.translate_expression()?;
            self.coerce(ty, expected, val_pos, ErrorCode::ErrReturnWrong)?;
            self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;
            self.emit(Instruction::new(if expected == Type::Double {
                Opcode::Dret
            } else {
                Opcode::Iret
            }));
        }
        Ok(())
    }

    /// `scan(ident);` — reads a value from stdin straight into the target
    /// variable's slot without going through the operand stack twice.
    pub(crate) fn translate_scan(&mut self) -> Result<()> {
        self.expect(TokenKind::Scan, ErrorCode::InvalidAssignment)?;
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;
        let tok = self.expect(TokenKind::Identifier, ErrorCode::NeedIdentifier)?;
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;

        let name = tok.spelling();
        if !self.symbols.is_visible(&name) {
            return Err(CompilationError::new(tok.start, ErrorCode::NotDeclared));
        }
        if self.symbols.is_constant(&name) {
            return Err(CompilationError::new(tok.start, ErrorCode::AssignToConstant));
        }
        let resolved = self.symbols.lookup(&name);
        let ty = self.symbols.type_of(&name);
        if ty == Type::Void {
            return Err(CompilationError::new(tok.start, ErrorCode::InvalidAssignment));
        }
        self.emit(Instruction::with_xy(Opcode::Loada, resolved.level_delta, resolved.offset));
        let scan_op = match ty {
            Type::Int => Opcode::Iscan,
            Type::Double => Opcode::Dscan,
            Type::Char => Opcode::Cscan,
            Type::Void => unreachable!(),
        };
        self.emit(Instruction::new(scan_op));
        self.emit(Instruction::new(if ty == Type::Double {
            Opcode::Dstore
        } else {
            Opcode::Istore
        }));
        self.symbols.promote_to_initialized(&name);
        Ok(())
    }

    /// `print(expr [, expr]*);` — each argument is printed with the opcode
    /// matching its own type; a trailing `printl` emits the newline.
    pub(crate) fn translate_print(&mut self) -> Result<()> {
        self.expect(TokenKind::Print, ErrorCode::InvalidPrint)?;
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;
        if self.cursor.peek().kind != TokenKind::RParen {
            loop {
                self.translate_print_item()?;
                if self.cursor.peek().kind == TokenKind::Comma {
                    self.cursor.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;
        self.emit(Instruction::new(Opcode::Printl));
        Ok(())
    }

    /// Each printed item, string or numeric, is followed by a literal
    /// space character so consecutive `print` arguments read apart; the
    /// enclosing `printl` then supplies the trailing newline.
    fn translate_print_item(&mut self) -> Result<()> {
        if self.cursor.peek().kind == TokenKind::StringValue {
            let tok = self.cursor.next();
            let idx = self.pool.intern(&tok);
            self.emit(Instruction::with_x(Opcode::Loadc, idx as i32));
            self.emit(Instruction::new(Opcode::Sprint));
        } else {
            let pos = self.cursor.peek().start;
            let ty = self.translate_expression()?;
            let op = match ty {
                Type::Int => Opcode::Iprint,
                Type::Double => Opcode::Dprint,
                Type::Char => Opcode::Cprint,
                Type::Void => return Err(CompilationError::new(pos, ErrorCode::InvalidPrint)),
            };
            self.emit(Instruction::new(op));
        }
        self.emit(Instruction::with_x(Opcode::Bipush, b' ' as i32));
        self.emit(Instruction::new(Opcode::Cprint));
        Ok(())
    }

    /// A local `[const] type ident [= expr] (, ident [= expr])* ;` inside a
    /// function body or block.
    pub(crate) fn translate_local_declaration(&mut self) -> Result<()> {
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
            if self.cursor.peek().kind == TokenKind::Assign {
                self.cursor.next();
                let slot = self.symbols.next_slot();
                self.emit(Instruction::with_x(Opcode::Snew, ty.width()));
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
                self.emit(Instruction::with_x(Opcode::Snew, ty.width()));
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
}
