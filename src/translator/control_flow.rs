//! `if`/`while`/`do-while`/`for`/`switch`/`break`/`continue` lowering.
//!
//! All conditional forms funnel through [`Translator::translate_condition`]
//! from `expr.rs`, which returns the jump opcode to use when the condition
//! is false. Jump targets are back-patched by instruction index once both
//! branches have been emitted (§4.5, back-patch closure invariant).

use crate::error::{ErrorCode, Result};
use crate::instruction::{Instruction, Opcode};
use crate::token::TokenKind;

use super::state::Translator;

/// Loop a comma-separated list of `item` until something other than `,`
/// follows; used by `for`'s init and update clauses, each of which is
/// `item (, item)*` rather than a single one.
fn translate_comma_list(translator: &mut Translator, mut item: impl FnMut(&mut Translator) -> Result<()>) -> Result<()> {
    loop {
        item(translator)?;
        if translator.cursor.peek().kind == TokenKind::Comma {
            translator.cursor.next();
            continue;
        }
        break;
    }
    Ok(())
}

/// The jump taken when the condition holds, i.e. the complement of the
/// false-jump table in `translate_condition` — used by `do-while`, which
/// loops back on a *true* condition rather than skipping on a false one.
fn negate_jump(op: Opcode) -> Opcode {
    match op {
        Opcode::Je => Opcode::Jne,
        Opcode::Jne => Opcode::Je,
        Opcode::Jl => Opcode::Jge,
        Opcode::Jge => Opcode::Jl,
        Opcode::Jg => Opcode::Jle,
        Opcode::Jle => Opcode::Jg,
        other => other,
    }
}

impl Translator {
    pub(crate) fn translate_if(&mut self) -> Result<()> {
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;
        let jump_if_false = self.translate_condition()?;
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;

        let false_jump_ip = self.current_ip();
        self.emit(Instruction::new(jump_if_false));

        self.translate_statement()?;

        if self.cursor.peek().kind == TokenKind::Else {
            self.cursor.next();
            let skip_else_ip = self.current_ip();
            self.emit(Instruction::new(Opcode::Jmp));
            self.patch(false_jump_ip, self.current_ip() as i32);
            self.translate_statement()?;
            if !matches!(self.current.last(), Some(instr) if instr.op == Opcode::Nop) {
                self.emit(Instruction::new(Opcode::Nop));
            }
            self.patch(skip_else_ip, self.current_ip() as i32);
        } else {
            let nop_ip = self.current_ip();
            self.emit(Instruction::new(Opcode::Nop));
            self.patch(false_jump_ip, nop_ip as i32);
        }
        Ok(())
    }

    pub(crate) fn translate_while(&mut self) -> Result<()> {
        let begin = self.current_ip();
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;
        let jump_if_false = self.translate_condition()?;
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;

        let false_jump_ip = self.current_ip();
        self.emit(Instruction::new(jump_if_false));

        self.push_loop();
        self.translate_statement()?;
        let continue_label = self.current_ip();
        self.emit(Instruction::with_x(Opcode::Jmp, begin as i32));
        let break_label = self.current_ip();
        self.patch(false_jump_ip, break_label as i32);
        self.emit(Instruction::new(Opcode::Nop));

        let (breaks, continues) = self.pop_loop();
        for idx in breaks {
            self.patch(idx, break_label as i32);
        }
        for idx in continues {
            self.patch(idx, continue_label as i32);
        }
        Ok(())
    }

    pub(crate) fn translate_do_while(&mut self) -> Result<()> {
        let begin = self.current_ip();
        self.push_loop();
        self.translate_statement()?;
        let continue_label = self.current_ip();
        self.emit(Instruction::new(Opcode::Nop));

        self.expect(TokenKind::While, ErrorCode::ErrLoop)?;
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;
        let jump_if_false = self.translate_condition()?;
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;

        self.emit(Instruction::with_x(negate_jump(jump_if_false), begin as i32));
        let break_label = self.current_ip();
        self.emit(Instruction::new(Opcode::Nop));

        let (breaks, continues) = self.pop_loop();
        for idx in breaks {
            self.patch(idx, break_label as i32);
        }
        for idx in continues {
            self.patch(idx, continue_label as i32);
        }
        Ok(())
    }

    pub(crate) fn translate_for(&mut self) -> Result<()> {
        self.symbols.push_level(self.symbols.next_slot());
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;

        if self.cursor.peek().kind != TokenKind::Semicolon {
            self.translate_for_init()?;
        }
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;

        let begin = self.current_ip();
        let jump_if_false = if self.cursor.peek().kind != TokenKind::Semicolon {
            self.translate_condition()?
        } else {
            self.emit(Instruction::with_x(Opcode::Bipush, 1));
            Opcode::Je
        };
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;
        let false_jump_ip = self.current_ip();
        self.emit(Instruction::new(jump_if_false));

        let continue_label = self.current_ip();
        if self.cursor.peek().kind != TokenKind::RParen {
            self.translate_for_update()?;
        }
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;

        self.push_loop();
        self.translate_statement()?;
        self.emit(Instruction::with_x(Opcode::Jmp, begin as i32));

        let end = self.current_ip() as i32;
        self.patch(false_jump_ip, end);

        let (breaks, continues) = self.pop_loop();
        for idx in breaks {
            self.patch(idx, end);
        }
        for idx in continues {
            self.patch(idx, continue_label as i32);
        }

        self.symbols.pop_level();
        Ok(())
    }

    /// `<assignment-expression> (, <assignment-expression>)*`.
    fn translate_for_init(&mut self) -> Result<()> {
        translate_comma_list(self, |t| t.translate_assignment_expr())
    }

    /// `(<assignment-expression>|<function-call>) (, ditto)*`. A call's
    /// result, if any, is left on the stack uncollected, same as upstream.
    fn translate_for_update(&mut self) -> Result<()> {
        translate_comma_list(self, |t| t.translate_for_update_item())
    }

    fn translate_for_update_item(&mut self) -> Result<()> {
        let tok = self.expect(TokenKind::Identifier, ErrorCode::NeedIdentifier)?;
        if self.cursor.peek().kind == TokenKind::LParen {
            self.translate_call(&tok)?;
        } else {
            self.cursor.unread();
            self.translate_assignment_expr()?;
        }
        Ok(())
    }

    /// `switch (expr) { case const: stmts... default: stmts... }`.
    ///
    /// Each `case`/`default` body falls through to the next unless it ends
    /// in `break`; the discriminant is compared against each case constant
    /// in source order with a chain of equality tests, matching the `o0`
    /// instruction set's lack of a dedicated jump table.
    pub(crate) fn translate_switch(&mut self) -> Result<()> {
        self.expect(TokenKind::LParen, ErrorCode::IncompleteExpression)?;
        let discr_pos = self.cursor.peek().start;
        let discr_ty = self.translate_expression()?;
        if discr_ty != crate::types::Type::Int && discr_ty != crate::types::Type::Char {
            return Err(crate::error::CompilationError::new(
                discr_pos,
                ErrorCode::ErrInvalidSwitchType,
            ));
        }
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;
        self.expect(TokenKind::LBrace, ErrorCode::NoLeftBrace)?;

        self.push_switch();
        let mut seen_labels: Vec<i32> = Vec::new();
        let mut fall_outs: Vec<usize> = Vec::new();
        let mut default_seen = false;

        while self.cursor.peek().kind != TokenKind::RBrace {
            match self.cursor.peek().kind {
                TokenKind::Case => {
                    self.cursor.next();
                    let label_tok = self.cursor.peek().clone();
                    let label = match &label_tok.literal {
                        Some(crate::token::Literal::Int(v)) => *v,
                        Some(crate::token::Literal::Char(c)) => *c as i32,
                        _ => {
                            return Err(crate::error::CompilationError::new(
                                label_tok.start,
                                ErrorCode::ErrInvalidCaseType,
                            ))
                        }
                    };
                    if seen_labels.contains(&label) {
                        return Err(crate::error::CompilationError::new(
                            label_tok.start,
                            ErrorCode::ErrDupCase,
                        ));
                    }
                    seen_labels.push(label);
                    self.cursor.next();
                    self.expect(TokenKind::Colon, ErrorCode::ErrNeedColon)?;

                    self.emit(Instruction::new(Opcode::Dup));
                    self.emit(Instruction::with_x(Opcode::Ipush, label));
                    self.emit(Instruction::new(Opcode::Icmp));
                    let skip_ip = self.current_ip();
                    self.emit(Instruction::new(Opcode::Jne));

                    // The previous case's fall-out jump(s), if any, land
                    // here: right at this case's body, past its own
                    // comparison, so a fall-through runs the body directly.
                    let body_start = self.current_ip() as i32;
                    for idx in fall_outs.drain(..) {
                        self.patch(idx, body_start);
                    }

                    while !matches!(
                        self.cursor.peek().kind,
                        TokenKind::Case | TokenKind::Default | TokenKind::RBrace
                    ) {
                        self.translate_statement()?;
                    }

                    let fall_out_ip = self.current_ip();
                    self.emit(Instruction::new(Opcode::Jmp));
                    fall_outs.push(fall_out_ip);
                    self.patch(skip_ip, self.current_ip() as i32);
                }
                TokenKind::Default => {
                    if default_seen {
                        return Err(self.cursor.error_here(ErrorCode::ErrNeedCase));
                    }
                    default_seen = true;
                    self.cursor.next();
                    self.expect(TokenKind::Colon, ErrorCode::ErrNeedColon)?;
                    let default_start = self.current_ip() as i32;
                    for idx in fall_outs.drain(..) {
                        self.patch(idx, default_start);
                    }
                    while !matches!(
                        self.cursor.peek().kind,
                        TokenKind::Case | TokenKind::Default | TokenKind::RBrace
                    ) {
                        self.translate_statement()?;
                    }
                }
                _ => return Err(self.cursor.error_here(ErrorCode::ErrNeedCase)),
            }
        }
        self.expect(TokenKind::RBrace, ErrorCode::NoRightBrace)?;

        // No `default`, or the last case's fall-out still pending: lands on
        // the switch's end. The discriminant is never popped — it stays on
        // the stack for the rest of the enclosing scope, same as upstream.
        let end = self.current_ip() as i32;
        for idx in fall_outs {
            self.patch(idx, end);
        }
        self.pop_switch(end);
        Ok(())
    }

    pub(crate) fn translate_break(&mut self) -> Result<()> {
        let pos = self.cursor.peek().start;
        self.expect(TokenKind::Break, ErrorCode::ErrBreak)?;
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;
        if !self.in_loop_or_switch() {
            return Err(crate::error::CompilationError::new(pos, ErrorCode::ErrBreak));
        }
        self.record_break();
        self.emit(Instruction::new(Opcode::Jmp));
        Ok(())
    }

    pub(crate) fn translate_continue(&mut self) -> Result<()> {
        let pos = self.cursor.peek().start;
        self.expect(TokenKind::Continue, ErrorCode::ErrContinue)?;
        self.expect(TokenKind::Semicolon, ErrorCode::NoSemicolon)?;
        if !self.has_enclosing_loop() {
            return Err(crate::error::CompilationError::new(pos, ErrorCode::ErrContinue));
        }
        self.record_continue();
        self.emit(Instruction::new(Opcode::Jmp));
        Ok(())
    }
}
