//! Expression translation: the precedence-stratified
//! `expression → additive → multiplicative → cast → unary → primary`
//! grammar, fused with type inference, implicit conversion, and bytecode
//! emission. See §4.5's binary-operator staging discipline.

use crate::error::{CompilationError, ErrorCode, Result};
use crate::instruction::{Instruction, Opcode};
use crate::position::Position;
use crate::token::{Literal, Token, TokenKind};
use crate::types::Type;

use super::state::Translator;

#[derive(Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn opcode(self, is_double: bool) -> Opcode {
        use ArithOp::*;
        match (self, is_double) {
            (Add, false) => Opcode::Iadd,
            (Add, true) => Opcode::Dadd,
            (Sub, false) => Opcode::Isub,
            (Sub, true) => Opcode::Dsub,
            (Mul, false) => Opcode::Imul,
            (Mul, true) => Opcode::Dmul,
            (Div, false) => Opcode::Idiv,
            (Div, true) => Opcode::Ddiv,
        }
    }
}

#[derive(Clone, Copy)]
enum RelOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Translator {
    pub(crate) fn expect(&mut self, kind: TokenKind, err: ErrorCode) -> Result<Token> {
        if self.cursor.peek().kind == kind {
            Ok(self.cursor.next())
        } else {
            Err(self.cursor.error_here(err))
        }
    }

    /// Parse one of `int`/`double`/`char`/`void` and consume it.
    pub(crate) fn parse_type(&mut self) -> Result<Type> {
        let tok = self.cursor.peek().clone();
        let ty = match tok.kind {
            TokenKind::Int => Type::Int,
            TokenKind::Double => Type::Double,
            TokenKind::Char => Type::Char,
            TokenKind::Void => Type::Void,
            _ => return Err(self.cursor.error_here(ErrorCode::InvalidVariableType)),
        };
        self.cursor.next();
        Ok(ty)
    }

    /// Emit the instructions that convert a value of type `from` already on
    /// the stack to type `to`. Assumes neither side is `void`.
    pub(crate) fn emit_conversion(&mut self, from: Type, to: Type) {
        match (to, from) {
            (Type::Double, Type::Int) | (Type::Double, Type::Char) => {
                self.emit(Instruction::new(Opcode::I2d));
            }
            (Type::Int, Type::Double) => self.emit(Instruction::new(Opcode::D2i)),
            (Type::Char, Type::Int) => self.emit(Instruction::new(Opcode::I2c)),
            (Type::Char, Type::Double) => {
                self.emit(Instruction::new(Opcode::D2i));
                self.emit(Instruction::new(Opcode::I2c));
            }
            _ => {}
        }
    }

    /// Coerce a freshly evaluated value of type `from` to `to`, or fail
    /// with `err` at `pos` if either side is `void`.
    pub(crate) fn coerce(&mut self, from: Type, to: Type, pos: Position, err: ErrorCode) -> Result<()> {
        if from == Type::Void || to == Type::Void {
            return Err(CompilationError::new(pos, err));
        }
        self.emit_conversion(from, to);
        Ok(())
    }

    pub(crate) fn translate_expression(&mut self) -> Result<Type> {
        self.translate_additive()
    }

    fn translate_additive(&mut self) -> Result<Type> {
        let mut left_ty = self.translate_multiplicative()?;
        loop {
            let op = match self.cursor.peek().kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.cursor.next();
            left_ty = self.stage_binary(left_ty, Translator::translate_multiplicative, op)?;
        }
        Ok(left_ty)
    }

    fn translate_multiplicative(&mut self) -> Result<Type> {
        let mut left_ty = self.translate_cast()?;
        loop {
            let op = match self.cursor.peek().kind {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                _ => break,
            };
            self.cursor.next();
            left_ty = self.stage_binary(left_ty, Translator::translate_cast, op)?;
        }
        Ok(left_ty)
    }

    /// The binary-operator staging discipline (§4.5 steps 1-7): widen on
    /// the correct side of the operator regardless of which operand needs
    /// it, by translating the right-hand side into a scratch buffer.
    fn stage_binary(
        &mut self,
        left_ty: Type,
        translate_rhs: fn(&mut Translator) -> Result<Type>,
        op: ArithOp,
    ) -> Result<Type> {
        self.push_scratch();
        let right_ty = translate_rhs(self)?;
        let is_double = left_ty == Type::Double || right_ty == Type::Double;
        if left_ty != Type::Double && right_ty == Type::Double {
            self.emit_parent(Instruction::new(Opcode::I2d));
        }
        if right_ty != Type::Double && left_ty == Type::Double {
            self.emit(Instruction::new(Opcode::I2d));
        }
        self.emit(Instruction::new(op.opcode(is_double)));
        let scratch = self.pop_scratch();
        self.append(scratch);
        Ok(if is_double { Type::Double } else { Type::Int })
    }

    /// Same staging discipline, but for a relational comparison: widens
    /// both sides to a common numeric type and emits `icmp`/`dcmp`, which
    /// leaves `-1`/`0`/`+1` on the stack.
    fn stage_compare(&mut self, left_ty: Type, translate_rhs: fn(&mut Translator) -> Result<Type>) -> Result<()> {
        self.push_scratch();
        let right_ty = translate_rhs(self)?;
        let is_double = left_ty == Type::Double || right_ty == Type::Double;
        if left_ty != Type::Double && right_ty == Type::Double {
            self.emit_parent(Instruction::new(Opcode::I2d));
        }
        if right_ty != Type::Double && left_ty == Type::Double {
            self.emit(Instruction::new(Opcode::I2d));
        }
        self.emit(Instruction::new(if is_double { Opcode::Dcmp } else { Opcode::Icmp }));
        let scratch = self.pop_scratch();
        self.append(scratch);
        Ok(())
    }

    /// `expr [relop expr]`. Returns the opcode to jump with when the
    /// condition is false (the table in §4.5's "Condition lowering").
    pub(crate) fn translate_condition(&mut self) -> Result<Opcode> {
        let left_ty = self.translate_expression()?;
        let relop = match self.cursor.peek().kind {
            TokenKind::Eq => Some(RelOp::Eq),
            TokenKind::Neq => Some(RelOp::Neq),
            TokenKind::Lt => Some(RelOp::Lt),
            TokenKind::Le => Some(RelOp::Le),
            TokenKind::Gt => Some(RelOp::Gt),
            TokenKind::Ge => Some(RelOp::Ge),
            _ => None,
        };
        match relop {
            None => Ok(Opcode::Je),
            Some(op) => {
                self.cursor.next();
                self.stage_compare(left_ty, Translator::translate_expression)?;
                Ok(match op {
                    RelOp::Eq => Opcode::Jne,
                    RelOp::Neq => Opcode::Je,
                    RelOp::Lt => Opcode::Jge,
                    RelOp::Le => Opcode::Jg,
                    RelOp::Gt => Opcode::Jle,
                    RelOp::Ge => Opcode::Jl,
                })
            }
        }
    }

    fn translate_cast(&mut self) -> Result<Type> {
        let mut casts: Vec<(Type, Position)> = Vec::new();
        loop {
            if self.cursor.peek().kind == TokenKind::LParen && self.cursor.peek_at(1).kind.starts_type() {
                let paren = self.cursor.next();
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen, ErrorCode::InvalidType)?;
                casts.push((ty, paren.start));
            } else {
                break;
            }
        }
        let mut current_ty = self.translate_unary()?;
        for (ty, pos) in casts.into_iter().rev() {
            if ty == Type::Void || current_ty == Type::Void {
                return Err(CompilationError::new(pos, ErrorCode::InvalidType));
            }
            self.emit_conversion(current_ty, ty);
            current_ty = ty;
        }
        Ok(current_ty)
    }

    fn translate_unary(&mut self) -> Result<Type> {
        let negate = match self.cursor.peek().kind {
            TokenKind::Plus => {
                self.cursor.next();
                false
            }
            TokenKind::Minus => {
                self.cursor.next();
                true
            }
            _ => false,
        };
        let mut ty = self.translate_primary()?;
        if negate {
            if ty == Type::Char {
                ty = Type::Int;
            }
            let op = if ty == Type::Double { Opcode::Dneg } else { Opcode::Ineg };
            self.emit(Instruction::new(op));
        }
        Ok(ty)
    }

    fn translate_primary(&mut self) -> Result<Type> {
        let tok = self.cursor.peek().clone();
        match tok.kind {
            TokenKind::LParen => {
                self.cursor.next();
                let ty = self.translate_expression()?;
                self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;
                Ok(ty)
            }
            TokenKind::UnsignedInteger => {
                self.cursor.next();
                let v = match tok.literal {
                    Some(Literal::Int(v)) => v,
                    _ => unreachable!(),
                };
                self.emit(Instruction::with_x(Opcode::Ipush, v));
                Ok(Type::Int)
            }
            TokenKind::Hexadecimal => {
                self.cursor.next();
                let idx = self.pool.intern(&tok);
                self.emit(Instruction::with_x(Opcode::Loadc, idx as i32));
                Ok(Type::Int)
            }
            TokenKind::CharValue => {
                self.cursor.next();
                let b = match tok.literal {
                    Some(Literal::Char(b)) => b,
                    _ => unreachable!(),
                };
                self.emit(Instruction::with_x(Opcode::Bipush, b as i32));
                Ok(Type::Char)
            }
            TokenKind::DoubleValue => {
                self.cursor.next();
                let idx = self.pool.intern(&tok);
                self.emit(Instruction::with_x(Opcode::Loadc, idx as i32));
                Ok(Type::Double)
            }
            TokenKind::Identifier => {
                self.cursor.next();
                if self.cursor.peek().kind == TokenKind::LParen {
                    self.translate_call(&tok)
                } else {
                    self.translate_identifier_use(&tok)
                }
            }
            _ => Err(self.cursor.error_here(ErrorCode::IncompleteExpression)),
        }
    }

    fn translate_identifier_use(&mut self, tok: &Token) -> Result<Type> {
        let name = tok.spelling();
        if !self.symbols.is_visible(&name) {
            return Err(CompilationError::new(tok.start, ErrorCode::NotDeclared));
        }
        if !self.symbols.is_initialized(&name) {
            return Err(CompilationError::new(tok.start, ErrorCode::NotInitialized));
        }
        let resolved = self.symbols.lookup(&name);
        let ty = self.symbols.type_of(&name);
        self.emit(Instruction::with_xy(Opcode::Loada, resolved.level_delta, resolved.offset));
        self.emit(Instruction::new(if ty == Type::Double {
            Opcode::Dload
        } else {
            Opcode::Iload
        }));
        Ok(ty)
    }

    pub(crate) fn translate_call(&mut self, tok: &Token) -> Result<Type> {
        let name = tok.spelling();
        let index = self
            .functions
            .lookup(&name)
            .ok_or_else(|| CompilationError::new(tok.start, ErrorCode::NotDeclared))?;
        self.cursor.next(); // consume '('
        let (return_ty, param_types) = {
            let (r, p) = self.functions.signature(index);
            (r, p.to_vec())
        };
        let mut count = 0usize;
        if self.cursor.peek().kind != TokenKind::RParen {
            loop {
                let arg_pos = self.cursor.peek().start;
                let arg_ty = self.translate_expression()?;
                if count >= param_types.len() {
                    return Err(CompilationError::new(arg_pos, ErrorCode::InvalidFunctionParamCount));
                }
                self.coerce(arg_ty, param_types[count], arg_pos, ErrorCode::InvalidFunctionParamType)?;
                count += 1;
                if self.cursor.peek().kind == TokenKind::Comma {
                    self.cursor.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, ErrorCode::IncompleteExpression)?;
        if count != param_types.len() {
            return Err(CompilationError::new(tok.start, ErrorCode::InvalidFunctionParamCount));
        }
        self.emit(Instruction::with_x(Opcode::Call, index as i32));
        Ok(return_ty)
    }
}
