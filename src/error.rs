//! Compilation error taxonomy.
//!
//! Mirrors the manual `Display`-impl error pattern used for code generation
//! errors elsewhere in this kind of compiler: a flat enum with a fixed
//! message string per variant, no `thiserror`.

use crate::position::Position;

/// The closed error taxonomy from the c0 error reference (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Eof,
    InvalidInput,
    InvalidIdentifier,
    IntegerOverflow,
    NeedIdentifier,
    ConstantNeedValue,
    NoSemicolon,
    InvalidVariableDeclaration,
    IncompleteExpression,
    NotDeclared,
    AssignToConstant,
    DuplicateDeclaration,
    NotInitialized,
    InvalidAssignment,
    InvalidPrint,
    InvalidFunctionParamType,
    InvalidFunctionParamCount,
    InvalidType,
    InvalidVariableType,
    NoLeftBrace,
    NoRightBrace,
    StatementSequence,
    ErrLoop,
    ErrBreak,
    ErrContinue,
    ErrReturnWrong,
    ErrNeedCase,
    ErrNeedColon,
    ErrDupCase,
    ErrInvalidCaseType,
    ErrInvalidSwitchType,
    ErrInvalidInput,
}

impl ErrorCode {
    /// Fixed message string, as printed in the listing/driver output.
    pub fn message(self) -> &'static str {
        use ErrorCode::*;
        match self {
            Eof => "unexpected end of file",
            InvalidInput => "invalid input",
            InvalidIdentifier => "invalid identifier",
            IntegerOverflow => "integer literal overflow",
            NeedIdentifier => "expected an identifier",
            ConstantNeedValue => "constant declaration needs an initial value",
            NoSemicolon => "expected ';'",
            InvalidVariableDeclaration => "invalid variable declaration",
            IncompleteExpression => "incomplete expression",
            NotDeclared => "identifier not declared",
            AssignToConstant => "cannot assign to a constant",
            DuplicateDeclaration => "duplicate declaration",
            NotInitialized => "use of uninitialized variable",
            InvalidAssignment => "invalid assignment",
            InvalidPrint => "invalid argument to print",
            InvalidFunctionParamType => "invalid function parameter type",
            InvalidFunctionParamCount => "invalid function parameter count",
            InvalidType => "invalid type",
            InvalidVariableType => "invalid variable type",
            NoLeftBrace => "expected '{'",
            NoRightBrace => "expected '}'",
            StatementSequence => "invalid statement",
            ErrLoop => "invalid loop",
            ErrBreak => "'break' outside of a loop or switch",
            ErrContinue => "'continue' outside of a loop",
            ErrReturnWrong => "invalid return statement",
            ErrNeedCase => "expected 'case' or 'default'",
            ErrNeedColon => "expected ':'",
            ErrDupCase => "duplicate case label",
            ErrInvalidCaseType => "invalid case label type",
            ErrInvalidSwitchType => "invalid switch discriminant type",
            ErrInvalidInput => "invalid input",
        }
    }
}

/// A compilation error at a source position. Translation aborts on the
/// first one; there is no recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilationError {
    pub position: Position,
    pub code: ErrorCode,
}

impl CompilationError {
    pub fn new(position: Position, code: ErrorCode) -> Self {
        CompilationError { position, code }
    }
}

impl std::fmt::Display for CompilationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Syntactic analysis error: {} Error: {}",
            self.position,
            self.code.message()
        )
    }
}

impl std::error::Error for CompilationError {}

pub type Result<T> = std::result::Result<T, CompilationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_driver_format() {
        let err = CompilationError::new(Position::new(3, 7), ErrorCode::NotDeclared);
        assert_eq!(
            err.to_string(),
            "Syntactic analysis error: Line: 3 Column: 7 Error: identifier not declared"
        );
    }
}
