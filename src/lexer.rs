//! Source text to token stream. Not part of the syntax-directed translator
//! proper, but a complete crate needs a real one rather than a stub: one
//! tokenization pass producing [`Token`]s with source spans, the way the
//! original analyser's collaborator tokenizer does.

use crate::error::{CompilationError, ErrorCode, Result};
use crate::position::Position;
use crate::token::{Literal, Token, TokenKind};

pub struct Lexer<'a> {
    bytes: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            bytes: source.as_bytes(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(source: &'a str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    fn peek_byte_at(&self, delta: usize) -> Option<u8> {
        self.bytes.get(self.offset + delta).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_byte_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek_byte() {
                        if b == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_byte_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek_byte() {
                            None => break,
                            Some(b'*') if self.peek_byte_at(1) == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();
        let start = self.pos();
        let Some(b) = self.peek_byte() else {
            return Ok(Token::new(TokenKind::Eof, start, start));
        };

        if b.is_ascii_digit() {
            return self.scan_number(start);
        }
        if b == b'_' || b.is_ascii_alphabetic() {
            return self.scan_identifier(start);
        }
        if b == b'\'' {
            return self.scan_char(start);
        }
        if b == b'"' {
            return self.scan_string(start);
        }
        self.scan_punct(start)
    }

    fn scan_identifier(&mut self, start: Position) -> Result<Token> {
        let mut text = String::new();
        while let Some(b) = self.peek_byte() {
            if b == b'_' || b.is_ascii_alphanumeric() {
                text.push(b as char);
                self.advance();
            } else {
                break;
            }
        }
        let end = self.pos();
        if let Some(kw) = TokenKind::keyword_from_str(&text) {
            return Ok(Token::new(kw, start, end));
        }
        Ok(Token::with_literal(
            TokenKind::Identifier,
            start,
            end,
            Literal::Ident(text),
        ))
    }

    fn scan_number(&mut self, start: Position) -> Result<Token> {
        if self.peek_byte() == Some(b'0')
            && matches!(self.peek_byte_at(1), Some(b'x') | Some(b'X'))
        {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(b) = self.peek_byte() {
                if b.is_ascii_hexdigit() {
                    digits.push(b as char);
                    self.advance();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(CompilationError::new(start, ErrorCode::InvalidInput));
            }
            let end = self.pos();
            let value = u32::from_str_radix(&digits, 16)
                .map_err(|_| CompilationError::new(start, ErrorCode::IntegerOverflow))?;
            return Ok(Token::with_literal(
                TokenKind::Hexadecimal,
                start,
                end,
                Literal::Int(value as i32),
            ));
        }

        let mut digits = String::new();
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_digit() {
                digits.push(b as char);
                self.advance();
            } else {
                break;
            }
        }

        let mut is_double = false;
        if self.peek_byte() == Some(b'.')
            && self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit())
        {
            is_double = true;
            digits.push('.');
            self.advance();
            while let Some(b) = self.peek_byte() {
                if b.is_ascii_digit() {
                    digits.push(b as char);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            let mut lookahead = 1;
            let mut exp = String::new();
            exp.push(self.peek_byte().unwrap() as char);
            if matches!(self.peek_byte_at(1), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if self
                .peek_byte_at(lookahead)
                .is_some_and(|b| b.is_ascii_digit())
            {
                is_double = true;
                for _ in 0..lookahead {
                    digits.push(self.advance().unwrap() as char);
                }
                while let Some(b) = self.peek_byte() {
                    if b.is_ascii_digit() {
                        digits.push(b as char);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let end = self.pos();
        if is_double {
            let value: f64 = digits
                .parse()
                .map_err(|_| CompilationError::new(start, ErrorCode::InvalidInput))?;
            Ok(Token::with_literal(
                TokenKind::DoubleValue,
                start,
                end,
                Literal::Double(value),
            ))
        } else {
            let value: i64 = digits
                .parse()
                .map_err(|_| CompilationError::new(start, ErrorCode::IntegerOverflow))?;
            let value = u32::try_from(value)
                .map_err(|_| CompilationError::new(start, ErrorCode::IntegerOverflow))?;
            Ok(Token::with_literal(
                TokenKind::UnsignedInteger,
                start,
                end,
                Literal::Int(value as i32),
            ))
        }
    }

    fn scan_escape(&mut self, start: Position) -> Result<u8> {
        match self.advance() {
            Some(b'n') => Ok(b'\n'),
            Some(b'r') => Ok(b'\r'),
            Some(b't') => Ok(b'\t'),
            Some(b'\\') => Ok(b'\\'),
            Some(b'\'') => Ok(b'\''),
            Some(b'"') => Ok(b'"'),
            Some(b'0') => Ok(0),
            _ => Err(CompilationError::new(start, ErrorCode::InvalidInput)),
        }
    }

    fn scan_char(&mut self, start: Position) -> Result<Token> {
        self.advance(); // opening '
        let value = match self.peek_byte() {
            Some(b'\\') => {
                self.advance();
                self.scan_escape(start)?
            }
            Some(b) if b != b'\'' => {
                self.advance();
                b
            }
            _ => return Err(CompilationError::new(start, ErrorCode::InvalidInput)),
        };
        if self.peek_byte() != Some(b'\'') {
            return Err(CompilationError::new(start, ErrorCode::InvalidInput));
        }
        self.advance();
        let end = self.pos();
        Ok(Token::with_literal(
            TokenKind::CharValue,
            start,
            end,
            Literal::Char(value),
        ))
    }

    fn scan_string(&mut self, start: Position) -> Result<Token> {
        self.advance(); // opening "
        let mut text = String::new();
        loop {
            match self.peek_byte() {
                None => return Err(CompilationError::new(start, ErrorCode::InvalidInput)),
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    text.push(self.scan_escape(start)? as char);
                }
                Some(b) => {
                    self.advance();
                    text.push(b as char);
                }
            }
        }
        let end = self.pos();
        Ok(Token::with_literal(
            TokenKind::StringValue,
            start,
            end,
            Literal::Str(text),
        ))
    }

    fn scan_punct(&mut self, start: Position) -> Result<Token> {
        let b = self.advance().unwrap();
        let kind = match b {
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'=' => {
                if self.peek_byte() == Some(b'=') {
                    self.advance();
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.peek_byte() == Some(b'=') {
                    self.advance();
                    TokenKind::Neq
                } else {
                    return Err(CompilationError::new(start, ErrorCode::InvalidInput));
                }
            }
            b'<' => {
                if self.peek_byte() == Some(b'=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.peek_byte() == Some(b'=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            _ => return Err(CompilationError::new(start, ErrorCode::InvalidInput)),
        };
        Ok(Token::new(kind, start, self.pos()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_declaration() {
        let kinds = kinds("int a = 1;");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::UnsignedInteger,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        let kinds = kinds("int a; // trailing\n/* block */ int b;");
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Int).count(), 2);
    }

    #[test]
    fn hex_literal_is_tagged_hexadecimal() {
        let toks = Lexer::tokenize("0x1F").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Hexadecimal);
        assert_eq!(toks[0].literal, Some(Literal::Int(31)));
    }

    #[test]
    fn double_literal_round_trips() {
        let toks = Lexer::tokenize("3.5").unwrap();
        assert_eq!(toks[0].kind, TokenKind::DoubleValue);
        assert_eq!(toks[0].literal, Some(Literal::Double(3.5)));
    }

    #[test]
    fn unterminated_string_is_invalid_input() {
        let err = Lexer::tokenize("\"abc").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn keywords_are_not_identifiers() {
        let toks = Lexer::tokenize("while").unwrap();
        assert_eq!(toks[0].kind, TokenKind::While);
    }
}
