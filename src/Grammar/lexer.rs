//! Tokenizer shared by the model-description parser and the rule-language reader.
//!
//! The two surface syntaxes differ only in comments: the model-description language
//! uses `//` and `/* */` comments and gives `#` a meaning (hashed extension sections),
//! while the rule language treats `#` as a line comment and joins lines ending in `\`.
use super::GrammarError;
use serde::Serialize;

/// Byte range of a token plus the 1-based line/column of its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    /// smallest span covering both
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    ModelDescription,
    RuleLanguage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    Str(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Equals,
    Tilde,
    Bang,
    Question,
    At,
    Colon,
    Semicolon,
    Quote,
    Hash,
    Amp,
    Less,
    Greater,
    Arrow,
    BiArrow,
    FatArrow,
    Newline,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier '{}'", s),
            TokenKind::Number(s) => format!("number '{}'", s),
            TokenKind::Str(s) => format!("string \"{}\"", s),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Caret => "^",
            TokenKind::Equals => "=",
            TokenKind::Tilde => "~",
            TokenKind::Bang => "!",
            TokenKind::Question => "?",
            TokenKind::At => "@",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Quote => "'",
            TokenKind::Hash => "#",
            TokenKind::Amp => "&",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::Arrow => "->",
            TokenKind::BiArrow => "<->",
            TokenKind::FatArrow => "=>",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    mode: LexMode,
}

/// Splits `src` into tokens. The last token is always `Eof`.
pub fn tokenize(src: &str, mode: LexMode) -> Result<Vec<Token>, GrammarError> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
        mode,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    Ok(tokens)
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span_from(&self, start: usize, line: usize, column: usize) -> Span {
        Span {
            start,
            end: self.pos,
            line,
            column,
        }
    }

    fn error_here(&self, message: &str, start: usize, line: usize, column: usize) -> GrammarError {
        let span = self.span_from(start, line, column);
        GrammarError::new(message, span, self.src)
    }

    /// skips blanks and comments, never newlines
    fn skip_trivia(&mut self) -> Result<(), GrammarError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b' '), _) | (Some(b'\t'), _) | (Some(b'\r'), _) => {
                    self.bump();
                }
                (Some(b'\\'), Some(b'\n')) if self.mode == LexMode::RuleLanguage => {
                    self.bump();
                    self.bump();
                }
                (Some(b'\\'), Some(b'\r')) if self.mode == LexMode::RuleLanguage => {
                    self.bump();
                    self.bump();
                    if self.peek() == Some(b'\n') {
                        self.bump();
                    }
                }
                (Some(b'#'), _) if self.mode == LexMode::RuleLanguage => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some(b'/'), Some(b'/')) if self.mode == LexMode::ModelDescription => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some(b'/'), Some(b'*')) if self.mode == LexMode::ModelDescription => {
                    let (start, line, column) = (self.pos, self.line, self.column);
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == b'*' && self.peek() == Some(b'/') {
                            self.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(self.error_here("unterminated block comment", start, line, column));
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, GrammarError> {
        self.skip_trivia()?;
        let (start, line, column) = (self.pos, self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: self.span_from(start, line, column),
            });
        };

        let kind = if c.is_ascii_alphabetic() || c == b'_' {
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == b'_' {
                    self.bump();
                } else {
                    break;
                }
            }
            TokenKind::Ident(self.src[start..self.pos].to_string())
        } else if c.is_ascii_digit() || (c == b'.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            self.lex_number();
            TokenKind::Number(self.src[start..self.pos].to_string())
        } else if c == b'"' {
            self.bump();
            let body_start = self.pos;
            loop {
                match self.peek() {
                    Some(b'"') => break,
                    Some(b'\n') | None => {
                        return Err(self.error_here("unterminated string literal", start, line, column));
                    }
                    Some(_) => {
                        self.bump();
                    }
                }
            }
            let body = self.src[body_start..self.pos].to_string();
            self.bump();
            TokenKind::Str(body)
        } else {
            self.bump();
            match c {
                b'\n' => TokenKind::Newline,
                b'{' => TokenKind::LBrace,
                b'}' => TokenKind::RBrace,
                b'[' => TokenKind::LBracket,
                b']' => TokenKind::RBracket,
                b'(' => TokenKind::LParen,
                b')' => TokenKind::RParen,
                b',' => TokenKind::Comma,
                b'.' => TokenKind::Dot,
                b'+' => TokenKind::Plus,
                b'*' => TokenKind::Star,
                b'/' => TokenKind::Slash,
                b'^' => TokenKind::Caret,
                b'~' => TokenKind::Tilde,
                b'!' => TokenKind::Bang,
                b'?' => TokenKind::Question,
                b'@' => TokenKind::At,
                b':' => TokenKind::Colon,
                b';' => TokenKind::Semicolon,
                b'\'' => TokenKind::Quote,
                b'#' => TokenKind::Hash,
                b'&' => TokenKind::Amp,
                b'>' => TokenKind::Greater,
                b'-' => {
                    if self.peek() == Some(b'>') {
                        self.bump();
                        TokenKind::Arrow
                    } else {
                        TokenKind::Minus
                    }
                }
                b'=' => {
                    if self.peek() == Some(b'>') {
                        self.bump();
                        TokenKind::FatArrow
                    } else {
                        TokenKind::Equals
                    }
                }
                b'<' => {
                    if self.peek() == Some(b'-') && self.peek_at(1) == Some(b'>') {
                        self.bump();
                        self.bump();
                        TokenKind::BiArrow
                    } else {
                        TokenKind::Less
                    }
                }
                _ => {
                    return Err(self.error_here(
                        &format!("unexpected character '{}'", c as char),
                        start,
                        line,
                        column,
                    ));
                }
            }
        };
        Ok(Token {
            kind,
            span: self.span_from(start, line, column),
        })
    }

    fn lex_number(&mut self) {
        while self.peek().is_some_and(|d| d.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_none_or(|d| !d.is_ascii_alphabetic() || d == b'e' || d == b'E') {
            self.bump();
            while self.peek().is_some_and(|d| d.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let sign = matches!(self.peek_at(1), Some(b'+') | Some(b'-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|d| d.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.bump();
                }
                while self.peek().is_some_and(|d| d.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
    }
}
