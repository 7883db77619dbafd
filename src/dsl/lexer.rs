//! Lexer for the script language.
//!
//! Scripts are line-oriented: [`split_lines`] turns the source into
//! indented [`SourceLine`]s with comments and blank lines removed, and
//! [`Lexer`] turns the content of one line into [`Token`]s.

use super::error::Diagnostic;
use super::token::{Token, TokenKind};

/// Width of a tab when measuring indentation.
pub const TAB_WIDTH: usize = 4;

/// One non-blank line of source, comment removed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: usize,
    /// Indentation width (tabs count as [`TAB_WIDTH`]).
    pub indent: usize,
    /// 1-based column of the first content character.
    pub col: usize,
    /// Content without leading indentation, comment, or trailing space.
    pub text: String,
}

impl SourceLine {
    /// First word of the line, lower-cased.
    pub fn first_word(&self) -> String {
        self.text
            .split(|c: char| c.is_whitespace() || matches!(c, ':' | '*' | '"' | '=' | '('))
            .next()
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    pub fn tokenize(&self) -> Result<Vec<Token>, Diagnostic> {
        Lexer::new(&self.text, self.number, self.col).tokenize()
    }
}

/// Split source into content lines, dropping blanks and `#` comments.
pub fn split_lines(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let content = strip_comment(raw);
            let trimmed = content.trim_start();
            let text = trimmed.trim_end();
            if text.is_empty() {
                return None;
            }
            let leading = &content[..content.len() - trimmed.len()];
            let indent = leading
                .chars()
                .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
                .sum();
            Some(SourceLine {
                number: idx + 1,
                indent,
                col: leading.chars().count() + 1,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Cut a line at the first `#` that is not inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..idx],
            _ => {}
        }
    }
    line
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str, line: usize, col: usize) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line,
            col,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }

            let ch = self.peek();
            let token = match ch {
                '*' => self.single_char(TokenKind::Star),
                ':' => self.single_char(TokenKind::Colon),
                ',' => self.single_char(TokenKind::Comma),
                '=' => self.single_char(TokenKind::Eq),
                '(' => self.single_char(TokenKind::LParen),
                ')' => self.single_char(TokenKind::RParen),
                '"' => self.lex_string()?,
                '.' if self.peek_next() == Some('.') => {
                    let col = self.col;
                    self.advance();
                    self.advance();
                    Token {
                        kind: TokenKind::DotDot,
                        line: self.line,
                        col,
                    }
                }
                '.' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number()?
                }
                '-' if self
                    .peek_next()
                    .is_some_and(|c| c.is_ascii_digit() || c == '.') =>
                {
                    self.lex_number()?
                }
                '0'..='9' => self.lex_number()?,
                c if c.is_alphabetic() || c == '_' => self.lex_ident_or_keyword(),
                _ => {
                    return Err(Diagnostic::error(
                        format!("unexpected character: '{ch}'"),
                        self.line,
                        self.col,
                    ));
                }
            };

            tokens.push(token);
        }

        Ok(tokens)
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        self.col += 1;
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let col = self.col;
        self.advance();
        Token {
            kind,
            line: self.line,
            col,
        }
    }

    fn lex_string(&mut self) -> Result<Token, Diagnostic> {
        let col = self.col;
        self.advance(); // opening '"'
        let mut s = String::new();
        while !self.is_at_end() && self.peek() != '"' {
            s.push(self.advance());
        }
        if self.is_at_end() {
            return Err(Diagnostic::error("unmatched quote", self.line, col));
        }
        self.advance(); // closing '"'
        Ok(Token {
            kind: TokenKind::Str(s),
            line: self.line,
            col,
        })
    }

    fn lex_number(&mut self) -> Result<Token, Diagnostic> {
        let col = self.col;
        let mut s = String::new();

        if self.peek() == '-' {
            s.push(self.advance());
        }
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance());
        }
        // A single '.' is a decimal point; '..' is the range delimiter.
        if !self.is_at_end() && self.peek() == '.' && self.peek_next() != Some('.') {
            s.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance());
            }
        }

        let value: f64 = s
            .parse()
            .map_err(|_| Diagnostic::error(format!("invalid number: {s}"), self.line, col))?;
        Ok(Token {
            kind: TokenKind::Number(value),
            line: self.line,
            col,
        })
    }

    fn lex_ident_or_keyword(&mut self) -> Token {
        let col = self.col;
        let mut s = String::new();
        while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
            s.push(self.advance());
        }
        let kind = TokenKind::keyword(&s).unwrap_or(TokenKind::Ident(s));
        Token {
            kind,
            line: self.line,
            col,
        }
    }
}
