//! Token types for the script lexer.

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

/// The kind of token. Keywords are matched case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Loop,
    Oneshot,
    Every,
    Group,
    EndGroup,
    And,
    As,
    In,
    For,
    Ever,
    Forever,
    Object,

    // Literals
    Ident(String),
    Number(f64),
    Str(String),

    // Delimiters
    Star,
    Colon,
    Comma,
    Eq,
    LParen,
    RParen,
    DotDot,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_lowercase().as_str() {
            "loop" => TokenKind::Loop,
            "oneshot" => TokenKind::Oneshot,
            "every" => TokenKind::Every,
            "group" => TokenKind::Group,
            "endgroup" => TokenKind::EndGroup,
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "in" => TokenKind::In,
            "for" => TokenKind::For,
            "ever" => TokenKind::Ever,
            "forever" => TokenKind::Forever,
            "object" => TokenKind::Object,
            _ => return None,
        };
        Some(kind)
    }

    /// Human-readable form for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("'{s}'"),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Str(s) => format!("\"{s}\""),
            TokenKind::Star => "'*'".into(),
            TokenKind::Colon => "':'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Eq => "'='".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::DotDot => "'..'".into(),
            keyword => format!("keyword '{}'", format!("{keyword:?}").to_lowercase()),
        }
    }
}
