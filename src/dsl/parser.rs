//! Parser for the script language.
//!
//! Scripts are indentation-scoped, so parsing works line by line: each
//! [`SourceLine`] is classified by its first word, then headers and
//! interpolation calls are tokenized and parsed with a small cursor.
//! Errors never abort the whole script. A bad header drops that statement
//! and its body; a bad property line drops only that property.

use std::sync::Arc;

use tracing::debug;

use super::ast::*;
use super::error::Diagnostic;
use super::lexer::{split_lines, Lexer, SourceLine};
use super::token::{Token, TokenKind};
use crate::ease::Ease;
use crate::interp::{Interpolation, InterpolationType};
use crate::value::RangeOrValue;

/// Knobs that change how strictly scripts are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject interpolations naming an unknown ease instead of using linear.
    pub strict_easing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Group,
    EndGroup,
    Statement,
    Property,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Statement,
    Group,
}

fn classify(line: &SourceLine) -> LineKind {
    let word = line.first_word();
    match word.as_str() {
        "group" => LineKind::Group,
        "endgroup" => LineKind::EndGroup,
        "loop" | "oneshot" => LineKind::Statement,
        w if w.starts_with(|c: char| c.is_ascii_digit()) && line.text.contains('*') => {
            LineKind::Statement
        }
        _ if line.text.contains('=') => LineKind::Property,
        _ => LineKind::Unknown,
    }
}

pub struct Parser {
    lines: Vec<SourceLine>,
    pos: usize,
    options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(source: &str, options: ParseOptions) -> Self {
        Self {
            lines: split_lines(source),
            pos: 0,
            options,
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(mut self) -> (Script, Vec<Diagnostic>) {
        let mut items = Vec::new();

        while let Some(line) = self.current().cloned() {
            match classify(&line) {
                LineKind::Group => {
                    if let Some(group) = self.parse_group() {
                        items.push(Item::Group(group));
                    }
                }
                LineKind::Statement => {
                    if let Some(stmt) = self.parse_statement() {
                        items.push(Item::Statement(stmt));
                    }
                }
                LineKind::EndGroup => {
                    self.warn(&line, "'endgroup' without an open group");
                    self.pos += 1;
                }
                LineKind::Property => {
                    self.error(&line, "property outside of a statement or group");
                    self.pos += 1;
                }
                LineKind::Unknown => {
                    self.error(&line, format!("unrecognised line: {}", line.text));
                    self.pos += 1;
                }
            }
        }

        (Script { items }, self.diagnostics)
    }

    fn current(&self) -> Option<&SourceLine> {
        self.lines.get(self.pos)
    }

    fn error(&mut self, line: &SourceLine, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(message, line.number, line.col));
    }

    fn warn(&mut self, line: &SourceLine, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::warning(message, line.number, line.col));
    }

    /// Skip every line indented deeper than `indent`.
    fn skip_block(&mut self, indent: usize) {
        while self.current().is_some_and(|l| l.indent > indent) {
            self.pos += 1;
        }
    }

    // ── statements ──────────────────────────────────────────────

    fn parse_statement(&mut self) -> Option<StatementDef> {
        let header = self.current()?.clone();
        self.pos += 1;

        let parsed = header
            .tokenize()
            .and_then(|tokens| parse_statement_header(Cursor::new(tokens, &header)));
        let (kind, clip, count, every) = match parsed {
            Ok(h) => h,
            Err(diag) => {
                self.diagnostics.push(diag);
                self.skip_statement_body(header.indent);
                return None;
            }
        };

        let mut props = PropertyBlock {
            every,
            ..PropertyBlock::default()
        };

        while let Some(line) = self.current().cloned() {
            if line.indent <= header.indent {
                break;
            }
            match classify(&line) {
                LineKind::Property => {
                    self.apply_property(&mut props, &line, Scope::Statement);
                    self.pos += 1;
                }
                LineKind::Unknown => {
                    self.error(&line, format!("expected 'key = value', got: {}", line.text));
                    self.pos += 1;
                }
                LineKind::Group | LineKind::Statement | LineKind::EndGroup => break,
            }
        }

        debug!(line = header.number, kind = kind.name(), clip = %clip, "parsed statement");
        Some(StatementDef {
            kind,
            clip,
            count,
            props,
            line: header.number,
        })
    }

    fn skip_statement_body(&mut self, indent: usize) {
        while let Some(line) = self.current() {
            if line.indent <= indent || classify(line) != LineKind::Property {
                break;
            }
            self.pos += 1;
        }
    }

    // ── groups ──────────────────────────────────────────────────

    fn parse_group(&mut self) -> Option<GroupDef> {
        let header = self.current()?.clone();
        self.pos += 1;

        let name = match header
            .tokenize()
            .and_then(|tokens| parse_group_header(Cursor::new(tokens, &header)))
        {
            Ok(name) => name,
            Err(diag) => {
                self.diagnostics.push(diag);
                self.skip_block(header.indent);
                if self
                    .current()
                    .is_some_and(|l| classify(l) == LineKind::EndGroup)
                {
                    self.pos += 1;
                }
                return None;
            }
        };

        let mut group = GroupDef {
            name,
            line: header.number,
            props: PropertyBlock::default(),
            children: Vec::new(),
        };

        while let Some(line) = self.current().cloned() {
            let kind = classify(&line);
            if kind != LineKind::EndGroup && line.indent <= header.indent {
                break;
            }
            match kind {
                LineKind::EndGroup => {
                    self.pos += 1;
                    break;
                }
                LineKind::Statement => {
                    if let Some(child) = self.parse_statement() {
                        group.children.push(child);
                    }
                }
                LineKind::Property => {
                    self.apply_property(&mut group.props, &line, Scope::Group);
                    self.pos += 1;
                }
                LineKind::Group => {
                    self.error(&line, "groups cannot be nested");
                    self.pos += 1;
                    self.skip_block(line.indent);
                }
                LineKind::Unknown => {
                    self.error(&line, format!("unrecognised line: {}", line.text));
                    self.pos += 1;
                }
            }
        }

        if group.children.is_empty() {
            self.warn(&header, format!("group '{}' has no statements", group.name));
        }
        Some(group)
    }

    // ── properties ──────────────────────────────────────────────

    fn apply_property(&mut self, props: &mut PropertyBlock, line: &SourceLine, scope: Scope) {
        let Some((raw_key, raw_value)) = line.text.split_once('=') else {
            self.error(line, "expected 'key = value'");
            return;
        };
        let key = raw_key.trim().to_ascii_lowercase();
        let value = raw_value.trim();
        let value_col = line.col + line.text.len() - raw_value.trim_start().len();

        if value.is_empty() {
            self.error(line, format!("missing value for '{key}'"));
            return;
        }

        let result = match key.as_str() {
            "volume" => self.parse_axis(value, line.number, value_col).map(|axis| {
                props.volume = Some(axis);
            }),
            "pitch" => self.parse_axis(value, line.number, value_col).map(|axis| {
                props.pitch = Some(axis);
            }),
            "starts_at" => parse_value(value, line.number, value_col).map(|v| {
                props.starts_at = Some(v);
            }),
            "duration" => parse_value(value, line.number, value_col).map(|v| {
                props.duration = Some(v);
            }),
            "fade_in" => parse_value(value, line.number, value_col).map(|v| {
                props.fade_in = Some(v);
            }),
            "fade_out" => parse_value(value, line.number, value_col).map(|v| {
                props.fade_out = Some(v);
            }),
            "every" => parse_value(value, line.number, value_col).map(|v| {
                props.every = Some(v);
            }),
            "overlap" => parse_bool(value, line.number, value_col).map(|b| {
                props.overlap = Some(b);
            }),
            "move" | "visual" if scope == Scope::Group => Err(Diagnostic::error(
                format!("'{key}' is not allowed on a group"),
                line.number,
                line.col,
            )),
            "move" => parse_movement(value, line.number, value_col).map(|m| {
                props.movement = Some(m);
            }),
            "visual" => lex_value(value, line.number, value_col)
                .and_then(|tokens| parse_visuals(Cursor::at(tokens, line.number, value_col, value)))
                .map(|v| {
                    props.visuals = v;
                }),
            _ => Err(Diagnostic::error(
                format!("unknown property '{key}'"),
                line.number,
                line.col,
            )),
        };

        if let Err(diag) = result {
            self.diagnostics.push(diag);
        }
    }

    /// A volume or pitch value: interpolation call or plain range.
    ///
    /// A failed interpolation leaves the axis as it was, so an earlier
    /// plain value in the same block still applies.
    fn parse_axis(&self, value: &str, line: usize, col: usize) -> Result<AxisDef, Diagnostic> {
        let head = value
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or("");
        if InterpolationType::from_keyword(head).is_some() {
            let tokens = lex_value(value, line, col)?;
            let interp = parse_interpolation(Cursor::at(tokens, line, col, value), self.options)?;
            Ok(AxisDef::Animated(Arc::new(interp)))
        } else {
            parse_value(value, line, col).map(AxisDef::Plain)
        }
    }
}

fn lex_value(text: &str, line: usize, col: usize) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(text, line, col).tokenize()
}

fn parse_value(text: &str, line: usize, col: usize) -> Result<RangeOrValue, Diagnostic> {
    RangeOrValue::parse(text).map_err(|e| Diagnostic::error(e.to_string(), line, col))
}

fn parse_bool(text: &str, line: usize, col: usize) -> Result<bool, Diagnostic> {
    match text.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('t') => Ok(true),
        Some('f') => Ok(false),
        _ => Err(Diagnostic::error(
            format!("invalid boolean '{text}'"),
            line,
            col,
        )),
    }
}

fn parse_movement(text: &str, line: usize, col: usize) -> Result<Movement, Diagnostic> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let mode = parts[0].to_ascii_lowercase();

    let arity = match mode.as_str() {
        "none" => 1,
        "walk" | "pos" | "fixed" => 4,
        "fly" => 5,
        _ => {
            return Err(Diagnostic::error(
                format!("unknown move mode '{}'", parts[0]),
                line,
                col,
            ))
        }
    };
    if parts.len() != arity {
        return Err(Diagnostic::error(
            format!(
                "'{mode}' takes {} values, got {}",
                arity - 1,
                parts.len() - 1
            ),
            line,
            col,
        ));
    }

    let mut values = Vec::with_capacity(arity - 1);
    for part in &parts[1..] {
        let v = parse_value(part, line, col)?;
        if !v.is_set() {
            return Err(Diagnostic::error(
                format!("empty value in '{mode}' movement"),
                line,
                col,
            ));
        }
        values.push(v);
    }

    Ok(match mode.as_str() {
        "walk" => Movement::Walk {
            x: values[0],
            z: values[1],
            speed: values[2],
        },
        "fly" => Movement::Fly {
            x: values[0],
            y: values[1],
            z: values[2],
            speed: values[3],
        },
        "pos" | "fixed" => Movement::Fixed {
            x: values[0],
            y: values[1],
            z: values[2],
        },
        _ => Movement::None,
    })
}

// ── token-level parsing ─────────────────────────────────────────

/// A position in one line's tokens.
struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
    end_col: usize,
}

impl Cursor {
    fn new(tokens: Vec<Token>, source: &SourceLine) -> Self {
        Self::at(tokens, source.number, source.col, &source.text)
    }

    fn at(tokens: Vec<Token>, line: usize, col: usize, text: &str) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
            end_col: col + text.chars().count(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().is_some_and(|t| {
            std::mem::discriminant(&t.kind) == std::mem::discriminant(kind)
        })
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_here(&self, expected: &str) -> Diagnostic {
        match self.peek() {
            Some(t) => Diagnostic::error(
                format!("expected {expected}, got {}", t.kind.describe()),
                t.line,
                t.col,
            ),
            None => Diagnostic::error(
                format!("expected {expected} at end of line"),
                self.line,
                self.end_col,
            ),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, Diagnostic> {
        if self.check(&kind) {
            self.advance().ok_or_else(|| self.error_here(expected))
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_number(&mut self) -> Result<f64, Diagnostic> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(n)
            }
            _ => Err(self.error_here("a number")),
        }
    }

    fn expect_count(&mut self) -> Result<u32, Diagnostic> {
        let (line, col) = self
            .peek()
            .map(|t| (t.line, t.col))
            .unwrap_or((self.line, self.end_col));
        let n = self.expect_number()?;
        if n < 1.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return Err(Diagnostic::error(
                format!("count must be a positive integer, got {n}"),
                line,
                col,
            ));
        }
        Ok(n as u32)
    }

    /// `N` or `A..B`.
    fn expect_range(&mut self) -> Result<RangeOrValue, Diagnostic> {
        let (line, col) = self
            .peek()
            .map(|t| (t.line, t.col))
            .unwrap_or((self.line, self.end_col));
        let a = self.expect_number()?;
        if self.eat(&TokenKind::DotDot) {
            let b = self.expect_number()?;
            if !(b - a).is_finite() {
                return Err(Diagnostic::error(
                    format!("range '{a}..{b}' is too wide"),
                    line,
                    col,
                ));
            }
            Ok(RangeOrValue::range(a, b))
        } else {
            Ok(RangeOrValue::Fixed(a))
        }
    }

    fn expect_end(&self) -> Result<(), Diagnostic> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(Diagnostic::error(
                format!("unexpected {} after end of expression", t.kind.describe()),
                t.line,
                t.col,
            )),
        }
    }
}

type StatementHeader = (StatementKind, String, u32, Option<RangeOrValue>);

/// `[N *] (loop|oneshot) "clip" [every RANGE] :`
fn parse_statement_header(mut c: Cursor) -> Result<StatementHeader, Diagnostic> {
    let mut count = 1;
    if c.check(&TokenKind::Number(0.0)) {
        count = c.expect_count()?;
        c.expect(TokenKind::Star, "'*' after count")?;
    }

    let kind = match c.peek().map(|t| &t.kind) {
        Some(TokenKind::Loop) => StatementKind::Loop,
        Some(TokenKind::Oneshot) => StatementKind::Oneshot,
        _ => return Err(c.error_here("'loop' or 'oneshot'")),
    };
    c.pos += 1;

    let clip = match c.peek().map(|t| &t.kind) {
        Some(TokenKind::Str(s)) if !s.trim().is_empty() => {
            let s = s.trim().to_string();
            c.pos += 1;
            s
        }
        _ => return Err(c.error_here("a quoted clip name")),
    };

    let every = if c.eat(&TokenKind::Every) {
        Some(c.expect_range()?)
    } else {
        None
    };

    c.expect(TokenKind::Colon, "':'")?;
    c.expect_end()?;
    Ok((kind, clip, count, every))
}

/// `group NAME :`
fn parse_group_header(mut c: Cursor) -> Result<String, Diagnostic> {
    c.expect(TokenKind::Group, "'group'")?;
    let name = match c.peek().map(|t| &t.kind) {
        Some(TokenKind::Ident(s)) => {
            let s = s.clone();
            c.pos += 1;
            s
        }
        _ => return Err(c.error_here("a group name")),
    };
    c.expect(TokenKind::Colon, "':'")?;
    c.expect_end()?;
    Ok(name)
}

/// `fn(A and B as EASE in D [for ever | forever | for N])`
fn parse_interpolation(mut c: Cursor, options: ParseOptions) -> Result<Interpolation, Diagnostic> {
    let kind = match c.advance().map(|t| t.kind) {
        Some(TokenKind::Ident(word)) => InterpolationType::from_keyword(&word),
        _ => None,
    }
    .ok_or_else(|| Diagnostic::error("expected an interpolation function", c.line, c.end_col))?;

    c.expect(TokenKind::LParen, "'('")?;
    let min = c.expect_range()?;
    c.expect(TokenKind::And, "'and'")?;
    let max = c.expect_range()?;
    c.expect(TokenKind::As, "'as'")?;

    let (ease_name, ease_line, ease_col) = match c.peek() {
        Some(Token {
            kind: TokenKind::Ident(name),
            line,
            col,
        }) => (name.clone(), *line, *col),
        _ => return Err(c.error_here("an ease name")),
    };
    c.pos += 1;
    if Ease::from_name(&ease_name).is_none() {
        if options.strict_easing {
            return Err(Diagnostic::error(
                format!("unknown ease '{ease_name}'"),
                ease_line,
                ease_col,
            ));
        }
        debug!(ease = %ease_name, "unknown ease, using linear");
    }

    c.expect(TokenKind::In, "'in'")?;
    let duration = c.expect_range()?;

    let mut interp = Interpolation::new(kind, min, max, duration, ease_name);
    if c.eat(&TokenKind::Forever) {
        interp = interp.with_forever();
    } else if c.eat(&TokenKind::For) {
        if c.eat(&TokenKind::Ever) {
            interp = interp.with_forever();
        } else {
            interp = interp.with_repeat(c.expect_count()?);
        }
    }

    c.expect(TokenKind::RParen, "')'")?;
    c.expect_end()?;
    Ok(interp)
}

/// `sphere and object "fx/smoke" and trail`
fn parse_visuals(mut c: Cursor) -> Result<Vec<Visual>, Diagnostic> {
    let mut visuals = Vec::new();
    loop {
        match c.peek().map(|t| &t.kind) {
            Some(TokenKind::Ident(tag)) => {
                visuals.push(Visual::Tag(tag.to_ascii_lowercase()));
                c.pos += 1;
            }
            Some(TokenKind::Object) => {
                c.pos += 1;
                match c.peek().map(|t| &t.kind) {
                    Some(TokenKind::Str(path)) => {
                        visuals.push(Visual::Object(path.clone()));
                        c.pos += 1;
                    }
                    _ => return Err(c.error_here("a quoted object path")),
                }
            }
            _ => return Err(c.error_here("a visual tag or 'object'")),
        }
        if !c.eat(&TokenKind::And) {
            break;
        }
    }
    c.expect_end()?;
    Ok(visuals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::InterpolationType;

    fn parse(src: &str) -> (Script, Vec<Diagnostic>) {
        Parser::new(src, ParseOptions::default()).parse()
    }

    fn single_statement(src: &str) -> StatementDef {
        let (script, diags) = parse(src);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        assert_eq!(script.items.len(), 1);
        match &script.items[0] {
            Item::Statement(s) => s.clone(),
            other => panic!("expected statement, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_script() {
        let (script, diags) = parse("# nothing here\n\n");
        assert!(script.items.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn parse_tutorial_oneshot() {
        let s = single_statement("oneshot \"conversation/hello\" every 3..5:\n    volume = 1\n");
        assert_eq!(s.kind, StatementKind::Oneshot);
        assert_eq!(s.clip, "conversation/hello");
        assert_eq!(s.count, 1);
        assert_eq!(s.props.every, Some(RangeOrValue::Range(3.0, 5.0)));
        assert_eq!(
            s.props.volume,
            Some(AxisDef::Plain(RangeOrValue::Fixed(1.0)))
        );
    }

    #[test]
    fn parse_count_prefix_and_keywords_case() {
        let s = single_statement("4 * LOOP \"rain/heavy\":\n  pitch = 0.9..1.1");
        assert_eq!(s.kind, StatementKind::Loop);
        assert_eq!(s.count, 4);
        assert_eq!(
            s.props.pitch,
            Some(AxisDef::Plain(RangeOrValue::Range(0.9, 1.1)))
        );
    }

    #[test]
    fn parse_all_timing_properties() {
        let s = single_statement(
            "oneshot \"bell\":\n\
             \tstarts_at = 1..2\n\
             \tduration = 30\n\
             \tfade_in = 0.5\n\
             \tfade_out = 2\n\
             \tevery = 4..8\n\
             \toverlap = true\n",
        );
        assert_eq!(s.props.starts_at, Some(RangeOrValue::Range(1.0, 2.0)));
        assert_eq!(s.props.duration, Some(RangeOrValue::Fixed(30.0)));
        assert_eq!(s.props.fade_in, Some(RangeOrValue::Fixed(0.5)));
        assert_eq!(s.props.fade_out, Some(RangeOrValue::Fixed(2.0)));
        assert_eq!(s.props.every, Some(RangeOrValue::Range(4.0, 8.0)));
        assert_eq!(s.props.overlap, Some(true));
    }

    #[test]
    fn every_property_overrides_header() {
        let s = single_statement("oneshot \"x\" every 1:\n  every = 9");
        assert_eq!(s.props.every, Some(RangeOrValue::Fixed(9.0)));
    }

    #[test]
    fn overlap_accepts_any_t_or_f_prefix() {
        let s = single_statement("oneshot \"x\":\n  overlap = TRUE");
        assert_eq!(s.props.overlap, Some(true));
        let s = single_statement("oneshot \"x\":\n  overlap = t");
        assert_eq!(s.props.overlap, Some(true));
        let s = single_statement("oneshot \"x\":\n  overlap = false");
        assert_eq!(s.props.overlap, Some(false));
    }

    #[test]
    fn invalid_boolean_is_diagnosed() {
        let (script, diags) = parse("oneshot \"x\":\n  overlap = yes");
        assert_eq!(script.items.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 2);
        assert!(diags[0].message.contains("invalid boolean"));
    }

    #[test]
    fn parse_goto_interpolation() {
        let s = single_statement("loop \"wind\":\n  volume = goto(0 and 1 as InOutSine in 4..6)");
        let Some(AxisDef::Animated(interp)) = s.props.volume else {
            panic!("expected interpolation");
        };
        assert_eq!(interp.kind, InterpolationType::Goto);
        assert_eq!(interp.min, RangeOrValue::Fixed(0.0));
        assert_eq!(interp.max, RangeOrValue::Fixed(1.0));
        assert_eq!(interp.duration, RangeOrValue::Range(4.0, 6.0));
        assert_eq!(interp.ease, Ease::InOutSine);
        assert!(!interp.forever);
    }

    #[test]
    fn gobetween_defaults_to_forever() {
        let s = single_statement("loop \"a\":\n  pitch = gobetween(0.8 and 1.2 as linear in 3)");
        let Some(AxisDef::Animated(interp)) = s.props.pitch else {
            panic!("expected interpolation");
        };
        assert_eq!(interp.kind, InterpolationType::GoBetween);
        assert!(interp.forever);
    }

    #[test]
    fn interpolate_repeat_clauses() {
        let cases = [
            ("interpolate(0 and 1 as linear in 2)", false, 1),
            ("interpolate(0 and 1 as linear in 2 for 3)", false, 3),
            ("interpolate(0 and 1 as linear in 2 for ever)", true, 1),
            ("interpolate(0 and 1 as linear in 2 forever)", true, 1),
            ("gobetween(0 and 1 as linear in 2 for 2)", false, 2),
        ];
        for (call, forever, count) in cases {
            let s = single_statement(&format!("loop \"a\":\n  volume = {call}"));
            let Some(AxisDef::Animated(interp)) = s.props.volume else {
                panic!("expected interpolation for {call}");
            };
            assert_eq!(interp.forever, forever, "{call}");
            assert_eq!(interp.repeat_count, count, "{call}");
        }
    }

    #[test]
    fn unknown_ease_falls_back_to_linear() {
        let s = single_statement("loop \"a\":\n  volume = goto(0 and 1 as Wobbly in 2)");
        let Some(AxisDef::Animated(interp)) = s.props.volume else {
            panic!("expected interpolation");
        };
        assert_eq!(interp.ease, Ease::Linear);
        assert_eq!(interp.ease_name, "Wobbly");
    }

    #[test]
    fn strict_easing_rejects_unknown_ease() {
        let options = ParseOptions {
            strict_easing: true,
        };
        let (script, diags) =
            Parser::new("loop \"a\":\n  volume = goto(0 and 1 as Wobbly in 2)", options).parse();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unknown ease"));
        let Item::Statement(s) = &script.items[0] else {
            panic!("expected statement");
        };
        assert!(s.props.volume.is_none());
    }

    #[test]
    fn failed_interpolation_keeps_earlier_plain_value() {
        let (script, diags) = parse(
            "loop \"a\":\n  volume = 0.3\n  volume = goto(0 and as linear in 2)\n",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 3);
        let Item::Statement(s) = &script.items[0] else {
            panic!("expected statement");
        };
        assert_eq!(
            s.props.volume,
            Some(AxisDef::Plain(RangeOrValue::Fixed(0.3)))
        );
    }

    #[test]
    fn failed_interpolation_alone_leaves_axis_unset() {
        let (script, diags) = parse("loop \"a\":\n  pitch = goto(1 and x as linear in 2)");
        assert_eq!(diags.len(), 1);
        let Item::Statement(s) = &script.items[0] else {
            panic!("expected statement");
        };
        assert!(s.props.pitch.is_none());
    }

    #[test]
    fn parse_movement_modes() {
        let s = single_statement("loop \"a\":\n  move = walk, -5..5, -5..5, 0.1");
        assert_eq!(
            s.props.movement,
            Some(Movement::Walk {
                x: RangeOrValue::Range(-5.0, 5.0),
                z: RangeOrValue::Range(-5.0, 5.0),
                speed: RangeOrValue::Fixed(0.1),
            })
        );
        let s = single_statement("loop \"a\":\n  move = fly, 1, 2..3, 4, 0.5");
        assert!(matches!(s.props.movement, Some(Movement::Fly { .. })));
        let s = single_statement("loop \"a\":\n  move = pos, 0, 1.5, -2");
        assert_eq!(
            s.props.movement,
            Some(Movement::Fixed {
                x: RangeOrValue::Fixed(0.0),
                y: RangeOrValue::Fixed(1.5),
                z: RangeOrValue::Fixed(-2.0),
            })
        );
    }

    #[test]
    fn bad_movement_is_diagnosed_and_skipped() {
        let (script, diags) = parse(
            "loop \"a\":\n  move = swim, 1, 2, 3\n  move = walk, 1, 2\n  volume = 0.5",
        );
        assert_eq!(diags.len(), 2);
        assert!(diags[0].message.contains("unknown move mode"));
        assert!(diags[1].message.contains("takes 3 values"));
        let Item::Statement(s) = &script.items[0] else {
            panic!("expected statement");
        };
        assert!(s.props.movement.is_none());
        assert_eq!(
            s.props.volume,
            Some(AxisDef::Plain(RangeOrValue::Fixed(0.5)))
        );
    }

    #[test]
    fn parse_visuals() {
        let s = single_statement("loop \"a\":\n  visual = sphere and object \"fx/smoke\" and Trail");
        assert_eq!(
            s.props.visuals,
            vec![
                Visual::Tag("sphere".into()),
                Visual::Object("fx/smoke".into()),
                Visual::Tag("trail".into()),
            ]
        );
    }

    #[test]
    fn malformed_header_skips_statement_only() {
        let (script, diags) = parse(
            "oneshot bird:\n  volume = 1\noneshot \"ok\":\n  volume = 0.5\n",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 1);
        assert_eq!(script.items.len(), 1);
        let Item::Statement(s) = &script.items[0] else {
            panic!("expected statement");
        };
        assert_eq!(s.clip, "ok");
    }

    #[test]
    fn unmatched_quote_is_diagnosed() {
        let (script, diags) = parse("loop \"rain:\n  volume = 1\nloop \"wind\":");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unmatched quote"));
        assert_eq!(script.items.len(), 1);
    }

    #[test]
    fn missing_colon_is_diagnosed() {
        let (_, diags) = parse("loop \"rain\"");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("':'"));
    }

    #[test]
    fn zero_count_is_rejected() {
        let (script, diags) = parse("0 * loop \"rain\":");
        assert!(script.items.is_empty());
        assert!(diags[0].message.contains("positive integer"));
    }

    #[test]
    fn unknown_property_is_diagnosed() {
        let (script, diags) = parse("loop \"rain\":\n  loudness = 3\n  volume = 1");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unknown property 'loudness'"));
        assert_eq!(script.items.len(), 1);
    }

    #[test]
    fn range_too_wide_to_sample_is_diagnosed() {
        let (script, diags) = parse(
            "loop \"rain\":\n  pitch = -1e308..1e308\n  volume = 0.5\n",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 2);
        assert!(diags[0].message.contains("too wide"));
        let Item::Statement(s) = &script.items[0] else {
            panic!("expected statement");
        };
        assert_eq!(s.props.pitch, None);
        assert_eq!(
            s.props.volume,
            Some(AxisDef::Plain(RangeOrValue::Fixed(0.5)))
        );
    }

    #[test]
    fn malformed_number_is_diagnosed() {
        let (_, diags) = parse("loop \"rain\":\n  volume = 0.5..abc");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 2);
    }

    #[test]
    fn parse_group_with_children() {
        let (script, diags) = parse(
            "group birds:\n\
             \x20   volume = 0.5\n\
             \x20   fade_in = 1\n\
             \x20   oneshot \"birds/a\" every 2:\n\
             \x20       volume = 0.4\n\
             \x20   oneshot \"birds/b\" every 3:\n\
             loop \"wind\":\n",
        );
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(script.items.len(), 2);
        let Item::Group(g) = &script.items[0] else {
            panic!("expected group");
        };
        assert_eq!(g.name, "birds");
        assert_eq!(g.children.len(), 2);
        assert_eq!(
            g.props.volume,
            Some(AxisDef::Plain(RangeOrValue::Fixed(0.5)))
        );
        assert_eq!(g.props.fade_in, Some(RangeOrValue::Fixed(1.0)));
        assert_eq!(g.children[1].clip, "birds/b");
        assert!(matches!(script.items[1], Item::Statement(_)));
    }

    #[test]
    fn endgroup_closes_group() {
        let (script, diags) = parse(
            "group a:\n  loop \"x\":\n    volume = 1\nendgroup\nloop \"y\":",
        );
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(script.items.len(), 2);
    }

    #[test]
    fn indented_endgroup_closes_group() {
        let (script, diags) = parse("group a:\n  loop \"x\":\n  endgroup\n  loop \"y\":");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(script.items.len(), 2);
        let Item::Group(g) = &script.items[0] else {
            panic!("expected group");
        };
        assert_eq!(g.children.len(), 1);
    }

    #[test]
    fn move_and_visual_rejected_on_group() {
        let (script, diags) = parse(
            "group a:\n  move = walk, 1, 1, 1\n  visual = sphere\n  loop \"x\":",
        );
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.message.contains("not allowed on a group")));
        let Item::Group(g) = &script.items[0] else {
            panic!("expected group");
        };
        assert!(g.props.movement.is_none());
        assert!(g.props.visuals.is_empty());
    }

    #[test]
    fn nested_group_is_diagnosed() {
        let (script, diags) = parse(
            "group a:\n  group b:\n    loop \"inner\":\n  loop \"x\":",
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("nested"));
        let Item::Group(g) = &script.items[0] else {
            panic!("expected group");
        };
        assert_eq!(g.children.len(), 1);
        assert_eq!(g.children[0].clip, "x");
    }

    #[test]
    fn empty_group_warns() {
        let (_, diags) = parse("group lonely:\n  volume = 1");
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
    }

    #[test]
    fn diagnostics_do_not_stop_later_statements() {
        let (script, diags) = parse(
            "loop \"a\":\n  volume = x\nwhat is this\nloop b\nloop \"c\":\n  pitch = 2",
        );
        assert_eq!(diags.len(), 3);
        assert_eq!(script.items.len(), 2);
    }
}
