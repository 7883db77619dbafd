//! Script compiler: source text → AST → flat statement list.

pub mod ast;
pub mod clip;
pub mod compile;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

pub use ast::*;
pub use clip::resolve_clip;
pub use compile::Statement;
pub use error::{Diagnostic, Severity};
pub use parser::ParseOptions;

use compile::compile_script;
use parser::Parser;

/// Statements that parsed cleanly plus everything that did not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseOutput {
    pub statements: Vec<Arc<Statement>>,
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// The script compiler.
///
/// Parsing is fault tolerant: a script with broken lines still yields every
/// statement that could be read, alongside a diagnostic per broken line.
pub struct Compiler;

impl Compiler {
    /// Parse source into a [`Script`] without flattening groups.
    pub fn parse(source: &str, options: ParseOptions) -> (Script, Vec<Diagnostic>) {
        Parser::new(source, options).parse()
    }

    /// Parse and flatten source into executable statements.
    pub fn compile<R: Rng + ?Sized>(
        source: &str,
        options: ParseOptions,
        rng: &mut R,
    ) -> ParseOutput {
        let (script, diagnostics) = Self::parse(source, options);
        ParseOutput {
            statements: compile_script(&script, rng),
            diagnostics,
        }
    }
}
