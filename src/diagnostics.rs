//! Accumulator of errors and warnings tagged by source token.
//!
//! Grounded in the teacher's `typechecker::error` module (hand-written
//! `Display`/`Error` impls, no derive-macro error libraries) but shaped
//! around the front-end's specific need for two parallel, append-only
//! lists rather than a single fail-fast `Result`.

use std::fmt::{self, Display};

use crate::lexer::Token;

/// One diagnostic, tagged with the token that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub token: Token,
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token.position.to_string(&self.message))
    }
}

/// Two ordered lists — errors and warnings — as specified for the core's
/// diagnostic output. The parser owns one instance; the lowerer owns a
/// second for warnings (lowering errors are fatal and unwind instead of
/// accumulating, per the error handling design).
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, token: &Token, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            token: token.clone(),
            message: message.into(),
        });
    }

    pub fn warn(&mut self, token: &Token, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(Diagnostic {
            token: token.clone(),
            message,
        });
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
