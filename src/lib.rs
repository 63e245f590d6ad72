//! Front-end and IR-lowering core for a small statically-typed imperative
//! language: a recursive-descent parser, a typed AST with a uniform node
//! protocol, and a lowerer producing SSA-form IR via an `inkwell`-backed
//! builder facade.
//!
//! The constituent stages — [`lexer::lex`], [`parser::parse`],
//! [`lowering::LoweringContext`] — are independently usable; [`lower_source`]
//! is a thin `anyhow`-based convenience wrapper over all three for callers
//! that just want `?`.

pub mod ast;
pub mod diagnostics;
pub mod eval;
pub mod lexer;
pub mod lowering;
pub mod parser;

use anyhow::{bail, Context as _};
use inkwell::context::Context;

use crate::{diagnostics::Diagnostics, lowering::LoweringContext};

pub use ast::{Expression, Statement, Type};

pub struct LoweredModule {
    /// The textual form of the emitted LLVM module, for tests and demos.
    pub ir: String,
    /// Warnings accumulated during lowering (unnecessary-unsafe,
    /// implicit-return-value synthesis). Lowering errors are not in here —
    /// they unwind as `Err` instead, per the error handling design.
    pub warnings: Diagnostics,
}

pub fn lower_source(source: &str, module_name: &str) -> anyhow::Result<LoweredModule> {
    let tokens = lexer::lex(source).context("lexing failed")?;
    let (ast, diagnostics) = parser::parse(tokens);
    if diagnostics.has_errors() {
        let messages = diagnostics
            .errors()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        bail!(
            "parsing failed with {} error(s): {messages}",
            diagnostics.errors().len()
        );
    }

    let llvm = Context::create();
    let ctx = LoweringContext::new(&llvm, module_name);
    ast.preprocess(&ctx)?;
    ast.lower(&ctx)?;
    ctx.finish_top_level();

    let ir = ctx.module.print_to_string().to_string();
    Ok(LoweredModule {
        ir,
        warnings: ctx.diagnostics.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_a_minimal_function_to_ir_text() {
        let result = lower_source("int main() { return 0; }", "test").unwrap();
        assert!(result.ir.contains("define i32 @main"));
        assert!(!result.warnings.has_warnings());
    }

    #[test]
    fn surfaces_parse_errors_through_anyhow() {
        let err = lower_source("int main( { return 0; }", "test").unwrap_err();
        assert!(err.to_string().contains("parsing failed"));
    }

    #[test]
    fn surfaces_lowering_errors() {
        let err = lower_source("int main() { return x; }", "test").unwrap_err();
        assert!(err.to_string().contains("Unbound symbol"));
    }
}
