//! Typed AST: types, expressions, statements, each collapsed into a closed
//! `enum` with inherent methods realizing the uniform node protocol.

pub mod expression;
pub mod statement;
pub mod types;

pub use expression::Expression;
pub use statement::Statement;
pub use types::Type;
