//! Expression tree.
//!
//! Polymorphic over `{render, preprocess, lower, evaluate, is_lvalue,
//! is_safe}`, collapsed into one `enum` plus `impl` block the same way
//! [`crate::ast::types::Type`] collapses the type hierarchy. Each node
//! carries its first token and an inferred type slot (`RefCell<Option<Type>>`,
//! set the first time `lower` runs over it).

use std::cell::RefCell;

use inkwell::values::BasicValueEnum;

use crate::{
    ast::types::{PrimitiveIdentifier, Type},
    eval::EvalValue,
    lexer::Token,
    lowering::{context::LoweringContext, error::LowerError, promotion::promote, symbol_table::Symbol},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    Deref,
    Ref,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IntegerLiteral {
    pub token: Token,
    pub value: i32,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CharacterLiteral {
    pub token: Token,
    pub value: i8,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StringLiteral {
    pub token: Token,
    pub value: String,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BinaryOperation {
    pub token: Token,
    pub op: BinaryOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UnaryOperation {
    pub token: Token,
    pub op: UnaryOp,
    pub operand: Box<Expression>,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionCall {
    pub token: Token,
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArrayInitList {
    pub token: Token,
    pub elements: Vec<Expression>,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UnsafeExpression {
    pub token: Token,
    pub inner: Box<Expression>,
    pub ty: RefCell<Option<Type>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Expression {
    Integer(IntegerLiteral),
    Character(CharacterLiteral),
    Str(StringLiteral),
    Identifier(Identifier),
    Binary(BinaryOperation),
    Unary(UnaryOperation),
    Call(FunctionCall),
    ArrayInit(ArrayInitList),
    Unsafe(UnsafeExpression),
}

impl Expression {
    pub fn token(&self) -> &Token {
        match self {
            Expression::Integer(n) => &n.token,
            Expression::Character(n) => &n.token,
            Expression::Str(n) => &n.token,
            Expression::Identifier(n) => &n.token,
            Expression::Binary(n) => &n.token,
            Expression::Unary(n) => &n.token,
            Expression::Call(n) => &n.token,
            Expression::ArrayInit(n) => &n.token,
            Expression::Unsafe(n) => &n.token,
        }
    }

    fn ty_slot(&self) -> &RefCell<Option<Type>> {
        match self {
            Expression::Integer(n) => &n.ty,
            Expression::Character(n) => &n.ty,
            Expression::Str(n) => &n.ty,
            Expression::Identifier(n) => &n.ty,
            Expression::Binary(n) => &n.ty,
            Expression::Unary(n) => &n.ty,
            Expression::Call(n) => &n.ty,
            Expression::ArrayInit(n) => &n.ty,
            Expression::Unsafe(n) => &n.ty,
        }
    }

    /// The inferred type, present once `lower` has run over this node.
    pub fn ty(&self) -> Option<Type> {
        self.ty_slot().borrow().clone()
    }

    /// `true` for the two node shapes that designate a storage location:
    /// a bound name, or a dereferenced pointer.
    pub fn is_lvalue(&self) -> bool {
        matches!(self, Expression::Identifier(_))
            || matches!(self, Expression::Unary(u) if u.op == UnaryOp::Deref)
    }

    /// Mirrors `Type::is_safe`: unknown (pre-lowering) types are assumed
    /// safe, since only pointer-typed nodes are ever unsafe.
    pub fn is_safe(&self) -> bool {
        self.ty().map(|t| t.is_safe()).unwrap_or(true)
    }

    pub fn render(&self, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        match self {
            Expression::Integer(n) => format!("{indent}IntegerLiteral: {}", n.value),
            Expression::Character(n) => format!("{indent}CharacterLiteral: {}", n.value),
            Expression::Str(n) => format!("{indent}StringLiteral: {:?}", n.value),
            Expression::Identifier(n) => format!("{indent}Identifier: {}", n.name),
            Expression::Binary(n) => format!(
                "{indent}BinaryOperation: {:?}\n{}\n{}",
                n.op,
                n.lhs.render(depth + 1),
                n.rhs.render(depth + 1)
            ),
            Expression::Unary(n) => format!(
                "{indent}UnaryOperation: {:?}\n{}",
                n.op,
                n.operand.render(depth + 1)
            ),
            Expression::Call(n) => {
                let args = n
                    .arguments
                    .iter()
                    .map(|a| a.render(depth + 1))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "{indent}FunctionCall:\n{}\n{indent}  arguments:\n{args}",
                    n.callee.render(depth + 1)
                )
            }
            Expression::ArrayInit(n) => {
                let elems = n
                    .elements
                    .iter()
                    .map(|e| e.render(depth + 1))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{indent}ArrayInitList:\n{elems}")
            }
            Expression::Unsafe(n) => {
                format!("{indent}UnsafeExpression:\n{}", n.inner.render(depth + 1))
            }
        }
    }

    /// Pure structural walk; expressions register nothing during preprocess.
    pub fn preprocess(&self, ctx: &LoweringContext<'_>) -> Result<(), LowerError> {
        match self {
            Expression::Binary(n) => {
                n.lhs.preprocess(ctx)?;
                n.rhs.preprocess(ctx)
            }
            Expression::Unary(n) => n.operand.preprocess(ctx),
            Expression::Call(n) => {
                n.callee.preprocess(ctx)?;
                for a in &n.arguments {
                    a.preprocess(ctx)?;
                }
                Ok(())
            }
            Expression::ArrayInit(n) => {
                for e in &n.elements {
                    e.preprocess(ctx)?;
                }
                Ok(())
            }
            Expression::Unsafe(n) => n.inner.preprocess(ctx),
            Expression::Integer(_)
            | Expression::Character(_)
            | Expression::Str(_)
            | Expression::Identifier(_) => Ok(()),
        }
    }

    pub fn evaluate(&self) -> Option<EvalValue> {
        match self {
            Expression::Integer(n) => Some(EvalValue::Signed(n.value as i64)),
            Expression::Binary(n) => {
                let lhs = n.lhs.evaluate()?;
                let rhs = n.rhs.evaluate()?;
                match n.op {
                    BinaryOp::Add => lhs.add(rhs),
                    BinaryOp::Sub => lhs.sub(rhs),
                    BinaryOp::Mul => lhs.mul(rhs),
                    BinaryOp::Div => lhs.div(rhs),
                    BinaryOp::Assign => None,
                }
            }
            Expression::Unary(n) => match n.op {
                UnaryOp::Plus => n.operand.evaluate(),
                UnaryOp::Minus => n.operand.evaluate()?.negate(),
                UnaryOp::Deref | UnaryOp::Ref => None,
            },
            _ => None,
        }
    }

    /// Resolves the address an assignment/reference writes through or
    /// points at. Only identifiers and pointer dereferences qualify.
    fn lvalue_address<'ctx>(
        &self,
        ctx: &LoweringContext<'ctx>,
    ) -> Result<inkwell::values::PointerValue<'ctx>, LowerError> {
        match self {
            Expression::Identifier(id) => match ctx.symbols.borrow().lookup(&id.name) {
                Some(Symbol::Variable(slot, ty)) => {
                    id.ty.replace(Some(ty));
                    Ok(slot)
                }
                Some(Symbol::Function(_, _)) | None => {
                    Err(LowerError::Unbound(id.token.clone(), id.name.clone()))
                }
            },
            Expression::Unary(u) if u.op == UnaryOp::Deref => {
                let value = require_value(u.operand.lower(ctx)?, &u.token)?;
                Ok(value.into_pointer_value())
            }
            _ => Err(LowerError::NotLvalue(self.token().clone())),
        }
    }

    pub fn lower<'ctx>(
        &self,
        ctx: &LoweringContext<'ctx>,
    ) -> Result<Option<BasicValueEnum<'ctx>>, LowerError> {
        match self {
            Expression::Integer(n) => {
                n.ty.replace(Some(Type::simple(PrimitiveIdentifier::Int, false)));
                let v = ctx.llvm.i32_type().const_int(n.value as u64, true);
                Ok(Some(v.into()))
            }
            Expression::Character(n) => {
                n.ty.replace(Some(Type::simple(PrimitiveIdentifier::Char, false)));
                let v = ctx.llvm.i8_type().const_int(n.value as u64, true);
                Ok(Some(v.into()))
            }
            Expression::Str(n) => {
                n.ty.replace(Some(Type::pointer(Type::simple(
                    PrimitiveIdentifier::Char,
                    false,
                ))));
                let global = ctx
                    .builder
                    .build_global_string_ptr(&n.value, "strlit")
                    .map_err(|_| {
                        LowerError::PromotionFailure(
                            n.token.clone(),
                            "failed to build string literal".to_string(),
                        )
                    })?;
                Ok(Some(global.as_pointer_value().into()))
            }
            Expression::Identifier(n) => match ctx.symbols.borrow().lookup(&n.name) {
                Some(Symbol::Variable(slot, ty)) => {
                    n.ty.replace(Some(ty.clone()));
                    let backend_ty = ty.lower(ctx.llvm);
                    let loaded = ctx
                        .builder
                        .build_load(backend_ty, slot, &n.name)
                        .expect("load from a valid alloca never fails");
                    Ok(Some(loaded))
                }
                Some(Symbol::Function(_, _)) | None => Err(LowerError::Unbound(
                    n.token.clone(),
                    n.name.clone(),
                )),
            },
            Expression::Binary(n) if n.op == BinaryOp::Assign => {
                let address = n.lhs.lvalue_address(ctx)?;
                let rhs_value = require_value(n.rhs.lower(ctx)?, &n.token)?;
                ctx.builder
                    .build_store(address, rhs_value)
                    .expect("store to a valid alloca never fails");
                n.ty.replace(n.lhs.ty());
                Ok(Some(rhs_value))
            }
            Expression::Binary(n) => {
                let lhs_value = require_value(n.lhs.lower(ctx)?, &n.token)?;
                let rhs_value = require_value(n.rhs.lower(ctx)?, &n.token)?;

                let (Some(Type::Simple(lst)), Some(Type::Simple(rst))) =
                    (n.lhs.ty(), n.rhs.ty())
                else {
                    return Err(LowerError::PromotionFailure(
                        n.token.clone(),
                        "arithmetic requires primitive operand types".to_string(),
                    ));
                };

                let result_ty = promote(lst, rst).ok_or_else(|| {
                    LowerError::PromotionFailure(
                        n.token.clone(),
                        format!(
                            "no promotion defined for {} and {}",
                            lst.identifier.name(),
                            rst.identifier.name()
                        ),
                    )
                })?;

                let backend_int = result_ty.identifier_width_int_type(ctx.llvm);
                let lhs_int = ctx
                    .builder
                    .build_int_cast(lhs_value.into_int_value(), backend_int, "lhs")
                    .expect("int cast never fails");
                let rhs_int = ctx
                    .builder
                    .build_int_cast(rhs_value.into_int_value(), backend_int, "rhs")
                    .expect("int cast never fails");

                let result = match n.op {
                    BinaryOp::Add => ctx.builder.build_int_add(lhs_int, rhs_int, "addtmp"),
                    BinaryOp::Sub => ctx.builder.build_int_sub(lhs_int, rhs_int, "subtmp"),
                    BinaryOp::Mul => ctx.builder.build_int_mul(lhs_int, rhs_int, "multmp"),
                    // Signed division regardless of operand signedness: a
                    // preserved limitation, not a bug fixed here.
                    BinaryOp::Div => ctx.builder.build_int_signed_div(lhs_int, rhs_int, "divtmp"),
                    BinaryOp::Assign => unreachable!("handled above"),
                }
                .expect("int arithmetic never fails");

                n.ty.replace(Some(Type::Simple(result_ty)));
                Ok(Some(result.into()))
            }
            Expression::Unary(n) => lower_unary(n, ctx),
            Expression::Call(n) => lower_call(n, ctx),
            Expression::ArrayInit(n) => Err(LowerError::ArrayInitOutsidePlace(n.token.clone())),
            Expression::Unsafe(n) => {
                let was_unsafe = ctx.in_unsafe_block.get();
                if was_unsafe {
                    ctx.diagnostics.borrow_mut().warn(
                        &n.token,
                        "Unnecessary unsafe expression",
                    );
                }
                let _guard = ctx.enter_unsafe();
                let value = n.inner.lower(ctx)?;
                n.ty.replace(n.inner.ty());
                Ok(value)
            }
        }
    }
}

fn require_value<'ctx>(
    value: Option<BasicValueEnum<'ctx>>,
    token: &Token,
) -> Result<BasicValueEnum<'ctx>, LowerError> {
    value.ok_or_else(|| {
        LowerError::PromotionFailure(token.clone(), "expression produced no value".to_string())
    })
}

fn lower_unary<'ctx>(
    n: &UnaryOperation,
    ctx: &LoweringContext<'ctx>,
) -> Result<Option<BasicValueEnum<'ctx>>, LowerError> {
    match n.op {
        UnaryOp::Plus | UnaryOp::Minus => {
            let operand_value = require_value(n.operand.lower(ctx)?, &n.token)?;
            let Some(Type::Simple(st)) = n.operand.ty() else {
                return Err(LowerError::PromotionFailure(
                    n.token.clone(),
                    "unary +/- requires a primitive operand".to_string(),
                ));
            };
            let int_ty = st.identifier_width_int_type(ctx.llvm);
            let one_or_minus_one = if n.op == UnaryOp::Plus {
                int_ty.const_int(1, true)
            } else {
                int_ty.const_int((-1i64) as u64, true)
            };
            let result = ctx
                .builder
                .build_int_mul(operand_value.into_int_value(), one_or_minus_one, "unarytmp")
                .expect("int mul never fails");
            n.ty.replace(Some(Type::Simple(st)));
            Ok(Some(result.into()))
        }
        UnaryOp::Deref => {
            let value = require_value(n.operand.lower(ctx)?, &n.token)?;
            let pointee_ty = match n.operand.ty() {
                Some(Type::Pointer(inner)) | Some(Type::LValueReference(inner)) => *inner,
                _ => {
                    return Err(LowerError::PromotionFailure(
                        n.token.clone(),
                        "dereference requires a pointer operand".to_string(),
                    ))
                }
            };
            let backend = pointee_ty.lower(ctx.llvm);
            let loaded = ctx
                .builder
                .build_load(backend, value.into_pointer_value(), "dereftmp")
                .expect("load never fails");
            n.ty.replace(Some(pointee_ty));
            Ok(Some(loaded))
        }
        UnaryOp::Ref => {
            if !n.operand.is_lvalue() {
                return Err(LowerError::NotLvalue(n.token.clone()));
            }
            let address = n.operand.lvalue_address(ctx)?;
            let operand_ty = n.operand.ty().ok_or_else(|| {
                LowerError::NotLvalue(n.token.clone())
            })?;
            n.ty.replace(Some(Type::pointer(operand_ty)));
            Ok(Some(address.into()))
        }
    }
}

fn lower_call<'ctx>(
    n: &FunctionCall,
    ctx: &LoweringContext<'ctx>,
) -> Result<Option<BasicValueEnum<'ctx>>, LowerError> {
    let (function, return_type) = match n.callee.as_ref() {
        Expression::Identifier(id) => match ctx.symbols.borrow().lookup(&id.name) {
            Some(Symbol::Function(f, ret)) => (f, ret),
            _ => return Err(LowerError::NotCallable(n.token.clone())),
        },
        // §9's documented unreachable path: a non-identifier callee is lowered
        // as an ordinary expression, which never yields a function handle, so
        // this always fails. Preserved rather than special-cased away.
        other => {
            other.lower(ctx)?;
            return Err(LowerError::NotCallable(n.token.clone()));
        }
    };

    let mut args: Vec<inkwell::values::BasicMetadataValueEnum> =
        Vec::with_capacity(n.arguments.len());
    for arg in &n.arguments {
        let value = require_value(arg.lower(ctx)?, &n.token)?;
        args.push(value.into());
    }

    let call = ctx
        .builder
        .build_call(function, &args, "calltmp")
        .expect("call never fails to build");

    // Every other expression arm fills in its inferred type before
    // returning (§3's uniform node protocol); a call's is the callee's
    // declared return type, so a call result can feed straight into the
    // promotion-table arithmetic arm like any other primitive operand.
    n.ty.replace(Some(return_type));

    Ok(call.try_as_basic_value().left())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Span, TokenKind};

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token {
            kind,
            text: text.to_string(),
            position: Span::default(),
        }
    }

    fn int_lit(value: i32) -> Expression {
        Expression::Integer(IntegerLiteral {
            token: tok(TokenKind::IntegerLiteral, &value.to_string()),
            value,
            ty: RefCell::new(None),
        })
    }

    #[test]
    fn integer_literal_evaluates_to_itself() {
        assert_eq!(int_lit(7).evaluate(), Some(EvalValue::Signed(7)));
    }

    #[test]
    fn binary_addition_evaluates() {
        let expr = Expression::Binary(BinaryOperation {
            token: tok(TokenKind::Plus, "+"),
            op: BinaryOp::Add,
            lhs: Box::new(int_lit(1)),
            rhs: Box::new(Expression::Binary(BinaryOperation {
                token: tok(TokenKind::Star, "*"),
                op: BinaryOp::Mul,
                lhs: Box::new(int_lit(2)),
                rhs: Box::new(int_lit(3)),
                ty: RefCell::new(None),
            })),
            ty: RefCell::new(None),
        });
        assert_eq!(expr.evaluate(), Some(EvalValue::Signed(7)));
    }

    #[test]
    fn identifier_is_lvalue_and_call_is_not() {
        let ident = Expression::Identifier(Identifier {
            token: tok(TokenKind::Identifier, "x"),
            name: "x".to_string(),
            ty: RefCell::new(None),
        });
        assert!(ident.is_lvalue());

        let call = Expression::Call(FunctionCall {
            token: tok(TokenKind::Identifier, "f"),
            callee: Box::new(ident.clone()),
            arguments: vec![],
            ty: RefCell::new(None),
        });
        assert!(!call.is_lvalue());
    }

    #[test]
    fn render_is_deterministic_and_position_free() {
        let a = int_lit(42);
        let b = int_lit(42);
        assert_eq!(a.render(0), b.render(0));
        assert_eq!(a.render(0), "IntegerLiteral: 42");
    }
}
