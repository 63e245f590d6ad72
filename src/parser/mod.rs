//! Hand-written recursive-descent parser with a single-token cursor.
//!
//! Implements the operator-precedence cascade `assign > addsub > muldiv >
//! func_call > unary > atom`. Two deviations from a strictly literal
//! transcription of the grammar are taken and recorded in `DESIGN.md`:
//! `muldiv`'s operands recurse through `func_call` rather than `number`
//! (the documented escape hatch), and the grammar is filled out with
//! productions the data model requires but the listed grammar omits —
//! `unsafe` blocks, array-length suffixes, unary `+ - * &`, and parenthesized
//! sub-expressions.

use std::cell::RefCell;

use crate::{
    ast::{
        expression::{
            ArrayInitList, BinaryOp, BinaryOperation, CharacterLiteral, Expression, FunctionCall,
            Identifier, IntegerLiteral, StringLiteral, UnaryOp, UnaryOperation,
        },
        statement::{
            Block, ExpressionStatement, FunctionDeclaration, ReturnStatement, Scope, Statement,
            UnsafeStatement, VariableDeclaration,
        },
        types::{PrimitiveIdentifier, Type},
    },
    diagnostics::Diagnostics,
    lexer::{Token, TokenKind},
};
use unescape::unescape;

/// Parses a complete token stream into an AST, mirroring `Parser::parse` /
/// `get_errors()` as a pair: the produced tree (always returned, even if
/// partial) and the accumulated diagnostics.
pub fn parse(tokens: Vec<Token>) -> (Statement, Diagnostics) {
    let mut parser = Parser::new(tokens);
    let ast = parser.parse();
    (ast, parser.diagnostics)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        assert!(
            !tokens.is_empty() && tokens.last().unwrap().kind == TokenKind::Eof,
            "token stream must be terminated by Eof"
        );
        Self {
            tokens,
            pos: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn get_errors(&self) -> &[crate::diagnostics::Diagnostic] {
        self.diagnostics.errors()
    }

    // --- cursor primitives -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// The most recently consumed token. Kept alongside `current`/`next` as
    /// one of the cursor's three peek primitives, even though no production
    /// below currently needs to look backward.
    #[allow(dead_code)]
    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn next(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.current().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Option<Token> {
        if self.current().kind == kind {
            Some(self.advance())
        } else {
            self.diagnostics.error(
                self.current(),
                format!("Expected {expected}, but got \"{}\"", self.current().text),
            );
            None
        }
    }

    // --- entry point ---------------------------------------------------

    /// Drives the top-level `block` production: a flat sequence of `scope`s.
    /// Returns success (no panic-mode resynchronization) by simply stopping
    /// at the first production that failed; `get_errors()` reports why.
    pub fn parse(&mut self) -> Statement {
        let token = self.current().clone();
        let mut statements = vec![];
        while self.current().kind != TokenKind::Eof {
            match self.scope() {
                Some(s) => statements.push(s),
                None => break,
            }
        }
        Statement::Block(Block { token, statements })
    }

    // --- statements ------------------------------------------------------

    /// `scope := '{' stmt* '}' | stmt`. A braced group introduces a new
    /// lexical frame at lowering time; an unbraced single statement does not.
    fn scope(&mut self) -> Option<Statement> {
        if self.current().kind == TokenKind::LBrace {
            let token = self.advance();
            let mut statements = vec![];
            while !matches!(self.current().kind, TokenKind::RBrace | TokenKind::Eof) {
                statements.push(self.stmt()?);
            }
            self.expect(TokenKind::RBrace, "'}'")?;
            Some(Statement::Scope(Scope { token, statements }))
        } else {
            self.stmt()
        }
    }

    fn stmt(&mut self) -> Option<Statement> {
        match self.current().kind {
            TokenKind::Unsafe => self.unsafe_stmt(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Unsigned
            | TokenKind::Signed
            | TokenKind::Char
            | TokenKind::Short
            | TokenKind::Int
            | TokenKind::Long
            | TokenKind::Void => self.var_decl(),
            _ => self.expr_stmt(),
        }
    }

    fn unsafe_stmt(&mut self) -> Option<Statement> {
        let token = self.advance();
        let inner = self.scope()?;
        Some(Statement::UnsafeStatement(UnsafeStatement {
            token,
            inner: Box::new(inner),
        }))
    }

    fn return_stmt(&mut self) -> Option<Statement> {
        let token = self.advance();
        if self.current().kind == TokenKind::Semicolon {
            self.advance();
            Some(Statement::ReturnStatement(ReturnStatement {
                token,
                value: None,
            }))
        } else {
            let value = self.expr()?;
            self.expect(TokenKind::Semicolon, "';'")?;
            Some(Statement::ReturnStatement(ReturnStatement {
                token,
                value: Some(value),
            }))
        }
    }

    fn expr_stmt(&mut self) -> Option<Statement> {
        let token = self.current().clone();
        let expression = self.expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(Statement::ExpressionStatement(ExpressionStatement {
            token,
            expression,
        }))
    }

    fn var_decl(&mut self) -> Option<Statement> {
        let token = self.current().clone();
        let base_type = self.type_()?;
        let name_token = self.expect(TokenKind::Identifier, "identifier")?;
        let name = name_token.text;

        let declared_type = if self.accept(TokenKind::LBracket) {
            let length_token = self.expect(TokenKind::IntegerLiteral, "array length")?;
            let length: u64 = length_token.text.parse().unwrap_or(0);
            self.expect(TokenKind::RBracket, "']'")?;
            Type::array(base_type, length)
        } else {
            base_type
        };

        match self.current().kind {
            TokenKind::Assign => {
                self.advance();
                let initializer = self.expr()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Some(Statement::VariableDeclaration(VariableDeclaration {
                    token,
                    declared_type,
                    name,
                    initializer: Some(initializer),
                }))
            }
            TokenKind::Semicolon => {
                self.advance();
                Some(Statement::VariableDeclaration(VariableDeclaration {
                    token,
                    declared_type,
                    name,
                    initializer: None,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                self.func_decl_tail(token, declared_type, name)
            }
            _ => {
                self.diagnostics.error(
                    self.current(),
                    format!(
                        "Expected '=', ';' or '(', but got \"{}\"",
                        self.current().text
                    ),
                );
                None
            }
        }
    }

    fn func_decl_tail(&mut self, token: Token, return_type: Type, name: String) -> Option<Statement> {
        let parameters = self.param_list()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.scope()?;
        Some(Statement::FunctionDeclaration(FunctionDeclaration {
            token,
            return_type,
            name,
            parameters,
            body: Box::new(body),
        }))
    }

    /// An empty parameter list and a bare `void` are equivalent.
    fn param_list(&mut self) -> Option<Vec<VariableDeclaration>> {
        if self.current().kind == TokenKind::RParen {
            return Some(vec![]);
        }
        if self.current().kind == TokenKind::Void && self.next().kind == TokenKind::RParen {
            self.advance();
            return Some(vec![]);
        }
        let mut params = vec![self.param()?];
        while self.accept(TokenKind::Comma) {
            params.push(self.param()?);
        }
        Some(params)
    }

    fn param(&mut self) -> Option<VariableDeclaration> {
        let token = self.current().clone();
        let declared_type = self.type_()?;
        let name = if self.current().kind == TokenKind::Identifier {
            self.advance().text
        } else {
            String::new()
        };
        Some(VariableDeclaration {
            token,
            declared_type,
            name,
            initializer: None,
        })
    }

    fn type_(&mut self) -> Option<Type> {
        let is_unsigned = if self.accept(TokenKind::Unsigned) {
            true
        } else {
            self.accept(TokenKind::Signed);
            false
        };

        let token = self.current().clone();
        let identifier = match token.kind {
            TokenKind::Char => PrimitiveIdentifier::Char,
            TokenKind::Short => PrimitiveIdentifier::Short,
            TokenKind::Int => PrimitiveIdentifier::Int,
            TokenKind::Long => PrimitiveIdentifier::Long,
            TokenKind::Void => PrimitiveIdentifier::Void,
            _ => {
                self.diagnostics
                    .error(&token, format!("Expected type, but got \"{}\"", token.text));
                return None;
            }
        };
        self.advance();

        let mut ty = Type::simple(identifier, is_unsigned);
        loop {
            if self.accept(TokenKind::Star) {
                ty = Type::pointer(ty);
            } else if self.accept(TokenKind::Amp) {
                ty = Type::reference(ty);
                break;
            } else {
                break;
            }
        }
        Some(ty)
    }

    // --- expressions -----------------------------------------------------

    fn expr(&mut self) -> Option<Expression> {
        self.assign()
    }

    /// Right-associative: operands collect left-to-right, the last becomes
    /// the fold seed, the rest fold right into nested assignment nodes.
    fn assign(&mut self) -> Option<Expression> {
        let mut operands = vec![self.addsub()?];
        let mut last_token = None;
        while self.current().kind == TokenKind::Assign {
            last_token = Some(self.advance());
            operands.push(self.addsub()?);
        }

        if operands.len() == 1 {
            return Some(operands.pop().unwrap());
        }

        let token = last_token.expect("loop ran at least once");
        let mut rev = operands.into_iter().rev();
        let mut acc = rev.next().expect("at least two operands collected");
        for operand in rev {
            acc = Expression::Binary(BinaryOperation {
                token: token.clone(),
                op: BinaryOp::Assign,
                lhs: Box::new(operand),
                rhs: Box::new(acc),
                ty: RefCell::new(None),
            });
        }
        Some(acc)
    }

    fn addsub(&mut self) -> Option<Expression> {
        let mut lhs = self.muldiv()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let token = self.advance();
            let rhs = self.muldiv()?;
            lhs = Expression::Binary(BinaryOperation {
                token,
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                ty: RefCell::new(None),
            });
        }
        Some(lhs)
    }

    /// Right operand is `func_call`, not the `number` the literal grammar
    /// names — the documented escape hatch (see module docs).
    fn muldiv(&mut self) -> Option<Expression> {
        let mut lhs = self.func_call()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let token = self.advance();
            let rhs = self.func_call()?;
            lhs = Expression::Binary(BinaryOperation {
                token,
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                ty: RefCell::new(None),
            });
        }
        Some(lhs)
    }

    fn func_call(&mut self) -> Option<Expression> {
        let callee = self.unary()?;
        if self.current().kind == TokenKind::LParen {
            let token = self.advance();
            let mut arguments = vec![];
            if self.current().kind != TokenKind::RParen {
                arguments.push(self.expr()?);
                while self.accept(TokenKind::Comma) {
                    arguments.push(self.expr()?);
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
            Some(Expression::Call(FunctionCall {
                token,
                callee: Box::new(callee),
                arguments,
                ty: RefCell::new(None),
            }))
        } else {
            Some(callee)
        }
    }

    fn unary(&mut self) -> Option<Expression> {
        let op = match self.current().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Amp => UnaryOp::Ref,
            _ => return self.atom(),
        };
        let token = self.advance();
        let operand = self.unary()?;
        Some(Expression::Unary(UnaryOperation {
            token,
            op,
            operand: Box::new(operand),
            ty: RefCell::new(None),
        }))
    }

    fn atom(&mut self) -> Option<Expression> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::IntegerLiteral => {
                self.advance();
                let value = token.text.parse::<i32>().unwrap_or(0);
                Some(Expression::Integer(IntegerLiteral {
                    token,
                    value,
                    ty: RefCell::new(None),
                }))
            }
            TokenKind::CharacterLiteral => {
                self.advance();
                let unescaped = unescape(&token.text).unwrap_or_else(|| token.text.clone());
                let value = unescaped.bytes().next().unwrap_or(0) as i8;
                Some(Expression::Character(CharacterLiteral {
                    token,
                    value,
                    ty: RefCell::new(None),
                }))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let value = unescape(&token.text).unwrap_or_else(|| token.text.clone());
                Some(Expression::Str(StringLiteral {
                    token,
                    value,
                    ty: RefCell::new(None),
                }))
            }
            TokenKind::Identifier => {
                self.advance();
                let name = token.text.clone();
                Some(Expression::Identifier(Identifier {
                    token,
                    name,
                    ty: RefCell::new(None),
                }))
            }
            TokenKind::LBrace => self.array_init_list(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Some(inner)
            }
            _ => {
                self.diagnostics
                    .error(&token, format!("Unexpected \"{}\"", token.text));
                None
            }
        }
    }

    /// `{ expr (',' expr)* }`, only meaningful as a declaration initializer;
    /// lowering it anywhere else is an error (§4.4).
    fn array_init_list(&mut self) -> Option<Expression> {
        let token = self.advance();
        let mut elements = vec![];
        if self.current().kind != TokenKind::RBrace {
            elements.push(self.expr()?);
            while self.accept(TokenKind::Comma) {
                elements.push(self.expr()?);
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Some(Expression::ArrayInit(ArrayInitList {
            token,
            elements,
            ty: RefCell::new(None),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> (Statement, Diagnostics) {
        parse(lex(src).unwrap())
    }

    #[test]
    fn parses_minimal_function() {
        let (ast, diags) = parse_src("int main() { return 0; }");
        assert!(!diags.has_errors());
        let Statement::Block(block) = ast else { panic!() };
        assert_eq!(block.statements.len(), 1);
        assert!(matches!(block.statements[0], Statement::FunctionDeclaration(_)));
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let (ast, diags) = parse_src("int x = 1 + 2 * 3;");
        assert!(!diags.has_errors());
        let Statement::Block(block) = ast else { panic!() };
        let Statement::VariableDeclaration(decl) = &block.statements[0] else { panic!() };
        assert_eq!(decl.initializer.as_ref().unwrap().evaluate(), Some(crate::eval::EvalValue::Signed(7)));
    }

    #[test]
    fn trailing_comma_in_call_is_a_syntax_error() {
        let (_, diags) = parse_src("int main() { return f(1,); }");
        assert!(diags.has_errors());
    }

    #[test]
    fn unbraced_function_body_is_a_syntax_error() {
        // the grammar's `scope` production requires a body for func_decl_tail;
        // an empty parameter list followed directly by ';' is malformed.
        let (_, diags) = parse_src("int f();");
        assert!(diags.has_errors());
    }

    #[test]
    fn parses_unsafe_pointer_declaration() {
        let (ast, diags) = parse_src("unsafe { int* p = &x; }");
        assert!(!diags.has_errors());
        let Statement::Block(block) = ast else { panic!() };
        assert!(matches!(block.statements[0], Statement::UnsafeStatement(_)));
    }

    #[test]
    fn parses_array_declaration() {
        let (ast, diags) = parse_src("int a[3] = {1, 2, 3};");
        assert!(!diags.has_errors());
        let Statement::Block(block) = ast else { panic!() };
        let Statement::VariableDeclaration(decl) = &block.statements[0] else { panic!() };
        assert!(matches!(decl.declared_type, Type::Array(_, 3)));
    }

    #[test]
    fn string_literal_unescapes_escape_sequences() {
        let (ast, diags) = parse_src(r#"char* s = "a\nb";"#);
        assert!(!diags.has_errors());
        let Statement::Block(block) = ast else { panic!() };
        let Statement::VariableDeclaration(decl) = &block.statements[0] else { panic!() };
        let Some(Expression::Str(lit)) = &decl.initializer else { panic!() };
        assert_eq!(lit.value, "a\nb");
    }
}
