//! Recursive-descent parser producing an [`Expr`] tree.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('^' unary)?
//! primary := NUMBER | IDENT | IDENT '(' args ')' | '(' expr ')'
//! args    := expr (',' expr)*
//! ```
//!
//! `^` is right-associative and binds tighter than a leading minus, so `-2^2` is `-4`
//! and `2^-1` is `0.5`.

use super::lexer::{Token, TokenKind};
use super::{Constant, FormulaError, Function, MAX_NESTING_DEPTH};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    Constant(Constant),
    Variable(String),
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, FormulaError> {
    if tokens.is_empty() {
        return Err(FormulaError::EmptyExpression);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(unexpected(token)),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), FormulaError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(unexpected(token)),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Multiply,
                Some(TokenKind::Slash) => BinaryOp::Divide,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    // Every level of nesting (parentheses, call arguments, sign chains, exponent
    // towers) passes through here, so this is where depth is bounded.
    fn unary(&mut self) -> Result<Expr, FormulaError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(FormulaError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        let result = match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                self.unary().map(|operand| Expr::Negate(Box::new(operand)))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.primary()?;
        if self.peek_kind() == Some(&TokenKind::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(
                BinaryOp::Power,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.advance().ok_or(FormulaError::UnexpectedEnd)?;
        match &token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(*value)),
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.peek_kind() == Some(&TokenKind::LParen) {
                    self.pos += 1;
                    self.call(name)
                } else if let Some(constant) = Constant::from_name(name) {
                    Ok(Expr::Constant(constant))
                } else {
                    Ok(Expr::Variable(name.clone()))
                }
            }
            _ => Err(unexpected(token)),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, FormulaError> {
        let function =
            Function::from_name(name).ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

        let mut args = Vec::new();
        if self.peek_kind() != Some(&TokenKind::RParen) {
            loop {
                args.push(self.expr()?);
                if self.peek_kind() == Some(&TokenKind::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        if args.len() != function.arity() {
            return Err(FormulaError::WrongArity {
                function: function.name().to_string(),
                expected: function.arity(),
                found: args.len(),
            });
        }
        Ok(Expr::Call(function, args))
    }
}

fn unexpected(token: &Token) -> FormulaError {
    FormulaError::UnexpectedToken {
        found: token.kind.describe(),
        position: token.position,
    }
}
