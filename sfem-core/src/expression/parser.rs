//! Recursive-descent parser producing an expression tree.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or         := and ("or" and)*
//! and        := not ("and" not)*
//! not        := "not" not | comparison
//! comparison := additive (("==" | "!=" | "<" | "<=" | ">" | ">=") additive)*
//! additive   := term (("+" | "-") term)*
//! term       := power (("*" | "/") power)*
//! power      := unary ("**" unary)*
//! unary      := ("+" | "-") unary | primary
//! primary    := number | function "(" or ")" | variable | "(" or ")"
//! ```

use super::lexer::Token;
use super::node::{BinaryOp, Function, Node};
use crate::error::{Error, Result};

pub(crate) fn parse(tokens: &[Token]) -> Result<Node> {
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.or()?;
    match parser.peek() {
        None => Ok(node),
        Some(Token::RParen) => Err(Error::Parse("unbalanced brackets".into())),
        Some(token) => Err(Error::Parse(format!(
            "syntax error: unexpected {:?} after complete expression",
            token
        ))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if `select` maps it to an operator.
    fn operator(&mut self, select: impl Fn(&Token) -> Option<BinaryOp>) -> Option<BinaryOp> {
        let op = self.peek().and_then(&select)?;
        self.pos += 1;
        Some(op)
    }

    fn binary(lhs: Node, op: BinaryOp, rhs: Node) -> Node {
        Node::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    fn or(&mut self) -> Result<Node> {
        let mut lhs = self.and()?;
        while let Some(op) = self.operator(|t| (*t == Token::Or).then_some(BinaryOp::Or)) {
            let rhs = self.and()?;
            lhs = Self::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Node> {
        let mut lhs = self.not()?;
        while let Some(op) = self.operator(|t| (*t == Token::And).then_some(BinaryOp::And)) {
            let rhs = self.not()?;
            lhs = Self::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Node> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Node::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Node> {
        let mut lhs = self.additive()?;
        while let Some(op) = self.operator(|t| match t {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        }) {
            let rhs = self.additive()?;
            lhs = Self::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Node> {
        let mut lhs = self.term()?;
        while let Some(op) = self.operator(|t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        }) {
            let rhs = self.term()?;
            lhs = Self::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Node> {
        let mut lhs = self.power()?;
        while let Some(op) = self.operator(|t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            _ => None,
        }) {
            let rhs = self.power()?;
            lhs = Self::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn power(&mut self) -> Result<Node> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.operator(|t| (*t == Token::Pow).then_some(BinaryOp::Pow)) {
            let rhs = self.unary()?;
            lhs = Self::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Node::Number(*value)),
            Some(Token::Ident(name)) => {
                let Some(function) = Function::from_name(name) else {
                    if self.peek() == Some(&Token::LParen) {
                        return Err(Error::Parse(format!("unknown function '{}'", name)));
                    }
                    return Ok(Node::Variable(name.clone()));
                };
                if self.next() != Some(&Token::LParen) {
                    return Err(Error::Parse(format!(
                        "syntax error: expected '(' after function '{}'",
                        name
                    )));
                }
                let arg = self.bracketed()?;
                Ok(Node::Call(function, Box::new(arg)))
            }
            Some(Token::LParen) => self.bracketed(),
            Some(Token::RParen) => Err(Error::Parse("unbalanced brackets".into())),
            Some(token) => Err(Error::Parse(format!(
                "syntax error: unexpected {:?}",
                token
            ))),
            None => Err(Error::Parse(
                "syntax error: unexpected end of expression".into(),
            )),
        }
    }

    /// Parse the inside of a bracket pair whose `(` was already consumed.
    fn bracketed(&mut self) -> Result<Node> {
        let inner = self.or()?;
        match self.next() {
            Some(Token::RParen) => Ok(inner),
            _ => Err(Error::Parse("unbalanced brackets".into())),
        }
    }
}
