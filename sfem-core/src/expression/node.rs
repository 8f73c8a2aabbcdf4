//! Expression tree and evaluation.

use super::Environment;
use crate::error::{Error, Result};

/// Binary operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Built-in functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Exp,
    Sqrt,
    Abs,
}

impl Function {
    /// Look up a function by name, ignoring case.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_lowercase().as_str() {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "exp" => Function::Exp,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            _ => return None,
        };
        Some(function)
    }

    fn apply(self, x: f64) -> Result<f64> {
        let value = match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Exp => x.exp(),
            Function::Sqrt => {
                if x < 0.0 {
                    return Err(Error::Evaluation(format!(
                        "square root of a negative number ({})",
                        x
                    )));
                }
                x.sqrt()
            }
            Function::Abs => x.abs(),
        };
        Ok(value)
    }
}

/// A node of a compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Number(f64),
    Variable(String),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Function, Box<Node>),
}

fn truth(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl Node {
    pub(crate) fn evaluate<E: Environment + ?Sized>(&self, env: &E) -> Result<f64> {
        match self {
            Node::Number(value) => Ok(*value),
            Node::Variable(name) => env
                .lookup(name)
                .ok_or_else(|| Error::Parse(format!("undefined variable '{}'", name))),
            Node::Neg(arg) => Ok(-arg.evaluate(env)?),
            Node::Not(arg) => Ok(truth(arg.evaluate(env)? == 0.0)),
            Node::Call(function, arg) => function.apply(arg.evaluate(env)?),
            Node::Binary(op, lhs, rhs) => {
                let a = lhs.evaluate(env)?;
                // `and`/`or` still evaluate both sides so that undefined variables are reported.
                let b = rhs.evaluate(env)?;
                let value = match op {
                    BinaryOp::Or => truth(a != 0.0 || b != 0.0),
                    BinaryOp::And => truth(a != 0.0 && b != 0.0),
                    BinaryOp::Eq => truth(a == b),
                    BinaryOp::Ne => truth(a != b),
                    BinaryOp::Lt => truth(a < b),
                    BinaryOp::Le => truth(a <= b),
                    BinaryOp::Gt => truth(a > b),
                    BinaryOp::Ge => truth(a >= b),
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => {
                        if b == 0.0 {
                            return Err(Error::Evaluation("division by zero".into()));
                        }
                        a / b
                    }
                    BinaryOp::Pow => a.powf(b),
                };
                Ok(value)
            }
        }
    }
}
