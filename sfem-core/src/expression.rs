//! Arithmetic expression language for spatially-varying quantities.
//!
//! Material properties, loads, boundary values and region predicates are all
//! written as small expressions over the coordinates `x`, `y`, `z` and user
//! variables:
//!
//! ```
//! use std::collections::HashMap;
//! use sfem_core::expression::Expression;
//!
//! let expr: Expression = "203200 * (1 + 0.1 * sin(x))".parse().unwrap();
//! let env = HashMap::from([("x".to_string(), 0.0)]);
//! assert_eq!(expr.evaluate(&env).unwrap(), 203200.0);
//!
//! let region: Expression = "y == 0 and x >= 0".parse().unwrap();
//! let env = HashMap::from([("x".to_string(), 1.0), ("y".to_string(), 0.0)]);
//! assert!(region.is_true(&env).unwrap());
//! ```
//!
//! Booleans are represented as `1.0` / `0.0`; any non-zero value is truthy.

mod lexer;
mod node;
mod parser;

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Variable lookup used during evaluation.
pub trait Environment {
    /// Value of the variable `name`, if defined.
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl Environment for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: node::Node,
}

impl Expression {
    /// Compile `source` into an expression tree.
    ///
    /// An empty (or blank) source is rejected; callers that treat an empty
    /// predicate as "always true" must check for it first.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = lexer::tokenize(source)?;
        if tokens.is_empty() {
            return Err(Error::Parse("empty expression".into()));
        }
        let root = parser::parse(&tokens)?;
        Ok(Self {
            source: source.trim().to_string(),
            root,
        })
    }

    /// The source text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `env`.
    pub fn evaluate<E: Environment + ?Sized>(&self, env: &E) -> Result<f64> {
        self.root.evaluate(env)
    }

    /// Evaluate as a predicate.
    pub fn is_true<E: Environment + ?Sized>(&self, env: &E) -> Result<bool> {
        Ok(self.evaluate(env)? != 0.0)
    }
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn env(vars: &[(&str, f64)]) -> HashMap<String, f64> {
        vars.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    fn eval(source: &str, vars: &[(&str, f64)]) -> Result<f64> {
        Expression::parse(source)?.evaluate(&env(vars))
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_relative_eq!(eval("1 + 2 * 3", &[]).unwrap(), 7.0);
        assert_relative_eq!(eval("(1 + 2) * 3", &[]).unwrap(), 9.0);
        assert_relative_eq!(eval("10 - 4 - 3", &[]).unwrap(), 3.0);
        assert_relative_eq!(eval("8 / 4 / 2", &[]).unwrap(), 1.0);
        assert_relative_eq!(eval("2 * 3 ** 2", &[]).unwrap(), 18.0);
    }

    #[test]
    fn test_power_and_unary() {
        assert_relative_eq!(eval("2 ** 10", &[]).unwrap(), 1024.0);
        assert_relative_eq!(eval("2 ** -1", &[]).unwrap(), 0.5);
        assert_relative_eq!(eval("-2 ** 2", &[]).unwrap(), 4.0);
        assert_relative_eq!(eval("-(2 ** 2)", &[]).unwrap(), -4.0);
        assert_relative_eq!(eval("+3 - -3", &[]).unwrap(), 6.0);
        assert_relative_eq!(eval("2 ** (1 + 2)", &[]).unwrap(), 8.0);
    }

    #[test]
    fn test_comparisons_and_logic() {
        let vars = [("x", 1.0), ("y", 0.0)];
        assert_eq!(eval("y == 0 and x >= 0", &vars).unwrap(), 1.0);
        assert_eq!(eval("y != 0 or x < 0", &vars).unwrap(), 0.0);
        assert_eq!(eval("not x > 2", &vars).unwrap(), 1.0);
        assert_eq!(eval("not (x > 0 and y == 0)", &vars).unwrap(), 0.0);
        assert_eq!(eval("x <= 1 and x >= 1", &vars).unwrap(), 1.0);
        assert_eq!(eval("x + 1 == 2", &vars).unwrap(), 1.0);
    }

    #[test]
    fn test_functions() {
        assert_relative_eq!(eval("sin(0)", &[]).unwrap(), 0.0);
        assert_relative_eq!(eval("COS(0)", &[]).unwrap(), 1.0);
        assert_relative_eq!(eval("sqrt(16) + abs(-2)", &[]).unwrap(), 6.0);
        assert_relative_eq!(eval("exp(1)", &[]).unwrap(), std::f64::consts::E);
        assert_relative_eq!(eval("atan(1) * 4", &[]).unwrap(), std::f64::consts::PI);
    }

    #[test]
    fn test_matches_direct_evaluation() {
        let (x, y, z) = (0.3_f64, -1.7_f64, 2.25_f64);
        let vars = [("x", x), ("y", y), ("z", z), ("R", 2.5)];
        let cases: Vec<(&str, f64)> = vec![
            ("x * y + z / 2", x * y + z / 2.0),
            ("R ** 2 - x ** 2", 2.5_f64.powf(2.0) - x.powf(2.0)),
            ("sqrt(x ** 2 + y ** 2 + z ** 2)", (x * x + y * y + z * z).sqrt()),
            ("exp(-x) * cos(y) - tan(z / 4)", (-x).exp() * y.cos() - (z / 4.0).tan()),
            ("asin(x) + acos(x)", x.asin() + x.acos()),
            ("-x * (y - 3.5e-1) / R", -x * (y - 0.35) / 2.5),
        ];
        for (source, expected) in cases {
            assert_relative_eq!(eval(source, &vars).unwrap(), expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_errors() {
        assert!(matches!(eval("(1 + 2", &[]), Err(Error::Parse(_))));
        assert!(matches!(eval("1 + 2)", &[]), Err(Error::Parse(_))));
        assert!(matches!(eval("1 +", &[]), Err(Error::Parse(_))));
        assert!(matches!(eval("1 2", &[]), Err(Error::Parse(_))));
        assert!(matches!(eval("sqrt 4", &[]), Err(Error::Parse(_))));
        assert!(matches!(eval("foo(1)", &[]), Err(Error::Parse(_))));
        assert!(matches!(eval("q * 2", &[]), Err(Error::Parse(_))));
        assert!(matches!(eval("1 / (x - 1)", &[("x", 1.0)]), Err(Error::Evaluation(_))));
        assert!(matches!(eval("sqrt(-1)", &[]), Err(Error::Evaluation(_))));
        assert!(matches!(Expression::parse("   "), Err(Error::Parse(_))));
    }

    #[test]
    fn test_unbalanced_message() {
        let err = eval("(x", &[("x", 1.0)]).unwrap_err();
        assert!(err.to_string().contains("unbalanced brackets"));
    }

    #[test]
    fn test_reuse_with_different_environments() {
        let expr: Expression = "x * k".parse().unwrap();
        assert_eq!(expr.source(), "x * k");
        assert_relative_eq!(expr.evaluate(&env(&[("x", 2.0), ("k", 3.0)])).unwrap(), 6.0);
        assert_relative_eq!(expr.evaluate(&env(&[("x", -1.0), ("k", 3.0)])).unwrap(), -3.0);
    }
}
