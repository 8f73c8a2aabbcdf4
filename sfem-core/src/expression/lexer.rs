//! Tokenizer for the expression language.

use crate::error::{Error, Result};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

/// Split `source` into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit()));
        if starts_number {
            let (value, next) = lex_number(&chars, pos)?;
            tokens.push(Token::Number(value));
            pos = next;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            let token = match word.to_ascii_lowercase().as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                _ => Token::Ident(word),
            };
            tokens.push(token);
            continue;
        }

        let (token, width) = match (c, chars.get(pos + 1).copied()) {
            ('*', Some('*')) => (Token::Pow, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            _ => {
                return Err(Error::Parse(format!(
                    "syntax error: unexpected character '{}' at position {}",
                    c, pos
                )))
            }
        };
        tokens.push(token);
        pos += width;
    }

    Ok(tokens)
}

/// Lex a numeric literal starting at `start`, returning its value and the next position.
fn lex_number(chars: &[char], start: usize) -> Result<(f64, usize)> {
    let mut pos = start;
    let digits = |pos: &mut usize| {
        while *pos < chars.len() && chars[*pos].is_ascii_digit() {
            *pos += 1;
        }
    };

    digits(&mut pos);
    if pos < chars.len() && chars[pos] == '.' {
        pos += 1;
        digits(&mut pos);
    }
    if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
        pos += 1;
        if pos < chars.len() && (chars[pos] == '+' || chars[pos] == '-') {
            pos += 1;
        }
        let exponent_start = pos;
        digits(&mut pos);
        if pos == exponent_start {
            return Err(Error::Parse(format!(
                "syntax error: malformed exponent in number at position {}",
                start
            )));
        }
    }

    let text: String = chars[start..pos].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|e| Error::Parse(format!("syntax error: bad number '{}': {}", text, e)))?;
    Ok((value, pos))
}
