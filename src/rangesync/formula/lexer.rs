//! Tokenizer for formula expressions.

use super::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Caret => "^".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Comma => ",".to_string(),
        }
    }
}

/// A token plus the character offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let position = i;

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            // `**` is accepted as an alias of `^`
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                TokenKind::Caret
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            c if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i + 1)) => {
                let (number, next) = read_number(&chars, i)?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    position,
                });
                i = next;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = i;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(chars[i..end].iter().collect()),
                    position,
                });
                i = end;
                continue;
            }
            other => {
                return Err(FormulaError::UnexpectedCharacter {
                    character: other,
                    position,
                })
            }
        };

        tokens.push(Token { kind, position });
        i += 1;
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], index: usize) -> bool {
    chars.get(index).map_or(false, |c| c.is_ascii_digit())
}

/// Read a decimal literal with an optional exponent, returning the value and the
/// index just past it.
fn read_number(chars: &[char], start: usize) -> Result<(f64, usize), FormulaError> {
    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end < chars.len() && chars[end] == '.' {
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
    }

    // The exponent is only consumed when digits follow, so `2*E` and `2E` keep `E`
    // as an identifier.
    if end < chars.len() && (chars[end] == 'e' || chars[end] == 'E') {
        let mut exp_end = end + 1;
        if exp_end < chars.len() && (chars[exp_end] == '+' || chars[exp_end] == '-') {
            exp_end += 1;
        }
        if next_is_digit(chars, exp_end) {
            while exp_end < chars.len() && chars[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            end = exp_end;
        }
    }

    let literal: String = chars[start..end].iter().collect();
    literal
        .parse::<f64>()
        .map(|value| (value, end))
        .map_err(|_| FormulaError::InvalidNumber {
            literal,
            position: start,
        })
}
