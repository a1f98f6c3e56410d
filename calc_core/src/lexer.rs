//! Tokenizer for calculator input lines.
//!
//! Numbers accept decimal (`12`, `.5`, `1.5e3`) and prefixed integer forms
//! (`0x1f`, `0b101`, `0o17`). Identifiers start with a letter or `_`.
//! Unknown characters are an error, not skipped.

use crate::errors::{CalcError, CalcResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    LParen,
    RParen,
    Comma,
    Assign,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Assign => write!(f, "="),
        }
    }
}

/// Split `input` into tokens.
///
/// # Example
/// ```
/// use calc_core::lexer::{tokenize, Token};
///
/// let tokens = tokenize("2 * (x + 0x10)").unwrap();
/// assert_eq!(tokens[0], Token::Number(2.0));
/// assert_eq!(tokens[4], Token::Plus);
/// assert_eq!(tokens[5], Token::Number(16.0));
/// ```
pub fn tokenize(input: &str) -> CalcResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit())) {
            let (number, next) = lex_number(&chars, pos)?;
            tokens.push(Token::Number(number));
            pos = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' | '×' => Token::Star,
            '/' | '÷' => Token::Slash,
            '^' => Token::Caret,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '=' => Token::Assign,
            other => {
                return Err(CalcError::parse(format!("unexpected character '{}' at {}", other, pos)));
            }
        };
        tokens.push(token);
        pos += 1;
    }

    Ok(tokens)
}

/// Lex one numeric literal starting at `start`, returning it and the next position.
fn lex_number(chars: &[char], start: usize) -> CalcResult<(f64, usize)> {
    if chars[start] == '0' {
        if let Some(radix) = chars.get(start + 1).and_then(|p| radix_for(*p)) {
            let mut pos = start + 2;
            while pos < chars.len() && chars[pos].is_digit(radix) {
                pos += 1;
            }
            let digits: String = chars[start + 2..pos].iter().collect();
            let text: String = chars[start..pos].iter().collect();
            if digits.is_empty() {
                return Err(CalcError::parse(format!("invalid number: {}", text)));
            }
            return i64::from_str_radix(&digits, radix)
                .map(|n| (n as f64, pos))
                .map_err(|_| CalcError::parse(format!("invalid number: {}", text)));
        }
    }

    let mut pos = start;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < chars.len() && chars[pos] == '.' {
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    // Exponent only when followed by digits, so "2e" stays "2" then ident "e"
    if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
        let mut exp = pos + 1;
        if exp < chars.len() && (chars[exp] == '+' || chars[exp] == '-') {
            exp += 1;
        }
        if exp < chars.len() && chars[exp].is_ascii_digit() {
            while exp < chars.len() && chars[exp].is_ascii_digit() {
                exp += 1;
            }
            pos = exp;
        }
    }

    let text: String = chars[start..pos].iter().collect();
    text.parse::<f64>()
        .map(|n| (n, pos))
        .map_err(|_| CalcError::parse(format!("invalid number: {}", text)))
}

fn radix_for(prefix: char) -> Option<u32> {
    match prefix {
        'x' | 'X' => Some(16),
        'b' | 'B' => Some(2),
        'o' | 'O' => Some(8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators_and_parens() {
        let tokens = tokenize("(1+2)*3^4/5-6%").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Number(1.0),
                Token::Plus,
                Token::Number(2.0),
                Token::RParen,
                Token::Star,
                Token::Number(3.0),
                Token::Caret,
                Token::Number(4.0),
                Token::Slash,
                Token::Number(5.0),
                Token::Minus,
                Token::Number(6.0),
                Token::Percent,
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(0.5)]);
        assert_eq!(tokenize("1.5e3").unwrap(), vec![Token::Number(1500.0)]);
        assert_eq!(tokenize("0xff").unwrap(), vec![Token::Number(255.0)]);
        assert_eq!(tokenize("0b101").unwrap(), vec![Token::Number(5.0)]);
        assert_eq!(tokenize("0o17").unwrap(), vec![Token::Number(15.0)]);
    }

    #[test]
    fn test_exponent_requires_digits() {
        assert_eq!(
            tokenize("2e").unwrap(),
            vec![Token::Number(2.0), Token::Ident("e".to_string())]
        );
    }

    #[test]
    fn test_identifiers_and_assignment() {
        assert_eq!(
            tokenize("total_cost = 5 USD").unwrap(),
            vec![
                Token::Ident("total_cost".to_string()),
                Token::Assign,
                Token::Number(5.0),
                Token::Ident("USD".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_error() {
        let err = tokenize("2 $ 3").unwrap_err();
        assert_eq!(err.to_string(), "unexpected character '$' at 2");
    }

    #[test]
    fn test_bad_prefixed_number() {
        assert!(tokenize("0x").is_err());
    }
}
