//! # Parser
//!
//! Recursive-descent parser from tokens to an [`Expr`] tree.
//!
//! ## Grammar
//!
//! Lowest to highest precedence; `^` is right-associative.
//!
//! ```text
//! statement      := IDENT '=' expr | expr
//! expr           := additive (('in' | 'to' | 'as') UNIT)*
//! additive       := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/' | 'of') unary)*
//! unary          := '-' unary | '+' unary | power
//! power          := postfix ('^' unary)?
//! postfix        := primary ['%'] [UNIT]
//! primary        := NUMBER | IDENT '(' args ')' | IDENT | '(' expr ')'
//! ```
//!
//! `in`, `to`, `as` and `of` are keywords and never name a variable. A
//! trailing `in` with no unit after it (`5 in`, `1 ft + 6 in`) means inches.

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::lexer::{tokenize, Token};
use crate::units;

/// Words reserved by the grammar
const KEYWORDS: [&str; 4] = ["in", "to", "as", "of"];

/// Unit an `in` stands for when nothing follows it to convert to
const INCH: &str = "inch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// `p% of x`
    Of,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Of => "of",
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Variable(String),
    /// `x%`
    Percent(Box<Expr>),
    /// `x <unit>`
    WithUnit { expr: Box<Expr>, unit: String },
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call { name: String, args: Vec<Expr> },
    /// `x in <unit>`
    Convert { expr: Box<Expr>, target: String },
}

/// A parsed input line, minus any label
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expr(Expr),
    Assign { name: String, expr: Expr },
}

/// Parse one statement (assignment or expression).
///
/// # Example
/// ```
/// use calc_core::parser::{parse_statement, Statement};
///
/// let stmt = parse_statement("x = 2 + 3").unwrap();
/// assert!(matches!(stmt, Statement::Assign { ref name, .. } if name == "x"));
/// ```
pub fn parse_statement(input: &str) -> CalcResult<Statement> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::parse("empty expression"));
    }

    if let [Token::Ident(name), Token::Assign, rest @ ..] = tokens.as_slice() {
        if KEYWORDS.contains(&name.as_str()) {
            return Err(CalcError::parse(format!("cannot assign to keyword: {}", name)));
        }
        let expr = Parser::new(rest.to_vec()).parse_all()?;
        return Ok(Statement::Assign {
            name: name.clone(),
            expr,
        });
    }

    Ok(Statement::Expr(Parser::new(tokens).parse_all()?))
}

/// Parse a plain expression (no assignment).
pub fn parse_expression(input: &str) -> CalcResult<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::parse("empty expression"));
    }
    Parser::new(tokens).parse_all()
}

/// Split a leading `label:` off a line.
///
/// The label must start with a letter and contain only letters, digits,
/// spaces and underscores; anything else leaves the line untouched.
pub fn split_label(line: &str) -> (Option<&str>, &str) {
    if let Some((head, tail)) = line.split_once(':') {
        let label = head.trim();
        let valid = label.chars().next().is_some_and(char::is_alphabetic)
            && label.chars().all(|c| c.is_alphanumeric() || c == ' ' || c == '_');
        if valid {
            return (Some(label), tail.trim());
        }
    }
    (None, line)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn parse_all(mut self) -> CalcResult<Expr> {
        if self.tokens.is_empty() {
            return Err(CalcError::parse("empty expression"));
        }
        let expr = self.expression()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(CalcError::parse(format!("unexpected token: {}", token))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, words: &[&str]) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if words.contains(&name.as_str()))
    }

    fn expect(&mut self, expected: Token, message: &str) -> CalcResult<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            _ => Err(CalcError::parse(message)),
        }
    }

    fn expression(&mut self) -> CalcResult<Expr> {
        let mut expr = self.additive()?;
        while self.peek_keyword(&["in", "to", "as"]) {
            self.advance();
            let target = match self.advance() {
                Some(Token::Ident(name)) if units::is_unit(&name) => name,
                Some(Token::Ident(name)) => return Err(CalcError::UnknownUnit { unit: name }),
                Some(token) => return Err(CalcError::parse(format!("unexpected token: {}", token))),
                None => return Err(CalcError::parse("unexpected end of expression")),
            };
            expr = Expr::Convert {
                expr: Box::new(expr),
                target,
            };
        }
        Ok(expr)
    }

    fn additive(&mut self) -> CalcResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> CalcResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Ident(word)) if word == "of" => BinaryOp::Of,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> CalcResult<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Negate(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> CalcResult<Expr> {
        let base = self.postfix()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> CalcResult<Expr> {
        let mut expr = self.primary()?;
        if matches!(self.peek(), Some(Token::Percent)) {
            self.advance();
            expr = Expr::Percent(Box::new(expr));
        }
        if let Some(Token::Ident(name)) = self.peek() {
            let unit = if name == "in" && !matches!(self.peek_at(1), Some(Token::Ident(_))) {
                // `in` with no conversion target after it
                Some(INCH.to_string())
            } else if !KEYWORDS.contains(&name.as_str())
                && units::is_unit(name)
                && !matches!(self.peek_at(1), Some(Token::LParen))
            {
                Some(name.clone())
            } else {
                None
            };
            if let Some(unit) = unit {
                self.advance();
                expr = Expr::WithUnit {
                    expr: Box::new(expr),
                    unit,
                };
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> CalcResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => {
                if KEYWORDS.contains(&name.as_str()) {
                    return Err(CalcError::parse(format!("unexpected token: {}", name)));
                }
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let args = self.arguments()?;
                    return Ok(Expr::Call { name, args });
                }
                Ok(Expr::Variable(name))
            }
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(Token::RParen, "unclosed parenthesis")?;
                Ok(expr)
            }
            Some(token) => Err(CalcError::parse(format!("unexpected token: {}", token))),
            None => Err(CalcError::parse("unexpected end of expression")),
        }
    }

    /// Arguments after an opening parenthesis, through the closing one
    fn arguments(&mut self) -> CalcResult<Vec<Expr>> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => return Err(CalcError::parse("unclosed function call")),
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_expression("2 ^ 3 ^ 2").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Pow, left, right } => {
                assert_eq!(left, num(2.0));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse_expression("-2^2").unwrap();
        assert!(matches!(expr, Expr::Negate(inner) if matches!(*inner, Expr::Binary { op: BinaryOp::Pow, .. })));
    }

    #[test]
    fn test_units_and_conversion() {
        let expr = parse_expression("5 ft in m").unwrap();
        match expr {
            Expr::Convert { expr, target } => {
                assert_eq!(target, "m");
                assert!(matches!(*expr, Expr::WithUnit { ref unit, .. } if unit == "ft"));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_percent_of() {
        let expr = parse_expression("20% of 50").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Of, .. }));
    }

    #[test]
    fn test_function_call_with_arguments() {
        let expr = parse_expression("sqrt(16)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                name: "sqrt".to_string(),
                args: vec![Expr::Number(16.0)],
            }
        );
        let empty = parse_expression("now()").unwrap();
        assert!(matches!(empty, Expr::Call { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn test_trailing_in_is_inch_suffix() {
        let expr = parse_expression("5 in").unwrap();
        assert!(matches!(expr, Expr::WithUnit { ref unit, .. } if unit == "inch"));

        let expr = parse_expression("5 in cm").unwrap();
        assert!(matches!(expr, Expr::Convert { ref target, .. } if target == "cm"));

        let expr = parse_expression("(2 in) * 3").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_expression("(1 + 2").unwrap_err().to_string(), "unclosed parenthesis");
        assert_eq!(parse_expression("1 +").unwrap_err().to_string(), "unexpected end of expression");
        assert_eq!(parse_expression("1 2").unwrap_err().to_string(), "unexpected token: 2");
        assert_eq!(parse_expression("sqrt(1").unwrap_err().to_string(), "unclosed function call");
        assert_eq!(parse_expression("  ").unwrap_err().to_string(), "empty expression");
    }

    #[test]
    fn test_unknown_conversion_target() {
        let err = parse_expression("5 m in parsecs").unwrap_err();
        assert_eq!(err, CalcError::UnknownUnit { unit: "parsecs".to_string() });
    }

    #[test]
    fn test_assignment() {
        let stmt = parse_statement("rate = 5%").unwrap();
        match stmt {
            Statement::Assign { name, expr } => {
                assert_eq!(name, "rate");
                assert_eq!(expr, Expr::Percent(num(5.0)));
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_split_label() {
        assert_eq!(split_label("Rent: 1200 USD"), (Some("Rent"), "1200 USD"));
        assert_eq!(split_label("monthly rent: 10"), (Some("monthly rent"), "10"));
        assert_eq!(split_label("2 + 2"), (None, "2 + 2"));
        assert_eq!(split_label("(a): 3"), (None, "(a): 3"));
    }
}
