//! Recursive-descent parser producing the fixed arithmetic AST.
//!
//! Grammar (standard precedence, left-associative):
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := unary (('*' | '/') unary)*
//! unary      := ('-' | '+') unary | primary
//! primary    := NUMBER
//!             | '(' expression ')'
//!             | 'math' '.' IDENT '(' expression (',' expression)* ')'
//!             | 'math' '.' IDENT            (constants PI and E)
//!             | IDENT                       (metric reference)
//! ```
//!
//! There are no assignments, no user-defined functions, and no identifiers
//! outside the `Math` namespace and the metric value table, so the parsed
//! expression cannot express anything but arithmetic.

use super::eval::{MathConstant, MathFunction};
use super::lexer::Token;
use super::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    /// Reference to another metric's computed value, by normalized name
    Metric(String),
    Constant(MathConstant),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Call { function: MathFunction, arguments: Vec<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, FormulaError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(FormulaError::UnexpectedToken(format!("{token:?}"))),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), FormulaError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken(format!("{token:?}"))),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.unary()?),
                })
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(*value)),
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Ident(name)) if name == "math" => self.math_member(),
            Some(Token::Ident(name)) => Ok(Expr::Metric(name.clone())),
            Some(token) => Err(FormulaError::UnexpectedToken(format!("{token:?}"))),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    /// A `Math.member` reference: a function call or a constant.
    fn math_member(&mut self) -> Result<Expr, FormulaError> {
        self.expect(&Token::Dot)?;
        let member = match self.advance() {
            Some(Token::Ident(name)) => name.clone(),
            Some(token) => return Err(FormulaError::UnexpectedToken(format!("{token:?}"))),
            None => return Err(FormulaError::UnexpectedEnd),
        };

        if self.peek() == Some(&Token::LParen) {
            let function = MathFunction::from_name(&member).ok_or_else(|| FormulaError::UnknownFunction(member.clone()))?;
            self.advance();
            let mut arguments = vec![self.expression()?];
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                arguments.push(self.expression()?);
            }
            self.expect(&Token::RParen)?;
            Ok(Expr::Call { function, arguments })
        } else {
            let constant = MathConstant::from_name(&member).ok_or(FormulaError::UnknownFunction(member))?;
            Ok(Expr::Constant(constant))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::lexer::tokenize;

    fn parsed(formula: &str) -> Result<Expr, FormulaError> {
        parse(&tokenize(formula)?)
    }

    #[test]
    fn precedence_puts_multiplication_inside_addition() {
        let expr = parsed("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_namespaced_calls_and_constants() {
        assert!(matches!(
            parsed("Math.round(1.5)").unwrap(),
            Expr::Call {
                function: MathFunction::Round,
                ..
            }
        ));
        assert!(matches!(parsed("Math.PI").unwrap(), Expr::Constant(MathConstant::Pi)));
        assert!(matches!(parsed("math.e").unwrap(), Expr::Constant(MathConstant::E)));
    }

    #[test]
    fn rejects_unknown_math_members() {
        assert!(matches!(parsed("Math.random()"), Err(FormulaError::UnknownFunction(_))));
        assert!(matches!(parsed("Math.NaN"), Err(FormulaError::UnknownFunction(_))));
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parsed("1 2").is_err());
        assert!(parsed("sent sent").is_err());
    }

    #[test]
    fn rejects_empty_and_truncated_input() {
        assert!(matches!(parsed(""), Err(FormulaError::UnexpectedEnd)));
        assert!(matches!(parsed("1 +"), Err(FormulaError::UnexpectedEnd)));
        assert!(matches!(parsed("Math.round(1"), Err(FormulaError::UnexpectedEnd)));
    }

    #[test]
    fn bare_identifiers_are_metric_references() {
        assert_eq!(parsed("Sent").unwrap(), Expr::Metric("sent".to_string()));
    }
}
