//! Allow-list tokenizer for formula text.
//!
//! Only digits, the four arithmetic operators, parentheses, comma, decimal
//! point, whitespace, and identifier characters are accepted. Anything else
//! fails the lex, which the public entry point degrades to a `0` result.

use super::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    /// Identifier, lowercased. Covers metric names and the `Math` namespace.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Dot,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // One fractional part, only when a digit follows the dot
                // (so `Math.round` after a number still lexes as Dot).
                if chars.peek() == Some(&'.') {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                        literal.push('.');
                        chars.next();
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                literal.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::MalformedNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            other => return Err(FormulaError::DisallowedCharacter(other)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_numbers_operators_and_idents() {
        let tokens = tokenize("sent + 2.5 * (delivered - 1)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("sent".to_string()),
                Token::Plus,
                Token::Number(2.5),
                Token::Star,
                Token::LParen,
                Token::Ident("delivered".to_string()),
                Token::Minus,
                Token::Number(1.0),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn identifiers_are_lowercased() {
        let tokens = tokenize("Math.Round(SENT)").unwrap();
        assert_eq!(tokens[0], Token::Ident("math".to_string()));
        assert_eq!(tokens[1], Token::Dot);
        assert_eq!(tokens[2], Token::Ident("round".to_string()));
        assert_eq!(tokens[4], Token::Ident("sent".to_string()));
    }

    #[test]
    fn rejects_characters_outside_the_allow_list() {
        for formula in ["a = b", "x => x", "a; b", "`cmd`", "a[0]", "a{b}", "\"s\""] {
            assert!(tokenize(formula).is_err(), "should reject {formula:?}");
        }
    }

    #[test]
    fn dot_after_number_is_a_dot_token() {
        // "2.max" must not swallow the dot into the number literal
        let tokens = tokenize("2.max").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Number(2.0), Token::Dot, Token::Ident("max".to_string())]
        );
    }
}
