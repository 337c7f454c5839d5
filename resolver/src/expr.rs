//! Boolean requirement expressions over integration names.
//!
//! The `integrations-required` annotation admits identifiers combined with
//! `&&`, `||`, `!` and parentheses. Identifiers that are not part of the
//! evaluation mapping evaluate to `false` rather than failing, so an
//! unconfigured integration reads as missing instead of as a parse error.

use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("Unexpected character {ch:?} at offset {pos}")]
    InvalidCharacter { pos: usize, ch: char },

    #[error("Unexpected token {token:?} at offset {pos}")]
    UnexpectedToken { pos: usize, token: String },

    #[error("Expression ended unexpectedly")]
    UnexpectedEnd,

    #[error("Trailing input at offset {pos}")]
    TrailingInput { pos: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn parse(input: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        match parser.peek() {
            Some((pos, _)) => Err(ExprError::TrailingInput { pos: *pos }),
            None => Ok(expr),
        }
    }

    /// Evaluates against a lookup of identifier truth values. Identifiers
    /// the lookup does not know evaluate to `false`.
    pub fn eval<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        match self {
            Self::Ident(name) => lookup(name),
            Self::Not(inner) => !inner.eval(lookup),
            Self::And(lhs, rhs) => lhs.eval(lookup) && rhs.eval(lookup),
            Self::Or(lhs, rhs) => lhs.eval(lookup) || rhs.eval(lookup),
        }
    }

    /// Every identifier appearing in the expression, deduplicated and
    /// sorted.
    pub fn identifiers(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Ident(name) => {
                out.insert(name.as_str());
            }
            Self::Not(inner) => inner.collect_identifiers(out),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_identifiers(out);
                rhs.collect_identifiers(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((pos, Token::Open));
            }
            ')' => {
                chars.next();
                tokens.push((pos, Token::Close));
            }
            '!' => {
                chars.next();
                tokens.push((pos, Token::Not));
            }
            '&' | '|' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, next)) if next == ch => {
                        chars.next();
                        tokens.push((
                            pos,
                            if ch == '&' { Token::And } else { Token::Or },
                        ));
                    }
                    _ => return Err(ExprError::InvalidCharacter { pos, ch }),
                }
            }
            _ if is_ident_char(ch) => {
                let mut ident = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !is_ident_char(ch) {
                        break;
                    }
                    ident.push(ch);
                    chars.next();
                }
                tokens.push((pos, Token::Ident(ident)));
            }
            _ => return Err(ExprError::InvalidCharacter { pos, ch }),
        }
    }
    Ok(tokens)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.'
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.and_expr()?;
        while matches!(self.peek(), Some((_, Token::Or))) {
            self.next();
            let rhs = self.and_expr()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.unary()?;
        while matches!(self.peek(), Some((_, Token::And))) {
            self.next();
            let rhs = self.unary()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some((_, Token::Not)) => Ok(Expr::Not(Box::new(self.unary()?))),
            Some((_, Token::Ident(name))) => Ok(Expr::Ident(name)),
            Some((_, Token::Open)) => {
                let expr = self.or_expr()?;
                match self.next() {
                    Some((_, Token::Close)) => Ok(expr),
                    Some((pos, token)) => Err(ExprError::UnexpectedToken {
                        pos,
                        token: format!("{token:?}"),
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some((pos, token)) => Err(ExprError::UnexpectedToken {
                pos,
                token: format!("{token:?}"),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truthy(names: &[&str]) -> impl Fn(&str) -> bool {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        move |name: &str| names.iter().any(|n| n == name)
    }

    #[test]
    fn single_identifier() {
        let expr = Expr::parse("acs").unwrap();
        assert!(expr.eval(&truthy(&["acs"])));
        assert!(!expr.eval(&truthy(&[])));
    }

    #[test]
    fn boolean_combination() {
        let expr = Expr::parse("(github || gitlab) && quay").unwrap();
        assert!(expr.eval(&truthy(&["gitlab", "quay"])));
        assert!(!expr.eval(&truthy(&["quay"])));
        assert!(!expr.eval(&truthy(&["github"])));
    }

    #[test]
    fn negation() {
        let expr = Expr::parse("!acs || quay").unwrap();
        assert!(expr.eval(&truthy(&[])));
        assert!(!expr.eval(&truthy(&["acs"])));
        assert!(expr.eval(&truthy(&["acs", "quay"])));
    }

    #[test]
    fn unknown_identifier_parses_and_evaluates_false() {
        let expr = Expr::parse("never-registered").unwrap();
        assert!(!expr.eval(&truthy(&["acs"])));
        assert!(expr.identifiers().contains("never-registered"));
    }

    #[test]
    fn identifiers_are_collected_once() {
        let expr = Expr::parse("a && (a || b)").unwrap();
        assert_eq!(
            expr.identifiers().into_iter().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Expr::parse("a & b"),
            Err(ExprError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            Expr::parse("(a || b"),
            Err(ExprError::UnexpectedEnd)
        ));
        assert!(matches!(
            Expr::parse("a b"),
            Err(ExprError::TrailingInput { .. })
        ));
        assert!(matches!(Expr::parse(""), Err(ExprError::UnexpectedEnd)));
    }
}
