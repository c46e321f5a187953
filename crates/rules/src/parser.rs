//! Recursive-descent parser and evaluator for trigger rules.
//!
//! Grammar:
//! ```text
//! expression = term ("|" term)*
//! term       = factor ("&" factor)*
//! factor     = "!" factor | "(" expression ")" | STRING
//! ```
//!
//! Each `STRING` is a case-insensitive regular expression that matches if
//! it is found anywhere in the context text.

use crate::lexer::{Position, Token, TokenKind, tokenize};
use crate::RuleError;
use regex_lite::{Regex, RegexBuilder};

/// A parsed rule.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Empty rule: always triggers.
    Always,
    /// A compiled pattern literal.
    Pattern(Pattern),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// A pattern literal, compiled once at parse time.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    regex: Regex,
}

impl Pattern {
    fn compile(source: String, pos: Position) -> Result<Self, RuleError> {
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| RuleError::InvalidPattern {
                pattern: source.clone(),
                reason: e.to_string(),
                pos,
            })?;
        Ok(Self { source, regex })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl Expr {
    /// Evaluate against the context text.
    pub fn evaluate(&self, text: &str) -> bool {
        match self {
            Expr::Always => true,
            Expr::Pattern(p) => p.is_match(text),
            Expr::Not(inner) => !inner.evaluate(text),
            Expr::And(a, b) => a.evaluate(text) && b.evaluate(text),
            Expr::Or(a, b) => a.evaluate(text) || b.evaluate(text),
        }
    }
}

/// Parse a rule into an [`Expr`] tree.
///
/// Returns `Ok(Expr::Always)` for empty or whitespace-only input.
pub fn parse_rule(input: &str) -> Result<Expr, RuleError> {
    if input.trim().is_empty() {
        return Ok(Expr::Always);
    }
    let tokens = tokenize(input)?;
    let (expr, rest) = parse_or(&tokens)?;
    match rest.first() {
        None => Ok(expr),
        Some(Token {
            kind: TokenKind::RParen,
            pos,
        }) => Err(RuleError::UnbalancedParentheses { pos: *pos }),
        Some(token) => Err(unexpected(token)),
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(rule: &str, text: &str) -> Result<bool, RuleError> {
    Ok(parse_rule(rule)?.evaluate(text))
}

fn unexpected(token: &Token) -> RuleError {
    RuleError::UnexpectedToken {
        found: token.kind.to_string(),
        pos: token.pos,
    }
}

fn parse_or(tokens: &[Token]) -> Result<(Expr, &[Token]), RuleError> {
    let (mut left, mut rest) = parse_and(tokens)?;
    while let Some(Token { kind: TokenKind::Or, .. }) = rest.first() {
        let (right, remaining) = parse_and(&rest[1..])?;
        left = Expr::Or(Box::new(left), Box::new(right));
        rest = remaining;
    }
    Ok((left, rest))
}

fn parse_and(tokens: &[Token]) -> Result<(Expr, &[Token]), RuleError> {
    let (mut left, mut rest) = parse_factor(tokens)?;
    while let Some(Token { kind: TokenKind::And, .. }) = rest.first() {
        let (right, remaining) = parse_factor(&rest[1..])?;
        left = Expr::And(Box::new(left), Box::new(right));
        rest = remaining;
    }
    Ok((left, rest))
}

fn parse_factor(tokens: &[Token]) -> Result<(Expr, &[Token]), RuleError> {
    let Some(token) = tokens.first() else {
        return Err(RuleError::UnexpectedEnd);
    };
    match &token.kind {
        TokenKind::Not => {
            let (inner, rest) = parse_factor(&tokens[1..])?;
            Ok((Expr::Not(Box::new(inner)), rest))
        }
        TokenKind::LParen => {
            let (inner, rest) = parse_or(&tokens[1..])?;
            match rest.first() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => Ok((inner, &rest[1..])),
                None => Err(RuleError::UnbalancedParentheses { pos: token.pos }),
                Some(other) => Err(unexpected(other)),
            }
        }
        TokenKind::Str(source) => {
            let pattern = Pattern::compile(source.clone(), token.pos)?;
            Ok((Expr::Pattern(pattern), &tokens[1..]))
        }
        _ => Err(unexpected(token)),
    }
}
