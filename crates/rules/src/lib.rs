//! Trigger rule language.
//!
//! A rule is a small boolean expression over regular-expression literals,
//! used to decide whether a dynamic prompt term is injected:
//!
//! ```text
//! "dragon|wyvern" & !("tavern" | "inn")
//! ```
//!
//! Literals are double-quoted, case-insensitive patterns matched anywhere
//! in the context text. Precedence is `!` > `&` > `|`; parentheses group.
//! An empty rule always triggers.
//!
//! Parsing never panics: every malformed input maps to a [`RuleError`]
//! variant carrying the offending position. Deciding what a failed rule
//! means is left to the caller.

mod lexer;
mod parser;

pub use lexer::Position;
pub use parser::{Expr, Pattern, evaluate, parse_rule};

/// Errors from parsing a rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedCharacter { ch: char, pos: Position },

    #[error("unterminated string starting at {pos}")]
    UnterminatedString { pos: Position },

    #[error("unexpected token {found} at {pos}")]
    UnexpectedToken { found: String, pos: Position },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parentheses at {pos}")]
    UnbalancedParentheses { pos: Position },

    #[error("invalid pattern {pattern:?} at {pos}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
        pos: Position,
    },
}

impl RuleError {
    /// Whether this is a regex compile failure rather than a syntax error.
    pub fn is_pattern_error(&self) -> bool {
        matches!(self, RuleError::InvalidPattern { .. })
    }
}
