//! Character scanner for rule expressions.

use crate::RuleError;

/// Line/column of a token's first character, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Not,
    And,
    Or,
    /// Unescaped body of a double-quoted literal
    Str(String),
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Not => f.write_str("'!'"),
            TokenKind::And => f.write_str("'&'"),
            TokenKind::Or => f.write_str("'|'"),
            TokenKind::Str(s) => write!(f, "string {s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

/// Split a rule expression into tokens.
///
/// Inside string literals only `\"` and `\\` are escapes. A backslash
/// before any other character is kept, so regex escapes like `\d` reach
/// the pattern intact.
pub fn tokenize(input: &str) -> Result<Vec<Token>, RuleError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;
    let mut column = 1;

    while let Some(&c) = chars.peek() {
        let pos = Position { line, column };
        chars.next();
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }

        let kind = match c {
            _ if c.is_whitespace() => continue,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '!' => TokenKind::Not,
            '&' => TokenKind::And,
            '|' => TokenKind::Or,
            '"' => {
                let mut s = String::new();
                let mut escaped = false;
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        line += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                    if escaped {
                        if ch != '"' && ch != '\\' {
                            s.push('\\');
                        }
                        s.push(ch);
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == '"' {
                        closed = true;
                        break;
                    } else {
                        s.push(ch);
                    }
                }
                if !closed {
                    return Err(RuleError::UnterminatedString { pos });
                }
                TokenKind::Str(s)
            }
            other => return Err(RuleError::UnexpectedCharacter { ch: other, pos }),
        };
        tokens.push(Token { kind, pos });
    }

    Ok(tokens)
}
