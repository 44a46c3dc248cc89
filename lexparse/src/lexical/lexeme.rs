//! Lexemes: classified, positioned substrings produced by the lexer.

use crate::utils::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bound for client-defined lexeme kinds.
///
/// Grammars declare their own `enum` of kinds; any small `Copy` type works.
pub trait LexemeKind: Copy + Eq + fmt::Debug + Send + 'static {}

impl<T> LexemeKind for T where T: Copy + Eq + fmt::Debug + Send + 'static {}

/// A classified lexeme. `pos`, `line` and `column` mark the zero-indexed start
/// of the lexeme's span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexeme<K> {
    pub kind: K,
    pub value: String,
    pub pos: usize,
    pub line: usize,
    pub column: usize,
}

impl<K> Lexeme<K> {
    pub fn new(kind: K, value: impl Into<String>, start: Position) -> Self {
        Self {
            kind,
            value: value.into(),
            pos: start.offset,
            line: start.line,
            column: start.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.pos, self.line, self.column)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl<K> fmt::Display for Lexeme<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum Kind {
        Word,
    }

    #[test]
    fn test_lexeme_position() {
        let lexeme = Lexeme::new(Kind::Word, "World!", Position::new(6, 0, 6));
        assert_eq!(lexeme.pos, 6);
        assert_eq!(lexeme.position(), Position::new(6, 0, 6));
        assert_eq!(lexeme.to_string(), "World!");
        assert!(!lexeme.is_empty());
    }

    #[test]
    fn test_lexeme_serializes() {
        let lexeme = Lexeme::new(Kind::Word, "Hello", Position::default());
        let json = serde_json::to_string(&lexeme).unwrap();
        assert!(json.contains("\"kind\":\"Word\""));
        assert!(json.contains("\"value\":\"Hello\""));
    }
}
