//! Syntax error types for parse functions and tree operations
//!
//! Parse functions report grammar violations through these variants; the
//! parser trampoline treats `EndOfInput` as normal termination.

use super::tree::Tree;
use crate::logging::{codes, Code};
use crate::utils::Position;
use std::fmt;
use std::sync::Arc;

pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Errors raised by parse functions and cursor operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyntaxError {
    #[error("end of input")]
    EndOfInput,

    #[error("parsing cancelled")]
    Cancelled,

    #[error("missing required node")]
    MissingRequiredNode,

    #[error("unexpected lexeme: expected {expected}, found '{found}' at {position}")]
    UnexpectedLexeme {
        found: String,
        expected: String,
        position: Position,
    },

    #[error("missing lexeme: expected {expected}")]
    MissingLexeme { expected: String },

    #[error("grammar violation: {message} at {position}")]
    GrammarViolation { message: String, position: Position },

    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl SyntaxError {
    pub fn unexpected_lexeme(found: &str, expected: &str, position: Position) -> Self {
        Self::UnexpectedLexeme {
            found: found.to_string(),
            expected: expected.to_string(),
            position,
        }
    }

    pub fn missing_lexeme(expected: &str) -> Self {
        Self::MissingLexeme {
            expected: expected.to_string(),
        }
    }

    pub fn grammar_violation(message: &str, position: Position) -> Self {
        Self::GrammarViolation {
            message: message.to_string(),
            position,
        }
    }

    /// Wraps a client error raised inside a parse function
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            Self::EndOfInput => codes::syntax::END_OF_INPUT,
            Self::Cancelled => codes::pipeline::CANCELLED,
            Self::MissingRequiredNode => codes::tree::MISSING_REQUIRED_NODE,
            Self::UnexpectedLexeme { .. } => codes::syntax::UNEXPECTED_LEXEME,
            Self::MissingLexeme { .. } => codes::syntax::MISSING_LEXEME,
            Self::GrammarViolation { .. } => codes::syntax::GRAMMAR_VIOLATION,
            Self::Other(_) => codes::syntax::PARSE_FN_FAILURE,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Self::UnexpectedLexeme { position, .. } | Self::GrammarViolation { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Self::EndOfInput)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A failed parse: the tree built before the failure together with the error.
///
/// Trees are never discarded on failure so callers can inspect partial output.
pub struct PartialTree<V, E> {
    pub tree: Tree<V>,
    pub error: E,
}

impl<V, E> PartialTree<V, E> {
    pub fn new(tree: Tree<V>, error: E) -> Self {
        Self { tree, error }
    }

    /// Converts the error, keeping the tree
    pub fn map_err<F, T>(self, f: F) -> PartialTree<V, T>
    where
        F: FnOnce(E) -> T,
    {
        PartialTree {
            tree: self.tree,
            error: f(self.error),
        }
    }

    pub fn into_parts(self) -> (Tree<V>, E) {
        (self.tree, self.error)
    }
}

impl<V: fmt::Debug, E: fmt::Debug> fmt::Debug for PartialTree<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialTree")
            .field("error", &self.error)
            .field("nodes", &self.tree.node_count())
            .finish()
    }
}

impl<V, E: fmt::Display> fmt::Display for PartialTree<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<V: fmt::Debug, E: std::error::Error> std::error::Error for PartialTree<V, E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}
