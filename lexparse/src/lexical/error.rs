//! Lexical error type

use crate::config::compile_time::lexical::MAX_LEXEME_SIZE;
use crate::logging::{codes, Code};
use crate::utils::Position;
use std::sync::Arc;

/// Errors raised by the reader, the lexer primitives and client lexing states.
///
/// The three end-of-input variants are not failures: the lexing task treats
/// them as the normal termination signal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LexerError {
    #[error("end of input")]
    EndOfInput,

    #[error("end of input after peeking {} runes", .runes.len())]
    ShortPeek { runes: Vec<char> },

    #[error("end of input after {consumed} of {requested} runes")]
    ShortRead { consumed: usize, requested: usize },

    #[error("lexing cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("unexpected character {character:?} at {position}")]
    UnexpectedCharacter { character: char, position: Position },

    #[error("{message} at {position}")]
    InvalidInput { message: String, position: Position },

    #[error("lexeme too large: {size} bytes (max {})", MAX_LEXEME_SIZE)]
    LexemeTooLong { size: usize },

    #[error("could not start lexing task: {message}")]
    TaskSpawn { message: String },

    #[error("lexing state panicked")]
    StatePanicked,

    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl LexerError {
    /// Wraps a client error raised inside a lexing state
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LexerError::Other(Arc::new(error))
    }

    pub fn invalid_input(message: impl Into<String>, position: Position) -> Self {
        LexerError::InvalidInput {
            message: message.into(),
            position,
        }
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(
            self,
            LexerError::EndOfInput | LexerError::ShortPeek { .. } | LexerError::ShortRead { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LexerError::Cancelled)
    }

    pub fn error_code(&self) -> Code {
        match self {
            LexerError::EndOfInput
            | LexerError::ShortPeek { .. }
            | LexerError::ShortRead { .. } => codes::lexical::END_OF_INPUT,
            LexerError::Cancelled => codes::pipeline::CANCELLED,
            LexerError::Io(_) => codes::input::IO_ERROR,
            LexerError::UnexpectedCharacter { .. } => codes::lexical::UNEXPECTED_CHARACTER,
            LexerError::InvalidInput { .. } => codes::lexical::INVALID_INPUT,
            LexerError::LexemeTooLong { .. } => codes::lexical::LEXEME_TOO_LONG,
            LexerError::TaskSpawn { .. } => codes::input::TASK_SPAWN_FAILURE,
            LexerError::StatePanicked => codes::system::INTERNAL_ERROR,
            LexerError::Other(_) => codes::lexical::STATE_FAILURE,
        }
    }

    /// Position attached to the error, if any
    pub fn position(&self) -> Option<Position> {
        match self {
            LexerError::UnexpectedCharacter { position, .. }
            | LexerError::InvalidInput { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LexerError {
    fn from(error: std::io::Error) -> Self {
        LexerError::Io(Arc::new(error))
    }
}
