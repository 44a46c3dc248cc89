use crate::lexical::LexerError;
use crate::logging::Code;
use crate::syntax::SyntaxError;

/// Errors surfaced by [`lex_parse`](super::lex_parse)
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("Lexical analysis failed: {0}")]
    Lexical(#[from] LexerError),

    #[error("Syntax analysis failed: {0}")]
    Syntax(#[from] SyntaxError),
}

impl PipelineError {
    /// Whether the run was cancelled rather than failed
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Lexical(e) => e.is_cancelled(),
            Self::Syntax(e) => e.is_cancelled(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::Lexical(e) => e.error_code(),
            Self::Syntax(e) => e.error_code(),
        }
    }
}
