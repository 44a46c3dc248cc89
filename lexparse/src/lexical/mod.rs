//! Lexical analysis: rune readers, the lexer state machine and its output
//! stream.

pub mod error;
pub mod lexeme;
pub mod lexer;
pub mod reader;
pub mod state;
pub mod stream;

pub use error::LexerError;
pub use lexeme::{Lexeme, LexemeKind};
pub use lexer::{Lexer, LexerMetrics};
pub use reader::{BufferedRuneReader, RuneReader};
pub use state::{state_fn, State, StateFn, StateResult};
pub use stream::Lexemes;
