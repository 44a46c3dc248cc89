// Internal modules
pub mod config;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod pipeline;
pub mod syntax;
pub mod utils;

// Re-export key types for grammar authors
pub use lexical::{
    state_fn, BufferedRuneReader, Lexeme, LexemeKind, Lexemes, Lexer, LexerError, RuneReader,
    State, StateResult,
};
pub use pipeline::{lex_parse, lex_parse_with_config, PipelineError, PipelineResult};
pub use syntax::{parse_fn, NodeId, ParseFn, ParseStep, Parser, PartialTree, SyntaxError, Tree};
pub use utils::{CancellationToken, Position};
