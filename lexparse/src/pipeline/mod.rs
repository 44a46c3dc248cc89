//! Lexer and parser composed into one call
//!
//! [`lex_parse`] starts the lexing task, runs the parser on the caller's thread
//! and always waits for the lexing task before returning.

mod error;

pub use crate::syntax::PartialTree;
pub use error::PipelineError;

use crate::config::RuntimeConfig;
use crate::lexical::{BufferedRuneReader, LexemeKind, Lexer, State};
use crate::logging::codes;
use crate::syntax::{ParseFn, Parser, Tree};
use crate::utils::CancellationToken;
use crate::{log_success, log_warning};
use std::time::Instant;

pub type PipelineResult<V> = Result<Tree<V>, PartialTree<V, PipelineError>>;

/// Lexes `reader` from `initial_state` and parses the lexemes from `init`.
///
/// A lexing failure takes precedence over whatever the parser reported. On
/// failure the tree built so far is returned with the error.
pub fn lex_parse<V, K, R>(
    cancel: &CancellationToken,
    reader: R,
    initial_state: Box<dyn State<K>>,
    init: Box<dyn ParseFn<V, K>>,
) -> PipelineResult<V>
where
    V: Default,
    K: LexemeKind,
    R: BufferedRuneReader + 'static,
{
    lex_parse_with_config(cancel, reader, initial_state, init, &RuntimeConfig::default())
}

/// [`lex_parse`] with explicit lexer and parser preferences
pub fn lex_parse_with_config<V, K, R>(
    cancel: &CancellationToken,
    reader: R,
    initial_state: Box<dyn State<K>>,
    init: Box<dyn ParseFn<V, K>>,
    config: &RuntimeConfig,
) -> PipelineResult<V>
where
    V: Default,
    K: LexemeKind,
    R: BufferedRuneReader + 'static,
{
    let start_time = Instant::now();
    let run = cancel.child_token();

    let lexer = Lexer::with_preferences(reader, initial_state, config.lexer.clone());
    let lexemes = lexer.lex(&run);
    let parsed = Parser::with_preferences(lexemes, config.parser.clone()).parse(&run, init);

    // The parser and its receiver are gone; stop the lexing task and join it.
    run.cancel();
    lexer.wait();

    let lexer_error = lexer.err().filter(|e| !e.is_cancelled());
    match (lexer_error, parsed) {
        (Some(lexer_error), Ok(tree)) => Err(PartialTree::new(tree, lexer_error.into())),
        (Some(lexer_error), Err(partial)) => {
            log_warning!(code = codes::pipeline::LEXER_ERROR_PRECEDENCE,
                "Lexer error supersedes parser error",
                "lexer_error" => &lexer_error,
                "parser_error" => &partial.error
            );
            Err(partial.map_err(|_| lexer_error.into()))
        }
        (None, Ok(tree)) => {
            let metrics = lexer.metrics();
            log_success!(codes::success::LEX_PARSE_COMPLETE, "Lex-parse finished",
                "lexemes" => metrics.lexemes_emitted,
                "nodes" => tree.node_count(),
                "duration_ms" => start_time.elapsed().as_millis()
            );
            Ok(tree)
        }
        (None, Err(partial)) => Err(partial.map_err(PipelineError::from)),
    }
}
