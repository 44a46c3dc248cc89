//! The state-machine contract implemented by lexical grammars.

use super::error::LexerError;
use super::lexer::Lexer;

/// Result of running one lexing state: the next state, or `None` when lexing
/// is finished.
pub type StateResult<K> = Result<Option<Box<dyn State<K>>>, LexerError>;

/// One step of the lexer's finite-state machine.
///
/// `run` consumes the boxed state, so struct-backed states can move their data
/// into whichever state comes next.
pub trait State<K>: Send {
    fn run(self: Box<Self>, lexer: &Lexer<K>) -> StateResult<K>;
}

/// Adapter that runs a closure or plain function as a [`State`].
pub struct StateFn<F>(F);

impl<K, F> State<K> for StateFn<F>
where
    F: FnOnce(&Lexer<K>) -> StateResult<K> + Send,
{
    fn run(self: Box<Self>, lexer: &Lexer<K>) -> StateResult<K> {
        (self.0)(lexer)
    }
}

/// Boxes a function as a lexing state.
pub fn state_fn<K, F>(f: F) -> Box<dyn State<K>>
where
    K: 'static,
    F: FnOnce(&Lexer<K>) -> StateResult<K> + Send + 'static,
{
    Box::new(StateFn(f))
}
