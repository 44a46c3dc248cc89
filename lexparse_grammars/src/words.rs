//! Whitespace-separated words

use lexparse::{CancellationToken, Lexeme, Lexer, RuneReader, State, StateResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WordKind {
    Word,
}

/// Emits every run of non-whitespace as a word.
pub struct WordState;

impl State<WordKind> for WordState {
    fn run(self: Box<Self>, lexer: &Lexer<WordKind>) -> StateResult<WordKind> {
        loop {
            let result = lexer.read_rune();
            let boundary = match &result {
                Ok(rune) => rune.is_whitespace(),
                Err(e) => e.is_end_of_input(),
            };
            if boundary {
                let mut word = lexer.lexeme(WordKind::Word);
                word.value.truncate(word.value.trim_end().len());
                if word.value.is_empty() {
                    lexer.ignore();
                } else {
                    lexer.emit(word);
                }
            }
            result?;
        }
    }
}

/// Lexes `text` into words.
pub fn lex_words(text: &str) -> Vec<Lexeme<WordKind>> {
    let lexer = Lexer::new(RuneReader::from_text(text), Box::new(WordState));
    let words = lexer.lex(&CancellationToken::new()).collect();
    lexer.wait();
    words
}
