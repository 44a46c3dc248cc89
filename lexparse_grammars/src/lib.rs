// Grammars built on the lexparse engine
pub mod calc;
pub mod template;
pub mod words;

pub use calc::{evaluate, CalcError};
pub use template::{render, TemplateError};
pub use words::{lex_words, WordState};
