//! Shared primitives used by the lexer, parser and driver.

pub mod cancel;
pub mod position;

pub use cancel::CancellationToken;
pub use position::Position;
