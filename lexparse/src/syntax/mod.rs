//! Syntax: the output tree, the cursor-driven parser and its errors.

pub mod error;
pub mod parser;
pub mod tree;

pub use error::{PartialTree, SyntaxError, SyntaxResult};
pub use parser::{parse_fn, ParseFn, ParseFunc, ParseStep, Parser};
pub use tree::{Node, NodeId, Tree};
