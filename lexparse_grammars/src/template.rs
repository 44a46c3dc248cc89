//! Text templates with `{{ name }}` substitution actions
//!
//! Lexing alternates between a text state and an action state. Parsing
//! appends one node per lexeme under the root, and [`execute`] walks the root's
//! children substituting action names from a data map.

use lexparse::syntax::ParseStep;
use lexparse::{
    lex_parse, parse_fn, state_fn, CancellationToken, Lexer, LexerError, Parser, PipelineError,
    RuneReader, StateResult, Tree,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub const ACTION_LEFT: &str = "{{";
pub const ACTION_RIGHT: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateKind {
    Text,
    Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum TemplateNode {
    #[default]
    Root,
    Text(String),
    Action(String),
}

impl fmt::Display for TemplateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateNode::Root => Ok(()),
            TemplateNode::Text(text) => write!(f, "{:?}", text),
            TemplateNode::Action(name) => write!(f, "{}{}{}", ACTION_LEFT, name, ACTION_RIGHT),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown symbol: {0:?}")]
    UnknownSymbol(String),

    #[error(transparent)]
    Parse(#[from] PipelineError),
}

/// Lexes plain text up to the next action.
pub fn state_text(lexer: &Lexer<TemplateKind>) -> StateResult<TemplateKind> {
    let found = lexer.find(&[ACTION_LEFT]);

    let text = lexer.lexeme(TemplateKind::Text);
    if !text.is_empty() {
        lexer.emit(text);
    }

    found?;
    Ok(Some(state_fn(state_action)))
}

/// Lexes the body of an action. An action left open at end of input is an
/// error.
pub fn state_action(lexer: &Lexer<TemplateKind>) -> StateResult<TemplateKind> {
    lexer.discard(ACTION_LEFT.chars().count())?;
    let start = lexer.position();

    match lexer.find(&[ACTION_RIGHT]) {
        Ok(_) => {
            let action = lexer.lexeme(TemplateKind::Action);
            if action.value.trim().is_empty() {
                lexer.ignore();
            } else {
                lexer.emit(action);
            }
            lexer.discard(ACTION_RIGHT.chars().count())?;
            Ok(Some(state_fn(state_text)))
        }
        Err(e) if e.is_end_of_input() => Err(LexerError::invalid_input(
            format!("unterminated action, expected {:?}", ACTION_RIGHT),
            start,
        )),
        Err(e) => Err(e),
    }
}

/// Dispatches on the kind of the next lexeme.
pub fn parse_init(
    _: &CancellationToken,
    p: &mut Parser<TemplateNode, TemplateKind>,
) -> ParseStep<TemplateNode, TemplateKind> {
    match p.peek().map(|lexeme| lexeme.kind) {
        None => Ok(None),
        Some(TemplateKind::Text) => Ok(Some(parse_fn(parse_text))),
        Some(TemplateKind::Action) => Ok(Some(parse_fn(parse_action))),
    }
}

pub fn parse_text(
    _: &CancellationToken,
    p: &mut Parser<TemplateNode, TemplateKind>,
) -> ParseStep<TemplateNode, TemplateKind> {
    let Some(lexeme) = p.next() else {
        return Ok(None);
    };
    p.node(TemplateNode::Text(lexeme.value));
    Ok(Some(parse_fn(parse_init)))
}

pub fn parse_action(
    _: &CancellationToken,
    p: &mut Parser<TemplateNode, TemplateKind>,
) -> ParseStep<TemplateNode, TemplateKind> {
    let Some(lexeme) = p.next() else {
        return Ok(None);
    };
    p.node(TemplateNode::Action(lexeme.value.trim().to_string()));
    Ok(Some(parse_fn(parse_init)))
}

/// Parses a template into a flat tree of text and action nodes.
pub fn parse(
    cancel: &CancellationToken,
    input: &str,
) -> Result<Tree<TemplateNode>, TemplateError> {
    lex_parse(
        cancel,
        RuneReader::from_text(input),
        state_fn(state_text),
        parse_fn(parse_init),
    )
    .map_err(|partial| TemplateError::Parse(partial.error))
}

/// Renders a parsed template with the given data.
pub fn execute(
    tree: &Tree<TemplateNode>,
    data: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::new();
    for child in tree.child_ids(tree.root()) {
        match tree.value(child) {
            TemplateNode::Text(text) => out.push_str(text),
            TemplateNode::Action(name) => match data.get(name) {
                Some(value) => out.push_str(value),
                None => return Err(TemplateError::UnknownSymbol(name.clone())),
            },
            TemplateNode::Root => {}
        }
    }
    Ok(out)
}

/// Parses and renders `input` in one go.
pub fn render(input: &str, data: &HashMap<String, String>) -> Result<String, TemplateError> {
    let tree = parse(&CancellationToken::new(), input)?;
    execute(&tree, data)
}
