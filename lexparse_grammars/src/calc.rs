//! Integer arithmetic with `+ - * /`
//!
//! Grammar:
//!
//! ```text
//! exp   -> exp addOp exp | term
//! addOp -> '+' | '-'
//! term  -> term mulOp term | factor
//! mulOp -> '*' | '/'
//! factor -> number
//! ```
//!
//! The parser reads one lexeme at a time and never backtracks. Operators are
//! pushed under the cursor and then rotated into place, so the finished tree
//! has multiplication bound tighter than addition and both left-associative.

use lexparse::{
    lex_parse, parse_fn, CancellationToken, Lexeme, Lexer, LexerError, NodeId, ParseStep, Parser,
    PipelineError, RuneReader, State, StateResult, SyntaxError, Tree,
};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CalcKind {
    #[default]
    Unset,
    MulOp,
    AddOp,
    Number,
}

impl CalcKind {
    pub fn is_operator(self) -> bool {
        matches!(self, CalcKind::MulOp | CalcKind::AddOp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalcToken {
    pub kind: CalcKind,
    pub value: String,
}

impl From<Lexeme<CalcKind>> for CalcToken {
    fn from(lexeme: Lexeme<CalcKind>) -> Self {
        Self {
            kind: lexeme.kind,
            value: lexeme.value,
        }
    }
}

impl fmt::Display for CalcToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("overflow evaluating '{operator}'")]
    Overflow { operator: String },

    #[error("malformed expression tree at '{operator}' with {children} operands")]
    MalformedTree { operator: String, children: usize },

    #[error(transparent)]
    Parse(#[from] PipelineError),
}

/// Lexing state for numbers and operators. Whitespace between lexemes is
/// optional.
#[derive(Debug, Default)]
pub struct CalcLexState {
    pending: CalcKind,
}

impl CalcLexState {
    /// Emits the number being accumulated, if any.
    fn flush(&mut self, lexer: &Lexer<CalcKind>) {
        if self.pending == CalcKind::Number {
            lexer.emit(lexer.lexeme(CalcKind::Number));
        }
        self.pending = CalcKind::Unset;
    }

    fn operator(&mut self, lexer: &Lexer<CalcKind>, kind: CalcKind) -> Result<(), LexerError> {
        self.flush(lexer);
        lexer.advance(1)?;
        lexer.emit(lexer.lexeme(kind));
        Ok(())
    }
}

impl State<CalcKind> for CalcLexState {
    fn run(mut self: Box<Self>, lexer: &Lexer<CalcKind>) -> StateResult<CalcKind> {
        loop {
            let next = match lexer.peek(1) {
                Ok(runes) => runes.first().copied(),
                Err(e) if e.is_end_of_input() => None,
                Err(e) => return Err(e),
            };
            let Some(rune) = next else {
                self.flush(lexer);
                return Ok(None);
            };

            match rune {
                '0'..='9' => {
                    lexer.advance(1)?;
                    self.pending = CalcKind::Number;
                }
                '+' | '-' => self.operator(lexer, CalcKind::AddOp)?,
                '*' | '/' => self.operator(lexer, CalcKind::MulOp)?,
                c if c.is_whitespace() => {
                    self.flush(lexer);
                    lexer.discard(1)?;
                }
                c => {
                    return Err(LexerError::UnexpectedCharacter {
                        character: c,
                        position: lexer.position(),
                    })
                }
            }
        }
    }
}

type CalcParser = Parser<CalcToken, CalcKind>;
type CalcStep = ParseStep<CalcToken, CalcKind>;

/// Dispatches on the kind of the next lexeme.
pub fn parse_root(_: &CancellationToken, p: &mut CalcParser) -> CalcStep {
    let Some(lexeme) = p.peek() else {
        return Ok(None);
    };
    match lexeme.kind {
        CalcKind::Number => Ok(Some(parse_fn(parse_nat_num))),
        CalcKind::AddOp => Ok(Some(parse_fn(parse_add_op))),
        CalcKind::MulOp => Ok(Some(parse_fn(parse_mul_op))),
        CalcKind::Unset => Err(SyntaxError::grammar_violation(
            "lexeme without a kind",
            lexeme.position(),
        )),
    }
}

/// Parses the leading operand.
pub fn parse_nat_num(_: &CancellationToken, p: &mut CalcParser) -> CalcStep {
    let lexeme = p.next().ok_or(SyntaxError::missing_lexeme("number"))?;
    if p.pos() != p.tree().root() {
        return Err(SyntaxError::unexpected_lexeme(
            &lexeme.value,
            "operator",
            lexeme.position(),
        ));
    }
    p.push(lexeme.into());
    Ok(Some(parse_fn(parse_root)))
}

/// Parses `+` or `-` and its right operand.
///
/// The cursor first climbs out of any operator subtree so the new operator
/// takes everything to its left as its left operand.
pub fn parse_add_op(_: &CancellationToken, p: &mut CalcParser) -> CalcStep {
    let lexeme = p.next().ok_or(SyntaxError::missing_lexeme("operator"))?;
    if p.pos_value().kind == CalcKind::Unset {
        return Err(SyntaxError::unexpected_lexeme(
            &lexeme.value,
            "number",
            lexeme.position(),
        ));
    }

    while let Some(parent) = p.tree().parent(p.pos()) {
        if !p.tree().value(parent).kind.is_operator() {
            break;
        }
        p.climb();
    }

    p.push(lexeme.into());
    p.rotate_left()?;
    operand(p)?;
    Ok(Some(parse_fn(parse_root)))
}

/// Parses `*` or `/` and its right operand.
///
/// After a number or another multiplication the operator takes the cursor's
/// subtree as its left operand. After an addition it takes the addition's
/// right operand instead, binding tighter.
pub fn parse_mul_op(_: &CancellationToken, p: &mut CalcParser) -> CalcStep {
    let lexeme = p.next().ok_or(SyntaxError::missing_lexeme("operator"))?;
    match p.pos_value().kind {
        CalcKind::Number | CalcKind::MulOp => {
            p.push(lexeme.into());
            p.rotate_left()?;
        }
        CalcKind::AddOp => {
            p.push(lexeme.into());
            p.adopt_sibling()?;
        }
        CalcKind::Unset => {
            return Err(SyntaxError::unexpected_lexeme(
                &lexeme.value,
                "number",
                lexeme.position(),
            ))
        }
    }
    operand(p)?;
    Ok(Some(parse_fn(parse_root)))
}

/// Appends the number following an operator under the cursor.
fn operand(p: &mut CalcParser) -> Result<NodeId, SyntaxError> {
    let lexeme = p
        .next()
        .ok_or(SyntaxError::missing_lexeme("number after operator"))?;
    if lexeme.kind != CalcKind::Number {
        return Err(SyntaxError::unexpected_lexeme(
            &lexeme.value,
            "number",
            lexeme.position(),
        ));
    }
    Ok(p.node(lexeme.into()))
}

/// Lexes and parses `input` into an expression tree under an empty root.
pub fn parse(cancel: &CancellationToken, input: &str) -> Result<Tree<CalcToken>, CalcError> {
    lex_parse(
        cancel,
        RuneReader::from_text(input),
        Box::new(CalcLexState::default()),
        parse_fn(parse_root),
    )
    .map_err(|partial| CalcError::Parse(partial.error))
}

/// Evaluates the expression held by `tree`.
pub fn calculate(tree: &Tree<CalcToken>) -> Result<i64, CalcError> {
    let root = tree.root();
    let mut expressions = tree.child_ids(root);
    let expression = expressions.next().ok_or(CalcError::Empty)?;
    if expressions.next().is_some() {
        return Err(CalcError::MalformedTree {
            operator: tree.value(root).value.clone(),
            children: tree.child_ids(root).count(),
        });
    }
    evaluate_node(tree, expression)
}

fn evaluate_node(tree: &Tree<CalcToken>, id: NodeId) -> Result<i64, CalcError> {
    let token = tree.value(id);
    match token.kind {
        CalcKind::Number => token
            .value
            .parse()
            .map_err(|_| CalcError::InvalidNumber(token.value.clone())),
        CalcKind::AddOp | CalcKind::MulOp => {
            let operands: Vec<NodeId> = tree.child_ids(id).collect();
            let [left, right] = operands[..] else {
                return Err(CalcError::MalformedTree {
                    operator: token.value.clone(),
                    children: operands.len(),
                });
            };
            let left = evaluate_node(tree, left)?;
            let right = evaluate_node(tree, right)?;

            let result = match token.value.as_str() {
                "+" => left.checked_add(right),
                "-" => left.checked_sub(right),
                "*" => left.checked_mul(right),
                "/" if right == 0 => return Err(CalcError::DivisionByZero),
                "/" => left.checked_div(right),
                _ => {
                    return Err(CalcError::MalformedTree {
                        operator: token.value.clone(),
                        children: operands.len(),
                    })
                }
            };
            result.ok_or_else(|| CalcError::Overflow {
                operator: token.value.clone(),
            })
        }
        CalcKind::Unset => Err(CalcError::MalformedTree {
            operator: token.value.clone(),
            children: tree.child_ids(id).count(),
        }),
    }
}

/// Parses and evaluates `input`.
pub fn evaluate(input: &str) -> Result<i64, CalcError> {
    let tree = parse(&CancellationToken::new(), input)?;
    calculate(&tree)
}
