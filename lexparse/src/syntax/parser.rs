//! Cursor-driven tree builder
//!
//! A [`Parser`] consumes a lexeme stream under the direction of a chain of
//! [`ParseFn`]s. Parse functions build the output tree through one movable
//! cursor and fix up precedence and associativity with local rotations instead
//! of backtracking.

use super::error::{PartialTree, SyntaxError};
use super::tree::{NodeId, Tree};
use crate::config::compile_time::syntax::RECEIVE_POLL_INTERVAL_MS;
use crate::config::runtime::ParserPreferences;
use crate::lexical::{Lexeme, LexemeKind, Lexemes};
use crate::logging::codes;
use crate::utils::{CancellationToken, Position};
use crate::{log_debug, log_error, log_success, log_warning};
use std::time::Duration;

/// Result of one parse step: the next function, or `None` when parsing is
/// finished.
pub type ParseStep<V, K> = Result<Option<Box<dyn ParseFn<V, K>>>, SyntaxError>;

/// One step of the parser's trampoline.
pub trait ParseFn<V, K> {
    fn run(
        self: Box<Self>,
        cancel: &CancellationToken,
        parser: &mut Parser<V, K>,
    ) -> ParseStep<V, K>;
}

/// Adapter that runs a closure or plain function as a [`ParseFn`].
pub struct ParseFunc<F>(F);

impl<V, K, F> ParseFn<V, K> for ParseFunc<F>
where
    F: FnOnce(&CancellationToken, &mut Parser<V, K>) -> ParseStep<V, K>,
{
    fn run(
        self: Box<Self>,
        cancel: &CancellationToken,
        parser: &mut Parser<V, K>,
    ) -> ParseStep<V, K> {
        (self.0)(cancel, parser)
    }
}

/// Boxes a function as a parse step.
pub fn parse_fn<V, K, F>(f: F) -> Box<dyn ParseFn<V, K>>
where
    V: 'static,
    K: 'static,
    F: FnOnce(&CancellationToken, &mut Parser<V, K>) -> ParseStep<V, K> + 'static,
{
    Box::new(ParseFunc(f))
}

pub struct Parser<V, K> {
    tree: Tree<V>,
    current: NodeId,
    lexemes: Lexemes<K>,
    peeked: Option<Lexeme<K>>,
    last_position: Position,
    consumed: usize,
    cancel: Option<CancellationToken>,
    interrupted: bool,
    preferences: ParserPreferences,
}

impl<V: Default, K: LexemeKind> Parser<V, K> {
    /// Creates a parser over `lexemes` with an empty root as the cursor.
    pub fn new(lexemes: Lexemes<K>) -> Self {
        Self::with_preferences(lexemes, ParserPreferences::default())
    }

    pub fn with_preferences(lexemes: Lexemes<K>, preferences: ParserPreferences) -> Self {
        let tree = Tree::new(V::default());
        let current = tree.root();
        Self {
            tree,
            current,
            lexemes,
            peeked: None,
            last_position: Position::default(),
            consumed: 0,
            cancel: None,
            interrupted: false,
            preferences,
        }
    }

    /// Replaces the cursor node with a new node carrying `value`.
    ///
    /// The new node takes the old one's place and position and inherits its
    /// children in order. The cursor moves to the new node; the old value is
    /// returned.
    pub fn replace(&mut self, value: V) -> V {
        let old = self.current;
        let replacement = self.tree.alloc(value, self.tree.position(old));
        self.tree.substitute(old, replacement);
        let children = self.tree.take_children(old);
        self.tree.set_children(replacement, children);
        self.current = replacement;

        self.trace("replace", replacement);
        std::mem::take(self.tree.value_mut(old))
    }
}

impl<V, K: LexemeKind> Parser<V, K> {
    pub fn tree(&self) -> &Tree<V> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree<V> {
        &mut self.tree
    }

    pub fn into_tree(self) -> Tree<V> {
        self.tree
    }

    /// Lexemes consumed with [`Parser::next`] so far
    pub fn lexemes_consumed(&self) -> usize {
        self.consumed
    }

    fn receive(&mut self) -> Option<Lexeme<K>> {
        match &self.cancel {
            Some(cancel) => {
                let poll = Duration::from_millis(RECEIVE_POLL_INTERVAL_MS);
                let lexeme = self.lexemes.recv_until_cancelled(cancel, poll);
                if lexeme.is_none() && cancel.is_cancelled() {
                    self.interrupted = true;
                }
                lexeme
            }
            None => self.lexemes.recv(),
        }
    }

    /// Consumes the next lexeme, blocking until one arrives. `None` once the
    /// stream is exhausted.
    pub fn next(&mut self) -> Option<Lexeme<K>> {
        let lexeme = match self.peeked.take() {
            Some(lexeme) => lexeme,
            None => self.receive()?,
        };
        self.last_position = lexeme.position();
        self.consumed += 1;
        Some(lexeme)
    }

    /// Returns the next lexeme without consuming it.
    pub fn peek(&mut self) -> Option<&Lexeme<K>> {
        if self.peeked.is_none() {
            self.peeked = self.receive();
            if let Some(lexeme) = &self.peeked {
                self.last_position = lexeme.position();
            }
        }
        self.peeked.as_ref()
    }

    /// The cursor node
    pub fn pos(&self) -> NodeId {
        self.current
    }

    /// Value at the cursor
    pub fn pos_value(&self) -> &V {
        self.tree.value(self.current)
    }

    /// Appends a node as the last child of the cursor without moving it. The
    /// node is stamped with the position of the last lexeme seen.
    pub fn node(&mut self, value: V) -> NodeId {
        self.tree.append_child(self.current, value, self.last_position)
    }

    /// Like [`Parser::node`], then moves the cursor to the new node.
    pub fn push(&mut self, value: V) -> NodeId {
        self.current = self.node(value);
        self.current
    }

    /// Moves the cursor to its parent and returns the node it left. At the root
    /// the cursor stays put.
    pub fn climb(&mut self) -> NodeId {
        let left = self.current;
        if let Some(parent) = self.tree.parent(left) {
            self.current = parent;
        }
        left
    }

    /// Promotes the cursor node into its parent's place.
    ///
    /// The former parent becomes the cursor node's last child and keeps its
    /// other children. Fails without touching the tree at the root.
    pub fn rotate_left(&mut self) -> Result<NodeId, SyntaxError> {
        let node = self.current;
        let parent = self
            .tree
            .parent(node)
            .ok_or(SyntaxError::MissingRequiredNode)?;
        let slot = self
            .tree
            .slot_of(parent, node)
            .ok_or(SyntaxError::MissingRequiredNode)?;

        self.tree.substitute(parent, node);
        self.tree.remove_slot(parent, slot);
        self.tree.attach(node, parent);

        self.trace("rotate_left", node);
        Ok(node)
    }

    /// Moves the cursor node's preceding sibling under it as its last child.
    ///
    /// Fails without touching the tree when there is no parent or no preceding
    /// sibling.
    pub fn adopt_sibling(&mut self) -> Result<NodeId, SyntaxError> {
        let node = self.current;
        let parent = self
            .tree
            .parent(node)
            .ok_or(SyntaxError::MissingRequiredNode)?;
        let slot = self
            .tree
            .slot_of(parent, node)
            .filter(|slot| *slot > 0)
            .ok_or(SyntaxError::MissingRequiredNode)?;
        let sibling = self.tree.children(parent)[slot - 1]
            .ok_or(SyntaxError::MissingRequiredNode)?;

        self.tree.remove_slot(parent, slot - 1);
        self.tree.attach(node, sibling);

        self.trace("adopt_sibling", node);
        Ok(node)
    }

    /// Binary rotation promoting the cursor's right child; the cursor follows
    /// the promoted node. No-op without a right child.
    pub fn rotate_binary_left(&mut self) -> NodeId {
        self.current = self.tree.rotate_binary_left(self.current);
        self.trace("rotate_binary_left", self.current);
        self.current
    }

    /// Mirror of [`Parser::rotate_binary_left`].
    pub fn rotate_binary_right(&mut self) -> NodeId {
        self.current = self.tree.rotate_binary_right(self.current);
        self.trace("rotate_binary_right", self.current);
        self.current
    }

    fn trace(&self, operation: &str, node: NodeId) {
        if self.preferences.log_tree_operations {
            log_debug!("Tree operation",
                "operation" => operation,
                "node" => node.index(),
                "position" => self.tree.position(node)
            );
        }
    }

    /// Runs the trampoline from `init` until a step returns `None`.
    ///
    /// Cancellation is checked before every step and while waiting for
    /// lexemes. End of input from a step counts as success. On any failure the
    /// tree built so far comes back with the error.
    pub fn parse(
        mut self,
        cancel: &CancellationToken,
        init: Box<dyn ParseFn<V, K>>,
    ) -> Result<Tree<V>, PartialTree<V, SyntaxError>> {
        self.cancel = Some(cancel.clone());

        let mut steps = 0usize;
        let mut current = Some(init);
        let outcome = loop {
            let Some(step) = current.take() else {
                break Ok(());
            };
            if cancel.is_cancelled() {
                break Err(SyntaxError::Cancelled);
            }
            match step.run(cancel, &mut self) {
                Ok(next) => {
                    steps += 1;
                    current = next;
                }
                Err(e) if e.is_end_of_input() => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let outcome = match outcome {
            Ok(()) if self.interrupted => Err(SyntaxError::Cancelled),
            other => other,
        };

        match outcome {
            Ok(()) => {
                log_success!(codes::success::PARSING_COMPLETE, "Parsing finished",
                    "steps" => steps,
                    "lexemes" => self.consumed,
                    "nodes" => self.tree.node_count()
                );
                Ok(self.tree)
            }
            Err(e) if e.is_cancelled() => {
                log_warning!(code = codes::pipeline::CANCELLED, "Parsing cancelled",
                    "steps" => steps,
                    "nodes" => self.tree.node_count()
                );
                Err(PartialTree::new(self.tree, e))
            }
            Err(e) => {
                let position = e.position().unwrap_or(self.last_position);
                log_error!(e.error_code(), "Parsing failed",
                    position = position,
                    "error" => &e,
                    "steps" => steps
                );
                Err(PartialTree::new(self.tree, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tree::assert_well_formed;
    use assert_matches::assert_matches;
    use std::sync::mpsc;
    use std::thread;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Word,
    }

    /// Whitespace-separated words as an already-closed stream.
    fn words(input: &str) -> Lexemes<Kind> {
        let mut position = Position::default();
        let mut lexemes = Vec::new();
        for word in input.split(' ') {
            lexemes.push(Lexeme::new(Kind::Word, word, position));
            position = position.advance_str(word).advance(' ');
        }
        lexemes.into_iter().collect()
    }

    fn parser(input: &str) -> Parser<String, Kind> {
        Parser::new(words(input))
    }

    fn render(p: &Parser<String, Kind>) -> String {
        p.tree().to_string()
    }

    /// Pushes on "op", appends anything else.
    fn parse_ops(
        _: &CancellationToken,
        p: &mut Parser<String, Kind>,
    ) -> ParseStep<String, Kind> {
        while let Some(lexeme) = p.next() {
            if lexeme.value == "op" {
                p.push(lexeme.value);
            } else {
                p.node(lexeme.value);
            }
        }
        Ok(None)
    }

    #[test]
    fn test_new() {
        let p = parser("A B C");
        assert_eq!(p.pos(), p.tree().root());
        assert_eq!(p.pos_value(), "");
        assert_eq!(p.tree().node_count(), 1);
    }

    #[test]
    fn test_next_peek() {
        let mut p = parser("A B C");

        assert_eq!(p.next().unwrap().value, "A");
        assert_eq!(p.peek().unwrap().value, "B");
        assert_eq!(p.peek().unwrap().value, "B");
        assert_eq!(p.next().unwrap().value, "B");
        assert_eq!(p.next().unwrap().value, "C");
        assert!(p.next().is_none());
        assert!(p.peek().is_none());
        assert_eq!(p.lexemes_consumed(), 3);
    }

    #[test]
    fn test_node() {
        let mut p = parser("A B C");

        p.node("1".to_string());
        assert_eq!(render(&p), "(1)");
        p.node("2".to_string());
        assert_eq!(render(&p), "(1, 2)");
        assert_eq!(p.pos(), p.tree().root());
    }

    #[test]
    fn test_node_stamped_with_last_lexeme() {
        let mut p = parser("A B C");

        let first = p.node("before".to_string());
        assert_eq!(p.tree().position(first), Position::default());

        p.next();
        p.peek();
        let second = p.node("after".to_string());
        assert_eq!(p.tree().position(second), Position::new(2, 0, 2));
    }

    #[test]
    fn test_push() {
        let mut p = parser("A B C");

        let one = p.push("1".to_string());
        assert_eq!(p.pos(), one);
        p.push("2".to_string());
        p.node("3".to_string());
        assert_eq!(render(&p), "(1(2(3)))");
    }

    #[test]
    fn test_climb() {
        let mut p = parser("A B C");

        p.push("1".to_string());
        p.climb();
        p.push("2".to_string());
        p.climb();
        p.push("3".to_string());
        assert_eq!(render(&p), "(1, 2, 3)");
    }

    #[test]
    fn test_climb_at_root() {
        let mut p = parser("A B C");
        let root = p.tree().root();

        assert_eq!(p.climb(), root);
        assert_eq!(p.pos(), root);
    }

    #[test]
    fn test_replace() {
        let mut p = parser("A B C");
        p.push("op".to_string());
        p.node("1".to_string());
        p.node("2".to_string());

        assert_eq!(p.replace("foo".to_string()), "op");
        assert_eq!(render(&p), "(foo(1, 2))");
        assert_eq!(p.pos_value(), "foo");
        assert_eq!(p.tree().node_count(), 4);
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_replace_root() {
        let mut p = parser("A B C");
        p.node("child".to_string());

        assert_eq!(p.replace("new root".to_string()), "");
        assert_eq!(p.tree().root(), p.pos());
        assert_eq!(render(&p), "new root(child)");
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_rotate_left() {
        let mut p = parser("A B C");
        p.push("op".to_string());
        p.node("1".to_string());
        p.node("2".to_string());
        assert_eq!(render(&p), "(op(1, 2))");

        let foo = p.push("foo".to_string());
        assert_eq!(p.rotate_left().unwrap(), foo);
        assert_eq!(p.pos(), foo);

        p.node("3".to_string());
        assert_eq!(render(&p), "(foo(op(1, 2), 3))");
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_rotate_left_keeps_parent_children() {
        let mut p = parser("A B C");
        p.push("op".to_string());
        p.node("1".to_string());
        let n = p.push("n".to_string());
        p.node("x".to_string());
        p.climb();
        p.node("2".to_string());
        assert_eq!(render(&p), "(op(1, n(x), 2))");
        p.current = n;

        p.rotate_left().unwrap();
        assert_eq!(render(&p), "(n(x, op(1, 2)))");
        assert_eq!(p.tree().node_count(), 6);
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_rotate_left_at_root() {
        let mut p = parser("A B C");
        assert_matches!(p.rotate_left(), Err(SyntaxError::MissingRequiredNode));

        p.node("1".to_string());
        let before = render(&p);
        assert_matches!(p.rotate_left(), Err(SyntaxError::MissingRequiredNode));
        assert_eq!(render(&p), before);
        assert_eq!(p.pos(), p.tree().root());
    }

    #[test]
    fn test_rotate_left_of_top_node_becomes_root() {
        let mut p = parser("A B C");
        p.node("1".to_string());
        let top = p.push("top".to_string());

        p.rotate_left().unwrap();
        assert_eq!(p.tree().root(), top);
        assert_eq!(render(&p), "top((1))");
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_adopt_sibling() {
        let mut p = parser("A B C");
        p.push("op".to_string());
        p.node("1".to_string());
        p.node("2".to_string());
        let foo = p.push("foo".to_string());
        assert_eq!(render(&p), "(op(1, 2, foo))");

        assert_eq!(p.adopt_sibling().unwrap(), foo);
        assert_eq!(p.pos(), foo);
        assert_eq!(render(&p), "(op(1, foo(2)))");
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_adopt_sibling_at_root() {
        let mut p = parser("A B C");
        assert_matches!(p.adopt_sibling(), Err(SyntaxError::MissingRequiredNode));
        assert_eq!(render(&p), "");
    }

    #[test]
    fn test_adopt_sibling_without_preceding_sibling() {
        let mut p = parser("A B C");
        p.push("op".to_string());
        p.push("foo".to_string());
        let before = render(&p);

        assert_matches!(p.adopt_sibling(), Err(SyntaxError::MissingRequiredNode));
        assert_eq!(render(&p), before);
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_rotate_binary_round_trip() {
        let mut p = parser("A B C");
        let x = p.push("x".to_string());
        p.node("a".to_string());
        let y = p.push("y".to_string());
        p.node("b".to_string());
        p.node("c".to_string());
        p.climb();
        let before = render(&p);
        assert_eq!(before, "(x(a, y(b, c)))");

        assert_eq!(p.rotate_binary_left(), y);
        assert_eq!(render(&p), "(y(x(a, b), c))");
        assert_well_formed(p.tree());

        assert_eq!(p.rotate_binary_right(), x);
        assert_eq!(render(&p), before);
        assert_eq!(p.tree().node_count(), 6);
        assert_well_formed(p.tree());
    }

    #[test]
    fn test_parse_op2() {
        let p = parser("op 1 op 2 3");
        let tree = p
            .parse(&CancellationToken::new(), parse_fn(parse_ops))
            .unwrap();

        assert_eq!(tree.to_string(), "(op(1, op(2, 3)))");
        assert_ne!(tree.to_string(), "(op(1, op, 2, 3))");
        assert_ne!(tree.to_string(), "(op(1, op(2, 4)))");
    }

    #[test]
    fn test_parse_chains_steps() {
        fn first(_: &CancellationToken, p: &mut Parser<String, Kind>) -> ParseStep<String, Kind> {
            let lexeme = p.next().ok_or(SyntaxError::missing_lexeme("word"))?;
            p.push(lexeme.value);
            Ok(Some(parse_fn(rest)))
        }
        fn rest(_: &CancellationToken, p: &mut Parser<String, Kind>) -> ParseStep<String, Kind> {
            match p.next() {
                Some(lexeme) => {
                    p.node(lexeme.value);
                    Ok(Some(parse_fn(rest)))
                }
                None => Err(SyntaxError::EndOfInput),
            }
        }

        let tree = parser("head A B")
            .parse(&CancellationToken::new(), parse_fn(first))
            .unwrap();
        assert_eq!(tree.to_string(), "(head(A, B))");
    }

    #[test]
    fn test_parse_error_returns_partial_tree() {
        let memory = crate::logging::test_memory_logger();
        let result = parser("A B C").parse(
            &CancellationToken::new(),
            parse_fn(|_: &CancellationToken, p: &mut Parser<String, Kind>| {
                let lexeme = p.next().ok_or(SyntaxError::missing_lexeme("word"))?;
                p.node(lexeme.value);
                let found = p.next().ok_or(SyntaxError::missing_lexeme("word"))?;
                Err(SyntaxError::unexpected_lexeme(
                    &found.value,
                    "number",
                    found.position(),
                ))
            }),
        );

        let partial = result.unwrap_err();
        assert_matches!(
            &partial.error,
            SyntaxError::UnexpectedLexeme { found, position, .. }
                if found == "B" && *position == Position::new(2, 0, 2)
        );
        assert_eq!(partial.tree.to_string(), "(A)");
        assert!(memory.has_error_with_code(codes::syntax::UNEXPECTED_LEXEME));
    }

    #[test]
    fn test_parse_cancelled_before_first_step() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = parser("A B C").parse(&cancel, parse_fn(parse_ops));
        let partial = result.unwrap_err();
        assert!(partial.error.is_cancelled());
        assert_eq!(partial.tree.node_count(), 1);
    }

    #[test]
    fn test_parse_cancelled_while_waiting() {
        let (tx, rx) = mpsc::sync_channel::<Lexeme<Kind>>(0);
        let p: Parser<String, Kind> = Parser::new(Lexemes::new(rx));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                cancel.cancel();
            })
        };

        let result = p.parse(&cancel, parse_fn(parse_ops));
        canceller.join().unwrap();
        drop(tx);

        let partial = result.unwrap_err();
        assert_matches!(partial.error, SyntaxError::Cancelled);
    }

    #[test]
    fn test_empty_stream_parses_to_root() {
        let p: Parser<String, Kind> = Parser::new(Lexemes::closed());
        let tree = p
            .parse(&CancellationToken::new(), parse_fn(parse_ops))
            .unwrap();
        assert_eq!(tree.node_count(), 1);
    }
}
