//! Arena-backed output tree
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Parents own
//! their children through ordered child slots; the parent link is a plain id
//! updated only by the operations that restructure the tree. Detached nodes
//! stay in the arena but are no longer reachable from the root.

use crate::utils::Position;
use serde::Serialize;
use std::fmt;
use std::ops::Index;

/// Handle to a node in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A tree node.
#[derive(Debug, Clone)]
pub struct Node<V> {
    pub value: V,
    pub position: Position,
    parent: Option<NodeId>,
    children: Vec<Option<NodeId>>,
}

impl<V> Node<V> {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child slots in order. Empty slots only appear through the binary view.
    pub fn children(&self) -> &[Option<NodeId>] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct Tree<V> {
    nodes: Vec<Node<V>>,
    root: NodeId,
}

impl<V> Tree<V> {
    pub fn new(value: V) -> Self {
        Self {
            nodes: vec![Node {
                value,
                position: Position::default(),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn value(&self, id: NodeId) -> &V {
        &self.nodes[id.0].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut V {
        &mut self.nodes[id.0].value
    }

    pub fn position(&self, id: NodeId) -> Position {
        self.nodes[id.0].position
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[Option<NodeId>] {
        &self.nodes[id.0].children
    }

    /// Present children of `id`, skipping empty slots
    pub fn child_ids(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().flatten().copied()
    }

    /// Number of nodes reachable from the root
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            count += 1;
            stack.extend(self.child_ids(id));
        }
        count
    }

    /// Creates a detached node
    pub(crate) fn alloc(&mut self, value: V, position: Position) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            position,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a node and appends it as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, value: V, position: Position) -> NodeId {
        let id = self.alloc(value, position);
        self.attach(parent, id);
        id
    }

    /// Appends an existing node as the last child of `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(Some(child));
        self.nodes[child.0].parent = Some(parent);
    }

    pub(crate) fn slot_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|slot| *slot == Some(child))
    }

    /// Puts `new` in `old`'s place: under `old`'s parent, or as the root.
    pub(crate) fn substitute(&mut self, old: NodeId, new: NodeId) {
        match self.parent(old) {
            Some(parent) => {
                self.replace_child(parent, old, new);
            }
            None => {
                self.root = new;
                self.nodes[new.0].parent = None;
            }
        }
    }

    pub(crate) fn take_children(&mut self, id: NodeId) -> Vec<Option<NodeId>> {
        std::mem::take(&mut self.nodes[id.0].children)
    }

    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<Option<NodeId>>) {
        for child in children.iter().flatten() {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes[id.0].children = children;
    }

    pub(crate) fn remove_slot(&mut self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[parent.0].children.remove(index)
    }

    // ------------------------------------------------------------------
    // Binary view
    // ------------------------------------------------------------------

    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied().flatten()
    }

    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).get(1).copied().flatten()
    }

    pub fn set_left(&mut self, id: NodeId, child: Option<NodeId>) {
        self.set_slot(id, 0, child);
    }

    pub fn set_right(&mut self, id: NodeId, child: Option<NodeId>) {
        self.set_slot(id, 1, child);
    }

    /// Sets child slot `index`, padding with empty slots. Trailing empty slots
    /// are dropped so clearing a slot restores the shape it had before it was
    /// filled.
    fn set_slot(&mut self, id: NodeId, index: usize, child: Option<NodeId>) {
        let children = &mut self.nodes[id.0].children;
        if children.len() <= index {
            if child.is_none() {
                return;
            }
            children.resize(index + 1, None);
        }
        children[index] = child;
        while children.last() == Some(&None) {
            children.pop();
        }
        if let Some(child) = child {
            self.nodes[child.0].parent = Some(id);
        }
    }

    /// Swaps `old` for `new` among `parent`'s children. Only `new`'s parent
    /// link is updated; `old` keeps a stale link to `parent`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        match self.slot_of(parent, old) {
            Some(index) => {
                self.nodes[parent.0].children[index] = Some(new);
                self.nodes[new.0].parent = Some(parent);
                true
            }
            None => false,
        }
    }

    /// Promotes the right child of `id` into its place; `id` takes the
    /// promoted node's left subtree as its right child. Returns the node now in
    /// `id`'s old place.
    pub fn rotate_binary_left(&mut self, id: NodeId) -> NodeId {
        let Some(pivot) = self.right(id) else {
            return id;
        };
        let inner = self.left(pivot);
        self.substitute(id, pivot);
        self.set_right(id, inner);
        self.set_left(pivot, Some(id));
        pivot
    }

    /// Mirror of [`Tree::rotate_binary_left`].
    pub fn rotate_binary_right(&mut self, id: NodeId) -> NodeId {
        let Some(pivot) = self.left(id) else {
            return id;
        };
        let inner = self.right(pivot);
        self.substitute(id, pivot);
        self.set_left(id, inner);
        self.set_right(pivot, Some(id));
        pivot
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Renders the subtree at `id` as `value(child, child)`, with `_` for
    /// empty slots.
    pub fn render(&self, id: NodeId) -> String
    where
        V: fmt::Display,
    {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String)
    where
        V: fmt::Display,
    {
        use fmt::Write;

        let node = &self.nodes[id.0];
        let _ = write!(out, "{}", node.value);
        if node.children.is_empty() {
            return;
        }
        out.push('(');
        for (i, slot) in node.children.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match slot {
                Some(child) => self.render_into(*child, out),
                None => out.push('_'),
            }
        }
        out.push(')');
    }

    /// Nested JSON form of the tree: `{"value", "position", "children"}` per
    /// node, with `null` for empty slots.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value>
    where
        V: Serialize,
    {
        serde_json::to_value(NodeView {
            tree: self,
            id: self.root,
        })
    }
}

impl<V> Index<NodeId> for Tree<V> {
    type Output = Node<V>;

    fn index(&self, id: NodeId) -> &Node<V> {
        &self.nodes[id.0]
    }
}

impl<V: fmt::Display> fmt::Display for Tree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.root))
    }
}

struct NodeView<'a, V> {
    tree: &'a Tree<V>,
    id: NodeId,
}

impl<V: Serialize> Serialize for NodeView<'_, V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let node = &self.tree[self.id];
        let children: Vec<Option<NodeView<'_, V>>> = node
            .children
            .iter()
            .map(|slot| {
                slot.map(|id| NodeView {
                    tree: self.tree,
                    id,
                })
            })
            .collect();

        let mut state = serializer.serialize_struct("Node", 3)?;
        state.serialize_field("value", &node.value)?;
        state.serialize_field("position", &node.position)?;
        state.serialize_field("children", &children)?;
        state.end()
    }
}

/// Checks parent links and single ownership for every reachable node.
#[cfg(test)]
pub(crate) fn assert_well_formed<V>(tree: &Tree<V>) {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![tree.root()];
    assert_eq!(tree.parent(tree.root()), None, "root has a parent");
    while let Some(id) = stack.pop() {
        assert!(seen.insert(id), "node {:?} reachable twice", id);
        for child in tree.child_ids(id) {
            assert_eq!(tree.parent(child), Some(id), "stale parent link");
            stack.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Tree<&'static str>, NodeId) {
        // x(a, y(b, c))
        let mut tree = Tree::new("x");
        let x = tree.root();
        let a = tree.alloc("a", Position::default());
        let y = tree.alloc("y", Position::default());
        let b = tree.alloc("b", Position::default());
        let c = tree.alloc("c", Position::default());
        tree.set_left(x, Some(a));
        tree.set_right(x, Some(y));
        tree.set_left(y, Some(b));
        tree.set_right(y, Some(c));
        (tree, x)
    }

    #[test]
    fn test_append_and_render() {
        let mut tree = Tree::new("root");
        let root = tree.root();
        let op = tree.append_child(root, "op", Position::default());
        tree.append_child(op, "1", Position::new(3, 0, 3));
        tree.append_child(op, "2", Position::default());

        assert_eq!(tree.to_string(), "root(op(1, 2))");
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree[op].children().len(), 2);
        assert_eq!(tree.position(tree.left(op).unwrap()), Position::new(3, 0, 3));
        assert_well_formed(&tree);
    }

    #[test]
    fn test_set_right_pads_left() {
        let mut tree = Tree::new("x");
        let x = tree.root();
        let r = tree.alloc("r", Position::default());
        tree.set_right(x, Some(r));

        assert_eq!(tree.left(x), None);
        assert_eq!(tree.right(x), Some(r));
        assert_eq!(tree.parent(r), Some(x));
        assert_eq!(tree.to_string(), "x(_, r)");

        tree.set_right(x, None);
        assert_eq!(tree.to_string(), "x");
    }

    #[test]
    fn test_replace_child_leaves_old_parent_stale() {
        let mut tree = Tree::new("p");
        let p = tree.root();
        let old = tree.append_child(p, "old", Position::default());
        let new = tree.alloc("new", Position::default());

        assert!(tree.replace_child(p, old, new));
        assert_eq!(tree.to_string(), "p(new)");
        assert_eq!(tree.parent(new), Some(p));
        assert_eq!(tree.parent(old), Some(p));
        assert!(!tree.replace_child(p, old, new));
    }

    #[test]
    fn test_rotate_binary_left() {
        let (mut tree, x) = chain();
        let y = tree.rotate_binary_left(x);

        assert_eq!(tree.root(), y);
        assert_eq!(tree.to_string(), "y(x(a, b), c)");
        assert_well_formed(&tree);
    }

    #[test]
    fn test_rotate_binary_round_trip() {
        let (mut tree, x) = chain();
        let before = tree.to_string();

        let y = tree.rotate_binary_left(x);
        let back = tree.rotate_binary_right(y);

        assert_eq!(back, x);
        assert_eq!(tree.root(), x);
        assert_eq!(tree.to_string(), before);
        assert_eq!(tree.node_count(), 5);
        assert_well_formed(&tree);
    }

    #[test]
    fn test_rotate_binary_round_trip_sparse() {
        // p(x(a, y(b)))
        let mut tree = Tree::new("p");
        let p = tree.root();
        let x = tree.append_child(p, "x", Position::default());
        tree.append_child(x, "a", Position::default());
        let y = tree.append_child(x, "y", Position::default());
        tree.append_child(y, "b", Position::default());
        let before = tree.to_string();

        let promoted = tree.rotate_binary_left(x);
        assert_eq!(promoted, y);
        assert_eq!(tree.to_string(), "p(y(x(a, b)))");
        assert_well_formed(&tree);

        tree.rotate_binary_right(promoted);
        assert_eq!(tree.to_string(), before);
        assert_well_formed(&tree);
    }

    #[test]
    fn test_rotate_binary_without_child_is_noop() {
        let mut tree = Tree::new("x");
        let x = tree.root();
        tree.append_child(x, "a", Position::default());

        assert_eq!(tree.rotate_binary_left(x), x);
        assert_eq!(tree.to_string(), "x(a)");

        let mut leaf = Tree::new("leaf");
        let root = leaf.root();
        assert_eq!(leaf.rotate_binary_right(root), root);
        assert_eq!(leaf.to_string(), "leaf");
    }

    #[test]
    fn test_to_json() {
        let mut tree = Tree::new("root".to_string());
        let root = tree.root();
        tree.append_child(root, "leaf".to_string(), Position::new(2, 0, 2));

        let json = tree.to_json().unwrap();
        assert_eq!(json["value"], "root");
        assert_eq!(json["children"][0]["value"], "leaf");
        assert_eq!(json["children"][0]["position"]["offset"], 2);
        assert!(json["children"][0]["children"].as_array().unwrap().is_empty());
    }
}
