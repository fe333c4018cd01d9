use std::{
    cmp::Ordering,
    fmt::Debug,
    hash::{Hash, Hasher},
    sync::Arc,
};

use itertools::Itertools;
use thiserror::Error;

use crate::{alphabet::Symbol, Show};

mod context;
pub use context::Context;

mod enumerate;
pub use enumerate::AllTrees;

/// Errors that occur when a tree or context is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The number of children of a node differs from the arity of its symbol.
    #[error("symbol {symbol:?} has arity {} but was given {found} children", .symbol.arity())]
    ArityMismatch {
        /// The symbol at the root of the offending node.
        symbol: Symbol,
        /// The number of children that were given.
        found: usize,
    },
    /// A context must contain exactly one hole.
    #[error("a context must have exactly one hole, found {0}")]
    MalformedContext(usize),
    /// A tree was substituted into something that is not a context.
    #[error("cannot substitute into a tree that does not have exactly one hole")]
    NotAContext,
}

/// An immutable ranked tree. The number of children of every node equals the arity of its symbol,
/// which is checked by [`Tree::new`], the only way to build a tree from the outside. Children are
/// reference counted, which makes cloning a tree cheap and allows subtrees to be shared freely.
///
/// Equality, ordering and hashing are structural. They, like every other traversal of a tree
/// (including dropping it), use an explicit work stack, so arbitrarily deep trees are fine.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let a = Symbol::new("a", 2);
/// let b = Tree::leaf(Symbol::new("b", 0)).unwrap();
/// let tree = Tree::new(a.clone(), [b.clone(), Tree::epsilon()]).unwrap();
/// assert_eq!(tree.show(), "a(b, ε)");
/// assert!(matches!(tree.kind(), TreeKind::Node(_, [_, _])));
/// assert!(Tree::new(a, [b]).is_err());
/// ```
#[derive(Clone)]
pub struct Tree(Repr);

#[derive(Clone)]
enum Repr {
    Leaf(Symbol),
    Node(Arc<Node>),
}

struct Node {
    symbol: Symbol,
    children: Vec<Tree>,
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(tree) = pending.pop() {
            if let Repr::Node(node) = tree.0 {
                if let Ok(mut node) = Arc::try_unwrap(node) {
                    pending.append(&mut node.children);
                }
            }
        }
    }
}

/// A read-only view of the root of a [`Tree`], which distinguishes the reserved leaves from
/// ordinary ones so that all cases can be matched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind<'a> {
    /// The empty leaf.
    Epsilon,
    /// The hole of a context.
    Hole,
    /// A leaf labelled with a symbol of arity zero.
    Leaf(&'a Symbol),
    /// An inner node together with its children.
    Node(&'a Symbol, &'a [Tree]),
}

impl Tree {
    /// Creates a new tree with the given root symbol and children. Fails with
    /// [`TreeError::ArityMismatch`] if the number of children does not match the arity.
    pub fn new<I: IntoIterator<Item = Tree>>(symbol: Symbol, children: I) -> Result<Self, TreeError> {
        let children = children.into_iter().collect_vec();
        if children.len() != symbol.arity() {
            return Err(TreeError::ArityMismatch {
                found: children.len(),
                symbol,
            });
        }
        Ok(Self::from_parts(symbol, children))
    }

    /// Creates a leaf labelled with the given symbol, which must have arity zero.
    pub fn leaf(symbol: Symbol) -> Result<Self, TreeError> {
        Self::new(symbol, [])
    }

    /// Builds a tree whose arity has already been verified by the caller.
    pub(crate) fn from_parts(symbol: Symbol, children: Vec<Tree>) -> Self {
        debug_assert_eq!(symbol.arity(), children.len());
        match symbol.arity() {
            0 => Tree(Repr::Leaf(symbol)),
            _ => Tree(Repr::Node(Arc::new(Node { symbol, children }))),
        }
    }

    /// The empty leaf.
    pub fn epsilon() -> Self {
        Tree(Repr::Leaf(Symbol::epsilon()))
    }

    /// The hole, which on its own forms the identity context.
    pub fn hole() -> Self {
        Tree(Repr::Leaf(Symbol::hole()))
    }

    /// Looks at the root of the tree.
    pub fn kind(&self) -> TreeKind<'_> {
        match &self.0 {
            Repr::Leaf(symbol) if symbol.is_epsilon() => TreeKind::Epsilon,
            Repr::Leaf(symbol) if symbol.is_hole() => TreeKind::Hole,
            Repr::Leaf(symbol) => TreeKind::Leaf(symbol),
            Repr::Node(node) => TreeKind::Node(&node.symbol, node.children.as_slice()),
        }
    }

    /// Returns a reference to the symbol at the root.
    pub fn symbol(&self) -> &Symbol {
        match &self.0 {
            Repr::Leaf(symbol) => symbol,
            Repr::Node(node) => &node.symbol,
        }
    }

    /// Returns the symbol at the root of the tree.
    pub fn root(&self) -> Symbol {
        self.symbol().clone()
    }

    /// Returns the name of the root symbol.
    pub fn name(&self) -> &str {
        self.symbol().name()
    }

    /// Returns the children of the root, which is empty for leaves.
    pub fn children(&self) -> &[Tree] {
        match &self.0 {
            Repr::Leaf(_) => &[],
            Repr::Node(node) => node.children.as_slice(),
        }
    }

    /// Returns true if the root has no children.
    pub fn is_leaf(&self) -> bool {
        matches!(self.0, Repr::Leaf(_))
    }

    /// Returns true if the tree is the empty leaf.
    pub fn is_epsilon(&self) -> bool {
        self.symbol().is_epsilon()
    }

    /// Returns true if the tree is the hole.
    pub fn is_hole(&self) -> bool {
        self.symbol().is_hole()
    }

    /// Iterates over all subtrees in pre-order, starting with `self`.
    pub fn subtrees(&self) -> impl Iterator<Item = &Tree> + '_ {
        let mut pending = vec![self];
        std::iter::from_fn(move || {
            let current = pending.pop()?;
            pending.extend(current.children().iter().rev());
            Some(current)
        })
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        self.subtrees().count()
    }

    /// Length of the longest path from the root to a leaf, a leaf has depth zero.
    pub fn depth(&self) -> usize {
        let mut pending = vec![(self, 0)];
        let mut depth = 0;
        while let Some((current, level)) = pending.pop() {
            depth = depth.max(level);
            pending.extend(current.children().iter().map(|child| (child, level + 1)));
        }
        depth
    }

    /// Counts the number of holes in the tree by traversing it completely.
    pub fn hole_count(&self) -> usize {
        self.subtrees().filter(|tree| tree.is_hole()).count()
    }

    /// Plugs `self` into the hole of the given context.
    pub fn applied_to(&self, context: &Context) -> Tree {
        context.substitute(self)
    }

    /// Plugs `self` into the hole of `target`, which is first checked to be a context. Fails
    /// with [`TreeError::NotAContext`] if `target` does not have exactly one hole.
    pub fn substitute_into(&self, target: &Tree) -> Result<Tree, TreeError> {
        let context = Context::new(target.clone()).map_err(|_| TreeError::NotAContext)?;
        Ok(context.substitute(self))
    }

    fn shares_root(&self, other: &Tree) -> bool {
        match (&self.0, &other.0) {
            (Repr::Node(left), Repr::Node(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }
}

// Arities are fixed per symbol, so the pre-order sequence of symbols determines a tree.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.shares_root(other)
            || self
                .subtrees()
                .map(Tree::symbol)
                .eq(other.subtrees().map(Tree::symbol))
    }
}

impl Eq for Tree {}

impl Hash for Tree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for tree in self.subtrees() {
            tree.symbol().hash(state);
        }
    }
}

impl PartialOrd for Tree {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tree {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.shares_root(other) {
            return Ordering::Equal;
        }
        self.subtrees()
            .map(Tree::symbol)
            .cmp(other.subtrees().map(Tree::symbol))
    }
}

impl Show for Tree {
    fn show(&self) -> String {
        enum Part<'a> {
            Tree(&'a Tree),
            Text(&'static str),
        }

        let mut out = String::new();
        let mut pending = vec![Part::Tree(self)];
        while let Some(part) = pending.pop() {
            let tree = match part {
                Part::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Part::Tree(tree) => tree,
            };
            out.push_str(tree.name());
            if tree.is_leaf() {
                continue;
            }
            pending.push(Part::Text(")"));
            for (i, child) in tree.children().iter().enumerate().rev() {
                pending.push(Part::Tree(child));
                if i > 0 {
                    pending.push(Part::Text(", "));
                }
            }
            pending.push(Part::Text("("));
        }
        out
    }
}

impl Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.show())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::math;

    pub fn leaf(name: &str) -> Tree {
        Tree::leaf(Symbol::new(name, 0)).unwrap()
    }

    pub fn node<I: IntoIterator<Item = Tree>>(name: &str, children: I) -> Tree {
        let children = children.into_iter().collect_vec();
        Tree::new(Symbol::new(name, children.len()), children).unwrap()
    }

    /// A path of `length` unary `g` nodes ending in `b`.
    pub fn chain(length: usize) -> Tree {
        let g = Symbol::new("g", 1);
        (0..length).fold(leaf("b"), |tree, _| Tree::new(g.clone(), [tree]).unwrap())
    }

    #[test]
    fn arity_is_enforced() {
        for arity in 0..4 {
            let symbol = Symbol::new("f", arity);
            for given in 0..4 {
                let result = Tree::new(symbol.clone(), (0..given).map(|_| Tree::epsilon()));
                if given == arity {
                    assert!(result.is_ok());
                } else {
                    assert_eq!(
                        result,
                        Err(TreeError::ArityMismatch {
                            symbol: symbol.clone(),
                            found: given
                        })
                    );
                }
            }
        }
    }

    #[test]
    fn reserved_leaves_have_a_single_representation() {
        let epsilon = Tree::leaf(Symbol::epsilon()).unwrap();
        assert_eq!(epsilon, Tree::epsilon());
        assert_eq!(epsilon.kind(), TreeKind::Epsilon);
        assert_eq!(Tree::leaf(Symbol::hole()).unwrap(), Tree::hole());
        assert_eq!(Tree::hole().kind(), TreeKind::Hole);
        assert_eq!(Tree::epsilon().root(), Symbol::epsilon());
        assert!(matches!(leaf("b").kind(), TreeKind::Leaf(_)));

        let mut set = math::Set::default();
        set.insert(epsilon);
        set.insert(Tree::epsilon());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn nodes_always_have_their_arity() {
        assert!(Tree::new(Symbol::new("a", 2), []).is_err());
        let tree = node("a", [leaf("b"), Tree::epsilon()]);
        match tree.kind() {
            TreeKind::Node(symbol, children) => assert_eq!(symbol.arity(), children.len()),
            other => panic!("expected a node, got {other:?}"),
        }
    }

    #[test]
    fn structural_equality_and_measures() {
        let t1 = node("a", [leaf("b"), node("g", [leaf("c")])]);
        let t2 = node("a", [leaf("b"), node("g", [leaf("c")])]);
        assert_eq!(t1, t2);
        assert_ne!(t1, node("a", [leaf("c"), node("g", [leaf("c")])]));
        assert_ne!(node("g", [leaf("b")]), leaf("b"));
        assert!(leaf("b") < leaf("c"));
        assert_eq!(t1.size(), 4);
        assert_eq!(t1.depth(), 2);
        assert_eq!(leaf("b").depth(), 0);
        assert_eq!(t1.show(), "a(b, g(c))");
        assert_eq!(
            t1.subtrees().map(Tree::name).collect_vec(),
            vec!["a", "b", "g", "c"]
        );
    }

    #[test]
    fn deep_trees_are_handled_without_recursion() {
        let deep = chain(200_000);
        assert_eq!(deep.size(), 200_001);
        assert_eq!(deep.depth(), 200_000);
        assert_eq!(deep.hole_count(), 0);
        assert_eq!(deep, chain(200_000));
        assert_ne!(deep, chain(199_999));
        assert!(deep.show().ends_with("g(b)))"));

        let mut set = math::Set::default();
        set.insert(deep.clone());
        assert!(set.contains(&deep));
        drop(set);
        drop(deep);
    }

    #[test]
    fn substitute_into_requires_single_hole() {
        let target = node("a", [Tree::hole(), leaf("c")]);
        assert_eq!(
            leaf("b").substitute_into(&target),
            Ok(node("a", [leaf("b"), leaf("c")]))
        );
        let two_holes = node("a", [Tree::hole(), Tree::hole()]);
        assert_eq!(
            leaf("b").substitute_into(&two_holes),
            Err(TreeError::NotAContext)
        );
        assert_eq!(
            leaf("b").substitute_into(&leaf("c")),
            Err(TreeError::NotAContext)
        );
    }
}
