use std::fmt::Debug;

use super::{Tree, TreeError};
use crate::Show;

/// A context is a [`Tree`] with exactly one hole, into which other trees can be substituted.
/// Besides the tree itself, a context remembers the path (as a sequence of child positions)
/// that leads from the root to its hole, so substitution only rebuilds the nodes on that path
/// and shares everything else.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let a = Symbol::new("a", 2);
/// let b = Tree::leaf(Symbol::new("b", 0)).unwrap();
/// let context = Context::new(Tree::new(a.clone(), [Tree::hole(), b.clone()]).unwrap()).unwrap();
/// assert_eq!(context.substitute(&b), Tree::new(a, [b.clone(), b]).unwrap());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Context {
    tree: Tree,
    path: Vec<usize>,
}

impl Context {
    /// Wraps the given tree as a context. The whole tree is traversed to verify that it contains
    /// exactly one hole, otherwise [`TreeError::MalformedContext`] is returned.
    pub fn new(tree: Tree) -> Result<Self, TreeError> {
        let (count, path) = find_holes(&tree);
        match (count, path) {
            (1, Some(path)) => Ok(Self { tree, path }),
            _ => Err(TreeError::MalformedContext(count)),
        }
    }

    /// The context consisting only of the hole. Substituting into it is the identity.
    pub fn identity() -> Self {
        Self {
            tree: Tree::hole(),
            path: vec![],
        }
    }

    /// Returns true if `self` is the identity context.
    pub fn is_identity(&self) -> bool {
        self.path.is_empty()
    }

    /// Gives a reference to the underlying tree, which contains the hole.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The child positions that lead from the root to the hole.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Returns a new tree that is identical to `self` except that the hole is replaced by `tree`.
    pub fn substitute(&self, tree: &Tree) -> Tree {
        plug(&self.tree, &self.path, tree)
    }

    /// Substitutes the tree of `inner` into the hole of `self`, the result is again a context
    /// whose hole is the one of `inner`.
    pub fn compose(&self, inner: &Context) -> Context {
        Context {
            tree: self.substitute(&inner.tree),
            path: self.path.iter().chain(inner.path.iter()).copied().collect(),
        }
    }
}

/// Counts the holes of `tree` and returns the path to the first one in pre-order.
fn find_holes(tree: &Tree) -> (usize, Option<Vec<usize>>) {
    let mut pending = vec![(tree, 0usize, 0usize)];
    let mut position: Vec<usize> = vec![];
    let mut count = 0;
    let mut first = None;

    while let Some((current, level, index)) = pending.pop() {
        // `position` holds the path to the parent, which is the last node visited one level up
        position.truncate(level.saturating_sub(1));
        if level > 0 {
            position.push(index);
        }
        if current.is_hole() {
            count += 1;
            if first.is_none() {
                first = Some(position.clone());
            }
        }
        pending.extend(
            current
                .children()
                .iter()
                .enumerate()
                .rev()
                .map(|(i, child)| (child, level + 1, i)),
        );
    }
    (count, first)
}

fn plug(current: &Tree, path: &[usize], tree: &Tree) -> Tree {
    let mut spine = Vec::with_capacity(path.len());
    let mut node = current;
    for &i in path {
        spine.push((node, i));
        node = &node.children()[i];
    }
    debug_assert!(node.is_hole());

    let mut result = tree.clone();
    for (parent, i) in spine.into_iter().rev() {
        let mut children = parent.children().to_vec();
        children[i] = result;
        result = Tree::from_parts(parent.root(), children);
    }
    result
}

impl TryFrom<Tree> for Context {
    type Error = TreeError;

    fn try_from(value: Tree) -> Result<Self, Self::Error> {
        Context::new(value)
    }
}

impl Show for Context {
    fn show(&self) -> String {
        self.tree.show()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.show())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Symbol;
    use crate::tree::tests::{chain, leaf, node};

    #[test]
    fn exactly_one_hole() {
        assert_eq!(
            Context::new(leaf("b")),
            Err(TreeError::MalformedContext(0))
        );
        assert_eq!(
            Context::new(node("a", [Tree::hole(), Tree::hole()])),
            Err(TreeError::MalformedContext(2))
        );
        assert_eq!(
            Context::new(node("a", [node("g", [Tree::hole()]), Tree::hole()])),
            Err(TreeError::MalformedContext(2))
        );
        let context = Context::new(node("a", [leaf("b"), node("g", [Tree::hole()])])).unwrap();
        assert_eq!(context.path(), &[1, 0]);
        assert!(Context::new(Tree::hole()).unwrap().is_identity());
    }

    #[test]
    fn deep_contexts() {
        let g = Symbol::new("g", 1);
        let depth = 100_000;
        let tree = (0..depth).fold(Tree::hole(), |tree, _| Tree::new(g.clone(), [tree]).unwrap());
        let context = Context::new(tree).unwrap();
        assert_eq!(context.path().len(), depth);
        let plugged = context.substitute(&leaf("b"));
        assert_eq!(plugged, chain(depth));
        assert_eq!(plugged.hole_count(), 0);
    }

    #[test]
    fn substitution() {
        let context = Context::new(node("a", [leaf("b"), node("g", [Tree::hole()])])).unwrap();
        let plugged = context.substitute(&leaf("c"));
        assert_eq!(plugged, node("a", [leaf("b"), node("g", [leaf("c")])]));
        assert_eq!(leaf("c").applied_to(&context), plugged);
        assert_eq!(Context::identity().substitute(&plugged), plugged);
    }

    #[test]
    fn composition_threads_the_hole() {
        let outer = Context::new(node("a", [Tree::hole(), leaf("c")])).unwrap();
        let inner = Context::new(node("g", [Tree::hole()])).unwrap();
        let composed = outer.compose(&inner);
        assert_eq!(composed.path(), &[0, 0]);
        assert_eq!(
            composed.substitute(&leaf("b")),
            outer.substitute(&inner.substitute(&leaf("b")))
        );
        assert_eq!(Context::identity().compose(&inner), inner);
    }
}
