use std::sync::Arc;

use tracing::trace;

use super::Tree;
use crate::alphabet::{RankedAlphabet, Symbol};

impl Tree {
    /// Lazily enumerates every tree over `alphabet` whose depth is at most `depth`, each exactly once.
    /// Trees are produced symbol by symbol in the order of the alphabet, children are varied
    /// like the digits of a counter with the last child changing fastest.
    ///
    /// All trees of depth at most `depth - 1` are kept in memory, the trees of the last layer are
    /// only built when requested.
    pub fn all_up_to_depth(alphabet: &RankedAlphabet, depth: usize) -> AllTrees {
        let pool: Arc<[Tree]> = match depth {
            0 => Arc::from(vec![]),
            _ => Tree::all_up_to_depth(alphabet, depth - 1).collect::<Vec<_>>().into(),
        };
        trace!("enumerating trees up to depth {depth} from {} subtrees", pool.len());
        AllTrees {
            symbols: alphabet
                .universe()
                .filter(|sym| depth > 0 || sym.arity() == 0)
                .cloned()
                .collect(),
            position: 0,
            pool,
            counter: None,
        }
    }
}

/// Iterator over all trees up to a given depth, see [`Tree::all_up_to_depth`].
#[derive(Debug, Clone)]
pub struct AllTrees {
    symbols: Vec<Symbol>,
    position: usize,
    pool: Arc<[Tree]>,
    counter: Option<Vec<usize>>,
}

impl AllTrees {
    fn advance(&mut self) {
        self.position += 1;
        self.counter = None;
    }
}

impl Iterator for AllTrees {
    type Item = Tree;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let symbol = self.symbols.get(self.position)?.clone();
            if symbol.arity() == 0 {
                self.advance();
                return Some(Tree::from_parts(symbol, vec![]));
            }
            if self.pool.is_empty() {
                self.advance();
                continue;
            }

            let counter = self
                .counter
                .get_or_insert_with(|| vec![0; symbol.arity()]);
            let children = counter.iter().map(|&i| self.pool[i].clone()).collect();

            // increment the counter, moving on to the next symbol once it overflows
            let mut digit = counter.len();
            loop {
                if digit == 0 {
                    self.advance();
                    break;
                }
                digit -= 1;
                counter[digit] += 1;
                if counter[digit] < self.pool.len() {
                    break;
                }
                counter[digit] = 0;
            }

            return Some(Tree::from_parts(symbol, children));
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn count(alphabet: &RankedAlphabet, depth: usize) -> usize {
        Tree::all_up_to_depth(alphabet, depth).count()
    }

    #[test]
    fn enumeration_counts() {
        let alphabet = RankedAlphabet::new([
            Symbol::new("a", 2),
            Symbol::new("b", 0),
            Symbol::new("c", 0),
        ]);
        assert_eq!(count(&alphabet, 0), 2);
        assert_eq!(count(&alphabet, 1), 6);
        assert_eq!(count(&alphabet, 2), 38);
        assert_eq!(count(&alphabet, 3), 1446);

        let unary = RankedAlphabet::new([
            Symbol::new("f", 2),
            Symbol::new("g", 1),
            Symbol::new("b", 0),
        ]);
        assert_eq!(count(&unary, 1), 3);
        assert_eq!(count(&unary, 2), 13);
        assert_eq!(count(&unary, 3), 183);
    }

    #[test]
    fn enumeration_is_duplicate_free_and_bounded() {
        let alphabet = RankedAlphabet::new([
            Symbol::new("f", 2),
            Symbol::new("g", 1),
            Symbol::epsilon(),
        ]);
        let trees = Tree::all_up_to_depth(&alphabet, 3).collect_vec();
        assert_eq!(trees.len(), trees.iter().unique().count());
        assert!(trees.iter().all(|t| t.depth() <= 3));
        assert!(trees.contains(&Tree::epsilon()));
    }

    #[test]
    fn no_leaves_means_no_trees() {
        let alphabet = RankedAlphabet::new([Symbol::new("g", 1)]);
        assert_eq!(count(&alphabet, 3), 0);
    }
}
