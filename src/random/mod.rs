use fastrand::Rng;
use tracing::trace;

use crate::prelude::*;

/// Draws random trees over a [`RankedAlphabet`] whose depth is bounded.
///
/// A tree is generated top-down: a symbol is drawn uniformly from the whole alphabet, and if the
/// depth budget is used up or the symbol has arity zero, the node is turned into a leaf by drawing
/// again among the symbols of arity zero only. Otherwise one subtree is generated for every child
/// slot, each with a budget that is reduced by one. Leaves have depth zero, so every generated tree
/// has depth at most `max_depth`.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let alphabet = RankedAlphabet::new([Symbol::new("f", 2), Symbol::new("b", 0)]);
/// let mut generator = TreeGenerator::new(alphabet).with_seed(7);
/// let trees = generator.generate_trees(20, 3);
/// assert_eq!(trees.len(), 20);
/// assert!(trees.iter().all(|t| t.depth() <= 3));
/// ```
#[derive(Debug, Clone)]
pub struct TreeGenerator {
    alphabet: RankedAlphabet,
    symbols: Vec<Symbol>,
    leaves: Vec<Symbol>,
    rng: Rng,
}

impl TreeGenerator {
    /// Creates a generator for the given alphabet that is seeded from the environment.
    pub fn new(alphabet: RankedAlphabet) -> Self {
        let symbols = alphabet.universe().cloned().collect();
        let leaves = alphabet.symbols_by_arity(0).cloned().collect();
        Self {
            alphabet,
            symbols,
            leaves,
            rng: Rng::new(),
        }
    }

    /// Reseeds the generator, which makes the drawn trees reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Rng::with_seed(seed);
        self
    }

    /// Returns the alphabet from which symbols are drawn.
    pub fn alphabet(&self) -> &RankedAlphabet {
        &self.alphabet
    }

    /// Generates a single tree of depth at most `max_depth`. Returns `None` if the alphabet does
    /// not contain any symbol of arity zero, as then no tree can be finished.
    pub fn generate_tree(&mut self, max_depth: usize) -> Option<Tree> {
        if self.leaves.is_empty() {
            return None;
        }
        Some(self.draw(max_depth))
    }

    /// Generates `n` trees, each of depth at most `max_depth`. The result is empty if no tree can
    /// be built over the alphabet.
    pub fn generate_trees(&mut self, n: usize, max_depth: usize) -> Vec<Tree> {
        trace!("drawing {n} random trees of depth at most {max_depth}");
        (0..n).map_while(|_| self.generate_tree(max_depth)).collect()
    }

    fn draw(&mut self, budget: usize) -> Tree {
        let mut symbol = self.symbols[self.rng.usize(..self.symbols.len())].clone();
        if budget == 0 || symbol.arity() == 0 {
            if symbol.arity() != 0 {
                symbol = self.leaves[self.rng.usize(..self.leaves.len())].clone();
            }
            return Tree::from_parts(symbol, vec![]);
        }
        let children = (0..symbol.arity()).map(|_| self.draw(budget - 1)).collect();
        Tree::from_parts(symbol, children)
    }
}

impl VPAlphabet {
    /// Generate a random word of length `len` over the universe of the alphabet, every position is
    /// drawn uniformly and independently. The word need not be well-matched.
    pub fn random_word(&self, len: usize) -> String {
        let charset: Vec<char> = self.universe().collect();
        if charset.is_empty() {
            return String::new();
        }
        (0..len)
            .map(|_| charset[fastrand::usize(..charset.len())])
            .collect()
    }

    /// Generate a set of `number` distinct random words over the alphabet, the length of each one is
    /// drawn uniformly from `min_len..=max_len`. If fewer than `number` distinct words of such lengths
    /// exist, all of them are eventually returned.
    pub fn random_words(&self, min_len: usize, max_len: usize, number: usize) -> math::Set<String> {
        let mut words = math::Set::with_capacity_and_hasher(number, Default::default());
        let available = (min_len..=max_len)
            .map(|len| self.size().saturating_pow(len as u32))
            .fold(0usize, usize::saturating_add);
        let target = number.min(available);

        while words.len() < target {
            let len = fastrand::usize(min_len..=max_len);
            words.insert(self.random_word(len));
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::dyck_alphabet;

    #[test]
    fn trees_respect_depth_and_alphabet() {
        let alphabet = dyck_alphabet().to_ranked();
        let mut generator = TreeGenerator::new(alphabet.clone()).with_seed(42);
        for max_depth in 0..6 {
            for tree in generator.generate_trees(50, max_depth) {
                assert!(tree.depth() <= max_depth);
                assert_eq!(tree.hole_count(), 0);
                assert!(alphabet.contains(&tree.root()));
            }
        }
        assert_eq!(generator.generate_tree(0), Some(Tree::epsilon()));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let alphabet = RankedAlphabet::new([
            Symbol::new("f", 2),
            Symbol::new("g", 1),
            Symbol::new("b", 0),
        ]);
        let first = TreeGenerator::new(alphabet.clone())
            .with_seed(3)
            .generate_trees(30, 4);
        let second = TreeGenerator::new(alphabet).with_seed(3).generate_trees(30, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn no_leaves_no_trees() {
        let mut generator = TreeGenerator::new(RankedAlphabet::new([Symbol::new("g", 1)]));
        assert_eq!(generator.generate_tree(3), None);
        assert!(generator.generate_trees(10, 3).is_empty());
    }

    #[test]
    fn random_words_over_alphabet() {
        let alphabet = dyck_alphabet();
        let word = alphabet.random_word(12);
        assert_eq!(word.chars().count(), 12);
        assert!(word.chars().all(|c| alphabet.contains(c)));

        let words = alphabet.random_words(1, 3, 10);
        assert_eq!(words.len(), 10);
        assert!(words.iter().all(|w| (1..=3).contains(&w.chars().count())));
        // only three words of length one exist
        assert_eq!(alphabet.random_words(1, 1, 10).len(), 3);
    }
}
