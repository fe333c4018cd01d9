use tracing::{debug, trace};

use crate::prelude::*;

/// A membership oracle answers whether a tree belongs to the language that is being learned. This is
/// the one capability the learner needs from its target, and it is implemented by wildly different
/// types: a [`TreeAutomaton`], a closure wrapped in a [`FnOracle`] or an adapter around a word-level
/// language such as [`crate::vpl::VplOracle`].
///
/// The oracle is total, inputs for which the target has no defined meaning are rejected.
pub trait MembershipOracle {
    /// The ranked alphabet over which trees are queried.
    fn alphabet(&self) -> &RankedAlphabet;

    /// Returns true if `tree` belongs to the target language.
    fn is_accepted(&self, tree: &Tree) -> bool;
}

impl MembershipOracle for TreeAutomaton {
    fn alphabet(&self) -> &RankedAlphabet {
        TreeAutomaton::alphabet(self)
    }

    fn is_accepted(&self, tree: &Tree) -> bool {
        TreeAutomaton::is_accepted(self, tree)
    }
}

impl<O: MembershipOracle + ?Sized> MembershipOracle for &O {
    fn alphabet(&self) -> &RankedAlphabet {
        O::alphabet(self)
    }

    fn is_accepted(&self, tree: &Tree) -> bool {
        O::is_accepted(self, tree)
    }
}

/// An oracle that answers membership queries by calling a function.
#[derive(Clone)]
pub struct FnOracle<F> {
    alphabet: RankedAlphabet,
    predicate: F,
}

impl<F: Fn(&Tree) -> bool> FnOracle<F> {
    /// Creates an oracle over `alphabet` that accepts a tree iff `predicate` returns true.
    pub fn new(alphabet: RankedAlphabet, predicate: F) -> Self {
        Self {
            alphabet,
            predicate,
        }
    }
}

impl<F: Fn(&Tree) -> bool> MembershipOracle for FnOracle<F> {
    fn alphabet(&self) -> &RankedAlphabet {
        &self.alphabet
    }

    fn is_accepted(&self, tree: &Tree) -> bool {
        (self.predicate)(tree)
    }
}

impl<F> std::fmt::Debug for FnOracle<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnOracle over {}", self.alphabet.show())
    }
}

/// An equivalence oracle compares a hypothesis with the target (given through its membership
/// oracle) and produces a tree on which the two disagree.
///
/// None of the implementations is a decision procedure: they only look at finitely many trees, so
/// finding no counterexample is evidence, not a proof, that hypothesis and target coincide.
pub trait EquivalenceOracle {
    /// Searches for a tree that is accepted by exactly one of `hypothesis` and `oracle`.
    fn counterexample<O: MembershipOracle + ?Sized>(
        &self,
        hypothesis: &TreeAutomaton,
        oracle: &O,
    ) -> Option<Tree>;
}

impl<E: EquivalenceOracle + ?Sized> EquivalenceOracle for &E {
    fn counterexample<O: MembershipOracle + ?Sized>(
        &self,
        hypothesis: &TreeAutomaton,
        oracle: &O,
    ) -> Option<Tree> {
        E::counterexample(self, hypothesis, oracle)
    }
}

fn disagree<O: MembershipOracle + ?Sized>(
    hypothesis: &TreeAutomaton,
    oracle: &O,
    tree: &Tree,
) -> bool {
    hypothesis.is_accepted(tree) != oracle.is_accepted(tree)
}

/// Approximates equivalence by drawing random trees with a [`TreeGenerator`] over the alphabet of the
/// membership oracle and returning the first one on which hypothesis and oracle disagree.
#[cfg(feature = "random")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingEquivalence {
    samples: usize,
    max_depth: usize,
    seed: Option<u64>,
}

#[cfg(feature = "random")]
impl SamplingEquivalence {
    /// Number of trees drawn per query if nothing else is specified.
    pub const DEFAULT_SAMPLES: usize = 1000;
    /// Depth bound for drawn trees if nothing else is specified.
    pub const DEFAULT_MAX_DEPTH: usize = 5;

    /// Creates a sampler that draws `samples` trees of depth at most `max_depth` for every query.
    pub fn new(samples: usize, max_depth: usize) -> Self {
        Self {
            samples,
            max_depth,
            seed: None,
        }
    }

    /// Fixes the seed of the underlying generator. Every query then draws the same sequence of trees,
    /// which makes learning runs reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of trees drawn per query.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Depth bound of the drawn trees.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(feature = "random")]
impl Default for SamplingEquivalence {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLES, Self::DEFAULT_MAX_DEPTH)
    }
}

#[cfg(feature = "random")]
impl EquivalenceOracle for SamplingEquivalence {
    fn counterexample<O: MembershipOracle + ?Sized>(
        &self,
        hypothesis: &TreeAutomaton,
        oracle: &O,
    ) -> Option<Tree> {
        let mut generator = TreeGenerator::new(oracle.alphabet().clone());
        if let Some(seed) = self.seed {
            generator = generator.with_seed(seed);
        }

        let found = (0..self.samples)
            .map_while(|_| generator.generate_tree(self.max_depth))
            .find(|tree| disagree(hypothesis, oracle, tree));
        match &found {
            Some(tree) => debug!("sampling found counterexample {}", tree.show()),
            None => trace!("no disagreement among {} sampled trees", self.samples),
        }
        found
    }
}

/// Compares hypothesis and oracle on every tree up to a fixed depth, in the order given by
/// [`Tree::all_up_to_depth`]. This is exact for trees within the bound but the number of trees grows
/// doubly exponentially with the depth, so it is only usable for small alphabets and depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustiveEquivalence {
    max_depth: usize,
}

impl ExhaustiveEquivalence {
    /// Creates an oracle that checks all trees of depth at most `max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl EquivalenceOracle for ExhaustiveEquivalence {
    fn counterexample<O: MembershipOracle + ?Sized>(
        &self,
        hypothesis: &TreeAutomaton,
        oracle: &O,
    ) -> Option<Tree> {
        let found = Tree::all_up_to_depth(oracle.alphabet(), self.max_depth)
            .find(|tree| disagree(hypothesis, oracle, tree));
        if let Some(tree) = &found {
            debug!("exhaustive search found counterexample {}", tree.show());
        }
        found
    }
}
