use tracing::{info, warn};

use crate::{
    active::LearningError,
    encoding::{b_parse_automaton, tree_to_sequence},
    prelude::*,
};

/// Turns a word-level [`Vpl`] into a tree-level [`MembershipOracle`] over the ranked view of its
/// alphabet. A tree is first checked against the B-parse automaton: malformed trees have no meaning
/// as words and are rejected right away. All other trees are converted into their word, which is
/// then passed on to the language.
#[derive(Debug, Clone)]
pub struct VplOracle<L> {
    vpl: L,
    guard: TreeAutomaton,
    ranked: RankedAlphabet,
}

impl<L: Vpl> VplOracle<L> {
    /// Wraps the given language.
    pub fn new(vpl: L) -> Self {
        let guard = b_parse_automaton(vpl.alphabet());
        let ranked = vpl.alphabet().to_ranked();
        Self { vpl, guard, ranked }
    }

    /// The wrapped language.
    pub fn vpl(&self) -> &L {
        &self.vpl
    }

    /// The alphabet of the wrapped language.
    pub fn vp_alphabet(&self) -> &VPAlphabet {
        self.vpl.alphabet()
    }
}

impl<L: Vpl> MembershipOracle for VplOracle<L> {
    fn alphabet(&self) -> &RankedAlphabet {
        &self.ranked
    }

    fn is_accepted(&self, tree: &Tree) -> bool {
        if !self.guard.is_accepted(tree) {
            return false;
        }
        match tree_to_sequence(tree, self.vpl.alphabet()) {
            Ok(word) => self.vpl.is_accepted(&word),
            Err(err) => {
                warn!("tree {} passed the guard but has no word: {err}", tree.show());
                false
            }
        }
    }
}

/// Learns a visibly-pushdown language by running [`TLStar`] on its tree encoding.
///
/// By default, hypotheses are tested with a [`SamplingEquivalence`] that draws 100 trees of depth at
/// most 6 over the ranked view of the alphabet.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let alphabet = VPAlphabet::new(['('], [')'], ['a']).unwrap();
/// // words with an even number of internal symbols
/// let vpl = PredicateVpl::new(alphabet, |w: &str| w.matches('a').count() % 2 == 0);
/// let learned = VplStar::with_equivalence(&vpl, ExhaustiveEquivalence::new(3))
///     .learn()
///     .unwrap();
/// assert!(learned.is_accepted("(a)a"));
/// assert!(!learned.is_accepted("(a)"));
/// assert!(!learned.is_accepted(")aa("));
/// ```
pub struct VplStar<L, E> {
    learner: TLStar<VplOracle<L>, E>,
}

#[cfg(feature = "random")]
impl<L: Vpl> VplStar<L, SamplingEquivalence> {
    /// Number of trees drawn per equivalence query.
    pub const DEFAULT_SAMPLES: usize = 100;
    /// Depth bound of the drawn trees.
    pub const DEFAULT_MAX_DEPTH: usize = 6;

    /// Creates a learner for `vpl` with the default sampling equivalence oracle.
    pub fn new(vpl: L) -> Self {
        Self::with_equivalence(
            vpl,
            SamplingEquivalence::new(Self::DEFAULT_SAMPLES, Self::DEFAULT_MAX_DEPTH),
        )
    }
}

impl<L: Vpl, E: EquivalenceOracle> VplStar<L, E> {
    /// Creates a learner for `vpl` whose hypotheses are tested by `equivalence`.
    pub fn with_equivalence(vpl: L, equivalence: E) -> Self {
        Self {
            learner: TLStar::with_equivalence(VplOracle::new(vpl), equivalence),
        }
    }

    /// Bounds the number of hypotheses, see [`TLStar::with_iteration_limit`].
    pub fn with_iteration_limit(self, limit: usize) -> Self {
        Self {
            learner: self.learner.with_iteration_limit(limit),
        }
    }

    /// Gives access to the underlying tree learner.
    pub fn learner(&self) -> &TLStar<VplOracle<L>, E> {
        &self.learner
    }

    /// Learns the language and returns the final hypothesis as a word acceptor.
    pub fn learn(&mut self) -> Result<TreeAutomatonVpl, LearningError> {
        let automaton = self.learner.learn()?;
        let alphabet = self.learner.oracle().vp_alphabet().clone();
        info!(
            "learned VPL over {} symbols with {} states",
            alphabet.size(),
            automaton.size()
        );
        Ok(TreeAutomatonVpl::new(alphabet, automaton))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::is_well_formed;
    use crate::tests::dyck_alphabet;
    use crate::tree::tests::node;
    use itertools::Itertools;

    fn balanced(word: &str) -> bool {
        let mut depth = 0i32;
        for c in word.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return false;
            }
        }
        depth == 0
    }

    #[test]
    fn guard_rejects_malformed_trees() {
        let vpl = PredicateVpl::new(dyck_alphabet(), |_: &str| true);
        let oracle = VplOracle::new(&vpl);
        assert!(oracle.is_accepted(&Tree::epsilon()));
        assert!(oracle.is_accepted(&node("(", [Tree::epsilon(), node(")", [Tree::epsilon()])])));
        assert!(!oracle.is_accepted(&node(")", [Tree::epsilon()])));
        assert!(!oracle.is_accepted(&node("(", [node(")", [Tree::epsilon()]), Tree::epsilon()])));
        assert_eq!(oracle.alphabet(), &dyck_alphabet().to_ranked());
    }

    #[test_log::test]
    fn learns_dyck() {
        let alphabet = dyck_alphabet();
        let vpl = PredicateVpl::new(alphabet.clone(), balanced);
        let learned = VplStar::with_equivalence(&vpl, ExhaustiveEquivalence::new(3))
            .learn()
            .unwrap();

        let guard = b_parse_automaton(&alphabet);
        for tree in Tree::all_up_to_depth(&alphabet.to_ranked(), 3) {
            assert_eq!(
                learned.automaton().is_accepted(&tree),
                guard.is_accepted(&tree),
                "{}",
                tree.show()
            );
        }

        // every word of length at most three is encoded by a tree of depth at most three
        let symbols = alphabet.universe().collect_vec();
        let mut words = vec![String::new()];
        let mut frontier = vec![String::new()];
        for _ in 0..3 {
            frontier = frontier
                .iter()
                .flat_map(|w| symbols.iter().map(move |s| format!("{w}{s}")))
                .collect();
            words.extend(frontier.iter().cloned());
        }
        for word in words {
            assert_eq!(learned.is_accepted(&word), is_well_formed(&word, &alphabet));
        }
    }

    #[test_log::test]
    fn learns_even_internal_count_and_synthesizes_grammar() {
        let alphabet = dyck_alphabet();
        let vpl = PredicateVpl::new(alphabet.clone(), |w: &str| {
            w.matches('a').count() % 2 == 0
        });
        let learned = VplStar::with_equivalence(&vpl, ExhaustiveEquivalence::new(3))
            .learn()
            .unwrap();
        for word in ["", "aa", "(a)a", "(aa)", "a(a)"] {
            assert!(learned.is_accepted(word), "{word}");
        }
        for word in ["a", "(a)", "aaa(", ")aa"] {
            assert!(!learned.is_accepted(word), "{word}");
        }

        let grammar = learned.grammar().unwrap();
        assert!(grammar.rules().iter().any(|r| r.kind() == RuleKind::Epsilon));
        assert!(grammar.rules().iter().any(|r| r.kind() == RuleKind::Internal));
        assert!(grammar.rules().iter().any(|r| r.kind() == RuleKind::PushPop));
    }

    #[cfg(feature = "random")]
    #[test]
    fn default_learner_reproduces_its_table() {
        let vpl = PredicateVpl::new(dyck_alphabet(), balanced);
        let mut learner = VplStar::new(&vpl);
        let learned = learner.learn().unwrap();
        // malformed words never reach the automaton
        assert!(!learned.is_accepted(")("));
        assert!(!learned.is_accepted("(("));
        for tree in learner.learner().table().s() {
            let accepted = learned.automaton().is_accepted(tree);
            assert_eq!(accepted, learner.learner().oracle().is_accepted(tree));
        }
    }
}
