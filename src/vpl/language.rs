use tracing::trace;

use crate::{
    encoding::{b_parse_automaton, sequence_to_tree, EncodingError},
    prelude::*,
};

/// A visibly-pushdown language, given as a membership test for words over a [`VPAlphabet`]. This is
/// all that [`VplStar`] needs to know about a language it learns. Implementations include explicit
/// automata ([`Vpa`], [`TreeAutomatonVpl`]) and arbitrary predicates ([`PredicateVpl`]), e.g. a
/// wrapped external classifier.
pub trait Vpl {
    /// The alphabet over which words are formed.
    fn alphabet(&self) -> &VPAlphabet;

    /// Returns true if `word` belongs to the language.
    fn is_accepted(&self, word: &str) -> bool;
}

impl<L: Vpl + ?Sized> Vpl for &L {
    fn alphabet(&self) -> &VPAlphabet {
        L::alphabet(self)
    }

    fn is_accepted(&self, word: &str) -> bool {
        L::is_accepted(self, word)
    }
}

/// A language whose membership is decided by a function.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let alphabet = VPAlphabet::new(['('], [')'], []).unwrap();
/// let even = PredicateVpl::new(alphabet, |w: &str| w.len() % 2 == 0);
/// assert!(even.is_accepted("()"));
/// assert!(!even.is_accepted("(()"));
/// ```
#[derive(Clone)]
pub struct PredicateVpl<F> {
    alphabet: VPAlphabet,
    predicate: F,
}

impl<F: Fn(&str) -> bool> PredicateVpl<F> {
    /// Creates the language over `alphabet` of all words for which `predicate` holds.
    pub fn new(alphabet: VPAlphabet, predicate: F) -> Self {
        Self {
            alphabet,
            predicate,
        }
    }
}

impl<F: Fn(&str) -> bool> Vpl for PredicateVpl<F> {
    fn alphabet(&self) -> &VPAlphabet {
        &self.alphabet
    }

    fn is_accepted(&self, word: &str) -> bool {
        (self.predicate)(word)
    }
}

impl<F> std::fmt::Debug for PredicateVpl<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateVpl")
            .field("alphabet", &self.alphabet)
            .finish_non_exhaustive()
    }
}

/// A tree automaton over the encoding of a [`VPAlphabet`], used as an acceptor of words. A word is
/// accepted iff it is well-matched and its encoding is accepted by the automaton. This is what
/// [`VplStar`] produces.
#[derive(Debug, Clone)]
pub struct TreeAutomatonVpl {
    alphabet: VPAlphabet,
    automaton: TreeAutomaton,
    guard: TreeAutomaton,
}

impl TreeAutomatonVpl {
    /// Wraps `automaton`, which should be an automaton over the ranked view of `alphabet`.
    pub fn new(alphabet: VPAlphabet, automaton: TreeAutomaton) -> Self {
        let guard = b_parse_automaton(&alphabet);
        Self {
            alphabet,
            automaton,
            guard,
        }
    }

    /// The underlying tree automaton.
    pub fn automaton(&self) -> &TreeAutomaton {
        &self.automaton
    }

    /// Consumes `self` and returns the underlying tree automaton.
    pub fn into_automaton(self) -> TreeAutomaton {
        self.automaton
    }

    /// Converts the automaton into a visibly-pushdown grammar, see [`Vpg::from_automaton`].
    pub fn grammar(&self) -> Result<Vpg, EncodingError> {
        Vpg::from_automaton(&self.automaton, &self.alphabet)
    }
}

impl Vpl for TreeAutomatonVpl {
    fn alphabet(&self) -> &VPAlphabet {
        &self.alphabet
    }

    fn is_accepted(&self, word: &str) -> bool {
        match sequence_to_tree(word, &self.alphabet) {
            Ok(tree) => self.guard.is_accepted(&tree) && self.automaton.is_accepted(&tree),
            Err(err) => {
                trace!("rejecting {word}: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::dyck_alphabet;

    #[test]
    fn b_parse_as_word_acceptor() {
        let alphabet = dyck_alphabet();
        let vpl = TreeAutomatonVpl::new(alphabet.clone(), b_parse_automaton(&alphabet));
        for word in ["", "a", "()", "(a)a", "(()())"] {
            assert!(vpl.is_accepted(word), "{word}");
        }
        for word in [")", "(", ")(", "(a", "x"] {
            assert!(!vpl.is_accepted(word), "{word}");
        }
        assert_eq!(vpl.grammar().unwrap().rules().len(), 3);
    }

    #[test]
    fn long_words_are_decided() {
        let alphabet = dyck_alphabet();
        let vpl = TreeAutomatonVpl::new(alphabet.clone(), b_parse_automaton(&alphabet));
        let nested = "(".repeat(60_000) + &")".repeat(60_000);
        assert!(vpl.is_accepted(&nested));
        assert!(vpl.is_accepted(&"a".repeat(200_000)));
        assert!(vpl.is_accepted(&"(a)".repeat(50_000)));
        assert!(!vpl.is_accepted(&("(".repeat(60_000) + &")".repeat(59_999))));
        assert!(!vpl.is_accepted(&(")".repeat(60_000) + &"(".repeat(60_000))));

        let tree = sequence_to_tree(&nested, &alphabet).unwrap();
        assert_eq!(tree.depth(), 60_001);
        assert!(VplOracle::new(&vpl).is_accepted(&tree));
    }

    #[test]
    fn predicates_and_references() {
        let vpl = PredicateVpl::new(dyck_alphabet(), |w: &str| w.starts_with('a'));
        let by_ref = &vpl;
        assert!(by_ref.is_accepted("a()"));
        assert!(!Vpl::is_accepted(&by_ref, "()"));
        assert_eq!(by_ref.alphabet().size(), 3);
    }
}
