use std::collections::BTreeSet;

use thiserror::Error;
use tracing::trace;

use crate::{
    alphabet::{SymbolKind, BOTTOM},
    math,
    prelude::*,
};

/// Errors that are detected when a [`Vpa`] is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VpaError {
    /// A transition reads a symbol that is not of the kind the transition requires.
    #[error("`{symbol}` is not a {expected:?} symbol of the alphabet")]
    WrongKind {
        /// The symbol that was read.
        symbol: char,
        /// The kind of transition it was used in.
        expected: SymbolKind,
    },
    /// A transition writes or expects a stack symbol outside of the stack alphabet.
    #[error("`{0}` is not in the stack alphabet")]
    UnknownStackSymbol(char),
    /// Two transitions leave the same state on the same input (and stack top).
    #[error("state {state} has more than one transition on `{symbol}`")]
    Nondeterministic {
        /// Name of the source state.
        state: String,
        /// The symbol that was read.
        symbol: char,
    },
}

/// A deterministic visibly-pushdown automaton. Push symbols write a symbol of the [`StackAlphabet`]
/// onto the stack, pop symbols read and remove the topmost one and internal symbols leave the stack
/// alone. Popping from the empty stack reads [`BOTTOM`] and leaves the stack empty.
///
/// A word is accepted if its run is defined, ends in a final state and leaves the stack empty. The
/// empty stack rules out pending push symbols, but transitions on [`BOTTOM`] accept unmatched pop
/// symbols, so such an automaton may accept words like `))` that are not well-matched. A language
/// learned from it with [`VplStar`] only agrees on the well-matched words.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let alphabet = VPAlphabet::new(['('], [')'], ['a']).unwrap();
/// let dyck = VpaBuilder::new(alphabet)
///     .with_initial("q")
///     .with_final_states(["q"])
///     .with_push("q", '(', "q", '(')
///     .with_pop("q", ')', '(', "q")
///     .with_internal("q", 'a', "q")
///     .into_vpa()
///     .unwrap();
/// assert!(dyck.is_accepted("(a)()"));
/// assert!(!dyck.is_accepted("(()"));
/// assert!(!dyck.is_accepted(")("));
/// ```
#[derive(Debug, Clone)]
pub struct Vpa {
    alphabet: VPAlphabet,
    stack_alphabet: StackAlphabet,
    initial: State,
    states: BTreeSet<State>,
    final_states: BTreeSet<State>,
    push: math::Map<(State, char), (State, char)>,
    pop: math::Map<(State, char, char), State>,
    internal: math::Map<(State, char), State>,
}

impl Vpa {
    /// Creates a [`VpaBuilder`] for the given alphabet.
    pub fn builder(alphabet: VPAlphabet) -> VpaBuilder {
        VpaBuilder::new(alphabet)
    }

    /// The stack alphabet.
    pub fn stack_alphabet(&self) -> &StackAlphabet {
        &self.stack_alphabet
    }

    /// The initial state.
    pub fn initial(&self) -> &State {
        &self.initial
    }

    /// Iterates over all states.
    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter()
    }

    /// Runs the automaton on `word` and returns the reached state together with the remaining stack
    /// (bottom first), or `None` if the run gets stuck.
    pub fn run(&self, word: &str) -> Option<(&State, Vec<char>)> {
        let mut state = &self.initial;
        let mut stack = vec![];

        for sym in word.chars() {
            state = match self.alphabet.kind(sym)? {
                SymbolKind::Push => {
                    let (next, gamma) = self.push.get(&(state.clone(), sym))?;
                    stack.push(*gamma);
                    next
                }
                SymbolKind::Pop => {
                    let top = stack.pop().unwrap_or(BOTTOM);
                    self.pop.get(&(state.clone(), sym, top))?
                }
                SymbolKind::Internal => self.internal.get(&(state.clone(), sym))?,
            };
        }

        Some((state, stack))
    }
}

impl Vpl for Vpa {
    fn alphabet(&self) -> &VPAlphabet {
        &self.alphabet
    }

    fn is_accepted(&self, word: &str) -> bool {
        match self.run(word) {
            Some((state, stack)) => stack.is_empty() && self.final_states.contains(state),
            None => {
                trace!("run of VPA on {word} is undefined");
                false
            }
        }
    }
}

/// Collects the parts of a [`Vpa`], which is checked and assembled by [`VpaBuilder::into_vpa`].
/// Unless specified otherwise, the stack alphabet consists of the push symbols and the initial state
/// is called `q0`.
#[derive(Debug, Clone)]
pub struct VpaBuilder {
    alphabet: VPAlphabet,
    stack_alphabet: StackAlphabet,
    initial: State,
    finals: Vec<State>,
    push: Vec<(State, char, State, char)>,
    pop: Vec<(State, char, char, State)>,
    internal: Vec<(State, char, State)>,
}

impl VpaBuilder {
    /// Starts building an automaton over `alphabet`.
    pub fn new(alphabet: VPAlphabet) -> Self {
        Self {
            stack_alphabet: alphabet.stack_alphabet(),
            alphabet,
            initial: State::from("q0"),
            finals: vec![],
            push: vec![],
            pop: vec![],
            internal: vec![],
        }
    }

    /// Replaces the stack alphabet.
    pub fn with_stack_alphabet(mut self, stack_alphabet: StackAlphabet) -> Self {
        self.stack_alphabet = stack_alphabet;
        self
    }

    /// Sets the initial state.
    pub fn with_initial<S: Into<State>>(mut self, initial: S) -> Self {
        self.initial = initial.into();
        self
    }

    /// Marks states as final.
    pub fn with_final_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<State>,
    {
        self.finals.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds a transition that reads the push symbol `sym` in `source`, moves to `target` and writes
    /// `gamma` onto the stack.
    pub fn with_push<S: Into<State>>(mut self, source: S, sym: char, target: S, gamma: char) -> Self {
        self.push.push((source.into(), sym, target.into(), gamma));
        self
    }

    /// Adds a transition that reads the pop symbol `sym` in `source` with `gamma` (or [`BOTTOM`]) on
    /// top of the stack and moves to `target`.
    pub fn with_pop<S: Into<State>>(mut self, source: S, sym: char, gamma: char, target: S) -> Self {
        self.pop.push((source.into(), sym, gamma, target.into()));
        self
    }

    /// Adds a transition that reads the internal symbol `sym` in `source` and moves to `target`.
    pub fn with_internal<S: Into<State>>(mut self, source: S, sym: char, target: S) -> Self {
        self.internal.push((source.into(), sym, target.into()));
        self
    }

    fn check_kind(&self, symbol: char, expected: SymbolKind) -> Result<(), VpaError> {
        match self.alphabet.kind(symbol) == Some(expected) {
            true => Ok(()),
            false => Err(VpaError::WrongKind { symbol, expected }),
        }
    }

    /// Validates the transitions and assembles the automaton.
    pub fn into_vpa(self) -> Result<Vpa, VpaError> {
        let mut states: BTreeSet<State> = BTreeSet::new();
        states.insert(self.initial.clone());
        states.extend(self.finals.iter().cloned());

        let duplicate = |state: &State, symbol: char| VpaError::Nondeterministic {
            state: state.name().to_string(),
            symbol,
        };

        let mut push = math::Map::default();
        for (source, sym, target, gamma) in &self.push {
            self.check_kind(*sym, SymbolKind::Push)?;
            if !self.stack_alphabet.contains(*gamma) {
                return Err(VpaError::UnknownStackSymbol(*gamma));
            }
            states.extend([source.clone(), target.clone()]);
            if push
                .insert((source.clone(), *sym), (target.clone(), *gamma))
                .is_some()
            {
                return Err(duplicate(source, *sym));
            }
        }

        let mut pop = math::Map::default();
        for (source, sym, gamma, target) in &self.pop {
            self.check_kind(*sym, SymbolKind::Pop)?;
            if *gamma != BOTTOM && !self.stack_alphabet.contains(*gamma) {
                return Err(VpaError::UnknownStackSymbol(*gamma));
            }
            states.extend([source.clone(), target.clone()]);
            if pop
                .insert((source.clone(), *sym, *gamma), target.clone())
                .is_some()
            {
                return Err(duplicate(source, *sym));
            }
        }

        let mut internal = math::Map::default();
        for (source, sym, target) in &self.internal {
            self.check_kind(*sym, SymbolKind::Internal)?;
            states.extend([source.clone(), target.clone()]);
            if internal
                .insert((source.clone(), *sym), target.clone())
                .is_some()
            {
                return Err(duplicate(source, *sym));
            }
        }

        Ok(Vpa {
            alphabet: self.alphabet,
            stack_alphabet: self.stack_alphabet,
            initial: self.initial,
            final_states: self.finals.into_iter().collect(),
            states,
            push,
            pop,
            internal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{active::ExhaustiveEquivalence, tests::dyck_alphabet};

    /// Well-matched words in which every `a` is enclosed by at least one pair of brackets.
    fn guarded_internals() -> Vpa {
        VpaBuilder::new(dyck_alphabet())
            .with_stack_alphabet(StackAlphabet::new(['o', 'i']))
            .with_initial("out")
            .with_final_states(["out"])
            .with_push("out", '(', "in", 'o')
            .with_push("in", '(', "in", 'i')
            .with_pop("in", ')', 'o', "out")
            .with_pop("in", ')', 'i', "in")
            .with_internal("in", 'a', "in")
            .into_vpa()
            .unwrap()
    }

    #[test]
    fn runs_use_the_stack() {
        let vpa = guarded_internals();
        assert_eq!(vpa.states().count(), 2);
        assert!(vpa.is_accepted(""));
        assert!(vpa.is_accepted("(a)"));
        assert!(vpa.is_accepted("((a)a)()"));
        assert!(!vpa.is_accepted("a"));
        assert!(!vpa.is_accepted("(a)a"));
        assert!(!vpa.is_accepted("(("));
        assert!(!vpa.is_accepted(")"));
        assert_eq!(vpa.run("(("), Some((&State::from("in"), vec!['o', 'i'])));
        assert_eq!(vpa.run("x"), None);
    }

    #[test]
    fn builder_validation() {
        assert_eq!(
            VpaBuilder::new(dyck_alphabet())
                .with_push("q", 'a', "q", '(')
                .into_vpa()
                .err(),
            Some(VpaError::WrongKind {
                symbol: 'a',
                expected: SymbolKind::Push
            })
        );
        assert_eq!(
            VpaBuilder::new(dyck_alphabet())
                .with_push("q", '(', "q", 'x')
                .into_vpa()
                .err(),
            Some(VpaError::UnknownStackSymbol('x'))
        );
        assert_eq!(
            VpaBuilder::new(dyck_alphabet())
                .with_internal("q", 'a', "q")
                .with_internal("q", 'a', "p")
                .into_vpa()
                .err(),
            Some(VpaError::Nondeterministic {
                state: "q".to_string(),
                symbol: 'a'
            })
        );
        let vpa = VpaBuilder::new(dyck_alphabet())
            .with_pop("q0", ')', BOTTOM, "q0")
            .with_final_states(["q0"])
            .into_vpa()
            .unwrap();
        assert!(vpa.is_accepted("))"));
        assert!(vpa.stack_alphabet().contains('('));
    }

    #[test_log::test]
    fn unmatched_pops_are_not_learned() {
        let vpa = VpaBuilder::new(dyck_alphabet())
            .with_final_states(["q0"])
            .with_push("q0", '(', "q1", '(')
            .with_pop("q1", ')', '(', "q0")
            .with_pop("q0", ')', BOTTOM, "q0")
            .into_vpa()
            .unwrap();
        assert!(vpa.is_accepted("))"));
        assert!(vpa.is_accepted(")()"));
        assert!(!vpa.is_accepted("(("));

        let learned = VplStar::with_equivalence(&vpa, ExhaustiveEquivalence::new(3))
            .learn()
            .unwrap();
        for word in ["", "()"] {
            assert!(learned.is_accepted(word), "{word}");
        }
        for word in ["))", ")()", ")", "(()"] {
            assert!(!learned.is_accepted(word), "{word}");
        }
    }

    #[test_log::test]
    fn learn_from_vpa() {
        let vpa = guarded_internals();
        let learned = VplStar::with_equivalence(&vpa, ExhaustiveEquivalence::new(3))
            .learn()
            .unwrap();
        for word in ["", "(a)", "()", "(aa)", "((a))"] {
            assert_eq!(learned.is_accepted(word), vpa.is_accepted(word), "{word}");
        }
        for word in ["a", "a()", "(a)a", ")a("] {
            assert!(!learned.is_accepted(word), "{word}");
        }
    }
}
