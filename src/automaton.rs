use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use itertools::Itertools;
use thiserror::Error;
use tracing::trace;

use crate::{alphabet::RankedAlphabet, alphabet::Symbol, math, tree::Tree, Show};

mod builder;
pub use builder::TABuilder;

/// Errors that can occur when assembling a [`TreeAutomaton`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomatonError {
    /// A transition for the given key exists already and leads to a different state. Inserting it
    /// would make the automaton nondeterministic.
    #[error("transition {} already leads to {}, cannot redirect it to {}", .key.show(), .existing.show(), .target.show())]
    DuplicateTransition {
        /// The key under which both transitions were inserted.
        key: TransitionKey,
        /// Target of the transition that was present.
        existing: State,
        /// Target of the rejected transition.
        target: State,
    },
    /// The number of child states in a transition key differs from the arity of its symbol.
    #[error("symbol {symbol:?} has arity {} but the transition has {found} child states", .symbol.arity())]
    ArityMismatch {
        /// The symbol of the transition.
        symbol: Symbol,
        /// The number of child states that were given.
        found: usize,
    },
}

/// A state of a [`TreeAutomaton`]. States are opaque and only identified by their name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(Arc<str>);

impl State {
    /// Creates a state with the given name.
    pub fn new<N: Into<Arc<str>>>(name: N) -> Self {
        Self(name.into())
    }

    /// Returns the name of the state.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for State {
    fn from(value: &str) -> Self {
        State::new(value)
    }
}

impl From<String> for State {
    fn from(value: String) -> Self {
        State::new(value)
    }
}

impl Show for State {
    fn show(&self) -> String {
        self.0.to_string()
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The key of a transition in a bottom-up tree automaton, consisting of a symbol and the ordered
/// states that were reached in the children. The number of child states equals the arity of the symbol.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct TransitionKey {
    symbol: Symbol,
    children: Vec<State>,
}

impl TransitionKey {
    /// Creates a new transition key, fails if the number of child states does not match the arity
    /// of `symbol`.
    pub fn new<I: IntoIterator<Item = State>>(
        symbol: Symbol,
        children: I,
    ) -> Result<Self, AutomatonError> {
        let children = children.into_iter().collect_vec();
        if children.len() != symbol.arity() {
            return Err(AutomatonError::ArityMismatch {
                found: children.len(),
                symbol,
            });
        }
        Ok(Self { symbol, children })
    }

    /// Builds a key whose arity has already been verified by the caller.
    pub(crate) fn from_parts(symbol: Symbol, children: Vec<State>) -> Self {
        debug_assert_eq!(symbol.arity(), children.len());
        Self { symbol, children }
    }

    /// The symbol read by the transition.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// The states of the children, in order.
    pub fn children(&self) -> &[State] {
        &self.children
    }

    /// Returns true if this is the key of the transition for empty leaves.
    pub fn is_epsilon(&self) -> bool {
        self.symbol.is_epsilon()
    }
}

impl Show for TransitionKey {
    fn show(&self) -> String {
        if self.children.is_empty() {
            self.symbol.name().to_string()
        } else {
            format!(
                "{}({})",
                self.symbol.name(),
                self.children.iter().map(Show::show).join(", ")
            )
        }
    }
}

/// A deterministic bottom-up tree automaton. It consists of a set of states, a subset of final
/// states and a partial transition function that maps a [`TransitionKey`] to a state.
///
/// A tree is evaluated from the leaves upwards. Whenever no transition is defined for a node, the
/// evaluation yields no state at all, which is never accepting. Missing transitions are therefore
/// not an error but a way to represent an implicit rejecting sink.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let (a, b, c) = (Symbol::new("a", 2), Symbol::new("b", 0), Symbol::new("c", 0));
/// let automaton = TABuilder::new(RankedAlphabet::new([a.clone(), b.clone(), c.clone()]))
///     .with_transitions([
///         (b.clone(), vec![], "q1"),
///         (c.clone(), vec![], "q2"),
///         (a.clone(), vec!["q1", "q2"], "q0"),
///     ])
///     .with_final_states(["q0"])
///     .into_automaton()
///     .unwrap();
///
/// let (b, c) = (Tree::leaf(b).unwrap(), Tree::leaf(c).unwrap());
/// assert!(automaton.is_accepted(&Tree::new(a.clone(), [b, c.clone()]).unwrap()));
/// assert!(!automaton.is_accepted(&Tree::new(a, [c.clone(), c]).unwrap()));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct TreeAutomaton {
    alphabet: RankedAlphabet,
    states: BTreeSet<State>,
    final_states: BTreeSet<State>,
    transitions: math::Map<TransitionKey, State>,
}

impl TreeAutomaton {
    /// Creates an automaton over the given alphabet without any states or transitions.
    pub fn new(alphabet: RankedAlphabet) -> Self {
        Self {
            alphabet,
            states: BTreeSet::new(),
            final_states: BTreeSet::new(),
            transitions: math::Map::default(),
        }
    }

    /// Creates a [`TABuilder`] for the given alphabet.
    pub fn builder(alphabet: RankedAlphabet) -> TABuilder {
        TABuilder::new(alphabet)
    }

    /// Adds a state, returns false if it was already present.
    pub fn add_state(&mut self, state: State) -> bool {
        self.states.insert(state)
    }

    /// Adds a state and marks it as final.
    pub fn add_final_state(&mut self, state: State) {
        self.states.insert(state.clone());
        self.final_states.insert(state);
    }

    /// Inserts a transition, adding all involved states. Inserting the same transition twice is
    /// harmless, but redirecting an existing key to a different state fails with
    /// [`AutomatonError::DuplicateTransition`] as it would break determinism.
    pub fn add_transition(&mut self, key: TransitionKey, target: State) -> Result<(), AutomatonError> {
        if let Some(existing) = self.transitions.get(&key) {
            if existing != &target {
                return Err(AutomatonError::DuplicateTransition {
                    existing: existing.clone(),
                    key,
                    target,
                });
            }
            return Ok(());
        }
        self.states.extend(key.children.iter().cloned());
        self.states.insert(target.clone());
        self.transitions.insert(key, target);
        Ok(())
    }

    /// Inserts a transition for a key that is known to be fresh, used when the automaton is
    /// constructed rather than learned.
    pub(crate) fn insert_fresh(&mut self, key: TransitionKey, target: State) {
        debug_assert!(!self.transitions.contains_key(&key));
        self.states.extend(key.children.iter().cloned());
        self.states.insert(target.clone());
        self.transitions.insert(key, target);
    }

    /// Returns the underlying alphabet.
    pub fn alphabet(&self) -> &RankedAlphabet {
        &self.alphabet
    }

    /// Iterates over all states in ascending order.
    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter()
    }

    /// Iterates over the final states in ascending order.
    pub fn final_states(&self) -> impl Iterator<Item = &State> + '_ {
        self.final_states.iter()
    }

    /// Returns true if `state` is final.
    pub fn is_final(&self, state: &State) -> bool {
        self.final_states.contains(state)
    }

    /// Iterates over all transitions, sorted by their key.
    pub fn transitions(&self) -> impl Iterator<Item = (&TransitionKey, &State)> + '_ {
        self.transitions.iter().sorted()
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Number of transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Looks up the successor for the given symbol and child states.
    pub fn successor(&self, symbol: &Symbol, children: &[State]) -> Option<&State> {
        let key = TransitionKey {
            symbol: symbol.clone(),
            children: children.to_vec(),
        };
        self.transitions.get(&key)
    }

    /// Evaluates `tree` bottom-up and returns the state that is reached at the root, or `None` if
    /// some node has no defined transition. The traversal keeps its own stack, so the depth of the
    /// tree is not limited by the call stack.
    pub fn evaluate(&self, tree: &Tree) -> Option<&State> {
        // post-order: a node is expanded once, and evaluated when it is popped a second time
        let mut pending = vec![(tree, false)];
        let mut reached: Vec<&State> = vec![];

        while let Some((current, expanded)) = pending.pop() {
            let arity = current.children().len();
            if !expanded && arity > 0 {
                pending.push((current, true));
                pending.extend(current.children().iter().rev().map(|child| (child, false)));
                continue;
            }

            let children = reached
                .split_off(reached.len() - arity)
                .into_iter()
                .cloned()
                .collect_vec();
            let key = TransitionKey::from_parts(current.root(), children);
            match self.transitions.get(&key) {
                Some(state) => reached.push(state),
                None => {
                    trace!("no transition for {}", key.show());
                    return None;
                }
            }
        }

        debug_assert_eq!(reached.len(), 1);
        reached.pop()
    }

    /// Returns true if evaluating `tree` reaches a final state.
    pub fn is_accepted(&self, tree: &Tree) -> bool {
        self.evaluate(tree)
            .map(|state| self.is_final(state))
            .unwrap_or(false)
    }
}

impl std::fmt::Display for TreeAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TreeAutomaton over {}", self.alphabet.show())?;
        writeln!(f, "  states: {}", State::show_collection(&self.states))?;
        writeln!(f, "  final: {}", State::show_collection(&self.final_states))?;
        writeln!(f, "  transitions:")?;
        for (key, target) in self.transitions() {
            writeln!(f, "    {} -> {}", key.show(), target.show())?;
        }
        Ok(())
    }
}

impl Debug for TreeAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{even_g_automaton, simple_automaton};
    use crate::tree::tests::{chain, leaf, node};

    #[test]
    fn simple_acceptance() {
        let automaton = simple_automaton();
        assert!(automaton.is_accepted(&node("a", [leaf("b"), leaf("c")])));
        assert!(!automaton.is_accepted(&node("a", [leaf("c"), leaf("c")])));
        assert!(!automaton.is_accepted(&leaf("b")));
        assert_eq!(automaton.evaluate(&leaf("b")), Some(&State::from("q1")));
        assert_eq!(automaton.size(), 3);
        assert_eq!(automaton.transition_count(), 3);
    }

    #[test]
    fn missing_transitions_reject() {
        let automaton = simple_automaton();
        let nested = node("a", [node("a", [leaf("b"), leaf("c")]), leaf("c")]);
        assert_eq!(automaton.evaluate(&nested), None);
        assert!(!automaton.is_accepted(&nested));
        assert!(!automaton.is_accepted(&leaf("d")));
    }

    #[test]
    fn deep_trees_are_evaluated() {
        let automaton = even_g_automaton();
        assert!(automaton.is_accepted(&chain(200_000)));
        assert!(!automaton.is_accepted(&chain(200_001)));
        let wide = Tree::new(
            Symbol::new("f", 2),
            [chain(100_000), chain(100_001)],
        )
        .unwrap();
        assert_eq!(automaton.evaluate(&wide), Some(&State::from("odd")));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let automaton = even_g_automaton();
        let alphabet = automaton.alphabet().clone();
        for tree in Tree::all_up_to_depth(&alphabet, 3) {
            assert_eq!(automaton.evaluate(&tree), automaton.evaluate(&tree));
            let gs = count_g(&tree);
            assert_eq!(automaton.is_accepted(&tree), gs % 2 == 0, "{}", tree.show());
        }
    }

    fn count_g(tree: &Tree) -> usize {
        (tree.name() == "g") as usize + tree.children().iter().map(count_g).sum::<usize>()
    }

    #[test]
    fn transitions_must_be_deterministic() {
        let b = Symbol::new("b", 0);
        let mut automaton = TreeAutomaton::new(RankedAlphabet::new([b.clone()]));
        let key = TransitionKey::new(b.clone(), []).unwrap();
        assert!(automaton.add_transition(key.clone(), "q0".into()).is_ok());
        assert!(automaton.add_transition(key.clone(), "q0".into()).is_ok());
        assert_eq!(
            automaton.add_transition(key.clone(), "q1".into()),
            Err(AutomatonError::DuplicateTransition {
                key,
                existing: "q0".into(),
                target: "q1".into(),
            })
        );
        assert!(matches!(
            TransitionKey::new(b, ["q0".into()]),
            Err(AutomatonError::ArityMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn display_lists_transitions() {
        let shown = simple_automaton().to_string();
        assert!(shown.contains("a(q1, q2) -> q0"));
        assert!(shown.contains("final: {q0}"));
    }
}
