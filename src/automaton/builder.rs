use crate::alphabet::{RankedAlphabet, Symbol};

use super::{AutomatonError, State, TransitionKey, TreeAutomaton};

/// Helper struct for the construction of [`TreeAutomaton`]s. It collects transitions, final states
/// and additional states, the automaton is assembled (and checked for arity mismatches and
/// nondeterminism) only when [`TABuilder::into_automaton`] is called.
#[derive(Debug, Clone)]
pub struct TABuilder {
    alphabet: RankedAlphabet,
    states: Vec<State>,
    finals: Vec<State>,
    transitions: Vec<(Symbol, Vec<State>, State)>,
}

impl TABuilder {
    /// Creates an empty builder for automata over `alphabet`.
    pub fn new(alphabet: RankedAlphabet) -> Self {
        Self {
            alphabet,
            states: vec![],
            finals: vec![],
            transitions: vec![],
        }
    }

    /// Adds states that should be present even if they appear on no transition.
    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<State>,
    {
        self.states.extend(states.into_iter().map(Into::into));
        self
    }

    /// Marks the given states as final.
    pub fn with_final_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<State>,
    {
        self.finals.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds a list of transitions, each given as a triple of symbol, child states and target state.
    pub fn with_transitions<I, S>(mut self, transitions: I) -> Self
    where
        I: IntoIterator<Item = (Symbol, Vec<S>, S)>,
        S: Into<State>,
    {
        self.transitions
            .extend(transitions.into_iter().map(|(symbol, children, target)| {
                (
                    symbol,
                    children.into_iter().map(Into::into).collect(),
                    target.into(),
                )
            }));
        self
    }

    /// Assembles the automaton.
    pub fn into_automaton(self) -> Result<TreeAutomaton, AutomatonError> {
        let mut automaton = TreeAutomaton::new(self.alphabet);
        for state in self.states {
            automaton.add_state(state);
        }
        for state in self.finals {
            automaton.add_final_state(state);
        }
        for (symbol, children, target) in self.transitions {
            automaton.add_transition(TransitionKey::new(symbol, children)?, target)?;
        }
        Ok(automaton)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_reports_conflicts() {
        let b = Symbol::new("b", 0);
        let g = Symbol::new("g", 1);
        let alphabet = RankedAlphabet::new([b.clone(), g.clone()]);

        let conflicting = TABuilder::new(alphabet.clone())
            .with_transitions([(b.clone(), vec![], "p"), (b.clone(), vec![], "q")])
            .into_automaton();
        assert!(matches!(
            conflicting,
            Err(AutomatonError::DuplicateTransition { .. })
        ));

        let wrong_arity = TABuilder::new(alphabet.clone())
            .with_transitions([(g.clone(), vec![], "p")])
            .into_automaton();
        assert!(matches!(
            wrong_arity,
            Err(AutomatonError::ArityMismatch { found: 0, .. })
        ));

        let automaton = TABuilder::new(alphabet)
            .with_states(["sink"])
            .with_transitions([(b, vec![], "p"), (g, vec!["p"], "p")])
            .with_final_states(["p"])
            .into_automaton()
            .unwrap();
        assert_eq!(automaton.size(), 2);
        assert_eq!(automaton.final_states().count(), 1);
    }
}
