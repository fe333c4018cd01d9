use thiserror::Error;
use tracing::{debug, info, trace};

use super::{EquivalenceOracle, MembershipOracle, ObservationTable, TableError};
use crate::{automaton::TreeAutomaton, Show};

/// Errors that end a learning run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LearningError {
    /// The observation table reported a violated invariant.
    #[error(transparent)]
    Table(#[from] TableError),
    /// The configured maximal number of hypotheses was built without convergence.
    #[error("no hypothesis was accepted within {0} iterations")]
    IterationLimit(usize),
}

/// An implementation of TL*, the generalization of L* to bottom-up tree automata.
///
/// The learner repeatedly synthesizes a hypothesis from its [`ObservationTable`] and asks the
/// equivalence oracle for a counterexample. Learning ends as soon as none is found, otherwise the
/// counterexample is used to [`extend`](ObservationTable::extend) the table. Since the equivalence
/// oracles shipped with this crate are approximations, so is the result.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let (a, b) = (Symbol::new("a", 1), Symbol::new("b", 0));
/// let alphabet = RankedAlphabet::new([a, b]);
/// // trees with an odd number of nodes
/// let oracle = FnOracle::new(alphabet, |t: &Tree| t.size() % 2 == 1);
/// let learned = TLStar::with_equivalence(oracle, ExhaustiveEquivalence::new(4))
///     .learn()
///     .unwrap();
/// assert_eq!(learned.size(), 2);
/// ```
pub struct TLStar<O, E> {
    table: ObservationTable,
    oracle: O,
    equivalence: E,
    iteration_limit: Option<usize>,
}

#[cfg(feature = "random")]
impl<O: MembershipOracle> TLStar<O, super::SamplingEquivalence> {
    /// Creates a learner that uses a [`super::SamplingEquivalence`] with its default parameters.
    pub fn new(oracle: O) -> Self {
        Self::with_equivalence(oracle, super::SamplingEquivalence::default())
    }
}

impl<O: MembershipOracle, E: EquivalenceOracle> TLStar<O, E> {
    /// Creates a learner for the target described by `oracle` that uses `equivalence` to test its
    /// hypotheses.
    pub fn with_equivalence(oracle: O, equivalence: E) -> Self {
        Self {
            table: ObservationTable::new(oracle.alphabet().clone()),
            oracle,
            equivalence,
            iteration_limit: None,
        }
    }

    /// Bounds the number of hypotheses that are built. Learning is unbounded by default.
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    /// Gives access to the observation table.
    pub fn table(&self) -> &ObservationTable {
        &self.table
    }

    /// The membership oracle.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Runs the learning loop until the equivalence oracle finds no more counterexamples and returns
    /// the last hypothesis.
    pub fn learn(&mut self) -> Result<TreeAutomaton, LearningError> {
        let start = std::time::Instant::now();
        let mut iteration = 0;

        loop {
            if self.iteration_limit.is_some_and(|limit| iteration >= limit) {
                return Err(LearningError::IterationLimit(iteration));
            }
            iteration += 1;

            let hypothesis = self.table.synthesize()?;
            let Some(counterexample) = self.equivalence.counterexample(&hypothesis, &self.oracle)
            else {
                info!(
                    "TL* converged after {iteration} iterations with {} states in {}",
                    hypothesis.size(),
                    crate::show_duration(start.elapsed())
                );
                return Ok(hypothesis);
            };

            debug!(
                "iteration {iteration}: hypothesis with {} states disagrees on {}",
                hypothesis.size(),
                counterexample.show()
            );
            self.table.extend(&counterexample, &self.oracle)?;
            trace!("table after iteration {iteration}\n{:?}", self.table);
        }
    }
}
