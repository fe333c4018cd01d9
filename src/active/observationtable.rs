use std::fmt::Debug;

use owo_colors::OwoColorize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    automaton::AutomatonError,
    math::{self, OrderedSet},
    prelude::*,
};

/// Errors raised by operations on an [`ObservationTable`]. All of them indicate that the table, the
/// membership oracle or the caller violated an assumption of the learning algorithm, they are fatal
/// for the learning run in which they occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// No observations have been recorded for the tree.
    #[error("no observations recorded for {}", .0.show())]
    UnknownTree(Tree),
    /// The counterexample contains no subtree outside of `S` whose children all lie in `S`.
    #[error("counterexample {} cannot be decomposed", .0.show())]
    NotDecomposable(Tree),
    /// An observation was recorded at a position beyond the end of the row.
    #[error("cannot record observation at index {index}, the row has length {len}")]
    RowIndexOutOfBounds {
        /// The requested position.
        index: usize,
        /// The current length of the row.
        len: usize,
    },
    /// The row of the tree is not the row of any tree in `S`.
    #[error("no tree in S has the same row as {}", .0.show())]
    MissingRepresentative(Tree),
    /// Synthesizing a transition would have made the automaton nondeterministic.
    #[error("table is inconsistent: {0}")]
    Inconsistent(#[from] AutomatonError),
    /// A tree could not be turned into a context.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The observation table of TL*. Its rows are trees, its columns are [`Context`]s and every cell
/// holds the answer of the membership oracle for the tree plugged into the context.
///
/// - `S` contains the trees that represent states of the hypothesis, no two of them have the same row.
/// - `R` contains all trees for which rows are known, it is a superset of `S`. Every tree in `R` has
///   all of its children in `S`, so it corresponds to a transition.
/// - `C` is the list of contexts, the first one is always the identity context.
///
/// The sets `S`, `R` and `C` only ever grow, and rows only grow at the end when a context is added.
/// Both sets keep the order in which trees were inserted, which makes learning deterministic for
/// deterministic oracles.
#[derive(Clone)]
pub struct ObservationTable {
    alphabet: RankedAlphabet,
    s: OrderedSet<Tree>,
    r: OrderedSet<Tree>,
    contexts: Vec<Context>,
    observations: math::Map<Tree, Vec<bool>>,
}

impl ObservationTable {
    /// Creates an empty table for trees over `alphabet`, whose only context is the identity.
    pub fn new(alphabet: RankedAlphabet) -> Self {
        Self {
            alphabet,
            s: OrderedSet::default(),
            r: OrderedSet::default(),
            contexts: vec![Context::identity()],
            observations: math::Map::default(),
        }
    }

    /// The alphabet of the table.
    pub fn alphabet(&self) -> &RankedAlphabet {
        &self.alphabet
    }

    /// The trees in `S`, in the order in which they were promoted.
    pub fn s(&self) -> impl Iterator<Item = &Tree> + '_ {
        self.s.iter()
    }

    /// The trees in `R`, in the order in which they were added.
    pub fn r(&self) -> impl Iterator<Item = &Tree> + '_ {
        self.r.iter()
    }

    /// The contexts in `C`.
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Returns true if `tree` is in `S`.
    pub fn in_s(&self, tree: &Tree) -> bool {
        self.s.contains(tree)
    }

    /// Returns true if `tree` is in `R`.
    pub fn in_r(&self, tree: &Tree) -> bool {
        self.r.contains(tree)
    }

    /// Returns the complete row of `tree`.
    pub fn observation_row(&self, tree: &Tree) -> Result<&[bool], TableError> {
        self.observations
            .get(tree)
            .map(Vec::as_slice)
            .ok_or_else(|| TableError::UnknownTree(tree.clone()))
    }

    /// Looks up the observation for `tree` in `context`, if both are known.
    pub fn obs(&self, tree: &Tree, context: &Context) -> Option<bool> {
        let index = self.contexts.iter().position(|c| c == context)?;
        self.observations.get(tree)?.get(index).copied()
    }

    /// Records `value` at position `index` in the row of `tree`. Existing entries may be overwritten
    /// and the row may be extended by one, any position after the end of the row is rejected.
    pub fn record_observation(
        &mut self,
        tree: &Tree,
        index: usize,
        value: bool,
    ) -> Result<(), TableError> {
        let row = self.observations.entry(tree.clone()).or_default();
        match index.cmp(&row.len()) {
            std::cmp::Ordering::Less => row[index] = value,
            std::cmp::Ordering::Equal => row.push(value),
            std::cmp::Ordering::Greater => {
                return Err(TableError::RowIndexOutOfBounds {
                    index,
                    len: row.len(),
                })
            }
        }
        Ok(())
    }

    /// Inserts `tree` into `R` and runs the experiments for all contexts. Nothing happens if the tree
    /// is already present.
    pub fn add_candidate<O: MembershipOracle + ?Sized>(
        &mut self,
        tree: Tree,
        oracle: &O,
    ) -> Result<(), TableError> {
        if self.r.contains(&tree) {
            return Ok(());
        }
        trace!("adding candidate {}", tree.show());
        let values: Vec<bool> = self
            .contexts
            .iter()
            .map(|context| oracle.is_accepted(&context.substitute(&tree)))
            .collect();
        for (index, value) in values.into_iter().enumerate() {
            self.record_observation(&tree, index, value)?;
        }
        self.r.insert(tree);
        Ok(())
    }

    /// Appends `context` to `C` and extends the row of every tree in `R` by the new experiment.
    /// Nothing happens if the context is already present.
    pub fn add_context<O: MembershipOracle + ?Sized>(
        &mut self,
        context: Context,
        oracle: &O,
    ) -> Result<(), TableError> {
        if self.contexts.contains(&context) {
            trace!("context {} is already present", context.show());
            return Ok(());
        }
        trace!("adding context {}", context.show());
        let index = self.contexts.len();
        let values: Vec<(Tree, bool)> = self
            .r
            .iter()
            .map(|tree| (tree.clone(), oracle.is_accepted(&context.substitute(tree))))
            .collect();
        self.contexts.push(context);
        for (tree, value) in values {
            self.record_observation(&tree, index, value)?;
        }
        Ok(())
    }

    /// Promotes every tree of `R` whose row differs from the rows of all trees in `S`. Trees are
    /// considered in insertion order, so of several trees with a new row only the first one is
    /// promoted.
    pub fn complete(&mut self) -> Result<(), TableError> {
        for i in 0..self.r.len() {
            let Some(tree) = self.r.get_index(i) else {
                break;
            };
            if self.s.contains(tree) || self.representative(tree)?.is_some() {
                continue;
            }
            let tree = tree.clone();
            trace!("promoting {} to S", tree.show());
            self.s.insert(tree);
        }
        debug_assert!(self.is_complete());
        Ok(())
    }

    /// Returns true if the row of every tree in `R` equals the row of some tree in `S`.
    pub fn is_complete(&self) -> bool {
        self.r
            .iter()
            .all(|tree| matches!(self.representative(tree), Ok(Some(_))))
    }

    /// Finds the tree in `S` whose row equals the one of `tree`.
    pub fn representative(&self, tree: &Tree) -> Result<Option<&Tree>, TableError> {
        let row = self.observation_row(tree)?;
        Ok(self
            .s
            .iter()
            .find(|s| self.observations.get(*s).map(Vec::as_slice) == Some(row)))
    }

    /// Builds the hypothesis described by the table, which should be complete. Every tree in `S`
    /// gives a state that is named after the tree and is final iff the tree itself is accepted. Every
    /// tree in `R` gives a transition from the states of its children to the state of its row.
    pub fn synthesize(&self) -> Result<TreeAutomaton, TableError> {
        let start = std::time::Instant::now();
        let mut automaton = TreeAutomaton::new(self.alphabet.clone());
        let mut states: math::Map<&[bool], State> = math::Map::default();

        for tree in &self.s {
            let row = self.observation_row(tree)?;
            let state = State::new(tree.show());
            if row.first().copied().unwrap_or(false) {
                automaton.add_final_state(state.clone());
            } else {
                automaton.add_state(state.clone());
            }
            states.insert(row, state);
        }

        let state_of = |tree: &Tree| -> Result<State, TableError> {
            states
                .get(self.observation_row(tree)?)
                .cloned()
                .ok_or_else(|| TableError::MissingRepresentative(tree.clone()))
        };
        for tree in &self.r {
            let target = state_of(tree)?;
            let children = tree
                .children()
                .iter()
                .map(state_of)
                .collect::<Result<Vec<_>, _>>()?;
            automaton.add_transition(TransitionKey::new(tree.root(), children)?, target)?;
        }

        debug!(
            "synthesized hypothesis with {} states and {} transitions in {}",
            automaton.size(),
            automaton.transition_count(),
            crate::show_duration(start.elapsed())
        );
        Ok(automaton)
    }

    /// Refines the table with a tree on which the current hypothesis and the oracle disagree.
    ///
    /// The counterexample is split into a context `c` and a subtree `s` that is not in `S` but whose
    /// children are. If `s` is new, it is added to `R`. Otherwise `s` has the same row as some `s'` in
    /// `S`. If plugging `s'` into `c` does not change the verdict of the oracle, the disagreement is
    /// caused elsewhere and the procedure continues with `c[s']`. If it does, `c` distinguishes `s`
    /// from `s'`, so `s` is promoted and `c` is added as a new context. In either case the table is
    /// completed afterwards, so every call adds a row or a column.
    pub fn extend<O: MembershipOracle + ?Sized>(
        &mut self,
        counterexample: &Tree,
        oracle: &O,
    ) -> Result<(), TableError> {
        debug!("processing counterexample {}", counterexample.show());
        let verdict = oracle.is_accepted(counterexample);
        let mut current = counterexample.clone();

        loop {
            let (context, subtree) = self
                .decompose(&current, &Context::identity())?
                .ok_or_else(|| TableError::NotDecomposable(current.clone()))?;

            if !self.r.contains(&subtree) {
                self.add_candidate(subtree, oracle)?;
                return self.complete();
            }

            let representative = self
                .representative(&subtree)?
                .cloned()
                .ok_or_else(|| TableError::MissingRepresentative(subtree.clone()))?;
            let reformulated = context.substitute(&representative);
            if oracle.is_accepted(&reformulated) == verdict {
                trace!(
                    "replacing {} by {}, continuing with {}",
                    subtree.show(),
                    representative.show(),
                    reformulated.show()
                );
                current = reformulated;
                continue;
            }

            trace!(
                "context {} separates {} from {}",
                context.show(),
                subtree.show(),
                representative.show()
            );
            self.s.insert(subtree);
            self.add_context(context, oracle)?;
            return self.complete();
        }
    }

    /// Searches `tree` top-down and left to right for a subtree outside of `S` whose children all lie
    /// in `S`. Returns the context around it (relative to `context`) together with the subtree.
    fn decompose(
        &self,
        tree: &Tree,
        context: &Context,
    ) -> Result<Option<(Context, Tree)>, TableError> {
        let in_s = self.s.contains(tree);
        if in_s && tree.is_leaf() {
            return Ok(None);
        }
        if !in_s && tree.children().iter().all(|child| self.s.contains(child)) {
            return Ok(Some((context.clone(), tree.clone())));
        }

        for (i, child) in tree.children().iter().enumerate() {
            let mut children = tree.children().to_vec();
            children[i] = Tree::hole();
            let part = Context::new(Tree::from_parts(tree.root(), children))?;
            if let Some(found) = self.decompose(child, &context.compose(&part))? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl Debug for ObservationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builder = tabled::builder::Builder::default();
        let mut header = vec!["OT".to_string()];
        header.extend(self.contexts.iter().map(Show::show));
        builder.push_record(header);

        let rows = self
            .s
            .iter()
            .map(|tree| (tree, true))
            .chain(self.r.iter().filter(|t| !self.s.contains(*t)).map(|t| (t, false)));
        for (tree, in_s) in rows {
            let name = match in_s {
                true => tree.show().blue().to_string(),
                false => tree.show(),
            };
            let mut row = vec![name];
            match self.observations.get(tree) {
                Some(values) => row.extend(values.iter().map(Show::show)),
                None => row.push("?".to_string()),
            }
            builder.push_record(row);
        }

        write!(f, "{}", builder.build())
    }
}
