//! Library for actively learning tree automata and visibly-pushdown languages in Rust.
//!
//! The central algorithm is TL*, a generalization of Angluin's L* from words to ranked trees. A learner
//! maintains an observation table whose rows are trees and whose columns are [`tree::Context`]s, i.e. trees
//! with a single hole. Every cell records whether a membership oracle accepts the tree obtained by plugging
//! the row into the column. Once the table is complete, it can be turned into a deterministic bottom-up
//! [`automaton::TreeAutomaton`], which is then checked against the oracle by an equivalence oracle. If the
//! two disagree on some tree, that counterexample is decomposed and used to refine the table.
//!
//! Visibly-pushdown languages enter the picture through a fixed tree encoding of well-matched words: every
//! word over push, pop and internal symbols corresponds to exactly one tree generated by the grammar
//! `S -> ε | cS | aSbS`. The [`encoding`] module implements this correspondence together with the so-called
//! B-parse automaton, which recognizes exactly the well-formed encodings. The [`vpl`] module wraps word-level
//! oracles so that they can be learned with TL*, and converts learned tree automata back into
//! visibly-pushdown grammars.
//!
//! The most important entry points are
//! - [`active::TLStar`], the learning loop, together with the [`active::MembershipOracle`] and
//!   [`active::EquivalenceOracle`] traits that it is generic over.
//! - [`active::ObservationTable`], the mutable state of a learning run.
//! - [`vpl::VplStar`] which learns a language given by something implementing [`vpl::Vpl`].
//! - [`vpl::Vpg::from_automaton`] for grammar synthesis.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use tree_learning::prelude::*;` should be enough to use the package.
pub mod prelude {
    #[cfg(feature = "random")]
    pub use super::active::SamplingEquivalence;
    #[cfg(feature = "random")]
    pub use super::random::TreeGenerator;
    pub use super::{
        active::{
            EquivalenceOracle, ExhaustiveEquivalence, FnOracle, LearningError, MembershipOracle,
            ObservationTable, TLStar, TableError,
        },
        alphabet::{AlphabetError, RankedAlphabet, StackAlphabet, Symbol, VPAlphabet},
        automaton::{AutomatonError, State, TABuilder, TransitionKey, TreeAutomaton},
        encoding::{b_parse_automaton, sequence_to_tree, tree_to_sequence, EncodingError},
        math,
        tree::{Context, Tree, TreeError, TreeKind},
        vpl::{
            GrammarSymbol, PredicateVpl, Rule, RuleKind, TreeAutomatonVpl, Vpa, VpaBuilder, VpaError,
            Vpg, Vpl, VplOracle, VplStar,
        },
        Show,
    };
}

/// This module contains type aliases for the collections which are used throughout the crate.
pub mod math;

/// Module that contains definitions for dealing with ranked and visibly-pushdown alphabets.
pub mod alphabet;

/// Defines ranked trees and contexts, i.e. trees with exactly one hole.
pub mod tree;

/// Deterministic bottom-up tree automata.
pub mod automaton;

/// The correspondence between words over a visibly-pushdown alphabet and their tree encoding.
pub mod encoding;

/// Implements the generation of random trees and words.
#[cfg(feature = "random")]
pub mod random;

/// Deals with active learning of tree automata through TL*.
pub mod active;

/// Visibly-pushdown languages, their oracles and grammars.
pub mod vpl;

use itertools::Itertools;

/// Helper trait which can be used to display trees, states, transitions and such.
pub trait Show {
    /// Returns a human readable representation of `self`, for a state that should be
    /// for example its name and for a tree something like `a(b, c)`.
    /// Just use something that makes sense. This is mainly used for debugging purposes.
    fn show(&self) -> String;
    /// Show a collection of the thing, for a collection of states this should be {q0, q1, q2, ...}
    /// and for a collection of trees it should be {a(b, c), b, ...}.
    fn show_collection<'a, I>(iter: I) -> String
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
    {
        format!("{{{}}}", iter.into_iter().map(|x| x.show()).join(", "))
    }
}

impl Show for bool {
    fn show(&self) -> String {
        match self {
            true => "+",
            false => "-",
        }
        .to_string()
    }
}

impl Show for char {
    fn show(&self) -> String {
        self.to_string()
    }

    fn show_collection<'a, I: IntoIterator<Item = &'a Self>>(iter: I) -> String
    where
        Self: 'a,
    {
        format!("\"{}\"", iter.into_iter().collect::<String>())
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl<S: Show> Show for [S] {
    fn show(&self) -> String {
        S::show_collection(self.iter())
    }
}

impl<S: Show> Show for Vec<S> {
    fn show(&self) -> String {
        S::show_collection(self.iter())
    }
}

impl<S: Show> Show for Option<S> {
    fn show(&self) -> String {
        match self {
            None => "⊥".to_string(),
            Some(x) => x.show(),
        }
    }
}

impl<S: Show> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}

/// This method should display the time in a sensible format. If it is less than a second, it should
/// only display the milliseconds and microseconds. If it is less than a minute, it should display
/// the seconds and milliseconds. If it is less than an hour, it should display the minutes and
/// seconds. Anything longer is displayed in hours and minutes.
pub fn show_duration(duration: std::time::Duration) -> String {
    let ms = duration.as_millis();
    let us = duration.as_micros();
    let s = duration.as_secs();
    let m = s / 60;
    let h = m / 60;

    if h > 0 {
        format!("{}h {}m", h, m % 60)
    } else if m > 0 {
        format!("{}m {}s", m, s % 60)
    } else if s > 0 {
        format!("{}s {}ms", s, ms % 1000)
    } else if ms > 0 {
        format!("{}ms {}us", ms, us % 1000)
    } else {
        format!("{}us", us)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    /// The automaton over `{a/2, b/0, c/0}` which accepts precisely the tree `a(b, c)`.
    pub fn simple_automaton() -> TreeAutomaton {
        let a = Symbol::new("a", 2);
        let b = Symbol::new("b", 0);
        let c = Symbol::new("c", 0);
        TABuilder::new(RankedAlphabet::new([a.clone(), b.clone(), c.clone()]))
            .with_transitions([
                (b, vec![], "q1"),
                (c, vec![], "q2"),
                (a, vec!["q1", "q2"], "q0"),
            ])
            .with_final_states(["q0"])
            .into_automaton()
            .unwrap()
    }

    /// A parity automaton over `{f/2, g/1, b/0}` that accepts trees with an even number of `g` nodes.
    pub fn even_g_automaton() -> TreeAutomaton {
        let f = Symbol::new("f", 2);
        let g = Symbol::new("g", 1);
        let b = Symbol::new("b", 0);
        TABuilder::new(RankedAlphabet::new([f.clone(), g.clone(), b.clone()]))
            .with_transitions([
                (b, vec![], "even"),
                (g.clone(), vec!["even"], "odd"),
                (g, vec!["odd"], "even"),
                (f.clone(), vec!["even", "even"], "even"),
                (f.clone(), vec!["even", "odd"], "odd"),
                (f.clone(), vec!["odd", "even"], "odd"),
                (f, vec!["odd", "odd"], "even"),
            ])
            .with_final_states(["even"])
            .into_automaton()
            .unwrap()
    }

    /// Alphabet of well-nested parentheses with one internal symbol `a`.
    pub fn dyck_alphabet() -> VPAlphabet {
        VPAlphabet::new(['('], [')'], ['a']).unwrap()
    }

    #[test]
    fn show_duration_picks_unit() {
        use std::time::Duration;
        assert_eq!(crate::show_duration(Duration::from_micros(12)), "12us");
        assert_eq!(crate::show_duration(Duration::from_millis(1500)), "1s 500ms");
        assert_eq!(crate::show_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn show_booleans() {
        assert_eq!(true.show(), "+");
        assert_eq!(vec![true, false].show(), "{+, -}");
    }
}
