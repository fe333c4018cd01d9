use tracing::debug;

use crate::{
    alphabet::{Symbol, VPAlphabet},
    automaton::{State, TransitionKey, TreeAutomaton},
};

use super::sequence_to_tree;

/// Name of the accepting state of the B-parse automaton, it is reached by encodings of well-matched words.
pub const BPARSE_S: &str = "S";
/// Name of the state that is reached by a pop symbol applied to a well-matched encoding.
pub const BPARSE_POP: &str = "Pop";

/// Constructs the B-parse automaton for `alphabet`, a deterministic bottom-up tree automaton over
/// the ranked view of the alphabet which accepts exactly the encodings of well-matched words, i.e.
/// the trees generated by `S -> ε | c S | a S b S`. It has two states, [`BPARSE_S`] (final) and
/// [`BPARSE_POP`], and the transitions
/// - `ε -> S`
/// - `b(S) -> Pop` for every pop symbol `b`
/// - `a(S, Pop) -> S` for every push symbol `a`
/// - `c(S) -> S` for every internal symbol `c`
///
/// Every other combination is undefined and thus rejecting.
pub fn b_parse_automaton(alphabet: &VPAlphabet) -> TreeAutomaton {
    let s = State::from(BPARSE_S);
    let pop = State::from(BPARSE_POP);

    let mut automaton = TreeAutomaton::new(alphabet.to_ranked());
    automaton.add_final_state(s.clone());
    automaton.add_state(pop.clone());

    automaton.insert_fresh(TransitionKey::from_parts(Symbol::epsilon(), vec![]), s.clone());
    for sym in alphabet.pop() {
        automaton.insert_fresh(
            TransitionKey::from_parts(Symbol::new(sym.to_string(), 1), vec![s.clone()]),
            pop.clone(),
        );
    }
    for sym in alphabet.push() {
        automaton.insert_fresh(
            TransitionKey::from_parts(Symbol::new(sym.to_string(), 2), vec![s.clone(), pop.clone()]),
            s.clone(),
        );
    }
    for sym in alphabet.internal() {
        automaton.insert_fresh(
            TransitionKey::from_parts(Symbol::new(sym.to_string(), 1), vec![s.clone()]),
            s.clone(),
        );
    }

    debug!(
        "built B-parse automaton with {} transitions",
        automaton.transition_count()
    );
    automaton
}

/// Returns true if `word` is well-matched, which is the case precisely if it can be parsed into a
/// tree that the [`b_parse_automaton`] accepts.
pub fn is_well_formed(word: &str, alphabet: &VPAlphabet) -> bool {
    sequence_to_tree(word, alphabet)
        .map(|tree| b_parse_automaton(alphabet).is_accepted(&tree))
        .unwrap_or(false)
}
