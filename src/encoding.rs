use itertools::Itertools;
use thiserror::Error;
use tracing::trace;

use crate::{
    alphabet::{Symbol, SymbolKind, VPAlphabet, EPSILON},
    tree::{Tree, TreeKind},
};

mod bparse;
pub use bparse::{b_parse_automaton, is_well_formed, BPARSE_POP, BPARSE_S};

/// Errors that occur when translating between words and their tree encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// A symbol (of a word or a tree) is not part of the visibly-pushdown alphabet.
    #[error("symbol `{0}` is not in the alphabet")]
    SymbolNotInAlphabet(String),
    /// A tree node is labelled with a symbol whose arity does not fit its role, push symbols must
    /// have two children while pop and internal symbols have one.
    #[error("{kind:?} symbol `{symbol}` cannot have arity {arity}")]
    ArityViolation {
        /// The name of the offending symbol.
        symbol: String,
        /// The role of the symbol in the alphabet.
        kind: SymbolKind,
        /// The arity with which the symbol was used.
        arity: usize,
    },
    /// A push symbol was read (from the right) without any pending pop symbol.
    #[error("push symbol `{symbol}` at position {position} has no matching pop symbol")]
    UnbalancedPush {
        /// The push symbol.
        symbol: char,
        /// Its position in the word, counted in characters.
        position: usize,
    },
    /// After consuming the whole word, the parse did not result in exactly one tree.
    #[error("sequence does not form a single tree, {0} trees remain")]
    MalformedSequence(usize),
}

/// Returns the arity that a symbol of the given kind has in the tree encoding.
pub fn encoded_arity(kind: SymbolKind) -> usize {
    match kind {
        SymbolKind::Push => 2,
        SymbolKind::Pop | SymbolKind::Internal => 1,
    }
}

/// Determines the character and kind of a tree symbol, verifying that it is classified by the
/// alphabet and used with the right arity.
pub(crate) fn classify(
    symbol: &Symbol,
    alphabet: &VPAlphabet,
) -> Result<(char, SymbolKind), EncodingError> {
    let Some((sym, kind)) = symbol
        .as_char()
        .and_then(|sym| alphabet.kind(sym).map(|kind| (sym, kind)))
    else {
        return Err(EncodingError::SymbolNotInAlphabet(symbol.name().to_string()));
    };
    if symbol.arity() != encoded_arity(kind) {
        return Err(EncodingError::ArityViolation {
            symbol: symbol.name().to_string(),
            kind,
            arity: symbol.arity(),
        });
    }
    Ok((sym, kind))
}

/// Converts a tree back into the word it encodes. The tree is traversed in pre-order, so a push
/// node `a(t1, b(t2))` produces `a`, then the word of `t1`, then `b` followed by the word of `t2`.
/// Empty leaves contribute nothing.
///
/// Fails with [`EncodingError::SymbolNotInAlphabet`] or [`EncodingError::ArityViolation`] if some
/// node does not fit the alphabet. The tree is not required to be accepted by the
/// [`b_parse_automaton`], but only for such trees the result can be parsed back to the same tree.
pub fn tree_to_sequence(tree: &Tree, alphabet: &VPAlphabet) -> Result<String, EncodingError> {
    let mut pending = vec![tree];
    let mut word = String::new();

    while let Some(current) = pending.pop() {
        match current.kind() {
            TreeKind::Epsilon => {}
            TreeKind::Hole => {
                return Err(EncodingError::SymbolNotInAlphabet(current.name().to_string()))
            }
            TreeKind::Leaf(symbol) | TreeKind::Node(symbol, _) => {
                let (sym, _) = classify(symbol, alphabet)?;
                word.push(sym);
                pending.extend(current.children().iter().rev());
            }
        }
    }

    Ok(word)
}

fn is_pop_rooted(tree: &Tree, alphabet: &VPAlphabet) -> bool {
    matches!(tree.kind(), TreeKind::Node(symbol, _) if symbol
        .as_char()
        .and_then(|sym| alphabet.kind(sym))
        == Some(SymbolKind::Pop))
}

/// Parses a word into its tree encoding in a single pass from right to left, using a stack of
/// pending subtrees. Below the top of the stack, all pending subtrees are rooted in a pop symbol.
///
/// - An internal or pop symbol wraps the top of the stack, unless that top is itself rooted in a pop
///   symbol, in which case it gets an empty leaf as child.
/// - A push symbol takes the topmost subtree as its first child (the content between the push and
///   its pop) and the pop-rooted subtree below it as second child. If the top already is rooted in a
///   pop symbol, the first child is an empty leaf.
///
/// The empty word is mapped to the empty leaf. Fails with [`EncodingError::UnbalancedPush`] if a push
/// symbol has no pending pop symbol and with [`EncodingError::MalformedSequence`] if more than one
/// tree remains at the end.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let alphabet = VPAlphabet::new(['('], [')'], ['a']).unwrap();
/// let tree = sequence_to_tree("(a)", &alphabet).unwrap();
/// assert_eq!(tree.show(), "((a(ε), )(ε))");
/// assert_eq!(tree_to_sequence(&tree, &alphabet).unwrap(), "(a)");
/// assert!(sequence_to_tree("a(", &alphabet).is_err());
/// ```
pub fn sequence_to_tree(word: &str, alphabet: &VPAlphabet) -> Result<Tree, EncodingError> {
    if word.is_empty() || word == EPSILON {
        return Ok(Tree::epsilon());
    }

    let symbols = word.chars().collect_vec();
    let mut stack: Vec<Tree> = Vec::with_capacity(symbols.len());

    for (position, &sym) in symbols.iter().enumerate().rev() {
        let kind = alphabet
            .kind(sym)
            .ok_or_else(|| EncodingError::SymbolNotInAlphabet(sym.to_string()))?;
        let symbol = Symbol::new(sym.to_string(), encoded_arity(kind));

        let children = match kind {
            SymbolKind::Push => {
                let top = stack
                    .pop()
                    .ok_or(EncodingError::UnbalancedPush { symbol: sym, position })?;
                if is_pop_rooted(&top, alphabet) {
                    vec![Tree::epsilon(), top]
                } else {
                    let pop = stack
                        .pop()
                        .ok_or(EncodingError::UnbalancedPush { symbol: sym, position })?;
                    debug_assert!(is_pop_rooted(&pop, alphabet));
                    vec![top, pop]
                }
            }
            SymbolKind::Pop | SymbolKind::Internal => match stack.pop() {
                Some(top) if !is_pop_rooted(&top, alphabet) => vec![top],
                Some(top) => {
                    stack.push(top);
                    vec![Tree::epsilon()]
                }
                None => vec![Tree::epsilon()],
            },
        };
        stack.push(Tree::from_parts(symbol, children));
    }

    trace!("parsed {word} into {} subtrees", stack.len());
    match stack.len() {
        1 => Ok(stack.pop().unwrap_or_else(Tree::epsilon)),
        n => Err(EncodingError::MalformedSequence(n)),
    }
}
