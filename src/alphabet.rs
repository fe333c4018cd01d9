use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use itertools::Itertools;
use thiserror::Error;

use crate::{math, Show};

/// Name under which the empty leaf is displayed.
pub const EPSILON: &str = "ε";
/// Name under which the hole of a context is displayed.
pub const HOLE: &str = "•";
/// The symbol that is read from an empty stack.
pub const BOTTOM: char = '⊥';

/// Errors that can occur when building an alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlphabetError {
    /// The given symbol was classified more than once, e.g. as push and as pop symbol.
    #[error("symbol `{0}` is classified as more than one of push, pop and internal")]
    Overlapping(char),
    /// Symbol names that are reserved for the empty leaf, the hole or the stack bottom cannot be used.
    #[error("symbol `{0}` is reserved")]
    Reserved(String),
}

/// A symbol of a ranked alphabet, it consists of a name and an arity. The arity determines the
/// number of children that a node labelled with this symbol has. Two symbols are the same if and
/// only if both name and arity coincide.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    name: Arc<str>,
    arity: usize,
}

impl Symbol {
    /// Creates a new symbol with the given name and arity.
    pub fn new<N: Into<Arc<str>>>(name: N, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// The symbol labelling an empty leaf.
    pub fn epsilon() -> Self {
        Self::new(EPSILON, 0)
    }

    /// The symbol that marks the hole of a context.
    pub fn hole() -> Self {
        Self::new(HOLE, 0)
    }

    /// Returns the name of the symbol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arity of the symbol.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns true if `self` is the reserved epsilon symbol.
    pub fn is_epsilon(&self) -> bool {
        self.arity == 0 && &*self.name == EPSILON
    }

    /// Returns true if `self` is the reserved hole symbol.
    pub fn is_hole(&self) -> bool {
        self.arity == 0 && &*self.name == HOLE
    }

    /// If the name of `self` consists of a single character, that character is returned.
    pub fn as_char(&self) -> Option<char> {
        self.name.chars().exactly_one().ok()
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

impl Show for Symbol {
    fn show(&self) -> String {
        self.name.to_string()
    }
}

/// A ranked alphabet is a finite set of [`Symbol`]s, each of which carries its own arity.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RankedAlphabet {
    symbols: BTreeSet<Symbol>,
}

impl RankedAlphabet {
    /// Creates a new ranked alphabet from the given symbols.
    pub fn new<I: IntoIterator<Item = Symbol>>(symbols: I) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Builds the ranked alphabet underlying the tree encoding of words over a [`VPAlphabet`].
    /// Push symbols have arity two, pop and internal symbols have arity one and additionally the
    /// epsilon symbol is present to mark empty leaves.
    pub fn from_vp_alphabet(alphabet: &VPAlphabet) -> Self {
        let push = alphabet.push().map(|sym| Symbol::new(sym.to_string(), 2));
        let rest = alphabet
            .pop()
            .chain(alphabet.internal())
            .map(|sym| Symbol::new(sym.to_string(), 1));
        Self::new(push.chain(rest).chain(std::iter::once(Symbol::epsilon())))
    }

    /// Returns an iterator over all symbols of the given arity.
    pub fn symbols_by_arity(&self, arity: usize) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols.iter().filter(move |sym| sym.arity == arity)
    }

    /// Returns an iterator over all symbols in the alphabet.
    pub fn universe(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols.iter()
    }

    /// Returns true if the given symbol is present in the alphabet.
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Returns the number of symbols in the alphabet.
    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if the alphabet has no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The largest arity of any symbol, or `None` if the alphabet is empty.
    pub fn max_arity(&self) -> Option<usize> {
        self.symbols.iter().map(Symbol::arity).max()
    }
}

impl FromIterator<Symbol> for RankedAlphabet {
    fn from_iter<T: IntoIterator<Item = Symbol>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl Show for RankedAlphabet {
    fn show(&self) -> String {
        format!("{{{}}}", self.symbols.iter().map(|s| format!("{s:?}")).join(", "))
    }
}

/// Role that a symbol plays in a visibly-pushdown alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Symbol that pushes onto the stack, e.g. an opening bracket.
    Push,
    /// Symbol that pops from the stack, e.g. a closing bracket.
    Pop,
    /// Symbol that leaves the stack untouched.
    Internal,
}

/// A visibly-pushdown alphabet partitions its symbols into push, pop and internal symbols. The three
/// classes are pairwise disjoint, which is verified upon construction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VPAlphabet {
    push: BTreeSet<char>,
    pop: BTreeSet<char>,
    internal: BTreeSet<char>,
    kinds: math::Map<char, SymbolKind>,
}

impl VPAlphabet {
    /// Creates a new alphabet from the given push, pop and internal symbols. Fails if some
    /// symbol occurs in more than one class, or if one of the reserved symbols is used.
    pub fn new<P, Q, I>(push: P, pop: Q, internal: I) -> Result<Self, AlphabetError>
    where
        P: IntoIterator<Item = char>,
        Q: IntoIterator<Item = char>,
        I: IntoIterator<Item = char>,
    {
        let push: BTreeSet<_> = push.into_iter().collect();
        let pop: BTreeSet<_> = pop.into_iter().collect();
        let internal: BTreeSet<_> = internal.into_iter().collect();

        let mut kinds = math::Map::default();
        let classified = push
            .iter()
            .map(|c| (*c, SymbolKind::Push))
            .chain(pop.iter().map(|c| (*c, SymbolKind::Pop)))
            .chain(internal.iter().map(|c| (*c, SymbolKind::Internal)));
        for (sym, kind) in classified {
            if EPSILON.starts_with(sym) || HOLE.starts_with(sym) || sym == BOTTOM {
                return Err(AlphabetError::Reserved(sym.to_string()));
            }
            if kinds.insert(sym, kind).is_some() {
                return Err(AlphabetError::Overlapping(sym));
            }
        }

        Ok(Self {
            push,
            pop,
            internal,
            kinds,
        })
    }

    /// Iterates over the push symbols.
    pub fn push(&self) -> impl Iterator<Item = char> + '_ {
        self.push.iter().copied()
    }

    /// Iterates over the pop symbols.
    pub fn pop(&self) -> impl Iterator<Item = char> + '_ {
        self.pop.iter().copied()
    }

    /// Iterates over the internal symbols.
    pub fn internal(&self) -> impl Iterator<Item = char> + '_ {
        self.internal.iter().copied()
    }

    /// Iterates over all symbols, that is the union of push, pop and internal symbols.
    pub fn universe(&self) -> impl Iterator<Item = char> + '_ {
        self.push().chain(self.pop()).chain(self.internal())
    }

    /// Returns the kind of the given symbol, or `None` if it is not part of the alphabet.
    pub fn kind(&self, symbol: char) -> Option<SymbolKind> {
        self.kinds.get(&symbol).copied()
    }

    /// Returns true if `symbol` is part of the alphabet.
    pub fn contains(&self, symbol: char) -> bool {
        self.kinds.contains_key(&symbol)
    }

    /// Returns the number of symbols in the alphabet.
    pub fn size(&self) -> usize {
        self.kinds.len()
    }

    /// Turns `self` into the ranked alphabet of its tree encoding, see [`RankedAlphabet::from_vp_alphabet`].
    pub fn to_ranked(&self) -> RankedAlphabet {
        RankedAlphabet::from_vp_alphabet(self)
    }

    /// Returns the default stack alphabet, which consists of the push symbols.
    pub fn stack_alphabet(&self) -> StackAlphabet {
        StackAlphabet::new(self.push())
    }
}

/// The symbols that can be put onto the stack of a visibly-pushdown automaton.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StackAlphabet(BTreeSet<char>);

impl StackAlphabet {
    /// Creates a stack alphabet from the given symbols.
    pub fn new<I: IntoIterator<Item = char>>(symbols: I) -> Self {
        Self(symbols.into_iter().collect())
    }

    /// Returns true if the given symbol may be put onto the stack.
    pub fn contains(&self, symbol: char) -> bool {
        self.0.contains(&symbol)
    }

    /// Iterates over the stack symbols.
    pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_by_arity() {
        let alphabet = RankedAlphabet::new([
            Symbol::new("a", 2),
            Symbol::new("b", 0),
            Symbol::new("c", 0),
        ]);
        let leaves: Vec<_> = alphabet.symbols_by_arity(0).map(Symbol::name).collect();
        assert_eq!(leaves, vec!["b", "c"]);
        assert_eq!(alphabet.symbols_by_arity(1).count(), 0);
        assert_eq!(alphabet.max_arity(), Some(2));
    }

    #[test]
    fn symbol_identity_uses_name_and_arity() {
        assert_eq!(Symbol::new("a", 1), Symbol::new("a", 1));
        assert_ne!(Symbol::new("a", 1), Symbol::new("a", 2));
        assert!(Symbol::epsilon().is_epsilon());
        assert!(!Symbol::new(EPSILON, 1).is_epsilon());
        assert!(Symbol::hole().is_hole());
    }

    #[test]
    fn vp_alphabet_must_be_disjoint() {
        assert_eq!(
            VPAlphabet::new(['('], ['(', ')'], []),
            Err(AlphabetError::Overlapping('('))
        );
        assert_eq!(
            VPAlphabet::new(['('], [')'], ['ε']),
            Err(AlphabetError::Reserved("ε".to_string()))
        );
        let alphabet = VPAlphabet::new(['(', '['], [')', ']'], ['a']).unwrap();
        assert_eq!(alphabet.size(), 5);
        assert_eq!(alphabet.kind('['), Some(SymbolKind::Push));
        assert_eq!(alphabet.kind('a'), Some(SymbolKind::Internal));
        assert_eq!(alphabet.kind('x'), None);
    }

    #[test]
    fn ranked_view_of_vp_alphabet() {
        let alphabet = VPAlphabet::new(['('], [')'], ['a']).unwrap();
        let ranked = alphabet.to_ranked();
        assert_eq!(ranked.size(), 4);
        assert!(ranked.contains(&Symbol::new("(", 2)));
        assert!(ranked.contains(&Symbol::new(")", 1)));
        assert!(ranked.contains(&Symbol::new("a", 1)));
        assert!(ranked.contains(&Symbol::epsilon()));
        assert!(alphabet.stack_alphabet().contains('('));
        assert!(!alphabet.stack_alphabet().contains(')'));
    }
}
