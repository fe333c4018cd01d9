mod language;
pub use language::{PredicateVpl, TreeAutomatonVpl, Vpl};

mod adapter;
pub use adapter::{VplOracle, VplStar};

mod grammar;
pub use grammar::{GrammarSymbol, Rule, RuleKind, Vpg};

mod vpa;
pub use vpa::{Vpa, VpaBuilder, VpaError};
