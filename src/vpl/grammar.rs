use std::{collections::BTreeSet, fmt::Display};

use itertools::Itertools;
use tracing::debug;

use crate::{
    alphabet::SymbolKind,
    encoding::{classify, EncodingError},
    math::Bijection,
    prelude::*,
};

/// A symbol on the right-hand side of a grammar rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrammarSymbol {
    /// A symbol of the visibly-pushdown alphabet.
    Terminal(char),
    /// A variable of the grammar.
    Variable(String),
}

impl Show for GrammarSymbol {
    fn show(&self) -> String {
        match self {
            GrammarSymbol::Terminal(sym) => sym.to_string(),
            GrammarSymbol::Variable(var) => var.clone(),
        }
    }
}

/// The three shapes that rules of a visibly-pushdown grammar can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    /// `q -> ε`
    Epsilon,
    /// `q' -> c q` for an internal symbol `c`
    Internal,
    /// `q̂ -> a p b q` for a push symbol `a` and a pop symbol `b`
    PushPop,
}

impl Show for RuleKind {
    fn show(&self) -> String {
        match self {
            RuleKind::Epsilon => "epsilon",
            RuleKind::Internal => "internal",
            RuleKind::PushPop => "push-pop",
        }
        .to_string()
    }
}

/// A production of a [`Vpg`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    lhs: String,
    rhs: Vec<GrammarSymbol>,
    kind: RuleKind,
}

impl Rule {
    /// The variable on the left-hand side.
    pub fn lhs(&self) -> &str {
        &self.lhs
    }

    /// The right-hand side, which is empty for epsilon rules.
    pub fn rhs(&self) -> &[GrammarSymbol] {
        &self.rhs
    }

    /// The shape of the rule.
    pub fn kind(&self) -> RuleKind {
        self.kind
    }
}

impl Show for Rule {
    fn show(&self) -> String {
        let rhs = match self.rhs.is_empty() {
            true => crate::alphabet::EPSILON.to_string(),
            false => self.rhs.iter().map(Show::show).join(" "),
        };
        format!("{} -> {}", self.lhs, rhs)
    }
}

/// A visibly-pushdown grammar, obtained from a tree automaton over the encoding of a
/// [`VPAlphabet`]. Every state of the automaton becomes a variable, the final states give the start
/// variables and every transition contributes rules.
///
/// # Example
/// ```
/// use tree_learning::prelude::*;
///
/// let alphabet = VPAlphabet::new(['('], [')'], ['a']).unwrap();
/// let grammar = Vpg::from_automaton(&b_parse_automaton(&alphabet), &alphabet).unwrap();
/// let rules: Vec<_> = grammar.rules().iter().map(Show::show).collect();
/// assert_eq!(rules, ["q1 -> ( q1 ) q1", "q1 -> a q1", "q1 -> ε"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vpg {
    variables: BTreeSet<String>,
    start: BTreeSet<String>,
    rules: Vec<Rule>,
    variable_map: Bijection<State, String>,
}

impl Vpg {
    /// Synthesizes the grammar of `automaton`, which is read as an automaton over the encoding of
    /// `alphabet`. Variables are named `q0`, `q1`, ... following the order of the states. Rules are
    /// extracted from the transitions:
    /// - an epsilon transition to `q` gives `q -> ε`,
    /// - an internal transition `c(q) -> q'` gives `q' -> c q`,
    /// - a pop transition `b(q) -> q'` together with a push transition `a(p, q') -> q̂` gives
    ///   `q̂ -> a p b q`.
    ///
    /// Push transitions only contribute through the pop transitions that reach their second child.
    /// Fails if some transition symbol is not classified by `alphabet` or has the wrong arity. Such
    /// transitions are not skipped: a grammar that silently drops them would describe a smaller
    /// language than the automaton, so synthesis reports [`EncodingError::SymbolNotInAlphabet`] or
    /// [`EncodingError::ArityViolation`] instead.
    pub fn from_automaton(
        automaton: &TreeAutomaton,
        alphabet: &VPAlphabet,
    ) -> Result<Self, EncodingError> {
        let variable_map: Bijection<State, String> = automaton
            .states()
            .enumerate()
            .map(|(i, state)| (state.clone(), format!("q{i}")))
            .collect();
        let var = |state: &State| -> String {
            variable_map
                .get_by_left(state)
                .cloned()
                .unwrap_or_else(|| state.name().to_string())
        };

        let transitions = automaton.transitions().collect_vec();
        let mut pushes = vec![];
        for &(key, target) in &transitions {
            if !key.is_epsilon() && classify(key.symbol(), alphabet)?.1 == SymbolKind::Push {
                pushes.push((key, target));
            }
        }

        let mut rules = vec![];
        for &(key, target) in &transitions {
            if key.is_epsilon() {
                rules.push(Rule {
                    lhs: var(target),
                    rhs: vec![],
                    kind: RuleKind::Epsilon,
                });
                continue;
            }
            let (sym, kind) = classify(key.symbol(), alphabet)?;
            match kind {
                SymbolKind::Internal => rules.push(Rule {
                    lhs: var(target),
                    rhs: vec![
                        GrammarSymbol::Terminal(sym),
                        GrammarSymbol::Variable(var(&key.children()[0])),
                    ],
                    kind: RuleKind::Internal,
                }),
                SymbolKind::Pop => {
                    for &(push, hat) in &pushes {
                        if &push.children()[1] != target {
                            continue;
                        }
                        let (a, _) = classify(push.symbol(), alphabet)?;
                        rules.push(Rule {
                            lhs: var(hat),
                            rhs: vec![
                                GrammarSymbol::Terminal(a),
                                GrammarSymbol::Variable(var(&push.children()[0])),
                                GrammarSymbol::Terminal(sym),
                                GrammarSymbol::Variable(var(&key.children()[0])),
                            ],
                            kind: RuleKind::PushPop,
                        });
                    }
                }
                SymbolKind::Push => {}
            }
        }

        let start = automaton.final_states().map(var).collect();
        let vpg = Self {
            variables: variable_map.right_values().cloned().collect(),
            start,
            rules,
            variable_map,
        };
        debug!(
            "synthesized grammar with {} variables and {} rules",
            vpg.variables.len(),
            vpg.rules.len()
        );
        Ok(vpg)
    }

    /// All variables.
    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.iter().map(String::as_str)
    }

    /// The start variables, which correspond to final states.
    pub fn start_variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.start.iter().map(String::as_str)
    }

    /// The rules in the order in which they were extracted.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the variable that represents `state`.
    pub fn variable(&self, state: &State) -> Option<&str> {
        self.variable_map.get_by_left(state).map(String::as_str)
    }

    /// Returns the state that is represented by `variable`.
    pub fn state(&self, variable: &str) -> Option<&State> {
        self.variable_map.get_by_right(variable)
    }
}

impl Display for Vpg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Grammar")?;
        writeln!(f, "Variables: {}", self.variables().join(", "))?;
        writeln!(f, "Start variables: {}", self.start_variables().join(", "))?;
        writeln!(f, "Rules:")?;
        for rule in &self.rules {
            writeln!(f, "  {}    # {}", rule.show(), rule.kind.show())?;
        }
        writeln!(f, "Variable map:")?;
        for (state, var) in self.variable_map.iter() {
            writeln!(f, "  {} -> {}", state.show(), var)?;
        }
        Ok(())
    }
}
