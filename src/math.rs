/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
pub type Set<S> = fxhash::FxHashSet<S>;
/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
pub type Map<K, V> = fxhash::FxHashMap<K, V>;

/// A set that remembers the order in which elements were inserted. The observation table
/// relies on this so that learning runs (and the names of the synthesized states) do not
/// depend on hash iteration order.
pub type OrderedSet<S> = indexmap::IndexSet<S, fxhash::FxBuildHasher>;

/// Represents a bijective mapping between `L` and `R`, that is a mapping which associates
/// each `L` with precisely one `R` and vice versa.
pub type Bijection<L, R> = bimap::BiBTreeMap<L, R>;
