//! External interfaces (§6), consumed side: the fact store and rule set
//! this crate's components are handed by their caller.

use crate::bindings::Bindings;
use crate::error::{EngineError, Result};
use crate::term::{Clause, Term};

/// A triple-pattern match request; `None` in a position means "any".
#[derive(Debug, Clone, Default)]
pub struct TriplePattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
}

/// The fact store interface consumed by the Backward Fixpoint Engine and
/// the Conjunctive Strategy. Implementations back this with whatever
/// storage they like; this crate only ever calls through the trait.
pub trait FactStore {
    /// Matches `pattern` against the store, returning every matching
    /// ground triple.
    fn triples(&self, pattern: &TriplePattern) -> Result<Vec<(Term, Term, Term)>>;

    /// Dispatches a raw SPARQL-style query string against the store,
    /// returning one [`Bindings`] per solution row. Parsing and executing
    /// SPARQL text is a store concern this crate never performs itself
    /// (§1 non-goals: query parsing is out of scope) — base dispatch always
    /// goes through [`Self::triples`] instead. This method exists purely so
    /// a caller that already holds a SPARQL string can route it through the
    /// same store a [`FactStore`] implementation backs `triples` with,
    /// without this crate knowing anything about SPARQL syntax. The default
    /// implementation reports the query as unsupported.
    fn query(&self, sparql: &str, init_ns: &[(String, String)]) -> Result<Vec<Bindings>> {
        let _ = (sparql, init_ns);
        Err(EngineError::StoreQueryFailed(
            "this store does not implement raw SPARQL dispatch".to_string(),
        ))
    }

    /// The namespace prefix table the store was loaded with, used only for
    /// SIP/IRI rendering; an empty store may return an empty sequence.
    fn namespaces(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// An in-memory fact store over a fixed vector of ground triples, used
/// throughout this crate's own tests and suitable as a minimal reference
/// implementation of [`FactStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFactStore {
    triples: Vec<(Term, Term, Term)>,
}

impl MemoryFactStore {
    pub fn new(triples: Vec<(Term, Term, Term)>) -> Self {
        Self { triples }
    }

    pub fn insert(&mut self, subject: Term, predicate: Term, object: Term) {
        self.triples.push((subject, predicate, object));
    }
}

impl FactStore for MemoryFactStore {
    fn triples(&self, pattern: &TriplePattern) -> Result<Vec<(Term, Term, Term)>> {
        Ok(self
            .triples
            .iter()
            .filter(|(s, p, o)| {
                pattern.subject.as_ref().map_or(true, |t| t == s)
                    && pattern.predicate.as_ref().map_or(true, |t| t == p)
                    && pattern.object.as_ref().map_or(true, |t| t == o)
            })
            .cloned()
            .collect())
    }
}

/// The rule-set interface consumed by the Magic/Adornment Driver: an
/// iterable of deep-copyable clauses. A plain `Vec<Clause>` already
/// satisfies this (clauses are `Clone`); the alias exists purely to name
/// the concept at call sites.
pub type RuleSet = Vec<Clause>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_matches_partial_patterns() {
        let mut store = MemoryFactStore::default();
        store.insert(
            Term::Constant("a".into()),
            Term::Constant("up".into()),
            Term::Constant("b".into()),
        );
        store.insert(
            Term::Constant("b".into()),
            Term::Constant("flat".into()),
            Term::Constant("c".into()),
        );

        let pattern = TriplePattern {
            subject: None,
            predicate: Some(Term::Constant("up".into())),
            object: None,
        };
        let results = store.triples(&pattern).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, Term::Constant("a".into()));
    }
}
