//! A top-down, goal-directed Datalog query evaluator driven by a
//! magic-sets/SIP rewriting strategy over RDF-style triples.
//!
//! The reasoning kernel is organized as the components named throughout the
//! module docs: [`term`] (term and literal introspection), [`sip`] (the SIP
//! graph), [`ordering`] (the `findFullSip` search), [`adornment`] (the
//! magic/adornment driver), [`engine`] (the backward fixpoint engine), and
//! [`conjunctive`] (the conjunctive strategy). [`QueryEngine`] wires these
//! together behind the external interface described in `answer`/
//! `batch_unify`/`is_base_query`.

pub mod adornment;
pub mod bindings;
pub mod conjunctive;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod ordering;
pub mod pretty_print;
pub mod sip;
pub mod store;
pub mod term;
pub mod vis;

use crate::bindings::Bindings;
use crate::config::EvalParams;
use crate::engine::answer_goal;
use crate::error::Result;
use crate::metrics::{CounterMetrics, DebugMetrics, MetricsLevel, MetricsReport, MetricsSink, NoOpMetrics};
use crate::store::{FactStore, RuleSet};
use crate::term::Literal;

/// The query-engine interface of §6: a fixed rule set and fact store,
/// answered against with whatever [`MetricsSink`] the caller wants.
///
/// Borrows its rule set and store rather than owning them, matching the
/// "rule set is treated as immutable for the duration of a query" resource
/// model — nothing here ever mutates the caller's rules or facts; hybrid
/// rewriting works on an internal deep copy (see [`adornment::rewrite_hybrid_predicates`]).
pub struct QueryEngine<'a> {
    rules: &'a RuleSet,
    store: &'a dyn FactStore,
    params: EvalParams,
}

impl<'a> QueryEngine<'a> {
    pub fn new(rules: &'a RuleSet, store: &'a dyn FactStore) -> Self {
        Self {
            rules,
            store,
            params: EvalParams::default(),
        }
    }

    pub fn with_params(rules: &'a RuleSet, store: &'a dyn FactStore, params: EvalParams) -> Self {
        Self {
            rules,
            store,
            params,
        }
    }

    /// `answer(goal, initialBindings)` (§6): answers a single goal literal,
    /// collecting metrics with `metrics`.
    pub fn answer_with_metrics<M: MetricsSink>(
        &self,
        goal: &Literal,
        initial_bindings: &Bindings,
        metrics: &mut M,
    ) -> Result<Vec<Bindings>> {
        answer_goal(
            goal,
            initial_bindings,
            self.rules,
            self.store,
            &self.params,
            metrics,
        )
    }

    /// `answer(goal, initialBindings)` (§6) with metrics collection disabled.
    pub fn answer(&self, goal: &Literal, initial_bindings: &Bindings) -> Result<Vec<Bindings>> {
        let mut metrics = NoOpMetrics;
        self.answer_with_metrics(goal, initial_bindings, &mut metrics)
    }

    /// `batchUnify(patterns)` (§6): answers an ordered conjunction of goals,
    /// collecting metrics with `metrics`.
    pub fn batch_unify_with_metrics<M: MetricsSink>(
        &self,
        goals: &[Literal],
        initial_bindings: &Bindings,
        metrics: &mut M,
    ) -> Result<Vec<Bindings>> {
        conjunctive::batch_unify(
            goals,
            initial_bindings,
            self.rules,
            self.store,
            &self.params,
            metrics,
        )
    }

    /// `batchUnify(patterns)` (§6) with metrics collection disabled.
    pub fn batch_unify(&self, goals: &[Literal], initial_bindings: &Bindings) -> Result<Vec<Bindings>> {
        let mut metrics = NoOpMetrics;
        self.batch_unify_with_metrics(goals, initial_bindings, &mut metrics)
    }

    /// `isBaseQuery(query)` (§6): the original goal when it involves only
    /// base predicates, or its hybrid-rewritten (`_derived`) form otherwise.
    pub fn is_base_query(&self, goal: &Literal) -> Result<Literal> {
        let derived = adornment::derived_predicates(self.rules);
        let hybrid = adornment::hybrid_predicates(&derived, self.store)?;
        Ok(engine::is_base_query(goal, &derived, &hybrid))
    }

    /// Answers a single goal literal, collecting whichever [`MetricsSink`]
    /// `level` selects, and hands back the matching [`MetricsReport`]
    /// alongside the solutions (§10.J: metrics dispatch is chosen per call
    /// via `match` on a requested level rather than baked into the type).
    pub fn answer_at_level(
        &self,
        goal: &Literal,
        initial_bindings: &Bindings,
        level: MetricsLevel,
    ) -> Result<(Vec<Bindings>, MetricsReport)> {
        match level {
            MetricsLevel::None => {
                let results = self.answer(goal, initial_bindings)?;
                Ok((results, MetricsReport::None))
            }
            MetricsLevel::Counters => {
                let mut metrics = CounterMetrics::default();
                let results = self.answer_with_metrics(goal, initial_bindings, &mut metrics)?;
                Ok((results, MetricsReport::Counters(metrics)))
            }
            MetricsLevel::Debug => {
                let mut metrics = DebugMetrics::default();
                let results = self.answer_with_metrics(goal, initial_bindings, &mut metrics)?;
                Ok((results, MetricsReport::Debug(metrics)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::CounterMetrics;
    use crate::store::MemoryFactStore;
    use crate::term::{BodyLiteral, Clause, Term};

    fn v(name: &str) -> Term {
        Term::Variable(name.to_string())
    }

    fn c(name: &str) -> Term {
        Term::Constant(name.to_string())
    }

    fn triple(s: Term, p: &str, o: Term) -> Literal {
        Literal::GenericTriple {
            subject: s,
            predicate: Term::Constant(p.to_string()),
            object: o,
        }
    }

    fn same_generation_rules() -> RuleSet {
        vec![
            Clause::rule(
                triple(v("X"), "sg", v("Y")),
                vec![BodyLiteral::positive(triple(v("X"), "flat", v("Y")))],
            ),
            Clause::rule(
                triple(v("X"), "sg", v("Y")),
                vec![
                    BodyLiteral::positive(triple(v("X"), "up", v("Z1"))),
                    BodyLiteral::positive(triple(v("Z1"), "sg", v("Z2"))),
                    BodyLiteral::positive(triple(v("Z2"), "flat", v("Z3"))),
                    BodyLiteral::positive(triple(v("Z3"), "sg", v("Z4"))),
                    BodyLiteral::positive(triple(v("Z4"), "down", v("Y"))),
                ],
            ),
        ]
    }

    /// End-to-end scenario 1/2 of §8: same-generation rules, goal dispatch
    /// `sg(a,?Y)` over a chain completing both recursive `sg` subgoals
    /// (`up(a,b), flat(b,c), flat(c,e), flat(e,f), down(f,d)`) returns
    /// `{?Y -> d}`: `sg(b,c)` via `flat(b,c)` carries `Z2=c` into
    /// `flat(c,e)`, and `sg(e,f)` via `flat(e,f)` carries `Z4=f` into
    /// `down(f,d)`.
    #[test]
    fn same_generation_goal_dispatch_returns_expected_binding() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut store = MemoryFactStore::default();
        store.insert(c("a"), c("up"), c("b"));
        store.insert(c("b"), c("flat"), c("c"));
        store.insert(c("c"), c("flat"), c("e"));
        store.insert(c("e"), c("flat"), c("f"));
        store.insert(c("f"), c("down"), c("d"));

        let rules = same_generation_rules();
        let engine = QueryEngine::new(&rules, &store);

        let goal = triple(c("a"), "sg", v("Y"));
        let mut metrics = CounterMetrics::default();
        let results = engine
            .answer_with_metrics(&goal, &Bindings::new(), &mut metrics)
            .unwrap();

        assert!(results.iter().any(|b| b.get("Y") == Some(&c("d"))));
        assert!(metrics.store_dispatches > 0);
    }

    /// End-to-end scenario 3 of §8: hybrid predicate `p` with both an EDB
    /// tuple and a deriving rule returns both answers, and `is_base_query`
    /// reports the rewritten form.
    #[test]
    fn hybrid_predicate_scenario_returns_both_edb_and_idb_answers() {
        let mut store = MemoryFactStore::default();
        store.insert(c("1"), c("p"), c("2"));
        store.insert(c("3"), c("q"), c("4"));

        let rules: RuleSet = vec![Clause::rule(
            triple(v("X"), "p", v("Y")),
            vec![BodyLiteral::positive(triple(v("X"), "q", v("Y")))],
        )];
        let engine = QueryEngine::new(&rules, &store);

        let goal = triple(v("X"), "p", v("Y"));
        let results = engine.answer(&goal, &Bindings::new()).unwrap();

        assert!(results
            .iter()
            .any(|b| b.get("X") == Some(&c("1")) && b.get("Y") == Some(&c("2"))));
        assert!(results
            .iter()
            .any(|b| b.get("X") == Some(&c("3")) && b.get("Y") == Some(&c("4"))));

        let rewritten = engine.is_base_query(&goal).unwrap();
        assert_eq!(rewritten.op(), Term::Constant("p_derived".to_string()));
    }

    /// A query over a predicate with no rule heads at all is answered
    /// straight against the base store (§4.F step 1's fallback), and
    /// `is_base_query` is a no-op for it.
    #[test]
    fn pure_base_predicate_is_answered_directly_and_left_unrewritten() {
        let mut store = MemoryFactStore::default();
        store.insert(c("a"), c("up"), c("b"));

        let rules: RuleSet = Vec::new();
        let engine = QueryEngine::new(&rules, &store);

        let goal = triple(c("a"), "up", v("Y"));
        let results = engine.answer(&goal, &Bindings::new()).unwrap();
        assert!(results.iter().any(|b| b.get("Y") == Some(&c("b"))));

        let rewritten = engine.is_base_query(&goal).unwrap();
        assert_eq!(rewritten, goal);
    }

    /// A conjunctive query `up(a,?Z), sg(?Z,?W)` threads the base binding
    /// for `?Z` into the derived `sg` subgoal via `batch_unify`.
    #[test]
    fn batch_unify_answers_a_conjunction_spanning_base_and_derived_goals() {
        let mut store = MemoryFactStore::default();
        store.insert(c("a"), c("up"), c("b"));
        store.insert(c("b"), c("flat"), c("c"));
        store.insert(c("c"), c("down"), c("d"));

        let rules = same_generation_rules();
        let engine = QueryEngine::new(&rules, &store);

        let goals = vec![triple(c("a"), "up", v("Z")), triple(v("Z"), "sg", v("W"))];
        let results = engine.batch_unify(&goals, &Bindings::new()).unwrap();

        assert!(results
            .iter()
            .any(|b| b.get("Z") == Some(&c("b")) && b.get("W") == Some(&c("c"))));
    }

    /// `answer_at_level` dispatches to the metrics sink matching the
    /// requested [`MetricsLevel`] and reports through the matching
    /// [`MetricsReport`] variant.
    #[test]
    fn answer_at_level_dispatches_metrics_sink_per_level() {
        let mut store = MemoryFactStore::default();
        store.insert(c("a"), c("up"), c("b"));
        store.insert(c("b"), c("flat"), c("c"));
        store.insert(c("c"), c("flat"), c("e"));
        store.insert(c("e"), c("flat"), c("f"));
        store.insert(c("f"), c("down"), c("d"));

        let rules = same_generation_rules();
        let engine = QueryEngine::new(&rules, &store);
        let goal = triple(c("a"), "sg", v("Y"));

        let (results, report) = engine
            .answer_at_level(&goal, &Bindings::new(), MetricsLevel::None)
            .unwrap();
        assert!(results.iter().any(|b| b.get("Y") == Some(&c("d"))));
        assert!(matches!(report, MetricsReport::None));

        let (_, report) = engine
            .answer_at_level(&goal, &Bindings::new(), MetricsLevel::Counters)
            .unwrap();
        match report {
            MetricsReport::Counters(counters) => assert!(counters.store_dispatches > 0),
            other => panic!("expected Counters report, got {other:?}"),
        }

        let (_, report) = engine
            .answer_at_level(&goal, &Bindings::new(), MetricsLevel::Debug)
            .unwrap();
        match report {
            MetricsReport::Debug(debug) => assert!(debug.counters.store_dispatches > 0),
            other => panic!("expected Debug report, got {other:?}"),
        }
    }
}
