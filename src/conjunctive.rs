//! Component F: the Conjunctive Strategy.
//!
//! Sequences a conjunction of goal literals, threading a single [`Bindings`]
//! environment through them and delegating each goal to [`answer_goal`] or
//! [`dispatch_base`] (§4.F) depending on whether its predicate is derived,
//! hybrid, or purely base.

use crate::bindings::Bindings;
use crate::config::EvalParams;
use crate::engine::{answer_goal, dispatch_base};
use crate::error::Result;
use crate::metrics::MetricsSink;
use crate::store::{FactStore, RuleSet};
use crate::term::Literal;

/// Answers an ordered conjunction of goals against `rules`/`store`, starting
/// from `initial_bindings`. Each goal is resolved in turn: a base-only
/// predicate dispatches straight to the store, anything derived or hybrid
/// goes through the Backward Fixpoint Engine, and every resulting binding
/// row feeds forward as the environment for the next goal. Returns one
/// [`Bindings`] per full solution of the conjunction, in the order the
/// underlying SIP orderings and store iteration produce them (§4.F).
pub fn batch_unify<M: MetricsSink>(
    goals: &[Literal],
    initial_bindings: &Bindings,
    rules: &RuleSet,
    store: &dyn FactStore,
    params: &EvalParams,
    metrics: &mut M,
) -> Result<Vec<Bindings>> {
    params.validate()?;

    let mut frontier = vec![initial_bindings.clone()];
    for goal in goals {
        if frontier.is_empty() {
            break;
        }
        let mut next_frontier = Vec::new();
        for env in &frontier {
            let extensions = answer_goal(goal, env, rules, store, params, metrics)?;
            next_frontier.extend(extensions);
        }
        frontier = next_frontier;
    }
    Ok(frontier)
}

/// Direct base-only dispatch for a single goal, bypassing the adornment
/// driver entirely. Exposed so callers that already know a conjunction is
/// pure base patterns can skip the derived/hybrid classification step
/// `batch_unify` otherwise performs per goal.
pub fn batch_unify_base<M: MetricsSink>(
    goals: &[Literal],
    initial_bindings: &Bindings,
    store: &dyn FactStore,
    metrics: &mut M,
) -> Result<Vec<Bindings>> {
    let mut frontier = vec![initial_bindings.clone()];
    for goal in goals {
        if frontier.is_empty() {
            break;
        }
        let mut next_frontier = Vec::new();
        for env in &frontier {
            let extensions = dispatch_base(goal, env, store, metrics)?;
            next_frontier.extend(extensions);
        }
        frontier = next_frontier;
    }
    Ok(frontier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoOpMetrics;
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

    #[test]
    fn single_goal_conjunction_matches_direct_goal_dispatch() {
        let mut store = MemoryFactStore::default();
        store.insert(c("a"), c("up"), c("b"));
        store.insert(c("b"), c("flat"), c("c"));
        store.insert(c("c"), c("flat"), c("e"));
        store.insert(c("e"), c("flat"), c("f"));
        store.insert(c("f"), c("down"), c("d"));

        let rules = same_generation_rules();
        let goal = triple(c("a"), "sg", v("Y"));
        let params = EvalParams::default();
        let mut metrics = NoOpMetrics;

        let results = batch_unify(
            &[goal],
            &Bindings::new(),
            &rules,
            &store,
            &params,
            &mut metrics,
        )
        .unwrap();

        assert!(results.iter().any(|b| b.get("Y") == Some(&c("d"))));
    }

    #[test]
    fn multi_literal_conjunction_threads_bindings_across_goals() {
        // up(a,?Z), sg(?Z,?W) — answer ?Z from the base store, then reuse it
        // to drive the derived sg(?Z,?W) subgoal.
        let mut store = MemoryFactStore::default();
        store.insert(c("a"), c("up"), c("b"));
        store.insert(c("b"), c("flat"), c("c"));
        store.insert(c("c"), c("down"), c("d"));

        let rules = same_generation_rules();
        let goals = vec![
            triple(c("a"), "up", v("Z")),
            triple(v("Z"), "sg", v("W")),
        ];
        let params = EvalParams::default();
        let mut metrics = NoOpMetrics;

        let results = batch_unify(
            &goals,
            &Bindings::new(),
            &rules,
            &store,
            &params,
            &mut metrics,
        )
        .unwrap();

        assert!(results
            .iter()
            .any(|b| b.get("Z") == Some(&c("b")) && b.get("W") == Some(&c("c"))));
    }

    #[test]
    fn empty_conjunction_yields_the_initial_environment_unchanged() {
        let store = MemoryFactStore::default();
        let rules: RuleSet = Vec::new();
        let params = EvalParams::default();
        let mut metrics = NoOpMetrics;

        let mut initial = Bindings::new();
        initial.insert("X".to_string(), c("seed"));

        let results =
            batch_unify(&[], &initial, &rules, &store, &params, &mut metrics).unwrap();

        assert_eq!(results, vec![initial]);
    }
}
