//! Component E: the Backward Fixpoint Engine.
//!
//! Drives top-down evaluation of a single (possibly non-ground) goal
//! against an adorned rule set: it alternates between matching rule heads,
//! evaluating each matching rule's body in its SIP order, and dispatching
//! base-predicate literals straight to the fact store. Magic-set
//! restriction is realized implicitly — each recursive call only ever
//! explores bindings consistent with the goal that triggered it, which is
//! exactly what an explicit magic predicate would otherwise encode as
//! data; see `DESIGN.md` for why this crate does not materialize magic
//! facts as a separate relation.

use std::collections::BTreeSet;

use log::{debug, error, trace};

use crate::adornment::{build_adorned_program, derived_predicates, hybrid_predicates};
use crate::bindings::Bindings;
use crate::config::EvalParams;
use crate::error::{EngineError, Result};
use crate::metrics::MetricsSink;
use crate::sip::SipGraph;
use crate::store::{FactStore, RuleSet, TriplePattern};
use crate::term::{Literal, Term};

/// Renames a clause-local term through `env` and returns a ground/partially
/// ground [`Term`] suitable for resolving into a store pattern.
fn resolve_term(term: &Term, env: &Bindings) -> Term {
    env.resolve(term).clone()
}

fn literal_to_pattern(literal: &Literal, env: &Bindings) -> Result<(TriplePattern, Vec<(String, usize)>)> {
    // Maps a literal onto a generic (subject, predicate, object) pattern,
    // recording which free variable occupies which triple position so that
    // a matched fact can be folded back into bindings regardless of the
    // literal's concrete surface form.
    let (subject, predicate, object): (Term, Term, Term) = match literal {
        Literal::GenericTriple {
            subject,
            predicate,
            object,
        } => (subject.clone(), predicate.clone(), object.clone()),
        Literal::TypePredicate {
            subject,
            class_term,
        } => (
            subject.clone(),
            Term::Constant("rdf:type".to_string()),
            class_term.clone(),
        ),
        Literal::Builtin(_) => {
            return Err(EngineError::UnsupportedTermKind {
                op: "triples",
                literal: literal.clone(),
            })
        }
        Literal::ExistentialWrapper(inner) => return literal_to_pattern(inner, env),
    };

    let mut free_positions = Vec::new();
    let mut resolve_pos = |pos: usize, term: &Term| -> Option<Term> {
        let resolved = resolve_term(term, env);
        if let Term::Variable(name) | Term::BlankNode(name) = &resolved {
            free_positions.push((name.clone(), pos));
            None
        } else {
            Some(resolved)
        }
    };

    let s = resolve_pos(0, &subject);
    let p = resolve_pos(1, &predicate);
    let o = resolve_pos(2, &object);

    Ok((
        TriplePattern {
            subject: s,
            predicate: p,
            object: o,
        },
        free_positions,
    ))
}

/// Base dispatch (§4.E): turns a body literal over a base predicate into a
/// store query with current bindings inlined, returning one extended
/// environment per matching fact.
pub(crate) fn dispatch_base<M: MetricsSink>(
    literal: &Literal,
    env: &Bindings,
    store: &dyn FactStore,
    metrics: &mut M,
) -> Result<Vec<Bindings>> {
    let (pattern, free_positions) = literal_to_pattern(literal, env)?;
    metrics.record_store_dispatch();
    let matches = store
        .triples(&pattern)
        .map_err(|_| EngineError::StoreQueryFailed(format!("triples({pattern:?})")))?;

    let mut results = Vec::new();
    'outer: for (s, p, o) in matches {
        let row = [s, p, o];
        let mut extension = Bindings::new();
        for (name, pos) in &free_positions {
            let value = row[*pos].clone();
            if let Some(existing) = extension.get(name) {
                if existing != &value {
                    continue 'outer;
                }
            } else {
                extension.insert(name.clone(), value);
            }
        }
        match env.merge(&extension) {
            Some(merged) => results.push(merged),
            None => continue,
        }
    }
    Ok(results)
}

/// Unifies a clause head with the caller's resolved goal arguments,
/// returning a clause-local environment seeded with the bound positions,
/// or `None` if a bound position's constant conflicts with the head.
fn unify_head(head: &Literal, goal_args: &[Term]) -> Option<Bindings> {
    let mut env = Bindings::new();
    for (head_arg, goal_arg) in head.args(true).iter().zip(goal_args.iter()) {
        match (head_arg, goal_arg) {
            (_, Term::Variable(_)) | (_, Term::BlankNode(_)) => {}
            (Term::Variable(name), other) | (Term::BlankNode(name), other) => {
                if let Some(existing) = env.get(name) {
                    if existing != other {
                        return None;
                    }
                } else {
                    env.insert(name.clone(), other.clone());
                }
            }
            (Term::Constant(a), Term::Constant(b)) => {
                if a != b {
                    return None;
                }
            }
        }
    }
    Some(env)
}

/// Translates a clause-local solution back into the caller's goal variable
/// names: for every goal argument position that was a free variable, reads
/// the corresponding (clause-local) head argument's resolved value out of
/// `env` and binds the goal's variable name to it.
fn translate_to_goal_vars(head: &Literal, goal_args: &[Term], env: &Bindings) -> Bindings {
    let mut out = Bindings::new();
    for (head_arg, goal_arg) in head.args(true).iter().zip(goal_args.iter()) {
        if let Term::Variable(goal_name) = goal_arg {
            let resolved = env.resolve(head_arg);
            if !resolved.is_variable() {
                out.insert(goal_name.clone(), resolved.clone());
            }
        }
    }
    out
}

/// Evaluates one clause body under `env`, following the body's SIP order
/// and recursing into [`answer_goal`] for derived/hybrid subgoals.
fn evaluate_body<M: MetricsSink>(
    sip: &SipGraph,
    env: &Bindings,
    store: &dyn FactStore,
    rules: &RuleSet,
    derived: &BTreeSet<Term>,
    hybrid: &BTreeSet<Term>,
    params: &EvalParams,
    metrics: &mut M,
) -> Result<Vec<Bindings>> {
    let order = sip
        .sip_order
        .clone()
        .unwrap_or_else(|| sip.occurrence_ids().collect());

    let mut frontier = vec![env.clone()];
    for occ in order {
        let body_lit = sip.occurrence(occ);
        let mut next_frontier = Vec::new();
        for candidate_env in &frontier {
            let extensions = evaluate_one_literal(
                &body_lit.literal,
                body_lit.negated,
                candidate_env,
                store,
                rules,
                derived,
                hybrid,
                params,
                metrics,
            )?;
            next_frontier.extend(extensions);
        }
        frontier = next_frontier;
        if frontier.is_empty() {
            break;
        }
    }
    Ok(frontier)
}

fn evaluate_one_literal<M: MetricsSink>(
    literal: &Literal,
    negated: bool,
    env: &Bindings,
    store: &dyn FactStore,
    rules: &RuleSet,
    derived: &BTreeSet<Term>,
    hybrid: &BTreeSet<Term>,
    params: &EvalParams,
    metrics: &mut M,
) -> Result<Vec<Bindings>> {
    let op = literal.op();
    let is_derived = derived.contains(&op) && !hybrid.contains(&op);

    if negated {
        // Negation-as-failure: succeed with the unchanged environment iff
        // no solution exists, per the crate's ordering-only negation
        // policy (§1 non-goals: no NAF semantics beyond ordering).
        let sub_results = if is_derived {
            answer_goal(literal, env, rules, store, params, metrics)?
        } else {
            dispatch_base(literal, env, store, metrics)?
        };
        return Ok(if sub_results.is_empty() {
            vec![env.clone()]
        } else {
            Vec::new()
        });
    }

    if is_derived {
        trace!("dispatching derived literal {literal}");
        answer_goal(literal, env, rules, store, params, metrics)
    } else {
        trace!("dispatching base literal {literal}");
        dispatch_base(literal, env, store, metrics)
    }
}

/// Component E's public entry point: answers a single goal literal against
/// `rules`/`store`, returning one [`Bindings`] per solution found, each
/// merged with `initial_bindings` and expressed over the goal's own free
/// variables.
///
/// Delegates the adornment/SIP planning to [`build_adorned_program`] (§4.D),
/// which rewrites hybrid predicates and hands back a stable-ordered set of
/// adorned clauses — this realizes the "(Rule set + Goal) → D builds adorned
/// program... E produces bindings" data flow of §2.
pub fn answer_goal<M: MetricsSink>(
    goal: &Literal,
    initial_bindings: &Bindings,
    rules: &RuleSet,
    store: &dyn FactStore,
    params: &EvalParams,
    metrics: &mut M,
) -> Result<Vec<Bindings>> {
    params.validate()?;

    let goal_op = goal.op();
    let base_derived = derived_predicates(rules);
    let hybrid = hybrid_predicates(&base_derived, store)?;

    if !base_derived.contains(&goal_op) && !hybrid.contains(&goal_op) {
        // Not a derived predicate at all (and not hybrid either): treat as
        // a direct base dispatch, matching §4.F step 1's fallback.
        return dispatch_base(goal, initial_bindings, store, metrics);
    }

    let (program, effective_goal) =
        build_adorned_program(goal, initial_bindings, rules, store, params, metrics)?;
    let resolved_goal_args: Vec<Term> = effective_goal
        .args(true)
        .iter()
        .map(|t| initial_bindings.resolve(t).clone())
        .collect();

    let mut rounds = 0usize;
    let mut results = Vec::new();
    for adorned in &program.clauses {
        rounds += 1;
        if rounds > params.max_fixpoint_rounds {
            error!(
                "fixpoint round budget ({}) exceeded evaluating goal {goal}",
                params.max_fixpoint_rounds
            );
            return Err(EngineError::PlanningExhausted {
                head: adorned.clause.head.to_string(),
            });
        }
        metrics.increment_iterations();

        let Some(clause_env) = unify_head(&adorned.clause.head, &resolved_goal_args) else {
            continue;
        };

        debug!(
            "round {rounds} start: evaluating clause {} under goal {goal}",
            adorned.clause
        );
        let before = results.len();

        let body_envs = evaluate_body(
            &adorned.sip,
            &clause_env,
            store,
            rules,
            &program.derived_predicates,
            &program.hybrid_predicates,
            params,
            metrics,
        )?;

        for body_env in body_envs {
            let translated =
                translate_to_goal_vars(&adorned.clause.head, &resolved_goal_args, &body_env);
            match initial_bindings.merge(&translated) {
                Some(merged) => results.push(merged),
                None => continue,
            }
        }

        if results.len() > params.max_magic_facts_per_predicate {
            error!(
                "magic fact limit ({}) exceeded for predicate {goal_op} while evaluating goal {goal}",
                params.max_magic_facts_per_predicate
            );
            return Err(EngineError::MagicFactLimitExceeded {
                predicate: goal_op.to_string(),
                limit: params.max_magic_facts_per_predicate,
            });
        }

        let delta = results.len() - before;
        metrics.record_delta_size(delta);
        debug!("round {rounds} end: {delta} new answer(s) for goal {goal}");
    }

    Ok(results)
}

/// Returns the original query literal unchanged when it involves only base
/// predicates, or the hybrid-rewritten (`_derived`) form otherwise — the
/// `isBaseQuery` interface of §6.
pub fn is_base_query(goal: &Literal, derived: &BTreeSet<Term>, hybrid: &BTreeSet<Term>) -> Literal {
    let op = goal.op();
    if derived.contains(&op) && hybrid.contains(&op) {
        let mut rewritten = goal.clone();
        let _ = rewritten.set_op(crate::adornment::suffix_predicate(&op));
        rewritten
    } else {
        goal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoOpMetrics;
    use crate::store::MemoryFactStore;
    use crate::term::{BodyLiteral, Clause};

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
    fn goal_dispatch_finds_expected_binding() {
        let _ = env_logger::builder().is_test(true).try_init();
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

        let results = answer_goal(
            &goal,
            &Bindings::new(),
            &rules,
            &store,
            &params,
            &mut metrics,
        )
        .unwrap();

        assert!(results
            .iter()
            .any(|b| b.get("Y") == Some(&c("d"))));
    }

    #[test]
    fn hybrid_predicate_merges_edb_and_idb_answers() {
        let mut store = MemoryFactStore::default();
        store.insert(c("1"), c("p"), c("2"));
        store.insert(c("3"), c("q"), c("4"));

        let rules: RuleSet = vec![Clause::rule(
            triple(v("X"), "p", v("Y")),
            vec![BodyLiteral::positive(triple(v("X"), "q", v("Y")))],
        )];

        let goal = triple(v("X"), "p", v("Y"));
        let params = EvalParams::default();
        let mut metrics = NoOpMetrics;

        let results = answer_goal(
            &goal,
            &Bindings::new(),
            &rules,
            &store,
            &params,
            &mut metrics,
        )
        .unwrap();

        assert!(results
            .iter()
            .any(|b| b.get("X") == Some(&c("1")) && b.get("Y") == Some(&c("2"))));
        assert!(results
            .iter()
            .any(|b| b.get("X") == Some(&c("3")) && b.get("Y") == Some(&c("4"))));
    }

    #[test]
    fn magic_fact_limit_is_enforced_per_predicate() {
        // The hybrid `p` scenario produces two distinct answers (one EDB,
        // one IDB); capping the limit at one must surface
        // `MagicFactLimitExceeded` once the second is found.
        let mut store = MemoryFactStore::default();
        store.insert(c("1"), c("p"), c("2"));
        store.insert(c("3"), c("q"), c("4"));

        let rules: RuleSet = vec![Clause::rule(
            triple(v("X"), "p", v("Y")),
            vec![BodyLiteral::positive(triple(v("X"), "q", v("Y")))],
        )];

        let goal = triple(v("X"), "p", v("Y"));
        let params = EvalParams {
            max_magic_facts_per_predicate: 1,
            ..EvalParams::default()
        };
        let mut metrics = NoOpMetrics;

        let result = answer_goal(&goal, &Bindings::new(), &rules, &store, &params, &mut metrics);
        assert!(matches!(
            result,
            Err(EngineError::MagicFactLimitExceeded { limit: 1, .. })
        ));
    }
}
