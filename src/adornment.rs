//! Component D: the magic/adornment driver.
//!
//! Consumes a rule set and a goal's bound-argument pattern to produce an
//! [`AdornedProgram`]: per-clause SIP graphs, the derived-predicate set,
//! and the hybrid-predicate rewriting described in §4.D.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::bindings::Bindings;
use crate::config::EvalParams;
use crate::error::{EngineError, Result};
use crate::metrics::MetricsSink;
use crate::ordering::{is_proper_order_with_negation, SipOrderingSearch};
use crate::sip::{OccurrenceId, SipGraph, SipSource};
use crate::store::{FactStore, RuleSet, TriplePattern};
use crate::term::{BodyLiteral, Clause, Literal, Term};

/// Whether a head argument position is bound or free at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Bound,
    Free,
}

pub type Adornment = Vec<Binding>;

pub fn adornment_to_string(adornment: &Adornment) -> String {
    adornment
        .iter()
        .map(|b| match b {
            Binding::Bound => 'b',
            Binding::Free => 'f',
        })
        .collect()
}

/// Computes the adornment implied by a goal's argument list: a constant in
/// a position means that position is bound, a variable means free.
pub fn adornment_from_goal(goal_args: &[Term]) -> Adornment {
    goal_args
        .iter()
        .map(|t| {
            if t.is_variable() {
                Binding::Free
            } else {
                Binding::Bound
            }
        })
        .collect()
}

/// An adorned clause: the original clause plus the head adornment that was
/// used to build its SIP graph.
#[derive(Debug, Clone)]
pub struct AdornedClause {
    pub clause: Clause,
    pub head_adornment: Adornment,
    pub sip: SipGraph,
}

/// The output of the driver: a stable-ordered set of adorned clauses plus
/// the derived- and hybrid-predicate sets they were built against.
#[derive(Debug, Clone, Default)]
pub struct AdornedProgram {
    pub clauses: Vec<AdornedClause>,
    pub derived_predicates: BTreeSet<Term>,
    pub hybrid_predicates: BTreeSet<Term>,
}

/// The string suffix appended to a hybrid predicate's IRI when it is
/// rewritten to its derived form (§6).
pub const HYBRID_SUFFIX: &str = "_derived";

/// Every predicate symbol appearing in some rule's head.
pub fn derived_predicates(rules: &RuleSet) -> BTreeSet<Term> {
    rules
        .iter()
        .filter(|clause| !clause.is_fact())
        .map(|clause| clause.head.op())
        .collect()
}

/// Predicates that are both derived (appear in some rule head) and present
/// in the base store — these require the hybrid rewriting of §4.D step 5.
pub fn hybrid_predicates(
    derived: &BTreeSet<Term>,
    store: &dyn FactStore,
) -> Result<BTreeSet<Term>> {
    let mut hybrid = BTreeSet::new();
    for pred in derived {
        let pattern = TriplePattern {
            subject: None,
            predicate: Some(pred.clone()),
            object: None,
        };
        if !store.triples(&pattern)?.is_empty() {
            hybrid.insert(pred.clone());
        }
    }
    Ok(hybrid)
}

/// Rewrites every IDB occurrence of a hybrid predicate to its `_derived`
/// form and synthesizes the bridge rule `p_derived(X…) :- p(X…)` so the
/// derived form subsumes the EDB facts too (§4.D step 5). Operates on a
/// fresh deep copy of `rules`, leaving the caller's rule set untouched
/// (§5).
pub fn rewrite_hybrid_predicates(rules: &RuleSet, hybrid: &BTreeSet<Term>) -> RuleSet {
    if hybrid.is_empty() {
        return rules.clone();
    }

    let mut rewritten: RuleSet = rules
        .iter()
        .cloned()
        .map(|mut clause| {
            if hybrid.contains(&clause.head.op()) {
                let suffixed = suffix_predicate(&clause.head.op());
                let _ = clause.head.set_op(suffixed);
            }
            for body_lit in clause.body.iter_mut() {
                if hybrid.contains(&body_lit.literal.op()) {
                    let suffixed = suffix_predicate(&body_lit.literal.op());
                    let _ = body_lit.literal.set_op(suffixed);
                }
            }
            clause
        })
        .collect();

    for pred in hybrid {
        rewritten.push(bridge_rule(pred));
    }
    rewritten
}

/// Appends the `_derived` suffix to a predicate operator (§6). `pub(crate)`
/// because the Backward Fixpoint Engine needs it too, to rewrite a goal's
/// own operator the same way its rule heads were rewritten.
pub(crate) fn suffix_predicate(op: &Term) -> Term {
    match op {
        Term::Constant(iri) => Term::Constant(format!("{iri}{HYBRID_SUFFIX}")),
        other => other.clone(),
    }
}

fn bridge_rule(pred: &Term) -> Clause {
    let x = Term::Variable("__bridge_x".to_string());
    let y = Term::Variable("__bridge_y".to_string());
    let base = crate::term::Literal::GenericTriple {
        subject: x.clone(),
        predicate: pred.clone(),
        object: y.clone(),
    };
    let derived = crate::term::Literal::GenericTriple {
        subject: x,
        predicate: suffix_predicate(pred),
        object: y,
    };
    Clause::rule(derived, vec![BodyLiteral::positive(base)])
}

/// Builds the SIP graph for one clause given its head adornment, retrying
/// the ordering search (§4.D step 3's `ignoreUnboundDPreds` backtrack) if a
/// chosen ordering turns out to need an empty binding set partway through.
pub fn build_sip<M: MetricsSink>(
    clause: &Clause,
    head_adornment: &Adornment,
    derived: &BTreeSet<Term>,
    hybrid_replace: &BTreeSet<Term>,
    params: &EvalParams,
    metrics: &mut M,
) -> Result<SipGraph> {
    let head_args = clause.head.args(true);
    let ph_bound_vars: BTreeSet<Term> = head_args
        .iter()
        .zip(head_adornment.iter())
        .filter(|(_, binding)| matches!(binding, Binding::Bound))
        .filter(|(term, _)| term.is_variable())
        .map(|(term, _)| term.clone())
        .collect();

    if clause.body.is_empty() {
        // A fact has no body to order; it trivially has an empty-but-valid
        // SIP graph (no arcs are needed to reach no subgoals).
        let mut graph = SipGraph::new(clause.head.clone(), Vec::new());
        graph.sip_order = Some(Vec::new());
        return Ok(graph);
    }

    let bootstrap = ph_bound_vars.is_empty();
    let (seed_prefix, seed_carried, remaining): (Vec<usize>, BTreeSet<Term>, Vec<usize>) =
        if bootstrap {
            let seed_vars = clause.body[0].literal.variables(true);
            (vec![0], seed_vars, (1..clause.body.len()).collect())
        } else {
            (Vec::new(), ph_bound_vars.clone(), (0..clause.body.len()).collect())
        };

    let mut search = SipOrderingSearch::with_seed(&clause.body, seed_prefix, seed_carried, remaining);
    while let Some(ordering) = search.next() {
        if !is_proper_order_with_negation(&clause.body, &ordering) {
            continue;
        }
        match try_fold_ordering(clause, &ordering, &ph_bound_vars, bootstrap) {
            Some(mut graph) => {
                graph.sip_order = Some(ordering.iter().map(|&i| OccurrenceId(i)).collect());
                if params.generalize_derived_arcs_only {
                    let mut keep = derived.clone();
                    keep.extend(hybrid_replace.iter().cloned());
                    graph.retain_arcs_into(&keep);
                }
                debug!(
                    "built SIP for clause with head {} using ordering {:?}",
                    clause.head, ordering
                );
                return Ok(graph);
            }
            None => {
                warn!(
                    "SIP ordering for clause with head {} produced an unbound arc; backtracking",
                    clause.head
                );
                metrics.record_sip_backtrack(&clause.head.to_string());
                continue;
            }
        }
    }

    Err(EngineError::InvalidSip {
        head: clause.head.to_string(),
    })
}

/// Folds a chosen ordering into SIP arcs, failing (returning `None`, to be
/// treated as a backtrack signal) if any step's intersection is empty.
fn try_fold_ordering(
    clause: &Clause,
    ordering: &[usize],
    ph_bound_vars: &BTreeSet<Term>,
    bootstrap: bool,
) -> Option<SipGraph> {
    let mut graph = SipGraph::new(clause.head.clone(), clause.body.clone());
    let mut carried = ph_bound_vars.clone();
    let mut prefix_ids: Vec<OccurrenceId> = Vec::new();

    for (pos, &idx) in ordering.iter().enumerate() {
        let right_vars = clause.body[idx].literal.variables(true);

        if bootstrap && pos == 0 {
            // The seed literal was chosen unconditionally (no head binding
            // reached it); it gets no incoming arc, matching the original
            // algorithm's treatment of a fully-free adorned head.
            carried.extend(right_vars);
            prefix_ids.push(OccurrenceId(idx));
            continue;
        }

        let x: Vec<Term> = carried.intersection(&right_vars).cloned().collect();
        if x.is_empty() {
            return None;
        }

        let source = if prefix_ids.is_empty() {
            SipSource::BoundHeadPredicate
        } else {
            SipSource::Occurrences(prefix_ids.clone())
        };
        graph.add_arc(source, OccurrenceId(idx), x);

        carried.extend(right_vars);
        prefix_ids.push(OccurrenceId(idx));
    }

    Some(graph)
}

/// The full driver output for one goal (§4.D): resolves the goal's operator
/// against the base/derived/hybrid sets, rewrites hybrid predicates to their
/// `_derived` form (§4.D step 5), and builds a SIP graph for every clause
/// whose (possibly rewritten) head matches — an [`AdornedProgram`] with a
/// stable iteration order over its clauses, addressable by clause identity.
/// This realizes the data flow of §2: "(Rule set + Goal) → D builds adorned
/// program, invoking B/C per rule via A", and is what the Conjunctive
/// Strategy (component F) hands to the Backward Fixpoint Engine (E) for a
/// derived or hybrid subgoal.
///
/// Returns the program together with the goal rewritten into its effective
/// (possibly suffixed) form, since the caller needs that form to unify
/// against the program's adorned clause heads.
pub fn build_adorned_program<M: MetricsSink>(
    goal: &Literal,
    initial_bindings: &Bindings,
    rules: &RuleSet,
    store: &dyn FactStore,
    params: &EvalParams,
    metrics: &mut M,
) -> Result<(AdornedProgram, Literal)> {
    params.validate()?;

    let base_derived = derived_predicates(rules);
    let hybrid = hybrid_predicates(&base_derived, store)?;
    let rewritten_rules = rewrite_hybrid_predicates(rules, &hybrid);
    let derived = derived_predicates(&rewritten_rules);

    let goal_op = goal.op();
    let effective_goal = if hybrid.contains(&goal_op) {
        let mut rewritten = goal.clone();
        let _ = rewritten.set_op(suffix_predicate(&goal_op));
        rewritten
    } else {
        goal.clone()
    };
    let effective_op = effective_goal.op();

    let resolved_goal_args: Vec<Term> = effective_goal
        .args(true)
        .iter()
        .map(|t| initial_bindings.resolve(t).clone())
        .collect();
    let head_adornment = adornment_from_goal(&resolved_goal_args);
    debug!(
        "adorned goal {effective_goal} as [{}]",
        adornment_to_string(&head_adornment)
    );

    let mut clauses = Vec::new();
    for clause in rewritten_rules
        .iter()
        .filter(|c| c.head.op() == effective_op)
    {
        let sip = build_sip(clause, &head_adornment, &derived, &hybrid, params, metrics)?;
        clauses.push(AdornedClause {
            clause: clause.clone(),
            head_adornment: head_adornment.clone(),
            sip,
        });
    }

    Ok((
        AdornedProgram {
            clauses,
            derived_predicates: derived,
            hybrid_predicates: hybrid,
        },
        effective_goal,
    ))
}
