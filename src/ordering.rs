//! Component C: the SIP ordering search (`findFullSip`).
//!
//! Implemented as an explicit pull iterator over a stack of continuation
//! frames — `(prefix, carried variables, residual literals, next candidate
//! to try)` — per the design note replacing the original's recursive
//! generator (§9). Backtracking is just advancing the iterator past a
//! frame whose candidates are exhausted.

use std::collections::BTreeSet;

use log::trace;

use crate::term::{BodyLiteral, Term};

#[derive(Debug, Clone)]
struct Frame {
    prefix: Vec<usize>,
    carried: BTreeSet<Term>,
    remaining: Vec<usize>,
    /// Index into `remaining` (recursive case) or a single-shot flag
    /// (base case, where `remaining.len() == 1`) of the next candidate to
    /// try.
    cursor: usize,
}

/// Enumerates valid orderings of a clause body satisfying the SIP
/// constraint that every literal's argument variables intersect the
/// variables carried from everything ordered before it. Yields `Vec<usize>`
/// — the chosen ordering as indices into the original body slice — in a
/// deterministic, stable order (candidates are tried in their original
/// body order at each choice point).
pub struct SipOrderingSearch<'a> {
    body: &'a [BodyLiteral],
    stack: Vec<Frame>,
}

fn literal_vars(body: &[BodyLiteral], idx: usize) -> BTreeSet<Term> {
    body[idx].literal.variables(true)
}

impl<'a> SipOrderingSearch<'a> {
    /// `initial_carried` is the set of variables bound before the body
    /// starts — ordinarily the head's argument variables at the positions
    /// the incoming adornment marks bound.
    pub fn new(body: &'a [BodyLiteral], initial_carried: BTreeSet<Term>) -> Self {
        let remaining: Vec<usize> = (0..body.len()).collect();
        Self::with_seed(body, Vec::new(), initial_carried, remaining)
    }

    /// Like [`Self::new`], but starting from an already-chosen `seed_prefix`
    /// (e.g. a literal bootstrapped into the ordering because the clause
    /// head contributed no bound variables at all, §4.D) and the variables
    /// it carries, searching only over `remaining`.
    pub fn with_seed(
        body: &'a [BodyLiteral],
        seed_prefix: Vec<usize>,
        initial_carried: BTreeSet<Term>,
        remaining: Vec<usize>,
    ) -> Self {
        let stack = if remaining.is_empty() {
            if seed_prefix.is_empty() {
                Vec::new()
            } else {
                // The whole body was consumed by the seed; there is nothing
                // left to search, the seed itself is the full ordering.
                vec![Frame {
                    prefix: seed_prefix[..seed_prefix.len() - 1].to_vec(),
                    carried: initial_carried,
                    remaining: vec![*seed_prefix.last().unwrap()],
                    cursor: 0,
                }]
            }
        } else {
            vec![Frame {
                prefix: seed_prefix,
                carried: initial_carried,
                remaining,
                cursor: 0,
            }]
        };
        Self { body, stack }
    }
}

impl<'a> Iterator for SipOrderingSearch<'a> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        loop {
            let frame = self.stack.last_mut()?;

            if frame.remaining.len() == 1 {
                // Base case: tried at most once per frame.
                if frame.cursor > 0 {
                    self.stack.pop();
                    continue;
                }
                frame.cursor = 1;
                let idx = frame.remaining[0];
                let vars = literal_vars(self.body, idx);
                let intersects = !vars.is_disjoint(&frame.carried);
                trace!("candidate literal {idx} (base case): accepted={intersects}");
                if intersects {
                    let mut ordering = frame.prefix.clone();
                    ordering.push(idx);
                    self.stack.pop();
                    return Some(ordering);
                }
                self.stack.pop();
                continue;
            }

            if frame.cursor >= frame.remaining.len() {
                self.stack.pop();
                continue;
            }

            let cand_pos = frame.cursor;
            frame.cursor += 1;
            let idx = frame.remaining[cand_pos];
            let vars = literal_vars(self.body, idx);
            if vars.is_disjoint(&frame.carried) {
                // No incoming arc from the prefix; not a valid next step.
                trace!("candidate literal {idx} rejected: no carried variable reaches it");
                continue;
            }
            trace!("candidate literal {idx} accepted, extending prefix");

            let mut new_carried = frame.carried.clone();
            new_carried.extend(vars);
            let mut new_remaining = frame.remaining.clone();
            new_remaining.remove(cand_pos);
            let mut new_prefix = frame.prefix.clone();
            new_prefix.push(idx);
            self.stack.push(Frame {
                prefix: new_prefix,
                carried: new_carried,
                remaining: new_remaining,
                cursor: 0,
            });
        }
    }
}

/// The "proper SIP order with negation" policy (§4.C): an ordering is
/// acceptable only if every negated literal appears after every literal
/// that contributes to its variable bindings. We approximate "contributes
/// to its bindings" as "shares at least one variable with it and is
/// positive", which is exactly the set of literals the ordering search
/// itself would have had to draw on to carry those variables forward.
pub fn is_proper_order_with_negation(body: &[BodyLiteral], ordering: &[usize]) -> bool {
    for (pos, &idx) in ordering.iter().enumerate() {
        if !body[idx].negated {
            continue;
        }
        let neg_vars = literal_vars(body, idx);
        // Find every positive literal anywhere in the body sharing a
        // variable with this negated literal; all of them must precede it.
        for (other_idx, other_lit) in body.iter().enumerate() {
            if other_idx == idx || other_lit.negated {
                continue;
            }
            let other_vars = literal_vars(body, other_idx);
            if neg_vars.is_disjoint(&other_vars) {
                continue;
            }
            let other_pos = ordering.iter().position(|&i| i == other_idx);
            match other_pos {
                Some(other_pos) if other_pos < pos => {}
                _ => return false,
            }
        }
    }
    true
}

/// Finds the first ordering produced by the search that also satisfies the
/// negation policy. Returns `None` if the search is exhausted without
/// producing one — the caller surfaces this as `InvalidSip` (§7).
pub fn find_full_sip(
    body: &[BodyLiteral],
    initial_carried: BTreeSet<Term>,
) -> Option<Vec<usize>> {
    SipOrderingSearch::new(body, initial_carried)
        .find(|ordering| is_proper_order_with_negation(body, ordering))
}
