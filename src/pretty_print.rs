//! Pretty-printing utilities for debug logs and trace output.
//!
//! This module provides human-readable formatting for internal engine data
//! structures that are frequently logged during debugging. The goal is to
//! preserve all essential debugging information while making logs readable
//! and concise.
//!
//! ## Usage Guidelines
//!
//! ### In Log Statements
//! Use the wrapper structs for Display trait implementations:
//! ```text
//! use crate::pretty_print::*;
//!
//! // Good - using pretty-print wrapper
//! log::debug!("Clause: {}", PrettyClause(clause));
//! log::debug!("Bindings: {}", PrettyBindings(&bindings));
//!
//! // Avoid - using raw Debug formatting
//! log::debug!("Clause: {:?}", clause);
//! ```
//!
//! ### Consistency
//! - Always use pretty-printing for complex data structures in logs
//! - Use consistent formatting across all log levels (debug, info, trace, etc.)
//! - Prefer wrapper structs over format functions when possible

use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;

use crate::adornment::{adornment_to_string, AdornedClause, AdornedProgram, Adornment};
use crate::bindings::Bindings;
use crate::sip::SipGraph;
use crate::term::{BodyLiteral, Clause, Term};

/// Pretty-print a term. Variables/blank nodes already carry their `?`/`_:`
/// sigil from [`Term`]'s own `Display` impl; this exists as a stable call
/// site for inline formatting.
pub fn format_term(term: &Term) -> String {
    term.to_string()
}

/// Pretty-print an [`Adornment`] as its compact `b`/`f` string.
pub fn format_adornment(adornment: &Adornment) -> String {
    adornment_to_string(adornment)
}

/// A single body literal, with its negation marker if any.
pub fn format_body_literal(literal: &BodyLiteral) -> String {
    literal.to_string()
}

/// A clause body as a comma-joined conjunction, without the head or the
/// trailing period.
pub fn format_body(body: &[BodyLiteral]) -> String {
    body.iter().map(format_body_literal).join(", ")
}

/// Wrapper struct for pretty-printing a binding environment.
pub struct PrettyBindings<'a>(pub &'a Bindings);

impl Display for PrettyBindings<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Wrapper struct for pretty-printing a clause as `head :- body.`.
pub struct PrettyClause<'a>(pub &'a Clause);

impl Display for PrettyClause<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Wrapper struct for pretty-printing a clause body alone, without the head
/// or trailing period — useful when logging just the part a SIP ordering
/// reorders.
pub struct PrettyBody<'a>(pub &'a [BodyLiteral]);

impl Display for PrettyBody<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", format_body(self.0))
    }
}

/// Wrapper struct for pretty-printing a SIP graph as one `{ src } ->
/// bindings dest` line per arc, in arena order (not necessarily the chosen
/// ordering — see [`PrettySipOrder`] for that).
pub struct PrettySip<'a>(pub &'a SipGraph);

impl Display for PrettySip<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for arc in self.0.arcs() {
            writeln!(f, "{}", self.0.render_arc(arc))?;
        }
        Ok(())
    }
}

/// Wrapper struct for pretty-printing the chosen body ordering of a SIP
/// graph, as a comma-joined sequence of its occurrences' literals, or
/// `(unordered)` if planning hasn't run yet.
pub struct PrettySipOrder<'a>(pub &'a SipGraph);

impl Display for PrettySipOrder<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.0.sip_order {
            None => write!(f, "(unordered)"),
            Some(order) => write!(
                f,
                "{}",
                order
                    .iter()
                    .map(|&id| format_body_literal(self.0.occurrence(id)))
                    .join(", ")
            ),
        }
    }
}

/// Wrapper struct for pretty-printing one adorned clause: its head
/// adornment followed by the clause itself, e.g. `[bf] sg(X,Y) :- flat(X,Y).`.
pub struct PrettyAdornedClause<'a>(pub &'a AdornedClause);

impl Display for PrettyAdornedClause<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "[{}] {}",
            format_adornment(&self.0.head_adornment),
            self.0.clause
        )
    }
}

/// Wrapper struct for pretty-printing a full adorned program: a
/// derived/hybrid predicate summary followed by one line per adorned
/// clause.
pub struct PrettyAdornedProgram<'a>(pub &'a AdornedProgram);

impl Display for PrettyAdornedProgram<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(
            f,
            "derived: {{{}}}  hybrid: {{{}}}",
            self.0.derived_predicates.iter().join(", "),
            self.0.hybrid_predicates.iter().join(", "),
        )?;
        for adorned in &self.0.clauses {
            writeln!(f, "{}", PrettyAdornedClause(adorned))?;
        }
        Ok(())
    }
}

/// Wrapper struct for pretty-printing fixpoint round progress.
pub struct PrettyIterationSummary {
    pub iteration: usize,
    pub clauses_tried: usize,
    pub answers_found: usize,
}

impl Display for PrettyIterationSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Iteration {} complete. Clauses tried: {}, answers found: {}",
            self.iteration, self.clauses_tried, self.answers_found
        )
    }
}
