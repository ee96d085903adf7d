//! Component A: uniform introspection over rule literals regardless of
//! their surface form.
//!
//! Everything else in this crate reads and edits atoms exclusively through
//! [`Literal::op`], [`Literal::args`], [`Literal::variables`] and
//! [`Literal::set_op`] — never by matching on a literal's variant directly.
//! That keeps the sum type closed and the four operations total.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A term occurring in an argument position: a logic variable, a fresh
/// (anonymous) blank node, or a ground constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Variable(String),
    BlankNode(String),
    Constant(String),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_) | Term::BlankNode(_))
    }

    pub fn as_variable_name(&self) -> Option<&str> {
        match self {
            Term::Variable(name) | Term::BlankNode(name) => Some(name),
            Term::Constant(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "?{name}"),
            Term::BlankNode(name) => write!(f, "_:{name}"),
            Term::Constant(value) => write!(f, "{value}"),
        }
    }
}

/// A builtin binary function literal, e.g. a comparison or arithmetic
/// relation applied to two terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Builtin {
    pub uri: String,
    pub argument: Term,
    pub result: Term,
}

/// One body or head literal. Closed over the four surface forms the
/// original rule language distinguishes; see §3/§9 of the design notes for
/// why this replaces dynamic dispatch on an open class hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    /// `(subject, rdf:type, classTerm)`.
    TypePredicate { subject: Term, class_term: Term },
    /// `(subject, predicate, object)`.
    GenericTriple {
        subject: Term,
        predicate: Term,
        object: Term,
    },
    Builtin(Builtin),
    /// Transparent wrapper used while a literal is existentially quantified;
    /// delegates introspection to the wrapped literal.
    ExistentialWrapper(Box<Literal>),
}

/// A literal known, for the duration of SIP construction, to be the head of
/// the clause it came from. This is the explicit substitute for the
/// original's transient `isHead` mutable flag (§9): rather than mutating a
/// literal in place, callers that need head semantics wrap it here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadLiteral(pub Literal);

impl Literal {
    /// The operator identifying this literal's predicate symbol.
    ///
    /// For a `TypePredicate` this is the class term; for a `GenericTriple`
    /// it is the predicate term; for a `Builtin` it is its URI; an
    /// `ExistentialWrapper` delegates to its inner literal.
    pub fn op(&self) -> Term {
        match self {
            Literal::TypePredicate { class_term, .. } => class_term.clone(),
            Literal::GenericTriple { predicate, .. } => predicate.clone(),
            Literal::Builtin(b) => Term::Constant(b.uri.clone()),
            Literal::ExistentialWrapper(inner) => inner.op(),
        }
    }

    /// The ordered argument list.
    ///
    /// When `second_order` is true and the operator position itself holds a
    /// variable (a "second-order" triple pattern, e.g. `?X rdf:type ?C` or
    /// `?S ?P ?O`), the operator term is included as the leading argument.
    pub fn args(&self, second_order: bool) -> Vec<Term> {
        match self {
            Literal::TypePredicate {
                subject,
                class_term,
            } => {
                if second_order && class_term.is_variable() {
                    vec![subject.clone(), class_term.clone()]
                } else {
                    vec![subject.clone()]
                }
            }
            Literal::GenericTriple {
                subject,
                predicate,
                object,
            } => {
                if second_order && predicate.is_variable() {
                    vec![predicate.clone(), subject.clone(), object.clone()]
                } else {
                    vec![subject.clone(), object.clone()]
                }
            }
            Literal::Builtin(b) => vec![b.argument.clone(), b.result.clone()],
            Literal::ExistentialWrapper(inner) => inner.args(second_order),
        }
    }

    /// The set of distinct variables (and blank nodes) appearing in this
    /// literal's operator and/or argument positions.
    pub fn variables(&self, second_order: bool) -> BTreeSet<Term> {
        let mut vars: BTreeSet<Term> = self
            .args(second_order)
            .into_iter()
            .filter(|t| t.is_variable())
            .collect();
        if !second_order {
            // The operator can still be a variable even when we are not
            // folding it into the argument list (e.g. a first-order
            // GenericTriple whose predicate happens to be bound elsewhere
            // in the body); track it so callers computing "variables this
            // literal could bind or require" see it.
            let op = self.op();
            if op.is_variable() {
                vars.insert(op);
            }
        }
        vars
    }

    /// Replaces this literal's operator, failing if the variant does not
    /// support operator replacement (only `ExistentialWrapper` recurses;
    /// every concrete variant accepts a new operator).
    pub fn set_op(&mut self, new_op: Term) -> Result<()> {
        match self {
            Literal::TypePredicate { class_term, .. } => {
                *class_term = new_op;
                Ok(())
            }
            Literal::GenericTriple { predicate, .. } => {
                *predicate = new_op;
                Ok(())
            }
            Literal::Builtin(b) => {
                let Term::Constant(uri) = new_op else {
                    return Err(EngineError::UnsupportedTermKind {
                        op: "setOp",
                        literal: self.clone(),
                    });
                };
                b.uri = uri;
                Ok(())
            }
            Literal::ExistentialWrapper(inner) => inner.set_op(new_op),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::TypePredicate {
                subject,
                class_term,
            } => write!(f, "{subject} rdf:type {class_term}"),
            Literal::GenericTriple {
                subject,
                predicate,
                object,
            } => write!(f, "{predicate}({subject}, {object})"),
            Literal::Builtin(b) => write!(f, "{}({}, {})", b.uri, b.argument, b.result),
            Literal::ExistentialWrapper(inner) => write!(f, "exists({inner})"),
        }
    }
}

/// A single body literal together with whether it is negated
/// (negation-as-failure) in its clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyLiteral {
    pub literal: Literal,
    pub negated: bool,
}

impl BodyLiteral {
    pub fn positive(literal: Literal) -> Self {
        Self {
            literal,
            negated: false,
        }
    }

    pub fn negated(literal: Literal) -> Self {
        Self {
            literal,
            negated: true,
        }
    }
}

impl fmt::Display for BodyLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not {}", self.literal)
        } else {
            write!(f, "{}", self.literal)
        }
    }
}

/// A Horn clause `head :- body`, where `body` is a (possibly empty)
/// conjunction of literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clause {
    pub head: Literal,
    pub body: Vec<BodyLiteral>,
}

impl Clause {
    pub fn fact(head: Literal) -> Self {
        Self {
            head,
            body: Vec::new(),
        }
    }

    pub fn rule(head: Literal, body: Vec<BodyLiteral>) -> Self {
        Self { head, body }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}.", self.head)
        } else {
            write!(f, "{} :- ", self.head)?;
            for (i, lit) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{lit}")?;
            }
            write!(f, ".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Term {
        Term::Variable(name.to_string())
    }

    fn constant(name: &str) -> Term {
        Term::Constant(name.to_string())
    }

    #[test]
    fn generic_triple_op_and_args_first_order() {
        let lit = Literal::GenericTriple {
            subject: var("X"),
            predicate: constant("flat"),
            object: var("Y"),
        };
        assert_eq!(lit.op(), constant("flat"));
        assert_eq!(lit.args(false), vec![var("X"), var("Y")]);
        assert_eq!(
            lit.variables(false),
            BTreeSet::from([var("X"), var("Y")])
        );
    }

    #[test]
    fn generic_triple_second_order_folds_predicate_into_args() {
        let lit = Literal::GenericTriple {
            subject: var("S"),
            predicate: var("P"),
            object: var("O"),
        };
        assert_eq!(lit.args(true), vec![var("P"), var("S"), var("O")]);
        assert_eq!(lit.args(false), vec![var("S"), var("O")]);
    }

    #[test]
    fn type_predicate_second_order_includes_class_term() {
        let lit = Literal::TypePredicate {
            subject: var("X"),
            class_term: var("C"),
        };
        assert_eq!(lit.args(true), vec![var("X"), var("C")]);
        assert_eq!(lit.args(false), vec![var("X")]);
    }

    #[test]
    fn set_op_rejects_builtin_with_non_constant_operator() {
        let mut lit = Literal::Builtin(Builtin {
            uri: "lessThan".to_string(),
            argument: var("X"),
            result: var("Y"),
        });
        assert!(lit.set_op(var("Z")).is_err());
        assert!(lit.set_op(constant("atMost")).is_ok());
    }

    #[test]
    fn clause_round_trips_through_json() {
        let clause = Clause::rule(
            Literal::GenericTriple {
                subject: var("X"),
                predicate: constant("sg"),
                object: var("Y"),
            },
            vec![BodyLiteral::positive(Literal::GenericTriple {
                subject: var("X"),
                predicate: constant("flat"),
                object: var("Y"),
            })],
        );
        let json = serde_json::to_string(&clause).expect("clause should serialize");
        let restored: Clause = serde_json::from_str(&json).expect("clause should deserialize");
        assert_eq!(clause, restored);
    }

    #[test]
    fn existential_wrapper_delegates() {
        let inner = Literal::GenericTriple {
            subject: var("X"),
            predicate: constant("p"),
            object: var("Y"),
        };
        let wrapped = Literal::ExistentialWrapper(Box::new(inner.clone()));
        assert_eq!(wrapped.op(), inner.op());
        assert_eq!(wrapped.args(false), inner.args(false));
    }
}
