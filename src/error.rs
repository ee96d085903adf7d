use thiserror::Error;

use crate::term::Literal;

/// The crate-wide error type, covering SIP planning, term introspection, and
/// store dispatch failures.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No body ordering of the clause satisfies the SIP arc-validity
    /// conditions: the ordering search exhausted every candidate without
    /// producing a full ordering. What `build_sip` actually returns once its
    /// search loop runs dry (§7: "the SIP enumerator produced no orderings;
    /// surfaced as InvalidSIP").
    #[error("no valid SIP ordering for clause with head {head}")]
    InvalidSip { head: String },

    /// `op`/`args`/`setOp` invoked on a literal variant that does not
    /// support the requested introspection.
    #[error("unsupported term kind for operation {op} on {literal:?}")]
    UnsupportedTermKind { op: &'static str, literal: Literal },

    /// The base fact store rejected a dispatched query.
    #[error("base store query failed: {0}")]
    StoreQueryFailed(String),

    /// Two binding environments disagreed on a shared variable. Recovered
    /// locally by the caller (the candidate solution is discarded); exposed
    /// publicly only so tests can assert on it directly.
    #[error("binding merge conflict on variable {variable}")]
    MergeConflict { variable: String },

    /// The fixpoint evaluation for a goal ran past
    /// `EvalParams::max_fixpoint_rounds` without converging. An ambient
    /// backstop (§10.I) against a fact store or rule set that violates the
    /// finite-Herbrand-base precondition §4.E's termination argument relies
    /// on; distinct from `InvalidSip`, which covers the SIP ordering search
    /// itself finding no valid ordering.
    #[error("fixpoint round budget exceeded for clause with head {head}")]
    PlanningExhausted { head: String },

    /// An `EvalParams` value described an impossible configuration (e.g. a
    /// zero round budget).
    #[error("invalid evaluation configuration: {0}")]
    ConfigError(String),

    /// A derived predicate accumulated more distinct bound-argument tuples
    /// than `EvalParams::max_magic_facts_per_predicate` allows during a
    /// single goal's evaluation.
    #[error("magic fact limit ({limit}) exceeded for predicate {predicate}")]
    MagicFactLimitExceeded { predicate: String, limit: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;
