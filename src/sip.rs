//! Component B: the Sideways Information Passing graph.
//!
//! Nodes and arcs are stored in a flat arena (`occurrences`/`arcs`) indexed
//! by integer handles rather than through cyclic references, per the arena
//! design note in §9: a subgoal-occurrence node is an index into
//! `occurrences`, and a "source set" is simply an ordered `Vec` of such
//! indices carried directly on the arc that needs it.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use hex::ToHex;

use crate::term::{BodyLiteral, Literal, Term};

/// The magic-predicate namespace (§6): IRIs typing the nodes and edges of a
/// SIP graph's RDF serialization.
pub const MAGIC_SIP_ARC: &str = "magic:SipArc";
pub const MAGIC_BOUND_HEAD_PREDICATE: &str = "magic:BoundHeadPredicate";
pub const MAGIC_BINDINGS: &str = "magic:bindings";
pub const MAGIC_SOURCE: &str = "magic:source";
pub const MAGIC_DEST: &str = "magic:dest";
pub const RDF_TYPE: &str = "rdf:type";

/// A stable handle to one subgoal occurrence within a single SIP graph.
/// Two occurrences of the same predicate in a body are distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OccurrenceId(pub usize);

/// Where a SIP arc originates: either the adorned head (marked as the
/// `BoundHeadPredicate` node in the original design) or an ordered set of
/// one or more preceding subgoal occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SipSource {
    BoundHeadPredicate,
    Occurrences(Vec<OccurrenceId>),
}

/// One SIP arc `N --X--> q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipArc {
    pub source: SipSource,
    pub bindings: Vec<Term>,
    pub dest: OccurrenceId,
}

/// A computed occurrence identifier: `op(L)` concatenated with its ordered
/// arguments. Stable across rebuilds of the same clause because it is
/// derived purely from the literal's structure, and injective within one
/// body because occurrence index is folded in to disambiguate a predicate
/// occurring twice (§3, Occurrence Identifier / invariant 3).
pub fn occurrence_key(literal: &Literal, index_in_body: usize) -> String {
    let mut key = format!("{}", literal.op());
    for arg in literal.args(true) {
        key.push('|');
        key.push_str(&arg.to_string());
    }
    key.push('#');
    key.push_str(&index_in_body.to_string());
    key
}

/// The SIP graph for a single clause: its arena of subgoal occurrences, the
/// arcs recorded by the adornment driver while folding the chosen body
/// ordering, and (once planning completes) the chosen ordering itself.
#[derive(Debug, Clone)]
pub struct SipGraph {
    pub head: Literal,
    occurrences: Vec<BodyLiteral>,
    arcs: Vec<SipArc>,
    pub sip_order: Option<Vec<OccurrenceId>>,
}

impl SipGraph {
    pub fn new(head: Literal, body: Vec<BodyLiteral>) -> Self {
        Self {
            head,
            occurrences: body,
            arcs: Vec::new(),
            sip_order: None,
        }
    }

    pub fn occurrence(&self, id: OccurrenceId) -> &BodyLiteral {
        &self.occurrences[id.0]
    }

    pub fn occurrence_ids(&self) -> impl Iterator<Item = OccurrenceId> + '_ {
        (0..self.occurrences.len()).map(OccurrenceId)
    }

    pub fn arcs(&self) -> &[SipArc] {
        &self.arcs
    }

    /// Construction API (§4.B): records an arc `left --variables--> right`.
    /// `variables` is expected to already be the bindings flowing along the
    /// arc (the intersection computed by the caller, the adornment
    /// driver); this method only records the arc, it does not itself
    /// compute the intersection.
    pub fn add_arc(&mut self, left: SipSource, right: OccurrenceId, variables: Vec<Term>) {
        self.arcs.push(SipArc {
            source: left,
            bindings: variables,
            dest: right,
        });
    }

    /// Query API (§4.B): every arc terminating at `q`, as
    /// `(source_list, binding_list)` pairs. `source_list` is a singleton
    /// `[head]`-shaped marker for head-originating arcs, or the ordered
    /// members of the source occurrence set otherwise.
    pub fn incoming_arcs(&self, q: OccurrenceId) -> impl Iterator<Item = &SipArc> {
        self.arcs.iter().filter(move |arc| arc.dest == q)
    }

    /// A SIP graph is valid iff it has at least one arc and every arc's
    /// bindings list is non-empty (invariant 2).
    pub fn is_valid(&self) -> bool {
        !self.arcs.is_empty() && self.arcs.iter().all(|arc| !arc.bindings.is_empty())
    }

    /// Drops every arc whose destination's operator is outside
    /// `keep_predicates` — the "arcs into derived predicates only"
    /// generalization (§4.D step 4, with the corrected reading of
    /// `hybridPreds2Replace` as a collection per §9's open question: an arc
    /// survives iff its destination is in the derived set **or** the
    /// hybrid-replacement set, both folded into `keep_predicates` by the
    /// caller).
    pub fn retain_arcs_into(&mut self, keep_predicates: &BTreeSet<Term>) {
        self.arcs.retain(|arc| {
            let dest_op = self.occurrences[arc.dest.0].literal.op();
            keep_predicates.contains(&dest_op)
        });
    }

    /// Serializes this graph to RDF triples under the magic-predicate
    /// namespace (§6): one blank node per arc, typed `magic:SipArc`, with
    /// `magic:source`/`magic:dest` edges to its endpoints and a
    /// `magic:bindings` edge per carried variable. A head-originating arc's
    /// source is a blank node typed `magic:BoundHeadPredicate` instead of an
    /// occurrence.
    ///
    /// Blank-node identities are derived by hashing the arc's (or
    /// occurrence's) structural key, so the same graph always serializes to
    /// the same blank-node ids — the "round-trip... yields the same arc set
    /// (modulo blank-node renaming)" property of §8 follows from this being
    /// a deterministic function of content, not insertion order.
    pub fn to_rdf_triples(&self) -> Vec<(Term, Term, Term)> {
        let mut triples = Vec::new();

        let occurrence_node = |id: OccurrenceId| -> Term {
            Term::BlankNode(blank_id(
                "occurrence",
                &occurrence_key(&self.occurrences[id.0].literal, id.0),
            ))
        };

        for (arc_index, arc) in self.arcs.iter().enumerate() {
            let arc_node = Term::BlankNode(blank_id("arc", &arc_index.to_string()));
            triples.push((
                arc_node.clone(),
                Term::Constant(RDF_TYPE.to_string()),
                Term::Constant(MAGIC_SIP_ARC.to_string()),
            ));

            match &arc.source {
                SipSource::BoundHeadPredicate => {
                    let head_node = Term::BlankNode(blank_id("head", &self.head.to_string()));
                    triples.push((
                        head_node.clone(),
                        Term::Constant(RDF_TYPE.to_string()),
                        Term::Constant(MAGIC_BOUND_HEAD_PREDICATE.to_string()),
                    ));
                    triples.push((
                        arc_node.clone(),
                        Term::Constant(MAGIC_SOURCE.to_string()),
                        head_node,
                    ));
                }
                SipSource::Occurrences(ids) => {
                    for &id in ids {
                        triples.push((
                            arc_node.clone(),
                            Term::Constant(MAGIC_SOURCE.to_string()),
                            occurrence_node(id),
                        ));
                    }
                }
            }

            triples.push((
                arc_node.clone(),
                Term::Constant(MAGIC_DEST.to_string()),
                occurrence_node(arc.dest),
            ));

            for binding in &arc.bindings {
                triples.push((
                    arc_node.clone(),
                    Term::Constant(MAGIC_BINDINGS.to_string()),
                    binding.clone(),
                ));
            }
        }

        triples
    }

    /// Human-readable per-arc representation: `{ src1, src2, … } -> X1, X2, … q`.
    pub fn render_arc(&self, arc: &SipArc) -> String {
        let sources = match &arc.source {
            SipSource::BoundHeadPredicate => format!("{{ {} }}", self.head.op()),
            SipSource::Occurrences(ids) => {
                let names: Vec<String> = ids
                    .iter()
                    .map(|id| self.occurrences[id.0].literal.op().to_string())
                    .collect();
                format!("{{ {} }}", names.join(", "))
            }
        };
        let bindings: Vec<String> = arc.bindings.iter().map(|t| t.to_string()).collect();
        let dest = self.occurrences[arc.dest.0].literal.op();
        format!("{} -> {} {}", sources, bindings.join(", "), dest)
    }
}

impl fmt::Display for SipGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for arc in &self.arcs {
            writeln!(f, "{}", self.render_arc(arc))?;
        }
        Ok(())
    }
}

/// Derives a stable blank-node identifier for `key` within `namespace`, so
/// the same structural content always serializes to the same id regardless
/// of build order.
fn blank_id(namespace: &str, key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    namespace.hash(&mut hasher);
    key.hash(&mut hasher);
    let digest = hasher.finish().to_be_bytes();
    format!("{namespace}_{}", digest.encode_hex::<String>())
}
