//! Graph-viz rendering of SIP graphs (§6's "SIP serialization" interface):
//! one node per subgoal-occurrence and per multi-occurrence source set, with
//! edge labels listing the bindings flowing along each arc.

use std::{
    collections::{HashMap, HashSet},
    fmt::Write,
};

use petgraph::dot::Dot;
use petgraph::graph::DiGraph;

use crate::sip::{SipArc, SipGraph, SipSource};

const HEAD_NODE: &str = "head";

fn source_node_label(graph: &SipGraph, source: &SipSource) -> String {
    match source {
        SipSource::BoundHeadPredicate => HEAD_NODE.to_string(),
        SipSource::Occurrences(ids) if ids.len() == 1 => {
            occurrence_node_label(graph, ids[0])
        }
        SipSource::Occurrences(ids) => {
            let names: Vec<String> = ids
                .iter()
                .map(|&id| occurrence_node_label(graph, id))
                .collect();
            format!("{{ {} }}", names.join(", "))
        }
    }
}

fn occurrence_node_label(graph: &SipGraph, id: crate::sip::OccurrenceId) -> String {
    graph.occurrence(id).literal.to_string()
}

fn bindings_label(arc: &SipArc) -> String {
    arc.bindings
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a [`SipGraph`] as a Graphviz DOT digraph: one node per occurrence
/// (plus the head node and any multi-occurrence source set), one edge per
/// arc, labeled with the bindings it carries.
pub fn graphviz_dot(graph: &SipGraph) -> String {
    let mut g: DiGraph<String, String> = DiGraph::new();
    let mut node_ids: HashMap<String, petgraph::graph::NodeIndex> = HashMap::new();

    let mut node_id = |g: &mut DiGraph<String, String>,
                        node_ids: &mut HashMap<String, petgraph::graph::NodeIndex>,
                        label: String| {
        *node_ids
            .entry(label.clone())
            .or_insert_with(|| g.add_node(label))
    };

    for id in graph.occurrence_ids() {
        node_id(&mut g, &mut node_ids, occurrence_node_label(graph, id));
    }

    for arc in graph.arcs() {
        let source_label = source_node_label(graph, &arc.source);
        let dest_label = occurrence_node_label(graph, arc.dest);
        let source_idx = node_id(&mut g, &mut node_ids, source_label);
        let dest_idx = node_id(&mut g, &mut node_ids, dest_label);
        g.add_edge(source_idx, dest_idx, bindings_label(arc));
    }

    format!("{}", Dot::new(&g))
}

fn escape_md(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "&quot;")
        .replace('\n', "<br>")
}

/// Renders a [`SipGraph`] as a Mermaid flowchart, compatible with
/// GitHub-flavoured Mermaid — the companion textual diagram format to
/// [`graphviz_dot`], mirroring the two-format convention the ambient stack
/// already uses for proof-tree rendering.
pub fn mermaid_markdown(graph: &SipGraph) -> String {
    let mut md = String::new();
    writeln!(&mut md, "graph LR;").unwrap();

    let mut node_ids: HashMap<String, String> = HashMap::new();
    let mut nodes_declared: HashSet<String> = HashSet::new();
    let mut edges_declared: HashSet<(String, String)> = HashSet::new();
    let mut counter = 0usize;

    let mut node_id = |label: &str, counter: &mut usize, map: &mut HashMap<String, String>| {
        map.entry(label.to_string())
            .or_insert_with(|| {
                let id = format!("N{}", *counter);
                *counter += 1;
                id
            })
            .clone()
    };

    let mut declare = |id: &str, label: &str, md: &mut String, declared: &mut HashSet<String>| {
        if declared.insert(id.to_string()) {
            writeln!(md, "  {}[\"{}\"];", id, escape_md(label)).unwrap();
        }
    };

    for id in graph.occurrence_ids() {
        let label = occurrence_node_label(graph, id);
        let node = node_id(&label, &mut counter, &mut node_ids);
        declare(&node, &label, &mut md, &mut nodes_declared);
    }

    for arc in graph.arcs() {
        let source_label = source_node_label(graph, &arc.source);
        let dest_label = occurrence_node_label(graph, arc.dest);
        let source_id = node_id(&source_label, &mut counter, &mut node_ids);
        let dest_id = node_id(&dest_label, &mut counter, &mut node_ids);
        declare(&source_id, &source_label, &mut md, &mut nodes_declared);
        declare(&dest_id, &dest_label, &mut md, &mut nodes_declared);

        let edge = (source_id.clone(), dest_id.clone());
        if edges_declared.insert(edge) {
            writeln!(
                md,
                "  {} -- \"{}\" --> {};",
                source_id,
                escape_md(&bindings_label(arc)),
                dest_id
            )
            .unwrap();
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{BodyLiteral, Literal, Term};

    fn triple(s: &str, p: &str, o: &str) -> Literal {
        Literal::GenericTriple {
            subject: Term::Variable(s.to_string()),
            predicate: Term::Constant(p.to_string()),
            object: Term::Variable(o.to_string()),
        }
    }

    fn sample_graph() -> SipGraph {
        let mut g = SipGraph::new(
            triple("X", "sg", "Y"),
            vec![
                BodyLiteral::positive(triple("X", "up", "Z")),
                BodyLiteral::positive(triple("Z", "sg", "Y")),
            ],
        );
        g.add_arc(
            SipSource::BoundHeadPredicate,
            crate::sip::OccurrenceId(0),
            vec![Term::Variable("X".to_string())],
        );
        g.add_arc(
            SipSource::Occurrences(vec![crate::sip::OccurrenceId(0)]),
            crate::sip::OccurrenceId(1),
            vec![Term::Variable("Z".to_string())],
        );
        g
    }

    #[test]
    fn graphviz_dot_contains_one_edge_per_arc() {
        let g = sample_graph();
        let dot = graphviz_dot(&g);
        assert!(dot.starts_with("digraph"));
        assert_eq!(dot.matches("->").count(), g.arcs().len());
    }

    #[test]
    fn mermaid_markdown_declares_every_occurrence_node() {
        let g = sample_graph();
        let md = mermaid_markdown(&g);
        assert!(md.starts_with("graph LR;"));
        assert!(md.contains("up(?X, ?Z)"));
        assert!(md.contains("sg(?Z, ?Y)"));
        assert!(md.contains("-->"));
    }

    #[test]
    fn mermaid_markdown_does_not_duplicate_shared_nodes() {
        let g = sample_graph();
        let md = mermaid_markdown(&g);
        // The "up" occurrence is both a destination (arc 0) and a source
        // (arc 1); it must be declared only once.
        let up_declarations = md.matches("up(?X, ?Z)").count();
        assert_eq!(up_declarations, 1);
    }
}
