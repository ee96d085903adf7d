//! Component J (ambient stack): a generic metrics sink, monomorphized at
//! each call site so the no-metrics path costs nothing.

use std::collections::HashMap;

/// Specifies the level of metrics to collect while answering a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetricsLevel {
    /// No metrics are collected. This has zero runtime cost.
    None,
    /// Only inexpensive counters are collected.
    Counters,
    /// Detailed, potentially expensive debug information is collected.
    Debug,
}

/// A trait for collecting metrics during planning and evaluation. Keeping
/// the engine generic over `M: MetricsSink` lets the compiler eliminate all
/// metrics bookkeeping when `NoOpMetrics` is selected.
pub trait MetricsSink: Default {
    /// Increments the counter for fixpoint rounds.
    fn increment_iterations(&mut self);
    /// Records that the SIP ordering search backtracked while planning the
    /// clause with the given head (rendered via `Display`).
    fn record_sip_backtrack(&mut self, clause_head: &str);
    /// Records the number of new facts produced by a completed round.
    fn record_delta_size(&mut self, num_facts: usize);
    /// Records a single dispatch of a query against the base fact store.
    fn record_store_dispatch(&mut self);
}

/// A metrics sink that performs no operations.
#[derive(Default, Debug)]
pub struct NoOpMetrics;
impl MetricsSink for NoOpMetrics {
    fn increment_iterations(&mut self) {}
    fn record_sip_backtrack(&mut self, _clause_head: &str) {}
    fn record_delta_size(&mut self, _num_facts: usize) {}
    fn record_store_dispatch(&mut self) {}
}

/// A metrics sink that collects simple counters.
#[derive(Default, Debug)]
pub struct CounterMetrics {
    pub fixpoint_iterations: u32,
    pub sip_backtracks: u32,
    pub facts_in_deltas: u64,
    pub store_dispatches: u64,
}
impl MetricsSink for CounterMetrics {
    fn increment_iterations(&mut self) {
        self.fixpoint_iterations += 1;
    }
    fn record_sip_backtrack(&mut self, _clause_head: &str) {
        self.sip_backtracks += 1;
    }
    fn record_delta_size(&mut self, num_facts: usize) {
        self.facts_in_deltas += num_facts as u64;
    }
    fn record_store_dispatch(&mut self) {
        self.store_dispatches += 1;
    }
}

/// A metrics sink that collects per-round detail in addition to the
/// counters tracked by [`CounterMetrics`].
#[derive(Default, Debug)]
pub struct DebugMetrics {
    pub counters: CounterMetrics,
    pub delta_sizes_by_round: Vec<usize>,
    pub backtracks_by_clause: HashMap<String, u32>,
}
impl MetricsSink for DebugMetrics {
    fn increment_iterations(&mut self) {
        self.counters.increment_iterations();
    }
    fn record_sip_backtrack(&mut self, clause_head: &str) {
        self.counters.record_sip_backtrack(clause_head);
        *self
            .backtracks_by_clause
            .entry(clause_head.to_string())
            .or_insert(0) += 1;
    }
    fn record_delta_size(&mut self, num_facts: usize) {
        self.counters.record_delta_size(num_facts);
        self.delta_sizes_by_round.push(num_facts);
    }
    fn record_store_dispatch(&mut self) {
        self.counters.record_store_dispatch();
    }
}

/// The final report returned to the caller, wrapping whichever concrete
/// sink was selected for the query.
#[derive(Debug)]
pub enum MetricsReport {
    None,
    Counters(CounterMetrics),
    Debug(DebugMetrics),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_metrics_tallies_backtracks_per_clause_head() {
        let mut metrics = DebugMetrics::default();
        metrics.record_sip_backtrack("sg(X, Y) :- flat(X, Y).");
        metrics.record_sip_backtrack("sg(X, Y) :- flat(X, Y).");
        metrics.record_sip_backtrack("h(X) :- a(Y), b(Y).");

        assert_eq!(metrics.counters.sip_backtracks, 3);
        assert_eq!(
            metrics.backtracks_by_clause.get("sg(X, Y) :- flat(X, Y)."),
            Some(&2)
        );
        assert_eq!(
            metrics.backtracks_by_clause.get("h(X) :- a(Y), b(Y)."),
            Some(&1)
        );
    }
}
