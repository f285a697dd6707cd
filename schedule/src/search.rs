//! Beam search over partial schedules.
//!
//! The frontier is a priority queue of partial schedules keyed by ascending
//! cost, trimmed to the beam size before each expansion pass. Scheduling
//! proceeds strictly in DAG order, so every state at depth `k` has the first
//! `k` functions scheduled; a state with every function scheduled is a
//! solution and is returned immediately when it reaches the front.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::cost::CostBreakdown;
use crate::dag::{FunctionDAG, NodeId};
use crate::error::Result;
use crate::tree::PartialScheduleNode;

/// One search state: a partial schedule, its cost, and how many functions
/// have been scheduled so far.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub root: PartialScheduleNode,
    pub cost: f64,
    pub num_scheduled: usize,
}

impl State {
    /// Recompute this state's cost from scratch.
    ///
    /// The essential lower-bound cost of every function scheduled so far is
    /// subtracted, so cost measures redundant work and is comparable across
    /// partial states.
    pub fn calculate_cost(&mut self, dag: &FunctionDAG) -> Result<()> {
        let mut compute_site = HashMap::new();
        let mut overcompute = HashMap::new();
        self.cost = self.root.cost(dag, &mut compute_site, &mut overcompute, 1, None, None)?;
        for i in 0..self.num_scheduled {
            self.cost -= self.root.get_bounds(NodeId(i), dag)?.min_cost;
        }
        Ok(())
    }

    /// Enumerate every legal way to schedule the next function, feeding each
    /// successor state to `accept`.
    pub fn generate_children(&self, dag: &FunctionDAG, mut accept: impl FnMut(State)) -> Result<()> {
        assert!(self.root.is_root());
        if self.num_scheduled == dag.num_nodes() {
            return Ok(());
        }

        let f = NodeId(self.num_scheduled);
        for e in dag.outgoing_edges(f) {
            assert!(
                self.root.computes(e.consumer),
                "partially scheduled pipeline does not compute {}, a consumer of {}",
                dag.node(e.consumer).func.name(),
                dag.node(f).func.name()
            );
        }

        // 1) Inline it.
        if !dag.outgoing(f).is_empty() {
            let mut child = self.clone();
            child.root = child.root.inline_func(f, dag);
            child.num_scheduled += 1;
            child.calculate_cost(dag)?;
            assert!(child.root.computes(f), "failed to inline {}", dag.node(f).func.name());
            accept(child);
        }

        // 2) Realize it somewhere.
        for n in self.root.compute_in_tiles(f, dag, None, false)? {
            let mut child = self.clone();
            child.root = n;
            child.num_scheduled += 1;
            child.calculate_cost(dag)?;
            assert!(child.root.computes(f), "failed to inject realization of {}", dag.node(f).func.name());
            accept(child);
        }
        Ok(())
    }

    /// Render the schedule tree for logging and comparison.
    pub fn dump(&self, dag: &FunctionDAG) -> String {
        let mut out = format!("state with cost {}:\n", self.cost);
        self.root.dump_into("", dag, &mut out);
        out
    }

    /// Log the predicted per-function cost split into compute and memory,
    /// folding inlined functions' edge costs into their consumers. Returns
    /// `(function, compute_cost, memory_cost)` per realized function.
    pub fn predicted_runtimes(&self, dag: &FunctionDAG) -> Result<Vec<(NodeId, f64, f64)>> {
        let mut breakdown = CostBreakdown::default();
        let mut compute_site = HashMap::new();
        let mut overcompute = HashMap::new();
        self.root.cost(dag, &mut compute_site, &mut overcompute, 1, None, Some(&mut breakdown))?;

        // Inlined functions have no storage of their own; attribute the
        // traffic of their producers to their consumers' edges.
        for i in (0..dag.num_nodes()).rev() {
            let f = NodeId(i);
            if breakdown.inlined.contains(&f) {
                let c: f64 =
                    dag.incoming(f).iter().map(|e| breakdown.edge_costs.get(e).copied().unwrap_or(0.0)).sum();
                for &e in dag.outgoing(f) {
                    *breakdown.edge_costs.entry(e).or_insert(0.0) += c;
                }
            }
        }

        let mut report = Vec::new();
        for i in 0..dag.num_nodes() {
            let f = NodeId(i);
            let Some(&compute_cost) = breakdown.node_costs.get(&f) else { continue };
            let mem_cost: f64 =
                dag.incoming(f).iter().map(|e| breakdown.edge_costs.get(e).copied().unwrap_or(0.0)).sum();
            tracing::debug!(
                "func {} has costs: {} = {} + {}",
                dag.node(f).func.name(),
                compute_cost + mem_cost,
                compute_cost,
                mem_cost
            );
            report.push((f, compute_cost, mem_cost));
        }
        Ok(report)
    }
}

struct HeapEntry {
    cost: f64,
    seq: u64,
    state: State,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Lowest cost wins; ties go to the earliest insertion so runs reproduce.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .expect("schedule costs are finite")
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn tick(counter: u32, progress: f64) {
    if counter & 1023 != 0 {
        return;
    }
    let progress = progress * 78.0;
    let spinner = ['/', '-', '\\', '|'][((counter >> 10) % 4) as usize];
    let mut bar = String::with_capacity(80);
    bar.push('[');
    for j in 0..78 {
        if (j as f64) < progress {
            bar.push('.');
        } else if (j as f64) - 1.0 < progress {
            bar.push(spinner);
        } else {
            bar.push(' ');
        }
    }
    bar.push(']');
    tracing::debug!("{bar}");
}

/// Run a beam search with the given beam size and return the cheapest
/// complete schedule found.
pub fn optimal_schedule(dag: &FunctionDAG, beam_size: usize) -> Result<State> {
    let mut q: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut seq: u64 = 0;
    let mut counter: u32 = 0;

    q.push(HeapEntry { cost: 0.0, seq, state: State::default() });
    seq += 1;

    loop {
        assert!(!q.is_empty(), "beam search frontier unexpectedly empty");

        if q.len() > beam_size {
            let mut trimmed = BinaryHeap::with_capacity(beam_size);
            for _ in 0..beam_size {
                trimmed.push(q.pop().expect("queue is larger than the beam"));
            }
            q = trimmed;
        }

        let mut pending = std::mem::take(&mut q);
        while let Some(entry) = pending.pop() {
            let state = entry.state;
            if state.num_scheduled == dag.num_nodes() {
                return Ok(state);
            }
            state.generate_children(dag, |child| {
                counter = counter.wrapping_add(1);
                tick(counter, child.num_scheduled as f64 / dag.num_nodes() as f64);
                q.push(HeapEntry { cost: child.cost, seq, state: child });
                seq += 1;
            })?;
        }
    }
}
