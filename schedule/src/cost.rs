//! The cost model over partial schedules.
//!
//! A single recursion over the schedule tree accumulates compute cost for
//! every realized function, memory transfer cost for every producer-to-
//! consumer edge, and compute cost for inlined functions. Along the way it
//! records where each function is computed and how much over-compute its
//! innermost loop implies.

use std::collections::{HashMap, HashSet};

use crate::dag::{EdgeId, FunctionDAG, NodeId};
use crate::error::Result;
use crate::tree::PartialScheduleNode;

/// Optional per-function and per-edge cost attribution, for reporting.
#[derive(Debug, Default)]
pub struct CostBreakdown {
    pub node_costs: HashMap<NodeId, f64>,
    pub edge_costs: HashMap<EdgeId, f64>,
    pub inlined: HashSet<NodeId>,
}

impl PartialScheduleNode {
    /// Cost of this subtree given `instances` iterations of the enclosing
    /// loops. `compute_site` records, for each function, the node containing
    /// its realization; `overcompute` the redundancy factor of its innermost
    /// loop.
    pub fn cost<'a>(
        &'a self,
        dag: &FunctionDAG,
        compute_site: &mut HashMap<NodeId, &'a PartialScheduleNode>,
        overcompute: &mut HashMap<NodeId, f64>,
        instances: i64,
        parent: Option<&'a PartialScheduleNode>,
        mut breakdown: Option<&mut CostBreakdown>,
    ) -> Result<f64> {
        if let Some(f) = self.func
            && !compute_site.contains_key(&f)
        {
            compute_site.insert(f, parent.expect("non-root nodes have a parent"));
        }

        let mut result = 0.0;

        let mut subinstances = instances;
        for &s in &self.size {
            subinstances *= s;
        }
        if self.innermost {
            // The innermost loop rounds up to whole vectors; bill the waste
            // in the tail, plus a small constant per-iteration boundary
            // overhead.
            let ideal_subinstances = subinstances;
            subinstances /= self.size[0];
            subinstances *= ((self.size[0] + 15) / 16) * 16;

            let mut factor = subinstances as f64 / ideal_subinstances as f64;
            factor *= (self.size[0] as f64 + 0.01) / self.size[0] as f64;
            overcompute.insert(self.func.expect("innermost loops iterate a function"), factor);
        }

        for c in &self.children {
            result += c.cost(dag, compute_site, overcompute, subinstances, Some(self), breakdown.as_deref_mut())?;
        }

        // Bill compute and memory for every function realized at this level.
        for &f in &self.store_at {
            let bounds_realized = self.get_bounds(f, dag)?;
            let mut points = 1.0;
            for p in &bounds_realized.region {
                points *= (p.1 - p.0 + 1) as f64;
            }
            let node = dag.node(f);

            // Most recompute comes from overlapping realizations, which
            // sliding avoids; what remains is the vectorization of the
            // innermost loop.
            let mut compute_cost = node.compute * points * subinstances as f64;
            compute_cost *= overcompute
                .get(&f)
                .copied()
                .expect("a realized function has an innermost loop below its storage");

            if let Some(b) = breakdown.as_deref_mut() {
                b.node_costs.insert(f, compute_cost);
            }

            // A locality discount from assumed storage folding: when the
            // compute site is strictly inner, the working set shrinks to the
            // folded extent. Slightly above 1 to cover fold bookkeeping.
            let site = *compute_site.get(&f).expect("a realized function has a compute site");
            let mut discount = 1.0;
            if !std::ptr::eq(site, self) {
                let bounds_computed = site.get_bounds(f, dag)?;
                discount = 1.01;
                for i in (0..bounds_realized.region.len()).rev() {
                    let r = bounds_realized.region[i];
                    let c = bounds_computed.region[i];
                    let er = r.1 - r.0 + 1;
                    let ec = c.1 - c.0 + 1;
                    if er == ec {
                        continue;
                    }
                    discount = ec as f64 / er as f64;
                    break;
                }
                if breakdown.is_some() {
                    tracing::debug!("folding discount for {}: {discount}", node.func.name());
                }
            }

            // Memory cost is cold loads times cost per cold load; the
            // discount cheapens each load but does not remove any. It is
            // billed once per consuming edge plus a baseline.
            let cost_per_cold_load = (discount * points).ln();
            let num_cold_loads = instances as f64 * points;
            let mem_cost = node.memory * num_cold_loads * cost_per_cold_load;
            for &e in dag.outgoing(f) {
                result += mem_cost;
                if let Some(b) = breakdown.as_deref_mut() {
                    b.edge_costs.insert(e, mem_cost);
                }
            }

            result += mem_cost + compute_cost;
        }

        // Bill compute for every function inlined into this loop body.
        for (&f, &calls) in &self.inlined {
            result += dag.node(f).compute_if_inlined * subinstances as f64 * calls as f64;
            if let Some(b) = breakdown.as_deref_mut() {
                b.inlined.insert(f);
            }
        }

        Ok(result)
    }
}
