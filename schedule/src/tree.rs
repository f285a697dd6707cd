//! The partial-schedule tree.
//!
//! A partial schedule is a tree of loop nests under construction. Each node
//! is some portion of the loop nest of one function: leaves are innermost
//! loops, interior nodes are loops over tiles. The root is a sentinel with
//! no function; its children are computed at root level.
//!
//! Sibling schedules share untouched subtrees through `Rc`; any path a
//! successor modifies is freshly allocated.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use mosaic_ir::expr::Expr;
use mosaic_ir::{as_const_int, simplify, substitute};
use smallvec::{SmallVec, smallvec};

use crate::dag::{FunctionDAG, NodeId};
use crate::error::{MissingOutputEstimateSnafu, NonConstantBoundSnafu, Result};
use crate::tilings::generate_tilings;

/// The concrete region of a function required for one representative
/// iteration of a loop node, with the minimum work it implies.
#[derive(Debug, Clone)]
pub struct Bound {
    /// Inclusive integer interval per dimension.
    pub region: SmallVec<[(i64, i64); 4]>,
    /// Minimum possible number of points evaluated.
    pub min_points: i64,
    /// Minimum possible compute cost.
    pub min_cost: f64,
}

/// One node of a partial schedule.
#[derive(Debug, Clone, Default)]
pub struct PartialScheduleNode {
    /// The function this loop nest iterates; `None` marks the root sentinel.
    pub func: Option<NodeId>,

    /// Is this the innermost loop of its function?
    pub innermost: bool,

    /// May this loop still be tiled?
    pub tileable: bool,

    /// Loop extent per dimension.
    pub size: SmallVec<[i64; 4]>,

    /// Loop nests inside this loop.
    pub children: Vec<Rc<PartialScheduleNode>>,

    /// Functions inlined into this loop body and their call counts.
    /// Meaningful only at innermost leaves.
    pub inlined: BTreeMap<NodeId, i64>,

    /// Functions whose storage is allocated at this loop level.
    pub store_at: BTreeSet<NodeId>,

    /// Memoized bounds, per function. Computed lazily.
    pub(crate) bounds: RefCell<HashMap<NodeId, Bound>>,
}

impl PartialScheduleNode {
    pub fn is_root(&self) -> bool {
        self.func.is_none()
    }

    fn describe(&self, dag: &FunctionDAG) -> String {
        match self.func {
            None => "root".to_string(),
            Some(f) => dag.node(f).func.name(),
        }
    }

    /// The total bounds required of `f` for one representative iteration of
    /// this loop.
    ///
    /// At the root, output bounds come from the user's estimates. Everywhere
    /// else they are derived from the bounds of `f`'s consumers by
    /// substituting into the edge footprints. When several consumers touch
    /// `f`, the per-dimension minimum of both endpoints is taken: the result
    /// is the minimum plausible footprint, used as a lower bound, not a true
    /// union.
    pub fn get_bounds(&self, f: NodeId, dag: &FunctionDAG) -> Result<Bound> {
        if let Some(b) = self.bounds.borrow().get(&f) {
            return Ok(b.clone());
        }
        let node = dag.node(f);
        let bound = if dag.outgoing(f).is_empty() && self.is_root() {
            let func = &node.func;
            let estimates = func.schedule().estimates.clone();
            let mut by_var: HashMap<String, (i64, i64)> = HashMap::new();
            let mut min_points: i64 = 1;
            for b in &estimates {
                let i_min = match as_const_int(&simplify(&b.min)) {
                    Some(v) => v,
                    None => {
                        return NonConstantBoundSnafu {
                            context: format!("estimate on \"{}\"", func.name()),
                            expr: b.min.to_string(),
                        }
                        .fail();
                    }
                };
                let i_extent = match as_const_int(&simplify(&b.extent)) {
                    Some(v) => v,
                    None => {
                        return NonConstantBoundSnafu {
                            context: format!("estimate on \"{}\"", func.name()),
                            expr: b.extent.to_string(),
                        }
                        .fail();
                    }
                };
                by_var.insert(b.var.clone(), (i_min, i_min + i_extent - 1));
                min_points *= i_extent;
            }
            let mut region = SmallVec::new();
            for (dim, arg) in func.args().iter().enumerate() {
                let Some(&r) = by_var.get(arg) else {
                    return MissingOutputEstimateSnafu { func: func.name(), dim }.fail();
                };
                region.push(r);
            }
            Bound { region, min_points, min_cost: min_points as f64 * node.compute }
        } else {
            assert!(
                !dag.outgoing(f).is_empty(),
                "no consumers of {} at loop over {}",
                node.func.name(),
                self.describe(dag)
            );
            let mut calls_if_inlined: i64 = 0;
            let mut region: SmallVec<[(i64, i64); 4]> = SmallVec::new();
            for e in dag.outgoing_edges(f) {
                let c_bounds = self.get_bounds(e.consumer, dag)?;
                let consumer_name = dag.node(e.consumer).func.name();
                let mut subs = HashMap::new();
                for (i, p) in c_bounds.region.iter().enumerate() {
                    subs.insert(format!("{consumer_name}.{i}.min"), Expr::int(p.0));
                    subs.insert(format!("{consumer_name}.{i}.max"), Expr::int(p.1));
                }
                calls_if_inlined += c_bounds.min_points * e.calls;
                for (i, interval) in e.bounds.iter().enumerate() {
                    let lo = simplify(&substitute(&subs, &interval.min));
                    let hi = simplify(&substitute(&subs, &interval.max));
                    let (Some(lo), Some(hi)) = (as_const_int(&lo), as_const_int(&hi)) else {
                        panic!("footprint of {} did not fold to constants: [{lo}, {hi}]", node.func.name());
                    };
                    if i >= region.len() {
                        region.push((lo, hi));
                    } else {
                        region[i].0 = region[i].0.min(lo);
                        region[i].1 = region[i].1.min(hi);
                    }
                }
            }
            let mut points_if_realized: i64 = 1;
            for r in &region {
                points_if_realized *= r.1 - r.0 + 1;
            }
            assert!(!region.is_empty(), "empty bounds region for {}", node.func.name());
            Bound {
                region,
                min_points: points_if_realized.min(calls_if_inlined),
                min_cost: (points_if_realized as f64 * node.compute)
                    .min(calls_if_inlined as f64 * node.compute_if_inlined),
            }
        };
        self.bounds.borrow_mut().insert(f, bound.clone());
        Ok(bound)
    }

    /// Does any loop in this subtree call `f`?
    pub fn calls(&self, f: NodeId, dag: &FunctionDAG) -> bool {
        if self.children.iter().any(|c| c.calls(f, dag)) {
            return true;
        }
        for e in dag.outgoing_edges(f) {
            if Some(e.consumer) == self.func {
                return true;
            }
            if self.inlined.contains_key(&e.consumer) {
                return true;
            }
        }
        false
    }

    /// Is `f` scheduled (inlined or realized) somewhere in this subtree?
    pub fn computes(&self, f: NodeId) -> bool {
        self.func == Some(f) || self.inlined.contains_key(&f) || self.children.iter().any(|c| c.computes(f))
    }

    /// A copy of this subtree with `f` inlined into every loop body that
    /// calls it.
    pub fn inline_func(&self, f: NodeId, dag: &FunctionDAG) -> PartialScheduleNode {
        let mut result = self.clone();
        for (i, c) in self.children.iter().enumerate() {
            if c.calls(f, dag) {
                result.children[i] = Rc::new(c.inline_func(f, dag));
            }
        }
        if self.innermost {
            let mut calls: i64 = 0;
            for e in dag.outgoing_edges(f) {
                if let Some(n) = self.inlined.get(&e.consumer) {
                    calls += n * e.calls;
                }
                if Some(e.consumer) == self.func {
                    calls += e.calls;
                }
            }
            if calls != 0 {
                result.inlined.insert(f, calls);
            }
        }
        result
    }

    /// Append a fresh innermost loop evaluating `f`'s required region
    /// directly at this level.
    pub fn compute_here(&mut self, f: NodeId, dag: &FunctionDAG) -> Result<()> {
        let bounds = self.get_bounds(f, dag)?;
        let mut node = PartialScheduleNode {
            func: Some(f),
            innermost: true,
            tileable: true,
            ..Default::default()
        };
        // Seed the new loop's own bounds with a single representative point.
        let mut single_point =
            Bound { region: SmallVec::new(), min_points: 1, min_cost: dag.node(f).compute };
        for i in 0..dag.node(f).func.dimensions() {
            node.size.push(bounds.region[i].1 - bounds.region[i].0 + 1);
            single_point.region.push((bounds.region[i].0, bounds.region[i].0));
        }
        node.bounds.borrow_mut().insert(f, single_point);
        self.children.push(Rc::new(node));
        Ok(())
    }

    /// Every legal way to realize `f` within this subtree: directly at this
    /// level, at the outer loop of some tiling of this nest (optionally with
    /// storage held here while compute slides further in), or pushed into
    /// the single child that calls it.
    pub fn compute_in_tiles(
        &self,
        f: NodeId,
        dag: &FunctionDAG,
        parent: Option<&PartialScheduleNode>,
        in_realization: bool,
    ) -> Result<Vec<PartialScheduleNode>> {
        let mut result = Vec::new();

        // Which child could this be fused into?
        let mut child: Option<usize> = None;
        let mut called_by_multiple_children = false;
        for (i, c) in self.children.iter().enumerate() {
            if c.calls(f, dag) {
                if child.is_some() {
                    called_by_multiple_children = true;
                }
                child = Some(i);
            }
        }

        {
            // Place the computation inside this loop.
            let mut r = self.clone();
            r.compute_here(f, dag)?;
            if !in_realization {
                r.store_at.insert(f);
            }
            result.push(r);
        }

        if dag.outgoing(f).is_empty() {
            // Can't tile outputs.
            return Ok(result);
        }

        if self.tileable {
            let tilings = generate_tilings(&self.size, self.size.len() as isize - 1, !in_realization);
            for t in tilings {
                if let Some(p) = parent
                    && p.is_root()
                {
                    // Root-level tilings must supply enough parallel work to
                    // avoid nested parallelism further in.
                    let total: i64 = t.iter().product();
                    if total < 16 {
                        continue;
                    }
                }

                // Tile this loop and place the computation at the coarser
                // granularity. The inner loop starts as a 1x1x... tile and
                // inherits the former children and bounds.
                let mut outer = self.clone();
                let mut inner = PartialScheduleNode {
                    func: self.func,
                    innermost: self.innermost,
                    tileable: self.tileable,
                    size: smallvec![1; self.size.len()],
                    ..Default::default()
                };

                inner.children = std::mem::take(&mut outer.children);
                inner.inlined = std::mem::take(&mut outer.inlined);
                inner.store_at = std::mem::take(&mut outer.store_at);
                *inner.bounds.borrow_mut() = std::mem::take(&mut *outer.bounds.borrow_mut());

                let func = self.func.expect("the root is never tileable");
                let mut outer_bound = inner
                    .bounds
                    .borrow()
                    .get(&func)
                    .cloned()
                    .expect("a tileable loop carries bounds for its own function");
                outer.innermost = false;

                // Move tile factors from the outer loop to the inner one.
                let parent_bounds =
                    parent.expect("tiling happens below the root").get_bounds(func, dag)?;
                for (i, &factor) in t.iter().enumerate() {
                    inner.size[i] = (outer.size[i] + factor - 1) / factor;
                    outer.size[i] = factor;
                    let min = parent_bounds.region[i].0;
                    let mut extent = parent_bounds.region[i].1 - min + 1;
                    extent = (extent + factor - 1) / factor;
                    outer_bound.region[i] = (min, min + extent - 1);
                }
                outer.bounds.borrow_mut().insert(func, outer_bound);

                let inner = Rc::new(inner);
                outer.children.push(inner.clone());

                // Site the computation inside the outer loop.
                let mut compute_at_here = outer.clone();
                compute_at_here.compute_here(f, dag)?;
                if !in_realization {
                    compute_at_here.store_at.insert(f);
                }
                result.push(compute_at_here);

                if !in_realization {
                    // Alternatively keep storage here but compute further
                    // in, sliding the producer over this loop. All
                    // parallelism was forced to the outer loop, so this
                    // doesn't constrain it.
                    let mut store_at_here = outer;
                    store_at_here.store_at.insert(f);
                    let variants = inner.compute_in_tiles(f, dag, Some(&store_at_here), true)?;
                    for mut n in variants {
                        // Once a function slides over a loop, tiling it
                        // again confuses the downstream bounds analysis.
                        n.tileable = false;
                        let mut r = store_at_here.clone();
                        r.children.pop();
                        r.children.push(Rc::new(n));
                        result.push(r);
                    }
                }
            }
        }

        if let Some(ci) = child
            && !called_by_multiple_children
        {
            for store_here in [false, true] {
                if store_here && (in_realization || self.is_root()) {
                    // Storage at the root would constrain the parallel
                    // loops; inside a realization the storage level is
                    // already further out.
                    continue;
                }
                let variants = self.children[ci].compute_in_tiles(f, dag, Some(self), store_here)?;
                for n in variants {
                    // Push the computation into the child, possibly leaving
                    // the storage out here.
                    let mut r = self.clone();
                    if store_here {
                        r.store_at.insert(f);
                    }
                    r.children[ci] = Rc::new(n);
                    result.push(r);
                }
            }
        }

        Ok(result)
    }

    /// Render this subtree, one loop per line, innermost-first among
    /// siblings.
    pub fn dump_into(&self, prefix: &str, dag: &FunctionDAG, out: &mut String) {
        let mut prefix = prefix.to_string();
        if let Some(f) = self.func {
            out.push_str(&prefix);
            out.push_str(&dag.node(f).func.name());
            prefix.push(' ');
        }
        for s in &self.size {
            out.push_str(&format!(" {s}"));
        }
        if self.tileable {
            out.push_str(" t");
        }
        if self.innermost {
            out.push_str(" *");
        }
        out.push('\n');
        for f in &self.store_at {
            out.push_str(&format!("{prefix}realize: {}\n", dag.node(*f).func.name()));
        }
        for c in self.children.iter().rev() {
            c.dump_into(&prefix, dag, out);
        }
        for (f, calls) in &self.inlined {
            out.push_str(&format!("{prefix}inlined: {} {calls}\n", dag.node(*f).func.name()));
        }
    }
}
