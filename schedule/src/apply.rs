//! Materializing a schedule tree into backend directives.
//!
//! A post-order traversal of the winning tree issues splits, vectorization,
//! unrolling, parallelization (with fusion of parallel loops), `store_at`
//! and `compute_at` against each function, then a final reorder per
//! function.

use std::collections::BTreeMap;

use mosaic_ir::LoopLevel;

use crate::config::MachineParams;
use crate::dag::{FunctionDAG, NodeId};
use crate::error::Result;
use crate::search::State;
use crate::tree::PartialScheduleNode;

impl PartialScheduleNode {
    fn apply(
        &self,
        dag: &FunctionDAG,
        vars_map: &mut BTreeMap<NodeId, Vec<String>>,
        mut num_cores: f64,
    ) -> Result<()> {
        if self.is_root() {
            for c in &self.children {
                let f = c.func.expect("children of the root iterate functions");
                dag.node(f).func.compute_root();
                c.apply(dag, vars_map, num_cores)?;
            }
            return Ok(());
        }

        let f = self.func.expect("not the root");
        let func = dag.node(f).func.clone();
        let dims = func.dimensions();

        let mut vars = vars_map.entry(f).or_insert_with(|| func.args()).clone();
        let here;

        if self.innermost {
            let v = vars[0].clone();
            here = LoopLevel::at(&func.name(), &v);
            if self.size[0] >= 16 {
                func.vectorize(&v, 16);
            } else if self.size[0] >= 8 {
                func.vectorize(&v, 8);
            } else if self.size[0] >= 4 {
                func.vectorize(&v, 4);
            }
            // Once the nest has been tiled at least once the inner extents
            // are known, so small ones can be unrolled.
            if vars.len() > dims && self.size[0] <= 32 {
                func.unroll(&v);
            }
            if num_cores > 1.0 {
                let task_size = *self.size.last().expect("loops have at least one dimension") as f64 / num_cores;
                if task_size > 1.0 {
                    func.parallel_tasks(&vars[dims - 1], task_size.ceil() as i64);
                } else {
                    func.parallel(&vars[dims - 1]);
                }
            }
        } else {
            // The implied splits: peel one tile loop off every dimension.
            let b = self.get_bounds(f, dag)?;
            let mut new_inner = Vec::with_capacity(b.region.len());
            for i in 0..b.region.len() {
                let extent = b.region[i].1 - b.region[i].0 + 1;
                let old = vars[i].clone();
                let outer = format!("{old}o");
                let inner = format!("{old}i");
                func.split(&old, &outer, &inner, extent);
                vars[i] = outer;
                new_inner.push(inner);
            }

            // Parallelize outer dimensions from outermost inward until the
            // core budget is spent, then fuse them into one parallel loop to
            // avoid nested parallelism.
            if num_cores > 1.0 {
                let mut innermost_parallel_dimension = 0;
                let mut num_parallel_dimensions = 0usize;
                let mut i = dims as isize - 1;
                while num_cores > 1.0 && i >= 0 {
                    func.parallel(&vars[i as usize]);
                    num_parallel_dimensions += 1;
                    innermost_parallel_dimension = i as usize;
                    num_cores /= self.size[i as usize] as f64;
                    i -= 1;
                }
                if num_parallel_dimensions > 0 {
                    for _ in 0..num_parallel_dimensions - 1 {
                        let inner = vars[innermost_parallel_dimension].clone();
                        let outer = vars[innermost_parallel_dimension + 1].clone();
                        let fused = format!("{inner}_{outer}");
                        func.fuse(&inner, &outer, &fused);
                        vars[innermost_parallel_dimension] = fused;
                        vars.remove(innermost_parallel_dimension + 1);
                    }
                }
            }
            here = LoopLevel::at(&func.name(), &vars[0]);
            let mut combined = new_inner;
            combined.append(&mut vars);
            vars = combined;
        }
        vars_map.insert(f, vars);

        for sf in &self.store_at {
            dag.node(*sf).func.store_at(here.clone());
        }
        for c in &self.children {
            if c.func != Some(f) {
                let cf = c.func.expect("children of a loop iterate functions");
                dag.node(cf).func.compute_at(here.clone());
            }
            c.apply(dag, vars_map, num_cores)?;
        }
        Ok(())
    }
}

impl State {
    /// Issue the directives for this (complete) schedule against every
    /// function in the pipeline.
    pub fn apply_schedule(&self, dag: &FunctionDAG, params: &MachineParams) -> Result<()> {
        let mut vars_map = BTreeMap::new();
        self.root.apply(dag, &mut vars_map, params.parallelism as f64)?;
        // The final loop order per function: inner tile vars first.
        for (f, vars) in vars_map {
            dag.node(f).func.reorder(vars);
        }
        Ok(())
    }
}
