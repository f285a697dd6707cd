//! The function DAG: producer/consumer structure plus cost coefficients.
//!
//! Built once before the search and never mutated. Nodes are stored in
//! reverse realization order, so index 0 is an output and walking the node
//! list visits consumers before producers; the search schedules functions in
//! exactly this order.

use std::collections::{BTreeMap, HashMap};

use mosaic_ir::expr::{CallKind, Expr, ExprKind};
use mosaic_ir::{
    DType, Function, Interval, Region, Scope, boxes_required, populate_environment, realization_order, simplify,
};
use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::config::MachineParams;
use crate::error::{MissingParamEstimateSnafu, Result, UpdateDefinitionsUnsupportedSnafu};

/// Index of a node, in reverse realization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Index of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub usize);

/// One pipeline function with its cost coefficients.
#[derive(Debug, Clone)]
pub struct Node {
    pub func: Function,

    /// Compute done per point evaluated when realized, including the cost of
    /// generating the call.
    pub compute: f64,

    /// Compute done per point evaluated when inlined.
    pub compute_if_inlined: f64,

    /// Cost coefficient of one cold load from this function's storage.
    pub memory: f64,

    /// Symbolic region naming this function's dimensions; incoming edge
    /// bounds are expressed in these variables.
    pub region: SmallVec<[Interval; 4]>,
}

/// One direct producer-to-consumer dependency.
#[derive(Debug, Clone)]
pub struct Edge {
    pub producer: NodeId,
    pub consumer: NodeId,

    /// Region required of the producer, in the consumer's symbolic region
    /// variables, with parameter estimates already substituted.
    pub bounds: SmallVec<[Interval; 4]>,

    /// Calls the consumer makes to the producer per point evaluated.
    pub calls: i64,
}

/// The immutable pipeline graph the search runs over.
#[derive(Debug)]
pub struct FunctionDAG {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    node_of: HashMap<String, NodeId>,
}

impl FunctionDAG {
    /// Build the DAG for the pipeline reaching `outputs` and do all the cost
    /// analysis up front.
    pub fn new(outputs: &[Function], params: &MachineParams) -> Result<Self> {
        let mut env = HashMap::new();
        for o in outputs {
            populate_environment(o, &mut env);
        }

        // Update definitions reference their own function, which would read
        // as a cycle below; reject them first with the actionable error.
        let mut names: Vec<&String> = env.keys().collect();
        names.sort();
        for name in names {
            ensure!(!env[name.as_str()].has_updates(), UpdateDefinitionsUnsupportedSnafu { func: name.clone() });
        }

        let order = realization_order(outputs, &env)?;

        let mut nodes = Vec::with_capacity(order.len());
        let mut node_of = HashMap::new();
        let mut pending: Vec<(NodeId, BTreeMap<String, Region>, HashMap<String, i64>)> = Vec::new();

        // Reverse realization order: consumers before producers.
        for name in order.iter().rev() {
            let consumer = env[name.as_str()].clone();

            // A symbolic region standing for whatever part of this function
            // some loop nest evaluates.
            let mut scope = Scope::new();
            let mut region = SmallVec::new();
            for (i, arg) in consumer.args().iter().enumerate() {
                let interval = Interval::new(Expr::var(&format!("{name}.{i}.min")), Expr::var(&format!("{name}.{i}.max")));
                scope.push(arg, interval.clone());
                region.push(interval);
            }

            // Bundle all value expressions into a single synthetic call so
            // one walk reaches everything.
            let values = consumer.values();
            let exprs = Expr::call(CallKind::Extern, "dummy", None, values.clone(), DType::Int32);

            // Cost analysis. Simplistic for now: count leaves in the
            // expression trees, with one extra unit per call argument for
            // the implied addressing math.
            let mut leaves: i64 = 0;
            let mut calls: HashMap<String, i64> = HashMap::new();
            exprs.visit(&mut |e| match e.kind() {
                ExprKind::IntImm(_) | ExprKind::UIntImm(_) | ExprKind::FloatImm(_) | ExprKind::Var { .. } => {
                    leaves += 1;
                }
                ExprKind::Call { name, args, .. } => {
                    *calls.entry(name.clone()).or_default() += 1;
                    leaves += args.len() as i64;
                }
                ExprKind::Binary { .. } => {}
            });

            // Wider types have lower vector throughput, so bill them more.
            let bytes_per_element: usize = values.iter().map(|v| v.dtype().bytes()).sum();
            let compute = leaves as f64 * bytes_per_element as f64;
            let compute_if_inlined =
                (leaves - consumer.dimensions() as i64).max(0) as f64 * bytes_per_element as f64;
            let memory = bytes_per_element as f64 * params.balance / (params.last_level_cache_size as f64).ln();

            let boxes = boxes_required(&exprs, &scope)?;
            let id = NodeId(nodes.len());
            pending.push((id, boxes, calls));
            node_of.insert(name.clone(), id);
            nodes.push(Node { func: consumer, compute, compute_if_inlined, memory, region });
        }

        // Edges, once every producer has a node. Loads from input images are
        // discarded here: they have no node to point at.
        let mut edges = Vec::new();
        for (consumer, boxes, calls) in pending {
            for (producer_name, required) in boxes {
                let Some(&producer) = node_of.get(&producer_name) else { continue };
                let mut bounds = SmallVec::new();
                for interval in &required.bounds {
                    bounds.push(Interval::new(
                        simplify(&apply_param_estimates(&interval.min)?),
                        simplify(&apply_param_estimates(&interval.max)?),
                    ));
                }
                let calls = calls.get(&producer_name).copied().unwrap_or(0);
                edges.push(Edge { producer, consumer, bounds, calls });
            }
        }

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for (i, e) in edges.iter().enumerate() {
            outgoing[e.producer.0].push(EdgeId(i));
            incoming[e.consumer.0].push(EdgeId(i));
        }

        Ok(Self { nodes, edges, outgoing, incoming, node_of })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_of.get(name).copied()
    }

    pub fn outgoing(&self, f: NodeId) -> &[EdgeId] {
        &self.outgoing[f.0]
    }

    pub fn incoming(&self, f: NodeId) -> &[EdgeId] {
        &self.incoming[f.0]
    }

    pub fn outgoing_edges(&self, f: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing[f.0].iter().map(|&e| &self.edges[e.0])
    }

    pub fn incoming_edges(&self, f: NodeId) -> impl Iterator<Item = &Edge> {
        self.incoming[f.0].iter().map(|&e| &self.edges[e.0])
    }

    /// Log the graph through the debug channel.
    pub fn dump(&self) {
        for n in &self.nodes {
            tracing::debug!("node: {}", n.func.name());
            for i in &n.region {
                tracing::debug!("  symbolic region: [{}, {}]", i.min, i.max);
            }
            tracing::debug!("  arithmetic cost: {}", n.compute);
            tracing::debug!("  inlined cost: {}", n.compute_if_inlined);
        }
        for e in &self.edges {
            tracing::debug!(
                "edge: {} -> {}",
                self.node(e.producer).func.name(),
                self.node(e.consumer).func.name()
            );
            for (j, i) in e.bounds.iter().enumerate() {
                tracing::debug!("  footprint {j}: [{}, {}]", i.min, i.max);
            }
        }
    }
}

// Replace parameter references in edge bounds with their estimates. Scalar
// parameters become their estimated value; buffer parameters contribute
// their `.min.i` / `.extent.i` constraint estimates.
fn apply_param_estimates(e: &Expr) -> Result<Expr> {
    Ok(match e.kind() {
        ExprKind::Var { name, param: Some(param) } => {
            if !param.is_buffer() {
                param.get_estimate().context(MissingParamEstimateSnafu { name: name.clone() })?
            } else {
                let mut replacement = None;
                for i in 0..param.dimensions() {
                    if *name == format!("{}.min.{i}", param.name()) {
                        replacement = param.min_constraint_estimate(i);
                    } else if *name == format!("{}.extent.{i}", param.name()) {
                        replacement = param.extent_constraint_estimate(i);
                    }
                }
                replacement.context(MissingParamEstimateSnafu { name: name.clone() })?
            }
        }
        ExprKind::Binary { op, a, b } => {
            Expr::binary(*op, apply_param_estimates(a)?, apply_param_estimates(b)?)
        }
        ExprKind::Call { kind, name, func, args } => {
            let args = args.iter().map(apply_param_estimates).collect::<Result<Vec<_>>>()?;
            Expr::call(*kind, name, func.clone(), args, e.dtype())
        }
        _ => e.clone(),
    })
}
