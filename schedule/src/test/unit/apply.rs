//! Unit tests for schedule materialization: the directive transcripts each
//! tree shape produces.

use mosaic_ir::{Directive, LoopLevel};
use smallvec::smallvec;
use test_case::test_case;

use crate::config::MachineParams;
use crate::dag::FunctionDAG;
use crate::search::{State, optimal_schedule};
use crate::test::helpers::*;
use crate::tree::{Bound, PartialScheduleNode};

#[test]
fn test_pointwise_winner_directives() {
    let (f, g, h) = pointwise_pipeline();
    let dag = FunctionDAG::new(&[h.clone()], &MachineParams::default()).unwrap();
    let optimal = optimal_schedule(&dag, 1).unwrap();
    optimal.apply_schedule(&dag, &MachineParams::default()).unwrap();

    // One flat nest over h: vectorized in x, parallel in y with a task
    // size splitting 1000 rows over 8 cores, loop order unchanged.
    let transcript = h.schedule().directives.clone();
    assert_eq!(
        transcript,
        vec![
            Directive::ComputeRoot,
            Directive::Vectorize { var: "x".into(), width: 16 },
            Directive::Parallel { var: "y".into(), task_size: Some(125) },
            Directive::Reorder { vars: vec!["x".into(), "y".into()] },
        ]
    );

    // Inlined functions receive no directives at all.
    assert!(f.schedule().directives.is_empty());
    assert!(g.schedule().directives.is_empty());
}

// A hand-built two-level tree: the root stores h, an outer tile loop over h
// with a seeded tile bound, and an innermost tile inside it.
fn tiled_tree(dag: &FunctionDAG, outer_size: [i64; 2], inner_size: [i64; 2]) -> State {
    let h_id = dag.node_id("h").unwrap();
    let inner = PartialScheduleNode {
        func: Some(h_id),
        innermost: true,
        tileable: true,
        size: smallvec![inner_size[0], inner_size[1]],
        ..Default::default()
    };
    let outer = PartialScheduleNode {
        func: Some(h_id),
        innermost: false,
        tileable: true,
        size: smallvec![outer_size[0], outer_size[1]],
        children: vec![std::rc::Rc::new(inner)],
        ..Default::default()
    };
    outer.bounds.borrow_mut().insert(
        h_id,
        Bound {
            region: smallvec![(0, inner_size[0] - 1), (0, inner_size[1] - 1)],
            min_points: 1,
            min_cost: 0.0,
        },
    );
    let mut root = PartialScheduleNode::default();
    root.store_at.insert(h_id);
    root.children.push(std::rc::Rc::new(outer));
    State { root, cost: 0.0, num_scheduled: dag.num_nodes() }
}

#[test]
fn test_tiled_nest_splits_and_parallelizes_outer() {
    let (_, h) = wide_stencil_pipeline();
    let dag = FunctionDAG::new(&[h.clone()], &MachineParams::default()).unwrap();
    let state = tiled_tree(&dag, [16, 16], [128, 128]);
    state.apply_schedule(&dag, &MachineParams::default()).unwrap();

    // Splits by the tile extent, one parallel outer dimension (16 tiles
    // cover 8 cores), vectorized inner x, inner vars reordered first.
    assert_eq!(
        h.schedule().directives.clone(),
        vec![
            Directive::ComputeRoot,
            Directive::Split { old: "x".into(), outer: "xo".into(), inner: "xi".into(), factor: 128 },
            Directive::Split { old: "y".into(), outer: "yo".into(), inner: "yi".into(), factor: 128 },
            Directive::Parallel { var: "yo".into(), task_size: None },
            Directive::Vectorize { var: "xi".into(), width: 16 },
            Directive::Reorder {
                vars: vec!["xi".into(), "yi".into(), "xo".into(), "yo".into()]
            },
        ]
    );
}

#[test]
fn test_parallel_outer_dims_are_fused() {
    let (_, h) = wide_stencil_pipeline();
    let dag = FunctionDAG::new(&[h.clone()], &MachineParams::default()).unwrap();
    // 2x2 outer tiles cannot cover 8 cores with one dimension, so both are
    // parallelized and then fused into a single parallel loop.
    let state = tiled_tree(&dag, [2, 2], [1024, 1024]);
    state.apply_schedule(&dag, &MachineParams::default()).unwrap();

    let transcript = h.schedule().directives.clone();
    assert_eq!(
        transcript,
        vec![
            Directive::ComputeRoot,
            Directive::Split { old: "x".into(), outer: "xo".into(), inner: "xi".into(), factor: 1024 },
            Directive::Split { old: "y".into(), outer: "yo".into(), inner: "yi".into(), factor: 1024 },
            Directive::Parallel { var: "yo".into(), task_size: None },
            Directive::Parallel { var: "xo".into(), task_size: None },
            Directive::Fuse { inner: "xo".into(), outer: "yo".into(), fused: "xo_yo".into() },
            Directive::Vectorize { var: "xi".into(), width: 16 },
            // Two cores of budget survive the 2x2 outer tiles and are spent
            // on the innermost nest's outer dimension.
            Directive::Parallel { var: "yi".into(), task_size: Some(512) },
            Directive::Reorder { vars: vec!["xi".into(), "yi".into(), "xo_yo".into()] },
        ]
    );
}

#[test]
fn test_single_core_emits_no_parallelism() {
    let (_, h) = wide_stencil_pipeline();
    let dag = FunctionDAG::new(&[h.clone()], &MachineParams::default()).unwrap();
    let state = tiled_tree(&dag, [16, 16], [128, 128]);
    let params = MachineParams::builder().parallelism(1).build();
    state.apply_schedule(&dag, &params).unwrap();

    let transcript = h.schedule().directives.clone();
    assert!(!transcript.iter().any(|d| matches!(d, Directive::Parallel { .. })));
    assert!(!transcript.iter().any(|d| matches!(d, Directive::Fuse { .. })));
}

#[test_case(1000, Some(16) ; "wide_loop_vectorizes_by_16")]
#[test_case(12, Some(8) ; "narrow_loop_drops_to_8")]
#[test_case(5, Some(4) ; "tiny_loop_drops_to_4")]
#[test_case(3, None ; "too_narrow_to_vectorize")]
fn test_innermost_vector_width(extent: i64, expected: Option<i64>) {
    let (_, _, h) = pointwise_pipeline();
    let dag = FunctionDAG::new(&[h.clone()], &MachineParams::default()).unwrap();
    let h_id = dag.node_id("h").unwrap();

    let leaf = PartialScheduleNode {
        func: Some(h_id),
        innermost: true,
        tileable: true,
        size: smallvec![extent, 100],
        ..Default::default()
    };
    let mut root = PartialScheduleNode::default();
    root.store_at.insert(h_id);
    root.children.push(std::rc::Rc::new(leaf));
    let state = State { root, cost: 0.0, num_scheduled: dag.num_nodes() };
    state.apply_schedule(&dag, &MachineParams::default()).unwrap();

    let widths: Vec<i64> = h
        .schedule()
        .directives
        .iter()
        .filter_map(|d| match d {
            Directive::Vectorize { width, .. } => Some(*width),
            _ => None,
        })
        .collect();
    assert_eq!(widths, expected.into_iter().collect::<Vec<_>>());
}

#[test]
fn test_compute_at_and_store_at_point_into_the_consumer() {
    // Realize f inside h's tile: storage and compute level name h's outer
    // tile variable.
    let (f, h) = wide_stencil_pipeline();
    let dag = FunctionDAG::new(&[h.clone()], &MachineParams::default()).unwrap();
    let h_id = dag.node_id("h").unwrap();
    let f_id = dag.node_id(&f.name()).unwrap();

    let mut state = tiled_tree(&dag, [16, 16], [128, 128]);
    // Attach f's nest inside the outer tile loop.
    let outer = std::rc::Rc::get_mut(&mut state.root.children[0]).unwrap();
    outer.store_at.insert(f_id);
    let f_leaf = PartialScheduleNode {
        func: Some(f_id),
        innermost: true,
        tileable: true,
        size: smallvec![146, 146],
        ..Default::default()
    };
    outer.children.insert(0, std::rc::Rc::new(f_leaf));

    state.apply_schedule(&dag, &MachineParams::default()).unwrap();

    // Both directives are recorded on f and name h's outer tile variable.
    let level = LoopLevel::at("h", "xo");
    let f_directives = f.schedule().directives.clone();
    assert!(f_directives.contains(&Directive::StoreAt(level.clone())));
    assert!(f_directives.contains(&Directive::ComputeAt(level)));
    assert!(f_directives.iter().any(|d| matches!(d, Directive::Vectorize { width: 16, .. })));
}
