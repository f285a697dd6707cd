//! Unit tests for tile-shape enumeration. Expected values are enumerated by
//! hand from the sweep rules.

use crate::tilings::generate_tilings;

fn as_vecs(s: &[i64], allow_splits: bool) -> Vec<Vec<i64>> {
    generate_tilings(s, s.len() as isize - 1, allow_splits)
        .into_iter()
        .map(|t| t.to_vec())
        .collect()
}

#[test]
fn test_base_case() {
    let t = generate_tilings(&[], -1, true);
    assert_eq!(t.len(), 1);
    assert!(t[0].is_empty());
}

#[test]
fn test_split_one_dimension_extent_8() {
    // The outer sweep dies immediately: any split leaves fewer than 16
    // elements inside the innermost dimension. The inner sweep offers the
    // full extent (inner = 1) and half (inner = 2).
    assert_eq!(as_vecs(&[8], true), vec![vec![8], vec![4]]);
}

#[test]
fn test_split_one_dimension_extent_32() {
    // Outer sweep: outer = 2 (inner 16); outer = 4 stops at inner 8 < 16.
    // Inner sweep: inner = 1 would be the full extent (skipped), then
    // inner = 2 and 4; inner = 8 stops because inner >= outer.
    assert_eq!(as_vecs(&[32], true), vec![vec![2], vec![16], vec![8]]);
}

#[test]
fn test_no_splits_enumerates_in_or_out() {
    // Each dimension is either inside the tile (1) or fully outside (s[i]),
    // minus the all-inside and all-outside combinations.
    assert_eq!(as_vecs(&[4, 8], false), vec![vec![1, 8], vec![4, 1]]);
}

#[test]
fn test_no_splits_skips_unit_extents() {
    // A unit extent offers no "fully outside" choice distinct from 1, and
    // both complete combinations are trivial here.
    assert!(as_vecs(&[1, 1], false).is_empty());
}

#[test]
fn test_trivial_suppression_only_at_last_dimension() {
    // For [16, 1] with splits: the prefix [16] is fully outside, so the
    // last dimension refuses outer = 1 = s[1]; the prefix [8] survives.
    assert_eq!(as_vecs(&[16, 1], true), vec![vec![8, 1]]);
}

#[test]
fn test_split_one_dimension_extent_64() {
    // Outer sweep (outer = 2, 4) stops once fewer than 16 elements remain
    // inside the innermost dimension; the inner sweep is not so constrained
    // and contributes outer-dominant factors 32 and 16.
    assert_eq!(as_vecs(&[64], true), vec![vec![2], vec![4], vec![32], vec![16]]);
}
