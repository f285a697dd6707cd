//! Tile-shape enumeration.

use smallvec::SmallVec;

/// One candidate tiling: the outer loop extent chosen per dimension.
pub type Tiling = SmallVec<[i64; 4]>;

/// Enumerate outer-loop extents for tiling a loop nest of extents `s[0..=d]`.
///
/// When `allow_splits` is false, each dimension only chooses between staying
/// inside the tile (outer extent 1) and being fully outside (outer extent
/// `s[i]`). When true, two power-of-two sweeps run per dimension: an
/// outer-factor sweep that stops once the outer extent would exceed the inner
/// one, or once the innermost dimension keeps fewer than 16 elements to
/// vectorize; and an inner-extent sweep for outer-dominant factors that stops
/// once the inner extent reaches the outer.
///
/// Complete tilings that put everything inside (all ones) or everything
/// outside (all full extents) are suppressed; they are not tilings at all.
/// Enumeration order is deterministic.
pub fn generate_tilings(s: &[i64], d: isize, allow_splits: bool) -> Vec<Tiling> {
    let mut result = Vec::new();
    if d == -1 {
        result.push(Tiling::new());
        return result;
    }
    let d = d as usize;
    for t in generate_tilings(s, d as isize - 1, allow_splits) {
        let mut is_full = false;
        let mut is_one = false;
        // Only complete tilings can be trivial.
        if d == s.len() - 1 {
            is_one = true;
            is_full = true;
            for i in 0..d {
                is_one &= t[i] == 1;
                is_full &= t[i] == s[i];
            }
        }
        if !allow_splits {
            if !is_one {
                let mut with = t.clone();
                with.push(1);
                result.push(with);
            }
            if s[d] != 1 && !is_full {
                let mut with = t.clone();
                with.push(s[d]);
                result.push(with);
            }
        } else {
            let mut outer = 1;
            while outer <= s[d] {
                let inner = (s[d] + outer - 1) / outer;
                if !(is_one && outer == 1) && !(is_full && outer == s[d]) {
                    if outer > inner || (d == 0 && inner < 16) {
                        break;
                    }
                    let mut with = t.clone();
                    with.push(outer);
                    result.push(with);
                }
                outer *= 2;
            }
            let mut inner = 1;
            while inner < s[d] {
                let outer = (s[d] + inner - 1) / inner;
                if !(is_one && outer == 1) && !(is_full && outer == s[d]) {
                    if inner >= outer {
                        break;
                    }
                    let mut with = t.clone();
                    with.push(outer);
                    result.push(with);
                }
                inner *= 2;
            }
        }
    }
    result
}
