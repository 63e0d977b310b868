//! The deletion transform. Given a sorted batch of leaf deletions, [transform] computes,
//! row by row, the exact node moves that re-pack the forest so the survivors end up
//! perfectly packed again and the new roots sit at the root positions of the shrunken
//! leaf count. The output is pure geometry: the dense forest executes the arrows as hash
//! range swaps, the pollard as niece pointer exchanges, and both end up with the same
//! shape.
use super::util;

/// A single node move: the node at `from` (and everything under it) goes to `to`.
/// A self-arrow (`from == to`) may appear and is a no-op; consumers skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrow {
    pub from: u64,
    pub to: u64,
}

/// Computes the per-row moves for deleting `dels` out of a forest with `num_leaves`
/// leaves. `dels` must be sorted ascending. Row `r` of the result must be fully applied
/// (and the touched parents re-hashed) before row `r + 1` is read.
///
/// Every row does the same dance the original accumulator does: pop the row's root if
/// it's being deleted, extract twin deletions (both children of one parent, which just
/// promotes the deletion to the parent), pair up the remaining deletions so the second
/// one's sibling fills the first one's hole, and then resolve the leftovers against the
/// row's root. A surviving subtree that becomes a root "collapses" to its new root
/// position; collapses are applied after being fixed up against the swaps of higher
/// rows, since those move the subtree a collapse travels through.
pub fn transform(dels: &[u64], num_leaves: u64, forest_rows: u8) -> Vec<Vec<Arrow>> {
    let next_num_leaves = num_leaves - dels.len() as u64;

    let mut dels = dels.to_vec();
    let mut swaps: Vec<Vec<Arrow>> = vec![Vec::new(); forest_rows as usize];
    let mut collapses: Vec<Option<Arrow>> = vec![None; forest_rows as usize];

    for row in 0..forest_rows {
        if dels.is_empty() {
            break;
        }
        let mut root_present = util::is_root_populated(row, num_leaves);
        let root_pos = util::root_position(num_leaves, row, forest_rows);

        // deleting the root is just forgetting it
        if root_present && dels.last() == Some(&root_pos) {
            dels.pop();
            root_present = false;
        }

        let del_remains = dels.len() % 2 != 0;
        let (twin_next_dels, mut row_dels) = extract_twins(&dels, forest_rows);

        let mut swap_next_dels = Vec::new();
        while row_dels.len() > 1 {
            // the second deletion's sibling slides into the first deletion's hole,
            // and the deletion promotes to the second one's parent
            swaps[row as usize].push(Arrow {
                from: row_dels[1] ^ 1,
                to: row_dels[0],
            });
            swap_next_dels.push(util::parent(row_dels[1], forest_rows));
            row_dels.drain(..2);
        }

        if root_present && del_remains {
            // the root fills the last hole and stops being a root
            swaps[row as usize].push(Arrow {
                from: root_pos,
                to: row_dels[0],
            });
        }
        if root_present && !del_remains {
            // untouched root moves to its new root position
            collapses[row as usize] = Some(Arrow {
                from: root_pos,
                to: util::root_position(next_num_leaves, row, forest_rows),
            });
        }
        if !root_present && del_remains {
            // the lone deletion's sibling becomes this row's root
            collapses[row as usize] = Some(Arrow {
                from: row_dels[0] ^ 1,
                to: util::root_position(next_num_leaves, row, forest_rows),
            });
            swap_next_dels.push(util::parent(row_dels[0], forest_rows));
        }

        dels = merge_sorted(twin_next_dels, swap_next_dels);
    }

    swap_collapses(&swaps, &mut collapses, forest_rows);

    // the collapse, if any survived as a real move, runs after the row's swaps
    for (row, collapse) in collapses.into_iter().enumerate() {
        if let Some(c) = collapse {
            if c.from != c.to {
                swaps[row].push(c);
            }
        }
    }

    swaps
}

// extract_twins splits the deletion set into parents of sibling pairs (both children
// deleted, nothing moves) and the deletions that still need resolving at this row.
fn extract_twins(nodes: &[u64], forest_rows: u8) -> (Vec<u64>, Vec<u64>) {
    let mut parents = Vec::new();
    let mut dels = Vec::new();

    let mut i = 0;
    while i < nodes.len() {
        if i + 1 < nodes.len() && util::is_right_sibling(nodes[i], nodes[i + 1]) {
            parents.push(util::parent(nodes[i], forest_rows));
            i += 2;
        } else {
            dels.push(nodes[i]);
            i += 1;
        }
    }

    (parents, dels)
}

// swap_collapses applies the swaps and collapses of higher rows to the destinations of
// lower collapses. A collapse destination is a position in the final forest; if an
// ancestor of it still gets moved by a higher row, the destination has to move along.
fn swap_collapses(swaps: &[Vec<Arrow>], collapses: &mut [Option<Arrow>], forest_rows: u8) {
    if collapses.is_empty() {
        return;
    }

    for row in (1..collapses.len()).rev() {
        for swap in &swaps[row] {
            for cr in 0..row {
                if let Some(ref mut collapse) = collapses[cr] {
                    collapse.to ^= swap_if_descendant(*swap, *collapse, row as u8, cr as u8, forest_rows);
                }
            }
        }

        if let Some(rowcol) = collapses[row] {
            for cr in 0..row {
                if let Some(ref mut collapse) = collapses[cr] {
                    collapse.to ^= swap_if_descendant(rowcol, *collapse, row as u8, cr as u8, forest_rows);
                }
            }
        }
    }
}

// swap_if_descendant returns the position mask to xor into b's destination if arrow `a`
// (at row ar) moves the subtree b's destination lives under. ar must be above br.
fn swap_if_descendant(a: Arrow, b: Arrow, ar: u8, br: u8, forest_rows: u8) -> u64 {
    let hdiff = ar - br;
    let b_up = util::parent_many(b.to, hdiff, forest_rows);

    if (b_up == a.from) != (b_up == a.to) {
        (a.from ^ a.to) << hdiff
    } else {
        0
    }
}

fn merge_sorted(a: Vec<u64>, b: Vec<u64>) -> Vec<u64> {
    let mut out = a;
    out.extend(b);
    out.sort_unstable();
    out.dedup();
    out
}
