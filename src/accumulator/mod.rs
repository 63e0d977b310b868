//! This module is the core of the library. It holds the two accumulator representations and
//! the pieces they share: positional arithmetic over the forest layout, the row-by-row
//! deletion transform, and the batch proof codec.
//!
//! If you are running a bridge node that must serve proofs for arbitrary leaves, use
//! [forest::Forest]. If you only need to track a subset of the set and verify proofs
//! against the roots, use [pollard::Pollard] and feed it batch proofs produced by a
//! bridge. The two stay in lockstep: applying the same sequence of additions and
//! deletions to both always yields identical roots.
#[cfg(feature = "with-serde")]
use serde::Deserialize;
#[cfg(feature = "with-serde")]
use serde::Serialize;

use self::node_hash::NodeHash;

pub mod error;
pub mod forest;
pub mod node_hash;
pub mod pollard;
pub mod proof;
pub(super) mod transform;
pub(super) mod util;

#[cfg(test)]
pub(crate) mod simchain;

/// A new element to be inserted into the accumulator.
///
/// `remember` is a hint from the caller: when set, a [pollard::Pollard] keeps the sibling
/// path for this leaf around after insertion, so it can later prove (and delete) the leaf
/// without asking a bridge node for help. The dense [forest::Forest] stores everything and
/// ignores the hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct Leaf {
    /// The hash committed into the accumulator.
    pub hash: NodeHash,
    /// Whether the proof path for this leaf should be retained.
    pub remember: bool,
}
