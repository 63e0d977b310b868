//! Error kinds shared by every accumulator operation. The first five variants are user
//! errors: the operation reports them without touching any state. [AccumulatorError::Corrupt]
//! means an internal invariant was violated, which is always a bug; an instance that
//! returned it is poisoned and must be discarded.
use std::fmt::Debug;
use std::fmt::Display;

use super::node_hash::NodeHash;

pub enum AccumulatorError {
    /// A position is past the end of the forest or names an empty slot
    ///
    /// Deletion targets must be leaf positions below the current number of leaves, and
    /// every position handed to a lookup must lie inside a live subtree.
    OutOfRange(u64),

    /// A hash handed to proving is not in the forest's position map
    ///
    /// Either the element was never added, or it has already been deleted.
    UnknownHash(NodeHash),

    /// A recomputed hash disagrees with a known node or root
    ///
    /// The proof was tampered with, belongs to a different accumulator state, or its
    /// targets are not in canonical (strictly increasing) order. Proofs travel over
    /// untrusted channels, so a mismatch doesn't necessarily mean the element is absent.
    ProofMismatch,

    /// The proof ran out of hashes before every target reached a root
    ProofShort,

    /// The proof has more hashes than its targets require
    ProofLong,

    /// An I/O error while reading or writing a serialized proof
    IO(std::io::Error),

    /// An internal invariant was violated
    ///
    /// This should never happen. If you see this error, the structure is poisoned and
    /// the condition is a bug worth reporting.
    Corrupt(&'static str),
}

impl From<std::io::Error> for AccumulatorError {
    fn from(err: std::io::Error) -> Self {
        Self::IO(err)
    }
}

impl Debug for AccumulatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange(pos) => write!(f, "position {pos} is outside the forest"),
            Self::UnknownHash(hash) => write!(f, "hash {hash} is not in the accumulator"),
            Self::ProofMismatch => write!(f, "proof doesn't match the accumulator roots"),
            Self::ProofShort => write!(f, "proof has too few hashes for its targets"),
            Self::ProofLong => write!(f, "proof has too many hashes for its targets"),
            Self::IO(err) => write!(f, "IO error: {err}"),
            Self::Corrupt(what) => write!(f, "corrupt accumulator ({what}), this is a bug"),
        }
    }
}

impl Display for AccumulatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for AccumulatorError {}
