//! [NodeHash] is the type of every node in the accumulator. It's a wrapper around a
//! `[u8; 32]` digest with a dedicated empty value that we use for nodes whose hash is
//! absent or not yet known; the empty value is never fed into the parent hash.
//! # Examples
//! Building from a str
//! ```
//! use std::str::FromStr;
//!
//! use utreexo::accumulator::node_hash::NodeHash;
//! let hash = NodeHash::from_str(
//!     "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d",
//! )
//! .unwrap();
//! assert_eq!(
//!     hash.to_string().as_str(),
//!     "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
//! );
//! ```
//! Computing a parent hash (i.e. the double-SHA256 of two nodes concatenated)
//! ```
//! use std::str::FromStr;
//!
//! use utreexo::accumulator::node_hash::NodeHash;
//! let left = NodeHash::from_str(
//!     "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d",
//! )
//! .unwrap();
//! let right = NodeHash::from_str(
//!     "4bf5122f344554c53bde2ebb8cd2b7e3d1600ad631c385a5d7cce23c7785459a",
//! )
//! .unwrap();
//! let parent = NodeHash::parent_hash(&left, &right);
//! let expected_parent = NodeHash::from_str(
//!     "f0a886c2f0065f43c82d12b561b45f1a963917248c538474aaad05440a48df3c",
//! )
//! .unwrap();
//! assert_eq!(parent, expected_parent);
//! ```
use std::convert::TryFrom;
use std::fmt::Debug;
use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use bitcoin_hashes::hex;
use bitcoin_hashes::sha256;
use bitcoin_hashes::sha256d;
use bitcoin_hashes::Hash;
use bitcoin_hashes::HashEngine;
#[cfg(feature = "with-serde")]
use serde::Deserialize;
#[cfg(feature = "with-serde")]
use serde::Serialize;

/// The hash of a node in the accumulator forest. For leaves this is the hash of the
/// element committed to; for internal nodes it is the parent hash of the two children.
#[derive(Eq, PartialEq, Copy, Clone, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub enum NodeHash {
    /// Absent or not-yet-known. Lookups into pruned pollard regions return this.
    #[default]
    Empty,
    /// An actual digest.
    Some([u8; 32]),
}

impl Deref for NodeHash {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        match self {
            NodeHash::Some(ref inner) => inner,
            NodeHash::Empty => &[0; 32],
        }
    }
}

impl Display for NodeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        match self {
            NodeHash::Empty => write!(f, "empty"),
            NodeHash::Some(ref inner) => {
                let mut s = String::new();
                for byte in inner.iter() {
                    s.push_str(&format!("{byte:02x}"));
                }
                write!(f, "{s}")
            }
        }
    }
}

impl Debug for NodeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        write!(f, "{self}")
    }
}

impl From<[u8; 32]> for NodeHash {
    fn from(hash: [u8; 32]) -> Self {
        NodeHash::Some(hash)
    }
}

impl From<&[u8; 32]> for NodeHash {
    fn from(hash: &[u8; 32]) -> Self {
        NodeHash::Some(*hash)
    }
}

impl From<sha256::Hash> for NodeHash {
    fn from(hash: sha256::Hash) -> Self {
        NodeHash::Some(hash.to_byte_array())
    }
}

impl From<sha256d::Hash> for NodeHash {
    fn from(hash: sha256d::Hash) -> Self {
        NodeHash::Some(hash.to_byte_array())
    }
}

impl TryFrom<&str> for NodeHash {
    type Error = hex::HexToArrayError;
    fn try_from(hash: &str) -> Result<Self, Self::Error> {
        let inner = hex::FromHex::from_hex(hash)?;
        Ok(NodeHash::Some(inner))
    }
}

impl FromStr for NodeHash {
    type Err = hex::HexToArrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeHash::try_from(s)
    }
}

impl NodeHash {
    /// Creates a new NodeHash from a 32 byte array.
    pub fn new(inner: [u8; 32]) -> Self {
        NodeHash::Some(inner)
    }

    /// Creates an empty hash, the marker for an absent or unknown node.
    /// # Example
    /// ```
    /// use utreexo::accumulator::node_hash::NodeHash;
    /// assert!(NodeHash::empty().is_empty());
    /// ```
    pub fn empty() -> Self {
        NodeHash::Empty
    }

    /// Tells whether this hash is the empty marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeHash::Empty)
    }

    /// Returns the Merkle parent of the two passed in nodes, the double-SHA256 of
    /// their concatenation. Neither child may be empty.
    pub fn parent_hash(left: &Self, right: &Self) -> Self {
        debug_assert!(!left.is_empty() && !right.is_empty());
        let mut engine = sha256d::Hash::engine();
        engine.input(&**left);
        engine.input(&**right);
        sha256d::Hash::from_engine(engine).into()
    }
}
