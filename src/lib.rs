//! # Utreexo
//! [Utreexo](https://eprint.iacr.org/2019/611.pdf) is a dynamic accumulator that represents
//! the live state of a transaction-output set as a forest of perfect binary Merkle trees.
//! The roots of the forest collectively commit to the whole set, so a node only needs a
//! logarithmic amount of state to validate spends: while spending a UTXO the element is
//! deleted from the accumulator, while receiving one it is added, and spenders carry a
//! compact inclusion proof for the outputs they consume.
//!
//! Two representations of the same forest live in this crate. The [Forest] is the dense
//! "bridge node" that stores every internal hash and can produce batch proofs for any
//! subset of leaves. The [Pollard] is the compact client that stores only the nodes needed
//! to maintain proofs for the leaves it was asked to remember, and learns everything else
//! by ingesting batch proofs. Both are driven through the same `modify` interface and
//! always agree on their roots.
//!
//! [Forest]: accumulator::forest::Forest
//! [Pollard]: accumulator::pollard::Pollard
pub mod accumulator;
