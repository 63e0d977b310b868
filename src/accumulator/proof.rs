//! Batch proofs: the compact encoding of inclusion proofs for many leaves at once.
//! A proof carries the sorted positions being proven and exactly the sibling hashes a
//! verifier cannot compute on its own, in a canonical order both sides derive
//! independently (row-major, ascending within each row). Two honest provers always
//! produce byte-identical proofs for the same targets against the same forest.
//!
//! Assuming a tree with leaf values [0, 1, 2, 3, 4, 5, 6, 7], the forest looks like:
//!```!
//! // 14
//! // |---------------\
//! // 12              13
//! // |-------\       |-------\
//! // 08      09      10      11
//! // |---\   |---\   |---\   |---\
//! // 00  01  02  03  04  05  06  07
//! ```
//! For proving 0, the proof holds 01, 09 and 13's hashes; 08, 12 and 14 are computed
//! on the way up, and 00's own hash is supplied by whoever asks for verification.
use std::collections::BTreeMap;
use std::io::Read;
use std::io::Write;

#[cfg(feature = "with-serde")]
use serde::Deserialize;
#[cfg(feature = "with-serde")]
use serde::Serialize;

use super::error::AccumulatorError;
use super::node_hash::NodeHash;
use super::util;

/// A multi-target inclusion proof. `targets` are the row-0 positions being proven,
/// strictly increasing; `hashes` are the canonical sibling hashes (see the module docs).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct BatchProof {
    pub(super) targets: Vec<u64>,
    pub(super) hashes: Vec<NodeHash>,
}

impl BatchProof {
    /// Creates a proof from targets and hashes. The targets must already be sorted and
    /// the hashes in canonical order; proofs built by [crate::accumulator::forest::Forest::prove_batch]
    /// always are.
    pub fn new(targets: Vec<u64>, hashes: Vec<NodeHash>) -> Self {
        BatchProof { targets, hashes }
    }

    /// The positions this proof attests to.
    pub fn targets(&self) -> &[u64] {
        &self.targets
    }

    /// The sibling hashes, in canonical order.
    pub fn hashes(&self) -> &[NodeHash] {
        &self.hashes
    }

    /// Writes the proof in its wire format: a big-endian `u32` target count, the
    /// big-endian `u64` targets, a big-endian `u32` hash count and the raw 32-byte
    /// hashes.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), AccumulatorError> {
        writer.write_all(&(self.targets.len() as u32).to_be_bytes())?;
        for target in &self.targets {
            writer.write_all(&target.to_be_bytes())?;
        }
        writer.write_all(&(self.hashes.len() as u32).to_be_bytes())?;
        for hash in &self.hashes {
            writer.write_all(&**hash)?;
        }
        Ok(())
    }

    /// Reads a proof from its wire format. Targets that are not strictly increasing
    /// are rejected with [AccumulatorError::ProofMismatch]: ordering is part of the
    /// canonical form.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self, AccumulatorError> {
        let n_targets = util::read_u32(reader)?;
        let mut targets = Vec::new();
        for _ in 0..n_targets {
            let target = util::read_u64(reader)?;
            if targets.last().map_or(false, |last| *last >= target) {
                return Err(AccumulatorError::ProofMismatch);
            }
            targets.push(target);
        }

        let n_hashes = util::read_u32(reader)?;
        let mut hashes = Vec::new();
        for _ in 0..n_hashes {
            let mut hash = [0u8; 32];
            reader.read_exact(&mut hash)?;
            hashes.push(NodeHash::new(hash));
        }

        Ok(BatchProof { targets, hashes })
    }

    /// Checks the proof against a set of roots (low row first). `del_hashes` are the
    /// hashes of the targets, in target order. Returns `Ok(false)` when a computed
    /// root disagrees; structural problems (wrong hash count, unsorted targets) are
    /// errors.
    pub fn verify(
        &self,
        del_hashes: &[NodeHash],
        roots: &[NodeHash],
        num_leaves: u64,
    ) -> Result<bool, AccumulatorError> {
        let forest_rows = util::tree_rows(num_leaves);
        let (_, candidates) = self.reconstruct(del_hashes, num_leaves, forest_rows)?;

        for (pos, hash) in candidates {
            if hash.is_empty() {
                continue;
            }
            let row = util::detect_row(pos, forest_rows);
            let idx = util::root_index(num_leaves, row);
            match roots.get(idx) {
                Some(root) if *root == hash => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Rebuilds the partial forest this proof describes: every target, supplied and
    /// computed hash keyed by position, plus the root candidates the upward walk
    /// reached. A target whose hash is empty (unknown to the caller) propagates
    /// "not computable" upward instead of being hashed.
    pub(super) fn reconstruct(
        &self,
        del_hashes: &[NodeHash],
        num_leaves: u64,
        forest_rows: u8,
    ) -> Result<(BTreeMap<u64, NodeHash>, Vec<(u64, NodeHash)>), AccumulatorError> {
        if self.targets.is_empty() {
            if !self.hashes.is_empty() {
                return Err(AccumulatorError::ProofLong);
            }
            return Ok((BTreeMap::new(), Vec::new()));
        }
        if del_hashes.len() != self.targets.len() {
            return Err(AccumulatorError::ProofMismatch);
        }
        for window in self.targets.windows(2) {
            if window[0] >= window[1] {
                return Err(AccumulatorError::ProofMismatch);
            }
        }
        if let Some(last) = self.targets.last() {
            if *last >= num_leaves {
                return Err(AccumulatorError::OutOfRange(*last));
            }
        }

        let proof_positions = util::get_proof_positions(&self.targets, num_leaves, forest_rows);
        if self.hashes.len() < proof_positions.len() {
            return Err(AccumulatorError::ProofShort);
        }
        if self.hashes.len() > proof_positions.len() {
            return Err(AccumulatorError::ProofLong);
        }

        let mut partial: BTreeMap<u64, NodeHash> = proof_positions
            .into_iter()
            .zip(self.hashes.iter().copied())
            .collect();

        // the upward walk, bottom row first; positions ascend row-major so a sorted
        // worklist visits children before parents
        let mut nodes: Vec<(u64, NodeHash)> = self
            .targets
            .iter()
            .copied()
            .zip(del_hashes.iter().copied())
            .collect();
        for (pos, hash) in &nodes {
            if !hash.is_empty() {
                partial.insert(*pos, *hash);
            }
        }

        let mut root_candidates = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            let (pos, hash) = nodes[i];

            if util::is_root_position(pos, num_leaves, forest_rows) {
                root_candidates.push((pos, hash));
                i += 1;
                continue;
            }

            let sibling_pos = pos ^ 1;
            let (left, right, step) = match nodes.get(i + 1) {
                Some((next_pos, next_hash)) if *next_pos == sibling_pos => {
                    (hash, *next_hash, 2)
                }
                _ => {
                    let sibling = partial
                        .get(&sibling_pos)
                        .copied()
                        .ok_or(AccumulatorError::Corrupt("proof position missing"))?;
                    if util::is_left_niece(pos) {
                        (hash, sibling, 1)
                    } else {
                        (sibling, hash, 1)
                    }
                }
            };

            let parent_pos = util::parent(pos, forest_rows);
            let parent_hash = if left.is_empty() || right.is_empty() {
                NodeHash::empty()
            } else {
                NodeHash::parent_hash(&left, &right)
            };
            if !parent_hash.is_empty() {
                partial.insert(parent_pos, parent_hash);
            }

            let at = match nodes.binary_search_by_key(&parent_pos, |(p, _)| *p) {
                Ok(_) => return Err(AccumulatorError::Corrupt("parent computed twice")),
                Err(at) => at,
            };
            nodes.insert(at, (parent_pos, parent_hash));

            i += step;
        }

        Ok((partial, root_candidates))
    }
}

/// The per-block proof bundle the bridge node writes into proof files. The accumulator
/// core only consumes `proof`; the rest is metadata for the block ingestion layer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct UData {
    /// Block height this bundle belongs to.
    pub height: i32,
    /// How many leaves the accumulator had before this block.
    pub prev_num_leaves: u64,
    /// Remaining lifetime, in blocks, of each output created here.
    pub txo_ttls: Vec<i32>,
    /// The inclusion proof for every output this block spends.
    pub proof: BatchProof,
}

impl UData {
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), AccumulatorError> {
        writer.write_all(&self.height.to_be_bytes())?;
        writer.write_all(&self.prev_num_leaves.to_be_bytes())?;
        writer.write_all(&(self.txo_ttls.len() as u32).to_be_bytes())?;
        for ttl in &self.txo_ttls {
            writer.write_all(&ttl.to_be_bytes())?;
        }
        self.proof.serialize(writer)
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self, AccumulatorError> {
        let mut height = [0u8; 4];
        reader.read_exact(&mut height)?;
        let height = i32::from_be_bytes(height);

        let prev_num_leaves = util::read_u64(reader)?;

        let n_ttls = util::read_u32(reader)?;
        let mut txo_ttls = Vec::new();
        for _ in 0..n_ttls {
            let mut ttl = [0u8; 4];
            reader.read_exact(&mut ttl)?;
            txo_ttls.push(i32::from_be_bytes(ttl));
        }

        let proof = BatchProof::deserialize(reader)?;
        Ok(UData {
            height,
            prev_num_leaves,
            txo_ttls,
            proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::accumulator::util::hash_from_u8;

    fn proof_for_zero() -> (BatchProof, Vec<NodeHash>, Vec<NodeHash>) {
        // proving leaf 0 out of 8: siblings at 1, 9 and 13
        let hashes = [
            "4bf5122f344554c53bde2ebb8cd2b7e3d1600ad631c385a5d7cce23c7785459a",
            "67b338aa44310342231133aaa3c452851f811d58f76ffd227f77bf48baf01f6c",
            "7da87f961a8c299d2121abaf39dea8fa5eb64c46fa6774a6215988e26f721921",
        ]
        .iter()
        .map(|hash| NodeHash::from_str(hash).unwrap())
        .collect::<Vec<_>>();

        let roots = vec![NodeHash::from_str(
            "32e62e29f2a6d0ff133e103d5a80ecd360b2c40f7fa76c0d3372925c4cb20371",
        )
        .unwrap()];

        (BatchProof::new(vec![0], hashes), vec![hash_from_u8(0)], roots)
    }

    #[test]
    fn test_verify() {
        let (proof, del_hashes, roots) = proof_for_zero();
        assert!(proof.verify(&del_hashes, &roots, 8).unwrap());
    }

    #[test]
    fn test_verify_bad_root() {
        let (proof, del_hashes, _) = proof_for_zero();
        let roots = vec![hash_from_u8(9)];
        assert!(!proof.verify(&del_hashes, &roots, 8).unwrap());
    }

    #[test]
    fn test_verify_tampered_hash() {
        let (mut proof, del_hashes, roots) = proof_for_zero();
        let mut raw = **proof.hashes.last().unwrap();
        raw[0] ^= 1;
        *proof.hashes.last_mut().unwrap() = NodeHash::new(raw);
        assert!(!proof.verify(&del_hashes, &roots, 8).unwrap());
    }

    #[test]
    fn test_proof_length_checks() {
        let (mut proof, del_hashes, roots) = proof_for_zero();
        let extra = proof.hashes[0];

        proof.hashes.push(extra);
        assert!(matches!(
            proof.verify(&del_hashes, &roots, 8),
            Err(AccumulatorError::ProofLong)
        ));

        proof.hashes.truncate(2);
        assert!(matches!(
            proof.verify(&del_hashes, &roots, 8),
            Err(AccumulatorError::ProofShort)
        ));
    }

    #[test]
    fn test_unsorted_targets() {
        let proof = BatchProof::new(vec![4, 1], vec![]);
        let del_hashes = vec![hash_from_u8(4), hash_from_u8(1)];
        assert!(matches!(
            proof.verify(&del_hashes, &[], 8),
            Err(AccumulatorError::ProofMismatch)
        ));
    }

    #[test]
    fn test_target_out_of_range() {
        let proof = BatchProof::new(vec![12], vec![]);
        let del_hashes = vec![hash_from_u8(0)];
        assert!(matches!(
            proof.verify(&del_hashes, &[], 8),
            Err(AccumulatorError::OutOfRange(12))
        ));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let (proof, _, _) = proof_for_zero();
        let mut buffer = Vec::new();
        proof.serialize(&mut buffer).unwrap();

        // u32 target count + one u64 target + u32 hash count + three 32-byte hashes
        assert_eq!(buffer.len(), 4 + 8 + 4 + 3 * 32);
        assert_eq!(&buffer[..4], &[0, 0, 0, 1]);
        assert_eq!(&buffer[4..12], &[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&buffer[12..16], &[0, 0, 0, 3]);

        let decoded = BatchProof::deserialize(&mut buffer.as_slice()).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn test_deserialize_unsorted() {
        let proof = BatchProof::new(vec![1, 4], vec![]);
        let mut buffer = Vec::new();
        proof.serialize(&mut buffer).unwrap();
        // swap the two targets on the wire
        let mut tampered = buffer.clone();
        tampered[4..12].copy_from_slice(&4u64.to_be_bytes());
        tampered[12..20].copy_from_slice(&1u64.to_be_bytes());

        assert!(matches!(
            BatchProof::deserialize(&mut tampered.as_slice()),
            Err(AccumulatorError::ProofMismatch)
        ));
    }

    #[test]
    fn run_proof_cases() {
        use serde::Deserialize;

        use crate::accumulator::forest::Forest;
        use crate::accumulator::Leaf;

        #[derive(Deserialize)]
        struct ProofCase {
            leaf_preimages: Vec<u8>,
            targets: Vec<u64>,
            proofhashes: Vec<String>,
            expected: bool,
        }
        #[derive(Deserialize)]
        struct TestsJson {
            proof_tests: Vec<ProofCase>,
        }

        let contents = std::fs::read_to_string("test_values/test_cases.json")
            .expect("Something went wrong reading the file");
        let tests = serde_json::from_str::<TestsJson>(contents.as_str())
            .expect("JSON deserialization error");

        for case in tests.proof_tests {
            let mut forest = Forest::new();
            let adds = case
                .leaf_preimages
                .iter()
                .map(|preimage| Leaf {
                    hash: hash_from_u8(*preimage),
                    remember: false,
                })
                .collect::<Vec<_>>();
            forest.modify(&adds, &[]).unwrap();

            let hashes = case
                .proofhashes
                .iter()
                .map(|hash| NodeHash::from_str(hash).unwrap())
                .collect();
            let proof = BatchProof::new(case.targets.clone(), hashes);
            let del_hashes = case
                .targets
                .iter()
                .map(|target| hash_from_u8(*target as u8))
                .collect::<Vec<_>>();

            let valid = proof
                .verify(&del_hashes, &forest.roots(), forest.num_leaves())
                .unwrap();
            assert_eq!(valid, case.expected);
        }
    }

    #[test]
    fn test_udata_roundtrip() {
        let (proof, _, _) = proof_for_zero();
        let udata = UData {
            height: 42,
            prev_num_leaves: 8,
            txo_ttls: vec![1, 100, -1],
            proof,
        };

        let mut buffer = Vec::new();
        udata.serialize(&mut buffer).unwrap();
        let decoded = UData::deserialize(&mut buffer.as_slice()).unwrap();
        assert_eq!(decoded, udata);
    }
}
