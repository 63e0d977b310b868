//! The dense accumulator, the state a bridge node keeps. Every hash of every live node
//! is held in one contiguous array indexed by position, next to a hash-to-position map,
//! so the forest can produce a batch proof for any subset of leaves. This is the
//! memory-hungry end of the spectrum: a [crate::accumulator::pollard::Pollard] holds the
//! same commitment in logarithmic space but can only prove what it was told to remember.
use std::collections::HashMap;
use std::fmt::Debug;
use std::fmt::Display;

use rayon::prelude::*;

use super::error::AccumulatorError;
use super::node_hash::NodeHash;
use super::proof::BatchProof;
use super::transform;
use super::transform::Arrow;
use super::util;
use super::Leaf;

/// The data needed to roll a block's `modify` back: how many leaves it appended, plus
/// the sorted positions and hashes of everything it deleted. Consumed by the reorg
/// handling layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoInfo {
    pub num_adds: u64,
    pub positions: Vec<u64>,
    pub hashes: Vec<NodeHash>,
}

/// A forest of perfect Merkle trees over the accumulated set, one tree root per set bit
/// of the leaf count.
///
/// The allocated height only ever grows; positional arithmetic always runs against the
/// allocated height, so the forest may be taller than the leaf count strictly needs.
/// Leaf positions are unaffected by growth, which keeps the position map stable across
/// reallocation.
pub struct Forest {
    /// How many leaves the forest currently holds. Everything about the shape of the
    /// forest follows from this number.
    num_leaves: u64,
    /// The allocated height. The hash array holds `2 << rows` slots.
    rows: u8,
    /// Every node hash, indexed by position. Slots outside the live forest hold
    /// whatever the last reshape left there and are never read.
    data: Vec<NodeHash>,
    /// Maps each live leaf hash to its position, for proof generation.
    position_map: HashMap<NodeHash, u64>,
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl Forest {
    /// Creates an empty forest.
    /// # Example
    /// ```
    /// use utreexo::accumulator::forest::Forest;
    /// let forest = Forest::new();
    /// assert_eq!(forest.roots().len(), 0);
    /// ```
    pub fn new() -> Self {
        Forest {
            num_leaves: 0,
            rows: 0,
            data: vec![NodeHash::empty(); 2],
            position_map: HashMap::new(),
        }
    }

    /// How many leaves the forest holds.
    pub fn num_leaves(&self) -> u64 {
        self.num_leaves
    }

    /// The root of every tree, lowest row first.
    pub fn roots(&self) -> Vec<NodeHash> {
        util::root_positions(self.num_leaves, self.rows)
            .iter()
            .map(|pos| self.data[*pos as usize])
            .collect()
    }

    /// Deletes `dels` (leaf positions) and then appends `adds`, in that order. This is
    /// the only way to change the accumulator, since the order of operations matters.
    /// On any user error the forest is left untouched.
    pub fn modify(&mut self, adds: &[Leaf], dels: &[u64]) -> Result<UndoInfo, AccumulatorError> {
        let mut dels = dels.to_vec();
        dels.sort_unstable();
        for window in dels.windows(2) {
            if window[0] == window[1] {
                return Err(AccumulatorError::OutOfRange(window[0]));
            }
        }
        if let Some(last) = dels.last() {
            if *last >= self.num_leaves {
                return Err(AccumulatorError::OutOfRange(*last));
            }
        }

        let delta = adds.len() as i64 - dels.len() as i64;
        while self.num_leaves as i64 + delta > 1i64 << self.rows {
            self.remap(self.rows + 1);
        }

        let hashes = dels
            .iter()
            .map(|pos| self.data[*pos as usize])
            .collect::<Vec<_>>();

        self.remove(&dels)?;
        self.add(adds);

        Ok(UndoInfo {
            num_adds: adds.len() as u64,
            positions: dels,
            hashes,
        })
    }

    /// Builds the canonical batch proof for the given leaf hashes: sorted positions
    /// plus exactly the sibling hashes a verifier can't compute, row-major.
    pub fn prove_batch(&self, del_hashes: &[NodeHash]) -> Result<BatchProof, AccumulatorError> {
        let mut targets = Vec::with_capacity(del_hashes.len());
        for hash in del_hashes {
            let pos = self
                .position_map
                .get(hash)
                .copied()
                .ok_or(AccumulatorError::UnknownHash(*hash))?;
            if pos >= self.num_leaves {
                return Err(AccumulatorError::Corrupt("position map past the forest"));
            }
            targets.push(pos);
        }
        targets.sort_unstable();

        let proof_positions = util::get_proof_positions(&targets, self.num_leaves, self.rows);
        let hashes = proof_positions
            .iter()
            .map(|pos| self.data[*pos as usize])
            .collect();

        Ok(BatchProof::new(targets, hashes))
    }

    /// Verifies a batch proof for the given leaf hashes against this forest's roots.
    pub fn verify_batch(
        &self,
        proof: &BatchProof,
        del_hashes: &[NodeHash],
    ) -> Result<bool, AccumulatorError> {
        let mut pairs = Vec::with_capacity(del_hashes.len());
        for hash in del_hashes {
            let pos = self
                .position_map
                .get(hash)
                .copied()
                .ok_or(AccumulatorError::UnknownHash(*hash))?;
            pairs.push((pos, *hash));
        }
        pairs.sort_unstable_by_key(|(pos, _)| *pos);
        let sorted_hashes: Vec<NodeHash> = pairs.into_iter().map(|(_, hash)| hash).collect();

        proof.verify(&sorted_hashes, &self.roots(), self.num_leaves)
    }

    // Appends leaves at the end of row 0. Whenever the new leaf completes a pair of
    // equal-sized trees, the two roll up into a tree one row taller, repeating for
    // every consecutive set bit of the leaf count.
    fn add(&mut self, adds: &[Leaf]) {
        for add in adds {
            debug_assert!(!add.hash.is_empty());
            self.position_map.insert(add.hash, self.num_leaves);

            let roots = util::root_positions(self.num_leaves, self.rows);
            let mut pos = self.num_leaves;
            let mut hash = add.hash;
            self.data[pos as usize] = hash;

            let mut row = 0u8;
            while util::is_root_populated(row, self.num_leaves) {
                // rows 0..row are all populated, so the first `row` roots line up
                let root = self.data[roots[row as usize] as usize];
                hash = NodeHash::parent_hash(&root, &hash);
                pos = util::parent(pos, self.rows);
                self.data[pos as usize] = hash;
                row += 1;
            }
            self.num_leaves += 1;
        }
    }

    // Deletes the sorted, validated positions in `dels`. Runs the transform, executes
    // each row's arrows as subtree swaps, and re-hashes the touched parents before
    // moving to the next row. The hash work units of one row write to disjoint parents
    // and run in parallel; the per-row loop is the barrier.
    fn remove(&mut self, dels: &[u64]) -> Result<(), AccumulatorError> {
        if dels.is_empty() {
            return Ok(());
        }
        let next_num_leaves = self.num_leaves - dels.len() as u64;
        let deleted_hashes: Vec<NodeHash> =
            dels.iter().map(|pos| self.data[*pos as usize]).collect();

        let swap_rows = transform::transform(dels, self.num_leaves, self.rows);
        let mut dirt: Vec<u64> = Vec::new();

        for row in 0..self.rows {
            let mut dests: Vec<u64> = Vec::new();
            for arrow in &swap_rows[row as usize] {
                if arrow.from == arrow.to {
                    continue;
                }
                self.swap_nodes(*arrow, row);
                dests.push(util::parent(arrow.to, self.rows));
            }
            for d in &dirt {
                dests.push(util::parent(*d, self.rows));
            }
            dests.sort_unstable();
            dests.dedup();
            dirt.clear();

            let mut units: Vec<(u64, NodeHash, NodeHash)> = Vec::new();
            for dest in dests {
                if !util::is_in_forest(dest, self.num_leaves, self.rows) {
                    continue;
                }
                let left = self.data[util::left_child(dest, self.rows) as usize];
                let right = self.data[util::right_child(dest, self.rows) as usize];
                if left.is_empty() || right.is_empty() {
                    return Err(AccumulatorError::Corrupt("missing child under live parent"));
                }
                units.push((dest, left, right));
                dirt.push(dest);
            }

            let hashed: Vec<(u64, NodeHash)> = units
                .par_iter()
                .map(|(dest, l, r)| (*dest, NodeHash::parent_hash(l, r)))
                .collect();
            for (dest, hash) in hashed {
                self.data[dest as usize] = hash;
            }
        }

        self.num_leaves = next_num_leaves;
        for hash in deleted_hashes {
            self.position_map.remove(&hash);
        }
        Ok(())
    }

    // Executes one arrow at the given row: the whole subtree under `from` trades places
    // with the one under `to`, one hash range per row from the leaves up. The leaf row
    // updates the position map for everything it moved.
    fn swap_nodes(&mut self, arrow: Arrow, row: u8) {
        if row == 0 {
            self.data.swap(arrow.from as usize, arrow.to as usize);
            self.update_map(arrow.from);
            self.update_map(arrow.to);
            return;
        }

        let mut a = util::child_many(arrow.from, row, self.rows);
        let mut b = util::child_many(arrow.to, row, self.rows);
        let mut run = 1u64 << row;
        let mut on_leaf_row = true;

        while run != 0 {
            for i in 0..run {
                self.data.swap((a + i) as usize, (b + i) as usize);
            }
            if on_leaf_row {
                for i in 0..run {
                    self.update_map(a + i);
                    self.update_map(b + i);
                }
                on_leaf_row = false;
            }
            a = util::parent(a, self.rows);
            b = util::parent(b, self.rows);
            run >>= 1;
        }
    }

    fn update_map(&mut self, pos: u64) {
        let hash = self.data[pos as usize];
        if !hash.is_empty() {
            self.position_map.insert(hash, pos);
        }
    }

    // Grows the forest by one row. Row 0 stays put; every row above shifts to its
    // start position in the taller layout.
    fn remap(&mut self, dest_rows: u8) {
        let mut new_data = vec![NodeHash::empty(); 2usize << dest_rows];
        for row in 0..=self.rows {
            let old_start = util::start_position_at_row(row, self.rows) as usize;
            let new_start = util::start_position_at_row(row, dest_rows) as usize;
            let count = 1usize << (self.rows - row);
            new_data[new_start..new_start + count]
                .copy_from_slice(&self.data[old_start..old_start + count]);
        }
        self.data = new_data;
        self.rows = dest_rows;
    }

    fn get_hash(&self, pos: u64) -> Option<NodeHash> {
        if !util::is_in_forest(pos, self.num_leaves, self.rows) {
            return None;
        }
        Some(self.data[pos as usize])
    }

    /// Renders the whole forest for accumulators up to 5 rows, or just the roots for
    /// anything bigger. Debugging aid.
    fn string(&self) -> String {
        if self.num_leaves == 0 {
            return "empty".to_owned();
        }
        let fh = self.rows;
        if fh > 5 {
            let s = format!("Can't print {} leaves. roots:\n", self.num_leaves);
            return self.roots().iter().fold(s, |mut a, b| {
                a.push_str(&b.to_string());
                a.push('\n');
                a
            });
        }

        let mut output = vec!["".to_string(); (fh as usize * 2) + 1];
        let mut pos: u64 = 0;
        for h in 0..=fh {
            let row_len = 1u64 << (fh - h);
            for _ in 0..row_len {
                let max = util::max_position_at_row(h, fh, self.num_leaves);
                if max >= pos {
                    match self.get_hash(pos) {
                        Some(val) if !val.is_empty() => {
                            output[h as usize * 2]
                                .push_str(format!("{:0>2}:{} ", pos, &val.to_string()[..4]).as_str());
                        }
                        _ => {
                            output[h as usize * 2].push_str("        ");
                        }
                    }
                }

                if h > 0 {
                    output[(h as usize * 2) - 1].push_str("|-------");
                    for _ in 0..((1u64 << h) - 1) / 2 {
                        output[(h as usize * 2) - 1].push_str("--------");
                    }
                    output[(h as usize * 2) - 1].push_str("\\       ");
                    for _ in 0..((1u64 << h) - 1) / 2 {
                        output[(h as usize * 2) - 1].push_str("        ");
                    }
                    for _ in 0..(1u64 << h) - 1 {
                        output[h as usize * 2].push_str("        ");
                    }
                }
                pos += 1;
            }
        }

        output.iter().rev().fold(String::new(), |mut a, b| {
            a.push_str(b);
            a.push('\n');
            a
        })
    }
}

impl Debug for Forest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string())
    }
}

impl Display for Forest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string())
    }
}

#[cfg(test)]
impl Forest {
    /// Checks the parent hash invariant over every live internal node.
    pub(crate) fn sanity(&self) -> Result<(), String> {
        for pos in 0..(2u64 << self.rows) - 1 {
            if !util::is_in_forest(pos, self.num_leaves, self.rows) {
                continue;
            }
            if self.data[pos as usize].is_empty() {
                return Err(format!("empty hash at live position {pos}"));
            }
            if util::detect_row(pos, self.rows) == 0 {
                continue;
            }
            let left = util::left_child(pos, self.rows) as usize;
            let expected = NodeHash::parent_hash(&self.data[left], &self.data[left + 1]);
            if self.data[pos as usize] != expected {
                return Err(format!("hash mismatch at position {pos}"));
            }
        }
        Ok(())
    }

    /// Checks that the position map is exactly the live leaf set, with no stale
    /// entries left behind by deletions.
    pub(crate) fn position_map_sanity(&self) -> Result<(), String> {
        if self.position_map.len() as u64 != self.num_leaves {
            return Err(format!(
                "position map has {} entries for {} leaves",
                self.position_map.len(),
                self.num_leaves
            ));
        }
        for pos in 0..self.num_leaves {
            let hash = self.data[pos as usize];
            if self.position_map.get(&hash) != Some(&pos) {
                return Err(format!("position map entry for leaf {pos} is wrong"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde::Deserialize;

    use super::*;
    use crate::accumulator::util::hash_from_u8;

    fn leaves_from_preimages(values: &[u8]) -> Vec<Leaf> {
        values
            .iter()
            .map(|value| Leaf {
                hash: hash_from_u8(*value),
                remember: false,
            })
            .collect()
    }

    #[derive(Debug, Deserialize)]
    struct TestCase {
        leaf_preimages: Vec<u8>,
        target_values: Option<Vec<u64>>,
        expected_roots: Vec<String>,
    }

    fn run_single_addition_case(case: &TestCase) {
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&case.leaf_preimages), &[])
            .expect("insertion is valid");

        assert_eq!(forest.num_leaves(), case.leaf_preimages.len() as u64);
        let expected = case
            .expected_roots
            .iter()
            .map(|root| NodeHash::from_str(root).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(forest.roots(), expected, "case {case:?}");

        forest.sanity().unwrap();
        forest.position_map_sanity().unwrap();
    }

    fn run_case_with_deletion(case: &TestCase) {
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&case.leaf_preimages), &[])
            .expect("insertion is valid");
        forest
            .modify(&[], case.target_values.as_ref().unwrap())
            .expect("deletion is valid");

        let expected = case
            .expected_roots
            .iter()
            .map(|root| NodeHash::from_str(root).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(forest.roots(), expected, "case {case:?}");

        forest.sanity().unwrap();
        forest.position_map_sanity().unwrap();
    }

    #[test]
    fn run_test_cases() {
        #[derive(Deserialize)]
        struct TestsJson {
            insertion_tests: Vec<TestCase>,
            deletion_tests: Vec<TestCase>,
        }

        let contents = std::fs::read_to_string("test_values/test_cases.json")
            .expect("Something went wrong reading the file");

        let tests = serde_json::from_str::<TestsJson>(contents.as_str())
            .expect("JSON deserialization error");

        for case in tests.insertion_tests {
            run_single_addition_case(&case);
        }
        for case in tests.deletion_tests {
            run_case_with_deletion(&case);
        }
    }

    #[test]
    fn test_new_forest() {
        let forest = Forest::new();
        assert_eq!(forest.num_leaves(), 0);
        assert!(forest.roots().is_empty());
    }

    #[test]
    fn test_add_eight() {
        // eight leaves make a single tree; its root is the plain Merkle root under
        // the double-sha256 parent rule
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3, 4, 5, 6, 7]), &[])
            .unwrap();

        assert_eq!(forest.num_leaves(), 8);
        assert_eq!(
            forest.roots(),
            vec![NodeHash::from_str(
                "32e62e29f2a6d0ff133e103d5a80ecd360b2c40f7fa76c0d3372925c4cb20371"
            )
            .unwrap()]
        );
    }

    #[test]
    fn test_remove_from_eight() {
        // continuing from eight leaves, deleting 2, 5 and 6 leaves five: a lone leaf
        // root (the old leaf 7) and a four-leaf tree over [0, 1, 4, 3]
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3, 4, 5, 6, 7]), &[])
            .unwrap();
        forest.modify(&[], &[2, 5, 6]).unwrap();

        assert_eq!(forest.num_leaves(), 5);
        let expected = [
            "ca358758f6d27e6cf45272937977a748fd88391db679ceda7dc7bf1f005ee879",
            "5973d08efe632a786ca82009377809f81d28a86d5e19f8ad8d9a95e1a7a03a77",
        ]
        .iter()
        .map(|hash| NodeHash::from_str(hash).unwrap())
        .collect::<Vec<_>>();
        assert_eq!(forest.roots(), expected);

        forest.sanity().unwrap();
        forest.position_map_sanity().unwrap();

        // the deleted hashes are really gone from the position map
        for deleted in [2u8, 5, 6] {
            let err = forest.prove_batch(&[hash_from_u8(deleted)]);
            assert!(matches!(err, Err(AccumulatorError::UnknownHash(_))));
        }
    }

    #[test]
    fn test_add_after_remove() {
        // delete and add in one modify, then delete again; pins the interaction of
        // the transform with the row growth
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3, 4, 5, 6, 7]), &[])
            .unwrap();
        forest
            .modify(&leaves_from_preimages(&[8, 9, 10]), &[2, 5, 6])
            .unwrap();

        assert_eq!(forest.num_leaves(), 8);
        assert_eq!(
            forest.roots(),
            vec![NodeHash::from_str(
                "df65c3a453ccd385a39fb9405209e72f9a0106ff1f5e3532e0643fd35cdad831"
            )
            .unwrap()]
        );

        forest.modify(&[], &[0, 3]).unwrap();
        assert_eq!(forest.num_leaves(), 6);
        let expected = [
            "392cd27a1ccc243d54f3b103e0e4d1e2a475260e6c6276f1847576d533bdbe0a",
            "5d4d247f206739be3963f451a9a0a0da8f7c5ae5bab620881ccbc1335976a16f",
        ]
        .iter()
        .map(|hash| NodeHash::from_str(hash).unwrap())
        .collect::<Vec<_>>();
        assert_eq!(forest.roots(), expected);

        forest.sanity().unwrap();
        forest.position_map_sanity().unwrap();
    }

    #[test]
    fn test_incremental_growth() {
        // adding one leaf at a time reshapes through every intermediate forest
        let mut forest = Forest::new();
        for i in 0..21u8 {
            forest.modify(&leaves_from_preimages(&[i]), &[]).unwrap();
            forest.sanity().unwrap();
            forest.position_map_sanity().unwrap();
        }

        let expected = [
            "83891d7fe85c33e52c8b4e5814c92fb6a3b9467299200538a6babaa8b452d879",
            "98fa38ee75d616b576cb13934c2f3c42bdfb58fa50238ba1d62b404ea4ef8730",
            "c90734ee968b2d47f6c5938f943ac4af2158b45bb11e9cd830fdd48c242783b7",
        ]
        .iter()
        .map(|hash| NodeHash::from_str(hash).unwrap())
        .collect::<Vec<_>>();
        assert_eq!(forest.roots(), expected);
    }

    #[test]
    fn test_prove_and_verify() {
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3, 4, 5, 6, 7]), &[])
            .unwrap();

        let del_hashes = [2u8, 1, 4, 6]
            .iter()
            .map(|v| hash_from_u8(*v))
            .collect::<Vec<_>>();
        let proof = forest.prove_batch(&del_hashes).unwrap();

        assert_eq!(proof.targets(), &[1, 2, 4, 6]);
        let expected_hashes = [
            "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d",
            "084fed08b978af4d7d196a7446a86b58009e636b611db16211b65a9aadff29c5",
            "e77b9a9ae9e30b0dbdb6f510a264ef9de781501d7b6b92ae89eb059c5ab743db",
            "ca358758f6d27e6cf45272937977a748fd88391db679ceda7dc7bf1f005ee879",
        ]
        .iter()
        .map(|hash| NodeHash::from_str(hash).unwrap())
        .collect::<Vec<_>>();
        assert_eq!(proof.hashes(), expected_hashes.as_slice());

        assert!(forest.verify_batch(&proof, &del_hashes).unwrap());
    }

    #[test]
    fn test_canonical_proofs() {
        // equal forests produce byte-identical proofs
        let build = || {
            let mut forest = Forest::new();
            forest
                .modify(&leaves_from_preimages(&(0..21u8).collect::<Vec<_>>()), &[])
                .unwrap();
            forest.modify(&[], &[0, 4, 9, 10, 15, 20]).unwrap();
            forest
        };
        let (a, b) = (build(), build());

        let del_hashes = [1u8, 2, 3, 16]
            .iter()
            .map(|v| hash_from_u8(*v))
            .collect::<Vec<_>>();
        let proof_a = a.prove_batch(&del_hashes).unwrap();
        let proof_b = b.prove_batch(&del_hashes).unwrap();

        let mut bytes_a = Vec::new();
        let mut bytes_b = Vec::new();
        proof_a.serialize(&mut bytes_a).unwrap();
        proof_b.serialize(&mut bytes_b).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn test_prove_unknown_hash() {
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3]), &[])
            .unwrap();

        let err = forest.prove_batch(&[hash_from_u8(9)]);
        assert!(matches!(err, Err(AccumulatorError::UnknownHash(_))));
    }

    #[test]
    fn test_modify_errors() {
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3]), &[])
            .unwrap();

        assert!(matches!(
            forest.modify(&[], &[4]),
            Err(AccumulatorError::OutOfRange(4))
        ));
        assert!(matches!(
            forest.modify(&[], &[1, 1]),
            Err(AccumulatorError::OutOfRange(1))
        ));
        // failed modify left the state alone
        assert_eq!(forest.num_leaves(), 4);
        forest.sanity().unwrap();
    }

    #[test]
    fn test_undo_info() {
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3, 4, 5, 6, 7]), &[])
            .unwrap();

        let undo = forest
            .modify(&leaves_from_preimages(&[8]), &[6, 2, 5])
            .unwrap();
        assert_eq!(undo.num_adds, 1);
        assert_eq!(undo.positions, vec![2, 5, 6]);
        assert_eq!(
            undo.hashes,
            vec![hash_from_u8(2), hash_from_u8(5), hash_from_u8(6)]
        );
    }

    #[test]
    fn test_delete_everything() {
        let mut forest = Forest::new();
        forest
            .modify(&leaves_from_preimages(&[0, 1, 2, 3]), &[])
            .unwrap();
        forest.modify(&[], &[0, 1, 2, 3]).unwrap();

        assert_eq!(forest.num_leaves(), 0);
        assert!(forest.roots().is_empty());
        forest.position_map_sanity().unwrap();
    }
}
