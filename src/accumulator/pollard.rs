//! The sparse accumulator, the state a compact client keeps. Instead of every hash, a
//! Pollard holds the roots plus whichever subtrees are needed to maintain proofs for the
//! leaves the caller asked to remember; everything else is pruned away and learned back
//! on demand by ingesting batch proofs from a bridge node.
//!
//! Nodes hold their hash and two **niece** pointers (not children!): a node stores the
//! two children of its *sibling*. Roots have no sibling, so a root's nieces are its own
//! children. The cross-wiring is load-bearing: a Merkle proof consists of siblings, so
//! walking toward a leaf through niece pointers touches exactly the nodes the proof
//! needs, one pointer chase per row.
//!
//! ```!
//! // 06
//! // |-------\
//! // 04      05
//! // |---\   |---\
//! // 00  01  02  03
//! ```
//! Here `06` (a root) points to `04` and `05`; `04` stores `02` and `03` while `05`
//! stores `00` and `01`.
//!
//! Nodes live in an arena and point at each other by index, with index zero reserved as
//! the null sentinel. Missing interior nodes materialize on demand with an empty hash
//! while reshaping, which is also how ingesting a proof later can fill exactly those
//! nodes in. Slots that become unreachable after a reshape go back on a free list.
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct NodeIdx(u32);

const NULL: NodeIdx = NodeIdx(0);

impl NodeIdx {
    fn is_null(self) -> bool {
        self.0 == 0
    }

    fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PolNode {
    data: NodeHash,
    nieces: [NodeIdx; 2],
    /// Set on leaves the caller wants proofs maintained for. Pruning never drops a
    /// niece pair that can reach a set flag.
    remember: bool,
}

/// The compact accumulator: a list of roots (lowest row first) over an arena of
/// niece-wired nodes.
///
/// A Pollard tracks the same forest as a [crate::accumulator::forest::Forest] fed the
/// same operations, and exposes the same roots, but only materializes the branches
/// needed for remembered leaves plus whatever proofs were ingested since the last
/// reshape.
pub struct Pollard {
    /// How many leaves were ever added minus how many were deleted. The whole shape
    /// of the forest follows from this number.
    num_leaves: u64,
    /// One root per set bit of `num_leaves`, lowest row first.
    roots: Vec<NodeIdx>,
    /// Node storage. Slot 0 is reserved: it's the null sentinel and always empty.
    arena: Vec<PolNode>,
    /// Recycled arena slots.
    free: Vec<NodeIdx>,
}

impl Default for Pollard {
    fn default() -> Self {
        Self::new()
    }
}

impl Pollard {
    /// Creates an empty Pollard.
    /// # Example
    /// ```
    /// use utreexo::accumulator::pollard::Pollard;
    /// let pollard = Pollard::new();
    /// assert_eq!(pollard.roots().len(), 0);
    /// ```
    pub fn new() -> Self {
        Pollard {
            num_leaves: 0,
            roots: Vec::new(),
            arena: vec![PolNode::default()],
            free: Vec::new(),
        }
    }

    /// How many leaves the accumulator holds.
    pub fn num_leaves(&self) -> u64 {
        self.num_leaves
    }

    /// The hash of every root, lowest row first. Always equal to the roots of a forest
    /// that saw the same history.
    pub fn roots(&self) -> Vec<NodeHash> {
        self.roots.iter().map(|root| self.data(*root)).collect()
    }

    /// Deletes `dels` (leaf positions) and then appends `adds`, in that order. Deleted
    /// positions must have been proven into the pollard first (see
    /// [Pollard::ingest_batch_proof]) or be covered by remembered branches; the reshape
    /// navigates through those nodes. On any user error the pollard is left untouched.
    pub fn modify(&mut self, adds: &[Leaf], dels: &[u64]) -> Result<(), AccumulatorError> {
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

        self.rem2(&dels)?;
        self.add(adds);
        for root in self.roots.clone() {
            self.sweep(root);
        }
        Ok(())
    }

    /// Verifies a batch proof against the pollard's state and hooks every hash it
    /// carries into the right niece slot, reconstituting the branches needed to later
    /// delete the targets.
    ///
    /// The upward walk recomputes whatever it can: target hashes the pollard already
    /// knows feed into parents, and every recomputed or supplied hash is compared
    /// against the pollard's version of that node (and against the roots) wherever one
    /// exists. Any disagreement fails with [AccumulatorError::ProofMismatch] and leaves
    /// the pollard unchanged. Targets of leaves the pollard never saw verify vacuously;
    /// their branches are still installed so the deletion can navigate them.
    pub fn ingest_batch_proof(&mut self, proof: &BatchProof) -> Result<(), AccumulatorError> {
        if proof.targets().is_empty() {
            if !proof.hashes().is_empty() {
                return Err(AccumulatorError::ProofLong);
            }
            return Ok(());
        }
        let forest_rows = util::tree_rows(self.num_leaves);

        // whatever the pollard already knows about the targets feeds the walk
        let mut del_hashes = Vec::with_capacity(proof.targets().len());
        for target in proof.targets() {
            let hash = if *target < self.num_leaves {
                self.read_pos(*target)
                    .map(|(node, _, _)| node)
                    .unwrap_or_default()
            } else {
                NodeHash::empty()
            };
            del_hashes.push(hash);
        }

        let (partial, root_candidates) =
            proof.reconstruct(&del_hashes, self.num_leaves, forest_rows)?;

        for (pos, hash) in &partial {
            if hash.is_empty() {
                continue;
            }
            let (known, _, _) = self.read_pos(*pos)?;
            if !known.is_empty() && known != *hash {
                return Err(AccumulatorError::ProofMismatch);
            }
        }
        for (pos, hash) in &root_candidates {
            if hash.is_empty() {
                continue;
            }
            let row = util::detect_row(*pos, forest_rows);
            let root = self
                .roots
                .get(util::root_index(self.num_leaves, row))
                .copied()
                .ok_or(AccumulatorError::Corrupt("root candidate without a root"))?;
            let root_hash = self.data(root);
            if !root_hash.is_empty() && root_hash != *hash {
                return Err(AccumulatorError::ProofMismatch);
            }
        }

        // everything checked out, hook the branches in
        for (pos, hash) in partial {
            if hash.is_empty() || util::is_root_position(pos, self.num_leaves, forest_rows) {
                continue;
            }
            let (par, parsib, lr) = self.grab_pos2(pos)?;
            if par.is_none() {
                continue;
            }
            let parsib = parsib.ok_or(AccumulatorError::Corrupt("ingest lost a sibling"))?;
            let node = self.niece_or_new(parsib, lr as usize);
            if self.arena[node.get()].data.is_empty() {
                self.arena[node.get()].data = hash;
            }
        }
        Ok(())
    }

    /// Reads the node at `pos` along with its sibling and its parent, without
    /// materializing anything. Pruned or never-learned nodes read as empty; a root
    /// reads with an empty sibling and parent.
    pub fn read_pos(&self, pos: u64) -> Result<(NodeHash, NodeHash, NodeHash), AccumulatorError> {
        let forest_rows = util::tree_rows(self.num_leaves);
        if !util::is_in_forest(pos, self.num_leaves, forest_rows) {
            return Err(AccumulatorError::OutOfRange(pos));
        }
        let (tree, branch_len, bits) = util::detect_offset(pos, self.num_leaves);
        if tree as usize >= self.roots.len() {
            return Err(AccumulatorError::Corrupt("tree index past the root list"));
        }
        let slot = self.root_slot(tree);

        if branch_len == 0 {
            let root = self.roots[slot];
            return Ok((self.data(root), NodeHash::empty(), NodeHash::empty()));
        }

        let mut par = self.roots[slot];
        let mut parsib = self.roots[slot];
        for h in (1..branch_len).rev() {
            let lr = ((bits >> h) & 1) as usize;
            let nieces = self.arena[parsib.get()].nieces;
            par = nieces[lr ^ 1];
            parsib = nieces[lr];
            if parsib.is_null() {
                return Ok((NodeHash::empty(), NodeHash::empty(), NodeHash::empty()));
            }
        }

        let lr = (pos & 1) as usize;
        let nieces = self.arena[parsib.get()].nieces;
        Ok((
            self.data(nieces[lr]),
            self.data(nieces[lr ^ 1]),
            self.data(par),
        ))
    }
}

// private methods

impl Pollard {
    fn data(&self, idx: NodeIdx) -> NodeHash {
        self.arena[idx.get()].data
    }

    fn root_slot(&self, tree: u8) -> usize {
        // detect_offset counts trees biggest first, the root list is lowest row first
        self.roots.len() - 1 - tree as usize
    }

    fn alloc(&mut self, node: PolNode) -> NodeIdx {
        if let Some(idx) = self.free.pop() {
            self.arena[idx.get()] = node;
            return idx;
        }
        debug_assert!(self.arena.len() < u32::MAX as usize);
        self.arena.push(node);
        NodeIdx((self.arena.len() - 1) as u32)
    }

    fn niece_or_new(&mut self, parent: NodeIdx, slot: usize) -> NodeIdx {
        let existing = self.arena[parent.get()].nieces[slot];
        if !existing.is_null() {
            return existing;
        }
        let new = self.alloc(PolNode::default());
        self.arena[parent.get()].nieces[slot] = new;
        new
    }

    // Appends leaves one at a time: grab the lowest root, swap nieces with the new
    // node, hash the pair, make the parent that owns both, and keep going while the
    // next row up already has a root. Each new parent prunes whatever the merge made
    // forgettable.
    fn add(&mut self, adds: &[Leaf]) {
        for add in adds {
            debug_assert!(!add.hash.is_empty());
            self.add_one(*add);
        }
    }

    fn add_one(&mut self, leaf: Leaf) {
        let mut n = self.alloc(PolNode {
            data: leaf.hash,
            nieces: [NULL; 2],
            remember: leaf.remember,
        });

        let mut row = 0u8;
        while util::is_root_populated(row, self.num_leaves) {
            let left_root = self.roots.remove(0);

            // the merging pair become siblings, so they take each other's children
            let tmp = self.arena[left_root.get()].nieces;
            self.arena[left_root.get()].nieces = self.arena[n.get()].nieces;
            self.arena[n.get()].nieces = tmp;

            let hash = NodeHash::parent_hash(&self.data(left_root), &self.data(n));
            let parent = self.alloc(PolNode {
                data: hash,
                nieces: [left_root, n],
                remember: false,
            });
            self.prune_nieces(parent);

            n = parent;
            row += 1;
        }

        self.roots.insert(0, n);
        self.num_leaves += 1;
    }

    // Deletes the sorted, validated positions. Same geometry as the dense forest:
    // run the transform, execute each row's arrows as niece pointer exchanges,
    // re-hash the parents whose children moved (in parallel, with the row as the
    // barrier), then pick up the new roots and drop whatever became unreachable.
    fn rem2(&mut self, dels: &[u64]) -> Result<(), AccumulatorError> {
        if dels.is_empty() {
            return Ok(());
        }
        let forest_rows = util::tree_rows(self.num_leaves);
        let next_num_leaves = self.num_leaves - dels.len() as u64;
        let swap_rows = transform::transform(dels, self.num_leaves, forest_rows);

        let mut dirt: Vec<u64> = Vec::new();
        for row in 0..forest_rows {
            let mut dests: Vec<u64> = Vec::new();
            for arrow in &swap_rows[row as usize] {
                if arrow.from == arrow.to {
                    continue;
                }
                self.swap_nodes(*arrow)?;
                dests.push(util::parent(arrow.to, forest_rows));
            }
            for d in &dirt {
                dests.push(util::parent(*d, forest_rows));
            }
            dests.sort_unstable();
            dests.dedup();
            dirt.clear();

            let mut units: Vec<(NodeIdx, NodeHash, NodeHash)> = Vec::new();
            for dest in dests {
                if !util::is_in_forest(dest, self.num_leaves, forest_rows) {
                    continue;
                }
                // find the node at dest and its children: the children of a regular
                // node hang off its sibling, a root holds its own
                let (node, children) = match self.grab_pos2(dest)? {
                    (None, _, tree) => {
                        let root = self.roots[self.root_slot(tree)];
                        (root, self.arena[root.get()].nieces)
                    }
                    (Some(_), Some(parsib), lr) => {
                        let node = self.arena[parsib.get()].nieces[lr as usize];
                        let sibling = self.arena[parsib.get()].nieces[(lr ^ 1) as usize];
                        if node.is_null() || sibling.is_null() {
                            continue;
                        }
                        (node, self.arena[sibling.get()].nieces)
                    }
                    _ => return Err(AccumulatorError::Corrupt("grab without a sibling")),
                };
                let [a, b] = children;
                let (left, right) = (self.data(a), self.data(b));
                if left.is_empty() || right.is_empty() {
                    // the children live in a pruned region; their parent only
                    // matters if something here was tracked, and nothing was
                    continue;
                }
                units.push((node, left, right));
                dirt.push(dest);
            }

            let hashed: Vec<(NodeIdx, NodeHash)> = units
                .par_iter()
                .map(|(idx, left, right)| (*idx, NodeHash::parent_hash(left, right)))
                .collect();
            for (idx, hash) in hashed {
                self.arena[idx.get()].data = hash;
            }
        }

        // grab the new roots, lowest row first; the lowest sit deepest and must be
        // taken before the rows above have their nieces re-hung
        let mut next_roots = Vec::with_capacity(util::num_roots(next_num_leaves));
        for pos in util::root_positions(next_num_leaves, forest_rows) {
            let (par, parsib, lr) = self.grab_pos2(pos)?;
            match par {
                // was already a root; lr says which one
                None => next_roots.push(self.roots[self.root_slot(lr)]),
                Some(_) => {
                    let parsib =
                        parsib.ok_or(AccumulatorError::Corrupt("root grab lost a sibling"))?;
                    let node = self.niece_or_new(parsib, lr as usize);
                    let sibling = self.arena[parsib.get()].nieces[(lr ^ 1) as usize];
                    if !sibling.is_null() {
                        // as a root its nieces become its own children, which its
                        // old sibling was holding
                        self.arena[node.get()].nieces = self.arena[sibling.get()].nieces;
                    }
                    next_roots.push(node);
                }
            }
        }

        self.roots = next_roots;
        self.num_leaves = next_num_leaves;
        self.reclaim();
        Ok(())
    }

    // Executes one arrow. Both endpoints and their siblings are materialized first;
    // reshaping through a pruned region just shuffles empty nodes around.
    fn swap_nodes(&mut self, arrow: Arrow) -> Result<(), AccumulatorError> {
        let forest_rows = util::tree_rows(self.num_leaves);
        if !util::is_in_forest(arrow.from, self.num_leaves, forest_rows)
            || !util::is_in_forest(arrow.to, self.num_leaves, forest_rows)
        {
            return Err(AccumulatorError::OutOfRange(arrow.from.max(arrow.to)));
        }

        let (apar, aparsib, alr) = self.grab_pos2(arrow.from)?;
        let (bpar, bparsib, blr) = self.grab_pos2(arrow.to)?;

        match (apar, bpar) {
            (Some(_), Some(_)) => {
                let aparsib =
                    aparsib.ok_or(AccumulatorError::Corrupt("swap lost from's sibling"))?;
                let bparsib = bparsib.ok_or(AccumulatorError::Corrupt("swap lost to's sibling"))?;
                let a = self.niece_or_new(aparsib, alr as usize);
                let b = self.niece_or_new(bparsib, blr as usize);

                if arrow.from != (arrow.to ^ 1) {
                    // not siblings: the endpoints trade niece pairs and so do their
                    // siblings, which keeps every pair hanging under the right aunt
                    // (each node stores its sibling's children, and both endpoints
                    // are about to change siblings)
                    let asib = self.niece_or_new(aparsib, (alr ^ 1) as usize);
                    let bsib = self.niece_or_new(bparsib, (blr ^ 1) as usize);
                    let tmp = self.arena[asib.get()].nieces;
                    self.arena[asib.get()].nieces = self.arena[bsib.get()].nieces;
                    self.arena[bsib.get()].nieces = tmp;
                    let tmp = self.arena[a.get()].nieces;
                    self.arena[a.get()].nieces = self.arena[b.get()].nieces;
                    self.arena[b.get()].nieces = tmp;
                }

                self.arena[aparsib.get()].nieces[alr as usize] = b;
                self.arena[bparsib.get()].nieces[blr as usize] = a;
            }
            (None, Some(_)) => self.swap_root(alr, bparsib, blr)?,
            (Some(_), None) => self.swap_root(blr, aparsib, alr)?,
            (None, None) => return Err(AccumulatorError::Corrupt("swap between two roots")),
        }
        Ok(())
    }

    // The "top swap": a root trades places with an ordinary node. The node, its
    // sibling and the root rotate their niece pairs, then the node and the root
    // swap owners.
    fn swap_root(
        &mut self,
        tree: u8,
        parsib: Option<NodeIdx>,
        lr: u8,
    ) -> Result<(), AccumulatorError> {
        let parsib = parsib.ok_or(AccumulatorError::Corrupt("top swap without a sibling"))?;
        let x = self.niece_or_new(parsib, lr as usize);
        let y = self.niece_or_new(parsib, (lr ^ 1) as usize);
        let slot = self.root_slot(tree);
        let root = self.roots[slot];

        let xn = self.arena[x.get()].nieces;
        let yn = self.arena[y.get()].nieces;
        let rn = self.arena[root.get()].nieces;
        self.arena[x.get()].nieces = yn;
        self.arena[y.get()].nieces = rn;
        self.arena[root.get()].nieces = xn;

        self.roots[slot] = x;
        self.arena[parsib.get()].nieces[lr as usize] = root;
        Ok(())
    }

    // Returns the parent of `pos` and the parent's sibling, materializing missing
    // interior nodes on the way down. If `pos` is a root there is no parent; the
    // returned u8 then says which tree (biggest first) instead of the niece slot.
    fn grab_pos2(
        &mut self,
        pos: u64,
    ) -> Result<(Option<NodeIdx>, Option<NodeIdx>, u8), AccumulatorError> {
        let forest_rows = util::tree_rows(self.num_leaves);
        if !util::is_in_forest(pos, self.num_leaves, forest_rows) {
            return Err(AccumulatorError::OutOfRange(pos));
        }
        let (tree, branch_len, bits) = util::detect_offset(pos, self.num_leaves);
        if tree as usize >= self.roots.len() {
            return Err(AccumulatorError::Corrupt("tree index past the root list"));
        }
        if branch_len == 0 {
            return Ok((None, None, tree));
        }

        let slot = self.root_slot(tree);
        let mut par = self.roots[slot];
        let mut parsib = self.roots[slot];
        for h in (1..branch_len).rev() {
            let lr = ((bits >> h) & 1) as usize;
            let next_par = self.niece_or_new(parsib, lr ^ 1);
            let next_parsib = self.niece_or_new(parsib, lr);
            par = next_par;
            parsib = next_parsib;
        }

        Ok((Some(par), Some(parsib), (pos & 1) as u8))
    }

    // Walks a whole subtree dropping every niece pair that can't reach a remembered
    // leaf, bottom-up. Run after a modify: branches hooked in for proof ingestion
    // have served their purpose by then and should not outlive the remembered set.
    // Returns whether anything under `idx` (itself included) is remembered.
    fn sweep(&mut self, idx: NodeIdx) -> bool {
        if idx.is_null() {
            return false;
        }
        let [a, b] = self.arena[idx.get()].nieces;
        let keep_a = self.sweep(a);
        let keep_b = self.sweep(b);
        if (!a.is_null() || !b.is_null()) && !keep_a && !keep_b {
            self.free_subtree(a);
            self.free_subtree(b);
            self.arena[idx.get()].nieces = [NULL, NULL];
        }
        self.arena[idx.get()].remember || keep_a || keep_b
    }

    // Drops both nieces of `idx` if the whole pair is forgettable. All or nothing:
    // if either side can reach a remembered leaf, both siblings stay, since a proof
    // for one needs the other.
    fn prune_nieces(&mut self, idx: NodeIdx) {
        let [a, b] = self.arena[idx.get()].nieces;
        if self.forgettable(a) && self.forgettable(b) {
            self.free_subtree(a);
            self.free_subtree(b);
            self.arena[idx.get()].nieces = [NULL, NULL];
        }
    }

    fn forgettable(&self, idx: NodeIdx) -> bool {
        if idx.is_null() {
            return true;
        }
        let node = &self.arena[idx.get()];
        !node.remember && self.forgettable(node.nieces[0]) && self.forgettable(node.nieces[1])
    }

    fn free_subtree(&mut self, idx: NodeIdx) {
        if idx.is_null() {
            return;
        }
        let [a, b] = self.arena[idx.get()].nieces;
        self.free_subtree(a);
        self.free_subtree(b);
        self.arena[idx.get()] = PolNode::default();
        self.free.push(idx);
    }

    // Rebuilds the free list as every arena slot the roots can't reach. Reshapes
    // leave orphans behind instead of freeing eagerly; one sweep afterwards bounds
    // the arena by the live node count.
    fn reclaim(&mut self) {
        let mut reachable = vec![false; self.arena.len()];
        reachable[0] = true;

        let mut stack = self.roots.clone();
        while let Some(idx) = stack.pop() {
            if idx.is_null() || reachable[idx.get()] {
                continue;
            }
            reachable[idx.get()] = true;
            let [a, b] = self.arena[idx.get()].nieces;
            stack.push(a);
            stack.push(b);
        }

        self.free.clear();
        for slot in 1..self.arena.len() {
            if !reachable[slot] {
                self.arena[slot] = PolNode::default();
                self.free.push(NodeIdx(slot as u32));
            }
        }
    }

    fn string(&self) -> String {
        if self.num_leaves == 0 {
            return "empty".to_owned();
        }
        let fh = util::tree_rows(self.num_leaves);
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
                    match self.read_pos(pos) {
                        Ok((val, _, _)) if !val.is_empty() => {
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

impl Debug for Pollard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string())
    }
}

impl Display for Pollard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string())
    }
}
