//! A deterministic block simulator for tests. Every block spits out a batch of fresh
//! leaves, each with a random time-to-live drawn at creation, and the set of leaves
//! whose TTL expires this block. Leaves whose TTL is under the lookahead get the
//! remember hint, mimicking how a real node would cache outputs it expects to spend
//! soon. The generator is seeded and self-contained so failures replay exactly.
use super::node_hash::NodeHash;
use super::Leaf;

pub(crate) struct SimChain {
    block_height: i32,
    leaf_counter: u64,
    duration_mask: u32,
    lookahead: i32,
    ttl_slices: Vec<Vec<NodeHash>>,
    rng_state: u64,
}

impl SimChain {
    pub fn new(duration_mask: u32, lookahead: i32, seed: u64) -> Self {
        SimChain {
            block_height: -1,
            leaf_counter: 0,
            duration_mask,
            lookahead,
            ttl_slices: vec![Vec::new(); duration_mask as usize + 2],
            rng_state: seed | 1,
        }
    }

    /// xorshift64*, seeded from the constructor.
    pub fn rand_u32(&mut self) -> u32 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        (x.wrapping_mul(0x2545f4914f6cdd1d) >> 32) as u32
    }

    /// Produces the next block: `num_adds` new leaves plus the hashes expiring now.
    pub fn next_block(&mut self, num_adds: u32) -> (Vec<Leaf>, Vec<NodeHash>) {
        self.block_height += 1;

        // an empty first block would leave nothing to ever spend
        let num_adds = if self.block_height == 0 && num_adds == 0 {
            1
        } else {
            num_adds
        };

        let del_hashes = self.ttl_slices.remove(0);
        self.ttl_slices.push(Vec::new());

        let mut adds = Vec::with_capacity(num_adds as usize);
        for _ in 0..num_adds {
            let mut raw = [0u8; 32];
            raw[..8].copy_from_slice(&self.leaf_counter.to_le_bytes());
            raw[8] = 0xff;
            let hash = NodeHash::new(raw);

            // 1..=mask blocks to live, so nothing dies in its own block
            let duration = (self.rand_u32() & self.duration_mask).max(1);
            let remember = (duration as i32) < self.lookahead;

            self.ttl_slices[duration as usize - 1].push(hash);
            adds.push(Leaf { hash, remember });
            self.leaf_counter += 1;
        }

        (adds, del_hashes)
    }
}
