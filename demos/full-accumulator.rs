// A bridge node and a compact client working in lockstep: the forest holds the whole
// tree and produces proofs, the pollard verifies and applies them while only keeping
// what it was asked to remember.
use std::str::FromStr;

use utreexo::accumulator::forest::Forest;
use utreexo::accumulator::node_hash::NodeHash;
use utreexo::accumulator::pollard::Pollard;
use utreexo::accumulator::Leaf;

fn main() {
    let values = vec![0u8, 1, 2, 3, 4, 5, 6, 7];
    let leaves: Vec<Leaf> = values
        .iter()
        .map(|preimage| Leaf {
            hash: NodeHash::from_str(&format!("{:064x}", preimage + 1)).unwrap(),
            remember: false,
        })
        .collect();

    let mut forest = Forest::new();
    let mut pollard = Pollard::new();

    // a "block" full of new outputs lands on both sides
    forest.modify(&leaves, &[]).expect("adding is infallible");
    pollard.modify(&leaves, &[]).expect("adding is infallible");
    assert_eq!(forest.roots(), pollard.roots());
    println!("after 8 adds, roots: {:?}", forest.roots());

    // the next block spends two of them: the bridge proves, the client ingests
    let spent = [leaves[2].hash, leaves[7].hash];
    let proof = forest.prove_batch(&spent).expect("leaves are present");
    println!("proof targets {:?}, {} hashes", proof.targets(), proof.hashes().len());

    assert!(forest.verify_batch(&proof, &spent).expect("proof is well formed"));
    pollard.ingest_batch_proof(&proof).expect("proof checks out");

    let targets = proof.targets().to_vec();
    forest.modify(&[], &targets).expect("targets are live");
    pollard.modify(&[], &targets).expect("targets are live");

    assert_eq!(forest.roots(), pollard.roots());
    println!("after 2 deletions, roots: {:?}", forest.roots());

    // proofs travel as bytes
    let mut wire = Vec::new();
    proof.serialize(&mut wire).expect("writing to a vec");
    println!("that proof was {} bytes on the wire", wire.len());
}
