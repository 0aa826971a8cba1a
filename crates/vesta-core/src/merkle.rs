//! BLAKE3 Merkle tree for batched distributions.
//!
//! Uses domain-separated hashing to prevent second-preimage attacks:
//! - Leaf hash: `BLAKE3(0x00 || index_le || account || amount_le)`
//! - Internal node: `BLAKE3(0x01 || min(a, b) || max(a, b))`
//!
//! Internal nodes sort their children, so a proof is a plain list of sibling
//! hashes with no left/right markers. Odd-length layers are padded by
//! duplicating the last element. Empty trees produce [`Hash256::ZERO`].

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Hash256};

/// Domain separation prefix for leaf hashes.
const LEAF_PREFIX: u8 = 0x00;

/// Domain separation prefix for internal node hashes.
const NODE_PREFIX: u8 = 0x01;

/// One entry of an externally computed distribution.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct MerkleLeaf {
    pub index: u64,
    pub account: AccountId,
    pub amount: u64,
}

/// Hash a distribution entry: `BLAKE3(0x00 || index || account || amount)`.
///
/// Integers are little-endian; the field order is fixed.
pub fn leaf_hash(index: u64, account: &AccountId, amount: u64) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(&index.to_le_bytes());
    hasher.update(account.as_bytes());
    hasher.update(&amount.to_le_bytes());
    Hash256(hasher.finalize().into())
}

/// Combine two nodes independent of their order: the smaller hash goes first.
pub fn node_hash(a: &Hash256, b: &Hash256) -> Hash256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    Hash256(hasher.finalize().into())
}

/// Fold `proof` into `leaf` and compare against `root`.
pub fn verify(proof: &[Hash256], root: &Hash256, leaf: &Hash256) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |current, sibling| node_hash(&current, sibling));
    computed == *root
}

/// Compute the root over a set of distribution entries without keeping layers.
pub fn merkle_root(leaves: &[MerkleLeaf]) -> Hash256 {
    if leaves.is_empty() {
        return Hash256::ZERO;
    }

    let mut current: Vec<Hash256> = leaves
        .iter()
        .map(|l| leaf_hash(l.index, &l.account, l.amount))
        .collect();

    while current.len() > 1 {
        current = next_layer(&current);
    }

    current[0]
}

/// Pair adjacent hashes; the last element is duplicated on odd layers.
fn next_layer(layer: &[Hash256]) -> Vec<Hash256> {
    layer
        .chunks(2)
        .map(|pair| node_hash(&pair[0], pair.get(1).unwrap_or(&pair[0])))
        .collect()
}

/// Full tree supporting root computation and proof generation.
///
/// Stands in for the off-chain aggregator: the engine itself only ever
/// consumes a root and a proof.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    leaves: Vec<MerkleLeaf>,
    /// `layers[0]` = leaf hashes, `layers[last]` = `[root]`.
    layers: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    /// Build a tree from distribution entries.
    pub fn from_leaves(leaves: &[MerkleLeaf]) -> Self {
        let mut layers: Vec<Vec<Hash256>> = Vec::new();
        let mut current: Vec<Hash256> = leaves
            .iter()
            .map(|l| leaf_hash(l.index, &l.account, l.amount))
            .collect();

        while !current.is_empty() {
            let done = current.len() == 1;
            let next = if done { Vec::new() } else { next_layer(&current) };
            layers.push(current);
            current = next;
        }

        Self {
            leaves: leaves.to_vec(),
            layers,
        }
    }

    /// The Merkle root. Returns [`Hash256::ZERO`] for an empty tree.
    pub fn root(&self) -> Hash256 {
        self.layers
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or(Hash256::ZERO)
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Sibling path for the leaf at `position` (its position in the input
    /// slice, not its `index` field).
    ///
    /// Returns `None` if the position is out of bounds.
    pub fn proof(&self, position: usize) -> Option<Vec<Hash256>> {
        if position >= self.leaves.len() {
            return None;
        }

        let mut path = Vec::new();
        let mut pos = position;

        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = layer.get(pos ^ 1).unwrap_or(&layer[pos]);
            path.push(*sibling);
            pos /= 2;
        }

        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(index: u64, seed: u8, amount: u64) -> MerkleLeaf {
        MerkleLeaf {
            index,
            account: AccountId([seed; 32]),
            amount,
        }
    }

    fn entries(n: u64) -> Vec<MerkleLeaf> {
        (0..n).map(|i| entry(i, i as u8 + 1, 100 * (i + 1))).collect()
    }

    fn h(byte: u8) -> Hash256 {
        Hash256([byte; 32])
    }

    // --- Hashing ---

    #[test]
    fn node_hash_is_order_independent() {
        assert_eq!(node_hash(&h(1), &h(2)), node_hash(&h(2), &h(1)));
    }

    #[test]
    fn leaf_hash_field_sensitive() {
        let a = AccountId([1; 32]);
        let base = leaf_hash(0, &a, 100);
        assert_ne!(base, leaf_hash(1, &a, 100));
        assert_ne!(base, leaf_hash(0, &AccountId([2; 32]), 100));
        assert_ne!(base, leaf_hash(0, &a, 101));
    }

    #[test]
    fn leaf_and_node_domains_differ() {
        // 0x00 || 72 bytes vs 0x01 || 64 bytes: never equal even for crafted input.
        let leaf = leaf_hash(0, &AccountId::ZERO, 0);
        assert_ne!(leaf, node_hash(&Hash256::ZERO, &Hash256::ZERO));
    }

    // --- merkle_root ---

    #[test]
    fn root_empty() {
        assert_eq!(merkle_root(&[]), Hash256::ZERO);
        assert_eq!(MerkleTree::from_leaves(&[]).root(), Hash256::ZERO);
    }

    #[test]
    fn root_single_is_leaf_hash() {
        let e = entry(0, 1, 100);
        assert_eq!(merkle_root(&[e]), leaf_hash(0, &e.account, 100));
    }

    #[test]
    fn root_three_duplicates_last() {
        let es = entries(3);
        let l: Vec<Hash256> = es
            .iter()
            .map(|e| leaf_hash(e.index, &e.account, e.amount))
            .collect();
        let expected = node_hash(&node_hash(&l[0], &l[1]), &node_hash(&l[2], &l[2]));
        assert_eq!(merkle_root(&es), expected);
    }

    #[test]
    fn tree_root_matches_standalone() {
        for n in 1..=12 {
            let es = entries(n);
            assert_eq!(MerkleTree::from_leaves(&es).root(), merkle_root(&es), "n={n}");
        }
    }

    // --- Proofs ---

    #[test]
    fn every_leaf_verifies() {
        for n in 1..=17 {
            let es = entries(n);
            let tree = MerkleTree::from_leaves(&es);
            let root = tree.root();
            for (pos, e) in es.iter().enumerate() {
                let proof = tree.proof(pos).unwrap();
                let leaf = leaf_hash(e.index, &e.account, e.amount);
                assert!(verify(&proof, &root, &leaf), "n={n} pos={pos}");
            }
        }
    }

    #[test]
    fn single_leaf_has_empty_proof() {
        let tree = MerkleTree::from_leaves(&entries(1));
        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
    }

    #[test]
    fn proof_depth() {
        let tree = MerkleTree::from_leaves(&entries(8));
        assert_eq!(tree.proof(0).unwrap().len(), 3);
        let tree = MerkleTree::from_leaves(&entries(5));
        assert_eq!(tree.proof(4).unwrap().len(), 3);
    }

    #[test]
    fn proof_out_of_bounds() {
        let tree = MerkleTree::from_leaves(&entries(2));
        assert!(tree.proof(2).is_none());
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn mutated_fields_fail() {
        let es = entries(4);
        let tree = MerkleTree::from_leaves(&es);
        let root = tree.root();
        let proof = tree.proof(1).unwrap();
        let e = es[1];

        assert!(verify(&proof, &root, &leaf_hash(e.index, &e.account, e.amount)));
        assert!(!verify(&proof, &root, &leaf_hash(e.index + 1, &e.account, e.amount)));
        assert!(!verify(&proof, &root, &leaf_hash(e.index, &AccountId([0xEE; 32]), e.amount)));
        assert!(!verify(&proof, &root, &leaf_hash(e.index, &e.account, e.amount + 1)));
    }

    #[test]
    fn tampered_sibling_fails() {
        let es = entries(4);
        let tree = MerkleTree::from_leaves(&es);
        let mut proof = tree.proof(0).unwrap();
        proof[0] = h(0xFF);
        let e = es[0];
        assert!(!verify(&proof, &tree.root(), &leaf_hash(e.index, &e.account, e.amount)));
    }

    #[test]
    fn reversed_sibling_order_still_verifies_pairwise() {
        // Sorting makes (a, b) and (b, a) the same parent, so a proof built
        // with either convention folds to the same root.
        let es = entries(2);
        let l0 = leaf_hash(es[0].index, &es[0].account, es[0].amount);
        let l1 = leaf_hash(es[1].index, &es[1].account, es[1].amount);
        let root = merkle_root(&es);
        assert!(verify(&[l1], &root, &l0));
        assert!(verify(&[l0], &root, &l1));
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn included_leaf_verifies_and_mutation_fails(
            amounts in prop::collection::vec(1u64..=1_000_000, 1..40),
            pick in 0usize..40,
            bump in 1u64..=1_000,
        ) {
            let es: Vec<MerkleLeaf> = amounts
                .iter()
                .enumerate()
                .map(|(i, &amount)| entry(i as u64, (i % 250) as u8 + 1, amount))
                .collect();
            let pos = pick % es.len();
            let tree = MerkleTree::from_leaves(&es);
            let root = tree.root();
            let proof = tree.proof(pos).unwrap();
            let e = es[pos];

            prop_assert!(verify(&proof, &root, &leaf_hash(e.index, &e.account, e.amount)));
            prop_assert!(!verify(&proof, &root, &leaf_hash(e.index, &e.account, e.amount + bump)));
            prop_assert!(!verify(&proof, &root, &leaf_hash(e.index + bump, &e.account, e.amount)));
        }
    }

    #[test]
    fn leaf_serde_json() {
        let e = entry(3, 9, 42);
        let json = serde_json::to_string(&e).unwrap();
        let back: MerkleLeaf = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
