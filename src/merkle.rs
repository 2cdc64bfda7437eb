//! The aggregated hash tree (§4.3): a variable fan-out Merkle reducer used
//! for both xorb hashes and file hashes. Fan-out is data-dependent (cut
//! points are derived from the hash bytes themselves), with a mean branching
//! factor of 4, min 2, max 9.

use tracing::instrument;

use crate::digests::{h_internal, h_zero, hash_to_string, Hash, ZERO_HASH};

pub const MEAN_BRANCHING_FACTOR: usize = 4;
pub const MIN_FANOUT: usize = 2;
pub const MAX_FANOUT: usize = 9;

/// One leaf or internal node of the aggregated hash tree: a hash paired with
/// the total size (in bytes) of the data it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub hash: Hash,
    pub size: u64,
}

impl Node {
    pub fn new(hash: Hash, size: u64) -> Self {
        Self { hash, size }
    }
}

/// Determines how many of the leading nodes in `nodes` merge into the next
/// parent. `nodes` must be non-empty in practice, but the function is total:
/// `nodes.len() <= 2` always returns `nodes.len()`, per §4.3.
pub fn cut_point(nodes: &[Node]) -> usize {
    let n = nodes.len();
    if n <= MIN_FANOUT {
        return n;
    }

    let end = n.min(MAX_FANOUT);
    for i in MIN_FANOUT..end {
        let tail = &nodes[i].hash.as_bytes()[24..32];
        let v = u64::from_le_bytes(tail.try_into().unwrap());
        if v % MEAN_BRANCHING_FACTOR as u64 == 0 {
            return i + 1;
        }
    }
    end
}

/// Merges a contiguous run of nodes into a single parent: the parent hash is
/// `H_INTERNAL` of the concatenated `"{hash_string} : {size}\n"` lines (note
/// the byte-swapped string form, §4.1), and the parent size is the sum of
/// the children's sizes.
pub fn merge(run: &[Node]) -> Node {
    debug_assert!(!run.is_empty());

    let mut buf = String::new();
    let mut total: u64 = 0;
    for node in run {
        buf.push_str(&hash_to_string(&node.hash));
        buf.push_str(" : ");
        buf.push_str(&node.size.to_string());
        buf.push('\n');
        total += node.size;
    }

    Node::new(h_internal(buf.as_bytes()), total)
}

/// Collapses one level of the tree: repeatedly cuts and merges runs from the
/// front of `level` until fewer than 2 nodes remain. A single leftover node
/// (an odd tail) passes through unchanged -- it cannot form a valid
/// `>= 2`-child parent, so it is simply carried into the next level.
fn reduce_level(level: &[Node]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut rest = level;

    while rest.len() > 1 {
        let cut = cut_point(rest);
        let (run, remainder) = rest.split_at(cut);
        out.push(merge(run));
        rest = remainder;
    }
    if let [leftover] = rest {
        out.push(*leftover);
    }

    out
}

/// Computes the Merkle root over an ordered sequence of `(hash, size)`
/// pairs, collapsing level by level until a single root remains. Empty input
/// yields [`ZERO_HASH`].
#[instrument(skip_all, fields(leaves = nodes.len()))]
pub fn merkle_root(nodes: &[Node]) -> Hash {
    if nodes.is_empty() {
        return ZERO_HASH;
    }

    let mut level = nodes.to_vec();
    while level.len() > 1 {
        level = reduce_level(&level);
    }
    level[0].hash
}

/// A file's hash (§4.4): `H_ZERO` of the raw 32 bytes of its Merkle root, not
/// the root's hash-string form. An empty file hashes the root of no leaves,
/// i.e. `H_ZERO` of 32 zero bytes.
#[instrument(skip_all)]
pub fn file_hash(nodes: &[Node]) -> Hash {
    h_zero(merkle_root(nodes).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(byte: u8, size: u64) -> Node {
        Node::new(Hash::from([byte; 32]), size)
    }

    #[test]
    fn empty_input_is_zero_hash() {
        assert_eq!(merkle_root(&[]), ZERO_HASH);
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let n = node(0xAB, 42);
        assert_eq!(merkle_root(&[n]), n.hash);
    }

    #[test]
    fn cut_point_of_at_most_two_is_identity() {
        assert_eq!(cut_point(&[]), 0);
        assert_eq!(cut_point(&[node(1, 1)]), 1);
        assert_eq!(cut_point(&[node(1, 1), node(2, 1)]), 2);
    }

    #[test]
    fn cut_point_never_exceeds_max_fanout() {
        let nodes: Vec<Node> = (0u8..=250).map(|b| node(b, 1)).collect();
        assert!(cut_point(&nodes) <= MAX_FANOUT);
        assert!(cut_point(&nodes) >= MIN_FANOUT + 1 || nodes.len() <= MIN_FANOUT);
    }

    #[test]
    fn merge_uses_wire_string_form_and_separator() {
        let a = node(0x11, 100);
        let b = node(0x22, 200);
        let parent = merge(&[a, b]);

        let mut expected_buf = String::new();
        expected_buf.push_str(&hash_to_string(&a.hash));
        expected_buf.push_str(" : 100\n");
        expected_buf.push_str(&hash_to_string(&b.hash));
        expected_buf.push_str(" : 200\n");

        assert_eq!(parent.hash, h_internal(expected_buf.as_bytes()));
        assert_eq!(parent.size, 300);
    }

    #[test]
    fn two_leaves_collapse_to_merge_of_both() {
        let a = node(0xaa, 10);
        let b = node(0xbb, 20);
        assert_eq!(merkle_root(&[a, b]), merge(&[a, b]).hash);
    }

    #[test]
    fn root_is_order_sensitive() {
        let a = node(0x01, 1);
        let b = node(0x02, 1);
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn many_leaves_produce_single_root_deterministically() {
        let nodes: Vec<Node> = (0u8..=200).map(|b| node(b, b as u64 + 1)).collect();
        let r1 = merkle_root(&nodes);
        let r2 = merkle_root(&nodes);
        assert_eq!(r1, r2);
    }

    #[test]
    fn empty_file_hash_is_h_zero_of_zero_hash() {
        assert_eq!(file_hash(&[]), h_zero(ZERO_HASH.as_bytes()));
    }

    #[test]
    fn file_hash_is_h_zero_of_merkle_root_not_its_string_form() {
        let n = node(0x77, 123);
        assert_eq!(file_hash(&[n]), h_zero(n.hash.as_bytes()));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_node() -> impl Strategy<Value = Node> {
        (any::<[u8; 32]>(), 1u64..1_000_000).prop_map(|(h, s)| Node::new(Hash::from(h), s))
    }

    proptest! {
        #[test]
        fn root_is_deterministic(nodes in proptest::collection::vec(arb_node(), 0..64)) {
            prop_assert_eq!(merkle_root(&nodes), merkle_root(&nodes));
        }

        #[test]
        fn cut_point_is_within_bounds(nodes in proptest::collection::vec(arb_node(), 0..64)) {
            let n = nodes.len();
            let cut = cut_point(&nodes);
            if n <= MIN_FANOUT {
                prop_assert_eq!(cut, n);
            } else {
                prop_assert!(cut >= MIN_FANOUT + 1);
                prop_assert!(cut <= MAX_FANOUT);
            }
        }
    }
}
