use crate::{
    BlockHeight,
    errors::header_slot::{HeaderSlotError, HeaderSlotResult},
    hash_height::HashHeightPair,
    header::Header,
    proven_header::ProvenBlockHeader,
};
use parking_lot::RwLock;
use stake_hashes::Hash;
use std::sync::Arc;

/// The header representation currently held by a chain node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActiveHeader {
    Plain(Arc<Header>),
    Proven(Arc<ProvenBlockHeader>),
}

impl ActiveHeader {
    pub fn hash(&self) -> Hash {
        match self {
            ActiveHeader::Plain(header) => header.hash,
            ActiveHeader::Proven(proven) => proven.hash(),
        }
    }

    /// The base header, regardless of representation
    pub fn header(&self) -> &Header {
        match self {
            ActiveHeader::Plain(header) => header,
            ActiveHeader::Proven(proven) => &proven.header,
        }
    }

    pub fn as_proven(&self) -> Option<&Arc<ProvenBlockHeader>> {
        match self {
            ActiveHeader::Plain(_) => None,
            ActiveHeader::Proven(proven) => Some(proven),
        }
    }
}

/// A node of the in-memory best chain. Nodes are linked by the chain-selection logic; the only
/// mutable part of a node is its header slot.
#[derive(Debug)]
pub struct ChainedHeader {
    hash: Hash,
    height: BlockHeight,
    parent: Option<Arc<ChainedHeader>>,
    active_header: RwLock<ActiveHeader>,
}

impl ChainedHeader {
    pub fn new_genesis(header: Arc<Header>) -> Self {
        Self { hash: header.hash, height: 0, parent: None, active_header: RwLock::new(ActiveHeader::Plain(header)) }
    }

    pub fn new(header: Arc<Header>, parent: Arc<ChainedHeader>) -> Self {
        let height = parent.height + 1;
        Self { hash: header.hash, height, parent: Some(parent), active_header: RwLock::new(ActiveHeader::Plain(header)) }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn parent(&self) -> Option<&Arc<ChainedHeader>> {
        self.parent.as_ref()
    }

    pub fn to_hash_height(&self) -> HashHeightPair {
        HashHeightPair::new(self.hash, self.height)
    }

    pub fn active_header(&self) -> ActiveHeader {
        self.active_header.read().clone()
    }

    pub fn is_proven(&self) -> bool {
        matches!(*self.active_header.read(), ActiveHeader::Proven(_))
    }

    /// Replaces the header slot with the given proven header. A proven header for any other
    /// block is refused and the slot is left untouched.
    pub fn set_proven_header(&self, proven: Arc<ProvenBlockHeader>) -> HeaderSlotResult<()> {
        if proven.hash() != self.hash {
            return Err(HeaderSlotError::HashMismatch(self.hash, proven.hash(), self.height));
        }
        *self.active_header.write() = ActiveHeader::Proven(proven);
        Ok(())
    }

    /// Walks the parent links down to `height`. Returns `None` if `height` is above this node.
    pub fn get_ancestor(self: &Arc<Self>, height: BlockHeight) -> Option<Arc<ChainedHeader>> {
        if height > self.height {
            return None;
        }
        let mut current = self.clone();
        while current.height > height {
            current = current.parent.clone()?;
        }
        Some(current)
    }
}

impl Drop for ChainedHeader {
    fn drop(&mut self) {
        // Unlink the parents iteratively, a recursive drop of a long chain overflows the stack
        let mut next = self.parent.take();
        while let Some(parent) = next {
            match Arc::into_inner(parent) {
                Some(mut node) => next = node.parent.take(),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{block::BlockSignature, tx::Transaction};
    use stake_merkle::MerkleBranch;

    fn chain(len: u64) -> Vec<Arc<ChainedHeader>> {
        let mut nodes: Vec<Arc<ChainedHeader>> = Vec::new();
        for i in 0..len {
            let prev = nodes.last().map(|node| node.hash()).unwrap_or_default();
            let header = Arc::new(Header::new_finalized(1, prev, i.into(), i, 0, 0));
            let node = match nodes.last() {
                Some(parent) => ChainedHeader::new(header, parent.clone()),
                None => ChainedHeader::new_genesis(header),
            };
            nodes.push(Arc::new(node));
        }
        nodes
    }

    fn proven_for(header: &Header) -> Arc<ProvenBlockHeader> {
        Arc::new(ProvenBlockHeader::new(
            header.clone(),
            MerkleBranch::default(),
            Transaction::new(1, vec![], vec![], 0),
            BlockSignature::new(vec![1]),
        ))
    }

    #[test]
    fn test_heights_and_ancestors() {
        let nodes = chain(6);
        let tip = nodes.last().unwrap();
        assert_eq!(tip.height(), 5);
        assert_eq!(tip.to_hash_height(), HashHeightPair::new(tip.hash(), 5));
        assert_eq!(tip.get_ancestor(2).unwrap().hash(), nodes[2].hash());
        assert_eq!(tip.get_ancestor(5).unwrap().hash(), tip.hash());
        assert!(tip.get_ancestor(6).is_none());
        assert!(nodes[0].parent().is_none());
    }

    #[test]
    fn test_set_proven_header() {
        let nodes = chain(2);
        let node = &nodes[1];
        assert!(!node.is_proven());

        let header = node.active_header().header().clone();
        let proven = proven_for(&header);
        node.set_proven_header(proven.clone()).unwrap();
        assert!(node.is_proven());
        assert_eq!(node.active_header(), ActiveHeader::Proven(proven));
        assert_eq!(node.active_header().hash(), node.hash());
    }

    #[test]
    fn test_set_proven_header_refuses_other_block() {
        let nodes = chain(3);
        let other = proven_for(nodes[2].active_header().header());
        let err = nodes[1].set_proven_header(other.clone()).unwrap_err();
        assert_eq!(err, HeaderSlotError::HashMismatch(nodes[1].hash(), other.hash(), 1));
        assert!(!nodes[1].is_proven());
    }

    #[test]
    fn test_dropping_long_chain() {
        let mut tip = Arc::new(ChainedHeader::new_genesis(Arc::new(Header::new_finalized(1, Hash::default(), 0.into(), 0, 0, 0))));
        for i in 1..250_000u64 {
            let header = Arc::new(Header::new_finalized(1, tip.hash(), i.into(), i, 0, 0));
            tip = Arc::new(ChainedHeader::new(header, tip));
        }
        let middle = tip.get_ancestor(100_000).unwrap();
        assert_eq!(tip.height(), 249_999);

        // A node still referenced elsewhere keeps its own ancestry alive
        drop(tip);
        assert_eq!(middle.get_ancestor(0).unwrap().height(), 0);
        drop(middle);
    }
}
