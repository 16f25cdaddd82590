use crate::errors::{ProvenHeaderError, ProvenHeaderProcessResult};
use crossbeam_channel::Sender;
use stake_consensus_core::{block::Block, chained_header::ChainedHeader};
use std::sync::Arc;

/// An accepted block along with its chain node, as passed to the block store stage
#[derive(Clone, Debug)]
pub struct BlockPair {
    pub block: Arc<Block>,
    pub chained_header: Arc<ChainedHeader>,
    /// Whether the block was accepted during initial block download
    pub is_ibd: bool,
}

impl BlockPair {
    pub fn new(block: Arc<Block>, chained_header: Arc<ChainedHeader>, is_ibd: bool) -> Self {
        Self { block, chained_header, is_ibd }
    }
}

/// The downstream stage receiving every block once its proven header bookkeeping is done
pub trait BlockForwarder: Send + Sync {
    fn forward(&self, pair: BlockPair) -> ProvenHeaderProcessResult<()>;

    /// Signals the downstream stage that no more blocks will be forwarded
    fn exit(&self);
}

impl<T: BlockForwarder + ?Sized> BlockForwarder for Arc<T> {
    fn forward(&self, pair: BlockPair) -> ProvenHeaderProcessResult<()> {
        (**self).forward(pair)
    }

    fn exit(&self) {
        (**self).exit()
    }
}

pub enum BlockStoreMessage {
    Exit,
    Store(BlockPair),
}

/// Forwards blocks over a channel to the block store stage
pub struct ChannelForwarder {
    sender: Sender<BlockStoreMessage>,
}

impl ChannelForwarder {
    pub fn new(sender: Sender<BlockStoreMessage>) -> Self {
        Self { sender }
    }
}

impl BlockForwarder for ChannelForwarder {
    fn forward(&self, pair: BlockPair) -> ProvenHeaderProcessResult<()> {
        self.sender.send(BlockStoreMessage::Store(pair)).map_err(|_| ProvenHeaderError::ForwarderDisconnected)
    }

    fn exit(&self) {
        // The receiver might have already exited
        let _ = self.sender.send(BlockStoreMessage::Exit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ChainBuilder;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_channel_forwarder() {
        let chain = ChainBuilder::new().extend_pos(1);
        let (sender, receiver) = unbounded();
        let forwarder = ChannelForwarder::new(sender);

        let node = chain.tip();
        forwarder.forward(BlockPair::new(chain.block(node.hash()), node.clone(), true)).unwrap();
        forwarder.exit();
        match receiver.recv().unwrap() {
            BlockStoreMessage::Store(pair) => {
                assert_eq!(pair.block.hash(), node.hash());
                assert!(pair.is_ibd);
            }
            BlockStoreMessage::Exit => panic!("expected a store message"),
        }
        assert!(matches!(receiver.recv().unwrap(), BlockStoreMessage::Exit));

        drop(receiver);
        let result = forwarder.forward(BlockPair::new(chain.block(node.hash()), node, false));
        assert!(matches!(result, Err(ProvenHeaderError::ForwarderDisconnected)));
    }
}
