use stake_consensus::{
    errors::ProvenHeaderProcessResult,
    pipeline::{ProvenHeaderCounters, proven_header_processor::ProvenHeaderProcessor},
    test_helpers::{ChainBuilder, CountingSynthesizer, MemoryProvenHeaderStore, RecordingForwarder},
};
use stake_consensus_core::BlockHeight;
use std::sync::Arc;

type MemoryProcessor = ProvenHeaderProcessor<MemoryProvenHeaderStore, Arc<CountingSynthesizer>, Arc<RecordingForwarder>>;

/// A proven header processor over in-memory collaborators which stay observable by the test
pub struct Harness {
    pub store: Arc<MemoryProvenHeaderStore>,
    pub synthesizer: Arc<CountingSynthesizer>,
    pub forwarder: Arc<RecordingForwarder>,
    pub counters: Arc<ProvenHeaderCounters>,
    pub processor: MemoryProcessor,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryProvenHeaderStore::default());
        let synthesizer = Arc::new(CountingSynthesizer::default());
        let forwarder = Arc::new(RecordingForwarder::default());
        let counters = Arc::new(ProvenHeaderCounters::default());
        // Direct calls only, the worker loop is not used
        let (_sender, receiver) = crossbeam_channel::unbounded();
        let processor = ProvenHeaderProcessor::new(receiver, store.clone(), synthesizer.clone(), forwarder.clone(), counters.clone());
        Self { store, synthesizer, forwarder, counters, processor }
    }

    /// Signals the block at `height` of `chain` as accepted
    pub fn accept(&self, chain: &ChainBuilder, height: BlockHeight, is_ibd: bool) -> ProvenHeaderProcessResult<()> {
        let node = chain.node_at(height);
        self.processor.on_block_accepted(chain.block(node.hash()), node, is_ibd)
    }
}
