use crate::{
    errors::ProvenHeaderProcessResult,
    model::stores::proven_headers::ProvenBlockHeaderStore,
    pipeline::{
        ProvenHeaderCounters,
        forwarder::{BlockForwarder, BlockPair},
    },
    processes::proof_synthesis::ProvenHeaderSynthesizer,
};
use crossbeam_channel::Receiver;
use stake_consensus_core::{
    block::Block,
    chained_header::{ActiveHeader, ChainedHeader},
    hash_height::HashHeightPair,
};
use stake_core::{debug, error, trace};
use std::sync::{Arc, atomic::Ordering};
use tokio::sync::oneshot;

pub type ProvenHeaderResultSender = oneshot::Sender<ProvenHeaderProcessResult<()>>;

pub enum ProvenHeaderProcessingMessage {
    Exit,
    Process(BlockAcceptedTask, ProvenHeaderResultSender),
}

/// A block which was just accepted onto the active chain
#[derive(Clone)]
pub struct BlockAcceptedTask {
    pub block: Arc<Block>,

    /// The chain node of `block`. Its header slot might get upgraded to the proven form.
    pub chained_header: Arc<ChainedHeader>,

    /// Indicates the block is being replayed during initial block download
    pub is_ibd: bool,
}

impl BlockAcceptedTask {
    pub fn new(block: Arc<Block>, chained_header: Arc<ChainedHeader>, is_ibd: bool) -> Self {
        Self { block, chained_header, is_ibd }
    }
}

/// Keeps the proven header store consistent with the active chain. Blocks are processed strictly
/// one at a time, in acceptance order.
pub struct ProvenHeaderProcessor<S, P, F> {
    // Channels
    receiver: Receiver<ProvenHeaderProcessingMessage>,

    // Stores
    store: Arc<S>,

    // Proof synthesis
    synthesizer: P,

    // Downstream stage
    forwarder: F,

    // Counters
    counters: Arc<ProvenHeaderCounters>,
}

impl<S, P, F> ProvenHeaderProcessor<S, P, F>
where
    S: ProvenBlockHeaderStore + Send + Sync,
    P: ProvenHeaderSynthesizer,
    F: BlockForwarder,
{
    pub fn new(
        receiver: Receiver<ProvenHeaderProcessingMessage>,
        store: Arc<S>,
        synthesizer: P,
        forwarder: F,
        counters: Arc<ProvenHeaderCounters>,
    ) -> Self {
        Self { receiver, store, synthesizer, forwarder, counters }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn worker(self: &Arc<Self>) {
        while let Ok(msg) = self.receiver.recv() {
            match msg {
                ProvenHeaderProcessingMessage::Exit => break,
                ProvenHeaderProcessingMessage::Process(task, result_transmitter) => {
                    let hash = task.block.hash();
                    let res = self.on_block_accepted(task.block, task.chained_header, task.is_ibd);
                    if let Err(err) = &res {
                        error!("proven header processing of block {} failed: {}", hash, err);
                    }
                    // The caller might have dropped the receiver
                    let _ = result_transmitter.send(res);
                }
            }
        }

        // Pass the exit signal on to the next stage
        self.forwarder.exit();
        trace!("proven header processor exiting");
    }

    /// Drops all queued messages. Result senders of dropped tasks are closed, so their callers
    /// observe the processor has exited.
    pub fn drop_pending(&self) -> usize {
        self.receiver.try_iter().count()
    }

    /// Reconciles the proven header store with the block just accepted at the height of `chained_header`,
    /// and then forwards the block to the next stage.
    ///
    /// The store lookup is a blocking call, so its latency adds to the block acceptance latency. A
    /// synthesis or store error aborts the call before the block is forwarded.
    pub fn on_block_accepted(&self, block: Arc<Block>, chained_header: Arc<ChainedHeader>, is_ibd: bool) -> ProvenHeaderProcessResult<()> {
        self.counters.signal_counts.fetch_add(1, Ordering::Relaxed);
        let height = chained_header.height();

        if let ActiveHeader::Proven(proven) = chained_header.active_header() {
            // Resubmitted as is, deduplication is up to the store
            trace!("block {} at height {} is already proven", chained_header.hash(), height);
            self.counters.already_proven_counts.fetch_add(1, Ordering::Relaxed);
            self.store.add_to_pending_batch(proven, chained_header.to_hash_height())?;
        } else {
            match self.store.get_by_height(height)? {
                Some(stored) if stored.hash() == block.hash() => {
                    trace!("stored proven header at height {} matches block {}", height, block.hash());
                    self.counters.match_counts.fetch_add(1, Ordering::Relaxed);
                }
                Some(stored) => {
                    debug!("stale proven header {} at height {} is replaced by block {}", stored.hash(), height, block.hash());
                    self.counters.stale_counts.fetch_add(1, Ordering::Relaxed);
                    self.synthesize_and_submit(&block, &chained_header, is_ibd)?;
                }
                None => {
                    trace!("no proven header at height {}, synthesizing for block {}", height, block.hash());
                    self.counters.missing_counts.fetch_add(1, Ordering::Relaxed);
                    self.synthesize_and_submit(&block, &chained_header, is_ibd)?;
                }
            }
        }

        self.forwarder.forward(BlockPair::new(block, chained_header, is_ibd))?;
        self.counters.forwarded_counts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn synthesize_and_submit(&self, block: &Block, chained_header: &ChainedHeader, is_ibd: bool) -> ProvenHeaderProcessResult<()> {
        let proven = Arc::new(self.synthesizer.synthesize(block)?);
        self.counters.synthesized_counts.fetch_add(1, Ordering::Relaxed);
        self.store.add_to_pending_batch(proven.clone(), HashHeightPair::new(proven.hash(), chained_header.height()))?;

        // During IBD the plain header is kept in memory and the proof stays available from the store
        if !is_ibd {
            chained_header.set_proven_header(proven)?;
            self.counters.upgraded_counts.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
