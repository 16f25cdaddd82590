//! Deterministic builders and in-memory collaborators for exercising the proven header pipeline

use crate::{
    errors::{ProvenHeaderError, ProvenHeaderProcessResult},
    model::stores::proven_headers::{ProvenBlockHeaderStore, ProvenBlockHeaderStoreReader},
    pipeline::forwarder::{BlockForwarder, BlockPair},
    processes::proof_synthesis::{ProofSynthesizer, ProvenHeaderSynthesizer},
};
use parking_lot::{Mutex, RwLock};
use stake_consensus_core::{
    BlockHeight,
    block::{Block, BlockSignature, BlockVariant},
    chained_header::ChainedHeader,
    config::params::MAINNET_PARAMS,
    errors::synthesis::SynthesisResult,
    hash_height::HashHeightPair,
    header::Header,
    merkle::calc_hash_merkle_root,
    proven_header::ProvenBlockHeader,
    tx::{Transaction, TransactionInput, TransactionOutpoint, TransactionOutput},
};
use stake_database::prelude::{StoreError, StoreResult};
use stake_hashes::{Hash, ZERO_HASH};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

const BASE_TIMESTAMP: u64 = 1_600_000_000;
const TARGET_SPACING: u64 = 64;
const BITS: u32 = 0x1d00ffff;

fn coinbase_tx(height: BlockHeight, salt: u64) -> Transaction {
    let script = [height.to_le_bytes(), salt.to_le_bytes()].concat();
    Transaction::new(1, vec![TransactionInput::new(TransactionOutpoint::null(), script, 0)], vec![TransactionOutput::new(0, vec![])], 0)
}

fn coinstake_tx(height: BlockHeight, salt: u64) -> Transaction {
    let staked = TransactionOutpoint::new(Hash::from_u64_word(height ^ salt.rotate_left(32)), 0);
    Transaction::new(
        1,
        vec![TransactionInput::new(staked, vec![0x47; 72], 0)],
        vec![TransactionOutput::new(0, vec![]), TransactionOutput::new(1_000 + height, vec![0x21, 0xac])],
        0,
    )
}

fn spend_tx(height: BlockHeight, salt: u64) -> Transaction {
    let outpoint = TransactionOutpoint::new(Hash::from_u64_word(height.wrapping_add(salt)), 1);
    Transaction::new(1, vec![TransactionInput::new(outpoint, vec![0x48; 71], 0)], vec![TransactionOutput::new(height, vec![0x76])], 0)
}

fn header_for(hash_prev_block: Hash, height: BlockHeight, salt: u64, txs: &[Transaction]) -> Header {
    Header::new_finalized(1, hash_prev_block, calc_hash_merkle_root(txs.iter()), BASE_TIMESTAMP + height * TARGET_SPACING, BITS, salt as u32)
}

/// A proof-of-stake block at `height` with a coinbase, a coinstake and one regular transaction
pub fn pos_block(hash_prev_block: Hash, height: BlockHeight, salt: u64) -> Block {
    let txs = vec![coinbase_tx(height, salt), coinstake_tx(height, salt), spend_tx(height, salt)];
    let signature = BlockSignature::new([vec![0x30; 70], height.to_le_bytes()[..1].to_vec()].concat());
    Block::new(header_for(hash_prev_block, height, salt, &txs), txs, BlockVariant::ProofOfStake(signature))
}

/// A proof-of-work block at `height` holding a coinbase only
pub fn pow_block(hash_prev_block: Hash, height: BlockHeight, salt: u64) -> Block {
    let txs = vec![coinbase_tx(height, salt)];
    Block::new(header_for(hash_prev_block, height, salt, &txs), txs, BlockVariant::ProofOfWork)
}

/// Synthesizes the proven header of a proof-of-stake block under mainnet params
pub fn proven_header_for(block: &Block) -> Arc<ProvenBlockHeader> {
    Arc::new(ProofSynthesizer::new(&MAINNET_PARAMS).synthesize(block).unwrap())
}

static NEXT_FORK_SALT: AtomicU64 = AtomicU64::new(1 << 32);

/// Builds a linear chain of linked `ChainedHeader`s along with their blocks. Forks share the
/// chain nodes below the fork point.
#[derive(Clone)]
pub struct ChainBuilder {
    nodes: Vec<Arc<ChainedHeader>>,
    blocks: HashMap<Hash, Arc<Block>>,
    salt: u64,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Different seeds produce chains with different genesis blocks
    pub fn with_seed(seed: u64) -> Self {
        let genesis = Arc::new(pow_block(ZERO_HASH, 0, seed));
        let node = Arc::new(ChainedHeader::new_genesis(genesis.header.clone()));
        Self { nodes: vec![node], blocks: HashMap::from([(genesis.hash(), genesis)]), salt: seed }
    }

    pub fn extend_pos(self, count: usize) -> Self {
        self.extend_with(count, pos_block)
    }

    pub fn extend_pow(self, count: usize) -> Self {
        self.extend_with(count, pow_block)
    }

    fn extend_with(mut self, count: usize, build: fn(Hash, BlockHeight, u64) -> Block) -> Self {
        for _ in 0..count {
            let parent = self.tip();
            let block = Arc::new(build(parent.hash(), parent.height() + 1, self.salt));
            let node = Arc::new(ChainedHeader::new(block.header.clone(), parent));
            self.blocks.insert(block.hash(), block);
            self.nodes.push(node);
        }
        self
    }

    /// Returns a builder sharing this chain up to and including `height`, whose new blocks differ from any other chain
    pub fn fork_at(&self, height: BlockHeight) -> Self {
        let nodes = self.nodes[..=height as usize].to_vec();
        let blocks = nodes.iter().map(|node| (node.hash(), self.blocks[&node.hash()].clone())).collect();
        Self { nodes, blocks, salt: NEXT_FORK_SALT.fetch_add(1, Ordering::Relaxed) }
    }

    pub fn nodes(&self) -> &[Arc<ChainedHeader>] {
        &self.nodes
    }

    pub fn node_at(&self, height: BlockHeight) -> Arc<ChainedHeader> {
        self.nodes[height as usize].clone()
    }

    pub fn tip(&self) -> Arc<ChainedHeader> {
        self.nodes.last().unwrap().clone()
    }

    pub fn block(&self, hash: Hash) -> Arc<Block> {
        self.blocks[&hash].clone()
    }
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory proven header store which applies every write immediately and records all submissions
#[derive(Default)]
pub struct MemoryProvenHeaderStore {
    entries: RwLock<BTreeMap<BlockHeight, Arc<ProvenBlockHeader>>>,
    tip: RwLock<Option<HashHeightPair>>,
    submissions: Mutex<Vec<(Arc<ProvenBlockHeader>, HashHeightPair)>>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryProvenHeaderStore {
    /// Seeds an entry without recording it as a submission
    pub fn insert(&self, header: Arc<ProvenBlockHeader>, key: HashHeightPair) {
        self.entries.write().insert(key.height, header);
        *self.tip.write() = Some(key);
    }

    /// Makes every subsequent call fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<(Arc<ProvenBlockHeader>, HashHeightPair)> {
        self.submissions.lock().clone()
    }

    pub fn submitted_keys(&self) -> Vec<HashHeightPair> {
        self.submissions.lock().iter().map(|(_, key)| *key).collect()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::DataInconsistency("proven header store is unavailable".to_string()));
        }
        Ok(())
    }
}

impl ProvenBlockHeaderStoreReader for MemoryProvenHeaderStore {
    fn get_by_height(&self, height: BlockHeight) -> StoreResult<Option<Arc<ProvenBlockHeader>>> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.read().get(&height).cloned())
    }

    fn tip(&self) -> StoreResult<Option<HashHeightPair>> {
        self.check_available()?;
        Ok(*self.tip.read())
    }
}

impl ProvenBlockHeaderStore for MemoryProvenHeaderStore {
    fn add_to_pending_batch(&self, header: Arc<ProvenBlockHeader>, key: HashHeightPair) -> StoreResult<()> {
        self.check_available()?;
        self.submissions.lock().push((header.clone(), key));
        self.insert(header, key);
        Ok(())
    }
}

/// Delegates to a mainnet `ProofSynthesizer` while counting calls
pub struct CountingSynthesizer {
    inner: ProofSynthesizer,
    calls: AtomicUsize,
}

impl CountingSynthesizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for CountingSynthesizer {
    fn default() -> Self {
        Self { inner: ProofSynthesizer::new(&MAINNET_PARAMS), calls: AtomicUsize::new(0) }
    }
}

impl ProvenHeaderSynthesizer for CountingSynthesizer {
    fn synthesize(&self, block: &Block) -> SynthesisResult<ProvenBlockHeader> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.synthesize(block)
    }
}

/// Records every forwarded block pair
#[derive(Default)]
pub struct RecordingForwarder {
    pairs: Mutex<Vec<BlockPair>>,
    exited: AtomicBool,
    disconnected: AtomicBool,
}

impl RecordingForwarder {
    /// Forwarded blocks as `(hash, height, is_ibd)`, in forwarding order
    pub fn forwarded(&self) -> Vec<(Hash, BlockHeight, bool)> {
        self.pairs.lock().iter().map(|pair| (pair.block.hash(), pair.chained_header.height(), pair.is_ibd)).collect()
    }

    pub fn pairs(&self) -> Vec<BlockPair> {
        self.pairs.lock().clone()
    }

    pub fn exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Makes subsequent forwards fail as if the downstream stage was gone
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

impl BlockForwarder for RecordingForwarder {
    fn forward(&self, pair: BlockPair) -> ProvenHeaderProcessResult<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(ProvenHeaderError::ForwarderDisconnected);
        }
        self.pairs.lock().push(pair);
        Ok(())
    }

    fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}
