use crossbeam_channel::{Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use rocksdb::WriteBatch;
use stake_consensus_core::{BlockHeight, chained_header::ChainedHeader, hash_height::HashHeightPair, proven_header::ProvenBlockHeader};
use stake_core::{debug, info, trace, warn};
use stake_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, CachedDbItem, DB, StoreResult, StoreResultExtensions},
    registry::DatabaseStorePrefixes,
};
use std::{collections::BTreeMap, sync::Arc};

use crate::pipeline::flush_processor::ProvenHeaderFlushMessage;

/// Reader API for `ProvenBlockHeaderStore`. Reads may block on the underlying DB.
pub trait ProvenBlockHeaderStoreReader {
    /// Returns the newest proven header known for `height`, pending or persisted
    fn get_by_height(&self, height: BlockHeight) -> StoreResult<Option<Arc<ProvenBlockHeader>>>;

    /// Returns the pending tip if writes are pending, and otherwise the persisted tip
    fn tip(&self) -> StoreResult<Option<HashHeightPair>>;
}

pub trait ProvenBlockHeaderStore: ProvenBlockHeaderStoreReader {
    /// Stages a proven header for persistence. Never blocks on the DB. A later write for the same
    /// height replaces an earlier one which was not yet flushed.
    fn add_to_pending_batch(&self, header: Arc<ProvenBlockHeader>, key: HashHeightPair) -> StoreResult<()>;
}

/// Big endian height, so that DB iteration follows height order
#[derive(Eq, Hash, PartialEq, Debug, Copy, Clone)]
struct HeightKey([u8; size_of::<BlockHeight>()]);

impl AsRef<[u8]> for HeightKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<BlockHeight> for HeightKey {
    fn from(height: BlockHeight) -> Self {
        Self(height.to_be_bytes())
    }
}

#[derive(Default)]
struct PendingBatch {
    entries: BTreeMap<BlockHeight, Arc<ProvenBlockHeader>>,
    tip: Option<HashHeightPair>,
}

/// A DB + cache implementation of `ProvenBlockHeaderStore` trait, with an in-memory pending batch
/// which is persisted by `flush`
pub struct DbProvenBlockHeaderStore {
    db: Arc<DB>,
    access: CachedDbAccess<HeightKey, Arc<ProvenBlockHeader>>,
    tip_access: RwLock<CachedDbItem<HashHeightPair>>,
    pending: Mutex<PendingBatch>,
    flush_threshold: usize,
    flush_sender: Option<Sender<ProvenHeaderFlushMessage>>,
}

impl DbProvenBlockHeaderStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy, flush_threshold: usize) -> Self {
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(db.clone(), cache_policy, DatabaseStorePrefixes::ProvenBlockHeaders.into()),
            tip_access: RwLock::new(CachedDbItem::new(db, DatabaseStorePrefixes::ProvenBlockHeadersTip.into())),
            pending: Mutex::new(PendingBatch::default()),
            flush_threshold,
            flush_sender: None,
        }
    }

    /// Signals `sender` whenever the pending batch reaches the flush threshold
    pub fn with_flush_signal(mut self, sender: Sender<ProvenHeaderFlushMessage>) -> Self {
        self.flush_sender = Some(sender);
        self
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().entries.len()
    }

    /// Returns the persisted tip, ignoring pending writes
    pub fn persisted_tip(&self) -> StoreResult<Option<HashHeightPair>> {
        self.tip_access.read().read().optional()
    }

    /// Persists all pending writes along with the pending tip in a single write batch and returns
    /// the number of headers written. On failure the pending batch is kept for the next attempt.
    pub fn flush(&self) -> StoreResult<usize> {
        // The pending lock is held until the batch is committed, so readers never miss an entry
        let mut pending = self.pending.lock();
        if pending.entries.is_empty() && pending.tip.is_none() {
            return Ok(0);
        }

        let mut batch = WriteBatch::default();
        self.access.write_many(
            BatchDbWriter::new(&mut batch),
            &mut pending.entries.iter().map(|(&height, header)| (HeightKey::from(height), header.clone())),
        )?;
        if let Some(tip) = pending.tip {
            self.tip_access.write().write(BatchDbWriter::new(&mut batch), &tip)?;
        }
        self.db.write(batch)?;

        let count = pending.entries.len();
        *pending = PendingBatch::default();
        trace!("flushed {} proven headers", count);
        Ok(count)
    }

    /// Reconciles the persisted entries with the active chain ending at `chain_tip`. The persisted tip is
    /// rewound to the highest height whose stored hash is on the chain, and every entry above it is
    /// deleted. Expected to be called on startup, before any write is staged.
    pub fn initialize(&self, chain_tip: &Arc<ChainedHeader>) -> StoreResult<Option<HashHeightPair>> {
        let Some(persisted_tip) = self.persisted_tip()? else {
            debug!("proven header store is empty");
            return Ok(None);
        };

        let mut new_tip = None;
        let mut ancestor = chain_tip.get_ancestor(persisted_tip.height.min(chain_tip.height()));
        while let Some(node) = ancestor {
            if self.access.read(node.height().into()).optional()?.is_some_and(|stored| stored.hash() == node.hash()) {
                new_tip = Some(node.to_hash_height());
                break;
            }
            ancestor = node.parent().cloned();
        }

        // Entries above the persisted tip were staged before a reorg lowered it, so they are removed too
        let first_removed = new_tip.map_or(0, |tip| tip.height + 1);
        let mut batch = WriteBatch::default();
        self.access.delete_range(BatchDbWriter::new(&mut batch), first_removed.into(), BlockHeight::MAX.into())?;
        let mut tip_access = self.tip_access.write();
        match new_tip {
            Some(tip) => tip_access.write(BatchDbWriter::new(&mut batch), &tip)?,
            None => tip_access.remove(BatchDbWriter::new(&mut batch))?,
        }
        self.db.write(batch)?;

        if new_tip == Some(persisted_tip) {
            return Ok(new_tip);
        }
        match new_tip {
            Some(tip) => info!("proven header store tip rewound from {} to {}", persisted_tip, tip),
            None => info!("proven header store tip {} is not on the active chain, all entries were removed", persisted_tip),
        }
        Ok(new_tip)
    }

    fn signal_flush(&self) {
        let Some(sender) = self.flush_sender.as_ref() else {
            return;
        };
        match sender.try_send(ProvenHeaderFlushMessage::Flush) {
            // A full channel means a flush is already on its way
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => warn!("proven header flush processor is disconnected"),
        }
    }
}

impl ProvenBlockHeaderStoreReader for DbProvenBlockHeaderStore {
    fn get_by_height(&self, height: BlockHeight) -> StoreResult<Option<Arc<ProvenBlockHeader>>> {
        if let Some(header) = self.pending.lock().entries.get(&height) {
            return Ok(Some(header.clone()));
        }
        self.access.read(height.into()).optional()
    }

    fn tip(&self) -> StoreResult<Option<HashHeightPair>> {
        if let Some(tip) = self.pending.lock().tip {
            return Ok(Some(tip));
        }
        self.persisted_tip()
    }
}

impl ProvenBlockHeaderStore for DbProvenBlockHeaderStore {
    fn add_to_pending_batch(&self, header: Arc<ProvenBlockHeader>, key: HashHeightPair) -> StoreResult<()> {
        let pending_len = {
            let mut pending = self.pending.lock();
            pending.entries.insert(key.height, header);
            pending.tip = Some(key);
            pending.entries.len()
        };
        if pending_len >= self.flush_threshold {
            self.signal_flush();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ChainBuilder, proven_header_for};
    use crossbeam_channel::bounded;
    use stake_database::{create_temp_db, prelude::ConnBuilder};
    use stake_utils::mem_size::MemMode;

    fn store(db: &Arc<DB>) -> DbProvenBlockHeaderStore {
        DbProvenBlockHeaderStore::new(db.clone(), CachePolicy::Count(16), 100)
    }

    #[test]
    fn test_pending_reads_and_flush() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let store = store(&db);
        let chain = ChainBuilder::new().extend_pos(3);

        assert!(store.tip().unwrap().is_none());
        for node in chain.nodes().iter().skip(1) {
            let block = chain.block(node.hash());
            store.add_to_pending_batch(proven_header_for(&block), node.to_hash_height()).unwrap();
        }
        assert_eq!(store.pending_len(), 3);
        assert_eq!(store.tip().unwrap(), Some(chain.tip().to_hash_height()));
        assert!(store.persisted_tip().unwrap().is_none());
        assert_eq!(store.get_by_height(2).unwrap().unwrap().hash(), chain.node_at(2).hash());

        assert_eq!(store.flush().unwrap(), 3);
        assert_eq!(store.pending_len(), 0);
        assert_eq!(store.flush().unwrap(), 0);
        assert_eq!(store.persisted_tip().unwrap(), Some(chain.tip().to_hash_height()));

        // A fresh store over the same DB sees the flushed entries
        let reopened = store_with_empty_cache(&db);
        for node in chain.nodes().iter().skip(1) {
            assert_eq!(reopened.get_by_height(node.height()).unwrap().unwrap().hash(), node.hash());
        }
        assert!(reopened.get_by_height(4).unwrap().is_none());
    }

    fn store_with_empty_cache(db: &Arc<DB>) -> DbProvenBlockHeaderStore {
        DbProvenBlockHeaderStore::new(db.clone(), CachePolicy::Empty, 100)
    }

    #[test]
    fn test_newest_write_per_height_wins() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let store = store(&db);
        let chain = ChainBuilder::new().extend_pos(2);
        let fork = chain.fork_at(1).extend_pos(1);

        let original = chain.block(chain.node_at(2).hash());
        let replacement = fork.block(fork.node_at(2).hash());
        store.add_to_pending_batch(proven_header_for(&original), chain.node_at(2).to_hash_height()).unwrap();
        store.add_to_pending_batch(proven_header_for(&original), chain.node_at(2).to_hash_height()).unwrap();
        assert_eq!(store.pending_len(), 1);
        store.add_to_pending_batch(proven_header_for(&replacement), fork.node_at(2).to_hash_height()).unwrap();
        assert_eq!(store.pending_len(), 1);
        store.flush().unwrap();

        let reopened = store_with_empty_cache(&db);
        assert_eq!(reopened.get_by_height(2).unwrap().unwrap().hash(), replacement.hash());
        assert_eq!(reopened.tip().unwrap(), Some(fork.node_at(2).to_hash_height()));

        // Overwriting a flushed entry also keeps only the newest one
        store.add_to_pending_batch(proven_header_for(&original), chain.node_at(2).to_hash_height()).unwrap();
        store.flush().unwrap();
        assert_eq!(store_with_empty_cache(&db).get_by_height(2).unwrap().unwrap().hash(), original.hash());
    }

    #[test]
    fn test_flush_signal_on_threshold() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let (sender, receiver) = bounded(1);
        let store = DbProvenBlockHeaderStore::new(db.clone(), CachePolicy::Count(16), 2).with_flush_signal(sender);
        let chain = ChainBuilder::new().extend_pos(3);

        let block = chain.block(chain.node_at(1).hash());
        store.add_to_pending_batch(proven_header_for(&block), chain.node_at(1).to_hash_height()).unwrap();
        assert!(receiver.try_recv().is_err());

        for height in 2..=3 {
            let block = chain.block(chain.node_at(height).hash());
            store.add_to_pending_batch(proven_header_for(&block), chain.node_at(height).to_hash_height()).unwrap();
        }
        // The second signal found the channel full and was dropped
        assert!(matches!(receiver.try_recv(), Ok(ProvenHeaderFlushMessage::Flush)));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_initialize_rewinds_to_active_chain() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let store = store(&db);
        let chain = ChainBuilder::new().extend_pos(5);
        for node in chain.nodes().iter().skip(1) {
            store.add_to_pending_batch(proven_header_for(&chain.block(node.hash())), node.to_hash_height()).unwrap();
        }
        store.flush().unwrap();

        // Same chain, nothing to do
        let reopened = store_with_empty_cache(&db);
        assert_eq!(reopened.initialize(&chain.tip()).unwrap(), Some(chain.tip().to_hash_height()));

        // The node restarts on a fork which diverged after height 3
        let fork = chain.fork_at(3).extend_pos(4);
        let reopened = store_with_empty_cache(&db);
        assert_eq!(reopened.initialize(&fork.tip()).unwrap(), Some(chain.node_at(3).to_hash_height()));
        assert_eq!(reopened.persisted_tip().unwrap(), Some(chain.node_at(3).to_hash_height()));
        assert!(reopened.get_by_height(4).unwrap().is_none());
        assert!(reopened.get_by_height(5).unwrap().is_none());
        assert_eq!(reopened.get_by_height(3).unwrap().unwrap().hash(), chain.node_at(3).hash());
    }

    #[test]
    fn test_initialize_with_shorter_chain_and_unrelated_chain() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let store = store(&db);
        let chain = ChainBuilder::new().extend_pos(4);
        for node in chain.nodes().iter().skip(1) {
            store.add_to_pending_batch(proven_header_for(&chain.block(node.hash())), node.to_hash_height()).unwrap();
        }
        store.flush().unwrap();

        let reopened = store_with_empty_cache(&db);
        assert_eq!(reopened.initialize(&chain.node_at(2)).unwrap(), Some(chain.node_at(2).to_hash_height()));
        assert!(reopened.get_by_height(3).unwrap().is_none());

        let unrelated = ChainBuilder::with_seed(77).extend_pos(2);
        let reopened = store_with_empty_cache(&db);
        assert!(reopened.initialize(&unrelated.tip()).unwrap().is_none());
        assert!(reopened.tip().unwrap().is_none());
        assert!(reopened.get_by_height(1).unwrap().is_none());
    }

    #[test]
    fn test_initialize_removes_entries_above_lowered_tip() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let tracked = CachePolicy::Tracked { max_size: 4096, min_items: 2, mem_mode: MemMode::Bytes };
        let store = DbProvenBlockHeaderStore::new(db.clone(), tracked, 100);
        let chain = ChainBuilder::new().extend_pos(5);
        for node in chain.nodes().iter().skip(1) {
            store.add_to_pending_batch(proven_header_for(&chain.block(node.hash())), node.to_hash_height()).unwrap();
        }
        store.flush().unwrap();

        // A reorg to a shorter chain only rewrites height 3 before the node stops
        let fork = chain.fork_at(2).extend_pos(1);
        let node = fork.tip();
        store.add_to_pending_batch(proven_header_for(&fork.block(node.hash())), node.to_hash_height()).unwrap();
        store.flush().unwrap();
        assert_eq!(store.persisted_tip().unwrap(), Some(node.to_hash_height()));
        assert_eq!(store.get_by_height(5).unwrap().unwrap().hash(), chain.node_at(5).hash());

        let reopened = DbProvenBlockHeaderStore::new(db.clone(), tracked, 100);
        assert_eq!(reopened.initialize(&fork.tip()).unwrap(), Some(node.to_hash_height()));
        assert!(reopened.get_by_height(4).unwrap().is_none());
        assert!(reopened.get_by_height(5).unwrap().is_none());
        assert_eq!(reopened.get_by_height(3).unwrap().unwrap().hash(), node.hash());
        assert_eq!(reopened.get_by_height(1).unwrap().unwrap().hash(), chain.node_at(1).hash());
    }

    #[test]
    fn test_initialize_deep_rewind() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
        let store = store(&db);
        let chain = ChainBuilder::new().extend_pos(400);
        for node in chain.nodes().iter().skip(1) {
            store.add_to_pending_batch(proven_header_for(&chain.block(node.hash())), node.to_hash_height()).unwrap();
        }
        store.flush().unwrap();

        let fork = chain.fork_at(10).extend_pos(395);
        let reopened = store_with_empty_cache(&db);
        assert_eq!(reopened.initialize(&fork.tip()).unwrap(), Some(chain.node_at(10).to_hash_height()));
        assert!(reopened.get_by_height(11).unwrap().is_none());
        assert!(reopened.get_by_height(400).unwrap().is_none());
    }
}
