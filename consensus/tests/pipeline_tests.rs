//!
//! End to end tests of the proven header pipeline over rocksdb
//!

use crossbeam_channel::{Receiver, unbounded};
use stake_consensus::{
    consensus::Consensus,
    errors::ProvenHeaderError,
    model::stores::proven_headers::{DbProvenBlockHeaderStore, ProvenBlockHeaderStoreReader},
    pipeline::{
        forwarder::{BlockStoreMessage, ChannelForwarder},
        proven_header_processor::BlockAcceptedTask,
    },
    test_helpers::ChainBuilder,
};
use stake_consensus_core::{
    BlockHeight,
    config::{ConfigBuilder, params::MAINNET_PARAMS},
};
use stake_core::log::try_init_logger;
use stake_database::{
    create_temp_db,
    prelude::{CachePolicy, ConnBuilder, DB},
};
use std::{sync::Arc, time::Duration};

fn create_consensus(db: &Arc<DB>, flush_threshold: usize) -> (Consensus<ChannelForwarder>, Receiver<BlockStoreMessage>) {
    let config = ConfigBuilder::new(MAINNET_PARAMS)
        .edit_perf_params(|perf| {
            perf.pending_flush_threshold = flush_threshold;
            perf.flush_interval = Duration::from_secs(3600);
            perf.monitor_interval = Duration::from_millis(10);
        })
        .build();
    let (sender, receiver) = unbounded();
    (Consensus::new(db.clone(), &config, ChannelForwarder::new(sender)), receiver)
}

fn task(chain: &ChainBuilder, height: BlockHeight, is_ibd: bool) -> BlockAcceptedTask {
    let node = chain.node_at(height);
    BlockAcceptedTask::new(chain.block(node.hash()), node, is_ibd)
}

fn stored_hash(db: &Arc<DB>, height: BlockHeight) -> Option<stake_hashes::Hash> {
    let store = DbProvenBlockHeaderStore::new(db.clone(), CachePolicy::Empty, 1);
    store.get_by_height(height).unwrap().map(|header| header.hash())
}

#[tokio::test]
async fn test_pipeline_persists_and_forwards() {
    try_init_logger("info,stake_consensus=debug");
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
    let chain = ChainBuilder::new().extend_pos(6);
    let fork = chain.fork_at(4).extend_pos(2);

    {
        let (consensus, block_store_receiver) = create_consensus(&db, 1000);
        assert!(consensus.init(&chain.node_at(0)).unwrap().is_none());
        let handles = consensus.run_processors();

        for height in 1..=6 {
            consensus.submit_block_accepted(task(&chain, height, height <= 3)).await.unwrap();
        }
        for height in 5..=6 {
            consensus.submit_block_accepted(task(&fork, height, false)).await.unwrap();
        }
        assert_eq!(consensus.proven_header_store().pending_len(), 6);
        consensus.shutdown(handles);

        let forwarded: Vec<_> = block_store_receiver.try_iter().collect();
        assert_eq!(forwarded.len(), 9);
        assert!(matches!(forwarded.last(), Some(BlockStoreMessage::Exit)));

        let snapshot = consensus.counters().snapshot();
        assert_eq!(snapshot.synthesized_counts, 8);
        assert_eq!(snapshot.upgraded_counts, 5);
        assert_eq!(snapshot.stale_counts, 2);
        assert_eq!(consensus.proven_header_store().pending_len(), 0);
    }

    // IBD blocks keep their plain header, later ones are upgraded
    assert!(!chain.node_at(3).is_proven());
    assert!(chain.node_at(4).is_proven());
    assert!(fork.node_at(6).is_proven());

    // The exit flush persisted the repaired entries
    for height in 1..=6 {
        assert_eq!(stored_hash(&db, height), Some(fork.node_at(height).hash()));
    }
}

#[tokio::test]
async fn test_flush_threshold_triggers_persistence() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
    let chain = ChainBuilder::new().extend_pos(4);
    let (consensus, _block_store_receiver) = create_consensus(&db, 2);
    let handles = consensus.run_processors();

    for height in 1..=4 {
        consensus.submit_block_accepted(task(&chain, height, false)).await.unwrap();
    }
    // Any flush following the first signal covers height 2
    let start = std::time::Instant::now();
    while stored_hash(&db, 2).is_none() {
        assert!(start.elapsed() < Duration::from_secs(10), "threshold flush did not happen");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    consensus.shutdown(handles);
    assert_eq!(stored_hash(&db, 4), Some(chain.node_at(4).hash()));
}

#[tokio::test]
async fn test_synthesis_failure_is_reported_and_pipeline_continues() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
    let chain = ChainBuilder::new().extend_pow(1).extend_pos(1);
    let (consensus, block_store_receiver) = create_consensus(&db, 1000);
    let handles = consensus.run_processors();

    let res = consensus.submit_block_accepted(task(&chain, 1, false)).await;
    assert!(matches!(res, Err(ProvenHeaderError::Synthesis(_))));
    consensus.submit_block_accepted(task(&chain, 2, false)).await.unwrap();
    consensus.shutdown(handles);

    let forwarded: Vec<_> = block_store_receiver.try_iter().collect();
    assert!(matches!(&forwarded[..], [BlockStoreMessage::Store(pair), BlockStoreMessage::Exit] if pair.chained_header.height() == 2));

    // Submitting after shutdown fails cleanly
    let res = consensus.submit_block_accepted(task(&chain, 2, false)).await;
    assert!(matches!(res, Err(ProvenHeaderError::ProcessorExited)));
}

#[tokio::test]
async fn test_restart_on_fork_rewinds_store() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
    let chain = ChainBuilder::new().extend_pos(5);
    {
        let (consensus, _receiver) = create_consensus(&db, 1000);
        let handles = consensus.run_processors();
        for height in 1..=5 {
            consensus.submit_block_accepted(task(&chain, height, false)).await.unwrap();
        }
        consensus.shutdown(handles);
    }

    // The node comes back on a fork which diverged after height 2
    let fork = chain.fork_at(2).extend_pos(4);
    let (consensus, _receiver) = create_consensus(&db, 1000);
    let tip = consensus.init(&fork.tip()).unwrap();
    assert_eq!(tip, Some(chain.node_at(2).to_hash_height()));
    assert_eq!(stored_hash(&db, 3), None);

    let handles = consensus.run_processors();
    for height in 3..=6 {
        consensus.submit_block_accepted(task(&fork, height, false)).await.unwrap();
    }
    consensus.shutdown(handles);
    drop(consensus);

    let store = DbProvenBlockHeaderStore::new(db.clone(), CachePolicy::Empty, 1);
    assert_eq!(store.tip().unwrap(), Some(fork.tip().to_hash_height()));
    for height in 1..=6 {
        assert_eq!(stored_hash(&db, height), Some(fork.node_at(height).hash()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submissions_racing_shutdown_always_resolve() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default());
    let chain = Arc::new(ChainBuilder::new().extend_pos(300));
    let (consensus, block_store_receiver) = create_consensus(&db, 1000);
    let consensus = Arc::new(consensus);
    let handles = consensus.run_processors();

    let submitter = {
        let consensus = consensus.clone();
        let chain = chain.clone();
        tokio::spawn(async move {
            let mut results = Vec::new();
            for height in 1..=300 {
                results.push(consensus.submit_block_accepted(task(&chain, height, false)).await);
            }
            results
        })
    };

    tokio::time::sleep(Duration::from_millis(2)).await;
    let shutdown = {
        let consensus = consensus.clone();
        tokio::task::spawn_blocking(move || consensus.shutdown(handles))
    };

    let results = tokio::time::timeout(Duration::from_secs(30), submitter).await.expect("a submission never resolved").unwrap();
    shutdown.await.unwrap();

    // Every submission resolves, and once the processor exited it stays exited
    let processed = results.iter().take_while(|res| res.is_ok()).count();
    assert!(results[processed..].iter().all(|res| matches!(res, Err(ProvenHeaderError::ProcessorExited))));

    let stored = block_store_receiver.try_iter().filter(|msg| matches!(msg, BlockStoreMessage::Store(_))).count();
    assert_eq!(stored, processed);
    for height in 1..=processed as BlockHeight {
        assert_eq!(stored_hash(&db, height), Some(chain.node_at(height).hash()));
    }
}
