use crate::{
    errors::{ProvenHeaderError, ProvenHeaderProcessResult},
    model::stores::{DB, proven_headers::DbProvenBlockHeaderStore},
    pipeline::{
        ProvenHeaderCounters,
        flush_processor::{ProvenHeaderFlushMessage, ProvenHeaderFlushProcessor},
        forwarder::BlockForwarder,
        monitor::ProvenHeaderMonitor,
        proven_header_processor::{BlockAcceptedTask, ProvenHeaderProcessingMessage, ProvenHeaderProcessor, ProvenHeaderResultSender},
    },
    processes::proof_synthesis::ProofSynthesizer,
};
use crossbeam_channel::{SendTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;
use stake_consensus_core::{chained_header::ChainedHeader, config::Config, hash_height::HashHeightPair};
use stake_core::{error, info};
use stake_database::prelude::{CachePolicy, StoreResult};
use stake_utils::mem_size::MemMode;
use std::{
    future::Future,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tokio::sync::oneshot;

pub type DbProvenHeaderProcessor<F> = ProvenHeaderProcessor<DbProvenBlockHeaderStore, ProofSynthesizer, F>;

/// Wires the proven header store, its flush processor, the proven header processor and the monitor
/// together according to `Config`
pub struct Consensus<F: BlockForwarder> {
    // Channels
    processing_sender: Sender<ProvenHeaderProcessingMessage>,
    flush_sender: Sender<ProvenHeaderFlushMessage>,
    monitor_exit_sender: Sender<()>,

    // Stores
    proven_header_store: Arc<DbProvenBlockHeaderStore>,

    // Processors
    proven_header_processor: Arc<DbProvenHeaderProcessor<F>>,
    flush_processor: Arc<ProvenHeaderFlushProcessor>,
    monitor: Arc<ProvenHeaderMonitor>,

    // Counters
    counters: Arc<ProvenHeaderCounters>,

    // Guards the processing sender, so no task can be queued behind the exit signal
    is_exiting: Mutex<bool>,
}

impl<F: BlockForwarder + 'static> Consensus<F> {
    pub fn new(db: Arc<DB>, config: &Config, forwarder: F) -> Self {
        let perf = &config.perf;
        let counters = Arc::new(ProvenHeaderCounters::default());

        // A single queued flush signal is enough
        let (flush_sender, flush_receiver) = bounded(1);
        let (processing_sender, processing_receiver) = unbounded();
        let (monitor_exit_sender, monitor_exit_receiver) = unbounded();

        let cache_policy = CachePolicy::Tracked {
            max_size: perf.proven_header_cache_budget,
            min_items: perf.proven_header_cache_min_items,
            mem_mode: MemMode::Bytes,
        };
        let proven_header_store = Arc::new(
            DbProvenBlockHeaderStore::new(db, cache_policy, perf.pending_flush_threshold).with_flush_signal(flush_sender.clone()),
        );
        let flush_processor =
            Arc::new(ProvenHeaderFlushProcessor::new(flush_receiver, proven_header_store.clone(), perf.flush_interval));
        let proven_header_processor = Arc::new(ProvenHeaderProcessor::new(
            processing_receiver,
            proven_header_store.clone(),
            ProofSynthesizer::new(&config.params),
            forwarder,
            counters.clone(),
        ));
        let monitor = Arc::new(ProvenHeaderMonitor::new(counters.clone(), perf.monitor_interval, monitor_exit_receiver));

        info!("proven header consensus created for {}", config.network_name());
        Self {
            processing_sender,
            flush_sender,
            monitor_exit_sender,
            proven_header_store,
            proven_header_processor,
            flush_processor,
            monitor,
            counters,
            is_exiting: Mutex::new(false),
        }
    }

    /// Reconciles the store with the active chain. Must be called before the processors run.
    pub fn init(&self, chain_tip: &Arc<ChainedHeader>) -> StoreResult<Option<HashHeightPair>> {
        self.proven_header_store.initialize(chain_tip)
    }

    pub fn run_processors(&self) -> Vec<JoinHandle<()>> {
        let proven_header_processor = self.proven_header_processor.clone();
        let flush_processor = self.flush_processor.clone();
        let monitor = self.monitor.clone();

        vec![
            thread::Builder::new()
                .name("proven-header-processor".to_string())
                .spawn(move || proven_header_processor.worker())
                .expect("failed spawning the proven header processor thread"),
            thread::Builder::new()
                .name("proven-header-flush".to_string())
                .spawn(move || flush_processor.worker())
                .expect("failed spawning the proven header flush thread"),
            thread::Builder::new()
                .name("proven-header-monitor".to_string())
                .spawn(move || monitor.worker())
                .expect("failed spawning the proven header monitor thread"),
        ]
    }

    /// Queues a block-accepted signal. The returned future resolves once the block was processed and forwarded.
    pub fn submit_block_accepted(&self, task: BlockAcceptedTask) -> impl Future<Output = ProvenHeaderProcessResult<()>> + use<F> {
        let (tx, rx): (ProvenHeaderResultSender, _) = oneshot::channel();
        let sent = {
            let is_exiting = self.is_exiting.lock();
            if *is_exiting {
                Err(ProvenHeaderError::ProcessorExited)
            } else {
                self.processing_sender
                    .send(ProvenHeaderProcessingMessage::Process(task, tx))
                    .map_err(|_| ProvenHeaderError::ProcessorExited)
            }
        };
        async move {
            sent?;
            rx.await.map_err(|_| ProvenHeaderError::ProcessorExited)?
        }
    }

    pub fn proven_header_store(&self) -> &Arc<DbProvenBlockHeaderStore> {
        &self.proven_header_store
    }

    pub fn counters(&self) -> &Arc<ProvenHeaderCounters> {
        &self.counters
    }

    /// Stops the processors returned by `run_processors` in pipeline order, so the final flush
    /// persists every write staged by the proven header processor. Every task submitted before
    /// shutdown is either processed or resolves to `ProcessorExited`.
    pub fn shutdown(&self, wait_handles: Vec<JoinHandle<()>>) {
        let mut handles = wait_handles.into_iter();

        {
            let mut is_exiting = self.is_exiting.lock();
            if !*is_exiting {
                *is_exiting = true;
                // The receiver might have already exited
                let _ = self.processing_sender.send(ProvenHeaderProcessingMessage::Exit);
            }
        }
        join_next(&mut handles);
        // Tasks left behind by a processor which did not exit cleanly
        self.proven_header_processor.drop_pending();

        if let Some(handle) = handles.next() {
            send_exit(&self.flush_sender, ProvenHeaderFlushMessage::Exit, &handle);
            join(handle);
        }
        let _ = self.monitor_exit_sender.send(());
        join_next(&mut handles);
    }
}

/// Sends `msg` over a possibly full bounded channel, giving up once the receiving thread is gone
fn send_exit<T>(sender: &Sender<T>, mut msg: T, handle: &JoinHandle<()>) {
    loop {
        match sender.send_timeout(msg, Duration::from_millis(100)) {
            Ok(()) | Err(SendTimeoutError::Disconnected(_)) => return,
            Err(SendTimeoutError::Timeout(_)) if handle.is_finished() => return,
            Err(SendTimeoutError::Timeout(returned)) => msg = returned,
        }
    }
}

fn join_next(handles: &mut impl Iterator<Item = JoinHandle<()>>) {
    if let Some(handle) = handles.next() {
        join(handle);
    }
}

fn join(handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or_default().to_string();
    if handle.join().is_err() {
        error!("{} thread panicked", name);
    }
}
