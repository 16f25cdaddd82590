use crate::model::stores::proven_headers::DbProvenBlockHeaderStore;
use crossbeam_channel::{Receiver, select, tick};
use stake_core::{error, trace, warn};
use std::{sync::Arc, time::Duration};

pub enum ProvenHeaderFlushMessage {
    Exit,
    Flush,
}

/// Owns the persistence schedule of the proven header store. Pending writes are flushed when
/// the store signals its flush threshold was reached, on every tick of `flush_interval`, and
/// once more before exiting.
pub struct ProvenHeaderFlushProcessor {
    receiver: Receiver<ProvenHeaderFlushMessage>,
    store: Arc<DbProvenBlockHeaderStore>,
    flush_interval: Duration,
}

impl ProvenHeaderFlushProcessor {
    pub fn new(receiver: Receiver<ProvenHeaderFlushMessage>, store: Arc<DbProvenBlockHeaderStore>, flush_interval: Duration) -> Self {
        Self { receiver, store, flush_interval }
    }

    pub fn worker(self: &Arc<Self>) {
        let ticker = tick(self.flush_interval);
        loop {
            select! {
                recv(self.receiver) -> msg => match msg {
                    Ok(ProvenHeaderFlushMessage::Flush) => self.flush(),
                    Ok(ProvenHeaderFlushMessage::Exit) => break,
                    Err(_) => {
                        warn!("proven header flush channel disconnected without an exit signal");
                        break;
                    }
                },
                recv(ticker) -> _ => self.flush(),
            }
        }

        self.flush();
        trace!("proven header flush processor exiting");
    }

    fn flush(&self) {
        match self.store.flush() {
            Ok(0) => {}
            Ok(count) => trace!("proven header flush persisted {} headers", count),
            // Pending writes are kept and retried on the next trigger
            Err(err) => error!("proven header flush failed: {}", err),
        }
    }
}
