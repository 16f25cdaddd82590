use super::ProvenHeaderCounters;
use crossbeam_channel::{Receiver, select, tick};
use stake_core::{info, trace, warn};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Periodically logs the proven header counters. Reads counters only, so it has no effect on processing.
pub struct ProvenHeaderMonitor {
    counters: Arc<ProvenHeaderCounters>,
    snapshot_interval: Duration,
    exit_receiver: Receiver<()>,
}

impl ProvenHeaderMonitor {
    pub fn new(counters: Arc<ProvenHeaderCounters>, snapshot_interval: Duration, exit_receiver: Receiver<()>) -> Self {
        Self { counters, snapshot_interval, exit_receiver }
    }

    pub fn worker(self: &Arc<Self>) {
        let ticker = tick(self.snapshot_interval);
        let mut last_snapshot = self.counters.snapshot();
        let mut last_log_time = Instant::now();
        loop {
            select! {
                recv(self.exit_receiver) -> msg => {
                    if msg.is_err() {
                        warn!("proven header monitor exit channel disconnected");
                    }
                    break;
                },
                recv(ticker) -> _ => {},
            }

            let snapshot = self.counters.snapshot();
            if snapshot == last_snapshot {
                // No update, avoid printing useless info
                last_log_time = Instant::now();
                continue;
            }

            // Subtract the snapshots
            let delta = &snapshot - &last_snapshot;
            let now = Instant::now();

            info!(
                "Processed {} accepted blocks in the last {:.2}s ({} already proven; {} matching; {} missing; {} stale; {} synthesized; {} upgraded; {} forwarded)",
                delta.signal_counts,
                (now - last_log_time).as_secs_f64(),
                delta.already_proven_counts,
                delta.match_counts,
                delta.missing_counts,
                delta.stale_counts,
                delta.synthesized_counts,
                delta.upgraded_counts,
                delta.forwarded_counts,
            );

            last_snapshot = snapshot;
            last_log_time = now;
        }

        trace!("monitor thread exiting");
    }
}
