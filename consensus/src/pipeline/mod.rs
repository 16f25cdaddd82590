pub mod flush_processor;
pub mod forwarder;
pub mod monitor;
pub mod proven_header_processor;

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ProvenHeaderCounters {
    pub signal_counts: AtomicU64,
    pub already_proven_counts: AtomicU64,
    pub match_counts: AtomicU64,
    pub missing_counts: AtomicU64,
    pub stale_counts: AtomicU64,
    pub synthesized_counts: AtomicU64,
    pub upgraded_counts: AtomicU64,
    pub forwarded_counts: AtomicU64,
}

impl ProvenHeaderCounters {
    pub fn snapshot(&self) -> ProvenHeaderCountersSnapshot {
        ProvenHeaderCountersSnapshot {
            signal_counts: self.signal_counts.load(Ordering::Relaxed),
            already_proven_counts: self.already_proven_counts.load(Ordering::Relaxed),
            match_counts: self.match_counts.load(Ordering::Relaxed),
            missing_counts: self.missing_counts.load(Ordering::Relaxed),
            stale_counts: self.stale_counts.load(Ordering::Relaxed),
            synthesized_counts: self.synthesized_counts.load(Ordering::Relaxed),
            upgraded_counts: self.upgraded_counts.load(Ordering::Relaxed),
            forwarded_counts: self.forwarded_counts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ProvenHeaderCountersSnapshot {
    pub signal_counts: u64,
    pub already_proven_counts: u64,
    pub match_counts: u64,
    pub missing_counts: u64,
    pub stale_counts: u64,
    pub synthesized_counts: u64,
    pub upgraded_counts: u64,
    pub forwarded_counts: u64,
}

impl core::ops::Sub for &ProvenHeaderCountersSnapshot {
    type Output = ProvenHeaderCountersSnapshot;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            signal_counts: self.signal_counts.saturating_sub(rhs.signal_counts),
            already_proven_counts: self.already_proven_counts.saturating_sub(rhs.already_proven_counts),
            match_counts: self.match_counts.saturating_sub(rhs.match_counts),
            missing_counts: self.missing_counts.saturating_sub(rhs.missing_counts),
            stale_counts: self.stale_counts.saturating_sub(rhs.stale_counts),
            synthesized_counts: self.synthesized_counts.saturating_sub(rhs.synthesized_counts),
            upgraded_counts: self.upgraded_counts.saturating_sub(rhs.upgraded_counts),
            forwarded_counts: self.forwarded_counts.saturating_sub(rhs.forwarded_counts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_delta() {
        let counters = ProvenHeaderCounters::default();
        counters.signal_counts.fetch_add(3, Ordering::Relaxed);
        counters.stale_counts.fetch_add(1, Ordering::Relaxed);
        let first = counters.snapshot();

        counters.signal_counts.fetch_add(2, Ordering::Relaxed);
        counters.forwarded_counts.fetch_add(2, Ordering::Relaxed);
        let delta = &counters.snapshot() - &first;
        assert_eq!(delta, ProvenHeaderCountersSnapshot { signal_counts: 2, forwarded_counts: 2, ..Default::default() });
    }
}
