pub mod consensus {
    //!
    //! A module for consensus constants shared by all networks unless overridden by network params.
    //!

    /// Maximal length of a proof-of-stake block signature. A DER encoded ECDSA signature never exceeds 72 bytes.
    pub const MAX_BLOCK_SIGNATURE_LEN: usize = 80;

    /// The index of the coinstake transaction within a proof-of-stake block. The coinbase comes first.
    pub const COINSTAKE_TX_INDEX: usize = 1;
}

pub mod perf {
    //!
    //! A module for performance critical constants. These do not affect consensus.
    //!

    use std::time::Duration;

    #[derive(Clone, Debug)]
    pub struct PerfParams {
        /// Memory budget in bytes of the proven header store hot cache
        pub proven_header_cache_budget: usize,

        /// Number of proven headers kept in the hot cache even when over budget
        pub proven_header_cache_min_items: usize,

        /// Number of pending proven header writes which triggers an early flush
        pub pending_flush_threshold: usize,

        /// Interval at which pending proven header writes are flushed regardless of their count
        pub flush_interval: Duration,

        /// Interval at which the proven header counters are sampled and logged
        pub monitor_interval: Duration,
    }

    pub const PERF_PARAMS: PerfParams = PerfParams {
        proven_header_cache_budget: 32 * 1024 * 1024,
        proven_header_cache_min_items: 100,
        pending_flush_threshold: 1_000,
        flush_interval: Duration::from_secs(5),
        monitor_interval: Duration::from_secs(10),
    };
}
