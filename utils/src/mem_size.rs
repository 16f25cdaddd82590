//! Defines a [`MemSizeEstimator`] trait and a companion [`MemMode`] used by size-tracking caches
//! to estimate how much memory a cached object holds, including owned heap allocations.

use std::{mem::size_of, sync::Arc};

use parking_lot::RwLock;

/// The unit a cache tracks its budget in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemMode {
    Bytes,
    Units,
}

/// The contract for estimating the deep memory size owned by an object.
///
/// Implementors are expected to support a single mode. Objects with a size known at compile time (or
/// containers of such objects) implement `estimate_mem_units` and return the number of logical items.
/// Objects whose size varies at runtime implement `estimate_mem_bytes`.
///
/// Calling the mode an object does not support panics, so tests catch a cache that was configured
/// with a mode its data cannot report.
pub trait MemSizeEstimator {
    fn estimate_size(&self, mem_mode: MemMode) -> usize {
        match mem_mode {
            MemMode::Bytes => self.estimate_mem_bytes(),
            MemMode::Units => self.estimate_mem_units(),
        }
    }

    /// Estimates the (deep) size of this object in bytes
    fn estimate_mem_bytes(&self) -> usize {
        unimplemented!()
    }

    /// Estimates the number of logical units this object holds
    fn estimate_mem_units(&self) -> usize {
        unimplemented!()
    }
}

macro_rules! unit_sized {
    ($($t:ty),+) => {
        $(
            impl MemSizeEstimator for $t {
                fn estimate_mem_units(&self) -> usize {
                    1
                }
            }
        )+
    };
}

unit_sized!(u8, u16, u32, u64, i32, i64, bool);

impl<T> MemSizeEstimator for Vec<T> {
    fn estimate_mem_units(&self) -> usize {
        self.len()
    }

    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>() + self.capacity() * size_of::<T>()
    }
}

impl<T: MemSizeEstimator> MemSizeEstimator for Arc<T> {
    fn estimate_mem_bytes(&self) -> usize {
        self.as_ref().estimate_mem_bytes() + size_of::<Self>()
    }

    fn estimate_mem_units(&self) -> usize {
        self.as_ref().estimate_mem_units()
    }
}

impl<T: MemSizeEstimator> MemSizeEstimator for RwLock<T> {
    fn estimate_mem_bytes(&self) -> usize {
        self.read().estimate_mem_bytes() + size_of::<Self>()
    }

    fn estimate_mem_units(&self) -> usize {
        self.read().estimate_mem_units()
    }
}
