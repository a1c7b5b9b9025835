use std::cmp::Ordering;

use crate::progress::{CancelToken, LogDetails};

/// Total order over keys. Must be the same across buffer sort, run order and
/// merge, or the output order is undefined.
pub type Comparator = fn(&[u8], &[u8]) -> Ordering;

/// Default key ordering: unsigned lexicographic byte comparison.
pub fn bytewise(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Default spill threshold for the collect buffer (default: 256MB).
pub const OPTIMAL_BUFFER_SIZE: usize = 256 * 1024 * 1024;

/// Default byte budget per load batch between commit checkpoints (default: 4MB).
pub const DEFAULT_LOAD_BATCH_SIZE: usize = 4 * 1024 * 1024;

/// Selects the collect buffer implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferType {
    /// Append-only buffer. Keeps every submitted entry, including duplicate
    /// keys; duplicates are resolved last-write-wins at merge time.
    #[default]
    Sortable,
    /// Entry set keyed by key. Inserting an existing key overwrites its value
    /// immediately, so at most one entry per key reaches the merge.
    EntrySet,
}

/// Options for a single [`transform`](crate::pipeline::transform) run.
///
/// The defaults give an unbounded scan with the optimal buffer size, the
/// append-only buffer and bytewise key ordering.
#[derive(Debug, Clone)]
pub struct TransformArgs {
    /// Spill threshold in estimated buffer bytes.
    pub buffer_size: usize,

    /// Collect buffer variant.
    pub buffer_type: BufferType,

    /// Key ordering used for buffer sort and merge.
    pub comparator: Comparator,

    /// Inclusive scan lower bound; empty means "from the first key".
    pub extract_start_key: Vec<u8>,

    /// Exclusive scan upper bound; `None` means "to the end".
    pub extract_end_key: Option<Vec<u8>>,

    /// Byte budget per load batch between commit checkpoints.
    pub load_batch_size: usize,

    /// Cooperative stop signal, polled once per extracted entry.
    pub cancel: CancelToken,

    /// Extra diagnostic fields for extract progress logs.
    pub log_details_extract: Option<LogDetails>,

    /// Extra diagnostic fields for load progress logs.
    pub log_details_load: Option<LogDetails>,
}

impl Default for TransformArgs {
    fn default() -> Self {
        Self {
            buffer_size: OPTIMAL_BUFFER_SIZE,
            buffer_type: BufferType::default(),
            comparator: bytewise,
            extract_start_key: Vec::new(),
            extract_end_key: None,
            load_batch_size: DEFAULT_LOAD_BATCH_SIZE,
            cancel: CancelToken::new(),
            log_details_extract: None,
            log_details_load: None,
        }
    }
}

impl TransformArgs {
    /// Set the spill threshold in bytes.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Select the collect buffer variant.
    pub fn buffer_type(mut self, buffer_type: BufferType) -> Self {
        self.buffer_type = buffer_type;
        self
    }

    /// Set the key ordering.
    pub fn comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Set the inclusive scan lower bound.
    pub fn extract_start_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.extract_start_key = key.into();
        self
    }

    /// Set the exclusive scan upper bound.
    pub fn extract_end_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.extract_end_key = Some(key.into());
        self
    }

    /// Set the byte budget per load batch.
    pub fn load_batch_size(mut self, size: usize) -> Self {
        self.load_batch_size = size;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach a detail hook for extract progress logs.
    pub fn log_details_extract(mut self, details: LogDetails) -> Self {
        self.log_details_extract = Some(details);
        self
    }

    /// Attach a detail hook for load progress logs.
    pub fn log_details_load(mut self, details: LogDetails) -> Self {
        self.log_details_load = Some(details);
        self
    }
}
