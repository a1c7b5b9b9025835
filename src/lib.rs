pub mod buffer;
pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod key;
pub mod load;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod spill;

pub use buffer::{Buffer, Entry, EntrySetBuffer, SortableBuffer};
pub use collector::Collector;
pub use config::{
    bytewise, BufferType, Comparator, TransformArgs, DEFAULT_LOAD_BATCH_SIZE, OPTIMAL_BUFFER_SIZE,
};
pub use error::{Error, Result};
pub use extract::{extract, SourceCursor};
pub use key::next_key;
pub use load::{load, CommitHandler, Destination, LoadFn, LoadTransform, TableReader};
pub use merge::{EntryIter, MergeIterator};
pub use pipeline::transform;
pub use progress::{CancelToken, LogDetails};
pub use spill::{RunFile, RunReader, RunWriter};
