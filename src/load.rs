//! Drains the merged stream into the destination store in checkpointed
//! batches.

use crate::collector::Collector;
use crate::config::TransformArgs;
use crate::error::Result;
use crate::format::Raw;
use crate::progress::{Ticker, PROGRESS_INTERVAL};

/// Point lookups against the destination's state from before the load
/// started, for transforms that fold new data into existing values.
pub trait TableReader {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Write sink for the destination store. Writes arrive in ascending key
/// order and carry upsert semantics.
pub trait Destination {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Transform applied to each merged entry on its way into the destination.
pub type LoadFn<'a> =
    Box<dyn FnMut(&[u8], &[u8], &dyn TableReader) -> Result<Vec<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Either the write-through fast path or a caller-supplied transform. The
/// explicit variant makes the fast path a type-checked choice instead of a
/// function-identity test, with identical observable output.
pub enum LoadTransform<'a> {
    /// Writes each merged entry to the destination as-is.
    Identity,
    /// Derives zero or more entries per merged entry, written in emission
    /// order. May read the destination's pre-load state.
    Custom(LoadFn<'a>),
}

impl LoadTransform<'_> {
    pub fn is_identity(&self) -> bool {
        matches!(self, LoadTransform::Identity)
    }
}

/// Handler invoked at batch boundaries, with the last merged key written so
/// far and `is_done = true` exactly once at the end. The handler may commit
/// and reopen whatever sits behind the destination handle; the loader only
/// touches the destination between invocations.
pub type CommitHandler<'a, D> = dyn FnMut(&mut D, &[u8], bool) -> Result<()> + 'a;

/// Merges the collector's sources and writes the result into `destination`.
///
/// A checkpoint fires whenever the bytes written since the previous one
/// reach `args.load_batch_size`; the final checkpoint fires unconditionally,
/// even for an empty stream. Errors from the stream, the transform, the
/// destination or the handler abort the load unchanged.
pub fn load<D, R>(
    label: &str,
    collector: Collector,
    destination: &mut D,
    current: &R,
    mut transform: LoadTransform<'_>,
    commit: &mut CommitHandler<'_, D>,
    args: &TransformArgs,
) -> Result<()>
where
    D: Destination + ?Sized,
    R: TableReader,
{
    let mut ticker = Ticker::new(PROGRESS_INTERVAL);
    let mut batch_bytes = 0usize;
    let mut last_key: Vec<u8> = Vec::new();

    for item in collector.into_merge()? {
        let (key, value) = item?;

        if ticker.tick() {
            match args.log_details_load {
                Some(details) => tracing::info!(
                    label = %label,
                    details = %details(&key, &value),
                    "ETL [2/2] loading"
                ),
                None => tracing::info!(
                    label = %label,
                    current = %Raw::bytes(&key),
                    "ETL [2/2] loading"
                ),
            }
        }

        match &mut transform {
            LoadTransform::Identity => {
                destination.put(&key, &value)?;
                batch_bytes += key.len() + value.len();
            }
            LoadTransform::Custom(transform) => {
                for (derived_key, derived_value) in transform(&key, &value, current)? {
                    destination.put(&derived_key, &derived_value)?;
                    batch_bytes += derived_key.len() + derived_value.len();
                }
            }
        }

        // The resume key is the merged key, not a derived one: it lives in
        // the same key space the next extraction would scan.
        last_key = key;

        if batch_bytes >= args.load_batch_size {
            commit(destination, &last_key, false)?;
            batch_bytes = 0;
        }
    }

    commit(destination, &last_key, true)
}
