//! Range scan over the source store, feeding transformed entries into a
//! collector.

use std::cmp::Ordering;

use crate::collector::Collector;
use crate::config::TransformArgs;
use crate::error::Result;
use crate::format::Raw;
use crate::progress::{Ticker, PROGRESS_INTERVAL};

/// Ordered cursor over a byte-keyed source store.
///
/// `seek` positions the cursor at the first entry with key >= the given key
/// and returns it; `next` returns the following entry. Both return `None` at
/// the end of the range.
pub trait SourceCursor {
    fn seek(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
}

/// Scans `[extract_start_key, extract_end_key)` from the cursor, applies the
/// transform to every entry and collects whatever it emits.
///
/// The transform returns the derived entries for one source entry, in the
/// order they should be collected: an empty vec filters the entry out, one
/// pair maps it, several pairs fan it out. The cancellation token is polled
/// once per source entry, before the transform runs; errors from the cursor
/// or the transform abort the scan unchanged.
///
/// Returns the number of source entries scanned.
pub fn extract<C, F>(
    label: &str,
    cursor: &mut C,
    collector: &mut Collector,
    mut transform: F,
    args: &TransformArgs,
) -> Result<u64>
where
    C: SourceCursor + ?Sized,
    F: FnMut(&[u8], &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>,
{
    let mut ticker = Ticker::new(PROGRESS_INTERVAL);
    let mut scanned = 0u64;

    let mut item = cursor.seek(&args.extract_start_key)?;
    while let Some((key, value)) = item {
        args.cancel.check()?;

        if ticker.tick() {
            match args.log_details_extract {
                Some(details) => tracing::info!(
                    label = %label,
                    details = %details(&key, &value),
                    "ETL [1/2] extracting"
                ),
                None => tracing::info!(
                    label = %label,
                    current = %Raw::bytes(&key),
                    "ETL [1/2] extracting"
                ),
            }
        }

        if let Some(end) = &args.extract_end_key {
            // End key is an exclusive bound: [start, end).
            if (args.comparator)(&key, end) != Ordering::Less {
                break;
            }
        }

        for (derived_key, derived_value) in transform(&key, &value)? {
            collector.collect(&derived_key, &derived_value)?;
        }

        scanned += 1;
        item = cursor.next()?;
    }

    Ok(scanned)
}
