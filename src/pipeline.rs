//! Two-phase ETL driver: extract the source range into a collector, then
//! merge and load the result into the destination.

use std::path::Path;
use std::time::Instant;

use crate::collector::Collector;
use crate::config::TransformArgs;
use crate::error::Result;
use crate::extract::{extract, SourceCursor};
use crate::load::{load, CommitHandler, Destination, LoadTransform, TableReader};

/// Runs one bulk ETL pass: scans `[extract_start_key, extract_end_key)` from
/// `source`, pushes everything the extract transform emits through an
/// external sort, and loads the globally ordered result into `destination`
/// in checkpointed batches.
///
/// The phases are strictly sequential: extraction finishes (and the final
/// buffer is sealed) before the first entry is loaded. Spill files live under
/// `tmp_dir` for the duration of the call and are deleted on every exit path.
/// On failure the destination keeps whatever the last successful checkpoint
/// produced; callers wanting to resume restart with the last committed key
/// stepped by [`next_key`](crate::key::next_key) as the new start key.
#[allow(clippy::too_many_arguments)]
pub fn transform<C, D, R, E>(
    label: &str,
    source: &mut C,
    destination: &mut D,
    current: &R,
    tmp_dir: &Path,
    extract_transform: E,
    load_transform: LoadTransform<'_>,
    commit: &mut CommitHandler<'_, D>,
    args: TransformArgs,
) -> Result<()>
where
    C: SourceCursor + ?Sized,
    D: Destination + ?Sized,
    R: TableReader,
    E: FnMut(&[u8], &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>,
{
    let mut collector = Collector::new(label, tmp_dir, &args);

    let started = Instant::now();
    let scanned = extract(label, source, &mut collector, extract_transform, &args)?;
    collector.finish()?;
    tracing::debug!(
        label = %label,
        scanned = scanned,
        collected = collector.len(),
        runs = collector.run_count(),
        took = ?started.elapsed(),
        "Extraction finished"
    );

    let started = Instant::now();
    let result = load(
        label,
        collector,
        destination,
        current,
        load_transform,
        commit,
        &args,
    );
    tracing::debug!(label = %label, took = ?started.elapsed(), "Load finished");
    result
}
