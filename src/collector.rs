//! Accumulates extracted entries in memory, spills sorted runs to disk when
//! the buffer crosses its threshold, and hands the result to the merge.
//!
//! A collector lives for exactly one transform: fill it with `collect`, seal
//! it with `finish`, then consume it with `into_merge`. Run files are
//! temporary files owned by the collector (and later by their readers), so
//! they are deleted when the collector is dropped, on success and on failure
//! alike.

use std::path::PathBuf;

use crate::buffer::{new_buffer, Buffer, Entry};
use crate::config::{Comparator, TransformArgs};
use crate::error::{Error, Result};
use crate::merge::{EntryIter, MergeIterator};
use crate::spill::{RunFile, RunWriter};

pub struct Collector {
    label: String,
    tmp_dir: PathBuf,
    buffer: Box<dyn Buffer>,
    runs: Vec<RunFile>,
    threshold: usize,
    comparator: Comparator,
    // Sorted final buffer, kept in memory when nothing was ever spilled.
    sealed: Option<Vec<Entry>>,
    total: u64,
    finished: bool,
}

impl Collector {
    pub fn new(label: &str, tmp_dir: impl Into<PathBuf>, args: &TransformArgs) -> Self {
        Self {
            label: label.to_string(),
            tmp_dir: tmp_dir.into(),
            buffer: new_buffer(args.buffer_type),
            runs: Vec::new(),
            threshold: args.buffer_size,
            comparator: args.comparator,
            sealed: None,
            total: 0,
            finished: false,
        }
    }

    /// Accepts one extracted entry. Spills the buffer as a sorted run when
    /// its size estimate reaches the threshold.
    pub fn collect(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.finished {
            return Err(Error::InvalidState(
                "collector is already finished".to_string(),
            ));
        }
        self.buffer.put(key.to_vec(), value.to_vec());
        self.total += 1;
        if self.buffer.size() >= self.threshold {
            self.spill()?;
        }
        Ok(())
    }

    fn spill(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.tmp_dir)?;
        self.buffer.sort(self.comparator);

        let mut writer = RunWriter::create(&self.tmp_dir)?;
        for entry in self.buffer.entries() {
            writer.append(&entry.key, &entry.value)?;
        }
        let run = writer.finalize()?;

        tracing::debug!(
            label = %self.label,
            run = self.runs.len(),
            entries = run.entry_count(),
            bytes = run.bytes(),
            "Spilled buffer to run file"
        );

        self.runs.push(run);
        self.buffer.reset();
        Ok(())
    }

    /// Seals the collector once extraction is complete.
    ///
    /// When nothing was spilled the sorted buffer stays in memory and becomes
    /// the sole merge source, skipping disk entirely for small loads.
    /// Otherwise the remainder is spilled as one final run. Idempotent.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.runs.is_empty() {
            self.buffer.sort(self.comparator);
            self.sealed = Some(self.buffer.take());
        } else if !self.buffer.is_empty() {
            self.spill()?;
        }
        self.finished = true;
        Ok(())
    }

    /// Total entries collected.
    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Completed spill runs so far.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Consumes the collector into a single globally ordered stream over all
    /// runs and the sealed buffer. Sources are consumed destructively; the
    /// run files are deleted as their readers are dropped.
    pub fn into_merge(mut self) -> Result<MergeIterator> {
        self.finish()?;

        let mut sources: Vec<EntryIter> = Vec::with_capacity(self.runs.len() + 1);
        for run in self.runs {
            sources.push(Box::new(run.into_reader()?));
        }
        if let Some(entries) = self.sealed {
            // The in-memory buffer is the most recently created source, so it
            // is pushed last and wins ties against any run.
            sources.push(Box::new(
                entries.into_iter().map(|e| Ok((e.key, e.value))),
            ));
        }

        MergeIterator::new(sources, self.comparator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferType;
    use tempfile::TempDir;

    fn small_buffer_args() -> TransformArgs {
        // Threshold small enough that a handful of entries forces a spill.
        TransformArgs::default().buffer_size(64)
    }

    fn spill_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).expect("read tmp dir").count()
    }

    fn drain(collector: Collector) -> Vec<(Vec<u8>, Vec<u8>)> {
        collector
            .into_merge()
            .expect("merge")
            .collect::<Result<Vec<_>>>()
            .expect("entries")
    }

    #[test]
    fn test_small_load_never_touches_disk() {
        let dir = TempDir::new().expect("temp dir");
        let args = TransformArgs::default();
        let mut collector = Collector::new("test", dir.path(), &args);

        collector.collect(b"c", b"3").expect("collect");
        collector.collect(b"a", b"1").expect("collect");
        collector.collect(b"b", b"2").expect("collect");
        collector.finish().expect("finish");

        assert_eq!(collector.run_count(), 0);
        assert_eq!(spill_files(&dir), 0);
        assert_eq!(
            drain(collector),
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"c".to_vec(), b"3".to_vec()),
            ]
        );
    }

    #[test]
    fn test_crossing_threshold_spills_runs() {
        let dir = TempDir::new().expect("temp dir");
        let args = small_buffer_args();
        let mut collector = Collector::new("test", dir.path(), &args);

        // Each entry estimates at 8 + 8 + 16 = 32 bytes, so every second
        // entry crosses the 64 byte threshold.
        for i in 0..6u32 {
            let key = format!("key_{:04}", i);
            let value = format!("val_{:04}", i);
            collector
                .collect(key.as_bytes(), value.as_bytes())
                .expect("collect");
        }

        assert_eq!(collector.run_count(), 3);
        assert_eq!(spill_files(&dir), 3);

        collector.finish().expect("finish");
        assert_eq!(collector.run_count(), 3);

        let entries = drain(collector);
        assert_eq!(entries.len(), 6);
        for (i, (key, _)) in entries.iter().enumerate() {
            assert_eq!(key, format!("key_{:04}", i).as_bytes());
        }
    }

    #[test]
    fn test_final_partial_buffer_spills_on_finish() {
        let dir = TempDir::new().expect("temp dir");
        let args = small_buffer_args();
        let mut collector = Collector::new("test", dir.path(), &args);

        for i in 0..5u32 {
            let key = format!("key_{:04}", i);
            collector.collect(key.as_bytes(), b"12345678").expect("collect");
        }
        assert_eq!(collector.run_count(), 2);

        collector.finish().expect("finish");
        assert_eq!(collector.run_count(), 3);
        assert_eq!(drain(collector).len(), 5);
    }

    #[test]
    fn test_no_entries_lost_or_duplicated_across_runs() {
        let dir = TempDir::new().expect("temp dir");
        let args = small_buffer_args();
        let mut collector = Collector::new("test", dir.path(), &args);

        // Insert in reverse so every run still comes out sorted.
        let count = 100u32;
        for i in (0..count).rev() {
            let key = format!("{:05}", i);
            collector.collect(key.as_bytes(), b"v").expect("collect");
        }
        assert_eq!(collector.len(), u64::from(count));

        let entries = drain(collector);
        assert_eq!(entries.len(), count as usize);
        for (i, (key, _)) in entries.iter().enumerate() {
            assert_eq!(key, format!("{:05}", i).as_bytes());
        }
    }

    #[test]
    fn test_duplicate_keys_across_runs_resolve_to_latest() {
        let dir = TempDir::new().expect("temp dir");
        let args = small_buffer_args();
        let mut collector = Collector::new("test", dir.path(), &args);

        // Same key in three different runs plus filler to force spills.
        for round in 0..3u32 {
            let value = format!("round_{}", round);
            collector.collect(b"dup_key", value.as_bytes()).expect("collect");
            collector
                .collect(format!("fill_{}", round).as_bytes(), b"xxxxxxxxxxxxxxxx")
                .expect("collect");
        }
        collector.finish().expect("finish");
        assert!(collector.run_count() >= 2);

        let entries = drain(collector);
        let dup: Vec<_> = entries.iter().filter(|(k, _)| k == b"dup_key").collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].1, b"round_2");
    }

    #[test]
    fn test_final_run_beats_earlier_runs_on_equal_keys() {
        let dir = TempDir::new().expect("temp dir");
        let args = TransformArgs::default()
            .buffer_size(32)
            .buffer_type(BufferType::EntrySet);
        let mut collector = Collector::new("test", dir.path(), &args);

        collector.collect(b"k", b"spilled_value_x").expect("collect");
        assert_eq!(collector.run_count(), 1);
        collector.collect(b"k", b"final").expect("collect");
        collector.finish().expect("finish");
        // The remainder is spilled as the last, most recent run.
        assert_eq!(collector.run_count(), 2);

        let entries = drain(collector);
        assert_eq!(entries, vec![(b"k".to_vec(), b"final".to_vec())]);
    }

    #[test]
    fn test_collect_after_finish_fails() {
        let dir = TempDir::new().expect("temp dir");
        let args = TransformArgs::default();
        let mut collector = Collector::new("test", dir.path(), &args);

        collector.finish().expect("finish");
        assert!(matches!(
            collector.collect(b"a", b"1"),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_empty_collector_merges_to_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let args = TransformArgs::default();
        let collector = Collector::new("test", dir.path(), &args);

        assert!(collector.is_empty());
        assert!(drain(collector).is_empty());
    }

    #[test]
    fn test_spill_files_removed_on_drop() {
        let dir = TempDir::new().expect("temp dir");
        let args = small_buffer_args();
        let mut collector = Collector::new("test", dir.path(), &args);

        for i in 0..10u32 {
            let key = format!("key_{:04}", i);
            collector.collect(key.as_bytes(), b"12345678").expect("collect");
        }
        assert!(spill_files(&dir) > 0);

        drop(collector);
        assert_eq!(spill_files(&dir), 0);
    }

    #[test]
    fn test_spill_files_removed_after_merge_consumed() {
        let dir = TempDir::new().expect("temp dir");
        let args = small_buffer_args();
        let mut collector = Collector::new("test", dir.path(), &args);

        for i in 0..10u32 {
            let key = format!("key_{:04}", i);
            collector.collect(key.as_bytes(), b"12345678").expect("collect");
        }

        let merge = collector.into_merge().expect("merge");
        let entries: Result<Vec<_>> = merge.collect();
        assert_eq!(entries.expect("entries").len(), 10);
        assert_eq!(spill_files(&dir), 0);
    }
}
