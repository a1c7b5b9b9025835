//! K-way merge over sorted entry sources.
//!
//! Sources are numbered in creation order; when several sources carry the
//! same key, only the entry from the most recently created source is emitted
//! and the older ones are skipped, matching the upsert semantics of the
//! destination. Within one source, a later insertion shadows earlier ones.

use crate::config::Comparator;
use crate::error::Result;
use std::{cmp::Ordering, collections::BinaryHeap};

/// Forward-only cursor over one sorted source (a run file or the final
/// in-memory buffer).
pub type EntryIter = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>>>;

struct HeapEntry {
    key: Vec<u8>,
    value: Vec<u8>,
    source: usize,
    cmp: Comparator,
    iter: EntryIter,
}

impl std::fmt::Debug for HeapEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        (self.cmp)(&self.key, &other.key) == Ordering::Equal && self.source == other.source
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Max-heap: smallest key pops first; between equal keys the highest
    // source index (the most recently created source) pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.cmp)(&self.key, &other.key) {
            Ordering::Equal => self.source.cmp(&other.source),
            other => other.reverse(),
        }
    }
}

#[derive(Debug)]
pub struct MergeIterator {
    heap: BinaryHeap<HeapEntry>,
    latest_key: Option<Vec<u8>>,
    cmp: Comparator,
}

impl MergeIterator {
    /// Builds a merge over `sources`, given in creation order (oldest first).
    pub fn new(sources: Vec<EntryIter>, cmp: Comparator) -> Result<Self> {
        let mut heap = BinaryHeap::new();

        for (source, mut iter) in sources.into_iter().enumerate() {
            match iter.next() {
                Some(Ok((key, value))) => heap.push(HeapEntry {
                    key,
                    value,
                    source,
                    cmp,
                    iter,
                }),
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }

        Ok(Self {
            heap,
            latest_key: None,
            cmp,
        })
    }
}

impl Iterator for MergeIterator {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(entry) = self.heap.pop() {
            let HeapEntry {
                key,
                mut value,
                source,
                cmp,
                mut iter,
            } = entry;

            // A key we already emitted from a more recent source: skip it and
            // keep the source in play.
            let already_emitted = match &self.latest_key {
                Some(latest) => (self.cmp)(latest, &key) == Ordering::Equal,
                None => false,
            };
            if already_emitted {
                match iter.next() {
                    Some(Ok((k, v))) => self.heap.push(HeapEntry {
                        key: k,
                        value: v,
                        source,
                        cmp,
                        iter,
                    }),
                    Some(Err(e)) => return Some(Err(e)),
                    None => {}
                }
                continue;
            }

            // Within one source equal keys are adjacent; the last one was
            // inserted last and wins.
            loop {
                match iter.next() {
                    Some(Ok((k, v))) => {
                        if (self.cmp)(&k, &key) == Ordering::Equal {
                            value = v;
                        } else {
                            self.heap.push(HeapEntry {
                                key: k,
                                value: v,
                                source,
                                cmp,
                                iter,
                            });
                            break;
                        }
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => break,
                }
            }

            self.latest_key = Some(key.clone());
            return Some(Ok((key, value)));
        }

        None
    }
}
