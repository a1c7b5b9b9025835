//! On-disk run files: each spill writes one sorted, immutable, read-once run.
//!
//! Layout: a fixed-size header `{magic, version, entry_count, checksum}`
//! followed by length-prefixed records (`u32` key length, key bytes, `u32`
//! value length, value bytes, big-endian). The header is written as a
//! placeholder when the file is created and patched on finalize, once the
//! entry count and the running checksum are known. Readers recompute the
//! checksum while streaming and compare it against the header at end of
//! stream, so a torn or corrupted spill surfaces as an error instead of a
//! silently truncated load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use crc::{Crc, CRC_32_ISCSI};
use tempfile::{NamedTempFile, TempPath};

use crate::error::{Error, Result};

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

const RUN_MAGIC: u32 = 0x52_55_4E_31; // ASCII "RUN1"
const RUN_VERSION: u16 = 1;
const HEADER_SIZE: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Header {
    magic: u32,
    version: u16,
    entry_count: u64,
    checksum: u32,
}

impl Header {
    fn new(entry_count: u64, checksum: u32) -> Self {
        Self {
            magic: RUN_MAGIC,
            version: RUN_VERSION,
            entry_count,
            checksum,
        }
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_u32::<BigEndian>(self.magic)
            .map_err(|e| Error::Encode("magic", e))?;
        writer
            .write_u16::<BigEndian>(self.version)
            .map_err(|e| Error::Encode("version", e))?;
        writer
            .write_u64::<BigEndian>(self.entry_count)
            .map_err(|e| Error::Encode("entry_count", e))?;
        writer
            .write_u32::<BigEndian>(self.checksum)
            .map_err(|e| Error::Encode("checksum", e))?;
        Ok(())
    }

    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("magic", e))?;
        let version = reader
            .read_u16::<BigEndian>()
            .map_err(|e| Error::Decode("version", e))?;
        let entry_count = reader
            .read_u64::<BigEndian>()
            .map_err(|e| Error::Decode("entry_count", e))?;
        let checksum = reader
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("checksum", e))?;

        if magic != RUN_MAGIC {
            return Err(Error::CorruptedRun(format!(
                "bad magic number: {:#x}",
                magic
            )));
        }
        if version != RUN_VERSION {
            return Err(Error::CorruptedRun(format!(
                "unsupported run version: {}",
                version
            )));
        }

        Ok(Self {
            magic,
            version,
            entry_count,
            checksum,
        })
    }
}

/// Appends sorted entries to a fresh temporary file in `dir`.
pub struct RunWriter {
    writer: BufWriter<File>,
    path: TempPath,
    digest: crc::Digest<'static, u32>,
    entry_count: u64,
    bytes: u64,
}

impl RunWriter {
    pub fn create(dir: &Path) -> Result<Self> {
        let temp = NamedTempFile::new_in(dir)?;
        let (file, path) = temp.into_parts();
        let mut writer = BufWriter::new(file);

        // Placeholder, patched with the real counts on finalize.
        Header::new(0, 0).encode(&mut writer)?;

        Ok(Self {
            writer,
            path,
            digest: CRC32.digest(),
            entry_count: 0,
            bytes: 0,
        })
    }

    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let key_len = (key.len() as u32).to_be_bytes();
        let value_len = (value.len() as u32).to_be_bytes();

        self.writer.write_all(&key_len)?;
        self.writer.write_all(key)?;
        self.writer.write_all(&value_len)?;
        self.writer.write_all(value)?;

        self.digest.update(&key_len);
        self.digest.update(key);
        self.digest.update(&value_len);
        self.digest.update(value);

        self.entry_count += 1;
        self.bytes += (8 + key.len() + value.len()) as u64;
        Ok(())
    }

    /// Flushes the records and patches the header, turning the file into an
    /// immutable run.
    pub fn finalize(mut self) -> Result<RunFile> {
        self.writer.flush()?;
        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;

        let checksum = self.digest.finalize();
        let mut header_bytes = Vec::with_capacity(HEADER_SIZE);
        Header::new(self.entry_count, checksum).encode(&mut header_bytes)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header_bytes)?;
        file.flush()?;

        Ok(RunFile {
            path: self.path,
            entry_count: self.entry_count,
            bytes: self.bytes,
        })
    }
}

/// Handle to one finalized run. Owns the temporary path: dropping the handle
/// (or the reader it turns into) deletes the file.
pub struct RunFile {
    path: TempPath,
    entry_count: u64,
    bytes: u64,
}

impl RunFile {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Record bytes written, excluding the header.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Opens the run for its single forward pass.
    pub fn into_reader(self) -> Result<RunReader> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        let header = Header::decode(&mut reader)?;

        Ok(RunReader {
            reader,
            _path: self.path,
            header,
            digest: Some(CRC32.digest()),
            seen: 0,
            done: false,
        })
    }
}

/// Forward-only, read-once iterator over a run's entries.
///
/// Yields `Err` on torn records and, at end of stream, when the entry count
/// or checksum disagrees with the header.
pub struct RunReader {
    reader: BufReader<File>,
    _path: TempPath,
    header: Header,
    digest: Option<crc::Digest<'static, u32>>,
    seen: u64,
    done: bool,
}

impl RunReader {
    fn read_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let mut key_len = [0u8; 4];
        match self.reader.read_exact(&mut key_len) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // EOF at a record boundary is the end of the run.
                return self.verify().map(|_| None);
            }
            Err(e) => return Err(Error::Io(e)),
        }

        let mut key = vec![0u8; u32::from_be_bytes(key_len) as usize];
        self.reader
            .read_exact(&mut key)
            .map_err(|_| Error::CorruptedRun("unexpected EOF while reading key".to_string()))?;

        let mut value_len = [0u8; 4];
        self.reader.read_exact(&mut value_len).map_err(|_| {
            Error::CorruptedRun("unexpected EOF while reading value length".to_string())
        })?;

        let mut value = vec![0u8; u32::from_be_bytes(value_len) as usize];
        self.reader
            .read_exact(&mut value)
            .map_err(|_| Error::CorruptedRun("unexpected EOF while reading value".to_string()))?;

        if let Some(digest) = self.digest.as_mut() {
            digest.update(&key_len);
            digest.update(&key);
            digest.update(&value_len);
            digest.update(&value);
        }

        self.seen += 1;
        Ok(Some((key, value)))
    }

    fn verify(&mut self) -> Result<()> {
        if self.seen != self.header.entry_count {
            return Err(Error::CorruptedRun(format!(
                "entry count mismatch: read = {}, header = {}",
                self.seen, self.header.entry_count
            )));
        }
        if let Some(digest) = self.digest.take() {
            let computed = digest.finalize();
            if computed != self.header.checksum {
                return Err(Error::CorruptedRun(format!(
                    "checksum mismatch: computed = {}, stored = {}",
                    computed, self.header.checksum
                )));
            }
        }
        Ok(())
    }
}

impl Iterator for RunReader {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
