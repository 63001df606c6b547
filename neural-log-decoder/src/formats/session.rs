//! SD-card session folder reader
//!
//! A session is a directory of `data_<N>.bin` files written by the firmware
//! as the card fills. Files must be processed in ascending numeric-suffix
//! order, never directory-listing order: timestamp reconciliation depends on
//! the file sequence. Each file is a flat run of fixed-size records; a
//! trailing short read ends that file with a warning and the sequence
//! continues with the next one.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::record::{RawRecord, RecordLayout};
use crate::types::{DecodeError, Result};

/// Reads all records of one session directory, in file-sequence order
pub struct SessionReader {
    layout: RecordLayout,
    file_prefix: String,
}

impl SessionReader {
    pub fn new(layout: RecordLayout, file_prefix: impl Into<String>) -> Self {
        Self {
            layout,
            file_prefix: file_prefix.into(),
        }
    }

    /// List the session's binary files sorted by their numeric suffix.
    ///
    /// Only `<prefix><N>.bin` names participate; anything else in the folder
    /// is ignored. Returns `MissingInput` if the directory does not exist.
    pub fn discover_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(DecodeError::MissingInput(dir.to_path_buf()));
        }

        let mut numbered: Vec<(u64, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if let Some(index) = self.file_index(&path) {
                numbered.push((index, path));
            }
        }

        numbered.sort_by_key(|(index, _)| *index);
        Ok(numbered.into_iter().map(|(_, path)| path).collect())
    }

    /// Parse the numeric suffix out of `<prefix><N>.bin`, if the name matches
    fn file_index(&self, path: &Path) -> Option<u64> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".bin")?;
        let digits = stem.strip_prefix(self.file_prefix.as_str())?;
        digits.parse().ok()
    }

    /// Read every record of the session, across all files in sequence order.
    ///
    /// Mid-file corruption cannot be told apart from a truncated tail, so a
    /// short read is logged and ends that file; it never aborts the session.
    pub fn read_records(&self, dir: &Path) -> Result<Vec<RawRecord>> {
        let files = self.discover_files(dir)?;
        if files.is_empty() {
            log::warn!("no {}<N>.bin files in {:?}", self.file_prefix, dir);
        }

        let mut records = Vec::new();
        for path in &files {
            log::info!("processing {:?}", path);
            let before = records.len();
            self.read_file(path, &mut records)?;
            log::info!("read {} records from {:?}", records.len() - before, path);
        }
        Ok(records)
    }

    /// Read one binary file of fixed-size records until EOF
    fn read_file(&self, path: &Path, records: &mut Vec<RawRecord>) -> Result<()> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let record_bytes = self.layout.record_bytes();
        let mut buf = vec![0u8; record_bytes];

        loop {
            let got = read_up_to(&mut reader, &mut buf)?;
            if got == 0 {
                // Normal termination
                break;
            }
            if got != record_bytes {
                log::warn!(
                    "incomplete record at end of {:?}: expected {} bytes, got {}",
                    path,
                    record_bytes,
                    got
                );
                break;
            }
            records.push(RawRecord::from_bytes(self.layout, &buf)?);
        }
        Ok(())
    }
}

/// Fill `buf` from the reader, returning how many bytes were actually read.
///
/// Unlike `read_exact`, a short count at EOF is reported, not an error.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
