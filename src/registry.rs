//! Line reader over the local registry file (rpc(5), `/etc/rpc` by default).

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::parse::MAX_LINE_LEN;

/// Default location of the registry.
pub const RPCDB: &str = "/etc/rpc";

/// An open registry file positioned somewhere between its first and last line.
#[derive(Debug)]
pub struct RegistryFile {
    path: PathBuf,
    reader: BufReader<File>,
}

impl RegistryFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = BufReader::new(File::open(&path)?);
        trace!("Opened registry {}", path.display());
        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the next line including its newline, or `None` at end of file.
    ///
    /// Lines longer than [`MAX_LINE_LEN`] are cut at that length and the rest
    /// of the physical line is skipped.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = (&mut self.reader).take(MAX_LINE_LEN as u64).read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(None);
        }
        if read == MAX_LINE_LEN && line.last() != Some(&b'\n') {
            let skipped = self.reader.skip_until(b'\n')?;
            trace!("Truncated registry line, dropped {} bytes", skipped);
        }
        Ok(Some(line))
    }

    /// Moves back to the first line without reopening the file.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.reader.rewind()
    }
}
