use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::Result;

/// Buffered input over a file or stdin ("-"), with a size hint for
/// progress reporting where one is knowable.
pub struct InputReader {
    reader: Box<dyn Read>,
    len: Option<u64>,
}

impl InputReader {
    /// Create a new InputReader from a path.
    /// Use "-" for stdin pipe input.
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();
        if path.to_string_lossy() == "-" {
            return Ok(Self {
                reader: Box::new(io::stdin().lock()),
                len: None,
            });
        }

        let file = File::open(path)?;
        let len = file.metadata().ok().map(|m| m.len());
        Ok(Self {
            reader: Box::new(BufReader::new(file)),
            len,
        })
    }

    /// Total input size in bytes, when known (regular files only).
    pub fn len(&self) -> Option<u64> {
        self.len
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
