//! File-backed message queue.
//!
//! A queue is a directory holding one append-only journal. Each payload is
//! stored as a little-endian `u32` length followed by the payload bytes.
//! Readers stream the journal and visit payloads in append order as slices
//! borrowed from a reused buffer that is only valid during the visit.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;

/// Journal file name inside the queue directory
pub const JOURNAL_FILE: &str = "messages.journal";

const FRAME_HEADER: usize = 4;

/// Append-only destination for encoded messages
pub trait MessageSink {
    /// Store one payload
    fn append(&mut self, payload: &[u8]) -> Result<(), Error>;
}

impl MessageSink for Vec<Vec<u8>> {
    fn append(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.push(payload.to_vec());
        Ok(())
    }
}

/// A persisted queue rooted at a directory
///
/// # Example
///
/// ```rust,no_run
/// use fix_flyweight::queue::{MessageQueue, MessageSink};
///
/// # fn example() -> fix_flyweight::Result<()> {
/// let queue = MessageQueue::open("/tmp/fix-queue")?;
/// let mut writer = queue.writer()?;
/// writer.append(b"8=FIX.4.4\x01")?;
/// writer.flush()?;
///
/// queue.for_each(|payload| println!("{} bytes", payload.len()))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MessageQueue {
    dir: PathBuf,
    journal: PathBuf,
}

impl MessageQueue {
    /// Open (creating if needed) the queue in `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let journal = dir.join(JOURNAL_FILE);
        OpenOptions::new().create(true).append(true).open(&journal)?;
        debug!(path = %journal.display(), "queue opened");
        Ok(Self { dir, journal })
    }

    /// Queue directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Journal file path
    pub fn journal_path(&self) -> &Path {
        &self.journal
    }

    /// Open an appender positioned at the end of the journal
    pub fn writer(&self) -> Result<QueueWriter, Error> {
        let file = OpenOptions::new().append(true).open(&self.journal)?;
        Ok(QueueWriter {
            inner: BufWriter::new(file),
            appended: 0,
        })
    }

    /// Visit every stored payload in append order.
    ///
    /// Frames are streamed from the journal into one reused buffer, so
    /// memory stays bounded by the largest payload. Returns the number of
    /// payloads visited. A partial trailing frame is reported as
    /// [`Error::QueueCorrupt`] after every complete frame before it has been
    /// visited.
    pub fn for_each<F>(&self, mut visit: F) -> Result<u64, Error>
    where
        F: FnMut(&[u8]),
    {
        let mut reader = BufReader::new(File::open(&self.journal)?);
        let mut payload = Vec::new();
        let mut offset = 0u64;
        let mut visited = 0u64;

        loop {
            let mut header = [0u8; FRAME_HEADER];
            match read_full(&mut reader, &mut header)? {
                0 => break,
                FRAME_HEADER => {}
                _ => return Err(Error::QueueCorrupt { offset }),
            }
            let len = u64::from(u32::from_le_bytes(header));

            // `take` bounds the read, so a corrupt length never preallocates.
            payload.clear();
            (&mut reader).take(len).read_to_end(&mut payload)?;
            if payload.len() as u64 != len {
                return Err(Error::QueueCorrupt { offset });
            }

            visit(&payload);
            visited += 1;
            offset += FRAME_HEADER as u64 + len;
        }
        Ok(visited)
    }

    /// Owned copies of every payload
    pub fn read_all(&self) -> Result<Vec<Vec<u8>>, Error> {
        let mut out = Vec::new();
        self.for_each(|payload| out.push(payload.to_vec()))?;
        Ok(out)
    }

    /// Number of stored payloads
    pub fn len(&self) -> Result<u64, Error> {
        self.for_each(|_| {})
    }

    /// True if the journal holds no payloads
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(fs::metadata(&self.journal)?.len() == 0)
    }
}

/// Buffered appender for a [`MessageQueue`]. Flushed on drop.
#[derive(Debug)]
pub struct QueueWriter {
    inner: BufWriter<File>,
    appended: u64,
}

impl QueueWriter {
    /// Append one payload
    pub fn append(&mut self, payload: &[u8]) -> Result<(), Error> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            std::io::Error::new(
                ErrorKind::InvalidInput,
                "payload larger than u32::MAX bytes",
            )
        })?;
        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(payload)?;
        self.appended += 1;
        Ok(())
    }

    /// Push buffered frames to the file
    pub fn flush(&mut self) -> Result<(), Error> {
        self.inner.flush()?;
        Ok(())
    }

    /// Payloads appended through this writer
    pub fn appended(&self) -> u64 {
        self.appended
    }
}

/// Read until `buf` is full or the reader is exhausted; returns bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

impl MessageSink for QueueWriter {
    fn append(&mut self, payload: &[u8]) -> Result<(), Error> {
        QueueWriter::append(self, payload)
    }
}
