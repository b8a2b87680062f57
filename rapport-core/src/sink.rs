//! ## rapport-core::sink
//! **Concrete writable destinations attached to a channel**
//!
//! A [`Sink`] wraps one owned-or-borrowed text target together with the
//! identity used to detect duplicates and to find it again for removal.
//! Shared handles are identified by pointer, files by their absolute path.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::ReportError;

/// Shared text writer (`String`, custom buffers, ...).
pub type SharedText = Arc<Mutex<dyn fmt::Write + Send>>;

/// Shared byte stream (sockets, pipes, `Vec<u8>`, ...).
pub type SharedStream = Arc<Mutex<dyn io::Write + Send>>;

/// External trace facility. The reporting core writes lines into it but does
/// not manage its lifecycle.
pub trait TraceSink: Send + Sync {
    fn write_line(&self, line: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Where a sink writes to.
#[derive(Clone)]
pub enum SinkTarget {
    Text(SharedText),
    Stream(SharedStream),
    File { path: PathBuf, append: bool },
    Stdout,
    Stderr,
    Trace(Arc<dyn TraceSink>),
}

impl SinkTarget {
    pub fn text<W: fmt::Write + Send + 'static>(writer: Arc<Mutex<W>>) -> Self {
        SinkTarget::Text(writer)
    }

    pub fn stream<W: io::Write + Send + 'static>(stream: Arc<Mutex<W>>) -> Self {
        SinkTarget::Stream(stream)
    }

    pub fn file(path: impl Into<PathBuf>, append: bool) -> Self {
        SinkTarget::File {
            path: path.into(),
            append,
        }
    }

    pub fn trace<T: TraceSink + 'static>(sink: Arc<T>) -> Self {
        SinkTarget::Trace(sink)
    }

    /// Identity the resulting sink will carry, computed without opening anything.
    pub fn identity(&self) -> SinkIdentity {
        match self {
            SinkTarget::Text(w) => SinkIdentity::Writer(Arc::as_ptr(w) as *const () as usize),
            SinkTarget::Stream(s) => SinkIdentity::Stream(Arc::as_ptr(s) as *const () as usize),
            SinkTarget::File { path, .. } => SinkIdentity::Path(absolute_path(path)),
            SinkTarget::Stdout => SinkIdentity::Stdout,
            SinkTarget::Stderr => SinkIdentity::Stderr,
            SinkTarget::Trace(t) => SinkIdentity::Trace(Arc::as_ptr(t) as *const () as usize),
        }
    }

    /// Files are owned by the sink that opened them; shared handles are borrowed.
    pub fn owned_by_default(&self) -> bool {
        matches!(self, SinkTarget::File { .. })
    }
}

impl fmt::Debug for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SinkTarget({})", self.identity())
    }
}

/// Origin of a sink, used for duplicate detection and removal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SinkIdentity {
    Writer(usize),
    Stream(usize),
    Path(PathBuf),
    Stdout,
    Stderr,
    Trace(usize),
}

impl fmt::Display for SinkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkIdentity::Writer(addr) => write!(f, "writer@{addr:#x}"),
            SinkIdentity::Stream(addr) => write!(f, "stream@{addr:#x}"),
            SinkIdentity::Path(path) => write!(f, "file:{}", path.display()),
            SinkIdentity::Stdout => f.write_str("stdout"),
            SinkIdentity::Stderr => f.write_str("stderr"),
            SinkIdentity::Trace(addr) => write!(f, "trace@{addr:#x}"),
        }
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

enum SinkWriter {
    Text(SharedText),
    Stream(SharedStream),
    File(LineWriter<File>),
    Stdout,
    Stderr,
    Trace(Arc<dyn TraceSink>),
}

impl SinkWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            SinkWriter::Text(w) => {
                let mut w = w.lock();
                w.write_str(line)
                    .and_then(|_| w.write_char('\n'))
                    .map_err(|_| io::Error::other("text writer refused output"))
            }
            SinkWriter::Stream(s) => writeln!(s.lock(), "{line}"),
            SinkWriter::File(file) => writeln!(file, "{line}"),
            SinkWriter::Stdout => writeln!(io::stdout().lock(), "{line}"),
            SinkWriter::Stderr => writeln!(io::stderr().lock(), "{line}"),
            SinkWriter::Trace(t) => t.write_line(line),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SinkWriter::Text(_) => Ok(()),
            SinkWriter::Stream(s) => s.lock().flush(),
            SinkWriter::File(file) => file.flush(),
            SinkWriter::Stdout => io::stdout().flush(),
            SinkWriter::Stderr => io::stderr().flush(),
            SinkWriter::Trace(t) => t.flush(),
        }
    }
}

/// One attached destination.
pub struct Sink {
    writer: Option<SinkWriter>,
    owns: bool,
    identity: SinkIdentity,
}

impl Sink {
    /// Opens `target` and, when `intro` is given, writes it as a banner block.
    ///
    /// File targets are created, or truncated unless `append` is set. A failure
    /// leaves nothing attached.
    pub fn attach(
        target: SinkTarget,
        owns: bool,
        intro: Option<&str>,
    ) -> Result<Sink, ReportError> {
        let identity = target.identity();
        let writer = match target {
            SinkTarget::Text(w) => SinkWriter::Text(w),
            SinkTarget::Stream(s) => SinkWriter::Stream(s),
            SinkTarget::File { path, append } => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(append)
                    .truncate(!append)
                    .open(&path)
                    .map_err(|source| ReportError::SinkOpen { path, source })?;
                SinkWriter::File(LineWriter::new(file))
            }
            SinkTarget::Stdout => SinkWriter::Stdout,
            SinkTarget::Stderr => SinkWriter::Stderr,
            SinkTarget::Trace(t) => SinkWriter::Trace(t),
        };
        let mut sink = Sink {
            writer: Some(writer),
            owns,
            identity,
        };
        if let Some(intro) = intro {
            sink.write(intro)?;
        }
        debug!(sink = %sink.identity, owns, "sink attached");
        Ok(sink)
    }

    pub fn identity(&self) -> &SinkIdentity {
        &self.identity
    }

    pub fn owns(&self) -> bool {
        self.owns
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Writes `line` followed by a line break.
    pub fn write(&mut self, line: &str) -> Result<(), ReportError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ReportError::SinkClosed(self.identity.clone()))?;
        writer
            .write_line(line)
            .map_err(|source| ReportError::SinkWrite {
                identity: self.identity.clone(),
                source,
            })
    }

    pub fn flush(&mut self) -> Result<(), ReportError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ReportError::SinkClosed(self.identity.clone()))?;
        writer.flush().map_err(|source| ReportError::SinkFlush {
            identity: self.identity.clone(),
            source,
        })
    }

    /// Releases the target. Owned targets are flushed first; borrowed ones are
    /// only forgotten. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), ReportError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        debug!(sink = %self.identity, owns = self.owns, "sink closed");
        if self.owns {
            writer.flush().map_err(|source| ReportError::SinkFlush {
                identity: self.identity.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("identity", &self.identity)
            .field("owns", &self.owns)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stream whose every write fails.
    pub struct BrokenStream;

    impl io::Write for BrokenStream {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    pub fn text_buffer() -> Arc<Mutex<String>> {
        Arc::new(Mutex::new(String::new()))
    }

    pub fn broken_stream() -> Arc<Mutex<BrokenStream>> {
        Arc::new(Mutex::new(BrokenStream))
    }

    /// Stream counting flush calls.
    #[derive(Default)]
    pub struct FlushCounter {
        pub bytes: Vec<u8>,
        pub flushes: Arc<AtomicUsize>,
    }

    impl io::Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Trace sink collecting lines in memory.
    #[derive(Default)]
    pub struct CollectingTrace {
        pub lines: Mutex<Vec<String>>,
    }

    impl TraceSink for CollectingTrace {
        fn write_line(&self, line: &str) -> io::Result<()> {
            self.lines.lock().push(line.to_string());
            Ok(())
        }
    }
}
