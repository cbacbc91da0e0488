//! Output sinks for emitted snapshots.
//!
//! A sink is append-only and block oriented: each call to
//! [`OutputSink::println`] writes one complete, already formatted block and a
//! trailing newline. Blocks from concurrent probes never interleave.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Stderr, Stdout, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Destination for probe output.
pub trait OutputSink: Send + Sync {
    /// Append `text` followed by a newline.
    fn println(&self, text: &str) -> io::Result<()>;

    /// Like `println`, but a failed write is logged instead of returned.
    /// The probe never lets sink trouble reach the wrapped call.
    fn emit(&self, text: &str) {
        if let Err(err) = self.println(text) {
            warn!(error = %err, "failed to write probe output");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sink over any writer, serialized by a mutex.
pub struct StreamSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> OutputSink for StreamSink<W> {
    fn println(&self, text: &str) -> io::Result<()> {
        let mut writer = lock(&self.writer);
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// In-memory sink; keeps every emitted block.
#[derive(Debug, Default)]
pub struct MemorySink {
    blocks: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> Vec<String> {
        lock(&self.blocks).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.blocks).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.blocks).is_empty()
    }

    /// Everything written, as a stream would have received it.
    pub fn contents(&self) -> String {
        lock(&self.blocks)
            .iter()
            .map(|block| format!("{block}\n"))
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn println(&self, text: &str) -> io::Result<()> {
        lock(&self.blocks).push(text.to_string());
        Ok(())
    }
}

/// Where the probe writes, as chosen by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TargetStream {
    Stdout,
    #[default]
    Stderr,
    /// Appended to; created if missing.
    File(PathBuf),
}

impl TargetStream {
    pub fn open(&self) -> io::Result<Arc<dyn OutputSink>> {
        let sink: Arc<dyn OutputSink> = match self {
            TargetStream::Stdout => Arc::new(StreamSink::<Stdout>::new(io::stdout())),
            TargetStream::Stderr => Arc::new(StreamSink::<Stderr>::new(io::stderr())),
            TargetStream::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Arc::new(StreamSink::<BufWriter<File>>::new(BufWriter::new(file)))
            }
        };
        Ok(sink)
    }
}

impl FromStr for TargetStream {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "stdout" | "-" => TargetStream::Stdout,
            "stderr" => TargetStream::Stderr,
            path => TargetStream::File(PathBuf::from(path)),
        })
    }
}

impl fmt::Display for TargetStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStream::Stdout => f.write_str("stdout"),
            TargetStream::Stderr => f.write_str("stderr"),
            TargetStream::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stream_sink_appends_newline() {
        let sink = StreamSink::new(Vec::new());
        sink.println("one").unwrap();
        sink.println("two\nlines").unwrap();
        assert_eq!(sink.into_inner(), b"one\ntwo\nlines\n");
    }

    #[test]
    fn test_emit_swallows_write_errors() {
        let sink = StreamSink::new(Broken);
        assert!(sink.println("x").is_err());
        sink.emit("x");
    }

    #[test]
    fn test_memory_sink_contents() {
        let sink = MemorySink::new();
        sink.emit("a");
        sink.emit("b");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.contents(), "a\nb\n");
    }

    #[test]
    fn test_target_stream_parse() {
        assert_eq!("stdout".parse::<TargetStream>().unwrap(), TargetStream::Stdout);
        assert_eq!("stderr".parse::<TargetStream>().unwrap(), TargetStream::Stderr);
        assert_eq!(
            "/tmp/probe.log".parse::<TargetStream>().unwrap(),
            TargetStream::File(PathBuf::from("/tmp/probe.log"))
        );
    }

    #[test]
    fn test_file_target_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.log");
        std::fs::write(&path, "existing\n").unwrap();

        let sink = TargetStream::File(path.clone()).open().unwrap();
        sink.println("snapshot").unwrap();
        drop(sink);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\nsnapshot\n");
    }
}
