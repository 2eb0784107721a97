use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

/// Where the per-chunk scratch files of one download live
///
/// Names are derived from the output file name and the chunk index only,
/// `<dir>/<output name>.chunk<index>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkLayout {
    dir: PathBuf,
    stem: String,
}

impl SinkLayout {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }
    /// Layout placing the scratch files next to `output`, or in `dir` if given
    pub fn for_output(output: &Path, dir: Option<&Path>) -> Self {
        let stem = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "multiget".to_string());
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => match output.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        Self { dir, stem }
    }
    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.chunk{}", self.stem, index))
    }
    pub fn sink(&self, index: usize) -> ChunkSink {
        ChunkSink::new(self.path(index))
    }
}

/// Write-only destination of one chunk's body
///
/// The file is truncated when opened and removed when the sink is dropped.
#[derive(Debug)]
pub struct ChunkSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: u64,
}

impl ChunkSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            written: 0,
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// Bytes written since the sink was opened
    pub fn written(&self) -> u64 {
        self.written
    }
    pub async fn open(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        self.writer = Some(BufWriter::new(file));
        self.written = 0;
        Ok(())
    }
    pub async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "sink is not open")
        })?;
        writer.write_all(buf).await?;
        self.written += buf.len() as u64;
        Ok(())
    }
    /// Flush and close the underlying file, a closed sink stays on disk until dropped
    pub async fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
        }
        Ok(())
    }
}

impl Drop for ChunkSink {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
