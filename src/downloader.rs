use crate::chunk::{ChunkSpec, Chunks};
use crate::reassemble::reassemble;
use crate::scheduler::{Concurrency, DownloadOutcome, Scheduler};
use crate::sink::SinkLayout;
use crate::{Error, Hash, Result, Target};
use derive_builder::Builder;
#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, instrument};

/// Output file used when none is given
pub const DEFAULT_OUTPUT: &str = "multiget.out";

#[cfg(feature = "progress")]
const BAR_TEMPLATE: &str = "{spinner:.green} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})";

/// Everything a download needs, validated when the plan is computed
///
/// # Example
///
/// ```
/// use multiget::{DownloadConfig, Target};
/// # fn main() -> Result<(), multiget::Error> {
/// let config = DownloadConfig::builder()
///     .target(Target::parse("http://example.com/file.bin")?)
///     .total_bytes(4 * 1024 * 1024)
///     .chunk_size(1024 * 1024)
///     .chunk_count(4)
///     .parallel(true)
///     .workers(4usize)
///     .build()?;
/// assert_eq!(config.output.to_str(), Some("multiget.out"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Builder)]
pub struct DownloadConfig {
    #[builder(setter(into))]
    pub target: Target,
    pub total_bytes: u64,
    pub chunk_size: u64,
    pub chunk_count: u64,
    #[builder(default)]
    pub parallel: bool,
    #[builder(default = "1")]
    pub workers: usize,
    #[builder(default = "PathBuf::from(DEFAULT_OUTPUT)", setter(into))]
    pub output: PathBuf,
    /// Directory for the per-chunk files, the output's directory if unset
    #[builder(default, setter(into, strip_option))]
    pub scratch_dir: Option<PathBuf>,
    #[builder(default, setter(strip_option))]
    pub hash: Option<Hash>,
}

impl DownloadConfig {
    pub fn builder() -> DownloadConfigBuilder {
        DownloadConfigBuilder::default()
    }
    pub fn concurrency(&self) -> Concurrency {
        Concurrency {
            parallel: self.parallel,
            workers: self.workers,
        }
    }
}

impl From<DownloadConfigBuilderError> for Error {
    fn from(e: DownloadConfigBuilderError) -> Self {
        Self::Config(e.to_string())
    }
}

/// What the download produced, compared against what was asked for
#[derive(Debug, Clone)]
pub struct Report {
    pub target: Target,
    pub output: PathBuf,
    pub outcome: DownloadOutcome,
    pub bytes_written: u64,
    pub final_size: u64,
    pub expected: u64,
    /// `None` when no checksum was configured
    pub checksum: Option<bool>,
}

impl Report {
    pub fn size_matches(&self) -> bool {
        self.final_size == self.expected
    }
    pub fn is_complete(&self) -> bool {
        self.size_matches() && self.checksum != Some(false)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.size_matches() {
            write!(
                f,
                "Finished downloading {} - to file {}",
                self.target,
                self.output.display()
            )?;
        } else {
            write!(
                f,
                "Size mismatch: expected: {}, actual: {}",
                self.expected, self.final_size
            )?;
        }
        if self.checksum == Some(false) {
            write!(f, " (checksum mismatch)")?;
        }
        Ok(())
    }
}

/// Fetches one file in chunks and reassembles it on disk
#[derive(Debug)]
pub struct Downloader {
    config: DownloadConfig,
    #[cfg(feature = "progress")]
    pb: Option<ProgressBar>,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> Self {
        Self {
            config,
            #[cfg(feature = "progress")]
            pb: None,
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Enable progress reporting
    #[cfg(feature = "progress")]
    pub fn progress_bar(&mut self) -> &mut Self {
        let pb = ProgressBar::new(self.config.total_bytes);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            pb.set_style(style.progress_chars("#>-"));
        }
        self.pb = Some(pb);
        self
    }

    /// Set the progress bar style
    #[cfg(feature = "progress")]
    pub fn bar_style(&self, style: ProgressStyle) {
        if let Some(pb) = &self.pb {
            pb.set_style(style);
        }
    }

    /// The chunks this download will request
    pub fn plan(&self) -> Result<Vec<ChunkSpec>> {
        let DownloadConfig {
            total_bytes,
            chunk_size,
            chunk_count,
            ..
        } = self.config;
        let chunks = Chunks::new(total_bytes, chunk_size, chunk_count)?;
        info!(
            "Getting a total of {} in {} chunks, of size {} with a remainder of {}",
            total_bytes,
            chunk_count,
            chunk_size,
            i128::from(total_bytes) - i128::from(chunk_size) * i128::from(chunk_count)
        );
        info!("Chunk size: {}, num_chunks: {}", chunk_size, chunks.len());
        Ok(chunks.collect())
    }

    /// Fetch every chunk, reassemble them and compare the result
    ///
    /// Chunk failures never surface as an error, they show in the [`Report`].
    /// Builds its own runtime, so it must not be called from async code.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use multiget::{DownloadConfig, Downloader, Target};
    /// # fn main() -> Result<(), multiget::Error> {
    /// let config = DownloadConfig::builder()
    ///     .target(Target::parse("http://example.com/file.bin")?)
    ///     .total_bytes(10)
    ///     .chunk_size(4)
    ///     .chunk_count(2)
    ///     .build()?;
    /// let report = Downloader::new(config).download()?;
    /// println!("{}", report);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(url = %self.config.target, output = %self.config.output.display()))]
    pub fn download(&self) -> Result<Report> {
        let specs = self.plan()?;
        #[allow(unused_mut)]
        let mut scheduler = Scheduler::new(self.config.concurrency())?;
        #[cfg(feature = "progress")]
        if let Some(pb) = &self.pb {
            scheduler.progress_bar(pb.clone());
        }
        let layout =
            SinkLayout::for_output(&self.config.output, self.config.scratch_dir.as_deref());
        let batch = scheduler.run(&self.config.target, specs, &layout);
        let outcome = batch.outcome;
        let bytes_written = scheduler.block_on(reassemble(batch.states, &self.config.output))?;
        #[cfg(feature = "progress")]
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
        let final_size = std::fs::metadata(&self.config.output)
            .map(|m| m.len())
            .unwrap_or(0);
        let checksum = self.config.hash.as_ref().map(|hash| {
            match scheduler.block_on(hash.verify_file(&self.config.output)) {
                Ok(()) => true,
                Err(e) => {
                    error!("Checksum verification failed: {}", e);
                    false
                }
            }
        });
        Ok(Report {
            target: self.config.target.clone(),
            output: self.config.output.clone(),
            outcome,
            bytes_written,
            final_size,
            expected: self.config.total_bytes,
            checksum,
        })
    }
}
