use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use multiget::{DownloadConfig, Error, Hash, Target, DEFAULT_OUTPUT};
use std::path::PathBuf;

const MIB: u64 = 1024 * 1024;

/// Download a file over HTTP in several ranged requests
#[derive(Debug, Parser)]
#[command(name = "multiget", version, about)]
pub(crate) struct App {
    /// Url of the file, http only
    pub(crate) url: String,
    /// Write the download to this file
    #[arg(short = 'o', long = "outputfile", default_value = DEFAULT_OUTPUT)]
    pub(crate) output: PathBuf,
    /// Fetch all chunks concurrently
    #[arg(short, long)]
    pub(crate) parallel: bool,
    /// Worker threads used in parallel mode
    #[arg(short, long, default_value_t = 1)]
    pub(crate) threads: usize,
    /// Size of each chunk in bytes
    #[arg(short, long, default_value_t = MIB)]
    pub(crate) size: u64,
    /// Number of chunks
    #[arg(short, long, default_value_t = 4)]
    pub(crate) chunks: u64,
    /// Total bytes to fetch, overrides --size
    #[arg(short, long)]
    pub(crate) bytes: Option<u64>,
    /// Expected SHA256 sum of the whole file
    #[arg(long)]
    pub(crate) sha256: Option<String>,
    /// Don't draw a progress bar
    #[arg(long)]
    pub(crate) no_progress: bool,
    #[command(flatten)]
    pub(crate) verbose: Verbosity<InfoLevel>,
}

impl App {
    pub(crate) fn new() -> Self {
        Self::parse()
    }
    pub(crate) fn init_logging(&self) {
        pretty_env_logger::formatted_builder()
            .filter_level(self.verbose.log_level_filter())
            .init()
    }

    /// Chunk size and total bytes, `--bytes` wins over `--size`
    pub(crate) fn sizes(&self) -> multiget::Result<(u64, u64)> {
        if self.chunks == 0 {
            return Err(Error::Config("\"chunks\" cannot be set to 0".to_string()));
        }
        match self.bytes {
            Some(0) => Err(Error::Config("\"bytes\" cannot be set to 0".to_string())),
            Some(bytes) => Ok((bytes / self.chunks, bytes)),
            None if self.size == 0 => {
                Err(Error::Config("\"size\" cannot be set to 0".to_string()))
            }
            None => self
                .size
                .checked_mul(self.chunks)
                .map(|bytes| (self.size, bytes))
                .ok_or_else(|| Error::Config("--size * --chunks overflows".to_string())),
        }
    }

    pub(crate) fn to_config(&self) -> multiget::Result<DownloadConfig> {
        let (chunk_size, total_bytes) = self.sizes()?;
        let mut builder = DownloadConfig::builder();
        builder
            .target(Target::parse(&self.url)?)
            .total_bytes(total_bytes)
            .chunk_size(chunk_size)
            .chunk_count(self.chunks)
            .parallel(self.parallel)
            .workers(self.threads)
            .output(self.output.clone());
        if let Some(sum) = &self.sha256 {
            builder.hash(Hash::new_sha256(sum.as_str()));
        }
        Ok(builder.build()?)
    }
}
