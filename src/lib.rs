//! Chunked HTTP downloads over plain TCP
//!
//! Splits a file of known size into byte ranges, fetches each range with its own
//! HTTP/1.1 `GET` and concatenates the pieces in order into one output file.
//! Fetchers run one after the other or concurrently on a shared runtime.
//!
//! The crate exposes debug logs through the [`tracing`][tracing] crate
//!
//! ## Feature flags
//!
//! - `progress`: Enables progress reporting using `indicatif`
//!
//! ## Crate usage
//!
//! # Example
//!
//! ```no_run
//! use multiget::{DownloadConfig, Downloader, Target};
//! fn main() -> Result<(), multiget::Error> {
//!     let config = DownloadConfig::builder()
//!         .target(Target::parse("http://example.com/file.bin")?)
//!         .total_bytes(4 * 1024 * 1024)
//!         .chunk_size(1024 * 1024)
//!         .chunk_count(4)
//!         .parallel(true)
//!         .workers(4usize)
//!         .output("file.bin")
//!         .build()?;
//!     let report = Downloader::new(config).download()?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

mod chunk;
mod downloader;
mod error;
pub mod fetcher;
mod hash;
mod reassemble;
pub mod scheduler;
mod sink;
mod target;

pub use chunk::{plan, ByteRange, ChunkSpec, Chunks};
pub use downloader::{
    DownloadConfig, DownloadConfigBuilder, DownloadConfigBuilderError, Downloader, Report,
    DEFAULT_OUTPUT,
};
pub use error::{Error, Result};
pub use fetcher::{FetchState, Phase, RangeFetcher, StatusLine};
pub use hash::Hash;
#[cfg(feature = "progress")]
pub use indicatif::ProgressStyle;
pub use reassemble::reassemble;
pub use scheduler::{Batch, Concurrency, DownloadOutcome, Scheduler};
pub use sink::{ChunkSink, SinkLayout};
pub use target::{Target, HTTP_SERVICE};
