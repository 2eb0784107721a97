//! Drives every [`RangeFetcher`] of a download on one shared runtime
//!
//! The runtime is the reactor all sockets are registered with. A current-thread
//! runtime serves serial mode and single-worker parallel mode, a multi-thread
//! runtime with exactly `workers` threads serves the rest. Tokio polls a spawned
//! task from one worker at a time, so the state a fetcher owns is never touched
//! by two workers at once even though any worker may pick up its readiness.

use crate::chunk::ChunkSpec;
use crate::fetcher::{FetchState, RangeFetcher};
use crate::sink::SinkLayout;
use crate::{Result, Target};
use futures::future::join_all;
#[cfg(feature = "progress")]
use indicatif::ProgressBar;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info, instrument};

/// How the fetchers of a download are run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concurrency {
    pub parallel: bool,
    pub workers: usize,
}

impl Concurrency {
    /// One fetcher at a time, each runs to completion before the next starts
    pub fn serial() -> Self {
        Self {
            parallel: false,
            workers: 1,
        }
    }
    /// All fetchers at once, driven by `workers` threads (at least one)
    pub fn parallel(workers: usize) -> Self {
        Self {
            parallel: true,
            workers,
        }
    }
    fn multi_threaded(&self) -> bool {
        self.parallel && self.workers > 1
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::serial()
    }
}

/// Aggregate over the terminal states of a download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub total_bytes_written: u64,
}

impl DownloadOutcome {
    pub fn tally(states: &[FetchState]) -> Self {
        states.iter().fold(Self::default(), |mut acc, state| {
            if state.is_complete() {
                acc.succeeded += 1;
            } else {
                acc.failed += 1;
            }
            acc.total_bytes_written += state.bytes_written();
            acc
        })
    }
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Terminal states in chunk index order, with their tally
#[derive(Debug)]
pub struct Batch {
    pub states: Vec<FetchState>,
    pub outcome: DownloadOutcome,
}

#[derive(Debug)]
pub struct Scheduler {
    runtime: Runtime,
    concurrency: Concurrency,
    #[cfg(feature = "progress")]
    progress: Option<ProgressBar>,
}

impl Scheduler {
    /// Build the runtime matching `concurrency`
    pub fn new(concurrency: Concurrency) -> Result<Self> {
        let runtime = if concurrency.multi_threaded() {
            info!(
                "Creating {} threads to perform the download",
                concurrency.workers
            );
            Builder::new_multi_thread()
                .worker_threads(concurrency.workers)
                .thread_name("multiget-worker")
                .enable_all()
                .build()?
        } else {
            Builder::new_current_thread().enable_all().build()?
        };
        Ok(Self {
            runtime,
            concurrency,
            #[cfg(feature = "progress")]
            progress: None,
        })
    }

    /// Advance `pb` with every body byte received by any fetcher
    #[cfg(feature = "progress")]
    pub fn progress_bar(&mut self, pb: ProgressBar) {
        self.progress = Some(pb);
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Run a future on the scheduler's runtime, must not be called from async code
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Fetch every chunk of `target` and wait until all of them are terminal
    ///
    /// Failures stay with their chunk, this never stops early.
    #[instrument(skip(self, target, specs, layout), fields(url = %target, chunks = specs.len(), parallel = self.concurrency.parallel))]
    pub fn run(&self, target: &Target, specs: Vec<ChunkSpec>, layout: &SinkLayout) -> Batch {
        let target = Arc::new(target.clone());
        let mut states = if self.concurrency.parallel {
            self.run_parallel(&target, specs, layout)
        } else {
            self.run_serial(&target, specs, layout)
        };
        states.sort_by_key(FetchState::index);
        let outcome = DownloadOutcome::tally(&states);
        info!(
            "{} chunks done, {} failed, {} bytes received",
            outcome.succeeded, outcome.failed, outcome.total_bytes_written
        );
        Batch { states, outcome }
    }

    fn fetcher(&self, target: &Arc<Target>, spec: ChunkSpec, layout: &SinkLayout) -> RangeFetcher {
        let fetcher = RangeFetcher::new(Arc::clone(target), spec, layout.sink(spec.index));
        #[cfg(feature = "progress")]
        let fetcher = match &self.progress {
            Some(pb) => fetcher.with_progress(pb.clone()),
            None => fetcher,
        };
        fetcher
    }

    fn run_serial(
        &self,
        target: &Arc<Target>,
        specs: Vec<ChunkSpec>,
        layout: &SinkLayout,
    ) -> Vec<FetchState> {
        specs
            .into_iter()
            .map(|spec| {
                let fetcher = self.fetcher(target, spec, layout);
                self.runtime.block_on(fetcher.run())
            })
            .collect()
    }

    fn run_parallel(
        &self,
        target: &Arc<Target>,
        specs: Vec<ChunkSpec>,
        layout: &SinkLayout,
    ) -> Vec<FetchState> {
        let fetchers = specs
            .into_iter()
            .map(|spec| self.fetcher(target, spec, layout))
            .collect::<Vec<_>>();
        if !self.concurrency.multi_threaded() {
            debug!("Running {} fetchers on the current thread", fetchers.len());
            return self
                .runtime
                .block_on(join_all(fetchers.into_iter().map(RangeFetcher::run)));
        }
        self.runtime.block_on(async {
            let handles = fetchers
                .into_iter()
                .map(|fetcher| {
                    let spec = *fetcher.spec();
                    (spec, tokio::spawn(fetcher.run()))
                })
                .collect::<Vec<_>>();
            let mut states = Vec::with_capacity(handles.len());
            for (spec, handle) in handles {
                let state = match handle.await {
                    Ok(state) => state,
                    Err(e) => {
                        error!("Chunk {} task died: {}", spec.index, e);
                        FetchState::failed(spec, layout.sink(spec.index), e.into())
                    }
                };
                states.push(state);
            }
            states
        })
    }
}
