//! Per-chunk HTTP/1.1 GET driven as an explicit state machine
//!
//! Every phase is a suspension point on the runtime, the fetcher only moves
//! forward along [`Phase`] and records each phase it enters.

mod phase;
mod request;
mod response;

pub use phase::Phase;
pub use response::StatusLine;

use crate::chunk::ChunkSpec;
use crate::sink::ChunkSink;
use crate::{Error, Result, Target};
use bytes::BytesMut;
#[cfg(feature = "progress")]
use indicatif::ProgressBar;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, error, instrument, trace, warn};

const BODY_BUFFER: usize = 16 * 1024;
/// Longest status or header line accepted, terminator included
pub const MAX_LINE: u64 = 8 * 1024;

/// Outcome of one fetcher, handed back once it is terminal
#[derive(Debug)]
pub struct FetchState {
    spec: ChunkSpec,
    phase: Phase,
    history: Vec<Phase>,
    sink: ChunkSink,
    error: Option<Error>,
}

impl FetchState {
    pub(crate) fn new(spec: ChunkSpec, sink: ChunkSink) -> Self {
        Self {
            spec,
            phase: Phase::Resolving,
            history: vec![Phase::Resolving],
            sink,
            error: None,
        }
    }
    /// State for a fetcher that never got to report by itself
    pub(crate) fn failed(spec: ChunkSpec, sink: ChunkSink, err: Error) -> Self {
        Self {
            spec,
            phase: Phase::Failed,
            history: vec![Phase::Failed],
            sink,
            error: Some(err),
        }
    }
    #[cfg(test)]
    pub(crate) fn completed(spec: ChunkSpec, sink: ChunkSink) -> Self {
        Self {
            spec,
            phase: Phase::Complete,
            history: vec![Phase::Complete],
            sink,
            error: None,
        }
    }
    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.history.push(phase);
    }

    pub fn spec(&self) -> &ChunkSpec {
        &self.spec
    }
    pub fn index(&self) -> usize {
        self.spec.index
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    /// Every phase entered, in order, including the terminal one
    pub fn history(&self) -> &[Phase] {
        &self.history
    }
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
    pub fn bytes_written(&self) -> u64 {
        self.sink.written()
    }
    pub fn sink_path(&self) -> &Path {
        self.sink.path()
    }
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }
}

enum Link {
    Idle,
    Resolved(Vec<SocketAddr>),
    Open(BufReader<TcpStream>),
}

/// Fetches one chunk of a [`Target`] into its own sink
pub struct RangeFetcher {
    target: Arc<Target>,
    state: FetchState,
    link: Link,
    #[cfg(feature = "progress")]
    progress: Option<ProgressBar>,
}

impl RangeFetcher {
    pub fn new(target: Arc<Target>, spec: ChunkSpec, sink: ChunkSink) -> Self {
        Self {
            target,
            state: FetchState::new(spec, sink),
            link: Link::Idle,
            #[cfg(feature = "progress")]
            progress: None,
        }
    }

    /// Report body bytes to a shared progress bar
    #[cfg(feature = "progress")]
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    pub fn spec(&self) -> &ChunkSpec {
        &self.state.spec
    }
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Drive the fetch to `Complete` or `Failed`
    #[instrument(skip(self), fields(chunk = %self.state.spec, url = %self.target))]
    pub async fn run(mut self) -> FetchState {
        while !self.state.phase.is_terminal() {
            let current = self.state.phase;
            let result = self.step().await;
            let next = current.transition(result.is_ok());
            if let Err(e) = result {
                error!("Chunk {} failed in {}: {}", self.state.spec.index, current, e);
                self.state.error = Some(e);
            }
            debug!("{} -> {}", current, next);
            self.state.enter(next);
        }
        self.link = Link::Idle;
        if self.state.is_complete() {
            debug!(
                "Chunk {} complete, {} bytes",
                self.state.spec.index,
                self.state.sink.written()
            );
        } else if let Err(e) = self.state.sink.close().await {
            warn!("Failed to close sink {}: {}", self.state.sink.path().display(), e);
        }
        self.state
    }

    async fn step(&mut self) -> Result<()> {
        match self.state.phase {
            Phase::Resolving => self.resolve().await,
            Phase::Connecting => self.connect().await,
            Phase::RequestSent => self.send_request().await,
            Phase::StatusLineRead => self.read_status_line().await,
            Phase::HeadersRead => self.read_headers().await,
            Phase::BodyStreaming => self.stream_body().await,
            Phase::Complete | Phase::Failed => Ok(()),
        }
    }

    async fn resolve(&mut self) -> Result<()> {
        self.state.sink.open().await?;
        let port = self.target.port_number()?;
        let host = self.target.host();
        let addrs = lookup_host((host, port))
            .await
            .map_err(|e| Error::Resolution(format!("{}:{}", host, port), e))?
            .collect::<Vec<_>>();
        if addrs.is_empty() {
            return Err(Error::Resolution(
                format!("{}:{}", host, port),
                io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
            ));
        }
        debug!("Resolved {} to {:?}", host, addrs);
        self.link = Link::Resolved(addrs);
        Ok(())
    }

    async fn connect(&mut self) -> Result<()> {
        let addrs = match std::mem::replace(&mut self.link, Link::Idle) {
            Link::Resolved(addrs) => addrs,
            _ => Vec::new(),
        };
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    debug!("Connected to {}", addr);
                    self.link = Link::Open(BufReader::new(stream));
                    return Ok(());
                }
                Err(e) => {
                    debug!("Connecting to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(Error::Connection(
            self.target.to_string(),
            last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no endpoint to connect to")
            }),
        ))
    }

    fn stream(&mut self) -> Result<&mut BufReader<TcpStream>> {
        match &mut self.link {
            Link::Open(stream) => Ok(stream),
            _ => Err(io::Error::new(io::ErrorKind::NotConnected, "no open connection").into()),
        }
    }

    async fn send_request(&mut self) -> Result<()> {
        let req = request::format_request(&self.target, &self.state.spec);
        trace!("Request: {:?}", req);
        let stream = self.stream()?;
        stream.write_all(req.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read one line, `None` on EOF, `Protocol` once it outgrows [`MAX_LINE`]
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let stream = self.stream()?;
        (&mut *stream).take(MAX_LINE).read_until(b'\n', &mut line).await?;
        if line.ends_with(b"\n") {
            return Ok(Some(line));
        }
        if line.len() as u64 >= MAX_LINE {
            return Err(Error::Protocol(format!(
                "line longer than {} bytes",
                MAX_LINE
            )));
        }
        Ok(None)
    }

    async fn read_status_line(&mut self) -> Result<()> {
        let line = self
            .read_line()
            .await?
            .ok_or_else(|| unexpected_eof("connection closed before the status line"))?;
        let status = StatusLine::parse(&String::from_utf8_lossy(&line))?;
        debug!("Response code: {} {}", status.code, status.reason);
        status.check()
    }

    async fn read_headers(&mut self) -> Result<()> {
        let mut discarded = 0;
        loop {
            let line = self
                .read_line()
                .await?
                .ok_or_else(|| unexpected_eof("connection closed inside the headers"))?;
            if response::is_header_end(&line) {
                break;
            }
            trace!("Header: {}", String::from_utf8_lossy(&line).trim_end());
            discarded += 1;
        }
        debug!("Discarded {} headers", discarded);
        Ok(())
    }

    /// Copy everything up to the peer closing the connection into the sink
    async fn stream_body(&mut self) -> Result<()> {
        let mut buf = BytesMut::with_capacity(BODY_BUFFER);
        loop {
            buf.clear();
            let n = self.stream()?.read_buf(&mut buf).await?;
            if n == 0 {
                break;
            }
            self.state.sink.write(&buf).await?;
            #[cfg(feature = "progress")]
            if let Some(pb) = &self.progress {
                pb.inc(n as u64);
            }
        }
        self.state.sink.close().await?;
        Ok(())
    }
}

fn unexpected_eof(msg: &str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, msg.to_string()))
}
