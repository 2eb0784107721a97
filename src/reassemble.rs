use crate::fetcher::FetchState;
use crate::Result;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Concatenate every chunk's sink into `output`, in chunk index order
///
/// The output is truncated first. Chunks are appended whatever their
/// outcome, so a failed chunk shows up as a short file. Each state is
/// dropped once copied, which removes its sink. Returns the bytes written.
#[instrument(skip(states, output), fields(output = %output.display(), chunks = states.len()))]
pub async fn reassemble(mut states: Vec<FetchState>, output: &Path) -> Result<u64> {
    info!("Writing output file...");
    states.sort_by_key(FetchState::index);
    let mut out = File::create(output).await?;
    let mut total = 0;
    for state in states {
        debug!(
            "Adding contents of {} to {}",
            state.sink_path().display(),
            output.display()
        );
        match File::open(state.sink_path()).await {
            Ok(mut sink) => total += tokio::io::copy(&mut sink, &mut out).await?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Chunk {} left no data behind", state.index())
            }
            Err(e) => return Err(e.into()),
        }
    }
    out.flush().await?;
    out.sync_all().await?;
    Ok(total)
}
