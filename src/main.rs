mod app;

use crate::app::App;
use anyhow::{Context, Result};
use multiget::Downloader;

fn main() -> Result<()> {
    let app: App = App::new();
    app.init_logging();
    let config = app.to_config().context("Invalid arguments")?;
    #[allow(unused_mut)]
    let mut dl = Downloader::new(config);
    #[cfg(feature = "progress")]
    if !app.no_progress {
        dl.progress_bar();
    }
    let report = dl
        .download()
        .with_context(|| format!("Failed to download {}", app.url))?;
    println!("{}", report);
    Ok(())
}
