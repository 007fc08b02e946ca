//! Decrypts one track into a local file.
//!
//! ```text
//! DEEZER_ARL=... DEEZER_DECRYPTION_KEY=... \
//!     cargo run -p core-service --example stream_to_file -- 3135556 track.mp3
//! ```

use anyhow::{bail, Context};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_service::{validate_url, CoreService};
use tokio::fs::File;
use tokio::io::{self, AsyncWriteExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default())?;

    let mut args = std::env::args().skip(1);
    let Some(query) = args.next() else {
        bail!("usage: stream_to_file <track id or url> [output]");
    };
    let output = args.next().unwrap_or_else(|| "track.bin".to_string());

    if query.starts_with("https://") && !validate_url(&query) {
        bail!("{query} is not a Deezer link");
    }

    let config = CoreConfig::builder()
        .access_token(std::env::var("DEEZER_ARL").context("DEEZER_ARL is not set")?)
        .decryption_key(
            std::env::var("DEEZER_DECRYPTION_KEY").context("DEEZER_DECRYPTION_KEY is not set")?,
        )
        .build()?;

    let core = CoreService::new(config)?;
    core.activate().await?;

    let track = core.stream_track(&query).await?;
    println!(
        "{} - {} [{}]",
        track.info.artist.as_deref().unwrap_or("unknown artist"),
        track.info.title,
        track.format
    );

    let mut reader = track.into_async_read();
    let mut file = File::create(&output)
        .await
        .with_context(|| format!("cannot create {output}"))?;
    let written = io::copy(&mut reader, &mut file).await?;
    file.flush().await?;

    println!("wrote {written} bytes to {output}");
    core.deactivate().await;
    Ok(())
}
