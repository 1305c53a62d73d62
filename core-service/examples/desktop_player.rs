//! # Desktop Player Example
//!
//! Lists the clips under the configured collection and plays the one you
//! pick through the default output device.
//!
//! Run with:
//!
//! ```text
//! CLIPDECK_LOG=core_service=debug \
//! CLIPDECK_DATABASE_URL=https://<project>.firebaseio.com \
//!     cargo run --example desktop_player --package core-service
//! ```
//!
//! Type an entry number to select it, then `y` to play or `n` to cancel.
//! `l` reprints the list, `q` quits.

use anyhow::Context;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_service::{
    CatalogEvent, CoreConfig, CoreEvent, CoreService, Decision, PlaybackEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_entries(service: &CoreService) {
    let entries = service.entries();
    if entries.is_empty() {
        println!("(no clips)");
    }
    for (index, name) in entries.iter().enumerate() {
        println!("{:>3}  {}", index, name);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::from_env())
        .context("failed to initialize logging")?;

    let config = CoreConfig::from_env()
        .build()
        .context("set CLIPDECK_DATABASE_URL to your realtime database URL")?;
    let service = CoreService::start(config)?;

    let mut events = service.subscribe_events();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CoreEvent::Catalog(CatalogEvent::Updated { entries }) => {
                    println!("\n-- audio list updated ({} clips), type l to show", entries.len());
                }
                CoreEvent::Playback(PlaybackEvent::Failed { message, .. }) => {
                    println!("!! {}", message);
                }
                other => println!("-- {}", other),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = None;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        if let Some(prompt) = pending.take() {
            let decision = if input.eq_ignore_ascii_case("y") {
                Decision::Confirm
            } else {
                Decision::Cancel
            };
            service.decide(prompt, decision)?;
            continue;
        }

        match input {
            "q" => break,
            "l" | "" => print_entries(&service),
            other => match other.parse::<usize>().ok().and_then(|i| service.select(i)) {
                Some(prompt) => {
                    println!("{}: {}", prompt.title, prompt.message);
                    println!("play? [y/n]");
                    pending = Some(prompt);
                }
                None => println!("no such entry: {}", other),
            },
        }
    }

    service.shutdown().await?;
    Ok(())
}
