//! Replay harness: feeds a stream of domain events through a collector
//! against a real backend, the way the pipeline runs on a page.
//!
//! Input is JSON lines, one domain event per line (see
//! `pulse_core::events::DomainEvent` for the shape). Useful for smoke
//! testing a backend deployment and for replaying captured sessions.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use pulse_backend::{Backend, HttpBackend, HttpBackendConfig};
use pulse_core::events::DomainEvent;
use pulse_engine::{spawn_presence, Collector, CollectorConfig};
use pulse_logging::{init_logging, LoggingConfig};
use pulse_store::{IdentityStore, KeyValueScope, MemoryScope, SqliteScope};

#[derive(Parser, Debug)]
#[command(name = "pulse", about = "Replay domain events through the telemetry pipeline")]
struct Args {
    /// Backend base URL, e.g. https://telemetry.example.com
    #[arg(long)]
    backend_url: String,

    /// Event file (JSON lines). Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Page slug stamped into dated tree paths.
    #[arg(long, default_value = "replay")]
    slug: String,

    /// Landing URL, query string included.
    #[arg(long, default_value = "https://shop.example/")]
    url: String,

    /// Referrer for traffic classification.
    #[arg(long)]
    referrer: Option<String>,

    /// Honor do-not-track: everything but error capture goes inert.
    #[arg(long)]
    do_not_track: bool,

    /// SQLite file backing the durable storage scope. In-memory when omitted.
    #[arg(long)]
    state_db: Option<PathBuf>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&LoggingConfig {
        json: args.json_logs,
        ..LoggingConfig::default()
    });

    let backend = Arc::new(HttpBackend::new(HttpBackendConfig {
        base_url: args.backend_url.clone(),
    })?);

    let durable: Arc<dyn KeyValueScope> = match &args.state_db {
        Some(path) => Arc::new(SqliteScope::open(path).context("opening state db")?),
        None => Arc::new(MemoryScope::new()),
    };
    let identity = Arc::new(IdentityStore::new(durable, Arc::new(MemoryScope::new())));
    let visitor = identity.resolve_visitor_id();

    let collector = Collector::new(
        backend.clone(),
        identity,
        CollectorConfig {
            url: args.url,
            referrer: args.referrer,
            slug: args.slug,
            do_not_track: args.do_not_track,
        },
        chrono::Utc::now(),
    );

    // A dead backend disables writes for the run; the replay still parses.
    match backend.bootstrap().await {
        Ok(()) => {
            spawn_presence(backend.clone() as Arc<dyn Backend>, visitor);
        }
        Err(e) => {
            warn!(error = %e, "backend bootstrap failed, writes disabled");
            collector.disable_writes();
        }
    }

    collector
        .handle_event(&DomainEvent::PageView, chrono::Utc::now())
        .await;

    let mut replayed = 0usize;
    let mut skipped = 0usize;
    for line in read_lines(args.input.as_deref())? {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DomainEvent>(&line) {
            Ok(event) => {
                let now = chrono::Utc::now();
                collector.handle_event(&event, now).await;
                collector
                    .settle_scroll(now + chrono::Duration::milliseconds(300))
                    .await;
                replayed += 1;
            }
            Err(e) => {
                warn!(error = %e, line, "unparseable event skipped");
                skipped += 1;
            }
        }
    }

    info!(replayed, skipped, queued = collector.queued(), "replay complete");
    collector.teardown(chrono::Utc::now()).await;

    // Beacon sends are fire-and-forget; give them a moment before exit.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    Ok(())
}

fn read_lines(
    input: Option<&std::path::Path>,
) -> anyhow::Result<Box<dyn Iterator<Item = std::io::Result<String>>>> {
    match input {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            Ok(Box::new(std::io::BufReader::new(file).lines()))
        }
        None => Ok(Box::new(std::io::stdin().lock().lines())),
    }
}
