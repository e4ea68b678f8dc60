mod commands;
mod config;
mod feed;
mod playback;
mod remote;
mod session;

use anyhow::Context;
use claimloop_shared::ranking::format_km2;
use claimloop_shared::{FoldOutcome, Reconciler, TerritoryStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::commands::Command;
use crate::remote::RemoteStore;
use crate::session::{Capture, ClickOutcome, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let owner = config::player();
    let store = RemoteStore::new(config::server_url());
    tracing::info!(%owner, store = store.base_url(), "starting claimloop client");

    let mut session = Session::new(owner, store, Reconciler::default(), config::walking_speed_kmh());
    if let Err(e) = session.load().await {
        tracing::warn!(error = %e, "initial territory load failed; starting from an empty map");
    }

    let (feed_tx, mut feed_rx) = mpsc::unbounded_channel();
    session.store().subscribe(move |record| {
        let _ = feed_tx.send(record);
    });

    println!("playing as {}. {}", session.owner(), commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match commands::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => run_command(&mut session, command).await,
                    Err(commands::ParseError::Empty) => {}
                    Err(e) => println!("{e}. {}", commands::HELP),
                }
            }
            Some(record) = feed_rx.recv() => {
                if let FoldOutcome::Invalid(e) = session.fold(record) {
                    tracing::debug!(error = %e, "ignored malformed feed record");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("client stopped");
    Ok(())
}

async fn run_command(session: &mut Session<RemoteStore>, command: Command) {
    match command {
        Command::Click(point) => match session.click(point).await {
            Ok(ClickOutcome::Appended { points }) => println!("path: {points} points"),
            Ok(ClickOutcome::Captured(capture)) => report_capture(&capture),
            Err(e) => println!("click rejected: {e}"),
        },
        Command::Undo => match session.undo() {
            Some(point) => println!(
                "removed ({:.6}, {:.6}); {} points left",
                point.lat,
                point.lng,
                session.path().len()
            ),
            None => println!("path is empty"),
        },
        Command::Reset => {
            session.reset();
            println!("path cleared");
        }
        Command::Ranking => print!("{}", commands::render_ranking(&session.leaderboard())),
        Command::List => {
            print!("{}", commands::render_territories(session.territories()));
            print!("{}", commands::render_ranking(&session.ranking()));
        }
        Command::Stats => print!(
            "{}",
            commands::render_stats(session.path().len(), session.path_stats())
        ),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
}

fn report_capture(capture: &Capture) {
    let reconciliation = &capture.reconciliation;
    println!(
        "captured {} ({}); merged {}, trimmed {}, removed {}",
        reconciliation.committed.id,
        format_km2(reconciliation.committed.area_km2),
        reconciliation.merged.len(),
        reconciliation.trimmed_foreign(),
        reconciliation.removed_foreign(),
    );
    if !capture.report.is_clean() {
        println!(
            "store is behind: {} of {} changes failed",
            capture.report.failures.len(),
            reconciliation.mutations.len()
        );
    }

    if config::playback_enabled() {
        let ring = capture.ring.clone();
        let speed_kmh = config::walking_speed_kmh() * config::playback_speedup();
        tokio::spawn(async move {
            let shown = playback::animate(&ring, speed_kmh, |position| match position {
                Some(point) => tracing::trace!(lat = point.lat, lng = point.lng, "marker"),
                None => tracing::debug!("playback finished"),
            })
            .await;
            tracing::debug!(positions = shown, "loop replayed");
        });
    }
}
