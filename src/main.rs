//! Host for the gallery: serves each configured set against an in-memory page and
//! reads navigation from stdin.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use photo_gallery::Error;
use photo_gallery::config::Configuration;
use photo_gallery::events::{GalleryExit, NavIntent};
use photo_gallery::fetch::FileFetcher;
use photo_gallery::location::{Location, PageLocation};
use photo_gallery::surface::{ShareWidget, TracingShareWidget, TracingSurface};
use photo_gallery::tasks::gallery::{self, Page, Preloader};

#[derive(Debug, Parser)]
#[command(
    name = "photo-gallery",
    version,
    about = "Step through photo sets described by a YAML site file"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Set to open first (defaults to the first configured set)
    #[arg(long, value_name = "SLUG")]
    set: Option<String>,
    /// Initial position token, e.g. `5/`
    #[arg(long, value_name = "TOKEN")]
    position: Option<String>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Navigate(NavIntent),
    /// Position token typed by hand, like editing the address bar.
    Goto(String),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "" | "n" | "next" => return Some(Command::Navigate(NavIntent::Forward)),
        "p" | "prev" => return Some(Command::Navigate(NavIntent::Backward)),
        "q" | "quit" => return Some(Command::Quit),
        _ => {}
    }
    if let Some(token) = line.strip_prefix('#') {
        return Some(Command::Goto(token.to_string()));
    }
    if let Some(arg) = line.strip_prefix("go ") {
        return Some(Command::Goto(format!("{}/", arg.trim().trim_end_matches('/'))));
    }
    None
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        set,
        position,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    let collection = cfg.collection().context("failed to load photo sets")?;
    info!(sets = collection.sets().len(), "loaded collection");

    let preloader = Preloader {
        fetcher: Arc::new(FileFetcher::new(cfg.site_root())),
        options: cfg.preload.clone(),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; shutting down");
            cancel.cancel();
        });
    }

    // Stdin -> commands; EOF ends the session.
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(16);
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parse_command(&line) {
                        Some(cmd) => {
                            if cmd_tx.send(cmd).await.is_err() {
                                break;
                            }
                        }
                        None => warn!(%line, "unknown command (n, p, #N/, go N, q)"),
                    },
                    Ok(None) => {
                        info!("stdin closed; shutting down");
                        break;
                    }
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                }
            }
            cancel.cancel();
        });
    }

    let mut slug = set.unwrap_or_else(|| collection.first().slug.clone());
    let mut position = position;
    loop {
        let current = collection
            .get(&slug)
            .ok_or_else(|| Error::UnknownSet(slug.clone()))?;
        let mut href = collection.page_url(&current.slug)?;
        if let Some(token) = position.take() {
            href.set_fragment(Some(token.trim_start_matches('#')));
        }
        let next_set = collection.next_set_path(&current.slug)?;
        let location = PageLocation::new(href);
        let share: Vec<Box<dyn ShareWidget>> = cfg
            .share_targets
            .iter()
            .map(|t| {
                Box::new(TracingShareWidget::new(&t.name, t.reparse)) as Box<dyn ShareWidget>
            })
            .collect();

        let (intent_tx, intent_rx) = mpsc::channel::<NavIntent>(16);
        let run = gallery::on_ready(
            &current.name,
            current.photos.clone(),
            &next_set,
            Page {
                location: location.clone(),
                surface: TracingSurface::new(&current.name),
                share,
            },
            preloader.clone(),
            intent_rx,
            cancel.clone(),
        );
        tokio::pin!(run);

        let exit = loop {
            select! {
                res = &mut run => break res?,
                Some(cmd) = cmd_rx.recv() => match cmd {
                    Command::Navigate(intent) => {
                        if intent_tx.send(intent).await.is_err() {
                            debug!("gallery stopped taking intents");
                        }
                    }
                    Command::Goto(token) => location.set_fragment(&token),
                    Command::Quit => cancel.cancel(),
                }
            }
        };

        match exit {
            GalleryExit::Redirected(url) => match collection.slug_for_url(&url) {
                Some(next) if collection.get(next).is_some() => {
                    slug = next.to_string();
                }
                _ => {
                    info!(%url, "left the gallery");
                    break;
                }
            },
            GalleryExit::Cancelled => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_commands() {
        assert_eq!(
            parse_command(""),
            Some(Command::Navigate(NavIntent::Forward))
        );
        assert_eq!(
            parse_command(" p "),
            Some(Command::Navigate(NavIntent::Backward))
        );
        assert_eq!(parse_command("#4/"), Some(Command::Goto("4/".into())));
        assert_eq!(parse_command("go 7"), Some(Command::Goto("7/".into())));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("dance"), None);
    }
}
