use crate::config::PreloadOptions;
use crate::controller::PreloadPlan;
use crate::error;
use crate::events::{LoadedImage, PreloadEvent};
use crate::fetch::Fetcher;
use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fetch order for a set of `len` photos: the priority photo, then the others ascending.
pub fn fetch_order(priority: usize, len: usize) -> impl Iterator<Item = usize> {
    std::iter::once(priority).chain((0..len).filter(move |&i| i != priority))
}

/// Preload scheduler.
///
/// Rules:
/// - The priority photo is fetched alone; its completion is reported before any
///   other fetch is issued.
/// - Every other photo is then fetched exactly once, ascending, at most
///   `max_in_flight` at a time.
/// - A failed fetch is retried `retries` times; after that the photo is reported
///   unavailable and the rest continue.
/// - Completions are reported by index; the gallery decides whether to show them.
pub async fn run<F: Fetcher>(
    plan: PreloadPlan,
    fetcher: Arc<F>,
    to_gallery: Sender<PreloadEvent>,
    options: PreloadOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let PreloadPlan { priority, sources } = plan;
    let Some(first_source) = sources.get(priority) else {
        warn!(priority, photos = sources.len(), "priority index outside photo set");
        return Ok(());
    };

    let issued = fetcher.fetch(first_source);
    let first = select! {
        _ = cancel.cancelled() => return Ok(()),
        res = fetch_with_retry(&*fetcher, issued, priority, first_source, &options) => res,
    };
    let event = match first {
        Some(image) => PreloadEvent::Loaded {
            index: priority,
            image: Arc::new(image),
            priority: true,
        },
        None => PreloadEvent::Unavailable { index: priority },
    };
    if to_gallery.send(event).await.is_err() {
        debug!("gallery closed before priority photo was delivered");
        return Ok(());
    }
    info!(priority, remaining = sources.len() - 1, "priority photo ready; preloading the rest");

    let mut pending = fetch_order(priority, sources.len()).skip(1);
    let mut tasks: JoinSet<(usize, Option<LoadedImage>)> = JoinSet::new();
    loop {
        while tasks.len() < options.max_in_flight {
            let Some(index) = pending.next() else { break };
            let source = sources[index].clone();
            // Issue here, in order; the task only awaits the result.
            let issued = fetcher.fetch(&source);
            let fetcher = fetcher.clone();
            let options = options.clone();
            tasks.spawn(async move {
                let image = fetch_with_retry(&*fetcher, issued, index, &source, &options).await;
                (index, image)
            });
        }
        if tasks.is_empty() {
            break;
        }

        select! {
            _ = cancel.cancelled() => {
                tasks.abort_all();
                break;
            }

            Some(joined) = tasks.join_next() => {
                let event = match joined {
                    Ok((index, Some(image))) => PreloadEvent::Loaded {
                        index,
                        image: Arc::new(image),
                        priority: false,
                    },
                    Ok((index, None)) => PreloadEvent::Unavailable { index },
                    Err(err) => {
                        warn!("preload task failed: {err}");
                        continue;
                    }
                };
                if to_gallery.send(event).await.is_err() {
                    debug!("gallery closed; stopping preload");
                    tasks.abort_all();
                    break;
                }
            }
        }
    }

    debug!("preload finished");
    Ok(())
}

async fn fetch_with_retry<F: Fetcher>(
    fetcher: &F,
    issued: BoxFuture<'static, error::Result<LoadedImage>>,
    index: usize,
    source: &str,
    options: &PreloadOptions,
) -> Option<LoadedImage> {
    let mut attempt = 0;
    let mut result = issued.await;
    loop {
        match result {
            Ok(image) => {
                debug!(index, attempt, %source, "fetched");
                return Some(image);
            }
            Err(err) => {
                warn!(index, attempt, %source, "fetch failed: {err}");
                if attempt >= options.retries {
                    return None;
                }
                attempt += 1;
                sleep(options.retry_backoff).await;
                result = fetcher.fetch(source).await;
            }
        }
    }
}
