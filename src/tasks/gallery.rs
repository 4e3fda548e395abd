use crate::config::PreloadOptions;
use crate::controller::{GalleryController, Step};
use crate::events::{GalleryExit, NavIntent, PreloadEvent};
use crate::fetch::Fetcher;
use crate::location::PageLocation;
use crate::photos::PhotoSet;
use crate::surface::{RenderSurface, ShareWidget};
use crate::tasks::preload;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::{self, Receiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Completed fetches waiting for the gallery loop.
const PRELOAD_QUEUE: usize = 16;

/// The host page's collaborators for one gallery.
pub struct Page<S> {
    pub location: PageLocation,
    pub surface: S,
    pub share: Vec<Box<dyn ShareWidget>>,
}

/// How the gallery's photos get fetched.
pub struct Preloader<F> {
    pub fetcher: Arc<F>,
    pub options: PreloadOptions,
}

impl<F> Clone for Preloader<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            options: self.options.clone(),
        }
    }
}

/// Entry point once the host page is ready: runs one gallery until it redirects or is
/// cancelled.
///
/// Every render goes through the location's change stream. `step` only rewrites the
/// position token, so programmatic moves and history traversal share one path.
/// Preload completions are shown only if they belong to the photo current at the time
/// they arrive.
pub async fn on_ready<S, F>(
    set_name: &str,
    photos: PhotoSet,
    next_set_url: &str,
    page: Page<S>,
    preloader: Preloader<F>,
    mut intents: Receiver<NavIntent>,
    cancel: CancellationToken,
) -> Result<GalleryExit>
where
    S: RenderSurface + 'static,
    F: Fetcher,
{
    let Page {
        location,
        surface,
        share,
    } = page;

    // Subscribe before initializing so no change is missed; the current href is
    // rendered by `initialize` itself.
    let mut position_rx = location.subscribe();
    position_rx.borrow_and_update();

    let (mut controller, plan) =
        GalleryController::initialize(set_name, photos, next_set_url, location, surface, share)
            .with_context(|| format!("initializing gallery {set_name:?}"))?;

    let (preload_tx, mut preload_rx) = mpsc::channel::<PreloadEvent>(PRELOAD_QUEUE);
    let preload_cancel = cancel.child_token();
    let preload_task = tokio::spawn(preload::run(
        plan,
        preloader.fetcher.clone(),
        preload_tx,
        preloader.options.clone(),
        preload_cancel.clone(),
    ));

    let exit = loop {
        select! {
            _ = cancel.cancelled() => break GalleryExit::Cancelled,

            // Forward/back intents from the host page.
            Some(intent) = intents.recv() => {
                if let Step::Redirected(target) = controller.step(intent.delta()) {
                    break GalleryExit::Redirected(target);
                }
            }

            // Any position-token change, ours or external.
            changed = position_rx.changed() => {
                if changed.is_err() {
                    warn!("location closed");
                    break GalleryExit::Cancelled;
                }
                position_rx.borrow_and_update();
                controller.on_position_changed();
            }

            // Fetch completions from the preload scheduler.
            Some(event) = preload_rx.recv() => match event {
                PreloadEvent::Loaded { index, image, priority } => {
                    if priority {
                        info!(set = %controller.set_name(), index, "priority photo loaded");
                    }
                    let shown = controller.on_photo_loaded(index, image);
                    debug!(index, shown, "photo loaded");
                }
                PreloadEvent::Unavailable { index } => controller.on_photo_unavailable(index),
            }
        }
    };

    preload_cancel.cancel();
    drop(preload_rx);
    match preload_task.await {
        Ok(Err(err)) => warn!("preload task failed: {err:#}"),
        Err(err) => warn!("preload task panicked: {err}"),
        Ok(Ok(())) => {}
    }
    info!(set = %controller.set_name(), ?exit, "gallery finished");
    Ok(exit)
}
