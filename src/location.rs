//! The page location: source of the position token and the redirect mechanism.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

/// What the controller may do with the page address.
pub trait Location: Send + Sync {
    fn href(&self) -> Url;

    /// Current position token, without the leading `#`.
    fn fragment(&self) -> Option<String> {
        self.href().fragment().map(str::to_owned)
    }

    /// Replaces the fragment. Subscribers are notified only when it changes.
    fn set_fragment(&self, token: &str);

    /// Leaves the gallery page for `target`.
    fn redirect(&self, target: &Url);
}

/// In-memory page address with change notification.
///
/// Both the controller and outside actors (the back button, a bookmark) write through
/// [`PageLocation::set_fragment`]; every subscriber sees the same change stream.
#[derive(Debug, Clone)]
pub struct PageLocation {
    href: Arc<watch::Sender<Url>>,
    redirect: Arc<watch::Sender<Option<Url>>>,
}

impl PageLocation {
    pub fn new(href: Url) -> Self {
        let (href, _) = watch::channel(href);
        let (redirect, _) = watch::channel(None);
        Self {
            href: Arc::new(href),
            redirect: Arc::new(redirect),
        }
    }

    /// Notified on every href change, whatever caused it.
    pub fn subscribe(&self) -> watch::Receiver<Url> {
        self.href.subscribe()
    }

    pub fn redirected_to(&self) -> Option<Url> {
        self.redirect.borrow().clone()
    }
}

impl Location for PageLocation {
    fn href(&self) -> Url {
        self.href.borrow().clone()
    }

    fn set_fragment(&self, token: &str) {
        let changed = self.href.send_if_modified(|url| {
            if url.fragment() == Some(token) {
                false
            } else {
                url.set_fragment(Some(token));
                true
            }
        });
        debug!(token, changed, "location: fragment");
    }

    fn redirect(&self, target: &Url) {
        info!(target = %target, "location: redirect");
        self.redirect.send_replace(Some(target.clone()));
    }
}
