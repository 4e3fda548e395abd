//! Collaborators the controller draws into. It never sees their markup.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::events::LoadedImage;

/// Addressable regions of the gallery page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Previous,
    Next,
    Indicator,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Hidden affordance or an image that is still loading.
    Blank,
    /// Visible previous/next affordance.
    Arrow,
    Text(String),
    Image {
        image: Arc<LoadedImage>,
        external_link: Option<String>,
    },
    /// Placeholder for a photo whose fetch failed for good.
    Unavailable,
}

pub trait RenderSurface: Send {
    fn set_content(&mut self, region: Region, content: Content);
    fn set_target(&mut self, region: Region, target: Option<Url>);
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn set_content(&mut self, region: Region, content: Content) {
        (**self).set_content(region, content)
    }

    fn set_target(&mut self, region: Region, target: Option<Url>) {
        (**self).set_target(region, target)
    }
}

/// Embedded share button (like/tweet/...) that points at the current photo.
pub trait ShareWidget: Send {
    fn set_canonical_url(&mut self, url: &Url);

    /// Preview image for embeds that show one.
    fn set_preview_image(&mut self, _source: &str) {}

    /// Ask the embed to re-read its markup after the URL changed.
    fn reparse(&mut self) {}
}

/// Surface that reports every update through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSurface {
    set_name: String,
}

impl TracingSurface {
    pub fn new(set_name: impl Into<String>) -> Self {
        Self {
            set_name: set_name.into(),
        }
    }
}

impl RenderSurface for TracingSurface {
    fn set_content(&mut self, region: Region, content: Content) {
        match content {
            Content::Text(text) => info!(set = %self.set_name, ?region, %text, "surface: text"),
            Content::Image { image, external_link } => info!(
                set = %self.set_name,
                width = image.width,
                height = image.height,
                link = external_link.as_deref().unwrap_or("-"),
                "surface: image"
            ),
            other => debug!(set = %self.set_name, ?region, content = ?other, "surface: content"),
        }
    }

    fn set_target(&mut self, region: Region, target: Option<Url>) {
        debug!(
            set = %self.set_name,
            ?region,
            target = target.as_ref().map(Url::as_str).unwrap_or("-"),
            "surface: target"
        );
    }
}

/// Share embed that logs the URLs it would point at.
#[derive(Debug)]
pub struct TracingShareWidget {
    name: String,
    reparse: bool,
    canonical: Option<Url>,
    reparses: usize,
}

impl TracingShareWidget {
    pub fn new(name: impl Into<String>, reparse: bool) -> Self {
        Self {
            name: name.into(),
            reparse,
            canonical: None,
            reparses: 0,
        }
    }

    pub fn canonical_url(&self) -> Option<&Url> {
        self.canonical.as_ref()
    }

    /// Refreshes performed so far; stays at zero when reparsing is turned off.
    pub fn reparses(&self) -> usize {
        self.reparses
    }
}

impl ShareWidget for TracingShareWidget {
    fn set_canonical_url(&mut self, url: &Url) {
        info!(widget = %self.name, url = %url, "share: canonical url");
        self.canonical = Some(url.clone());
    }

    fn set_preview_image(&mut self, source: &str) {
        debug!(widget = %self.name, %source, "share: preview image");
    }

    fn reparse(&mut self) {
        if !self.reparse {
            return;
        }
        self.reparses += 1;
        let url = self.canonical.as_ref().map(Url::as_str).unwrap_or("-");
        debug!(widget = %self.name, url, "share: reparse");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_widget_tracks_url_and_reparses() {
        let url = Url::parse("http://example.com/photography/portraits/3/").unwrap();
        let mut widget = TracingShareWidget::new("facebook-like", true);
        widget.set_canonical_url(&url);
        widget.reparse();
        assert_eq!(widget.canonical_url(), Some(&url));
        assert_eq!(widget.reparses(), 1);
    }

    #[test]
    fn share_widget_skips_reparse_when_disabled() {
        let url = Url::parse("http://example.com/photography/portraits/3/").unwrap();
        let mut widget = TracingShareWidget::new("tweet", false);
        widget.set_canonical_url(&url);
        widget.reparse();
        assert_eq!(widget.canonical_url(), Some(&url));
        assert_eq!(widget.reparses(), 0);
    }
}
