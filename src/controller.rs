//! Navigation state machine for one photo set.
//!
//! The controller owns the current index. Moves within the set only rewrite the
//! position token; rendering happens when the token change comes back through
//! [`GalleryController::on_position_changed`], the same path the back button takes.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::events::LoadedImage;
use crate::links;
use crate::location::Location;
use crate::photos::{LoadState, PhotoSet};
use crate::position;
use crate::surface::{Content, Region, RenderSurface, ShareWidget};

/// Arguments for the preload scheduler, produced once by [`GalleryController::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadPlan {
    pub priority: usize,
    pub sources: Vec<String>,
}

/// Result of [`GalleryController::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing to do: already at the first photo, or the set was left.
    Stayed,
    /// The position token was rewritten; a render follows its change notification.
    Moved { index: usize, token: String },
    /// Stepped past the last photo.
    Redirected(Url),
}

pub struct GalleryController<L, S> {
    set_name: String,
    photos: PhotoSet,
    current: usize,
    next_set: Url,
    location: L,
    surface: S,
    share: Vec<Box<dyn ShareWidget>>,
    redirected: bool,
}

impl<L: Location, S: RenderSurface> GalleryController<L, S> {
    /// Resolves the starting position from the page's token, renders it and returns the
    /// plan the preload scheduler must begin with.
    ///
    /// `next_set_url` is resolved against the page URL; a path replaces the page path.
    pub fn initialize(
        set_name: impl Into<String>,
        photos: PhotoSet,
        next_set_url: &str,
        location: L,
        surface: S,
        share: Vec<Box<dyn ShareWidget>>,
    ) -> Result<(Self, PreloadPlan)> {
        let page = location.href();
        let next_set = links::next_set_url(&page, next_set_url)?;
        let current = position::resolve(page.fragment(), photos.len());
        let plan = PreloadPlan {
            priority: current,
            sources: photos.sources(),
        };

        let mut controller = Self {
            set_name: set_name.into(),
            photos,
            current,
            next_set,
            location,
            surface,
            share,
            redirected: false,
        };
        info!(
            set = %controller.set_name,
            photos = controller.photos.len(),
            start = current + 1,
            next = %controller.next_set,
            "gallery initialized"
        );
        controller.render();
        Ok((controller, plan))
    }

    pub fn step(&mut self, delta: i64) -> Step {
        if self.redirected {
            return Step::Stayed;
        }
        let len = self.photos.len();
        // Count from the token, which may be ahead of the last render.
        let from = position::resolve(self.location.fragment().as_deref(), len);
        let candidate = i64::try_from(from).unwrap_or(i64::MAX).saturating_add(delta);

        if candidate >= i64::try_from(len).unwrap_or(i64::MAX) {
            info!(set = %self.set_name, target = %self.next_set, "past last photo; leaving set");
            self.redirected = true;
            self.location.redirect(&self.next_set);
            return Step::Redirected(self.next_set.clone());
        }
        if candidate < 0 && from == 0 {
            return Step::Stayed;
        }

        let index = position::clamp(candidate, len);
        let token = position::format(index);
        debug!(set = %self.set_name, from, to = index, %token, "step");
        self.location.set_fragment(&token);
        Step::Moved { index, token }
    }

    /// Re-reads the position token and renders. Called for every token change.
    pub fn on_position_changed(&mut self) {
        if self.redirected {
            return;
        }
        let fragment = self.location.fragment();
        self.current = position::resolve(fragment.as_deref(), self.photos.len());
        debug!(
            set = %self.set_name,
            token = fragment.as_deref().unwrap_or(""),
            index = self.current,
            "position changed"
        );
        self.render();
    }

    /// Attaches a fetched image; shows it if it belongs to the photo on screen now.
    ///
    /// Returns whether the image region was updated.
    pub fn on_photo_loaded(&mut self, index: usize, image: Arc<LoadedImage>) -> bool {
        if !self.photos.attach(index, image) {
            warn!(set = %self.set_name, index, "loaded image for unknown slot");
            return false;
        }
        if self.redirected || index != self.current {
            return false;
        }
        self.show_current();
        true
    }

    pub fn on_photo_unavailable(&mut self, index: usize) {
        if !self.photos.mark_unavailable(index) {
            return;
        }
        warn!(set = %self.set_name, index, "photo unavailable");
        if !self.redirected && index == self.current {
            self.show_current();
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn render(&mut self) {
        let index = self.current;
        let last = self.photos.len() - 1;
        let page = self.location.href();

        if index == 0 {
            self.surface.set_content(Region::Previous, Content::Blank);
            self.surface.set_target(Region::Previous, None);
        } else {
            self.surface.set_content(Region::Previous, Content::Arrow);
            self.surface
                .set_target(Region::Previous, Some(links::position_url(&page, index - 1)));
        }

        // The last photo's "next" leads out of the set.
        let forward = if index == last {
            self.next_set.clone()
        } else {
            links::position_url(&page, index + 1)
        };
        self.surface.set_content(Region::Next, Content::Arrow);
        self.surface.set_target(Region::Next, Some(forward.clone()));

        self.surface
            .set_content(Region::Indicator, Content::Text((index + 1).to_string()));

        self.show_current();
        self.surface.set_target(Region::Image, Some(forward));

        let canonical = links::canonical_photo_url(&page, index);
        let preview = self
            .photos
            .get(index)
            .map(|p| p.share_url().to_owned())
            .unwrap_or_default();
        for widget in &mut self.share {
            widget.set_canonical_url(&canonical);
            widget.set_preview_image(&preview);
            widget.reparse();
        }
    }

    fn show_current(&mut self) {
        let index = self.current;
        let content = match self.photos.state(index) {
            Some(LoadState::Loaded(image)) => Content::Image {
                image: image.clone(),
                external_link: self
                    .photos
                    .get(index)
                    .and_then(|p| p.external_link_url.clone()),
            },
            Some(LoadState::Unavailable) => Content::Unavailable,
            Some(LoadState::Pending) | None => Content::Blank,
        };
        self.surface.set_content(Region::Image, content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::PhotoDescriptor;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLocation {
        href: Mutex<Option<Url>>,
        fragments: Mutex<Vec<String>>,
        redirects: Mutex<Vec<Url>>,
    }

    impl FakeLocation {
        fn at(href: &str) -> Self {
            Self {
                href: Mutex::new(Some(Url::parse(href).unwrap())),
                ..Default::default()
            }
        }

        fn fragment_writes(&self) -> Vec<String> {
            self.fragments.lock().unwrap().clone()
        }

        fn redirects(&self) -> Vec<Url> {
            self.redirects.lock().unwrap().clone()
        }

        fn set_external(&self, token: &str) {
            if let Some(url) = self.href.lock().unwrap().as_mut() {
                url.set_fragment(Some(token));
            }
        }
    }

    impl Location for FakeLocation {
        fn href(&self) -> Url {
            self.href.lock().unwrap().clone().unwrap()
        }

        fn set_fragment(&self, token: &str) {
            self.set_external(token);
            self.fragments.lock().unwrap().push(token.to_owned());
        }

        fn redirect(&self, target: &Url) {
            self.redirects.lock().unwrap().push(target.clone());
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        content: HashMap<Region, Content>,
        targets: HashMap<Region, Option<Url>>,
        image_writes: usize,
    }

    impl RenderSurface for RecordingSurface {
        fn set_content(&mut self, region: Region, content: Content) {
            if region == Region::Image {
                self.image_writes += 1;
            }
            self.content.insert(region, content);
        }

        fn set_target(&mut self, region: Region, target: Option<Url>) {
            self.targets.insert(region, target);
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum ShareCall {
        Canonical(String),
        Preview(String),
        Reparse,
    }

    struct RecordingShare(Arc<Mutex<Vec<ShareCall>>>);

    impl ShareWidget for RecordingShare {
        fn set_canonical_url(&mut self, url: &Url) {
            self.0
                .lock()
                .unwrap()
                .push(ShareCall::Canonical(url.to_string()));
        }

        fn set_preview_image(&mut self, source: &str) {
            self.0
                .lock()
                .unwrap()
                .push(ShareCall::Preview(source.to_owned()));
        }

        fn reparse(&mut self) {
            self.0.lock().unwrap().push(ShareCall::Reparse);
        }
    }

    const PAGE: &str = "http://emptysquare.net/photography/lower-east-side/";

    fn photos(n: usize) -> PhotoSet {
        PhotoSet::new(
            (0..n)
                .map(|i| PhotoDescriptor::new(format!("/photography/images/{i}.jpg")))
                .collect(),
        )
        .unwrap()
    }

    fn image() -> Arc<LoadedImage> {
        Arc::new(LoadedImage {
            width: 2,
            height: 1,
            pixels: vec![0; 8],
        })
    }

    fn gallery(
        href: &str,
        n: usize,
    ) -> (GalleryController<FakeLocation, RecordingSurface>, PreloadPlan) {
        GalleryController::initialize(
            "lower east side",
            photos(n),
            "/photography/bio/",
            FakeLocation::at(href),
            RecordingSurface::default(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn starts_at_first_photo_without_token() {
        let (g, plan) = gallery(PAGE, 5);
        assert_eq!(g.current_index(), 0);
        assert_eq!(plan.priority, 0);
        assert_eq!(plan.sources.len(), 5);

        let s = g.surface();
        assert_eq!(s.content[&Region::Previous], Content::Blank);
        assert_eq!(s.targets[&Region::Previous], None);
        assert_eq!(s.content[&Region::Next], Content::Arrow);
        assert_eq!(
            s.targets[&Region::Next].as_ref().unwrap().as_str(),
            "http://emptysquare.net/photography/lower-east-side/#2/"
        );
        assert_eq!(s.content[&Region::Indicator], Content::Text("1".into()));
        assert_eq!(s.content[&Region::Image], Content::Blank);
    }

    #[test]
    fn starts_at_clamped_token_position() {
        let (g, plan) = gallery(&format!("{PAGE}#10/"), 5);
        assert_eq!(g.current_index(), 4);
        assert_eq!(plan.priority, 4);
        assert_eq!(
            g.surface().targets[&Region::Next].as_ref().unwrap().as_str(),
            "http://emptysquare.net/photography/bio/"
        );
    }

    #[test]
    fn stepping_past_last_photo_redirects_once_without_render() {
        let (mut g, _) = gallery(&format!("{PAGE}#5/"), 5);
        let writes_before = g.surface().image_writes;

        let step = g.step(1);
        let bio = Url::parse("http://emptysquare.net/photography/bio/").unwrap();
        assert_eq!(step, Step::Redirected(bio.clone()));
        assert_eq!(g.location().redirects(), vec![bio]);
        assert!(g.location().fragment_writes().is_empty());
        assert_eq!(g.location().fragment().as_deref(), Some("5/"));

        assert_eq!(g.step(1), Step::Stayed);
        g.on_position_changed();
        assert_eq!(g.location().redirects().len(), 1);
        assert_eq!(g.surface().image_writes, writes_before);
    }

    #[test]
    fn stepping_back_rewrites_token_and_renders_on_change() {
        let (mut g, _) = gallery(&format!("{PAGE}#3/"), 5);
        assert_eq!(g.current_index(), 2);

        let step = g.step(-1);
        assert_eq!(
            step,
            Step::Moved {
                index: 1,
                token: "2/".into()
            }
        );
        assert_eq!(g.location().fragment_writes(), vec!["2/".to_string()]);
        assert_eq!(g.current_index(), 2, "index follows the token, not the step");

        g.on_position_changed();
        assert_eq!(g.current_index(), 1);
        let s = g.surface();
        assert_eq!(s.content[&Region::Previous], Content::Arrow);
        assert_eq!(s.content[&Region::Next], Content::Arrow);
        assert_eq!(s.content[&Region::Indicator], Content::Text("2".into()));
    }

    #[test]
    fn stepping_back_from_first_photo_stays() {
        let (mut g, _) = gallery(PAGE, 5);
        assert_eq!(g.step(-1), Step::Stayed);
        assert!(g.location().fragment_writes().is_empty());

        let (mut g, _) = gallery(&format!("{PAGE}#3/"), 5);
        assert_eq!(
            g.step(-7),
            Step::Moved {
                index: 0,
                token: "1/".into()
            }
        );
    }

    #[test]
    fn external_token_change_is_clamped() {
        let (mut g, _) = gallery(PAGE, 5);
        g.location().set_external("10/");
        g.on_position_changed();
        assert_eq!(g.current_index(), 4);
        assert_eq!(g.surface().content[&Region::Indicator], Content::Text("5".into()));

        g.location().set_external("garbage");
        g.on_position_changed();
        assert_eq!(g.current_index(), 0);
    }

    #[test]
    fn loaded_image_shows_only_for_current_photo() {
        let (mut g, _) = gallery(PAGE, 3);
        assert!(!g.on_photo_loaded(2, image()));
        assert_eq!(g.surface().content[&Region::Image], Content::Blank);

        assert!(g.on_photo_loaded(0, image()));
        assert!(matches!(
            g.surface().content[&Region::Image],
            Content::Image { .. }
        ));

        // Navigating to a preloaded photo shows it right away.
        g.location().set_external("3/");
        g.on_position_changed();
        assert!(matches!(
            g.surface().content[&Region::Image],
            Content::Image { .. }
        ));

        assert!(!g.on_photo_loaded(7, image()));
    }

    #[test]
    fn unavailable_photo_shows_placeholder() {
        let (mut g, _) = gallery(PAGE, 2);
        g.on_photo_unavailable(1);
        assert_eq!(g.surface().content[&Region::Image], Content::Blank);
        g.on_photo_unavailable(0);
        assert_eq!(g.surface().content[&Region::Image], Content::Unavailable);
    }

    #[test]
    fn share_widgets_are_updated_then_reparsed_on_every_render() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut descriptors: Vec<PhotoDescriptor> = (0..3)
            .map(|i| PhotoDescriptor::new(format!("/photography/images/{i}.jpg")))
            .collect();
        descriptors[1].share_url = Some("http://cdn.example/1.jpg".into());
        let set = PhotoSet::new(descriptors).unwrap();
        let (mut g, _) = GalleryController::initialize(
            "set",
            set,
            "/photography/bio/",
            FakeLocation::at(&format!("{PAGE}#2/")),
            RecordingSurface::default(),
            vec![Box::new(RecordingShare(log.clone())) as Box<dyn ShareWidget>],
        )
        .unwrap();

        assert_eq!(
            std::mem::take(&mut *log.lock().unwrap()),
            vec![
                ShareCall::Canonical(format!("{PAGE}2/")),
                ShareCall::Preview("http://cdn.example/1.jpg".into()),
                ShareCall::Reparse,
            ]
        );

        g.step(1);
        assert!(log.lock().unwrap().is_empty(), "widgets wait for the token change");
        g.on_position_changed();
        assert_eq!(
            std::mem::take(&mut *log.lock().unwrap()),
            vec![
                ShareCall::Canonical(format!("{PAGE}3/")),
                ShareCall::Preview("/photography/images/2.jpg".into()),
                ShareCall::Reparse,
            ]
        );
    }

    #[test]
    fn steps_before_the_change_notification_accumulate() {
        let (mut g, _) = gallery(PAGE, 5);
        assert_eq!(
            g.step(1),
            Step::Moved {
                index: 1,
                token: "2/".into()
            }
        );
        assert_eq!(
            g.step(1),
            Step::Moved {
                index: 2,
                token: "3/".into()
            }
        );
        assert_eq!(
            g.location().fragment_writes(),
            vec!["2/".to_string(), "3/".to_string()]
        );

        g.on_position_changed();
        assert_eq!(g.current_index(), 2);
        assert_eq!(g.surface().content[&Region::Indicator], Content::Text("3".into()));

        // Two steps back, one notification.
        g.step(-1);
        g.step(-1);
        g.on_position_changed();
        assert_eq!(g.current_index(), 0);
        assert_eq!(g.step(-1), Step::Stayed);
    }
}
