//! URL construction for the gallery page.
//!
//! All functions are pure; position tokens come from [`crate::position`].

use url::{ParseError, Url};

use crate::position;

/// The page URL with its fragment removed.
pub fn page_base(page: &Url) -> Url {
    let mut base = page.clone();
    base.set_fragment(None);
    base
}

/// The page URL pointing at `index` through its fragment, e.g. `.../lower-east-side/#5/`.
pub fn position_url(page: &Url, index: usize) -> Url {
    let mut url = page.clone();
    url.set_fragment(Some(&position::format(index)));
    url
}

/// Canonical per-photo URL: the fragment becomes a path segment.
///
/// `http://host/photography/set/#3/` maps to `http://host/photography/set/3/` for
/// index 2. Share embeds ignore fragments, so they get this form instead.
pub fn canonical_photo_url(page: &Url, index: usize) -> Url {
    let mut url = page_base(page);
    let segment = (index + 1).to_string();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(&segment).push("");
    }
    url
}

/// Resolves the "next set" target against the current page.
///
/// A path such as `/photography/bio/` replaces the page path and keeps scheme and host;
/// an absolute URL is used as is.
pub fn next_set_url(page: &Url, next_set: &str) -> Result<Url, ParseError> {
    page_base(page).join(next_set)
}
