//! The ordered sets of a site and the page that follows each one.
//!
//! After the last set come the special pages (exhibitions, bio, ...) in order, and the
//! last special page leads back to the first set.

use url::Url;

use crate::error::{Error, Result};
use crate::photos::PhotoSet;

#[derive(Debug, Clone)]
pub struct GallerySet {
    pub name: String,
    pub slug: String,
    pub photos: PhotoSet,
}

#[derive(Debug, Clone)]
pub struct Collection {
    site_url: Url,
    prefix: String,
    sets: Vec<GallerySet>,
    special_pages: Vec<String>,
}

impl Collection {
    pub fn new(
        site_url: Url,
        prefix: impl Into<String>,
        sets: Vec<GallerySet>,
        special_pages: Vec<String>,
    ) -> Result<Self> {
        if sets.is_empty() {
            return Err(Error::EmptyPhotoSet);
        }
        Ok(Self {
            site_url,
            prefix: prefix.into(),
            sets,
            special_pages,
        })
    }

    pub fn sets(&self) -> &[GallerySet] {
        &self.sets
    }

    pub fn first(&self) -> &GallerySet {
        &self.sets[0]
    }

    pub fn get(&self, slug: &str) -> Option<&GallerySet> {
        self.sets.iter().find(|s| s.slug == slug)
    }

    /// Path of a set or special page, e.g. `/photography/bio/`.
    pub fn page_path(&self, slug: &str) -> String {
        format!("{}{}/", self.prefix, slug)
    }

    pub fn page_url(&self, slug: &str) -> Result<Url> {
        Ok(self.site_url.join(&self.page_path(slug))?)
    }

    /// Slug of the page that follows `slug`, whether a set or a special page.
    pub fn next_slug(&self, slug: &str) -> Option<&str> {
        let first = self.sets[0].slug.as_str();
        if let Some(i) = self.sets.iter().position(|s| s.slug == slug) {
            return Some(match self.sets.get(i + 1) {
                Some(next) => next.slug.as_str(),
                None => self.special_pages.first().map_or(first, String::as_str),
            });
        }
        let j = self.special_pages.iter().position(|p| p == slug)?;
        Some(self.special_pages.get(j + 1).map_or(first, String::as_str))
    }

    /// The "next set" URL handed to a set's gallery.
    pub fn next_set_path(&self, slug: &str) -> Result<String> {
        let next = self
            .next_slug(slug)
            .ok_or_else(|| Error::UnknownSet(slug.to_owned()))?;
        Ok(self.page_path(next))
    }

    /// Slug named by a page URL under this collection's prefix.
    pub fn slug_for_url<'a>(&self, url: &'a Url) -> Option<&'a str> {
        if url.host_str() != self.site_url.host_str() {
            return None;
        }
        let rest = url.path().strip_prefix(self.prefix.as_str())?;
        rest.split('/').next().filter(|s| !s.is_empty())
    }
}

/// URL-friendly slug: drops punctuation, lowercases, and joins words with `-`.
pub fn slugify(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-'))
        .collect();
    let mut slug = String::with_capacity(kept.len());
    let mut in_run = false;
    for c in kept.trim().to_lowercase().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_run {
                slug.push('-');
                in_run = true;
            }
        } else {
            slug.push(c);
            in_run = false;
        }
    }
    slug
}
