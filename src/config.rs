use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use url::Url;

use crate::collection::{Collection, GallerySet, slugify};
use crate::photos::{PhotoDescriptor, PhotoSet};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PreloadOptions {
    /// Secondary fetches allowed to run at once after the priority photo.
    #[serde(default = "PreloadOptions::default_max_in_flight")]
    pub max_in_flight: usize,
    /// Extra attempts after a failed fetch before the photo is given up.
    #[serde(default = "PreloadOptions::default_retries")]
    pub retries: u32,
    #[serde(
        default = "PreloadOptions::default_retry_backoff",
        with = "humantime_serde"
    )]
    pub retry_backoff: Duration,
}

impl PreloadOptions {
    const fn default_max_in_flight() -> usize {
        4
    }

    const fn default_retries() -> u32 {
        1
    }

    const fn default_retry_backoff() -> Duration {
        Duration::from_millis(250)
    }
}

impl Default for PreloadOptions {
    fn default() -> Self {
        Self {
            max_in_flight: Self::default_max_in_flight(),
            retries: Self::default_retries(),
            retry_backoff: Self::default_retry_backoff(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ShareTarget {
    pub name: String,
    /// Whether the embed re-parses its markup after a URL change.
    #[serde(default = "ShareTarget::default_reparse")]
    pub reparse: bool,
}

impl ShareTarget {
    const fn default_reparse() -> bool {
        true
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SetConfig {
    pub name: String,
    /// Defaults to the slugified name.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoDescriptor>,
    /// Flickr `photosets.getPhotos` JSON, relative to the config file.
    #[serde(default)]
    pub photos_file: Option<PathBuf>,
}

impl SetConfig {
    pub fn slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| slugify(&self.name))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Scheme and host the gallery pages live under.
    pub site_url: Url,
    /// Path prefix of every set page.
    #[serde(default = "Configuration::default_gallery_prefix")]
    pub gallery_prefix: String,
    /// Directory site-relative photo sources resolve against.
    #[serde(default)]
    pub site_root: Option<PathBuf>,
    pub sets: Vec<SetConfig>,
    /// Non-gallery pages visited after the last set, in order.
    #[serde(default = "Configuration::default_special_pages")]
    pub special_pages: Vec<String>,
    #[serde(default)]
    pub preload: PreloadOptions,
    #[serde(default)]
    pub share_targets: Vec<ShareTarget>,
    /// Directory of the YAML file, filled in by `from_yaml_file`.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Configuration {
    fn default_gallery_prefix() -> String {
        "/photography/".to_string()
    }

    fn default_special_pages() -> Vec<String> {
        ["exhibitions", "bio", "contact"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)?;
        let mut cfg: Self = serde_yaml::from_str(&s)?;
        cfg.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(cfg)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(!self.sets.is_empty(), "sets must list at least one set");
        ensure!(
            self.preload.max_in_flight > 0,
            "preload.max-in-flight must be greater than zero"
        );
        ensure!(
            !self.site_url.cannot_be_a_base(),
            "site-url must be an absolute http(s) url"
        );
        if !self.gallery_prefix.starts_with('/') {
            self.gallery_prefix.insert(0, '/');
        }
        if !self.gallery_prefix.ends_with('/') {
            self.gallery_prefix.push('/');
        }

        let mut slugs = HashSet::new();
        for set in &self.sets {
            let slug = set.slug();
            ensure!(!slug.is_empty(), "set {:?} has an empty slug", set.name);
            ensure!(slugs.insert(slug.clone()), "duplicate set slug {slug:?}");
            ensure!(
                !self.special_pages.contains(&slug),
                "set slug {slug:?} collides with a special page"
            );
            ensure!(
                set.photos.is_empty() != set.photos_file.is_none(),
                "set {:?} needs exactly one of photos or photos-file",
                set.name
            );
        }
        Ok(self)
    }

    /// Directory that site-relative photo sources resolve under.
    pub fn site_root(&self) -> PathBuf {
        match &self.site_root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => self.base_dir.join(root),
            None => self.base_dir.clone(),
        }
    }

    /// Loads every set's photos and builds the collection.
    pub fn collection(&self) -> Result<Collection> {
        let mut sets = Vec::with_capacity(self.sets.len());
        for set in &self.sets {
            let photos = match &set.photos_file {
                Some(file) => {
                    let path = self.base_dir.join(file);
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading photos of {}", path.display()))?;
                    PhotoSet::from_flickr_json(&text)
                        .with_context(|| format!("parsing photos of {}", path.display()))?
                }
                None => PhotoSet::new(set.photos.clone())
                    .with_context(|| format!("set {:?}", set.name))?,
            };
            sets.push(GallerySet {
                name: set.name.clone(),
                slug: set.slug(),
                photos,
            });
        }
        Ok(Collection::new(
            self.site_url.clone(),
            self.gallery_prefix.clone(),
            sets,
            self.special_pages.clone(),
        )?)
    }
}
